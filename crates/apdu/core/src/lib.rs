//! Core types for APDU (Application Protocol Data Unit) operations
//!
//! This crate provides the foundational types for working with smart card
//! APDU commands and responses according to ISO/IEC 7816-4.
//!
//! ## Overview
//!
//! APDU (Application Protocol Data Unit) is the communication format used by smart cards.
//! This crate provides:
//!
//! - Creating and serializing APDU commands, including the standard ISO 7816-4 /
//!   ETSI TS 102.221 instruction set
//! - Parsing card responses and interpreting status words into a structured
//!   outcome taxonomy
//! - A transport abstraction for moving raw APDU bytes to and from a card
//! - An executor combining a transport with a bounded command history for
//!   diagnostics
//!
//! Commands are limited to short Lc/Le encoding: payloads longer than 255 bytes
//! are truncated on serialization. Extended-length framing is not supported.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

// Main modules
pub mod command;
pub mod error;
pub mod executor;
pub mod history;
pub mod response;
pub mod status;
pub mod transport;

pub use command::{Command, ins_name};
pub use error::{Error, ResultExt};
pub use executor::CardExecutor;
pub use history::{CommandHistory, Exchange};
pub use response::Response;
pub use status::{StatusKind, StatusOutcome, StatusWord, interpret};
pub use transport::{CardTransport, TransportError};

/// Prelude module containing commonly used types
pub mod prelude {
    // Core types
    pub use crate::{Bytes, BytesMut, Error, ResultExt};

    // Command related
    pub use crate::Command;
    pub use crate::command::ins_name;

    // Response related
    pub use crate::Response;
    pub use crate::status::{StatusKind, StatusOutcome, StatusWord, common as status, interpret};

    // Transport layer
    pub use crate::transport::{CardTransport, TransportError};

    // Executor layer
    pub use crate::executor::CardExecutor;
    pub use crate::history::{CommandHistory, Exchange};
}
