//! UICC/SIM file system exploration
//!
//! Everything needed to interrogate a (U)SIM card above the raw APDU
//! layer:
//!
//! - [`tlv`]: simple and BER tag-length-value decoding;
//! - [`attrs`]: interpretation of the FCP/FCI templates a SELECT returns;
//! - [`session`]: the stateful card conversation (selection with GET
//!   RESPONSE chaining, file reading, authentication, PIN management);
//! - [`discover`]: brute-force mapping of a card's file system;
//! - [`aid`]: application identifier decomposition.
//!
//! Works over any [`cardprobe_apdu_core::CardTransport`], typically a
//! PC/SC reader or an AT+CSIM modem bridge.
//!
//! ```no_run
//! use cardprobe_uicc::{CardProfile, CardSession, discover};
//! # fn run<T: cardprobe_apdu_core::CardTransport>(transport: T) -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = CardSession::from_transport(transport, CardProfile::Uicc);
//! session.select_usim()?;
//! if let Some(imsi) = session.imsi()? {
//!     println!("IMSI: {imsi}");
//! }
//!
//! let discovery = discover::explore(&mut session, &discover::ScanConfig::default())?;
//! for file in &discovery.files {
//!     println!("{:04X?}: {:?}", file.path, file.info.name);
//! }
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod aid;
pub mod attrs;
pub mod discover;
mod error;
pub mod session;
pub mod tlv;
pub mod util;

#[cfg(test)]
mod testutil;

pub use attrs::{EfData, FileInfo, FileKind, FileStructure, LifeCycle};
pub use discover::{Discovery, ScanConfig};
pub use error::UiccError;
pub use session::{AuthOutcome, CardProfile, CardSession, PinOutcome, SelectMode};
