//! PC/SC transport implementation for APDU operations
//!
//! This crate provides an implementation of the `CardTransport` trait from
//! `cardprobe-apdu-core` using the PC/SC API for communication with smart
//! cards.
//!
//! # Examples
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use cardprobe_apdu_core::{CardExecutor, Command};
//! use cardprobe_apdu_transport_pcsc::{PcscDeviceManager, PcscConfig};
//!
//! // Create a PC/SC device manager
//! let manager = PcscDeviceManager::new()?;
//!
//! // List available readers
//! let readers = manager.list_readers()?;
//! if readers.is_empty() {
//!     println!("No readers found");
//!     return Ok(());
//! }
//!
//! // Connect to the first reader
//! let reader = &readers[0];
//! println!("Connecting to reader: {}", reader.name());
//!
//! let transport = manager.open_reader(reader.name())?;
//! let mut executor = CardExecutor::new(transport);
//!
//! // Select the master file
//! let select = Command::select_file(0x00, 0x00, 0x04, &[0x3F, 0x00]);
//! let response = executor.transmit(&select)?;
//! println!("Status: {}", response.status());
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod manager;
mod reader;
mod transport;

pub use config::{PcscConfig, ShareMode};
pub use error::PcscError;
pub use manager::PcscDeviceManager;
pub use reader::PcscReader;
pub use transport::PcscTransport;

// Re-export some pcsc types for convenience
pub use pcsc::{Protocol, Protocols};
