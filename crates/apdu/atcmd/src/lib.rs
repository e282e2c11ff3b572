//! AT+CSIM serial-modem bridge transport for APDU operations
//!
//! Many cellular modems expose the SIM card behind the `AT+CSIM` command
//! (3GPP TS 27.007): the APDU is hex-encoded into an AT command line, and
//! the card's response comes back as a `+CSIM:` information response
//! terminated by `OK` or `ERROR`.
//!
//! This crate implements the `CardTransport` trait from
//! `cardprobe-apdu-core` on top of any [`std::io::Read`] +
//! [`std::io::Write`] serial port handle. The line framing and parsing is
//! pure and unit-tested in [`codec`]; the transport itself only moves
//! bytes.
//!
//! A modem answering `ERROR` (or nothing parseable) is mapped to the
//! status word 0x6F00 ("no precise diagnosis") rather than a transport
//! failure, since the card session may well continue afterwards.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
mod transport;

pub use transport::AtCsimTransport;
