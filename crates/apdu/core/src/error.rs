//! Core error type for all APDU operations
//!
//! This module provides a centralized error type used throughout the
//! cardprobe-apdu-core crate. All error variants are consolidated here to
//! simplify error handling and facilitate error bubbling up through the
//! call stack.
//!
//! Note that a negative status word is not an error: a card refusing a
//! command is an expected protocol outcome and is reported through
//! [`crate::status::StatusOutcome`], never through this type.

use crate::transport::TransportError;

/// Core error type that encompasses all possible errors in the crate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure while exchanging bytes with the card
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Response shorter than the two mandatory status bytes
    #[error("Incomplete response: {0} byte(s), expected at least 2")]
    IncompleteResponse(usize),

    /// Parse error when processing a response
    #[error("Parse error: {0}")]
    ParseError(&'static str),

    /// Context error with message and source error
    #[error("{context}: {source}")]
    Context {
        /// Contextual message
        context: String,
        /// Source error
        source: Box<Self>,
    },

    /// Other error with static message
    #[error("{0}")]
    Other(&'static str),
}

impl Error {
    /// Create a new error with context information
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a new error with a static message
    pub const fn other(message: &'static str) -> Self {
        Self::Other(message)
    }

    /// Create a new parse error
    pub const fn parse(message: &'static str) -> Self {
        Self::ParseError(message)
    }
}

/// Extension trait for Result with APDU Errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, context: S) -> Result<T, Error>;
}

impl<T> ResultExt<T> for Result<T, Error> {
    fn context<S: Into<String>>(self, context: S) -> Self {
        self.map_err(|e| e.with_context(context))
    }
}
