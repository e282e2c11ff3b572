//! Executor for APDU command execution
//!
//! Combines a [`CardTransport`] with the bounded [`CommandHistory`]. The
//! executor is deliberately protocol-blind: it serializes a command, moves
//! bytes, parses the status word, and records the exchange. Status word
//! semantics (GET RESPONSE chaining, profile-specific bands) belong to the
//! session layer above.

use tracing::warn;

use crate::command::Command;
use crate::error::Error;
use crate::history::{CommandHistory, Exchange};
use crate::response::Response;
use crate::transport::CardTransport;

/// Result type alias using the core error
pub type Result<T> = core::result::Result<T, Error>;

/// Card executor combining a transport with a command history
#[derive(Debug)]
pub struct CardExecutor<T: CardTransport> {
    /// The transport used for communication
    transport: T,
    /// History of recent exchanges
    history: CommandHistory,
    /// Reconnect and retry exactly once on transport failure
    force_reconnect: bool,
}

impl<T: CardTransport> CardExecutor<T> {
    /// Create a new card executor with the given transport
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            history: CommandHistory::new(),
            force_reconnect: false,
        }
    }

    /// Enable one reconnect-and-retry on transport failure
    pub const fn with_force_reconnect(mut self) -> Self {
        self.force_reconnect = true;
        self
    }

    /// Get a reference to the underlying transport
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Take ownership of the transport and return it
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// The recorded exchange history
    pub const fn history(&self) -> &CommandHistory {
        &self.history
    }

    /// Transmit a command and parse the response
    ///
    /// On a transport failure with reconnect enabled, resets the transport
    /// and retries exactly once; further failures propagate.
    pub fn transmit(&mut self, command: &Command) -> Result<Response> {
        let command_bytes = command.to_bytes();

        let raw = match self.transport.transmit_raw(&command_bytes) {
            Ok(raw) => raw,
            Err(e) if self.force_reconnect => {
                warn!(error = %e, "transport failure, reconnecting and retrying once");
                self.transport.reset()?;
                self.transport.transmit_raw(&command_bytes)?
            }
            Err(e) => return Err(e.into()),
        };

        let response = Response::from_bytes(&raw)?;
        self.history.push(Exchange {
            command: command_bytes,
            response: response.clone(),
        });
        Ok(response)
    }

    /// Reset the transport connection
    pub fn reset(&mut self) -> Result<()> {
        self.transport.reset().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use bytes::Bytes;

    #[test]
    fn test_basic_transmit() {
        let transport = MockTransport::with_response(Bytes::from_static(&[0x90, 0x00]));
        let mut executor = CardExecutor::new(transport);

        let response = executor
            .transmit(&Command::new(0x00, 0xA4, 0x04, 0x00))
            .unwrap();
        assert!(response.is_success());
        assert_eq!(executor.history().len(), 1);
    }

    #[test]
    fn test_force_reconnect_retries_once() {
        let mut transport = MockTransport::with_success();
        transport.connected = false;
        let mut executor = CardExecutor::new(transport).with_force_reconnect();

        // first attempt fails, reset reconnects, the retry succeeds
        let response = executor
            .transmit(&Command::new(0x00, 0xA4, 0x04, 0x00))
            .unwrap();
        assert!(response.is_success());
    }

    #[test]
    fn test_failure_propagates_without_force() {
        let mut transport = MockTransport::with_success();
        transport.connected = false;
        let mut executor = CardExecutor::new(transport);

        let result = executor.transmit(&Command::new(0x00, 0xA4, 0x04, 0x00));
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[test]
    fn test_history_records_exchanges() {
        let transport = MockTransport::new(vec![
            Bytes::from_static(&[0x61, 0x10]),
            Bytes::from_static(&[0x01, 0x02, 0x90, 0x00]),
        ]);
        let mut executor = CardExecutor::new(transport);

        executor
            .transmit(&Command::select_file(0x00, 0x00, 0x04, &[0x3F, 0x00]))
            .unwrap();
        executor.transmit(&Command::get_response(0x00, 0x10)).unwrap();

        assert_eq!(executor.history().len(), 2);
        let last = executor.history().last().unwrap();
        assert_eq!(last.response.payload().unwrap().as_ref(), &[0x01, 0x02]);
    }
}
