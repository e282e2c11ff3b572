//! Scripted transport for unit tests

use std::collections::VecDeque;

use bytes::Bytes;
use cardprobe_apdu_core::{CardTransport, TransportError};

/// Transport replaying a fixed script of responses, recording every
/// command it is handed.
#[derive(Debug)]
pub(crate) struct ScriptTransport {
    responses: VecDeque<Bytes>,
    sent: Vec<Bytes>,
}

impl ScriptTransport {
    pub(crate) fn new(responses: &[&[u8]]) -> Self {
        Self {
            responses: responses.iter().map(|r| Bytes::copy_from_slice(r)).collect(),
            sent: Vec::new(),
        }
    }

    /// Commands transmitted so far, in order
    pub(crate) fn sent(&self) -> &[Bytes] {
        &self.sent
    }
}

impl CardTransport for ScriptTransport {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        self.sent.push(Bytes::copy_from_slice(command));
        self.responses
            .pop_front()
            .ok_or_else(|| TransportError::other("script exhausted"))
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}
