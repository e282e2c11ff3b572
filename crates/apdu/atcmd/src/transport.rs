//! Transport implementation over a serial modem port

use std::fmt;
use std::io::{Read, Write};

use bytes::Bytes;
use cardprobe_apdu_core::{CardTransport, TransportError};
use tracing::{debug, trace};

use crate::codec;

/// APDU transport that tunnels commands through a modem's AT+CSIM command.
///
/// Generic over any port handle implementing [`Read`] and [`Write`], which
/// covers serial-port crates as well as in-memory test doubles.
pub struct AtCsimTransport<P> {
    port: P,
    connected: bool,
}

impl<P> fmt::Debug for AtCsimTransport<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtCsimTransport")
            .field("connected", &self.connected)
            .finish()
    }
}

impl<P: Read + Write + Send + Sync + fmt::Debug> AtCsimTransport<P> {
    /// Create a new transport over an already-opened modem port
    pub const fn new(port: P) -> Self {
        Self {
            port,
            connected: true,
        }
    }

    /// Consume the transport and return the underlying port
    pub fn into_port(self) -> P {
        self.port
    }

    /// Write the framed command line and collect the reply up to the final
    /// `OK`/`ERROR` result code
    fn exchange(&mut self, apdu: &[u8]) -> Result<String, TransportError> {
        let line = codec::frame_command(apdu);
        trace!(command = %line.trim_end(), "sending AT command");

        self.port.write_all(line.as_bytes()).map_err(|e| {
            self.connected = false;
            TransportError::other(format!("modem write failed: {e}"))
        })?;
        self.port.flush().map_err(|e| {
            self.connected = false;
            TransportError::other(format!("modem flush failed: {e}"))
        })?;

        let mut reply = String::new();
        let mut buf = [0u8; 256];
        loop {
            let n = self.port.read(&mut buf).map_err(|e| {
                self.connected = false;
                TransportError::other(format!("modem read failed: {e}"))
            })?;
            if n == 0 {
                if codec::is_complete(&reply) {
                    break;
                }
                return Err(TransportError::Timeout);
            }
            reply.push_str(&String::from_utf8_lossy(&buf[..n]));
            if codec::is_complete(&reply) {
                break;
            }
        }

        debug!(reply = %reply.trim(), "modem reply");
        Ok(reply)
    }
}

impl<P: Read + Write + Send + Sync + fmt::Debug> CardTransport for AtCsimTransport<P> {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        let reply = self.exchange(command)?;
        codec::parse_reply(&reply)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        // No card-level reset over AT+CSIM; just mark the port usable again.
        self.connected = true;
        Ok(())
    }
}
