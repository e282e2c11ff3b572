//! APDU command definitions and builders
//!
//! This module provides the generic [`Command`] structure according to
//! ISO/IEC 7816-4, together with pure builders for the standard instruction
//! set used with (U)SIM cards (ISO 7816-4, detailed further in ETSI TS
//! 102.221).
//!
//! Serialization uses short Lc/Le only. A payload longer than 255 bytes is
//! clamped to 255 with a warning; callers that need more data must split it
//! themselves.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::warn;

/// Generic APDU command structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data (optional)
    pub data: Option<Bytes>,
    /// Expected length (optional)
    pub le: Option<u8>,
}

impl Command {
    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Create a new command with expected response length (Le)
    pub const fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: Some(le),
        }
    }

    /// Create a new command with data payload
    pub fn new_with_data<T: Into<Bytes>>(cla: u8, ins: u8, p1: u8, p2: u8, data: T) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Some(data.into()),
            le: None,
        }
    }

    /// Set the data field
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the expected length field
    pub const fn with_le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    /// Convert to raw APDU bytes: `CLA INS P1 P2 [Lc data] [Le]`
    ///
    /// Payloads longer than 255 bytes are truncated to 255, a documented
    /// limitation of the short Lc encoding.
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(self.command_length());

        // Header: CLA, INS, P1, P2
        buffer.put_u8(self.cla);
        buffer.put_u8(self.ins);
        buffer.put_u8(self.p1);
        buffer.put_u8(self.p2);

        // Add Lc and data if present
        if let Some(data) = &self.data {
            let mut data = data.as_ref();
            if data.len() > 255 {
                warn!(
                    ins = format_args!("{:#04X}", self.ins),
                    len = data.len(),
                    "payload exceeds short Lc limit, truncating to 255 bytes"
                );
                data = &data[..255];
            }
            buffer.put_u8(data.len() as u8);
            buffer.put_slice(data);
        }

        // Add Le if present
        if let Some(le) = self.le {
            buffer.put_u8(le);
        }

        buffer.freeze()
    }

    /// Calculate length of the serialized command
    pub fn command_length(&self) -> usize {
        // Header (CLA, INS, P1, P2) is always 4 bytes
        let mut length = 4;

        if let Some(data) = &self.data {
            length += 1 + data.len().min(255);
        }

        if self.le.is_some() {
            length += 1;
        }

        length
    }
}

/// Mnemonic for a standard instruction byte, used for diagnostics and logging
pub const fn ins_name(ins: u8) -> Option<&'static str> {
    Some(match ins {
        0x04 => "DEACTIVATE FILE",
        0x0C => "ERASE RECORD(S)",
        0x0E | 0x0F => "ERASE BINARY",
        0x10 => "TERMINAL PROFILE",
        0x12 => "FETCH",
        0x14 => "TERMINAL RESPONSE",
        0x20 | 0x21 => "VERIFY",
        0x22 => "MANAGE SECURITY ENVIRONMENT",
        0x24 => "CHANGE PIN",
        0x26 => "DISABLE PIN",
        0x28 => "ENABLE PIN",
        0x2A => "PERFORM SECURITY OPERATION",
        0x2C => "UNBLOCK PIN",
        0x32 => "INCREASE",
        0x44 => "ACTIVATE FILE",
        0x46 => "GENERATE ASYMMETRIC KEY PAIR",
        0x70 => "MANAGE CHANNEL",
        0x73 => "MANAGE SECURE CHANNEL",
        0x75 => "TRANSACT DATA",
        0x82 => "EXTERNAL AUTHENTICATE",
        0x84 => "GET CHALLENGE",
        0x86 | 0x87 => "GENERAL AUTHENTICATE",
        0x88 => "INTERNAL AUTHENTICATE",
        0x89 => "AUTHENTICATE",
        0xA0 | 0xA1 => "SEARCH BINARY",
        0xA2 => "SEARCH RECORD",
        0xA4 => "SELECT FILE",
        0xA8 => "GET PROCESSING OPTIONS",
        0xAA => "TERMINAL CAPABILITY",
        0xB0 | 0xB1 => "READ BINARY",
        0xB2 | 0xB3 => "READ RECORD(S)",
        0xC0 => "GET RESPONSE",
        0xC2 | 0xC3 => "ENVELOPE",
        0xCA => "GET DATA",
        0xCB => "RETRIEVE DATA",
        0xD0 | 0xD1 => "WRITE BINARY",
        0xD2 => "WRITE RECORD",
        0xD6 | 0xD7 => "UPDATE BINARY",
        0xDA | 0xDB => "SET DATA",
        0xDC | 0xDD => "UPDATE RECORD",
        0xE0 => "CREATE FILE",
        0xE2 => "APPEND RECORD",
        0xE4 => "DELETE FILE",
        0xE6 => "TERMINATE DF",
        0xE8 => "TERMINATE EF",
        0xF2 => "STATUS",
        0xFE => "TERMINATE CARD USAGE",
        _ => return None,
    })
}

/// Builders for the standard ISO 7816-4 / ETSI TS 102.221 instruction set.
///
/// Every builder is pure: it only assembles a [`Command`] from symbolic
/// parameters, performing no I/O. The class byte is always supplied by the
/// caller since it depends on the card generation (0x00 for UICC, 0xA0 for
/// legacy SIM).
impl Command {
    /// SELECT FILE (0xA4): select a file by identifier, path or DF name
    pub fn select_file(cla: u8, p1: u8, p2: u8, addr: &[u8]) -> Self {
        Self::new_with_data(cla, 0xA4, p1, p2, Bytes::copy_from_slice(addr))
    }

    /// READ BINARY (0xB0): read from an EF with transparent structure
    pub const fn read_binary(cla: u8, p1: u8, p2: u8, le: u8) -> Self {
        Self::new_with_le(cla, 0xB0, p1, p2, le)
    }

    /// WRITE BINARY (0xD0): write to an EF with transparent structure
    pub fn write_binary(cla: u8, p1: u8, p2: u8, data: &[u8]) -> Self {
        Self::new_with_data(cla, 0xD0, p1, p2, Bytes::copy_from_slice(data))
    }

    /// UPDATE BINARY (0xD6): update an EF with transparent structure
    pub fn update_binary(cla: u8, p1: u8, p2: u8, data: &[u8]) -> Self {
        Self::new_with_data(cla, 0xD6, p1, p2, Bytes::copy_from_slice(data))
    }

    /// ERASE BINARY (0x0E): erase an EF with transparent structure
    ///
    /// `offset` carries the optional two-byte end-of-erasure offset; when
    /// absent the command is sent header-only.
    pub fn erase_binary(cla: u8, p1: u8, p2: u8, offset: Option<[u8; 2]>) -> Self {
        match offset {
            Some(off) => Self::new_with_data(cla, 0x0E, p1, p2, off.to_vec()),
            None => Self::new(cla, 0x0E, p1, p2),
        }
    }

    /// READ RECORD (0xB2): read a record from a record-structured EF
    pub const fn read_record(cla: u8, record: u8, p2: u8, le: u8) -> Self {
        Self::new_with_le(cla, 0xB2, record, p2, le)
    }

    /// WRITE RECORD (0xD2): write a record to a record-structured EF
    pub fn write_record(cla: u8, record: u8, p2: u8, data: &[u8]) -> Self {
        Self::new_with_data(cla, 0xD2, record, p2, Bytes::copy_from_slice(data))
    }

    /// APPEND RECORD (0xE2): append a record to a record-structured EF
    pub fn append_record(cla: u8, p2: u8, data: &[u8]) -> Self {
        Self::new_with_data(cla, 0xE2, 0x00, p2, Bytes::copy_from_slice(data))
    }

    /// UPDATE RECORD (0xDC): update a record of a record-structured EF
    pub fn update_record(cla: u8, record: u8, p2: u8, data: &[u8]) -> Self {
        Self::new_with_data(cla, 0xDC, record, p2, Bytes::copy_from_slice(data))
    }

    /// SEARCH RECORD (0xA2): search a pattern in the current record-structured EF
    pub fn search_record(cla: u8, p1: u8, p2: u8, pattern: &[u8]) -> Self {
        Self::new_with_data(cla, 0xA2, p1, p2, Bytes::copy_from_slice(pattern))
    }

    /// GET DATA (0xCA): retrieve a data object
    pub const fn get_data(cla: u8, p1: u8, p2: u8, le: u8) -> Self {
        Self::new_with_le(cla, 0xCA, p1, p2, le)
    }

    /// PUT DATA (0xDA): store a data object
    ///
    /// Lc and the body are omitted entirely when `data` is empty.
    pub fn put_data(cla: u8, p1: u8, p2: u8, data: &[u8]) -> Self {
        if data.is_empty() {
            Self::new(cla, 0xDA, p1, p2)
        } else {
            Self::new_with_data(cla, 0xDA, p1, p2, Bytes::copy_from_slice(data))
        }
    }

    /// VERIFY (0x20): verify a PIN, password or security code
    ///
    /// An empty `data` sends the header only, which queries the remaining
    /// attempt counter on most cards.
    pub fn verify(cla: u8, p2: u8, data: &[u8]) -> Self {
        if data.is_empty() {
            Self::new(cla, 0x20, 0x00, p2)
        } else {
            Self::new_with_data(cla, 0x20, 0x00, p2, Bytes::copy_from_slice(data))
        }
    }

    /// DISABLE PIN (0x26): disable CHV verification
    pub fn disable_pin(cla: u8, p1: u8, p2: u8, data: &[u8]) -> Self {
        Self::new_with_data(cla, 0x26, p1, p2, Bytes::copy_from_slice(data))
    }

    /// ENABLE PIN (0x28): enable CHV verification
    pub fn enable_pin(cla: u8, p1: u8, p2: u8, data: &[u8]) -> Self {
        Self::new_with_data(cla, 0x28, p1, p2, Bytes::copy_from_slice(data))
    }

    /// UNBLOCK PIN (0x2C): unblock a CHV code with its unblock code
    ///
    /// The card expects either no body at all, or exactly 16 bytes (8 digits
    /// of unblock code followed by 8 digits of new PIN). Anything else is
    /// sent header-only, matching the card's own expectation.
    pub fn unblock_pin(cla: u8, p2: u8, data: &[u8]) -> Self {
        if data.len() == 16 {
            Self::new_with_data(cla, 0x2C, 0x00, p2, Bytes::copy_from_slice(data))
        } else {
            Self::new(cla, 0x2C, 0x00, p2)
        }
    }

    /// INTERNAL AUTHENTICATE (0x88): run the card's internal authentication algorithm
    pub fn internal_authenticate(cla: u8, p1: u8, p2: u8, data: &[u8]) -> Self {
        Self::new_with_data(cla, 0x88, p1, p2, Bytes::copy_from_slice(data))
    }

    /// EXTERNAL AUTHENTICATE (0x82): update the card security status after a challenge
    pub fn external_authenticate(cla: u8, p1: u8, p2: u8, data: &[u8]) -> Self {
        if data.is_empty() {
            Self::new(cla, 0x82, p1, p2)
        } else {
            Self::new_with_data(cla, 0x82, p1, p2, Bytes::copy_from_slice(data))
        }
    }

    /// GET CHALLENGE (0x84): request a challenge for external authentication
    pub const fn get_challenge(cla: u8) -> Self {
        Self::new(cla, 0x84, 0x00, 0x00)
    }

    /// MANAGE CHANNEL (0x70): open (P1=0x00) or close (P1=0x80) a logical channel
    ///
    /// When opening on the basic channel (P1, P2 both zero) the card assigns
    /// the channel number, so a one-byte Le is appended.
    pub const fn manage_channel(cla: u8, p1: u8, p2: u8) -> Self {
        if p1 == 0x00 && p2 == 0x00 {
            Self::new_with_le(cla, 0x70, p1, p2, 0x01)
        } else {
            Self::new(cla, 0x70, p1, p2)
        }
    }

    /// GET RESPONSE (0xC0): retrieve data advertised by a 0x61xx / 0x9Fxx status
    pub const fn get_response(cla: u8, le: u8) -> Self {
        Self::new_with_le(cla, 0xC0, 0x00, 0x00, le)
    }

    /// ENVELOPE (0xC2): encapsulate data (e.g. for SIM toolkit download)
    pub fn envelope(cla: u8, data: &[u8]) -> Self {
        if data.is_empty() {
            Self::new(cla, 0xC2, 0x00, 0x00)
        } else {
            Self::new_with_data(cla, 0xC2, 0x00, 0x00, Bytes::copy_from_slice(data))
        }
    }

    /// FETCH (0x12): retrieve a proactive command from the card
    pub const fn fetch(cla: u8, le: u8) -> Self {
        Self::new_with_le(cla, 0x12, 0x00, 0x00, le)
    }

    /// TERMINAL RESPONSE (0x14): answer a proactive command
    pub fn terminal_response(cla: u8, data: &[u8]) -> Self {
        Self::new_with_data(cla, 0x14, 0x00, 0x00, Bytes::copy_from_slice(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_serialization() {
        let data = Bytes::from_static(&[0xA0, 0x00, 0x00, 0x01, 0x51, 0x00]);
        let cmd = Command::new_with_data(0x00, 0xA4, 0x04, 0x00, data).with_le(0);
        let bytes = cmd.to_bytes();

        assert_eq!(
            bytes.as_ref(),
            &[0x00, 0xA4, 0x04, 0x00, 0x06, 0xA0, 0x00, 0x00, 0x01, 0x51, 0x00, 0x00]
        );
    }

    #[test]
    fn test_command_length() {
        let cmd1 = Command::new(0x00, 0xB0, 0x00, 0x00);
        assert_eq!(cmd1.command_length(), 4);

        let cmd2 = Command::new_with_le(0x00, 0xB0, 0x00, 0x00, 0xFF);
        assert_eq!(cmd2.command_length(), 5);

        let data = Bytes::from_static(&[0x01, 0x02, 0x03]);
        let cmd3 = Command::new_with_data(0x00, 0xD6, 0x00, 0x00, data.clone());
        assert_eq!(cmd3.command_length(), 8);

        let cmd4 = Command::new_with_data(0x00, 0xD6, 0x00, 0x00, data).with_le(0xFF);
        assert_eq!(cmd4.command_length(), 9);
    }

    #[test]
    fn test_oversized_payload_truncated() {
        let data = vec![0xAB; 300];
        let cmd = Command::new_with_data(0x00, 0xD6, 0x00, 0x00, data);
        let bytes = cmd.to_bytes();

        assert_eq!(bytes.len(), 4 + 1 + 255);
        assert_eq!(bytes[4], 0xFF);
        assert_eq!(bytes[5], 0xAB);
        assert_eq!(bytes[4 + 255], 0xAB);
    }

    #[test]
    fn test_verify_without_data_omits_lc() {
        let cmd = Command::verify(0xA0, 0x01, &[]);
        assert_eq!(cmd.to_bytes().as_ref(), &[0xA0, 0x20, 0x00, 0x01]);

        let cmd = Command::verify(0xA0, 0x01, &[0x31, 0x32, 0x33, 0x34]);
        assert_eq!(
            cmd.to_bytes().as_ref(),
            &[0xA0, 0x20, 0x00, 0x01, 0x04, 0x31, 0x32, 0x33, 0x34]
        );
    }

    #[test]
    fn test_unblock_pin_requires_exact_body() {
        let body = [0x31; 16];
        let cmd = Command::unblock_pin(0x00, 0x01, &body);
        assert_eq!(cmd.to_bytes()[4], 0x10);

        // any other body length degrades to an attempt-counter query
        let cmd = Command::unblock_pin(0x00, 0x01, &[0x31; 8]);
        assert_eq!(cmd.to_bytes().as_ref(), &[0x00, 0x2C, 0x00, 0x01]);
    }

    #[test]
    fn test_manage_channel_le() {
        let open = Command::manage_channel(0x00, 0x00, 0x00);
        assert_eq!(open.to_bytes().as_ref(), &[0x00, 0x70, 0x00, 0x00, 0x01]);

        let close = Command::manage_channel(0x00, 0x80, 0x01);
        assert_eq!(close.to_bytes().as_ref(), &[0x00, 0x70, 0x80, 0x01]);
    }

    #[test]
    fn test_ins_name() {
        assert_eq!(ins_name(0xA4), Some("SELECT FILE"));
        assert_eq!(ins_name(0xC0), Some("GET RESPONSE"));
        assert_eq!(ins_name(0xFD), None);
    }
}
