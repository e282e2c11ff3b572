//! Status word interpretation for APDU responses
//!
//! Every APDU response ends with two status bytes (SW1, SW2). This module
//! provides the [`StatusWord`] pair and [`interpret`], a total pure function
//! mapping any byte pair to a [`StatusOutcome`] following the ISO 7816-4
//! §5.4 taxonomy. Unrecognized pairs still classify, either at the SW1 band
//! level with an "undefined SW2 code" detail or as [`StatusKind::Undefined`].

use std::fmt;

/// The two status bytes ending every APDU response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord {
    /// First status byte
    pub sw1: u8,
    /// Second status byte
    pub sw2: u8,
}

impl StatusWord {
    /// Create a new status word from SW1 and SW2
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// Create a status word from a 16-bit value (SW1 in the high byte)
    pub const fn from_u16(sw: u16) -> Self {
        Self {
            sw1: (sw >> 8) as u8,
            sw2: (sw & 0xFF) as u8,
        }
    }

    /// Get the status word as a 16-bit value
    pub const fn to_u16(self) -> u16 {
        ((self.sw1 as u16) << 8) | (self.sw2 as u16)
    }

    /// Check if this is the unconditional success status (0x9000)
    pub const fn is_success(self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }

    /// Check if more data is retrievable via GET RESPONSE (0x61xx)
    pub const fn is_more_data_available(self) -> bool {
        self.sw1 == 0x61
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06X}", self.to_u16())
    }
}

/// Commonly used status words
pub mod common {
    use super::StatusWord;

    /// Normal processing, no further qualification
    pub const SUCCESS: StatusWord = StatusWord::new(0x90, 0x00);
    /// File or application not found
    pub const FILE_NOT_FOUND: StatusWord = StatusWord::new(0x6A, 0x82);
    /// Record not found
    pub const RECORD_NOT_FOUND: StatusWord = StatusWord::new(0x6A, 0x83);
    /// Security status not satisfied
    pub const SECURITY_STATUS_NOT_SATISFIED: StatusWord = StatusWord::new(0x69, 0x82);
    /// Instruction code not supported or invalid
    pub const INS_NOT_SUPPORTED: StatusWord = StatusWord::new(0x6D, 0x00);
    /// Class not supported
    pub const CLA_NOT_SUPPORTED: StatusWord = StatusWord::new(0x6E, 0x00);
    /// No precise diagnosis
    pub const NO_PRECISE_DIAGNOSIS: StatusWord = StatusWord::new(0x6F, 0x00);
}

/// Category of a status outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// Normal processing: command accepted
    Success,
    /// Normal processing: the given number of bytes is retrievable via GET RESPONSE
    MoreData(u8),
    /// Warning processing (SW1 0x62/0x63)
    Warning,
    /// Execution error (SW1 0x64..0x66)
    ExecutionError,
    /// Checking error (SW1 0x67..0x6F)
    CheckingError,
    /// Status word outside any known band
    Undefined,
}

/// Structured interpretation of a status word: category plus a
/// human-readable detail string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusOutcome {
    /// The outcome category
    pub kind: StatusKind,
    /// Human-readable detail
    pub detail: String,
}

impl StatusOutcome {
    /// Build an outcome from its parts
    pub fn new(kind: StatusKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Whether the outcome reports successful processing (including more-data)
    pub const fn is_positive(&self) -> bool {
        matches!(self.kind, StatusKind::Success | StatusKind::MoreData(_))
    }
}

impl fmt::Display for StatusOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

fn undefined_sw2(base: &str, sw2: u8) -> String {
    format!("{base}: undefined SW2 code: {sw2:#04X}")
}

/// Interpret a status word as defined in the ISO 7816-4 standard.
///
/// Total over the full (SW1, SW2) space: every pair maps to some outcome.
pub fn interpret(sw: StatusWord) -> StatusOutcome {
    let StatusWord { sw1, sw2 } = sw;
    match (sw1, sw2) {
        (0x90, 0x00) => StatusOutcome::new(
            StatusKind::Success,
            "normal processing: command accepted: no further qualification",
        ),
        (0x61, n) => StatusOutcome::new(
            StatusKind::MoreData(n),
            format!("normal processing: {n} bytes still available"),
        ),
        (0x62, _) => {
            let base = "warning processing: state of non-volatile memory unchanged";
            let detail = match sw2 {
                0x00 => format!("{base}: no information given"),
                0x81 => format!("{base}: part of returned data may be corrupted"),
                0x82 => format!("{base}: end of file/record reached before reading Le bytes"),
                0x83 => format!("{base}: selected file invalidated"),
                0x84 => format!("{base}: FCI not formatted"),
                0x85 => format!("{base}: selected file in termination state"),
                0x86 => format!("{base}: no input data available from a sensor on the card"),
                n if (0x02..0x81).contains(&n) => {
                    format!("{base}: card has {n} bytes pending")
                }
                n => undefined_sw2(base, n),
            };
            StatusOutcome::new(StatusKind::Warning, detail)
        }
        (0x63, _) => {
            let base = "warning processing: state of non-volatile memory changed";
            let detail = match sw2 {
                0x00 => format!("{base}: no information given"),
                0x81 => format!("{base}: file filled up by the last write"),
                n if (0xC0..=0xCF).contains(&n) => {
                    format!("{base}: counter value {}", n & 0x0F)
                }
                n => undefined_sw2(base, n),
            };
            StatusOutcome::new(StatusKind::Warning, detail)
        }
        (0x64, _) => {
            let base = "execution error: state of non-volatile memory unchanged";
            let detail = match sw2 {
                0x01 => format!("{base}: immediate response expected by the card"),
                n if (0x02..0x81).contains(&n) => {
                    format!("{base}: command aborted by the card, recovery of {n} bytes is needed")
                }
                n => undefined_sw2(base, n),
            };
            StatusOutcome::new(StatusKind::ExecutionError, detail)
        }
        (0x65, _) => {
            let base = "execution error: state of non-volatile memory changed";
            let detail = match sw2 {
                0x00 => format!("{base}: no information given"),
                0x81 => format!("{base}: memory failure"),
                n => undefined_sw2(base, n),
            };
            StatusOutcome::new(StatusKind::ExecutionError, detail)
        }
        (0x66, _) => StatusOutcome::new(
            StatusKind::ExecutionError,
            "execution error: reserved for security-related issues",
        ),
        (0x67, 0x00) => StatusOutcome::new(
            StatusKind::CheckingError,
            "checking error: wrong length (P3 parameter)",
        ),
        (0x68, _) => {
            let base = "checking error: functions in CLA not supported";
            let detail = match sw2 {
                0x00 => format!("{base}: no information given"),
                0x81 => format!("{base}: logical channel not supported"),
                0x82 => format!("{base}: secure messaging not supported"),
                0x83 => format!("{base}: last command of the chain expected"),
                0x84 => format!("{base}: command chaining not supported"),
                n => undefined_sw2(base, n),
            };
            StatusOutcome::new(StatusKind::CheckingError, detail)
        }
        (0x69, _) => {
            let base = "checking error: command not allowed";
            let detail = match sw2 {
                0x00 => format!("{base}: no information given"),
                0x81 => format!("{base}: command incompatible with file structure"),
                0x82 => format!("{base}: security status not satisfied"),
                0x83 => format!("{base}: authentication method blocked"),
                0x84 => format!("{base}: referenced data invalidated"),
                0x85 => format!("{base}: conditions of use not satisfied"),
                0x86 => format!("{base}: command not allowed (no current EF)"),
                0x87 => format!("{base}: expected SM data objects missing"),
                0x88 => format!("{base}: SM data objects incorrect"),
                n => undefined_sw2(base, n),
            };
            StatusOutcome::new(StatusKind::CheckingError, detail)
        }
        (0x6A, _) => {
            let base = "checking error: wrong parameter(s) P1-P2";
            let detail = match sw2 {
                0x00 => format!("{base}: no information given"),
                0x80 => format!("{base}: incorrect parameters in the data field"),
                0x81 => format!("{base}: function not supported"),
                0x82 => format!("{base}: file not found"),
                0x83 => format!("{base}: record not found"),
                0x84 => format!("{base}: not enough memory space in the file"),
                0x85 => format!("{base}: Lc inconsistent with TLV structure"),
                0x86 => format!("{base}: incorrect parameters P1-P2"),
                0x87 => format!("{base}: Lc inconsistent with P1-P2"),
                0x88 => format!("{base}: referenced data not found"),
                0x89 => format!("{base}: file already exists"),
                0x8A => format!("{base}: DF name already exists"),
                n => undefined_sw2(base, n),
            };
            StatusOutcome::new(StatusKind::CheckingError, detail)
        }
        (0x6B, 0x00) => StatusOutcome::new(
            StatusKind::CheckingError,
            "checking error: wrong parameter(s) P1-P2",
        ),
        (0x6C, n) => StatusOutcome::new(
            StatusKind::CheckingError,
            format!("checking error: wrong length Le: exact length is {n}"),
        ),
        (0x6D, 0x00) => StatusOutcome::new(
            StatusKind::CheckingError,
            "checking error: instruction code not supported or invalid",
        ),
        (0x6E, 0x00) => StatusOutcome::new(
            StatusKind::CheckingError,
            "checking error: class not supported",
        ),
        (0x6F, 0x00) => StatusOutcome::new(
            StatusKind::CheckingError,
            "checking error: no precise diagnosis",
        ),
        _ => StatusOutcome::new(StatusKind::Undefined, "undefined status"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        let outcome = interpret(StatusWord::new(0x90, 0x00));
        assert_eq!(outcome.kind, StatusKind::Success);
        assert!(outcome.is_positive());
    }

    #[test]
    fn test_more_data() {
        let outcome = interpret(StatusWord::new(0x61, 0x2A));
        assert_eq!(outcome.kind, StatusKind::MoreData(0x2A));
        assert!(outcome.detail.contains("42 bytes still available"));
    }

    #[test]
    fn test_file_not_found() {
        let outcome = interpret(common::FILE_NOT_FOUND);
        assert_eq!(outcome.kind, StatusKind::CheckingError);
        assert!(outcome.detail.contains("file not found"));
    }

    #[test]
    fn test_classification_is_total() {
        // every pair classifies to exactly one outcome, default "undefined"
        for sw1 in 0..=0xFFu8 {
            for sw2 in 0..=0xFFu8 {
                let outcome = interpret(StatusWord::new(sw1, sw2));
                assert!(!outcome.detail.is_empty(), "empty detail for {sw1:#04X} {sw2:#04X}");
            }
        }
        assert_eq!(
            interpret(StatusWord::new(0x42, 0x42)).kind,
            StatusKind::Undefined
        );
    }

    #[test]
    fn test_band_level_classification_of_unknown_sw2() {
        let outcome = interpret(StatusWord::new(0x69, 0xF0));
        assert_eq!(outcome.kind, StatusKind::CheckingError);
        assert!(outcome.detail.contains("undefined SW2 code"));
    }

    #[test]
    fn test_status_word_roundtrip() {
        let sw = StatusWord::from_u16(0x6A82);
        assert_eq!(sw, StatusWord::new(0x6A, 0x82));
        assert_eq!(sw.to_u16(), 0x6A82);
        assert_eq!(format!("{sw}"), "0x6A82");
    }
}
