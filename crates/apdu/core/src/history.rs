//! Bounded history of exchanged APDUs
//!
//! Keeps the last N command/response pairs for diagnostics. Single writer,
//! oldest entry evicted first.

use std::collections::VecDeque;
use std::fmt;

use bytes::Bytes;

use crate::command::ins_name;
use crate::response::Response;

/// Default number of exchanges retained
pub const DEFAULT_CAPACITY: usize = 10;

/// One command/response exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Serialized command bytes as sent to the card
    pub command: Bytes,
    /// The parsed response
    pub response: Response,
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .command
            .get(1)
            .and_then(|ins| ins_name(*ins))
            .unwrap_or("");
        write!(
            f,
            "{name} apdu: {} -> sw: {}",
            hex::encode_upper(&self.command),
            self.response.status()
        )
    }
}

/// Bounded ring buffer of the most recent APDU exchanges
#[derive(Debug, Clone)]
pub struct CommandHistory {
    entries: VecDeque<Exchange>,
    capacity: usize,
}

impl CommandHistory {
    /// Create a history with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a history with the given capacity (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an exchange, evicting the oldest when full
    pub fn push(&mut self, exchange: Exchange) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(exchange);
    }

    /// The most recent exchange
    pub fn last(&self) -> Option<&Exchange> {
        self.entries.back()
    }

    /// Iterate over retained exchanges, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Exchange> {
        self.entries.iter()
    }

    /// Number of retained exchanges
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no exchange is retained
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of retained exchanges
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusWord;

    fn exchange(tag: u8) -> Exchange {
        Exchange {
            command: Bytes::copy_from_slice(&[0x00, 0xA4, 0x00, tag]),
            response: Response::new(None, StatusWord::new(0x90, 0x00)),
        }
    }

    #[test]
    fn test_oldest_evicted_first() {
        let mut history = CommandHistory::with_capacity(3);
        for i in 0..5 {
            history.push(exchange(i));
        }

        assert_eq!(history.len(), 3);
        let tags: Vec<u8> = history.iter().map(|e| e.command[3]).collect();
        assert_eq!(tags, vec![2, 3, 4]);
        assert_eq!(history.last().unwrap().command[3], 4);
    }

    #[test]
    fn test_display_names_instruction() {
        let text = format!("{}", exchange(0));
        assert!(text.starts_with("SELECT FILE"));
        assert!(text.contains("00A40000"));
    }
}
