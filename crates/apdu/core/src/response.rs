//! APDU response definitions
//!
//! A response is the payload returned by the card (possibly empty) plus the
//! two mandatory status bytes.

use bytes::Bytes;

use crate::error::Error;
use crate::status::StatusWord;

/// APDU response: optional payload plus status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    payload: Option<Bytes>,
    status: StatusWord,
}

impl Response {
    /// Create a new response from payload and status
    pub const fn new(payload: Option<Bytes>, status: StatusWord) -> Self {
        Self { payload, status }
    }

    /// Parse a response from raw bytes. The last two bytes are the status
    /// word; anything before them is the payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < 2 {
            return Err(Error::IncompleteResponse(bytes.len()));
        }

        let (data, sw) = bytes.split_at(bytes.len() - 2);
        let payload = if data.is_empty() {
            None
        } else {
            Some(Bytes::copy_from_slice(data))
        };

        Ok(Self {
            payload,
            status: StatusWord::new(sw[0], sw[1]),
        })
    }

    /// Get the response payload, if any
    pub const fn payload(&self) -> Option<&Bytes> {
        self.payload.as_ref()
    }

    /// Consume the response, returning the payload
    pub fn into_payload(self) -> Option<Bytes> {
        self.payload
    }

    /// Get the status word
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Whether the status word is 0x9000
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_with_payload() {
        let resp = Response::from_bytes(&[0x01, 0x02, 0x03, 0x90, 0x00]).unwrap();
        assert_eq!(resp.payload().unwrap().as_ref(), &[0x01, 0x02, 0x03]);
        assert!(resp.is_success());
    }

    #[test]
    fn test_from_bytes_status_only() {
        let resp = Response::from_bytes(&[0x6A, 0x82]).unwrap();
        assert!(resp.payload().is_none());
        assert_eq!(resp.status(), StatusWord::new(0x6A, 0x82));
    }

    #[test]
    fn test_from_bytes_too_short() {
        assert!(matches!(
            Response::from_bytes(&[0x90]),
            Err(Error::IncompleteResponse(1))
        ));
    }
}
