//! Error type for UICC-level operations

use cardprobe_apdu_core::StatusWord;

use crate::tlv::TlvError;

/// Errors arising from UICC-level card interaction
///
/// A card answering with a negative status word is usually NOT an error:
/// operations that can legitimately fail on-card (selection, verification,
/// authentication) report that through their return value. This type covers
/// failures that leave the session in an unusable or unexpected state.
#[derive(Debug, thiserror::Error)]
pub enum UiccError {
    /// APDU-level failure (transport or malformed response)
    #[error("APDU error: {0}")]
    Apdu(#[from] cardprobe_apdu_core::Error),

    /// TLV structure in a card response could not be decoded
    #[error("TLV error: {0}")]
    Tlv(#[from] TlvError),

    /// A path the caller needs could not be selected
    #[error("path unavailable: {0}")]
    PathUnavailable(String),

    /// A card response did not have the documented shape
    #[error("unexpected response format: {0}")]
    ResponseFormat(&'static str),

    /// A PIN supplied by the caller is not a valid code
    #[error("invalid PIN: {0}")]
    InvalidPin(&'static str),

    /// The card refused an operation that must succeed for the session to
    /// make sense, e.g. GET RESPONSE after the card announced pending data
    #[error("card refused {operation}: status {sw}")]
    Refused {
        /// Name of the refused operation
        operation: &'static str,
        /// The refusing status word
        sw: StatusWord,
    },
}
