//! AT+CSIM line framing and response parsing
//!
//! All functions here are pure. The framing follows 3GPP TS 27.007 §8.17:
//! `AT+CSIM=<length>,"<command>"` where `<length>` counts hex characters,
//! and the reply is `+CSIM: <length>,"<response>"` followed by a final
//! `OK` or `ERROR` result code.

use bytes::Bytes;
use cardprobe_apdu_core::TransportError;

/// Frame an APDU as an AT+CSIM command line, CRLF-terminated
pub fn frame_command(apdu: &[u8]) -> String {
    let hex = hex::encode_upper(apdu);
    format!("AT+CSIM={},\"{}\"\r\n", hex.len(), hex)
}

/// Parse a complete modem reply (everything up to and including the final
/// result code) into raw response bytes: payload plus status word.
///
/// An `ERROR` result code or a reply without any `+CSIM:` line maps to the
/// bare status word 0x6F00 (checking error: no precise diagnosis), the
/// same declared outcome a card uses when it cannot diagnose a failure.
pub fn parse_reply(reply: &str) -> Result<Bytes, TransportError> {
    let parts: Vec<&str> = reply
        .split("\r\n")
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let Some(last) = parts.last() else {
        return Err(TransportError::Timeout);
    };

    if last.contains("ERROR") {
        return Ok(Bytes::from_static(&[0x6F, 0x00]));
    }

    let Some(csim) = parts.iter().find(|line| line.starts_with("+CSIM:")) else {
        return Ok(Bytes::from_static(&[0x6F, 0x00]));
    };

    let quoted = extract_quoted(csim)
        .ok_or_else(|| TransportError::other(format!("malformed +CSIM line: {csim}")))?;

    let raw = hex::decode(quoted)
        .map_err(|_| TransportError::other(format!("invalid hex in +CSIM line: {csim}")))?;

    if raw.len() < 2 {
        return Err(TransportError::other("response shorter than a status word"));
    }

    Ok(Bytes::from(raw))
}

/// Whether the accumulated reply already carries a final result code
pub fn is_complete(reply: &str) -> bool {
    reply.contains("OK") || reply.contains("ERROR")
}

fn extract_quoted(line: &str) -> Option<&str> {
    let start = line.find('"')? + 1;
    let end = line.rfind('"')?;
    (end > start).then(|| &line[start..end])
}
