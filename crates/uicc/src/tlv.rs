//! Tag-length-value decoding for card responses
//!
//! Two TLV dialects coexist on (U)SIM cards and both are needed to read
//! select responses:
//!
//! - the simple format: one tag byte, then either a one-byte length or the
//!   0xFF marker followed by a two-byte big-endian length;
//! - BER-TLV (ISO 7816-4 annex D): multi-byte tags with class and
//!   constructed bits, short- or long-form lengths.
//!
//! Decoding never recurses into constructed values: the value of a
//! constructed object is handed back opaque and the caller decides whether
//! to parse further. All functions here are pure and bounds-checked.

use bytes::Bytes;

/// Errors from TLV decoding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TlvError {
    /// The buffer ended inside a tag or length field
    #[error("buffer ended inside a TLV header")]
    UnexpectedEnd,

    /// A declared length exceeds the remaining buffer
    #[error("declared length {declared} exceeds {remaining} remaining byte(s)")]
    LengthOutOfBounds {
        /// Length declared by the header
        declared: usize,
        /// Bytes actually remaining after the header
        remaining: usize,
    },

    /// BER length uses the indefinite form, which cards do not emit
    #[error("indefinite BER length")]
    IndefiniteLength,

    /// A BER tag number does not fit the supported range
    #[error("BER tag number too large")]
    TagTooLarge,
}

/// A simple-format TLV object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    /// One-byte tag
    pub tag: u8,
    /// Raw value
    pub value: Bytes,
}

/// Parse the first simple TLV object in `buf`, returning it together with
/// the number of bytes consumed.
///
/// The length field is one byte, unless that byte is 0xFF in which case a
/// two-byte big-endian length follows.
pub fn parse_first_tlv(buf: &[u8]) -> Result<(Tlv, usize), TlvError> {
    if buf.len() < 2 {
        return Err(TlvError::UnexpectedEnd);
    }
    let tag = buf[0];
    let (len, header) = if buf[1] == 0xFF {
        if buf.len() < 4 {
            return Err(TlvError::UnexpectedEnd);
        }
        (usize::from(u16::from_be_bytes([buf[2], buf[3]])), 4)
    } else {
        (usize::from(buf[1]), 2)
    };

    let remaining = buf.len() - header;
    if len > remaining {
        return Err(TlvError::LengthOutOfBounds {
            declared: len,
            remaining,
        });
    }

    let value = Bytes::copy_from_slice(&buf[header..header + len]);
    Ok((Tlv { tag, value }, header + len))
}

/// Parse consecutive simple TLV objects until the buffer is exhausted or a
/// 0xFF padding tag is reached.
pub fn parse_tlv_sequence(buf: &[u8]) -> Result<Vec<Tlv>, TlvError> {
    let mut objects = Vec::new();
    let mut rest = buf;
    while !rest.is_empty() && rest[0] != 0xFF {
        let (tlv, consumed) = parse_first_tlv(rest)?;
        objects.push(tlv);
        rest = &rest[consumed..];
    }
    Ok(objects)
}

/// Encode a simple TLV object.
///
/// Lengths up to 0xFE use the one-byte form; longer values use the 0xFF
/// marker with a two-byte big-endian length.
pub fn encode_tlv(tag: u8, value: &[u8]) -> Bytes {
    let mut out = Vec::with_capacity(4 + value.len());
    out.push(tag);
    if value.len() <= 0xFE {
        out.push(value.len() as u8);
    } else {
        out.push(0xFF);
        out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    }
    out.extend_from_slice(value);
    Bytes::from(out)
}

/// Split a buffer of length-value pairs (one-byte lengths, no tags).
pub fn parse_lv(buf: &[u8]) -> Result<Vec<Bytes>, TlvError> {
    let mut values = Vec::new();
    let mut rest = buf;
    while !rest.is_empty() {
        let len = usize::from(rest[0]);
        let remaining = rest.len() - 1;
        if len > remaining {
            return Err(TlvError::LengthOutOfBounds {
                declared: len,
                remaining,
            });
        }
        values.push(Bytes::copy_from_slice(&rest[1..1 + len]));
        rest = &rest[1 + len..];
    }
    Ok(values)
}

/// BER tag class (bits 8-7 of the leading tag byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BerClass {
    /// Universal class (00)
    Universal,
    /// Application class (01)
    Application,
    /// Context-specific class (10)
    Context,
    /// Private class (11)
    Private,
}

/// A decoded BER tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BerTag {
    /// Tag class
    pub class: BerClass,
    /// Whether the value is constructed (contains nested objects)
    pub constructed: bool,
    /// Tag number
    pub number: u32,
}

/// A BER-TLV object. Constructed values are kept opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BerTlv {
    /// Decoded tag
    pub tag: BerTag,
    /// Raw value
    pub value: Bytes,
}

/// Parse the first BER-TLV object in `buf`, returning it together with the
/// number of bytes consumed.
pub fn parse_first_ber(buf: &[u8]) -> Result<(BerTlv, usize), TlvError> {
    let Some(&lead) = buf.first() else {
        return Err(TlvError::UnexpectedEnd);
    };

    let class = match lead >> 6 {
        0 => BerClass::Universal,
        1 => BerClass::Application,
        2 => BerClass::Context,
        _ => BerClass::Private,
    };
    let constructed = (lead >> 5) & 1 == 1;

    let mut pos = 1;
    let number = if lead & 0x1F == 0x1F {
        // high-tag-number form: 7 bits per continuation byte, high bit set
        // on all but the last
        let mut number: u32 = 0;
        loop {
            let Some(&byte) = buf.get(pos) else {
                return Err(TlvError::UnexpectedEnd);
            };
            pos += 1;
            number = number
                .checked_mul(128)
                .and_then(|n| n.checked_add(u32::from(byte & 0x7F)))
                .ok_or(TlvError::TagTooLarge)?;
            if byte & 0x80 == 0 {
                break;
            }
        }
        number
    } else {
        u32::from(lead & 0x1F)
    };

    let Some(&len_lead) = buf.get(pos) else {
        return Err(TlvError::UnexpectedEnd);
    };
    pos += 1;
    let len = if len_lead < 0x80 {
        usize::from(len_lead)
    } else {
        let count = usize::from(len_lead & 0x7F);
        if count == 0 {
            return Err(TlvError::IndefiniteLength);
        }
        if buf.len() < pos + count {
            return Err(TlvError::UnexpectedEnd);
        }
        let mut len = 0usize;
        for &byte in &buf[pos..pos + count] {
            len = len
                .checked_mul(256)
                .and_then(|l| l.checked_add(usize::from(byte)))
                .ok_or(TlvError::TagTooLarge)?;
        }
        pos += count;
        len
    };

    let remaining = buf.len() - pos;
    if len > remaining {
        return Err(TlvError::LengthOutOfBounds {
            declared: len,
            remaining,
        });
    }

    let value = Bytes::copy_from_slice(&buf[pos..pos + len]);
    Ok((
        BerTlv {
            tag: BerTag {
                class,
                constructed,
                number,
            },
            value,
        },
        pos + len,
    ))
}

/// Parse consecutive BER-TLV objects until the buffer is exhausted.
pub fn parse_ber_sequence(buf: &[u8]) -> Result<Vec<BerTlv>, TlvError> {
    let mut objects = Vec::new();
    let mut rest = buf;
    while !rest.is_empty() {
        let (tlv, consumed) = parse_first_ber(rest)?;
        objects.push(tlv);
        rest = &rest[consumed..];
    }
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_simple_tlv_roundtrip() {
        let encoded = encode_tlv(0x83, &hex!("3F00"));
        assert_eq!(encoded.as_ref(), &hex!("8302 3F00"));

        let (tlv, consumed) = parse_first_tlv(&encoded).unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(tlv.tag, 0x83);
        assert_eq!(tlv.value.as_ref(), &hex!("3F00"));
    }

    #[test]
    fn test_extended_length_roundtrip() {
        let value = vec![0xAB; 0x0123];
        let encoded = encode_tlv(0x73, &value);
        assert_eq!(&encoded[..4], &[0x73, 0xFF, 0x01, 0x23]);

        let (tlv, consumed) = parse_first_tlv(&encoded).unwrap();
        assert_eq!(consumed, 4 + 0x0123);
        assert_eq!(tlv.value.len(), 0x0123);
    }

    #[test]
    fn test_sequence_stops_at_padding() {
        let buf = hex!("8302 3F00 8801 17 FFFF FFFF");
        let objects = parse_tlv_sequence(&buf).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[1].tag, 0x88);
        assert_eq!(objects[1].value.as_ref(), &[0x17]);
    }

    #[test]
    fn test_simple_tlv_bounds() {
        assert_eq!(parse_first_tlv(&[0x83]), Err(TlvError::UnexpectedEnd));
        assert_eq!(
            parse_first_tlv(&hex!("8304 3F00")),
            Err(TlvError::LengthOutOfBounds {
                declared: 4,
                remaining: 2
            })
        );
    }

    #[test]
    fn test_lv_parsing() {
        let buf = hex!("04 01020304 02 AABB");
        let values = parse_lv(&buf).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].as_ref(), &hex!("01020304"));
        assert_eq!(values[1].as_ref(), &hex!("AABB"));

        assert!(parse_lv(&hex!("05 0102")).is_err());
    }

    #[test]
    fn test_ber_fcp_tag() {
        // 0x62: application class, constructed, tag number 2 (FCP template)
        let buf = hex!("6204 830225FF");
        let (tlv, consumed) = parse_first_ber(&buf).unwrap();
        assert_eq!(consumed, 6);
        assert_eq!(tlv.tag.class, BerClass::Application);
        assert!(tlv.tag.constructed);
        assert_eq!(tlv.tag.number, 2);
        assert_eq!(tlv.value.as_ref(), &hex!("830225FF"));
    }

    #[test]
    fn test_ber_high_tag_number() {
        // 0x1F in the low bits switches to continuation bytes:
        // 0x81 0x22 encodes 0x80 + 0x22 = 162
        let buf = hex!("5F 81 22 01 AA");
        let (tlv, consumed) = parse_first_ber(&buf).unwrap();
        assert_eq!(consumed, 5);
        assert_eq!(tlv.tag.number, 162);
        assert!(!tlv.tag.constructed);
        assert_eq!(tlv.value.as_ref(), &[0xAA]);
    }

    #[test]
    fn test_ber_long_form_length() {
        let mut buf = vec![0x62, 0x82, 0x01, 0x00];
        buf.extend(vec![0x00; 0x100]);
        let (tlv, consumed) = parse_first_ber(&buf).unwrap();
        assert_eq!(tlv.value.len(), 0x100);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn test_ber_rejects_overlong_value() {
        let buf = hex!("62 05 8302");
        assert_eq!(
            parse_first_ber(&buf),
            Err(TlvError::LengthOutOfBounds {
                declared: 5,
                remaining: 2
            })
        );
    }

    #[test]
    fn test_ber_rejects_indefinite_length() {
        assert_eq!(
            parse_first_ber(&hex!("62 80 00 00")),
            Err(TlvError::IndefiniteLength)
        );
    }
}
