//! Application identifier (AID) interpretation
//!
//! An AID starts with a five-byte registered identifier (RID) naming the
//! issuing body, followed by a proprietary application identifier
//! extension. For telecom AIDs (ETSI / 3GPP) the extension has a fixed
//! layout: application code, country code, provider code, then free bytes.

use bytes::Bytes;

/// ETSI registered identifier
pub const RID_ETSI: [u8; 5] = [0xA0, 0x00, 0x00, 0x00, 0x09];
/// 3GPP registered identifier
pub const RID_3GPP: [u8; 5] = [0xA0, 0x00, 0x00, 0x00, 0x87];
/// 3GPP2 registered identifier
pub const RID_3GPP2: [u8; 5] = [0xA0, 0x00, 0x00, 0x03, 0x43];
/// OneM2M registered identifier
pub const RID_ONEM2M: [u8; 5] = [0xA0, 0x00, 0x00, 0x06, 0x45];
/// OMA registered identifier
pub const RID_OMA: [u8; 5] = [0xA0, 0x00, 0x00, 0x04, 0x12];
/// WiMAX forum registered identifier
pub const RID_WIMAX: [u8; 5] = [0xA0, 0x00, 0x00, 0x04, 0x24];

/// 3GPP application code for the USIM application
pub const APP_3GPP_USIM: [u8; 2] = [0x10, 0x02];
/// 3GPP application code for the ISIM application
pub const APP_3GPP_ISIM: [u8; 2] = [0x10, 0x04];

/// Name of a registered identifier, if it is a known one
pub fn rid_name(rid: &[u8]) -> Option<&'static str> {
    Some(match rid {
        r if r == RID_ETSI => "ETSI",
        r if r == RID_3GPP => "3GPP",
        r if r == RID_3GPP2 => "3GPP2",
        r if r == RID_ONEM2M => "OneM2M",
        r if r == RID_OMA => "OMA",
        r if r == RID_WIMAX => "WiMAX Forum",
        [0xA0, 0x00, 0x00, 0x00, 0x03] | [0xA0, 0x00, 0x00, 0x01, 0x51] => "GlobalPlatform",
        _ => return None,
    })
}

/// Name of a 3GPP application code
pub fn app_name_3gpp(code: &[u8]) -> Option<&'static str> {
    Some(match code {
        c if c == APP_3GPP_USIM => "USIM",
        c if c == APP_3GPP_ISIM => "ISIM",
        _ => return None,
    })
}

/// Decomposed telecom AID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AidInfo {
    /// Registered identifier (5 bytes)
    pub rid: [u8; 5],
    /// Application code (2 bytes)
    pub app_code: [u8; 2],
    /// Country code (2 bytes)
    pub country: [u8; 2],
    /// Provider code (2 bytes)
    pub provider: [u8; 2],
    /// Remaining proprietary bytes
    pub proprietary: Bytes,
}

impl AidInfo {
    /// Decompose a telecom AID. Needs at least the 11 structured bytes.
    pub fn parse(aid: &[u8]) -> Option<Self> {
        if aid.len() < 11 {
            return None;
        }
        let mut rid = [0u8; 5];
        rid.copy_from_slice(&aid[..5]);
        Some(Self {
            rid,
            app_code: [aid[5], aid[6]],
            country: [aid[7], aid[8]],
            provider: [aid[9], aid[10]],
            proprietary: Bytes::copy_from_slice(&aid[11..]),
        })
    }

    /// Name of the issuing body, if known
    pub fn rid_name(&self) -> Option<&'static str> {
        rid_name(&self.rid)
    }

    /// Name of the application, if the RID and code are known
    pub fn app_name(&self) -> Option<&'static str> {
        if self.rid == RID_3GPP {
            app_name_3gpp(&self.app_code)
        } else {
            None
        }
    }
}

/// Whether an AID designates a 3GPP USIM application
pub fn is_usim_aid(aid: &[u8]) -> bool {
    aid.len() >= 7 && aid[..5] == RID_3GPP && aid[5..7] == APP_3GPP_USIM
}

/// Whether an AID designates a 3GPP ISIM application
pub fn is_isim_aid(aid: &[u8]) -> bool {
    aid.len() >= 7 && aid[..5] == RID_3GPP && aid[5..7] == APP_3GPP_ISIM
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_aid_decomposition() {
        let aid = hex!("A0000000871002 FF86 FF02 890607060203");
        let info = AidInfo::parse(&aid).unwrap();
        assert_eq!(info.rid, RID_3GPP);
        assert_eq!(info.rid_name(), Some("3GPP"));
        assert_eq!(info.app_name(), Some("USIM"));
        assert_eq!(info.app_code, APP_3GPP_USIM);
        assert_eq!(info.country, [0xFF, 0x86]);
        assert_eq!(info.provider, [0xFF, 0x02]);
        assert_eq!(info.proprietary.as_ref(), &hex!("890607060203"));
        assert!(is_usim_aid(&aid));
        assert!(!is_isim_aid(&aid));
    }

    #[test]
    fn test_short_aid_rejected() {
        assert!(AidInfo::parse(&hex!("A000000087")).is_none());
    }
}
