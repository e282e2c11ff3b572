//! File control information interpretation
//!
//! A successful SELECT returns a BER-TLV template describing the selected
//! file: an FCP template on UICCs (ETSI TS 102.221 §11.1.1.3), an FCI on
//! legacy cards. This module decodes those templates into [`FileInfo`],
//! keeping anything it cannot interpret as raw bytes rather than dropping
//! it.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::tlv::{self, BerClass, Tlv, TlvError};

/// Which control template the card returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// File control parameters (BER tag number 2)
    Fcp,
    /// File control information (BER tag number 15)
    Fci,
    /// File management data (BER tag number 4), kept opaque
    Fmd,
    /// Any other template tag number
    Unknown(u32),
}

/// File category from the file descriptor byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Dedicated file (directory), including the MF and ADFs
    Df,
    /// Working elementary file
    EfWorking,
    /// Internal elementary file
    EfInternal,
    /// Proprietary elementary file
    EfProprietary,
}

impl FileKind {
    /// Whether this is a directory of any sort
    pub const fn is_df(self) -> bool {
        matches!(self, Self::Df)
    }

    /// Whether this is an elementary file of any sort
    pub const fn is_ef(self) -> bool {
        !self.is_df()
    }
}

/// File structure from the file descriptor byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStructure {
    /// No structure information
    NoInfo,
    /// Transparent (byte-addressed)
    Transparent,
    /// Linear fixed records
    LinearFixed,
    /// Linear fixed records of TLV objects
    LinearFixedTlv,
    /// Linear variable records
    LinearVariable,
    /// Linear variable records of TLV objects
    LinearVariableTlv,
    /// Cyclic records
    Cyclic,
    /// Cyclic records of TLV objects
    CyclicTlv,
    /// DF supporting BER-TLV data objects
    BerTlvData,
    /// DF supporting simple TLV data objects
    TlvData,
    /// Reserved coding
    Rfu(u8),
}

impl FileStructure {
    /// Whether the file is read with READ RECORD rather than READ BINARY
    pub const fn is_record_based(self) -> bool {
        matches!(
            self,
            Self::LinearFixed
                | Self::LinearFixedTlv
                | Self::LinearVariable
                | Self::LinearVariableTlv
                | Self::Cyclic
                | Self::CyclicTlv
        )
    }
}

/// File life cycle status (tag 0x8A)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeCycle {
    /// Creation state
    Creation,
    /// Initialization state
    Initialization,
    /// Operational state, activated
    Activated,
    /// Operational state, deactivated
    Deactivated,
    /// Termination state
    Terminated,
    /// Proprietary coding
    Proprietary(u8),
    /// Reserved coding
    Rfu(u8),
}

impl LifeCycle {
    /// Decode the one-byte life cycle status
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0x01 => Self::Creation,
            0x03 => Self::Initialization,
            0x05 | 0x07 => Self::Activated,
            0x04 | 0x06 => Self::Deactivated,
            0x0C..=0x0E => Self::Terminated,
            b if b >= 0x10 => Self::Proprietary(b),
            b => Self::Rfu(b),
        }
    }
}

/// Condition under which an operation is granted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessCondition {
    /// Always allowed
    Always,
    /// Never allowed
    Never,
    /// Allowed subject to a security environment
    SecurityEnvironment {
        /// Security environment identifier (low nibble)
        seid: u8,
        /// All listed conditions must hold (vs. any one of them)
        all: bool,
        /// Secure messaging required
        secure_messaging: bool,
        /// External authentication required
        external_auth: bool,
        /// User authentication (PIN) required
        user_auth: bool,
    },
}

impl AccessCondition {
    /// Decode a compact-format security condition byte
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Self::Always,
            0xFF => Self::Never,
            b => Self::SecurityEnvironment {
                seid: b & 0x0F,
                all: b & 0x80 != 0,
                secure_messaging: b & 0x40 != 0,
                external_auth: b & 0x20 != 0,
                user_auth: b & 0x10 != 0,
            },
        }
    }
}

/// One operation / condition pair from a compact security attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRule {
    /// The governed operation
    pub operation: &'static str,
    /// The granting condition
    pub condition: AccessCondition,
}

// Access mode bit labels, most significant bit first (TS 102.221 §9.2.7)
const AM_LABELS_DF: [&str; 8] = [
    "proprietary",
    "DELETE FILE (self)",
    "TERMINATE DF",
    "ACTIVATE FILE",
    "DEACTIVATE FILE",
    "CREATE FILE (DF)",
    "CREATE FILE (EF)",
    "DELETE FILE (child)",
];

const AM_LABELS_EF: [&str; 8] = [
    "proprietary",
    "DELETE FILE",
    "TERMINATE EF",
    "ACTIVATE FILE",
    "DEACTIVATE FILE",
    "WRITE / APPEND RECORD",
    "UPDATE BINARY / RECORD",
    "READ BINARY / RECORD",
];

/// Decode a compact-format security attribute (tag 0x8C): an access mode
/// byte followed by one condition byte per set bit, most significant first.
pub fn parse_compact_security(data: &[u8], is_df: bool) -> Vec<AccessRule> {
    let Some((&am, mut conditions)) = data.split_first() else {
        return Vec::new();
    };
    let labels = if is_df { AM_LABELS_DF } else { AM_LABELS_EF };

    // bit 7 set marks a proprietary coding: bits 7-3 carry no standard
    // meaning and pair with no condition byte
    let proprietary = am & 0x80 != 0;

    let mut rules = Vec::new();
    for bit in (0..8).rev() {
        if proprietary && bit >= 3 {
            continue;
        }
        if (am >> bit) & 1 == 0 {
            continue;
        }
        let Some((&cond, rest)) = conditions.split_first() else {
            break;
        };
        conditions = rest;
        rules.push(AccessRule {
            operation: labels[7 - bit],
            condition: AccessCondition::from_byte(cond),
        });
    }
    rules
}

/// One key reference from the PIN status template (tag 0xC6)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinKeyRef {
    /// Key reference byte
    pub reference: u8,
    /// Human-readable name of the reference
    pub name: &'static str,
    /// Whether the PIN is enabled, from the PS_DO bitmap
    pub enabled: bool,
}

/// Name of a PIN key reference (TS 102.221 §9.5.1)
pub const fn keyref_name(reference: u8) -> &'static str {
    match reference {
        0x01..=0x08 => "PIN Application",
        0x0A => "ADM1",
        0x0B => "ADM2",
        0x0C => "ADM3",
        0x0D => "ADM4",
        0x0E => "ADM5",
        0x11 => "PIN Universal PIN",
        0x12..=0x1D => "RFU (Global)",
        0x81..=0x88 => "Second PIN Application",
        0x8A => "ADM6",
        0x8B => "ADM7",
        0x8C => "ADM8",
        0x8D => "ADM9",
        0x8E => "ADM10",
        0x90..=0x9E => "RFU (Local)",
        _ => "RFU",
    }
}

/// Decode a PIN status template (tag 0xC6): a PS_DO bitmap followed by key
/// reference objects. Bit n of the bitmap (most significant first) reports
/// whether the n-th listed key reference is enabled.
pub fn parse_pin_status(data: &[u8]) -> Result<Vec<PinKeyRef>, TlvError> {
    // PS_DO: tag 0x90, then one enabled-bit per key reference
    if data.len() < 2 {
        return Ok(Vec::new());
    }
    let ps_len = usize::from(data[1]);
    if data.len() < 2 + ps_len {
        return Err(TlvError::LengthOutOfBounds {
            declared: ps_len,
            remaining: data.len() - 2,
        });
    }
    let ps_do = &data[2..2 + ps_len];

    let mut refs = Vec::new();
    let mut index = 0usize;
    for tlv in tlv::parse_tlv_sequence(&data[2 + ps_len..])? {
        match tlv.tag {
            0x83 if !tlv.value.is_empty() => {
                let enabled = ps_do
                    .get(index / 8)
                    .is_some_and(|byte| (byte >> (7 - index % 8)) & 1 == 1);
                index += 1;
                refs.push(PinKeyRef {
                    reference: tlv.value[0],
                    name: keyref_name(tlv.value[0]),
                    enabled,
                });
            }
            // 0x95 usage qualifiers refine the preceding reference; the
            // enabled flag from the PS_DO is what matters for probing
            _ => {}
        }
    }
    Ok(refs)
}

/// Label for a nested proprietary information object (tag 0xA5)
pub const fn proprietary_label(tag: u8) -> Option<&'static str> {
    Some(match tag {
        0x80 => "UICC characteristics",
        0x81 => "application power consumption",
        0x82 => "minimum application clock frequency",
        0x83 => "available memory",
        0x84 => "file details",
        0x85 => "reserved file size",
        0x86 => "maximum file size",
        0x87 => "supported system commands",
        0x88 => "specific UICC environmental conditions",
        _ => return None,
    })
}

/// Data read out of an elementary file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EfData {
    /// Contents of a transparent EF
    Transparent(Bytes),
    /// Records of a record-structured EF, padding records dropped
    Records(Vec<Bytes>),
}

/// Everything known about a selected file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInfo {
    /// Which control template described the file
    pub control: Option<ControlKind>,
    /// File identifier (tag 0x83)
    pub file_id: Option<u16>,
    /// DF name / AID (tag 0x84)
    pub df_name: Option<Bytes>,
    /// Short file identifier (tag 0x88)
    pub short_id: Option<u8>,
    /// File category from the descriptor byte
    pub kind: Option<FileKind>,
    /// File structure from the descriptor byte
    pub structure: Option<FileStructure>,
    /// Shareable flag from the descriptor byte
    pub shareable: Option<bool>,
    /// Data coding byte, kept raw
    pub data_coding: Option<u8>,
    /// Record length for record-structured files
    pub record_len: Option<u16>,
    /// Number of records for record-structured files
    pub record_count: Option<u8>,
    /// File size in bytes (tag 0x80)
    pub size: Option<u32>,
    /// Total file size including structural overhead (tag 0x81)
    pub total_size: Option<u32>,
    /// Life cycle status (tag 0x8A)
    pub life_cycle: Option<LifeCycle>,
    /// Decoded compact security rules (tag 0x8C)
    pub security: Vec<AccessRule>,
    /// Security attributes kept raw (referenced/expanded formats etc.)
    pub security_raw: BTreeMap<u8, Bytes>,
    /// Nested proprietary information objects (tag 0xA5)
    pub proprietary: Vec<Tlv>,
    /// PIN status key references (tag 0xC6)
    pub pin_status: Vec<PinKeyRef>,
    /// FCI application template, kept verbatim (tag 0x61)
    pub application_template: Option<Bytes>,
    /// Well-known name of the file, when the identifier is standard
    pub name: Option<&'static str>,
    /// Tags this parser does not interpret, kept raw
    pub unknown: BTreeMap<u8, Bytes>,
    /// Remarks accumulated while reading the file
    pub notes: Vec<String>,
    /// File contents, filled in by the session after selection
    pub data: Option<EfData>,
}

impl FileInfo {
    /// Whether the file is a directory
    pub fn is_df(&self) -> bool {
        self.kind.is_some_and(FileKind::is_df)
    }
}

fn be_u32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

fn parse_descriptor(info: &mut FileInfo, data: &[u8]) {
    if data.len() != 2 && data.len() != 5 {
        info.notes
            .push(format!("file descriptor with unexpected length {}", data.len()));
        info.unknown.insert(0x82, Bytes::copy_from_slice(data));
        return;
    }
    let desc = data[0];
    info.shareable = Some((desc >> 6) & 1 == 1);
    info.data_coding = Some(data[1]);

    let structure = desc & 0x07;
    let file_type = (desc >> 3) & 0x07;
    info.kind = Some(match file_type {
        0 => FileKind::EfWorking,
        1 => FileKind::EfInternal,
        7 => FileKind::Df,
        _ => FileKind::EfProprietary,
    });
    let base = match structure {
        0 => FileStructure::NoInfo,
        1 => FileStructure::Transparent,
        2 => FileStructure::LinearFixed,
        3 => FileStructure::LinearFixedTlv,
        4 => FileStructure::LinearVariable,
        5 => FileStructure::LinearVariableTlv,
        6 => FileStructure::Cyclic,
        7 => FileStructure::CyclicTlv,
        s => FileStructure::Rfu(s),
    };
    // for a DF, structure codes 1 and 2 declare data object support; the
    // other codes keep their base meaning
    info.structure = Some(if file_type == 7 {
        match structure {
            1 => FileStructure::BerTlvData,
            2 => FileStructure::TlvData,
            _ => base,
        }
    } else {
        base
    });

    if data.len() == 5 {
        info.record_len = Some(u16::from_be_bytes([data[2], data[3]]));
        info.record_count = Some(data[4]);
    }
}

/// Decode the response payload of a SELECT into a [`FileInfo`].
///
/// The payload must be a single BER-TLV template. FMD and unknown
/// templates are preserved opaque under their raw tag.
pub fn parse_select_response(payload: &[u8]) -> Result<FileInfo, TlvError> {
    let (template, _) = tlv::parse_first_ber(payload)?;

    let mut info = FileInfo::default();
    match (template.tag.class, template.tag.number) {
        (BerClass::Application, 2) => info.control = Some(ControlKind::Fcp),
        (BerClass::Application, 15) => info.control = Some(ControlKind::Fci),
        (BerClass::Application, 4) => {
            info.control = Some(ControlKind::Fmd);
            info.unknown.insert(0x64, template.value);
            return Ok(info);
        }
        (_, n) => {
            info.control = Some(ControlKind::Unknown(n));
            info.unknown.insert(0x00, template.value);
            return Ok(info);
        }
    }

    // the compact security attribute needs the file kind, which may be
    // declared by a later descriptor; decode it after the loop
    let mut compact_security = None;

    for tlv in tlv::parse_tlv_sequence(&template.value)? {
        match tlv.tag {
            0x80 => info.size = Some(be_u32(&tlv.value)),
            0x81 => info.total_size = Some(be_u32(&tlv.value)),
            0x82 => parse_descriptor(&mut info, &tlv.value),
            0x83 if tlv.value.len() == 2 => {
                info.file_id = Some(u16::from_be_bytes([tlv.value[0], tlv.value[1]]));
            }
            0x84 => info.df_name = Some(tlv.value),
            0x88 if tlv.value.len() == 1 => info.short_id = Some(tlv.value[0]),
            0x8A if tlv.value.len() == 1 => {
                info.life_cycle = Some(LifeCycle::from_byte(tlv.value[0]));
            }
            0x8C => compact_security = Some(tlv.value),
            0x86 | 0x8B | 0x8E | 0xA0 | 0xA1 | 0xAB => {
                info.security_raw.insert(tlv.tag, tlv.value);
            }
            0xA5 => info.proprietary = tlv::parse_tlv_sequence(&tlv.value)?,
            0xC6 => info.pin_status = parse_pin_status(&tlv.value)?,
            0x61 => info.application_template = Some(tlv.value),
            tag => {
                info.unknown.insert(tag, tlv.value);
            }
        }
    }

    if let Some(data) = compact_security {
        info.security = parse_compact_security(&data, info.is_df());
    }

    if let Some(fid) = info.file_id {
        info.name = file_name(fid);
    }
    Ok(info)
}

/// Well-known file identifiers (ETSI TS 102.221 / 3GPP TS 31.102)
pub const fn file_name(fid: u16) -> Option<&'static str> {
    Some(match fid {
        0x3F00 => "MF",
        0x2F00 => "EF_DIR",
        0x2F01 => "EF_ATR",
        0x2F05 => "EF_PL",
        0x2F06 => "EF_ARR",
        0x2FE2 => "EF_ICCID",
        0x7FFF => "current ADF",
        0x7F10 => "DF_TELECOM",
        0x5F50 => "DF_GRAPHICS",
        0x5F3A => "DF_PHONEBOOK",
        0x7F20 => "DF_GSM",
        0x7F21 => "DF_DCS1800",
        0x7F22 => "DF_IS-41",
        0x7F23 => "DF_FP-CTS",
        0x7F24 => "DF_TIA-EIA136",
        0x7F25 => "DF_TIA-EIA95",
        0x7F31 => "DF_iDEN",
        0x7F80 => "DF_PDC",
        0x7F90 => "DF_TETRA",
        _ => return None,
    })
}
