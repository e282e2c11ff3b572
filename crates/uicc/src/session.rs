//! Card sessions: selection, reading, authentication and PIN management
//!
//! A [`CardSession`] wraps a [`CardExecutor`] with the protocol state a
//! (U)SIM conversation needs: the card profile (UICC vs. legacy SIM class
//! bytes), the telecom status word bands, and the SELECT / GET RESPONSE
//! dance that precedes every file read.

use bytes::Bytes;
use cardprobe_apdu_core::{
    CardExecutor, CardTransport, Command, Response, StatusKind, StatusOutcome, StatusWord,
    interpret,
};
use tracing::{debug, warn};

use crate::aid;
use crate::attrs::{self, EfData, FileInfo, FileStructure};
use crate::error::UiccError;
use crate::util;

/// Result type alias for UICC operations
pub type Result<T> = core::result::Result<T, UiccError>;

/// Card generation, deciding class byte and status word dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardProfile {
    /// UICC (ETSI TS 102.221): class 0x00, pending data via SW1 0x61
    Uicc,
    /// Legacy SIM (GSM TS 11.11): class 0xA0, pending data via SW1 0x9F
    Sim,
}

impl CardProfile {
    /// Class byte for this card generation
    pub const fn cla(self) -> u8 {
        match self {
            Self::Uicc => 0x00,
            Self::Sim => 0xA0,
        }
    }

    /// P2 for SELECT requesting file control parameters
    pub const fn select_p2(self) -> u8 {
        match self {
            Self::Uicc => 0x04,
            Self::Sim => 0x00,
        }
    }

    /// SW1 announcing data pending retrieval via GET RESPONSE
    pub const fn more_data_sw1(self) -> u8 {
        match self {
            Self::Uicc => 0x61,
            Self::Sim => 0x9F,
        }
    }
}

/// Interpret a status word under the telecom bands of the given profile,
/// falling back to the ISO 7816-4 taxonomy for everything else.
///
/// Remains total over the full (SW1, SW2) space.
pub fn interpret_for_profile(profile: CardProfile, sw: StatusWord) -> StatusOutcome {
    let out = |kind, detail: &str| StatusOutcome::new(kind, detail);
    match (sw.sw1, sw.sw2) {
        (0x91, n) => StatusOutcome::new(
            StatusKind::Success,
            format!(
                "normal processing: command accepted: proactive command pending, {n} bytes of response data"
            ),
        ),
        (0x9E, n) => StatusOutcome::new(
            StatusKind::Warning,
            format!("SIM data download error: {n} bytes of response data"),
        ),
        (0x9F, n) => StatusOutcome::new(
            StatusKind::MoreData(n),
            format!("normal processing: {n} bytes of response data"),
        ),
        (0x92, n) if n < 0x10 => StatusOutcome::new(
            StatusKind::Warning,
            format!("command successful after {n} internal update retries"),
        ),
        (0x92, 0x40) => out(StatusKind::ExecutionError, "memory problem"),
        (0x93, 0x00) => out(StatusKind::ExecutionError, "SIM application toolkit busy"),
        (0x94, 0x00) => out(StatusKind::CheckingError, "no EF selected"),
        (0x94, 0x02) => out(StatusKind::CheckingError, "out of range (invalid address)"),
        (0x94, 0x04) => out(StatusKind::CheckingError, "file ID or pattern not found"),
        (0x94, 0x08) => out(
            StatusKind::CheckingError,
            "file inconsistent with the command",
        ),
        (0x98, 0x02) => out(StatusKind::CheckingError, "no PIN initialized"),
        (0x98, 0x04) => out(
            StatusKind::CheckingError,
            "access condition not fulfilled: unsuccessful PIN verification or authentication failed",
        ),
        (0x98, 0x08) => out(StatusKind::CheckingError, "in contradiction with PIN status"),
        (0x98, 0x10) => out(
            StatusKind::CheckingError,
            "in contradiction with invalidation status",
        ),
        (0x98, 0x40) => out(
            StatusKind::CheckingError,
            "unsuccessful PIN verification, no attempt left: PIN blocked",
        ),
        (0x98, 0x50) => out(
            StatusKind::CheckingError,
            "INCREASE cannot be performed, maximum value reached",
        ),
        (0x98, 0x62) if profile == CardProfile::Uicc => out(
            StatusKind::CheckingError,
            "authentication error, application specific",
        ),
        (0x98, 0x64) if profile == CardProfile::Uicc => out(
            StatusKind::CheckingError,
            "authentication error, security context not supported",
        ),
        (0x98, 0x65) if profile == CardProfile::Uicc => {
            out(StatusKind::CheckingError, "key freshness failure")
        }
        (0x98, 0x66) if profile == CardProfile::Uicc => out(
            StatusKind::CheckingError,
            "authentication error, no memory space available",
        ),
        (0x98, 0x67) if profile == CardProfile::Uicc => out(
            StatusKind::CheckingError,
            "authentication error, no memory space available in EF_MUK",
        ),
        _ => interpret(sw),
    }
}

/// How SELECT addresses its target (ISO 7816-4 table 39)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMode {
    /// By two-byte file identifier
    ById,
    /// By path from the MF, MF identifier omitted
    PathFromMf,
    /// By path from the current DF
    PathFromCurrent,
    /// By DF name (AID)
    ByName,
}

impl SelectMode {
    /// P1 encoding of the addressing mode
    pub const fn p1(self) -> u8 {
        match self {
            Self::ById => 0x00,
            Self::PathFromMf => 0x08,
            Self::PathFromCurrent => 0x09,
            Self::ByName => 0x04,
        }
    }
}

/// GSM security context (2G): RAND in, SRES and Kc out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// 2G authentication result
    Gsm {
        /// Signed response (4 bytes)
        sres: Bytes,
        /// Cipher key Kc (8 bytes)
        kc: Bytes,
    },
    /// 3G authentication result
    Umts {
        /// Authentication response
        res: Bytes,
        /// Cipher key
        ck: Bytes,
        /// Integrity key
        ik: Bytes,
        /// Derived GSM cipher key, if the card provides one
        kc: Option<Bytes>,
    },
    /// GBA bootstrapping result
    Gba {
        /// Authentication response
        res: Bytes,
    },
    /// Sequence number desynchronization: resynchronize with AUTS
    SyncFailure {
        /// Resynchronization token
        auts: Bytes,
    },
}

/// Result of a PIN management command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinOutcome {
    /// The card accepted the code
    Accepted,
    /// The card refused, with the refusing status word
    Refused(StatusWord),
}

/// Stateful conversation with a (U)SIM card
#[derive(Debug)]
pub struct CardSession<T: CardTransport> {
    executor: CardExecutor<T>,
    profile: CardProfile,
    /// AIDs read from EF_DIR, cached after the first lookup
    aids: Option<Vec<Bytes>>,
}

impl<T: CardTransport> CardSession<T> {
    /// Create a session over an existing executor
    pub const fn new(executor: CardExecutor<T>, profile: CardProfile) -> Self {
        Self {
            executor,
            profile,
            aids: None,
        }
    }

    /// Create a session directly from a transport
    pub fn from_transport(transport: T, profile: CardProfile) -> Self {
        Self::new(CardExecutor::new(transport), profile)
    }

    /// The card profile this session speaks
    pub const fn profile(&self) -> CardProfile {
        self.profile
    }

    /// The underlying executor
    pub const fn executor(&self) -> &CardExecutor<T> {
        &self.executor
    }

    /// Mutable access to the underlying executor
    pub const fn executor_mut(&mut self) -> &mut CardExecutor<T> {
        &mut self.executor
    }

    /// Interpret a status word under this session's profile
    pub fn interpret(&self, sw: StatusWord) -> StatusOutcome {
        interpret_for_profile(self.profile, sw)
    }

    fn transmit(&mut self, command: &Command) -> Result<Response> {
        self.executor.transmit(command).map_err(UiccError::from)
    }

    /// Select a file, returning its decoded attributes on success.
    ///
    /// A card refusing the selection (file not found, access denied) yields
    /// `Ok(None)`; only transport and decoding failures are errors. On
    /// success the contents of elementary files are read automatically.
    pub fn select(&mut self, mode: SelectMode, addr: &[u8]) -> Result<Option<FileInfo>> {
        let cmd = Command::select_file(self.profile.cla(), mode.p1(), self.profile.select_p2(), addr);
        let resp = self.transmit(&cmd)?;
        let sw = resp.status();

        if sw.sw1 != self.profile.more_data_sw1() {
            debug!(addr = %hex::encode_upper(addr), %sw, detail = %self.interpret(sw), "selection refused");
            return Ok(None);
        }

        let resp = self.transmit(&Command::get_response(self.profile.cla(), sw.sw2))?;
        if !resp.is_success() {
            warn!(sw = %resp.status(), "GET RESPONSE refused after selection");
            return Ok(None);
        }

        let payload = resp.into_payload().unwrap_or_default();
        let mut info = attrs::parse_select_response(&payload)?;

        // some cards omit tag 0x83; fall back to the requested identifier
        if info.file_id.is_none() && mode == SelectMode::ById && addr.len() == 2 {
            let fid = u16::from_be_bytes([addr[0], addr[1]]);
            info.file_id = Some(fid);
            info.name = attrs::file_name(fid);
        }

        self.read_ef_data(&mut info)?;
        Ok(Some(info))
    }

    /// Select a file by its two-byte identifier
    pub fn select_by_id(&mut self, fid: u16) -> Result<Option<FileInfo>> {
        self.select(SelectMode::ById, &fid.to_be_bytes())
    }

    /// Select a file by path from the MF (MF identifier omitted)
    pub fn select_path_from_mf(&mut self, path: &[u16]) -> Result<Option<FileInfo>> {
        let mut addr = Vec::with_capacity(path.len() * 2);
        for fid in path {
            addr.extend_from_slice(&fid.to_be_bytes());
        }
        self.select(SelectMode::PathFromMf, &addr)
    }

    /// Select an application by DF name
    pub fn select_by_name(&mut self, name: &[u8]) -> Result<Option<FileInfo>> {
        self.select(SelectMode::ByName, name)
    }

    /// Select the master file
    pub fn select_mf(&mut self) -> Result<Option<FileInfo>> {
        self.select_by_id(0x3F00)
    }

    /// Re-establish a known position: MF, optionally an ADF, then each
    /// directory of `path` in order. Any refused step is an error since the
    /// session would otherwise sit in an unknown directory.
    pub fn go_to_path(&mut self, path: &[u16], under_aid: Option<&[u8]>) -> Result<()> {
        if self.select_mf()?.is_none() {
            return Err(UiccError::PathUnavailable("MF".to_string()));
        }
        if let Some(name) = under_aid {
            if self.select_by_name(name)?.is_none() {
                return Err(UiccError::PathUnavailable(format!(
                    "ADF {}",
                    hex::encode_upper(name)
                )));
            }
        }
        for (depth, &fid) in path.iter().enumerate() {
            if self.select_by_id(fid)?.is_none() {
                let walked: Vec<String> = path[..=depth]
                    .iter()
                    .map(|f| format!("{f:04X}"))
                    .collect();
                return Err(UiccError::PathUnavailable(walked.join("/")));
            }
        }
        Ok(())
    }

    /// Read the contents of an elementary file whose attributes are already
    /// known, storing them (and any remarks) back into `info`.
    ///
    /// Only the short READ BINARY / READ RECORD forms are used: transparent
    /// files and records beyond 255 bytes are truncated, with a note. A
    /// refused read keeps whatever was read so far.
    pub fn read_ef_data(&mut self, info: &mut FileInfo) -> Result<()> {
        if !info.kind.is_some_and(attrs::FileKind::is_ef) {
            return Ok(());
        }
        let cla = self.profile.cla();

        match info.structure {
            Some(FileStructure::Transparent) => {
                let Some(size) = info.size else {
                    return Ok(());
                };
                if size == 0 {
                    info.data = Some(EfData::Transparent(Bytes::new()));
                    return Ok(());
                }
                if size > 255 {
                    info.notes.push(format!(
                        "transparent EF of {size} bytes exceeds a short read, truncating to 255"
                    ));
                }
                let le = size.min(255) as u8;
                let resp = self.transmit(&Command::read_binary(cla, 0x00, 0x00, le))?;
                if resp.is_success() {
                    info.data = Some(EfData::Transparent(resp.into_payload().unwrap_or_default()));
                } else {
                    info.notes
                        .push(format!("READ BINARY refused: {}", self.interpret(resp.status())));
                }
            }
            Some(s) if s.is_record_based() => {
                let Some(record_len) = info.record_len else {
                    return Ok(());
                };
                let count = info.record_count.map(u16::from).unwrap_or_else(|| {
                    // older cards omit the record count; derive it
                    info.size
                        .map_or(0, |size| (size / u32::from(record_len.max(1))) as u16)
                });
                if record_len > 255 {
                    info.notes.push(format!(
                        "records of {record_len} bytes exceed a short read, truncating to 255"
                    ));
                }
                let le = record_len.min(255) as u8;

                let mut records = Vec::new();
                for n in 1..=count.min(255) {
                    let resp = self.transmit(&Command::read_record(cla, n as u8, 0x04, le))?;
                    if !resp.is_success() {
                        info.notes.push(format!(
                            "READ RECORD {n} refused: {}, keeping {} record(s)",
                            self.interpret(resp.status()),
                            records.len()
                        ));
                        break;
                    }
                    let record = resp.into_payload().unwrap_or_default();
                    // records of nothing but 0xFF are unwritten padding
                    if record.iter().all(|&b| b == 0xFF) {
                        continue;
                    }
                    records.push(record);
                }
                info.data = Some(EfData::Records(records));
            }
            _ => {}
        }
        Ok(())
    }

    /// AIDs of the applications listed in EF_DIR, cached after the first
    /// read. Cards without an EF_DIR yield an empty list.
    pub fn application_ids(&mut self) -> Result<Vec<Bytes>> {
        if let Some(aids) = &self.aids {
            return Ok(aids.clone());
        }
        let mut aids = Vec::new();
        if let Some(dir) = self.select_path_from_mf(&[0x2F00])? {
            if let Some(EfData::Records(records)) = &dir.data {
                for record in records {
                    // application template 0x61 wrapping an AID object 0x4F
                    if record.len() >= 4 && record[0] == 0x61 && record[2] == 0x4F {
                        let len = usize::from(record[3]);
                        if record.len() >= 4 + len {
                            aids.push(Bytes::copy_from_slice(&record[4..4 + len]));
                        }
                    }
                }
            }
        }
        self.aids = Some(aids.clone());
        Ok(aids)
    }

    /// Select the USIM application via EF_DIR, if the card carries one
    pub fn select_usim(&mut self) -> Result<Option<FileInfo>> {
        let Some(target) = self
            .application_ids()?
            .into_iter()
            .find(|a| aid::is_usim_aid(a))
        else {
            return Ok(None);
        };
        self.select_by_name(&target)
    }

    /// Select the ISIM application via EF_DIR, if the card carries one
    pub fn select_isim(&mut self) -> Result<Option<FileInfo>> {
        let Some(target) = self
            .application_ids()?
            .into_iter()
            .find(|a| aid::is_isim_aid(a))
        else {
            return Ok(None);
        };
        self.select_by_name(&target)
    }

    /// Read the ICCID from EF_ICCID under the MF
    pub fn iccid(&mut self) -> Result<Option<String>> {
        let Some(info) = self.select_path_from_mf(&[0x2FE2])? else {
            return Ok(None);
        };
        let Some(EfData::Transparent(data)) = &info.data else {
            return Ok(None);
        };
        Ok(Some(util::decode_bcd(data)))
    }

    /// Read the IMSI from EF_IMSI in the current directory.
    ///
    /// The caller must have selected the USIM ADF or DF_GSM first. The file
    /// holds a length byte then the IMSI in swapped BCD; the first three
    /// decoded digits (length and parity nibbles) are dropped.
    pub fn imsi(&mut self) -> Result<Option<String>> {
        let Some(info) = self.select_by_id(0x6F07)? else {
            return Ok(None);
        };
        let Some(EfData::Transparent(data)) = &info.data else {
            return Ok(None);
        };
        if data.len() < 9 {
            return Err(UiccError::ResponseFormat("IMSI file shorter than 9 bytes"));
        }
        Ok(Some(util::decode_bcd(data).chars().skip(3).collect()))
    }

    /// Run AUTHENTICATE and fetch the result advertised by the card
    fn run_authenticate(&mut self, p2: u8, data: &[u8]) -> Result<Option<Bytes>> {
        let cla = self.profile.cla();
        let resp = self.transmit(&Command::internal_authenticate(cla, 0x00, p2, data))?;
        let sw = resp.status();

        if sw.sw1 == 0x61 || sw.sw1 == 0x9F {
            let resp = self.transmit(&Command::get_response(cla, sw.sw2))?;
            if resp.is_success() {
                return Ok(resp.into_payload());
            }
            warn!(sw = %resp.status(), "GET RESPONSE refused after AUTHENTICATE");
            return Ok(None);
        }
        if resp.is_success() {
            return Ok(resp.into_payload());
        }
        debug!(%sw, detail = %self.interpret(sw), "authentication refused");
        Ok(None)
    }

    /// 2G (GSM) authentication: RAND in, SRES and Kc out
    pub fn authenticate_gsm(&mut self, rand: &[u8]) -> Result<Option<AuthOutcome>> {
        let data = lv_concat(&[rand]);
        let Some(payload) = self.run_authenticate(0x80, &data)? else {
            return Ok(None);
        };
        let values = crate::tlv::parse_lv(&payload)?;
        let [sres, kc] = values.as_slice() else {
            return Err(UiccError::ResponseFormat(
                "2G authentication response is not two length-value pairs",
            ));
        };
        Ok(Some(AuthOutcome::Gsm {
            sres: sres.clone(),
            kc: kc.clone(),
        }))
    }

    /// 3G (UMTS) authentication: RAND and AUTN in, RES/CK/IK (or AUTS on
    /// sequence number desynchronization) out
    pub fn authenticate_umts(&mut self, rand: &[u8], autn: &[u8]) -> Result<Option<AuthOutcome>> {
        let data = lv_concat(&[rand, autn]);
        let Some(payload) = self.run_authenticate(0x81, &data)? else {
            return Ok(None);
        };
        parse_umts_outcome(&payload).map(Some)
    }

    /// GBA bootstrapping mode authentication
    pub fn authenticate_gba(&mut self, rand: &[u8], autn: &[u8]) -> Result<Option<AuthOutcome>> {
        let mut data = vec![0xDD];
        data.extend_from_slice(&lv_concat(&[rand, autn]));
        let Some(payload) = self.run_authenticate(0x84, &data)? else {
            return Ok(None);
        };
        match payload.first() {
            Some(0xDB) => {
                let values = crate::tlv::parse_lv(&payload[1..])?;
                let [res] = values.as_slice() else {
                    return Err(UiccError::ResponseFormat(
                        "GBA bootstrap response is not a single length-value pair",
                    ));
                };
                Ok(Some(AuthOutcome::Gba { res: res.clone() }))
            }
            Some(0xDC) => parse_sync_failure(&payload[1..]).map(Some),
            _ => Err(UiccError::ResponseFormat(
                "GBA bootstrap response with unknown leading tag",
            )),
        }
    }

    /// GBA NAF derivation mode: derive the Ks_ext_NAF key for a NAF
    pub fn gba_naf_derivation(&mut self, naf_id: &[u8], impi: &[u8]) -> Result<Option<Bytes>> {
        let mut data = vec![0xDE];
        data.extend_from_slice(&lv_concat(&[naf_id, impi]));
        let Some(payload) = self.run_authenticate(0x84, &data)? else {
            return Ok(None);
        };
        if payload.first() != Some(&0xDB) {
            return Err(UiccError::ResponseFormat(
                "NAF derivation response with unknown leading tag",
            ));
        }
        let values = crate::tlv::parse_lv(&payload[1..])?;
        let [ks_ext_naf] = values.as_slice() else {
            return Err(UiccError::ResponseFormat(
                "NAF derivation response is not a single length-value pair",
            ));
        };
        Ok(Some(ks_ext_naf.clone()))
    }

    /// VERIFY a PIN against the given key reference
    pub fn verify_pin(&mut self, pin: &str, reference: u8) -> Result<PinOutcome> {
        let body = encode_pin(pin)?;
        let resp = self.transmit(&Command::verify(self.profile.cla(), reference, &body))?;
        Ok(self.pin_outcome("VERIFY", resp.status()))
    }

    /// Disable PIN verification for the given key reference
    pub fn disable_pin(&mut self, pin: &str, reference: u8) -> Result<PinOutcome> {
        let body = encode_pin(pin)?;
        let resp = self.transmit(&Command::disable_pin(
            self.profile.cla(),
            0x00,
            reference,
            &body,
        ))?;
        Ok(self.pin_outcome("DISABLE PIN", resp.status()))
    }

    /// Enable PIN verification for the given key reference
    pub fn enable_pin(&mut self, pin: &str, reference: u8) -> Result<PinOutcome> {
        let body = encode_pin(pin)?;
        let resp = self.transmit(&Command::enable_pin(
            self.profile.cla(),
            0x00,
            reference,
            &body,
        ))?;
        Ok(self.pin_outcome("ENABLE PIN", resp.status()))
    }

    /// Unblock a PIN with its unblock code and set a new PIN
    pub fn unblock_pin(&mut self, unblock_code: &str, new_pin: &str, reference: u8) -> Result<PinOutcome> {
        let mut body = encode_pin(unblock_code)?.to_vec();
        body.extend_from_slice(&encode_pin(new_pin)?);
        let resp = self.transmit(&Command::unblock_pin(self.profile.cla(), reference, &body))?;
        Ok(self.pin_outcome("UNBLOCK PIN", resp.status()))
    }

    fn pin_outcome(&self, operation: &'static str, sw: StatusWord) -> PinOutcome {
        if sw.is_success() {
            PinOutcome::Accepted
        } else {
            debug!(%operation, %sw, detail = %self.interpret(sw), "PIN command refused");
            PinOutcome::Refused(sw)
        }
    }
}

/// Concatenate byte strings as length-value pairs
fn lv_concat(parts: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for part in parts {
        out.push(part.len().min(255) as u8);
        out.extend_from_slice(&part[..part.len().min(255)]);
    }
    out
}

/// Encode a 4-8 digit PIN as ASCII padded to 8 bytes with 0xFF
fn encode_pin(pin: &str) -> Result<[u8; 8]> {
    if !(4..=8).contains(&pin.len()) || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UiccError::InvalidPin("expected 4 to 8 decimal digits"));
    }
    let mut body = [0xFFu8; 8];
    body[..pin.len()].copy_from_slice(pin.as_bytes());
    Ok(body)
}

fn parse_umts_outcome(payload: &[u8]) -> Result<AuthOutcome> {
    match payload.first() {
        Some(0xDB) => {
            let values = crate::tlv::parse_lv(&payload[1..])?;
            match values.as_slice() {
                [res, ck, ik] => Ok(AuthOutcome::Umts {
                    res: res.clone(),
                    ck: ck.clone(),
                    ik: ik.clone(),
                    kc: None,
                }),
                [res, ck, ik, kc] => Ok(AuthOutcome::Umts {
                    res: res.clone(),
                    ck: ck.clone(),
                    ik: ik.clone(),
                    kc: Some(kc.clone()),
                }),
                _ => Err(UiccError::ResponseFormat(
                    "3G authentication response with unexpected value count",
                )),
            }
        }
        Some(0xDC) => parse_sync_failure(&payload[1..]),
        _ => Err(UiccError::ResponseFormat(
            "3G authentication response with unknown leading tag",
        )),
    }
}

fn parse_sync_failure(payload: &[u8]) -> Result<AuthOutcome> {
    let values = crate::tlv::parse_lv(payload)?;
    let [auts] = values.as_slice() else {
        return Err(UiccError::ResponseFormat(
            "synchronization failure response is not a single length-value pair",
        ));
    };
    Ok(AuthOutcome::SyncFailure { auts: auts.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ScriptTransport;
    use hex_literal::hex;

    fn uicc_session(responses: &[&[u8]]) -> CardSession<ScriptTransport> {
        CardSession::from_transport(ScriptTransport::new(responses), CardProfile::Uicc)
    }

    #[test]
    fn test_select_refused_yields_none() {
        let mut session = uicc_session(&[&hex!("6A82")]);
        let info = session.select_by_id(0x7F99).unwrap();
        assert!(info.is_none());
    }

    #[test]
    fn test_select_reads_transparent_ef() {
        let mut session = uicc_session(&[
            // SELECT announces 0x0E pending bytes
            &hex!("610E"),
            // GET RESPONSE: FCP for a 2-byte transparent EF
            &hex!("620C 8202 4121 8302 2FE2 8002 0002 9000"),
            // READ BINARY
            &hex!("AABB 9000"),
        ]);
        let info = session.select_by_id(0x2FE2).unwrap().unwrap();
        assert_eq!(info.file_id, Some(0x2FE2));
        assert_eq!(info.name, Some("EF_ICCID"));
        assert_eq!(
            info.data,
            Some(EfData::Transparent(Bytes::from_static(&hex!("AABB"))))
        );

        // READ BINARY was issued with Le equal to the declared size
        let sent = session.executor().transport().sent();
        assert_eq!(sent[2].as_ref(), &hex!("00B0000002"));
    }

    #[test]
    fn test_record_ef_drops_padding_records() {
        let mut session = uicc_session(&[
            &hex!("6111"),
            // FCP: linear fixed, record length 4, 3 records
            &hex!("620F 8205 4221000403 8302 6F3A 8002 000C 9000"),
            &hex!("01020304 9000"),
            &hex!("FFFFFFFF 9000"),
            &hex!("0A0B0C0D 9000"),
        ]);
        let info = session.select_by_id(0x6F3A).unwrap().unwrap();
        let Some(EfData::Records(records)) = &info.data else {
            panic!("expected records");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].as_ref(), &hex!("01020304"));
        assert_eq!(records[1].as_ref(), &hex!("0A0B0C0D"));
    }

    #[test]
    fn test_record_read_failure_keeps_partial_data() {
        let mut session = uicc_session(&[
            &hex!("6111"),
            &hex!("620F 8205 4221000403 8302 6F3A 8002 000C 9000"),
            &hex!("01020304 9000"),
            &hex!("6982"),
        ]);
        let info = session.select_by_id(0x6F3A).unwrap().unwrap();
        let Some(EfData::Records(records)) = &info.data else {
            panic!("expected records");
        };
        assert_eq!(records.len(), 1);
        assert!(info.notes.iter().any(|n| n.contains("READ RECORD 2")));
    }

    #[test]
    fn test_telco_status_bands() {
        let sw = StatusWord::new(0x9F, 0x10);
        assert_eq!(
            interpret_for_profile(CardProfile::Sim, sw).kind,
            StatusKind::MoreData(0x10)
        );

        let sw = StatusWord::new(0x98, 0x04);
        let outcome = interpret_for_profile(CardProfile::Sim, sw);
        assert_eq!(outcome.kind, StatusKind::CheckingError);
        assert!(outcome.detail.contains("access condition not fulfilled"));

        // UICC-only authentication band
        let sw = StatusWord::new(0x98, 0x65);
        assert!(
            interpret_for_profile(CardProfile::Uicc, sw)
                .detail
                .contains("key freshness")
        );
        assert_eq!(
            interpret_for_profile(CardProfile::Sim, sw).kind,
            StatusKind::Undefined
        );

        // everything else falls back to the ISO taxonomy
        let sw = StatusWord::new(0x6A, 0x82);
        assert!(
            interpret_for_profile(CardProfile::Uicc, sw)
                .detail
                .contains("file not found")
        );
    }

    #[test]
    fn test_authenticate_umts_success() {
        let mut session = uicc_session(&[
            &hex!("6120"),
            // 0xDB, then RES(4) CK(3) IK(3) as length-value pairs
            &hex!("DB 04 01020304 03 0A0B0C 03 0D0E0F 9000"),
        ]);
        let outcome = session
            .authenticate_umts(&[0x55; 16], &[0x66; 16])
            .unwrap()
            .unwrap();
        let AuthOutcome::Umts { res, ck, ik, kc } = outcome else {
            panic!("expected 3G outcome");
        };
        assert_eq!(res.as_ref(), &hex!("01020304"));
        assert_eq!(ck.as_ref(), &hex!("0A0B0C"));
        assert_eq!(ik.as_ref(), &hex!("0D0E0F"));
        assert!(kc.is_none());

        // AUTHENTICATE carried both challenges as length-value pairs
        let sent = session.executor().transport().sent();
        assert_eq!(sent[0][..5], hex!("0088008122"));
        assert_eq!(sent[0][5], 16);
    }

    #[test]
    fn test_authenticate_umts_sync_failure() {
        let mut session = uicc_session(&[
            &hex!("610F"),
            &hex!("DC 0E 000102030405060708090A0B0C0D 9000"),
        ]);
        let outcome = session
            .authenticate_umts(&[0x55; 16], &[0x66; 16])
            .unwrap()
            .unwrap();
        assert!(matches!(outcome, AuthOutcome::SyncFailure { auts } if auts.len() == 14));
    }

    #[test]
    fn test_authenticate_gsm_parses_sres_and_kc() {
        let mut session = CardSession::from_transport(
            ScriptTransport::new(&[
                &hex!("9F0E"),
                &hex!("04 01020304 08 1112131415161718 9000"),
            ]),
            CardProfile::Sim,
        );
        let outcome = session.authenticate_gsm(&[0x55; 16]).unwrap().unwrap();
        let AuthOutcome::Gsm { sres, kc } = outcome else {
            panic!("expected 2G outcome");
        };
        assert_eq!(sres.as_ref(), &hex!("01020304"));
        assert_eq!(kc.as_ref(), &hex!("1112131415161718"));
    }

    #[test]
    fn test_verify_pin_encoding_and_refusal() {
        let mut session = uicc_session(&[&hex!("63C2")]);
        let outcome = session.verify_pin("1234", 0x01).unwrap();
        assert_eq!(outcome, PinOutcome::Refused(StatusWord::new(0x63, 0xC2)));

        let sent = session.executor().transport().sent();
        assert_eq!(
            sent[0].as_ref(),
            &hex!("0020000108 31323334 FFFFFFFF")
        );
    }

    #[test]
    fn test_invalid_pin_rejected_before_sending() {
        let mut session = uicc_session(&[]);
        assert!(matches!(
            session.verify_pin("12", 0x01),
            Err(UiccError::InvalidPin(_))
        ));
        assert!(matches!(
            session.verify_pin("12a4", 0x01),
            Err(UiccError::InvalidPin(_))
        ));
    }

    #[test]
    fn test_application_ids_from_ef_dir() {
        let mut session = uicc_session(&[
            &hex!("6111"),
            // FCP: EF_DIR, linear fixed, record length 16, 1 record
            &hex!("620F 8205 4221001001 8302 2F00 8002 0010 9000"),
            // application template: 61 0B 4F 07 <AID> padding
            &hex!("610B 4F07 A0000000871002 FFFFFF 9000"),
        ]);
        let aids = session.application_ids().unwrap();
        assert_eq!(aids.len(), 1);
        assert_eq!(aids[0].as_ref(), &hex!("A0000000871002"));

        // second call is served from the cache without card traffic
        let exchanges = session.executor().history().len();
        session.application_ids().unwrap();
        assert_eq!(session.executor().history().len(), exchanges);
    }
}
