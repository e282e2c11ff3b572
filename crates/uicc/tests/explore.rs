//! End-to-end tests against a simulated UICC
//!
//! The simulated card models the selection state machine (current DF and
//! EF, GET RESPONSE pending data) over an in-memory file tree, which is
//! enough to exercise selection, reading and discovery exactly as a real
//! card would answer them.

use std::collections::BTreeMap;

use bytes::Bytes;
use cardprobe_apdu_core::{CardTransport, TransportError};
use cardprobe_uicc::discover::{self, ScanConfig};
use cardprobe_uicc::{CardProfile, CardSession, EfData, FileStructure};
use hex_literal::hex;

const USIM_AID: &[u8] = &hex!("A0000000871002FF86FF02890607060203");

/// EF_IMSI content for IMSI 001011234567890: length byte, then parity
/// nibble and digits in swapped BCD
const IMSI_BYTES: [u8; 9] = hex!("08 09 10 10 21 43 65 87 09");

#[derive(Debug, Clone)]
enum Node {
    Df {
        name: Option<Vec<u8>>,
    },
    EfTransparent {
        content: Vec<u8>,
    },
    EfRecords {
        record_len: u8,
        records: Vec<Vec<u8>>,
    },
}

/// In-memory UICC: a file tree plus the selection state machine
#[derive(Debug)]
struct FakeCard {
    /// Nodes by absolute path; the empty path is the MF
    nodes: BTreeMap<Vec<u16>, Node>,
    current_df: Vec<u16>,
    current_ef: Option<Vec<u16>>,
    pending: Option<Vec<u8>>,
    /// Every identifier handed to SELECT-by-id, in order
    probed: Vec<u16>,
}

impl FakeCard {
    fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(Vec::new(), Node::Df { name: None });
        Self {
            nodes,
            current_df: Vec::new(),
            current_ef: None,
            pending: None,
            probed: Vec::new(),
        }
    }

    fn with_node(mut self, path: &[u16], node: Node) -> Self {
        self.nodes.insert(path.to_vec(), node);
        self
    }

    /// A card with EF_DIR, EF_ICCID, DF_GSM/EF_IMSI and a DF aliasing the
    /// USIM application
    fn telecom() -> Self {
        let dir_record = {
            let mut rec = vec![0x61, USIM_AID.len() as u8 + 2, 0x4F, USIM_AID.len() as u8];
            rec.extend_from_slice(USIM_AID);
            rec
        };
        Self::new()
            .with_node(
                &[0x2F00],
                Node::EfRecords {
                    record_len: dir_record.len() as u8,
                    records: vec![dir_record],
                },
            )
            .with_node(
                &[0x2FE2],
                Node::EfTransparent {
                    content: hex!("98 10 32 54 76 98 10 32 54 76").to_vec(),
                },
            )
            .with_node(&[0x7F20], Node::Df { name: None })
            .with_node(
                &[0x7F20, 0x6F07],
                Node::EfTransparent {
                    content: IMSI_BYTES.to_vec(),
                },
            )
            .with_node(
                &[0x7F66],
                Node::Df {
                    name: Some(USIM_AID.to_vec()),
                },
            )
            .with_node(
                &[0x7F66, 0x6F07],
                Node::EfTransparent {
                    content: IMSI_BYTES.to_vec(),
                },
            )
    }

    fn fcp(node: &Node, fid: u16) -> Vec<u8> {
        let mut inner = Vec::new();
        match node {
            Node::Df { name } => {
                inner.extend_from_slice(&hex!("8202 7821"));
                inner.extend_from_slice(&[0x83, 0x02]);
                inner.extend_from_slice(&fid.to_be_bytes());
                if let Some(name) = name {
                    inner.push(0x84);
                    inner.push(name.len() as u8);
                    inner.extend_from_slice(name);
                }
            }
            Node::EfTransparent { content } => {
                inner.extend_from_slice(&hex!("8202 4121"));
                inner.extend_from_slice(&[0x83, 0x02]);
                inner.extend_from_slice(&fid.to_be_bytes());
                inner.extend_from_slice(&[0x80, 0x02]);
                inner.extend_from_slice(&(content.len() as u16).to_be_bytes());
            }
            Node::EfRecords {
                record_len,
                records,
            } => {
                inner.extend_from_slice(&[0x82, 0x05, 0x42, 0x21, 0x00, *record_len]);
                inner.push(records.len() as u8);
                inner.extend_from_slice(&[0x83, 0x02]);
                inner.extend_from_slice(&fid.to_be_bytes());
                let size = u16::from(*record_len) * records.len() as u16;
                inner.extend_from_slice(&[0x80, 0x02]);
                inner.extend_from_slice(&size.to_be_bytes());
            }
        }
        let mut out = vec![0x62, inner.len() as u8];
        out.extend_from_slice(&inner);
        out
    }

    /// Resolution order of SELECT by identifier: children of the current
    /// DF, the current DF itself, then the parent and its children
    fn resolve_fid(&self, fid: u16) -> Option<Vec<u16>> {
        if fid == 0x3F00 {
            return Some(Vec::new());
        }
        let mut child = self.current_df.clone();
        child.push(fid);
        if self.nodes.contains_key(&child) {
            return Some(child);
        }
        if self.current_df.last() == Some(&fid) {
            return Some(self.current_df.clone());
        }
        if let Some((_, parent)) = self.current_df.split_last() {
            if parent.last() == Some(&fid) {
                return Some(parent.to_vec());
            }
            let mut sibling = parent.to_vec();
            sibling.push(fid);
            if self.nodes.contains_key(&sibling) {
                return Some(sibling);
            }
        }
        None
    }

    fn enter(&mut self, path: Vec<u16>) -> Vec<u8> {
        let fid = path.last().copied().unwrap_or(0x3F00);
        let node = self.nodes[&path].clone();
        let fcp = Self::fcp(&node, fid);
        let announce = vec![0x61, fcp.len() as u8];
        self.pending = Some(fcp);
        if matches!(node, Node::Df { .. }) {
            self.current_df = path;
            self.current_ef = None;
        } else {
            self.current_ef = Some(path);
        }
        announce
    }

    fn select(&mut self, p1: u8, data: &[u8]) -> Vec<u8> {
        match p1 {
            // by identifier
            0x00 if data.len() == 2 => {
                let fid = u16::from_be_bytes([data[0], data[1]]);
                self.probed.push(fid);
                match self.resolve_fid(fid) {
                    Some(path) => self.enter(path),
                    None => hex!("6A82").to_vec(),
                }
            }
            // by path from the MF
            0x08 => {
                let mut path = Vec::new();
                for pair in data.chunks(2) {
                    if pair.len() != 2 {
                        return hex!("6A87").to_vec();
                    }
                    path.push(u16::from_be_bytes([pair[0], pair[1]]));
                    if !self.nodes.contains_key(&path) {
                        return hex!("6A82").to_vec();
                    }
                }
                self.enter(path)
            }
            // by DF name
            0x04 => {
                let target = self.nodes.iter().find_map(|(path, node)| match node {
                    Node::Df { name: Some(name) } if name == data => Some(path.clone()),
                    _ => None,
                });
                match target {
                    Some(path) => self.enter(path),
                    None => hex!("6A82").to_vec(),
                }
            }
            _ => hex!("6A86").to_vec(),
        }
    }

    fn read_binary(&self, le: u8) -> Vec<u8> {
        let Some(Node::EfTransparent { content }) = self
            .current_ef
            .as_ref()
            .and_then(|path| self.nodes.get(path))
        else {
            return hex!("6986").to_vec();
        };
        let mut out = content[..usize::from(le).min(content.len())].to_vec();
        out.extend_from_slice(&hex!("9000"));
        out
    }

    fn read_record(&self, number: u8) -> Vec<u8> {
        let Some(Node::EfRecords { records, .. }) = self
            .current_ef
            .as_ref()
            .and_then(|path| self.nodes.get(path))
        else {
            return hex!("6986").to_vec();
        };
        match records.get(usize::from(number).wrapping_sub(1)) {
            Some(record) => {
                let mut out = record.clone();
                out.extend_from_slice(&hex!("9000"));
                out
            }
            None => hex!("6A83").to_vec(),
        }
    }
}

impl CardTransport for FakeCard {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        if command.len() < 4 {
            return Err(TransportError::Transmission);
        }
        let (ins, p1) = (command[1], command[2]);
        let raw = match ins {
            0xA4 => {
                let data = if command.len() > 5 {
                    &command[5..5 + usize::from(command[4])]
                } else {
                    &[]
                };
                self.select(p1, data)
            }
            0xC0 => match self.pending.take() {
                Some(mut data) => {
                    data.extend_from_slice(&hex!("9000"));
                    data
                }
                None => hex!("6F00").to_vec(),
            },
            0xB0 => self.read_binary(command[4]),
            0xB2 => self.read_record(p1),
            _ => hex!("6D00").to_vec(),
        };
        Ok(Bytes::from(raw))
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.current_df = Vec::new();
        self.current_ef = None;
        self.pending = None;
        Ok(())
    }
}

fn session(card: FakeCard) -> CardSession<FakeCard> {
    CardSession::from_transport(card, CardProfile::Uicc)
}

#[test]
fn imsi_read_end_to_end() {
    let mut session = session(FakeCard::telecom());

    // walk MF -> DF_GSM, then read EF_IMSI from there
    session.go_to_path(&[0x7F20], None).unwrap();
    let imsi = session.imsi().unwrap().unwrap();
    assert_eq!(imsi, "001011234567890");

    // the file itself decodes as a 9-byte transparent EF
    let info = session.select_by_id(0x6F07).unwrap().unwrap();
    assert_eq!(info.structure, Some(FileStructure::Transparent));
    assert_eq!(info.size, Some(9));
    let Some(EfData::Transparent(data)) = &info.data else {
        panic!("expected transparent data");
    };
    assert_eq!(data.as_ref(), &IMSI_BYTES);
}

#[test]
fn imsi_read_through_usim_application() {
    let mut session = session(FakeCard::telecom());
    assert!(session.select_usim().unwrap().is_some());
    assert_eq!(session.imsi().unwrap().unwrap(), "001011234567890");
}

#[test]
fn iccid_decodes_as_digits() {
    let mut session = session(FakeCard::telecom());
    let iccid = session.iccid().unwrap().unwrap();
    assert_eq!(iccid, "89012345678901234567");
}

#[test]
fn scan_never_probes_mf_or_reserved_alias() {
    let mut session = session(FakeCard::telecom());
    let config = ScanConfig {
        hi: 0x3F..=0x3F,
        lo: 0x00..=0xFF,
        max_depth: Some(1),
        under_aid: None,
    };
    discover::explore(&mut session, &config).unwrap();

    let probed = &session.executor().transport().probed;
    assert!(!probed.contains(&0x3FFF));
    // 0x3F00 selections come only from re-establishing the position, one
    // per directory scanned, never from probing
    let mf_selects = probed.iter().filter(|&&f| f == 0x3F00).count();
    assert!(mf_selects <= 1, "MF selected {mf_selects} times");
    // the rest of the 0x3Fxx range was probed
    assert!(probed.contains(&0x3F01));
    assert!(probed.contains(&0x3FFE));
}

#[test]
fn explore_maps_the_tree_and_skips_application_aliases() {
    let mut session = session(FakeCard::telecom());
    let config = ScanConfig {
        hi: 0x2F..=0x7F,
        lo: 0x00..=0xFF,
        max_depth: Some(2),
        under_aid: None,
    };
    let discovery = discover::explore(&mut session, &config).unwrap();

    let roots = &discovery.tree[&Vec::new()];
    assert!(roots.contains(&0x2F00));
    assert!(roots.contains(&0x2FE2));
    assert!(roots.contains(&0x7F20));
    assert!(roots.contains(&0x7F66));

    // DF_GSM was descended into and EF_IMSI found inside it
    assert_eq!(discovery.tree[&vec![0x7F20]], vec![0x6F07]);
    let imsi_file = discovery
        .files
        .iter()
        .find(|f| f.path == [0x7F20, 0x6F07])
        .unwrap();
    assert_eq!(imsi_file.info.structure, Some(FileStructure::Transparent));
    assert!(imsi_file.info.data.is_some());

    // the DF aliasing the USIM application was recorded but not descended
    assert!(!discovery.tree.contains_key(&vec![0x7F66]));
    assert!(
        !discovery
            .files
            .iter()
            .any(|f| f.path == [0x7F66, 0x6F07])
    );
}
