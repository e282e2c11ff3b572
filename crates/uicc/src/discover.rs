//! Brute-force file system discovery
//!
//! Cards do not list their files: the only way to map an undocumented card
//! is to try selecting every identifier and see what answers. Selection is
//! stateful, so a scan has to be careful about identifiers that navigate
//! away from the directory under scan: the MF, the reserved 0x3FFF alias,
//! every ancestor of the current directory, and any already-known sibling
//! are excluded up front, and the position is re-established after each
//! directory hit.
//!
//! Exploration is breadth-first over a work queue of directory paths. A DF
//! whose name matches an application AID from EF_DIR is recorded but not
//! descended into, since its contents belong to the application namespace.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::ops::RangeInclusive;

use bytes::Bytes;
use cardprobe_apdu_core::CardTransport;
use tracing::{debug, info};

use crate::attrs::FileInfo;
use crate::session::{CardSession, Result};

/// Known children per directory path; the MF is the empty path
pub type FilesystemTree = BTreeMap<Vec<u16>, Vec<u16>>;

/// Parameters of a discovery run
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Range of high identifier bytes to probe
    pub hi: RangeInclusive<u8>,
    /// Range of low identifier bytes to probe
    pub lo: RangeInclusive<u8>,
    /// Maximum directory nesting depth, `None` for unbounded
    pub max_depth: Option<usize>,
    /// Scan inside this application instead of the MF tree
    pub under_aid: Option<Bytes>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            hi: 0x00..=0xFF,
            lo: 0x00..=0xFF,
            max_depth: Some(2),
            under_aid: None,
        }
    }
}

/// A file found during discovery
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path of the file, its own identifier last
    pub path: Vec<u16>,
    /// Decoded attributes (and contents, for EFs)
    pub info: FileInfo,
}

/// Result of a discovery run
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Every file found, in discovery order
    pub files: Vec<DiscoveredFile>,
    /// Directory structure, for resuming or reporting
    pub tree: FilesystemTree,
}

/// Identifiers that must never be probed while scanning `path`.
///
/// Selecting any of these would silently navigate away from the directory
/// under scan: the MF (0x3F00) and its reserved alias (0x3FFF), every
/// directory on the current path, and the already-known siblings of the
/// scanned directory (selection by identifier also reaches the parent's
/// children).
pub fn make_blacklist(path: &[u16], tree: &FilesystemTree) -> BTreeSet<u16> {
    let mut blacklist = BTreeSet::from([0x3F00, 0x3FFF]);
    blacklist.extend(path.iter().copied());

    let parent = path.split_last().map_or(Vec::new(), |(_, p)| p.to_vec());
    if let Some(siblings) = tree.get(&parent) {
        blacklist.extend(siblings.iter().copied());
    }
    blacklist
}

/// Probe every candidate identifier under one directory.
///
/// The session is first moved to `path`; after every directory hit the
/// position is re-established there, since the hit moved the selection
/// into the found directory.
pub fn scan_df<T: CardTransport>(
    session: &mut CardSession<T>,
    path: &[u16],
    config: &ScanConfig,
    tree: &FilesystemTree,
) -> Result<Vec<FileInfo>> {
    session.go_to_path(path, config.under_aid.as_deref())?;
    let blacklist = make_blacklist(path, tree);

    let mut found = Vec::new();
    for hi in config.hi.clone() {
        for lo in config.lo.clone() {
            let fid = u16::from_be_bytes([hi, lo]);
            if blacklist.contains(&fid) {
                continue;
            }
            let Some(info) = session.select_by_id(fid)? else {
                continue;
            };
            debug!(fid = format_args!("{fid:04X}"), is_df = info.is_df(), "found file");
            let is_df = info.is_df();
            found.push(info);
            if is_df {
                session.go_to_path(path, config.under_aid.as_deref())?;
            }
        }
    }
    Ok(found)
}

/// Map the card's file system, breadth-first from the MF (or from the ADF
/// named by the configuration).
pub fn explore<T: CardTransport>(
    session: &mut CardSession<T>,
    config: &ScanConfig,
) -> Result<Discovery> {
    // application AIDs, to recognize DFs that alias an application
    let aids = session.application_ids()?;

    let mut discovery = Discovery::default();
    let mut queue = VecDeque::from([Vec::<u16>::new()]);
    let mut visited = BTreeSet::new();

    while let Some(path) = queue.pop_front() {
        if !visited.insert(path.clone()) {
            continue;
        }
        info!(
            path = %format_path(&path),
            "scanning directory"
        );

        for found in scan_df(session, &path, config, &discovery.tree)? {
            let Some(fid) = found.file_id else {
                continue;
            };
            let mut full = path.clone();
            full.push(fid);

            discovery.tree.entry(path.clone()).or_default().push(fid);

            if found.is_df() {
                let aliased = found
                    .df_name
                    .as_ref()
                    .is_some_and(|name| aids.iter().any(|a| a == name));
                let within_depth = config.max_depth.is_none_or(|d| full.len() < d);
                if aliased {
                    debug!(
                        fid = format_args!("{fid:04X}"),
                        "directory aliases an application, not descending"
                    );
                } else if within_depth {
                    queue.push_back(full.clone());
                }
            }
            discovery.files.push(DiscoveredFile { path: full, info: found });
        }
    }

    info!(files = discovery.files.len(), "discovery finished");
    Ok(discovery)
}

fn format_path(path: &[u16]) -> String {
    if path.is_empty() {
        return "MF".to_string();
    }
    let parts: Vec<String> = path.iter().map(|f| format!("{f:04X}")).collect();
    parts.join("/")
}
