//! Text report of a discovery run

use std::io::{self, Write};

use cardprobe_uicc::attrs;
use cardprobe_uicc::discover::Discovery;
use cardprobe_uicc::{EfData, FileInfo};

/// Render a discovery run as a human-readable report
pub fn write_report<W: Write>(out: &mut W, discovery: &Discovery) -> io::Result<()> {
    writeln!(out, "# {} file(s) discovered", discovery.files.len())?;

    for file in &discovery.files {
        let path: Vec<String> = file.path.iter().map(|f| format!("{f:04X}")).collect();
        write!(out, "\n[{}]", path.join("/"))?;
        if let Some(name) = file.info.name {
            write!(out, " {name}")?;
        }
        writeln!(out)?;
        write_file_info(out, &file.info)?;
    }

    Ok(())
}

fn write_file_info<W: Write>(out: &mut W, info: &FileInfo) -> io::Result<()> {
    if let Some(kind) = info.kind {
        write!(out, "  type: {kind:?}")?;
        if let Some(structure) = info.structure {
            write!(out, ", {structure:?}")?;
        }
        writeln!(out)?;
    }
    if let Some(size) = info.size {
        writeln!(out, "  size: {size} byte(s)")?;
    }
    if let (Some(len), Some(count)) = (info.record_len, info.record_count) {
        writeln!(out, "  records: {count} x {len} byte(s)")?;
    }
    if let Some(name) = &info.df_name {
        writeln!(out, "  df name: {}", hex::encode_upper(name))?;
    }
    if let Some(life_cycle) = info.life_cycle {
        writeln!(out, "  life cycle: {life_cycle:?}")?;
    }
    for rule in &info.security {
        writeln!(out, "  access: {} -> {:?}", rule.operation, rule.condition)?;
    }
    for tlv in &info.proprietary {
        let label = attrs::proprietary_label(tlv.tag).unwrap_or("proprietary object");
        writeln!(out, "  {label}: {}", hex::encode_upper(&tlv.value))?;
    }
    for key in &info.pin_status {
        writeln!(
            out,
            "  pin: {:#04X} {} ({})",
            key.reference,
            key.name,
            if key.enabled { "enabled" } else { "disabled" }
        )?;
    }
    for note in &info.notes {
        writeln!(out, "  note: {note}")?;
    }

    match &info.data {
        Some(EfData::Transparent(data)) => {
            writeln!(out, "  data: {}", hex::encode_upper(data))?;
        }
        Some(EfData::Records(records)) => {
            for (i, record) in records.iter().enumerate() {
                writeln!(out, "  record {}: {}", i + 1, hex::encode_upper(record))?;
            }
        }
        None => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardprobe_uicc::discover::DiscoveredFile;
    use cardprobe_uicc::{FileKind, FileStructure};

    #[test]
    fn test_report_lists_files_with_attributes() {
        let info = FileInfo {
            file_id: Some(0x6F07),
            name: Some("EF_IMSI"),
            kind: Some(FileKind::EfWorking),
            structure: Some(FileStructure::Transparent),
            size: Some(9),
            data: Some(EfData::Transparent(bytes::Bytes::from_static(&[0x08, 0x09]))),
            ..FileInfo::default()
        };
        let discovery = Discovery {
            files: vec![DiscoveredFile {
                path: vec![0x7F20, 0x6F07],
                info,
            }],
            tree: Default::default(),
        };

        let mut out = Vec::new();
        write_report(&mut out, &discovery).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("# 1 file(s) discovered"));
        assert!(text.contains("[7F20/6F07] EF_IMSI"));
        assert!(text.contains("type: EfWorking, Transparent"));
        assert!(text.contains("size: 9 byte(s)"));
        assert!(text.contains("data: 0809"));
    }
}
