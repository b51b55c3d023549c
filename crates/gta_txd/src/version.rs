//! RenderWare library version detection.
//!
//! Model and texture payloads are RenderWare chunk streams whose headers
//! carry a version stamp at byte 8. The stamp-to-label mapping here is a
//! single static table; community tooling disagrees on some of the raw
//! constants, so one canonical set is used rather than merging them.

use crate::chunk::ChunkHeader;

/// Version stamp this library writes into serialized chunks
/// (RenderWare 3.6.0.3, as shipped with San Andreas).
pub const RW_3_6_0_3: u32 = 0x1803FFFF;

/// Known version stamps and their human-readable labels.
const VERSIONS: &[(u32, &str)] = &[
    (0x00000310, "3.1.0.0"),
    (0x0401FFFF, "3.1.0.1"),
    (0x0800FFFF, "3.2.0.0"),
    (0x0C02FFFF, "3.3.0.2"),
    (0x1003FFFF, "3.4.0.3"),
    (0x1400FFFF, "3.5.0.0"),
    (RW_3_6_0_3, "3.6.0.3"),
];

/// Human-readable label for a version stamp; unknown stamps render as hex.
pub fn version_label(raw: u32) -> String {
    VERSIONS
        .iter()
        .find(|(value, _)| *value == raw)
        .map(|(_, label)| (*label).to_string())
        .unwrap_or_else(|| format!("0x{raw:08X}"))
}

/// Read the RenderWare version out of a payload's leading chunk header.
///
/// Never fails: anything that does not parse as a chunk header yields
/// `(0, "Unknown")`.
pub fn detect_sub_format(header_bytes: &[u8]) -> (u32, String) {
    match ChunkHeader::parse(header_bytes) {
        Ok(header) => (header.version, version_label(header.version)),
        Err(_) => (0, "Unknown".to_string()),
    }
}
