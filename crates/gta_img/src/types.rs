//! Base types for the on-disk structure of IMG archives.

use binrw::{BinRead, BinWrite};

/// Alignment unit for entry offsets and padded sizes.
pub const SECTOR_SIZE: u64 = 2048;

/// Size of one directory record on disk.
pub const DIR_ENTRY_SIZE: u64 = 32;

/// Size of the V2 file header (`"VER2"` + entry count).
pub const V2_HEADER_SIZE: u64 = 8;

/// Number of sectors needed to hold `bytes`.
pub const fn sectors_for(bytes: u64) -> u64 {
    bytes.div_ceil(SECTOR_SIZE)
}

/// `bytes` rounded up to the next sector boundary.
pub const fn pad_to_sector(bytes: u64) -> u64 {
    sectors_for(bytes) * SECTOR_SIZE
}

/// V2 archive header
///
/// A V2 archive is a single file starting with the `VER2` signature and the
/// number of directory records that follow it. All data is stored in little
/// endian format.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(magic = b"VER2", little)]
pub struct V2Header {
    /// The number of directory records following this header
    pub entry_count: u32,
}

/// IMG directory record
///
/// One fixed-width record per archive member. The same 32-byte shape is used
/// by the V1 `.dir` file and the V2 in-file directory. Offsets and sizes are
/// stored in sectors, not bytes.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct DirRecord {
    /// Fixed-width entry name, NUL-padded
    pub name: [u8; 24],

    /// Offset of the entry payload from the start of the data file, in sectors
    pub offset_sectors: u32,

    /// Space occupied by the entry payload, in sectors
    pub size_sectors: u32,
}

impl Default for DirRecord {
    fn default() -> Self {
        Self {
            name: [0; 24],
            offset_sectors: 0,
            size_sectors: 0,
        }
    }
}

impl DirRecord {
    /// Decode the name field: bytes up to the first NUL, decoded lossily.
    ///
    /// Returns the decoded name and whether the field contained control
    /// bytes, which callers report as a corruption warning.
    pub fn decode_name(&self) -> (Box<str>, bool) {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.name.len());
        let raw = &self.name[..end];
        let has_control = raw.iter().any(|&b| b < 0x20 || b >= 0x7F);
        (String::from_utf8_lossy(raw).into(), has_control)
    }

    /// Encode `name` into the fixed 24-byte field, NUL-padded.
    ///
    /// Names longer than the field are a validation error upstream; this
    /// truncates defensively rather than panicking.
    pub fn encode_name(name: &str) -> [u8; 24] {
        let mut field = [0u8; 24];
        let bytes = name.as_bytes();
        let len = bytes.len().min(24);
        field[..len].copy_from_slice(&bytes[..len]);
        field
    }
}
