//! Rebuild planning and serialization for IMG archives.
//!
//! A rebuild is a pure function of the current entry set and the staged
//! operation queue: the final entry ordering is computed once, offsets are
//! assigned sequentially from the directory's padded size, and the result
//! is serialized to temporary files by [`crate::session::ImgSession`].
//! Alignment and non-overlap hold by construction.

use std::collections::HashSet;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use binrw::BinWrite;
use bon::Builder;
use crc::{Crc, CRC_32_ISO_HDLC};
use tracing::instrument;

use crate::compression::CompressionMethod;
use crate::entry::Entry;
use crate::error::{EntryNotFoundError, Error, Result, Warning};
use crate::session::StagedOp;
use crate::types::{pad_to_sector, sectors_for, DirRecord, V2Header, DIR_ENTRY_SIZE, SECTOR_SIZE, V2_HEADER_SIZE};
use crate::version::ImgVersion;

pub(crate) const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Options for how an archive rebuild is performed
#[derive(Debug, Clone, Copy, Builder)]
pub struct RebuildOptions {
    /// Copy the original file(s) to `.bak` siblings before replacing them
    #[builder(default)]
    pub create_backup: bool,

    /// Re-open the temporary output and check the directory and payload
    /// checksums against the in-memory model before renaming into place
    #[builder(default)]
    pub verify_after_write: bool,
}

/// Outcome of a successful commit.
#[derive(Debug, Clone)]
pub struct RebuildResult {
    /// The fresh entry set, in directory order, with newly assigned offsets
    pub entries: Vec<Entry>,

    /// Non-fatal conditions observed during the rebuild
    pub warnings: Vec<Warning>,
}

/// Where a planned entry's payload bytes come from.
pub(crate) enum PayloadSource<'a> {
    /// Copied through from the open archive's data file
    Archive { offset: u64 },

    /// Supplied by a staged Add or Replace operation
    Staged(&'a [u8]),
}

/// One entry of the final set, before and after offset assignment.
pub(crate) struct PlannedEntry<'a> {
    pub name: Box<str>,
    pub size: u64,
    pub offset: u64,
    pub compression: CompressionMethod,
    pub uncompressed_size: Option<u64>,
    pub source: PayloadSource<'a>,
}

impl PlannedEntry<'_> {
    fn is_staged(&self) -> bool {
        matches!(self.source, PayloadSource::Staged(_))
    }

    fn padding(&self) -> u64 {
        pad_to_sector(self.size) - self.size
    }
}

/// Compute the final entry set: removes drop every case-insensitive match,
/// replaces substitute payloads while keeping the entry's position in the
/// ordering, adds append at the end.
pub(crate) fn merge_staged<'a>(
    existing: &[Entry],
    staged: &'a [StagedOp],
) -> Result<Vec<PlannedEntry<'a>>> {
    let mut planned: Vec<PlannedEntry<'a>> = existing
        .iter()
        .map(|e| PlannedEntry {
            name: e.name.clone(),
            size: e.size,
            offset: 0,
            compression: e.compression,
            uncompressed_size: e.uncompressed_size,
            source: PayloadSource::Archive { offset: e.offset },
        })
        .collect();

    for op in staged {
        if let StagedOp::Remove { name } = op {
            let before = planned.len();
            planned.retain(|p| !p.name.eq_ignore_ascii_case(name));
            if planned.len() == before {
                return Err(Error::EntryNotFound(EntryNotFoundError::Name(name.clone())));
            }
        }
    }

    for op in staged {
        if let StagedOp::Replace {
            name,
            data,
            compression,
            uncompressed_size,
        } = op
        {
            let slot = planned
                .iter_mut()
                .find(|p| p.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| Error::EntryNotFound(EntryNotFoundError::Name(name.clone())))?;
            slot.size = data.len() as u64;
            slot.compression = *compression;
            slot.uncompressed_size = *uncompressed_size;
            slot.source = PayloadSource::Staged(data);
        }
    }

    for op in staged {
        if let StagedOp::Add {
            name,
            data,
            compression,
            uncompressed_size,
        } = op
        {
            planned.push(PlannedEntry {
                name: name.clone().into_boxed_str(),
                size: data.len() as u64,
                offset: 0,
                compression: *compression,
                uncompressed_size: *uncompressed_size,
                source: PayloadSource::Staged(data),
            });
        }
    }

    Ok(planned)
}

/// Reject anything the directory format cannot represent. Runs before any
/// byte is written.
pub(crate) fn validate(planned: &[PlannedEntry]) -> Result<()> {
    let mut seen = HashSet::with_capacity(planned.len());

    for entry in planned {
        if entry.name.is_empty() {
            return Err(Error::InvalidName(entry.name.to_string()));
        }
        if entry
            .name
            .bytes()
            .any(|b| b < 0x20 || b >= 0x7F || b == b'/' || b == b'\\')
        {
            return Err(Error::InvalidName(entry.name.to_string()));
        }
        if entry.name.len() > 24 {
            return Err(Error::NameTooLong(entry.name.to_string()));
        }

        if entry.is_staged() && entry.compression.is_compressed() {
            match entry.uncompressed_size {
                Some(uncompressed) if uncompressed > entry.size => {}
                _ => return Err(Error::BadUncompressedSize(entry.name.to_string())),
            }
        }

        if !seen.insert(entry.name.to_ascii_lowercase()) {
            return Err(Error::DuplicateName(entry.name.to_string()));
        }
    }

    Ok(())
}

/// Assign sequential, sector-aligned offsets and return the data file's
/// total length. The first entry starts at the first sector boundary after
/// the in-file directory (V2) or at zero (V1, whose directory lives in a
/// sibling file).
pub(crate) fn assign_offsets(version: ImgVersion, planned: &mut [PlannedEntry]) -> Result<u64> {
    let mut cursor = match version {
        ImgVersion::V2 => pad_to_sector(V2_HEADER_SIZE + DIR_ENTRY_SIZE * planned.len() as u64),
        _ => 0,
    };

    for entry in planned.iter_mut() {
        entry.offset = cursor;
        cursor = cursor
            .checked_add(pad_to_sector(entry.size))
            .ok_or(Error::ArchiveTooLarge)?;
    }

    if sectors_for(cursor) > u64::from(u32::MAX) {
        return Err(Error::ArchiveTooLarge);
    }

    Ok(cursor)
}

/// Serialize the directory table: the `VER2` header plus records for V2,
/// bare records for V1. Size sectors use ceiling division; offset sectors
/// divide exactly because offsets are aligned by construction.
pub(crate) fn directory_bytes(version: ImgVersion, planned: &[PlannedEntry]) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());

    if version == ImgVersion::V2 {
        V2Header {
            entry_count: planned.len() as u32,
        }
        .write(&mut out)?;
    }

    for entry in planned {
        DirRecord {
            name: DirRecord::encode_name(&entry.name),
            offset_sectors: (entry.offset / SECTOR_SIZE) as u32,
            size_sectors: sectors_for(entry.size) as u32,
        }
        .write(&mut out)?;
    }

    Ok(out.into_inner())
}

/// Stream every payload into `out` in layout order, zero-padding each to
/// its sector boundary. Returns the CRC-32 of each payload's exact bytes,
/// used by the optional post-write verification.
#[instrument(skip_all, err)]
pub(crate) fn write_payloads<W: Write, R: Read + Seek>(
    out: &mut W,
    source: &mut R,
    planned: &[PlannedEntry],
) -> Result<Vec<u32>> {
    let zeros = [0u8; 4096];
    let mut copy_buf = [0u8; 65536];
    let mut checksums = Vec::with_capacity(planned.len());

    for entry in planned {
        let mut digest = CRC32.digest();

        match entry.source {
            PayloadSource::Staged(data) => {
                digest.update(data);
                out.write_all(data)?;
            }
            PayloadSource::Archive { offset } => {
                source.seek(SeekFrom::Start(offset))?;
                let mut remaining = source.by_ref().take(entry.size);
                let mut copied = 0u64;
                loop {
                    let read = remaining.read(&mut copy_buf)?;
                    if read == 0 {
                        break;
                    }
                    digest.update(&copy_buf[..read]);
                    out.write_all(&copy_buf[..read])?;
                    copied += read as u64;
                }
                if copied != entry.size {
                    return Err(Error::TruncatedEntry(entry.name.to_string()));
                }
            }
        }

        let mut padding = entry.padding();
        while padding > 0 {
            let chunk = padding.min(zeros.len() as u64) as usize;
            out.write_all(&zeros[..chunk])?;
            padding -= chunk as u64;
        }

        checksums.push(digest.finalize());
    }

    Ok(checksums)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::compression::CompressionMethod;
    use crate::entry::Entry;
    use crate::error::Error;
    use crate::session::StagedOp;
    use crate::types::SECTOR_SIZE;
    use crate::version::ImgVersion;
    use crate::write::{
        assign_offsets, directory_bytes, merge_staged, validate, PayloadSource,
    };

    fn existing(name: &str, offset: u64, size: u64) -> Entry {
        Entry {
            name: name.into(),
            offset,
            size,
            compression: CompressionMethod::None,
            uncompressed_size: None,
        }
    }

    fn add(name: &str, data: &[u8]) -> StagedOp {
        StagedOp::Add {
            name: name.into(),
            data: data.to_vec(),
            compression: CompressionMethod::None,
            uncompressed_size: None,
        }
    }

    #[test]
    fn merge_applies_removes_replaces_adds() {
        let entries = vec![
            existing("a.dff", 0, 100),
            existing("b.txd", 2048, 5000),
            existing("c.col", 8192, 10),
        ];
        let staged = vec![
            StagedOp::Remove {
                name: "B.TXD".into(),
            },
            StagedOp::Replace {
                name: "c.col".into(),
                data: vec![9; 70],
                compression: CompressionMethod::None,
                uncompressed_size: None,
            },
            add("d.col", &[1; 50]),
        ];

        let planned = merge_staged(&entries, &staged).unwrap();
        let names: Vec<_> = planned.iter().map(|p| p.name.as_ref()).collect();
        assert_eq!(names, vec!["a.dff", "c.col", "d.col"]);
        assert_eq!(planned[1].size, 70);
        assert!(matches!(planned[1].source, PayloadSource::Staged(_)));
        assert!(matches!(
            planned[0].source,
            PayloadSource::Archive { offset: 0 }
        ));
    }

    #[test]
    fn merge_remove_of_missing_name_fails() {
        let entries = vec![existing("a.dff", 0, 100)];
        let staged = vec![StagedOp::Remove {
            name: "ghost.dff".into(),
        }];

        assert!(matches!(
            merge_staged(&entries, &staged),
            Err(Error::EntryNotFound(_))
        ));
    }

    #[test]
    fn merge_replace_of_missing_name_fails() {
        let staged = vec![StagedOp::Replace {
            name: "ghost.dff".into(),
            data: Vec::new(),
            compression: CompressionMethod::None,
            uncompressed_size: None,
        }];

        assert!(matches!(
            merge_staged(&[], &staged),
            Err(Error::EntryNotFound(_))
        ));
    }

    #[test]
    fn validate_rejects_case_insensitive_duplicates() {
        let entries = vec![existing("Model.DFF", 0, 10)];
        let staged = vec![add("model.dff", b"x")];

        let planned = merge_staged(&entries, &staged).unwrap();
        assert!(matches!(
            validate(&planned),
            Err(Error::DuplicateName(name)) if name == "model.dff"
        ));
    }

    #[test]
    fn validate_rejects_long_names() {
        let staged = vec![add("a_very_long_model_name_x.dff", b"x")];
        let planned = merge_staged(&[], &staged).unwrap();

        assert!(matches!(validate(&planned), Err(Error::NameTooLong(_))));
    }

    #[test]
    fn validate_rejects_empty_and_control_names() {
        let staged = vec![add("", b"x")];
        let planned = merge_staged(&[], &staged).unwrap();
        assert!(matches!(validate(&planned), Err(Error::InvalidName(_))));

        let staged = vec![add("a\x01.dff", b"x")];
        let planned = merge_staged(&[], &staged).unwrap();
        assert!(matches!(validate(&planned), Err(Error::InvalidName(_))));

        let staged = vec![add("sub/dir.dff", b"x")];
        let planned = merge_staged(&[], &staged).unwrap();
        assert!(matches!(validate(&planned), Err(Error::InvalidName(_))));
    }

    #[test]
    fn validate_requires_uncompressed_size_for_compressed_stages() {
        let staged = vec![StagedOp::Add {
            name: "a.dff".into(),
            data: vec![0; 100],
            compression: CompressionMethod::Zlib,
            uncompressed_size: None,
        }];
        let planned = merge_staged(&[], &staged).unwrap();
        assert!(matches!(
            validate(&planned),
            Err(Error::BadUncompressedSize(_))
        ));

        let staged = vec![StagedOp::Add {
            name: "a.dff".into(),
            data: vec![0; 100],
            compression: CompressionMethod::Zlib,
            uncompressed_size: Some(50),
        }];
        let planned = merge_staged(&[], &staged).unwrap();
        assert!(matches!(
            validate(&planned),
            Err(Error::BadUncompressedSize(_))
        ));
    }

    #[test]
    fn offsets_are_sequential_aligned_and_disjoint() {
        let staged = vec![
            add("a.dff", &[0; 100]),
            add("b.txd", &[0; 5000]),
            add("c.col", &[0; 10]),
        ];
        let mut planned = merge_staged(&[], &staged).unwrap();

        let total = assign_offsets(ImgVersion::V2, &mut planned).unwrap();

        // Directory: 8 + 3 * 32 = 104 bytes -> one sector.
        assert_eq!(planned[0].offset, 2048);
        assert_eq!(planned[1].offset, 4096);
        assert_eq!(planned[2].offset, 10240);
        assert_eq!(total, 12288);

        for window in planned.windows(2) {
            assert_eq!(window[0].offset % SECTOR_SIZE, 0);
            assert!(window[0].offset + window[0].size <= window[1].offset);
        }
    }

    #[test]
    fn v1_offsets_start_at_zero() {
        let staged = vec![add("a.dff", &[0; 10])];
        let mut planned = merge_staged(&[], &staged).unwrap();

        assign_offsets(ImgVersion::V1, &mut planned).unwrap();
        assert_eq!(planned[0].offset, 0);
    }

    #[test]
    fn directory_round_trips_sector_counts() {
        let staged = vec![add("a.dff", &[0; 100]), add("b.txd", &[0; 5000])];
        let mut planned = merge_staged(&[], &staged).unwrap();
        assign_offsets(ImgVersion::V2, &mut planned).unwrap();

        let bytes = directory_bytes(ImgVersion::V2, &planned).unwrap();
        assert_eq!(bytes.len(), 8 + 2 * 32);
        assert_eq!(&bytes[..4], b"VER2");

        // First record: offset sector 1, one sector of data.
        assert_eq!(&bytes[8 + 24..8 + 28], &1u32.to_le_bytes());
        assert_eq!(&bytes[8 + 28..8 + 32], &1u32.to_le_bytes());
        // Second record: offset sector 2, three sectors of data.
        assert_eq!(&bytes[40 + 24..40 + 28], &2u32.to_le_bytes());
        assert_eq!(&bytes[40 + 28..40 + 32], &3u32.to_le_bytes());
    }
}
