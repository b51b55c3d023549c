//! Types for reading IMG archives
//!

use binrw::BinRead;
use indexmap::IndexMap;
use std::{
    borrow::Cow,
    fmt::{self, Debug},
    io::{Cursor, Read, Seek, SeekFrom},
    sync::Arc,
};

use crate::{
    compression::{sniff, CompressionMethod, PayloadReader},
    entry::{Entry, EntryKind},
    error::{EntryNotFoundError, Error, Result, Warning},
    types::{DirRecord, V2Header, DIR_ENTRY_SIZE, SECTOR_SIZE},
    version::ImgVersion,
};

/// A struct for reading one entry's payload out of an IMG archive
pub struct ImgFile<'a, R: Read + Seek> {
    data: Cow<'a, Entry>,
    reader: PayloadReader<'a, R>,
}

impl<R: Read + Seek> Debug for ImgFile<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ImgFile({:#?})", self.entry())
    }
}

impl<'a, R: Read + Seek> ImgFile<'a, R> {
    /// Get the name of the entry
    ///
    /// # Warnings
    ///
    /// It is dangerous to use this name directly when extracting an
    /// archive. A crafted directory can carry separators or `..` segments;
    /// carelessly joining the name onto a target directory allows an
    /// archive to overwrite files outside it.
    pub fn name(&self) -> &str {
        &self.entry().name
    }

    /// Get the stored size of the payload, in bytes
    pub fn size(&self) -> u64 {
        self.entry().size
    }

    /// Get the byte offset of the payload within the data file
    pub fn offset(&self) -> u64 {
        self.entry().offset
    }

    /// Get the compression method recorded for this entry
    pub fn compression_method(&self) -> CompressionMethod {
        self.entry().compression
    }

    /// Get the descriptive classification of this entry
    pub fn kind(&self) -> EntryKind {
        self.entry().kind()
    }

    fn entry(&self) -> &Entry {
        self.data.as_ref()
    }
}

impl<R: Read + Seek> Read for ImgFile<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

#[derive(Debug)]
pub(crate) struct Shared {
    version: ImgVersion,
    entries: Vec<Entry>,
    /// Lowercased name of the first occurrence -> index in `entries`.
    index: IndexMap<Box<str>, usize>,
    warnings: Vec<Warning>,
    data_len: u64,
}

/// IMG archive reader
///
/// ```no_run
/// use std::io::prelude::*;
///
/// fn list_img_contents(reader: impl Read + Seek) -> gta_img::error::Result<()> {
///     let mut img = gta_img::ImgArchive::open_v2(reader)?;
///
///     for i in 0..img.len() {
///         let mut file = img.by_index(i)?;
///         println!("Filename: {}", file.name());
///         std::io::copy(&mut file, &mut std::io::stdout())?;
///     }
///
///     Ok(())
/// }
/// ```
pub struct ImgArchive<R> {
    reader: R,
    shared: Arc<Shared>,
}

impl<R> ImgArchive<R> {
    /// The container layout this archive was parsed as.
    pub fn version(&self) -> ImgVersion {
        self.shared.version
    }

    /// Number of entries contained in this archive.
    pub fn len(&self) -> usize {
        self.shared.entries.len()
    }

    /// Whether this archive contains no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The entries in canonical directory order.
    pub fn entries(&self) -> &[Entry] {
        &self.shared.entries
    }

    /// Non-fatal conditions observed while parsing the directory.
    pub fn warnings(&self) -> &[Warning] {
        &self.shared.warnings
    }

    /// Length of the data file in bytes.
    pub fn data_len(&self) -> u64 {
        self.shared.data_len
    }

    /// Returns an iterator over all the entry names in this archive.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.shared.entries.iter().map(|e| e.name.as_ref())
    }

    /// Get the index of an entry by case-insensitive name, if it's present.
    ///
    /// Duplicate directory records are tolerated on read; the first
    /// occurrence is the canonical location a name resolves to.
    #[inline(always)]
    pub fn index_for_name(&self, name: &str) -> Option<usize> {
        self.shared
            .index
            .get(name.to_ascii_lowercase().as_str())
            .copied()
    }

    /// Get the name of an entry, if it's present.
    #[inline(always)]
    pub fn name_for_index(&self, index: usize) -> Option<&str> {
        self.shared.entries.get(index).map(|e| e.name.as_ref())
    }

    /// Unwrap and return the inner reader object
    ///
    /// The position of the reader is undefined.
    pub fn into_inner(self) -> R {
        self.reader
    }

    pub(crate) fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }
}

impl<R: Read + Seek> ImgArchive<R> {
    /// Read a V2 (single-file) archive, collecting the entries it contains.
    pub fn open_v2(mut reader: R) -> Result<ImgArchive<R>> {
        if let Ok(shared) = Self::metadata_v2(&mut reader) {
            return Ok(ImgArchive {
                reader,
                shared: shared.into(),
            });
        }

        Err(Error::InvalidArchive)
    }

    /// Read a V1 archive from its directory and data sources.
    ///
    /// The directory source is consumed fully; the data source is retained
    /// for payload reads.
    pub fn open_v1<D: Read>(mut dir: D, mut reader: R) -> Result<ImgArchive<R>> {
        let mut table = Vec::new();
        dir.read_to_end(&mut table)?;

        let mut warnings = Vec::new();
        if table.len() as u64 % DIR_ENTRY_SIZE != 0 {
            warnings.push(Warning::TruncatedDirectory);
        }

        let count = table.len() as u64 / DIR_ENTRY_SIZE;
        let mut cursor = Cursor::new(table);
        let records = (0..count)
            .map(|_| DirRecord::read(&mut cursor).map_err(Error::from))
            .collect::<Result<Vec<_>>>()?;

        let shared = Self::assemble(ImgVersion::V1, records, warnings, &mut reader)?;
        Ok(ImgArchive {
            reader,
            shared: shared.into(),
        })
    }

    /// Search for an entry by case-insensitive name
    pub fn by_name(&mut self, name: &str) -> Result<ImgFile<'_, R>> {
        let Some(index) = self.index_for_name(name) else {
            return Err(Error::EntryNotFound(EntryNotFoundError::Name(
                name.to_owned(),
            )));
        };
        self.by_index(index)
    }

    /// Get a contained entry's raw payload reader by index
    pub fn by_index(&mut self, index: usize) -> Result<ImgFile<'_, R>> {
        self.file_at(index, CompressionMethod::None)
    }

    /// Get a reader that decompresses the entry's payload on the fly.
    ///
    /// Raw entries read back verbatim; zlib entries are inflated. LZO
    /// methods have no decoder here and fail with
    /// [`Error::UnsupportedCompression`].
    pub fn by_index_decompressed(&mut self, index: usize) -> Result<ImgFile<'_, R>> {
        let compression = self
            .shared
            .entries
            .get(index)
            .ok_or(Error::EntryNotFound(EntryNotFoundError::Index(index)))?
            .compression;
        self.file_at(index, compression)
    }

    /// Read an entry's exact payload bytes.
    pub fn read_payload(&mut self, index: usize) -> Result<Vec<u8>> {
        let mut file = self.by_index(index)?;
        let mut buf = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn file_at(&mut self, index: usize, compression: CompressionMethod) -> Result<ImgFile<'_, R>> {
        let data = self
            .shared
            .entries
            .get(index)
            .ok_or(Error::EntryNotFound(EntryNotFoundError::Index(index)))?;

        if data.offset + data.size > self.shared.data_len {
            return Err(Error::TruncatedEntry(data.name.to_string()));
        }

        Ok(ImgFile {
            data: Cow::Borrowed(data),
            reader: PayloadReader::new(&mut self.reader, data.offset, data.size, compression)?,
        })
    }

    /// Rebuild an archive handle around a fresh reader and an
    /// already-known entry set, skipping the directory parse. Used after a
    /// commit, where the in-memory model is more precise than the
    /// sector-granular directory.
    pub(crate) fn from_parts(
        mut reader: R,
        version: ImgVersion,
        entries: Vec<Entry>,
        warnings: Vec<Warning>,
    ) -> Result<ImgArchive<R>> {
        let data_len = reader.seek(SeekFrom::End(0))?;
        let mut index = IndexMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            index
                .entry(entry.name.to_ascii_lowercase().into_boxed_str())
                .or_insert(i);
        }

        Ok(ImgArchive {
            reader,
            shared: Arc::new(Shared {
                version,
                entries,
                index,
                warnings,
                data_len,
            }),
        })
    }

    fn metadata_v2(reader: &mut R) -> Result<Shared> {
        let header = V2Header::read(reader)?;
        let records = (0..header.entry_count)
            .map(|_| DirRecord::read(reader).map_err(Error::from))
            .collect::<Result<Vec<_>>>()?;

        Self::assemble(ImgVersion::V2, records, Vec::new(), reader)
    }

    fn assemble(
        version: ImgVersion,
        records: Vec<DirRecord>,
        mut warnings: Vec<Warning>,
        reader: &mut R,
    ) -> Result<Shared> {
        let data_len = reader.seek(SeekFrom::End(0))?;

        let mut entries = Vec::with_capacity(records.len());
        let mut index = IndexMap::with_capacity(records.len());
        for record in &records {
            let (name, has_control) = record.decode_name();
            if has_control {
                warnings.push(Warning::NameControlBytes(name.to_string()));
            }

            let entry = Entry {
                name,
                offset: u64::from(record.offset_sectors) * SECTOR_SIZE,
                size: u64::from(record.size_sectors) * SECTOR_SIZE,
                compression: CompressionMethod::None,
                uncompressed_size: None,
            };

            let key = entry.name.to_ascii_lowercase().into_boxed_str();
            if index.contains_key(&key) {
                warnings.push(Warning::DuplicateEntryName(entry.name.to_string()));
            } else {
                index.insert(key, entries.len());
            }
            entries.push(entry);
        }

        for entry in &mut entries {
            if entry.offset + entry.size > data_len {
                warnings.push(Warning::EntryOutOfBounds(entry.name.to_string()));
                continue;
            }
            if entry.size >= 2 {
                reader.seek(SeekFrom::Start(entry.offset))?;
                let mut magic = [0u8; 2];
                reader.read_exact(&mut magic)?;
                entry.compression = sniff(&magic);
            }
        }

        Ok(Shared {
            version,
            entries,
            index,
            warnings,
            data_len,
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::prelude::*;
    use std::io::Cursor;

    use binrw::BinWrite;
    use flate2::{write::ZlibEncoder, Compression};
    use pretty_assertions::assert_eq;

    use crate::compression::CompressionMethod;
    use crate::error::{Error, Result, Warning};
    use crate::read::ImgArchive;
    use crate::types::{pad_to_sector, sectors_for, DirRecord, V2Header, SECTOR_SIZE};
    use crate::version::ImgVersion;

    fn records_for(entries: &[(&str, &[u8])], first_offset: u64) -> (Vec<DirRecord>, Vec<u8>) {
        let mut records = Vec::new();
        let mut payloads = Vec::new();
        let mut cursor = first_offset;
        for (name, data) in entries {
            records.push(DirRecord {
                name: DirRecord::encode_name(name),
                offset_sectors: (cursor / SECTOR_SIZE) as u32,
                size_sectors: sectors_for(data.len() as u64) as u32,
            });
            payloads.extend_from_slice(data);
            payloads.resize((cursor - first_offset + pad_to_sector(data.len() as u64)) as usize, 0);
            cursor += pad_to_sector(data.len() as u64);
        }
        (records, payloads)
    }

    fn v2_fixture(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let table_len = 8 + 32 * entries.len() as u64;
        let first_offset = pad_to_sector(table_len);
        let (records, payloads) = records_for(entries, first_offset);

        let mut out = Cursor::new(Vec::new());
        V2Header {
            entry_count: entries.len() as u32,
        }
        .write(&mut out)
        .unwrap();
        for record in &records {
            record.write(&mut out).unwrap();
        }
        let mut bytes = out.into_inner();
        bytes.resize(first_offset as usize, 0);
        bytes.extend_from_slice(&payloads);
        bytes
    }

    fn v1_fixture(entries: &[(&str, &[u8])]) -> (Vec<u8>, Vec<u8>) {
        let (records, payloads) = records_for(entries, 0);
        let mut dir = Cursor::new(Vec::new());
        for record in &records {
            record.write(&mut dir).unwrap();
        }
        (dir.into_inner(), payloads)
    }

    #[test]
    fn read_invalid_magic() {
        let archive = ImgArchive::open_v2(Cursor::new(b"VER1\x00\x00\x00\x00".to_vec()));
        assert!(archive.is_err());
    }

    #[test]
    fn read_empty_v2() {
        let archive = ImgArchive::open_v2(Cursor::new(v2_fixture(&[]))).unwrap();
        assert!(archive.is_empty());
        assert_eq!(archive.version(), ImgVersion::V2);
    }

    #[test]
    fn read_v2_with_entries() -> Result<()> {
        let input = v2_fixture(&[("a.dff", b"model bytes"), ("b.txd", &[0x16; 4096])]);
        let mut archive = ImgArchive::open_v2(Cursor::new(input))?;

        assert_eq!(archive.len(), 2);
        assert!(archive.warnings().is_empty());

        let first = &archive.entries()[0];
        assert_eq!(first.name.as_ref(), "a.dff");
        assert_eq!(first.offset, 2048);
        assert_eq!(first.size, 2048);

        let second = &archive.entries()[1];
        assert_eq!(second.name.as_ref(), "b.txd");
        assert_eq!(second.offset, 4096);
        assert_eq!(second.size, 4096);

        let payload = archive.read_payload(0)?;
        assert_eq!(&payload[..11], b"model bytes");
        assert!(payload[11..].iter().all(|&b| b == 0));

        Ok(())
    }

    #[test]
    fn read_v2_by_name_is_case_insensitive() -> Result<()> {
        let input = v2_fixture(&[("Player.DFF", b"x")]);
        let mut archive = ImgArchive::open_v2(Cursor::new(input))?;

        assert_eq!(archive.by_name("player.dff")?.name(), "Player.DFF");
        assert!(archive.by_name("missing.dff").is_err());

        Ok(())
    }

    #[test]
    fn read_v2_duplicate_names_warn_and_first_wins() -> Result<()> {
        let input = v2_fixture(&[("a.dff", b"first"), ("A.DFF", b"second")]);
        let mut archive = ImgArchive::open_v2(Cursor::new(input))?;

        assert_eq!(archive.len(), 2);
        assert_eq!(
            archive.warnings(),
            &[Warning::DuplicateEntryName("A.DFF".into())]
        );
        assert_eq!(archive.index_for_name("a.dff"), Some(0));

        let payload = archive.read_payload(0)?;
        assert_eq!(&payload[..5], b"first");

        Ok(())
    }

    #[test]
    fn read_v2_flags_out_of_bounds_entry() -> Result<()> {
        let mut input = v2_fixture(&[("a.dff", &[1u8; 2048])]);
        // Chop the payload region short so the directory lies.
        input.truncate(input.len() - 1024);

        let mut archive = ImgArchive::open_v2(Cursor::new(input))?;
        assert_eq!(
            archive.warnings(),
            &[Warning::EntryOutOfBounds("a.dff".into())]
        );

        match archive.read_payload(0) {
            Err(Error::TruncatedEntry(name)) => assert_eq!(name, "a.dff"),
            other => panic!("expected TruncatedEntry, got {other:?}"),
        }

        Ok(())
    }

    #[test]
    fn read_v1_pair() -> Result<()> {
        let (dir, img) = v1_fixture(&[("a.dff", b"aaa"), ("b.col", b"bbb")]);
        let mut archive = ImgArchive::open_v1(Cursor::new(dir), Cursor::new(img))?;

        assert_eq!(archive.version(), ImgVersion::V1);
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.entries()[0].offset, 0);
        assert_eq!(archive.entries()[1].offset, 2048);

        let payload = archive.read_payload(1)?;
        assert_eq!(&payload[..3], b"bbb");

        Ok(())
    }

    #[test]
    fn read_v1_truncated_directory_warns() -> Result<()> {
        let (mut dir, img) = v1_fixture(&[("a.dff", b"aaa")]);
        dir.extend_from_slice(&[0u8; 7]);

        let archive = ImgArchive::open_v1(Cursor::new(dir), Cursor::new(img))?;
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.warnings(), &[Warning::TruncatedDirectory]);

        Ok(())
    }

    #[test]
    fn control_bytes_in_name_warn() -> Result<()> {
        let mut name = [0u8; 24];
        name[0] = b'a';
        name[1] = 0x02;

        let mut dir = Cursor::new(Vec::new());
        DirRecord {
            name,
            offset_sectors: 0,
            size_sectors: 0,
        }
        .write(&mut dir)
        .unwrap();

        let archive = ImgArchive::open_v1(Cursor::new(dir.into_inner()), Cursor::new(Vec::new()))?;
        assert_eq!(archive.warnings().len(), 1);
        assert!(matches!(
            archive.warnings()[0],
            Warning::NameControlBytes(_)
        ));

        Ok(())
    }

    #[test]
    fn zlib_payloads_are_sniffed_and_inflatable() -> Result<()> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"Hello World").unwrap();
        let compressed = encoder.finish().unwrap();

        let input = v2_fixture(&[("a.dat", &compressed)]);
        let mut archive = ImgArchive::open_v2(Cursor::new(input))?;

        assert_eq!(archive.entries()[0].compression, CompressionMethod::Zlib);

        let mut inflated = Vec::new();
        archive
            .by_index_decompressed(0)?
            .read_to_end(&mut inflated)?;
        assert_eq!(inflated, b"Hello World");

        Ok(())
    }
}
