//! An open archive plus its queue of staged operations.
//!
//! The session is the explicit handle every mutating operation goes
//! through; there is no ambient "current archive" state. Mutations are
//! staged as [`StagedOp`] values and nothing touches the disk until
//! [`ImgSession::commit`] applies the whole queue atomically.

use std::io::Write;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument};

use crate::compression::CompressionMethod;
use crate::entry::Entry;
use crate::error::{Error, Result, Warning};
use crate::read::{ImgArchive, ImgFile};
use crate::version::{detect_version, directory_path_for, ImgVersion};
use crate::vfs::{ArchiveFs, ReadSeek, StdFs};
use crate::write::{
    assign_offsets, directory_bytes, merge_staged, validate, write_payloads, PlannedEntry,
    RebuildOptions, RebuildResult, CRC32,
};

/// A pending mutation queued against an open archive.
#[derive(Debug, Clone)]
pub enum StagedOp {
    /// Append a new entry at the end of the ordering
    Add {
        /// Entry name, unique case-insensitively within the final set
        name: String,
        /// Payload bytes, stored verbatim
        data: Vec<u8>,
        /// How `data` is already encoded
        compression: CompressionMethod,
        /// Decompressed length; required when `compression` is not `None`
        uncompressed_size: Option<u64>,
    },

    /// Drop every entry matching `name` case-insensitively
    Remove {
        /// Name to remove
        name: String,
    },

    /// Substitute an existing entry's payload, keeping its position
    Replace {
        /// Name of the entry to replace
        name: String,
        /// New payload bytes
        data: Vec<u8>,
        /// How `data` is already encoded
        compression: CompressionMethod,
        /// Decompressed length; required when `compression` is not `None`
        uncompressed_size: Option<u64>,
    },
}

/// An open IMG archive with exclusive ownership of its file path(s).
///
/// ```no_run
/// use gta_img::{ImgSession, RebuildOptions};
///
/// fn strip_entry() -> gta_img::error::Result<()> {
///     let mut session = ImgSession::open("gta3.img")?;
///     session.stage_remove("ballas.dff");
///     session.commit(RebuildOptions::builder().create_backup(true).build())?;
///     Ok(())
/// }
/// ```
pub struct ImgSession {
    fs: Arc<dyn ArchiveFs>,
    img_path: PathBuf,
    dir_path: Option<PathBuf>,
    version: ImgVersion,
    archive: ImgArchive<Box<dyn ReadSeek>>,
    warnings: Vec<Warning>,
    staged: Vec<StagedOp>,
}

impl ImgSession {
    /// Open the archive at `path` through the real filesystem.
    pub fn open(path: impl Into<PathBuf>) -> Result<ImgSession> {
        Self::open_with(Arc::new(StdFs), path)
    }

    /// Open the archive at `path` through a caller-supplied byte source.
    #[instrument(skip(fs, path), err)]
    pub fn open_with(fs: Arc<dyn ArchiveFs>, path: impl Into<PathBuf>) -> Result<ImgSession> {
        let img_path = path.into();
        let (version, mut warnings) = detect_version(fs.as_ref(), &img_path)?;

        let (archive, dir_path) = match version {
            ImgVersion::V1 => {
                let dir_path = directory_path_for(&img_path);
                let dir = fs.open_read(&dir_path)?;
                let img = fs.open_read(&img_path)?;
                (ImgArchive::open_v1(dir, img)?, Some(dir_path))
            }
            ImgVersion::V2 => (ImgArchive::open_v2(fs.open_read(&img_path)?)?, None),
            ImgVersion::Unknown => return Err(Error::UnknownFormat),
        };

        warnings.extend(archive.warnings().iter().cloned());

        Ok(ImgSession {
            fs,
            img_path,
            dir_path,
            version,
            archive,
            warnings,
            staged: Vec::new(),
        })
    }

    /// The container layout of the open archive.
    pub fn version(&self) -> ImgVersion {
        self.version
    }

    /// Path of the data file this session owns.
    pub fn img_path(&self) -> &Path {
        &self.img_path
    }

    /// The entries in canonical directory order.
    pub fn entries(&self) -> &[Entry] {
        self.archive.entries()
    }

    /// Warnings collected during detection, parse and the last rebuild.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// The staged operations, in the order they were queued.
    pub fn staged(&self) -> &[StagedOp] {
        &self.staged
    }

    /// Discard the staged-operation queue without touching the archive.
    pub fn clear_staged(&mut self) {
        self.staged.clear();
    }

    /// Queue an arbitrary staged operation.
    ///
    /// Staging never validates; all validation happens at commit time so a
    /// rejected queue leaves the archive untouched.
    pub fn stage(&mut self, op: StagedOp) {
        self.staged.push(op);
    }

    /// Queue adding a raw payload under `name`.
    pub fn stage_add(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.stage(StagedOp::Add {
            name: name.into(),
            data,
            compression: CompressionMethod::None,
            uncompressed_size: None,
        });
    }

    /// Queue removing every entry matching `name`.
    pub fn stage_remove(&mut self, name: impl Into<String>) {
        self.stage(StagedOp::Remove { name: name.into() });
    }

    /// Queue replacing `name`'s payload with a raw payload.
    pub fn stage_replace(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.stage(StagedOp::Replace {
            name: name.into(),
            data,
            compression: CompressionMethod::None,
            uncompressed_size: None,
        });
    }

    /// Get an entry's raw payload reader by index.
    pub fn by_index(&mut self, index: usize) -> Result<ImgFile<'_, Box<dyn ReadSeek>>> {
        self.archive.by_index(index)
    }

    /// Get an entry's raw payload reader by case-insensitive name.
    pub fn by_name(&mut self, name: &str) -> Result<ImgFile<'_, Box<dyn ReadSeek>>> {
        self.archive.by_name(name)
    }

    /// Read an entry's exact payload bytes by case-insensitive name.
    pub fn read_payload(&mut self, name: &str) -> Result<Vec<u8>> {
        let index = self
            .archive
            .index_for_name(name)
            .ok_or_else(|| Error::EntryNotFound(crate::error::EntryNotFoundError::Name(name.into())))?;
        self.archive.read_payload(index)
    }

    /// Apply the whole staged queue atomically.
    ///
    /// The rebuilt archive is written to temporary files and renamed over
    /// the originals only after the write (and optional verification)
    /// succeeds; on any failure the temporaries are discarded and the
    /// original files are byte-for-byte unchanged. The staged queue
    /// survives a failed commit so the caller can inspect or retry it
    /// deliberately; it is never retried automatically.
    #[instrument(skip_all, err)]
    pub fn commit(&mut self, options: RebuildOptions) -> Result<RebuildResult> {
        let staged = mem::take(&mut self.staged);
        match self.commit_inner(&staged, options) {
            Ok(result) => Ok(result),
            Err(error) => {
                self.staged = staged;
                Err(error)
            }
        }
    }

    fn commit_inner(&mut self, staged: &[StagedOp], options: RebuildOptions) -> Result<RebuildResult> {
        let existing = self.archive.entries().to_vec();
        let mut planned = merge_staged(&existing, staged)?;
        validate(&planned)?;
        let data_len = assign_offsets(self.version, &mut planned)?;
        let table = directory_bytes(self.version, &planned)?;

        let needed = match self.version {
            ImgVersion::V1 => data_len + table.len() as u64,
            _ => data_len,
        };
        if let Some(available) = self.fs.free_space(&self.img_path) {
            if available < needed {
                return Err(Error::InsufficientDiskSpace { needed, available });
            }
        }

        let img_tmp = temp_path(&self.img_path);
        let dir_tmp = self.dir_path.as_deref().map(temp_path);

        let checksums =
            match self.write_temps(&planned, &table, &img_tmp, dir_tmp.as_deref(), data_len) {
                Ok(checksums) => checksums,
                Err(error) => {
                    self.discard(&img_tmp, dir_tmp.as_deref());
                    return Err(error);
                }
            };

        if options.verify_after_write {
            if let Err(error) = self.verify(&planned, &checksums, &img_tmp, dir_tmp.as_deref()) {
                self.discard(&img_tmp, dir_tmp.as_deref());
                return Err(error);
            }
        }

        if options.create_backup {
            if let Err(error) = self.write_backups() {
                self.discard(&img_tmp, dir_tmp.as_deref());
                return Err(error);
            }
        }

        // Replacement order matters for V1: data first, directory second.
        if let Err(error) = self.fs.rename(&img_tmp, &self.img_path) {
            self.discard(&img_tmp, dir_tmp.as_deref());
            return Err(error.into());
        }
        if let (Some(tmp), Some(dir_path)) = (dir_tmp.as_deref(), self.dir_path.clone()) {
            if let Err(error) = self.fs.rename(tmp, &dir_path) {
                let _ = self.fs.remove(tmp);
                return Err(error.into());
            }
        }

        let entries: Vec<Entry> = planned
            .iter()
            .map(|p| Entry {
                name: p.name.clone(),
                offset: p.offset,
                size: p.size,
                compression: p.compression,
                uncompressed_size: p.uncompressed_size,
            })
            .collect();
        drop(planned);

        info!(
            entries = entries.len(),
            bytes = needed,
            "rebuilt {}",
            self.img_path.display()
        );

        let reader = self.fs.open_read(&self.img_path)?;
        self.archive = ImgArchive::from_parts(reader, self.version, entries.clone(), Vec::new())?;

        Ok(RebuildResult {
            entries,
            warnings: Vec::new(),
        })
    }

    #[instrument(skip(self, planned, table), err)]
    fn write_temps(
        &mut self,
        planned: &[PlannedEntry],
        table: &[u8],
        img_tmp: &Path,
        dir_tmp: Option<&Path>,
        data_len: u64,
    ) -> Result<Vec<u32>> {
        let mut img_out = self.fs.open_write(img_tmp)?;

        let checksums = match self.version {
            ImgVersion::V1 => {
                let checksums = write_payloads(&mut img_out, self.archive.reader_mut(), planned)?;
                img_out.flush()?;

                let dir_tmp = dir_tmp.expect("V1 rebuild requires a directory temp path");
                let mut dir_out = self.fs.open_write(dir_tmp)?;
                dir_out.write_all(table)?;
                dir_out.flush()?;
                checksums
            }
            _ => {
                img_out.write_all(table)?;
                let first_offset = planned
                    .first()
                    .map(|p| p.offset)
                    .unwrap_or(data_len);
                let mut gap = first_offset - table.len() as u64;
                let zeros = [0u8; 4096];
                while gap > 0 {
                    let chunk = gap.min(zeros.len() as u64) as usize;
                    img_out.write_all(&zeros[..chunk])?;
                    gap -= chunk as u64;
                }
                let checksums = write_payloads(&mut img_out, self.archive.reader_mut(), planned)?;
                img_out.flush()?;
                checksums
            }
        };

        Ok(checksums)
    }

    #[instrument(skip(self, planned, checksums), err)]
    fn verify(
        &self,
        planned: &[PlannedEntry],
        checksums: &[u32],
        img_tmp: &Path,
        dir_tmp: Option<&Path>,
    ) -> Result<()> {
        let rebuilt = match (self.version, dir_tmp) {
            (ImgVersion::V1, Some(dir_tmp)) => ImgArchive::open_v1(
                self.fs.open_read(dir_tmp)?,
                self.fs.open_read(img_tmp)?,
            )?,
            _ => ImgArchive::open_v2(self.fs.open_read(img_tmp)?)?,
        };

        if rebuilt.len() != planned.len() {
            return Err(Error::VerifyFailed(format!(
                "directory holds {} records, expected {}",
                rebuilt.len(),
                planned.len()
            )));
        }

        for (entry, expected) in rebuilt.entries().iter().zip(planned) {
            if !entry.name.eq_ignore_ascii_case(&expected.name)
                || entry.offset != expected.offset
                || entry.size != crate::types::pad_to_sector(expected.size)
            {
                return Err(Error::VerifyFailed(format!(
                    "record for {} does not match the in-memory model",
                    expected.name
                )));
            }
        }

        let mut reader = rebuilt.into_inner();
        for (expected, checksum) in planned.iter().zip(checksums) {
            use std::io::{Read, Seek, SeekFrom};

            reader.seek(SeekFrom::Start(expected.offset))?;
            let mut digest = CRC32.digest();
            let mut remaining = reader.by_ref().take(expected.size);
            let mut buf = [0u8; 65536];
            loop {
                let read = remaining.read(&mut buf)?;
                if read == 0 {
                    break;
                }
                digest.update(&buf[..read]);
            }
            if digest.finalize() != *checksum {
                return Err(Error::VerifyFailed(format!(
                    "payload checksum mismatch for {}",
                    expected.name
                )));
            }
        }

        Ok(())
    }

    #[instrument(skip(self), err)]
    fn write_backups(&self) -> Result<()> {
        self.copy(&self.img_path, &backup_path(&self.img_path))?;
        if let Some(dir_path) = &self.dir_path {
            self.copy(dir_path, &backup_path(dir_path))?;
        }
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let mut reader = self.fs.open_read(from)?;
        let mut writer = self.fs.open_write(to)?;
        std::io::copy(&mut reader, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn discard(&self, img_tmp: &Path, dir_tmp: Option<&Path>) {
        let _ = self.fs.remove(img_tmp);
        if let Some(tmp) = dir_tmp {
            let _ = self.fs.remove(tmp);
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}
