//! Byte-source abstraction the core reads and writes through.
//!
//! The rebuilder never opens files directly; it goes through [`ArchiveFs`]
//! so an embedding application can interpose its own storage, and so the
//! atomic-replace sequence can be exercised against an in-memory
//! implementation with injectable failures.

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Combined reader bound used for archive data sources.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// Filesystem operations the archive core depends on.
pub trait ArchiveFs {
    /// Open a file for random-access reading.
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>>;

    /// Create (or truncate) a file for writing. Used only for temporary
    /// and backup outputs; the rebuilder never opens a live archive file
    /// for writing.
    fn open_write(&self, path: &Path) -> io::Result<Box<dyn Write>>;

    /// Atomically move `from` over `to`.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Delete a file. Used to discard temporary outputs after a failed
    /// rebuild.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Whether a file exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Length of the file at `path` in bytes.
    fn size_of(&self, path: &Path) -> io::Result<u64>;

    /// Free space on the volume holding `path`, when determinable.
    /// `None` skips the pre-write disk-space check.
    fn free_space(&self, path: &Path) -> Option<u64>;
}

/// [`ArchiveFs`] over [`std::fs`].
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFs;

impl ArchiveFs for StdFs {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>> {
        Ok(Box::new(std::fs::File::open(path)?))
    }

    fn open_write(&self, path: &Path) -> io::Result<Box<dyn Write>> {
        Ok(Box::new(io::BufWriter::new(std::fs::File::create(path)?)))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn size_of(&self, path: &Path) -> io::Result<u64> {
        Ok(std::fs::metadata(path)?.len())
    }

    fn free_space(&self, _path: &Path) -> Option<u64> {
        None
    }
}

#[derive(Debug, Default)]
struct MemFsInner {
    files: HashMap<PathBuf, Vec<u8>>,
    /// Total payload bytes `open_write` streams may accept before failing.
    write_budget: Option<u64>,
    free_space: Option<u64>,
}

/// In-memory [`ArchiveFs`] for tests and embedders without a real
/// filesystem. Supports injecting a write failure after a byte budget to
/// exercise the rebuilder's all-or-nothing contract.
#[derive(Debug, Default, Clone)]
pub struct MemFs {
    inner: Arc<Mutex<MemFsInner>>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file.
    pub fn insert(&self, path: impl Into<PathBuf>, data: Vec<u8>) {
        self.inner.lock().unwrap().files.insert(path.into(), data);
    }

    /// Snapshot a file's current contents.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.inner
            .lock()
            .unwrap()
            .files
            .get(path.as_ref())
            .cloned()
    }

    /// All writers combined will fail with an I/O error once `bytes` have
    /// been accepted.
    pub fn fail_writes_after(&self, bytes: u64) {
        self.inner.lock().unwrap().write_budget = Some(bytes);
    }

    /// Report a fixed free-space figure from [`ArchiveFs::free_space`].
    pub fn set_free_space(&self, bytes: u64) {
        self.inner.lock().unwrap().free_space = Some(bytes);
    }

    /// Names of all files currently present.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.inner.lock().unwrap().files.keys().cloned().collect();
        paths.sort();
        paths
    }
}

struct MemWriter {
    inner: Arc<Mutex<MemFsInner>>,
    path: PathBuf,
}

impl Write for MemWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(budget) = inner.write_budget.as_mut() {
            if (buf.len() as u64) > *budget {
                *budget = 0;
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "injected write failure",
                ));
            }
            *budget -= buf.len() as u64;
        }
        inner
            .files
            .get_mut(&self.path)
            .expect("writer target removed while open")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ArchiveFs for MemFs {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>> {
        let inner = self.inner.lock().unwrap();
        let data = inner
            .files
            .get(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))?
            .clone();
        Ok(Box::new(Cursor::new(data)))
    }

    fn open_write(&self, path: &Path) -> io::Result<Box<dyn Write>> {
        self.inner
            .lock()
            .unwrap()
            .files
            .insert(path.to_path_buf(), Vec::new());
        Ok(Box::new(MemWriter {
            inner: Arc::clone(&self.inner),
            path: path.to_path_buf(),
        }))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let data = inner
            .files
            .remove(from)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, from.display().to_string()))?;
        inner.files.insert(to.to_path_buf(), data);
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.inner
            .lock()
            .unwrap()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.lock().unwrap().files.contains_key(path)
    }

    fn size_of(&self, path: &Path) -> io::Result<u64> {
        self.inner
            .lock()
            .unwrap()
            .files
            .get(path)
            .map(|d| d.len() as u64)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn free_space(&self, _path: &Path) -> Option<u64> {
        self.inner.lock().unwrap().free_space
    }
}
