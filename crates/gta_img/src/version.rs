//! Archive format version detection.

use std::io::Read;
use std::path::Path;

use tracing::instrument;

use crate::error::{Result, Warning};
use crate::vfs::ArchiveFs;

/// The container layout of an IMG archive. Immutable once detected.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImgVersion {
    /// Separate directory (`.dir`) and data (`.img`) file pair, as shipped
    /// with GTA III and Vice City
    V1,

    /// Single self-describing file starting with the `VER2` signature, as
    /// shipped with San Andreas
    V2,

    /// Neither layout could be established
    Unknown,
}

impl ImgVersion {
    /// Whether this version stores its directory in a sibling file.
    pub const fn has_directory_file(self) -> bool {
        matches!(self, ImgVersion::V1)
    }
}

/// Path of the V1 directory file that would accompany `img_path`.
pub fn directory_path_for(img_path: &Path) -> std::path::PathBuf {
    img_path.with_extension("dir")
}

/// Resolve the archive version for the data file at `path`.
///
/// A sibling `.dir` file wins over everything; otherwise the `VER2`
/// signature decides. A `.img` file with neither is assumed to be V2 and
/// flagged with [`Warning::AmbiguousVersion`] so callers can surface the
/// condition without failing.
#[instrument(skip(fs), err)]
pub fn detect_version(fs: &dyn ArchiveFs, path: &Path) -> Result<(ImgVersion, Vec<Warning>)> {
    if fs.exists(&directory_path_for(path)) {
        return Ok((ImgVersion::V1, Vec::new()));
    }

    let mut magic = [0u8; 4];
    let mut reader = fs.open_read(path)?;
    let read = reader.read(&mut magic)?;
    if read == 4 && &magic == b"VER2" {
        return Ok((ImgVersion::V2, Vec::new()));
    }

    let is_img = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("img"));
    if is_img {
        return Ok((ImgVersion::V2, vec![Warning::AmbiguousVersion]));
    }

    Ok((ImgVersion::Unknown, Vec::new()))
}
