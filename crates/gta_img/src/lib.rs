//! This library handles reading from and rebuilding **IMG** archives used by the
//! 3D-universe era of *Grand Theft Auto* games.
//!
//! # IMG Archive Format Documentation
//!
//! This crate provides utilities to read, stage changes against, and atomically
//! rebuild the **IMG** container format used by *GTA III*, *Vice City* and
//! *San Andreas*. An IMG archive stores many named, offset-addressed payload
//! blobs (models, texture dictionaries, collision data and the like) aligned to
//! 2048-byte sectors.
//!
//! ## File Structure
//!
//! Two container layouts exist. **V1** splits the archive into a directory file
//! (`.dir`) and a data file (`.img`); **V2** is a single `.img` file carrying
//! its own directory.
//!
//! ### V2 Header
//!
//! | Offset (bytes) | Field         | Description                                |
//! |----------------|---------------|--------------------------------------------|
//! | 0x0000         | Signature     | 4 bytes: `"VER2"`                          |
//! | 0x0004         | Entry Count   | 4 bytes: Number of directory records       |
//!
//! The records follow immediately, and the payload region begins at the first
//! sector boundary after them. A V1 archive has no header; its `.dir` file is
//! nothing but records, and payloads start at offset zero of the data file.
//!
//! ### Directory Record
//!
//! Both layouts share the same 32-byte record:
//!
//! | Offset (bytes) | Field          | Description                                  |
//! |----------------|----------------|----------------------------------------------|
//! | 0x0000         | Name           | 24 bytes: Entry name, NUL-padded             |
//! | 0x0018         | Offset         | 4 bytes: Payload offset, in 2048-byte sectors|
//! | 0x001C         | Size           | 4 bytes: Payload size, in 2048-byte sectors  |
//!
//! Offsets and sizes are stored in sectors, so every payload occupies a whole
//! number of sectors on disk and exact byte lengths are not recoverable from a
//! cold directory parse. Names resolve case-insensitively; directory order is
//! the canonical entry order.
//!
//! ## Rebuilding
//!
//! Mutations are staged against an open [`ImgSession`] and applied in one
//! atomic [`ImgSession::commit`]: the final entry set is computed once,
//! offsets are reassigned sequentially (which makes sector alignment and
//! non-overlap hold by construction), and the output is written to temporary
//! files that are renamed over the originals only after the write succeeds.
//! A failed rebuild never touches the prior archive.
//!
//! ## Additional Information
//!
//! - **File Extensions**: `.img` (+ `.dir` for V1)
//! - **Endianness**: Little-endian for all multi-byte integers
//! - **Sector size**: 2048 bytes
//!

pub mod compression;
pub mod entry;
pub mod error;
pub mod read;
pub mod session;
pub mod types;
pub mod version;
pub mod vfs;
pub mod write;

pub use compression::CompressionMethod;
pub use entry::{Entry, EntryKind};
pub use error::Warning;
pub use read::ImgArchive;
pub use session::{ImgSession, StagedOp};
pub use version::{detect_version, ImgVersion};
pub use vfs::{ArchiveFs, MemFs, StdFs};
pub use write::{RebuildOptions, RebuildResult};
