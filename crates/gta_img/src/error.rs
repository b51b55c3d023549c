//! Error and warning types that can be emitted from this library

use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

use crate::compression::CompressionMethod;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// file is an invalid img archive
    #[error("file is an invalid img archive")]
    InvalidArchive,

    /// the file is neither a V1 pair nor a V2 archive
    #[error("unrecognized archive format")]
    UnknownFormat,

    /// unable to find requested entry
    #[error("unable to find requested entry")]
    EntryNotFound(#[from] EntryNotFoundError),

    /// entry payload extends past the end of the data file
    #[error("entry {0} extends past the end of the data file")]
    TruncatedEntry(String),

    /// two final entries share a case-insensitive name
    #[error("duplicate entry name {0}")]
    DuplicateName(String),

    /// entry name does not fit the 24-byte directory field
    #[error("entry name {0} exceeds 24 bytes")]
    NameTooLong(String),

    /// entry name is empty or contains bytes the directory cannot hold
    #[error("invalid entry name {0:?}")]
    InvalidName(String),

    /// a compressed staged entry must declare an uncompressed size larger
    /// than its stored size
    #[error("staged entry {0} has a missing or contradictory uncompressed size")]
    BadUncompressedSize(String),

    /// archive layout no longer fits 32-bit sector counts
    #[error("archive would exceed the 32-bit sector range")]
    ArchiveTooLarge,

    /// the target volume cannot hold the rebuilt archive
    #[error("not enough free space: need {needed} bytes, {available} available")]
    InsufficientDiskSpace {
        /// Bytes the rebuild would write
        needed: u64,
        /// Bytes reported free on the target volume
        available: u64,
    },

    /// no decoder is available for this compression method
    #[error("no decoder available for {0:?} payloads")]
    UnsupportedCompression(CompressionMethod),

    /// the rebuilt output did not match the in-memory model
    #[error("rebuild verification failed: {0}")]
    VerifyFailed(String),

    /// {0}
    #[error("{0}")]
    CustomError(String),
}

/// Error type to provide further information when an entry has not been found
#[derive(Error, Diagnostic, Debug)]
#[error("unable to find requested entry")]
pub enum EntryNotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(usize),

    /// by name {0}
    #[error("by name {0}")]
    Name(String),
}

/// Non-fatal conditions collected while reading or rebuilding an archive.
///
/// Warnings are returned alongside successful results rather than thrown;
/// an archive that produced warnings is degraded but still usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// No `VER2` signature and no sibling directory file; treated as V2.
    AmbiguousVersion,

    /// A later directory record reuses an earlier record's name.
    DuplicateEntryName(String),

    /// The name field contained control bytes.
    NameControlBytes(String),

    /// The directory claims a payload range past the end of the data file.
    EntryOutOfBounds(String),

    /// The directory file length is not a whole number of records; the
    /// trailing fragment was ignored.
    TruncatedDirectory,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::AmbiguousVersion => {
                write!(f, "no VER2 signature and no directory file; assuming V2")
            }
            Warning::DuplicateEntryName(name) => {
                write!(f, "duplicate directory entry {name}")
            }
            Warning::NameControlBytes(name) => {
                write!(f, "entry name {name:?} contains control bytes")
            }
            Warning::EntryOutOfBounds(name) => {
                write!(f, "entry {name} lies past the end of the data file")
            }
            Warning::TruncatedDirectory => {
                write!(f, "directory ends in a partial record")
            }
        }
    }
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
