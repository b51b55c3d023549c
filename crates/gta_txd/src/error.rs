//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// input does not start with a RenderWare chunk header
    #[error("input does not start with a RenderWare chunk header")]
    InvalidChunkHeader,

    /// a texture dictionary must contain at least one texture
    #[error("a texture dictionary must contain at least one texture")]
    EmptyInput,
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
