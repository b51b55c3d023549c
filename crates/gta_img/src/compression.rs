//! Payload compression handling.

use std::io::{self, Read, Seek};

use flate2::read::ZlibDecoder;
use tracing::instrument;

use crate::error::{Error, Result};

/// Identifies how an entry's payload bytes are stored.
///
/// The 32-byte directory record has no room for a compression field, so the
/// method is in-memory metadata: declared by the caller when staging an
/// entry, or sniffed from the payload's leading bytes when an archive is
/// opened. Only zlib streams are self-describing; LZO payloads read back as
/// [`CompressionMethod::None`] until the caller re-declares them.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Stores the data as it is
    #[default]
    None,

    /// Data holds a zlib stream
    Zlib,

    /// Data holds an LZO1X-1 stream
    LzoFast,

    /// Data holds an LZO1X-999 stream
    LzoMax,
}

impl CompressionMethod {
    /// Whether payloads of this method are stored transformed.
    pub const fn is_compressed(self) -> bool {
        !matches!(self, CompressionMethod::None)
    }
}

/// Recognize a zlib stream from the first two payload bytes.
///
/// CMF 0x78 is the deflate/32K-window header every zlib encoder emits for
/// these payload sizes; the pair must also satisfy the FCHECK residue.
pub(crate) fn sniff(magic: &[u8]) -> CompressionMethod {
    if magic.len() >= 2 && magic[0] == 0x78 && (u16::from(magic[0]) * 256 + u16::from(magic[1])) % 31 == 0 {
        CompressionMethod::Zlib
    } else {
        CompressionMethod::None
    }
}

pub(crate) enum PayloadReader<'a, R: Read + Seek> {
    Raw(io::Take<&'a mut R>),
    Zlib(Box<ZlibDecoder<io::Take<&'a mut R>>>),
}

impl<'a, R: Read + Seek> PayloadReader<'a, R> {
    #[instrument(skip(reader))]
    pub fn new(
        reader: &'a mut R,
        start: u64,
        limit: u64,
        compression: CompressionMethod,
    ) -> Result<Self> {
        reader.seek(io::SeekFrom::Start(start))?;

        let limit_reader = reader.by_ref().take(limit);
        match compression {
            CompressionMethod::None => Ok(PayloadReader::Raw(limit_reader)),
            CompressionMethod::Zlib => Ok(PayloadReader::Zlib(Box::new(ZlibDecoder::new(
                limit_reader,
            )))),
            other => Err(Error::UnsupportedCompression(other)),
        }
    }
}

impl<R: Read + Seek> Read for PayloadReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            PayloadReader::Raw(r) => r.read(buf),
            PayloadReader::Zlib(r) => r.read(buf),
        }
    }

    fn read_to_end(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        match self {
            PayloadReader::Raw(r) => r.read_to_end(buf),
            PayloadReader::Zlib(r) => r.read_to_end(buf),
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::compression::{sniff, CompressionMethod};

    #[test]
    fn sniff_zlib_default_level() {
        assert_eq!(sniff(&[0x78, 0x9C, 0x00]), CompressionMethod::Zlib);
    }

    #[test]
    fn sniff_zlib_other_levels() {
        assert_eq!(sniff(&[0x78, 0x01]), CompressionMethod::Zlib);
        assert_eq!(sniff(&[0x78, 0xDA]), CompressionMethod::Zlib);
    }

    #[test]
    fn sniff_rejects_renderware_chunks() {
        // DFF and TXD payloads start with a chunk type byte, not 0x78.
        assert_eq!(sniff(&[0x10, 0x00, 0x00, 0x00]), CompressionMethod::None);
        assert_eq!(sniff(&[0x16, 0x00, 0x00, 0x00]), CompressionMethod::None);
    }

    #[test]
    fn sniff_rejects_bad_fcheck() {
        assert_eq!(sniff(&[0x78, 0x9D]), CompressionMethod::None);
    }

    #[test]
    fn sniff_short_input() {
        assert_eq!(sniff(&[0x78]), CompressionMethod::None);
        assert_eq!(sniff(&[]), CompressionMethod::None);
    }
}
