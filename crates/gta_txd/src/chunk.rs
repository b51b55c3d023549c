//! RenderWare chunk headers.
//!
//! Every RenderWare binary unit starts with the same 12-byte header: a
//! chunk type, the byte length of the content that follows (excluding the
//! header itself) and a version stamp.

use binrw::{BinRead, BinWrite};
use winnow::binary::le_u32;
use winnow::combinator::seq;
use winnow::prelude::*;
use winnow::token::take;
use winnow::PResult;

use crate::error::{Error, Result};

/// Chunk type ids used by texture dictionaries.
pub mod id {
    /// Raw structure section of a composite chunk
    pub const STRUCT: u32 = 0x01;
    /// NUL-terminated string chunk
    pub const STRING: u32 = 0x02;
    /// Extension envelope, possibly empty
    pub const EXTENSION: u32 = 0x03;
    /// Platform-specific texture payload
    pub const TEXTURE_NATIVE: u32 = 0x15;
    /// Dictionary of texture natives
    pub const TEXTURE_DICTIONARY: u32 = 0x16;
}

/// Size of the chunk header on disk.
pub const HEADER_SIZE: u32 = 12;

/// The 12-byte header preceding every chunk's content.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct ChunkHeader {
    /// Chunk type id
    pub kind: u32,

    /// Byte length of the chunk's content, excluding this header
    pub size: u32,

    /// RenderWare library version stamp
    pub version: u32,
}

fn header(s: &mut &[u8]) -> PResult<ChunkHeader> {
    seq!(ChunkHeader {
        kind: le_u32,
        size: le_u32,
        version: le_u32,
    })
    .parse_next(s)
}

impl ChunkHeader {
    /// Parse a header from the front of `data`. Trailing bytes are ignored.
    pub fn parse(data: &[u8]) -> Result<ChunkHeader> {
        let mut buf = data;
        header(&mut buf).map_err(|_| Error::InvalidChunkHeader)
    }
}

/// A chunk header together with its content slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub header: ChunkHeader,
    pub data: &'a [u8],
}

fn chunk<'s>(s: &mut &'s [u8]) -> PResult<Chunk<'s>> {
    let header = header.parse_next(s)?;
    let data = take(header.size).parse_next(s)?;
    Ok(Chunk { header, data })
}

impl Chunk<'_> {
    /// Parse one complete chunk from the front of `data`.
    pub fn parse(data: &[u8]) -> Result<Chunk<'_>> {
        let mut buf = data;
        chunk(&mut buf).map_err(|_| Error::InvalidChunkHeader)
    }

    /// Split `data` into consecutive chunks until it is exhausted.
    pub fn parse_all(data: &[u8]) -> Result<Vec<Chunk<'_>>> {
        let mut buf = data;
        let mut chunks = Vec::new();
        while !buf.is_empty() {
            chunks.push(chunk(&mut buf).map_err(|_| Error::InvalidChunkHeader)?);
        }
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use binrw::BinWrite;
    use pretty_assertions::assert_eq;

    use crate::chunk::{id, Chunk, ChunkHeader};

    #[test]
    fn read_header() {
        #[rustfmt::skip]
        let input = [
            0x16, 0x00, 0x00, 0x00,  // Type
            0x04, 0x00, 0x00, 0x00,  // Size
            0xFF, 0xFF, 0x03, 0x18,  // Version
        ];

        let result = ChunkHeader::parse(&input).unwrap();

        assert_eq!(
            result,
            ChunkHeader {
                kind: id::TEXTURE_DICTIONARY,
                size: 4,
                version: 0x1803FFFF,
            }
        );
    }

    #[test]
    fn read_header_ignores_trailing_bytes() {
        #[rustfmt::skip]
        let input = [
            0x01, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0xFF, 0xFF, 0x03, 0x18,
            0xDE, 0xAD, 0xBE, 0xEF,
        ];

        assert!(ChunkHeader::parse(&input).is_ok());
    }

    #[test]
    fn read_header_too_short() {
        assert!(ChunkHeader::parse(&[0x16, 0x00]).is_err());
        assert!(ChunkHeader::parse(&[]).is_err());
    }

    #[test]
    fn read_chunk_with_data() {
        #[rustfmt::skip]
        let input = [
            0x02, 0x00, 0x00, 0x00,  // Type
            0x04, 0x00, 0x00, 0x00,  // Size
            0xFF, 0xFF, 0x03, 0x18,  // Version
            b'g', b't', b'a', 0x00,  // Content
        ];

        let result = Chunk::parse(&input).unwrap();

        assert_eq!(result.header.kind, id::STRING);
        assert_eq!(result.data, b"gta\x00");
    }

    #[test]
    fn read_chunk_truncated_content() {
        #[rustfmt::skip]
        let input = [
            0x02, 0x00, 0x00, 0x00,
            0x08, 0x00, 0x00, 0x00,
            0xFF, 0xFF, 0x03, 0x18,
            b'g', b't', b'a', 0x00,
        ];

        assert!(Chunk::parse(&input).is_err());
    }

    #[test]
    fn parse_all_walks_siblings() {
        let mut input = Cursor::new(Vec::new());
        for kind in [id::STRUCT, id::EXTENSION] {
            ChunkHeader {
                kind,
                size: 0,
                version: 0x1803FFFF,
            }
            .write(&mut input)
            .unwrap();
        }

        let input = input.into_inner();
        let chunks = Chunk::parse_all(&input).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].header.kind, id::STRUCT);
        assert_eq!(chunks[1].header.kind, id::EXTENSION);
    }
}
