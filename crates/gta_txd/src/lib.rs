//! This library handles serializing **TXD** texture dictionaries used by the
//! 3D-universe era of *Grand Theft Auto* games.
//!
//! # TXD Format Documentation
//!
//! A TXD file is a RenderWare chunk stream: every binary unit starts with a
//! 12-byte header carrying a chunk type, the byte length of the content that
//! follows, and a library version stamp. All data is stored in little endian
//! format.
//!
//! ## Chunk Header
//!
//! | Offset (bytes) | Field     | Description                                      |
//! |----------------|-----------|--------------------------------------------------|
//! | 0x0000         | Type      | 4 bytes: Chunk type id                           |
//! | 0x0004         | Size      | 4 bytes: Content length, excluding this header   |
//! | 0x0008         | Version   | 4 bytes: RenderWare library version stamp        |
//!
//! ## Dictionary Layout
//!
//! The outer `TextureDictionary` chunk (`0x16`) contains a `Struct` chunk
//! (`0x01`) holding the texture count, one `TextureNative` chunk (`0x15`) per
//! texture, and a trailing empty `Extension` chunk (`0x03`).
//!
//! ## TextureNative Struct
//!
//! | Offset (bytes) | Field            | Description                           |
//! |----------------|------------------|---------------------------------------|
//! | 0x0000         | Platform Id      | 4 bytes: Rendering platform           |
//! | 0x0004         | Filter Flags     | 4 bytes: Sampler filter/address mode  |
//! | 0x0008         | Name             | 32 bytes: Texture name, NUL-padded    |
//! | 0x0028         | Alpha Name       | 32 bytes: Alpha texture, NUL-padded   |
//! | 0x0048         | Raster Format    | 4 bytes: Pixel format and flag bits   |
//! | 0x004C         | D3D Format       | 4 bytes: FourCC or `D3DFMT` value     |
//! | 0x0050         | Width            | 2 bytes                               |
//! | 0x0052         | Height           | 2 bytes                               |
//! | 0x0054         | Depth            | 1 byte: Bits per pixel                |
//! | 0x0055         | Mipmap Count     | 1 byte                                |
//! | 0x0056         | Raster Type      | 1 byte                                |
//! | 0x0057         | Compression Flag | 1 byte: `0x08` for DXT rasters        |
//! | 0x0058         | Total Data Size  | 4 bytes: Payload bytes that follow    |
//!
//! The mip level payloads follow immediately, largest first, then optional
//! bumpmap/reflection/fresnel blocks. The version detection in
//! [`version::detect_sub_format`] reads the stamp at byte 8 of any
//! RenderWare payload's leading chunk header and never fails.
//!

pub mod chunk;
pub mod error;
pub mod types;
pub mod version;
pub mod write;

pub use chunk::{Chunk, ChunkHeader};
pub use types::{mip_level_sizes, Bumpmap, PixelFormat, TextureRecord};
pub use version::{detect_sub_format, version_label};
pub use write::serialize;
