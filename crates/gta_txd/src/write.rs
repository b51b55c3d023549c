//! Types for serializing texture dictionaries
//!

use std::borrow::Cow;
use std::io::Cursor;

use binrw::BinWrite;
use byteorder::{LittleEndian, WriteBytesExt};
use tracing::instrument;

use crate::chunk::{id, ChunkHeader};
use crate::error::{Error, Result};
use crate::types::TextureRecord;
use crate::version::RW_3_6_0_3;

/// Platform id written into every texture struct (Direct3D 9).
pub const PLATFORM_D3D9: u32 = 9;

/// Filter flags written into every texture struct: linear filtering with
/// wrap addressing on both axes.
pub const DEFAULT_FILTER_FLAGS: u32 = 0x1102;

/// Raster type of an ordinary texture.
pub const RASTER_TYPE_TEXTURE: u8 = 4;

/// Raster format bit set when more than one mip level is present.
pub const FORMAT_MIPMAPPED: u32 = 0x0400;

/// Raster format bit set when a bumpmap channel is embedded.
pub const FORMAT_BUMPMAP: u32 = 0x10;

/// Compression flag value for DXT-compressed rasters.
pub const COMPRESSION_DXT: u8 = 0x08;

/// Encode `textures` as a RenderWare texture dictionary chunk stream.
///
/// The output is an outer `TextureDictionary` chunk holding a `Struct`
/// chunk with the texture count, one `TextureNative` chunk per texture and
/// a trailing empty `Extension` chunk. Serialization cannot fail on valid
/// input; the only rejected input is an empty texture list.
#[instrument(skip(textures), fields(count = textures.len()), err)]
pub fn serialize(textures: &[TextureRecord]) -> Result<Vec<u8>> {
    if textures.is_empty() {
        return Err(Error::EmptyInput);
    }

    let mut dict = Vec::new();
    push_chunk(&mut dict, id::STRUCT, &(textures.len() as u32).to_le_bytes())?;
    for texture in textures {
        let native = texture_native(texture)?;
        push_chunk(&mut dict, id::TEXTURE_NATIVE, &native)?;
    }
    push_chunk(&mut dict, id::EXTENSION, &[])?;

    let mut out = Vec::with_capacity(dict.len() + 12);
    push_chunk(&mut out, id::TEXTURE_DICTIONARY, &dict)?;
    Ok(out)
}

fn push_chunk(out: &mut Vec<u8>, kind: u32, content: &[u8]) -> Result<()> {
    let mut header = Cursor::new([0u8; 12]);
    ChunkHeader {
        kind,
        size: content.len() as u32,
        version: RW_3_6_0_3,
    }
    .write(&mut header)?;

    out.extend_from_slice(&header.into_inner());
    out.extend_from_slice(content);
    Ok(())
}

/// NUL-padded fixed-width name field. Everything past 31 bytes is dropped
/// so the field always terminates.
fn name_field(name: &str) -> [u8; 32] {
    let mut field = [0u8; 32];
    let bytes = name.as_bytes();
    let len = bytes.len().min(31);
    field[..len].copy_from_slice(&bytes[..len]);
    field
}

/// The mip payloads to serialize: the caller's levels verbatim, or a
/// single level synthesized from raw pixel data (zero-padded or truncated
/// to the analytic size for the format).
fn mip_payloads(texture: &TextureRecord) -> Vec<Cow<'_, [u8]>> {
    if !texture.mip_levels.is_empty() {
        return texture
            .mip_levels
            .iter()
            .map(|level| Cow::Borrowed(level.as_slice()))
            .collect();
    }

    let size = texture
        .pixel_format
        .mip_size(u32::from(texture.width), u32::from(texture.height));
    let mut level = texture.raw_pixels.clone().unwrap_or_default();
    level.resize(size, 0);
    vec![Cow::Owned(level)]
}

fn texture_native(texture: &TextureRecord) -> Result<Vec<u8>> {
    let mips = mip_payloads(texture);

    let mut raster_format = texture
        .pixel_format
        .raster_code(texture.has_alpha);
    if mips.len() > 1 {
        raster_format |= FORMAT_MIPMAPPED;
    }
    if texture.bumpmap.is_some() {
        raster_format |= FORMAT_BUMPMAP;
    }

    let compression_flag = if texture.pixel_format.is_dxt() {
        COMPRESSION_DXT
    } else {
        0
    };

    // The data size field is computed from what will actually be written,
    // auxiliary block prefixes included; downstream readers trust it for
    // bounds.
    let mut total_data_size: u64 = mips.iter().map(|m| m.len() as u64).sum();
    if let Some(bumpmap) = &texture.bumpmap {
        total_data_size += 4 + 1 + bumpmap.data.len() as u64;
    }
    if let Some(reflection) = &texture.reflection_map {
        total_data_size += 4 + reflection.len() as u64;
    }
    if let Some(fresnel) = &texture.fresnel_map {
        total_data_size += 4 + fresnel.len() as u64;
    }

    let mut out = Vec::new();
    out.write_u32::<LittleEndian>(PLATFORM_D3D9)?;
    out.write_u32::<LittleEndian>(DEFAULT_FILTER_FLAGS)?;
    out.extend_from_slice(&name_field(&texture.name));
    out.extend_from_slice(&name_field(
        texture.alpha_name.as_deref().unwrap_or(""),
    ));
    out.write_u32::<LittleEndian>(raster_format)?;
    out.write_u32::<LittleEndian>(texture.pixel_format.d3d_format())?;
    out.write_u16::<LittleEndian>(texture.width)?;
    out.write_u16::<LittleEndian>(texture.height)?;
    out.write_u8(texture.bit_depth)?;
    out.write_u8(mips.len() as u8)?;
    out.write_u8(RASTER_TYPE_TEXTURE)?;
    out.write_u8(compression_flag)?;
    out.write_u32::<LittleEndian>(total_data_size as u32)?;

    // The struct section ends on a 4-byte boundary before payloads begin.
    while out.len() % 4 != 0 {
        out.push(0);
    }

    for mip in &mips {
        out.extend_from_slice(mip);
    }

    if let Some(bumpmap) = &texture.bumpmap {
        out.write_u32::<LittleEndian>(bumpmap.data.len() as u32)?;
        out.write_u8(bumpmap.kind)?;
        out.extend_from_slice(&bumpmap.data);
    }
    if let Some(reflection) = &texture.reflection_map {
        out.write_u32::<LittleEndian>(reflection.len() as u32)?;
        out.extend_from_slice(reflection);
    }
    if let Some(fresnel) = &texture.fresnel_map {
        out.write_u32::<LittleEndian>(fresnel.len() as u32)?;
        out.extend_from_slice(fresnel);
    }

    Ok(out)
}
