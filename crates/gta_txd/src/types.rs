//! Input types for texture dictionary serialization.

use bon::Builder;

/// Pixel storage format of a texture's mip levels.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PixelFormat {
    /// BC1 block compression, 8 bytes per 4x4 block
    Dxt1,
    /// BC2 block compression, 16 bytes per 4x4 block
    Dxt3,
    /// BC3 block compression, 16 bytes per 4x4 block
    Dxt5,
    /// 32-bit uncompressed with alpha
    Argb8888,
    /// 24-bit uncompressed
    Rgb888,
    /// 16-bit, 1-bit alpha
    Argb1555,
    /// 16-bit, no alpha
    Rgb565,
    /// 8-bit palettized
    Pal8,
}

impl PixelFormat {
    /// Whether this format stores DXT-compressed blocks.
    pub const fn is_dxt(self) -> bool {
        matches!(self, PixelFormat::Dxt1 | PixelFormat::Dxt3 | PixelFormat::Dxt5)
    }

    /// Raster format code written into the texture struct. Mipmap and
    /// bumpmap flag bits are OR-ed in by the serializer.
    pub const fn raster_code(self, has_alpha: bool) -> u32 {
        match self {
            PixelFormat::Dxt1 => {
                if has_alpha {
                    0x0100
                } else {
                    0x0200
                }
            }
            PixelFormat::Dxt3 | PixelFormat::Dxt5 => 0x0300,
            PixelFormat::Argb8888 => 0x0500,
            PixelFormat::Rgb888 => 0x0600,
            PixelFormat::Argb1555 => 0x0100,
            PixelFormat::Rgb565 => 0x0200,
            PixelFormat::Pal8 => 0x2500,
        }
    }

    /// Direct3D format code: a FourCC for DXT variants, a `D3DFMT` value
    /// otherwise.
    pub const fn d3d_format(self) -> u32 {
        match self {
            PixelFormat::Dxt1 => u32::from_le_bytes(*b"DXT1"),
            PixelFormat::Dxt3 => u32::from_le_bytes(*b"DXT3"),
            PixelFormat::Dxt5 => u32::from_le_bytes(*b"DXT5"),
            PixelFormat::Argb8888 => 21,
            PixelFormat::Rgb888 => 20,
            PixelFormat::Argb1555 => 25,
            PixelFormat::Rgb565 => 23,
            PixelFormat::Pal8 => 41,
        }
    }

    /// Analytic byte size of one mip level of `width` x `height` pixels.
    pub const fn mip_size(self, width: u32, height: u32) -> usize {
        let (width, height) = (width as usize, height as usize);
        match self {
            PixelFormat::Dxt1 => width.div_ceil(4) * height.div_ceil(4) * 8,
            PixelFormat::Dxt3 | PixelFormat::Dxt5 => {
                width.div_ceil(4) * height.div_ceil(4) * 16
            }
            PixelFormat::Argb8888 => width * height * 4,
            PixelFormat::Rgb888 => width * height * 3,
            PixelFormat::Pal8 => width * height,
            PixelFormat::Argb1555 | PixelFormat::Rgb565 => width * height * 2,
        }
    }
}

/// Expected byte sizes for `levels` mip levels, halving each dimension
/// (flooring, minimum 1) per level.
pub fn mip_level_sizes(format: PixelFormat, width: u32, height: u32, levels: u8) -> Vec<usize> {
    let (mut width, mut height) = (width, height);
    let mut sizes = Vec::with_capacity(levels as usize);
    for _ in 0..levels {
        sizes.push(format.mip_size(width, height));
        width = (width / 2).max(1);
        height = (height / 2).max(1);
    }
    sizes
}

/// An embedded bumpmap channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bumpmap {
    /// Bumpmap encoding tag, written verbatim after the block's size prefix
    pub kind: u8,
    /// Channel bytes
    pub data: Vec<u8>,
}

/// One texture to be serialized into a dictionary.
///
/// Created by the caller from decoded image data and consumed once by the
/// serializer; the dictionary does not retain it.
#[derive(Debug, Clone, Builder)]
pub struct TextureRecord {
    /// Texture name; at most 31 bytes survive the fixed 32-byte field
    #[builder(into)]
    pub name: String,

    /// Name of the separate alpha texture, when one exists
    #[builder(into)]
    pub alpha_name: Option<String>,

    /// Width of the largest mip level, in pixels
    pub width: u16,

    /// Height of the largest mip level, in pixels
    pub height: u16,

    /// Bits per pixel as recorded in the struct header
    pub bit_depth: u8,

    /// Storage format of the mip level payloads
    pub pixel_format: PixelFormat,

    /// Whether the texture carries alpha
    #[builder(default)]
    pub has_alpha: bool,

    /// Pre-encoded mip level payloads, largest first
    #[builder(default)]
    pub mip_levels: Vec<Vec<u8>>,

    /// Raw pixel data used to synthesize a single mip level when
    /// `mip_levels` is empty
    pub raw_pixels: Option<Vec<u8>>,

    /// Optional bumpmap channel
    pub bumpmap: Option<Bumpmap>,

    /// Optional reflection map block, written before the fresnel block
    pub reflection_map: Option<Vec<u8>>,

    /// Optional fresnel map block
    pub fresnel_map: Option<Vec<u8>>,
}
