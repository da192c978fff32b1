//! Pixel encodings and the GPU format table.
//!
//! The set of encodings is closed: exactly the shapes needed for HDR
//! environment maps (8/16/32-bit, integer and float, 3/4 channel). Each
//! table row is a plain data record; unknown encodings have no row and
//! fail fast, because mis-sized uploads corrupt GPU memory.

use crate::util::{Error, Result};
use std::fmt;

/// Pixel encoding of an [`ImageBuffer`](crate::image::ImageBuffer).
///
/// Combines channel order, channel count and per-channel storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PixelEncoding {
    /// 8-bit unsigned, blue/green/red
    Bgr8 = 0,
    /// 8-bit unsigned, red/green/blue
    Rgb8 = 1,
    /// 16-bit unsigned, red/green/blue
    Rgb16 = 2,
    /// 16-bit half float, red/green/blue
    Rgb16f = 3,
    /// 32-bit float, red/green/blue
    Rgb32f = 4,
    /// 8-bit unsigned, blue/green/red/alpha
    Bgra8 = 5,
    /// 8-bit unsigned, red/green/blue/alpha
    Rgba8 = 6,
    /// 16-bit unsigned, red/green/blue/alpha
    Rgba16 = 7,
    /// 16-bit half float, red/green/blue/alpha
    Rgba16f = 8,
    /// 32-bit float, red/green/blue/alpha
    Rgba32f = 9,
    /// Unknown/invalid encoding
    #[default]
    Unknown = 127,
}

impl PixelEncoding {
    /// Number of known encodings (excluding Unknown).
    pub const COUNT: usize = 10;

    /// All known encodings, in table order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Bgr8,
        Self::Rgb8,
        Self::Rgb16,
        Self::Rgb16f,
        Self::Rgb32f,
        Self::Bgra8,
        Self::Rgba8,
        Self::Rgba16,
        Self::Rgba16f,
        Self::Rgba32f,
    ];

    /// Number of color channels (3 or 4, 0 for Unknown).
    #[inline]
    pub const fn channel_count(self) -> u32 {
        match self {
            Self::Bgr8 | Self::Rgb8 | Self::Rgb16 | Self::Rgb16f | Self::Rgb32f => 3,
            Self::Bgra8 | Self::Rgba8 | Self::Rgba16 | Self::Rgba16f | Self::Rgba32f => 4,
            Self::Unknown => 0,
        }
    }

    /// Bytes per channel (1, 2 or 4).
    #[inline]
    pub const fn bytes_per_channel(self) -> u32 {
        match self {
            Self::Bgr8 | Self::Rgb8 | Self::Bgra8 | Self::Rgba8 => 1,
            Self::Rgb16 | Self::Rgb16f | Self::Rgba16 | Self::Rgba16f => 2,
            Self::Rgb32f | Self::Rgba32f => 4,
            Self::Unknown => 0,
        }
    }

    /// Bytes per pixel, used for all offset arithmetic.
    #[inline]
    pub const fn bytes_per_pixel(self) -> u32 {
        self.channel_count() * self.bytes_per_channel()
    }

    /// True for half/single float storage.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(
            self,
            Self::Rgb16f | Self::Rgb32f | Self::Rgba16f | Self::Rgba32f
        )
    }

    /// True if the encoding carries an alpha channel.
    #[inline]
    pub const fn has_alpha(self) -> bool {
        self.channel_count() == 4
    }

    /// True if channels are stored blue-first.
    #[inline]
    pub const fn is_bgr(self) -> bool {
        matches!(self, Self::Bgr8 | Self::Bgra8)
    }

    /// The 4-channel variant of this encoding (identity for 4-channel rows).
    ///
    /// 3-channel data must be promoted before GPU upload: consumer GPUs
    /// commonly reject pure-RGB half-float uploads, and wgpu exposes no
    /// 3-channel texture formats at all.
    #[inline]
    pub const fn with_alpha(self) -> Self {
        match self {
            Self::Bgr8 => Self::Bgra8,
            Self::Rgb8 => Self::Rgba8,
            Self::Rgb16 => Self::Rgba16,
            Self::Rgb16f => Self::Rgba16f,
            Self::Rgb32f => Self::Rgba32f,
            other => other,
        }
    }

    /// Returns the name of this encoding as a string.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bgr8 => "bgr8",
            Self::Rgb8 => "rgb8",
            Self::Rgb16 => "rgb16",
            Self::Rgb16f => "rgb16f",
            Self::Rgb32f => "rgb32f",
            Self::Bgra8 => "bgra8",
            Self::Rgba8 => "rgba8",
            Self::Rgba16 => "rgba16",
            Self::Rgba16f => "rgba16f",
            Self::Rgba32f => "rgba32f",
            Self::Unknown => "unknown",
        }
    }

    /// Parse an encoding from its name string.
    pub fn from_name(name: &str) -> Self {
        match name {
            "bgr8" => Self::Bgr8,
            "rgb8" => Self::Rgb8,
            "rgb16" => Self::Rgb16,
            "rgb16f" => Self::Rgb16f,
            "rgb32f" => Self::Rgb32f,
            "bgra8" => Self::Bgra8,
            "rgba8" => Self::Rgba8,
            "rgba16" => Self::Rgba16,
            "rgba16f" => Self::Rgba16f,
            "rgba32f" => Self::Rgba32f,
            _ => Self::Unknown,
        }
    }

    /// Look up the GPU format row for this encoding.
    ///
    /// Unknown encodings are a configuration error, never silently coerced.
    pub fn gpu_format(self) -> Result<GpuFormat> {
        let row = match self {
            Self::Bgr8 => GpuFormat {
                texture_format: wgpu::TextureFormat::Bgra8Unorm,
                upload: Self::Bgra8,
            },
            Self::Rgb8 => GpuFormat {
                texture_format: wgpu::TextureFormat::Rgba8Unorm,
                upload: Self::Rgba8,
            },
            // Rgba16Unorm needs TEXTURE_FORMAT_16BIT_NORM, which default
            // devices do not enable; 16-bit integer sources ride as half
            // float instead.
            Self::Rgb16 => GpuFormat {
                texture_format: wgpu::TextureFormat::Rgba16Float,
                upload: Self::Rgba16f,
            },
            Self::Rgb16f => GpuFormat {
                texture_format: wgpu::TextureFormat::Rgba16Float,
                upload: Self::Rgba16f,
            },
            Self::Rgb32f => GpuFormat {
                texture_format: wgpu::TextureFormat::Rgba32Float,
                upload: Self::Rgba32f,
            },
            Self::Bgra8 => GpuFormat {
                texture_format: wgpu::TextureFormat::Bgra8Unorm,
                upload: Self::Bgra8,
            },
            Self::Rgba8 => GpuFormat {
                texture_format: wgpu::TextureFormat::Rgba8Unorm,
                upload: Self::Rgba8,
            },
            Self::Rgba16 => GpuFormat {
                texture_format: wgpu::TextureFormat::Rgba16Float,
                upload: Self::Rgba16f,
            },
            Self::Rgba16f => GpuFormat {
                texture_format: wgpu::TextureFormat::Rgba16Float,
                upload: Self::Rgba16f,
            },
            Self::Rgba32f => GpuFormat {
                texture_format: wgpu::TextureFormat::Rgba32Float,
                upload: Self::Rgba32f,
            },
            Self::Unknown => {
                return Err(Error::UnsupportedPixelEncoding(self.name().to_string()))
            }
        };
        Ok(row)
    }
}

impl fmt::Display for PixelEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// GPU format triple for one pixel encoding.
///
/// `upload` names the encoding the pixel data must be in when handed to
/// the texture backend; it differs from the table key for every
/// 3-channel row (promotion to 4 channels) and for the 16-bit unorm
/// rows (converted to half float).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpuFormat {
    /// Internal format of the allocated texture.
    pub texture_format: wgpu::TextureFormat,
    /// Encoding the upload data must use.
    pub upload: PixelEncoding,
}
