//! Image codec: decoding source assets and reading/writing cache files.
//!
//! Flat sources (HDR/EXR/PNG/JPEG) go through the `image` crate; `.dds`
//! files go through the in-crate [`dds`] module, which is the only
//! container here that carries multi-face, multi-mip float images.

pub mod dds;

use crate::image::{ImageBuffer, PixelEncoding};
use crate::util::{Error, Result};
use std::path::Path;

/// Load an image from disk and convert it to the target encoding.
///
/// Any decode failure is an [`Error::SourceLoad`]; callers decide
/// whether that aborts the operation (source assets) or falls back
/// (cache files).
pub fn load(path: &Path, target: PixelEncoding) -> Result<ImageBuffer> {
    let is_dds = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("dds"))
        .unwrap_or(false);

    let image = if is_dds {
        dds::read(path).map_err(|e| Error::source_load(path, e.to_string()))?
    } else {
        decode_flat(path)?
    };
    image.convert(target)
}

/// Load an image from disk, keeping whatever encoding the file carries.
pub fn load_native(path: &Path) -> Result<ImageBuffer> {
    if path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("dds"))
        .unwrap_or(false)
    {
        dds::read(path).map_err(|e| Error::source_load(path, e.to_string()))
    } else {
        decode_flat(path)
    }
}

/// Decode a flat (single-face) image through the `image` crate.
fn decode_flat(path: &Path) -> Result<ImageBuffer> {
    use ::image::ImageReader;

    let decoded = ImageReader::open(path)
        .map_err(|e| Error::source_load(path, e.to_string()))?
        .decode()
        .map_err(|e| Error::source_load(path, e.to_string()))?;
    let width = decoded.width();
    let height = decoded.height();
    let rgba = decoded.into_rgba32f();
    let data: Vec<u8> = bytemuck::cast_slice(rgba.as_raw()).to_vec();
    ImageBuffer::new_2d(data, width, height, PixelEncoding::Rgba32f)
}
