//! Minimal DDS container support for filter result caching.
//!
//! Cache files are cubemaps with a full mip chain in one of the two
//! float formats the cache writes (FourCC 113 = RGBA16F, 116 = RGBA32F).
//! The payload is face-major, each face carrying its mips from largest
//! to smallest, which is exactly the [`ImageBuffer`] layout, so reads
//! and writes are header handling plus one straight copy.

use crate::image::{ImageBuffer, PixelEncoding};
use crate::util::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};
use std::path::Path;

/// Magic bytes at the start of a DDS file ("DDS ").
pub const DDS_MAGIC: u32 = 0x2053_4444;

/// Size of the DDS header in bytes (excluding the magic).
pub const HEADER_SIZE: u32 = 124;

/// Size of the embedded pixel format block.
pub const PIXEL_FORMAT_SIZE: u32 = 32;

// Header flags.
const DDSD_CAPS: u32 = 0x1;
const DDSD_HEIGHT: u32 = 0x2;
const DDSD_WIDTH: u32 = 0x4;
const DDSD_PIXELFORMAT: u32 = 0x1000;
const DDSD_MIPMAPCOUNT: u32 = 0x20000;

// Pixel format flags.
const DDPF_FOURCC: u32 = 0x4;

// Caps.
const DDSCAPS_COMPLEX: u32 = 0x8;
const DDSCAPS_TEXTURE: u32 = 0x1000;
const DDSCAPS_MIPMAP: u32 = 0x40_0000;

// Caps2: cubemap with all six faces present.
const DDSCAPS2_CUBEMAP: u32 = 0x200;
const DDSCAPS2_CUBEMAP_ALL_FACES: u32 = 0xFC00;

/// D3D format code for 16-bit float RGBA.
const D3DFMT_A16B16G16R16F: u32 = 113;
/// D3D format code for 32-bit float RGBA.
const D3DFMT_A32B32G32R32F: u32 = 116;

fn fourcc_for(encoding: PixelEncoding) -> Result<u32> {
    match encoding {
        PixelEncoding::Rgba16f => Ok(D3DFMT_A16B16G16R16F),
        PixelEncoding::Rgba32f => Ok(D3DFMT_A32B32G32R32F),
        other => Err(Error::UnsupportedPixelEncoding(format!(
            "{other} has no DDS storage mapping"
        ))),
    }
}

fn encoding_for(fourcc: u32) -> Result<PixelEncoding> {
    match fourcc {
        D3DFMT_A16B16G16R16F => Ok(PixelEncoding::Rgba16f),
        D3DFMT_A32B32G32R32F => Ok(PixelEncoding::Rgba32f),
        other => Err(Error::UnsupportedPixelEncoding(format!(
            "DDS FourCC {other}"
        ))),
    }
}

/// Write an image to a DDS file, converting to the given storage
/// encoding first (RGBA16F or RGBA32F).
pub fn save(image: ImageBuffer, path: &Path, encoding: PixelEncoding) -> Result<()> {
    let fourcc = fourcc_for(encoding)?;
    let image = image.convert(encoding)?;

    let mut out = Vec::with_capacity(128 + image.data().len());
    out.write_u32::<LittleEndian>(DDS_MAGIC)?;
    out.write_u32::<LittleEndian>(HEADER_SIZE)?;

    let mut flags = DDSD_CAPS | DDSD_HEIGHT | DDSD_WIDTH | DDSD_PIXELFORMAT;
    if image.num_mips() > 1 {
        flags |= DDSD_MIPMAPCOUNT;
    }
    out.write_u32::<LittleEndian>(flags)?;
    out.write_u32::<LittleEndian>(image.height())?;
    out.write_u32::<LittleEndian>(image.width())?;
    // Pitch of the base level.
    out.write_u32::<LittleEndian>(image.width() * encoding.bytes_per_pixel())?;
    out.write_u32::<LittleEndian>(0)?; // depth
    out.write_u32::<LittleEndian>(image.num_mips())?;
    for _ in 0..11 {
        out.write_u32::<LittleEndian>(0)?; // reserved
    }

    // Pixel format block.
    out.write_u32::<LittleEndian>(PIXEL_FORMAT_SIZE)?;
    out.write_u32::<LittleEndian>(DDPF_FOURCC)?;
    out.write_u32::<LittleEndian>(fourcc)?;
    for _ in 0..5 {
        out.write_u32::<LittleEndian>(0)?; // bit counts/masks unused
    }

    let mut caps = DDSCAPS_TEXTURE;
    let mut caps2 = 0;
    if image.num_mips() > 1 {
        caps |= DDSCAPS_COMPLEX | DDSCAPS_MIPMAP;
    }
    if image.is_cubemap() {
        caps |= DDSCAPS_COMPLEX;
        caps2 |= DDSCAPS2_CUBEMAP | DDSCAPS2_CUBEMAP_ALL_FACES;
    }
    out.write_u32::<LittleEndian>(caps)?;
    out.write_u32::<LittleEndian>(caps2)?;
    out.write_u32::<LittleEndian>(0)?; // caps3
    out.write_u32::<LittleEndian>(0)?; // caps4
    out.write_u32::<LittleEndian>(0)?; // reserved2

    out.write_all(image.data())?;
    std::fs::write(path, out)?;
    Ok(())
}

/// Read a DDS file back into an [`ImageBuffer`].
///
/// Every header field the reader depends on is validated before the
/// payload is trusted; any mismatch is an [`Error::InvalidStructure`].
pub fn read(path: &Path) -> Result<ImageBuffer> {
    let bytes = std::fs::read(path)?;
    let mut cur = Cursor::new(bytes.as_slice());

    let magic = cur
        .read_u32::<LittleEndian>()
        .map_err(|_| Error::invalid("DDS file shorter than magic"))?;
    if magic != DDS_MAGIC {
        return Err(Error::invalid("missing DDS magic"));
    }
    let header_size = read_field(&mut cur, "header size")?;
    if header_size != HEADER_SIZE {
        return Err(Error::invalid(format!("bad DDS header size {header_size}")));
    }
    let flags = read_field(&mut cur, "flags")?;
    let required = DDSD_CAPS | DDSD_HEIGHT | DDSD_WIDTH | DDSD_PIXELFORMAT;
    if flags & required != required {
        return Err(Error::invalid("missing required DDS header flags"));
    }
    let height = read_field(&mut cur, "height")?;
    let width = read_field(&mut cur, "width")?;
    let _pitch = read_field(&mut cur, "pitch")?;
    let _depth = read_field(&mut cur, "depth")?;
    let mip_count = read_field(&mut cur, "mip count")?;
    let num_mips = if flags & DDSD_MIPMAPCOUNT != 0 {
        mip_count.max(1)
    } else {
        1
    };
    if width == 0 || height == 0 {
        return Err(Error::invalid(format!("zero DDS dimension {width}x{height}")));
    }
    // A mip chain can only halve down to 1x1.
    let max_mips = width.max(height).ilog2() + 1;
    if num_mips > max_mips {
        return Err(Error::invalid(format!(
            "mip count {num_mips} exceeds the {width}x{height} chain"
        )));
    }
    let mut reserved = [0u8; 44];
    cur.read_exact(&mut reserved)
        .map_err(|_| Error::invalid("truncated DDS header"))?;

    let pf_size = read_field(&mut cur, "pixel format size")?;
    if pf_size != PIXEL_FORMAT_SIZE {
        return Err(Error::invalid(format!("bad pixel format size {pf_size}")));
    }
    let pf_flags = read_field(&mut cur, "pixel format flags")?;
    if pf_flags & DDPF_FOURCC == 0 {
        return Err(Error::invalid("DDS without FourCC pixel format"));
    }
    let fourcc = read_field(&mut cur, "fourcc")?;
    let encoding = encoding_for(fourcc)?;
    let mut masks = [0u8; 20];
    cur.read_exact(&mut masks)
        .map_err(|_| Error::invalid("truncated pixel format block"))?;

    let _caps = read_field(&mut cur, "caps")?;
    let caps2 = read_field(&mut cur, "caps2")?;
    let num_faces = if caps2 & DDSCAPS2_CUBEMAP != 0 {
        if caps2 & DDSCAPS2_CUBEMAP_ALL_FACES != DDSCAPS2_CUBEMAP_ALL_FACES {
            return Err(Error::invalid("partial cubemap face set"));
        }
        6
    } else {
        1
    };
    let mut tail = [0u8; 12];
    cur.read_exact(&mut tail)
        .map_err(|_| Error::invalid("truncated DDS header"))?;

    let payload = &bytes[cur.position() as usize..];
    let expected =
        ImageBuffer::expected_data_size(width, height, encoding, num_faces, num_mips);
    if payload.len() != expected {
        return Err(Error::invalid(format!(
            "DDS payload size {} does not match header ({expected} expected)",
            payload.len()
        )));
    }
    ImageBuffer::from_data(payload.to_vec(), width, height, encoding, num_faces, num_mips)
}

fn read_field(cur: &mut Cursor<&[u8]>, what: &str) -> Result<u32> {
    cur.read_u32::<LittleEndian>()
        .map_err(|_| Error::invalid(format!("truncated DDS header at {what}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cubemap_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env.dds");

        let mut img =
            ImageBuffer::with_fill(16, [0.5, 0.25, 2.0, 1.0], 5, 6, PixelEncoding::Rgba32f)
                .unwrap();
        img.write_pixel(4, 2, 1, 1, [8.0, 0.0, 0.0, 1.0]);
        save(img, &path, PixelEncoding::Rgba32f).unwrap();

        let back = read(&path).unwrap();
        assert_eq!(back.width(), 16);
        assert_eq!(back.num_faces(), 6);
        assert_eq!(back.num_mips(), 5);
        assert_eq!(back.encoding(), PixelEncoding::Rgba32f);
        assert_eq!(back.read_pixel(4, 2, 1, 1), [8.0, 0.0, 0.0, 1.0]);
        assert_eq!(back.read_pixel(0, 0, 0, 0), [0.5, 0.25, 2.0, 1.0]);
    }

    #[test]
    fn test_half_float_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env16.dds");

        let img =
            ImageBuffer::with_fill(8, [1.5, 0.5, 0.0, 1.0], 1, 6, PixelEncoding::Rgba32f).unwrap();
        save(img, &path, PixelEncoding::Rgba16f).unwrap();

        let back = read(&path).unwrap();
        assert_eq!(back.encoding(), PixelEncoding::Rgba16f);
        // Values representable in half precision survive the trip.
        assert_eq!(back.read_pixel(5, 0, 7, 7), [1.5, 0.5, 0.0, 1.0]);
    }

    #[test]
    fn test_truncated_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trunc.dds");

        let img = ImageBuffer::with_fill(8, [0.0; 4], 1, 6, PixelEncoding::Rgba16f).unwrap();
        save(img, &path, PixelEncoding::Rgba16f).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        assert!(matches!(read(&path), Err(Error::InvalidStructure(_))));
    }

    #[test]
    fn test_oversized_mip_count_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mips.dds");
        let img = ImageBuffer::with_fill(16, [0.0; 4], 5, 6, PixelEncoding::Rgba16f).unwrap();
        save(img, &path, PixelEncoding::Rgba16f).unwrap();

        // Patch the header mip count (byte offset 28) past the 16x16 chain.
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[28..32].copy_from_slice(&40u32.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(read(&path), Err(Error::InvalidStructure(_))));
    }

    #[test]
    fn test_bad_magic_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not.dds");
        std::fs::write(&path, b"PNG\x0d\x0a notreally").unwrap();
        assert!(matches!(read(&path), Err(Error::InvalidStructure(_))));
    }

    #[test]
    fn test_integer_encoding_rejected_for_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("int.dds");
        let img = ImageBuffer::with_fill(4, [0.0; 4], 1, 6, PixelEncoding::Rgba8).unwrap();
        let err = save(img, &path, PixelEncoding::Rgba8).unwrap_err();
        assert!(matches!(err, Error::UnsupportedPixelEncoding(_)));
    }
}
