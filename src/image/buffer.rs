//! Owned pixel storage with face/mip layout math.
//!
//! Data layout is face-major: all mip levels of face 0, then face 1, and
//! so on. Per-mip dimensions follow the halving rule
//! `size(mip) = max(1, size >> mip)`. This matches the DDS cache
//! container, so cache reads and writes are straight copies.

use crate::image::PixelEncoding;
use crate::util::{Error, Result};
use half::f16;

/// Number of faces in a cubemap.
pub const CUBE_FACE_COUNT: u32 = 6;

/// Edge length of `base` at `mip` (halving rule). The shift is clamped
/// so header-supplied mip counts cannot overflow it.
#[inline]
fn mip_dim(base: u32, mip: u32) -> u32 {
    (base >> mip.min(31)).max(1)
}

/// An image: contiguous byte buffer plus layout metadata.
///
/// `num_faces` is 1 for flat images (panoramas, crosses, strips) and 6
/// for canonical cubemaps. Six-face buffers always have square faces
/// (`width == height`).
#[derive(Clone)]
pub struct ImageBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    encoding: PixelEncoding,
    num_faces: u32,
    num_mips: u32,
}

impl ImageBuffer {
    /// Wrap an existing byte buffer, validating the size invariant
    /// `data.len() == expected_data_size(..)`.
    pub fn from_data(
        data: Vec<u8>,
        width: u32,
        height: u32,
        encoding: PixelEncoding,
        num_faces: u32,
        num_mips: u32,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidImage("zero dimension".into()));
        }
        if num_faces != 1 && num_faces != CUBE_FACE_COUNT {
            return Err(Error::InvalidImage(format!(
                "face count must be 1 or 6, got {num_faces}"
            )));
        }
        if num_faces == CUBE_FACE_COUNT && width != height {
            return Err(Error::InvalidImage(format!(
                "cubemap faces must be square, got {width}x{height}"
            )));
        }
        if num_mips == 0 {
            return Err(Error::InvalidImage("mip count must be at least 1".into()));
        }
        if encoding == PixelEncoding::Unknown {
            return Err(Error::UnsupportedPixelEncoding(encoding.name().into()));
        }
        let expected = Self::expected_data_size(width, height, encoding, num_faces, num_mips);
        if data.len() != expected {
            return Err(Error::InvalidImage(format!(
                "data size {} does not match expected {expected}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            encoding,
            num_faces,
            num_mips,
        })
    }

    /// Create a single-face, single-mip image from raw pixels.
    pub fn new_2d(data: Vec<u8>, width: u32, height: u32, encoding: PixelEncoding) -> Result<Self> {
        Self::from_data(data, width, height, encoding, 1, 1)
    }

    /// Allocate a buffer filled with a constant color (fill-then-filter
    /// idiom: filter outputs are allocated filled so a failed filter
    /// still leaves a structurally valid image).
    pub fn with_fill(
        face_size: u32,
        fill_rgba: [f32; 4],
        num_mips: u32,
        num_faces: u32,
        encoding: PixelEncoding,
    ) -> Result<Self> {
        let mut pixel = [0u8; 16];
        let bpp = encoding.bytes_per_pixel() as usize;
        encode_pixel(fill_rgba, encoding, &mut pixel[..bpp]);

        let total = Self::expected_data_size(face_size, face_size, encoding, num_faces, num_mips);
        let mut data = vec![0u8; total];
        for chunk in data.chunks_exact_mut(bpp) {
            chunk.copy_from_slice(&pixel[..bpp]);
        }
        Self::from_data(data, face_size, face_size, encoding, num_faces, num_mips)
    }

    /// Total byte size of a buffer with the given layout.
    pub fn expected_data_size(
        width: u32,
        height: u32,
        encoding: PixelEncoding,
        num_faces: u32,
        num_mips: u32,
    ) -> usize {
        let bpp = encoding.bytes_per_pixel() as usize;
        let mut per_face = 0usize;
        for mip in 0..num_mips {
            let w = mip_dim(width, mip) as usize;
            let h = mip_dim(height, mip) as usize;
            per_face += w * h * bpp;
        }
        per_face * num_faces as usize
    }

    /// Width of the base mip level.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the base mip level.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel encoding of the stored data.
    #[inline]
    pub fn encoding(&self) -> PixelEncoding {
        self.encoding
    }

    /// Face count: 1 or 6.
    #[inline]
    pub fn num_faces(&self) -> u32 {
        self.num_faces
    }

    /// Mip level count.
    #[inline]
    pub fn num_mips(&self) -> u32 {
        self.num_mips
    }

    /// True once the buffer holds six faces.
    #[inline]
    pub fn is_cubemap(&self) -> bool {
        self.num_faces == CUBE_FACE_COUNT
    }

    /// Raw bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Raw bytes, mutable.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the buffer, returning the raw bytes.
    #[inline]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Edge length of the given mip level (halving rule).
    #[inline]
    pub fn mip_size(&self, mip: u32) -> u32 {
        mip_dim(self.width, mip)
    }

    /// Byte size of one face at the given mip level.
    #[inline]
    pub fn face_mip_bytes(&self, mip: u32) -> usize {
        let w = mip_dim(self.width, mip) as usize;
        let h = mip_dim(self.height, mip) as usize;
        w * h * self.encoding.bytes_per_pixel() as usize
    }

    /// Byte offset of (face, mip) in the data buffer.
    pub fn face_mip_offset(&self, face: u32, mip: u32) -> usize {
        debug_assert!(face < self.num_faces && mip < self.num_mips);
        let per_face: usize = (0..self.num_mips).map(|m| self.face_mip_bytes(m)).sum();
        let mut offset = face as usize * per_face;
        for m in 0..mip {
            offset += self.face_mip_bytes(m);
        }
        offset
    }

    /// Pixel bytes of one (face, mip) slice.
    pub fn face_data(&self, face: u32, mip: u32) -> &[u8] {
        let offset = self.face_mip_offset(face, mip);
        &self.data[offset..offset + self.face_mip_bytes(mip)]
    }

    /// Mutable pixel bytes of one (face, mip) slice.
    pub fn face_data_mut(&mut self, face: u32, mip: u32) -> &mut [u8] {
        let offset = self.face_mip_offset(face, mip);
        let len = self.face_mip_bytes(mip);
        &mut self.data[offset..offset + len]
    }

    /// Read one pixel as linear f32 RGBA (alpha = 1 for 3-channel data).
    pub fn read_pixel(&self, face: u32, mip: u32, x: u32, y: u32) -> [f32; 4] {
        let w = self.mip_size(mip) as usize;
        let bpp = self.encoding.bytes_per_pixel() as usize;
        let slice = self.face_data(face, mip);
        let idx = (y as usize * w + x as usize) * bpp;
        decode_pixel(&slice[idx..idx + bpp], self.encoding)
    }

    /// Write one pixel from f32 RGBA values.
    pub fn write_pixel(&mut self, face: u32, mip: u32, x: u32, y: u32, rgba: [f32; 4]) {
        let w = self.mip_size(mip) as usize;
        let enc = self.encoding;
        let bpp = enc.bytes_per_pixel() as usize;
        let slice = self.face_data_mut(face, mip);
        let idx = (y as usize * w + x as usize) * bpp;
        encode_pixel(rgba, enc, &mut slice[idx..idx + bpp]);
    }

    /// Convert to another encoding, decoding each pixel through f32.
    ///
    /// Returns a new buffer; the source is consumed. Converting to the
    /// current encoding is a move.
    pub fn convert(self, target: PixelEncoding) -> Result<Self> {
        if target == self.encoding {
            return Ok(self);
        }
        if target == PixelEncoding::Unknown {
            return Err(Error::UnsupportedPixelEncoding(target.name().into()));
        }
        let src_bpp = self.encoding.bytes_per_pixel() as usize;
        let dst_bpp = target.bytes_per_pixel() as usize;
        let pixel_count = self.data.len() / src_bpp;
        let mut out = vec![0u8; pixel_count * dst_bpp];
        for (src, dst) in self
            .data
            .chunks_exact(src_bpp)
            .zip(out.chunks_exact_mut(dst_bpp))
        {
            let rgba = decode_pixel(src, self.encoding);
            encode_pixel(rgba, target, dst);
        }
        Self::from_data(
            out,
            self.width,
            self.height,
            target,
            self.num_faces,
            self.num_mips,
        )
    }

    /// Apply a gamma power curve in place to the color channels.
    ///
    /// Operates on 32-bit float buffers (the pipeline's working
    /// encoding); alpha is left untouched and `power == 1.0` is a no-op.
    pub fn apply_gamma(&mut self, power: f32) {
        if power == 1.0 {
            return;
        }
        match self.encoding {
            PixelEncoding::Rgb32f | PixelEncoding::Rgba32f => {
                let channels = self.encoding.channel_count() as usize;
                let floats: &mut [f32] = bytemuck::cast_slice_mut(&mut self.data);
                for px in floats.chunks_exact_mut(channels) {
                    for c in px.iter_mut().take(3) {
                        *c = c.max(0.0).powf(power);
                    }
                }
            }
            other => {
                tracing::warn!("apply_gamma skipped on non-float32 buffer ({other})");
            }
        }
    }

    /// Resample every face of the base mip to a new square size.
    ///
    /// Bilinear for float encodings, nearest-neighbor for integer ones.
    /// The result has a single mip level.
    pub fn resize(&self, face_size: u32) -> Result<Self> {
        if face_size == 0 {
            return Err(Error::InvalidImage("zero resize target".into()));
        }
        if face_size == self.width && face_size == self.height && self.num_mips == 1 {
            return Ok(self.clone());
        }
        let mut out = Self::with_fill(
            face_size,
            [0.0; 4],
            1,
            self.num_faces,
            self.encoding,
        )?;
        let bilinear = self.encoding.is_float();
        let sx = self.width as f32 / face_size as f32;
        let sy = self.height as f32 / face_size as f32;
        for face in 0..self.num_faces {
            for y in 0..face_size {
                for x in 0..face_size {
                    let u = (x as f32 + 0.5) * sx - 0.5;
                    let v = (y as f32 + 0.5) * sy - 0.5;
                    let rgba = if bilinear {
                        self.sample_bilinear(face, u, v)
                    } else {
                        let px = (u.round().max(0.0) as u32).min(self.width - 1);
                        let py = (v.round().max(0.0) as u32).min(self.height - 1);
                        self.read_pixel(face, 0, px, py)
                    };
                    out.write_pixel(face, 0, x, y, rgba);
                }
            }
        }
        Ok(out)
    }

    /// Bilinear fetch at fractional pixel coordinates (base mip).
    pub(crate) fn sample_bilinear(&self, face: u32, u: f32, v: f32) -> [f32; 4] {
        let x0f = u.floor();
        let y0f = v.floor();
        let fx = u - x0f;
        let fy = v - y0f;
        let clamp_x = |x: f32| (x.max(0.0) as u32).min(self.width - 1);
        let clamp_y = |y: f32| (y.max(0.0) as u32).min(self.height - 1);
        let (x0, x1) = (clamp_x(x0f), clamp_x(x0f + 1.0));
        let (y0, y1) = (clamp_y(y0f), clamp_y(y0f + 1.0));

        let p00 = self.read_pixel(face, 0, x0, y0);
        let p10 = self.read_pixel(face, 0, x1, y0);
        let p01 = self.read_pixel(face, 0, x0, y1);
        let p11 = self.read_pixel(face, 0, x1, y1);

        let mut out = [0.0f32; 4];
        for c in 0..4 {
            let top = p00[c] * (1.0 - fx) + p10[c] * fx;
            let bot = p01[c] * (1.0 - fx) + p11[c] * fx;
            out[c] = top * (1.0 - fy) + bot * fy;
        }
        out
    }
}

impl std::fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("encoding", &self.encoding)
            .field("num_faces", &self.num_faces)
            .field("num_mips", &self.num_mips)
            .field("data_size", &self.data.len())
            .finish()
    }
}

/// Decode one pixel to linear f32 RGBA. Missing alpha reads as 1.0.
pub(crate) fn decode_pixel(bytes: &[u8], encoding: PixelEncoding) -> [f32; 4] {
    let channels = encoding.channel_count() as usize;
    let step = encoding.bytes_per_channel() as usize;
    let mut out = [0.0, 0.0, 0.0, 1.0];
    for c in 0..channels {
        let b = &bytes[c * step..(c + 1) * step];
        out[c] = match step {
            1 => b[0] as f32 / 255.0,
            2 => {
                if encoding.is_float() {
                    f16::from_le_bytes([b[0], b[1]]).to_f32()
                } else {
                    u16::from_le_bytes([b[0], b[1]]) as f32 / 65535.0
                }
            }
            _ => f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        };
    }
    if encoding.is_bgr() {
        out.swap(0, 2);
    }
    out
}

/// Encode linear f32 RGBA into one pixel of the target encoding.
pub(crate) fn encode_pixel(rgba: [f32; 4], encoding: PixelEncoding, out: &mut [u8]) {
    let mut rgba = rgba;
    if encoding.is_bgr() {
        rgba.swap(0, 2);
    }
    let channels = encoding.channel_count() as usize;
    let step = encoding.bytes_per_channel() as usize;
    for c in 0..channels {
        let v = rgba[c];
        let b = &mut out[c * step..(c + 1) * step];
        match step {
            1 => b[0] = (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8,
            2 => {
                if encoding.is_float() {
                    b.copy_from_slice(&f16::from_f32(v).to_le_bytes());
                } else {
                    let q = (v.clamp(0.0, 1.0) * 65535.0 + 0.5) as u16;
                    b.copy_from_slice(&q.to_le_bytes());
                }
            }
            _ => b.copy_from_slice(&v.to_le_bytes()),
        }
    }
}
