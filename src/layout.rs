//! Layout classification and normalization to the canonical cubemap.
//!
//! A source image arrives in one of a closed set of 2-D packings (cross,
//! strip, lat-long panorama, octahedral square) or already as six faces.
//! Classification is pure: derived from face count and aspect ratio on
//! every call, never cached on the buffer.
//!
//! Dispatch is an ordered table of (layout, predicate, converter) entries
//! evaluated in a fixed priority order, so the horizontal-before-vertical
//! tie-break is structural rather than an accident of conditional
//! ordering.
//!
//! Canonical face order is +X, -X, +Y, -Y, +Z, -Z.

use crate::image::{ImageBuffer, PixelEncoding, CUBE_FACE_COUNT};
use crate::util::{Error, Result};
use glam::Vec3;

/// Classification tag for a source image layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layout {
    /// Six faces already present; nothing to do
    AlreadyCubemap,
    /// 4:3 cross, faces unfolded sideways
    HorizontalCross,
    /// 3:4 cross, back face stored rotated 180 degrees
    VerticalCross,
    /// 2:1 equirectangular panorama
    LatLong,
    /// 6:1 face row
    HorizontalStrip,
    /// 1:6 face column
    VerticalStrip,
    /// Square octahedral projection
    Octant,
    /// No classification matched
    Unknown,
}

type Predicate = fn(&ImageBuffer) -> bool;
type Converter = fn(ImageBuffer) -> Result<ImageBuffer>;

/// Fixed-priority dispatch table. Horizontal entries precede their
/// vertical counterparts; the square octant test comes last because any
/// cubemap face set is square too and must win via the face-count test.
const DISPATCH: &[(Layout, Predicate, Converter)] = &[
    (Layout::AlreadyCubemap, is_cubemap, keep_cubemap),
    (Layout::HorizontalCross, is_h_cross, from_h_cross),
    (Layout::VerticalCross, is_v_cross, from_v_cross),
    (Layout::HorizontalStrip, is_h_strip, from_h_strip),
    (Layout::VerticalStrip, is_v_strip, from_v_strip),
    (Layout::LatLong, is_lat_long, from_lat_long),
    (Layout::Octant, is_octant, from_octant),
];

/// Classify an image layout from face count and aspect ratio.
pub fn classify(image: &ImageBuffer) -> Layout {
    for (layout, predicate, _) in DISPATCH {
        if predicate(image) {
            return *layout;
        }
    }
    Layout::Unknown
}

/// Rewrite the buffer into the canonical 6-face representation.
///
/// Already-canonical input is returned unchanged (byte-identical).
/// Freshly converted faces always carry a single mip level; mip
/// generation happens downstream in the filters.
pub fn normalize(image: ImageBuffer) -> Result<ImageBuffer> {
    for (layout, predicate, converter) in DISPATCH {
        if predicate(&image) {
            if *layout != Layout::AlreadyCubemap {
                tracing::debug!(
                    "normalizing {}x{} image from {layout:?}",
                    image.width(),
                    image.height()
                );
            }
            return converter(image);
        }
    }
    Err(Error::LayoutUnrecognized {
        width: image.width(),
        height: image.height(),
        num_faces: image.num_faces(),
    })
}

// === Predicates ===

fn is_cubemap(img: &ImageBuffer) -> bool {
    img.num_faces() == CUBE_FACE_COUNT
}

fn is_h_cross(img: &ImageBuffer) -> bool {
    let (w, h) = (img.width(), img.height());
    img.num_faces() == 1 && w % 4 == 0 && h % 3 == 0 && w / 4 == h / 3 && w / 4 > 0
}

fn is_v_cross(img: &ImageBuffer) -> bool {
    let (w, h) = (img.width(), img.height());
    img.num_faces() == 1 && w % 3 == 0 && h % 4 == 0 && w / 3 == h / 4 && w / 3 > 0
}

fn is_h_strip(img: &ImageBuffer) -> bool {
    img.num_faces() == 1 && img.width() == 6 * img.height()
}

fn is_v_strip(img: &ImageBuffer) -> bool {
    img.num_faces() == 1 && img.height() == 6 * img.width()
}

fn is_lat_long(img: &ImageBuffer) -> bool {
    img.num_faces() == 1 && img.width() == 2 * img.height()
}

fn is_octant(img: &ImageBuffer) -> bool {
    img.num_faces() == 1 && img.width() == img.height()
}

// === Converters ===

fn keep_cubemap(img: ImageBuffer) -> Result<ImageBuffer> {
    Ok(img)
}

/// Tile positions of the canonical faces inside a cross, as
/// (column, row, rotated_180) per face.
const H_CROSS_TILES: [(u32, u32, bool); 6] = [
    (2, 1, false), // +X
    (0, 1, false), // -X
    (1, 0, false), // +Y
    (1, 2, false), // -Y
    (1, 1, false), // +Z
    (3, 1, false), // -Z
];

const V_CROSS_TILES: [(u32, u32, bool); 6] = [
    (2, 1, false), // +X
    (0, 1, false), // -X
    (1, 0, false), // +Y
    (1, 2, false), // -Y
    (1, 1, false), // +Z
    (1, 3, true),  // -Z, stored upside down
];

fn from_h_cross(img: ImageBuffer) -> Result<ImageBuffer> {
    let face_size = img.width() / 4;
    repack_tiles(&img, face_size, &H_CROSS_TILES)
}

fn from_v_cross(img: ImageBuffer) -> Result<ImageBuffer> {
    let face_size = img.width() / 3;
    repack_tiles(&img, face_size, &V_CROSS_TILES)
}

fn from_h_strip(img: ImageBuffer) -> Result<ImageBuffer> {
    const TILES: [(u32, u32, bool); 6] = [
        (0, 0, false),
        (1, 0, false),
        (2, 0, false),
        (3, 0, false),
        (4, 0, false),
        (5, 0, false),
    ];
    let face_size = img.height();
    repack_tiles(&img, face_size, &TILES)
}

fn from_v_strip(img: ImageBuffer) -> Result<ImageBuffer> {
    const TILES: [(u32, u32, bool); 6] = [
        (0, 0, false),
        (0, 1, false),
        (0, 2, false),
        (0, 3, false),
        (0, 4, false),
        (0, 5, false),
    ];
    let face_size = img.width();
    repack_tiles(&img, face_size, &TILES)
}

/// Copy six square tiles out of a packed single-face image.
fn repack_tiles(
    img: &ImageBuffer,
    face_size: u32,
    tiles: &[(u32, u32, bool); 6],
) -> Result<ImageBuffer> {
    let bpp = img.encoding().bytes_per_pixel() as usize;
    let src_row = img.width() as usize * bpp;
    let face_row = face_size as usize * bpp;
    let src = img.data();

    let mut data = vec![0u8; face_row * face_size as usize * 6];
    for (face, &(col, row, rotated)) in tiles.iter().enumerate() {
        let base_x = (col * face_size) as usize * bpp;
        let base_y = (row * face_size) as usize;
        let dst_face = &mut data[face * face_row * face_size as usize..][..face_row * face_size as usize];
        for y in 0..face_size as usize {
            let src_off = (base_y + y) * src_row + base_x;
            let src_line = &src[src_off..src_off + face_row];
            if rotated {
                // Un-rotate 180 degrees: reverse rows and pixels.
                let dst_y = face_size as usize - 1 - y;
                let dst_line = &mut dst_face[dst_y * face_row..(dst_y + 1) * face_row];
                for x in 0..face_size as usize {
                    let dst_x = face_size as usize - 1 - x;
                    dst_line[dst_x * bpp..(dst_x + 1) * bpp]
                        .copy_from_slice(&src_line[x * bpp..(x + 1) * bpp]);
                }
            } else {
                dst_face[y * face_row..(y + 1) * face_row].copy_from_slice(src_line);
            }
        }
    }

    ImageBuffer::from_data(data, face_size, face_size, img.encoding(), 6, 1)
}

/// Direction through the center of texel (x, y) on the given face.
pub(crate) fn face_texel_dir(face: u32, x: u32, y: u32, face_size: u32) -> Vec3 {
    let u = (x as f32 + 0.5) / face_size as f32 * 2.0 - 1.0;
    let v = (y as f32 + 0.5) / face_size as f32 * 2.0 - 1.0;
    let dir = match face {
        0 => Vec3::new(1.0, -v, -u),  // +X
        1 => Vec3::new(-1.0, -v, u),  // -X
        2 => Vec3::new(u, 1.0, v),    // +Y
        3 => Vec3::new(u, -1.0, -v),  // -Y
        4 => Vec3::new(u, -v, 1.0),   // +Z
        _ => Vec3::new(-u, -v, -1.0), // -Z
    };
    dir.normalize()
}

/// Resample a packed single-face image into six faces through a
/// direction-to-source-uv mapping.
fn project_faces(
    img: &ImageBuffer,
    face_size: u32,
    dir_to_uv: impl Fn(Vec3) -> (f32, f32),
) -> Result<ImageBuffer> {
    let bilinear = img.encoding().is_float();
    let mut out = ImageBuffer::with_fill(face_size, [0.0; 4], 1, 6, img.encoding())?;
    for face in 0..6 {
        for y in 0..face_size {
            for x in 0..face_size {
                let dir = face_texel_dir(face, x, y, face_size);
                let (u, v) = dir_to_uv(dir);
                let px = u * img.width() as f32 - 0.5;
                let py = v * img.height() as f32 - 0.5;
                let rgba = if bilinear {
                    img.sample_bilinear(0, px, py)
                } else {
                    let ix = (px.round().max(0.0) as u32).min(img.width() - 1);
                    let iy = (py.round().max(0.0) as u32).min(img.height() - 1);
                    img.read_pixel(0, 0, ix, iy)
                };
                out.write_pixel(face, 0, x, y, rgba);
            }
        }
    }
    Ok(out)
}

fn from_lat_long(img: ImageBuffer) -> Result<ImageBuffer> {
    let face_size = (img.width() / 4).max(1);
    let out = project_faces(&img, face_size, |dir| {
        let u = dir.z.atan2(dir.x) * 0.5 * std::f32::consts::FRAC_1_PI + 0.5;
        let v = 0.5 - dir.y.asin() * std::f32::consts::FRAC_1_PI;
        (u, v)
    })?;
    drop(img);
    Ok(out)
}

fn from_octant(img: ImageBuffer) -> Result<ImageBuffer> {
    let face_size = (img.width() / 2).max(1);
    let out = project_faces(&img, face_size, |dir| {
        let a = dir.x.abs() + dir.y.abs() + dir.z.abs();
        let mut px = dir.x / a;
        let mut pz = dir.z / a;
        if dir.y < 0.0 {
            // Lower hemisphere folds outward.
            let (fx, fz) = ((1.0 - pz.abs()) * px.signum(), (1.0 - px.abs()) * pz.signum());
            px = fx;
            pz = fz;
        }
        (px * 0.5 + 0.5, pz * 0.5 + 0.5)
    })?;
    drop(img);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(width: u32, height: u32, encoding: PixelEncoding) -> ImageBuffer {
        let size = ImageBuffer::expected_data_size(width, height, encoding, 1, 1);
        ImageBuffer::from_data(vec![0u8; size], width, height, encoding, 1, 1).unwrap()
    }

    /// Paint each tile of a packed layout with a face-identifying red value.
    fn paint_tile(img: &mut ImageBuffer, col: u32, row: u32, face_size: u32, value: f32) {
        for y in 0..face_size {
            for x in 0..face_size {
                img.write_pixel(0, 0, col * face_size + x, row * face_size + y, [value, 0.0, 0.0, 1.0]);
            }
        }
    }

    #[test]
    fn test_classify_all_layouts() {
        assert_eq!(classify(&flat(1024, 768, PixelEncoding::Rgb8)), Layout::HorizontalCross);
        assert_eq!(classify(&flat(768, 1024, PixelEncoding::Rgb8)), Layout::VerticalCross);
        assert_eq!(classify(&flat(768, 128, PixelEncoding::Rgb8)), Layout::HorizontalStrip);
        assert_eq!(classify(&flat(128, 768, PixelEncoding::Rgb8)), Layout::VerticalStrip);
        assert_eq!(classify(&flat(512, 256, PixelEncoding::Rgb8)), Layout::LatLong);
        assert_eq!(classify(&flat(512, 512, PixelEncoding::Rgb8)), Layout::Octant);
        assert_eq!(classify(&flat(100, 37, PixelEncoding::Rgb8)), Layout::Unknown);

        let cube = ImageBuffer::with_fill(64, [0.0; 4], 1, 6, PixelEncoding::Rgba8).unwrap();
        assert_eq!(classify(&cube), Layout::AlreadyCubemap);
    }

    #[test]
    fn test_classification_is_not_cached() {
        // Same buffer, reclassified after normalization, flips to cubemap.
        let img = flat(256, 192, PixelEncoding::Rgba8);
        assert_eq!(classify(&img), Layout::HorizontalCross);
        let cube = normalize(img).unwrap();
        assert_eq!(classify(&cube), Layout::AlreadyCubemap);
    }

    #[test]
    fn test_h_cross_face_placement() {
        let mut img = flat(256, 192, PixelEncoding::Rgba32f);
        // Mark tiles with per-face values at the documented positions.
        for (face, &(col, row, _)) in H_CROSS_TILES.iter().enumerate() {
            paint_tile(&mut img, col, row, 64, (face as f32 + 1.0) / 10.0);
        }
        let cube = normalize(img).unwrap();
        assert_eq!(cube.width(), 64);
        assert_eq!(cube.num_mips(), 1);
        for face in 0..6 {
            let expected = (face as f32 + 1.0) / 10.0;
            assert_eq!(cube.read_pixel(face, 0, 32, 32)[0], expected, "face {face}");
        }
    }

    #[test]
    fn test_v_cross_back_face_unrotated() {
        let mut img = flat(96, 128, PixelEncoding::Rgba32f);
        // Mark one corner of the stored (rotated) back face tile.
        img.write_pixel(0, 0, 32, 96, [1.0, 0.0, 0.0, 1.0]);
        let cube = normalize(img).unwrap();
        // After un-rotation the marked texel lands in the opposite corner.
        assert_eq!(cube.read_pixel(5, 0, 31, 31)[0], 1.0);
        assert_eq!(cube.read_pixel(5, 0, 0, 0)[0], 0.0);
    }

    #[test]
    fn test_strip_face_order() {
        let mut img = flat(384, 64, PixelEncoding::Rgba32f);
        for face in 0..6u32 {
            paint_tile(&mut img, face, 0, 64, (face as f32 + 1.0) / 10.0);
        }
        let cube = normalize(img).unwrap();
        for face in 0..6 {
            assert_eq!(cube.read_pixel(face, 0, 1, 1)[0], (face as f32 + 1.0) / 10.0);
        }
    }

    #[test]
    fn test_normalize_converges_for_all_layouts() {
        let shapes = [
            (256u32, 192u32), // horizontal cross
            (192, 256),       // vertical cross
            (384, 64),        // horizontal strip
            (64, 384),        // vertical strip
            (256, 128),       // lat-long
            (128, 128),       // octant
        ];
        for (w, h) in shapes {
            let img = flat(w, h, PixelEncoding::Rgba32f);
            let cube = normalize(img).unwrap();
            assert_eq!(classify(&cube), Layout::AlreadyCubemap, "{w}x{h}");
            assert_eq!(cube.num_faces(), 6);
            assert_eq!(cube.num_mips(), 1);
            // Idempotent from here on.
            let again = normalize(cube.clone()).unwrap();
            assert_eq!(again.data(), cube.data());
        }
    }

    #[test]
    fn test_normalize_cubemap_is_noop() {
        let cube =
            ImageBuffer::with_fill(32, [0.25, 0.5, 0.75, 1.0], 3, 6, PixelEncoding::Rgba16f)
                .unwrap();
        let before = cube.data().to_vec();
        let after = normalize(cube).unwrap();
        assert_eq!(after.data(), &before[..]);
        // Multi-mip cubemaps keep their mip chain.
        assert_eq!(after.num_mips(), 3);
    }

    #[test]
    fn test_unrecognized_layout_is_surfaced() {
        let img = flat(100, 37, PixelEncoding::Rgb8);
        let err = normalize(img).unwrap_err();
        assert!(matches!(err, Error::LayoutUnrecognized { .. }));
    }

    #[test]
    fn test_lat_long_poles_and_equator() {
        // Top half white, bottom half black: +Y face must read white,
        // -Y black.
        let mut img = flat(64, 32, PixelEncoding::Rgba32f);
        for y in 0..16 {
            for x in 0..64 {
                img.write_pixel(0, 0, x, y, [1.0, 1.0, 1.0, 1.0]);
            }
        }
        let cube = normalize(img).unwrap();
        assert_eq!(cube.width(), 16);
        assert!(cube.read_pixel(2, 0, 8, 8)[0] > 0.9, "+Y should be bright");
        assert!(cube.read_pixel(3, 0, 8, 8)[0] < 0.1, "-Y should be dark");
    }

    #[test]
    fn test_octant_hemispheres() {
        // Octahedral square: center maps to +Y. Fill everything dark,
        // brighten the center region.
        let mut img = flat(64, 64, PixelEncoding::Rgba32f);
        for y in 24..40 {
            for x in 24..40 {
                img.write_pixel(0, 0, x, y, [1.0, 1.0, 1.0, 1.0]);
            }
        }
        let cube = normalize(img).unwrap();
        assert_eq!(cube.width(), 32);
        assert!(cube.read_pixel(2, 0, 16, 16)[0] > 0.9, "+Y from center");
        assert!(cube.read_pixel(3, 0, 16, 16)[0] < 0.1, "-Y from corners");
    }
}
