//! Building GPU cube textures from canonical cubemap images.
//!
//! The builder requires already-normalized input (6 faces); layout
//! handling lives in [`crate::layout`], keeping format mapping and
//! layout logic separate. Upload is allocate-then-fill: the texture is
//! created at full size and every (face, mip) slice written before the
//! handle is returned, so a failure never leaves a partially uploaded
//! live texture visible to callers.

use crate::image::ImageBuffer;
use crate::util::{Error, Result};

/// A GPU-resident cube texture: 6 faces, N mips.
///
/// Owned by the caller once returned; the pipeline does not track its
/// lifetime further.
#[derive(Debug)]
pub struct CubeTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    /// Base face size in pixels.
    pub size: u32,
    /// Number of stored mip levels.
    pub mip_level_count: u32,
    /// Internal format chosen from the pixel format table.
    pub format: wgpu::TextureFormat,
}

/// Upload a canonical cubemap image into a new cube texture.
///
/// The image's mip chain is uploaded as-is and the view is clamped to
/// it; mips are never auto-generated here, which would overwrite
/// filtered chains with naive downsamples.
pub fn build_cube_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    image: ImageBuffer,
) -> Result<CubeTexture> {
    if !image.is_cubemap() {
        return Err(Error::NotACubemap {
            num_faces: image.num_faces(),
        });
    }

    let gpu = image.encoding().gpu_format()?;
    // Promote 3-channel data to the upload encoding.
    let image = image.convert(gpu.upload)?;
    let size = image.width();
    let mip_level_count = image.num_mips();
    let bpp = gpu.upload.bytes_per_pixel();

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("envmap_cube"),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 6,
        },
        mip_level_count,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: gpu.texture_format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });

    for face in 0..6 {
        for mip in 0..mip_level_count {
            let mip_size = image.mip_size(mip);
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: mip,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: face,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                image.face_data(face, mip),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(mip_size * bpp),
                    rows_per_image: Some(mip_size),
                },
                wgpu::Extent3d {
                    width: mip_size,
                    height: mip_size,
                    depth_or_array_layers: 1,
                },
            );
        }
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("envmap_cube_view"),
        dimension: Some(wgpu::TextureViewDimension::Cube),
        mip_level_count: Some(mip_level_count),
        ..Default::default()
    });

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("envmap_cube_sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        lod_max_clamp: mip_level_count as f32,
        ..Default::default()
    });

    tracing::debug!(
        "built cube texture: {size}x{size}, {mip_level_count} mip(s), {:?}",
        gpu.texture_format
    );

    Ok(CubeTexture {
        texture,
        view,
        sampler,
        size,
        mip_level_count,
        format: gpu.texture_format,
    })
}

impl CubeTexture {
    /// Read one (face, mip) slice back from the GPU.
    ///
    /// Returns tightly packed pixel bytes in the texture's format.
    pub fn read_face(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        face: u32,
        mip: u32,
    ) -> Result<Vec<u8>> {
        let mip_size = (self.size >> mip).max(1);
        let bpp = self
            .format
            .block_copy_size(None)
            .ok_or_else(|| Error::invalid("compressed format readback"))?;
        // bytes_per_row must be aligned to COPY_BYTES_PER_ROW_ALIGNMENT.
        let unpadded_row = mip_size * bpp;
        let padded_row = (unpadded_row + 255) & !255;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("envmap_readback"),
            size: (padded_row * mip_size) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("envmap_readback_encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: mip,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: face,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(mip_size),
                },
            },
            wgpu::Extent3d {
                width: mip_size,
                height: mip_size,
                depth_or_array_layers: 1,
            },
        );
        queue.submit([encoder.finish()]);

        let slice = buffer.slice(..);
        slice.map_async(wgpu::MapMode::Read, |_| {});
        let _ = device.poll(wgpu::PollType::wait_indefinitely());

        let mapped = slice.get_mapped_range();
        let mut out = Vec::with_capacity((unpadded_row * mip_size) as usize);
        for row in 0..mip_size {
            let start = (row * padded_row) as usize;
            out.extend_from_slice(&mapped[start..start + unpadded_row as usize]);
        }
        drop(mapped);
        buffer.unmap();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::PixelEncoding;
    use crate::layout;

    /// Try to get a device; tests are skipped on headless machines.
    fn gpu() -> Option<(wgpu::Device, wgpu::Queue)> {
        let instance = wgpu::Instance::default();
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
                .ok()?;
        pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())).ok()
    }

    #[test]
    fn test_rgb8_cross_scenario() {
        let Some((device, queue)) = gpu() else {
            eprintln!("no GPU adapter, skipping");
            return;
        };

        // 4:3 horizontal cross, 8-bit RGB, width 1024.
        let size = ImageBuffer::expected_data_size(1024, 768, PixelEncoding::Rgb8, 1, 1);
        let img =
            ImageBuffer::from_data(vec![128; size], 1024, 768, PixelEncoding::Rgb8, 1, 1).unwrap();
        assert_eq!(layout::classify(&img), layout::Layout::HorizontalCross);

        let cube = layout::normalize(img).unwrap();
        assert_eq!(cube.width(), 256);
        assert_eq!(cube.encoding(), PixelEncoding::Rgb8);

        let tex = build_cube_texture(&device, &queue, cube).unwrap();
        assert_eq!(tex.size, 256);
        assert_eq!(tex.mip_level_count, 1);
        // RGB8 promotes to the 4-channel internal format.
        assert_eq!(tex.format, wgpu::TextureFormat::Rgba8Unorm);
    }

    #[test]
    fn test_non_cubemap_is_rejected() {
        let Some((device, queue)) = gpu() else {
            eprintln!("no GPU adapter, skipping");
            return;
        };
        let img = ImageBuffer::with_fill(8, [0.0; 4], 1, 1, PixelEncoding::Rgba8).unwrap();
        let err = build_cube_texture(&device, &queue, img).unwrap_err();
        assert!(matches!(err, Error::NotACubemap { num_faces: 1 }));
    }

    #[test]
    fn test_multi_mip_upload_and_readback() {
        let Some((device, queue)) = gpu() else {
            eprintln!("no GPU adapter, skipping");
            return;
        };

        let mut img = ImageBuffer::with_fill(8, [0.25; 4], 3, 6, PixelEncoding::Rgba32f).unwrap();
        img.write_pixel(2, 1, 0, 0, [1.0, 2.0, 3.0, 1.0]);
        let tex = build_cube_texture(&device, &queue, img).unwrap();
        assert_eq!(tex.mip_level_count, 3);

        let bytes = tex.read_face(&device, &queue, 2, 1).unwrap();
        let texels: &[f32] = bytemuck::cast_slice(&bytes);
        assert_eq!(&texels[..4], &[1.0, 2.0, 3.0, 1.0]);
        // Rest of the face holds the fill value.
        assert_eq!(texels[4], 0.25);
    }
}
