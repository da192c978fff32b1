//! High-level environment preparation: one call from a source asset on
//! disk to a GPU cube texture, with filtering and caching handled
//! underneath.

use crate::cache::{FilterCache, FilterRequest};
use crate::codec;
use crate::filter::{FilterEngine, IrradianceFilterOptions, RadianceFilterOptions};
use crate::image::ImageBuffer;
use crate::layout;
use crate::texture::{build_cube_texture, CubeTexture};
use crate::util::Result;
use std::path::Path;
use std::sync::Arc;

/// Environment preparation pipeline.
///
/// Owns the GPU handles used for texture upload, the filter engine,
/// and the disk cache policy. The `*_from` variants accept an
/// already-loaded image and skip both disk I/O and the cache, since an
/// in-memory image has no path to key a cache entry on.
pub struct EnvironmentPipeline<E: FilterEngine> {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    engine: E,
    cache: FilterCache,
}

impl<E: FilterEngine> EnvironmentPipeline<E> {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, engine: E) -> Self {
        Self {
            device,
            queue,
            engine,
            cache: FilterCache::new(true),
        }
    }

    /// Disable or re-enable the disk cache for filter results.
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache = FilterCache::new(enabled);
        self
    }

    #[inline]
    pub fn cache(&self) -> &FilterCache {
        &self.cache
    }

    /// Load an environment source, normalize its layout, and upload it
    /// unfiltered. DDS sources keep their stored encoding; flat sources
    /// decode to 32-bit float RGBA.
    pub fn build_environment(&self, source: impl AsRef<Path>) -> Result<CubeTexture> {
        let source = source.as_ref();
        tracing::info!("building environment texture from {}", source.display());
        let img = codec::load_native(source)?;
        self.build_environment_from(img)
    }

    /// Normalize and upload an already-loaded environment image.
    pub fn build_environment_from(&self, image: ImageBuffer) -> Result<CubeTexture> {
        let cube = layout::normalize(image)?;
        build_cube_texture(&self.device, &self.queue, cube)
    }

    /// Build the prefiltered radiance (PMREM) texture for a source
    /// asset, serving the sibling `_pmrem.dds` cache file when present.
    pub fn build_radiance(
        &self,
        source: impl AsRef<Path>,
        face_size: u32,
        options: &RadianceFilterOptions,
    ) -> Result<CubeTexture> {
        let request = FilterRequest::radiance(source.as_ref(), face_size, *options);
        let filtered = self.cache.get_or_compute(&self.engine, &request)?;
        build_cube_texture(&self.device, &self.queue, filtered)
    }

    /// Radiance filter on an in-memory image; never touches the cache.
    pub fn build_radiance_from(
        &self,
        image: ImageBuffer,
        face_size: u32,
        options: &RadianceFilterOptions,
    ) -> Result<CubeTexture> {
        let request = FilterRequest::radiance("", face_size, *options);
        let filtered = self.cache.compute(&self.engine, &request, image)?;
        build_cube_texture(&self.device, &self.queue, filtered)
    }

    /// Build the irradiance (IEM) texture for a source asset, serving
    /// the sibling `_iem.dds` cache file when present.
    pub fn build_irradiance(
        &self,
        source: impl AsRef<Path>,
        face_size: u32,
        options: &IrradianceFilterOptions,
    ) -> Result<CubeTexture> {
        let request = FilterRequest::irradiance(source.as_ref(), face_size, *options);
        let filtered = self.cache.get_or_compute(&self.engine, &request)?;
        build_cube_texture(&self.device, &self.queue, filtered)
    }

    /// Irradiance filter on an in-memory image; never touches the cache.
    pub fn build_irradiance_from(
        &self,
        image: ImageBuffer,
        face_size: u32,
        options: &IrradianceFilterOptions,
    ) -> Result<CubeTexture> {
        let request = FilterRequest::irradiance("", face_size, *options);
        let filtered = self.cache.compute(&self.engine, &request, image)?;
        build_cube_texture(&self.device, &self.queue, filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::AccelContext;
    use crate::image::PixelEncoding;
    use crate::util::Error;

    struct FlatEngine;

    impl FilterEngine for FlatEngine {
        fn radiance_filter(
            &self,
            dst: &mut ImageBuffer,
            _src: &ImageBuffer,
            _options: &RadianceFilterOptions,
            _accel: Option<&AccelContext>,
        ) -> Result<()> {
            for face in 0..6 {
                for mip in 0..dst.num_mips() {
                    let size = dst.mip_size(mip);
                    for y in 0..size {
                        for x in 0..size {
                            dst.write_pixel(face, mip, x, y, [0.5, 0.5, 0.5, 1.0]);
                        }
                    }
                }
            }
            Ok(())
        }

        fn irradiance_filter(
            &self,
            dst: &mut ImageBuffer,
            _src: &ImageBuffer,
            _accel: Option<&AccelContext>,
        ) -> Result<()> {
            let size = dst.mip_size(0);
            for face in 0..6 {
                for y in 0..size {
                    for x in 0..size {
                        dst.write_pixel(face, 0, x, y, [0.25, 0.25, 0.25, 1.0]);
                    }
                }
            }
            Ok(())
        }
    }

    fn gpu() -> Option<(Arc<wgpu::Device>, Arc<wgpu::Queue>)> {
        let instance = wgpu::Instance::default();
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
                .ok()?;
        let (device, queue) =
            pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())).ok()?;
        Some((Arc::new(device), Arc::new(queue)))
    }

    fn lat_long_source() -> ImageBuffer {
        let pixels = vec![[0.5f32, 0.5, 0.5, 1.0]; 64 * 32];
        let data = bytemuck::cast_slice(&pixels).to_vec();
        ImageBuffer::new_2d(data, 64, 32, PixelEncoding::Rgba32f).unwrap()
    }

    #[test]
    fn test_environment_from_lat_long() {
        let Some((device, queue)) = gpu() else {
            eprintln!("no GPU adapter, skipping");
            return;
        };
        let pipeline = EnvironmentPipeline::new(device, queue, FlatEngine);
        let tex = pipeline.build_environment_from(lat_long_source()).unwrap();
        // 2:1 lat-long: face size is width / 4.
        assert_eq!(tex.size, 16);
        assert_eq!(tex.mip_level_count, 1);
        assert_eq!(tex.format, wgpu::TextureFormat::Rgba32Float);
    }

    #[test]
    fn test_radiance_from_memory_has_mip_chain() {
        let Some((device, queue)) = gpu() else {
            eprintln!("no GPU adapter, skipping");
            return;
        };
        let pipeline =
            EnvironmentPipeline::new(device, queue, FlatEngine).with_cache_enabled(false);
        let opts = RadianceFilterOptions::default().mip_count(5);
        let tex = pipeline
            .build_radiance_from(lat_long_source(), 32, &opts)
            .unwrap();
        assert_eq!(tex.size, 32);
        assert_eq!(tex.mip_level_count, 5);
    }

    #[test]
    fn test_irradiance_from_memory_is_single_mip() {
        let Some((device, queue)) = gpu() else {
            eprintln!("no GPU adapter, skipping");
            return;
        };
        let pipeline =
            EnvironmentPipeline::new(device, queue, FlatEngine).with_cache_enabled(false);
        let tex = pipeline
            .build_irradiance_from(lat_long_source(), 16, &Default::default())
            .unwrap();
        assert_eq!(tex.size, 16);
        assert_eq!(tex.mip_level_count, 1);
    }

    #[test]
    fn test_missing_source_surfaces_load_error() {
        let Some((device, queue)) = gpu() else {
            eprintln!("no GPU adapter, skipping");
            return;
        };
        let pipeline = EnvironmentPipeline::new(device, queue, FlatEngine);
        let err = pipeline
            .build_environment("/nonexistent/env.hdr")
            .unwrap_err();
        assert!(matches!(err, Error::SourceLoad { .. }));
    }
}
