//! The filter engine seam: option types and the trait the external
//! radiance/irradiance engine implements.
//!
//! This crate orchestrates filtering but does not implement the math;
//! an engine is handed pre-normalized cubemap input and a pre-filled
//! output buffer and writes its result into the output in place.

pub mod accel;

pub use accel::AccelContext;

use crate::image::ImageBuffer;
use crate::util::Result;

/// Lighting model used by the radiance filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LightingModel {
    /// Phong lobe
    Phong,
    /// Phong BRDF (normalized)
    PhongBrdf,
    /// Blinn lobe
    Blinn,
    /// Blinn BRDF (normalized)
    #[default]
    BlinnBrdf,
}

/// Seam correction applied at cube face borders during filtering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EdgeFixup {
    /// No fixup
    #[default]
    None,
    /// Warp texel directions near edges
    Warp,
}

/// Parameters for the radiance (PMREM) filter.
///
/// Gamma input/output are applied by the pipeline as two separate
/// passes around the engine call; engines must not re-apply them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadianceFilterOptions {
    pub gamma_input: f32,
    pub gamma_output: f32,
    pub lighting_model: LightingModel,
    pub edge_fixup: EdgeFixup,
    pub mip_count: u32,
    pub gloss_scale: u32,
    pub gloss_bias: u32,
    pub num_cpu_processing_threads: u32,
    pub exclude_base: bool,
}

impl Default for RadianceFilterOptions {
    fn default() -> Self {
        Self {
            gamma_input: 1.0,
            gamma_output: 1.0,
            lighting_model: LightingModel::BlinnBrdf,
            edge_fixup: EdgeFixup::None,
            mip_count: 7,
            gloss_scale: 10,
            gloss_bias: 3,
            num_cpu_processing_threads: 8,
            exclude_base: false,
        }
    }
}

impl RadianceFilterOptions {
    /// Set the linear-to-gamma powers applied before and after filtering.
    pub fn gamma_correction(mut self, input: f32, output: f32) -> Self {
        self.gamma_input = input;
        self.gamma_output = output;
        self
    }

    /// Set the lighting model used by the radiance filter.
    pub fn lighting_model(mut self, model: LightingModel) -> Self {
        self.lighting_model = model;
        self
    }

    /// Set the edge fixup applied at face borders.
    pub fn edge_fixup(mut self, fixup: EdgeFixup) -> Self {
        self.edge_fixup = fixup;
        self
    }

    /// Set the number of output mip levels.
    pub fn mip_count(mut self, mips: u32) -> Self {
        self.mip_count = mips.max(1);
        self
    }

    /// Set the gloss scale mapping roughness to mip level.
    pub fn gloss_scale(mut self, scale: u32) -> Self {
        self.gloss_scale = scale;
        self
    }

    /// Set the gloss bias mapping roughness to mip level.
    pub fn gloss_bias(mut self, bias: u32) -> Self {
        self.gloss_bias = bias;
        self
    }

    /// Set the number of CPU worker threads the engine may use.
    pub fn num_cpu_processing_threads(mut self, threads: u32) -> Self {
        self.num_cpu_processing_threads = threads;
        self
    }

    /// Leave the base mip level unfiltered.
    pub fn exclude_base(mut self, exclude: bool) -> Self {
        self.exclude_base = exclude;
        self
    }
}

/// Parameters for the irradiance (IEM) filter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IrradianceFilterOptions {
    pub gamma_input: f32,
    pub gamma_output: f32,
}

impl Default for IrradianceFilterOptions {
    fn default() -> Self {
        Self {
            gamma_input: 1.0,
            gamma_output: 1.0,
        }
    }
}

impl IrradianceFilterOptions {
    /// Set the linear-to-gamma powers applied before and after filtering.
    pub fn gamma_correction(mut self, input: f32, output: f32) -> Self {
        self.gamma_input = input;
        self.gamma_output = output;
        self
    }
}

/// External radiance/irradiance filter engine.
///
/// Both operations receive canonical cubemap input (6 faces, working
/// encoding) and a destination buffer already allocated and filled at
/// the requested face size and mip count. On error the destination is
/// left as-is; the pipeline treats that as a degraded (flat fill)
/// result rather than a failure.
pub trait FilterEngine {
    /// Prefilter specular radiance into a roughness-indexed mip chain.
    fn radiance_filter(
        &self,
        dst: &mut ImageBuffer,
        src: &ImageBuffer,
        options: &RadianceFilterOptions,
        accel: Option<&AccelContext>,
    ) -> Result<()>;

    /// Integrate diffuse irradiance into a single-mip cubemap.
    fn irradiance_filter(
        &self,
        dst: &mut ImageBuffer,
        src: &ImageBuffer,
        accel: Option<&AccelContext>,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radiance_defaults_and_builder() {
        let opts = RadianceFilterOptions::default();
        assert_eq!(opts.lighting_model, LightingModel::BlinnBrdf);
        assert_eq!(opts.edge_fixup, EdgeFixup::None);
        assert_eq!(opts.mip_count, 7);
        assert_eq!(opts.gloss_scale, 10);
        assert_eq!(opts.gloss_bias, 3);
        assert_eq!(opts.num_cpu_processing_threads, 8);
        assert!(!opts.exclude_base);

        let opts = RadianceFilterOptions::default()
            .gamma_correction(2.2, 1.0 / 2.2)
            .mip_count(0)
            .exclude_base(true);
        assert_eq!(opts.gamma_input, 2.2);
        assert_eq!(opts.mip_count, 1); // clamped
        assert!(opts.exclude_base);
    }
}
