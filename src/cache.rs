//! Disk cache for filter results, keyed by source path and filter kind.
//!
//! The derived file path is the cache key: `<stem>_pmrem.dds` or
//! `<stem>_iem.dds` next to the source asset. Presence plus a
//! successful load is a hit; there is no manifest and no parameter
//! fingerprint in the name, so changing filter parameters without
//! changing the source path serves the stale result (see DESIGN.md).

use crate::codec::{self, dds};
use crate::filter::{accel, FilterEngine, IrradianceFilterOptions, RadianceFilterOptions};
use crate::image::{ImageBuffer, PixelEncoding};
use crate::layout;
use crate::util::{Error, Result};
use std::path::{Path, PathBuf};

/// Fill color for freshly allocated filter outputs: opaque red, so a
/// degraded (unfiltered) result is obvious on screen.
const FILL_COLOR: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

/// Working encoding for filter inputs and outputs: full float with
/// alpha, preserving HDR range through every stage.
const WORKING_ENCODING: PixelEncoding = PixelEncoding::Rgba32f;

/// Storage encoding for cache files: half float, lossy-safe for
/// lighting data at half the size.
const STORAGE_ENCODING: PixelEncoding = PixelEncoding::Rgba16f;

/// One cache-able unit of filtering work.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterRequest {
    /// Source asset on disk; its path doubles as the cache key.
    pub source: PathBuf,
    /// Destination cube face size in pixels.
    pub face_size: u32,
    /// Filter kind plus its parameter set.
    pub kind: FilterKind,
}

impl FilterRequest {
    /// Radiance (PMREM) request.
    pub fn radiance(
        source: impl Into<PathBuf>,
        face_size: u32,
        options: RadianceFilterOptions,
    ) -> Self {
        Self {
            source: source.into(),
            face_size,
            kind: FilterKind::Radiance(options),
        }
    }

    /// Irradiance (IEM) request.
    pub fn irradiance(
        source: impl Into<PathBuf>,
        face_size: u32,
        options: IrradianceFilterOptions,
    ) -> Self {
        Self {
            source: source.into(),
            face_size,
            kind: FilterKind::Irradiance(options),
        }
    }

    /// Derived cache file path, sibling to the source asset.
    pub fn cache_path(&self) -> PathBuf {
        cache_path(&self.source, &self.kind)
    }
}

/// Filter kind and its parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterKind {
    Radiance(RadianceFilterOptions),
    Irradiance(IrradianceFilterOptions),
}

impl FilterKind {
    /// Suffix appended to the source stem for the cache file.
    pub fn cache_suffix(&self) -> &'static str {
        match self {
            Self::Radiance(_) => "_pmrem",
            Self::Irradiance(_) => "_iem",
        }
    }

    /// Output mip count: a roughness chain for radiance, one level for
    /// irradiance.
    pub fn output_mip_count(&self) -> u32 {
        match self {
            Self::Radiance(opts) => opts.mip_count,
            Self::Irradiance(_) => 1,
        }
    }
}

/// Compute the cache path for a source asset and filter kind.
pub fn cache_path(source: &Path, kind: &FilterKind) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!("{stem}{}.dds", kind.cache_suffix()))
}

/// Disk-backed get-or-compute for filter results.
#[derive(Clone, Copy, Debug)]
pub struct FilterCache {
    enabled: bool,
}

impl FilterCache {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Return the cached filter result, computing and persisting it on
    /// a miss.
    ///
    /// A corrupt or unreadable cache file is never fatal: it logs and
    /// falls back to recomputation. A source that fails to load aborts
    /// the request.
    pub fn get_or_compute<E: FilterEngine>(
        &self,
        engine: &E,
        request: &FilterRequest,
    ) -> Result<ImageBuffer> {
        let path = request.cache_path();
        if self.enabled && path.exists() {
            match codec::load(&path, WORKING_ENCODING) {
                Ok(cached) => {
                    tracing::debug!("cache hit: {}", path.display());
                    return Ok(cached);
                }
                Err(e) => {
                    let e = Error::CacheRead {
                        path: path.clone(),
                        reason: e.to_string(),
                    };
                    tracing::warn!("{e}; recomputing");
                }
            }
        }

        let source = codec::load(&request.source, WORKING_ENCODING)?;
        let output = self.compute(engine, request, source)?;

        if self.enabled {
            if let Err(e) = dds::save(output.clone(), &path, STORAGE_ENCODING) {
                tracing::warn!("failed to persist cache file {}: {e}", path.display());
            } else {
                tracing::debug!("cached filter result: {}", path.display());
            }
        }
        Ok(output)
    }

    /// Run the filter on an already-loaded source image, bypassing the
    /// cache entirely (in-memory sources have no path identity).
    pub fn compute<E: FilterEngine>(
        &self,
        engine: &E,
        request: &FilterRequest,
        source: ImageBuffer,
    ) -> Result<ImageBuffer> {
        let input = layout::normalize(source)?;

        let mut output = ImageBuffer::with_fill(
            request.face_size,
            FILL_COLOR,
            request.kind.output_mip_count(),
            6,
            WORKING_ENCODING,
        )?;

        match &request.kind {
            FilterKind::Radiance(opts) => {
                // The radiance filter expects input at the destination
                // face size.
                let mut input = if input.width() != request.face_size {
                    input.resize(request.face_size)?
                } else {
                    input
                };
                // Input and output gamma are independent knobs; two
                // separate passes around the filter call.
                input.apply_gamma(opts.gamma_input);
                let accel = accel::acquire();
                if let Err(e) =
                    engine.radiance_filter(&mut output, &input, opts, accel.as_deref())
                {
                    tracing::warn!("radiance filter degraded, returning fill color: {e}");
                }
                drop(input);
                output.apply_gamma(opts.gamma_output);
            }
            FilterKind::Irradiance(opts) => {
                let mut input = input;
                input.apply_gamma(opts.gamma_input);
                let accel = accel::acquire();
                if let Err(e) = engine.irradiance_filter(&mut output, &input, accel.as_deref()) {
                    tracing::warn!("irradiance filter degraded, returning fill color: {e}");
                }
                drop(input);
                output.apply_gamma(opts.gamma_output);
            }
        }
        Ok(output)
    }
}
