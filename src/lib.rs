//! # Envmap
//!
//! Environment map preparation pipeline for image-based lighting.
//!
//! Takes panoramic or pre-tiled environment images (lat-long, cube
//! cross, strip, octant) and turns them into GPU cube textures:
//! layout normalization, prefiltered radiance (PMREM) and irradiance
//! (IEM) filtering through a pluggable engine, a sibling-file disk
//! cache for filter results, and cube texture upload via wgpu.
//!
//! ## Modules
//!
//! - [`util`] - Errors and shared plumbing
//! - [`image`] - Pixel encodings, GPU format table, owned image buffers
//! - [`layout`] - Layout classification and cubemap normalization
//! - [`codec`] - Source decoding and the DDS cache container
//! - [`filter`] - Filter options, engine trait, acceleration context
//! - [`cache`] - Disk cache keyed by sibling `_pmrem`/`_iem` files
//! - [`texture`] - Cube texture creation and upload
//! - [`pipeline`] - High-level source-to-texture facade
//!
//! ## Example
//!
//! ```ignore
//! use envmap::prelude::*;
//!
//! let pipeline = EnvironmentPipeline::new(device, queue, engine);
//! let radiance = pipeline.build_radiance(
//!     "studio.hdr",
//!     256,
//!     &RadianceFilterOptions::default(),
//! )?;
//! ```

pub mod util;
pub mod image;
pub mod layout;
pub mod codec;
pub mod filter;
pub mod cache;
pub mod texture;
pub mod pipeline;

// Re-export commonly used types
pub use crate::image::{GpuFormat, ImageBuffer, PixelEncoding, CUBE_FACE_COUNT};
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cache::{FilterCache, FilterKind, FilterRequest};
    pub use crate::filter::{
        AccelContext, EdgeFixup, FilterEngine, IrradianceFilterOptions, LightingModel,
        RadianceFilterOptions,
    };
    pub use crate::image::{GpuFormat, ImageBuffer, PixelEncoding};
    pub use crate::layout::Layout;
    pub use crate::pipeline::EnvironmentPipeline;
    pub use crate::texture::{build_cube_texture, CubeTexture};
    pub use crate::util::{Error, Result};
}
