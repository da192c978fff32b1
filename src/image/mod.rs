//! In-memory image representation: pixel encodings, the GPU format
//! table, and the [`ImageBuffer`] all pipeline stages pass around.

pub mod buffer;
pub mod encoding;

pub use buffer::{ImageBuffer, CUBE_FACE_COUNT};
pub use encoding::{GpuFormat, PixelEncoding};
