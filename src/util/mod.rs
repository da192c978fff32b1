//! Basic shared types: errors and the crate result alias.

pub mod error;

pub use error::{Error, Result};
