//! Error types

pub mod types;

pub use types::{DevkitError, DevkitResult};
