//! Webapp deployment toolkit library

// Public modules
pub mod commands;
pub mod config;
pub mod creds;
pub mod error;
pub mod smoke;
pub mod sync;

// Re-export commonly used types
pub use config::{Framework, Manifest, Project};
pub use error::{DevkitError, DevkitResult};
