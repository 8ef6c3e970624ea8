//! Devkit error taxonomy
//!
//! All three subcommands report failures through a single error enum so that
//! the binary can map every failure class to a deterministic exit code.

use thiserror::Error;

/// Errors that can occur across the devkit subcommands.
#[derive(Debug, Error)]
pub enum DevkitError {
    /// Bad CLI arguments or invalid input values (invalid app name,
    /// unknown framework, out-of-range session duration)
    #[error("Invalid usage: {0}")]
    Usage(String),

    /// Project configuration problem (missing manifest, missing template
    /// directory for the selected framework)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Two derived settings disagree (framework vs. declared health path)
    #[error("Consistency check failed: {0}")]
    Consistency(String),

    /// Docker daemon is not available
    #[error("Docker not available: {0}")]
    DockerNotAvailable(String),

    /// Image build failed
    #[error("Image build failed: {0}")]
    BuildFailed(String),

    /// Container operation failed (create, start, inspect, logs)
    #[error("Container error: {0}")]
    Container(String),

    /// Health endpoint never answered within the wait budget
    #[error("Health check timed out after {0} seconds")]
    HealthCheckTimeout(u64),

    /// Identity provider rejected or failed a call (STS, IAM,
    /// credential chain resolution)
    #[error("Identity provider error: {0}")]
    Identity(String),

    /// The process was interrupted by the operator
    #[error("Interrupted")]
    Interrupted,

    /// Filesystem I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DevkitError {
    /// Process exit code for this error class.
    ///
    /// Usage errors exit with 2 (the conventional bad-arguments code);
    /// everything else exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            DevkitError::Usage(_) => 2,
            _ => 1,
        }
    }
}

/// Result type for devkit operations
pub type DevkitResult<T> = Result<T, DevkitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(DevkitError::Usage("bad".to_string()).exit_code(), 2);
        assert_eq!(DevkitError::Config("missing".to_string()).exit_code(), 1);
        assert_eq!(DevkitError::HealthCheckTimeout(300).exit_code(), 1);
        assert_eq!(DevkitError::Interrupted.exit_code(), 1);
    }

    #[test]
    fn test_error_display() {
        let err = DevkitError::HealthCheckTimeout(300);
        assert_eq!(err.to_string(), "Health check timed out after 300 seconds");

        let err = DevkitError::Usage("app name must not be empty".to_string());
        assert_eq!(err.to_string(), "Invalid usage: app name must not be empty");
    }
}
