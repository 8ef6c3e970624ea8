//! Framework metadata
//!
//! The `Framework` enum is the single source of truth for per-framework
//! facts: template directory, health-check endpoint, and the start-command
//! marker used to recognize a framework from a build descriptor. Adding a
//! framework means adding one variant and filling in its table entries.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DevkitError;

/// Supported application frameworks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Streamlit,
    Dash,
    Fastapi,
}

impl Framework {
    /// All supported frameworks, in display order.
    pub const ALL: [Framework; 3] = [Framework::Streamlit, Framework::Dash, Framework::Fastapi];

    /// Template directory name under `templates/`.
    pub fn template_dir(&self) -> &'static str {
        match self {
            Framework::Streamlit => "streamlit",
            Framework::Dash => "dash",
            Framework::Fastapi => "fastapi",
        }
    }

    /// Health-check endpoint exposed by a container running this framework.
    ///
    /// Streamlit serves its own health endpoint under `/_stcore`; the Dash
    /// and FastAPI templates register a plain `/health` route.
    pub fn health_check_path(&self) -> &'static str {
        match self {
            Framework::Streamlit => "/_stcore/health",
            Framework::Dash => "/health",
            Framework::Fastapi => "/health",
        }
    }

    /// Start-command substring that identifies this framework in a
    /// build descriptor (Dockerfile CMD/ENTRYPOINT line, shell or exec form).
    pub fn start_marker(&self) -> &'static str {
        match self {
            Framework::Streamlit => "streamlit",
            Framework::Dash => "gunicorn",
            Framework::Fastapi => "uvicorn",
        }
    }

    /// Detect the framework a build descriptor targets by scanning for the
    /// start-command markers.
    ///
    /// Streamlit and FastAPI markers are checked before the Dash one, since
    /// a hand-edited FastAPI descriptor may run uvicorn under gunicorn.
    pub fn detect(build_descriptor: &str) -> Option<Framework> {
        [Framework::Streamlit, Framework::Fastapi, Framework::Dash]
            .into_iter()
            .find(|framework| build_descriptor.contains(framework.start_marker()))
    }

    /// Comma-separated list of valid framework names, for error messages.
    pub fn valid_names() -> String {
        Framework::ALL
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framework::Streamlit => write!(f, "streamlit"),
            Framework::Dash => write!(f, "dash"),
            Framework::Fastapi => write!(f, "fastapi"),
        }
    }
}

impl std::str::FromStr for Framework {
    type Err = DevkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "streamlit" => Ok(Framework::Streamlit),
            "dash" => Ok(Framework::Dash),
            "fastapi" => Ok(Framework::Fastapi),
            _ => Err(DevkitError::Usage(format!(
                "framework must be one of: {} (got '{}')",
                Framework::valid_names(),
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framework_parsing() {
        assert_eq!("streamlit".parse::<Framework>().unwrap(), Framework::Streamlit);
        assert_eq!("Dash".parse::<Framework>().unwrap(), Framework::Dash);
        assert_eq!("fastapi".parse::<Framework>().unwrap(), Framework::Fastapi);
        assert!("flask".parse::<Framework>().is_err());
    }

    #[test]
    fn test_invalid_framework_lists_choices() {
        let err = "flask".parse::<Framework>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("streamlit"));
        assert!(message.contains("dash"));
        assert!(message.contains("fastapi"));
        assert!(message.contains("flask"));
    }

    #[test]
    fn test_health_check_paths() {
        assert_eq!(Framework::Streamlit.health_check_path(), "/_stcore/health");
        assert_eq!(Framework::Dash.health_check_path(), "/health");
        assert_eq!(Framework::Fastapi.health_check_path(), "/health");
    }

    #[test]
    fn test_detect_from_build_descriptor() {
        let streamlit = "FROM python:3.12-slim\nCMD [\"streamlit\", \"run\", \"app.py\"]";
        assert_eq!(Framework::detect(streamlit), Some(Framework::Streamlit));

        let fastapi = "CMD [\"uvicorn\", \"fastapi_app:app\", \"--port\", \"80\"]";
        assert_eq!(Framework::detect(fastapi), Some(Framework::Fastapi));

        let dash = "CMD [\"gunicorn\", \"dash_app:server\", \"-b\", \"0.0.0.0:80\"]";
        assert_eq!(Framework::detect(dash), Some(Framework::Dash));

        assert_eq!(Framework::detect("FROM scratch"), None);
    }

    #[test]
    fn test_detect_prefers_uvicorn_over_gunicorn() {
        let mixed = "CMD gunicorn -k uvicorn.workers.UvicornWorker fastapi_app:app";
        assert_eq!(Framework::detect(mixed), Some(Framework::Fastapi));
    }

    #[test]
    fn test_toml_round_trip() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            framework: Framework,
        }

        let wrapper: Wrapper = toml::from_str("framework = \"dash\"").unwrap();
        assert_eq!(wrapper.framework, Framework::Dash);

        let rendered = toml::to_string(&Wrapper { framework: Framework::Streamlit }).unwrap();
        assert!(rendered.contains("\"streamlit\""));
    }
}
