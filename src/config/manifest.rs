//! Project manifest
//!
//! The manifest (`webapp.toml` at the project root) is the shared on-disk
//! state read by all three subcommands. It is loaded once per invocation and
//! passed into the subcommand entry points explicitly, so the tools stay
//! testable with injected fixtures.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Framework;
use crate::error::{DevkitError, DevkitResult};

/// Manifest file name at the project root
pub const MANIFEST_FILE: &str = "webapp.toml";

/// Directory holding per-framework template trees
pub const TEMPLATES_DIR: &str = "templates";

/// Active application directory materialized by the synchronizer
pub const APP_SRC_DIR: &str = "app_src";

// ============================================================================
// Project layout
// ============================================================================

/// Filesystem layout of a template project.
///
/// Everything is derived from a single root directory so tests can point the
/// tools at a temporary tree.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    /// Create a project rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project rooted at the current working directory.
    pub fn discover() -> DevkitResult<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(TEMPLATES_DIR)
    }

    pub fn app_dir(&self) -> PathBuf {
        self.root.join(APP_SRC_DIR)
    }
}

// ============================================================================
// Manifest sections
// ============================================================================

/// `[webapp]` section: what the project is.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebappSection {
    pub app_name: String,
    pub framework: Framework,
}

impl Default for WebappSection {
    fn default() -> Self {
        Self {
            app_name: "webapp".to_string(),
            framework: Framework::Streamlit,
        }
    }
}

/// `[container]` section: how the deployed container is probed.
///
/// `health_check_path` mirrors the load balancer's target-group setting, so
/// it can drift from the selected framework; the smoke tester's pre-check
/// exists to catch exactly that drift.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContainerSection {
    pub port: u16,
    pub health_check_path: String,
}

impl Default for ContainerSection {
    fn default() -> Self {
        Self {
            port: 80,
            health_check_path: Framework::Streamlit.health_check_path().to_string(),
        }
    }
}

/// `[aws]` section: identity settings for credential provisioning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AwsSection {
    /// Role to assume; absent means pass the profile credentials through
    pub role_arn: Option<String>,
    pub region: String,
    /// Directory (relative to the project root) mounted into the dev
    /// container, receiving the `credentials` and `config` files
    pub credentials_dir: String,
}

impl Default for AwsSection {
    fn default() -> Self {
        Self {
            role_arn: None,
            region: "eu-west-2".to_string(),
            credentials_dir: ".devcontainer/aws".to_string(),
        }
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// The persisted project manifest.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Manifest {
    #[serde(default)]
    pub webapp: WebappSection,
    #[serde(default)]
    pub container: ContainerSection,
    #[serde(default)]
    pub aws: AwsSection,
}

impl Manifest {
    /// Load the manifest from disk.
    ///
    /// A missing file is a configuration error: the caller is expected to
    /// have run `configure` at least once.
    pub fn load(path: &Path) -> DevkitResult<Self> {
        if !path.exists() {
            return Err(DevkitError::Config(format!(
                "project manifest not found at {}; run `webapp-devkit configure` first",
                path.display()
            )));
        }
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| {
            DevkitError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load the manifest, creating it with defaults on first run.
    pub fn load_or_init(path: &Path) -> DevkitResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let manifest = Manifest::default();
            manifest.save(path)?;
            tracing::info!(path = %path.display(), "created manifest with defaults");
            Ok(manifest)
        }
    }

    /// Persist the manifest, replacing any prior contents.
    pub fn save(&self, path: &Path) -> DevkitResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self).map_err(|e| {
            DevkitError::Config(format!("failed to serialize manifest: {}", e))
        })?;
        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_manifest() {
        let manifest = Manifest::default();
        assert_eq!(manifest.webapp.app_name, "webapp");
        assert_eq!(manifest.webapp.framework, Framework::Streamlit);
        assert_eq!(manifest.container.port, 80);
        assert_eq!(manifest.container.health_check_path, "/_stcore/health");
        assert!(manifest.aws.role_arn.is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);

        let mut manifest = Manifest::default();
        manifest.webapp.app_name = "my-dash-app".to_string();
        manifest.webapp.framework = Framework::Dash;
        manifest.aws.role_arn = Some("arn:aws:iam::123456789012:role/dev".to_string());
        manifest.save(&path).unwrap();

        let loaded = Manifest::load(&path).unwrap();
        assert_eq!(loaded.webapp.app_name, "my-dash-app");
        assert_eq!(loaded.webapp.framework, Framework::Dash);
        assert_eq!(
            loaded.aws.role_arn.as_deref(),
            Some("arn:aws:iam::123456789012:role/dev")
        );
    }

    #[test]
    fn test_load_missing_manifest_is_config_error() {
        let dir = tempdir().unwrap();
        let err = Manifest::load(&dir.path().join(MANIFEST_FILE)).unwrap_err();
        assert!(matches!(err, DevkitError::Config(_)));
        assert!(err.to_string().contains("configure"));
    }

    #[test]
    fn test_load_or_init_creates_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);

        let manifest = Manifest::load_or_init(&path).unwrap();
        assert!(path.exists());
        assert_eq!(manifest.webapp.framework, Framework::Streamlit);

        // Second call reads the file it just wrote
        let again = Manifest::load_or_init(&path).unwrap();
        assert_eq!(again.webapp.app_name, manifest.webapp.app_name);
    }

    #[test]
    fn test_partial_manifest_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(
            &path,
            "[webapp]\napp_name = \"ml-demo\"\nframework = \"fastapi\"\n",
        )
        .unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.webapp.app_name, "ml-demo");
        assert_eq!(manifest.webapp.framework, Framework::Fastapi);
        assert_eq!(manifest.container.port, 80);
        assert_eq!(manifest.aws.region, "eu-west-2");
    }

    #[test]
    fn test_project_layout() {
        let project = Project::new("/work/demo");
        assert_eq!(project.manifest_path(), Path::new("/work/demo/webapp.toml"));
        assert_eq!(project.templates_dir(), Path::new("/work/demo/templates"));
        assert_eq!(project.app_dir(), Path::new("/work/demo/app_src"));
    }
}
