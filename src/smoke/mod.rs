//! Smoke tester
//!
//! Builds the active application's container image, runs it, polls the
//! framework-specific health endpoint, and always tears the container down:
//! on success, on failure, and on Ctrl-C.

pub mod container;

use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::config::{Framework, Manifest, Project};
use crate::error::{DevkitError, DevkitResult};
use container::{AppContainer, ContainerRunner};

/// Maximum time to wait for the health endpoint
pub const MAX_WAIT_SECONDS: u64 = 300;

/// Delay between health-check attempts
pub const CHECK_INTERVAL_SECONDS: u64 = 2;

/// Per-request timeout for a single health probe
const PROBE_TIMEOUT_SECONDS: u64 = 2;

/// Smoke-test options from the CLI.
#[derive(Debug, Clone, Default)]
pub struct SmokeTestOptions {
    /// Hold the container after a passing check until Enter is pressed
    pub wait: bool,
}

/// Cross-check the active application against the declared health path.
///
/// The framework is detected from the build descriptor (falling back to the
/// manifest when the descriptor carries no recognizable start command), and
/// its expected health endpoint must match the manifest's
/// `container.health_check_path`. This runs before any build, to catch a
/// config sync that switched frameworks without updating the probe setting.
pub fn pre_check(manifest: &Manifest, app_dir: &Path) -> DevkitResult<Framework> {
    let dockerfile = app_dir.join("Dockerfile");
    let descriptor = fs::read_to_string(&dockerfile).map_err(|_| {
        DevkitError::Config(format!(
            "no build descriptor at {}; run `webapp-devkit configure` first",
            dockerfile.display()
        ))
    })?;

    let framework = match Framework::detect(&descriptor) {
        Some(detected) => detected,
        None => {
            tracing::debug!(
                fallback = %manifest.webapp.framework,
                "no start-command marker in build descriptor, using manifest framework"
            );
            manifest.webapp.framework
        }
    };

    let expected = framework.health_check_path();
    if manifest.container.health_check_path != expected {
        return Err(DevkitError::Consistency(format!(
            "active application targets {} (health endpoint {}), but the manifest declares \
             health_check_path = \"{}\"; update [container] in webapp.toml",
            framework, expected, manifest.container.health_check_path
        )));
    }

    Ok(framework)
}

/// Poll the health URL until it answers with a success status or the wait
/// budget elapses.
pub async fn wait_until_healthy(
    url: &str,
    budget_secs: u64,
    interval_secs: u64,
) -> DevkitResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(PROBE_TIMEOUT_SECONDS))
        .build()
        .map_err(|e| DevkitError::Container(format!("failed to build HTTP client: {}", e)))?;

    let mut waited = 0u64;
    loop {
        if is_healthy(&client, url).await {
            return Ok(());
        }
        if waited >= budget_secs {
            return Err(DevkitError::HealthCheckTimeout(budget_secs));
        }
        tokio::time::sleep(Duration::from_secs(interval_secs)).await;
        waited += interval_secs;
    }
}

async fn is_healthy(client: &reqwest::Client, url: &str) -> bool {
    match client.get(url).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

/// Run the smoke test: pre-check, build, run, health check, teardown.
pub async fn run(
    project: &Project,
    manifest: &Manifest,
    options: &SmokeTestOptions,
) -> DevkitResult<()> {
    let framework = pre_check(manifest, &project.app_dir())?;
    println!(
        "Framework: {}, health endpoint: {}",
        framework,
        framework.health_check_path()
    );

    let runner = ContainerRunner::connect().await?;

    let image_tag = format!("{}:smoke", manifest.webapp.app_name);
    println!("Building image '{}' from app_src/...", image_tag);
    runner
        .build_image(&project.app_dir(), &image_tag)
        .await?;

    let app_container = runner
        .create(&image_tag, &manifest.webapp.app_name, manifest.container.port)
        .await?;

    let outcome = supervise(&runner, &app_container, manifest, framework, options).await;
    runner.teardown(&app_container).await;
    outcome
}

/// Drive the created container to a verdict without tearing it down.
///
/// Everything past container creation runs here, under a Ctrl-C guard, so
/// the caller's teardown is reached exactly once on every path.
async fn supervise(
    runner: &ContainerRunner,
    app_container: &AppContainer,
    manifest: &Manifest,
    framework: Framework,
    options: &SmokeTestOptions,
) -> DevkitResult<()> {
    let outcome = tokio::select! {
        result = exercise(runner, app_container, manifest, framework, options.wait) => result,
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("Interrupted, cleaning up...");
            Err(DevkitError::Interrupted)
        }
    };

    if matches!(&outcome, Err(DevkitError::HealthCheckTimeout(_))) {
        println!("Health check FAILED. Container logs:");
        match runner.logs(app_container).await {
            Ok(logs) => println!("{}", logs),
            Err(e) => tracing::warn!("could not fetch container logs: {}", e),
        }
    }

    outcome
}

/// Start the container, resolve its host port, poll the health endpoint,
/// and optionally hold for operator input.
async fn exercise(
    runner: &ContainerRunner,
    app_container: &AppContainer,
    manifest: &Manifest,
    framework: Framework,
    wait: bool,
) -> DevkitResult<()> {
    runner.start(app_container).await?;

    let host_port = runner
        .host_port(app_container, manifest.container.port)
        .await?;
    let health_url = format!(
        "http://127.0.0.1:{}{}",
        host_port,
        framework.health_check_path()
    );
    println!(
        "Container port {} mapped to host port {}",
        manifest.container.port, host_port
    );
    println!(
        "Polling {} for up to {} seconds...",
        health_url, MAX_WAIT_SECONDS
    );

    wait_until_healthy(&health_url, MAX_WAIT_SECONDS, CHECK_INTERVAL_SECONDS).await?;
    println!("Health check PASSED. The application is running correctly.");

    if wait {
        println!(
            "Container is running on http://127.0.0.1:{}. Press [ENTER] to stop and clean up.",
            host_port
        );
        tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| ())
        })
        .await
        .map_err(|e| {
            DevkitError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
        })??;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn app_dir_with_dockerfile(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let app_dir = dir.path().join("app_src");
        fs::create_dir_all(&app_dir).unwrap();
        fs::write(app_dir.join("Dockerfile"), contents).unwrap();
        (dir, app_dir)
    }

    fn manifest_with(framework: Framework, health_check_path: &str) -> Manifest {
        let mut manifest = Manifest::default();
        manifest.webapp.framework = framework;
        manifest.container.health_check_path = health_check_path.to_string();
        manifest
    }

    const STREAMLIT_DOCKERFILE: &str =
        "FROM python:3.12-slim\nCMD [\"streamlit\", \"run\", \"streamlit_app.py\"]\n";

    #[test]
    fn test_pre_check_rejects_mismatched_health_path() {
        let (_guard, app_dir) = app_dir_with_dockerfile(STREAMLIT_DOCKERFILE);
        let manifest = manifest_with(Framework::Streamlit, "/health");

        let err = pre_check(&manifest, &app_dir).unwrap_err();
        assert!(matches!(err, DevkitError::Consistency(_)));
        let message = err.to_string();
        assert!(message.contains("streamlit"));
        assert!(message.contains("/health"));
    }

    #[test]
    fn test_pre_check_accepts_matching_health_path() {
        let (_guard, app_dir) = app_dir_with_dockerfile(STREAMLIT_DOCKERFILE);
        let manifest = manifest_with(Framework::Streamlit, "/_stcore/health");

        assert_eq!(pre_check(&manifest, &app_dir).unwrap(), Framework::Streamlit);
    }

    #[test]
    fn test_pre_check_detects_descriptor_over_manifest() {
        // The descriptor says FastAPI even though the manifest still says
        // streamlit; the detected framework wins.
        let (_guard, app_dir) =
            app_dir_with_dockerfile("FROM python:3.12-slim\nCMD [\"uvicorn\", \"app:app\"]\n");
        let manifest = manifest_with(Framework::Streamlit, "/health");

        assert_eq!(pre_check(&manifest, &app_dir).unwrap(), Framework::Fastapi);
    }

    #[test]
    fn test_pre_check_falls_back_to_manifest() {
        let (_guard, app_dir) = app_dir_with_dockerfile("FROM python:3.12-slim\n");
        let manifest = manifest_with(Framework::Dash, "/health");

        assert_eq!(pre_check(&manifest, &app_dir).unwrap(), Framework::Dash);
    }

    #[test]
    fn test_pre_check_missing_descriptor() {
        let dir = tempdir().unwrap();
        let manifest = Manifest::default();

        let err = pre_check(&manifest, &dir.path().join("app_src")).unwrap_err();
        assert!(matches!(err, DevkitError::Config(_)));
        assert!(err.to_string().contains("configure"));
    }

    #[tokio::test]
    async fn test_wait_until_healthy_times_out() {
        // Nothing listens on this port; a zero budget means a single probe.
        let result = wait_until_healthy("http://127.0.0.1:9/health", 0, 1).await;
        assert!(matches!(result, Err(DevkitError::HealthCheckTimeout(0))));
    }
}
