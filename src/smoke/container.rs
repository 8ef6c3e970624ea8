//! Docker container lifecycle for the smoke test
//!
//! Thin wrapper over the Docker API: build an image from the active
//! application directory, run a throwaway container with an ephemeral host
//! port, read its logs, and tear it down.

use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::image::BuildImageOptions;
use bollard::service::HostConfig;
use bollard::Docker;
use futures::StreamExt;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{DevkitError, DevkitResult};

/// Seconds Docker is given to stop the container before it is killed
const STOP_TIMEOUT_SECONDS: i64 = 10;

/// Handle to the smoke-test container.
#[derive(Debug, Clone)]
pub struct AppContainer {
    /// Container ID
    pub id: String,
    /// Container name
    pub name: String,
}

/// Docker client wrapper for the smoke-test flow.
pub struct ContainerRunner {
    docker: Docker,
}

impl ContainerRunner {
    /// Connect to the local Docker daemon and verify it responds.
    pub async fn connect() -> DevkitResult<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| DevkitError::DockerNotAvailable(e.to_string()))?;

        docker.ping().await.map_err(|e| {
            DevkitError::DockerNotAvailable(format!("failed to ping Docker: {}", e))
        })?;

        Ok(Self { docker })
    }

    /// Build an image from the application directory.
    ///
    /// The directory is tarred up as the build context; any error reported
    /// by the build stream is fatal, with the daemon's message surfaced.
    pub async fn build_image(&self, context_dir: &Path, tag: &str) -> DevkitResult<()> {
        let mut tar_buffer = Vec::new();
        {
            let mut builder = tar::Builder::new(&mut tar_buffer);
            builder.append_dir_all(".", context_dir).map_err(|e| {
                DevkitError::BuildFailed(format!(
                    "failed to archive build context {}: {}",
                    context_dir.display(),
                    e
                ))
            })?;
            builder
                .finish()
                .map_err(|e| DevkitError::BuildFailed(format!("failed to finish archive: {}", e)))?;
        }

        let options = BuildImageOptions {
            dockerfile: "Dockerfile".to_string(),
            t: tag.to_string(),
            rm: true,
            ..Default::default()
        };

        let mut stream = self.docker.build_image(options, None, Some(tar_buffer.into()));
        while let Some(message) = stream.next().await {
            let info = message.map_err(|e| DevkitError::BuildFailed(e.to_string()))?;
            if let Some(error) = info.error {
                return Err(DevkitError::BuildFailed(error));
            }
            if let Some(line) = info.stream {
                let line = line.trim_end();
                if !line.is_empty() {
                    tracing::debug!(target: "docker_build", "{}", line);
                }
            }
        }

        Ok(())
    }

    /// Create the smoke-test container, publishing the internal service port
    /// to an ephemeral host port. The container is not started yet.
    pub async fn create(
        &self,
        image: &str,
        app_name: &str,
        container_port: u16,
    ) -> DevkitResult<AppContainer> {
        let container_name = format!("{}-smoke-{}", app_name, uuid::Uuid::new_v4());
        let port_key = format!("{}/tcp", container_port);

        let host_config = HostConfig {
            publish_all_ports: Some(true),
            ..Default::default()
        };

        let config = Config {
            image: Some(image.to_string()),
            exposed_ports: Some(HashMap::from([(port_key, HashMap::new())])),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: container_name.as_str(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| DevkitError::Container(format!("failed to create container: {}", e)))?;

        Ok(AppContainer {
            id: response.id,
            name: container_name,
        })
    }

    /// Start the container detached.
    pub async fn start(&self, container: &AppContainer) -> DevkitResult<()> {
        self.docker
            .start_container(&container.id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| DevkitError::Container(format!("failed to start container: {}", e)))?;

        Ok(())
    }

    /// Resolve the host port Docker bound to the container's service port.
    ///
    /// The mapping is dynamic, so it is read back from the daemon rather
    /// than assumed.
    pub async fn host_port(
        &self,
        container: &AppContainer,
        container_port: u16,
    ) -> DevkitResult<u16> {
        let inspect = self
            .docker
            .inspect_container(&container.id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| DevkitError::Container(format!("failed to inspect container: {}", e)))?;

        let key = format!("{}/tcp", container_port);
        let bound = inspect
            .network_settings
            .and_then(|settings| settings.ports)
            .and_then(|ports| ports.get(&key).cloned().flatten())
            .and_then(|bindings| bindings.into_iter().find_map(|b| b.host_port))
            .ok_or_else(|| {
                DevkitError::Container(format!(
                    "no host port bound for container port {}",
                    container_port
                ))
            })?;

        bound.parse::<u16>().map_err(|_| {
            DevkitError::Container(format!("unparseable host port mapping '{}'", bound))
        })
    }

    /// Fetch the container's combined stdout/stderr logs.
    pub async fn logs(&self, container: &AppContainer) -> DevkitResult<String> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: "all".to_string(),
            ..Default::default()
        };

        let mut output = String::new();
        let mut stream = self.docker.logs(&container.id, Some(options));

        while let Some(result) = stream.next().await {
            match result {
                Ok(LogOutput::StdOut { message }) | Ok(LogOutput::StdErr { message }) => {
                    output.push_str(&String::from_utf8_lossy(&message));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("error reading container logs: {}", e);
                }
            }
        }

        Ok(output)
    }

    /// Stop and remove the container.
    ///
    /// Failures are logged, not propagated: teardown runs on error paths
    /// where the original error must survive.
    pub async fn teardown(&self, container: &AppContainer) {
        let stop_options = StopContainerOptions {
            t: STOP_TIMEOUT_SECONDS,
        };
        if let Err(e) = self
            .docker
            .stop_container(&container.id, Some(stop_options))
            .await
        {
            tracing::warn!(container = %container.name, "failed to stop container: {}", e);
        }

        let remove_options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        if let Err(e) = self
            .docker
            .remove_container(&container.id, Some(remove_options))
            .await
        {
            tracing::warn!(container = %container.name, "failed to remove container: {}", e);
        } else {
            tracing::info!(container = %container.name, "cleanup complete");
        }
    }
}
