//! Docker Engine backend.
//!
//! Talks to the local daemon through bollard. The API client is async, so
//! the backend owns a current-thread Tokio runtime and blocks on every call:
//! callers stay fully synchronous.

use std::collections::HashMap;

use alidock_common::error::{AlidockError, Result};
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, RemoveContainerOptions,
    StartContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, Mount, MountTypeEnum, PortBinding};
use futures_util::TryStreamExt;
use tokio::runtime::Runtime;

use super::{ContainerBackend, ContainerInfo, ContainerSpec, split_reference};

/// Backend driving the local Docker daemon (`DOCKER_HOST` is honoured).
pub struct DockerBackend {
    docker: Docker,
    rt: Runtime,
}

impl DockerBackend {
    /// Connects to the local Docker daemon.
    ///
    /// No request is sent yet: an unreachable daemon surfaces on first use.
    ///
    /// # Errors
    ///
    /// Returns `Connectivity` if the client cannot be configured.
    pub fn connect() -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AlidockError::Connectivity {
                message: format!("cannot start I/O runtime: {e}"),
            })?;
        let docker = {
            let _guard = rt.enter();
            Docker::connect_with_local_defaults().map_err(|e| AlidockError::Connectivity {
                message: e.to_string(),
            })?
        };
        tracing::debug!(version = ?docker.client_version(), "docker client configured");
        Ok(Self { docker, rt })
    }
}

impl ContainerBackend for DockerBackend {
    fn inspect(&self, name: &str) -> Result<ContainerInfo> {
        let response = self
            .rt
            .block_on(
                self.docker
                    .inspect_container(name, None::<InspectContainerOptions>),
            )
            .map_err(|e| classify(e, "container", name))?;

        let ports = response
            .network_settings
            .and_then(|settings| settings.ports)
            .unwrap_or_default()
            .into_iter()
            .map(|(port, bindings)| {
                let host_ports = bindings
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|binding| binding.host_port?.parse().ok())
                    .collect();
                (port, host_ports)
            })
            .collect();

        Ok(ContainerInfo {
            id: response.id.unwrap_or_default(),
            name: response
                .name
                .map(|n| n.trim_start_matches('/').to_owned())
                .unwrap_or_default(),
            state: response
                .state
                .and_then(|state| state.status)
                .map(|status| status.to_string())
                .unwrap_or_default(),
            ports,
        })
    }

    fn create(&self, spec: &ContainerSpec) -> Result<String> {
        let mut exposed_ports = HashMap::new();
        let mut port_bindings = HashMap::new();
        for port in &spec.published_ports {
            let _ = exposed_ports.insert(port.clone(), HashMap::new());
            // An empty host port lets the daemon pick a free one.
            let _ = port_bindings.insert(
                port.clone(),
                Some(vec![PortBinding {
                    host_ip: Some(String::new()),
                    host_port: Some(String::new()),
                }]),
            );
        }

        let mounts = spec
            .mounts
            .iter()
            .map(|m| Mount {
                target: Some(m.target.clone()),
                source: Some(m.source.to_string_lossy().into_owned()),
                typ: Some(MountTypeEnum::BIND),
                ..Default::default()
            })
            .collect();

        let host_config = HostConfig {
            auto_remove: Some(spec.auto_remove),
            cap_add: Some(spec.cap_add.clone()),
            mounts: Some(mounts),
            port_bindings: Some(port_bindings),
            ..Default::default()
        };

        let config = Config {
            image: Some(spec.image.clone()),
            entrypoint: Some(spec.entrypoint.clone()),
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        let created = match self
            .rt
            .block_on(self.docker.create_container(Some(options.clone()), config.clone()))
            .map_err(|e| classify(e, "image", &spec.image))
        {
            Ok(created) => created,
            // Image not cached locally yet.
            Err(e) if e.is_not_found() => {
                tracing::info!(image = %spec.image, "image missing, pulling before create");
                self.pull(&spec.image)?;
                self.rt
                    .block_on(self.docker.create_container(Some(options), config))
                    .map_err(|e| classify(e, "image", &spec.image))?
            }
            Err(e) => return Err(e),
        };
        tracing::info!(id = %created.id, name = %spec.name, "container created");

        self.rt
            .block_on(
                self.docker
                    .start_container(&spec.name, None::<StartContainerOptions<String>>),
            )
            .map_err(|e| classify(e, "container", &spec.name))?;
        tracing::info!(id = %created.id, name = %spec.name, "container started");

        Ok(created.id)
    }

    fn remove(&self, name: &str, force: bool) -> Result<()> {
        let options = RemoveContainerOptions {
            force,
            ..Default::default()
        };
        self.rt
            .block_on(self.docker.remove_container(name, Some(options)))
            .map_err(|e| classify(e, "container", name))
    }

    fn image_repo_digests(&self, image: &str) -> Result<Vec<String>> {
        let inspect = self
            .rt
            .block_on(self.docker.inspect_image(image))
            .map_err(|e| classify(e, "image", image))?;
        Ok(inspect.repo_digests.unwrap_or_default())
    }

    fn registry_digest(&self, image: &str) -> Result<String> {
        let distribution = self
            .rt
            .block_on(self.docker.inspect_registry_image(image, None))
            .map_err(|e| classify(e, "image", image))?;
        distribution
            .descriptor
            .digest
            .ok_or_else(|| AlidockError::Runtime {
                message: format!("registry returned no digest for {image}"),
            })
    }

    fn pull(&self, image: &str) -> Result<()> {
        let (repo, tag) = split_reference(image);
        let options = CreateImageOptions {
            from_image: repo.to_owned(),
            tag: tag.to_owned(),
            ..Default::default()
        };
        tracing::info!(repo, tag, "pulling image");
        let progress = self
            .rt
            .block_on(
                self.docker
                    .create_image(Some(options), None, None)
                    .try_collect::<Vec<_>>(),
            )
            .map_err(|e| classify(e, "image", image))?;
        tracing::debug!(events = progress.len(), "image pulled");
        Ok(())
    }
}

/// Maps a bollard error onto the workspace error classes.
fn classify(err: DockerError, kind: &'static str, id: &str) -> AlidockError {
    match err {
        DockerError::DockerResponseServerError {
            status_code: 404, ..
        } => AlidockError::NotFound {
            kind,
            id: id.to_owned(),
        },
        DockerError::DockerResponseServerError { message, .. } => {
            AlidockError::Runtime { message }
        }
        DockerError::DockerStreamError { error } => AlidockError::Runtime { message: error },
        other => AlidockError::Connectivity {
            message: other.to_string(),
        },
    }
}
