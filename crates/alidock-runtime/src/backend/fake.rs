//! In-memory backend recording every call, for tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use alidock_common::error::{AlidockError, Result};

use super::{ContainerBackend, ContainerInfo, ContainerSpec};

/// Host port assigned to `22/tcp` on containers created by the fake.
pub const FAKE_SSH_PORT: u16 = 32_768;

/// Backend keeping containers and images in memory.
#[derive(Debug, Default)]
pub struct FakeBackend {
    containers: RefCell<HashMap<String, ContainerInfo>>,
    local_digests: RefCell<HashMap<String, Vec<String>>>,
    registry_digests: RefCell<HashMap<String, String>>,
    inspect_error: RefCell<Option<AlidockError>>,
    /// Specs passed to [`ContainerBackend::create`], in order.
    pub created: RefCell<Vec<ContainerSpec>>,
    /// Number of [`ContainerBackend::remove`] calls.
    pub removals: Cell<usize>,
    /// Number of [`ContainerBackend::registry_digest`] calls.
    pub registry_queries: Cell<usize>,
    /// Images passed to [`ContainerBackend::pull`], in order.
    pub pulls: RefCell<Vec<String>>,
}

impl FakeBackend {
    /// Empty runtime: no containers, no images.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an existing container with an optional SSH port binding.
    #[must_use]
    pub fn with_container(self, name: &str, ssh_port: Option<u16>) -> Self {
        let mut info = ContainerInfo {
            id: format!("id-{name}"),
            name: name.to_owned(),
            state: "running".to_owned(),
            ports: HashMap::new(),
        };
        if let Some(port) = ssh_port {
            let _ = info.ports.insert("22/tcp".to_owned(), vec![port]);
        }
        let _ = self.containers.borrow_mut().insert(name.to_owned(), info);
        self
    }

    /// Caches `image` locally with the given repo digests.
    #[must_use]
    pub fn with_local_image(self, image: &str, repo_digests: &[&str]) -> Self {
        let _ = self.local_digests.borrow_mut().insert(
            image.to_owned(),
            repo_digests.iter().map(|d| (*d).to_owned()).collect(),
        );
        self
    }

    /// Publishes `digest` for `image` in the registry.
    #[must_use]
    pub fn with_registry_digest(self, image: &str, digest: &str) -> Self {
        let _ = self
            .registry_digests
            .borrow_mut()
            .insert(image.to_owned(), digest.to_owned());
        self
    }

    /// Makes the next `inspect` call fail with `err`.
    #[must_use]
    pub fn failing_inspect(self, err: AlidockError) -> Self {
        *self.inspect_error.borrow_mut() = Some(err);
        self
    }

    /// Whether a container with this name currently exists.
    #[must_use]
    pub fn has_container(&self, name: &str) -> bool {
        self.containers.borrow().contains_key(name)
    }
}

impl ContainerBackend for FakeBackend {
    fn inspect(&self, name: &str) -> Result<ContainerInfo> {
        if let Some(err) = self.inspect_error.borrow_mut().take() {
            return Err(err);
        }
        self.containers
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| AlidockError::NotFound {
                kind: "container",
                id: name.to_owned(),
            })
    }

    fn create(&self, spec: &ContainerSpec) -> Result<String> {
        if self.has_container(&spec.name) {
            return Err(AlidockError::Runtime {
                message: format!("container name {} already in use", spec.name),
            });
        }
        self.created.borrow_mut().push(spec.clone());
        let mut info = ContainerInfo {
            id: format!("id-{}", spec.name),
            name: spec.name.clone(),
            state: "running".to_owned(),
            ports: HashMap::new(),
        };
        for port in &spec.published_ports {
            let _ = info.ports.insert(port.clone(), vec![FAKE_SSH_PORT]);
        }
        let id = info.id.clone();
        let _ = self.containers.borrow_mut().insert(spec.name.clone(), info);
        Ok(id)
    }

    fn remove(&self, name: &str, _force: bool) -> Result<()> {
        self.removals.set(self.removals.get() + 1);
        self.containers
            .borrow_mut()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| AlidockError::NotFound {
                kind: "container",
                id: name.to_owned(),
            })
    }

    fn image_repo_digests(&self, image: &str) -> Result<Vec<String>> {
        self.local_digests
            .borrow()
            .get(image)
            .cloned()
            .ok_or_else(|| AlidockError::NotFound {
                kind: "image",
                id: image.to_owned(),
            })
    }

    fn registry_digest(&self, image: &str) -> Result<String> {
        self.registry_queries.set(self.registry_queries.get() + 1);
        self.registry_digests
            .borrow()
            .get(image)
            .cloned()
            .ok_or_else(|| AlidockError::Runtime {
                message: format!("manifest unknown: {image}"),
            })
    }

    fn pull(&self, image: &str) -> Result<()> {
        self.pulls.borrow_mut().push(image.to_owned());
        Ok(())
    }
}
