//! Container runtime abstraction.
//!
//! The runtime daemon is the only source of truth for container existence
//! and port assignment; nothing here caches its answers.

pub mod docker;
#[cfg(any(test, feature = "testing"))]
pub mod fake;

use std::collections::HashMap;
use std::path::PathBuf;

use alidock_common::error::Result;

/// Configuration for creating the managed container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Container name.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Entrypoint argv.
    pub entrypoint: Vec<String>,
    /// Remove the container as soon as it exits.
    pub auto_remove: bool,
    /// Extra kernel capabilities.
    pub cap_add: Vec<String>,
    /// Bind mounts.
    pub mounts: Vec<BindMount>,
    /// Container ports published on a random host port (e.g. `22/tcp`).
    pub published_ports: Vec<String>,
}

/// A host directory bind-mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    /// Absolute host path.
    pub source: PathBuf,
    /// Mount point inside the container.
    pub target: String,
}

/// What the runtime reports about an existing container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Runtime-assigned identifier.
    pub id: String,
    /// Container name.
    pub name: String,
    /// Runtime state string (`running`, `paused`, ...).
    pub state: String,
    /// Host ports bound to each published container port.
    pub ports: HashMap<String, Vec<u16>>,
}

impl ContainerInfo {
    /// First host port bound to `container_port`, if any.
    #[must_use]
    pub fn host_port(&self, container_port: &str) -> Option<u16> {
        self.ports.get(container_port)?.first().copied()
    }
}

/// Operations alidock needs from the container runtime.
///
/// Implementations report a missing object as
/// [`AlidockError::NotFound`](alidock_common::error::AlidockError::NotFound),
/// an error answer from the daemon as `Runtime` and an unreachable daemon as
/// `Connectivity`.
pub trait ContainerBackend {
    /// Looks up a container by name.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such container exists.
    fn inspect(&self, name: &str) -> Result<ContainerInfo>;

    /// Creates and starts a container, returning its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be created or started.
    fn create(&self, spec: &ContainerSpec) -> Result<String>;

    /// Removes a container, killing it first when `force` is set.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such container exists.
    fn remove(&self, name: &str, force: bool) -> Result<()>;

    /// Repository digests (`repo@sha256:...`) of a locally cached image.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the image is not cached locally.
    fn image_repo_digests(&self, image: &str) -> Result<Vec<String>>;

    /// Digest the registry currently publishes for `image`.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried.
    fn registry_digest(&self, image: &str) -> Result<String>;

    /// Pulls `image` from its registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the pull fails.
    fn pull(&self, image: &str) -> Result<()>;
}

/// Splits an image reference into repository and tag, defaulting to `latest`.
///
/// References pinned by digest keep the digest as their "tag".
#[must_use]
pub fn split_reference(image: &str) -> (&str, &str) {
    if let Some((repo, digest)) = image.split_once('@') {
        return (repo, digest);
    }
    // A colon after the last slash is a tag; before it, a registry port.
    let last_slash = image.rfind('/').map_or(0, |i| i + 1);
    match image[last_slash..].rfind(':') {
        Some(i) => {
            let at = last_slash + i;
            (&image[..at], &image[at + 1..])
        }
        None => (image, "latest"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_reference_with_tag() {
        assert_eq!(
            split_reference("alisw/alidock:latest"),
            ("alisw/alidock", "latest")
        );
    }

    #[test]
    fn split_reference_defaults_to_latest() {
        assert_eq!(split_reference("alisw/alidock"), ("alisw/alidock", "latest"));
    }

    #[test]
    fn split_reference_keeps_registry_port() {
        assert_eq!(
            split_reference("registry.local:5000/dev/box"),
            ("registry.local:5000/dev/box", "latest")
        );
        assert_eq!(
            split_reference("registry.local:5000/dev/box:v2"),
            ("registry.local:5000/dev/box", "v2")
        );
    }

    #[test]
    fn split_reference_with_digest() {
        assert_eq!(
            split_reference("alisw/alidock@sha256:abc"),
            ("alisw/alidock", "sha256:abc")
        );
    }

    #[test]
    fn host_port_reads_first_binding() {
        let mut info = ContainerInfo::default();
        let _ = info.ports.insert("22/tcp".into(), vec![32768, 32769]);
        assert_eq!(info.host_port("22/tcp"), Some(32768));
        assert_eq!(info.host_port("80/tcp"), None);
    }
}
