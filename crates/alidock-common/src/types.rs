//! Domain primitive types used across the alidock workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the managed container: `<base>-<uid>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DockName(String);

impl DockName {
    /// Builds the per-user container name from a base name and a uid.
    #[must_use]
    pub fn for_user(base: &str, uid: u32) -> Self {
        Self(format!("{base}-{uid}"))
    }

    /// Returns the name without the uid suffix.
    #[must_use]
    pub fn base(&self) -> &str {
        self.0.rsplit_once('-').map_or(self.0.as_str(), |(base, _)| base)
    }

    /// Returns the full container name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DockName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of the user invoking alidock, mirrored inside the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    /// Numeric user id.
    pub uid: u32,
    /// Login name.
    pub name: String,
}

impl UserIdentity {
    /// Returns true for the superuser account.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.uid == 0
    }
}

/// Observed state of the managed container.
///
/// There is no stopped-but-present state: stopping always removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerState {
    /// No container with the managed name exists.
    Absent,
    /// The container exists in the runtime.
    Running,
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Running => write!(f, "running"),
        }
    }
}
