//! Unified error type for the alidock workspace.
//!
//! Lower layers classify foreign errors (Docker API, HTTP, filesystem) into
//! these variants at their boundary so the CLI can pick an exit code without
//! knowing where a failure came from.

use std::path::PathBuf;

use thiserror::Error;

/// Exit code for domain errors (refusals, unavailable container, bad setup).
pub const EXIT_DOMAIN: i32 = 10;
/// Exit code when the Docker API answered with an error.
pub const EXIT_RUNTIME_API: i32 = 11;
/// Exit code when Docker could not be reached at all.
pub const EXIT_CONNECTIVITY: i32 = 12;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum AlidockError {
    /// The configuration file could not be read or parsed.
    ///
    /// Never surfaced to users: the resolver falls back to defaults.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// The container is missing or lacks the expected SSH port mapping.
    #[error(
        "cannot find container, maybe it did not start up properly: check log file {} for details. Error: {reason}",
        log_file.display()
    )]
    ContainerUnavailable {
        /// Host path of the container's log file.
        log_file: PathBuf,
        /// What exactly was missing.
        reason: String,
    },

    /// A client version or image digest check failed.
    #[error("update check failed: {message}")]
    UpdateCheck {
        /// Description of the failure.
        message: String,
    },

    /// The Docker API replied with an unexpected error.
    #[error("{message}")]
    Runtime {
        /// Message returned by the daemon.
        message: String,
    },

    /// The Docker daemon could not be reached.
    #[error("{message}")]
    Connectivity {
        /// Description of the connection failure.
        message: String,
    },

    /// A runtime object does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing object.
        kind: &'static str,
        /// Identifier of the missing object.
        id: String,
    },

    /// The requested operation is refused or impossible in the current setup.
    #[error("{message}")]
    Domain {
        /// Description of the refusal.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl AlidockError {
    /// Shorthand for a [`AlidockError::Domain`] error.
    pub fn domain(message: impl Into<String>) -> Self {
        Self::Domain {
            message: message.into(),
        }
    }

    /// Shorthand for an [`AlidockError::UpdateCheck`] error.
    pub fn update_check(message: impl ToString) -> Self {
        Self::UpdateCheck {
            message: message.to_string(),
        }
    }

    /// Returns true for [`AlidockError::NotFound`].
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Process exit code reported for this error.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Runtime { .. } | Self::NotFound { .. } => EXIT_RUNTIME_API,
            Self::Connectivity { .. } => EXIT_CONNECTIVITY,
            Self::Config { .. }
            | Self::ContainerUnavailable { .. }
            | Self::UpdateCheck { .. }
            | Self::Domain { .. }
            | Self::Io { .. } => EXIT_DOMAIN,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, AlidockError>;
