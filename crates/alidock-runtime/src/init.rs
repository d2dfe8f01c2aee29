//! Container init script rendering.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use alidock_common::constants;
use alidock_common::error::{AlidockError, Result};
use alidock_common::types::{DockName, UserIdentity};

const TEMPLATE: &str = include_str!("../templates/init.sh");

/// Values substituted into the init script template.
#[derive(Debug, Clone)]
pub struct InitParams<'a> {
    /// Container name; the script uses its base as hostname.
    pub dock_name: &'a DockName,
    /// Shared directory as seen from inside the container.
    pub shared_dir: &'a str,
    /// Log file name, relative to the shared directory.
    pub log_relative: &'a str,
    /// Host user mirrored inside the container.
    pub user: &'a UserIdentity,
}

/// Renders the init script.
#[must_use]
pub fn render(params: &InitParams<'_>) -> String {
    TEMPLATE
        .replace("{{dock_name}}", params.dock_name.base())
        .replace("{{shared_dir}}", params.shared_dir)
        .replace("{{log_relative}}", params.log_relative)
        .replace("{{user_name}}", &params.user.name)
        .replace("{{user_id}}", &params.user.uid.to_string())
}

/// Writes the rendered init script into `host_dir` with mode 0755.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be written or made executable.
pub fn write_script(host_dir: &Path, params: &InitParams<'_>) -> Result<PathBuf> {
    let path = host_dir.join(constants::INIT_SCRIPT_RELATIVE);
    fs::write(&path, render(params)).map_err(|e| AlidockError::Io {
        path: path.clone(),
        source: e,
    })?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).map_err(|e| {
        AlidockError::Io {
            path: path.clone(),
            source: e,
        }
    })?;
    tracing::debug!(path = %path.display(), "init script written");
    Ok(path)
}
