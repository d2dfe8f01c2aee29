//! Fixed names, paths and defaults.

use std::path::PathBuf;

/// Application name used in CLI output, the package index and state files.
pub const APP_NAME: &str = "alidock";

/// Default base name of the managed container (the uid is appended).
pub const DEFAULT_DOCK_NAME: &str = "alidock";

/// Default image the container is created from.
pub const DEFAULT_IMAGE_NAME: &str = "alisw/alidock:latest";

/// Default host directory shared with the container as its home.
pub const DEFAULT_DIR_OUTSIDE: &str = "~/alidock";

/// Default minimum interval between two update checks, in seconds.
pub const DEFAULT_UPDATE_PERIOD: u64 = 43_200;

/// Per-user configuration file, relative to `$HOME`.
pub const CONFIG_FILE: &str = ".alidock-config.yaml";

/// Mount point of the shared directory inside the container.
pub const DIR_INSIDE: &str = "/home/alidock";

/// Container log written by the init script, relative to the shared directory.
pub const LOG_RELATIVE: &str = ".alidock.log";

/// Init script written before container creation, relative to the shared directory.
pub const INIT_SCRIPT_RELATIVE: &str = ".alidock-init.sh";

/// Private key used to log into the container, relative to the shared directory.
pub const SSH_KEY_RELATIVE: &str = ".ssh/id_rsa";

/// Timestamp of the last client version check, relative to the shared directory.
pub const CLIENT_CHECK_STATE: &str = ".alidock_client_check";

/// Timestamp of the last image digest check, relative to the shared directory.
pub const IMAGE_CHECK_STATE: &str = ".alidock_docker_check";

/// Container port the SSH daemon listens on.
pub const SSH_CONTAINER_PORT: &str = "22/tcp";

/// Number of SSH readiness probes before giving up.
pub const SSH_POLL_ATTEMPTS: u32 = 40;

/// Delay between two SSH readiness probes, in milliseconds.
pub const SSH_POLL_INTERVAL_MS: u64 = 500;

/// Capability granted to the container so debuggers work inside it.
pub const CONTAINER_CAPABILITY: &str = "SYS_PTRACE";

/// Name of the tmux session created or resumed by `enter --tmux`.
pub const TMUX_SESSION: &str = "ad-tmux";

/// Base URL of the crates.io API queried for client updates.
pub const PACKAGE_INDEX_URL: &str = "https://crates.io/api/v1";

/// Timeout for package index requests, in seconds.
pub const PACKAGE_INDEX_TIMEOUT_SECS: u64 = 5;

/// Returns the invoking user's home directory, if `$HOME` is set.
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

/// Returns the default configuration file path (`~/.alidock-config.yaml`).
pub fn default_config_file() -> Option<PathBuf> {
    home_dir().map(|home| home.join(CONFIG_FILE))
}

/// Expands a leading `~` to the home directory; other paths are returned as-is.
pub fn expand_home(path: &str) -> PathBuf {
    let Some(home) = home_dir() else {
        return PathBuf::from(path);
    };
    if path == "~" {
        home
    } else if let Some(rest) = path.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(path)
    }
}
