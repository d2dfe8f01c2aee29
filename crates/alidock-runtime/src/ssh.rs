//! SSH access to the container.

use std::path::Path;
use std::process::{Command, Stdio};

/// Builds the ssh argv connecting to the container's published port.
///
/// Host keys change with every container, so checking and persisting them
/// is disabled. X11 forwarding is trusted with a long timeout.
#[must_use]
pub fn ssh_command(port: u16, key: &Path) -> Vec<String> {
    vec![
        "ssh".to_owned(),
        "localhost".to_owned(),
        "-p".to_owned(),
        port.to_string(),
        "-Y".to_owned(),
        "-F/dev/null".to_owned(),
        "-oForwardX11Trusted=no".to_owned(),
        "-oUserKnownHostsFile=/dev/null".to_owned(),
        "-oLogLevel=QUIET".to_owned(),
        "-oStrictHostKeyChecking=no".to_owned(),
        "-oForwardX11Timeout=596h".to_owned(),
        "-i".to_owned(),
        key.to_string_lossy().into_owned(),
    ]
}

/// Runs one readiness probe over SSH.
pub trait SshProbe {
    /// Runs `argv` and reports whether it exited successfully.
    fn probe(&self, argv: &[String]) -> bool;
}

/// Probe spawning the real ssh client with output discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessProbe;

impl SshProbe for ProcessProbe {
    fn probe(&self, argv: &[String]) -> bool {
        let Some((program, args)) = argv.split_first() else {
            return false;
        };
        match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) => status.success(),
            Err(e) => {
                tracing::debug!(program, error = %e, "ssh probe could not be spawned");
                false
            }
        }
    }
}
