//! `alidock status`: report whether the container runs.

use alidock_common::constants;
use alidock_common::types::ContainerState;
use alidock_runtime::backend::ContainerBackend;
use alidock_runtime::dock::Dock;
use alidock_runtime::ssh::SshProbe;

use super::Outcome;
use crate::output::Reporter;

/// Executes the `status` command. Never creates anything.
///
/// # Errors
///
/// Returns an error if the runtime cannot be queried.
pub fn execute<B, P>(dock: &Dock<B, P>, out: &Reporter) -> anyhow::Result<Outcome>
where
    B: ContainerBackend,
    P: SshProbe,
{
    if dock.state()? == ContainerState::Absent {
        out.error("Container is not running");
        return Ok(Outcome::Exit(1));
    }
    out.info("Container is running");
    // None if the container went away since the state query.
    if let Some(info) = dock.container()? {
        let port = info
            .host_port(constants::SSH_CONTAINER_PORT)
            .map_or_else(|| "none".to_owned(), |p| p.to_string());
        out.info(format!(
            "Name: {}, ID: {}, state: {}, SSH port: {port}",
            info.name,
            short_id(&info.id),
            info.state
        ));
    }
    Ok(Outcome::Exit(0))
}

/// Identifier abbreviated the way `docker ps` shows it.
fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}
