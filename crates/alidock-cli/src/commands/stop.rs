//! `alidock stop`: destroy the container.

use alidock_runtime::backend::ContainerBackend;
use alidock_runtime::dock::Dock;
use alidock_runtime::ssh::SshProbe;
use anyhow::Context;

use super::Outcome;
use crate::output::Reporter;

/// Executes the `stop` command. Stopping an absent container succeeds.
///
/// # Errors
///
/// Returns an error if the runtime refuses to remove the container.
pub fn execute<B, P>(dock: &Dock<B, P>, out: &Reporter) -> anyhow::Result<Outcome>
where
    B: ContainerBackend,
    P: SshProbe,
{
    out.info("Destroying the container");
    dock.stop()
        .with_context(|| format!("cannot remove container {}", dock.config().dock_name))?;
    tracing::info!(name = %dock.config().dock_name, "container removed");
    Ok(Outcome::Done)
}
