//! `alidock enter|exec|root|start`: make sure the container runs, then attach.

use alidock_common::constants;
use alidock_common::error::AlidockError;
use alidock_runtime::backend::ContainerBackend;
use alidock_runtime::dock::Dock;
use alidock_runtime::ssh::SshProbe;
use anyhow::Context;

use super::{Action, Outcome, Request, TmuxMode};
use crate::output::Reporter;

/// Executes one of the attaching actions.
///
/// # Errors
///
/// Returns an error if the container cannot be created or reached.
pub fn execute<B, P>(dock: &Dock<B, P>, request: &Request, out: &Reporter) -> anyhow::Result<Outcome>
where
    B: ContainerBackend,
    P: SshProbe,
{
    // Refuse before touching the runtime.
    let tmux = tmux_args(request)?;

    let created = if dock.is_running()? {
        false
    } else {
        // The image check keeps its timestamp in the shared directory.
        let _ = dock.prepare_shared_dir()?;
        refresh_image(dock, out);
        out.info("Creating container, hold on");
        let id = dock.run().context("cannot create the container")?;
        tracing::info!(%id, name = %dock.config().dock_name, "container created");
        true
    };

    match request.action {
        Action::Enter => {
            let extra = match tmux {
                Some(args) => {
                    out.info("Resuming tmux session in the container");
                    args
                }
                None => {
                    out.info("Starting a shell into the container");
                    Vec::new()
                }
            };
            attach(dock, &extra, out)
        }
        Action::Exec => {
            out.info("Executing command in the container");
            let extra: Vec<String> = std::iter::once("-t".to_owned())
                .chain(request.shell_cmd.iter().cloned())
                .collect();
            attach(dock, &extra, out)
        }
        Action::Root => {
            out.info("Starting a root shell into the container (use it at your own risk)");
            Ok(Outcome::HandOff(dock.root_shell()))
        }
        Action::Start | Action::Status | Action::Stop => {
            if !created {
                out.info("Container is already running");
            }
            Ok(Outcome::Done)
        }
    }
}

/// Remote command opening the tmux session, or `None` for a plain shell.
fn tmux_args(request: &Request) -> Result<Option<Vec<String>>, AlidockError> {
    if request.action != Action::Enter || request.tmux == TmuxMode::Off {
        return Ok(None);
    }
    if request.in_tmux {
        return Err(AlidockError::domain("already in a tmux session"));
    }
    let control = request.tmux == TmuxMode::Control;
    let args = ["-t", "tmux", "-u", "-CC", "new-session", "-A", "-s", constants::TMUX_SESSION]
        .into_iter()
        .filter(|arg| control || *arg != "-CC")
        .map(str::to_owned)
        .collect();
    Ok(Some(args))
}

/// Pulls a newer image when one is published. Never fails.
fn refresh_image<B, P>(dock: &Dock<B, P>, out: &Reporter)
where
    B: ContainerBackend,
    P: SshProbe,
{
    let refreshed = dock.has_image_updates().and_then(|update| {
        if update {
            out.info("Updating container image, hold on");
            dock.pull()?;
        }
        Ok(update)
    });
    match refreshed {
        Ok(true) => {
            out.warning("Container updated, you may want to free some space with:");
            out.warning("    docker system prune");
        }
        Ok(false) => {}
        Err(e) => {
            tracing::debug!(error = %e, "image update failed");
            out.warning("Cannot update container image this time");
        }
    }
}

fn attach<B, P>(dock: &Dock<B, P>, extra: &[String], out: &Reporter) -> anyhow::Result<Outcome>
where
    B: ContainerBackend,
    P: SshProbe,
{
    if !dock.wait_ssh_up()? {
        out.warning(format!(
            "Container does not answer over SSH yet, see {}",
            dock.config().log_file().display()
        ));
    }
    Ok(Outcome::HandOff(dock.shell(extra)?))
}
