//! # alidock
//!
//! Persistent, per-user development container driven through Docker.
//! A single binary creating, entering and destroying the container.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod commands;
mod output;

use alidock_common::config::Config;
use alidock_common::constants;
use alidock_common::error::{AlidockError, EXIT_CONNECTIVITY, EXIT_DOMAIN, EXIT_RUNTIME_API};
use alidock_common::types::UserIdentity;
use alidock_runtime::backend::docker::DockerBackend;
use alidock_runtime::dock::Dock;
use clap::Parser;
use nix::unistd::{User, getuid};

use crate::commands::{Cli, Outcome};
use crate::output::Reporter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let out = Reporter::new(cli.quiet);
    let code = match run(&cli, &out) {
        Ok(code) => code,
        Err(err) => {
            let (code, message) = failure(&err);
            out.error(message);
            code
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli, out: &Reporter) -> anyhow::Result<i32> {
    let user = current_user()?;
    if user.is_root() {
        return Err(AlidockError::domain(
            "refusing to execute as root: use an unprivileged user account",
        )
        .into());
    }

    let config = Config::resolve(&cli.overrides(), user.uid);
    tracing::debug!(?config, "configuration resolved");
    let dock = Dock::new(config, user, DockerBackend::connect()?);

    let _ = commands::update::check_client(
        &dock.update_checker(),
        constants::PACKAGE_INDEX_URL,
        out,
    );

    let request = cli.request(std::env::var_os("TMUX").is_some());
    match commands::dispatch(&dock, &request, out)? {
        Outcome::Done => Ok(0),
        Outcome::Exit(code) => Ok(code),
        Outcome::HandOff(handoff) => Err(handoff.exec().into()),
    }
}

fn current_user() -> Result<UserIdentity, AlidockError> {
    let uid = getuid();
    let name = User::from_uid(uid)
        .map_err(|e| AlidockError::domain(format!("cannot look up user {uid}: {e}")))?
        .map_or_else(|| uid.to_string(), |u| u.name);
    Ok(UserIdentity {
        uid: uid.as_raw(),
        name,
    })
}

/// Exit code and user-facing message for a failed invocation.
fn failure(err: &anyhow::Error) -> (i32, String) {
    let cause = err.chain().find_map(|e| e.downcast_ref::<AlidockError>());
    match cause {
        Some(AlidockError::Runtime { .. } | AlidockError::NotFound { .. }) => {
            (EXIT_RUNTIME_API, format!("Docker error: {err:#}"))
        }
        Some(AlidockError::Connectivity { .. }) => (
            EXIT_CONNECTIVITY,
            format!("Cannot communicate to Docker, is it running? Full error: {err:#}"),
        ),
        Some(e) => (e.exit_code(), format!("Cannot continue: {err:#}")),
        None => (EXIT_DOMAIN, format!("Cannot continue: {err:#}")),
    }
}
