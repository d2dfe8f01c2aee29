//! CLI definition and action dispatch.

pub mod enter;
pub mod status;
pub mod stop;
pub mod update;

use alidock_common::config::ConfigLayer;
use alidock_runtime::backend::ContainerBackend;
use alidock_runtime::dock::Dock;
use alidock_runtime::process::HandOff;
use alidock_runtime::ssh::SshProbe;
use clap::{Parser, ValueEnum};

use crate::output::Reporter;

/// alidock: a persistent, per-user development container.
#[derive(Parser, Debug)]
#[command(name = "alidock", version, about, long_about = None)]
pub struct Cli {
    /// Do not print any message.
    #[arg(long)]
    pub quiet: bool,

    /// Start or resume a detachable tmux session.
    #[arg(long, conflicts_with = "tmux_control")]
    pub tmux: bool,

    /// Start or resume a detachable tmux session in control mode (integration with your terminal).
    #[arg(long)]
    pub tmux_control: bool,

    /// Override default container name [dockName].
    #[arg(long = "name", value_name = "NAME")]
    pub dock_name: Option<String>,

    /// Override default image name [imageName].
    #[arg(long = "image", value_name = "IMAGE")]
    pub image_name: Option<String>,

    /// Override host path of persistent home [dirOutside].
    #[arg(long = "shared", value_name = "DIR")]
    pub dir_outside: Option<String>,

    /// Override update check period in seconds [updatePeriod].
    #[arg(long, value_name = "SECONDS")]
    pub update_period: Option<u64>,

    /// Do not update the Docker image [dontUpdateImage].
    #[arg(long = "no-update-image")]
    pub dont_update_image: bool,

    /// What to do.
    #[arg(value_enum, default_value_t = Action::Enter)]
    pub action: Action,

    /// Command to execute in the container (works with exec).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub shell_cmd: Vec<String>,
}

/// Actions on the managed container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Open a shell in the container, creating it if needed.
    Enter,
    /// Open a root shell through Docker, bypassing SSH.
    Root,
    /// Run a command in the container over SSH.
    Exec,
    /// Create the container if it is not running.
    Start,
    /// Report whether the container is running (exit status 0 or 1).
    Status,
    /// Destroy the container.
    Stop,
}

/// Terminal-multiplexer wrapping requested for `enter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TmuxMode {
    /// Plain shell.
    Off,
    /// Regular tmux session.
    Plain,
    /// tmux control mode (`-CC`).
    Control,
}

/// Everything the dispatcher needs to know about the invocation.
#[derive(Debug, Clone)]
pub struct Request {
    /// Requested action.
    pub action: Action,
    /// tmux wrapping for `enter`.
    pub tmux: TmuxMode,
    /// Whether alidock runs inside a tmux session already.
    pub in_tmux: bool,
    /// Remote command for `exec`.
    pub shell_cmd: Vec<String>,
}

/// How the process ends after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Exit successfully.
    Done,
    /// Exit with the given status.
    Exit(i32),
    /// Replace the process with another program.
    HandOff(HandOff),
}

impl Cli {
    /// Configuration keys set on the command line; unset flags stay `None`.
    pub fn overrides(&self) -> ConfigLayer {
        ConfigLayer {
            dock_name: self.dock_name.clone(),
            image_name: self.image_name.clone(),
            dir_outside: self.dir_outside.clone(),
            update_period: self.update_period,
            dont_update_image: self.dont_update_image.then_some(true),
        }
    }

    /// Dispatcher request for this invocation.
    pub fn request(&self, in_tmux: bool) -> Request {
        let tmux = if self.tmux_control {
            TmuxMode::Control
        } else if self.tmux {
            TmuxMode::Plain
        } else {
            TmuxMode::Off
        };
        Request {
            action: self.action,
            tmux,
            in_tmux,
            shell_cmd: self.shell_cmd.clone(),
        }
    }
}

/// Runs the requested action against the container.
///
/// # Errors
///
/// Returns an error if the action cannot be completed.
pub fn dispatch<B, P>(dock: &Dock<B, P>, request: &Request, out: &Reporter) -> anyhow::Result<Outcome>
where
    B: ContainerBackend,
    P: SshProbe,
{
    match request.action {
        Action::Enter | Action::Root | Action::Exec | Action::Start => {
            enter::execute(dock, request, out)
        }
        Action::Status => status::execute(dock, out),
        Action::Stop => stop::execute(dock, out),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::Path;
    use std::time::Duration;

    use alidock_common::config::{Config, ConfigLayer};
    use alidock_common::types::UserIdentity;
    use alidock_runtime::backend::fake::FakeBackend;
    use alidock_runtime::dock::Dock;
    use alidock_runtime::ssh::SshProbe;

    use super::{Action, Request, TmuxMode};

    pub const NOW: u64 = 1_700_000_000;
    pub const NAME: &str = "alidock-1000";
    pub const IMAGE: &str = "alisw/alidock:latest";

    /// SSH comes up at the first probe.
    pub struct Up;

    impl SshProbe for Up {
        fn probe(&self, _argv: &[String]) -> bool {
            true
        }
    }

    pub fn dock(shared: &Path, backend: FakeBackend) -> Dock<FakeBackend, Up> {
        let overrides = ConfigLayer {
            dir_outside: Some(shared.to_string_lossy().into_owned()),
            ..ConfigLayer::default()
        };
        let user = UserIdentity {
            uid: 1000,
            name: "tester".into(),
        };
        Dock::new(Config::resolve_from(None, &overrides, 1000), user, backend)
            .with_probe(Up)
            .with_poll_interval(Duration::ZERO)
            .with_clock(|| NOW)
    }

    pub fn request(action: Action) -> Request {
        Request {
            action,
            tmux: TmuxMode::Off,
            in_tmux: false,
            shell_cmd: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use alidock_runtime::backend::fake::FakeBackend;

    use super::testing::{NAME, dock, request};
    use super::*;

    #[test]
    fn parse_defaults_to_enter() {
        let cli = Cli::try_parse_from(["alidock"]).expect("parse");
        assert_eq!(cli.action, Action::Enter);
        assert_eq!(cli.overrides(), ConfigLayer::default());
    }

    #[test]
    fn parse_exec_keeps_trailing_arguments_verbatim() {
        let cli = Cli::try_parse_from(["alidock", "exec", "ls", "-l", "--color"]).expect("parse");
        assert_eq!(cli.action, Action::Exec);
        assert_eq!(cli.shell_cmd, vec!["ls", "-l", "--color"]);
    }

    #[test]
    fn parse_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "alidock",
            "--name",
            "box",
            "--image",
            "example/dev:2",
            "--shared",
            "/data/box",
            "--update-period",
            "60",
            "--no-update-image",
            "start",
        ])
        .expect("parse");
        let overrides = cli.overrides();
        assert_eq!(overrides.dock_name.as_deref(), Some("box"));
        assert_eq!(overrides.image_name.as_deref(), Some("example/dev:2"));
        assert_eq!(overrides.dir_outside.as_deref(), Some("/data/box"));
        assert_eq!(overrides.update_period, Some(60));
        assert_eq!(overrides.dont_update_image, Some(true));
    }

    #[test]
    fn parse_rejects_both_tmux_modes() {
        assert!(Cli::try_parse_from(["alidock", "--tmux", "--tmux-control"]).is_err());
    }

    #[test]
    fn parse_rejects_unknown_action() {
        assert!(Cli::try_parse_from(["alidock", "destroy"]).is_err());
    }

    #[test]
    fn request_picks_tmux_mode() {
        let cli = Cli::try_parse_from(["alidock", "--tmux-control"]).expect("parse");
        assert_eq!(cli.request(false).tmux, TmuxMode::Control);
        let cli = Cli::try_parse_from(["alidock", "--tmux"]).expect("parse");
        assert_eq!(cli.request(true).tmux, TmuxMode::Plain);
    }

    #[test]
    fn status_on_absent_container_exits_one_without_side_effects() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dock = dock(dir.path(), FakeBackend::new());
        let out = Reporter::capturing();
        let outcome = dispatch(&dock, &request(Action::Status), &out).expect("dispatch");
        assert_eq!(outcome, Outcome::Exit(1));
        assert!(dock.backend().created.borrow().is_empty());
        assert!(!dock.backend().has_container(NAME));
    }

    #[test]
    fn status_on_running_container_exits_zero() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dock = dock(dir.path(), FakeBackend::new().with_container(NAME, Some(2222)));
        let out = Reporter::capturing();
        let outcome = dispatch(&dock, &request(Action::Status), &out).expect("dispatch");
        assert_eq!(outcome, Outcome::Exit(0));
    }

    #[test]
    fn start_on_absent_container_runs_once_without_ssh() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dock = dock(dir.path(), FakeBackend::new());
        let out = Reporter::capturing();
        let outcome = dispatch(&dock, &request(Action::Start), &out).expect("dispatch");
        assert_eq!(outcome, Outcome::Done);
        assert_eq!(dock.backend().created.borrow().len(), 1);
        assert_eq!(dock.ssh_attempts(), 0);
    }

    #[test]
    fn stop_twice_is_fine() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dock = dock(dir.path(), FakeBackend::new().with_container(NAME, Some(2222)));
        let out = Reporter::capturing();
        for _ in 0..2 {
            let outcome = dispatch(&dock, &request(Action::Stop), &out).expect("dispatch");
            assert_eq!(outcome, Outcome::Done);
        }
        assert!(!dock.backend().has_container(NAME));
    }
}
