//! Lifecycle controller for the managed container.
//!
//! State lives in the runtime, not here: every question is answered by
//! asking the backend again. The container is either absent or present;
//! stopping always removes it.

use std::cell::Cell;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use alidock_common::config::Config;
use alidock_common::constants;
use alidock_common::error::{AlidockError, Result};
use alidock_common::types::{ContainerState, UserIdentity};

use crate::backend::{BindMount, ContainerBackend, ContainerInfo, ContainerSpec};
use crate::init::{self, InitParams};
use crate::process::HandOff;
use crate::ssh::{self, ProcessProbe, SshProbe};
use crate::update::{UpdateChecker, unix_now};

/// The managed container, driven through a runtime backend.
pub struct Dock<B, P = ProcessProbe> {
    config: Config,
    user: UserIdentity,
    backend: B,
    probe: P,
    poll_interval: Duration,
    clock: fn() -> u64,
    ssh_attempts: Cell<u32>,
}

impl<B: ContainerBackend> Dock<B> {
    /// Controller for `user`'s container as described by `config`.
    pub fn new(config: Config, user: UserIdentity, backend: B) -> Self {
        Self {
            config,
            user,
            backend,
            probe: ProcessProbe,
            poll_interval: Duration::from_millis(constants::SSH_POLL_INTERVAL_MS),
            clock: unix_now,
            ssh_attempts: Cell::new(0),
        }
    }
}

impl<B: ContainerBackend, P: SshProbe> Dock<B, P> {
    /// Replaces the SSH readiness probe.
    pub fn with_probe<Q: SshProbe>(self, probe: Q) -> Dock<B, Q> {
        Dock {
            config: self.config,
            user: self.user,
            backend: self.backend,
            probe,
            poll_interval: self.poll_interval,
            clock: self.clock,
            ssh_attempts: self.ssh_attempts,
        }
    }

    /// Replaces the delay between SSH readiness probes.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Replaces the clock used by update checks.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    /// Effective configuration.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Underlying runtime backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of SSH readiness probes run so far.
    pub fn ssh_attempts(&self) -> u32 {
        self.ssh_attempts.get()
    }

    /// Whether the container exists in the runtime, whatever its run state.
    ///
    /// # Errors
    ///
    /// Propagates every backend error except "not found".
    pub fn is_running(&self) -> Result<bool> {
        Ok(self.container()?.is_some())
    }

    /// What the runtime reports about the container, `None` when absent.
    ///
    /// # Errors
    ///
    /// Propagates every backend error except "not found".
    pub fn container(&self) -> Result<Option<ContainerInfo>> {
        match self.backend.inspect(self.config.dock_name.as_str()) {
            Ok(info) => Ok(Some(info)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Observed container state.
    ///
    /// # Errors
    ///
    /// See [`Dock::is_running`].
    pub fn state(&self) -> Result<ContainerState> {
        Ok(if self.is_running()? {
            ContainerState::Running
        } else {
            ContainerState::Absent
        })
    }

    /// Host port published for the container's SSH daemon.
    ///
    /// # Errors
    ///
    /// Returns `ContainerUnavailable` if the container is absent or has no
    /// SSH port mapping; other backend errors propagate.
    pub fn ssh_port(&self) -> Result<u16> {
        let name = self.config.dock_name.as_str();
        let info = match self.backend.inspect(name) {
            Ok(info) => info,
            Err(e) if e.is_not_found() => return Err(self.unavailable(e.to_string())),
            Err(e) => return Err(e),
        };
        info.host_port(constants::SSH_CONTAINER_PORT).ok_or_else(|| {
            self.unavailable(format!("no host port bound to {}", constants::SSH_CONTAINER_PORT))
        })
    }

    fn unavailable(&self, reason: String) -> AlidockError {
        AlidockError::ContainerUnavailable {
            log_file: self.config.log_file(),
            reason,
        }
    }

    /// ssh argv logging into the container.
    ///
    /// # Errors
    ///
    /// See [`Dock::ssh_port`].
    pub fn ssh_command(&self) -> Result<Vec<String>> {
        let port = self.ssh_port()?;
        let key = self.config.shared_dir().join(constants::SSH_KEY_RELATIVE);
        Ok(ssh::ssh_command(port, &key))
    }

    /// Polls until a trivial remote command succeeds over SSH.
    ///
    /// Gives up after a fixed number of attempts at a fixed cadence.
    ///
    /// # Errors
    ///
    /// Returns an error if the SSH command cannot be built.
    pub fn wait_ssh_up(&self) -> Result<bool> {
        let mut argv = self.ssh_command()?;
        argv.extend(["-T".to_owned(), "/bin/true".to_owned()]);
        for attempt in 1..=constants::SSH_POLL_ATTEMPTS {
            self.ssh_attempts.set(self.ssh_attempts.get() + 1);
            if self.probe.probe(&argv) {
                tracing::debug!(attempt, "ssh is up");
                return Ok(true);
            }
            if attempt < constants::SSH_POLL_ATTEMPTS {
                std::thread::sleep(self.poll_interval);
            }
        }
        tracing::debug!(attempts = constants::SSH_POLL_ATTEMPTS, "ssh did not come up");
        Ok(false)
    }

    /// Interactive ssh session, running `extra` remotely when given.
    ///
    /// # Errors
    ///
    /// See [`Dock::ssh_port`].
    pub fn shell(&self, extra: &[String]) -> Result<HandOff> {
        let mut argv = self.ssh_command()?;
        argv.extend(extra.iter().cloned());
        HandOff::from_argv(argv).ok_or_else(|| AlidockError::domain("empty ssh command"))
    }

    /// Root shell through the runtime, bypassing SSH.
    pub fn root_shell(&self) -> HandOff {
        HandOff {
            program: "docker".to_owned(),
            args: vec![
                "exec".to_owned(),
                "-it".to_owned(),
                self.config.dock_name.to_string(),
                "/bin/bash".to_owned(),
            ],
        }
    }

    /// Creates the shared directory if needed and returns its canonical path.
    ///
    /// The parent must exist; an existing directory is accepted as is.
    ///
    /// # Errors
    ///
    /// Returns a domain error if the directory cannot be created, or an I/O
    /// error if it cannot be resolved.
    pub fn prepare_shared_dir(&self) -> Result<PathBuf> {
        let shared = self.config.shared_dir();
        match fs::create_dir(&shared) {
            Ok(()) => tracing::info!(dir = %shared.display(), "shared directory created"),
            Err(e) if e.kind() == ErrorKind::AlreadyExists && shared.is_dir() => {}
            Err(e) => {
                return Err(AlidockError::domain(format!(
                    "cannot create directory {} to share with container, check permissions: {e}",
                    self.config.dir_outside
                )));
            }
        }
        fs::canonicalize(&shared).map_err(|e| AlidockError::Io {
            path: shared.clone(),
            source: e,
        })
    }

    /// Creates and starts the container, returning its runtime identifier.
    ///
    /// Prepares the shared directory and writes the init script into it
    /// first.
    ///
    /// # Errors
    ///
    /// See [`Dock::prepare_shared_dir`]; also returns an I/O error if the
    /// init script cannot be written, and backend errors from container
    /// creation.
    pub fn run(&self) -> Result<String> {
        let shared = self.prepare_shared_dir()?;
        let _ = init::write_script(
            &shared,
            &InitParams {
                dock_name: &self.config.dock_name,
                shared_dir: constants::DIR_INSIDE,
                log_relative: constants::LOG_RELATIVE,
                user: &self.user,
            },
        )?;

        let spec = ContainerSpec {
            name: self.config.dock_name.to_string(),
            image: self.config.image_name.clone(),
            entrypoint: vec![format!(
                "{}/{}",
                constants::DIR_INSIDE,
                constants::INIT_SCRIPT_RELATIVE
            )],
            auto_remove: true,
            cap_add: vec![constants::CONTAINER_CAPABILITY.to_owned()],
            mounts: vec![BindMount {
                source: shared,
                target: constants::DIR_INSIDE.to_owned(),
            }],
            published_ports: vec![constants::SSH_CONTAINER_PORT.to_owned()],
        };
        self.backend.create(&spec)
    }

    /// Removes the container; an absent container is already stopped.
    ///
    /// # Errors
    ///
    /// Propagates every backend error except "not found".
    pub fn stop(&self) -> Result<()> {
        match self.backend.remove(self.config.dock_name.as_str(), true) {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::debug!(name = %self.config.dock_name, "container already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Pulls the configured image.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the pull fails.
    pub fn pull(&self) -> Result<()> {
        self.backend.pull(&self.config.image_name)
    }

    /// Update checker storing its state in the shared directory.
    pub fn update_checker(&self) -> UpdateChecker {
        UpdateChecker::new(self.config.shared_dir(), self.config.update_period)
            .with_clock(self.clock)
    }

    /// Debounced check for a newer image in the registry.
    ///
    /// Always false when image updates are disabled; the registry is not
    /// contacted then.
    ///
    /// # Errors
    ///
    /// Returns `UpdateCheck` if the digests cannot be compared.
    pub fn has_image_updates(&self) -> Result<bool> {
        if self.config.dont_update_image {
            return Ok(false);
        }
        self.update_checker()
            .has_updates(constants::IMAGE_CHECK_STATE, false, || {
                self.image_digest_differs()
            })
    }

    fn image_digest_differs(&self) -> Result<bool> {
        let image = &self.config.image_name;
        let repo_digests = match self.backend.image_repo_digests(image) {
            Ok(digests) => digests,
            // Nothing cached: creating the container pulls the latest anyway.
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(AlidockError::update_check(e)),
        };
        let local = repo_digests
            .first()
            .and_then(|d| d.split_once('@'))
            .map(|(_, digest)| digest.to_owned())
            .ok_or_else(|| {
                AlidockError::update_check(format!("image {image} has no repository digest"))
            })?;
        let remote = self
            .backend
            .registry_digest(image)
            .map_err(AlidockError::update_check)?;
        tracing::debug!(%local, %remote, "image digests compared");
        Ok(remote != local)
    }
}
