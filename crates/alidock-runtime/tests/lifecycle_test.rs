//! End-to-end tests of the container lifecycle against an in-memory runtime.
//!
//! These tests drive the public API the way the CLI does:
//! 1. Resolve the configuration from a YAML file and overrides
//! 2. Create the container and prepare the shared directory
//! 3. Wait for SSH and build the session command
//! 4. Destroy the container, repeatedly

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::time::Duration;

use alidock_common::config::{Config, ConfigLayer};
use alidock_common::error::AlidockError;
use alidock_common::types::{ContainerState, UserIdentity};
use alidock_runtime::backend::fake::{FAKE_SSH_PORT, FakeBackend};
use alidock_runtime::dock::Dock;
use alidock_runtime::ssh::SshProbe;

const IMAGE: &str = "alisw/alidock:latest";

struct SecondTry(Cell<u32>);

impl SshProbe for SecondTry {
    fn probe(&self, _argv: &[String]) -> bool {
        self.0.set(self.0.get() + 1);
        self.0.get() >= 2
    }
}

fn user() -> UserIdentity {
    UserIdentity {
        uid: 4242,
        name: "dev".into(),
    }
}

fn config_from_file(dir: &Path, shared: &Path) -> Config {
    let file = dir.join(".alidock-config.yaml");
    fs::write(
        &file,
        format!(
            "dockName: workbench\ndirOutside: {}\nupdatePeriod: 60\n",
            shared.display()
        ),
    )
    .expect("write config");
    Config::resolve_from(Some(&file), &ConfigLayer::default(), 4242)
}

// ── Lifecycle ────────────────────────────────────────────────────────

#[test]
fn lifecycle_absent_run_running_stop_absent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let shared = dir.path().join("home");
    let config = config_from_file(dir.path(), &shared);
    assert_eq!(config.dock_name.as_str(), "workbench-4242");

    let dock = Dock::new(config, user(), FakeBackend::new())
        .with_probe(SecondTry(Cell::new(0)))
        .with_poll_interval(Duration::ZERO);

    assert_eq!(dock.state().expect("state"), ContainerState::Absent);

    let id = dock.run().expect("run");
    assert_eq!(id, "id-workbench-4242");
    assert_eq!(dock.state().expect("state"), ContainerState::Running);
    assert!(shared.join(".alidock-init.sh").is_file());

    assert!(dock.wait_ssh_up().expect("wait"));
    assert_eq!(dock.ssh_attempts(), 2);

    let session = dock.shell(&[]).expect("shell");
    assert_eq!(session.program, "ssh");
    assert!(session.args.contains(&FAKE_SSH_PORT.to_string()));

    dock.stop().expect("stop");
    assert_eq!(dock.state().expect("state"), ContainerState::Absent);
    dock.stop().expect("stop again");
    assert!(matches!(
        dock.ssh_port().unwrap_err(),
        AlidockError::ContainerUnavailable { .. }
    ));
}

#[test]
fn lifecycle_recreate_after_stop() {
    let dir = tempfile::tempdir().expect("tempdir");
    let shared = dir.path().join("home");
    let dock = Dock::new(config_from_file(dir.path(), &shared), user(), FakeBackend::new());

    let _ = dock.run().expect("first run");
    assert!(dock.run().is_err(), "name is taken while running");
    dock.stop().expect("stop");
    let _ = dock.run().expect("second run");
    assert_eq!(dock.backend().created.borrow().len(), 2);
    assert_eq!(dock.backend().removals.get(), 1);
}

// ── Update checks ────────────────────────────────────────────────────

#[test]
fn image_check_on_fresh_host_persists_timestamp() {
    let dir = tempfile::tempdir().expect("tempdir");
    let shared = dir.path().join("home");
    let backend = FakeBackend::new()
        .with_local_image(IMAGE, &["alisw/alidock@sha256:AAA"])
        .with_registry_digest(IMAGE, "sha256:AAA");
    let dock = Dock::new(config_from_file(dir.path(), &shared), user(), backend)
        .with_clock(|| 1_000_000);

    let _ = dock.prepare_shared_dir().expect("prepare");
    assert!(!dock.has_image_updates().expect("check"));
    assert_eq!(
        dock.update_checker().last_check(".alidock_docker_check"),
        1_000_000
    );
    assert_eq!(dock.backend().registry_queries.get(), 1);
}

#[test]
fn image_check_without_local_image_reports_no_update() {
    let dir = tempfile::tempdir().expect("tempdir");
    let shared = dir.path().join("home");
    let dock = Dock::new(config_from_file(dir.path(), &shared), user(), FakeBackend::new())
        .with_clock(|| 1_000_000);
    let _ = dock.prepare_shared_dir().expect("prepare");
    assert!(!dock.has_image_updates().expect("check"));
    assert_eq!(dock.backend().registry_queries.get(), 0);
}
