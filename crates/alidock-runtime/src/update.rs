//! Debounced update checks.
//!
//! A check only runs when more than `period` seconds have passed since the
//! timestamp stored in its state file. With `nag_on_update` the timestamp is
//! never rewritten, so the check (and the reminder that follows) repeats on
//! every invocation until the user acts.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alidock_common::constants;
use alidock_common::error::{AlidockError, Result};
use reqwest::blocking::Client;
use semver::Version;
use serde::Deserialize;

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// Debounce policy shared by every kind of update check.
#[derive(Debug, Clone)]
pub struct UpdateChecker {
    state_dir: PathBuf,
    period: u64,
    clock: fn() -> u64,
}

impl UpdateChecker {
    /// Checker storing its timestamps in `state_dir`, checking at most every `period` seconds.
    #[must_use]
    pub fn new(state_dir: PathBuf, period: u64) -> Self {
        Self {
            state_dir,
            period,
            clock: unix_now,
        }
    }

    /// Replaces the wall clock.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    /// Timestamp of the last check recorded in `state_file`; 0 if unknown.
    #[must_use]
    pub fn last_check(&self, state_file: &str) -> u64 {
        read_timestamp(&self.state_dir.join(state_file))
    }

    /// Runs `check` unless the last one happened less than `period` seconds ago.
    ///
    /// Returns `false` without calling `check` inside the debounce window.
    /// Otherwise the current time is persisted unless `nag_on_update` is set,
    /// whatever the outcome of `check`, and only then is a `check` failure
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns the error of `check`, or an I/O error if the timestamp cannot
    /// be written.
    pub fn has_updates<F>(&self, state_file: &str, nag_on_update: bool, check: F) -> Result<bool>
    where
        F: FnOnce() -> Result<bool>,
    {
        let path = self.state_dir.join(state_file);
        let last = read_timestamp(&path);
        let now = (self.clock)();
        if now.saturating_sub(last) <= self.period {
            tracing::debug!(state_file, last, now, "update check skipped");
            return Ok(false);
        }

        let outcome = check();
        if !nag_on_update {
            std::fs::write(&path, now.to_string()).map_err(|e| AlidockError::Io {
                path: path.clone(),
                source: e,
            })?;
        }
        tracing::debug!(state_file, now, ?outcome, "update check performed");
        outcome
    }

    /// Debounced client version check.
    ///
    /// The timestamp is never persisted, so a pending update is reported on
    /// every run. Development builds are never checked.
    ///
    /// # Errors
    ///
    /// Returns `UpdateCheck` if the package index cannot be queried.
    pub fn has_client_updates(&self, client: &ClientVersionCheck) -> Result<bool> {
        if client.is_development_build() {
            tracing::debug!(version = %client.current, "development build, no client check");
            return Ok(false);
        }
        self.has_updates(constants::CLIENT_CHECK_STATE, true, || {
            client.has_update()
        })
    }
}

fn read_timestamp(path: &Path) -> u64 {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

/// Compares the running client with the latest version on crates.io.
#[derive(Debug)]
pub struct ClientVersionCheck {
    client: Client,
    index_url: String,
    package: String,
    current: Version,
}

#[derive(Debug, Deserialize)]
struct IndexResponse {
    #[serde(rename = "crate")]
    krate: IndexCrate,
}

#[derive(Debug, Deserialize)]
struct IndexCrate {
    max_version: String,
    #[serde(default)]
    max_stable_version: Option<String>,
}

impl ClientVersionCheck {
    /// Checker for `package` at `current_version`, against crates.io.
    ///
    /// # Errors
    ///
    /// Returns `UpdateCheck` if the version is not semver or the HTTP client
    /// cannot be built.
    pub fn new(package: &str, current_version: &str) -> Result<Self> {
        Self::with_index_url(package, current_version, constants::PACKAGE_INDEX_URL)
    }

    /// Same as [`ClientVersionCheck::new`] against another index.
    ///
    /// # Errors
    ///
    /// See [`ClientVersionCheck::new`].
    pub fn with_index_url(package: &str, current_version: &str, index_url: &str) -> Result<Self> {
        let current = Version::parse(current_version).map_err(AlidockError::update_check)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(constants::PACKAGE_INDEX_TIMEOUT_SECS))
            .user_agent(format!("{package}/{current_version}"))
            .build()
            .map_err(AlidockError::update_check)?;
        Ok(Self {
            client,
            index_url: index_url.trim_end_matches('/').to_owned(),
            package: package.to_owned(),
            current,
        })
    }

    /// Pre-release builds (e.g. `0.2.0-dev`) are not published releases.
    #[must_use]
    pub fn is_development_build(&self) -> bool {
        !self.current.pre.is_empty()
    }

    /// Latest version published on the index.
    ///
    /// # Errors
    ///
    /// Returns `UpdateCheck` on network, HTTP status or parse failures.
    pub fn latest_version(&self) -> Result<Version> {
        let url = format!("{}/crates/{}", self.index_url, self.package);
        let body = self
            .client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::text)
            .map_err(AlidockError::update_check)?;
        let response: IndexResponse =
            serde_json::from_str(&body).map_err(AlidockError::update_check)?;
        let latest = response
            .krate
            .max_stable_version
            .unwrap_or(response.krate.max_version);
        Version::parse(&latest).map_err(AlidockError::update_check)
    }

    /// Whether the index has a version newer than the running one.
    ///
    /// # Errors
    ///
    /// See [`ClientVersionCheck::latest_version`].
    pub fn has_update(&self) -> Result<bool> {
        let latest = self.latest_version()?;
        tracing::debug!(current = %self.current, %latest, "client version compared");
        Ok(latest > self.current)
    }
}
