//! Obsolete-client reminder shown before every action.

use alidock_common::constants;
use alidock_runtime::update::{ClientVersionCheck, UpdateChecker};

use crate::output::Reporter;

/// Warns when a newer alidock is published on `index_url`.
///
/// Failures never stop the requested action; they are only reported.
/// Returns whether an update is pending.
pub fn check_client(checker: &UpdateChecker, index_url: &str, out: &Reporter) -> bool {
    let pending = ClientVersionCheck::with_index_url(
        constants::APP_NAME,
        env!("CARGO_PKG_VERSION"),
        index_url,
    )
    .and_then(|client| checker.has_client_updates(&client));
    match pending {
        Ok(true) => {
            out.error("You are using an obsolete version of alidock.");
            out.error("Upgrade NOW with:");
            out.error(format!("    cargo install {} --force", constants::APP_NAME));
            true
        }
        Ok(false) => false,
        Err(e) => {
            tracing::debug!(error = %e, "client update check failed");
            out.warning("Cannot check for alidock updates this time");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Level;

    fn checker(dir: &std::path::Path) -> UpdateChecker {
        UpdateChecker::new(dir.to_path_buf(), 43_200).with_clock(|| 1_700_000_000)
    }

    #[test]
    fn obsolete_client_prints_upgrade_instructions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/crates/alidock")
            .with_status(200)
            .with_body(r#"{"crate": {"max_version": "99.0.0", "max_stable_version": "99.0.0"}}"#)
            .create();
        let out = Reporter::capturing();
        assert!(check_client(&checker(dir.path()), &server.url(), &out));
        assert_eq!(
            out.messages(),
            vec![
                (Level::Error, "You are using an obsolete version of alidock.".to_owned()),
                (Level::Error, "Upgrade NOW with:".to_owned()),
                (Level::Error, "    cargo install alidock --force".to_owned()),
            ]
        );
    }

    #[test]
    fn current_client_is_silent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut server = mockito::Server::new();
        let body = format!(
            r#"{{"crate": {{"max_version": "{v}", "max_stable_version": "{v}"}}}}"#,
            v = env!("CARGO_PKG_VERSION")
        );
        let _mock = server
            .mock("GET", "/crates/alidock")
            .with_status(200)
            .with_body(body)
            .create();
        let out = Reporter::capturing();
        assert!(!check_client(&checker(dir.path()), &server.url(), &out));
        assert!(out.messages().is_empty());
    }

    #[test]
    fn unreachable_index_only_warns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/crates/alidock").with_status(500).create();
        let out = Reporter::capturing();
        assert!(!check_client(&checker(dir.path()), &server.url(), &out));
        assert_eq!(
            out.messages(),
            vec![(Level::Warning, "Cannot check for alidock updates this time".to_owned())]
        );
    }

    #[test]
    fn recent_check_skips_the_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(constants::CLIENT_CHECK_STATE),
            "1699999000",
        )
        .expect("seed");
        let out = Reporter::capturing();
        assert!(!check_client(&checker(dir.path()), "http://127.0.0.1:9", &out));
        assert!(out.messages().is_empty());
    }
}
