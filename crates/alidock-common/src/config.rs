//! Configuration model and resolution.
//!
//! The effective configuration is layered: built-in defaults, then the
//! per-user YAML file, then caller overrides (usually command-line flags).
//! A layer only wins for the keys it actually sets.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::constants;
use crate::error::{AlidockError, Result};
use crate::types::DockName;

/// Effective configuration after all layers have been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Per-user container name (`<base>-<uid>`).
    pub dock_name: DockName,
    /// Image reference the container is created from.
    pub image_name: String,
    /// Host directory shared with the container, as configured (may start with `~`).
    pub dir_outside: String,
    /// Minimum interval between two update checks, in seconds.
    pub update_period: u64,
    /// Disables the automatic image update before container creation.
    pub dont_update_image: bool,
}

/// One configuration layer: every key is optional.
///
/// Used both for the on-disk file and for caller overrides. Unknown keys in
/// the file are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigLayer {
    /// Base container name, before the uid suffix.
    pub dock_name: Option<String>,
    /// Image reference.
    pub image_name: Option<String>,
    /// Host directory shared with the container.
    pub dir_outside: Option<String>,
    /// Update check period in seconds.
    pub update_period: Option<u64>,
    /// Whether to skip image updates.
    pub dont_update_image: Option<bool>,
}

/// Unsuffixed values being layered, before the name gets its uid.
#[derive(Debug, Clone)]
struct Values {
    dock_name: String,
    image_name: String,
    dir_outside: String,
    update_period: u64,
    dont_update_image: bool,
}

impl Default for Values {
    fn default() -> Self {
        Self {
            dock_name: constants::DEFAULT_DOCK_NAME.to_owned(),
            image_name: constants::DEFAULT_IMAGE_NAME.to_owned(),
            dir_outside: constants::DEFAULT_DIR_OUTSIDE.to_owned(),
            update_period: constants::DEFAULT_UPDATE_PERIOD,
            dont_update_image: false,
        }
    }
}

impl Values {
    fn apply(&mut self, layer: &ConfigLayer) {
        if let Some(v) = &layer.dock_name {
            self.dock_name.clone_from(v);
        }
        if let Some(v) = &layer.image_name {
            self.image_name.clone_from(v);
        }
        if let Some(v) = &layer.dir_outside {
            self.dir_outside.clone_from(v);
        }
        if let Some(v) = layer.update_period {
            self.update_period = v;
        }
        if let Some(v) = layer.dont_update_image {
            self.dont_update_image = v;
        }
    }

    fn finish(self, uid: u32) -> Config {
        Config {
            dock_name: DockName::for_user(&self.dock_name, uid),
            image_name: self.image_name,
            dir_outside: self.dir_outside,
            update_period: self.update_period,
            dont_update_image: self.dont_update_image,
        }
    }
}

impl Config {
    /// Built-in defaults for the given user.
    #[must_use]
    pub fn defaults_for(uid: u32) -> Self {
        Values::default().finish(uid)
    }

    /// Resolves the configuration from the default per-user file and `overrides`.
    ///
    /// Never fails: a missing or malformed file is silently ignored.
    #[must_use]
    pub fn resolve(overrides: &ConfigLayer, uid: u32) -> Self {
        Self::resolve_from(
            constants::default_config_file().as_deref(),
            overrides,
            uid,
        )
    }

    /// Resolves the configuration from an explicit file path and `overrides`.
    #[must_use]
    pub fn resolve_from(file: Option<&Path>, overrides: &ConfigLayer, uid: u32) -> Self {
        let mut values = Values::default();
        if let Some(path) = file {
            match load_layer(path) {
                Ok(layer) => values.apply(&layer),
                Err(e) => tracing::debug!(path = %path.display(), error = %e, "ignoring configuration file"),
            }
        }
        values.apply(overrides);
        values.finish(uid)
    }

    /// Host path of the shared directory with `~` expanded.
    #[must_use]
    pub fn shared_dir(&self) -> PathBuf {
        constants::expand_home(&self.dir_outside)
    }

    /// Container log path as the user configured it, for error messages.
    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        Path::new(&self.dir_outside).join(constants::LOG_RELATIVE)
    }
}

/// Reads one configuration layer from a YAML file.
///
/// Keys are read one by one: a key holding a value of the wrong type is
/// skipped and the remaining keys still apply.
///
/// # Errors
///
/// Returns [`AlidockError::Config`] if the file cannot be read, is not valid
/// YAML, or is not a mapping.
pub fn load_layer(path: &Path) -> Result<ConfigLayer> {
    let content = std::fs::read_to_string(path).map_err(|e| AlidockError::Config {
        message: format!("cannot read {}: {e}", path.display()),
    })?;
    let value: Value = serde_yaml::from_str(&content).map_err(|e| AlidockError::Config {
        message: format!("cannot parse {}: {e}", path.display()),
    })?;
    let Value::Mapping(map) = value else {
        return Err(AlidockError::Config {
            message: format!("{} is not a mapping", path.display()),
        });
    };
    Ok(ConfigLayer {
        dock_name: key(&map, "dockName", path),
        image_name: key(&map, "imageName", path),
        dir_outside: key(&map, "dirOutside", path),
        update_period: key(&map, "updatePeriod", path),
        dont_update_image: key(&map, "dontUpdateImage", path),
    })
}

fn key<T: DeserializeOwned>(map: &Mapping, name: &str, path: &Path) -> Option<T> {
    let value = map.get(name)?;
    match serde_yaml::from_value::<Option<T>>(value.clone()) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(path = %path.display(), key = name, error = %e, "ignoring configuration key");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().expect("tempfile");
        std::fs::write(file.path(), content).expect("write config");
        file
    }

    #[test]
    fn no_file_no_override_yields_defaults() {
        let config = Config::resolve_from(None, &ConfigLayer::default(), 1000);
        assert_eq!(config, Config::defaults_for(1000));
        assert_eq!(config.dock_name.as_str(), "alidock-1000");
        assert_eq!(config.image_name, "alisw/alidock:latest");
        assert_eq!(config.dir_outside, "~/alidock");
        assert_eq!(config.update_period, 43_200);
        assert!(!config.dont_update_image);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.yaml");
        let config = Config::resolve_from(Some(&path), &ConfigLayer::default(), 42);
        assert_eq!(config, Config::defaults_for(42));
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let file = write_config("updatePeriod: [not, a, number\n");
        let config = Config::resolve_from(Some(file.path()), &ConfigLayer::default(), 7);
        assert_eq!(config, Config::defaults_for(7));
    }

    #[test]
    fn non_mapping_file_falls_back_to_defaults() {
        let file = write_config("- just\n- a list\n");
        let config = Config::resolve_from(Some(file.path()), &ConfigLayer::default(), 7);
        assert_eq!(config, Config::defaults_for(7));
    }

    #[test]
    fn file_values_replace_defaults_and_unknown_keys_are_ignored() {
        let file = write_config(
            "dockName: box\nimageName: example/dev:1\nupdatePeriod: 60\nfavouriteColour: green\n",
        );
        let config = Config::resolve_from(Some(file.path()), &ConfigLayer::default(), 1000);
        assert_eq!(config.dock_name.as_str(), "box-1000");
        assert_eq!(config.image_name, "example/dev:1");
        assert_eq!(config.update_period, 60);
        assert_eq!(config.dir_outside, "~/alidock");
    }

    #[test]
    fn wrongly_typed_key_is_skipped_alone() {
        let file = write_config("updatePeriod: \"60\"\ndockName: box\ndontUpdateImage: yes please\n");
        let config = Config::resolve_from(Some(file.path()), &ConfigLayer::default(), 1000);
        assert_eq!(config.update_period, 43_200);
        assert_eq!(config.dock_name.as_str(), "box-1000");
        assert!(!config.dont_update_image);
    }

    #[test]
    fn load_layer_rejects_non_mapping() {
        let file = write_config("42\n");
        let err = load_layer(file.path()).unwrap_err();
        assert!(matches!(err, AlidockError::Config { .. }));
    }

    #[test]
    fn null_file_value_keeps_default() {
        let file = write_config("imageName: null\ndontUpdateImage: true\n");
        let config = Config::resolve_from(Some(file.path()), &ConfigLayer::default(), 1);
        assert_eq!(config.image_name, "alisw/alidock:latest");
        assert!(config.dont_update_image);
    }

    #[test]
    fn present_override_wins_over_file_and_default() {
        let file = write_config("imageName: from/file:1\ndirOutside: /data/file\n");
        let overrides = ConfigLayer {
            image_name: Some("from/flag:2".into()),
            update_period: Some(5),
            ..ConfigLayer::default()
        };
        let config = Config::resolve_from(Some(file.path()), &overrides, 1000);
        assert_eq!(config.image_name, "from/flag:2");
        assert_eq!(config.update_period, 5);
        assert_eq!(config.dir_outside, "/data/file");
    }

    #[test]
    fn absent_override_never_wins() {
        let file = write_config("dontUpdateImage: true\n");
        let config = Config::resolve_from(Some(file.path()), &ConfigLayer::default(), 1000);
        assert!(config.dont_update_image);
    }

    #[test]
    fn uid_suffix_is_applied_after_overrides() {
        let overrides = ConfigLayer {
            dock_name: Some("work".into()),
            ..ConfigLayer::default()
        };
        let config = Config::resolve_from(None, &overrides, 501);
        assert_eq!(config.dock_name.as_str(), "work-501");
        assert_eq!(config.dock_name.base(), "work");
    }

    #[test]
    fn log_file_keeps_configured_spelling() {
        let config = Config::defaults_for(1);
        assert_eq!(config.log_file(), PathBuf::from("~/alidock/.alidock.log"));
    }

    #[test]
    fn load_layer_reports_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_layer(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, AlidockError::Config { .. }));
    }
}
