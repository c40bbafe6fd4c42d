//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/ranktree/ranktree.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `RANKTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::allocator::{IntervalAllocator, Verification};
use crate::application::ApplicationError;

/// When cached full names are recomposed after an invalidation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullNameRefresh {
    /// Recompose inside the mutating call
    Eager,
    /// Mark stale, recompose on next read or explicit refresh
    #[default]
    Lazy,
}

/// Engine settings shared by every family.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Verify the whole family after each mutation (otherwise only touched nodes)
    pub verify_after_mutation: bool,
    /// Eager or lazy full-name recomposition
    pub full_name_refresh: FullNameRefresh,
    /// Node number given to a family root
    pub first_node_number: u32,
    /// Directory relative snapshot paths are resolved against
    pub snapshot_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            verify_after_mutation: true,
            full_name_refresh: FullNameRefresh::Lazy,
            first_node_number: 1,
            snapshot_dir: PathBuf::from("."),
        }
    }
}

/// Raw settings for intermediate parsing (None means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub verify_after_mutation: Option<bool>,
    pub full_name_refresh: Option<FullNameRefresh>,
    pub first_node_number: Option<u32>,
    pub snapshot_dir: Option<PathBuf>,
}

/// Get the XDG config directory for ranktree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ranktree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("ranktree.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Allocator configured from these settings.
    pub fn allocator(&self) -> IntervalAllocator {
        let verification = if self.verify_after_mutation {
            Verification::Full
        } else {
            Verification::Touched
        };
        IntervalAllocator::new(self.first_node_number, verification)
    }

    /// Resolve a snapshot path: absolute paths pass through, relative ones
    /// are joined onto `snapshot_dir`.
    pub fn resolve_snapshot(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.snapshot_dir.join(path)
        }
    }

    /// Expand `~`, `$VAR` and `${VAR}` in path-like fields.
    fn expand_paths(&mut self) {
        let raw = self.snapshot_dir.to_string_lossy().to_string();
        let expanded = shellexpand::full(&raw)
            .map(|s| s.into_owned())
            .unwrap_or(raw);
        self.snapshot_dir = PathBuf::from(expanded);
    }

    /// Overlay wins wherever it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            verify_after_mutation: overlay
                .verify_after_mutation
                .unwrap_or(self.verify_after_mutation),
            full_name_refresh: overlay.full_name_refresh.unwrap_or(self.full_name_refresh),
            first_node_number: overlay.first_node_number.unwrap_or(self.first_node_number),
            snapshot_dir: overlay
                .snapshot_dir
                .clone()
                .unwrap_or_else(|| self.snapshot_dir.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file, applied after the global one
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(path) = config_file {
            let raw = load_raw_settings(path)?;
            current = current.merge_with(&raw);
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        current.validate()?;

        Ok(current)
    }

    /// Apply RANKTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("RANKTREE").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_bool("verify_after_mutation") {
            settings.verify_after_mutation = val;
        }
        if let Ok(val) = config.get::<FullNameRefresh>("full_name_refresh") {
            settings.full_name_refresh = val;
        }
        if let Ok(val) = config.get::<u32>("first_node_number") {
            settings.first_node_number = val;
        }
        if let Ok(val) = config.get_string("snapshot_dir") {
            settings.snapshot_dir = PathBuf::from(val);
        }

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.first_node_number == 0 {
            return Err(ApplicationError::Config {
                message: "first_node_number must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# ranktree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/ranktree/ranktree.toml
#   File:   --config <path>
#   Env:    RANKTREE_* environment variables

# Check every node after each insert/move/delete (false: only renumbered nodes)
# verify_after_mutation = true

# "lazy": mark cached full names stale, recompose on read
# "eager": recompose inside the mutating call
# full_name_refresh = "lazy"

# Node number of each family root
# first_node_number = 1

# Relative snapshot paths are resolved against this directory
# snapshot_dir = "."
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_created_then_full_verification_and_lazy_names() {
        let settings = Settings::default();
        assert!(settings.verify_after_mutation);
        assert_eq!(settings.full_name_refresh, FullNameRefresh::Lazy);
        assert_eq!(settings.allocator().first_number(), 1);
    }

    #[test]
    fn given_overlay_when_merging_then_specified_fields_win() {
        let base = Settings::default();
        let overlay = RawSettings {
            full_name_refresh: Some(FullNameRefresh::Eager),
            first_node_number: Some(100),
            ..Default::default()
        };

        let merged = base.merge_with(&overlay);

        assert_eq!(merged.full_name_refresh, FullNameRefresh::Eager);
        assert_eq!(merged.first_node_number, 100);
        assert!(merged.verify_after_mutation, "unspecified keeps base");
    }

    #[test]
    fn given_tilde_in_snapshot_dir_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            snapshot_dir: PathBuf::from("~/trees"),
            ..Default::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        assert!(settings.snapshot_dir.to_string_lossy().starts_with(&home));
    }

    #[test]
    fn given_relative_snapshot_when_resolving_then_joined_onto_snapshot_dir() {
        let settings = Settings {
            snapshot_dir: PathBuf::from("/data/trees"),
            ..Default::default()
        };
        assert_eq!(
            settings.resolve_snapshot(Path::new("taxon.toml")),
            PathBuf::from("/data/trees/taxon.toml")
        );
        assert_eq!(
            settings.resolve_snapshot(Path::new("/tmp/x.toml")),
            PathBuf::from("/tmp/x.toml")
        );
    }

    #[test]
    fn given_template_when_parsed_then_all_defaults() {
        let raw: RawSettings = toml::from_str(&Settings::template()).expect("template parses");
        assert!(raw.first_node_number.is_none());
        assert!(raw.full_name_refresh.is_none());
    }
}
