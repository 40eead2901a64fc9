//! Runtime configuration.
//!
//! Every setting resolves in the same order: a value set on the builder,
//! then the matching environment variable, then a default.
//!
//! | Setting     | Environment variable   | Default                                  |
//! |-------------|------------------------|------------------------------------------|
//! | vault root  | `TAGVAULT_ROOT`        | current directory                        |
//! | rules file  | `TAGVAULT_RULES`       | `{config_dir}/tagvault/taxonomy.yaml` if present, else built-in |
//! | backup dir  | `TAGVAULT_BACKUP_DIR`  | `.backups` under the vault root          |

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::taxonomy::{RuleTable, RuleTableError};
use crate::vault::DEFAULT_SKIP_DIRS;

pub const ROOT_ENV: &str = "TAGVAULT_ROOT";
pub const RULES_ENV: &str = "TAGVAULT_RULES";
pub const BACKUP_DIR_ENV: &str = "TAGVAULT_BACKUP_DIR";

const DEFAULT_BACKUP_DIR: &str = ".backups";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to determine current directory")]
    CurrentDir(#[source] std::io::Error),

    #[error("Rules file not found: {}", .0.display())]
    RulesNotFound(PathBuf),

    #[error("Invalid rules file {}", path.display())]
    Rules {
        path: PathBuf,
        #[source]
        source: RuleTableError,
    },

    #[error("Built-in rule table is invalid")]
    Builtin(#[source] RuleTableError),
}

/// Resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub vault_root: PathBuf,
    /// `None` means the built-in rule table.
    pub rules_path: Option<PathBuf>,
    pub backup_dir: PathBuf,
    pub skip_dirs: BTreeSet<String>,
}

impl AppConfig {
    /// Loads the configured rules file, or the built-in table when none is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules file is missing, unreadable, malformed
    /// or fails validation.
    pub fn load_rule_table(&self) -> Result<RuleTable, ConfigError> {
        match &self.rules_path {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::RulesNotFound(path.clone()));
                }
                RuleTable::load(path).map_err(|source| ConfigError::Rules {
                    path: path.clone(),
                    source,
                })
            }
            None => RuleTable::builtin().map_err(ConfigError::Builtin),
        }
    }
}

/// Builder for [`AppConfig`].
///
/// # Examples
///
/// ```
/// use tagvault::config::AppConfigBuilder;
///
/// let config = AppConfigBuilder::new()
///     .vault_root("/tmp/vault")
///     .backup_dir("/tmp/backups")
///     .build()
///     .expect("config");
/// assert!(config.skip_dirs.contains(".obsidian"));
/// ```
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    vault_root: Option<PathBuf>,
    rules_path: Option<PathBuf>,
    backup_dir: Option<PathBuf>,
    extra_skip_dirs: Vec<String>,
}

impl AppConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vault_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.vault_root = Some(path.into());
        self
    }

    pub fn rules_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules_path = Some(path.into());
        self
    }

    /// Relative paths are taken relative to the vault root.
    pub fn backup_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(path.into());
        self
    }

    /// Adds a directory name to prune during discovery.
    pub fn skip_dir(mut self, name: impl Into<String>) -> Self {
        self.extra_skip_dirs.push(name.into());
        self
    }

    /// Resolves every setting.
    ///
    /// # Errors
    ///
    /// Returns an error only when no vault root is given anywhere and the
    /// current directory cannot be determined.
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let vault_root = match self.vault_root.or_else(|| env_path(ROOT_ENV)) {
            Some(path) => path,
            None => std::env::current_dir().map_err(ConfigError::CurrentDir)?,
        };

        let rules_path = self
            .rules_path
            .or_else(|| env_path(RULES_ENV))
            .or_else(default_rules_path);

        let backup_dir = self
            .backup_dir
            .or_else(|| env_path(BACKUP_DIR_ENV))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR));
        let backup_dir = if backup_dir.is_absolute() {
            backup_dir
        } else {
            vault_root.join(backup_dir)
        };

        let mut skip_dirs: BTreeSet<String> =
            DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect();
        skip_dirs.extend(self.extra_skip_dirs);
        if let Some(name) = backup_dir.file_name().and_then(|n| n.to_str()) {
            skip_dirs.insert(name.to_string());
        }

        let config = AppConfig {
            vault_root,
            rules_path,
            backup_dir,
            skip_dirs,
        };
        debug!(?config, "configuration resolved");
        Ok(config)
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// `{config_dir}/tagvault/taxonomy.yaml`, only if the file exists.
fn default_rules_path() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("tagvault").join("taxonomy.yaml");
    path.is_file().then_some(path)
}

/// Whether `path` is inside the configured backup directory.
pub fn is_backup_path(config: &AppConfig, path: &Path) -> bool {
    path.starts_with(&config.backup_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        unsafe {
            std::env::remove_var(ROOT_ENV);
            std::env::remove_var(RULES_ENV);
            std::env::remove_var(BACKUP_DIR_ENV);
        }
    }

    #[test]
    #[serial]
    fn explicit_values_win() {
        clear_env();
        let config = AppConfigBuilder::new()
            .vault_root("/vault")
            .rules_path("/rules.yaml")
            .backup_dir("/bk")
            .build()
            .unwrap();
        assert_eq!(config.vault_root, PathBuf::from("/vault"));
        assert_eq!(config.rules_path, Some(PathBuf::from("/rules.yaml")));
        assert_eq!(config.backup_dir, PathBuf::from("/bk"));
        assert!(config.skip_dirs.contains("bk"));
    }

    #[test]
    #[serial]
    fn environment_is_used_when_builder_is_empty() {
        clear_env();
        unsafe {
            std::env::set_var(ROOT_ENV, "/env-vault");
            std::env::set_var(RULES_ENV, "/env-rules.json");
        }

        let config = AppConfigBuilder::new().build().unwrap();
        assert_eq!(config.vault_root, PathBuf::from("/env-vault"));
        assert_eq!(config.rules_path, Some(PathBuf::from("/env-rules.json")));
        assert_eq!(config.backup_dir, PathBuf::from("/env-vault/.backups"));

        clear_env();
    }

    #[test]
    #[serial]
    fn relative_backup_dir_is_under_vault() {
        clear_env();
        unsafe {
            std::env::set_var(BACKUP_DIR_ENV, "snapshots");
        }

        let config = AppConfigBuilder::new().vault_root("/v").build().unwrap();
        assert_eq!(config.backup_dir, PathBuf::from("/v/snapshots"));
        assert!(config.skip_dirs.contains("snapshots"));
        assert!(is_backup_path(&config, Path::new("/v/snapshots/x/a.md")));
        assert!(!is_backup_path(&config, Path::new("/v/notes/a.md")));

        clear_env();
    }

    #[test]
    #[serial]
    fn missing_rules_file_is_reported() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let config = AppConfigBuilder::new()
            .vault_root(dir.path())
            .rules_path(dir.path().join("absent.yaml"))
            .build()
            .unwrap();
        assert!(matches!(
            config.load_rule_table(),
            Err(ConfigError::RulesNotFound(_))
        ));
    }

    #[test]
    #[serial]
    fn rules_file_is_loaded() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let rules = dir.path().join("taxonomy.yaml");
        std::fs::write(
            &rules,
            "prefixes:\n  domain:\n    openness: open\n    values: [data]\napproved_flat: [moc]\n",
        )
        .unwrap();

        let config = AppConfigBuilder::new()
            .vault_root(dir.path())
            .rules_path(&rules)
            .build()
            .unwrap();
        let table = config.load_rule_table().unwrap();
        assert!(table.is_approved_flat("moc"));
        assert!(!table.is_approved_flat("index"));
    }

    #[test]
    #[serial]
    fn invalid_rules_file_is_a_rules_error() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let rules = dir.path().join("taxonomy.yaml");
        std::fs::write(&rules, "prefixes: {}\n").unwrap();

        let config = AppConfigBuilder::new()
            .vault_root(dir.path())
            .rules_path(&rules)
            .build()
            .unwrap();
        assert!(matches!(
            config.load_rule_table(),
            Err(ConfigError::Rules { .. })
        ));
    }
}
