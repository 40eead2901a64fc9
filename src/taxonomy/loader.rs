use std::path::Path;

use tracing::debug;

use super::defaults::builtin_spec;
use super::rules::{RuleTable, RuleTableError, RuleTableSpec};

impl RuleTable {
    /// Returns the built-in taxonomy.
    ///
    /// # Errors
    ///
    /// Only fails if the built-in data is inconsistent, which the tests guard.
    pub fn builtin() -> Result<Self, RuleTableError> {
        Self::from_spec(builtin_spec())
    }

    /// Loads and validates a rules file. The format follows the extension:
    /// `.yaml`/`.yml` or `.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or
    /// describes an inconsistent table.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuleTableError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RuleTableError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let spec: RuleTableSpec = match extension.as_deref() {
            Some("yaml" | "yml") => serde_yaml::from_str(&text).map_err(RuleTableError::Yaml)?,
            Some("json") => serde_json::from_str(&text).map_err(RuleTableError::Json)?,
            _ => {
                return Err(RuleTableError::UnsupportedFormat {
                    path: path.to_path_buf(),
                });
            }
        };

        debug!(
            path = %path.display(),
            prefixes = spec.prefixes.len(),
            flat_migrations = spec.flat_migrations.len(),
            "loaded rules file"
        );
        Self::from_spec(spec)
    }
}
