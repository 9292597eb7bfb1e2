use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{repository::StoreOptions, sheets::StaticSheets};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("environment variable {0} not set")]
    MissingEnv(String),
}

/// Configuration stored in `formfield.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormfieldConfig {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub redis: RedisSettings,
    #[serde(default)]
    pub sheets: Vec<SheetGrid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_service")]
    pub service: String,
    #[serde(default)]
    pub unique_field_names: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            service: default_service(),
            unique_field_names: false,
        }
    }
}

impl StoreSettings {
    pub fn options(&self) -> StoreOptions {
        StoreOptions {
            unique_field_names: self.unique_field_names,
        }
    }
}

fn default_prefix() -> String {
    "formfield".to_string()
}

fn default_service() -> String {
    "forms".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    #[serde(default = "default_redis_url")]
    pub url: String,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

fn default_redis_url() -> String {
    "${REDIS_URL}".to_string()
}

impl RedisSettings {
    /// Returns the URL, expanding a `${VAR}` value from the environment.
    pub fn resolved_url(&self) -> Result<String, ConfigError> {
        match self.url.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
            Some(var_name) => std::env::var(var_name).map_err(|_| ConfigError::MissingEnv(var_name.to_string())),
            None => Ok(self.url.clone()),
        }
    }
}

/// A spreadsheet served from configuration instead of a remote document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetGrid {
    pub data_url: String,
    pub sheet: String,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

impl FormfieldConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path` when it exists, otherwise falls back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() { Self::load(path) } else { Ok(Self::default()) }
    }

    pub fn static_sheets(&self) -> StaticSheets {
        self.sheets.iter().fold(StaticSheets::new(), |sheets, grid| {
            sheets.with_sheet(grid.data_url.clone(), grid.sheet.clone(), grid.rows.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use crate::sheets::SheetLookup;

    #[test]
    fn test_default_config() {
        let config = FormfieldConfig::default();
        assert_eq!(config.store.prefix, "formfield");
        assert_eq!(config.store.service, "forms");
        assert!(!config.store.unique_field_names);
        assert_eq!(config.redis.url, "${REDIS_URL}");
        assert!(config.sheets.is_empty());
    }

    #[tokio::test]
    async fn test_loads_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[store]
unique_field_names = true

[redis]
url = "redis://127.0.0.1:6380/"

[[sheets]]
data_url = "https://docs.google.com/spreadsheets/d/towns"
sheet = "cities"
rows = [["Kyiv"], ["Lviv"]]
"#
        )
        .unwrap();

        let config = FormfieldConfig::load(file.path()).unwrap();
        assert_eq!(config.store.prefix, "formfield");
        assert!(config.store.options().unique_field_names);
        assert_eq!(config.redis.resolved_url().unwrap(), "redis://127.0.0.1:6380/");
        let values = config
            .static_sheets()
            .values("https://docs.google.com/spreadsheets/d/towns", "cities", "A1", "A2")
            .await
            .unwrap();
        assert_eq!(values, vec!["Kyiv", "Lviv"]);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = FormfieldConfig::load_or_default(&dir.path().join("formfield.toml")).unwrap();
        assert_eq!(config.store.service, "forms");
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[store\nprefix = 1").unwrap();
        assert!(matches!(FormfieldConfig::load(file.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_unset_env_var_is_reported() {
        let settings = RedisSettings {
            url: "${FORMFIELD_TEST_UNSET_REDIS_URL}".to_string(),
        };
        assert!(matches!(settings.resolved_url(), Err(ConfigError::MissingEnv(name)) if name == "FORMFIELD_TEST_UNSET_REDIS_URL"));
    }
}
