// Table settings
// Loaded from ~/.config/plugtable/settings.json (or an explicit .json/.toml path)

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid TOML in {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid setting `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Default sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Raise the level by `steps` (one per `-v`), capped at trace
    pub fn raised(self, steps: u8) -> Self {
        const ORDER: [LogLevel; 6] = [
            LogLevel::Off,
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ];
        let current = ORDER.iter().position(|l| *l == self).unwrap_or(2);
        ORDER[(current + steps as usize).min(ORDER.len() - 1)]
    }

    pub fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Table
    #[serde(rename = "table.rowsPerPage")]
    pub rows_per_page: usize,

    // Sort
    #[serde(rename = "sort.field")]
    pub sort_field: Option<String>, // None = first column

    #[serde(rename = "sort.direction")]
    pub sort_direction: SortDirection,

    // Filter
    #[serde(rename = "filter.priority")]
    pub filter_priority: i64,

    // URL the query string is attached to
    #[serde(rename = "url.base")]
    pub url_base: String,

    // Logging
    #[serde(rename = "log.level")]
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rows_per_page: 10,
            sort_field: None,
            sort_direction: SortDirection::Asc,
            filter_priority: -1,
            url_base: "http://localhost/".to_string(),
            log_level: LogLevel::Warn,
        }
    }
}

impl Settings {
    /// Default settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("plugtable")
            .join("settings.json")
    }

    /// Load settings.
    ///
    /// An explicit path must exist and parse. Without one, the default path
    /// is tried; a missing file gives defaults and a broken one is logged and
    /// replaced by defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        let path = Self::config_path();
        if !path.exists() {
            debug!("no settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        match Self::load_from(&path) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!("{}; using default settings", e);
                Ok(Self::default())
            }
        }
    }

    /// Load and validate a settings file; `.toml` files are read as TOML, anything else as JSON
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let settings = if is_toml {
            Self::from_toml_str(&contents).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            Self::from_json_str(&contents).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?
        };

        settings.validate()?;
        debug!("loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Parse JSON settings. Lines starting with `//` are comments.
    pub fn from_json_str(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        let value: Value = serde_json::from_str(&cleaned)?;
        serde_json::from_value(flatten(value))
    }

    /// Parse TOML settings. Tables and dotted keys both map to dotted names:
    /// `[table] rowsPerPage = 5` is `table.rowsPerPage`.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let value: Value = toml::from_str(contents)?;
        serde_json::from_value(flatten(value)).map_err(serde::de::Error::custom)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows_per_page == 0 {
            return Err(ConfigError::Invalid {
                key: "table.rowsPerPage",
                message: "must be at least 1".into(),
            });
        }
        if self.sort_field.as_deref().is_some_and(|f| f.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                key: "sort.field",
                message: "must not be blank".into(),
            });
        }
        Ok(())
    }
}

/// Collapse nested objects into dotted keys
fn flatten(value: Value) -> Value {
    fn walk(prefix: Option<&str>, map: Map<String, Value>, out: &mut Map<String, Value>) {
        for (key, value) in map {
            let key = match prefix {
                Some(prefix) => format!("{}.{}", prefix, key),
                None => key,
            };
            match value {
                Value::Object(inner) => walk(Some(&key), inner, out),
                other => {
                    out.insert(key, other);
                }
            }
        }
    }

    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            walk(None, map, &mut out);
            Value::Object(out)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_json_with_comments() {
        let file = file_with(
            ".json",
            r#"{
    // Table
    "table.rowsPerPage": 25,
    "sort.field": "power",
    "sort.direction": "desc"
}"#,
        );
        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.rows_per_page, 25);
        assert_eq!(settings.sort_field.as_deref(), Some("power"));
        assert_eq!(settings.sort_direction, SortDirection::Desc);
        assert_eq!(settings.filter_priority, -1);
        assert_eq!(settings.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_toml_tables_and_dotted_keys() {
        let file = file_with(
            ".toml",
            r#"
"log.level" = "debug"

[table]
rowsPerPage = 5

[filter]
priority = 3
"#,
        );
        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.rows_per_page, 5);
        assert_eq!(settings.filter_priority, 3);
        assert_eq!(settings.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::resolve(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_malformed_and_invalid() {
        let broken = file_with(".json", "{ \"table.rowsPerPage\": ");
        assert!(matches!(
            Settings::load_from(broken.path()),
            Err(ConfigError::Json { .. })
        ));

        let zero = file_with(".json", r#"{ "table.rowsPerPage": 0 }"#);
        assert!(matches!(
            Settings::load_from(zero.path()),
            Err(ConfigError::Invalid { key: "table.rowsPerPage", .. })
        ));
    }

    #[test]
    fn test_log_level_raised() {
        assert_eq!(LogLevel::Warn.raised(0), LogLevel::Warn);
        assert_eq!(LogLevel::Warn.raised(2), LogLevel::Debug);
        assert_eq!(LogLevel::Warn.raised(9), LogLevel::Trace);
        assert_eq!(LogLevel::Off.raised(1), LogLevel::Error);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let settings = Settings::from_json_str(r#"{ "grid.rowHeight": 24 }"#).unwrap();
        assert_eq!(settings, Settings::default());
    }
}
