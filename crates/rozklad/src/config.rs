#![forbid(unsafe_code)]

//! Application configuration: tuning numbers and localized strings.
//!
//! Sources, lowest precedence first:
//!
//! 1. [`RozkladConfig::default`]
//! 2. A JSON config file ([`RozkladConfig::load`])
//! 3. A JSON locale file named by `ROZKLAD_LOCALE_FILE`
//! 4. `ROZKLAD_*` numeric overrides
//!
//! ```json
//! {
//!   "debounce_ms": 250,
//!   "viewport_height": 12,
//!   "select_labels": { "no_data": "Немає даних" },
//!   "timetable_labels": { "free_upper": "Верхній тиждень: вільно" }
//! }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rozklad_select::{SearchKey, SelectConfig, SelectLabels};
use rozklad_timetable::TimetableLabels;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the search debounce, in milliseconds.
pub const ENV_DEBOUNCE_MS: &str = "ROZKLAD_DEBOUNCE_MS";
/// Environment variable overriding the option row height.
pub const ENV_ROW_HEIGHT: &str = "ROZKLAD_ROW_HEIGHT";
/// Environment variable overriding the option viewport height.
pub const ENV_VIEWPORT_HEIGHT: &str = "ROZKLAD_VIEWPORT_HEIGHT";
/// Environment variable overriding the overscan row count.
pub const ENV_OVERSCAN: &str = "ROZKLAD_OVERSCAN";
/// Environment variable naming a locale file.
pub const ENV_LOCALE_FILE: &str = "ROZKLAD_LOCALE_FILE";

/// Error loading configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A file could not be read.
    Io { path: PathBuf, message: String },
    /// A file was not valid config JSON.
    Parse { source: String, message: String },
    /// A value was out of range or malformed.
    Invalid { key: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "cannot read {}: {message}", path.display()),
            Self::Parse { source, message } => write!(f, "invalid config in {source}: {message}"),
            Self::Invalid { key, message } => write!(f, "invalid value for {key}: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Localized strings, as stored in a locale file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Locale {
    /// Select control strings.
    pub select: SelectLabels,
    /// Timetable cell strings.
    pub timetable: TimetableLabels,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RozkladConfig {
    /// Search debounce in milliseconds.
    pub debounce_ms: u64,
    /// Option row height.
    pub row_height: usize,
    /// Option list viewport height.
    pub viewport_height: usize,
    /// Extra rows laid out past the viewport.
    pub overscan: usize,
    /// Default search keys for select fields.
    pub search_keys: Vec<SearchKey>,
    /// Select control strings.
    pub select_labels: SelectLabels,
    /// Timetable cell strings.
    pub timetable_labels: TimetableLabels,
}

impl Default for RozkladConfig {
    fn default() -> Self {
        let select = SelectConfig::default();
        Self {
            debounce_ms: u64::try_from(select.debounce.as_millis()).unwrap_or(300),
            row_height: select.row_height,
            viewport_height: select.viewport_height,
            overscan: select.overscan,
            search_keys: select.search_keys,
            select_labels: select.labels,
            timetable_labels: TimetableLabels::default(),
        }
    }
}

impl RozkladConfig {
    /// Parse config JSON. Missing keys keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|e| ConfigError::Parse {
            source: "config".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read(path)?;
        Self::from_json_str(&text).map_err(|err| match err {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                source: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Replace labels from a locale file.
    pub fn apply_locale_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let text = read(path)?;
        let locale: Locale = serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            source: path.display().to_string(),
            message: e.to_string(),
        })?;
        self.select_labels = locale.select;
        self.timetable_labels = locale.timetable;
        Ok(())
    }

    /// Apply `ROZKLAD_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `ROZKLAD_*` overrides from an arbitrary lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_LOCALE_FILE) {
            self.apply_locale_file(Path::new(&path))?;
        }
        if let Some(v) = lookup(ENV_DEBOUNCE_MS) {
            self.debounce_ms = parse_number(ENV_DEBOUNCE_MS, &v)?;
        }
        if let Some(v) = lookup(ENV_ROW_HEIGHT) {
            self.row_height = parse_number(ENV_ROW_HEIGHT, &v)?;
        }
        if let Some(v) = lookup(ENV_VIEWPORT_HEIGHT) {
            self.viewport_height = parse_number(ENV_VIEWPORT_HEIGHT, &v)?;
        }
        if let Some(v) = lookup(ENV_OVERSCAN) {
            self.overscan = parse_number(ENV_OVERSCAN, &v)?;
        }
        self.validate()
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.row_height == 0 {
            return Err(ConfigError::Invalid {
                key: "row_height".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.search_keys.is_empty() {
            return Err(ConfigError::Invalid {
                key: "search_keys".to_string(),
                message: "at least one key is required".to_string(),
            });
        }
        Ok(())
    }

    /// Debounce delay.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Controller config for select fields.
    #[must_use]
    pub fn select_config(&self) -> SelectConfig {
        SelectConfig::default()
            .with_debounce(self.debounce())
            .with_geometry(self.row_height, self.viewport_height)
            .with_overscan(self.overscan)
            .with_search_keys(self.search_keys.clone())
            .with_labels(self.select_labels.clone())
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        message: format!("{value:?}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_select_defaults() {
        let config = RozkladConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.select_config(), SelectConfig::default());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = RozkladConfig::from_json_str(
            r#"{"debounce_ms": 150, "select_labels": {"no_data": "Немає даних"}}"#,
        )
        .unwrap();
        assert_eq!(config.debounce_ms, 150);
        assert_eq!(config.select_labels.no_data, "Немає даних");
        assert_eq!(config.select_labels.loading, SelectLabels::default().loading);
        assert_eq!(config.viewport_height, 8);
    }

    #[test]
    fn bad_json_is_parse_error() {
        assert!(matches!(
            RozkladConfig::from_json_str("{"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn zero_row_height_is_invalid() {
        let err = RozkladConfig::from_json_str(r#"{"row_height": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "row_height"));
    }

    #[test]
    fn env_overrides_numbers() {
        let mut config = RozkladConfig::default();
        config
            .apply_env_from(env(&[
                (ENV_DEBOUNCE_MS, "500"),
                (ENV_VIEWPORT_HEIGHT, " 20 "),
                (ENV_OVERSCAN, "0"),
            ]))
            .unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.viewport_height, 20);
        assert_eq!(config.overscan, 0);
        assert_eq!(config.row_height, 1);
    }

    #[test]
    fn env_garbage_is_reported() {
        let mut config = RozkladConfig::default();
        let err = config
            .apply_env_from(env(&[(ENV_ROW_HEIGHT, "tall")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_ROW_HEIGHT));
    }

    #[test]
    fn missing_locale_file_is_io_error() {
        let mut config = RozkladConfig::default();
        let err = config
            .apply_env_from(env(&[(ENV_LOCALE_FILE, "/nonexistent/rozklad-locale.json")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn locale_file_replaces_labels() {
        let path = std::env::temp_dir().join(format!("rozklad-locale-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"timetable": {"free_upper": "Верхній тиждень: вільно"}}"#,
        )
        .unwrap();
        let mut config = RozkladConfig::default();
        config.apply_locale_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.timetable_labels.free_upper, "Верхній тиждень: вільно");
        assert_eq!(config.timetable_labels.empty, TimetableLabels::default().empty);
    }
}
