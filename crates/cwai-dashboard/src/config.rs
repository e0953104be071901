//! Dashboard configuration.
//!
//! Loaded from TOML; every key is optional. Precedence, lowest first:
//! built-in defaults, the config file, `CWAI_API_URL`, command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use cwai_api::ClientConfig;
use cwai_protocol::{DEFAULT_API_BASE_URL, DEFAULT_REPORT_PAGE_SIZE, DEFAULT_REQUEST_TIMEOUT_SECS};

/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "CWAI_API_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// Backend base URL including the `/api/v1` prefix.
    pub base_url: String,
    /// Per-request timeout; `0` disables it.
    pub timeout_secs: u64,
    /// Use the built-in offline backend instead of HTTP.
    pub offline: bool,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            offline: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSection {
    pub recent_reports: u32,
    pub tick_ms: u64,
}

impl Default for ConsoleSection {
    fn default() -> Self {
        Self {
            recent_reports: DEFAULT_REPORT_PAGE_SIZE,
            tick_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub api: ApiSection,
    pub logging: LoggingSection,
    pub console: ConsoleSection,
}

impl DashboardConfig {
    /// `<config dir>/cwai/dashboard.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cwai").join("dashboard.toml"))
    }

    /// Load from an explicit path, or from [`default_path`](Self::default_path).
    ///
    /// A missing explicit file is an error; a missing default file yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loaded dashboard config");
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Apply `CWAI_API_URL` if set and non-empty.
    pub fn apply_env(&mut self) {
        self.apply_api_url_override(std::env::var(API_URL_ENV).ok());
    }

    fn apply_api_url_override(&mut self, value: Option<String>) {
        if let Some(url) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            self.api.base_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: "api.base_url",
                reason: format!("'{url}' is not an http(s) URL"),
            });
        }
        if self.console.tick_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "console.tick_ms",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api.base_url.clone(),
            request_timeout: (self.api.timeout_secs > 0)
                .then(|| Duration::from_secs(self.api.timeout_secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let config = DashboardConfig::parse("").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000/api/v1");
        assert_eq!(
            config.client_config().request_timeout,
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = DashboardConfig::parse(
            r#"
            [api]
            base_url = "https://wildlife.example.org/api/v1"
            timeout_secs = 0

            [console]
            recent_reports = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://wildlife.example.org/api/v1");
        assert!(!config.api.offline);
        assert_eq!(config.client_config().request_timeout, None);
        assert_eq!(config.console.recent_reports, 25);
        assert_eq!(config.console.tick_ms, 100);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn load_reads_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\noffline = true\n[logging]\nlevel = \"debug\"").unwrap();

        let config = DashboardConfig::load(Some(file.path())).unwrap();
        assert!(config.api.offline);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DashboardConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api\nbase_url = ").unwrap();
        let err = DashboardConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn env_override_ignores_blank_values() {
        let mut config = DashboardConfig::default();
        config.apply_api_url_override(Some("   ".into()));
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        config.apply_api_url_override(Some("http://10.0.0.5:8000/api/v1".into()));
        assert_eq!(config.api.base_url, "http://10.0.0.5:8000/api/v1");
    }

    #[test]
    fn validate_rejects_non_http_urls() {
        let mut config = DashboardConfig::default();
        assert!(config.validate().is_ok());
        config.api.base_url = "ftp://example.org".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "api.base_url", .. })
        ));
    }
}
