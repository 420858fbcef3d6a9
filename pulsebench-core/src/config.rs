// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict validation.
//!
//! The file is optional; the two required settings (target base URL and
//! database URL) may come from the `HTTP_URL` and `DATABASE_URL` environment
//! variables, which take precedence over the file. Anything missing or
//! invalid is a [`ConfigError`] that prevents startup.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::{BenchmarkKind, FanOutWidth, Policy, TargetUrl};

/// Environment variable holding the target base URL.
pub const HTTP_URL_ENV: &str = "HTTP_URL";
/// Environment variable holding the persistence engine connection string.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

const MAX_PROBE_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Default, Deserialize)]
struct RawTargetConfig {
    #[serde(default)]
    http_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStorageConfig {
    #[serde(default)]
    database_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawProbeConfig {
    #[serde(default = "default_probe_enabled")]
    enabled: bool,
    #[serde(default = "default_probe_url")]
    url: String,
    #[serde(default = "default_probe_timeout_ms")]
    timeout_ms: u64,
}

fn default_probe_enabled() -> bool {
    true
}

fn default_probe_url() -> String {
    "https://example.com".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    5000
}

impl Default for RawProbeConfig {
    fn default() -> Self {
        Self {
            enabled: default_probe_enabled(),
            url: default_probe_url(),
            timeout_ms: default_probe_timeout_ms(),
        }
    }
}

/// Per-kind overrides; an omitted kind keeps its policy default.
#[derive(Debug, Default, Deserialize)]
struct RawWidths {
    #[serde(default)]
    http: Option<usize>,
    #[serde(default)]
    websocket: Option<usize>,
    #[serde(default)]
    database: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RawWidthConfig {
    #[serde(default)]
    stateful: RawWidths,
    #[serde(default)]
    stateless: RawWidths,
}

const DEFAULT_STATEFUL_WIDTHS: PolicyWidths = PolicyWidths {
    http: FanOutWidth::new_unchecked(200),
    websocket: FanOutWidth::new_unchecked(10_000),
    database: FanOutWidth::new_unchecked(50),
};

const DEFAULT_STATELESS_WIDTHS: PolicyWidths = PolicyWidths {
    http: FanOutWidth::new_unchecked(1000),
    websocket: FanOutWidth::new_unchecked(10_000),
    database: FanOutWidth::new_unchecked(100),
};

impl RawWidths {
    fn resolve(self, defaults: PolicyWidths) -> Result<PolicyWidths, ConfigError> {
        let width = |value: Option<usize>, default: FanOutWidth| match value {
            Some(n) => FanOutWidth::new(n),
            None => Ok(default),
        };
        Ok(PolicyWidths {
            http: width(self.http, defaults.http)?,
            websocket: width(self.websocket, defaults.websocket)?,
            database: width(self.database, defaults.database)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawServerConfig {
    #[serde(default = "default_bind")]
    bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for RawServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Raw root configuration file.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    target: RawTargetConfig,
    #[serde(default)]
    storage: RawStorageConfig,
    #[serde(default)]
    probe: RawProbeConfig,
    #[serde(default)]
    widths: RawWidthConfig,
    #[serde(default)]
    server: RawServerConfig,
    #[serde(default)]
    fan_out_timeout_ms: Option<u64>,
}

/// Where the persistence engine lives, parsed from the database URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// `memory://` - in-process store, lost on exit.
    Memory,
    /// `sqlite::memory:` - private in-memory SQLite database.
    SqliteMemory,
    /// `sqlite://<path>` - SQLite database file.
    SqliteFile(PathBuf),
}

impl StoreLocation {
    /// Parse a database connection string.
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        if url == "memory://" || url == "memory:" {
            return Ok(Self::Memory);
        }
        if url == "sqlite::memory:" || url == "sqlite://:memory:" {
            return Ok(Self::SqliteMemory);
        }
        if let Some(path) = url.strip_prefix("sqlite://") {
            if path.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "database_url",
                    value: url.to_string(),
                    reason: "SQLite URL must name a database file".to_string(),
                });
            }
            return Ok(Self::SqliteFile(PathBuf::from(path)));
        }
        Err(ConfigError::UnsupportedStore {
            url: url.to_string(),
        })
    }
}

/// Validated probe configuration.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub enabled: bool,
    pub url: String,
    pub timeout: Duration,
}

/// Fan-out widths for one policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyWidths {
    pub http: FanOutWidth,
    pub websocket: FanOutWidth,
    pub database: FanOutWidth,
}

impl PolicyWidths {
    pub fn for_kind(&self, kind: BenchmarkKind) -> FanOutWidth {
        match kind {
            BenchmarkKind::Http => self.http,
            BenchmarkKind::Websocket => self.websocket,
            BenchmarkKind::Database => self.database,
        }
    }
}

/// Fan-out widths for both policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthConfig {
    pub stateful: PolicyWidths,
    pub stateless: PolicyWidths,
}

impl WidthConfig {
    pub fn for_policy(&self, policy: Policy) -> PolicyWidths {
        match policy {
            Policy::Stateful => self.stateful,
            Policy::Stateless => self.stateless,
        }
    }
}

impl Default for WidthConfig {
    fn default() -> Self {
        Self {
            stateful: DEFAULT_STATEFUL_WIDTHS,
            stateless: DEFAULT_STATELESS_WIDTHS,
        }
    }
}

/// Complete validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub target_url: TargetUrl,
    pub database_url: String,
    pub store: StoreLocation,
    pub probe: ProbeConfig,
    pub widths: WidthConfig,
    pub bind: SocketAddr,
    pub fan_out_timeout: Option<Duration>,
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the process environment only.
    pub fn from_env() -> Result<Config, ConfigError> {
        Self::load_string_with_env("", |key| std::env::var(key).ok())
    }

    /// Load and validate configuration from a YAML file plus the process environment.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::load_string_with_env(&content, |key| std::env::var(key).ok())
    }

    /// Load from an explicit file, or from the environment when none is given.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => Self::load_file(path),
            None => Self::from_env(),
        }
    }

    /// Load and validate configuration from a YAML string, resolving
    /// environment overrides through `env`.
    pub fn load_string_with_env<F>(content: &str, env: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = if content.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
                message: format!("YAML parse error: {}", e),
            })?
        };

        Self::validate(raw, env)
    }

    fn validate<F>(raw: RawConfig, env: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let http_url = Self::required(
            env(HTTP_URL_ENV).or(raw.target.http_url),
            "target base URL",
            HTTP_URL_ENV,
        )?;
        let target_url = TargetUrl::new(http_url)?;

        let database_url = Self::required(
            env(DATABASE_URL_ENV).or(raw.storage.database_url),
            "database URL",
            DATABASE_URL_ENV,
        )?;
        let store = StoreLocation::parse(&database_url)?;

        let probe = Self::validate_probe(raw.probe)?;
        let widths = Self::validate_widths(raw.widths)?;

        let bind: SocketAddr =
            raw.server
                .bind
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                    field: "server.bind",
                    value: raw.server.bind.clone(),
                    reason: e.to_string(),
                })?;

        let fan_out_timeout = match raw.fan_out_timeout_ms {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    field: "fan_out_timeout_ms",
                    value: "0".to_string(),
                    reason: "Deadline must be greater than 0 (omit it to disable)".to_string(),
                })
            }
            Some(ms) => Some(Duration::from_millis(ms)),
            None => None,
        };

        Ok(Config {
            target_url,
            database_url,
            store,
            probe,
            widths,
            bind,
            fan_out_timeout,
        })
    }

    fn required(
        value: Option<String>,
        name: &'static str,
        env: &'static str,
    ) -> Result<String, ConfigError> {
        match value {
            Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
            _ => Err(ConfigError::MissingSetting { name, env }),
        }
    }

    fn validate_probe(raw: RawProbeConfig) -> Result<ProbeConfig, ConfigError> {
        if raw.timeout_ms == 0 || raw.timeout_ms > MAX_PROBE_TIMEOUT_MS {
            return Err(ConfigError::InvalidValue {
                field: "probe.timeout_ms",
                value: raw.timeout_ms.to_string(),
                reason: format!("Must be between 1 and {}", MAX_PROBE_TIMEOUT_MS),
            });
        }

        if raw.enabled {
            reqwest::Url::parse(&raw.url).map_err(|e| ConfigError::InvalidValue {
                field: "probe.url",
                value: raw.url.clone(),
                reason: e.to_string(),
            })?;
        }

        Ok(ProbeConfig {
            enabled: raw.enabled,
            url: raw.url,
            timeout: Duration::from_millis(raw.timeout_ms),
        })
    }

    fn validate_widths(raw: RawWidthConfig) -> Result<WidthConfig, ConfigError> {
        Ok(WidthConfig {
            stateful: raw.stateful.resolve(DEFAULT_STATEFUL_WIDTHS)?,
            stateless: raw.stateless.resolve(DEFAULT_STATELESS_WIDTHS)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const VALID_CONFIG: &str = r#"
target:
  http_url: http://localhost:9000/items/
storage:
  database_url: sqlite://bench.db
probe:
  enabled: true
  url: https://example.com
  timeout_ms: 5000
widths:
  stateful: { http: 20, websocket: 100, database: 5 }
  stateless: { http: 100, websocket: 100, database: 10 }
server:
  bind: 127.0.0.1:8080
fan_out_timeout_ms: 30000
"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_valid_config() {
        let config = ConfigLoader::load_string_with_env(VALID_CONFIG, no_env).unwrap();
        assert_eq!(config.target_url.as_str(), "http://localhost:9000/items/");
        assert_eq!(
            config.store,
            StoreLocation::SqliteFile(PathBuf::from("bench.db"))
        );
        assert_eq!(config.widths.stateful.http.value(), 20);
        assert_eq!(config.widths.stateless.database.value(), 10);
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.fan_out_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = [
            ("HTTP_URL", "http://target:1234/"),
            ("DATABASE_URL", "memory://"),
        ]
        .into_iter()
        .collect();
        let config =
            ConfigLoader::load_string_with_env(VALID_CONFIG, |k| env.get(k).map(|v| v.to_string()))
                .unwrap();
        assert_eq!(config.target_url.as_str(), "http://target:1234/");
        assert_eq!(config.store, StoreLocation::Memory);
    }

    #[test]
    fn test_missing_http_url() {
        let yaml = r#"
storage:
  database_url: memory://
"#;
        let err = ConfigLoader::load_string_with_env(yaml, no_env).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingSetting {
                env: "HTTP_URL",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_database_url() {
        let yaml = r#"
target:
  http_url: http://localhost/
"#;
        let err = ConfigLoader::load_string_with_env(yaml, no_env).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingSetting {
                env: "DATABASE_URL",
                ..
            }
        ));
    }

    #[test]
    fn test_env_only_defaults_applied() {
        let env: HashMap<&str, &str> = [
            ("HTTP_URL", "http://localhost/"),
            ("DATABASE_URL", "sqlite::memory:"),
        ]
        .into_iter()
        .collect();
        let config =
            ConfigLoader::load_string_with_env("", |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.widths.stateful.http.value(), 200);
        assert_eq!(config.widths.stateless.http.value(), 1000);
        assert_eq!(config.widths.stateful.websocket.value(), 10_000);
        assert_eq!(config.widths.stateless.websocket.value(), 10_000);
        assert_eq!(config.widths.stateful.database.value(), 50);
        assert_eq!(config.widths.stateless.database.value(), 100);
        assert_eq!(config.probe.url, "https://example.com");
        assert_eq!(config.probe.timeout, Duration::from_secs(5));
        assert_eq!(config.store, StoreLocation::SqliteMemory);
        assert!(config.fan_out_timeout.is_none());
    }

    #[test]
    fn test_unsupported_store_scheme() {
        let yaml = r#"
target:
  http_url: http://localhost/
storage:
  database_url: mongodb://localhost:27017
"#;
        let err = ConfigLoader::load_string_with_env(yaml, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedStore { .. }));
    }

    #[test]
    fn test_width_out_of_bounds() {
        let yaml = r#"
target:
  http_url: http://localhost/
storage:
  database_url: memory://
widths:
  stateful: { http: 1000000, websocket: 1, database: 1 }
"#;
        assert!(ConfigLoader::load_string_with_env(yaml, no_env).is_err());
    }

    #[test]
    fn test_partial_width_override_keeps_other_defaults() {
        let yaml = r#"
target:
  http_url: http://localhost/
storage:
  database_url: memory://
widths:
  stateful: { http: 20 }
  stateless: {}
"#;
        let config = ConfigLoader::load_string_with_env(yaml, no_env).unwrap();
        assert_eq!(config.widths.stateful.http.value(), 20);
        assert_eq!(config.widths.stateful.websocket.value(), 10_000);
        assert_eq!(config.widths.stateful.database.value(), 50);
        assert_eq!(config.widths.stateless, WidthConfig::default().stateless);
    }

    #[test]
    fn test_probe_timeout_zero_rejected() {
        let yaml = r#"
target:
  http_url: http://localhost/
storage:
  database_url: memory://
probe:
  timeout_ms: 0
"#;
        assert!(ConfigLoader::load_string_with_env(yaml, no_env).is_err());
    }

    #[test]
    fn test_config_file_not_found() {
        let err = ConfigLoader::load_file("/nonexistent/pulsebench.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_store_location_parse() {
        assert_eq!(StoreLocation::parse("memory://").unwrap(), StoreLocation::Memory);
        assert_eq!(
            StoreLocation::parse("sqlite:///tmp/x.db").unwrap(),
            StoreLocation::SqliteFile(PathBuf::from("/tmp/x.db"))
        );
        assert!(StoreLocation::parse("sqlite://").is_err());
        assert!(StoreLocation::parse("postgres://x").is_err());
    }
}
