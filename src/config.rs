use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub appdir: Option<String>,
    #[serde(default)]
    pub tmdb: TmdbConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(skip)]
    pub debug_logs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default)]
    pub tlscert: Option<String>,
    #[serde(default)]
    pub tlskey: Option<String>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: default_port(),
            tlscert: None,
            tlskey: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbConfig {
    #[serde(alias = "api_base", rename = "apibase")]
    #[serde(default = "default_tmdb_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub token: String,
    #[serde(alias = "image_base", rename = "imagebase")]
    #[serde(default = "default_image_base")]
    pub image_base: String,
    /// Request timeout in seconds.
    #[serde(default = "default_tmdb_timeout")]
    pub timeout: u64,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_base: default_tmdb_api_base(),
            token: String::new(),
            image_base: default_image_base(),
            timeout: default_tmdb_timeout(),
        }
    }
}

impl TmdbConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsBackend {
    Appwrite,
    Sqlite,
    #[default]
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub backend: MetricsBackend,
    #[serde(default)]
    pub appwrite: Option<AppwriteConfig>,
    #[serde(default)]
    pub sqlite: Option<SqliteConfig>,
    /// Number of entries in the trending list.
    #[serde(default = "default_trending")]
    pub trending: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            backend: MetricsBackend::default(),
            appwrite: None,
            sqlite: None,
            trending: default_trending(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppwriteConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(alias = "project_id", rename = "project")]
    #[serde(default)]
    pub project: String,
    #[serde(alias = "database_id", rename = "database")]
    #[serde(default)]
    pub database: String,
    #[serde(alias = "table_id", rename = "table")]
    #[serde(default)]
    pub table: String,
    #[serde(alias = "api_key", rename = "apikey")]
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SqliteConfig {
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Debounce window in milliseconds.
    #[serde(default = "default_debounce")]
    pub debounce: u64,
    /// Seconds a view session may stay unused before it is dropped.
    #[serde(alias = "session_idle", rename = "sessionidle")]
    #[serde(default = "default_session_idle")]
    pub session_idle: u64,
    /// Upper bound on live view sessions.
    #[serde(alias = "max_sessions", rename = "maxsessions")]
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce: default_debounce(),
            session_idle: default_session_idle(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl SearchConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce)
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle)
    }
}

fn default_port() -> String {
    "8080".to_string()
}

fn default_tmdb_api_base() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_image_base() -> String {
    "https://image.tmdb.org/t/p/w500".to_string()
}

fn default_tmdb_timeout() -> u64 {
    10
}

fn default_trending() -> usize {
    5
}

fn default_debounce() -> u64 {
    500
}

fn default_session_idle() -> u64 {
    1800
}

fn default_max_sessions() -> usize {
    crate::view::DEFAULT_MAX_SESSIONS
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_string(), e))?;

        Self::from_yaml(&content).map_err(|e| match e {
            ConfigError::ParseError(_, err) => ConfigError::ParseError(path.to_string(), err),
            other => other,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError("<inline>".to_string(), e))
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(token) = get("TMDB_API_KEY") {
            self.tmdb.token = token;
        }
        if let Some(base) = get("TMDB_API_BASE") {
            self.tmdb.api_base = base;
        }

        let appwrite_keys = [
            "APPWRITE_ENDPOINT",
            "APPWRITE_PROJECT_ID",
            "APPWRITE_DB_ID",
            "APPWRITE_METRICS_TABLE_ID",
            "APPWRITE_API_KEY",
        ];
        if appwrite_keys.iter().all(|k| get(k).is_none()) {
            return;
        }

        let appwrite = self.metrics.appwrite.get_or_insert_with(AppwriteConfig::default);
        if let Some(v) = get("APPWRITE_ENDPOINT") {
            appwrite.endpoint = v;
        }
        if let Some(v) = get("APPWRITE_PROJECT_ID") {
            appwrite.project = v;
        }
        if let Some(v) = get("APPWRITE_DB_ID") {
            appwrite.database = v;
        }
        if let Some(v) = get("APPWRITE_METRICS_TABLE_ID") {
            appwrite.table = v;
        }
        if let Some(v) = get("APPWRITE_API_KEY") {
            appwrite.api_key = Some(v);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tmdb.token.trim().is_empty() {
            return Err(ConfigError::Missing("tmdb.token".to_string()));
        }

        match self.metrics.backend {
            MetricsBackend::Appwrite => {
                let appwrite = self
                    .metrics
                    .appwrite
                    .as_ref()
                    .ok_or_else(|| ConfigError::Missing("metrics.appwrite".to_string()))?;
                for (name, value) in [
                    ("endpoint", &appwrite.endpoint),
                    ("project", &appwrite.project),
                    ("database", &appwrite.database),
                    ("table", &appwrite.table),
                ] {
                    if value.trim().is_empty() {
                        return Err(ConfigError::Missing(format!("metrics.appwrite.{}", name)));
                    }
                }
            }
            MetricsBackend::Sqlite => {
                if self.metrics.sqlite.is_none() {
                    return Err(ConfigError::Missing("metrics.sqlite.filename".to_string()));
                }
            }
            MetricsBackend::Memory => {}
        }

        if self.metrics.trending == 0 {
            return Err(ConfigError::Invalid("metrics.trending must be at least 1".to_string()));
        }

        if self.search.max_sessions == 0 {
            return Err(ConfigError::Invalid("search.maxsessions must be at least 1".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(String, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(String, serde_yaml::Error),
    #[error("Missing configuration value: {0}")]
    Missing(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("tmdb:\n  token: abc\n").unwrap();
        assert_eq!(config.listen.port, "8080");
        assert_eq!(config.tmdb.api_base, "https://api.themoviedb.org/3");
        assert_eq!(config.tmdb.image_base, "https://image.tmdb.org/t/p/w500");
        assert_eq!(config.metrics.backend, MetricsBackend::Memory);
        assert_eq!(config.metrics.trending, 5);
        assert_eq!(config.search.debounce_window(), Duration::from_millis(500));
        assert_eq!(config.search.max_sessions, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full() {
        let yaml = r#"
listen:
  address: 127.0.0.1
  port: "9000"
appdir: ./public
tmdb:
  apibase: http://localhost:1234/3
  token: secret
  timeout: 3
metrics:
  backend: appwrite
  trending: 10
  appwrite:
    endpoint: https://cloud.appwrite.io/v1
    project: proj
    database: db
    table: metrics
search:
  debounce: 250
  sessionidle: 60
  maxsessions: 50
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.listen.address.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.tmdb.timeout(), Duration::from_secs(3));
        assert_eq!(config.metrics.backend, MetricsBackend::Appwrite);
        assert_eq!(config.metrics.trending, 10);
        assert_eq!(config.metrics.appwrite.as_ref().unwrap().table, "metrics");
        assert_eq!(config.search.debounce, 250);
        assert_eq!(config.search.session_idle(), Duration::from_secs(60));
        assert_eq!(config.search.max_sessions, 50);
        assert!(config.validate().is_ok());

        let zero = Config::from_yaml("tmdb:\n  token: t\nsearch:\n  maxsessions: 0\n").unwrap();
        assert!(matches!(zero.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::from_yaml("tmdb:\n  token: from-file\n").unwrap();
        let env: HashMap<&str, &str> = [
            ("TMDB_API_KEY", "from-env"),
            ("APPWRITE_ENDPOINT", "https://aw.example/v1"),
            ("APPWRITE_PROJECT_ID", "p1"),
            ("APPWRITE_DB_ID", "d1"),
            ("APPWRITE_METRICS_TABLE_ID", "t1"),
        ]
        .into_iter()
        .collect();
        config.apply_env_from(|k| env.get(k).map(|v| v.to_string()));
        config.metrics.backend = MetricsBackend::Appwrite;

        assert_eq!(config.tmdb.token, "from-env");
        let appwrite = config.metrics.appwrite.as_ref().unwrap();
        assert_eq!(appwrite.endpoint, "https://aw.example/v1");
        assert_eq!(appwrite.project, "p1");
        assert_eq!(appwrite.api_key, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_values() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(ref k)) if k == "tmdb.token"));

        let config = Config::from_yaml(
            "tmdb:\n  token: t\nmetrics:\n  backend: appwrite\n  appwrite:\n    endpoint: http://x\n",
        )
        .unwrap();
        assert!(
            matches!(config.validate(), Err(ConfigError::Missing(ref k)) if k == "metrics.appwrite.project")
        );

        let config = Config::from_yaml("tmdb:\n  token: t\nmetrics:\n  backend: sqlite\n").unwrap();
        assert!(config.validate().is_err());
    }
}
