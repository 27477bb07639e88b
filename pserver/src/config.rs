//! Server configuration: TOML file, `.env`, then `PROMPTSHELL_*` overrides.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use promptshell::pstore::StoreConfig;
use promptshell::ptooling::RetryPolicy;
use promptshell::{Namespaces, RefreshIntervals};

pub const ENV_PREFIX: &str = "PROMPTSHELL_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub logging: LoggingSection,
    pub store: StoreSection,
    pub refresh: RefreshSection,
    pub render: RenderSection,
    pub tools: ToolsSection,
    pub llm: LlmSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub listen_addr: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub kind: StoreKind,
    pub url: String,
    pub tools_prefix: String,
    pub prompts_prefix: String,
    pub extensions_prefix: String,
    pub environment_prefix: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        let namespaces = Namespaces::default();
        Self {
            kind: StoreKind::Memory,
            url: "redis://127.0.0.1:6379".to_string(),
            tools_prefix: namespaces.tools,
            prompts_prefix: namespaces.prompts,
            extensions_prefix: namespaces.extensions,
            environment_prefix: namespaces.environment,
        }
    }
}

impl StoreSection {
    pub fn store_config(&self) -> StoreConfig {
        match self.kind {
            StoreKind::Memory => StoreConfig::InMemory,
            StoreKind::Redis => StoreConfig::Redis {
                url: self.url.clone(),
            },
        }
    }

    pub fn namespaces(&self) -> Namespaces {
        Namespaces {
            tools: self.tools_prefix.clone(),
            prompts: self.prompts_prefix.clone(),
            extensions: self.extensions_prefix.clone(),
            environment: self.environment_prefix.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSection {
    pub tools_secs: u64,
    pub prompts_secs: u64,
    pub extensions_secs: u64,
    pub environment_secs: u64,
    pub timeout_secs: u64,
}

impl Default for RefreshSection {
    fn default() -> Self {
        Self {
            tools_secs: 30,
            prompts_secs: 30,
            extensions_secs: 30,
            environment_secs: 30,
            timeout_secs: 10,
        }
    }
}

impl RefreshSection {
    pub fn intervals(&self) -> RefreshIntervals {
        RefreshIntervals {
            tools: Duration::from_secs(self.tools_secs),
            prompts: Duration::from_secs(self.prompts_secs),
            extensions: Duration::from_secs(self.extensions_secs),
            environment: Duration::from_secs(self.environment_secs),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Every interval and the load timeout must be at least one second.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("tools_secs", self.tools_secs),
            ("prompts_secs", self.prompts_secs),
            ("extensions_secs", self.extensions_secs),
            ("environment_secs", self.environment_secs),
            ("timeout_secs", self.timeout_secs),
        ];
        match fields.into_iter().find(|(_, secs)| *secs == 0) {
            Some((field, _)) => Err(ConfigError::Invalid {
                key: format!("refresh.{field}"),
                message: "must be greater than zero".to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSection {
    pub deadline_ms: u64,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self { deadline_ms: 500 }
    }
}

impl RenderSection {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub http_timeout_secs: u64,
    pub rpc_connect_timeout_secs: u64,
    pub rpc_call_timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 1000,
            http_timeout_secs: 10,
            rpc_connect_timeout_secs: 5,
            rpc_call_timeout_secs: 10,
        }
    }
}

impl ToolsSection {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_ms))
    }
}

/// An empty `api_base` leaves chat disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub api_base: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key: String::new(),
            timeout_secs: 30,
        }
    }
}

impl LlmSection {
    pub fn is_enabled(&self) -> bool {
        !self.api_base.trim().is_empty()
    }
}

impl AppConfig {
    /// Reads the optional TOML file, loads `.env` if present, and applies
    /// `PROMPTSHELL_*` variables from the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                tracing::warn!(error = %err, "ignoring unreadable .env file");
            }
        }

        let vars: HashMap<String, String> = std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect();
        config.apply_overrides(&vars)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.refresh.validate()
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Applies `PROMPTSHELL_*` overrides from `vars`.
    pub fn apply_overrides(&mut self, vars: &HashMap<String, String>) -> Result<(), ConfigError> {
        let get = |name: &str| vars.get(&format!("{ENV_PREFIX}{name}")).cloned();

        if let Some(addr) = get("LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = get("LOG_FORMAT") {
            self.logging.format = match format.to_ascii_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                other => {
                    return Err(ConfigError::Invalid {
                        key: format!("{ENV_PREFIX}LOG_FORMAT"),
                        message: format!("expected 'text' or 'json', got '{other}'"),
                    });
                }
            };
        }
        if let Some(url) = get("STORE_URL") {
            self.store.kind = StoreKind::Redis;
            self.store.url = url;
        }
        if let Some(api_base) = get("LLM_API_BASE") {
            self.llm.api_base = api_base;
        }
        if let Some(api_key) = get("LLM_API_KEY") {
            self.llm.api_key = api_key;
        }
        if let Some(deadline) = get("RENDER_DEADLINE_MS") {
            self.render.deadline_ms =
                deadline
                    .trim()
                    .parse()
                    .map_err(|err: std::num::ParseIntError| ConfigError::Invalid {
                        key: format!("{ENV_PREFIX}RENDER_DEADLINE_MS"),
                        message: err.to_string(),
                    })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::{AppConfig, ConfigError, LogFormat, StoreKind};

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();

        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.store.kind, StoreKind::Memory);
        assert_eq!(config.store.tools_prefix, "prompt-shell:tools:");
        assert_eq!(config.store.environment_prefix, "prompt-shell:environs:");
        assert_eq!(config.refresh.intervals().tools, Duration::from_secs(30));
        assert_eq!(config.refresh.timeout(), Duration::from_secs(10));
        assert_eq!(config.render.deadline(), Duration::from_millis(500));
        assert_eq!(config.tools.retry_policy().max_attempts, 3);
        assert_eq!(config.llm.timeout_secs, 30);
        assert!(!config.llm.is_enabled());
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_fields() {
        let config = AppConfig::from_toml(
            r#"
            [store]
            kind = "redis"
            url = "redis://cache:6379"

            [logging]
            format = "json"

            [refresh]
            tools_secs = 5
            "#,
        )
        .expect("toml should parse");

        assert_eq!(config.store.kind, StoreKind::Redis);
        assert_eq!(config.store.url, "redis://cache:6379");
        assert_eq!(config.store.prompts_prefix, "prompt-shell:prompts:");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.refresh.tools_secs, 5);
        assert_eq!(config.refresh.prompts_secs, 30);
    }

    #[test]
    fn environment_overrides_win_over_file_values() {
        let mut config = AppConfig::default();
        let vars = HashMap::from([
            ("PROMPTSHELL_LISTEN_ADDR".to_string(), "127.0.0.1:9999".to_string()),
            ("PROMPTSHELL_STORE_URL".to_string(), "redis://other:6379".to_string()),
            ("PROMPTSHELL_LLM_API_BASE".to_string(), "http://llm.local".to_string()),
            ("PROMPTSHELL_RENDER_DEADLINE_MS".to_string(), "250".to_string()),
        ]);

        config.apply_overrides(&vars).expect("overrides should apply");

        assert_eq!(config.server.listen_addr, "127.0.0.1:9999");
        assert_eq!(config.store.kind, StoreKind::Redis);
        assert_eq!(config.store.url, "redis://other:6379");
        assert!(config.llm.is_enabled());
        assert_eq!(config.render.deadline_ms, 250);
    }

    #[test]
    fn malformed_override_is_rejected() {
        let mut config = AppConfig::default();
        let vars = HashMap::from([(
            "PROMPTSHELL_LOG_FORMAT".to_string(),
            "yaml".to_string(),
        )]);

        let err = config.apply_overrides(&vars).expect_err("yaml is not a format");
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn zero_refresh_interval_is_rejected() {
        let config = AppConfig::from_toml(
            r#"
            [refresh]
            prompts_secs = 0
            "#,
        )
        .expect("toml should parse");

        let err = config.validate().expect_err("zero interval is invalid");
        match err {
            ConfigError::Invalid { key, .. } => assert_eq!(key, "refresh.prompts_secs"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(AppConfig::default().validate().is_ok());
    }
}
