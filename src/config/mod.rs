// PromptDeck: prompt tool catalog with AI text generation
// License: Apache-2.0

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("home directory not found")]
    NoHomeDir,
    #[error("invalid API base URL {0:?}: {1}")]
    InvalidApiBase(String, url::ParseError),
    #[error("{0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3000
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "~/.promptdeck/promptdeck.db".to_string()
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Operator-held key. Takes priority over any key a caller sends.
    #[serde(default)]
    pub api_key: String,
    /// Empty means the public Gemini endpoint.
    #[serde(default)]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: String::new(),
            default_model: default_model(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl GenerationConfig {
    /// The configured key, if one is set.
    pub fn configured_key(&self) -> Option<String> {
        let key = self.api_key.trim();
        if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        }
    }
}

fn default_model() -> String {
    crate::provider::DEFAULT_MODEL.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> usize {
    2
}
fn default_retry_delay_ms() -> u64 {
    500
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a JSON file, falling back to defaults.
    ///
    /// Environment overrides are applied in both cases.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str(&contents)?
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Config::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (prefix: PROMPTDECK_)
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("PROMPTDECK_SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = var("PROMPTDECK_SERVER_PORT") {
            if let Ok(n) = v.parse() {
                self.server.port = n;
            }
        }
        if let Some(v) = var("PROMPTDECK_DATABASE_PATH") {
            self.database.path = v;
        }
        if let Some(v) = var("PROMPTDECK_GENERATION_API_KEY") {
            self.generation.api_key = v;
        }
        if let Some(v) = var("PROMPTDECK_GENERATION_API_BASE") {
            self.generation.api_base = v;
        }
        if let Some(v) = var("PROMPTDECK_GENERATION_DEFAULT_MODEL") {
            self.generation.default_model = v;
        }
        if let Some(v) = var("PROMPTDECK_GENERATION_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                self.generation.timeout_secs = n;
            }
        }
        // Conventional variable name, lowest priority
        if self.generation.api_key.trim().is_empty() {
            if let Some(v) = var("GEMINI_API_KEY") {
                self.generation.api_key = v;
            }
        }
    }

    /// Resolve the database path, expanding `~` to home directory.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        let db = &self.database.path;
        if let Some(stripped) = db.strip_prefix('~') {
            let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
            Ok(home.join(db.strip_prefix("~/").unwrap_or(stripped)))
        } else {
            Ok(PathBuf::from(db))
        }
    }

    /// Get the default config file path: ~/.promptdeck/config.json
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".promptdeck").join("config.json"))
    }

    /// Validate configuration for basic correctness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Other("server.port must be non-zero".to_string()));
        }

        if self.generation.timeout_secs == 0 {
            return Err(ConfigError::Other(
                "generation.timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.generation.default_model.trim().is_empty() {
            return Err(ConfigError::Other(
                "generation.default_model must not be empty".to_string(),
            ));
        }

        if !self.generation.api_base.is_empty() {
            url::Url::parse(&self.generation.api_base).map_err(|e| {
                ConfigError::InvalidApiBase(self.generation.api_base.clone(), e)
            })?;
        }

        if self.generation.configured_key().is_none() {
            tracing::warn!(
                "No generation API key configured; callers must supply one or receive placeholder output"
            );
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.generation.default_model, "gemini-2.5-flash");
        assert_eq!(cfg.generation.timeout_secs, 30);
        assert!(cfg.generation.configured_key().is_none());
    }

    #[test]
    fn test_parse_minimal_json() {
        let json = r#"{"generation": {"default_model": "gemini-2.0-flash"}}"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.generation.default_model, "gemini-2.0-flash");
        assert_eq!(cfg.generation.timeout_secs, 30);
        assert_eq!(cfg.database.path, "~/.promptdeck/promptdeck.db");
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "server": {"host": "0.0.0.0", "port": 8080},
            "database": {"path": "/tmp/deck.db"},
            "generation": {"api_key": "k-test", "api_base": "http://localhost:1234", "timeout_secs": 5}
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.database_path().unwrap(), PathBuf::from("/tmp/deck.db"));
        assert_eq!(cfg.generation.configured_key().as_deref(), Some("k-test"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_database_path_tilde() {
        let cfg = Config::default();
        let path = cfg.database_path().unwrap();
        assert!(path.to_str().unwrap().contains("promptdeck"));
        assert!(!path.to_str().unwrap().starts_with('~'));
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("PROMPTDECK_SERVER_PORT", "9999"),
            ("PROMPTDECK_GENERATION_API_KEY", "from-env"),
            ("GEMINI_API_KEY", "ignored"),
            ("PROMPTDECK_GENERATION_TIMEOUT_SECS", "not-a-number"),
        ]);
        let mut cfg = Config::default();
        cfg.apply_overrides(|k| vars.get(k).cloned());
        assert_eq!(cfg.server.port, 9999);
        assert_eq!(cfg.generation.api_key, "from-env");
        assert_eq!(cfg.generation.timeout_secs, 30);
    }

    #[test]
    fn test_gemini_api_key_fallback() {
        let vars = env(&[("GEMINI_API_KEY", "g-key")]);
        let mut cfg = Config::default();
        cfg.apply_overrides(|k| vars.get(k).cloned());
        assert_eq!(cfg.generation.configured_key().as_deref(), Some("g-key"));
    }

    #[test]
    fn test_blank_key_is_not_configured() {
        let mut cfg = Config::default();
        cfg.generation.api_key = "   ".into();
        assert!(cfg.generation.configured_key().is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.generation.timeout_secs = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.generation.api_base = "not a url".into();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidApiBase(_, _))
        ));
    }
}
