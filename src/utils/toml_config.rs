//! TOML-based configuration for ScholarSynth
//!
//! Server, research orchestration, and LLM provider settings are read from a
//! TOML file (`scholarsynth.toml` by default). Every field carries a serde
//! default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name, resolved relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "scholarsynth.toml";

/// Root configuration structure loaded from scholarsynth.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub research: ResearchConfig,

    #[serde(default)]
    pub llm: LlmConfig,
}

// ============= Server Configuration =============

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// CORS origins; empty allows any origin without credentials
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            allowed_origins: Vec::new(),
        }
    }
}

// ============= Research Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Upper bound on sub-question workers running at once for a single task
    #[serde(default = "default_max_concurrent_research")]
    pub max_concurrent_research: usize,

    /// Snapshots buffered per subscriber before the oldest are dropped
    #[serde(default = "default_notification_buffer")]
    pub notification_buffer: usize,

    #[serde(default = "default_max_sub_questions")]
    pub max_sub_questions: usize,

    #[serde(default = "default_sources_per_question")]
    pub sources_per_question: usize,
}

fn default_max_concurrent_research() -> usize {
    8
}

fn default_notification_buffer() -> usize {
    64
}

fn default_max_sub_questions() -> usize {
    10
}

fn default_sources_per_question() -> usize {
    3
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_research: default_max_concurrent_research(),
            notification_buffer: default_notification_buffer(),
            max_sub_questions: default_max_sub_questions(),
            sources_per_question: default_sources_per_question(),
        }
    }
}

// ============= LLM Configuration =============

/// Supported LLM backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ollama,
    OpenAI,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Name of the environment variable holding the API key (OpenAI only)
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_llm_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_llm_model() -> String {
    "llama3.2".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

// ============= Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl SynthConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Load from an explicit path, or fall back to defaults when the default
    /// file is absent. An explicitly given path must exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    tracing::debug!("{} not found, using built-in defaults", DEFAULT_CONFIG_FILE);
                    let config = Self::default();
                    config.validate()?;
                    Ok(config)
                }
            }
        }
    }

    /// Parse configuration text without validating it
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Validate bounds and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be greater than 0".to_string(),
            ));
        }
        if self.research.max_concurrent_research == 0 {
            return Err(ConfigError::ValidationError(
                "research.max_concurrent_research must be at least 1".to_string(),
            ));
        }
        if self.research.notification_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "research.notification_buffer must be at least 1".to_string(),
            ));
        }
        if self.research.max_sub_questions == 0 {
            return Err(ConfigError::ValidationError(
                "research.max_sub_questions must be at least 1".to_string(),
            ));
        }
        if self.research.sources_per_question == 0 {
            return Err(ConfigError::ValidationError(
                "research.sources_per_question must be at least 1".to_string(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "llm.model must not be empty".to_string(),
            ));
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "llm.max_tokens must be at least 1".to_string(),
            ));
        }
        if self.llm.provider == ProviderKind::OpenAI {
            self.validate_env_var(&self.llm.api_key_env)?;
        }
        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = SynthConfig::parse("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.research.max_concurrent_research, 8);
        assert_eq!(config.research.notification_buffer, 64);
        assert_eq!(config.llm.provider, ProviderKind::Ollama);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let content = r#"
[server]
host = "0.0.0.0"
port = 9000
log_level = "debug"
log_format = "json"
allowed_origins = ["http://localhost:5173"]

[research]
max_concurrent_research = 4
notification_buffer = 16
max_sub_questions = 6
sources_per_question = 2

[llm]
provider = "ollama"
base_url = "http://ollama:11434"
model = "qwen2.5"
temperature = 0.3
"#;
        let config = SynthConfig::parse(content).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.server.log_format, LogFormat::Json);
        assert_eq!(config.server.allowed_origins.len(), 1);
        assert_eq!(config.research.max_concurrent_research, 4);
        assert_eq!(config.research.sources_per_question, 2);
        assert_eq!(config.llm.model, "qwen2.5");
        assert_eq!(config.llm.request_timeout_secs, 120);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let result = SynthConfig::parse("[llm]\nprovider = \"mystery\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = SynthConfig::parse("[research]\nmax_concurrent_research = 0\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_zero_notification_buffer_rejected() {
        let config = SynthConfig::parse("[research]\nnotification_buffer = 0\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_openai_requires_api_key_env() {
        let content = r#"
[llm]
provider = "openai"
base_url = "https://api.openai.com/v1"
model = "gpt-4o-mini"
api_key_env = "SCHOLARSYNTH_CONFIG_TEST_MISSING_KEY"
"#;
        let config = SynthConfig::parse(content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingEnvVar(name)) if name == "SCHOLARSYNTH_CONFIG_TEST_MISSING_KEY"
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 8123").unwrap();

        let config = SynthConfig::load(file.path()).unwrap();
        assert_eq!(config.server.port, 8123);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let result = SynthConfig::load_or_default(Some(&missing));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
