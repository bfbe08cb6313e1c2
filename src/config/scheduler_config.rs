//! Scheduler Configuration - service endpoints, models and per-stage timeouts
//!
//! Every struct implements `Default` with the production endpoints, so the
//! binary works with no config file present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Env var pointing at a TOML config file
pub const CONFIG_ENV: &str = "SCHEDULER_CONFIG";
/// Env var overriding `backend.base_url`
pub const BACKEND_URL_ENV: &str = "SCHEDULER_BACKEND_URL";
/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "scheduler_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `SchedulerConfig::load()` which searches:
/// 1. `$SCHEDULER_CONFIG` env var
/// 2. `./scheduler_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Local backend that runs the whole pipeline
    #[serde(default)]
    pub backend: BackendConfig,

    /// Direct compression service
    #[serde(default)]
    pub compression: CompressionConfig,

    /// Direct generation service
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl SchedulerConfig {
    /// Load configuration using the standard search order, then apply
    /// environment overrides.
    pub fn load() -> Self {
        let mut config = Self::load_without_env();
        config.apply_env_overrides();
        config
    }

    fn load_without_env() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded scheduler config from {}", CONFIG_ENV);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded scheduler config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys are logged, not rejected.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// `SCHEDULER_BACKEND_URL` replaces the configured backend URL.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                info!(url = %url, "Backend URL overridden by {}", BACKEND_URL_ENV);
                self.backend.base_url = url.trim().to_string();
            }
        }
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check every value for consistency, collecting all problems.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        Self::check_url(&self.backend.base_url, "backend.base_url", &mut errors);
        Self::check_url(&self.compression.url, "compression.url", &mut errors);
        Self::check_url(&self.generation.base_url, "generation.base_url", &mut errors);

        Self::check_timeout(self.backend.timeout_secs, "backend.timeout_secs", &mut errors);
        Self::check_timeout(self.compression.timeout_secs, "compression.timeout_secs", &mut errors);
        Self::check_timeout(self.generation.timeout_secs, "generation.timeout_secs", &mut errors);

        if self.compression.target_model.trim().is_empty() {
            errors.push("compression.target_model must not be empty".to_string());
        }
        if self.compression.rate.trim().is_empty() {
            errors.push("compression.rate must not be empty".to_string());
        }

        let g = &self.generation;
        if g.default_model.trim().is_empty() {
            errors.push("generation.default_model must not be empty".to_string());
        }
        if !g.temperature.is_finite() || !(0.0..=2.0).contains(&g.temperature) {
            errors.push(format!(
                "generation.temperature ({}) must be between 0.0 and 2.0",
                g.temperature
            ));
        }
        if g.max_output_tokens == 0 {
            errors.push("generation.max_output_tokens must be > 0".to_string());
        }
        if g.thinking_budget < -1 {
            errors.push(format!(
                "generation.thinking_budget ({}) must be -1 (dynamic) or >= 0",
                g.thinking_budget
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_url(url: &str, name: &str, errors: &mut Vec<String>) {
        let url = url.trim();
        if url.is_empty() {
            errors.push(format!("{name} must not be empty"));
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(format!("{name} ({url}) must start with http:// or https://"));
        }
    }

    fn check_timeout(secs: u64, name: &str, errors: &mut Vec<String>) {
        if secs == 0 {
            errors.push(format!("{name} must be > 0"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, std::io::Error),

    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Backend
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Try the backend before calling the services directly
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL; the client posts to `{base_url}/optimize`.
    ///
    /// Can be overridden by the `SCHEDULER_BACKEND_URL` env var.
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,

    /// Treat a 4xx answer as a fatal client bug instead of falling back
    #[serde(default)]
    pub client_errors_fatal: bool,
}

fn default_true() -> bool {
    true
}
fn default_backend_url() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_backend_timeout() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_backend_url(),
            timeout_secs: default_backend_timeout(),
            client_errors_fatal: false,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============================================================================
// Compression
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionConfig {
    #[serde(default = "default_compression_url")]
    pub url: String,

    /// Downstream model hint sent with every request
    #[serde(default = "default_target_model")]
    pub target_model: String,

    /// Compression-rate directive
    #[serde(default = "default_rate")]
    pub rate: String,

    #[serde(default = "default_compression_timeout")]
    pub timeout_secs: u64,
}

fn default_compression_url() -> String {
    "https://api.scaledown.xyz/compress/raw/".to_string()
}
fn default_target_model() -> String {
    "gpt-4o".to_string()
}
fn default_rate() -> String {
    "auto".to_string()
}
fn default_compression_timeout() -> u64 {
    30
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            url: default_compression_url(),
            target_model: default_target_model(),
            rate: default_rate(),
            timeout_secs: default_compression_timeout(),
        }
    }
}

impl CompressionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============================================================================
// Generation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// API root; requests go to `{base_url}/models/{model}:generateContent`
    #[serde(default = "default_generation_url")]
    pub base_url: String,

    /// Model used when the request leaves the model blank
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// 0 disables thinking so every token goes to the answer
    #[serde(default)]
    pub thinking_budget: i32,

    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

fn default_generation_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_output_tokens() -> u32 {
    8192
}
fn default_generation_timeout() -> u64 {
    60
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_generation_url(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            thinking_budget: 0,
            timeout_secs: default_generation_timeout(),
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        SchedulerConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = SchedulerConfig::from_toml_str(
            r#"
[backend]
base_url = "http://localhost:9000"
"#,
        )
        .unwrap();
        assert_eq!(config.backend.base_url, "http://localhost:9000");
        assert!(config.backend.enabled);
        assert_eq!(config.generation.default_model, "gemini-2.5-flash");
        assert_eq!(config.compression.rate, "auto");
    }

    #[test]
    fn test_empty_sections_match_struct_defaults() {
        let config = SchedulerConfig::from_toml_str("[backend]\n[compression]\n[generation]\n")
            .unwrap();
        assert_eq!(config.backend, BackendConfig::default());
        assert_eq!(config.compression, CompressionConfig::default());
        assert_eq!(config.generation, GenerationConfig::default());
        assert_eq!(config.generation.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = SchedulerConfig::default();
        config.backend.timeout_secs = 0;
        config.compression.url = "ftp://nope".to_string();
        config.generation.temperature = 3.5;
        config.generation.max_output_tokens = 0;

        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 4, "got: {errors:?}");
                assert!(errors.iter().any(|e| e.contains("backend.timeout_secs")));
                assert!(errors.iter().any(|e| e.contains("compression.url")));
                assert!(errors.iter().any(|e| e.contains("temperature")));
                assert!(errors.iter().any(|e| e.contains("max_output_tokens")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_nan_temperature_rejected() {
        let mut config = SchedulerConfig::default();
        config.generation.temperature = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip_preserves_values() {
        let mut config = SchedulerConfig::default();
        config.backend.client_errors_fatal = true;
        config.generation.thinking_budget = 512;
        let text = config.to_toml().unwrap();
        let back = SchedulerConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_parse_error_reported() {
        let err = SchedulerConfig::from_toml_str("[backend\nbase_url = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(..)));
    }

    #[test]
    fn test_validation_error_display_lists_items() {
        let err = ConfigError::Validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Config validation failed:\n  - a\n  - b");
    }
}
