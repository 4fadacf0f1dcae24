//! Runtime configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `GEMINI_API_KEY` (or `API_KEY`) - key for the generative-language API.
//!   When absent the assistant answers with its fallback message.
//! - `GEMINI_MODEL` - model id (default: gemini-3-flash-preview)
//! - `GEMINI_BASE_URL` - API base URL (default: https://generativelanguage.googleapis.com)
//! - `MENTA_AI_TIMEOUT_SECS` - request timeout for the assistant (default: 30)
//! - `MENTA_AUTH_DELAY_MS` - simulated latency of login/registration (default: 1200)
//! - `MENTA_RESET_DELAY_MS` - simulated latency of password reset (default: 1500)
//! - `MENTA_LOG_DIR` - optional directory for daily rolling log files

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_AI_TIMEOUT_SECS: u64 = 30;
const DEFAULT_AUTH_DELAY_MS: u64 = 1200;
const DEFAULT_RESET_DELAY_MS: u64 = 1500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Settings for the generative-language adapter.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub assistant: AssistantConfig,
    pub auth_delay: Duration,
    pub reset_delay: Duration,
    pub log_dir: Option<PathBuf>,
    /// bcrypt cost used when hashing new passwords.
    pub hash_cost: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            assistant: AssistantConfig {
                api_key: None,
                model: DEFAULT_GEMINI_MODEL.to_string(),
                base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
                timeout: Duration::from_secs(DEFAULT_AI_TIMEOUT_SECS),
            },
            auth_delay: Duration::from_millis(DEFAULT_AUTH_DELAY_MS),
            reset_delay: Duration::from_millis(DEFAULT_RESET_DELAY_MS),
            log_dir: None,
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let api_key = get("GEMINI_API_KEY").or_else(|| get("API_KEY"));
        let model = get("GEMINI_MODEL").unwrap_or(defaults.assistant.model);
        let base_url = get("GEMINI_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.assistant.base_url);
        let timeout = match get("MENTA_AI_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_u64("MENTA_AI_TIMEOUT_SECS", &raw)?),
            None => defaults.assistant.timeout,
        };
        let auth_delay = match get("MENTA_AUTH_DELAY_MS") {
            Some(raw) => Duration::from_millis(parse_u64("MENTA_AUTH_DELAY_MS", &raw)?),
            None => defaults.auth_delay,
        };
        let reset_delay = match get("MENTA_RESET_DELAY_MS") {
            Some(raw) => Duration::from_millis(parse_u64("MENTA_RESET_DELAY_MS", &raw)?),
            None => defaults.reset_delay,
        };

        Ok(Self {
            assistant: AssistantConfig {
                api_key,
                model,
                base_url,
                timeout,
            },
            auth_delay,
            reset_delay,
            log_dir: get("MENTA_LOG_DIR").map(PathBuf::from),
            hash_cost: defaults.hash_cost,
        })
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert!(config.assistant.api_key.is_none());
        assert_eq!(config.assistant.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.assistant.base_url, DEFAULT_GEMINI_BASE_URL);
        assert_eq!(config.auth_delay, Duration::from_millis(1200));
        assert_eq!(config.reset_delay, Duration::from_millis(1500));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_api_key_falls_back_to_generic_name() {
        let config = AppConfig::from_lookup(lookup_from(&[("API_KEY", " abc ")])).unwrap();
        assert_eq!(config.assistant.api_key.as_deref(), Some("abc"));

        let config = AppConfig::from_lookup(lookup_from(&[
            ("API_KEY", "generic"),
            ("GEMINI_API_KEY", "specific"),
        ]))
        .unwrap();
        assert_eq!(config.assistant.api_key.as_deref(), Some("specific"));
    }

    #[test]
    fn test_overrides_and_trailing_slash() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("GEMINI_BASE_URL", "http://localhost:8080/"),
            ("MENTA_AUTH_DELAY_MS", "0"),
            ("MENTA_LOG_DIR", "/tmp/menta"),
        ]))
        .unwrap();
        assert_eq!(config.assistant.base_url, "http://localhost:8080");
        assert_eq!(config.auth_delay, Duration::ZERO);
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/menta")));
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("MENTA_RESET_DELAY_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("MENTA_RESET_DELAY_MS"));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_process_environment() {
        std::env::set_var("MENTA_AI_TIMEOUT_SECS", "5");
        let config = AppConfig::from_env();
        std::env::remove_var("MENTA_AI_TIMEOUT_SECS");
        assert_eq!(config.unwrap().assistant.timeout, Duration::from_secs(5));
    }
}
