//! Configuration management for the crew bridge.
//!
//! Configuration is read once at startup from environment variables:
//! - `OPENAI_API_KEY` - Required. API key for the chat-completions endpoint.
//! - `OPENAI_DEFAULT_MODEL` - Optional. Model identifier. Defaults to `gpt-4o-mini`.
//! - `OPENAI_BASE_URL` - Optional. OpenAI-compatible API root. Defaults to `https://api.openai.com/v1`.
//! - `OPENAI_TEMPERATURE` - Optional. Sampling temperature. Defaults to `0.7`.
//! - `CREW_STRICT_AGENT_REFS` - Optional. Reject tasks whose `agent_id` is unknown
//!   instead of reassigning them to the first agent. Defaults to `false`.
//!
//! A `.env` file in the working directory (or its parent, where the calling
//! application keeps its own `.env`) is loaded first if present.

use std::path::Path;
use thiserror::Error;

use crate::util::parse_bool;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const MODEL_VAR: &str = "OPENAI_DEFAULT_MODEL";
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const TEMPERATURE_VAR: &str = "OPENAI_TEMPERATURE";
pub const STRICT_REFS_VAR: &str = "CREW_STRICT_AGENT_REFS";

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not configured")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Runtime configuration shared by all entry points.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the LLM provider
    pub api_key: String,

    /// Model identifier used for every agent unless overridden per agent
    pub model: String,

    /// OpenAI-compatible API root (without `/chat/completions`)
    pub base_url: String,

    /// Default sampling temperature
    pub temperature: f64,

    /// Whether unknown task → agent references are a hard error
    pub strict_agent_refs: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENAI_API_KEY` is unset or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from any variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = var(API_KEY_VAR)
            .ok_or_else(|| ConfigError::MissingEnvVar(API_KEY_VAR.to_string()))?;

        let model = var(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let base_url = var(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let temperature = match var(TEMPERATURE_VAR) {
            Some(raw) => raw.trim().parse::<f64>().map_err(|e| {
                ConfigError::InvalidValue(TEMPERATURE_VAR.to_string(), format!("{}", e))
            })?,
            None => DEFAULT_TEMPERATURE,
        };

        let strict_agent_refs = var(STRICT_REFS_VAR)
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        Ok(Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            temperature,
            strict_agent_refs,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            strict_agent_refs: false,
        }
    }
}

/// Load `.env` from the working directory, then from its parent.
///
/// Variables already present in the process environment win, so the calling
/// application can always override what the files say.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }
    let parent = Path::new("..").join(".env");
    if parent.is_file() {
        match dotenvy::from_path(&parent) {
            Ok(()) => tracing::debug!("Loaded environment from {}", parent.display()),
            Err(e) => tracing::warn!("Could not read {}: {}", parent.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::BridgeError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serializes tests that touch the real process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn new_uses_defaults() {
        let config = Config::new("sk-test", "gpt-4o");
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.temperature, 0.7);
        assert!(!config.strict_agent_refs);
    }

    #[test]
    fn missing_key_message_names_the_variable() {
        let err = ConfigError::MissingEnvVar(API_KEY_VAR.to_string());
        assert_eq!(err.to_string(), "OPENAI_API_KEY not configured");
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn missing_or_blank_key_is_reported() {
        for vars in [vec![], vec![(API_KEY_VAR, "   ")]] {
            let err = Config::from_lookup(lookup(&vars)).unwrap_err();
            assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == API_KEY_VAR));
            assert_eq!(err.to_string(), "OPENAI_API_KEY not configured");
            assert!(matches!(
                BridgeError::from(err),
                BridgeError::MissingCredential(_)
            ));
        }
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let config = Config::from_lookup(lookup(&[(API_KEY_VAR, "sk-live")])).unwrap();
        assert_eq!(config.api_key, "sk-live");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
        assert!(!config.strict_agent_refs);
    }

    #[test]
    fn overrides_are_read() {
        let config = Config::from_lookup(lookup(&[
            (API_KEY_VAR, "sk-live"),
            (MODEL_VAR, "gpt-4o"),
            (BASE_URL_VAR, "http://localhost:8080/v1/"),
            (TEMPERATURE_VAR, " 0.2 "),
            (STRICT_REFS_VAR, "1"),
        ]))
        .unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.temperature, 0.2);
        assert!(config.strict_agent_refs);
    }

    #[test]
    fn unparsable_temperature_is_a_configuration_error() {
        let err = Config::from_lookup(lookup(&[
            (API_KEY_VAR, "sk-live"),
            (TEMPERATURE_VAR, "warm"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v, _) if v == TEMPERATURE_VAR));
        assert!(matches!(
            BridgeError::from(err),
            BridgeError::Configuration(_)
        ));
    }

    #[test]
    fn from_env_reads_the_process_environment() {
        let _guard = ENV_LOCK.lock().unwrap();
        let saved: Vec<_> = [API_KEY_VAR, MODEL_VAR]
            .iter()
            .map(|name| (*name, std::env::var(name).ok()))
            .collect();

        std::env::remove_var(API_KEY_VAR);
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingEnvVar(_))
        ));

        std::env::set_var(API_KEY_VAR, "sk-env");
        std::env::set_var(MODEL_VAR, "gpt-4o");
        let config = Config::from_env().unwrap();
        assert_eq!(config.api_key, "sk-env");
        assert_eq!(config.model, "gpt-4o");

        for (name, value) in saved {
            match value {
                Some(v) => std::env::set_var(name, v),
                None => std::env::remove_var(name),
            }
        }
    }
}
