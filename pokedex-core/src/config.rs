//! Service configuration.

use crate::pokeapi::DEFAULT_BASE_URL;
use claude::Claude;
use thiserror::Error;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Configuration for the Pokedex service.
#[derive(Debug, Clone, PartialEq)]
pub struct PokedexConfig {
    /// Anthropic API key. Without one the service runs without a language
    /// model: dispatch falls back to name extraction and verdicts are
    /// written from the heuristic alone.
    pub api_key: Option<String>,

    /// Model to use for every agent.
    pub model: String,

    /// Maximum tokens per completion.
    pub max_tokens: usize,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// PokeAPI root.
    pub pokeapi_base_url: String,

    /// Messages API root, for proxies and gateways. `None` uses Anthropic's.
    pub anthropic_base_url: Option<String>,
}

impl Default for PokedexConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1024,
            temperature: Some(0.2),
            pokeapi_base_url: DEFAULT_BASE_URL.to_string(),
            anthropic_base_url: None,
        }
    }
}

impl PokedexConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from the process environment.
    ///
    /// Unset or empty variables keep their defaults. Call
    /// `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        config.api_key = get("ANTHROPIC_API_KEY");
        if let Some(model) = get("POKEDEX_MODEL") {
            config.model = model;
        }
        if let Some(raw) = get("POKEDEX_MAX_TOKENS") {
            config.max_tokens = match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "POKEDEX_MAX_TOKENS",
                        expected: "a positive integer",
                        value: raw,
                    })
                }
            };
        }
        if let Some(raw) = get("POKEDEX_TEMPERATURE") {
            config.temperature = match raw.parse::<f32>() {
                Ok(t) if (0.0..=1.0).contains(&t) => Some(t),
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "POKEDEX_TEMPERATURE",
                        expected: "a number between 0 and 1",
                        value: raw,
                    })
                }
            };
        }
        if let Some(url) = get("POKEAPI_BASE_URL") {
            config.pokeapi_base_url = url;
        }
        config.anthropic_base_url = get("ANTHROPIC_BASE_URL");

        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_pokeapi_base_url(mut self, url: impl Into<String>) -> Self {
        self.pokeapi_base_url = url.into();
        self
    }

    pub fn with_anthropic_base_url(mut self, url: impl Into<String>) -> Self {
        self.anthropic_base_url = Some(url.into());
        self
    }

    /// Whether a language model can be used.
    pub fn has_language_model(&self) -> bool {
        self.api_key.is_some()
    }

    /// A Claude client for the configured key, model and host.
    pub fn claude_client(&self) -> Option<Claude> {
        let key = self.api_key.as_ref()?;
        let client = Claude::new(key.clone()).with_model(self.model.clone());
        Some(match &self.anthropic_base_url {
            Some(url) => client.with_base_url(url.clone()),
            None => client,
        })
    }
}
