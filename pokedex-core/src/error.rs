//! Error taxonomy for the Pokedex service.

use crate::pokeapi::SourceError;
use thiserror::Error;

/// Message returned to callers for any 500-class failure.
pub const UPSTREAM_FAILURE_MESSAGE: &str =
    "The Pokemon service is temporarily unavailable. Please try again later.";

/// Message returned to callers for unexpected failures.
pub const INTERNAL_FAILURE_MESSAGE: &str = "An unexpected error occurred.";

/// Errors surfaced by the service and endpoint layers.
#[derive(Debug, Error)]
pub enum PokedexError {
    /// The name could not be resolved by the data source.
    #[error("{}", not_found_message(.name, .suggestion.as_deref()))]
    NotFound {
        name: String,
        suggestion: Option<String>,
    },

    /// A request field is missing or malformed.
    #[error("{field}: {reason}")]
    Validation { field: String, reason: String },

    /// The language model failed or rate-limited.
    #[error("language model error: {0}")]
    Llm(#[from] claude::Error),

    /// The Pokemon data source failed or rate-limited.
    #[error("data source error: {0}")]
    DataSource(#[from] SourceError),

    #[error("internal error: {0}")]
    Internal(String),
}

fn not_found_message(name: &str, suggestion: Option<&str>) -> String {
    match suggestion {
        Some(suggestion) => {
            format!("Pokemon '{name}' not found. Did you mean '{suggestion}'?")
        }
        None => format!("Pokemon '{name}' not found."),
    }
}

impl PokedexError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// HTTP-equivalent status for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Validation { .. } => 422,
            Self::Llm(_) | Self::DataSource(_) | Self::Internal(_) => 500,
        }
    }

    /// Whether this is an upstream dependency failure.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Llm(_) | Self::DataSource(_))
    }

    /// Whether an upstream dependency rejected the call for rate limiting.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_rate_limited(),
            Self::DataSource(e) => e.is_rate_limited(),
            _ => false,
        }
    }

    /// Text safe to show the caller.
    ///
    /// NotFound and Validation carry their own detail; anything else is
    /// replaced by a generic message so upstream errors never leak.
    pub fn public_message(&self) -> String {
        match self {
            Self::NotFound { .. } | Self::Validation { .. } => self.to_string(),
            Self::Llm(_) | Self::DataSource(_) => UPSTREAM_FAILURE_MESSAGE.to_string(),
            Self::Internal(_) => INTERNAL_FAILURE_MESSAGE.to_string(),
        }
    }
}
