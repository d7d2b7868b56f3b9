//! Endpoint handlers.
//!
//! Each handler takes the raw request input (query parameters or a JSON
//! body), validates it and returns a status code with a JSON body, so any
//! HTTP front-end or the CLI can serve them unchanged.
//!
//! | endpoint | method | success body |
//! |---|---|---|
//! | `/` | GET | `{"status": "ok", "message": ...}` |
//! | `/chat` | POST | [`ChatOutcome`] |
//! | `/battle` | GET | [`BattleOutcome`] |
//!
//! Errors are `{"detail": "..."}` with status 404, 422 or 500.

use crate::error::PokedexError;
use crate::service::{BattleOutcome, ChatOutcome, PokedexService};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};

/// Accepted length of a battle parameter, in characters, after trimming.
pub const NAME_LENGTH: std::ops::RangeInclusive<usize> = 2..=50;

/// Status and JSON body of a handled request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The `detail` message of an error response.
    pub fn detail(&self) -> Option<&str> {
        self.body.get("detail").and_then(Value::as_str)
    }
}

impl From<PokedexError> for ApiResponse {
    fn from(err: PokedexError) -> Self {
        let status = err.status_code();
        if status >= 500 {
            error!(
                error = %err,
                rate_limited = err.is_rate_limited(),
                "request failed"
            );
        } else {
            info!(status, detail = %err, "request rejected");
        }
        Self {
            status,
            body: json!({ "detail": err.public_message() }),
        }
    }
}

/// Query parameters of the battle endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BattleQuery {
    pub pokemon1: Option<String>,
    pub pokemon2: Option<String>,
}

impl BattleQuery {
    pub fn new(pokemon1: impl Into<String>, pokemon2: impl Into<String>) -> Self {
        Self {
            pokemon1: Some(pokemon1.into()),
            pokemon2: Some(pokemon2.into()),
        }
    }

    /// Build from decoded `key=value` pairs; unknown keys are ignored.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                "pokemon1" => query.pokemon1 = Some(value.into()),
                "pokemon2" => query.pokemon2 = Some(value.into()),
                _ => {}
            }
        }
        query
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: Option<String>,
}

/// The request handlers over a [`PokedexService`].
pub struct PokedexApi {
    service: PokedexService,
}

impl PokedexApi {
    pub fn new(service: PokedexService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &PokedexService {
        &self.service
    }

    /// `GET /`
    pub fn health(&self) -> ApiResponse {
        ApiResponse::ok(json!({
            "status": "ok",
            "message": "Pokemon API is running",
        }))
    }

    /// `POST /chat` with a JSON body `{"message": "..."}`.
    pub async fn chat(&self, body: &str) -> ApiResponse {
        match self.try_chat(body).await {
            Ok(outcome) => respond(&outcome),
            Err(err) => err.into(),
        }
    }

    /// `GET /battle?pokemon1=...&pokemon2=...`
    pub async fn battle(&self, query: &BattleQuery) -> ApiResponse {
        match self.try_battle(query).await {
            Ok(outcome) => respond(&outcome),
            Err(err) => err.into(),
        }
    }

    async fn try_chat(&self, body: &str) -> Result<ChatOutcome, PokedexError> {
        let request: ChatRequest = serde_json::from_str(body)
            .map_err(|e| PokedexError::validation("body", format!("invalid JSON: {e}")))?;
        let message = required("message", request.message.as_deref())?;
        self.service.chat(message).await
    }

    async fn try_battle(&self, query: &BattleQuery) -> Result<BattleOutcome, PokedexError> {
        let pokemon1 = battle_name("pokemon1", query.pokemon1.as_deref())?;
        let pokemon2 = battle_name("pokemon2", query.pokemon2.as_deref())?;
        self.service.battle(pokemon1, pokemon2).await
    }
}

fn respond<T: Serialize>(outcome: &T) -> ApiResponse {
    match serde_json::to_value(outcome) {
        Ok(body) => ApiResponse::ok(body),
        Err(e) => PokedexError::Internal(format!("failed to encode response: {e}")).into(),
    }
}

fn required<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, PokedexError> {
    let value = value.ok_or_else(|| PokedexError::validation(field, "field required"))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(PokedexError::validation(field, "must not be empty"));
    }
    Ok(value)
}

fn battle_name<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, PokedexError> {
    let value = required(field, value)?;
    if !NAME_LENGTH.contains(&value.chars().count()) {
        return Err(PokedexError::validation(
            field,
            format!(
                "must be between {} and {} characters",
                NAME_LENGTH.start(),
                NAME_LENGTH.end()
            ),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        assert_eq!(required("message", Some("  hi ")).unwrap(), "hi");
        let err = required("message", None).unwrap_err();
        assert_eq!(err.public_message(), "message: field required");
        let err = required("message", Some("   ")).unwrap_err();
        assert_eq!(err.public_message(), "message: must not be empty");
    }

    #[test]
    fn test_battle_name_length() {
        assert!(battle_name("pokemon1", Some("Mew")).is_ok());
        assert!(battle_name("pokemon1", Some("M")).is_err());
        let long = "a".repeat(51);
        let err = battle_name("pokemon2", Some(&long)).unwrap_err();
        assert_eq!(err.status_code(), 422);
        assert!(err.public_message().starts_with("pokemon2:"));
    }

    #[test]
    fn test_query_from_pairs() {
        let query = BattleQuery::from_pairs([("pokemon1", "Pikachu"), ("page", "2")]);
        assert_eq!(query.pokemon1.as_deref(), Some("Pikachu"));
        assert_eq!(query.pokemon2, None);
    }

    #[test]
    fn test_error_response_body() {
        let response: ApiResponse = PokedexError::NotFound {
            name: "Agumon".to_string(),
            suggestion: None,
        }
        .into();
        assert_eq!(response.status, 404);
        assert_eq!(response.detail(), Some("Pokemon 'Agumon' not found."));
    }
}
