//! Testing utilities for the Pokedex service.
//!
//! This module provides test doubles for both collaborators:
//! - `MockModel` returns scripted structured outputs without API calls
//! - `StaticPokedex` is an in-memory data source with sample records

use crate::agents::LanguageModel;
use crate::names::PokemonName;
use crate::pokeapi::{PokemonSource, SourceError};
use crate::pokemon::{BaseStats, PokemonRecord, PokemonType};
use async_trait::async_trait;
use claude::{ContentBlock, Request, Response, StopReason, Usage};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

/// A scripted reply from the mock model.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Call the forced tool with this input.
    Output(Value),
    /// Answer in plain text instead of calling the tool.
    Text(String),
    /// Fail with a rate-limit error.
    RateLimited,
    /// Fail with an API error.
    ApiError { status: u16, message: String },
}

/// A language model that returns scripted replies.
///
/// Replies are keyed by the tool the request forces, so one mock can serve
/// the supervisor, researcher and expert at once. Each key plays its replies
/// in order and repeats the last one once the queue is down to it.
#[derive(Default)]
pub struct MockModel {
    replies: Mutex<HashMap<String, VecDeque<MockReply>>>,
    requests: Mutex<Vec<Request>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for requests forcing `tool`.
    pub fn with_reply(self, tool: impl Into<String>, reply: MockReply) -> Self {
        self.queue(tool, reply);
        self
    }

    /// Queue a structured output for `tool`.
    pub fn with_output(self, tool: impl Into<String>, input: Value) -> Self {
        self.with_reply(tool, MockReply::Output(input))
    }

    /// Queue a plain-text reply that ignores the forced tool.
    pub fn with_text(self, tool: impl Into<String>, text: impl Into<String>) -> Self {
        self.with_reply(tool, MockReply::Text(text.into()))
    }

    /// Queue a rate-limit failure for `tool`.
    pub fn with_rate_limit(self, tool: impl Into<String>) -> Self {
        self.with_reply(tool, MockReply::RateLimited)
    }

    /// Add a reply after construction.
    pub fn queue(&self, tool: impl Into<String>, reply: MockReply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.entry(tool.into()).or_default().push_back(reply);
        }
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// How many requests forced `tool`.
    pub fn calls(&self, tool: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.forced_tool() == Some(tool))
            .count()
    }

    fn next_reply(&self, tool: &str) -> Option<MockReply> {
        let mut replies = self.replies.lock().ok()?;
        let queue = replies.get_mut(tool)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn complete(&self, request: Request) -> Result<Response, claude::Error> {
        let tool = request.forced_tool().unwrap_or_default().to_string();
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let content = match self.next_reply(&tool) {
            Some(MockReply::Output(input)) => ContentBlock::ToolUse {
                id: format!("toolu_mock_{tool}"),
                name: tool.clone(),
                input,
            },
            Some(MockReply::Text(text)) => ContentBlock::Text { text },
            Some(MockReply::RateLimited) => {
                return Err(claude::Error::RateLimited { retry_after: None })
            }
            Some(MockReply::ApiError { status, message }) => {
                return Err(claude::Error::Api { status, message })
            }
            None => {
                return Err(claude::Error::Api {
                    status: 500,
                    message: format!("no scripted reply for `{tool}`"),
                })
            }
        };

        let stop_reason = match content {
            ContentBlock::ToolUse { .. } => StopReason::ToolUse,
            _ => StopReason::EndTurn,
        };
        Ok(Response {
            id: "msg_mock".to_string(),
            model: "mock".to_string(),
            content: vec![content],
            stop_reason,
            usage: Usage::default(),
        })
    }
}

/// An in-memory data source.
#[derive(Default)]
pub struct StaticPokedex {
    records: BTreeMap<String, PokemonRecord>,
    failure: Mutex<Option<SourceError>>,
}

impl StaticPokedex {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source holding every record from [`sample_record`].
    pub fn with_samples() -> Self {
        SAMPLE_NAMES
            .iter()
            .filter_map(|name| sample_record(name))
            .fold(Self::new(), Self::with_record)
    }

    pub fn with_record(mut self, record: PokemonRecord) -> Self {
        self.records.insert(record.name.clone(), record);
        self
    }

    /// Make the next `fetch` fail with `error`.
    pub fn fail_next(&self, error: SourceError) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(error);
        }
    }
}

#[async_trait]
impl PokemonSource for StaticPokedex {
    async fn fetch(&self, name: &PokemonName) -> Result<Option<PokemonRecord>, SourceError> {
        if let Some(error) = self.failure.lock().ok().and_then(|mut f| f.take()) {
            return Err(error);
        }
        Ok(self.records.get(name.canonical()).cloned())
    }

    async fn known_names(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.records.keys().cloned().collect())
    }
}

/// Names available from [`sample_record`].
pub const SAMPLE_NAMES: &[&str] = &[
    "bulbasaur",
    "charmander",
    "charizard",
    "squirtle",
    "pikachu",
    "raichu",
    "venonat",
    "geodude",
    "gastly",
    "snorlax",
];

/// A real Pokemon with its base stats, types and abilities.
pub fn sample_record(name: &str) -> Option<PokemonRecord> {
    use PokemonType::*;

    let (stats, types, abilities, height, weight): (_, &[PokemonType], &[&str], f32, f32) =
        match name {
            "bulbasaur" => (
                BaseStats::new(45, 49, 49, 65, 65, 45),
                &[Grass, Poison],
                &["overgrow", "chlorophyll"],
                0.7,
                6.9,
            ),
            "charmander" => (
                BaseStats::new(39, 52, 43, 60, 50, 65),
                &[Fire],
                &["blaze", "solar-power"],
                0.6,
                8.5,
            ),
            "charizard" => (
                BaseStats::new(78, 84, 78, 109, 85, 100),
                &[Fire, Flying],
                &["blaze", "solar-power"],
                1.7,
                90.5,
            ),
            "squirtle" => (
                BaseStats::new(44, 48, 65, 50, 64, 43),
                &[Water],
                &["torrent", "rain-dish"],
                0.5,
                9.0,
            ),
            "pikachu" => (
                BaseStats::new(35, 55, 40, 50, 50, 90),
                &[Electric],
                &["static", "lightning-rod"],
                0.4,
                6.0,
            ),
            "raichu" => (
                BaseStats::new(60, 90, 55, 90, 80, 110),
                &[Electric],
                &["static", "lightning-rod"],
                0.8,
                30.0,
            ),
            "venonat" => (
                BaseStats::new(60, 55, 50, 40, 55, 45),
                &[Bug, Poison],
                &["compound-eyes", "tinted-lens", "run-away"],
                1.0,
                30.0,
            ),
            "geodude" => (
                BaseStats::new(40, 80, 100, 30, 30, 20),
                &[Rock, Ground],
                &["rock-head", "sturdy", "sand-veil"],
                0.4,
                20.0,
            ),
            "gastly" => (
                BaseStats::new(30, 35, 30, 100, 35, 80),
                &[Ghost, Poison],
                &["levitate"],
                1.3,
                0.1,
            ),
            "snorlax" => (
                BaseStats::new(160, 110, 65, 65, 110, 30),
                &[Normal],
                &["immunity", "thick-fat", "gluttony"],
                2.1,
                460.0,
            ),
            _ => return None,
        };

    let name = PokemonName::parse(name).ok()?;
    Some(PokemonRecord::new(
        &name,
        stats,
        types.to_vec(),
        abilities.iter().map(|a| a.to_string()).collect(),
        height,
        weight,
    ))
}
