//! Pokemon data source.
//!
//! [`PokemonSource`] is the lookup seam the research stage depends on;
//! [`PokeApiClient`] implements it against the public PokeAPI.

use crate::names::PokemonName;
use crate::pokemon::{BaseStats, PokemonRecord, PokemonType};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

/// Default PokeAPI root.
pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";

/// Large enough to list every species in one page.
const LIST_LIMIT: u32 = 100_000;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("data source rate limit exceeded")]
    RateLimited,
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed record: {0}")]
    Malformed(String),
}

impl SourceError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SourceError::RateLimited)
    }
}

/// Name-keyed Pokemon lookup.
#[async_trait]
pub trait PokemonSource: Send + Sync {
    /// Fetch one record; `Ok(None)` when the name is unknown.
    async fn fetch(&self, name: &PokemonName) -> Result<Option<PokemonRecord>, SourceError>;

    /// Every name the source knows, lowercase. Used for suggestions.
    async fn known_names(&self) -> Result<Vec<String>, SourceError>;
}

/// HTTP client for PokeAPI.
pub struct PokeApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl PokeApiClient {
    /// Create a client for the given API root, e.g. `https://pokeapi.co/api/v2`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, url: &str) -> Result<Option<reqwest::Response>, SourceError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(Some(resp))
    }
}

impl Default for PokeApiClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait]
impl PokemonSource for PokeApiClient {
    async fn fetch(&self, name: &PokemonName) -> Result<Option<PokemonRecord>, SourceError> {
        let url = format!("{}/pokemon/{}", self.base_url, name.canonical());

        info!(url = %url, "fetching pokemon");
        let Some(resp) = self.get(&url).await? else {
            info!(name = name.canonical(), "pokemon not found");
            return Ok(None);
        };

        let body = resp.text().await?;
        let raw: RawPokemon = serde_json::from_str(&body)?;
        let record = raw.into_record(name)?;
        info!(
            name = %record.name,
            types = %record.type_label(),
            total = record.base_stats.total(),
            "fetched pokemon"
        );
        Ok(Some(record))
    }

    async fn known_names(&self) -> Result<Vec<String>, SourceError> {
        let url = format!("{}/pokemon?limit={}", self.base_url, LIST_LIMIT);

        info!(url = %url, "listing pokemon names");
        let Some(resp) = self.get(&url).await? else {
            return Ok(Vec::new());
        };
        let page: RawNameList = resp.json().await?;
        info!(count = page.results.len(), "listed pokemon names");
        Ok(page.results.into_iter().map(|r| r.name).collect())
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Deserialize)]
struct RawPokemon {
    name: String,
    /// Decimeters.
    height: u32,
    /// Hectograms.
    weight: u32,
    stats: Vec<RawStat>,
    types: Vec<RawTypeSlot>,
    abilities: Vec<RawAbilitySlot>,
    #[serde(default)]
    sprites: Option<RawSprites>,
}

#[derive(Deserialize)]
struct RawStat {
    base_stat: u32,
    stat: RawNamed,
}

#[derive(Deserialize)]
struct RawTypeSlot {
    slot: u32,
    #[serde(rename = "type")]
    kind: RawNamed,
}

#[derive(Deserialize)]
struct RawAbilitySlot {
    ability: RawNamed,
}

#[derive(Deserialize)]
struct RawSprites {
    front_default: Option<String>,
}

#[derive(Deserialize)]
struct RawNamed {
    name: String,
}

#[derive(Deserialize)]
struct RawNameList {
    results: Vec<RawNamed>,
}

impl RawPokemon {
    fn stat(&self, key: &str) -> Result<u32, SourceError> {
        self.stats
            .iter()
            .find(|s| s.stat.name == key)
            .map(|s| s.base_stat)
            .ok_or_else(|| SourceError::Malformed(format!("{} has no {key} stat", self.name)))
    }

    fn into_record(self, requested: &PokemonName) -> Result<PokemonRecord, SourceError> {
        let base_stats = BaseStats::new(
            self.stat("hp")?,
            self.stat("attack")?,
            self.stat("defense")?,
            self.stat("special-attack")?,
            self.stat("special-defense")?,
            self.stat("speed")?,
        );

        let mut slots: Vec<&RawTypeSlot> = self.types.iter().collect();
        slots.sort_by_key(|s| s.slot);
        let mut types = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot.kind.name.parse::<PokemonType>() {
                Ok(t) => types.push(t),
                Err(e) => warn!(pokemon = %self.name, error = %e, "skipping type"),
            }
        }
        if types.is_empty() {
            return Err(SourceError::Malformed(format!("{} has no known type", self.name)));
        }

        let name = PokemonName::parse(&self.name).unwrap_or_else(|_| requested.clone());
        let abilities = self.abilities.into_iter().map(|a| a.ability.name).collect();
        let sprite_url = self.sprites.and_then(|s| s.front_default);

        Ok(PokemonRecord::new(
            &name,
            base_stats,
            types,
            abilities,
            self.height as f32 / 10.0,
            self.weight as f32 / 10.0,
        )
        .with_sprite(sprite_url))
    }
}
