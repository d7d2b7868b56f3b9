//! Normalized Pokemon records.
//!
//! A [`PokemonRecord`] is built once per request by the research stage and
//! never mutated afterwards; the battle heuristic and the endpoint responses
//! only read it.

pub mod types;

pub use types::{describe_multiplier, PokemonType, UnknownType};

use crate::names::PokemonName;
use serde::{Deserialize, Serialize};

/// The six base stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub special_attack: u32,
    pub special_defense: u32,
    pub speed: u32,
}

impl BaseStats {
    pub fn new(
        hp: u32,
        attack: u32,
        defense: u32,
        special_attack: u32,
        special_defense: u32,
        speed: u32,
    ) -> Self {
        Self {
            hp,
            attack,
            defense,
            special_attack,
            special_defense,
            speed,
        }
    }

    /// Base stat total.
    pub fn total(&self) -> u32 {
        self.hp
            + self.attack
            + self.defense
            + self.special_attack
            + self.special_defense
            + self.speed
    }

    /// The highest stat and its label.
    pub fn best(&self) -> (&'static str, u32) {
        self.labeled()
            .into_iter()
            .fold(("hp", 0), |best, stat| if stat.1 > best.1 { stat } else { best })
    }

    /// The lowest stat and its label.
    pub fn worst(&self) -> (&'static str, u32) {
        self.labeled()
            .into_iter()
            .fold(("hp", u32::MAX), |worst, stat| {
                if stat.1 < worst.1 {
                    stat
                } else {
                    worst
                }
            })
    }

    fn labeled(&self) -> [(&'static str, u32); 6] {
        [
            ("hp", self.hp),
            ("attack", self.attack),
            ("defense", self.defense),
            ("special attack", self.special_attack),
            ("special defense", self.special_defense),
            ("speed", self.speed),
        ]
    }
}

/// A normalized Pokemon, as produced by the research stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonRecord {
    /// Canonical lowercase name (the data source key).
    pub name: String,
    /// Capitalized form for display.
    pub display_name: String,
    pub base_stats: BaseStats,
    /// One or two types, in slot order.
    pub types: Vec<PokemonType>,
    pub abilities: Vec<String>,
    /// Height in meters.
    pub height: f32,
    /// Weight in kilograms.
    pub weight: f32,
    /// Front sprite image, when the data source has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprite_url: Option<String>,
    /// Free-text detail lines from the researcher.
    #[serde(default)]
    pub details: Vec<String>,
    /// Suggested follow-up queries.
    #[serde(default)]
    pub research_queries: Vec<String>,
}

impl PokemonRecord {
    /// Create a record with no researcher text yet.
    pub fn new(
        name: &PokemonName,
        base_stats: BaseStats,
        types: Vec<PokemonType>,
        abilities: Vec<String>,
        height: f32,
        weight: f32,
    ) -> Self {
        Self {
            name: name.canonical().to_string(),
            display_name: name.display().to_string(),
            base_stats,
            types,
            abilities,
            height,
            weight,
            sprite_url: None,
            details: Vec::new(),
            research_queries: Vec::new(),
        }
    }

    pub fn with_sprite(mut self, sprite_url: Option<String>) -> Self {
        self.sprite_url = sprite_url;
        self
    }

    /// Attach researcher output.
    pub fn with_research(mut self, details: Vec<String>, research_queries: Vec<String>) -> Self {
        self.details = details;
        self.research_queries = research_queries;
        self
    }

    /// Types joined for prompts and prose, e.g. "Grass/Poison".
    pub fn type_label(&self) -> String {
        self.types
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Whether the record carries the given ability (case-insensitive).
    pub fn has_ability(&self, ability: &str) -> bool {
        self.abilities
            .iter()
            .any(|a| a.eq_ignore_ascii_case(ability))
    }
}
