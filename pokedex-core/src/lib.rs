//! Pokemon research and battle analysis.
//!
//! This crate provides:
//! - A supervisor agent that classifies messages and extracts Pokemon names
//! - A research agent backed by PokeAPI
//! - A battle heuristic over the full type chart, base stats and speed
//! - A name-correction safeguard that pins verdicts to the caller's names
//! - Transport-neutral endpoint handlers
//!
//! # Quick Start
//!
//! ```ignore
//! use pokedex_core::{PokedexConfig, PokedexService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     dotenvy::dotenv().ok();
//!     let config = PokedexConfig::from_env()?;
//!     let service = PokedexService::from_config(&config);
//!
//!     let outcome = service.battle("Pikachu", "Bulbasaur").await?;
//!     println!("{} wins", outcome.battle_analysis.winner);
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod api;
pub mod battle;
pub mod config;
pub mod error;
pub mod names;
pub mod pokeapi;
pub mod pokemon;
pub mod service;
pub mod testing;

// Re-export for convenience
pub use pokedex_macros::StructuredOutput;

// Primary public API
pub use api::{ApiResponse, BattleQuery, PokedexApi};
pub use battle::{assess, BattleAssessment, BattleVerdict, Side};
pub use config::{ConfigError, PokedexConfig};
pub use error::PokedexError;
pub use names::{enforce_requested_names, suggest_name, PokemonName};
pub use pokeapi::{PokeApiClient, PokemonSource, SourceError};
pub use pokemon::{BaseStats, PokemonRecord, PokemonType};
pub use service::{BattleOutcome, ChatOutcome, PokedexService};
pub use testing::{MockModel, StaticPokedex};
