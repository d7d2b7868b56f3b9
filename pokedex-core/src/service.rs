//! Request orchestration: dispatch, research, battle.

use crate::agents::{
    AgentSettings, DispatchResult, ExpertAgent, LanguageModel, ResearchAgent, ResearchContext,
    SupervisorAgent, MAX_POKEMON_NAMES,
};
use crate::battle::BattleVerdict;
use crate::config::PokedexConfig;
use crate::error::PokedexError;
use crate::names::{enforce_requested_names, PokemonName};
use crate::pokeapi::{PokeApiClient, PokemonSource};
use crate::pokemon::PokemonRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOutcome {
    pub dispatch: DispatchResult,
    /// Every researched Pokemon, keyed by display name.
    pub pokemon: BTreeMap<String, PokemonRecord>,
    /// Present only when the message named two Pokemon.
    pub battle: Option<BattleVerdict>,
}

/// Result of a battle request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleOutcome {
    pub pokemon1: PokemonRecord,
    pub pokemon2: PokemonRecord,
    pub battle_analysis: BattleVerdict,
}

/// The three agents wired to one data source and one model.
///
/// Holds no per-request state; every call does its own lookups.
pub struct PokedexService {
    source: Arc<dyn PokemonSource>,
    supervisor: SupervisorAgent,
    researcher: ResearchAgent,
    expert: ExpertAgent,
}

impl PokedexService {
    pub fn new(
        source: Arc<dyn PokemonSource>,
        model: Option<Arc<dyn LanguageModel>>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            supervisor: SupervisorAgent::new(model.clone(), settings.clone()),
            researcher: ResearchAgent::new(source.clone(), model.clone(), settings.clone()),
            source,
            expert: ExpertAgent::new(model, settings),
        }
    }

    /// Build the service against PokeAPI and, when a key is configured, Claude.
    pub fn from_config(config: &PokedexConfig) -> Self {
        let source: Arc<dyn PokemonSource> =
            Arc::new(PokeApiClient::new(config.pokeapi_base_url.clone()));
        let model: Option<Arc<dyn LanguageModel>> = match config.claude_client() {
            Some(client) => Some(Arc::new(client)),
            None => {
                warn!("ANTHROPIC_API_KEY not set, running without a language model");
                None
            }
        };
        let settings = AgentSettings {
            model: None,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };
        Self::new(source, model, settings)
    }

    /// Research a single Pokemon.
    pub async fn lookup(&self, name: &str) -> Result<PokemonRecord, PokedexError> {
        self.researcher.research(name, ResearchContext::Single).await
    }

    /// Research both Pokemon concurrently, then judge the battle.
    ///
    /// The verdict's names are exactly `pokemon1` and `pokemon2` as given
    /// (trimmed).
    pub async fn battle(
        &self,
        pokemon1: &str,
        pokemon2: &str,
    ) -> Result<BattleOutcome, PokedexError> {
        let requested_1 = pokemon1.trim();
        let requested_2 = pokemon2.trim();
        info!(pokemon1 = requested_1, pokemon2 = requested_2, "battle requested");

        let (first, second) = futures::try_join!(
            self.researcher.research(
                requested_1,
                ResearchContext::Comparison {
                    opponent: requested_2
                }
            ),
            self.researcher.research(
                requested_2,
                ResearchContext::Comparison {
                    opponent: requested_1
                }
            ),
        )?;

        let mut verdict = self
            .expert
            .analyze(&first, &second, requested_1, requested_2)
            .await?;

        let correction = enforce_requested_names(&mut verdict, requested_1, requested_2);
        if correction.corrected {
            warn!(requested_1, requested_2, "battle verdict names restored");
        }

        info!(winner = %verdict.winner, "battle decided");
        Ok(BattleOutcome {
            pokemon1: first,
            pokemon2: second,
            battle_analysis: verdict,
        })
    }

    /// Handle a free-text chat message.
    ///
    /// Names the model gives are researched as-is, so a misspelling is a
    /// `NotFound`. Names guessed from capitalized words are kept only when
    /// the data source knows them.
    pub async fn chat(&self, message: &str) -> Result<ChatOutcome, PokedexError> {
        let mut dispatch = self.supervisor.dispatch(message).await?;
        if !dispatch.unverified.is_empty() {
            dispatch = self.confirm_guesses(dispatch).await?;
        }
        let mut pokemon = BTreeMap::new();
        let mut battle = None;

        match dispatch.pokemon_names.as_slice() {
            _ if !dispatch.is_pokemon_query => {}
            [] => {}
            [name] => {
                let record = self.lookup(name).await?;
                pokemon.insert(record.display_name.clone(), record);
            }
            [first, second, ..] => {
                let outcome = self.battle(first, second).await?;
                pokemon.insert(outcome.pokemon1.display_name.clone(), outcome.pokemon1);
                pokemon.insert(outcome.pokemon2.display_name.clone(), outcome.pokemon2);
                battle = Some(outcome.battle_analysis);
            }
        }

        Ok(ChatOutcome {
            dispatch,
            pokemon,
            battle,
        })
    }

    async fn confirm_guesses(
        &self,
        dispatch: DispatchResult,
    ) -> Result<DispatchResult, PokedexError> {
        let mut confirmed = Vec::new();
        for guess in &dispatch.unverified {
            let Ok(name) = PokemonName::parse(guess) else {
                continue;
            };
            if self.source.fetch(&name).await?.is_some() {
                confirmed.push(guess.clone());
                if confirmed.len() == MAX_POKEMON_NAMES {
                    break;
                }
            }
        }

        info!(guesses = ?dispatch.unverified, confirmed = ?confirmed, "checked guessed names");
        Ok(dispatch.with_confirmed_names(&confirmed))
    }
}
