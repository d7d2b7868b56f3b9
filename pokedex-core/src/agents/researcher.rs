//! Research stage: data source lookup plus model-written detail lines.

use super::{ask, AgentSettings, LanguageModel};
use crate::error::PokedexError;
use crate::names::{suggest_name, PokemonName};
use crate::pokeapi::PokemonSource;
use crate::pokemon::PokemonRecord;
use pokedex_macros::StructuredOutput;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = include_str!("prompts/researcher.txt");
const COMPARISON_PROMPT: &str = include_str!("prompts/researcher_comparison.txt");

/// Whether a lookup stands alone or feeds a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchContext<'a> {
    Single,
    Comparison { opponent: &'a str },
}

/// Write up the researched Pokemon
#[derive(Debug, Clone, Deserialize, StructuredOutput)]
#[output(name = "research_pokemon")]
pub struct ResearchNotes {
    /// Short factual lines: stats, types, abilities, size, strengths and weaknesses
    pub pokemon_details: Vec<String>,
    /// Follow-up topics worth investigating
    #[serde(default)]
    pub research_queries: Vec<String>,
}

/// Looks Pokemon up and annotates them.
pub struct ResearchAgent {
    source: Arc<dyn PokemonSource>,
    model: Option<Arc<dyn LanguageModel>>,
    settings: AgentSettings,
}

impl ResearchAgent {
    pub fn new(
        source: Arc<dyn PokemonSource>,
        model: Option<Arc<dyn LanguageModel>>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            source,
            model,
            settings,
        }
    }

    /// Fetch `raw_name` and attach detail lines suited to `context`.
    ///
    /// An unknown name is `NotFound`, with a suggestion when a known name is
    /// close. Stats, types, abilities and size always come from the data
    /// source; the model only contributes text. Model output that is missing
    /// or malformed gives way to lines written from the record.
    pub async fn research(
        &self,
        raw_name: &str,
        context: ResearchContext<'_>,
    ) -> Result<PokemonRecord, PokedexError> {
        let name = PokemonName::parse(raw_name)
            .map_err(|e| PokedexError::validation("name", e.to_string()))?;

        let Some(record) = self.source.fetch(&name).await? else {
            return Err(self.not_found(raw_name, &name).await);
        };

        let (details, queries) = match &self.model {
            Some(model) => match ask::<ResearchNotes>(
                model.as_ref(),
                &self.settings,
                &system_prompt(context),
                research_prompt(&record, context),
            )
            .await
            {
                Ok(notes) => (notes.pokemon_details, notes.research_queries),
                Err(e @ (claude::Error::Parse(_) | claude::Error::MissingOutput(_))) => {
                    warn!(
                        error = %e,
                        pokemon = %record.name,
                        "research output unusable, summarizing record"
                    );
                    (summary_lines(&record), default_queries(&record, context))
                }
                Err(e) => return Err(e.into()),
            },
            None => (summary_lines(&record), default_queries(&record, context)),
        };

        info!(
            pokemon = %record.name,
            details = details.len(),
            comparison = matches!(context, ResearchContext::Comparison { .. }),
            "researched pokemon"
        );
        Ok(record.with_research(details, queries))
    }

    async fn not_found(&self, raw_name: &str, name: &PokemonName) -> PokedexError {
        let suggestion = match self.source.known_names().await {
            Ok(known) => suggest_name(name.canonical(), &known),
            Err(e) => {
                warn!(error = %e, "could not list names for suggestions");
                None
            }
        };
        info!(name = raw_name, suggestion = ?suggestion, "pokemon not found");
        PokedexError::NotFound {
            name: raw_name.trim().to_string(),
            suggestion,
        }
    }
}

fn system_prompt(context: ResearchContext<'_>) -> String {
    let mut prompt = String::from(SYSTEM_PROMPT);
    if let ResearchContext::Comparison { .. } = context {
        prompt.push_str("\n\n");
        prompt.push_str(COMPARISON_PROMPT);
    }
    prompt
}

fn research_prompt(record: &PokemonRecord, context: ResearchContext<'_>) -> String {
    let stats = &record.base_stats;
    let mut prompt = format!(
        "Pokemon: {}\nTypes: {}\nAbilities: {}\nBase stats: HP {}, Attack {}, Defense {}, Special Attack {}, Special Defense {}, Speed {} (total {})\nHeight: {} m\nWeight: {} kg",
        record.display_name,
        record.type_label(),
        record.abilities.join(", "),
        stats.hp,
        stats.attack,
        stats.defense,
        stats.special_attack,
        stats.special_defense,
        stats.speed,
        stats.total(),
        record.height,
        record.weight,
    );
    if let ResearchContext::Comparison { opponent } = context {
        prompt.push_str(&format!("\n\nIt is about to battle {opponent}."));
    }
    prompt
}

/// Detail lines written straight from the record.
fn summary_lines(record: &PokemonRecord) -> Vec<String> {
    let stats = &record.base_stats;
    let (best_label, best) = stats.best();
    let (worst_label, worst) = stats.worst();
    vec![
        format!("Type: {}", record.type_label()),
        format!("Abilities: {}", record.abilities.join(", ")),
        format!(
            "Base stats: HP {}, Attack {}, Defense {}, Sp. Atk {}, Sp. Def {}, Speed {} (total {})",
            stats.hp,
            stats.attack,
            stats.defense,
            stats.special_attack,
            stats.special_defense,
            stats.speed,
            stats.total()
        ),
        format!("Height: {} m, weight: {} kg", record.height, record.weight),
        format!("Highest stat: {best_label} ({best}); lowest: {worst_label} ({worst})"),
    ]
}

fn default_queries(record: &PokemonRecord, context: ResearchContext<'_>) -> Vec<String> {
    let name = &record.display_name;
    match context {
        ResearchContext::Single => vec![
            format!("{name} evolution line"),
            format!("{name} type weaknesses and resistances"),
            format!("{name} best moveset"),
        ],
        ResearchContext::Comparison { opponent } => vec![
            format!("{name} vs {opponent} type matchup"),
            format!("{name} best moves against {opponent}"),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockModel, StaticPokedex};
    use serde_json::json;

    fn agent(model: Option<MockModel>) -> (ResearchAgent, Option<Arc<MockModel>>) {
        let model = model.map(Arc::new);
        let dyn_model = model.clone().map(|m| m as Arc<dyn LanguageModel>);
        let agent = ResearchAgent::new(
            Arc::new(StaticPokedex::with_samples()),
            dyn_model,
            AgentSettings::default(),
        );
        (agent, model)
    }

    #[tokio::test]
    async fn test_research_keeps_authoritative_stats() {
        let model = MockModel::new().with_output(
            "research_pokemon",
            json!({
                "pokemon_details": ["Pikachu is an Electric mouse with 999 Speed"],
                "research_queries": ["Pikachu evolution"],
            }),
        );
        let (agent, _) = agent(Some(model));
        let record = agent
            .research("PIKACHU", ResearchContext::Single)
            .await
            .unwrap();

        assert_eq!(record.name, "pikachu");
        assert_eq!(record.base_stats.speed, 90);
        assert_eq!(record.details.len(), 1);
        assert_eq!(record.research_queries, vec!["Pikachu evolution"]);
    }

    #[tokio::test]
    async fn test_comparison_context_changes_prompt() {
        let model = MockModel::new().with_output(
            "research_pokemon",
            json!({"pokemon_details": ["Weak to Ground"], "research_queries": []}),
        );
        let (agent, model) = agent(Some(model));
        agent
            .research("Pikachu", ResearchContext::Comparison { opponent: "Bulbasaur" })
            .await
            .unwrap();

        let requests = model.unwrap().requests();
        let request = &requests[0];
        assert!(request.system.as_deref().unwrap().contains("being researched for a battle"));
        assert!(request.messages[0].text().contains("It is about to battle Bulbasaur."));
    }

    #[tokio::test]
    async fn test_unknown_name_suggests_close_match() {
        let (agent, _) = agent(None);
        let err = agent
            .research("Pikachuu", ResearchContext::Single)
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 404);
        let message = err.public_message();
        assert!(message.contains("Pikachuu"));
        assert!(message.contains("Did you mean 'pikachu'?"));
    }

    #[tokio::test]
    async fn test_unknown_name_without_suggestion() {
        let (agent, _) = agent(None);
        let err = agent
            .research("Agumon", ResearchContext::Single)
            .await
            .unwrap_err();
        assert!(matches!(err, PokedexError::NotFound { suggestion: None, .. }));
    }

    #[tokio::test]
    async fn test_offline_research_writes_summary() {
        let (agent, _) = agent(None);
        let record = agent
            .research("bulbasaur", ResearchContext::Comparison { opponent: "Pikachu" })
            .await
            .unwrap();

        assert!(record.details.iter().any(|d| d.contains("Grass/Poison")));
        assert_eq!(record.research_queries[0], "Bulbasaur vs Pikachu type matchup");
    }

    #[tokio::test]
    async fn test_unusable_output_falls_back_to_summary() {
        let model = MockModel::new().with_text("research_pokemon", "Pikachu is great.");
        let (plain_text, _) = agent(Some(model));
        let record = plain_text
            .research("Pikachu", ResearchContext::Single)
            .await
            .unwrap();
        assert!(record.details.iter().any(|d| d.starts_with("Type: Electric")));
        assert_eq!(record.research_queries[0], "Pikachu evolution line");

        let model = MockModel::new()
            .with_output("research_pokemon", json!({"pokemon_details": "not a list"}));
        let (bad_shape, _) = agent(Some(model));
        let record = bad_shape
            .research("Squirtle", ResearchContext::Comparison { opponent: "Pikachu" })
            .await
            .unwrap();
        assert!(record.details.iter().any(|d| d.contains("Water")));
        assert_eq!(record.research_queries[0], "Squirtle vs Pikachu type matchup");
    }

    #[tokio::test]
    async fn test_model_failure_is_upstream() {
        let model = MockModel::new().with_rate_limit("research_pokemon");
        let (agent, _) = agent(Some(model));
        let err = agent
            .research("Pikachu", ResearchContext::Single)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert!(err.is_rate_limited());
    }
}
