//! Battle stage: turn two records into a verdict.

use super::{ask, AgentSettings, LanguageModel};
use crate::battle::{assess, BattleAssessment, BattleVerdict};
use crate::names::enforce_requested_names;
use crate::pokemon::PokemonRecord;
use pokedex_macros::StructuredOutput;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = include_str!("prompts/expert.txt");

/// Report which of the two Pokemon would win and why
#[derive(Debug, Clone, Deserialize, StructuredOutput)]
#[output(name = "battle_verdict")]
pub struct VerdictDraft {
    /// First Pokemon, exactly as given
    pub pokemon_1: String,
    /// Second Pokemon, exactly as given
    pub pokemon_2: String,
    /// Short paragraph summarizing the matchup
    pub analysis: String,
    /// Step-by-step explanation of the outcome, including who moves first
    pub reasoning: String,
    /// The winner, exactly one of the two names
    pub winner: String,
}

impl From<VerdictDraft> for BattleVerdict {
    fn from(draft: VerdictDraft) -> Self {
        BattleVerdict {
            pokemon_1: draft.pokemon_1,
            pokemon_2: draft.pokemon_2,
            analysis: draft.analysis,
            reasoning: draft.reasoning,
            winner: draft.winner,
        }
    }
}

/// Produces battle verdicts.
///
/// The heuristic in [`crate::battle`] decides the winner. A configured model
/// writes the prose; a draft that names a different winner is discarded in
/// favour of the heuristic's own text.
pub struct ExpertAgent {
    model: Option<Arc<dyn LanguageModel>>,
    settings: AgentSettings,
}

impl ExpertAgent {
    pub fn new(model: Option<Arc<dyn LanguageModel>>, settings: AgentSettings) -> Self {
        Self { model, settings }
    }

    /// Judge `first` against `second`.
    ///
    /// `requested_1` and `requested_2` are the names as the caller wrote
    /// them; the returned verdict uses exactly those strings.
    pub async fn analyze(
        &self,
        first: &PokemonRecord,
        second: &PokemonRecord,
        requested_1: &str,
        requested_2: &str,
    ) -> Result<BattleVerdict, claude::Error> {
        let assessment = assess(first, second);
        info!(
            first = %first.name,
            second = %second.name,
            score = assessment.score,
            margin = ?assessment.margin,
            favored = ?assessment.favored,
            "assessed battle"
        );

        let Some(model) = &self.model else {
            return Ok(assessment.verdict(requested_1, requested_2));
        };

        let prompt = battle_prompt(first, second, &assessment, requested_1, requested_2);
        let draft = match ask::<VerdictDraft>(model.as_ref(), &self.settings, SYSTEM_PROMPT, prompt)
            .await
        {
            Ok(draft) => draft,
            Err(e @ (claude::Error::Parse(_) | claude::Error::MissingOutput(_))) => {
                warn!(error = %e, "verdict output unusable, using heuristic verdict");
                return Ok(assessment.verdict(requested_1, requested_2));
            }
            Err(e) => return Err(e),
        };

        Ok(reconcile(draft.into(), &assessment, requested_1, requested_2))
    }
}

/// Make a model-written verdict agree with the heuristic and the caller's names.
fn reconcile(
    mut verdict: BattleVerdict,
    assessment: &BattleAssessment,
    requested_1: &str,
    requested_2: &str,
) -> BattleVerdict {
    let correction = enforce_requested_names(&mut verdict, requested_1, requested_2);
    if correction.corrected {
        warn!(
            requested_1,
            requested_2, "verdict names differed from the request, restored"
        );
    }

    if correction.winner != Some(assessment.favored) {
        warn!(
            model_winner = %verdict.winner,
            favored = ?assessment.favored,
            "model winner contradicts the heuristic, using heuristic verdict"
        );
        return assessment.verdict(requested_1, requested_2);
    }

    if !states_speed(&verdict.reasoning, assessment.speed_tied()) {
        verdict.reasoning.push(' ');
        verdict
            .reasoning
            .push_str(&assessment.speed_statement(requested_1, requested_2));
    }

    verdict
}

/// Whether reasoning text already covers speed order (and a tie, if any).
fn states_speed(reasoning: &str, tied: bool) -> bool {
    let text = reasoning.to_lowercase();
    if tied {
        text.contains("speed") && text.contains("tie")
    } else {
        text.contains("speed") || text.contains("faster")
    }
}

fn battle_prompt(
    first: &PokemonRecord,
    second: &PokemonRecord,
    assessment: &BattleAssessment,
    name_1: &str,
    name_2: &str,
) -> String {
    format!(
        "pokemon_1: {name_1}\n{}\n\npokemon_2: {name_2}\n{}\n\nComputed signals:\n{}",
        describe(first),
        describe(second),
        assessment.summary(name_1, name_2),
    )
}

fn describe(record: &PokemonRecord) -> String {
    let s = &record.base_stats;
    let mut text = format!(
        "Types: {}\nAbilities: {}\nHP {} / Atk {} / Def {} / SpA {} / SpD {} / Spe {}",
        record.type_label(),
        record.abilities.join(", "),
        s.hp,
        s.attack,
        s.defense,
        s.special_attack,
        s.special_defense,
        s.speed,
    );
    for line in &record.details {
        text.push_str("\n- ");
        text.push_str(line);
    }
    text
}
