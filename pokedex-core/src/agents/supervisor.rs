//! Dispatch: decide whether a message is about Pokemon and which ones.

use super::{ask, AgentSettings, LanguageModel};
use crate::names::canonical_name;
use pokedex_macros::StructuredOutput;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// At most this many names are dispatched per message.
pub const MAX_POKEMON_NAMES: usize = 2;

const SYSTEM_PROMPT: &str = include_str!("prompts/supervisor.txt");

const GENERAL_ANSWER: &str =
    "I can only help with Pokemon questions right now. Try naming a Pokemon.";

/// The supervisor's note on its own decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, StructuredOutput)]
#[output(name = "reflection")]
pub struct Reflection {
    /// How the message was classified, in one or two sentences
    pub reasoning: String,
    /// One-sentence summary of the answer
    pub answer: String,
}

/// Report how the user's message should be handled
#[derive(Debug, Clone, Deserialize, StructuredOutput)]
#[output(name = "dispatch_query")]
pub struct SupervisorDecision {
    /// Direct answer, or a note saying which agent takes over
    pub answer: String,
    /// Self-check of the classification
    pub reflection: Reflection,
    /// True when the message is about Pokemon
    pub is_pokemon_query: bool,
    /// Pokemon named in the message, as written, in mention order
    #[output(max_items = 2)]
    #[serde(default)]
    pub pokemon_names: Vec<String>,
    /// True when answering needs a web search
    #[output(optional)]
    #[serde(default)]
    pub needs_search: bool,
    /// Suggested web search queries, most general first
    #[serde(default)]
    pub search_queries: Option<Vec<String>>,
}

/// What the dispatch step decided for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub is_pokemon_query: bool,
    /// Zero to two names, in mention order.
    pub pokemon_names: Vec<String>,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection: Option<Reflection>,
    #[serde(default)]
    pub needs_search: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_queries: Option<Vec<String>>,
    /// Every name picked out of capitalized words, in mention order.
    ///
    /// Non-empty only when the names were guessed rather than given by the
    /// model. They must be checked against the data source before use.
    #[serde(skip)]
    pub unverified: Vec<String>,
}

impl DispatchResult {
    /// A non-Pokemon result with no names.
    pub fn general(answer: impl Into<String>) -> Self {
        Self {
            is_pokemon_query: false,
            pokemon_names: Vec::new(),
            answer: answer.into(),
            reflection: None,
            needs_search: false,
            search_queries: None,
            unverified: Vec::new(),
        }
    }

    /// Settle guessed names down to the ones the data source knows.
    ///
    /// `confirmed` keeps mention order. With nothing confirmed the message
    /// is treated as a general question.
    pub fn with_confirmed_names(self, confirmed: &[String]) -> Self {
        let names = normalize_names(confirmed);
        if names.is_empty() {
            return Self {
                reflection: self.reflection,
                needs_search: self.needs_search,
                search_queries: self.search_queries,
                ..Self::general(GENERAL_ANSWER)
            };
        }
        Self {
            is_pokemon_query: true,
            answer: lookup_answer(&names),
            pokemon_names: names,
            unverified: Vec::new(),
            ..self
        }
    }

    /// Whether this dispatch leads to a battle.
    pub fn is_battle(&self) -> bool {
        self.is_pokemon_query && self.pokemon_names.len() == MAX_POKEMON_NAMES
    }
}

/// Trim, drop blanks and duplicates (by canonical name), keep mention order,
/// and cap at [`MAX_POKEMON_NAMES`].
pub fn normalize_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    distinct_names(names, MAX_POKEMON_NAMES)
}

fn distinct_names<S: AsRef<str>>(names: &[S], limit: usize) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();

    for name in names {
        let name = name.as_ref().trim();
        let key = canonical_name(name);
        if key.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(name.to_string());
        if out.len() == limit {
            break;
        }
    }

    out
}

/// Words that start sentences or questions and never name a Pokemon.
const STOP_WORDS: &[&str] = &[
    "a", "about", "against", "an", "and", "any", "are", "battle", "better", "between", "beat",
    "can", "compare", "could", "describe", "did", "do", "does", "explain", "fight", "find", "for",
    "give", "hello", "hey", "hi", "how", "i", "if", "in", "is", "it", "its", "let", "lets", "list",
    "me", "my", "no", "of", "ok", "okay", "on", "or", "please", "pokemon", "pokémon", "should",
    "show", "stats", "stronger", "tell", "thank", "thanks", "than", "that", "the", "this", "to",
    "type", "types", "versus", "vs", "was", "were", "what", "when", "where", "which", "who",
    "whom", "why", "will", "win", "wins", "with", "would", "yes", "you", "your",
];

/// Capitalized words in `message` that could be Pokemon names, deduplicated
/// and in mention order.
///
/// Used when the model flags a Pokemon question without naming anything,
/// and when no model is configured. Place names and other proper nouns
/// come through too, so the result is only a list of guesses.
pub fn extract_candidate_names(message: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    for raw in message.split_whitespace() {
        let word = raw.trim_matches(|c: char| !c.is_alphanumeric());
        let word = word
            .strip_suffix("'s")
            .or_else(|| word.strip_suffix("\u{2019}s"))
            .unwrap_or(word);

        let starts_upper = word.chars().next().is_some_and(char::is_uppercase);
        if !starts_upper || word.chars().count() < 2 {
            continue;
        }
        if STOP_WORDS.contains(&word.to_lowercase().as_str()) {
            continue;
        }
        candidates.push(word.to_string());
    }

    distinct_names(&candidates, usize::MAX)
}

fn lookup_answer(names: &[String]) -> String {
    match names {
        [one, two] => format!("Comparing {one} and {two} for a battle."),
        _ => format!("Looking up {}.", names.join(", ")),
    }
}

/// Routes each message to research, battle or a direct answer.
pub struct SupervisorAgent {
    model: Option<Arc<dyn LanguageModel>>,
    settings: AgentSettings,
}

impl SupervisorAgent {
    pub fn new(model: Option<Arc<dyn LanguageModel>>, settings: AgentSettings) -> Self {
        Self { model, settings }
    }

    /// Classify `message` and extract up to two Pokemon names.
    ///
    /// Model output that is missing or malformed counts as inconclusive and
    /// falls back to [`extract_candidate_names`]. Transport and API errors
    /// are returned.
    pub async fn dispatch(&self, message: &str) -> Result<DispatchResult, claude::Error> {
        let message = message.trim();
        if message.is_empty() {
            return Ok(DispatchResult::general("Ask me about a Pokemon or a battle."));
        }

        let Some(model) = &self.model else {
            return Ok(Self::offline_dispatch(message));
        };

        let decision = match ask::<SupervisorDecision>(
            model.as_ref(),
            &self.settings,
            SYSTEM_PROMPT,
            message.to_string(),
        )
        .await
        {
            Ok(decision) => decision,
            Err(e @ (claude::Error::Parse(_) | claude::Error::MissingOutput(_))) => {
                warn!(error = %e, "supervisor output unusable, falling back to name extraction");
                return Ok(Self::offline_dispatch(message));
            }
            Err(e) => return Err(e),
        };

        let result = Self::finish(message, decision);
        info!(
            is_pokemon_query = result.is_pokemon_query,
            names = ?result.pokemon_names,
            needs_search = result.needs_search,
            "dispatched message"
        );
        Ok(result)
    }

    fn finish(message: &str, decision: SupervisorDecision) -> DispatchResult {
        let mut names = if decision.is_pokemon_query {
            normalize_names(&decision.pokemon_names)
        } else {
            Vec::new()
        };
        let mut unverified = Vec::new();

        if decision.is_pokemon_query && names.is_empty() {
            unverified = extract_candidate_names(message);
            names = normalize_names(&unverified);
            if names.is_empty() {
                warn!("pokemon query without names, treating as general");
            } else {
                warn!(candidates = ?unverified, "model gave no names, using extracted candidates");
            }
        }

        let search_queries = decision
            .search_queries
            .filter(|queries| !queries.is_empty());

        DispatchResult {
            is_pokemon_query: !names.is_empty(),
            pokemon_names: names,
            answer: decision.answer,
            reflection: Some(decision.reflection),
            needs_search: decision.needs_search || search_queries.is_some(),
            search_queries,
            unverified,
        }
    }

    fn offline_dispatch(message: &str) -> DispatchResult {
        let unverified = extract_candidate_names(message);
        if unverified.is_empty() {
            return DispatchResult::general(GENERAL_ANSWER);
        }

        let names = normalize_names(&unverified);
        DispatchResult {
            is_pokemon_query: true,
            answer: lookup_answer(&names),
            pokemon_names: names,
            reflection: None,
            needs_search: false,
            search_queries: None,
            unverified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;
    use claude::StructuredOutput;
    use serde_json::json;

    fn supervisor(model: MockModel) -> SupervisorAgent {
        SupervisorAgent::new(Some(Arc::new(model)), AgentSettings::default())
    }

    fn decision(is_pokemon: bool, names: &[&str], answer: &str) -> serde_json::Value {
        json!({
            "answer": answer,
            "reflection": {"reasoning": "classified", "answer": answer},
            "is_pokemon_query": is_pokemon,
            "pokemon_names": names,
        })
    }

    #[test]
    fn test_normalize_names() {
        assert_eq!(
            normalize_names(&[" Pikachu ", "pikachu", "", "Bulbasaur", "Charizard"]),
            vec!["Pikachu", "Bulbasaur"]
        );
        assert!(normalize_names::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_extract_candidate_names() {
        assert_eq!(extract_candidate_names("Tell me about Pikachu"), vec!["Pikachu"]);
        assert_eq!(
            extract_candidate_names("Who would win, Pikachu or Bulbasaur?"),
            vec!["Pikachu", "Bulbasaur"]
        );
        assert_eq!(
            extract_candidate_names("Is Charizard's Fire stronger than Squirtle, Mew and Eevee?"),
            vec!["Charizard", "Fire", "Squirtle", "Mew", "Eevee"]
        );
        assert_eq!(
            extract_candidate_names("What's the weather in Paris?"),
            vec!["Paris"]
        );
        assert!(extract_candidate_names("What's the weather?").is_empty());
        assert!(extract_candidate_names("hello there").is_empty());
    }

    #[test]
    fn test_decision_schema() {
        let schema = SupervisorDecision::input_schema();
        assert_eq!(SupervisorDecision::output_name(), "dispatch_query");
        assert_eq!(schema["properties"]["pokemon_names"]["maxItems"], 2);
        assert_eq!(schema["properties"]["reflection"]["type"], "object");

        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&json!("is_pokemon_query")));
        assert!(!required.contains(&json!("needs_search")));
        assert!(!required.contains(&json!("search_queries")));
    }

    #[tokio::test]
    async fn test_single_pokemon_dispatch() {
        let model = MockModel::new().with_output(
            "dispatch_query",
            decision(true, &["Pikachu"], "Handing over to the researcher."),
        );
        let result = supervisor(model).dispatch("Tell me about Pikachu").await.unwrap();

        assert!(result.is_pokemon_query);
        assert_eq!(result.pokemon_names, vec!["Pikachu"]);
        assert!(!result.is_battle());
        assert!(result.reflection.is_some());
    }

    #[tokio::test]
    async fn test_more_than_two_names_keeps_first_two() {
        let model = MockModel::new().with_output(
            "dispatch_query",
            json!({
                "answer": "Battle time.",
                "reflection": {"reasoning": "three names", "answer": "Battle time."},
                "is_pokemon_query": true,
                "pokemon_names": ["Pikachu", "Bulbasaur", "Charizard"],
            }),
        );
        let result = supervisor(model)
            .dispatch("Pikachu vs Bulbasaur vs Charizard")
            .await
            .unwrap();

        assert_eq!(result.pokemon_names, vec!["Pikachu", "Bulbasaur"]);
        assert!(result.is_battle());
    }

    #[tokio::test]
    async fn test_general_query_has_no_names() {
        let model = MockModel::new().with_output(
            "dispatch_query",
            json!({
                "answer": "I would need to search for the current weather.",
                "reflection": {"reasoning": "weather", "answer": "needs a search"},
                "is_pokemon_query": false,
                "pokemon_names": ["Pikachu"],
                "search_queries": ["weather today", "current weather forecast"],
            }),
        );
        let result = supervisor(model).dispatch("What's the weather?").await.unwrap();

        assert!(!result.is_pokemon_query);
        assert!(result.pokemon_names.is_empty());
        assert!(result.needs_search);
        assert_eq!(result.search_queries.as_ref().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_pokemon_query_without_names_falls_back_to_extraction() {
        let model = MockModel::new()
            .with_output("dispatch_query", decision(true, &[], "Let me check."));
        let result = supervisor(model)
            .dispatch("How fast is Jolteon?")
            .await
            .unwrap();
        assert_eq!(result.pokemon_names, vec!["Jolteon"]);
        assert_eq!(result.unverified, vec!["Jolteon"]);

        let model = MockModel::new()
            .with_output("dispatch_query", decision(true, &[], "Let me check."));
        let result = supervisor(model)
            .dispatch("which one is the fastest?")
            .await
            .unwrap();
        assert!(!result.is_pokemon_query);
        assert!(result.pokemon_names.is_empty());
    }

    #[tokio::test]
    async fn test_unusable_output_is_inconclusive_not_an_error() {
        let model = MockModel::new().with_text("dispatch_query", "I refuse to use tools.");
        let result = supervisor(model).dispatch("What's the weather?").await.unwrap();
        assert!(!result.is_pokemon_query);

        let model = MockModel::new()
            .with_output("dispatch_query", json!({"answer": 42, "is_pokemon_query": "maybe"}));
        let result = supervisor(model).dispatch("Tell me about Pikachu").await.unwrap();
        assert_eq!(result.pokemon_names, vec!["Pikachu"]);
    }

    #[tokio::test]
    async fn test_rate_limit_is_an_error() {
        let model = MockModel::new().with_rate_limit("dispatch_query");
        let err = supervisor(model).dispatch("Tell me about Pikachu").await.unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn test_model_names_are_not_marked_unverified() {
        let model = MockModel::new().with_output(
            "dispatch_query",
            decision(true, &["Pikachu"], "Handing over to the researcher."),
        );
        let result = supervisor(model).dispatch("Tell me about Pikachu").await.unwrap();
        assert!(result.unverified.is_empty());
    }

    #[test]
    fn test_with_confirmed_names() {
        let guessed = SupervisorAgent::offline_dispatch("Is Pikachu faster than Paris or Raichu?");
        assert_eq!(guessed.unverified, vec!["Pikachu", "Paris", "Raichu"]);

        let confirmed = guessed
            .clone()
            .with_confirmed_names(&["Pikachu".to_string(), "Raichu".to_string()]);
        assert!(confirmed.is_battle());
        assert_eq!(confirmed.pokemon_names, vec!["Pikachu", "Raichu"]);
        assert!(confirmed.unverified.is_empty());
        assert_eq!(confirmed.answer, "Comparing Pikachu and Raichu for a battle.");

        let general = guessed.with_confirmed_names(&[]);
        assert!(!general.is_pokemon_query);
        assert!(general.pokemon_names.is_empty());
        assert_eq!(general.answer, GENERAL_ANSWER);
    }

    #[tokio::test]
    async fn test_offline_dispatch() {
        let agent = SupervisorAgent::new(None, AgentSettings::default());

        let result = agent.dispatch("Pikachu vs Bulbasaur").await.unwrap();
        assert!(result.is_battle());
        assert_eq!(result.unverified, vec!["Pikachu", "Bulbasaur"]);

        let result = agent.dispatch("What's the weather?").await.unwrap();
        assert!(!result.is_pokemon_query);
        assert!(result.pokemon_names.is_empty());
    }
}
