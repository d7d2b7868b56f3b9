//! End-to-end tests of the endpoint handlers with scripted collaborators.
//!
//! Every test runs against `StaticPokedex` and, where a language model is
//! involved, `MockModel`; nothing here touches the network.

use pokedex_core::agents::{AgentSettings, LanguageModel};
use pokedex_core::error::UPSTREAM_FAILURE_MESSAGE;
use pokedex_core::{
    BattleQuery, MockModel, PokedexApi, PokedexService, PokemonSource, SourceError,
    StaticPokedex,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn api_with(model: Option<MockModel>, source: Arc<StaticPokedex>) -> PokedexApi {
    let model = model.map(|m| Arc::new(m) as Arc<dyn LanguageModel>);
    let source = source as Arc<dyn PokemonSource>;
    PokedexApi::new(PokedexService::new(source, model, AgentSettings::default()))
}

fn api(model: Option<MockModel>) -> PokedexApi {
    api_with(model, Arc::new(StaticPokedex::with_samples()))
}

fn research_notes() -> Value {
    json!({
        "pokemon_details": ["Detail line"],
        "research_queries": ["Follow-up"],
    })
}

fn dispatch(is_pokemon: bool, names: &[&str]) -> Value {
    json!({
        "answer": "Delegating.",
        "reflection": {"reasoning": "classified", "answer": "delegating"},
        "is_pokemon_query": is_pokemon,
        "pokemon_names": names,
    })
}

fn verdict(p1: &str, p2: &str, winner: &str) -> Value {
    json!({
        "pokemon_1": p1,
        "pokemon_2": p2,
        "analysis": "Bulbasaur resists Electric attacks.",
        "reasoning": "Pikachu has the higher speed, but Bulbasaur takes its hits better.",
        "winner": winner,
    })
}

// =============================================================================
// Health
// =============================================================================

#[test]
fn test_health() {
    let response = api(None).health();
    assert_eq!(response.status, 200);
    assert_eq!(
        response.body,
        json!({"status": "ok", "message": "Pokemon API is running"})
    );
}

// =============================================================================
// Battle endpoint
// =============================================================================

#[tokio::test]
async fn test_battle_names_match_request_exactly() {
    let model = MockModel::new()
        .with_output("research_pokemon", research_notes())
        .with_output("battle_verdict", verdict("pikachuu", "bulbasaur", "BULBASAUR"));
    let response = api(Some(model))
        .battle(&BattleQuery::new("Pikachu", "Bulbasaur"))
        .await;

    assert_eq!(response.status, 200);
    let analysis = &response.body["battle_analysis"];
    assert_eq!(analysis["pokemon_1"], "Pikachu");
    assert_eq!(analysis["pokemon_2"], "Bulbasaur");
    assert_eq!(analysis["winner"], "Bulbasaur");
    assert_eq!(response.body["pokemon1"]["name"], "pikachu");
    assert_eq!(response.body["pokemon2"]["types"], json!(["grass", "poison"]));
    assert_eq!(response.body["pokemon1"]["details"], json!(["Detail line"]));
}

#[tokio::test]
async fn test_battle_winner_is_always_a_requested_name() {
    let api = api(None);
    for (a, b) in [
        ("pikachu", "SQUIRTLE"),
        ("Charmander", "squirtle"),
        ("Snorlax", "Gastly"),
        ("Raichu", "Geodude"),
        ("pikachu", "Pikachu"),
    ] {
        let response = api.battle(&BattleQuery::new(a, b)).await;
        assert_eq!(response.status, 200);
        let winner = response.body["battle_analysis"]["winner"].as_str().unwrap();
        assert!(winner == a || winner == b, "{winner} is neither {a} nor {b}");
    }
}

#[tokio::test]
async fn test_battle_speed_tie_is_stated() {
    let response = api(None)
        .battle(&BattleQuery::new("Bulbasaur", "Venonat"))
        .await;

    assert_eq!(response.status, 200);
    let reasoning = response.body["battle_analysis"]["reasoning"]
        .as_str()
        .unwrap();
    assert!(reasoning.contains("Speed is tied"));
}

#[tokio::test]
async fn test_battle_unknown_name_is_404_with_suggestion() {
    let response = api(None)
        .battle(&BattleQuery::new("Pikachuu", "Bulbasaur"))
        .await;

    assert_eq!(response.status, 404);
    let detail = response.detail().unwrap();
    assert!(detail.contains("Pikachuu"));
    assert!(detail.contains("Did you mean 'pikachu'?"));
}

#[tokio::test]
async fn test_battle_unknown_name_without_near_match() {
    let response = api(None)
        .battle(&BattleQuery::new("Pikachu", "Greymon"))
        .await;

    assert_eq!(response.status, 404);
    assert_eq!(response.detail(), Some("Pokemon 'Greymon' not found."));
}

#[tokio::test]
async fn test_battle_missing_parameter_is_422() {
    let response = api(None)
        .battle(&BattleQuery {
            pokemon1: Some("Pikachu".to_string()),
            pokemon2: None,
        })
        .await;
    assert_eq!(response.status, 422);
    assert_eq!(response.detail(), Some("pokemon2: field required"));

    let response = api(None).battle(&BattleQuery::new("   ", "Pikachu")).await;
    assert_eq!(response.status, 422);
    assert!(response.detail().unwrap().starts_with("pokemon1"));
}

#[tokio::test]
async fn test_battle_model_rate_limit_is_500() {
    let model = MockModel::new()
        .with_output("research_pokemon", research_notes())
        .with_rate_limit("battle_verdict");
    let response = api(Some(model))
        .battle(&BattleQuery::new("Pikachu", "Bulbasaur"))
        .await;

    assert_eq!(response.status, 500);
    assert_eq!(response.detail(), Some(UPSTREAM_FAILURE_MESSAGE));
}

#[tokio::test]
async fn test_battle_data_source_failure_is_500_without_leaking() {
    let source = Arc::new(StaticPokedex::with_samples());
    source.fail_next(SourceError::Server {
        status: 503,
        body: "upstream stack trace".to_string(),
    });
    let response = api_with(None, source)
        .battle(&BattleQuery::new("Pikachu", "Bulbasaur"))
        .await;

    assert_eq!(response.status, 500);
    assert!(!response.body.to_string().contains("stack trace"));
}

// =============================================================================
// Chat endpoint
// =============================================================================

#[tokio::test]
async fn test_chat_single_pokemon() {
    let model = MockModel::new()
        .with_output("dispatch_query", dispatch(true, &["Pikachu"]))
        .with_output("research_pokemon", research_notes());
    let model_calls = Arc::new(model);
    let api = PokedexApi::new(PokedexService::new(
        Arc::new(StaticPokedex::with_samples()),
        Some(model_calls.clone()),
        AgentSettings::default(),
    ));

    let response = api.chat(r#"{"message": "Tell me about Pikachu"}"#).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body["dispatch"]["pokemon_names"], json!(["Pikachu"]));
    assert!(response.body["pokemon"]["Pikachu"].is_object());
    assert!(response.body["battle"].is_null());
    assert_eq!(model_calls.calls("battle_verdict"), 0);
}

#[tokio::test]
async fn test_chat_two_pokemon_includes_battle() {
    let model = MockModel::new()
        .with_output("dispatch_query", dispatch(true, &["pikachu", "Bulbasaur"]))
        .with_output("research_pokemon", research_notes())
        .with_output("battle_verdict", verdict("Pikachu", "bulbasuar", "bulbasuar"));

    let response = api(Some(model))
        .chat(r#"{"message": "Who wins, pikachu or Bulbasaur?"}"#)
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(
        response.body["dispatch"]["pokemon_names"],
        json!(["pikachu", "Bulbasaur"])
    );
    let pokemon = response.body["pokemon"].as_object().unwrap();
    assert!(pokemon.contains_key("Pikachu"));
    assert!(pokemon.contains_key("Bulbasaur"));

    let battle = &response.body["battle"];
    assert_eq!(battle["pokemon_1"], "pikachu");
    assert_eq!(battle["pokemon_2"], "Bulbasaur");
    assert_eq!(battle["winner"], "Bulbasaur");
}

#[tokio::test]
async fn test_chat_non_pokemon_question() {
    let model = MockModel::new().with_output(
        "dispatch_query",
        json!({
            "answer": "I would need to look up the current weather.",
            "reflection": {"reasoning": "weather question", "answer": "needs search"},
            "is_pokemon_query": false,
            "pokemon_names": [],
            "needs_search": true,
            "search_queries": ["weather today"],
        }),
    );
    let response = api(Some(model))
        .chat(r#"{"message": "What's the weather?"}"#)
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body["dispatch"]["is_pokemon_query"], false);
    assert_eq!(response.body["dispatch"]["pokemon_names"], json!([]));
    assert_eq!(response.body["dispatch"]["needs_search"], true);
    assert_eq!(response.body["pokemon"], json!({}));
    assert!(response.body["battle"].is_null());
}

#[tokio::test]
async fn test_chat_offline_place_name_is_not_a_pokemon() {
    let response = api(None)
        .chat(r#"{"message": "What's the weather in Paris?"}"#)
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body["dispatch"]["is_pokemon_query"], false);
    assert_eq!(response.body["dispatch"]["pokemon_names"], json!([]));
    assert_eq!(response.body["pokemon"], json!({}));
    assert!(response.body["battle"].is_null());
}

#[tokio::test]
async fn test_chat_offline_keeps_only_known_names() {
    let response = api(None)
        .chat(r#"{"message": "Tell me about Pikachu in Kanto"}"#)
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body["dispatch"]["pokemon_names"], json!(["Pikachu"]));
    assert_eq!(response.body["pokemon"]["Pikachu"]["name"], "pikachu");
    assert!(response.body["battle"].is_null());
}

#[tokio::test]
async fn test_chat_validation() {
    let api = api(None);

    let response = api.chat("{}").await;
    assert_eq!(response.status, 422);
    assert_eq!(response.detail(), Some("message: field required"));

    let response = api.chat(r#"{"message": "  "}"#).await;
    assert_eq!(response.status, 422);

    let response = api.chat("not json").await;
    assert_eq!(response.status, 422);
    assert!(response.detail().unwrap().starts_with("body: invalid JSON"));
}

#[tokio::test]
async fn test_chat_unknown_pokemon_is_404() {
    let model = MockModel::new().with_output("dispatch_query", dispatch(true, &["Bulbsaur"]));
    let response = api(Some(model))
        .chat(r#"{"message": "Tell me about Bulbsaur"}"#)
        .await;

    assert_eq!(response.status, 404);
    assert!(response.detail().unwrap().contains("Did you mean 'bulbasaur'?"));
}
