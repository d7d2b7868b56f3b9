//! Integration tests that call the real Claude API and PokeAPI.
//!
//! These tests require ANTHROPIC_API_KEY to be set (via .env file or environment).
//! Run with: `cargo test -p pokedex-core --test api_integration -- --ignored`
//!
//! These are marked #[ignore] by default to avoid API costs in CI and
//! failures when no key is available.

use pokedex_core::{BattleQuery, PokedexApi, PokedexConfig, PokedexService};

/// Load environment variables from .env file
fn setup() -> Option<PokedexApi> {
    let _ = dotenvy::dotenv();
    let config = PokedexConfig::from_env().expect("valid configuration");
    if !config.has_language_model() {
        eprintln!("Skipping test: ANTHROPIC_API_KEY not set");
        return None;
    }
    Some(PokedexApi::new(PokedexService::from_config(&config)))
}

#[tokio::test]
#[ignore] // Run with: cargo test -p pokedex-core --test api_integration -- --ignored
async fn test_live_battle_keeps_requested_names() {
    let Some(api) = setup() else { return };

    let response = api.battle(&BattleQuery::new("Pikachu", "Bulbasaur")).await;
    assert_eq!(response.status, 200, "{:?}", response.body);

    let analysis = &response.body["battle_analysis"];
    assert_eq!(analysis["pokemon_1"], "Pikachu");
    assert_eq!(analysis["pokemon_2"], "Bulbasaur");
    let winner = analysis["winner"].as_str().unwrap();
    assert!(winner == "Pikachu" || winner == "Bulbasaur");
}

#[tokio::test]
#[ignore]
async fn test_live_chat_classifies_messages() {
    let Some(api) = setup() else { return };

    let response = api.chat(r#"{"message": "Tell me about Pikachu"}"#).await;
    assert_eq!(response.status, 200, "{:?}", response.body);
    assert_eq!(response.body["dispatch"]["is_pokemon_query"], true);
    assert!(response.body["battle"].is_null());

    let response = api.chat(r#"{"message": "What's the capital of France?"}"#).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["dispatch"]["is_pokemon_query"], false);
    assert_eq!(response.body["pokemon"], serde_json::json!({}));
}

#[tokio::test]
#[ignore]
async fn test_live_unknown_pokemon_suggestion() {
    let Some(api) = setup() else { return };

    let response = api.battle(&BattleQuery::new("Charizardd", "Pikachu")).await;
    assert_eq!(response.status, 404);
    assert!(response.body["detail"].as_str().unwrap().contains("charizard"));
}
