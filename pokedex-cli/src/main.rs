//! `pokedex` command-line front-end.
//!
//! Serves the same handlers an HTTP front-end would: one-shot `chat`,
//! `battle`, `lookup` and `health` commands, plus an interactive `repl`.
//!
//! Run with: cargo run -p pokedex-cli -- battle Pikachu Bulbasaur
//! (Set ANTHROPIC_API_KEY in .env to use the language model.)

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pokedex_core::{ApiResponse, BattleQuery, PokedexApi, PokedexConfig, PokedexService};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pokedex", version, about = "Pokemon research and battle analysis")]
struct Cli {
    /// Print raw JSON responses
    #[arg(long, global = true)]
    json: bool,

    /// Model override
    #[arg(long, global = true, env = "POKEDEX_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one chat message
    Chat {
        /// The message, e.g. "Who wins, Pikachu or Bulbasaur?"
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Judge a battle between two Pokemon
    Battle { pokemon1: String, pokemon2: String },
    /// Research a single Pokemon
    Lookup { name: String },
    /// Interactive chat
    Repl,
    /// Service health
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (try workspace root first, then current dir)
    if dotenvy::from_path("../.env").is_err() {
        let _ = dotenvy::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = PokedexConfig::from_env().context("invalid configuration")?;
    if let Some(model) = cli.model.clone() {
        config = config.with_model(model);
    }
    tracing::info!(
        model = %config.model,
        language_model = config.has_language_model(),
        "pokedex v{}",
        env!("CARGO_PKG_VERSION")
    );

    let api = PokedexApi::new(PokedexService::from_config(&config));

    match cli.command {
        Command::Chat { message } => {
            let body = json!({ "message": message.join(" ") }).to_string();
            let response = api.chat(&body).await;
            finish(&response, cli.json, print_chat)
        }
        Command::Battle { pokemon1, pokemon2 } => {
            let response = api.battle(&BattleQuery::new(pokemon1, pokemon2)).await;
            finish(&response, cli.json, print_battle)
        }
        Command::Lookup { name } => {
            let response = match api.service().lookup(&name).await {
                Ok(record) => ApiResponse::ok(serde_json::to_value(record)?),
                Err(err) => err.into(),
            };
            finish(&response, cli.json, print_record)
        }
        Command::Repl => repl(&api, cli.json).await,
        Command::Health => finish(&api.health(), true, |_| {}),
    }
}

fn finish(response: &ApiResponse, raw: bool, print: fn(&Value)) -> anyhow::Result<()> {
    if !response.is_success() {
        bail!(
            "{} ({})",
            response.detail().unwrap_or("request failed"),
            response.status
        );
    }
    if raw {
        println!("{}", serde_json::to_string_pretty(&response.body)?);
    } else {
        print(&response.body);
    }
    Ok(())
}

async fn repl(api: &PokedexApi, raw: bool) -> anyhow::Result<()> {
    println!("Pokedex");
    println!("=======");
    println!("Ask about a Pokemon, or name two for a battle. Type 'quit' to exit.\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("You: ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        let input = line.trim();

        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            println!("Goodbye!");
            break;
        }
        if input.is_empty() {
            continue;
        }

        let body = json!({ "message": input }).to_string();
        let response = api.chat(&body).await;
        if let Err(e) = finish(&response, raw, print_chat) {
            eprintln!("\nError: {e}\n");
        }
    }
    Ok(())
}

fn text<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn print_chat(body: &Value) {
    let dispatch = &body["dispatch"];
    println!("\n{}\n", text(dispatch, "answer"));

    if let Some(queries) = dispatch.get("search_queries").and_then(Value::as_array) {
        println!("Suggested searches:");
        for query in queries.iter().filter_map(Value::as_str) {
            println!("  - {query}");
        }
        println!();
    }

    if let Some(pokemon) = body["pokemon"].as_object() {
        for record in pokemon.values() {
            print_record(record);
        }
    }
    if body["battle"].is_object() {
        print_verdict(&body["battle"]);
    }
}

fn print_battle(body: &Value) {
    print_record(&body["pokemon1"]);
    print_record(&body["pokemon2"]);
    print_verdict(&body["battle_analysis"]);
}

fn print_record(record: &Value) {
    let types: Vec<&str> = record["types"]
        .as_array()
        .map(|types| types.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let stats = &record["base_stats"];
    println!("{} [{}]", text(record, "display_name"), types.join("/"));
    println!(
        "  HP {} | Atk {} | Def {} | SpA {} | SpD {} | Spe {}",
        stats["hp"],
        stats["attack"],
        stats["defense"],
        stats["special_attack"],
        stats["special_defense"],
        stats["speed"]
    );
    for line in record["details"].as_array().into_iter().flatten() {
        if let Some(line) = line.as_str() {
            println!("  - {line}");
        }
    }
    println!();
}

fn print_verdict(verdict: &Value) {
    println!(
        "{} vs {}",
        text(verdict, "pokemon_1"),
        text(verdict, "pokemon_2")
    );
    println!("\n{}\n", text(verdict, "analysis"));
    println!("{}\n", text(verdict, "reasoning"));
    println!("Winner: {}\n", text(verdict, "winner"));
}
