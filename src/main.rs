//! spacecap: space capability analytics over the dashboard REST API.
//!
//! Fetches entity lists through a shared TTL cache and runs the scoring
//! engine over them. Every command prints pretty JSON on stdout; logs go
//! to stderr.

mod analysis;
mod config;

use std::path::PathBuf;

use anyhow::Context;
use api_client::ApiClient;
use clap::{Parser, Subcommand};
use common::{
    Country, Engine, EntityKind, LaunchSite, LaunchVehicle, Mission, Satellite,
};
use entity_cache::{CachedRecord, EntityCache, EntityHooks, EntityQuery};
use scoring::Category;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::analysis::CapabilityAnalyzer;

/// Space capability dashboard analytics
#[derive(Parser)]
#[command(name = "spacecap", about = "Space capability analytics over the dashboard API")]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load every entity list and report counts and errors.
    Overview,
    /// Print all records of one kind (countries, engines, launch-vehicles, ...).
    List { kind: String },
    /// A country with its category scores and owned record counts.
    Profile { code: String },
    /// Head-to-head gap analysis.
    Compare { a: String, b: String },
    /// Strengths, weaknesses, opportunities and threats of one country.
    Swot { code: String },
    /// Ranking table by overall score or one category.
    Rank {
        #[arg(long)]
        category: Option<String>,
    },
    /// Jittered category estimates for chart display.
    Chart {
        code: String,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{rendered}");
    Ok(())
}

async fn list<T: CachedRecord>(cache: &EntityCache) -> anyhow::Result<()> {
    let records = cache.fetch::<T>().await?;
    if records.is_empty() {
        println!("no data");
        return Ok(());
    }
    print_json(&*records)
}

async fn summarize<T: CachedRecord>(mut query: EntityQuery<T>, cache: &EntityCache) -> Value {
    let state = query.settled().await;
    let entry = cache.entry::<T>();
    json!({
        "kind": T::KIND.as_str(),
        "count": state.items.len(),
        "error": state.error,
        "fetchedAt": entry.fetched_at_utc.map(|at| at.to_rfc3339()),
    })
}

async fn overview(cache: &EntityCache) -> anyhow::Result<()> {
    let hooks = EntityHooks::new(cache.clone());
    let (countries, engines, vehicles, missions, satellites, sites) = tokio::join!(
        summarize(hooks.countries(), cache),
        summarize(hooks.engines(), cache),
        summarize(hooks.launch_vehicles(), cache),
        summarize(hooks.missions(), cache),
        summarize(hooks.satellites(), cache),
        summarize(hooks.launch_sites(), cache),
    );
    print_json(&[countries, engines, vehicles, missions, satellites, sites])
}

async fn run(command: Command, analyzer: &CapabilityAnalyzer) -> anyhow::Result<()> {
    let cache = analyzer.cache();
    match command {
        Command::Overview => overview(cache).await,
        Command::List { kind } => match kind.parse::<EntityKind>()? {
            EntityKind::Countries => list::<Country>(cache).await,
            EntityKind::Engines => list::<Engine>(cache).await,
            EntityKind::LaunchVehicles => list::<LaunchVehicle>(cache).await,
            EntityKind::Missions => list::<Mission>(cache).await,
            EntityKind::Satellites => list::<Satellite>(cache).await,
            EntityKind::LaunchSites => list::<LaunchSite>(cache).await,
        },
        Command::Profile { code } => print_json(&analyzer.profile(&code).await?),
        Command::Compare { a, b } => print_json(&analyzer.compare(&a, &b).await?),
        Command::Swot { code } => print_json(&analyzer.swot(&code).await?),
        Command::Rank { category } => {
            let category = match category.as_deref() {
                Some(raw) => Some(
                    Category::parse(raw)
                        .with_context(|| format!("unknown category: {raw}"))?,
                ),
                None => None,
            };
            let ranked = analyzer.rankings(category).await?;
            if ranked.is_empty() {
                println!("no data");
                return Ok(());
            }
            print_json(&ranked)
        }
        Command::Chart { code, seed } => print_json(&analyzer.chart(&code, seed).await?),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "spacecap=info,api_client=info,entity_cache=info,scoring=info".into()
            }),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let client = match ApiClient::new(&cfg.api) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to build API client: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "API: {} (timeout={}s, page_size={}), cache ttl={}s",
        client.base_url(),
        cfg.api.timeout_secs,
        cfg.api.page_size,
        cfg.cache.ttl_secs
    );

    let analyzer = CapabilityAnalyzer::new(EntityCache::new(client, &cfg.cache));

    if let Err(err) = run(cli.command, &analyzer).await {
        eprintln!("Error: {err:#}");
        let network = err
            .downcast_ref::<common::Error>()
            .is_some_and(common::Error::is_network);
        if network {
            eprintln!("Could not reach the API at {}", analyzer.cache().source().base_url());
        }
        std::process::exit(1);
    }
}
