//! Deal bot entry point.
//!
//! `deal-bot` (or `deal-bot run`) polls Telegram until Ctrl+C.
//! `deal-bot parse <line>` parses one delimited line offline and prints the
//! deal as JSON.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use deal_intake::bot::{DealBot, TelegramTransport, UpdatePoller};
use deal_intake::extraction::{OpenAIOracle, StructuredDealExtractor};
use deal_intake::submission::{DealStoreExt, NotionDealStore};
use deal_intake::{parse_line, Config};
use notion_client::NotionClient;
use openai_client::OpenAIClient;
use secrecy::ExposeSecret;
use telegram_client::{TelegramOptions, TelegramService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const POLL_TIMEOUT_SECS: u32 = 30;

#[derive(Parser)]
#[command(name = "deal-bot")]
#[command(about = "Telegram bot that parses, reviews and submits affiliate deals")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration and start polling (default)
    Run,

    /// Validate configuration and exit
    CheckConfig,

    /// Parse one delimited deal line and print it as JSON
    Parse { line: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,deal_intake=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run().await,
        Commands::CheckConfig => check_config(),
        Commands::Parse { line } => parse(&line),
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        free_text = config.free_text_enabled(),
        store_rps = config.store_requests_per_second,
        "Configuration loaded"
    );

    let telegram = TelegramService::new(TelegramOptions {
        bot_token: config.telegram_bot_token.expose_secret().to_string(),
        poll_timeout_secs: POLL_TIMEOUT_SECS,
    });
    let transport = Arc::new(TelegramTransport::new(telegram));

    let notion = NotionClient::new(config.notion_token.expose_secret().to_string());
    let store = NotionDealStore::new(
        notion,
        &config.offers_database_id,
        &config.advertisers_database_id,
    )
    .rate_limited(config.store_requests_per_second);

    let mut bot = DealBot::new(
        transport.clone(),
        Arc::new(store),
        config.markup,
        config.session_timeout,
    );

    if let Some(key) = &config.oracle_api_key {
        let client = OpenAIClient::new(key.expose_secret()).with_base_url(&config.oracle_base_url);
        let oracle = OpenAIOracle::new(client, &config.oracle_model);
        tracing::info!(model = %oracle.model(), "Free-text deals enabled");
        bot = bot.with_extractor(StructuredDealExtractor::new(Arc::new(oracle)));
    } else {
        tracing::warn!("MISTRAL_API_KEY not set, only delimited deals are accepted");
    }

    UpdatePoller::new(transport, bot).run_until_shutdown().await
}

fn check_config() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    println!("✅ Configuration is valid");
    println!("  offers database:      {}", config.offers_database_id);
    println!("  advertisers database: {}", config.advertisers_database_id);
    println!(
        "  free-text deals:      {}",
        if config.free_text_enabled() {
            format!("enabled ({} at {})", config.oracle_model, config.oracle_base_url)
        } else {
            "disabled".to_string()
        }
    );
    println!("  session timeout:      {}s", config.session_timeout.as_secs());
    Ok(())
}

fn parse(line: &str) -> Result<()> {
    match parse_line(line) {
        Ok(deal) => {
            println!("{}", serde_json::to_string_pretty(&deal)?);
            Ok(())
        }
        Err(err) => bail!("{err}"),
    }
}
