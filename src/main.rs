use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use promo_watcher::{
    AppConfig,
    bot::BotRunner,
    commands::CommandHandler,
    config::LoggingConfig,
    database::ProductStore,
    plugins::{PluginManager, notifiers::TelegramNotifier, sources::MercadoLivreSource},
    product_manager::ProductManager,
    scheduler::CycleScheduler,
    tracker::Tracker,
};

#[derive(Parser)]
#[command(name = "promo-watcher", version, about = "Watches marketplace prices and sends Telegram alerts")]
struct Cli {
    /// Configuration file (defaults to config/default.* when present)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler and the chat bot (default)
    Run,
    /// Check every tracked product once and exit
    Cycle,
    /// Fetch a product page and print what the extractor reads, without storing it
    Probe { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = AppConfig::load(cli.config.as_deref()).context("Invalid configuration")?;
            let _guard = init_tracing(&config.logging)?;
            run(config).await
        }
        Commands::Cycle => {
            let config = AppConfig::load(cli.config.as_deref()).context("Invalid configuration")?;
            let _guard = init_tracing(&config.logging)?;
            cycle(config).await
        }
        Commands::Probe { url } => {
            let config = AppConfig::read(cli.config.as_deref())?;
            let _guard = init_tracing(&config.logging)?;
            probe(config, &url).await
        }
    }
}

/// Console logging, or a daily rolling file when `logging.directory` is set.
/// `RUST_LOG` overrides the configured filter.
fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.filter)?,
    };

    match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "promo-watcher.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            Ok(None)
        }
    }
}

async fn build_tracker(config: &AppConfig) -> Result<Tracker> {
    let store = ProductStore::connect(&config.database)
        .await
        .context("Cannot open the product database")?;

    let plugins = PluginManager::new();
    plugins.initialize_default_plugins(config).await?;

    Ok(Tracker::new(store, plugins, config.notification_chat_id())
        .with_request_delay(Duration::from_millis(config.scraper.request_delay_ms)))
}

async fn run(config: AppConfig) -> Result<()> {
    info!("Starting promo-watcher...");

    let tracker = build_tracker(&config).await?;
    let store = tracker.store().clone();
    let handler = CommandHandler::new(ProductManager::new(tracker.clone()), config.telegram.chat_id);
    let telegram = Arc::new(TelegramNotifier::new(&config.telegram)?);
    match telegram.bot_username().await {
        Ok(username) => info!(username = username.as_deref().unwrap_or("unknown"), "Connected to Telegram"),
        Err(e) => warn!(error = %e, "Could not reach Telegram, polling will keep retrying"),
    }
    let bot = BotRunner::new(telegram, handler, config.telegram.poll_timeout_secs);

    let mut scheduler = CycleScheduler::new(tracker, config.scheduler.clone()).await?;
    scheduler.start().await?;

    tokio::select! {
        _ = bot.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutting down...");
        }
    }

    scheduler.shutdown().await?;
    store.close().await;
    Ok(())
}

async fn cycle(config: AppConfig) -> Result<()> {
    let tracker = build_tracker(&config).await?;
    let summary = tracker.run_cycle().await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    tracker.store().close().await;
    Ok(())
}

async fn probe(config: AppConfig, url: &str) -> Result<()> {
    let plugins = PluginManager::new();
    plugins
        .register_source(Arc::new(MercadoLivreSource::new(&config.scraper)?))
        .await;

    let source = plugins.resolve(url).await?;
    let observation = source.observe(url).await?;
    println!("{}", serde_json::to_string_pretty(&observation)?);
    Ok(())
}
