//! Community Link Bot - Main Entry Point
//!
//! A Telegram bot that hands out community links from an inline keyboard
//! and deletes each link message after a configured delay.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use community_link_bot::bot::{Dispatcher, Supervisor, SupervisorMessage};
use community_link_bot::commands::{BotCommand, CommandHandler, UsageStats};
use community_link_bot::config::{BotSettings, LinkConfig, TelegramConfig};
use community_link_bot::scheduler::DeletionScheduler;
use community_link_bot::telegram::{ChatApi, RateLimiter, TelegramBot};

/// Telegram bot that shares community links and auto-deletes them.
#[derive(Parser, Debug)]
#[command(name = "link_bot")]
#[command(about = "Share community links that delete themselves after a delay")]
#[command(version)]
struct Args {
    /// Path to the links JSON file (overrides `LINKS_PATH`).
    #[arg(long)]
    links: Option<PathBuf>,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Also append logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Generate an example links file and exit.
    #[arg(long)]
    generate_links: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.log_file.as_deref())?;

    if args.generate_links {
        return generate_example_links();
    }

    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    // Configuration problems are fatal before anything connects
    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;

    let mut settings =
        BotSettings::from_env().context("Failed to load bot settings from environment")?;
    if let Some(path) = args.links {
        settings.links_path = path;
    }

    let links = LinkConfig::load(&settings.links_path).with_context(|| {
        format!("Failed to load links from {}", settings.links_path.display())
    })?;
    links.validate().context("Link configuration validation failed")?;

    info!(
        "Loaded {} links (auto-delete after {}s, {} admin(s))",
        links.len(),
        settings.auto_delete_delay_secs,
        settings.admin_ids.len()
    );
    if settings.admin_ids.is_empty() {
        warn!("No ADMIN_ID configured; /stats will be denied to everyone");
    }

    let bot = Arc::new(
        TelegramBot::connect(&tg_config, RateLimiter::new(settings.send_interval()))
            .await
            .context("Failed to connect to Telegram")?,
    );

    if let Err(e) = bot.set_commands(&BotCommand::menu()).await {
        warn!("Could not publish command menu: {}", e);
    }

    let max_restarts = settings.max_restarts;
    let handler = CommandHandler::new(
        Arc::new(links),
        Arc::new(settings),
        Arc::new(UsageStats::new()),
    );
    let scheduler = DeletionScheduler::new(Arc::clone(&bot));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&bot),
        handler,
        scheduler.clone(),
    ));

    let (supervisor_tx, supervisor_rx) = mpsc::channel::<SupervisorMessage>(1);
    let supervisor = Supervisor::new(Arc::clone(&bot), dispatcher, max_restarts);
    let mut supervisor_handle = tokio::spawn(async move { supervisor.run(supervisor_rx).await });

    info!("Bot is running. Use Ctrl+C to stop.");

    let outcome = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            let _ = supervisor_tx.send(SupervisorMessage::Shutdown).await;
            (&mut supervisor_handle).await.context("Update loop task panicked")?
        }
        result = &mut supervisor_handle => result.context("Update loop task panicked")?,
    };

    // Cleanup
    info!("Shutting down...");
    scheduler.shutdown().await;
    info!("Served {} chat(s) this session", bot.known_chats().await);
    bot.disconnect();

    outcome.context("Bot stopped")
}

/// Initializes the logging subsystem.
fn init_logging(level: &str, log_file: Option<&std::path::Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    Ok(())
}

/// Generates an example links file.
fn generate_example_links() -> Result<()> {
    let example = LinkConfig::example();
    example.save_to_file("links.example.json")?;

    println!("✓ Example links written to: links.example.json");
    println!("\nTo use this bot:");
    println!("1. Copy links.example.json to links.json");
    println!("2. Edit the labels and URLs");
    println!("3. Create a .env file with BOT_TOKEN, TG_API_ID, TG_API_HASH and ADMIN_ID");
    println!("4. Run: link_bot");

    Ok(())
}
