//! Group Tally Bot - Main Entry Point
//!
//! A Telegram group bot that answers a reply-keyboard menu and posts daily
//! activity leaderboards.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use group_tally_bot::app::App;
use group_tally_bot::commands::CommandHandler;
use group_tally_bot::config::{BotSettings, MenuConfig, ScheduleSettings, TelegramConfig};
use group_tally_bot::menu::MenuDispatcher;
use group_tally_bot::scheduler::{LeaderboardScheduler, SchedulerMessage};
use group_tally_bot::tally::CounterStore;
use group_tally_bot::telegram::{AdminCache, TelegramBot, updates};

/// Telegram group bot with a canned-reply menu and activity leaderboards.
#[derive(Parser, Debug)]
#[command(name = "group_tally_bot")]
#[command(about = "Count group activity and post daily leaderboards")]
#[command(version)]
struct Args {
    /// Path to the menu JSON file (overrides `MENU_PATH`).
    #[arg(short, long)]
    menu: Option<PathBuf>,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[arg(short, long)]
    log_level: Option<String>,

    /// Generate an example menu file and exit.
    #[arg(long)]
    generate_menu: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load environment variables before anything reads them
    let env_loaded = dotenvy::from_filename(&args.env_file);

    let bot_settings = BotSettings::from_env_with_defaults();
    init_logging(args.log_level.as_deref().unwrap_or(&bot_settings.log_level));

    if let Err(e) = env_loaded {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    if args.generate_menu {
        return generate_example_menu();
    }

    // Load configurations
    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;

    let schedule = ScheduleSettings::from_env_with_defaults();
    schedule.validate().context("Invalid schedule settings")?;
    let offset = schedule.offset().context("Invalid timezone offset")?;

    let menu_path = args.menu.unwrap_or_else(|| bot_settings.menu_path.clone());
    let menu = MenuConfig::load_from_file(&menu_path)
        .with_context(|| format!("Failed to load menu from {}", menu_path.display()))?;
    menu.validate().context("Menu configuration validation failed")?;

    info!("Loaded {} menu entries from {}", menu.len(), menu_path.display());

    // Connect to Telegram
    let bot = TelegramBot::connect(&tg_config)
        .await
        .context("Failed to connect to Telegram")?;

    let gateway = Arc::new(bot.clone());
    let store = Arc::new(CounterStore::new(bot_settings.dedup_capacity));

    let app = Arc::new(App::new(
        Arc::clone(&gateway),
        Arc::clone(&store),
        MenuDispatcher::new(menu, Arc::clone(&gateway)),
        CommandHandler::new(bot.username(), Arc::clone(&store), schedule.top_n, offset),
        AdminCache::new(bot_settings.admin_cache_ttl()),
    ));

    // Create scheduler channel
    let (scheduler_tx, scheduler_rx) = mpsc::channel::<SchedulerMessage>(32);
    let scheduler = LeaderboardScheduler::new(Arc::clone(&gateway), Arc::clone(&store), schedule);

    info!("Starting group tally bot...");

    // Spawn scheduler task
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(scheduler_rx).await;
    });

    info!("Bot is running. Use Ctrl+C to stop.");
    updates::dispatch(&bot, app).await;

    // Cleanup
    info!("Shutting down...");
    if scheduler_tx.send(SchedulerMessage::Shutdown).await.is_err() {
        warn!("Scheduler already stopped");
    }
    if let Err(e) = scheduler_handle.await {
        warn!("Scheduler task failed: {}", e);
    }

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Generates an example menu file.
fn generate_example_menu() -> Result<()> {
    let example = MenuConfig::example();
    example.save_to_file("menu.example.json")?;

    println!("✓ Example menu written to: menu.example.json");
    println!("\nTo use this bot:");
    println!("1. Copy menu.example.json to menu.json");
    println!("2. Edit the entries and links to your liking");
    println!("3. Create a .env file with TG_BOT_TOKEN");
    println!("4. Add the bot to your group and make it an admin (to pin and delete)");
    println!("5. Run: group_tally_bot");

    Ok(())
}
