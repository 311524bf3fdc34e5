//! Embed builder bot
//!
//! Lets Discord users compose rich embeds through slash commands, buttons
//! and dialogs, save them per user, and send or export them later.

mod commands;
mod config;
mod errors;
mod handlers;
mod render;
mod state;

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use embed_core::{Backing, DocumentStore, FileBacking, Orchestrator, ShutdownCallbacks};
use serenity::gateway::ActivityData;
use serenity::model::gateway::GatewayIntents;
use serenity::prelude::*;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::handlers::Handler;
use crate::state::{BotState, ShardConnection};

/// Embed builder bot CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/embed-bot.toml")]
    config: String,

    /// Discord bot token (overrides config file)
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    bot_token: Option<String>,

    /// Activity text (overrides config file)
    #[arg(long, env = "EMBED_ACTIVITY_NAME")]
    activity_name: Option<String>,

    /// Directory holding the document store (overrides config file)
    #[arg(long, env = "EMBED_DATA_DIR")]
    data_dir: Option<String>,

    /// Seconds between background flushes (overrides config file)
    #[arg(long, env = "EMBED_FLUSH_INTERVAL_SECS")]
    flush_interval_secs: Option<u64>,

    /// Seconds before an idle builder session is dropped, 0 to keep them
    /// (overrides config file)
    #[arg(long, env = "EMBED_SESSION_IDLE_SECS")]
    session_idle_secs: Option<u64>,
}

impl Args {
    fn apply(self, config: &mut Config) {
        if let Some(bot_token) = self.bot_token {
            config.discord.bot_token = bot_token;
        }
        if let Some(activity_name) = self.activity_name {
            config.discord.activity_name = activity_name;
        }
        if let Some(data_dir) = self.data_dir {
            config.storage.data_dir = data_dir.into();
        }
        if let Some(secs) = self.flush_interval_secs {
            config.lifecycle.flush_interval_secs = secs;
        }
        if let Some(secs) = self.session_idle_secs {
            config.lifecycle.session_idle_secs = secs;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "embed_bot=debug,embed_core=debug,serenity=warn,info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting embed builder bot");

    let args = Args::parse();

    let mut config = if Path::new(&args.config).exists() {
        info!("Loading config from file: {}", args.config);
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, loading from environment");
        Config::from_env()?
    };
    args.apply(&mut config);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {:#}", e);
        return Err(e);
    }

    let store = Arc::new(DocumentStore::new(FileBacking::new(
        config.storage.store_path(),
    )));
    info!("Document store: {}", store.backing().describe());

    let mut client = Client::builder(&config.discord.bot_token, GatewayIntents::GUILDS)
        .event_handler(Handler)
        .activity(ActivityData::competing(&config.discord.activity_name))
        .await
        .map_err(|e| anyhow!("Failed to create Discord client: {}", e))?;

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&store),
        ShardConnection(client.shard_manager.clone()),
        config.lifecycle.flush_interval(),
    ));
    let state = Arc::new(BotState::new(store, Arc::clone(&orchestrator)));

    {
        let mut data = client.data.write().await;
        data.insert::<BotState>(Arc::clone(&state));
    }

    if let Some(max_age) = config.lifecycle.session_idle() {
        state
            .sessions
            .start_cleanup(max_age, orchestrator.cancellation().child_token());
    }

    // Graceful shutdown on SIGTERM or Ctrl+C: final flush, then close shards.
    let callbacks = ShutdownCallbacks::new();
    {
        let orchestrator = Arc::clone(&orchestrator);
        callbacks.register(move || {
            tokio::spawn(async move {
                orchestrator.shutdown().await;
            });
        });
    }
    callbacks.install_signal_handler();

    info!("Starting Discord gateway connection...");

    // Blocks until all shards are stopped
    let run = client.start().await;
    if let Err(e) = &run {
        error!("Discord client error: {}", e);
    }

    // No-op when a signal or failed startup already shut down; otherwise the
    // gateway stopped on its own and the store still needs its final flush.
    orchestrator.shutdown().await;

    if let Some(reason) = state.fatal.get() {
        bail!("Startup failed: {}", reason);
    }
    run.map_err(|e| anyhow!("Discord client error: {}", e))?;

    info!("Embed bot stopped");
    Ok(())
}
