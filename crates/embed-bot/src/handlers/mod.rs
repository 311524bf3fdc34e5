//! Serenity event handler implementation

use std::sync::Arc;

use embed_core::InitOutcome;
use serenity::all::{
    Command, CommandInteraction, ComponentInteraction, Interaction, ModalInteraction,
};
use serenity::async_trait;
use serenity::builder::{
    CreateEmbed, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage,
};
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::errors::{classify, log_failure, log_serenity_error};
use crate::render;
use crate::state::BotState;

pub struct Handler;

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Discord bot connected as {}", ready.user.name);

        let Some(state) = bot_state(&ctx).await else {
            error!("BotState not found in context data");
            return;
        };

        match state
            .orchestrator
            .initialize(|| commands::discover(&state))
            .await
        {
            InitOutcome::Ready(_) => register_commands(&ctx, &state).await,
            InitOutcome::AlreadyInitialized => {
                debug!("Gateway session resumed; startup already complete");
            }
            InitOutcome::Failed(e) => {
                let _ = state.fatal.set(e.to_string());
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Some(state) = bot_state(&ctx).await else {
            return;
        };
        let Some(registry) = state.commands.get().cloned() else {
            warn!("Interaction received before startup completed; ignoring");
            return;
        };

        match interaction {
            Interaction::Command(cmd) => {
                let Some(group) = registry.for_command(&cmd.data.name) else {
                    warn!("No command group for /{}", cmd.data.name);
                    return;
                };
                if let Err(e) = group.on_command(&ctx, &state, &cmd).await {
                    let context = format!("/{}", cmd.data.name);
                    report(&ctx, Responder::Command(&cmd), &context, e).await;
                }
            }
            Interaction::Component(comp) => {
                let Some(group) = registry.for_custom_id(&comp.data.custom_id) else {
                    warn!("No command group for component {}", comp.data.custom_id);
                    return;
                };
                if let Err(e) = group.on_component(&ctx, &state, &comp).await {
                    let context = comp.data.custom_id.clone();
                    report(&ctx, Responder::Component(&comp), &context, e).await;
                }
            }
            Interaction::Modal(modal) => {
                let Some(group) = registry.for_custom_id(&modal.data.custom_id) else {
                    warn!("No command group for dialog {}", modal.data.custom_id);
                    return;
                };
                if let Err(e) = group.on_modal(&ctx, &state, &modal).await {
                    let context = modal.data.custom_id.clone();
                    report(&ctx, Responder::Modal(&modal), &context, e).await;
                }
            }
            _ => {
                // Autocomplete and ping are not used
            }
        }
    }
}

async fn bot_state(ctx: &Context) -> Option<Arc<BotState>> {
    let data = ctx.data.read().await;
    data.get::<BotState>().cloned()
}

async fn register_commands(ctx: &Context, state: &BotState) {
    let Some(registry) = state.commands.get() else {
        return;
    };
    match Command::set_global_commands(&ctx.http, registry.create_commands()).await {
        Ok(registered) => info!("Registered {} slash commands", registered.len()),
        Err(e) => log_serenity_error("Failed to register slash commands", &e),
    }
}

/// The interaction a failure is reported back to
enum Responder<'a> {
    Command(&'a CommandInteraction),
    Component(&'a ComponentInteraction),
    Modal(&'a ModalInteraction),
}

impl Responder<'_> {
    async fn respond(&self, ctx: &Context, embed: CreateEmbed) -> serenity::Result<()> {
        let response = CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .embed(embed)
                .ephemeral(true),
        );
        match self {
            Responder::Command(i) => i.create_response(&ctx.http, response).await,
            Responder::Component(i) => i.create_response(&ctx.http, response).await,
            Responder::Modal(i) => i.create_response(&ctx.http, response).await,
        }
    }

    async fn follow_up(&self, ctx: &Context, embed: CreateEmbed) -> serenity::Result<()> {
        let followup = CreateInteractionResponseFollowup::new()
            .embed(embed)
            .ephemeral(true);
        let sent = match self {
            Responder::Command(i) => i.create_followup(&ctx.http, followup).await,
            Responder::Component(i) => i.create_followup(&ctx.http, followup).await,
            Responder::Modal(i) => i.create_followup(&ctx.http, followup).await,
        };
        sent.map(|_| ())
    }
}

/// Tell the requester what went wrong. Falls back to a follow-up when the
/// interaction was already answered.
async fn report(ctx: &Context, responder: Responder<'_>, context: &str, err: anyhow::Error) {
    let failure = classify(&err);
    log_failure(context, &err, &failure);

    let embed = render::error_embed(failure.message());
    if responder.respond(ctx, embed.clone()).await.is_ok() {
        return;
    }
    if let Err(e) = responder.follow_up(ctx, embed).await {
        log_serenity_error("Failed to report interaction error", &e);
    }
}
