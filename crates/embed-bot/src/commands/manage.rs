//! `/list`, `/load` and the dispatch panel (send, export, edit)

use std::sync::Arc;

use anyhow::Result;
use embed_core::{
    export, ActivationError, Backing, DocumentStore, Error as CoreError, ExportPayload,
};
use embed_types::{Document, OwnerId};
use serenity::all::{
    CommandDataOption, CommandInteraction, CommandOptionType, ComponentInteraction,
    ComponentInteractionDataKind,
};
use serenity::async_trait;
use serenity::builder::{
    CreateAttachment, CreateCommand, CreateCommandOption, CreateEmbed, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateMessage,
};
use serenity::prelude::Context;
use tracing::{info, warn};

use super::{builder_panel, ephemeral, ephemeral_panel, CommandGroup, CommandRegistry};
use crate::errors::{log_serenity_error, send_failed_message};
use crate::render::{self, ids, DispatchAction, PanelKey};
use crate::state::{BotState, DraftCache};

const NO_SAVED_DOCUMENTS: &str = "You have no saved embeds. Create one with /create.";
const PANEL_EXPIRED: &str = "This panel has expired. Use /load or /create again.";

pub(super) fn activate(registry: &mut CommandRegistry) -> Result<(), ActivationError> {
    registry.register(Arc::new(ManageGroup))
}

pub struct ManageGroup;

#[async_trait]
impl CommandGroup for ManageGroup {
    fn name(&self) -> &'static str {
        "manage"
    }

    fn commands(&self) -> Vec<CreateCommand> {
        vec![
            CreateCommand::new(ids::CMD_LIST).description("List your saved embeds"),
            CreateCommand::new(ids::CMD_LOAD)
                .description("Load a saved embed")
                .add_option(
                    CreateCommandOption::new(
                        CommandOptionType::String,
                        ids::OPT_NAME,
                        "Name of the saved embed",
                    )
                    .required(true),
                ),
        ]
    }

    fn command_names(&self) -> &'static [&'static str] {
        &[ids::CMD_LIST, ids::CMD_LOAD]
    }

    fn component_prefixes(&self) -> &'static [&'static str] {
        &[ids::LIST_PREFIX, ids::DISPATCH_PREFIX]
    }

    async fn on_command(
        &self,
        ctx: &Context,
        state: &BotState,
        cmd: &CommandInteraction,
    ) -> Result<()> {
        let owner = cmd.user.id.get();
        let response = match cmd.data.name.as_str() {
            ids::CMD_LIST => {
                let names = state.store.list_names(owner).await;
                if names.is_empty() {
                    ephemeral(render::info_embed(NO_SAVED_DOCUMENTS))
                } else {
                    ephemeral_panel(vec![render::list_embed(&names)], render::list_buttons())
                }
            }
            ids::CMD_LOAD => {
                let name = option_str(&cmd.data.options, ids::OPT_NAME).unwrap_or_default();
                load(state, owner, name.trim()).await?
            }
            other => {
                warn!("Unknown manage command: /{}", other);
                return Ok(());
            }
        };

        cmd.create_response(&ctx.http, response).await?;
        Ok(())
    }

    async fn on_component(
        &self,
        ctx: &Context,
        state: &BotState,
        comp: &ComponentInteraction,
    ) -> Result<()> {
        let owner = comp.user.id.get();
        if let Some((action, key)) = render::parse_dispatch_id(&comp.data.custom_id) {
            let response = dispatch(ctx, state, comp, action, &key).await?;
            comp.create_response(&ctx.http, response).await?;
            return Ok(());
        }

        let response = match comp.data.custom_id.as_str() {
            ids::LIST_LOAD => {
                name_picker(state, owner, ids::LIST_SELECT_LOAD, "Choose an embed to load").await
            }
            ids::LIST_DELETE => {
                name_picker(state, owner, ids::LIST_SELECT_DELETE, "Choose an embed to delete")
                    .await
            }
            ids::LIST_SELECT_LOAD => match selected(comp) {
                Some(name) => load(state, owner, name).await?,
                None => return Ok(()),
            },
            ids::LIST_SELECT_DELETE => match selected(comp) {
                Some(name) => delete(state, owner, name).await?,
                None => return Ok(()),
            },
            other => {
                warn!("Unknown manage component: {}", other);
                return Ok(());
            }
        };

        comp.create_response(&ctx.http, response).await?;
        Ok(())
    }
}

/// The document a dispatch panel resolved to
#[derive(Debug, Clone, PartialEq)]
struct Dispatchable {
    /// Saved name, when the document came from the store.
    name: Option<String>,
    document: Document,
}

/// Find the document behind a panel. A saved document that has since been
/// deleted is an error; a draft that aged out is `None`.
async fn resolve<B: Backing>(
    store: &DocumentStore<B>,
    drafts: &DraftCache,
    owner: OwnerId,
    key: &PanelKey,
) -> Result<Option<Dispatchable>> {
    let entry = match key {
        PanelKey::Saved(name) => {
            let document = store
                .get(owner, name)
                .await
                .ok_or_else(|| CoreError::DocumentNotFound { name: name.clone() })?;
            Some(Dispatchable {
                name: Some(name.clone()),
                document,
            })
        }
        PanelKey::Draft(token) => drafts
            .get(owner, *token)
            .await
            .map(|document| Dispatchable {
                name: None,
                document,
            }),
    };
    Ok(entry)
}

async fn dispatch(
    ctx: &Context,
    state: &BotState,
    comp: &ComponentInteraction,
    action: DispatchAction,
    key: &PanelKey,
) -> Result<CreateInteractionResponse> {
    let owner = comp.user.id.get();
    let Some(entry) = resolve(&state.store, &state.drafts, owner, key).await? else {
        return Ok(ephemeral(render::error_embed(PANEL_EXPIRED)));
    };

    let response = match action {
        DispatchAction::Send => send_to_channel(ctx, comp, &entry.document).await,
        DispatchAction::Export => export_response(&entry)?,
        DispatchAction::Edit => {
            state.sessions.begin_with(owner, entry.document).await;
            builder_panel(state, owner).await
        }
    };
    Ok(response)
}

/// Show a stored document with its dispatch panel.
async fn load(state: &BotState, owner: OwnerId, name: &str) -> Result<CreateInteractionResponse> {
    let document = state
        .store
        .get(owner, name)
        .await
        .ok_or_else(|| CoreError::DocumentNotFound {
            name: name.to_string(),
        })?;

    Ok(ephemeral_panel(
        vec![
            render::success_embed(format!(
                "Loaded '{}'. Send it, export it or edit it below.",
                name
            )),
            render::document_embed(&document),
        ],
        render::dispatch_buttons(&PanelKey::Saved(name.to_string())),
    ))
}

async fn delete(
    state: &BotState,
    owner: OwnerId,
    name: &str,
) -> Result<CreateInteractionResponse> {
    if !state.store.delete(owner, name).await {
        return Err(CoreError::DocumentNotFound {
            name: name.to_string(),
        }
        .into());
    }
    info!(owner, name, "Deleted saved document");
    Ok(ephemeral(render::success_embed(format!(
        "'{}' was deleted.",
        name
    ))))
}

async fn name_picker(
    state: &BotState,
    owner: OwnerId,
    custom_id: &str,
    placeholder: &str,
) -> CreateInteractionResponse {
    let names = state.store.list_names(owner).await;
    if names.is_empty() {
        return ephemeral(render::info_embed(NO_SAVED_DOCUMENTS));
    }
    ephemeral_panel(
        Vec::new(),
        vec![render::name_select(custom_id, placeholder, &names)],
    )
}

/// Post the document to the channel the panel lives in. Failures are
/// reported to the requester, not raised.
async fn send_to_channel(
    ctx: &Context,
    comp: &ComponentInteraction,
    document: &Document,
) -> CreateInteractionResponse {
    let message = CreateMessage::new().embed(render::document_embed(document));
    match comp.channel_id.send_message(&ctx.http, message).await {
        Ok(_) => ephemeral(render::success_embed("Embed sent.")),
        Err(e) => {
            log_serenity_error("Failed to send embed", &e);
            ephemeral(render::error_embed(send_failed_message(&e)))
        }
    }
}

fn export_response(entry: &Dispatchable) -> Result<CreateInteractionResponse> {
    let response = match export(&entry.document, entry.name.as_deref())? {
        ExportPayload::Inline(text) => ephemeral(export_embed(entry.name.as_deref(), text)),
        ExportPayload::Attachment { filename, bytes } => CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .add_file(CreateAttachment::bytes(bytes, filename))
                .ephemeral(true),
        ),
    };
    Ok(response)
}

fn export_embed(name: Option<&str>, text: String) -> CreateEmbed {
    let title = match name {
        Some(name) => format!("'{}' JSON", name),
        None => "Embed JSON".to_string(),
    };
    render::info_embed(text).title(title)
}

fn selected(comp: &ComponentInteraction) -> Option<&str> {
    match &comp.data.kind {
        ComponentInteractionDataKind::StringSelect { values } => {
            values.first().map(String::as_str)
        }
        _ => None,
    }
}

fn option_str<'a>(options: &'a [CommandDataOption], name: &str) -> Option<&'a str> {
    options
        .iter()
        .find(|o| o.name == name)
        .and_then(|o| o.value.as_str())
}
