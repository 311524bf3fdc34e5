//! `/create` and the builder panel

use std::sync::Arc;

use anyhow::{bail, Result};
use embed_core::{ActivationError, ApplyOutcome, Error as CoreError};
use embed_types::commands::parse_inline_flag;
use embed_types::{EditCommand, InitialInput, OwnerId};
use serenity::all::{CommandInteraction, ComponentInteraction, ModalInteraction};
use serenity::async_trait;
use serenity::builder::{CreateCommand, CreateInteractionResponse, CreateModal};
use serenity::prelude::Context;
use tracing::{debug, warn};

use super::{builder_panel, ephemeral, ephemeral_panel, CommandGroup, CommandRegistry};
use crate::render::{self, ids, ModalValues, PanelKey};
use crate::state::BotState;

pub(super) fn activate(registry: &mut CommandRegistry) -> Result<(), ActivationError> {
    registry.register(Arc::new(CreateGroup))
}

pub struct CreateGroup;

#[async_trait]
impl CommandGroup for CreateGroup {
    fn name(&self) -> &'static str {
        "create"
    }

    fn commands(&self) -> Vec<CreateCommand> {
        vec![CreateCommand::new(ids::CMD_CREATE).description("Create a new embed")]
    }

    fn command_names(&self) -> &'static [&'static str] {
        &[ids::CMD_CREATE]
    }

    fn component_prefixes(&self) -> &'static [&'static str] {
        &[ids::BUILDER_PREFIX]
    }

    async fn on_command(
        &self,
        ctx: &Context,
        state: &BotState,
        cmd: &CommandInteraction,
    ) -> Result<()> {
        let owner = cmd.user.id.get();
        state.sessions.begin(owner).await;
        cmd.create_response(&ctx.http, CreateInteractionResponse::Modal(render::create_modal()))
            .await?;
        Ok(())
    }

    async fn on_component(
        &self,
        ctx: &Context,
        state: &BotState,
        comp: &ComponentInteraction,
    ) -> Result<()> {
        let owner = comp.user.id.get();
        let response = match comp.data.custom_id.as_str() {
            ids::BUILDER_TITLE => dialog(state, owner, render::title_modal()).await?,
            ids::BUILDER_FIELD => dialog(state, owner, render::field_modal()).await?,
            ids::BUILDER_COLOR => dialog(state, owner, render::color_modal()).await?,
            ids::BUILDER_SAVE => dialog(state, owner, render::save_modal()).await?,
            ids::BUILDER_PREVIEW => {
                let ApplyOutcome::Preview(document) =
                    state.sessions.apply(owner, EditCommand::Preview).await?
                else {
                    bail!("preview did not return a document");
                };
                ephemeral(render::document_embed(&document))
            }
            ids::BUILDER_DONE => {
                let ApplyOutcome::Finalized(document) =
                    state.sessions.apply(owner, EditCommand::Finalize).await?
                else {
                    bail!("finalize did not return a document");
                };
                let embed = render::document_embed(&document);
                let token = state.drafts.put(owner, document).await;
                ephemeral_panel(
                    vec![
                        render::success_embed(
                            "Your embed is ready. Send it to this channel or export it as JSON below.",
                        ),
                        embed,
                    ],
                    render::dispatch_buttons(&PanelKey::Draft(token)),
                )
            }
            other => {
                warn!("Unknown builder component: {}", other);
                return Ok(());
            }
        };

        comp.create_response(&ctx.http, response).await?;
        Ok(())
    }

    async fn on_modal(
        &self,
        ctx: &Context,
        state: &BotState,
        modal: &ModalInteraction,
    ) -> Result<()> {
        let owner = modal.user.id.get();
        let values = ModalValues::from_rows(&modal.data.components);
        let custom_id = modal.data.custom_id.as_str();

        let response = if custom_id == ids::MODAL_CREATE {
            state
                .sessions
                .fill_initial(owner, initial_input(values))
                .await?;
            builder_panel(state, owner).await
        } else if let Some(command) = dialog_command(custom_id, values) {
            match state.sessions.apply(owner, command).await? {
                ApplyOutcome::Saved { name } => {
                    ephemeral(render::success_embed(format!("Saved as '{}'.", name)))
                }
                _ => builder_panel(state, owner).await,
            }
        } else {
            warn!("Unknown builder dialog: {}", custom_id);
            return Ok(());
        };

        modal.create_response(&ctx.http, response).await?;
        Ok(())
    }
}

/// Open a dialog, but only for an owner with a session to edit.
async fn dialog(
    state: &BotState,
    owner: OwnerId,
    modal: CreateModal,
) -> Result<CreateInteractionResponse> {
    if !state.sessions.has_session(owner).await {
        debug!(owner, "Builder button pressed without an active session");
        return Err(CoreError::NoActiveSession { owner }.into());
    }
    Ok(CreateInteractionResponse::Modal(modal))
}

fn initial_input(mut values: ModalValues) -> InitialInput {
    InitialInput {
        title: values.take(ids::INPUT_TITLE),
        description: values.take(ids::INPUT_DESCRIPTION).unwrap_or_default(),
        color: values.take(ids::INPUT_COLOR).map(|c| c.trim().to_string()),
    }
}

/// The edit command a builder dialog submits.
fn dialog_command(custom_id: &str, mut values: ModalValues) -> Option<EditCommand> {
    let command = match custom_id {
        ids::MODAL_TITLE => EditCommand::SetTitle {
            value: values.take(ids::INPUT_TITLE),
        },
        ids::MODAL_FIELD => EditCommand::AddField {
            inline: parse_inline_flag(values.get(ids::INPUT_FIELD_INLINE)),
            name: values.take(ids::INPUT_FIELD_NAME).unwrap_or_default(),
            value: values.take(ids::INPUT_FIELD_VALUE).unwrap_or_default(),
        },
        ids::MODAL_COLOR => EditCommand::SetColor {
            value: trimmed(values.take(ids::INPUT_COLOR)),
        },
        ids::MODAL_SAVE => EditCommand::Save {
            name: trimmed(values.take(ids::INPUT_SAVE_NAME)),
        },
        _ => return None,
    };
    Some(command)
}

/// Color tokens and saved names are identifiers; surrounding whitespace is
/// noise. Free text is kept as typed.
fn trimmed(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}
