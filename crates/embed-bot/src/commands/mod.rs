//! Command groups and their registration table
//!
//! Each group owns some slash commands and a set of component custom-id
//! prefixes. Groups are activated at startup from [`EXTENSIONS`] by the
//! core extension loader; a group that fails to activate is reported and
//! the rest still load.

mod create;
mod manage;

use std::sync::Arc;

use anyhow::Result;
use embed_core::{ActivationError, Error as CoreError, ExtensionEntry, ExtensionLoader};
use serenity::all::{CommandInteraction, ComponentInteraction, ModalInteraction};
use serenity::async_trait;
use serenity::builder::{
    CreateActionRow, CreateCommand, CreateEmbed, CreateInteractionResponse,
    CreateInteractionResponseMessage,
};
use serenity::prelude::Context;
use tracing::debug;

use crate::render;
use crate::state::BotState;

pub use create::CreateGroup;
pub use manage::ManageGroup;

/// Command groups, activated in table order after sorting by name.
pub static EXTENSIONS: &[ExtensionEntry<CommandRegistry>] = &[
    ExtensionEntry::module("create", create::activate),
    ExtensionEntry::module("manage", manage::activate),
];

/// A set of slash commands and the component interactions they spawn
#[async_trait]
pub trait CommandGroup: Send + Sync {
    fn name(&self) -> &'static str;

    /// Slash command definitions to register globally.
    fn commands(&self) -> Vec<CreateCommand>;

    /// Names of the slash commands in [`CommandGroup::commands`].
    fn command_names(&self) -> &'static [&'static str];

    /// Component and dialog custom ids starting with one of these are
    /// routed to this group.
    fn component_prefixes(&self) -> &'static [&'static str];

    async fn on_command(
        &self,
        ctx: &Context,
        state: &BotState,
        cmd: &CommandInteraction,
    ) -> Result<()>;

    async fn on_component(
        &self,
        ctx: &Context,
        state: &BotState,
        comp: &ComponentInteraction,
    ) -> Result<()>;

    async fn on_modal(
        &self,
        _ctx: &Context,
        _state: &BotState,
        modal: &ModalInteraction,
    ) -> Result<()> {
        debug!(group = self.name(), custom_id = %modal.data.custom_id, "Unhandled dialog");
        Ok(())
    }
}

/// Activated command groups
#[derive(Default)]
pub struct CommandRegistry {
    groups: Vec<Arc<dyn CommandGroup>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group. Fails if one of its commands or prefixes is already
    /// owned by another group.
    pub fn register(
        &mut self,
        group: Arc<dyn CommandGroup>,
    ) -> std::result::Result<(), ActivationError> {
        for existing in &self.groups {
            if let Some(name) = group
                .command_names()
                .iter()
                .find(|n| existing.command_names().contains(*n))
            {
                return Err(ActivationError::new(format!(
                    "command '/{}' is already registered by '{}'",
                    name,
                    existing.name()
                )));
            }
            if let Some(prefix) = group
                .component_prefixes()
                .iter()
                .find(|p| existing.component_prefixes().contains(*p))
            {
                return Err(ActivationError::new(format!(
                    "component prefix '{}' is already registered by '{}'",
                    prefix,
                    existing.name()
                )));
            }
        }
        self.groups.push(group);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Every slash command of every group.
    pub fn create_commands(&self) -> Vec<CreateCommand> {
        self.groups.iter().flat_map(|g| g.commands()).collect()
    }

    pub fn for_command(&self, name: &str) -> Option<Arc<dyn CommandGroup>> {
        self.groups
            .iter()
            .find(|g| g.command_names().contains(&name))
            .cloned()
    }

    pub fn for_custom_id(&self, custom_id: &str) -> Option<Arc<dyn CommandGroup>> {
        self.groups
            .iter()
            .find(|g| {
                g.component_prefixes()
                    .iter()
                    .any(|p| custom_id.starts_with(p))
            })
            .cloned()
    }
}

/// Activate every command group and install the registry in `state`.
pub fn discover(state: &BotState) -> embed_core::Result<ExtensionLoader> {
    let mut registry = CommandRegistry::new();
    let mut loader = ExtensionLoader::new();
    loader.load_group("commands", EXTENSIONS, &mut registry);

    state
        .commands
        .set(Arc::new(registry))
        .map_err(|_| CoreError::FatalInit("command registry installed twice".to_string()))?;
    Ok(loader)
}

// ── Shared responses ─────────────────────────────────────────────────────────

pub(crate) fn ephemeral(embed: CreateEmbed) -> CreateInteractionResponse {
    ephemeral_panel(vec![embed], Vec::new())
}

pub(crate) fn ephemeral_panel(
    embeds: Vec<CreateEmbed>,
    components: Vec<CreateActionRow>,
) -> CreateInteractionResponse {
    CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .embeds(embeds)
            .components(components)
            .ephemeral(true),
    )
}

/// The builder panel for `owner`'s current session.
pub(crate) async fn builder_panel(state: &BotState, owner: u64) -> CreateInteractionResponse {
    let summary = state.sessions.summary(owner).await;
    ephemeral_panel(
        vec![render::builder_embed(&summary)],
        render::builder_buttons(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::ids;

    #[test]
    fn test_extension_table_activates_both_groups() {
        let mut registry = CommandRegistry::new();
        let mut loader = ExtensionLoader::new();
        let count = loader.load_group("commands", EXTENSIONS, &mut registry);

        assert_eq!(count, 2);
        assert_eq!(loader.summary(), "loaded: 2");
        assert_eq!(
            loader.loaded(),
            &["commands.create".to_string(), "commands.manage".to_string()]
        );
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.create_commands().len(), 3);
    }

    #[test]
    fn test_routing_by_command_and_prefix() {
        let mut registry = CommandRegistry::new();
        let mut loader = ExtensionLoader::new();
        loader.load_group("commands", EXTENSIONS, &mut registry);

        assert_eq!(registry.for_command(ids::CMD_CREATE).unwrap().name(), "create");
        assert_eq!(registry.for_command(ids::CMD_LIST).unwrap().name(), "manage");
        assert_eq!(registry.for_command(ids::CMD_LOAD).unwrap().name(), "manage");
        assert!(registry.for_command("ping").is_none());

        assert_eq!(
            registry.for_custom_id(ids::MODAL_FIELD).unwrap().name(),
            "create"
        );
        assert_eq!(
            registry.for_custom_id(ids::LIST_SELECT_LOAD).unwrap().name(),
            "manage"
        );
        assert_eq!(
            registry.for_custom_id(ids::DISPATCH_EXPORT).unwrap().name(),
            "manage"
        );
        assert!(registry.for_custom_id("other:thing").is_none());
    }

    #[test]
    fn test_duplicate_group_fails_activation() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(CreateGroup)).unwrap();
        let err = registry.register(Arc::new(CreateGroup)).unwrap_err();
        assert!(err.0.contains("/create"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_group_is_reported_not_fatal() {
        static DOUBLED: &[ExtensionEntry<CommandRegistry>] = &[
            ExtensionEntry::module("create", create::activate),
            ExtensionEntry::module("create_again", create::activate),
            ExtensionEntry::module("manage", manage::activate),
        ];
        let mut registry = CommandRegistry::new();
        let mut loader = ExtensionLoader::new();
        loader.load_group("commands", DOUBLED, &mut registry);

        assert_eq!(loader.loaded().len(), 2);
        assert_eq!(loader.failed().len(), 1);
        assert_eq!(loader.failed()[0].0, "commands.create_again");
        assert_eq!(registry.len(), 2);
    }
}
