//! Discord presentation of documents, panels and dialogs
//!
//! Everything here builds serenity request builders; nothing talks to the
//! API. Component custom ids live in [`ids`] so the command groups can route
//! on them.

use std::collections::HashMap;

use embed_types::color::{palette_names, DEFAULT_COLOR, ERROR_COLOR, SUCCESS_COLOR};
use embed_types::limits::{
    MAX_DESCRIPTION_LEN, MAX_DOCUMENT_NAME_LEN, MAX_FIELD_NAME_LEN, MAX_FIELD_VALUE_LEN,
    MAX_TITLE_LEN,
};
use embed_types::Document;
use serenity::all::{ActionRow, ActionRowComponent, ButtonStyle, InputTextStyle};
use serenity::builder::{
    CreateActionRow, CreateButton, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter,
    CreateInputText, CreateModal, CreateSelectMenu, CreateSelectMenuKind, CreateSelectMenuOption,
};

/// Discord caps a string select at this many options.
pub const MAX_SELECT_OPTIONS: usize = 25;

/// Color-code inputs are short; this fits `#RRGGBB`, `0xRRGGBB` and names.
const COLOR_INPUT_MAX: u16 = 10;

/// Longest value a dialog text input accepts.
const TEXT_INPUT_MAX: u16 = 4000;

/// Room kept at the end of the list description for "…and N more".
const LIST_TAIL_RESERVE: usize = 32;

pub mod ids {
    // Slash commands
    pub const CMD_CREATE: &str = "create";
    pub const CMD_LIST: &str = "list";
    pub const CMD_LOAD: &str = "load";
    pub const OPT_NAME: &str = "name";

    // Builder panel buttons
    pub const BUILDER_PREFIX: &str = "builder:";
    pub const BUILDER_TITLE: &str = "builder:title";
    pub const BUILDER_FIELD: &str = "builder:field";
    pub const BUILDER_COLOR: &str = "builder:color";
    pub const BUILDER_PREVIEW: &str = "builder:preview";
    pub const BUILDER_SAVE: &str = "builder:save";
    pub const BUILDER_DONE: &str = "builder:done";

    // Builder dialogs
    pub const MODAL_CREATE: &str = "builder:modal:create";
    pub const MODAL_TITLE: &str = "builder:modal:title";
    pub const MODAL_FIELD: &str = "builder:modal:field";
    pub const MODAL_COLOR: &str = "builder:modal:color";
    pub const MODAL_SAVE: &str = "builder:modal:save";

    // Dialog inputs
    pub const INPUT_TITLE: &str = "title";
    pub const INPUT_DESCRIPTION: &str = "description";
    pub const INPUT_COLOR: &str = "color";
    pub const INPUT_FIELD_NAME: &str = "field_name";
    pub const INPUT_FIELD_VALUE: &str = "field_value";
    pub const INPUT_FIELD_INLINE: &str = "field_inline";
    pub const INPUT_SAVE_NAME: &str = "save_name";

    // Saved-document list
    pub const LIST_PREFIX: &str = "list:";
    pub const LIST_LOAD: &str = "list:load";
    pub const LIST_DELETE: &str = "list:delete";
    pub const LIST_SELECT_LOAD: &str = "list:select:load";
    pub const LIST_SELECT_DELETE: &str = "list:select:delete";

    // Dispatch panel; the panel key follows the action
    pub const DISPATCH_PREFIX: &str = "dispatch:";
    pub const DISPATCH_SEND: &str = "dispatch:send:";
    pub const DISPATCH_EXPORT: &str = "dispatch:export:";
    pub const DISPATCH_EDIT: &str = "dispatch:edit:";
}

/// The document as a Discord embed. Absent parts are left out.
pub fn document_embed(document: &Document) -> CreateEmbed {
    let mut embed = CreateEmbed::new().colour(document.color);

    if let Some(title) = &document.title {
        embed = embed.title(title);
    }
    if let Some(description) = &document.description {
        embed = embed.description(description);
    }
    for field in &document.fields {
        embed = embed.field(&field.name, &field.value, field.inline);
    }
    if let Some(author) = &document.author {
        embed = embed.author(CreateEmbedAuthor::new(author));
    }
    if let Some(footer) = &document.footer {
        embed = embed.footer(CreateEmbedFooter::new(footer));
    }
    if let Some(image) = &document.image {
        embed = embed.image(image);
    }
    if let Some(thumbnail) = &document.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }
    embed
}

pub fn success_embed(message: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new()
        .description(message.into())
        .colour(SUCCESS_COLOR)
}

pub fn error_embed(message: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new().description(message.into()).colour(ERROR_COLOR)
}

pub fn info_embed(message: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new().description(message.into()).colour(DEFAULT_COLOR)
}

// ── Builder ──────────────────────────────────────────────────────────────────

/// Status embed of the builder panel.
pub fn builder_embed(summary: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title("Embed Builder")
        .description("Use the buttons below to customize your embed.")
        .colour(DEFAULT_COLOR)
        .field("Current settings", summary, false)
}

pub fn builder_buttons() -> Vec<CreateActionRow> {
    vec![
        CreateActionRow::Buttons(vec![
            button(ids::BUILDER_TITLE, "Add title", ButtonStyle::Secondary),
            button(ids::BUILDER_FIELD, "Add field", ButtonStyle::Secondary),
            button(ids::BUILDER_COLOR, "Change color", ButtonStyle::Secondary),
        ]),
        CreateActionRow::Buttons(vec![
            button(ids::BUILDER_PREVIEW, "Preview", ButtonStyle::Primary),
            button(ids::BUILDER_SAVE, "Save", ButtonStyle::Success),
            button(ids::BUILDER_DONE, "Done", ButtonStyle::Success),
        ]),
    ]
}

pub fn create_modal() -> CreateModal {
    CreateModal::new(ids::MODAL_CREATE, "Create embed").components(vec![
        input_row(
            CreateInputText::new(InputTextStyle::Short, "Title (optional)", ids::INPUT_TITLE)
                .placeholder("Title of the embed")
                .required(false)
                .max_length(MAX_TITLE_LEN as u16),
        ),
        input_row(
            CreateInputText::new(InputTextStyle::Paragraph, "Description", ids::INPUT_DESCRIPTION)
                .placeholder("Main content of the embed")
                .required(true)
                .max_length(TEXT_INPUT_MAX.min(MAX_DESCRIPTION_LEN as u16)),
        ),
        input_row(
            CreateInputText::new(InputTextStyle::Short, "Color (optional)", ids::INPUT_COLOR)
                .placeholder("e.g. RED, BLUE, GREEN or 0xFF0000")
                .required(false)
                .max_length(COLOR_INPUT_MAX),
        ),
    ])
}

pub fn title_modal() -> CreateModal {
    CreateModal::new(ids::MODAL_TITLE, "Set title").components(vec![input_row(
        CreateInputText::new(InputTextStyle::Short, "Title", ids::INPUT_TITLE)
            .placeholder("Embed title")
            .required(true)
            .max_length(MAX_TITLE_LEN as u16),
    )])
}

pub fn field_modal() -> CreateModal {
    CreateModal::new(ids::MODAL_FIELD, "Add field").components(vec![
        input_row(
            CreateInputText::new(InputTextStyle::Short, "Field name", ids::INPUT_FIELD_NAME)
                .required(true)
                .max_length(MAX_FIELD_NAME_LEN as u16),
        ),
        input_row(
            CreateInputText::new(InputTextStyle::Paragraph, "Field value", ids::INPUT_FIELD_VALUE)
                .required(true)
                .max_length(MAX_FIELD_VALUE_LEN as u16),
        ),
        input_row(
            CreateInputText::new(InputTextStyle::Short, "Inline (yes/no)", ids::INPUT_FIELD_INLINE)
                .placeholder("yes or no")
                .required(false)
                .max_length(3),
        ),
    ])
}

pub fn color_modal() -> CreateModal {
    CreateModal::new(ids::MODAL_COLOR, "Set color").components(vec![input_row(
        CreateInputText::new(InputTextStyle::Short, "Color", ids::INPUT_COLOR)
            .placeholder(color_placeholder())
            .required(true)
            .max_length(COLOR_INPUT_MAX),
    )])
}

pub fn save_modal() -> CreateModal {
    CreateModal::new(ids::MODAL_SAVE, "Save embed").components(vec![input_row(
        CreateInputText::new(InputTextStyle::Short, "Name", ids::INPUT_SAVE_NAME)
            .placeholder("Name to save the embed under")
            .required(true)
            .max_length(MAX_DOCUMENT_NAME_LEN as u16),
    )])
}

/// Discord limits placeholders to 100 characters.
fn color_placeholder() -> String {
    let text = format!("One of: {}", palette_names());
    if text.chars().count() <= 100 {
        return text;
    }
    let mut cut: String = text.chars().take(97).collect();
    cut.push_str("...");
    cut
}

// ── Saved documents ──────────────────────────────────────────────────────────

/// Saved names as a bullet list. Names that would push the description past
/// Discord's limit are folded into a trailing "…and N more".
pub fn list_embed(names: &[String]) -> CreateEmbed {
    let budget = MAX_DESCRIPTION_LEN - LIST_TAIL_RESERVE;
    let mut body = String::new();
    let mut used = 0;
    let mut shown = 0;
    for name in names {
        let line = format!("• {}", name);
        let cost = line.chars().count() + usize::from(shown > 0);
        if used + cost > budget {
            break;
        }
        if shown > 0 {
            body.push('\n');
        }
        body.push_str(&line);
        used += cost;
        shown += 1;
    }

    let hidden = names.len() - shown;
    if hidden > 0 {
        if shown > 0 {
            body.push('\n');
        }
        body.push_str(&format!("…and {} more", hidden));
    }

    CreateEmbed::new()
        .title("Saved embeds")
        .description(body)
        .colour(DEFAULT_COLOR)
        .footer(CreateEmbedFooter::new(format!("{} total", names.len())))
}

pub fn list_buttons() -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(vec![
        button(ids::LIST_LOAD, "Load", ButtonStyle::Primary),
        button(ids::LIST_DELETE, "Delete", ButtonStyle::Danger),
    ])]
}

/// Select menu of saved names; only the first [`MAX_SELECT_OPTIONS`] fit.
pub fn name_select(custom_id: &str, placeholder: &str, names: &[String]) -> CreateActionRow {
    let options = names
        .iter()
        .take(MAX_SELECT_OPTIONS)
        .map(|name| CreateSelectMenuOption::new(name, name))
        .collect();
    CreateActionRow::SelectMenu(
        CreateSelectMenu::new(custom_id, CreateSelectMenuKind::String { options })
            .placeholder(placeholder),
    )
}

// ── Dispatch ─────────────────────────────────────────────────────────────────

/// The document a dispatch panel acts on. Saved documents are re-read from
/// the store by name on every click; finished drafts live in memory under a
/// per-owner token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelKey {
    Saved(String),
    Draft(u64),
}

impl PanelKey {
    fn encode(&self) -> String {
        match self {
            PanelKey::Saved(name) => format!("n:{}", name),
            PanelKey::Draft(token) => format!("d:{}", token),
        }
    }

    fn decode(text: &str) -> Option<Self> {
        if let Some(name) = text.strip_prefix("n:") {
            return (!name.is_empty()).then(|| PanelKey::Saved(name.to_string()));
        }
        text.strip_prefix("d:")?.parse().ok().map(PanelKey::Draft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchAction {
    Send,
    Export,
    Edit,
}

impl DispatchAction {
    fn prefix(self) -> &'static str {
        match self {
            DispatchAction::Send => ids::DISPATCH_SEND,
            DispatchAction::Export => ids::DISPATCH_EXPORT,
            DispatchAction::Edit => ids::DISPATCH_EDIT,
        }
    }
}

pub fn dispatch_custom_id(action: DispatchAction, key: &PanelKey) -> String {
    format!("{}{}", action.prefix(), key.encode())
}

/// Parse a dispatch button id back into its action and panel key.
pub fn parse_dispatch_id(custom_id: &str) -> Option<(DispatchAction, PanelKey)> {
    [
        DispatchAction::Send,
        DispatchAction::Export,
        DispatchAction::Edit,
    ]
    .into_iter()
    .find_map(|action| {
        let key = PanelKey::decode(custom_id.strip_prefix(action.prefix())?)?;
        Some((action, key))
    })
}

/// Buttons under a finished or loaded document. Edit is offered only for
/// saved documents.
pub fn dispatch_buttons(key: &PanelKey) -> Vec<CreateActionRow> {
    let mut buttons = vec![
        button(
            &dispatch_custom_id(DispatchAction::Send, key),
            "Send to this channel",
            ButtonStyle::Success,
        ),
        button(
            &dispatch_custom_id(DispatchAction::Export, key),
            "Export JSON",
            ButtonStyle::Secondary,
        ),
    ];
    if matches!(key, PanelKey::Saved(_)) {
        buttons.push(button(
            &dispatch_custom_id(DispatchAction::Edit, key),
            "Edit",
            ButtonStyle::Primary,
        ));
    }
    vec![CreateActionRow::Buttons(buttons)]
}

// ── Dialog input ─────────────────────────────────────────────────────────────

/// Submitted values of a dialog keyed by input id. Blank inputs are absent;
/// everything else is kept as typed, surrounding whitespace included.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ModalValues(HashMap<String, String>);

impl ModalValues {
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let values = pairs
            .into_iter()
            .filter_map(|(id, value)| {
                let value = value?;
                (!value.trim().is_empty()).then(|| (id.trim().to_string(), value.to_string()))
            })
            .collect();
        Self(values)
    }

    pub fn from_rows(rows: &[ActionRow]) -> Self {
        Self::from_pairs(rows.iter().flat_map(|row| {
            row.components.iter().filter_map(|component| match component {
                ActionRowComponent::InputText(input) => {
                    Some((input.custom_id.as_str(), input.value.as_deref()))
                }
                _ => None,
            })
        }))
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }

    pub fn take(&mut self, id: &str) -> Option<String> {
        self.0.remove(id)
    }
}

fn button(custom_id: &str, label: &str, style: ButtonStyle) -> CreateButton {
    CreateButton::new(custom_id).label(label).style(style)
}

fn input_row(input: CreateInputText) -> CreateActionRow {
    CreateActionRow::InputText(input)
}
