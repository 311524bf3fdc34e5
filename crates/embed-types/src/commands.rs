//! Edit commands applied to a builder session
//!
//! UI events (modal submissions, button presses) are translated into these
//! before they reach the session registry.

use serde::{Deserialize, Serialize};

/// The fixed edit vocabulary of a builder session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EditCommand {
    SetTitle {
        #[serde(default)]
        value: Option<String>,
    },
    SetDescription {
        value: String,
    },
    SetColor {
        value: String,
    },
    AddField {
        name: String,
        value: String,
        #[serde(default)]
        inline: bool,
    },
    Preview,
    Save {
        name: String,
    },
    Finalize,
}

impl EditCommand {
    /// Whether the command changes the session's document.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::SetTitle { .. }
                | Self::SetDescription { .. }
                | Self::SetColor { .. }
                | Self::AddField { .. }
        )
    }

    /// Short name used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SetTitle { .. } => "set_title",
            Self::SetDescription { .. } => "set_description",
            Self::SetColor { .. } => "set_color",
            Self::AddField { .. } => "add_field",
            Self::Preview => "preview",
            Self::Save { .. } => "save",
            Self::Finalize => "finalize",
        }
    }
}

/// Values of the first creation dialog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitialInput {
    pub title: Option<String>,
    pub description: String,
    pub color: Option<String>,
}

/// Interpret a yes/no text input; anything other than "yes" is false.
pub fn parse_inline_flag(text: Option<&str>) -> bool {
    text.map(|t| t.trim().eq_ignore_ascii_case("yes"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_serde_tag() {
        let cmd = EditCommand::AddField {
            name: "a".to_string(),
            value: "b".to_string(),
            inline: true,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains(r#""action":"add_field""#));
        let back: EditCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn test_unit_command_from_json() {
        let cmd: EditCommand = serde_json::from_str(r#"{"action":"finalize"}"#).unwrap();
        assert_eq!(cmd, EditCommand::Finalize);
    }

    #[test]
    fn test_is_mutation() {
        assert!(EditCommand::SetColor {
            value: "red".to_string()
        }
        .is_mutation());
        assert!(!EditCommand::Preview.is_mutation());
        assert!(!EditCommand::Finalize.is_mutation());
        assert!(!EditCommand::Save {
            name: "x".to_string()
        }
        .is_mutation());
    }

    #[test]
    fn test_inline_flag() {
        assert!(parse_inline_flag(Some("yes")));
        assert!(parse_inline_flag(Some(" YES ")));
        assert!(!parse_inline_flag(Some("no")));
        assert!(!parse_inline_flag(Some("y")));
        assert!(!parse_inline_flag(None));
    }
}
