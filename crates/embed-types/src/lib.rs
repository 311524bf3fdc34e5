//! Shared types for the embed builder
//!
//! The document model and its canonical JSON form, the color palette, the
//! edit-command vocabulary understood by the session registry and the
//! validation errors raised on user input.

pub mod color;
pub mod commands;
pub mod document;
pub mod errors;
pub mod limits;

pub use color::{parse_color, parse_color_or_default, PALETTE};
pub use commands::{EditCommand, InitialInput};
pub use document::{Document, DocumentField};
pub use errors::ValidationError;

/// Identity under whose namespace documents are stored and sessions tracked.
pub type OwnerId = u64;
