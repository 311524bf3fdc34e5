//! Core of the embed builder
//!
//! | Component | Module | Role |
//! |-----------|--------|------|
//! | Builder sessions | [`session`] | per-owner in-progress documents |
//! | Document store | [`store`], [`storage`] | durable owner → name → document record |
//! | Extension loader | [`extensions`] | activates command groups, isolates failures |
//! | Lifecycle | [`lifecycle`], [`shutdown`] | startup latch, periodic flush, ordered shutdown |
//! | Export | [`export`] | inline-or-attachment JSON export |
//!
//! Nothing here talks to the chat platform directly; the bot crate adapts
//! platform events into [`embed_types::EditCommand`]s and implements
//! [`lifecycle::PlatformConnection`].

pub mod error;
pub mod export;
pub mod extensions;
pub mod lifecycle;
pub mod session;
pub mod shutdown;
pub mod storage;
pub mod store;

pub use error::{truncate_error, Error, Result};
pub use export::{export, ExportPayload};
pub use extensions::{ActivationError, ExtensionEntry, ExtensionLoader};
pub use lifecycle::{InitOutcome, Orchestrator, PlatformConnection};
pub use session::{ApplyOutcome, SessionRegistry};
pub use shutdown::ShutdownCallbacks;
#[cfg(any(test, feature = "test-support"))]
pub use storage::MemBacking;
pub use storage::{Backing, FileBacking};
pub use store::DocumentStore;
