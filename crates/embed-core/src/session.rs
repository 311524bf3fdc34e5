//! Builder session registry
//!
//! Tracks one in-progress [`Document`] per owner across independent UI
//! callbacks. Sessions live only in memory: nothing is persisted until the
//! owner saves explicitly.
//!
//! States per owner are `no-session` and `editing`. [`SessionRegistry::begin`]
//! enters `editing` (overwriting any previous session), edit commands keep it
//! there, and [`EditCommand::Finalize`] leaves it. Edit commands for an owner
//! without a session fail with [`Error::NoActiveSession`] and change nothing.
//!
//! Every command runs its read-modify-write under the registry lock, so two
//! events for the same owner can never lose each other's update.

#[path = "session_tests.rs"]
mod session_tests;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use embed_types::color::{format_hex, parse_color_or_default};
use embed_types::limits::{MAX_DOCUMENT_NAME_LEN, SUMMARY_DESCRIPTION_PREVIEW};
use embed_types::{
    parse_color, Document, DocumentField, EditCommand, InitialInput, OwnerId, ValidationError,
};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::storage::Backing;
use crate::store::DocumentStore;

/// Shown by [`SessionRegistry::summary`] when the owner has no session.
pub const NO_SESSION_SUMMARY: &str = "No embed data";

/// How often the idle sweep runs, at most.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

struct Session {
    document: Document,
    last_touched: Instant,
}

impl Session {
    fn new(document: Document) -> Self {
        Self {
            document,
            last_touched: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_touched = Instant::now();
    }
}

/// Result of a successfully applied [`EditCommand`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The document changed; the session stays open.
    Updated,
    /// Current document, for rendering a preview.
    Preview(Document),
    /// The document was written to the store under this name.
    Saved { name: String },
    /// Final document; the session has been removed.
    Finalized(Document),
}

/// Per-owner working documents
pub struct SessionRegistry<B: Backing> {
    sessions: Mutex<HashMap<OwnerId, Session>>,
    store: Arc<DocumentStore<B>>,
}

impl<B: Backing> SessionRegistry<B> {
    pub fn new(store: Arc<DocumentStore<B>>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            store,
        }
    }

    /// Start (or restart) a session with a default document.
    pub async fn begin(&self, owner: OwnerId) -> Document {
        self.begin_with(owner, Document::new()).await
    }

    /// Start (or restart) a session from an existing document, e.g. one
    /// loaded from the store for editing.
    pub async fn begin_with(&self, owner: OwnerId, document: Document) -> Document {
        let mut sessions = self.sessions.lock().await;
        if sessions
            .insert(owner, Session::new(document.clone()))
            .is_some()
        {
            debug!(owner, "Replaced existing builder session");
        } else {
            debug!(owner, "Started builder session");
        }
        document
    }

    /// Apply the first creation dialog. Unlike [`EditCommand::SetColor`], an
    /// unparseable color falls back to the default instead of failing.
    pub async fn fill_initial(&self, owner: OwnerId, input: InitialInput) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&owner)
            .ok_or(Error::NoActiveSession { owner })?;

        let mut draft = session.document.clone();
        draft.set_title(input.title)?;
        draft.set_description(input.description)?;
        draft.color = parse_color_or_default(input.color.as_deref());

        session.document = draft;
        session.touch();
        Ok(())
    }

    /// Apply one edit command. Rejected commands leave the session unchanged.
    pub async fn apply(&self, owner: OwnerId, command: EditCommand) -> Result<ApplyOutcome> {
        let label = command.label();
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(&owner) else {
            debug!(owner, command = label, "Edit command without an active session");
            return Err(Error::NoActiveSession { owner });
        };

        let outcome = match command {
            EditCommand::SetTitle { value } => {
                session.document.set_title(value)?;
                ApplyOutcome::Updated
            }
            EditCommand::SetDescription { value } => {
                session.document.set_description(value)?;
                ApplyOutcome::Updated
            }
            EditCommand::SetColor { value } => {
                session.document.color = parse_color(&value)?;
                ApplyOutcome::Updated
            }
            EditCommand::AddField {
                name,
                value,
                inline,
            } => {
                session
                    .document
                    .push_field(DocumentField::new(name, value, inline))?;
                ApplyOutcome::Updated
            }
            EditCommand::Preview => ApplyOutcome::Preview(session.document.clone()),
            EditCommand::Save { name } => {
                let name = validate_document_name(&name)?;
                let document = session.document.clone();
                session.touch();
                // The store has its own lock; the registry lock is held so a
                // concurrent edit cannot slip in between snapshot and write.
                self.store.put(owner, &name, document).await;
                info!(owner, name = %name, "Saved builder document");
                return Ok(ApplyOutcome::Saved { name });
            }
            EditCommand::Finalize => {
                let session = sessions
                    .remove(&owner)
                    .ok_or(Error::NoActiveSession { owner })?;
                debug!(owner, "Finalized builder session");
                return Ok(ApplyOutcome::Finalized(session.document));
            }
        };

        session.touch();
        debug!(owner, command = label, "Applied edit command");
        Ok(outcome)
    }

    /// Short digest of the owner's session, or [`NO_SESSION_SUMMARY`].
    pub async fn summary(&self, owner: OwnerId) -> String {
        let sessions = self.sessions.lock().await;
        match sessions.get(&owner) {
            Some(session) => summarize(&session.document),
            None => NO_SESSION_SUMMARY.to_string(),
        }
    }

    /// Copy of the owner's working document.
    pub async fn document(&self, owner: OwnerId) -> Option<Document> {
        let sessions = self.sessions.lock().await;
        sessions.get(&owner).map(|s| s.document.clone())
    }

    pub async fn has_session(&self, owner: OwnerId) -> bool {
        self.sessions.lock().await.contains_key(&owner)
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Drop sessions untouched for longer than `max_age`. Returns how many
    /// were dropped.
    pub async fn evict_idle(&self, max_age: Duration) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_touched.elapsed() <= max_age);
        before - sessions.len()
    }

    /// Periodically evict sessions idle for longer than `max_age` until
    /// `cancel` fires.
    pub fn start_cleanup(
        self: &Arc<Self>,
        max_age: Duration,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = max_age.min(MAX_SWEEP_INTERVAL);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        let evicted = registry.evict_idle(max_age).await;
                        if evicted > 0 {
                            info!("Evicted {} idle builder session(s)", evicted);
                        }
                    }
                }
            }
        })
    }
}

fn validate_document_name(name: &str) -> std::result::Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let actual = name.chars().count();
    if actual > MAX_DOCUMENT_NAME_LEN {
        return Err(ValidationError::TooLong {
            part: "Document name",
            max: MAX_DOCUMENT_NAME_LEN,
            actual,
        });
    }
    Ok(name.to_string())
}

/// Render the digest shown on the builder panel.
pub fn summarize(document: &Document) -> String {
    let mut lines = Vec::new();

    if let Some(ref title) = document.title {
        lines.push(format!("Title: {}", title));
    }
    if let Some(ref description) = document.description {
        if !description.is_empty() {
            let preview: String = description
                .chars()
                .take(SUMMARY_DESCRIPTION_PREVIEW)
                .collect();
            lines.push(format!("Description: {}...", preview));
        }
    }
    if !document.fields.is_empty() {
        lines.push(format!("Fields: {}", document.fields.len()));
    }
    lines.push(format!("Color: {}", format_hex(document.color)));

    lines.join("\n")
}
