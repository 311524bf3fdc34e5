//! Shared bot state, stored in serenity's client data

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use embed_core::{DocumentStore, FileBacking, Orchestrator, PlatformConnection, SessionRegistry};
use embed_types::{Document, OwnerId};
use serenity::gateway::ShardManager;
use serenity::prelude::TypeMapKey;
use tokio::sync::RwLock;
use tracing::info;

use crate::commands::CommandRegistry;

/// The gateway shards; releasing closes every shard, which ends
/// `Client::start`.
pub struct ShardConnection(pub Arc<ShardManager>);

impl PlatformConnection for ShardConnection {
    async fn release(&self) {
        info!("Closing Discord gateway connection");
        self.0.shutdown_all().await;
    }
}

/// Drafts kept per owner; older panels past this answer as expired.
const DRAFTS_PER_OWNER: usize = 10;

/// Finished, unsaved documents behind their dispatch panels, keyed by owner
/// and a token carried in the panel's button ids.
#[derive(Debug, Default)]
pub struct DraftCache {
    next_token: AtomicU64,
    entries: RwLock<HashMap<OwnerId, BTreeMap<u64, Document>>>,
}

impl DraftCache {
    /// Keep `document` and return the token its panel refers to.
    pub async fn put(&self, owner: OwnerId, document: Document) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.write().await;
        let drafts = entries.entry(owner).or_default();
        drafts.insert(token, document);
        while drafts.len() > DRAFTS_PER_OWNER {
            drafts.pop_first();
        }
        token
    }

    pub async fn get(&self, owner: OwnerId, token: u64) -> Option<Document> {
        let entries = self.entries.read().await;
        entries.get(&owner)?.get(&token).cloned()
    }
}

pub struct BotState {
    pub store: Arc<DocumentStore<FileBacking>>,
    pub sessions: Arc<SessionRegistry<FileBacking>>,
    pub orchestrator: Arc<Orchestrator<FileBacking, ShardConnection>>,
    pub drafts: DraftCache,
    /// Filled once extension activation has run during startup.
    pub commands: OnceLock<Arc<CommandRegistry>>,
    /// Set when startup failed; `main` turns it into a non-zero exit.
    pub fatal: OnceLock<String>,
}

impl BotState {
    pub fn new(
        store: Arc<DocumentStore<FileBacking>>,
        orchestrator: Arc<Orchestrator<FileBacking, ShardConnection>>,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new(Arc::clone(&store))),
            store,
            orchestrator,
            drafts: DraftCache::default(),
            commands: OnceLock::new(),
            fatal: OnceLock::new(),
        }
    }
}

impl TypeMapKey for BotState {
    type Value = Arc<BotState>;
}
