//! Durable per-owner document store
//!
//! The whole record (owner → name → document) lives in memory and is
//! rewritten to the backing artifact on every mutation and whenever
//! [`DocumentStore::save`] is called by the periodic flush.
//!
//! Durability is best-effort: a failed write is logged and remembered in
//! [`DocumentStore::last_flush_failed`], but never returned to callers. Until
//! the next successful flush the artifact may lag behind memory.
//!
//! Nothing is written before [`DocumentStore::load`] has run: an unloaded
//! record is empty, and flushing it would erase the artifact.

#[path = "store_tests.rs"]
mod store_tests;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use embed_types::{Document, OwnerId};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::storage::Backing;

type Record = BTreeMap<OwnerId, BTreeMap<String, Document>>;

/// Owner-scoped named documents backed by a single artifact
pub struct DocumentStore<B: Backing> {
    backing: B,
    record: RwLock<Record>,
    loaded: AtomicBool,
    last_flush_failed: AtomicBool,
}

impl<B: Backing> DocumentStore<B> {
    /// Create an empty store. Call [`load`](Self::load) before use.
    pub fn new(backing: B) -> Self {
        Self {
            backing,
            record: RwLock::new(Record::new()),
            loaded: AtomicBool::new(false),
            last_flush_failed: AtomicBool::new(false),
        }
    }

    pub fn backing(&self) -> &B {
        &self.backing
    }

    /// Read the artifact into memory.
    ///
    /// A missing artifact starts an empty record and writes it immediately;
    /// an unreadable or corrupt one is logged and treated as empty.
    pub async fn load(&self) {
        let mut record = self.record.write().await;
        self.loaded.store(true, Ordering::SeqCst);

        match self.backing.read() {
            Ok(Some(contents)) => match parse_record(&contents) {
                Ok(parsed) => {
                    let documents: usize = parsed.values().map(BTreeMap::len).sum();
                    info!(
                        owners = parsed.len(),
                        documents,
                        "Loaded document store from {}",
                        self.backing.describe()
                    );
                    *record = parsed;
                }
                Err(e) => {
                    error!(
                        "Document store at {} is corrupt, starting empty: {}",
                        self.backing.describe(),
                        e
                    );
                    *record = Record::new();
                }
            },
            Ok(None) => {
                info!(
                    "No document store at {}, creating an empty one",
                    self.backing.describe()
                );
                *record = Record::new();
                self.flush(&record);
            }
            Err(e) => {
                error!(
                    "Failed to read document store at {}: {}",
                    self.backing.describe(),
                    e
                );
                *record = Record::new();
            }
        }
    }

    /// Rewrite the artifact from memory. Returns whether the write succeeded;
    /// failures are logged, never raised.
    pub async fn save(&self) -> bool {
        // Write lock: flushes must not interleave with mutations or with
        // each other.
        let record = self.record.write().await;
        self.flush(&record)
    }

    /// Insert or replace `owner`/`name`, then flush.
    pub async fn put(&self, owner: OwnerId, name: &str, document: Document) {
        let mut record = self.record.write().await;
        record
            .entry(owner)
            .or_default()
            .insert(name.to_string(), document);
        debug!(owner, name, "Stored document");
        self.flush(&record);
    }

    pub async fn get(&self, owner: OwnerId, name: &str) -> Option<Document> {
        let record = self.record.read().await;
        record.get(&owner).and_then(|docs| docs.get(name)).cloned()
    }

    pub async fn contains(&self, owner: OwnerId, name: &str) -> bool {
        let record = self.record.read().await;
        record
            .get(&owner)
            .is_some_and(|docs| docs.contains_key(name))
    }

    /// Remove `owner`/`name`. Returns false (and writes nothing) when there
    /// was no such document.
    pub async fn delete(&self, owner: OwnerId, name: &str) -> bool {
        let mut record = self.record.write().await;
        let Some(docs) = record.get_mut(&owner) else {
            return false;
        };
        if docs.remove(name).is_none() {
            return false;
        }
        if docs.is_empty() {
            record.remove(&owner);
        }
        debug!(owner, name, "Deleted document");
        self.flush(&record);
        true
    }

    /// Names saved by `owner`, in the record's (name-sorted) order.
    pub async fn list_names(&self, owner: OwnerId) -> Vec<String> {
        let record = self.record.read().await;
        record
            .get(&owner)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether [`load`](Self::load) has run; until then nothing is written.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Whether the most recent flush failed, i.e. the artifact may be stale.
    pub fn last_flush_failed(&self) -> bool {
        self.last_flush_failed.load(Ordering::Relaxed)
    }

    fn flush(&self, record: &Record) -> bool {
        if !self.is_loaded() {
            warn!(
                "Document store at {} was never loaded, not overwriting it",
                self.backing.describe()
            );
            return false;
        }

        let result = serde_json::to_string_pretty(record)
            .map_err(crate::Error::from)
            .and_then(|json| self.backing.write(&json).map_err(crate::Error::from));

        match result {
            Ok(()) => {
                self.last_flush_failed.store(false, Ordering::Relaxed);
                true
            }
            Err(e) => {
                warn!(
                    "Failed to write document store to {}: {}",
                    self.backing.describe(),
                    e
                );
                self.last_flush_failed.store(true, Ordering::Relaxed);
                false
            }
        }
    }
}

/// Parse the persisted layout. Owner keys are the string form of an
/// integer; entries whose key does not parse are dropped with a warning
/// rather than failing the whole load.
fn parse_record(contents: &str) -> serde_json::Result<Record> {
    let raw: BTreeMap<String, BTreeMap<String, Document>> = serde_json::from_str(contents)?;
    let mut record = Record::new();
    for (key, docs) in raw {
        match key.trim().parse::<OwnerId>() {
            Ok(owner) => {
                record.entry(owner).or_default().extend(docs);
            }
            Err(_) => warn!(key = %key, "Skipping stored documents with a non-numeric owner key"),
        }
    }
    Ok(record)
}
