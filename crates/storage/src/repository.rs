use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use exam_core::model::{PartContent, SessionId};

/// Errors surfaced by draft storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of one part's in-progress work.
///
/// The content is an opaque blob from the store's point of view; the key is
/// `(session_id, part_index)`, so concurrent sessions never collide as long
/// as each generates a fresh id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftRecord {
    pub session_id: SessionId,
    pub part_index: u32,
    pub content: PartContent,
    pub saved_at: DateTime<Utc>,
}

/// Repository contract for in-progress exam drafts.
#[async_trait]
pub trait DraftRepository: Send + Sync {
    /// Persist or overwrite the draft for one part. Idempotent: saving the
    /// same payload twice is always safe.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the draft cannot be stored. Callers treat
    /// this as transient and retry on the next autosave tick.
    async fn save(&self, record: &DraftRecord) -> Result<(), StorageError>;

    /// Fetch the draft for one part, if any. Used only at session resume.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for connection or decode failures; an absent
    /// draft is `Ok(None)`.
    async fn load(
        &self,
        session_id: &SessionId,
        part_index: u32,
    ) -> Result<Option<DraftRecord>, StorageError>;

    /// Drop every draft belonging to a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deletion fails.
    async fn clear(&self, session_id: &SessionId) -> Result<(), StorageError>;
}

/// Simple in-memory draft store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryDraftStore {
    drafts: Arc<Mutex<HashMap<(SessionId, u32), DraftRecord>>>,
}

impl InMemoryDraftStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            drafts: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl DraftRepository for InMemoryDraftStore {
    async fn save(&self, record: &DraftRecord) -> Result<(), StorageError> {
        let mut guard = self
            .drafts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(
            (record.session_id.clone(), record.part_index),
            record.clone(),
        );
        Ok(())
    }

    async fn load(
        &self,
        session_id: &SessionId,
        part_index: u32,
    ) -> Result<Option<DraftRecord>, StorageError> {
        let guard = self
            .drafts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&(session_id.clone(), part_index)).cloned())
    }

    async fn clear(&self, session_id: &SessionId) -> Result<(), StorageError> {
        let mut guard = self
            .drafts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.retain(|(id, _), _| id != session_id);
        Ok(())
    }
}

/// Aggregates draft storage behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub drafts: Arc<dyn DraftRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            drafts: Arc::new(InMemoryDraftStore::new()),
        }
    }
}
