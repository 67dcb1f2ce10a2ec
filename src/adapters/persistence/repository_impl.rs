//! Repository Implementation - Concrete Adapter for the Repository Port
//!
//! Wraps `SessionStore` (atomic JSON) and `TxJournal` (JSONL
//! append-only files) into a single struct that implements the
//! `Repository` trait from `crate::ports::repository`.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use super::journal::TxJournal;
use super::session::SessionStore;
use crate::ports::repository::{Repository, StoredSession, TxRecord};

/// Concrete repository adapter combining session and journal persistence.
pub struct RepositoryImpl {
    sessions: SessionStore,
    journal: TxJournal,
}

impl RepositoryImpl {
    pub const fn new(sessions: SessionStore, journal: TxJournal) -> Self {
        Self { sessions, journal }
    }

    /// Initialize both stores under `data_dir`, creating directories as needed.
    pub async fn from_data_dir(data_dir: &Path) -> Result<Self> {
        let sessions = SessionStore::new(data_dir).await?;
        let journal = TxJournal::new(data_dir).await?;
        Ok(Self::new(sessions, journal))
    }
}

#[async_trait]
impl Repository for RepositoryImpl {
    async fn append_transaction(&self, record: &TxRecord) -> Result<()> {
        self.journal.append(record).await
    }

    async fn recent_transactions(&self, limit: usize) -> Result<Vec<TxRecord>> {
        self.journal.recent(limit).await
    }

    async fn save_session(&self, session: &StoredSession) -> Result<()> {
        self.sessions.save(session).await
    }

    async fn load_session(&self) -> Result<Option<StoredSession>> {
        self.sessions.load().await
    }

    async fn clear_session(&self) -> Result<()> {
        self.sessions.clear().await
    }
}
