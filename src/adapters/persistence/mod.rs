//! Persistence Adapters - JSONL-based File Storage
//!
//! Implements the Repository port using append-only JSONL files for
//! the transaction journal and an atomic JSON file for the wallet
//! session. No database dependency.

pub mod journal;
pub mod repository_impl;
pub mod session;

pub use journal::TxJournal;
pub use repository_impl::RepositoryImpl;
pub use session::SessionStore;
