#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{DraftRecord, DraftRepository, InMemoryDraftStore, Storage, StorageError};
pub use sqlite::{SqliteDraftStore, SqliteInitError};
