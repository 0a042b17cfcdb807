// ABOUTME: Persistence layer for blogd with interchangeable JSON-document and SQLite backends.
// ABOUTME: Defines the Repository/BlogStore contract, the shared error type, and upload file storage.

pub mod document;
pub mod sqlite;
pub mod uploads;

use blogd_core::{Collection, Comment, ListFilter, PendingComment, Post, Record, Reply};
use blogd_core::{Settings, SettingsPatch};
use thiserror::Error;

pub use document::{DocumentCollection, DocumentLayout, DocumentSettings, DocumentStore};
pub use sqlite::{SqlRecord, SqliteSettings, SqliteStore, SqliteTable};
pub use uploads::{UploadKind, UploadStore};

/// Errors that can occur in either storage backend or the upload store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{} {} not found", .collection.record_name(), .id)]
    NotFound { collection: Collection, id: i64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{operation} is not supported for {collection} by this backend")]
    Unsupported {
        operation: &'static str,
        collection: Collection,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0} lock poisoned by a panicked writer")]
    Poisoned(Collection),
}

/// Read/modify/write contract for one id-keyed collection.
pub trait Repository<R: Record>: Send + Sync {
    /// All records matching `filter`, newest first for posts and in
    /// insertion order otherwise.
    fn list(&self, filter: &ListFilter) -> Result<Vec<R>, StoreError>;

    fn get(&self, id: i64) -> Result<R, StoreError>;

    /// Persist a new record, returning it with its assigned id and created_at.
    fn insert(&self, record: R) -> Result<R, StoreError>;

    fn update(&self, id: i64, patch: R::Patch) -> Result<R, StoreError>;

    /// Returns false, leaving the collection untouched, when `id` is absent.
    fn delete(&self, id: i64) -> Result<bool, StoreError>;
}

/// Load/merge contract for the single settings record.
pub trait SettingsRepository: Send + Sync {
    /// The stored settings, or defaults when nothing was ever saved.
    fn load(&self) -> Result<Settings, StoreError>;

    fn save(&self, patch: SettingsPatch) -> Result<Settings, StoreError>;
}

/// One storage backend exposing every blog collection. Chosen once at startup.
pub trait BlogStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    fn posts(&self) -> &dyn Repository<Post>;

    fn comments(&self) -> &dyn Repository<Comment>;

    fn pending(&self) -> &dyn Repository<PendingComment>;

    fn replies(&self) -> &dyn Repository<Reply>;

    fn settings(&self) -> &dyn SettingsRepository;
}

/// Next id for a document collection: one past the largest id, or 1 when empty.
pub(crate) fn next_id<R: Record>(records: &[R]) -> i64 {
    records.iter().map(|r| r.id()).max().map_or(1, |max| max + 1)
}

/// Apply a list ordering shared by both backends.
pub(crate) fn order<R: Record>(records: &mut [R]) {
    if R::NEWEST_FIRST {
        records.sort_by(|a, b| b.id().cmp(&a.id()));
    } else {
        records.sort_by_key(|r| r.id());
    }
}
