// ABOUTME: Shared application state for the blogd HTTP server.
// ABOUTME: Holds the storage backend chosen at startup, the upload store, and the immutable config.

use std::sync::Arc;

use blogd_store::{BlogStore, DocumentStore, SqliteStore, StoreError, UploadStore};

use crate::config::{BlogConfig, StorageConfig, StorageMode};

/// Shared application state accessible by all Axum handlers.
pub struct AppState {
    pub store: Arc<dyn BlogStore>,
    pub uploads: UploadStore,
    pub config: BlogConfig,
}

/// Type alias for the Arc-wrapped state used with Axum's State extractor.
pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(store: Arc<dyn BlogStore>, config: BlogConfig) -> Self {
        let uploads = UploadStore::new(
            config.uploads.images_dir.clone(),
            config.uploads.music_dir.clone(),
        );
        Self {
            store,
            uploads,
            config,
        }
    }

    /// Open the configured backend and build state around it.
    pub fn open(config: BlogConfig) -> Result<Self, StoreError> {
        let store = open_store(&config.storage)?;
        Ok(Self::new(store, config))
    }
}

/// Select and open the storage backend once, at startup.
pub fn open_store(storage: &StorageConfig) -> Result<Arc<dyn BlogStore>, StoreError> {
    let store: Arc<dyn BlogStore> = match storage.mode {
        StorageMode::Json => Arc::new(DocumentStore::open(storage.layout())?),
        StorageMode::Sqlite => Arc::new(SqliteStore::open(&storage.database)?),
    };
    tracing::info!("opened {} storage backend", store.backend());
    Ok(store)
}
