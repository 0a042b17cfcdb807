// ABOUTME: HTTP server for blogd, providing the versioned REST API and static file serving.
// ABOUTME: Uses Axum with a shared storage backend chosen once from the TOML configuration.

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod envelope;
pub mod routes;

pub use app_state::{AppState, SharedState, open_store};
pub use config::{BlogConfig, ConfigError, StorageMode};
pub use envelope::{ApiError, Envelope};
pub use routes::create_router;
