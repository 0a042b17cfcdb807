// ABOUTME: API module containing all HTTP handler functions for the blogd REST API.
// ABOUTME: Organized into sub-modules for posts, comments and replies, uploads, and site settings.

pub mod comments;
pub mod posts;
pub mod settings;
pub mod uploads;

use serde::Deserialize;

/// `?post_id=` filter shared by the comment and reply listings.
#[derive(Debug, Default, Deserialize)]
pub struct PostQuery {
    pub post_id: Option<i64>,
}
