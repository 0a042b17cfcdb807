// ABOUTME: Core library for blogd, containing record types, patches, filters and paging.
// ABOUTME: This crate defines the shared data model used by the store and server crates.

pub mod model;
pub mod record;
pub mod time;

pub use model::{
    Comment, CommentPatch, NewComment, NewPost, NewReply, PendingComment, Post, PostPatch, Reply,
    ReplyPatch, Settings, SettingsPatch, derive_summary,
};
pub use record::{Collection, ListFilter, Page, Paged, Record};
pub use time::{now_timestamp, unix_seconds};
