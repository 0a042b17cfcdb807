// ABOUTME: Defines the blog records (posts, comments, pending comments, replies, settings).
// ABOUTME: Each record has a creation payload and a patch type where omitted fields stay unchanged.

use serde::{Deserialize, Serialize};

use crate::record::{Collection, Record};
use crate::time::lenient_timestamp;

/// Maximum number of characters kept when a summary is derived from content.
pub const SUMMARY_CHARS: usize = 100;

/// Return `summary` when it has visible text, otherwise the first
/// [`SUMMARY_CHARS`] characters of `content`, trimmed.
pub fn derive_summary(summary: Option<&str>, content: &str) -> String {
    match summary.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => content
            .trim()
            .chars()
            .take(SUMMARY_CHARS)
            .collect::<String>()
            .trim_end()
            .to_string(),
    }
}

/// A blog post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: String,
}

/// Request body for creating a post.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl NewPost {
    /// Build an unsaved post. The store assigns `id` and `created_at`.
    pub fn into_post(self) -> Post {
        let summary = derive_summary(self.summary.as_deref(), &self.content);
        Post {
            id: 0,
            title: self.title,
            summary,
            content: self.content,
            images: self.images,
            created_at: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub images: Option<Vec<String>>,
}

impl Record for Post {
    type Patch = PostPatch;

    const COLLECTION: Collection = Collection::Posts;
    const NEWEST_FIRST: bool = true;

    fn id(&self) -> i64 {
        self.id
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn stamp(&mut self, id: i64, created_at: String) {
        self.id = id;
        self.created_at = created_at;
    }

    fn apply(&mut self, patch: PostPatch, _now: &str) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        let derived = self.summary == derive_summary(None, &self.content);
        if let Some(content) = patch.content {
            self.content = content;
        }
        // A blank summary asks for a fresh one derived from the (possibly new)
        // content. A summary that was itself derived follows content edits;
        // a hand-written one is kept.
        match patch.summary {
            Some(summary) => self.summary = derive_summary(Some(&summary), &self.content),
            None if derived => self.summary = derive_summary(None, &self.content),
            None => {}
        }
        if let Some(images) = patch.images {
            self.images = images;
        }
    }
}

/// A published visitor comment. `post_title` and `post_summary` are copied
/// from the post when the comment is created and never refreshed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    #[serde(default)]
    pub post_title: String,
    #[serde(default)]
    pub post_summary: String,
    pub visitor_name: String,
    pub content: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Request body for a visitor comment.
#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub post_id: i64,
    pub visitor_name: String,
    pub content: String,
}

impl NewComment {
    /// Build an unsaved comment, denormalizing the post's title and summary.
    /// A missing post leaves both fields empty.
    pub fn into_comment(self, post: Option<&Post>) -> Comment {
        let (post_title, post_summary) = post
            .map(|p| (p.title.clone(), p.summary.clone()))
            .unwrap_or_default();
        Comment {
            id: 0,
            post_id: self.post_id,
            post_title,
            post_summary,
            visitor_name: self.visitor_name,
            content: self.content,
            created_at: String::new(),
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentPatch {
    pub visitor_name: Option<String>,
    pub content: Option<String>,
}

impl Record for Comment {
    type Patch = CommentPatch;

    const COLLECTION: Collection = Collection::Comments;

    fn id(&self) -> i64 {
        self.id
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn post_id(&self) -> Option<i64> {
        Some(self.post_id)
    }

    fn stamp(&mut self, id: i64, created_at: String) {
        self.id = id;
        self.created_at = created_at;
    }

    fn apply(&mut self, patch: CommentPatch, now: &str) {
        if let Some(visitor_name) = patch.visitor_name {
            self.visitor_name = visitor_name;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        self.updated_at = Some(now.to_string());
    }
}

/// A comment waiting for a moderator's answer. Mirrors a public comment,
/// referenced by `comment_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingComment {
    pub id: i64,
    #[serde(default)]
    pub comment_id: i64,
    #[serde(default)]
    pub post_id: i64,
    #[serde(default)]
    pub post_title: String,
    #[serde(default)]
    pub post_summary: String,
    #[serde(default)]
    pub visitor_name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl PendingComment {
    pub fn mirror(comment: &Comment) -> Self {
        Self {
            id: 0,
            comment_id: comment.id,
            post_id: comment.post_id,
            post_title: comment.post_title.clone(),
            post_summary: comment.post_summary.clone(),
            visitor_name: comment.visitor_name.clone(),
            content: comment.content.clone(),
            created_at: String::new(),
            updated_at: None,
        }
    }
}

impl Record for PendingComment {
    type Patch = CommentPatch;

    const COLLECTION: Collection = Collection::Pending;

    fn id(&self) -> i64 {
        self.id
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn post_id(&self) -> Option<i64> {
        Some(self.post_id)
    }

    fn stamp(&mut self, id: i64, created_at: String) {
        self.id = id;
        self.created_at = created_at;
    }

    fn apply(&mut self, patch: CommentPatch, now: &str) {
        if let Some(visitor_name) = patch.visitor_name {
            self.visitor_name = visitor_name;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        self.updated_at = Some(now.to_string());
    }
}

/// An answer to a comment or to another reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: i64,
    #[serde(default)]
    pub post_id: i64,
    #[serde(default)]
    pub parent_id: i64,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReply {
    pub post_id: i64,
    pub parent_id: i64,
    pub author: String,
    pub content: String,
}

impl NewReply {
    pub fn into_reply(self) -> Reply {
        Reply {
            id: 0,
            post_id: self.post_id,
            parent_id: self.parent_id,
            author: self.author,
            content: self.content,
            created_at: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReplyPatch {
    pub author: Option<String>,
    pub content: Option<String>,
}

impl Record for Reply {
    type Patch = ReplyPatch;

    const COLLECTION: Collection = Collection::Replies;

    fn id(&self) -> i64 {
        self.id
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn post_id(&self) -> Option<i64> {
        Some(self.post_id)
    }

    fn stamp(&mut self, id: i64, created_at: String) {
        self.id = id;
        self.created_at = created_at;
    }

    fn apply(&mut self, patch: ReplyPatch, _now: &str) {
        if let Some(author) = patch.author {
            self.author = author;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
    }
}

/// Site-wide settings. A single record without history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub avatar: String,
    pub display_name: String,
    pub intro: String,
    pub background_image: String,
    pub theme_color: String,
    pub snow_effect: bool,
    pub music_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            avatar: String::new(),
            display_name: String::new(),
            intro: String::new(),
            background_image: String::new(),
            theme_color: "#409eff".to_string(),
            snow_effect: false,
            music_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    pub avatar: Option<String>,
    pub display_name: Option<String>,
    pub intro: Option<String>,
    pub background_image: Option<String>,
    pub theme_color: Option<String>,
    pub snow_effect: Option<bool>,
    pub music_url: Option<String>,
}

impl Settings {
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(v) = patch.avatar {
            self.avatar = v;
        }
        if let Some(v) = patch.display_name {
            self.display_name = v;
        }
        if let Some(v) = patch.intro {
            self.intro = v;
        }
        if let Some(v) = patch.background_image {
            self.background_image = v;
        }
        if let Some(v) = patch.theme_color {
            self.theme_color = v;
        }
        if let Some(v) = patch.snow_effect {
            self.snow_effect = v;
        }
        if let Some(v) = patch.music_url {
            self.music_url = v;
        }
    }
}
