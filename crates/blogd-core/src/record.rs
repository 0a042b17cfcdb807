// ABOUTME: The Record trait every stored collection item implements, plus list filters and paging.
// ABOUTME: Lets the document and relational backends share one generic read/modify/write contract.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::time::unix_seconds;

/// The collections blogd persists. Each maps to one JSON file or one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Posts,
    Comments,
    Pending,
    Replies,
    Settings,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Posts => "posts",
            Collection::Comments => "comments",
            Collection::Pending => "pending",
            Collection::Replies => "replies",
            Collection::Settings => "settings",
        }
    }

    /// Name of a single record of this collection, for messages.
    pub fn record_name(self) -> &'static str {
        match self {
            Collection::Posts => "post",
            Collection::Comments => "comment",
            Collection::Pending => "pending comment",
            Collection::Replies => "reply",
            Collection::Settings => "settings",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An item of an id-keyed collection.
///
/// The store owns `id` and `created_at`: both are assigned through [`Record::stamp`]
/// on insert. Partial updates go through [`Record::apply`] with the record's
/// patch type, where `None` fields leave the stored value unchanged.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Patch: Send;

    const COLLECTION: Collection;

    /// Whether listings return the highest id first.
    const NEWEST_FIRST: bool = false;

    fn id(&self) -> i64;

    fn created_at(&self) -> &str;

    /// The post this record hangs off, if the collection is keyed by post.
    fn post_id(&self) -> Option<i64> {
        None
    }

    fn stamp(&mut self, id: i64, created_at: String);

    /// Merge a patch into the record. `now` is the mutation time.
    fn apply(&mut self, patch: Self::Patch, now: &str);
}

/// Optional predicates for `list`. An empty filter matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub post_id: Option<i64>,
    /// Unix seconds; records created at or after this instant match.
    pub since: Option<i64>,
}

impl ListFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_post(post_id: Option<i64>) -> Self {
        Self {
            post_id,
            since: None,
        }
    }

    pub fn since(since: i64) -> Self {
        Self {
            post_id: None,
            since: Some(since),
        }
    }

    pub fn matches<R: Record>(&self, record: &R) -> bool {
        if let Some(post_id) = self.post_id
            && record.post_id() != Some(post_id)
        {
            return false;
        }
        if let Some(since) = self.since
            && unix_seconds(record.created_at()) < since
        {
            return false;
        }
        true
    }
}

/// Offset/limit paging expressed as a 1-based page number and a page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: usize,
    pub size: usize,
}

impl Page {
    pub const DEFAULT_SIZE: usize = 10;
    pub const MAX_SIZE: usize = 100;

    /// Normalize query values: page 0 or absent becomes 1, size is clamped to 1..=100.
    pub fn new(page: Option<usize>, size: Option<usize>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            size: size
                .unwrap_or(Self::DEFAULT_SIZE)
                .clamp(1, Self::MAX_SIZE),
        }
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.size)
    }

    /// Cut one page out of an already ordered listing.
    pub fn apply<T>(self, items: Vec<T>) -> Paged<T> {
        let total = items.len();
        let items = items
            .into_iter()
            .skip(self.offset())
            .take(self.size)
            .collect();
        Paged {
            items,
            total,
            page: self.page,
            size: self.size,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of a listing plus the size of the whole listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub size: usize,
}
