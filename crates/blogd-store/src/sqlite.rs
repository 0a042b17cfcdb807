// ABOUTME: SQLite backend with one table per collection and auto-increment surrogate keys.
// ABOUTME: Opens a fresh connection per operation; no pooling, no long-lived handles.

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Duration;

use blogd_core::{
    Comment, ListFilter, PendingComment, Post, Record, Reply, Settings, SettingsPatch,
    now_timestamp,
};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use crate::{BlogStore, Repository, SettingsRepository, StoreError, order};

/// How a record maps onto its table. Column order in [`SqlRecord::COLUMNS`]
/// is the order of [`SqlRecord::values`] and of the row passed to
/// [`SqlRecord::from_row`] after the leading `id`.
pub trait SqlRecord: Record {
    const TABLE: &'static str;

    /// `(name, declaration)` pairs for every column except `id`.
    const COLUMNS: &'static [(&'static str, &'static str)];

    /// Append-only tables reject `update` with [`StoreError::Unsupported`].
    const APPEND_ONLY: bool = false;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn values(&self) -> Vec<Value>;
}

fn connect(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(conn)
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn optional_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, text)
}

fn column_names<R: SqlRecord>() -> Vec<&'static str> {
    R::COLUMNS.iter().map(|(name, _)| *name).collect()
}

fn select_sql<R: SqlRecord>() -> String {
    format!(
        "SELECT id, {} FROM {}",
        column_names::<R>().join(", "),
        R::TABLE
    )
}

fn create_table_sql<R: SqlRecord>() -> String {
    let columns: Vec<String> = R::COLUMNS
        .iter()
        .map(|(name, decl)| format!("{} {}", name, decl))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            {}
        );",
        R::TABLE,
        columns.join(",\n            ")
    )
}

/// One collection stored as a single table.
pub struct SqliteTable<R> {
    path: PathBuf,
    _record: PhantomData<fn() -> R>,
}

impl<R: SqlRecord> SqliteTable<R> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _record: PhantomData,
        }
    }

    /// Create the table if it does not exist.
    pub fn migrate(&self, conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(&create_table_sql::<R>())?;
        Ok(())
    }

    fn not_found(id: i64) -> StoreError {
        StoreError::NotFound {
            collection: R::COLLECTION,
            id,
        }
    }

    fn has_post_column() -> bool {
        R::COLUMNS.iter().any(|(name, _)| *name == "post_id")
    }
}

impl<R: SqlRecord> Repository<R> for SqliteTable<R> {
    fn list(&self, filter: &ListFilter) -> Result<Vec<R>, StoreError> {
        let conn = connect(&self.path)?;

        let mut records = match filter.post_id {
            Some(_) if !Self::has_post_column() => Vec::new(),
            Some(post_id) => {
                let sql = format!("{} WHERE post_id = ?1", select_sql::<R>());
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![post_id], |row| R::from_row(row))?;
                rows.collect::<rusqlite::Result<Vec<R>>>()?
            }
            None => {
                let mut stmt = conn.prepare(&select_sql::<R>())?;
                let rows = stmt.query_map([], |row| R::from_row(row))?;
                rows.collect::<rusqlite::Result<Vec<R>>>()?
            }
        };

        // `since` compares parsed timestamps, which SQL text ordering cannot do.
        records.retain(|r| filter.matches(r));
        order(&mut records);
        Ok(records)
    }

    fn get(&self, id: i64) -> Result<R, StoreError> {
        let conn = connect(&self.path)?;
        let sql = format!("{} WHERE id = ?1", select_sql::<R>());
        conn.query_row(&sql, params![id], |row| R::from_row(row))
            .optional()?
            .ok_or_else(|| Self::not_found(id))
    }

    fn insert(&self, mut record: R) -> Result<R, StoreError> {
        let conn = connect(&self.path)?;
        let created_at = now_timestamp();
        record.stamp(0, created_at.clone());

        let names = column_names::<R>();
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            R::TABLE,
            names.join(", "),
            placeholders.join(", ")
        );
        conn.execute(&sql, params_from_iter(record.values()))?;

        record.stamp(conn.last_insert_rowid(), created_at);
        tracing::info!("inserted {} {}", R::COLLECTION, record.id());
        Ok(record)
    }

    fn update(&self, id: i64, patch: R::Patch) -> Result<R, StoreError> {
        if R::APPEND_ONLY {
            return Err(StoreError::Unsupported {
                operation: "update",
                collection: R::COLLECTION,
            });
        }

        let mut conn = connect(&self.path)?;
        let tx = conn.transaction()?;

        let select = format!("{} WHERE id = ?1", select_sql::<R>());
        let mut record = tx
            .query_row(&select, params![id], |row| R::from_row(row))
            .optional()?
            .ok_or_else(|| Self::not_found(id))?;
        record.apply(patch, &now_timestamp());

        let names = column_names::<R>();
        let assignments: Vec<String> = names
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{} = ?{}", name, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            R::TABLE,
            assignments.join(", "),
            names.len() + 1
        );
        let mut values = record.values();
        values.push(Value::Integer(id));
        tx.execute(&sql, params_from_iter(values))?;
        tx.commit()?;

        tracing::info!("updated {} {}", R::COLLECTION, id);
        Ok(record)
    }

    fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let conn = connect(&self.path)?;
        let sql = format!("DELETE FROM {} WHERE id = ?1", R::TABLE);
        let removed = conn.execute(&sql, params![id])? > 0;
        if removed {
            tracing::info!("deleted {} {}", R::COLLECTION, id);
        }
        Ok(removed)
    }
}

impl SqlRecord for Post {
    const TABLE: &'static str = "posts";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("title", "TEXT NOT NULL"),
        ("summary", "TEXT NOT NULL"),
        ("content", "TEXT NOT NULL"),
        ("images", "TEXT NOT NULL DEFAULT '[]'"),
        ("created_at", "TEXT NOT NULL"),
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let images: String = row.get(4)?;
        let images = serde_json::from_str(&images)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
        Ok(Post {
            id: row.get(0)?,
            title: row.get(1)?,
            summary: row.get(2)?,
            content: row.get(3)?,
            images,
            created_at: row.get(5)?,
        })
    }

    fn values(&self) -> Vec<Value> {
        // Serializing a Vec<String> cannot fail.
        let images = serde_json::to_string(&self.images).unwrap_or_else(|_| "[]".to_string());
        vec![
            text(&self.title),
            text(&self.summary),
            text(&self.content),
            Value::Text(images),
            text(&self.created_at),
        ]
    }
}

impl SqlRecord for Comment {
    const TABLE: &'static str = "comments";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("post_id", "INTEGER NOT NULL"),
        ("post_title", "TEXT NOT NULL"),
        ("post_summary", "TEXT NOT NULL"),
        ("visitor_name", "TEXT NOT NULL"),
        ("content", "TEXT NOT NULL"),
        ("created_at", "TEXT NOT NULL"),
        ("updated_at", "TEXT"),
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Comment {
            id: row.get(0)?,
            post_id: row.get(1)?,
            post_title: row.get(2)?,
            post_summary: row.get(3)?,
            visitor_name: row.get(4)?,
            content: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.post_id),
            text(&self.post_title),
            text(&self.post_summary),
            text(&self.visitor_name),
            text(&self.content),
            text(&self.created_at),
            optional_text(self.updated_at.as_deref()),
        ]
    }
}

impl SqlRecord for PendingComment {
    const TABLE: &'static str = "pending_comments";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("comment_id", "INTEGER NOT NULL"),
        ("post_id", "INTEGER NOT NULL"),
        ("post_title", "TEXT NOT NULL"),
        ("post_summary", "TEXT NOT NULL"),
        ("visitor_name", "TEXT NOT NULL"),
        ("content", "TEXT NOT NULL"),
        ("created_at", "TEXT NOT NULL"),
        ("updated_at", "TEXT"),
    ];
    const APPEND_ONLY: bool = true;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PendingComment {
            id: row.get(0)?,
            comment_id: row.get(1)?,
            post_id: row.get(2)?,
            post_title: row.get(3)?,
            post_summary: row.get(4)?,
            visitor_name: row.get(5)?,
            content: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.comment_id),
            Value::Integer(self.post_id),
            text(&self.post_title),
            text(&self.post_summary),
            text(&self.visitor_name),
            text(&self.content),
            text(&self.created_at),
            optional_text(self.updated_at.as_deref()),
        ]
    }
}

impl SqlRecord for Reply {
    const TABLE: &'static str = "replies";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("post_id", "INTEGER NOT NULL"),
        ("parent_id", "INTEGER NOT NULL"),
        ("author", "TEXT NOT NULL"),
        ("content", "TEXT NOT NULL"),
        ("created_at", "TEXT NOT NULL"),
    ];
    const APPEND_ONLY: bool = true;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Reply {
            id: row.get(0)?,
            post_id: row.get(1)?,
            parent_id: row.get(2)?,
            author: row.get(3)?,
            content: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.post_id),
            Value::Integer(self.parent_id),
            text(&self.author),
            text(&self.content),
            text(&self.created_at),
        ]
    }
}

/// The settings record as the single row `id = 1` of the `settings` table.
pub struct SqliteSettings {
    path: PathBuf,
}

impl SqliteSettings {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn migrate(&self, conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                avatar TEXT NOT NULL,
                display_name TEXT NOT NULL,
                intro TEXT NOT NULL,
                background_image TEXT NOT NULL,
                theme_color TEXT NOT NULL,
                snow_effect INTEGER NOT NULL,
                music_url TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn read(conn: &Connection) -> Result<Settings, StoreError> {
        let stored = conn
            .query_row(
                "SELECT avatar, display_name, intro, background_image, theme_color, snow_effect, music_url
                 FROM settings WHERE id = 1",
                [],
                |row| {
                    Ok(Settings {
                        avatar: row.get(0)?,
                        display_name: row.get(1)?,
                        intro: row.get(2)?,
                        background_image: row.get(3)?,
                        theme_color: row.get(4)?,
                        snow_effect: row.get(5)?,
                        music_url: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(stored.unwrap_or_default())
    }
}

impl SettingsRepository for SqliteSettings {
    fn load(&self) -> Result<Settings, StoreError> {
        let conn = connect(&self.path)?;
        Self::read(&conn)
    }

    fn save(&self, patch: SettingsPatch) -> Result<Settings, StoreError> {
        let mut conn = connect(&self.path)?;
        let tx = conn.transaction()?;
        let mut settings = Self::read(&tx)?;
        settings.apply(patch);
        tx.execute(
            "INSERT INTO settings (id, avatar, display_name, intro, background_image, theme_color, snow_effect, music_url)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                avatar = excluded.avatar,
                display_name = excluded.display_name,
                intro = excluded.intro,
                background_image = excluded.background_image,
                theme_color = excluded.theme_color,
                snow_effect = excluded.snow_effect,
                music_url = excluded.music_url",
            params![
                settings.avatar,
                settings.display_name,
                settings.intro,
                settings.background_image,
                settings.theme_color,
                settings.snow_effect,
                settings.music_url,
            ],
        )?;
        tx.commit()?;
        tracing::info!("saved settings");
        Ok(settings)
    }
}

/// A [`BlogStore`] backed by one SQLite database file.
pub struct SqliteStore {
    path: PathBuf,
    posts: SqliteTable<Post>,
    comments: SqliteTable<Comment>,
    pending: SqliteTable<PendingComment>,
    replies: SqliteTable<Reply>,
    settings: SqliteSettings,
}

impl SqliteStore {
    /// Open or create the database at `path` and create any missing tables.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let store = Self {
            path: path.to_path_buf(),
            posts: SqliteTable::new(path.to_path_buf()),
            comments: SqliteTable::new(path.to_path_buf()),
            pending: SqliteTable::new(path.to_path_buf()),
            replies: SqliteTable::new(path.to_path_buf()),
            settings: SqliteSettings::new(path.to_path_buf()),
        };

        let conn = connect(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("opened {} (journal_mode={})", path.display(), mode);
        store.posts.migrate(&conn)?;
        store.comments.migrate(&conn)?;
        store.pending.migrate(&conn)?;
        store.replies.migrate(&conn)?;
        store.settings.migrate(&conn)?;

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlogStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn posts(&self) -> &dyn Repository<Post> {
        &self.posts
    }

    fn comments(&self) -> &dyn Repository<Comment> {
        &self.comments
    }

    fn pending(&self) -> &dyn Repository<PendingComment> {
        &self.pending
    }

    fn replies(&self) -> &dyn Repository<Reply> {
        &self.replies
    }

    fn settings(&self) -> &dyn SettingsRepository {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogd_core::{Collection, CommentPatch, NewComment, NewPost, PostPatch};
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> SqliteStore {
        SqliteStore::open(&dir.path().join("db").join("blog.db")).unwrap()
    }

    fn new_post(title: &str) -> Post {
        NewPost {
            title: title.to_string(),
            content: "body".to_string(),
            summary: None,
            images: vec!["one.png".to_string(), "two.png".to_string()],
        }
        .into_post()
    }

    fn new_comment(post_id: i64) -> Comment {
        NewComment {
            post_id,
            visitor_name: "A".to_string(),
            content: "hi".to_string(),
        }
        .into_comment(None)
    }

    #[test]
    fn sqlite_ids_are_positive_and_increasing() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let a = store.posts().insert(new_post("a")).unwrap();
        let b = store.posts().insert(new_post("b")).unwrap();
        assert!(a.id > 0);
        assert!(b.id > a.id);
    }

    #[test]
    fn sqlite_ids_not_reused_after_delete() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let a = store.posts().insert(new_post("a")).unwrap();
        assert!(store.posts().delete(a.id).unwrap());
        let b = store.posts().insert(new_post("b")).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn sqlite_insert_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let saved = store.posts().insert(new_post("Hello")).unwrap();
        let fetched = store.posts().get(saved.id).unwrap();
        assert_eq!(fetched, saved);
        assert_eq!(fetched.images, vec!["one.png", "two.png"]);
        assert_eq!(fetched.summary, "body");
    }

    #[test]
    fn sqlite_get_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let err = store.comments().get(3).unwrap_err();
        assert!(matches!(
            err,
            StoreError::NotFound {
                collection: Collection::Comments,
                id: 3
            }
        ));
    }

    #[test]
    fn sqlite_list_order_and_post_filter() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        for t in ["a", "b", "c"] {
            store.posts().insert(new_post(t)).unwrap();
        }
        store.comments().insert(new_comment(1)).unwrap();
        store.comments().insert(new_comment(2)).unwrap();
        store.comments().insert(new_comment(1)).unwrap();

        let titles: Vec<String> = store
            .posts()
            .list(&ListFilter::all())
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["c", "b", "a"]);

        let for_one = store.comments().list(&ListFilter::for_post(Some(1))).unwrap();
        assert_eq!(for_one.len(), 2);
        assert!(for_one[0].id < for_one[1].id);

        // Posts have no post_id column, so a post filter matches nothing.
        assert!(store.posts().list(&ListFilter::for_post(Some(1))).unwrap().is_empty());
    }

    #[test]
    fn sqlite_since_filter_applies() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let comment = store.comments().insert(new_comment(1)).unwrap();
        store
            .pending()
            .insert(PendingComment::mirror(&comment))
            .unwrap();

        assert_eq!(store.pending().list(&ListFilter::since(0)).unwrap().len(), 1);
        assert!(store.pending().list(&ListFilter::since(i64::MAX)).unwrap().is_empty());
    }

    #[test]
    fn sqlite_update_merges_patch() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let saved = store.posts().insert(new_post("before")).unwrap();

        let updated = store
            .posts()
            .update(
                saved.id,
                PostPatch {
                    title: Some("after".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "after");
        assert_eq!(updated.content, "body");
        assert_eq!(store.posts().get(saved.id).unwrap(), updated);
    }

    #[test]
    fn sqlite_comment_update_sets_updated_at() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let saved = store.comments().insert(new_comment(1)).unwrap();
        assert!(saved.updated_at.is_none());

        let updated = store
            .comments()
            .update(
                saved.id,
                CommentPatch {
                    visitor_name: Some("B".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.visitor_name, "B");
        assert!(store.comments().get(saved.id).unwrap().updated_at.is_some());
    }

    #[test]
    fn sqlite_update_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let err = store.posts().update(77, PostPatch::default()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 77, .. }));
    }

    #[test]
    fn sqlite_pending_and_replies_are_append_only() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let comment = store.comments().insert(new_comment(1)).unwrap();
        let pending = store
            .pending()
            .insert(PendingComment::mirror(&comment))
            .unwrap();

        let err = store
            .pending()
            .update(pending.id, CommentPatch::default())
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Unsupported {
                operation: "update",
                collection: Collection::Pending
            }
        ));
        assert_eq!(store.pending().get(pending.id).unwrap(), pending);
    }

    #[test]
    fn sqlite_delete_missing_returns_false() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.posts().insert(new_post("keep")).unwrap();

        assert!(!store.posts().delete(99).unwrap());
        assert_eq!(store.posts().list(&ListFilter::all()).unwrap().len(), 1);
    }

    #[test]
    fn sqlite_settings_default_then_merge() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        assert_eq!(store.settings().load().unwrap(), Settings::default());

        store
            .settings()
            .save(SettingsPatch {
                theme_color: Some("#000000".to_string()),
                snow_effect: Some(true),
                ..Default::default()
            })
            .unwrap();
        let merged = store
            .settings()
            .save(SettingsPatch {
                music_url: Some("/uploads/music/a.mp3".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(merged.theme_color, "#000000");
        assert!(merged.snow_effect);
        assert_eq!(merged.music_url, "/uploads/music/a.mp3");
        assert_eq!(store.settings().load().unwrap(), merged);
    }

    #[test]
    fn sqlite_data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let saved = open_store(&dir).posts().insert(new_post("durable")).unwrap();

        let reopened = open_store(&dir);
        assert_eq!(reopened.posts().get(saved.id).unwrap(), saved);
    }
}
