// ABOUTME: JSON-file document backend: one pretty-printed array per collection, one object for settings.
// ABOUTME: Every mutation reads the whole file, edits it in memory, and rewrites it via temp file + rename.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use blogd_core::{
    Collection, Comment, ListFilter, PendingComment, Post, Record, Reply, Settings, SettingsPatch,
    now_timestamp,
};

use crate::{BlogStore, Repository, SettingsRepository, StoreError, next_id, order};

/// File locations for every collection of a document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLayout {
    pub posts: PathBuf,
    pub comments: PathBuf,
    pub pending: PathBuf,
    pub replies: PathBuf,
    pub settings: PathBuf,
}

impl DocumentLayout {
    /// The default layout: `<dir>/posts.json`, `<dir>/comments.json`, and so on.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            posts: dir.join("posts.json"),
            comments: dir.join("comments.json"),
            pending: dir.join("pending.json"),
            replies: dir.join("replies.json"),
            settings: dir.join("settings.json"),
        }
    }
}

/// Create `path` (and its parent directories) holding `default` if it does not exist yet.
fn ensure_file(path: &Path, default: &str) -> Result<(), StoreError> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(default.as_bytes())?;
            file.sync_all()?;
            Ok(())
        }
        // Someone else created it between the check and the open.
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Replace `path` with `contents` using write-temp, fsync, rename.
fn write_atomic(path: &Path, contents: &str) -> Result<(), StoreError> {
    let tmp_path = path.with_extension("json.tmp");
    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(contents.as_bytes())?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    fs::rename(&tmp_path, path)?;

    // Best-effort: the rename already happened, a failed directory fsync
    // only weakens durability of the directory entry.
    if let Some(parent) = path.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }
    Ok(())
}

/// One collection stored as a JSON array in a single file.
///
/// Mutations hold a per-collection mutex across the whole read-modify-write so
/// writers inside this process cannot lose each other's updates or hand out the
/// same id. Separate processes sharing the file are not coordinated.
pub struct DocumentCollection<R> {
    path: PathBuf,
    write_lock: Mutex<()>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> DocumentCollection<R> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make sure the backing file exists, holding `[]` when freshly created.
    pub fn ensure(&self) -> Result<(), StoreError> {
        ensure_file(&self.path, "[]")
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Poisoned(R::COLLECTION))
    }

    fn read_all(&self) -> Result<Vec<R>, StoreError> {
        self.ensure()?;
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn write_all(&self, records: &[R]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(records)?;
        write_atomic(&self.path, &json)
    }

    fn not_found(id: i64) -> StoreError {
        StoreError::NotFound {
            collection: R::COLLECTION,
            id,
        }
    }
}

impl<R: Record> Repository<R> for DocumentCollection<R> {
    fn list(&self, filter: &ListFilter) -> Result<Vec<R>, StoreError> {
        let mut records: Vec<R> = self
            .read_all()?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        order(&mut records);
        Ok(records)
    }

    fn get(&self, id: i64) -> Result<R, StoreError> {
        self.read_all()?
            .into_iter()
            .find(|r| r.id() == id)
            .ok_or_else(|| Self::not_found(id))
    }

    fn insert(&self, mut record: R) -> Result<R, StoreError> {
        let _guard = self.lock()?;
        let mut records = self.read_all()?;
        record.stamp(next_id(&records), now_timestamp());
        records.push(record.clone());
        self.write_all(&records)?;
        tracing::info!("inserted {} {}", R::COLLECTION, record.id());
        Ok(record)
    }

    fn update(&self, id: i64, patch: R::Patch) -> Result<R, StoreError> {
        let _guard = self.lock()?;
        let mut records = self.read_all()?;
        let record = records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| Self::not_found(id))?;
        record.apply(patch, &now_timestamp());
        let updated = record.clone();
        self.write_all(&records)?;
        tracing::info!("updated {} {}", R::COLLECTION, id);
        Ok(updated)
    }

    fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let _guard = self.lock()?;
        let mut records = self.read_all()?;
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() == before {
            return Ok(false);
        }
        self.write_all(&records)?;
        tracing::info!("deleted {} {}", R::COLLECTION, id);
        Ok(true)
    }
}

/// The settings record stored as a single JSON object.
pub struct DocumentSettings {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl DocumentSettings {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn ensure(&self) -> Result<(), StoreError> {
        ensure_file(&self.path, "{}")
    }
}

impl SettingsRepository for DocumentSettings {
    fn load(&self) -> Result<Settings, StoreError> {
        self.ensure()?;
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(Settings::default());
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn save(&self, patch: SettingsPatch) -> Result<Settings, StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Poisoned(Collection::Settings))?;
        let mut settings = self.load()?;
        settings.apply(patch);
        write_atomic(&self.path, &serde_json::to_string_pretty(&settings)?)?;
        tracing::info!("saved settings");
        Ok(settings)
    }
}

/// A [`BlogStore`] backed by one JSON file per collection.
pub struct DocumentStore {
    posts: DocumentCollection<Post>,
    comments: DocumentCollection<Comment>,
    pending: DocumentCollection<PendingComment>,
    replies: DocumentCollection<Reply>,
    settings: DocumentSettings,
}

impl DocumentStore {
    /// Open the store, creating any missing file with an empty default.
    pub fn open(layout: DocumentLayout) -> Result<Self, StoreError> {
        let store = Self {
            posts: DocumentCollection::new(layout.posts),
            comments: DocumentCollection::new(layout.comments),
            pending: DocumentCollection::new(layout.pending),
            replies: DocumentCollection::new(layout.replies),
            settings: DocumentSettings::new(layout.settings),
        };
        store.posts.ensure()?;
        store.comments.ensure()?;
        store.pending.ensure()?;
        store.replies.ensure()?;
        store.settings.ensure()?;
        Ok(store)
    }
}

impl BlogStore for DocumentStore {
    fn backend(&self) -> &'static str {
        "json"
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
