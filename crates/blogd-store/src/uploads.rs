// ABOUTME: On-disk storage for uploaded images and music files.
// ABOUTME: Names files by upload timestamp, enforces the music extension allow-list, rejects traversal on delete.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::StoreError;

/// Extensions accepted for music uploads, lowercase and without the dot.
pub const MUSIC_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "flac"];

/// Which upload directory a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Music,
}

impl UploadKind {
    /// Path segment used in public URLs, e.g. `/uploads/images/<name>`.
    pub fn url_segment(self) -> &'static str {
        match self {
            UploadKind::Image => "images",
            UploadKind::Music => "music",
        }
    }
}

/// Stores uploads under one directory per [`UploadKind`].
#[derive(Debug, Clone)]
pub struct UploadStore {
    images_dir: PathBuf,
    music_dir: PathBuf,
}

impl UploadStore {
    pub fn new(images_dir: PathBuf, music_dir: PathBuf) -> Self {
        Self {
            images_dir,
            music_dir,
        }
    }

    pub fn dir(&self, kind: UploadKind) -> &Path {
        match kind {
            UploadKind::Image => &self.images_dir,
            UploadKind::Music => &self.music_dir,
        }
    }

    /// Write `bytes` under a generated name and return that name.
    ///
    /// The name is the UTC upload time down to microseconds plus the original
    /// file's extension. Music must carry an allow-listed extension; nothing is
    /// written otherwise.
    pub fn store(
        &self,
        kind: UploadKind,
        bytes: &[u8],
        original_name: Option<&str>,
    ) -> Result<String, StoreError> {
        let extension = original_name
            .and_then(|name| Path::new(name).extension())
            .map(|ext| ext.to_string_lossy().to_lowercase());

        if kind == UploadKind::Music {
            match extension.as_deref() {
                Some(ext) if MUSIC_EXTENSIONS.contains(&ext) => {}
                _ => {
                    return Err(StoreError::InvalidInput(format!(
                        "unsupported music format, expected one of: {}",
                        MUSIC_EXTENSIONS.join(", ")
                    )));
                }
            }
        }

        let dir = self.dir(kind);
        fs::create_dir_all(dir)?;

        let stem = Utc::now().format("%Y%m%d%H%M%S%6f").to_string();
        let suffix = extension.map(|ext| format!(".{}", ext)).unwrap_or_default();

        // create_new never clobbers an existing upload; bump a counter on the
        // rare same-microsecond collision.
        let mut attempt = 0u32;
        loop {
            let filename = if attempt == 0 {
                format!("{}{}", stem, suffix)
            } else {
                format!("{}-{}{}", stem, attempt, suffix)
            };
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(dir.join(&filename))
            {
                Ok(mut file) => {
                    file.write_all(bytes)?;
                    file.sync_all()?;
                    tracing::info!("stored {} upload {} ({} bytes)", kind.url_segment(), filename, bytes.len());
                    return Ok(filename);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Delete a stored upload. Returns false when no such file exists.
    ///
    /// Names containing a path separator or a parent-directory token are
    /// rejected before the filesystem is touched.
    pub fn remove(&self, kind: UploadKind, name: &str) -> Result<bool, StoreError> {
        validate_name(name)?;
        match fs::remove_file(self.dir(kind).join(name)) {
            Ok(()) => {
                tracing::info!("removed {} upload {}", kind.url_segment(), name);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Reject names that could escape the upload directory.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(StoreError::InvalidInput(format!(
            "invalid file name: {}",
            name
        )));
    }
    Ok(())
}
