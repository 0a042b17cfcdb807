// ABOUTME: Configuration loading and validation for the blogd server.
// ABOUTME: Reads a TOML file into BlogConfig, applies environment secret overrides, resolves the bind address.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use blogd_store::DocumentLayout;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding `auth.admin_token`.
pub const ADMIN_TOKEN_ENV: &str = "BLOGD_ADMIN_TOKEN";
/// Environment variable overriding `auth.api_key`.
pub const API_KEY_ENV: &str = "BLOGD_API_KEY";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("server.host is not a valid bind address: {0}")]
    InvalidBind(String),
}

/// Complete server configuration. Every section and field has a default, so
/// an empty or missing file is a valid configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BlogConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub uploads: UploadConfig,
    pub web: WebConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// Resolve `host:port` to a socket address. `localhost` maps to 127.0.0.1;
    /// anything else must be an IP literal.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.host
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidBind(self.host.clone()))?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Shared secrets for the two guards. Empty strings count as unset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub admin_token: Option<String>,
    pub api_key: Option<String>,
}

impl AuthConfig {
    pub fn admin_token(&self) -> Option<&str> {
        non_empty(self.admin_token.as_deref())
    }

    pub fn api_key(&self) -> Option<&str> {
        non_empty(self.api_key.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    #[default]
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub mode: StorageMode,
    /// Directory holding the JSON collection files.
    pub data_dir: PathBuf,
    /// SQLite database file, used when `mode = "sqlite"`.
    pub database: PathBuf,
    pub posts_file: Option<PathBuf>,
    pub comments_file: Option<PathBuf>,
    pub pending_file: Option<PathBuf>,
    pub replies_file: Option<PathBuf>,
    pub settings_file: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::Json,
            data_dir: PathBuf::from("data"),
            database: PathBuf::from("data/blog.db"),
            posts_file: None,
            comments_file: None,
            pending_file: None,
            replies_file: None,
            settings_file: None,
        }
    }
}

impl StorageConfig {
    /// File layout for the document backend: per-collection overrides win
    /// over the default names inside `data_dir`.
    pub fn layout(&self) -> DocumentLayout {
        let mut layout = DocumentLayout::in_dir(&self.data_dir);
        let overrides = [
            (&mut layout.posts, &self.posts_file),
            (&mut layout.comments, &self.comments_file),
            (&mut layout.pending, &self.pending_file),
            (&mut layout.replies, &self.replies_file),
            (&mut layout.settings, &self.settings_file),
        ];
        for (slot, path) in overrides {
            if let Some(path) = path {
                *slot = path.clone();
            }
        }
        layout
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub images_dir: PathBuf,
    pub music_dir: PathBuf,
    /// Request body limit in bytes, applied to every route.
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("uploads/images"),
            music_dir: PathBuf::from("uploads/music"),
            max_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Optional static front-ends served next to the API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub admin_dir: Option<PathBuf>,
    pub public_dir: Option<PathBuf>,
}

impl BlogConfig {
    /// Load configuration from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("config file {} not found, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.server.bind_addr()?;
        Ok(config)
    }

    /// Replace the secrets with `BLOGD_ADMIN_TOKEN` / `BLOGD_API_KEY` when
    /// `lookup` returns a value for them.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(token) = lookup(ADMIN_TOKEN_ENV) {
            self.auth.admin_token = Some(token);
        }
        if let Some(key) = lookup(API_KEY_ENV) {
            self.auth.api_key = Some(key);
        }
        self
    }

    /// True when the server would accept privileged calls from anyone on a
    /// reachable interface.
    pub fn is_exposed_without_admin_token(&self) -> bool {
        let loopback = self
            .server
            .bind_addr()
            .map(|addr| addr.ip().is_loopback())
            .unwrap_or(false);
        !loopback && self.auth.admin_token().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_loads_defaults_from_empty_file() {
        let config = BlogConfig::from_toml("").unwrap();

        assert_eq!(
            config.server.bind_addr().unwrap(),
            "127.0.0.1:8000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(config.storage.mode, StorageMode::Json);
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
        assert_eq!(config.uploads.max_bytes, 52_428_800);
        assert!(config.auth.admin_token().is_none());
        assert!(config.web.public_dir.is_none());
    }

    #[test]
    fn config_missing_file_means_defaults() {
        let dir = TempDir::new().unwrap();
        let config = BlogConfig::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn config_reads_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
host = "0.0.0.0"
port = 9000

[auth]
admin_token = "s3cret"
api_key = ""

[storage]
mode = "sqlite"
database = "/var/lib/blogd/blog.db"

[uploads]
max_bytes = 1024
"#,
        )
        .unwrap();

        let config = BlogConfig::load(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.admin_token(), Some("s3cret"));
        assert_eq!(config.auth.api_key(), None);
        assert_eq!(config.storage.mode, StorageMode::Sqlite);
        assert_eq!(config.storage.database, PathBuf::from("/var/lib/blogd/blog.db"));
        assert_eq!(config.uploads.max_bytes, 1024);
        assert_eq!(config.uploads.music_dir, PathBuf::from("uploads/music"));
    }

    #[test]
    fn config_rejects_unknown_mode() {
        let err = BlogConfig::from_toml("[storage]\nmode = \"mongo\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn config_rejects_invalid_host() {
        let err = BlogConfig::from_toml("[server]\nhost = \"not a host\"").unwrap_err();
        assert!(err.to_string().contains("not a host"), "{}", err);
    }

    #[test]
    fn env_overrides_replace_secrets() {
        let config = BlogConfig::from_toml("[auth]\nadmin_token = \"file\"")
            .unwrap()
            .with_env_overrides(|key| match key {
                ADMIN_TOKEN_ENV => Some("env-token".to_string()),
                API_KEY_ENV => Some("env-key".to_string()),
                _ => None,
            });

        assert_eq!(config.auth.admin_token(), Some("env-token"));
        assert_eq!(config.auth.api_key(), Some("env-key"));
    }

    #[test]
    fn env_overrides_leave_file_values_when_unset() {
        let config = BlogConfig::from_toml("[auth]\nadmin_token = \"file\"")
            .unwrap()
            .with_env_overrides(|_| None);
        assert_eq!(config.auth.admin_token(), Some("file"));
    }

    #[test]
    fn layout_prefers_per_collection_overrides() {
        let config = BlogConfig::from_toml(
            "[storage]\ndata_dir = \"/srv/blog\"\nposts_file = \"/tmp/p.json\"",
        )
        .unwrap();
        let layout = config.storage.layout();

        assert_eq!(layout.posts, PathBuf::from("/tmp/p.json"));
        assert_eq!(layout.comments, PathBuf::from("/srv/blog/comments.json"));
    }

    #[test]
    fn exposure_check_requires_loopback_or_token() {
        let local = BlogConfig::default();
        assert!(!local.is_exposed_without_admin_token());

        let open = BlogConfig::from_toml("[server]\nhost = \"0.0.0.0\"").unwrap();
        assert!(open.is_exposed_without_admin_token());

        let guarded = BlogConfig::from_toml(
            "[server]\nhost = \"0.0.0.0\"\n[auth]\nadmin_token = \"t\"",
        )
        .unwrap();
        assert!(!guarded.is_exposed_without_admin_token());
    }
}
