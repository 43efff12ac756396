#![forbid(unsafe_code)]

//! Theme persistence: where parameter trees are loaded from and saved to.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     EditorController                          │
//! │   - emits Effect::Load / Effect::Save                         │
//! └──────────────────────────────────────────────────────────────┘
//!                              │ (worker thread)
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ThemeStore                             │
//! │   - MemoryStore: in-memory (testing, offline editing)         │
//! │   - FileStore: one JSON file per theme                        │
//! │   - HttpStore: GET/PUT {base}/api/themes/:id (feature http)   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `StoreError::Io` | File I/O failure | Returned, editor state unaffected |
//! | `StoreError::Transport` | Network failure or bad status | Returned, save retried by auto-save |
//! | `StoreError::Serialization` | JSON encode/decode | Returned |
//! | `StoreError::Rejected` | Server answered `success: false` | Message shown to the user |
//! | `StoreError::NotFound` | Unknown theme id | Editor shows the not-found state |
//! | `StoreError::Unavailable` | Collaborator not configured, worker lost | Returned |

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use pagesmith_core::Value;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[cfg(feature = "http")]
pub use http::HttpStore;
#[cfg(feature = "http")]
pub(crate) use http::read_envelope;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors returned by the editor's I/O collaborators.
#[derive(Debug)]
pub enum StoreError {
    /// I/O error during file operations.
    Io(std::io::Error),
    /// Request never produced a usable response.
    Transport(String),
    /// Serialization or deserialization error.
    Serialization(String),
    /// The server processed the request and refused it.
    Rejected(String),
    /// No theme with this id.
    NotFound(String),
    /// Collaborator is not configured.
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "I/O error: {e}"),
            StoreError::Transport(msg) => write!(f, "transport error: {msg}"),
            StoreError::Serialization(msg) => write!(f, "serialization error: {msg}"),
            StoreError::Rejected(msg) => f.write_str(msg),
            StoreError::NotFound(id) => write!(f, "theme not found: {id}"),
            StoreError::Unavailable(msg) => write!(f, "unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store and generator operations.
pub type StoreResult<T> = Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Records and wire envelopes
// ─────────────────────────────────────────────────────────────────────────────

/// A stored theme.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Parameter tree. Accepted on the wire as an object or as a JSON string.
    #[serde(default, deserialize_with = "params_from_object_or_string")]
    pub default_params: Value,
}

impl ThemeRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, default_params: Value) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            description: String::new(),
            default_params,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Decode stored parameters that may be a tree or a string holding one.
pub fn normalize_params(raw: serde_json::Value) -> StoreResult<Value> {
    match raw {
        serde_json::Value::String(text) if text.trim().is_empty() => Ok(Value::Null),
        serde_json::Value::String(text) => {
            let parsed: serde_json::Value = serde_json::from_str(&text)?;
            Ok(Value::from(parsed))
        }
        other => Ok(Value::from(other)),
    }
}

fn params_from_object_or_string<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    normalize_params(raw).map_err(de::Error::custom)
}

/// Body of `GET /api/themes/:id`.
#[derive(Debug, Deserialize)]
pub struct LoadResponse {
    pub success: bool,
    #[serde(default)]
    pub theme: Option<ThemeRecord>,
    #[serde(default)]
    pub error: Option<String>,
}

impl LoadResponse {
    pub fn into_result(self, theme_id: &str) -> StoreResult<ThemeRecord> {
        match (self.success, self.theme) {
            (true, Some(theme)) => Ok(theme),
            (true, None) => Err(StoreError::NotFound(theme_id.to_string())),
            (false, _) => Err(self
                .error
                .map(StoreError::Rejected)
                .unwrap_or_else(|| StoreError::NotFound(theme_id.to_string()))),
        }
    }
}

/// Body of `PUT /api/themes/:id`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest<'a> {
    pub theme_params: &'a Value,
}

/// Response to `PUT /api/themes/:id`.
#[derive(Debug, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl SaveResponse {
    pub fn into_result(self) -> StoreResult<()> {
        if self.success {
            Ok(())
        } else {
            Err(StoreError::Rejected(
                self.error.unwrap_or_else(|| "failed to save theme".into()),
            ))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store trait
// ─────────────────────────────────────────────────────────────────────────────

/// Where themes live.
///
/// Implementations block; the editor calls them from worker threads.
pub trait ThemeStore: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    fn load(&self, theme_id: &str) -> StoreResult<ThemeRecord>;

    /// Replace the stored parameter tree of `theme_id`.
    fn save(&self, theme_id: &str, params: &Value) -> StoreResult<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory store
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory themes, for tests and offline editing.
#[derive(Default)]
pub struct MemoryStore {
    themes: RwLock<HashMap<String, ThemeRecord>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_theme(self, record: ThemeRecord) -> Self {
        self.insert(record);
        self
    }

    pub fn insert(&self, record: ThemeRecord) {
        if let Ok(mut guard) = self.themes.write() {
            guard.insert(record.id.clone(), record);
        }
    }

    #[must_use]
    pub fn get(&self, theme_id: &str) -> Option<ThemeRecord> {
        self.themes.read().ok()?.get(theme_id).cloned()
    }

    /// Number of successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl ThemeStore for MemoryStore {
    fn name(&self) -> &str {
        "MemoryStore"
    }

    fn load(&self, theme_id: &str) -> StoreResult<ThemeRecord> {
        let guard = self
            .themes
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))?;
        guard
            .get(theme_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(theme_id.to_string()))
    }

    fn save(&self, theme_id: &str, params: &Value) -> StoreResult<()> {
        let mut guard = self
            .themes
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))?;
        let record = guard
            .get_mut(theme_id)
            .ok_or_else(|| StoreError::NotFound(theme_id.to_string()))?;
        record.default_params = params.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.themes.read().map(|g| g.len()).unwrap_or(0);
        f.debug_struct("MemoryStore")
            .field("themes", &count)
            .field("saves", &self.save_count())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File store
// ─────────────────────────────────────────────────────────────────────────────

/// One `<id>.json` file per theme under a directory.
///
/// Writes go to `<id>.json.tmp` first, are synced, then renamed over the
/// target, so a crash never leaves a half-written theme.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn theme_path(&self, theme_id: &str) -> StoreResult<PathBuf> {
        let valid = !theme_id.is_empty()
            && theme_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::NotFound(theme_id.to_string()));
        }
        Ok(self.dir.join(format!("{theme_id}.json")))
    }

    fn read_record(path: &Path) -> StoreResult<ThemeRecord> {
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader).map_err(|e| {
            StoreError::Serialization(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Write a whole record, creating the theme if needed.
    pub fn put(&self, record: &ThemeRecord) -> StoreResult<()> {
        let path = self.theme_path(&record.id)?;
        fs::create_dir_all(&self.dir)?;

        let mut tmp_path = path.clone();
        tmp_path.set_extension("json.tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, record)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        tracing::debug!(path = %path.display(), theme_id = %record.id, "wrote theme");
        Ok(())
    }
}

impl ThemeStore for FileStore {
    fn name(&self) -> &str {
        "FileStore"
    }

    fn load(&self, theme_id: &str) -> StoreResult<ThemeRecord> {
        let path = self.theme_path(theme_id)?;
        if !path.exists() {
            return Err(StoreError::NotFound(theme_id.to_string()));
        }
        Self::read_record(&path)
    }

    fn save(&self, theme_id: &str, params: &Value) -> StoreResult<()> {
        let path = self.theme_path(theme_id)?;
        let mut record = if path.exists() {
            Self::read_record(&path)?
        } else {
            ThemeRecord::new(theme_id, Value::Null)
        };
        record.default_params = params.clone();
        self.put(&record)
    }
}

impl fmt::Debug for FileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStore").field("dir", &self.dir).finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP store
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use pagesmith_core::Value;
    use serde::de::DeserializeOwned;

    use super::{
        LoadResponse, SaveRequest, SaveResponse, StoreError, StoreResult, ThemeRecord, ThemeStore,
    };

    /// Themes behind the editor's REST API.
    #[derive(Debug)]
    pub struct HttpStore {
        base_url: String,
        agent: ureq::Agent,
    }

    impl HttpStore {
        #[must_use]
        pub fn new(base_url: impl Into<String>) -> Self {
            Self::with_timeout(base_url, Duration::from_secs(30))
        }

        #[must_use]
        pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
            let base_url = base_url.into().trim_end_matches('/').to_string();
            let agent = ureq::AgentBuilder::new().timeout(timeout).build();
            Self { base_url, agent }
        }

        fn theme_url(&self, theme_id: &str) -> String {
            format!("{}/api/themes/{}", self.base_url, theme_id)
        }
    }

    /// Decode a JSON envelope, including the ones sent with error statuses.
    pub(crate) fn read_envelope<T: DeserializeOwned>(
        response: Result<ureq::Response, ureq::Error>,
    ) -> StoreResult<T> {
        match response {
            Ok(response) => response
                .into_json()
                .map_err(|e| StoreError::Serialization(e.to_string())),
            Err(ureq::Error::Status(code, response)) => response
                .into_json()
                .map_err(|_| StoreError::Transport(format!("server answered HTTP {code}"))),
            Err(ureq::Error::Transport(transport)) => {
                Err(StoreError::Transport(transport.to_string()))
            }
        }
    }

    impl ThemeStore for HttpStore {
        fn name(&self) -> &str {
            "HttpStore"
        }

        fn load(&self, theme_id: &str) -> StoreResult<ThemeRecord> {
            let url = self.theme_url(theme_id);
            tracing::debug!(url = %url, "loading theme");
            let envelope: LoadResponse = read_envelope(self.agent.get(&url).call())?;
            envelope.into_result(theme_id)
        }

        fn save(&self, theme_id: &str, params: &Value) -> StoreResult<()> {
            let url = self.theme_url(theme_id);
            tracing::debug!(url = %url, "saving theme");
            let body = SaveRequest {
                theme_params: params,
            };
            let envelope: SaveResponse = read_envelope(self.agent.put(&url).send_json(body))?;
            envelope.into_result()
        }
    }
}
