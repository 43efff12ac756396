#![forbid(unsafe_code)]

//! The editor controller: owns the history, the auto-save timer and the
//! save bookkeeping for one theme.
//!
//! The controller follows the Elm architecture. [`EditorController::update`]
//! takes an [`EditorMsg`] and the current time and returns the [`Effect`]s
//! the caller must perform. The controller itself never does I/O; results
//! come back as messages (`Loaded`, `Saved`, `Generated`).
//!
//! ```text
//! input ─► EditorMsg ─► update(msg, now) ─► Vec<Effect> ─► store / generator / preview
//!              ▲                                                   │
//!              └──────────────── completion messages ◄─────────────┘
//! ```
//!
//! # Invariants
//!
//! 1. Every accepted mutation (field change, bulk replace, undo, redo) bumps
//!    the revision, marks the editor dirty and re-arms auto-save.
//! 2. At most one save is in flight. A save requested meanwhile is queued and
//!    sent once, with the newest tree, after the in-flight one completes.
//! 3. A successful save marks the editor clean only when nothing changed
//!    after the saved revision.
//! 4. A failed save keeps the editor dirty and re-arms auto-save.
//! 5. After `Shutdown` no effect is ever emitted again.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Load fails | `LoadState::Failed`, no history entry |
//! | Field write rejected by the engine | Error status, tree unchanged |
//! | Save fails | Error status, still dirty, auto-save retries |
//! | Generation fails | Error status, tree unchanged |

use std::time::{Duration, Instant};

use pagesmith_core::{
    ParamPath, Value, apply, default_theme_params, find_product, key_id_segments,
    merge_product_page, merge_with_defaults,
};

use crate::autosave::AutoSaveTimer;
use crate::config::EditorConfig;
use crate::history::History;
use crate::store::{StoreResult, ThemeRecord};

/// Whether the current tree has been persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Clean,
    Dirty,
}

/// Progress of the initial theme load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Info,
    Error,
}

/// A message shown to the user, optionally expiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
    expires_at: Option<Instant>,
}

impl StatusMessage {
    #[must_use]
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// A key press as seen by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: char,
    pub ctrl: bool,
    pub meta: bool,
}

impl KeyInput {
    #[must_use]
    pub fn plain(key: char) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
        }
    }

    #[must_use]
    pub fn ctrl(key: char) -> Self {
        Self {
            key,
            ctrl: true,
            meta: false,
        }
    }

    #[must_use]
    pub fn meta(key: char) -> Self {
        Self {
            key,
            ctrl: false,
            meta: true,
        }
    }

    /// Ctrl+S or Cmd+S.
    #[must_use]
    pub fn is_save_shortcut(&self) -> bool {
        (self.ctrl || self.meta) && self.key.eq_ignore_ascii_case(&'s')
    }
}

/// Inputs to the controller.
#[derive(Debug)]
pub enum EditorMsg {
    /// Start loading the theme.
    Load,
    Loaded(StoreResult<ThemeRecord>),
    FieldChanged { path: ParamPath, value: Value },
    BulkReplace(Value),
    Undo,
    Redo,
    SaveRequested,
    Key(KeyInput),
    Saved {
        revision: u64,
        result: StoreResult<()>,
    },
    GenerateProductPage { product_id: String },
    Generated {
        product_id: String,
        result: StoreResult<Value>,
    },
    SetAutoSave(bool),
    Tick,
    Shutdown,
}

/// Work the caller performs on the controller's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Load {
        theme_id: String,
    },
    /// Persist `params`; answer with [`EditorMsg::Saved`] carrying `revision`.
    Save {
        theme_id: String,
        params: Value,
        revision: u64,
    },
    /// Generate a product page; answer with [`EditorMsg::Generated`].
    Generate {
        product_id: String,
        product: Value,
        params: Value,
    },
    /// Show this tree in the preview.
    Render(Value),
}

/// State machine of one open theme.
#[derive(Debug)]
pub struct EditorController {
    theme_id: String,
    config: EditorConfig,
    history: History<Value>,
    autosave: AutoSaveTimer,
    autosave_enabled: bool,
    load_state: LoadState,
    theme_name: Option<String>,
    sync: SyncState,
    revision: u64,
    saving: Option<u64>,
    save_queued: bool,
    last_saved: Option<u64>,
    generating: Option<String>,
    status: Option<StatusMessage>,
    closed: bool,
}

impl EditorController {
    #[must_use]
    pub fn new(theme_id: impl Into<String>, config: EditorConfig) -> Self {
        Self {
            theme_id: theme_id.into(),
            history: History::new(config.history),
            autosave: AutoSaveTimer::new(config.autosave_delay),
            autosave_enabled: config.autosave_enabled,
            config,
            load_state: LoadState::Idle,
            theme_name: None,
            sync: SyncState::Clean,
            revision: 0,
            saving: None,
            save_queued: false,
            last_saved: None,
            generating: None,
            status: None,
            closed: false,
        }
    }

    /// Handle one message.
    pub fn update(&mut self, msg: EditorMsg, now: Instant) -> Vec<Effect> {
        if self.closed {
            tracing::debug!(msg = ?msg, "editor closed, dropping message");
            return Vec::new();
        }
        match msg {
            EditorMsg::Load => self.begin_load(),
            EditorMsg::Loaded(result) => self.load_completed(result, now),
            EditorMsg::FieldChanged { path, value } => self.apply_field_change(&path, value, now),
            EditorMsg::BulkReplace(tree) => self.apply_bulk_replace(tree, now),
            EditorMsg::Undo => self.undo(now),
            EditorMsg::Redo => self.redo(now),
            EditorMsg::SaveRequested => self.request_save(),
            EditorMsg::Key(key) => self.handle_key(key),
            EditorMsg::Saved { revision, result } => self.save_completed(revision, result, now),
            EditorMsg::GenerateProductPage { product_id } => {
                self.request_generation(product_id, now)
            }
            EditorMsg::Generated { product_id, result } => {
                self.generation_completed(&product_id, result, now)
            }
            EditorMsg::SetAutoSave(enabled) => {
                self.set_autosave(enabled, now);
                Vec::new()
            }
            EditorMsg::Tick => self.tick(now),
            EditorMsg::Shutdown => {
                self.shutdown();
                Vec::new()
            }
        }
    }

    // ── Loading ─────────────────────────────────────────────────────────

    pub fn begin_load(&mut self) -> Vec<Effect> {
        self.load_state = LoadState::Loading;
        vec![Effect::Load {
            theme_id: self.theme_id.clone(),
        }]
    }

    /// Install a loaded theme as the new, non-undoable baseline.
    pub fn load_completed(&mut self, result: StoreResult<ThemeRecord>, now: Instant) -> Vec<Effect> {
        match result {
            Ok(record) => {
                let params = if self.config.merge_defaults_on_load {
                    merge_with_defaults(&default_theme_params(), &record.default_params)
                } else if record.default_params.is_null() {
                    Value::object()
                } else {
                    record.default_params
                };
                tracing::info!(theme_id = %self.theme_id, name = %record.name, "theme loaded");
                self.history.initialize(params.clone());
                self.theme_name = Some(record.name);
                self.load_state = LoadState::Ready;
                self.sync = SyncState::Clean;
                self.last_saved = Some(self.revision);
                self.autosave.cancel();
                vec![Effect::Render(params)]
            }
            Err(error) => {
                tracing::warn!(theme_id = %self.theme_id, error = %error, "theme load failed");
                self.load_state = LoadState::Failed(error.to_string());
                self.set_status(StatusKind::Error, format!("Failed to load theme: {error}"), now);
                Vec::new()
            }
        }
    }

    // ── Mutations ───────────────────────────────────────────────────────

    /// Write `value` at `path` in the current tree.
    ///
    /// Product page ids in the path are always read as keys.
    pub fn apply_field_change(&mut self, path: &ParamPath, value: Value, now: Instant) -> Vec<Effect> {
        let Some(current) = self.history.current() else {
            tracing::debug!(path = %path, "field change before load ignored");
            return Vec::new();
        };
        let path = key_id_segments(path);
        match apply(Some(current), &path, value) {
            Ok(tree) => self.commit(tree, now),
            Err(error) => {
                tracing::warn!(path = %path, error = %error, "field change rejected");
                self.set_status(StatusKind::Error, format!("Cannot set {path}: {error}"), now);
                Vec::new()
            }
        }
    }

    /// Replace the whole tree as one undoable step.
    pub fn apply_bulk_replace(&mut self, tree: Value, now: Instant) -> Vec<Effect> {
        self.commit(tree, now)
    }

    pub fn undo(&mut self, now: Instant) -> Vec<Effect> {
        if !self.history.undo() {
            return Vec::new();
        }
        self.after_change(now)
    }

    pub fn redo(&mut self, now: Instant) -> Vec<Effect> {
        if !self.history.redo() {
            return Vec::new();
        }
        self.after_change(now)
    }

    fn commit(&mut self, tree: Value, now: Instant) -> Vec<Effect> {
        self.history.update(tree);
        self.after_change(now)
    }

    fn after_change(&mut self, now: Instant) -> Vec<Effect> {
        self.revision += 1;
        self.sync = SyncState::Dirty;
        if self.autosave_enabled {
            self.autosave.arm(now);
        }
        self.history
            .current()
            .map(|tree| vec![Effect::Render(tree.clone())])
            .unwrap_or_default()
    }

    // ── Saving ──────────────────────────────────────────────────────────

    /// Save now, skipping any pending auto-save.
    pub fn request_save(&mut self) -> Vec<Effect> {
        self.autosave.cancel();
        self.start_save()
    }

    fn handle_key(&mut self, key: KeyInput) -> Vec<Effect> {
        if key.is_save_shortcut() {
            self.request_save()
        } else {
            Vec::new()
        }
    }

    fn start_save(&mut self) -> Vec<Effect> {
        let Some(params) = self.history.current() else {
            tracing::debug!("save requested before load, ignoring");
            return Vec::new();
        };
        if let Some(in_flight) = self.saving {
            tracing::debug!(in_flight, revision = self.revision, "save in flight, queueing");
            self.save_queued = true;
            return Vec::new();
        }
        self.saving = Some(self.revision);
        tracing::debug!(theme_id = %self.theme_id, revision = self.revision, "saving theme");
        vec![Effect::Save {
            theme_id: self.theme_id.clone(),
            params: params.clone(),
            revision: self.revision,
        }]
    }

    pub fn save_completed(&mut self, revision: u64, result: StoreResult<()>, now: Instant) -> Vec<Effect> {
        self.saving = None;
        match result {
            Ok(()) => {
                self.last_saved = Some(revision);
                if revision == self.revision {
                    self.sync = SyncState::Clean;
                }
                tracing::info!(theme_id = %self.theme_id, revision, "theme saved");
                self.set_status(StatusKind::Success, "Theme saved successfully!".into(), now);
            }
            Err(error) => {
                tracing::warn!(theme_id = %self.theme_id, revision, error = %error, "save failed");
                self.set_status(StatusKind::Error, format!("Failed to save theme: {error}"), now);
                if self.autosave_enabled {
                    self.autosave.arm(now);
                }
            }
        }
        if std::mem::take(&mut self.save_queued) {
            return self.start_save();
        }
        Vec::new()
    }

    pub fn set_autosave(&mut self, enabled: bool, now: Instant) {
        self.autosave_enabled = enabled;
        if !enabled {
            self.autosave.cancel();
        } else if self.sync == SyncState::Dirty {
            self.autosave.arm(now);
        }
    }

    /// Advance time: expire status messages and fire auto-save.
    pub fn tick(&mut self, now: Instant) -> Vec<Effect> {
        if self.status.as_ref().is_some_and(|s| s.is_expired(now)) {
            self.status = None;
        }
        if self.autosave.poll(now) {
            tracing::debug!(theme_id = %self.theme_id, "auto-save fired");
            return self.start_save();
        }
        Vec::new()
    }

    // ── Content generation ─────────────────────────────────────────────

    pub fn request_generation(&mut self, product_id: String, now: Instant) -> Vec<Effect> {
        let Some(tree) = self.history.current() else {
            self.set_status(StatusKind::Error, "No theme loaded".into(), now);
            return Vec::new();
        };
        if let Some(running) = &self.generating {
            tracing::debug!(running = %running, requested = %product_id, "generation already running");
            return Vec::new();
        }
        let Some(product) = find_product(tree, &product_id).cloned() else {
            self.set_status(StatusKind::Error, format!("Unknown product: {product_id}"), now);
            return Vec::new();
        };
        let params = tree.clone();
        self.generating = Some(product_id.clone());
        self.set_status(StatusKind::Info, "Generating product page...".into(), now);
        vec![Effect::Generate {
            product_id,
            product,
            params,
        }]
    }

    /// Merge a generated page into the tree as it is now.
    pub fn generation_completed(
        &mut self,
        product_id: &str,
        result: StoreResult<Value>,
        now: Instant,
    ) -> Vec<Effect> {
        self.generating = None;
        let page = match result {
            Ok(page) => page,
            Err(error) => {
                tracing::warn!(product_id, error = %error, "product page generation failed");
                self.set_status(StatusKind::Error, format!("Failed to generate: {error}"), now);
                return Vec::new();
            }
        };
        let Some(current) = self.history.current() else {
            return Vec::new();
        };
        match merge_product_page(current, product_id, &page) {
            Ok(tree) => {
                self.set_status(StatusKind::Success, "AI content applied".into(), now);
                self.commit(tree, now)
            }
            Err(error) => {
                tracing::warn!(product_id, error = %error, "generated page could not be merged");
                self.set_status(StatusKind::Error, format!("Failed to apply content: {error}"), now);
                Vec::new()
            }
        }
    }

    // ── Teardown ───────────────────────────────────────────────────────

    /// Close the editor. Nothing is saved or emitted afterwards.
    pub fn shutdown(&mut self) {
        if self.sync == SyncState::Dirty {
            tracing::warn!(theme_id = %self.theme_id, revision = self.revision, "closing with unsaved changes");
        }
        self.closed = true;
        self.autosave.cancel();
        self.save_queued = false;
        self.history.clear();
    }

    fn set_status(&mut self, kind: StatusKind, text: String, now: Instant) {
        let expires_at = match kind {
            StatusKind::Error => None,
            StatusKind::Success | StatusKind::Info => Some(now + self.config.status_ttl),
        };
        self.status = Some(StatusMessage {
            kind,
            text,
            expires_at,
        });
    }

    // ── Queries ────────────────────────────────────────────────────────

    #[must_use]
    pub fn theme_id(&self) -> &str {
        &self.theme_id
    }

    #[must_use]
    pub fn theme_name(&self) -> Option<&str> {
        self.theme_name.as_deref()
    }

    #[must_use]
    pub fn current(&self) -> Option<&Value> {
        self.history.current()
    }

    #[must_use]
    pub fn history(&self) -> &History<Value> {
        &self.history
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    #[must_use]
    pub fn sync_state(&self) -> SyncState {
        self.sync
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.sync == SyncState::Dirty
    }

    #[must_use]
    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    #[must_use]
    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Revision of the last successful save or load.
    #[must_use]
    pub fn last_saved_revision(&self) -> Option<u64> {
        self.last_saved
    }

    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.saving.is_some()
    }

    #[must_use]
    pub fn is_generating(&self) -> bool {
        self.generating.is_some()
    }

    #[must_use]
    pub fn autosave_enabled(&self) -> bool {
        self.autosave_enabled
    }

    #[must_use]
    pub fn autosave_deadline(&self) -> Option<Instant> {
        self.autosave.deadline()
    }

    /// Time until the pending auto-save, if one is scheduled.
    #[must_use]
    pub fn autosave_remaining(&self, now: Instant) -> Option<Duration> {
        self.autosave.remaining(now)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use serde_json::json;

    const SEC: Duration = Duration::from_secs(1);

    fn path(dotted: &str) -> ParamPath {
        ParamPath::parse_dotted(dotted).unwrap()
    }

    fn loaded(tree: serde_json::Value) -> (EditorController, Instant) {
        let now = Instant::now();
        let mut editor = EditorController::new("t1", EditorConfig::default().with_merge_defaults(false));
        assert_eq!(
            editor.update(EditorMsg::Load, now),
            vec![Effect::Load { theme_id: "t1".into() }]
        );
        assert_eq!(editor.load_state(), &LoadState::Loading);
        let record = ThemeRecord::new("t1", Value::from(tree));
        let effects = editor.update(EditorMsg::Loaded(Ok(record)), now);
        assert!(matches!(effects.as_slice(), [Effect::Render(_)]));
        (editor, now)
    }

    fn set(editor: &mut EditorController, dotted: &str, value: serde_json::Value, now: Instant) -> Vec<Effect> {
        editor.update(
            EditorMsg::FieldChanged {
                path: path(dotted),
                value: Value::from(value),
            },
            now,
        )
    }

    fn read(editor: &EditorController, dotted: &str) -> serde_json::Value {
        editor.current().unwrap().get(&path(dotted)).unwrap().to_json()
    }

    fn save_revision(effects: &[Effect]) -> Option<u64> {
        effects.iter().find_map(|effect| match effect {
            Effect::Save { revision, .. } => Some(*revision),
            _ => None,
        })
    }

    #[test]
    fn load_sets_clean_baseline() {
        let (editor, _) = loaded(json!({"colors": {"primary": "#000"}}));
        assert_eq!(editor.load_state(), &LoadState::Ready);
        assert_eq!(editor.sync_state(), SyncState::Clean);
        assert!(!editor.can_undo());
        assert_eq!(editor.autosave_deadline(), None);
        assert_eq!(read(&editor, "colors.primary"), json!("#000"));
    }

    #[test]
    fn load_merges_defaults_when_configured() {
        let now = Instant::now();
        let mut editor = EditorController::new("t1", EditorConfig::default());
        let record = ThemeRecord::new("t1", Value::from(json!({"colors": {"primary": "#000"}})));
        editor.update(EditorMsg::Loaded(Ok(record)), now);
        assert_eq!(read(&editor, "colors.primary"), json!("#000"));
        assert_eq!(read(&editor, "colors.secondary"), json!("#D2691E"));
        assert_eq!(read(&editor, "content.productPages"), json!({}));
    }

    #[test]
    fn load_failure_reports_and_keeps_history_empty() {
        let now = Instant::now();
        let mut editor = EditorController::new("missing", EditorConfig::default());
        editor.update(EditorMsg::Load, now);
        let effects = editor.update(
            EditorMsg::Loaded(Err(StoreError::NotFound("missing".into()))),
            now,
        );
        assert!(effects.is_empty());
        assert!(matches!(editor.load_state(), LoadState::Failed(msg) if msg.contains("missing")));
        assert_eq!(editor.current(), None);
        assert_eq!(editor.status().unwrap().kind, StatusKind::Error);
        assert!(set(&mut editor, "colors.primary", json!("#fff"), now).is_empty());
        assert!(editor.update(EditorMsg::SaveRequested, now).is_empty());
    }

    #[test]
    fn undo_restores_and_redo_replays() {
        let (mut editor, now) = loaded(json!({"colors": {"primary": "#000"}}));
        assert!(!editor.can_undo());
        set(&mut editor, "colors.primary", json!("#fff"), now);
        assert_eq!(read(&editor, "colors.primary"), json!("#fff"));
        assert!(editor.can_undo());
        assert!(!editor.can_redo());

        editor.update(EditorMsg::Undo, now);
        assert_eq!(read(&editor, "colors.primary"), json!("#000"));
        assert!(!editor.can_undo());
        assert!(editor.can_redo());
        assert!(editor.update(EditorMsg::Undo, now).is_empty());
        assert_eq!(read(&editor, "colors.primary"), json!("#000"));

        editor.update(EditorMsg::Redo, now);
        assert_eq!(read(&editor, "colors.primary"), json!("#fff"));
        assert!(!editor.can_redo());
    }

    #[test]
    fn edit_after_undo_drops_redo() {
        let (mut editor, now) = loaded(json!({"a": 1}));
        set(&mut editor, "a", json!(2), now);
        set(&mut editor, "a", json!(3), now);
        editor.update(EditorMsg::Undo, now);
        assert_eq!(read(&editor, "a"), json!(2));
        set(&mut editor, "a", json!(4), now);
        assert!(!editor.can_redo());
        assert!(editor.update(EditorMsg::Redo, now).is_empty());
        editor.update(EditorMsg::Undo, now);
        assert_eq!(read(&editor, "a"), json!(2));
    }

    #[test]
    fn numeric_segment_creates_array() {
        let (mut editor, now) = loaded(json!({}));
        set(&mut editor, "content.problems.items.0.title", json!("X"), now);
        assert_eq!(
            editor.current().unwrap().to_json(),
            json!({"content": {"problems": {"items": [{"title": "X"}]}}})
        );
    }

    #[test]
    fn rejected_write_leaves_tree_alone() {
        let (mut editor, now) = loaded(json!({"items": [1, 2]}));
        let effects = set(&mut editor, "items.name", json!("x"), now);
        assert!(effects.is_empty());
        assert_eq!(read(&editor, "items"), json!([1, 2]));
        assert_eq!(editor.sync_state(), SyncState::Clean);
        assert_eq!(editor.status().unwrap().kind, StatusKind::Error);
    }

    #[test]
    fn oversized_index_is_refused_without_losing_edits() {
        let (mut editor, now) = loaded(json!({"items": ["a"]}));
        set(&mut editor, "items.0", json!("b"), now);
        let effects = set(&mut editor, "items.99999999999", json!("x"), now);
        assert!(effects.is_empty());
        assert_eq!(read(&editor, "items"), json!(["b"]));
        assert!(editor.is_dirty());
        assert_eq!(editor.status().unwrap().kind, StatusKind::Error);
    }

    #[test]
    fn every_mutation_renders_the_new_tree() {
        let (mut editor, now) = loaded(json!({"a": 1}));
        let effects = set(&mut editor, "a", json!(2), now);
        assert_eq!(effects, vec![Effect::Render(Value::from(json!({"a": 2})))]);
        let effects = editor.update(EditorMsg::Undo, now);
        assert_eq!(effects, vec![Effect::Render(Value::from(json!({"a": 1})))]);
    }

    #[test]
    fn autosave_fires_after_idle_delay() {
        let (mut editor, t0) = loaded(json!({"a": 1}));
        set(&mut editor, "a", json!(2), t0);
        set(&mut editor, "a", json!(3), t0 + 3 * SEC);
        assert!(editor.update(EditorMsg::Tick, t0 + 5 * SEC).is_empty());
        assert_eq!(editor.autosave_remaining(t0 + 5 * SEC), Some(3 * SEC));

        let effects = editor.update(EditorMsg::Tick, t0 + 8 * SEC);
        assert_eq!(
            effects,
            vec![Effect::Save {
                theme_id: "t1".into(),
                params: Value::from(json!({"a": 3})),
                revision: 2,
            }]
        );
        assert!(editor.is_saving());
        assert!(editor.update(EditorMsg::Tick, t0 + 20 * SEC).is_empty());
    }

    #[test]
    fn undo_and_redo_schedule_autosave() {
        let (mut editor, t0) = loaded(json!({"a": 1}));
        set(&mut editor, "a", json!(2), t0);
        editor.update(EditorMsg::SaveRequested, t0);
        editor.update(EditorMsg::Saved { revision: 1, result: Ok(()) }, t0);
        assert_eq!(editor.autosave_deadline(), None);

        editor.update(EditorMsg::Undo, t0 + SEC);
        assert!(editor.is_dirty());
        assert_eq!(editor.autosave_deadline(), Some(t0 + 6 * SEC));
    }

    #[test]
    fn save_shortcut_cancels_timer_and_saves_now() {
        let (mut editor, t0) = loaded(json!({"a": 1}));
        set(&mut editor, "a", json!(2), t0);
        assert!(editor.update(EditorMsg::Key(KeyInput::plain('s')), t0).is_empty());

        let effects = editor.update(EditorMsg::Key(KeyInput::meta('s')), t0 + SEC);
        assert_eq!(save_revision(&effects), Some(1));
        assert_eq!(editor.autosave_deadline(), None);
        assert!(editor.update(EditorMsg::Tick, t0 + 10 * SEC).is_empty());
        assert!(KeyInput::ctrl('S').is_save_shortcut());
    }

    #[test]
    fn successful_save_marks_clean_and_shows_transient_message() {
        let (mut editor, t0) = loaded(json!({"a": 1}));
        set(&mut editor, "a", json!(2), t0);
        let effects = editor.update(EditorMsg::SaveRequested, t0);
        let revision = save_revision(&effects).unwrap();
        editor.update(EditorMsg::Saved { revision, result: Ok(()) }, t0 + SEC);

        assert_eq!(editor.sync_state(), SyncState::Clean);
        assert_eq!(editor.last_saved_revision(), Some(revision));
        let status = editor.status().unwrap();
        assert_eq!(status.kind, StatusKind::Success);
        assert_eq!(status.expires_at(), Some(t0 + 4 * SEC));

        editor.update(EditorMsg::Tick, t0 + 3 * SEC);
        assert!(editor.status().is_some());
        editor.update(EditorMsg::Tick, t0 + 4 * SEC);
        assert!(editor.status().is_none());
    }

    #[test]
    fn edits_during_save_keep_editor_dirty() {
        let (mut editor, t0) = loaded(json!({"a": 1}));
        set(&mut editor, "a", json!(2), t0);
        let revision = save_revision(&editor.update(EditorMsg::SaveRequested, t0)).unwrap();
        set(&mut editor, "a", json!(3), t0);
        editor.update(EditorMsg::Saved { revision, result: Ok(()) }, t0);
        assert_eq!(editor.sync_state(), SyncState::Dirty);
        assert!(editor.autosave_deadline().is_some());
    }

    #[test]
    fn second_save_waits_for_the_first() {
        let (mut editor, t0) = loaded(json!({"a": 1}));
        set(&mut editor, "a", json!(2), t0);
        let first = save_revision(&editor.update(EditorMsg::SaveRequested, t0)).unwrap();

        set(&mut editor, "a", json!(3), t0);
        assert!(editor.update(EditorMsg::SaveRequested, t0).is_empty());
        assert!(editor.update(EditorMsg::SaveRequested, t0).is_empty());

        let effects = editor.update(EditorMsg::Saved { revision: first, result: Ok(()) }, t0);
        assert_eq!(
            effects,
            vec![Effect::Save {
                theme_id: "t1".into(),
                params: Value::from(json!({"a": 3})),
                revision: 2,
            }]
        );
        let effects = editor.update(EditorMsg::Saved { revision: 2, result: Ok(()) }, t0);
        assert!(effects.is_empty());
        assert_eq!(editor.sync_state(), SyncState::Clean);
    }

    #[test]
    fn failed_save_stays_dirty_and_retries() {
        let (mut editor, t0) = loaded(json!({"a": 1}));
        set(&mut editor, "a", json!(2), t0);
        let revision = save_revision(&editor.update(EditorMsg::Tick, t0 + 5 * SEC)).unwrap();

        let failure = Err(StoreError::Transport("connection refused".into()));
        editor.update(EditorMsg::Saved { revision, result: failure }, t0 + 6 * SEC);
        assert_eq!(editor.sync_state(), SyncState::Dirty);
        let status = editor.status().unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert!(status.text.contains("connection refused"));
        assert_eq!(status.expires_at(), None);

        let retry = editor.update(EditorMsg::Tick, t0 + 11 * SEC);
        assert_eq!(save_revision(&retry), Some(revision));
    }

    #[test]
    fn disabling_autosave_cancels_pending_save() {
        let (mut editor, t0) = loaded(json!({"a": 1}));
        set(&mut editor, "a", json!(2), t0);
        editor.update(EditorMsg::SetAutoSave(false), t0);
        set(&mut editor, "a", json!(3), t0);
        assert!(editor.update(EditorMsg::Tick, t0 + 60 * SEC).is_empty());

        editor.update(EditorMsg::SetAutoSave(true), t0 + 60 * SEC);
        assert_eq!(save_revision(&editor.update(EditorMsg::Tick, t0 + 65 * SEC)), Some(2));
    }

    #[test]
    fn shutdown_cancels_autosave() {
        let (mut editor, t0) = loaded(json!({"a": 1}));
        set(&mut editor, "a", json!(2), t0);
        editor.update(EditorMsg::Shutdown, t0 + SEC);
        assert!(editor.is_closed());
        assert!(editor.update(EditorMsg::Tick, t0 + 30 * SEC).is_empty());
        assert!(editor.update(EditorMsg::SaveRequested, t0 + 30 * SEC).is_empty());
        assert_eq!(editor.current(), None);
    }

    #[test]
    fn shutdown_drops_queued_save() {
        let (mut editor, t0) = loaded(json!({"a": 1}));
        set(&mut editor, "a", json!(2), t0);
        editor.update(EditorMsg::SaveRequested, t0);
        set(&mut editor, "a", json!(3), t0);
        editor.update(EditorMsg::SaveRequested, t0);
        editor.update(EditorMsg::Shutdown, t0);
        let effects = editor.update(EditorMsg::Saved { revision: 1, result: Ok(()) }, t0);
        assert!(effects.is_empty());
    }

    #[test]
    fn generated_page_is_merged_as_one_undo_step() {
        let (mut editor, t0) = loaded(json!({
            "content": {"products": {"items": [{"id": "p1", "name": "Coffee"}]}}
        }));
        let effects = editor.update(
            EditorMsg::GenerateProductPage { product_id: "p1".into() },
            t0,
        );
        let [Effect::Generate { product, .. }] = effects.as_slice() else {
            panic!("expected one generate effect, got {effects:?}");
        };
        assert_eq!(product.to_json(), json!({"id": "p1", "name": "Coffee"}));
        assert!(editor.is_generating());

        // The user keeps editing while generation runs.
        set(&mut editor, "content.hero.title", json!("Hi"), t0);

        let page = Value::from(json!({"hero": {"title": "Coffee page"}}));
        let effects = editor.update(
            EditorMsg::Generated { product_id: "p1".into(), result: Ok(page) },
            t0,
        );
        assert!(matches!(effects.as_slice(), [Effect::Render(_)]));
        assert!(!editor.is_generating());
        assert_eq!(read(&editor, "content.hero.title"), json!("Hi"));
        assert_eq!(
            read(&editor, "content.productPages.p1"),
            json!({"hero": {"title": "Coffee page"}, "enabled": true, "showPreview": true})
        );
        assert_eq!(editor.status().unwrap().kind, StatusKind::Success);

        editor.update(EditorMsg::Undo, t0);
        assert!(editor.current().unwrap().get(&path("content.productPages.p1")).is_none());
        assert_eq!(read(&editor, "content.hero.title"), json!("Hi"));
    }

    #[test]
    fn numeric_product_page_edits_keep_pages_a_map() {
        let (mut editor, t0) = loaded(json!({
            "content": {"products": {"items": [{"id": 7, "name": "Tea"}]}}
        }));
        set(&mut editor, "content.productPages.7.enabled", json!(false), t0);
        assert_eq!(
            read(&editor, "content.productPages"),
            json!({"7": {"enabled": false}})
        );

        editor.update(EditorMsg::GenerateProductPage { product_id: "7".into() }, t0);
        let page = Value::from(json!({"hero": {"title": "Tea page"}}));
        let effects = editor.update(
            EditorMsg::Generated { product_id: "7".into(), result: Ok(page) },
            t0,
        );
        assert!(matches!(effects.as_slice(), [Effect::Render(_)]));
        assert_eq!(
            read(&editor, "content.productPages.7"),
            json!({"hero": {"title": "Tea page"}, "enabled": false, "showPreview": true})
        );
    }

    #[test]
    fn generation_requires_a_known_product() {
        let (mut editor, t0) = loaded(json!({}));
        let effects = editor.update(
            EditorMsg::GenerateProductPage { product_id: "p9".into() },
            t0,
        );
        assert!(effects.is_empty());
        assert!(editor.status().unwrap().text.contains("p9"));
    }

    #[test]
    fn failed_generation_leaves_tree() {
        let (mut editor, t0) = loaded(json!({"content": {"products": {"items": [{"id": "p1"}]}}}));
        editor.update(EditorMsg::GenerateProductPage { product_id: "p1".into() }, t0);
        let effects = editor.update(
            EditorMsg::Generated {
                product_id: "p1".into(),
                result: Err(StoreError::Rejected("quota exceeded".into())),
            },
            t0,
        );
        assert!(effects.is_empty());
        assert!(!editor.can_undo());
        assert!(editor.status().unwrap().text.contains("quota exceeded"));
    }

    #[test]
    fn bulk_replace_is_undoable() {
        let (mut editor, t0) = loaded(json!({"a": 1}));
        editor.update(EditorMsg::BulkReplace(Value::from(json!({"b": 2}))), t0);
        assert_eq!(editor.current().unwrap().to_json(), json!({"b": 2}));
        editor.update(EditorMsg::Undo, t0);
        assert_eq!(editor.current().unwrap().to_json(), json!({"a": 1}));
    }
}
