#![forbid(unsafe_code)]

//! Runtime: undo/redo history, debounced auto-save, the editor controller,
//! and the collaborators it talks to.
//!
//! # Role in pagesmith
//! `pagesmith-runtime` turns the pure tree operations of `pagesmith-core`
//! into an editing session. The [`EditorController`] is a synchronous state
//! machine; the [`EditorRunner`] executes its effects against a
//! [`ThemeStore`], a [`ContentGenerator`] and a [`PreviewRenderer`].
//!
//! # Key Components
//!
//! - [`History`] - Linear undo/redo over whole-tree snapshots
//! - [`AutoSaveTimer`] - Re-armable idle deadline
//! - [`EditorController`] - Messages in, effects out
//! - [`EditorRunner`] - Executes effects on worker threads
//! - [`store`] - Memory, file and HTTP theme stores
//! - [`generator`] - AI product page generation
//! - [`preview`] - Preview renderers
//!
//! # Feature Flags
//!
//! - `http`: [`store::HttpStore`] and [`generator::HttpGenerator`] over `ureq`.

pub mod autosave;
pub mod config;
pub mod controller;
pub mod generator;
pub mod history;
pub mod preview;
pub mod runner;
pub mod store;

pub use autosave::{AutoSaveTimer, DEFAULT_AUTOSAVE_DELAY};
pub use config::EditorConfig;
pub use controller::{
    Effect, EditorController, EditorMsg, KeyInput, LoadState, StatusKind, StatusMessage,
    SyncState,
};
pub use generator::{ContentGenerator, StaticGenerator};
pub use history::{History, HistoryConfig};
pub use preview::{NoPreview, OutlinePreview, PreviewRenderer};
pub use runner::EditorRunner;
pub use store::{FileStore, MemoryStore, StoreError, StoreResult, ThemeRecord, ThemeStore};

#[cfg(feature = "http")]
pub use generator::HttpGenerator;
#[cfg(feature = "http")]
pub use store::HttpStore;
