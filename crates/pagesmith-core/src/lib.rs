#![forbid(unsafe_code)]

//! Core: the theme parameter tree, parameter paths, and the path-update engine.
//!
//! # Role in pagesmith
//! `pagesmith-core` holds the pure data model of the editor. Nothing here does
//! I/O or keeps time; the history, auto-save, and collaborator plumbing live
//! in `pagesmith-runtime`.
//!
//! # Key Components
//!
//! - [`Value`] - Recursive JSON-compatible tree with `Arc`-shared containers
//! - [`ParamPath`] / [`Segment`] - Root-relative location of a leaf
//! - [`update::apply`] - Copy-on-write leaf write with container inference
//! - [`merge`] - Bulk merges (defaults on load, AI product pages)
//! - [`defaults::default_theme_params`] - Parameters of a fresh theme

pub mod defaults;
pub mod merge;
pub mod path;
pub mod update;
pub mod value;

pub use defaults::default_theme_params;
pub use merge::{find_product, key_id_segments, merge_product_page, merge_with_defaults};
pub use path::{ParamPath, PathError, Segment};
pub use update::{MAX_INDEX, UpdateError, apply, apply_all};
pub use value::{Map, Value};

/// The full parameter tree of one theme.
pub type ThemeParams = Value;
