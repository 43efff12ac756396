#![forbid(unsafe_code)]

//! Linear undo/redo over whole-tree snapshots.
//!
//! [`History`] keeps the live value (`current`), the snapshots before it
//! (`past`, oldest first) and the snapshots undone from it (`future`,
//! nearest first). Snapshots of a [`Value`](pagesmith_core::Value) tree share
//! all unchanged storage, so keeping whole trees is cheap.
//!
//! # Invariants
//!
//! 1. **Linear timeline**: `past ++ [current] ++ future` is the edit timeline;
//!    `redo` replays exactly what `undo` removed.
//! 2. **Branch discard**: `update` clears `future`. There is no redo after a
//!    new edit.
//! 3. **Total**: `undo`/`redo` at a boundary are no-ops, never errors.
//! 4. **Bounded on request**: `past` never holds more than `max_history`
//!    snapshots; the oldest is dropped first. The default keeps every step,
//!    so `n` updates can always be undone `n` times.

use std::collections::VecDeque;

/// Configuration for [`History`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of undo steps kept. `usize::MAX` means no limit.
    pub max_history: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl HistoryConfig {
    /// No limit on undo depth.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            max_history: usize::MAX,
        }
    }

    /// Set the maximum undo depth.
    #[must_use]
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }
}

/// Undo/redo container over snapshots of `T`.
#[derive(Debug, Clone)]
pub struct History<T> {
    current: Option<T>,
    past: VecDeque<T>,
    future: VecDeque<T>,
    config: HistoryConfig,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl<T> History<T> {
    /// An empty history with no current value.
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            current: None,
            past: VecDeque::new(),
            future: VecDeque::new(),
            config,
        }
    }

    /// Replace everything with `value`. Not undoable.
    pub fn initialize(&mut self, value: T) {
        self.current = Some(value);
        self.past.clear();
        self.future.clear();
    }

    /// Record a new current value; the previous one becomes undoable.
    pub fn update(&mut self, value: T) {
        if let Some(previous) = self.current.replace(value) {
            self.past.push_back(previous);
            self.enforce_depth();
        }
        self.future.clear();
    }

    /// Step back one snapshot. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.past.pop_back() else {
            return false;
        };
        if let Some(current) = self.current.replace(previous) {
            self.future.push_front(current);
        }
        true
    }

    /// Step forward one snapshot. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.future.pop_front() else {
            return false;
        };
        if let Some(current) = self.current.replace(next) {
            self.past.push_back(current);
            self.enforce_depth();
        }
        true
    }

    /// Drop all snapshots, including the current one.
    pub fn clear(&mut self) {
        self.current = None;
        self.past.clear();
        self.future.clear();
    }

    #[must_use]
    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    #[must_use]
    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    #[must_use]
    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    #[must_use]
    pub fn config(&self) -> HistoryConfig {
        self.config
    }

    fn enforce_depth(&mut self) {
        while self.past.len() > self.config.max_history {
            self.past.pop_front();
        }
    }
}
