#![forbid(unsafe_code)]

//! Editor configuration.
//!
//! Defaults match the hosted editor: auto-save on, 5 s idle delay, success
//! messages visible for 3 s. Undo depth is unlimited unless capped. `from_env` applies `PAGESMITH_*`
//! overrides on top of the defaults.

use std::env;
use std::time::Duration;

use crate::autosave::DEFAULT_AUTOSAVE_DELAY;
use crate::history::HistoryConfig;

/// Controls how an [`EditorController`](crate::EditorController) behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    /// Idle time after the last edit before an automatic save.
    pub autosave_delay: Duration,
    /// Whether edits schedule automatic saves at all.
    pub autosave_enabled: bool,
    /// Undo depth.
    pub history: HistoryConfig,
    /// How long success and info messages stay visible. Errors stay until
    /// replaced.
    pub status_ttl: Duration,
    /// Overlay loaded parameters on the default theme.
    pub merge_defaults_on_load: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_delay: DEFAULT_AUTOSAVE_DELAY,
            autosave_enabled: true,
            history: HistoryConfig::default(),
            status_ttl: Duration::from_secs(3),
            merge_defaults_on_load: true,
        }
    }
}

impl EditorConfig {
    #[must_use]
    pub fn with_autosave_delay(mut self, delay: Duration) -> Self {
        self.autosave_delay = delay;
        self
    }

    #[must_use]
    pub fn with_autosave(mut self, enabled: bool) -> Self {
        self.autosave_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.history = self.history.with_max_history(max_history);
        self
    }

    #[must_use]
    pub fn with_status_ttl(mut self, ttl: Duration) -> Self {
        self.status_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_merge_defaults(mut self, merge: bool) -> Self {
        self.merge_defaults_on_load = merge;
        self
    }

    /// Defaults with overrides from the process environment.
    ///
    /// - `PAGESMITH_AUTOSAVE_MS`: auto-save delay in milliseconds
    /// - `PAGESMITH_AUTOSAVE`: `0`/`false`/`off` disables auto-save
    /// - `PAGESMITH_MAX_HISTORY`: undo depth
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides read through `lookup`. Unparseable values are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = lookup("PAGESMITH_AUTOSAVE_MS")
            && let Ok(ms) = val.trim().parse::<u64>()
        {
            self.autosave_delay = Duration::from_millis(ms);
        }
        if let Some(val) = lookup("PAGESMITH_AUTOSAVE") {
            match parse_flag(&val) {
                Some(enabled) => self.autosave_enabled = enabled,
                None => tracing::warn!(value = %val, "ignoring invalid PAGESMITH_AUTOSAVE"),
            }
        }
        if let Some(val) = lookup("PAGESMITH_MAX_HISTORY")
            && let Ok(n) = val.trim().parse::<usize>()
        {
            self.history = self.history.with_max_history(n);
        }
        self
    }
}

/// Parse an on/off switch.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.autosave_delay, Duration::from_secs(5));
        assert!(config.autosave_enabled);
        assert_eq!(config.history, HistoryConfig::unbounded());
        assert_eq!(config.status_ttl, Duration::from_secs(3));
        assert!(config.merge_defaults_on_load);
    }

    #[test]
    fn env_overrides_apply() {
        let config = EditorConfig::default().with_env_overrides(lookup(&[
            ("PAGESMITH_AUTOSAVE_MS", "250"),
            ("PAGESMITH_AUTOSAVE", "off"),
            ("PAGESMITH_MAX_HISTORY", "7"),
        ]));
        assert_eq!(config.autosave_delay, Duration::from_millis(250));
        assert!(!config.autosave_enabled);
        assert_eq!(config.history.max_history, 7);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let config = EditorConfig::default().with_env_overrides(lookup(&[
            ("PAGESMITH_AUTOSAVE_MS", "soon"),
            ("PAGESMITH_AUTOSAVE", "maybe"),
            ("PAGESMITH_MAX_HISTORY", "-1"),
        ]));
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn flags() {
        assert_eq!(parse_flag(" YES "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag(""), None);
    }
}
