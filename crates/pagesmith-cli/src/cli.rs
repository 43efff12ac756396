#![forbid(unsafe_code)]

//! Command-line argument parsing for the pagesmith editor.
//!
//! Parses args by hand. Environment variables with the `PAGESMITH_` prefix
//! supply defaults; explicit flags win.

use std::path::PathBuf;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const HELP_TEXT: &str = "\
pagesmith - edit landing page themes from the terminal

USAGE:
    pagesmith [OPTIONS] <THEME_ID>

OPTIONS:
    --store=DIR          Keep themes as JSON files in DIR (default: ./themes)
    --api=URL            Load and save through the editor API at URL
    --memory             Edit a fresh default theme in memory
    --autosave-ms=N      Auto-save after N idle milliseconds (default: 5000)
    --no-autosave        Only save on request
    --max-history=N      Cap undo depth (default: unlimited)
    --preview            Print an outline of the theme after every change
    --help, -h           Show this help message
    --version, -V        Show version

COMMANDS (stdin):
    set <path> <json>    Write a value, e.g. set colors.primary \"#222\"
    get <path>           Print a value
    undo / redo          Step through history
    save                 Save now
    generate <product>   Generate a product page with AI
    autosave on|off      Toggle auto-save
    show / status        Print the outline / editor state
    quit                 Leave (refuses while unsaved; quit! forces)

ENVIRONMENT VARIABLES:
    PAGESMITH_STORE          Override --store
    PAGESMITH_API            Override --api
    PAGESMITH_AUTOSAVE_MS    Auto-save delay in milliseconds
    PAGESMITH_AUTOSAVE       0 disables auto-save
    PAGESMITH_MAX_HISTORY    Undo depth cap
    PAGESMITH_LOG            Log filter (falls back to RUST_LOG, default warn)";

/// Where themes are loaded from and saved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Files(PathBuf),
    Api(String),
    Memory,
}

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opts {
    pub theme_id: String,
    pub backend: Backend,
    /// Auto-save delay override in milliseconds.
    pub autosave_ms: Option<u64>,
    /// Auto-save on/off override.
    pub autosave: Option<bool>,
    pub max_history: Option<usize>,
    pub preview: bool,
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Run(Opts),
    Help,
    Version,
}

/// Parse `args` (without the program name), reading defaults through `env`.
pub fn parse_args(
    args: &[String],
    env: impl Fn(&str) -> Option<String>,
) -> Result<Invocation, String> {
    let mut backend = match (env("PAGESMITH_API"), env("PAGESMITH_STORE")) {
        (Some(url), _) if !url.is_empty() => Backend::Api(url),
        (_, Some(dir)) if !dir.is_empty() => Backend::Files(PathBuf::from(dir)),
        _ => Backend::Files(PathBuf::from("themes")),
    };
    let mut theme_id = None;
    let mut autosave_ms = None;
    let mut autosave = None;
    let mut max_history = None;
    let mut preview = false;

    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => return Ok(Invocation::Help),
            "--version" | "-V" => return Ok(Invocation::Version),
            "--memory" => backend = Backend::Memory,
            "--no-autosave" => autosave = Some(false),
            "--preview" => preview = true,
            other => {
                if let Some(val) = other.strip_prefix("--store=") {
                    backend = Backend::Files(PathBuf::from(val));
                } else if let Some(val) = other.strip_prefix("--api=") {
                    backend = Backend::Api(val.to_string());
                } else if let Some(val) = other.strip_prefix("--autosave-ms=") {
                    let ms = val
                        .parse()
                        .map_err(|_| format!("Invalid --autosave-ms value: {val}"))?;
                    autosave_ms = Some(ms);
                } else if let Some(val) = other.strip_prefix("--max-history=") {
                    let n = val
                        .parse()
                        .map_err(|_| format!("Invalid --max-history value: {val}"))?;
                    max_history = Some(n);
                } else if other.starts_with('-') {
                    return Err(format!("Unknown argument: {other}"));
                } else if theme_id.is_none() {
                    theme_id = Some(other.to_string());
                } else {
                    return Err(format!("Unexpected argument: {other}"));
                }
            }
        }
    }

    let theme_id = theme_id.ok_or_else(|| "Missing <THEME_ID>".to_string())?;
    Ok(Invocation::Run(Opts {
        theme_id,
        backend,
        autosave_ms,
        autosave,
        max_history,
        preview,
    }))
}
