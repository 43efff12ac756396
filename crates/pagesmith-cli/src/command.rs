#![forbid(unsafe_code)]

//! Editor commands typed on stdin.

use pagesmith_core::{ParamPath, Value};
use pagesmith_runtime::config::parse_flag;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set { path: ParamPath, value: Value },
    Get(ParamPath),
    Undo,
    Redo,
    Save,
    Generate(String),
    AutoSave(bool),
    Show,
    Status,
    Help,
    Quit { force: bool },
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "set" => {
            let (raw_path, raw_value) = rest
                .split_once(char::is_whitespace)
                .ok_or("usage: set <path> <json>")?;
            Command::Set {
                path: parse_path(raw_path)?,
                value: parse_value(raw_value.trim()),
            }
        }
        "get" => Command::Get(parse_path(rest)?),
        "undo" => Command::Undo,
        "redo" => Command::Redo,
        "save" => Command::Save,
        "generate" if !rest.is_empty() => Command::Generate(rest.to_string()),
        "generate" => return Err("usage: generate <product-id>".into()),
        "autosave" => {
            Command::AutoSave(parse_flag(rest).ok_or("usage: autosave on|off")?)
        }
        "show" => Command::Show,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit { force: false },
        "quit!" | "exit!" => Command::Quit { force: true },
        other => return Err(format!("unknown command: {other} (try `help`)")),
    };
    Ok(Some(command))
}

fn parse_path(raw: &str) -> Result<ParamPath, String> {
    ParamPath::parse_dotted(raw).map_err(|e| format!("bad path {raw:?}: {e}"))
}

/// JSON when it parses, otherwise the raw text as a string.
fn parse_value(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => Value::from(json),
        Err(_) => Value::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_accepts_json_and_bare_text() {
        let Ok(Some(Command::Set { path, value })) = parse_command("set colors.primary \"#222\"")
        else {
            panic!("expected set");
        };
        assert_eq!(path.to_string(), "colors.primary");
        assert_eq!(value, Value::from("#222"));

        let Ok(Some(Command::Set { value, .. })) = parse_command("set hero.title Fresh Coffee")
        else {
            panic!("expected set");
        };
        assert_eq!(value, Value::from("Fresh Coffee"));

        let Ok(Some(Command::Set { value, .. })) =
            parse_command("set content.problems.items [{\"t\": 1}]")
        else {
            panic!("expected set");
        };
        assert_eq!(value.to_json(), json!([{"t": 1}]));
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse_command("undo"), Ok(Some(Command::Undo)));
        assert_eq!(parse_command("  redo "), Ok(Some(Command::Redo)));
        assert_eq!(parse_command("autosave off"), Ok(Some(Command::AutoSave(false))));
        assert_eq!(parse_command("generate p1"), Ok(Some(Command::Generate("p1".into()))));
        assert_eq!(parse_command("quit!"), Ok(Some(Command::Quit { force: true })));
        assert_eq!(parse_command(""), Ok(None));
        assert_eq!(parse_command("# note"), Ok(None));
    }

    #[test]
    fn errors_are_reported() {
        assert!(parse_command("set colors.primary").is_err());
        assert!(parse_command("get a..b").is_err());
        assert!(parse_command("autosave maybe").is_err());
        assert!(parse_command("generate").is_err());
        assert!(parse_command("frobnicate").is_err());
    }
}
