#![forbid(unsafe_code)]

//! pagesmith: a line-oriented landing page theme editor.
//!
//! Reads commands from stdin, edits the theme through an
//! [`EditorController`], and auto-saves after a period of inactivity.

mod cli;
mod command;

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use pagesmith_core::{Value, default_theme_params};
use pagesmith_runtime::preview::outline;
use pagesmith_runtime::{
    ContentGenerator, EditorConfig, EditorController, EditorMsg, EditorRunner, FileStore,
    HttpGenerator, HttpStore, LoadState, MemoryStore, NoPreview, OutlinePreview, PreviewRenderer,
    StaticGenerator, StatusKind, ThemeRecord, ThemeStore,
};
use tracing_subscriber::EnvFilter;

use crate::cli::{Backend, HELP_TEXT, Invocation, Opts, VERSION};
use crate::command::{Command, parse_command};

/// How often the editor clock advances while waiting for input.
const TICK: Duration = Duration::from_millis(100);
/// Upper bound on waiting for a load or the final saves.
const IO_WAIT: Duration = Duration::from_secs(30);

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let opts = match cli::parse_args(&args, |key| std::env::var(key).ok()) {
        Ok(Invocation::Run(opts)) => opts,
        Ok(Invocation::Help) => {
            println!("{HELP_TEXT}");
            return ExitCode::SUCCESS;
        }
        Ok(Invocation::Version) => {
            println!("pagesmith {VERSION}");
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("{message}");
            eprintln!("Run with --help for usage information.");
            return ExitCode::from(2);
        }
    };

    init_logging();

    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("PAGESMITH_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn editor_config(opts: &Opts) -> EditorConfig {
    let mut config = EditorConfig::from_env();
    if let Some(ms) = opts.autosave_ms {
        config = config.with_autosave_delay(Duration::from_millis(ms));
    }
    if let Some(enabled) = opts.autosave {
        config = config.with_autosave(enabled);
    }
    if let Some(n) = opts.max_history {
        config = config.with_max_history(n);
    }
    config
}

fn collaborators(opts: &Opts) -> (Arc<dyn ThemeStore>, Arc<dyn ContentGenerator>) {
    let offline: Arc<dyn ContentGenerator> = Arc::new(StaticGenerator::echo());
    match &opts.backend {
        Backend::Api(url) => {
            let store: Arc<dyn ThemeStore> = Arc::new(HttpStore::new(url.clone()));
            let generator: Arc<dyn ContentGenerator> = Arc::new(HttpGenerator::new(url.clone()));
            (store, generator)
        }
        Backend::Files(dir) => {
            let store: Arc<dyn ThemeStore> = Arc::new(FileStore::new(dir));
            (store, offline)
        }
        Backend::Memory => {
            let record = ThemeRecord::new(opts.theme_id.clone(), default_theme_params())
                .with_name("Untitled theme");
            let store: Arc<dyn ThemeStore> = Arc::new(MemoryStore::new().with_theme(record));
            (store, offline)
        }
    }
}

fn run(opts: &Opts) -> Result<(), String> {
    let (store, generator) = collaborators(opts);
    tracing::info!(store = store.name(), generator = generator.name(), theme_id = %opts.theme_id, "starting editor");

    let preview: Box<dyn PreviewRenderer> = if opts.preview {
        Box::new(OutlinePreview::new(io::stdout()))
    } else {
        Box::new(NoPreview)
    };
    let controller = EditorController::new(opts.theme_id.clone(), editor_config(opts));
    let mut runner = EditorRunner::new(controller, store, preview).with_generator(generator);

    runner.dispatch(EditorMsg::Load);
    if !runner.wait_idle(IO_WAIT) {
        return Err("timed out loading theme".into());
    }
    if let LoadState::Failed(reason) = runner.controller().load_state() {
        return Err(reason.clone());
    }
    let controller = runner.controller();
    println!(
        "editing {} ({}); type `help` for commands",
        controller.theme_id(),
        controller.theme_name().unwrap_or("unnamed")
    );

    let lines = spawn_stdin_reader();
    let mut last_status = None;
    loop {
        match lines.recv_timeout(TICK) {
            Ok(line) => match parse_command(&line) {
                Ok(Some(Command::Quit { force })) => {
                    if force || !runner.controller().is_dirty() {
                        break;
                    }
                    println!("unsaved changes; `save` first or `quit!` to discard");
                }
                Ok(Some(command)) => execute(&mut runner, command),
                Ok(None) => {}
                Err(message) => println!("{message}"),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                // Stdin closed: let running saves land before leaving.
                runner.wait_idle(IO_WAIT);
                break;
            }
        }
        runner.tick();
        print_status_change(&runner, &mut last_status);
    }

    if runner.controller().is_dirty() {
        tracing::warn!("leaving with unsaved changes");
    }
    runner.shutdown();
    Ok(())
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("pagesmith-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(error) = spawned {
        tracing::error!(error = %error, "failed to spawn stdin reader");
    }
    rx
}

fn execute(runner: &mut EditorRunner, command: Command) {
    match command {
        Command::Set { path, value } => runner.dispatch(EditorMsg::FieldChanged { path, value }),
        Command::Get(path) => {
            let found = runner.controller().current().and_then(|tree| tree.get(&path));
            match found {
                Some(value) => println!("{value}"),
                None => println!("{path} is not set"),
            }
        }
        Command::Undo => {
            if !runner.controller().can_undo() {
                println!("nothing to undo");
            }
            runner.dispatch(EditorMsg::Undo);
        }
        Command::Redo => {
            if !runner.controller().can_redo() {
                println!("nothing to redo");
            }
            runner.dispatch(EditorMsg::Redo);
        }
        Command::Save => runner.dispatch(EditorMsg::SaveRequested),
        Command::Generate(product_id) => {
            runner.dispatch(EditorMsg::GenerateProductPage { product_id })
        }
        Command::AutoSave(enabled) => runner.dispatch(EditorMsg::SetAutoSave(enabled)),
        Command::Show => {
            let tree = runner.controller().current().cloned().unwrap_or(Value::Null);
            print!("{}", outline(&tree));
        }
        Command::Status => print_state(runner),
        Command::Help => println!("{HELP_TEXT}"),
        Command::Quit { .. } => {}
    }
    let _ = io::stdout().flush();
}

fn print_state(runner: &EditorRunner) {
    let controller = runner.controller();
    let history = controller.history();
    println!(
        "revision {}  {:?}  undo {}  redo {}  autosave {}{}",
        controller.revision(),
        controller.sync_state(),
        history.past_len(),
        history.future_len(),
        if controller.autosave_enabled() { "on" } else { "off" },
        if controller.is_saving() { "  (saving)" } else { "" },
    );
}

fn print_status_change(runner: &EditorRunner, last: &mut Option<String>) {
    let status = runner.controller().status();
    let text = status.map(|s| s.text.clone());
    if text == *last {
        return;
    }
    if let Some(status) = status {
        let prefix = match status.kind {
            StatusKind::Success => "ok",
            StatusKind::Info => "..",
            StatusKind::Error => "!!",
        };
        println!("{prefix} {}", status.text);
    }
    *last = text;
}
