//! Ghostline entrypoint: a line-oriented driver around the suggestion
//! engine.
//!
//! The binary wires the engine to a headless surface and drives it from
//! stdin, which makes the full pipeline (debounce, fetch, ghost rendering,
//! accept, persistence) observable without a GUI frontend. Protocol, one
//! command per line:
//!
//! ```text
//! <text>                 replace the document with <text> (\n escapes expand)
//! :edit <text>           same, explicit form
//! :cursor <line> <col>   move the cursor (1-based)
//! :accept                commit the currently displayed suggestion
//! :lang <id>             switch language (javascript, typescript, python, rust, go)
//! :reset                 restore the language's default template
//! :show                  print the current document
//! :quit                  exit
//! ```
//!
//! Ghost annotation changes are echoed to stdout as they happen.

use anyhow::Result;
use clap::Parser;
use core_config::Config;
use core_events::{
    AsyncEventSource, CommandEvent, EVENT_CHANNEL_CAP, Event, EventSourceRegistry, InputEvent,
};
use core_model::{EditorModel, SuggestPolicy};
use core_storage::FsStore;
use core_suggest::HttpSuggestClient;
use core_surface::{EditorSurface, HeadlessSurface};
use core_text::{LanguageId, Position};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Once;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "ghostline", version, about = "Inline code-suggestion engine")]
struct Args {
    /// Optional configuration file path (overrides discovery of `ghostline.toml`).
    #[arg(long = "config")]
    config: Option<PathBuf>,
    /// Override the suggestion endpoint from the config file.
    #[arg(long = "endpoint")]
    endpoint: Option<String>,
    /// Override the storage directory from the config file.
    #[arg(long = "storage-dir")]
    storage_dir: Option<PathBuf>,
    /// Start with this language instead of the persisted one.
    #[arg(long = "language")]
    language: Option<LanguageId>,
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = std::path::Path::new(".");
        let file_appender = tracing_appender::rolling::never(log_dir, "ghostline.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init()
        {
            Ok(_) => {
                self.log_guard = Some(guard);
            }
            Err(_err) => {
                // Global tracing subscriber already installed; drop guard so
                // the writer shuts down.
            }
        }
        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

/// Expand the driver's `\n` escape so single-line input can carry
/// multi-line documents.
fn unescape(text: &str) -> String {
    text.replace("\\n", "\n")
}

fn edit_event(text: &str) -> Event {
    let text = unescape(text);
    let cursor = core_text::end_position(&text);
    Event::Input(InputEvent::Edit { text, cursor })
}

/// Parse one driver line into a loop event. `None` means the line was
/// malformed (caller logs it) or intentionally blank.
fn parse_line(line: &str) -> Option<Event> {
    let line = line.trim_end_matches(['\r']);
    if line.trim().is_empty() {
        return None;
    }
    if !line.starts_with(':') {
        return Some(edit_event(line));
    }
    let mut parts = line.splitn(2, ' ');
    let command = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default();
    match command {
        ":edit" => Some(edit_event(rest)),
        ":accept" => Some(Event::Input(InputEvent::Accept)),
        ":reset" => Some(Event::Input(InputEvent::Reset)),
        ":show" => Some(Event::Command(CommandEvent::ShowDocument)),
        ":quit" => Some(Event::Command(CommandEvent::Quit)),
        ":lang" => rest
            .trim()
            .parse::<LanguageId>()
            .ok()
            .map(|lang| Event::Input(InputEvent::SelectLanguage(lang))),
        ":cursor" => {
            let mut nums = rest.split_whitespace();
            let line_no = nums.next()?.parse::<u32>().ok()?;
            let column = nums.next()?.parse::<u32>().ok()?;
            Some(Event::Input(InputEvent::CursorMoved(Position::new(
                line_no, column,
            ))))
        }
        _ => None,
    }
}

/// Reads driver lines from stdin and feeds them into the event channel.
/// Sends `Event::Shutdown` when stdin closes.
struct StdinDriver;

impl AsyncEventSource for StdinDriver {
    fn name(&self) -> &'static str {
        "stdin_driver"
    }

    fn spawn(self: Box<Self>, tx: mpsc::Sender<Event>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(event) = parse_line(&line) else {
                            if !line.trim().is_empty() {
                                warn!(target: "driver", line = line.as_str(), "unrecognized_line");
                            }
                            continue;
                        };
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        let _ = tx.send(Event::Shutdown).await;
                        break;
                    }
                    Err(e) => {
                        error!(target: "driver", ?e, "stdin_read_failed");
                        let _ = tx.send(Event::Shutdown).await;
                        break;
                    }
                }
            }
            trace!(target: "driver", "stdin_driver_stopped");
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownReason {
    ChannelClosed,
    QuitCommand,
    ShutdownEvent,
}

impl ShutdownReason {
    fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::ChannelClosed => "channel_closed",
            ShutdownReason::QuitCommand => "quit_command",
            ShutdownReason::ShutdownEvent => "shutdown_event",
        }
    }
}

enum LoopControl {
    Continue,
    Break { reason: ShutdownReason },
}

struct SessionRuntime {
    model: EditorModel<HeadlessSurface>,
    rx: mpsc::Receiver<Event>,
    tx: Option<mpsc::Sender<Event>>,
    source_handles: Vec<JoinHandle<()>>,
    last_ghost: Option<String>,
}

impl SessionRuntime {
    fn new(
        model: EditorModel<HeadlessSurface>,
        tx: mpsc::Sender<Event>,
        rx: mpsc::Receiver<Event>,
        source_handles: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            model,
            rx,
            tx: Some(tx),
            source_handles,
            last_ghost: None,
        }
    }

    async fn run(&mut self) -> Result<()> {
        let mut shutdown_reason = ShutdownReason::ChannelClosed;
        while let Some(event) = self.rx.recv().await {
            let control = match event {
                Event::Command(cmd) => self.handle_command(&cmd),
                Event::Shutdown => LoopControl::Break {
                    reason: ShutdownReason::ShutdownEvent,
                },
                other => {
                    if let Err(e) = self.model.dispatch(other) {
                        error!(target: "runtime", ?e, "dispatch_error");
                    }
                    LoopControl::Continue
                }
            };
            match control {
                LoopControl::Break { reason } => {
                    shutdown_reason = reason;
                    break;
                }
                LoopControl::Continue => self.echo_ghost(),
            }
        }

        self.rx.close();
        self.finalize_shutdown(shutdown_reason).await;
        Ok(())
    }

    fn handle_command(&mut self, cmd: &CommandEvent) -> LoopControl {
        match cmd {
            CommandEvent::ShowDocument => {
                let surface = self.model.surface();
                println!(
                    "--- {} @ {} ---\n{}\n---",
                    self.model.language(),
                    surface.cursor(),
                    surface.text()
                );
                LoopControl::Continue
            }
            CommandEvent::Quit => LoopControl::Break {
                reason: ShutdownReason::QuitCommand,
            },
        }
    }

    /// Echo ghost annotation changes so a driver session can observe the
    /// suggestion lifecycle.
    fn echo_ghost(&mut self) {
        let ghost = self.model.surface().ghost().map(|g| g.text.clone());
        if ghost == self.last_ghost {
            return;
        }
        match &ghost {
            Some(text) => println!("ghost: {text}"),
            None => println!("ghost cleared"),
        }
        self.last_ghost = ghost;
    }

    async fn finalize_shutdown(&mut self, reason: ShutdownReason) {
        info!(target: "runtime.shutdown", reason = reason.as_str(), "begin");
        if let Some(tx) = self.tx.take() {
            drop(tx);
        }
        while let Some(handle) = self.source_handles.pop() {
            match tokio::time::timeout(Duration::from_millis(200), handle).await {
                Ok(Ok(())) => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_stopped"
                ),
                Ok(Err(err)) if err.is_cancelled() => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_cancelled"
                ),
                Ok(Err(err)) => error!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    ?err,
                    "event_source_task_error"
                ),
                Err(_) => warn!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_timeout"
                ),
            }
        }
        info!(target: "runtime.shutdown", reason = reason.as_str(), "complete");
    }
}

fn build_model(
    config: &Config,
    tx: mpsc::Sender<Event>,
    initial_language: Option<LanguageId>,
) -> Result<EditorModel<HeadlessSurface>> {
    let store = FsStore::open(config.storage_dir())?;
    let client = Arc::new(HttpSuggestClient::new(config.endpoint()));
    let mut model = EditorModel::new(
        HeadlessSurface::new(),
        Box::new(store),
        client,
        tx,
        LanguageId::Javascript,
        SuggestPolicy {
            debounce: config.debounce(),
            min_chars: config.min_chars(),
        },
    );
    model.bootstrap();
    if let Some(language) = initial_language {
        model.handle_select_language(language);
    }
    Ok(model)
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut startup = AppStartup::new();
    startup.configure_logging()?;
    AppStartup::install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let mut config = core_config::load_from(args.config.clone())?;
    if let Some(endpoint) = args.endpoint {
        config.file.suggest.endpoint = endpoint;
    }
    if let Some(dir) = args.storage_dir {
        config.file.storage.dir = Some(dir);
    }

    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let model = build_model(&config, tx.clone(), args.language)?;
    println!(
        "ghostline: {} document loaded ({} chars); type to edit, :accept to commit",
        model.language(),
        core_text::char_len(&model.surface().text())
    );

    let mut registry = EventSourceRegistry::new();
    registry.register(StdinDriver);
    let source_handles = registry.spawn_all(&tx);

    let mut runtime = SessionRuntime::new(model, tx, rx, source_handles);
    runtime.run().await
}
