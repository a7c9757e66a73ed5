pub mod config;
pub mod export;
pub mod runtime;
pub mod session;
pub mod store;
pub mod timer;
pub mod ui;
pub mod util;

use crate::{
    config::{Config, ConfigStore, FileConfigStore},
    export::{export_session, ExportFormat},
    runtime::{AppEvent, AppEventSource, CrosstermEventSource, Runner},
    session::Session,
    store::{SessionState, SessionStore},
};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};

const REDRAW_TICK_MS: u64 = 100;

/// minimal session timer with live duration, markers, and exportable reports
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Track one activity session at a time: start it, drop markers while it runs, watch the elapsed time tick, and export a report once you stop."
)]
pub struct Cli {
    /// title for sessions started from this run
    #[clap(short = 't', long)]
    title: Option<String>,

    /// free-text description attached to the session
    #[clap(short = 'd', long)]
    description: Option<String>,

    /// report format used when exporting from the summary screen
    #[clap(short = 'f', long, value_enum)]
    format: Option<ExportFormat>,

    /// directory reports are written to (default: current directory)
    #[clap(short = 'o', long)]
    export_dir: Option<PathBuf>,
}

pub struct App {
    pub store: SessionStore,
    /// Latest snapshot delivered by the store subscription; render state only
    pub snapshot: SessionState,
    pub title: String,
    pub description: String,
    pub export_format: ExportFormat,
    pub export_dir: PathBuf,
    /// Transient one-line message on the summary screen
    pub status: Option<String>,
}

impl App {
    pub fn new(cli: &Cli, config: Config, store: SessionStore) -> Self {
        Self {
            snapshot: store.snapshot(),
            store,
            title: cli.title.clone().unwrap_or(config.default_title),
            description: cli.description.clone().unwrap_or_default(),
            export_format: cli.format.unwrap_or(config.export_format),
            export_dir: cli
                .export_dir
                .clone()
                .or(config.export_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            status: None,
        }
    }

    /// Start a fresh session, or finalize and stop the running one
    fn toggle_session(&mut self) {
        let state = self.store.snapshot();
        if state.is_active {
            if let Some(mut session) = state.last_session {
                session.finalize();
                if let Err(e) = self.store.set_last_session(session) {
                    self.status = Some(e.to_string());
                    return;
                }
            }
            self.store.stop_active_session();
            self.status = None;
        } else {
            self.status = None;
            if let Err(e) = self
                .store
                .set_active_session(Session::begin(&self.title, &self.description))
            {
                self.status = Some(e.to_string());
            }
        }
    }

    /// Attach a numbered marker to the running session
    fn drop_marker(&mut self) {
        let state = self.store.snapshot();
        if !state.is_active {
            return;
        }
        if let Some(mut session) = state.last_session {
            let label = format!("Marker {}", session.markers.len() + 1);
            session.add_marker(&label);
            if let Err(e) = self.store.set_last_session(session) {
                self.status = Some(e.to_string());
            }
        }
    }

    /// Write a report for the last session; only offered while idle
    fn export_last(&mut self) {
        let state = self.store.snapshot();
        if state.is_active {
            return;
        }
        let Some(session) = state.last_session else {
            return;
        };
        self.status = match export_session(&session, &self.export_dir, self.export_format) {
            Ok(path) => Some(format!("exported {}", path.display())),
            Err(e) => Some(e.to_string()),
        };
    }

    fn clear(&mut self) {
        self.store.reset();
        self.status = None;
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config = FileConfigStore::new().load();

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let store = SessionStore::new();
    let (events, tx) = CrosstermEventSource::new();
    let subscription = store.subscribe(move |snapshot| {
        let _ = tx.send(AppEvent::State(snapshot));
    });

    let mut app = App::new(&cli, config, store.clone());
    let runner = Runner::new(events, Duration::from_millis(REDRAW_TICK_MS));
    let result = run_app(&mut terminal, &mut app, &runner);

    store.unsubscribe(subscription);
    store.stop_session_timer();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: Backend, E: AppEventSource>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui(app, f))?;

    loop {
        match runner.step() {
            AppEvent::State(snapshot) => {
                app.snapshot = snapshot;
                terminal.draw(|f| ui(app, f))?;
            }
            AppEvent::Resize | AppEvent::Tick => {
                terminal.draw(|f| ui(app, f))?;
            }
            AppEvent::Key(key) => {
                if handle_key(app, key) {
                    return Ok(());
                }
                terminal.draw(|f| ui(app, f))?;
            }
        }
    }
}

/// Returns true when the app should quit
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Char('q') => return true,
        KeyCode::Char(' ') | KeyCode::Char('s') => app.toggle_session(),
        KeyCode::Char('m') => app.drop_marker(),
        KeyCode::Char('e') => app.export_last(),
        KeyCode::Char('r') => app.clear(),
        _ => {}
    }
    false
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    fn test_app(cli: Cli) -> App {
        let store = SessionStore::with_tick_interval(Duration::from_millis(10));
        App::new(&cli, Config::default(), store)
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["takt"]);

        assert_eq!(cli.title, None);
        assert_eq!(cli.description, None);
        assert_eq!(cli.format, None);
        assert_eq!(cli.export_dir, None);
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from([
            "takt",
            "-t",
            "focus",
            "-d",
            "deep work",
            "-f",
            "csv",
            "-o",
            "/tmp/reports",
        ]);

        assert_eq!(cli.title.as_deref(), Some("focus"));
        assert_eq!(cli.description.as_deref(), Some("deep work"));
        assert_eq!(cli.format, Some(ExportFormat::Csv));
        assert_eq!(cli.export_dir, Some(PathBuf::from("/tmp/reports")));
    }

    #[test]
    fn cli_overrides_config_defaults() {
        let cli = Cli::parse_from(["takt", "-t", "focus", "-f", "json"]);
        let app = test_app(cli);

        assert_eq!(app.title, "focus");
        assert_eq!(app.export_format, ExportFormat::Json);
        assert_eq!(app.export_dir, PathBuf::from("."));
    }

    #[test]
    fn config_fills_in_missing_cli_values() {
        let cli = Cli::parse_from(["takt"]);
        let app = test_app(cli);

        assert_eq!(app.title, Config::default().default_title);
        assert_eq!(app.export_format, ExportFormat::Markdown);
    }

    #[test]
    fn toggle_starts_then_stops_a_session() {
        let cli = Cli::parse_from(["takt", "-t", "focus"]);
        let mut app = test_app(cli);

        app.toggle_session();
        let running = app.store.snapshot();
        assert!(running.is_active);
        let session = running.last_session.unwrap();
        assert_eq!(session.title, "focus");
        assert!(!session.is_finalized());

        app.toggle_session();
        let stopped = app.store.snapshot();
        assert!(!stopped.is_active);
        assert!(stopped.last_session.unwrap().is_finalized());
    }

    #[test]
    fn markers_are_numbered_in_order() {
        let cli = Cli::parse_from(["takt"]);
        let mut app = test_app(cli);

        app.toggle_session();
        app.drop_marker();
        app.drop_marker();
        app.store.stop_session_timer();

        let session = app.store.snapshot().last_session.unwrap();
        let labels: Vec<&str> = session.markers.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["Marker 1", "Marker 2"]);
    }

    #[test]
    fn markers_are_ignored_while_idle() {
        let cli = Cli::parse_from(["takt"]);
        let mut app = test_app(cli);

        app.drop_marker();
        assert_eq!(app.store.snapshot().last_session, None);
    }

    #[test]
    fn export_writes_into_the_configured_directory() {
        let dir = tempdir().unwrap();
        let cli = Cli::parse_from(["takt", "-o", dir.path().to_str().unwrap()]);
        let mut app = test_app(cli);

        app.toggle_session();
        app.drop_marker();
        app.toggle_session();
        app.export_last();

        let status = app.status.clone().unwrap();
        assert!(status.starts_with("exported "), "unexpected: {}", status);
        let written: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(written.len(), 1);
    }

    #[test]
    fn export_is_refused_while_running() {
        let dir = tempdir().unwrap();
        let cli = Cli::parse_from(["takt", "-o", dir.path().to_str().unwrap()]);
        let mut app = test_app(cli);

        app.toggle_session();
        app.export_last();
        app.store.stop_session_timer();

        assert_eq!(app.status, None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn clear_returns_to_the_welcome_state() {
        let cli = Cli::parse_from(["takt"]);
        let mut app = test_app(cli);

        app.toggle_session();
        app.clear();

        assert_eq!(app.store.snapshot(), SessionState::default());
        assert_eq!(app.status, None);
    }

    #[test]
    fn quit_keys_are_recognized() {
        let cli = Cli::parse_from(["takt"]);
        let mut app = test_app(cli);

        let esc = KeyEvent::from(KeyCode::Esc);
        assert!(handle_key(&mut app, esc));

        let q = KeyEvent::from(KeyCode::Char('q'));
        assert!(handle_key(&mut app, q));

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(handle_key(&mut app, ctrl_c));

        let other = KeyEvent::from(KeyCode::Char('x'));
        assert!(!handle_key(&mut app, other));
    }
}
