// services/emr-console/src/main.rs
//
// Terminal client for the EMR backend
//
// Run with: cargo run --bin emr-console -- --demo

use std::fs::OpenOptions;
use std::io::stdout;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use emrkit::config::{load_config, ConsoleConfig, ObservabilityConfig};
use emrkit::{ApiFactory, ApiMode, PreferenceStore, Route, ThemeContext};

mod app;
mod ui;

use app::App;

#[derive(Parser, Debug)]
#[command(name = "emr-console")]
#[command(about = "Terminal client for patient records, notes and AI insights")]
#[command(version = "0.1.0")]
struct Args {
    #[arg(short, long, default_value = "config/emr-console.yaml")]
    config: String,

    /// Run against built-in sample patients (no backend required)
    #[arg(long, short)]
    demo: bool,

    /// Backend base URL, e.g. http://127.0.0.1:5000/api
    #[arg(long)]
    api_url: Option<String>,

    /// Page to open first: /, /create-patient or /patients/<id>
    #[arg(long, default_value = "/")]
    open: String,

    /// Redraw interval in milliseconds
    #[arg(long, default_value = "100")]
    tick_ms: u64,
}

fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    // The terminal belongs to the UI, so logs go to a file.
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config: ConsoleConfig = load_config(&args.config)?;
    if let Some(url) = &args.api_url {
        config.api.base_url = url.clone();
    }
    init_tracing(&config.observability)?;

    let mode = if args.demo { ApiMode::Demo } else { ApiMode::Live };
    info!("Starting emr-console ({:?}) against {}", mode, config.api.base_url);

    let api = ApiFactory::create(mode, &config.api)?;
    let preferences = config.preferences.resolve_path();
    info!("Preferences at {}", preferences.display());
    let theme = ThemeContext::init(PreferenceStore::new(preferences));

    let app = App::new(
        api,
        Route::parse(&args.open),
        config.dashboard.search_mode,
        theme,
        args.demo,
    );

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_app(&mut terminal, app, Duration::from_millis(args.tick_ms));

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    info!("emr-console stopped");
    result
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App, tick_rate: Duration) -> Result<()> {
    loop {
        app.drain_completions();
        terminal.draw(|frame| ui::draw_ui(frame, &app))?;

        // Blocking here is fine: requests run on the runtime's worker threads.
        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
