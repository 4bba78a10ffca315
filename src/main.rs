//! quaketui - Live earthquake dashboard for your terminal.
//!
//! Polls a USGS summary feed every five minutes and shows banner alerts, a
//! world map of every event and a sortable list of the minor ones.

use std::fs::File;
use std::io;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

mod alerts;
mod app;
mod cli;
mod client;
mod errors;
mod event;
mod list;
mod map;
mod models;
mod output;
mod refresh;
mod selection;
mod terminal;
mod ui;

#[cfg(test)]
mod test_helpers;

use app::Dashboard;
use cli::{Cli, Command, DashboardArgs, TailArgs};
use client::UsgsClient;
use event::AppEvent;
use list::{SortDirection, SortState};
use refresh::{REFRESH_PERIOD, Refresher};
use terminal::{TerminalSession, Tui};

/// How often the header countdown is redrawn without any other event.
const REDRAW_PERIOD: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Dashboard(DashboardArgs::default()));

    // The dashboard owns the terminal, so its logs go to a file or nowhere.
    let sink = match (&cli.log_file, &command) {
        (Some(path), _) => LogSink::File(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        ),
        (None, Command::Dashboard(_)) => LogSink::Discard,
        (None, Command::Tail(_)) => LogSink::Stderr,
    };
    init_tracing(cli.verbose, cli.quiet, sink);

    match command {
        Command::Dashboard(args) => cmd_dashboard(&args),
        Command::Tail(args) => cmd_tail(&args),
    }
}

/// Where log lines are written.
enum LogSink {
    Stderr,
    File(File),
    Discard,
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool, sink: LogSink) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let (writer, ansi) = match sink {
        LogSink::Stderr => (BoxMakeWriter::new(io::stderr), true),
        LogSink::File(file) => (BoxMakeWriter::new(Mutex::new(file)), false),
        LogSink::Discard => (BoxMakeWriter::new(io::sink), false),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(writer)
        .init();
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")
}

/// Execute the `tail` command - one-shot fetch, print, exit.
fn cmd_tail(args: &TailArgs) -> Result<()> {
    let client = UsgsClient::with_base_url(&args.feed.base_url, args.feed.feed)
        .context("failed to create USGS client")?;

    let feed = runtime()?
        .block_on(client.fetch_feed())
        .context("failed to fetch earthquake feed")?;

    let sort = SortState {
        key: args.sort,
        direction: if args.asc {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        },
    };
    let alerts = alerts::derive(&feed.features);
    let rows = list::minor_events(&feed.features, sort);
    tracing::info!(events = feed.features.len(), rows = rows.len(), "feed fetched");

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_report(&mut handle, &alerts, &rows, args.format)?;

    Ok(())
}

/// Execute the `dashboard` command - interactive TUI until the user quits.
fn cmd_dashboard(args: &DashboardArgs) -> Result<()> {
    let client = UsgsClient::with_base_url(&args.feed.base_url, args.feed.feed)
        .context("failed to create USGS client")?;
    tracing::info!(url = client.url(), "starting dashboard");
    let runtime = runtime()?;

    // Restored on drop, including early returns and panics.
    let mut session = TerminalSession::enter().context("failed to set up terminal")?;
    runtime.block_on(run_dashboard(&mut session.terminal, client, args.feed.feed.as_str()))
}

async fn run_dashboard(terminal: &mut Tui, client: UsgsClient, feed_label: &str) -> Result<()> {
    let mut app = Dashboard::new(feed_label);
    let mut refresher = Refresher::spawn(client, REFRESH_PERIOD);

    // ── Keyboard + mouse + resize thread ────────────────────────
    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();
    let stop = Arc::new(AtomicBool::new(false));
    let reader = event::spawn_reader(tx, Arc::clone(&stop));

    let mut redraw = tokio::time::interval(REDRAW_PERIOD);
    redraw.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // ── Main event loop ─────────────────────────────────────────
    let result = loop {
        if let Err(e) = terminal.draw(|frame| ui::draw(frame, &mut app)) {
            break Err(e.into());
        }

        tokio::select! {
            Some(update) = refresher.recv() => app.apply(update),
            input = rx.recv() => match input {
                Some(AppEvent::Key(key)) => {
                    if let Some(action) = event::key_action(key) {
                        app.handle(action);
                    }
                }
                Some(AppEvent::Mouse(mouse)) => {
                    if let Some(action) = event::mouse_action(mouse) {
                        app.handle(action);
                    }
                }
                Some(AppEvent::Resize) => {}
                Some(AppEvent::InputError(message)) => {
                    break Err(anyhow!("terminal input failed: {message}"));
                }
                None => break Err(anyhow!("terminal input closed unexpectedly")),
            },
            _ = redraw.tick() => {}
        }

        if app.should_quit() {
            break Ok(());
        }
    };

    refresher.stop();
    stop.store(true, Ordering::Relaxed);
    // Exits within one poll interval.
    let _ = reader.join();

    result
}
