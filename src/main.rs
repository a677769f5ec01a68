//! thermolog - console entry point
//!
//! Reads operator commands from stdin, runs a logging session and prints
//! the chart and latest values while new data arrives.

use anyhow::Context;
use crossbeam_channel::{select, tick, unbounded, Receiver};
use std::io::BufRead;
use std::time::Instant;
use thermolog::{
    config::{self, APP_STATE_FILE},
    control::{CommandParseError, HELP},
    link::default_connector,
    presentation::{PresentationFeed, TextChart},
    AppConfig, AppState, ControlCommand, ControlSurface, IngestEvent, Session,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging();
    tracing::info!("Starting thermolog {}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load_or_default();
    let app_state = AppState::load_or_default();

    let session = Session::new(default_connector(), &config);
    let mut control = ControlSurface::new(session, config.clone(), app_state);
    match config::ensure_app_data_dir() {
        Ok(dir) => control = control.with_app_state_path(dir.join(APP_STATE_FILE)),
        Err(e) => tracing::warn!("App state will not be saved: {}", e),
    }

    let commands = spawn_stdin_reader()?;
    let period = config
        .presentation
        .chart_period()
        .min(config.presentation.label_period());
    let ticker = tick(period);

    let mut feed = PresentationFeed::new(config.presentation.clone());
    let mut chart = TextChart::new(config.presentation.chart_width);
    let mut shown_samples = 0;

    println!("{}", HELP);
    if let Some(port) = control.selected_port() {
        println!("Selected port: {}", port);
    }

    loop {
        select! {
            recv(commands) -> line => {
                let Ok(line) = line else {
                    // stdin closed
                    control.execute(ControlCommand::Quit);
                    break;
                };
                match line.parse::<ControlCommand>() {
                    Ok(command) => {
                        let quit = command == ControlCommand::Quit;
                        println!("{}", control.execute(command));
                        if quit {
                            break;
                        }
                    }
                    Err(CommandParseError::Empty) => {}
                    Err(e) => println!("error: {}", e),
                }
            }
            recv(ticker) -> _ => {
                control.session_mut().reap();
                for event in control.session().drain_events() {
                    report_event(&event);
                }

                let labels = feed.on_tick(Instant::now(), control.session(), &mut chart);
                let samples = control.session().series().len();
                if let Some(labels) = labels {
                    if samples != shown_samples {
                        shown_samples = samples;
                        println!("{}", chart.last_frame());
                        println!("{}", labels.join("  "));
                        println!("{}", control.status_line());
                    }
                }
            }
        }
    }

    tracing::info!("thermolog exiting");
    Ok(())
}

/// Console and rolling-file logging; the guard flushes the file on drop
fn init_logging() -> Option<WorkerGuard> {
    let appender = config::log_dir().and_then(|dir| {
        std::fs::create_dir_all(&dir).ok()?;
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("thermolog")
            .filename_suffix("log")
            .build(dir)
            .ok()
    });

    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,thermolog=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

/// Forward stdin lines to the main loop
fn spawn_stdin_reader() -> anyhow::Result<Receiver<String>> {
    let (tx, rx) = unbounded();
    std::thread::Builder::new()
        .name("thermolog-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn stdin reader")?;
    Ok(rx)
}

fn report_event(event: &IngestEvent) {
    match event {
        IngestEvent::LinkClosed(reason) => println!("Device disconnected: {}", reason),
        IngestEvent::PersistenceFailed(reason) => println!("Saving stopped: {}", reason),
        IngestEvent::SampleCommitted(_) | IngestEvent::DecodeFailed { .. } | IngestEvent::Stopped => {}
    }
}
