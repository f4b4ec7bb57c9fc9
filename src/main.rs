use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;

mod cli;
mod clock;
mod config;
mod control;
mod error;
mod logging;
mod models;
mod notification;
mod notifier;
mod overlay;
mod scheduler;
mod status;

use cli::{Cli, Commands};
use clock::{Clock, FixedClock, SystemClock};
use config::Config;
use notification::DesktopNotifications;
use notifier::OvertimeNotifier;
use overlay::{LoadingOverlay, PROCESSING_MESSAGE};
use scheduler::TokioScheduler;
use status::HttpStatusSource;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };
    logging::init(&config.logging)?;

    match cli.command {
        Commands::Watch { no_control } => {
            let notifier = build_notifier(&config)?;
            notifier.initialize().await;

            if no_control {
                tokio::signal::ctrl_c()
                    .await
                    .context("Failed to listen for Ctrl-C")?;
            } else {
                let stdin = BufReader::new(tokio::io::stdin());
                tokio::select! {
                    served = control::serve(&notifier, stdin, tokio::io::stdout()) => {
                        served.context("Failed to read control commands")?;
                    }
                    _ = tokio::signal::ctrl_c() => info!("Interrupted"),
                }
            }

            notifier.teardown();
        }
        Commands::Check { no_loading } => {
            let notifier = build_notifier(&config)?;
            notifier.request_permission();

            // Interactive terminals only; piped output stays plain.
            let mut overlay = if !no_loading && io::stdout().is_terminal() {
                Some(LoadingOverlay::stdout())
            } else {
                None
            };
            if let Some(overlay) = overlay.as_mut() {
                overlay
                    .show(PROCESSING_MESSAGE)
                    .context("Failed to show loading overlay")?;
            }

            let outcome = notifier.check_overtime_status().await;

            if let Some(overlay) = overlay.as_mut() {
                overlay.hide().context("Failed to hide loading overlay")?;
            }
            println!("{}", outcome.format_summary());
        }
        Commands::Permission => {
            let notifier = build_notifier(&config)?;
            println!("Notification permission: {}", notifier.request_permission());
        }
        Commands::Threshold { at } => {
            let clock: Box<dyn Clock> = match at {
                Some(s) => Box::new(FixedClock(
                    NaiveTime::parse_from_str(&s, "%H:%M")
                        .with_context(|| format!("Invalid time '{s}', expected HH:MM"))?,
                )),
                None => Box::new(SystemClock),
            };
            let now = clock.now();
            let threshold = config.schedule.threshold();
            println!(
                "{} is {} the overtime threshold {}",
                now.format("%H:%M"),
                if threshold.is_past(now) { "past" } else { "before" },
                threshold
            );
        }
    }

    Ok(())
}

fn build_notifier(config: &Config) -> Result<OvertimeNotifier> {
    let source = HttpStatusSource::new(&config.server).context("Failed to build HTTP client")?;
    info!(url = source.url(), "Polling overtime status");
    let host = DesktopNotifications::new("lembur", config.notification.permission);

    Ok(OvertimeNotifier::builder(
        Arc::new(source),
        Arc::new(host),
        config.overtime_notification(),
    )
    .threshold(config.schedule.threshold())
    .poll_period(config.schedule.poll_interval())
    .clock(Arc::new(SystemClock))
    .scheduler(Arc::new(TokioScheduler))
    .build())
}
