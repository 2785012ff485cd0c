mod cli;
mod config;
mod progress;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use export_logging::{export_error, export_info, export_warn, LogDestination};
use log::LevelFilter;
use tokio_util::sync::CancellationToken;
use wp_export_core::ExportReport;
use wp_export_engine::{ExportError, Exporter};

use crate::cli::Cli;
use crate::progress::LogProgressSink;

/// Conventional exit status for a run stopped by SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            export_error!("{:#}", err);
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let settings = config::load_settings(&cli)?;

    let level = if settings.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let destination = match settings.log_file.clone() {
        Some(path) => LogDestination::Both(path),
        None => LogDestination::Terminal,
    };
    export_logging::initialize(destination, level);

    export_info!(
        "Exporting {} into {:?}",
        settings.export.api_url,
        settings.export.data_dir
    );
    let exporter = Exporter::new(settings.export)
        .context("cannot set up the HTTP client")?
        .with_sink(Arc::new(LogProgressSink));

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    // Dropping the run at an await point is safe: catalogs and posts are
    // only ever replaced by atomic renames.
    let result = tokio::select! {
        result = exporter.run(&cancel) => result,
        _ = cancel.cancelled() => Err(ExportError::Cancelled),
    };

    match result {
        Ok(report) => {
            print_report(&report)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(ExportError::Cancelled) => {
            export_warn!("Export interrupted");
            eprintln!("Export interrupted.");
            Ok(ExitCode::from(EXIT_INTERRUPTED))
        }
        Err(err) => Err(err).context("export failed"),
    }
}

fn print_report(report: &ExportReport) -> anyhow::Result<()> {
    print!("{}", render_report(report)?);
    Ok(())
}

/// The failed-image list is only shown when something failed.
fn render_report(report: &ExportReport) -> anyhow::Result<String> {
    let mut text = format!(
        "Exported {} authors, {} categories and {} posts.\n",
        report.authors, report.categories, report.posts_exported
    );
    if !report.failed_images.is_empty() {
        text.push_str("Failed images:\n");
        text.push_str(&serde_json::to_string_pretty(&report.failed_images)?);
        text.push('\n');
    }
    text.push_str("Export complete.\n");
    Ok(text)
}

fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        export_warn!("Shutdown requested");
        cancel.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(err) => {
            export_warn!("Cannot listen for SIGTERM: {}", err);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
