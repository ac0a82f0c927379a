mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::Args;
use quickmedia_core::{Repl, SessionGateway};
use std::path::Path;
use tokio::io::{BufReader, stdin, stdout};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _guard = init_logging(&args)?;

    tracing::info!("Starting QuickMedia");

    let manager = match quickmedia_media_session::request_session_manager().await {
        Ok(manager) => manager,
        Err(e) => {
            tracing::error!("Failed to obtain media session manager: {:#}", e);
            return Err(e);
        }
    };

    let gateway = SessionGateway::new(manager);
    let mut repl = Repl::new(gateway, BufReader::new(stdin()), stdout())
        .with_seek_scale(args.seek_scale);
    repl.run().await?;

    tracing::info!("Exiting");
    Ok(())
}

/// Logs go to stderr (stdout carries the JSON protocol) and optionally a file
fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| args.log_level.as_str().into());

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match &args.log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(log_file_appender(path)?);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

fn log_file_appender(path: &Path) -> Result<tracing_appender::rolling::RollingFileAppender> {
    let file_name = path
        .file_name()
        .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    Ok(tracing_appender::rolling::never(dir, file_name))
}
