mod cli;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use cli::Cli;
use heicu::config::{load_config, load_default_or_fallback};
use heicu::{
    CommandDecoder, ConversionSession, DirectorySink, EventKind, InputFile, ResourceManager,
    SessionEvent,
};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("heicu=debug")
        } else {
            EnvFilter::new("heicu=warn")
        }
    });

    tracing_log::LogTracer::init()?;
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn print_event(event: &SessionEvent) {
    match &event.kind {
        EventKind::JobStarted {
            filename,
            output_kind,
            quality,
            ..
        } => {
            if output_kind.is_lossy() {
                println!("Converting {} to {} ({:.0}%)", filename, output_kind, quality * 100.0);
            } else {
                println!("Converting {} to {}", filename, output_kind);
            }
        }
        EventKind::JobSucceeded {
            output_filename,
            size,
            ..
        } => println!("  done: {} ({} bytes)", output_filename, size),
        EventKind::JobFailed { error, .. } => println!("  failed: {}", error),
        EventKind::Notice { message } => println!("{}", message),
        EventKind::JobQueued { .. }
        | EventKind::JobRemoved { .. }
        | EventKind::Cleared { .. } => {}
    }
}

fn drain_events(events: &mut broadcast::Receiver<SessionEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => print_event(&event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!("Skipped {} event(s)", skipped);
            }
            Err(_) => break,
        }
    }
}

async fn run(cli: Cli) -> heicu::Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_default_or_fallback()?,
    };

    if let Some(kind) = cli.format {
        config.output_kind = kind;
    }
    if let Some(quality) = cli.quality {
        config.quality = quality;
    }
    if let Some(concurrency) = cli.concurrency {
        config.max_concurrent_decodes = concurrency.max(1);
    }
    if let Some(out) = &cli.out {
        config.download_directory = out.to_string_lossy().to_string();
    }

    let decoder = Arc::new(CommandDecoder::new(config.decoder.clone()));
    let session = ConversionSession::from_config(&config, decoder, ResourceManager::in_memory())?;
    let mut events = session.subscribe();

    let mut files = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        files.push(InputFile::read(path).await?);
    }

    let Some(batch) = session.submit(files) else {
        drain_events(&mut events);
        return Ok(ExitCode::FAILURE);
    };

    let wait = batch.wait();
    tokio::pin!(wait);
    let summary = loop {
        tokio::select! {
            summary = &mut wait => break summary,
            received = events.recv() => match received {
                Ok(event) => print_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Skipped {} event(s)", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {}
            },
        }
    };
    drain_events(&mut events);

    let sink = DirectorySink::new(PathBuf::from(&config.download_directory));
    let report = session.download_all(&sink);
    drain_events(&mut events);

    for path in &report.saved {
        println!("Saved {}", path.display());
    }
    for error in &report.errors {
        eprintln!("Error: {}", error);
    }
    println!(
        "{} converted, {} failed",
        summary.succeeded, summary.failed
    );

    if summary.failed > 0 || !report.errors.is_empty() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
