//! sdkpack - Build client SDK packages and stream them to peers
//!
//! Runs a package transfer task against a loopback peer: the packaging tool
//! is launched, its archive streamed in chunks and optionally written back
//! out after reassembly.

mod cli;
mod error;
mod logging;
mod loopback;

use crate::cli::{Cli, Commands, TransferArgs};
use crate::error::CliError;
use crate::loopback::TransferSummary;
use clap::Parser;
use sdkpack_config::Config;
use sdkpack_events::EventReceiver;
use std::future::Future;
use std::process;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("Application error: {}", e);
            if !json_mode {
                eprintln!("Error: {e}");
            }
            process::exit(1);
        }
    }
}

/// Main application logic; `Ok(false)` means the command ran but failed
async fn run(cli: Cli) -> Result<bool, CliError> {
    info!("Starting sdkpack v{}", env!("CARGO_PKG_VERSION"));

    // 1. File config (or defaults)
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;

    // 2. Environment variables
    config.merge_env()?;

    match cli.command {
        Commands::Config => {
            let rendered = if cli.global.json {
                serde_json::to_string_pretty(&config)
                    .map_err(|e| CliError::Ops(e.into()))?
            } else {
                toml::to_string_pretty(&config)
                    .map_err(|e| sdkpack_errors::Error::internal(e.to_string()))?
            };
            println!("{rendered}");
            Ok(true)
        }
        Commands::Transfer(args) => {
            // 3. CLI flags (highest precedence)
            apply_cli_config(&mut config, &args)?;

            let (event_sender, event_receiver) = sdkpack_events::channel();
            let transfer = loopback::run_transfer(
                &config,
                &args.options,
                args.output.clone(),
                event_sender,
            );
            let summary = run_with_events(transfer, event_receiver).await?;
            render_summary(&summary, cli.global.json);
            Ok(summary.succeeded())
        }
    }
}

/// Drive a future while logging the events it emits
async fn run_with_events<T>(
    future: impl Future<Output = Result<T, CliError>>,
    mut event_receiver: EventReceiver,
) -> Result<T, CliError> {
    let mut future = Box::pin(future);

    loop {
        select! {
            result = &mut future => {
                // Drain any remaining events
                while let Ok(message) = event_receiver.try_recv() {
                    logging::log_event_with_tracing(&message);
                }
                return result;
            }

            message = event_receiver.recv() => {
                match message {
                    Some(message) => logging::log_event_with_tracing(&message),
                    None => { /* Channel closed: keep waiting for the future */ }
                }
            }
        }
    }
}

fn render_summary(summary: &TransferSummary, json: bool) {
    if json {
        println!("{}", summary.to_json());
        return;
    }

    let report = &summary.report;
    if summary.succeeded() {
        println!(
            "Transferred {} ({} bytes in {} chunks)",
            summary.options, report.sent, report.chunks_sent
        );
        if let Some(path) = &summary.written {
            println!("Archive written to {}", path.display());
        }
    } else {
        eprintln!(
            "Transfer of {} failed: {:?} after sending {} of {} bytes",
            summary.options,
            report.state,
            report.sent,
            report.total_size.unwrap_or(0)
        );
    }
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;
    let filter = |default: &str| {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default))
    };

    if debug_enabled {
        // Debug mode: structured JSON logs to file
        let log_dir = std::env::temp_dir().join("sdkpack-logs");
        if let Err(e) = std::fs::create_dir_all(&log_dir) {
            eprintln!("Warning: Failed to create log directory: {e}");
        }
        let log_file = log_dir.join(format!(
            "sdkpack-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));

        match std::fs::File::create(&log_file) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(filter("info,sdkpack=debug"))
                    .init();
                if !json_mode {
                    eprintln!("Debug logging enabled: {}", log_file.display());
                }
            }
            Err(e) => {
                eprintln!("Warning: Failed to create log file: {e}");
                tracing_subscriber::fmt()
                    .with_writer(std::io::stderr)
                    .with_env_filter(filter("info"))
                    .init();
            }
        }
    } else if json_mode {
        // JSON mode: keep stdout clean for the summary
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else {
        // Normal mode: lifecycle events to stderr
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter("warn,sdkpack=info"))
            .init();
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, args: &TransferArgs) -> Result<(), CliError> {
    if args.options.trim().is_empty() {
        return Err(CliError::InvalidArguments(
            "--options must name an SDK variant".to_string(),
        ));
    }
    if let Some(window) = args.window {
        config.transfer.window_size = window;
    }
    if let Some(assets) = &args.assets {
        config.paths.assets_path = Some(assets.clone());
    }
    if let Some(tool) = &args.tool {
        config.paths.tool_binary = Some(tool.clone());
    }
    Ok(())
}
