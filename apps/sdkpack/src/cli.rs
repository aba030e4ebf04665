//! Command line interface definition

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// sdkpack - Build client SDK packages and stream them to peers
#[derive(Parser)]
#[command(name = "sdkpack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build client SDK packages and stream them to peers")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to the temp log directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Generate an SDK package and stream it over a loopback channel
    Transfer(TransferArgs),

    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct TransferArgs {
    /// SDK variant passed to the packaging tool
    #[arg(long, value_name = "VARIANT")]
    pub options: String,

    /// Bytes per chunk (0 or negative selects the default)
    #[arg(long, allow_hyphen_values = true)]
    pub window: Option<i64>,

    /// Assets directory; the archive is written under its temp subdirectory
    #[arg(long, value_name = "DIR")]
    pub assets: Option<PathBuf>,

    /// Packaging tool binary
    #[arg(long, value_name = "BIN")]
    pub tool: Option<PathBuf>,

    /// Write the reassembled archive here
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}
