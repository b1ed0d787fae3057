//! ifprobe - network interface configuration test harness
//!
//! Swaps a candidate interface config in, runs shell probes against the
//! interface and records (master) or verifies (slave) the extracted values.

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;
use ifprobe::common::{logging, Config};
use ifprobe::{cli, commands};

#[derive(Parser)]
#[command(name = "ifprobe", about = "Network interface configuration test harness")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.config/ifprobe/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging and command stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    let result = match config {
        Ok(config) => cli::dispatch(cli.command, config, cli.verbose).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
