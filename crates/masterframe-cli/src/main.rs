mod commands;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "masterframe", about = "Master calibration frame builder")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Combine raw frames into a master calibration frame
    Combine(commands::combine::CombineArgs),
    /// Show FITS/image metadata and statistics
    Info(commands::info::InfoArgs),
    /// Print or save a default stage config
    Config(commands::config::ConfigArgs),
    /// Render a frame as a stretched 8-bit PNG
    Preview(commands::preview::PreviewArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Combine(args) => commands::combine::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Config(args) => commands::config::run(args),
        Commands::Preview(args) => commands::preview::run(args),
    }
}
