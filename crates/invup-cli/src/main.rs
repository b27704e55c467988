//! CLI application for the invoice upload client.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{GlobalOpts, batch, config, health, probe, render, upload};

/// Invoice upload client - store invoice images and extract their line items
#[derive(Parser)]
#[command(name = "invup")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use the local development backend
    #[arg(long, global = true)]
    local: bool,

    /// Backend base URL (overrides --local)
    #[arg(long, global = true, value_name = "URL")]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload and process a single invoice image
    Upload(upload::UploadArgs),

    /// Upload and process multiple invoice images
    Batch(batch::BatchArgs),

    /// Render a saved backend response
    Render(render::RenderArgs),

    /// Check the backend health endpoint
    Health,

    /// Check that the storage bucket accepts writes
    Probe,

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let opts = GlobalOpts {
        config: cli.config,
        local: cli.local,
        api_base: cli.api_base,
    };

    match cli.command {
        Commands::Upload(args) => upload::run(args, &opts).await,
        Commands::Batch(args) => batch::run(args, &opts).await,
        Commands::Render(args) => render::run(args).map(|()| ExitCode::SUCCESS),
        Commands::Health => health::run(&opts).await,
        Commands::Probe => probe::run(&opts).await.map(|()| ExitCode::SUCCESS),
        Commands::Config(args) => config::run(args, &opts).map(|()| ExitCode::SUCCESS),
    }
}
