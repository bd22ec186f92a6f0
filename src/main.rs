use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docative::Result;
use docative::commands::{serve, setup, show_status};
use docative::config::Config;

#[derive(Parser)]
#[command(name = "docative")]
#[command(about = "Turn a document or website into an embeddable retrieval-augmented chatbot")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the data stores
    #[arg(long, default_value = ".", global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve,
    /// Create the shared collection, its indexes, and the SQLite tables
    Setup,
    /// Show index and upload-log counts
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.data_dir)?;

    match cli.command {
        Commands::Serve => serve(config).await?,
        Commands::Setup => setup(&config).await?,
        Commands::Status => show_status(&config).await?,
    }

    Ok(())
}
