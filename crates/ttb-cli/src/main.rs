mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::SearchArgs;

#[derive(Debug, Parser)]
#[command(name = "ttb")]
#[command(about = "Find French companies around a place")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search registries for companies around a postcode, city or point
    Search(SearchArgs),
    /// List the sector ids accepted by `search --sector`
    Sectors {
        /// Also print each sector's classification codes
        #[arg(long)]
        codes: bool,
    },
    /// Resolve a postcode or commune name to its municipality centre
    Geocode {
        /// Postcode or commune name
        term: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = ttb_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Search(args) => commands::run_search(&config, args).await?,
        Commands::Sectors { codes } => commands::run_sectors(&config, codes)?,
        Commands::Geocode { term } => commands::run_geocode(&config, &term).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests;
