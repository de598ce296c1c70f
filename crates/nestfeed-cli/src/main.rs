use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nestfeed_core::AppConfig;

mod commands;

#[derive(Parser)]
#[command(name = "nestfeed")]
#[command(author, version, about = "Drive the property listing feed, image cache and carousel from a terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search listings and page through the results
    Search(commands::search::SearchArgs),
    /// Fetch the image sets of one or more listings through the cache
    Images {
        /// Listing ids
        #[arg(required = true)]
        ids: Vec<String>,
        /// Request each set this many times concurrently
        #[arg(long, default_value_t = 1)]
        repeat: usize,
    },
    /// Simulate carousel auto-advance on a virtual clock
    Carousel(commands::carousel::CarouselArgs),
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write the default configuration if no file exists
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    tracing::debug!(path = %AppConfig::config_path().display(), "Configuration loaded");

    match cli.command {
        Commands::Search(args) => commands::search::run(&config, args).await,
        Commands::Images { ids, repeat } => commands::images::run(&config, &ids, repeat).await,
        Commands::Carousel(args) => commands::carousel::run(&config, args),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&config),
            ConfigAction::Path => commands::config::path(),
            ConfigAction::Init => commands::config::init(),
        },
    }
}
