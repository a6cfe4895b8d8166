//! glimpse - drive recognition sessions from the command line
//!
//! Subcommands:
//! - `glimpse config` - Print the effective configuration and its sources
//! - `glimpse recognize <image>` - One manual recognition, outcome as JSON
//! - `glimpse scan <dir>` - Feed a directory of images as a camera stream

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glimpseconf::GlimpseConfig;

mod commands;
mod telemetry;

#[derive(Parser)]
#[command(name = "glimpse")]
#[command(about = "Continuous visual-recognition sessions from the command line")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ./glimpse.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Recognition service endpoint (overrides config)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Answer requests in-process instead of calling a service
    #[arg(long, global = true)]
    loopback: bool,

    /// Extra pass-through option, repeatable (e.g. --option storeID=1234)
    #[arg(long = "option", value_name = "KEY=VALUE", global = true)]
    options: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration and where it came from
    Config,

    /// Recognize a single image and print the outcome as JSON
    Recognize {
        /// Image file
        image: PathBuf,
    },

    /// Feed every image in a directory as a continuous frame stream
    Scan {
        /// Directory of image files, fed in file-name order
        dir: PathBuf,

        /// Frames per second
        #[arg(long, default_value = "10")]
        fps: f64,

        /// Minimum spacing between recognized frames, in ms (overrides config)
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = GlimpseConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(endpoint) = cli.endpoint {
        config.service.endpoint = endpoint;
    }
    commands::apply_cli_options(&mut config, &cli.options)?;

    let telemetry = telemetry::init(&config.telemetry)?;

    let result = match cli.command {
        Commands::Config => commands::show_config(&config, &sources),
        Commands::Recognize { image } => {
            commands::recognize(&config, cli.loopback, &image).await
        }
        Commands::Scan {
            dir,
            fps,
            debounce_ms,
        } => {
            if let Some(ms) = debounce_ms {
                config.engine.debounce_ms = ms;
            }
            commands::scan(&config, cli.loopback, &dir, fps).await
        }
    };

    telemetry.shutdown();
    result
}
