use anyhow::Context;
use canopy_dash::config::AppConfig;
use canopy_dash::{data, server, Dashboard, ViewMode};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the comparison dashboard API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Build the two figures for one selection and write them as JSON
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(long)]
        city1: Option<String>,
        #[arg(long)]
        city2: Option<String>,
        /// "map" or "grid"
        #[arg(short, long, default_value = "map")]
        mode: String,
        /// Output file, stdout when omitted
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            info!("Serving dashboard with config: {:?}", config);
            let app_config = AppConfig::load_from_file(&config)?;

            let dataset = data::load_or_empty(&app_config.input);
            let dashboard = Dashboard::new(dataset, app_config.figure.clone());
            info!("{} cities available", dashboard.cities().len());

            server::start_server(&app_config.server, dashboard).await?;
        }
        Commands::Render {
            config,
            city1,
            city2,
            mode,
            output,
        } => {
            let app_config = AppConfig::load_from_file(&config)?;
            let mode: ViewMode = mode.parse()?;

            let dataset = data::load_or_empty(&app_config.input);
            let dashboard = Dashboard::new(dataset, app_config.figure.clone());

            let (default1, default2) = dashboard.default_selection();
            let city1 = city1.unwrap_or_else(|| default1.to_string());
            let city2 = city2.unwrap_or_else(|| default2.to_string());

            let pair = dashboard.update(&city1, &city2, mode);
            let json = serde_json::to_string_pretty(&pair)?;

            match output {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("Failed to write figures to {:?}", path))?;
                    info!("Wrote figures for '{}' and '{}' to {:?}", city1, city2, path);
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}
