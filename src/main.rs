pub mod colormap;
pub mod config;
pub mod data;
pub mod demand;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod server;
pub mod suggestions;
pub mod types;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the choropleth layers as GeoJSON files
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the interactive map with the suggestion box
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Render { config } => {
            println!("Rendering layers with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let output = pipeline::run(&app_config)?;
            render::write_layers(&app_config.output.layer_dir, &output)?;

            println!("Rendering complete!");
        }
        Commands::Serve { config } => {
            println!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let output = pipeline::run(&app_config)?;
            server::start_server(app_config, output).await?;
        }
    }

    Ok(())
}
