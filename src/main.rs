use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use townland_census::config::AppConfig;
use townland_census::{server, CensusGeo};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the enriched townland layer over HTTP
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Write the enriched townland layer as GeoJSON
    Enrich {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Output file; stdout when omitted
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Print townland and record totals per district
    Summary {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config } => {
            info!("Serving with config: {:?}", config);
            let app_config = AppConfig::load_from_file(config)?;
            server::start_server(app_config).await?;
        }
        Commands::Enrich { config, output } => {
            let app_config = AppConfig::load_from_file(config)?;
            let census = CensusGeo::load(&app_config.input)?;
            census.log_stats();

            let json = census.enrich_json()?;
            match output {
                Some(path) => {
                    fs::write(path, &json)
                        .with_context(|| format!("Failed to write output: {:?}", path))?;
                    info!("Wrote enriched townlands to {:?}", path);
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(json.as_bytes())?;
                    stdout.write_all(b"\n")?;
                }
            }
        }
        Commands::Summary { config } => {
            let app_config = AppConfig::load_from_file(config)?;
            let census = CensusGeo::load(&app_config.input)?;
            census.log_stats();

            println!("{:<40} {:>10} {:>10}", "district", "townlands", "records");
            for row in census.district_summary() {
                println!("{:<40} {:>10} {:>10}", row.district, row.townlands, row.records);
            }
        }
    }

    Ok(())
}
