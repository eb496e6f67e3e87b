// geostamp - stamp photos with capture time and location

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use geostamp::{parse_timestamp, read_stamp, StampConfig, StampRequest, Stamper};

#[derive(Parser)]
#[command(name = "geostamp", version, about = "Overlay time and location onto photos and tag their EXIF")]
struct Args {
    /// JSON file with layout/font settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Font file to try before system fonts
    #[arg(long, global = true)]
    font: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stamp a single photo
    Stamp {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        /// Place name printed on the third line
        #[arg(long, default_value = "")]
        location: String,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        /// Meters above sea level
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        altitude: f64,

        /// Capture time, e.g. 2024-03-15T14:07:00
        #[arg(long)]
        timestamp: String,
    },

    /// Stamp every request in a JSON array file
    Batch {
        #[arg(long)]
        jobs: PathBuf,
    },

    /// Print the stamped EXIF fields of a photo as JSON
    Inspect { path: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Stamp { input, output, location, lat, lng, altitude, timestamp } => {
            let request = StampRequest {
                input_path: input,
                output_path: output,
                location_text: location,
                lat,
                lng,
                altitude,
                timestamp: parse_timestamp(&timestamp)?,
            };
            let stamper = build_stamper(args.config, args.font)?;
            stamper
                .stamp(&request)
                .with_context(|| format!("Failed to stamp {}", request.input_path.display()))?;
        }
        Command::Batch { jobs } => {
            let raw = std::fs::read_to_string(&jobs)
                .with_context(|| format!("Failed to read jobs file {}", jobs.display()))?;
            let requests: Vec<StampRequest> = serde_json::from_str(&raw)
                .context("Failed to parse jobs file")?;
            let stamper = build_stamper(args.config, args.font)?;

            info!("Stamping {} photos", requests.len());
            let failed = requests
                .par_iter()
                .filter(|request| match stamper.stamp(request) {
                    Ok(()) => false,
                    Err(e) => {
                        error!("{}: {}", request.input_path.display(), e);
                        true
                    }
                })
                .count();

            if failed > 0 {
                anyhow::bail!("{} of {} photos failed", failed, requests.len());
            }
            info!("All {} photos stamped", requests.len());
        }
        Command::Inspect { path } => {
            let stamped = read_stamp(&path)
                .with_context(|| format!("Failed to read EXIF from {}", path.display()))?;
            println!("{}", serde_json::to_string_pretty(&stamped)?);
        }
    }

    Ok(())
}

fn build_stamper(config: Option<PathBuf>, font: Option<PathBuf>) -> Result<Stamper> {
    let mut config = match config {
        Some(path) => StampConfig::from_json_file(&path)?,
        None => StampConfig::default(),
    };
    if font.is_some() {
        config.font_path = font;
    }
    Stamper::new(config).context("Failed to initialize stamper")
}
