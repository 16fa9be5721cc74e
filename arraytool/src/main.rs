use anyhow::Context;
use clap::Parser;
use config::InspectConfig;
use std::path::PathBuf;

mod config;
mod inspect;

#[derive(Parser)]
#[command(author, version, about = "Microphone-array geometry inspection driver")]
struct Args {
    /// XML geometry file to inspect
    #[arg(long)]
    file: Option<PathBuf>,
    /// Load an inspection job from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Channels to exclude from the geometry (comma separated)
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<usize>,
    /// Write the valid positions to a new XML file
    #[arg(long)]
    export: Option<PathBuf>,
    /// Emit the summary as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = if let Some(path) = args.config {
        InspectConfig::load(path)?
    } else {
        let file = args.file.context("either --file or --config is required")?;
        InspectConfig::from_args(file, args.exclude, args.export)
    };

    let summary = inspect::inspect(&config)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", inspect::render_text(&summary));
    }

    Ok(())
}
