//! Print the coverage of a NetCDF file as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use ncgrid::{describe, init_tracing, in_timed_span, AxisNames, NetCdfSource};

#[derive(Parser, Debug)]
#[command(name = "describe")]
#[command(about = "Describe the bounds, times, elevations and runs of a NetCDF file")]
struct Args {
    /// NetCDF file to describe
    file: PathBuf,

    /// Preferred longitude variable name
    #[arg(long)]
    lon: Option<String>,

    /// Preferred latitude variable name
    #[arg(long)]
    lat: Option<String>,

    /// Preferred elevation variable name
    #[arg(long)]
    elevation: Option<String>,

    /// Preferred time variable name
    #[arg(long)]
    time: Option<String>,

    /// Preferred runtime variable name
    #[arg(long)]
    runtime: Option<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let names = AxisNames {
        longitude: args.lon,
        latitude: args.lat,
        elevation: args.elevation,
        time: args.time,
        runtime: args.runtime,
        ..Default::default()
    };

    let source = NetCdfSource::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let summary = in_timed_span("describe", || describe(&source, &names));
    source.close();
    let summary = summary.with_context(|| format!("Failed to describe {}", args.file.display()))?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&summary)?
    } else {
        serde_json::to_string(&summary)?
    };
    println!("{}", json);
    Ok(())
}
