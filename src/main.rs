//! lapis - lidar discovery and rating-curve workflow
//!
//! Subcommands:
//!   search         find lidar collections intersecting named locations
//!   pipeline       build the PDAL retrieval pipeline for one collection
//!   rating         download a USGS rating curve
//!   peak-stats     download StreamStats peak-flow statistics
//!   flow-to-stage  map peak-flow statistics onto a gage's rating curve
//!   timestamps     summarise the acquisition times of a GPS-time dump
//!
//! Usage:
//!   cargo run --release -- search --locations data/locations.toml --resolve-crs
//!   cargo run --release -- flow-to-stage 05568500 --out out/peoria_stages.json
//!
//! Environment:
//!   LAPIS_CONFIG - path to the configuration file (default: lapis.toml)

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use reqwest::blocking::Client;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use lapis::analysis::flow_stage::{self, StageMethod};
use lapis::analysis::{gps_time, reconcile};
use lapis::config::{self, LapisConfig};
use lapis::error::{LapisError, Result};
use lapis::export;
use lapis::geometry::LocationShape;
use lapis::ingest::digital_coast::DigitalCoastCatalog;
use lapis::ingest::ept::{self, CropMethod};
use lapis::ingest::{self, gagestats, inventory, ratings};
use lapis::model::Collection;

#[derive(Parser)]
#[command(name = "lapis")]
#[command(version, about = "Lidar discovery and rating-curve workflow for flood mapping")]
struct Cli {
    /// Configuration file (overrides LAPIS_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find lidar collections intersecting the configured locations
    Search {
        /// Locations file ([[location]] tables)
        #[arg(short, long)]
        locations: PathBuf,
        /// Digital Coast catalog export (overrides the configured path)
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Look up each collection's native CRS from its ept.json
        #[arg(long)]
        resolve_crs: bool,
        /// Write the collection table as JSON
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Build the PDAL pipeline for one collection of a search
    Pipeline {
        #[arg(short, long)]
        locations: PathBuf,
        /// Index of the collection in the search results
        #[arg(long)]
        collection: usize,
        /// Crop by "bounds" or "polygon"
        #[arg(long, default_value = "bounds")]
        method: String,
        /// Append a LAS writer stage targeting this file
        #[arg(long)]
        write_las: Option<PathBuf>,
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Write the pipeline JSON here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Download a USGS rating curve
    Rating {
        /// USGS site number
        gage: String,
        /// Rating file type (exsa, base, corr)
        #[arg(long)]
        file_type: Option<String>,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Download StreamStats peak-flow statistics
    PeakStats {
        gage: String,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Map peak-flow statistics onto the gage's rating curve
    FlowToStage {
        gage: String,
        /// "linear" or "nearest"
        #[arg(long, default_value = "linear")]
        method: String,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Summarise a GPS-time dump (one adjusted GPS time per line)
    Timestamps {
        file: PathBuf,
        /// List every distinct second instead of only the span
        #[arg(long)]
        all: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: a global tracing subscriber was already installed");
    }

    println!("🗺️  lapis");
    println!("==========\n");

    if let Err(e) = run(cli) {
        eprintln!("\n❌ {}\n", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config()?,
    };

    match cli.command {
        Commands::Search { locations, catalog, resolve_crs, out } => {
            let client = ingest::build_client(&config.http)?;
            let (_, collections) = search(&client, &config, &locations, catalog.as_deref(), resolve_crs)?;
            print_collections(&collections);
            if let Some(path) = out {
                write_out(&path, &collections)?;
            }
        }
        Commands::Pipeline { locations, collection, method, write_las, catalog, out } => {
            let method: CropMethod = method.parse()?;
            let client = ingest::build_client(&config.http)?;
            let (shapes, collections) = search(&client, &config, &locations, catalog.as_deref(), true)?;

            let chosen = collections.get(collection).ok_or_else(|| {
                LapisError::Config(format!(
                    "collection index {} out of range ({} collections found)",
                    collection,
                    collections.len()
                ))
            })?;
            let parts = reconcile::shapes_for(chosen, &shapes);
            if parts.is_empty() {
                return Err(LapisError::InvalidLocation {
                    name: chosen.name.clone(),
                    reason: "no location shape for this collection".to_string(),
                });
            }

            let pipeline = ept::pipeline_for_collection(chosen, &parts, method, write_las.as_deref())?;
            let text = export::to_json_string(&pipeline)?;
            match out {
                Some(path) => {
                    fs::write(&path, text)?;
                    println!("✓ Pipeline written to {}", path.display());
                }
                None => println!("{}", text),
            }
        }
        Commands::Rating { gage, file_type, out } => {
            let client = ingest::build_client(&config.http)?;
            let file_type = file_type.unwrap_or_else(|| config.ratings.file_type.clone());

            println!("📥 Fetching {} rating for {}...", file_type, gage);
            let curve = ratings::fetch_rating_curve(&client, &config.services.ratings_url, &gage, &file_type)?;
            println!(
                "✓ {} rows, {:.0}–{:.0} cfs\n",
                curve.points().len(),
                curve.min_flow(),
                curve.max_flow()
            );
            if let Some(path) = out {
                write_out(&path, curve.points())?;
            }
        }
        Commands::PeakStats { gage, out } => {
            let client = ingest::build_client(&config.http)?;

            println!("📥 Fetching peak-flow statistics for {}...", gage);
            let stats = gagestats::fetch_peak_flow_statistics(&client, &config.services.gagestats_url, &gage)?;
            for stat in &stats {
                println!("   {:<10} {:>12.0} cfs  {}", stat.pfs_aep_code, stat.pfs_flow_cfs, stat.pfs_aep_name);
            }
            println!();
            if let Some(path) = out {
                write_out(&path, &stats)?;
            }
        }
        Commands::FlowToStage { gage, method, out } => {
            let method: StageMethod = method.parse()?;
            let client = ingest::build_client(&config.http)?;

            println!("📥 Fetching rating curve and peak-flow statistics for {}...", gage);
            let curve = ratings::fetch_rating_curve(
                &client,
                &config.services.ratings_url,
                &gage,
                &config.ratings.file_type,
            )?;
            let stats = gagestats::fetch_peak_flow_statistics(&client, &config.services.gagestats_url, &gage)?;
            println!("✓ {} rating rows, {} statistics\n", curve.points().len(), stats.len());

            let rows = flow_stage::flow_to_stage(&stats, &curve, method);
            for row in &rows {
                match row.rc_stage_ft {
                    Some(stage) => println!(
                        "   {:<10} {:>12.0} cfs  →  {:>7.2} ft ({:.2} m)",
                        row.statistic.pfs_aep_code,
                        row.statistic.pfs_flow_cfs,
                        stage,
                        row.rc_stage_m.unwrap_or_default()
                    ),
                    None => println!(
                        "   {:<10} {:>12.0} cfs  →  outside rating",
                        row.statistic.pfs_aep_code, row.statistic.pfs_flow_cfs
                    ),
                }
            }
            println!();
            if let Some(path) = out {
                write_out(&path, &rows)?;
            }
        }
        Commands::Timestamps { file, all } => {
            let text = fs::read_to_string(&file)?;
            let times = gps_time::parse_gps_times(&text);
            println!("📋 {} GPS times read from {}", times.len(), file.display());

            let (start, end) = gps_time::collection_span(&times)?;
            println!("   First: {}", start.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("   Last:  {}", end.format("%Y-%m-%d %H:%M:%S UTC"));

            if all {
                let stamps = gps_time::unique_timestamps(&times)?;
                println!("\n   {} distinct seconds:", stamps.len());
                for stamp in &stamps {
                    println!("   {}", stamp.format("%Y-%m-%d %H:%M:%S"));
                }
            }
        }
    }

    Ok(())
}

/// Searches the inventory for the locations file, cross-references the
/// Digital Coast catalog and optionally resolves each collection's CRS.
fn search(
    client: &Client,
    config: &LapisConfig,
    locations_path: &Path,
    catalog_override: Option<&Path>,
    resolve_crs: bool,
) -> Result<(Vec<LocationShape>, Vec<Collection>)> {
    println!("📋 Loading locations from {}...", locations_path.display());
    let locations = config::load_locations(locations_path)?;
    println!("✓ Loaded {} locations\n", locations.len());

    println!("🔎 Querying {} inventory layers...", config.services.inventory_layers.len());
    let (shapes, mut collections) = inventory::get_lidar_collections(client, config, &locations)?;
    println!("✓ Found {} collections\n", collections.len());

    let catalog = match catalog_override.or(config.digital_coast.catalog_path.as_deref()) {
        Some(path) => {
            let catalog = DigitalCoastCatalog::load(path)?;
            println!("✓ Digital Coast catalog: {} datasets", catalog.len());
            catalog
        }
        None => {
            tracing::warn!("no Digital Coast catalog configured; EPT paths come from the inventory only");
            DigitalCoastCatalog::default()
        }
    };
    reconcile::cross_reference(&mut collections, &catalog);

    if resolve_crs {
        println!("🌐 Resolving EPT coordinate systems...");
        reconcile::resolve_crs(client, &mut collections);
    }
    println!();

    Ok((shapes, collections))
}

fn print_collections(collections: &[Collection]) {
    for (i, c) in collections.iter().enumerate() {
        let year = c.year.map(|y| y.to_string()).unwrap_or_else(|| "----".to_string());
        let ept = if c.ept.is_some() { "EPT" } else { "   " };
        let crs = c.ept_crs.map(|e| format!("EPSG:{}", e)).unwrap_or_default();
        println!(
            "   [{:>3}] {} {} {:<16} {} {}",
            i,
            year,
            ept,
            c.name,
            c.title.as_deref().unwrap_or("untitled"),
            crs
        );
    }
    println!();
}

fn write_out<T: serde::Serialize>(path: &Path, records: &[T]) -> Result<()> {
    export::write_records(path, records)?;
    println!("✓ Wrote {} records to {}", records.len(), path.display());
    Ok(())
}
