//! Ridgeline CLI - DEM hydrology and interfluve mapping

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ridgeline_algorithms::hydrology::{
    extract_streams, fill_depressions, flow_accumulation, flow_direction_with_diagnostics, FillParams,
    RoutingDiagnostics, StreamParams,
};
use ridgeline_algorithms::pipeline::{run_pipeline, InterfluveParams};
use ridgeline_core::io::{read_geotiff, write_geotiff, GeoTiffOptions};
use ridgeline_core::{Raster, RasterElement};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "ridgeline")]
#[command(author, version, about = "DEM hydrology and interfluve mapping", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Fill depressions in a DEM (Priority-Flood)
    Fill {
        /// Input DEM file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Keep filled flats exactly level instead of adding a tiny gradient
        #[arg(long)]
        no_fix_flats: bool,
    },
    /// D8 flow direction from a filled DEM
    FlowDirection {
        /// Input filled DEM file
        input: PathBuf,
        /// Output file (0 = none, 1-8 = N..NW clockwise, 255 = nodata)
        output: PathBuf,
    },
    /// Flow accumulation from a D8 flow direction raster
    FlowAccumulation {
        /// Input flow direction raster
        input: PathBuf,
        /// Output file (upstream cell count, including the cell itself)
        output: PathBuf,
    },
    /// Stream mask from a flow accumulation raster
    Streams {
        /// Input flow accumulation raster
        input: PathBuf,
        /// Output file (1 = stream)
        output: PathBuf,
        /// Minimum accumulation in cells
        #[arg(short, long, default_value = "1000")]
        threshold: u64,
    },
    /// Full pipeline: fill, route, accumulate, streams and interfluves
    Interfluves {
        /// Input DEM file
        input: PathBuf,
        /// Directory for the output rasters
        output_dir: PathBuf,
        /// JSON file with pipeline parameters
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Stream accumulation threshold in cells
        #[arg(long)]
        stream_threshold: Option<u64>,
        /// Distance from streams, in cells, beyond which a cell is an interfluve
        #[arg(long)]
        distance_threshold: Option<f64>,
        /// TPI window size in cells (odd, >= 3)
        #[arg(long)]
        window: Option<usize>,
        /// TPI above which a cell is an interfluve
        #[arg(long)]
        tpi_threshold: Option<f64>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set default subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn read_raster<T: RasterElement>(path: &Path) -> Result<Raster<T>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<T> =
        read_geotiff(path).with_context(|| format!("Failed to read {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn write_raster<T: RasterElement>(raster: &Raster<T>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path, Some(GeoTiffOptions::default()))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn report_routing(diag: &RoutingDiagnostics) {
    println!(
        "  Routed: {}, boundary outlets: {}, unresolved flats: {}, nodata: {}",
        diag.routed, diag.boundary_outlets, diag.unresolved_flats, diag.nodata
    );
}

fn load_params(config: Option<&Path>) -> Result<InterfluveParams> {
    let Some(path) = config else {
        return Ok(InterfluveParams::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => {
            let raster: Raster<f64> = read_raster(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            let (size_x, size_y) = raster.cell_size();
            println!("Cell size: {} x {}", size_x, size_y);
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            if !raster.is_empty() {
                println!(
                    "  Valid cells: {} ({:.1}%)",
                    stats.valid_count,
                    100.0 * stats.valid_count as f64 / raster.len() as f64
                );
            }
        }

        Commands::Fill {
            input,
            output,
            no_fix_flats,
        } => {
            let dem: Raster<f64> = read_raster(&input)?;
            let start = Instant::now();
            let params = FillParams {
                fix_flats: !no_fix_flats,
            };
            let result = fill_depressions(&dem, params).context("Failed to fill depressions")?;
            let elapsed = start.elapsed();
            write_raster(&result, &output)?;
            done("Filled DEM", &output, elapsed);
        }

        Commands::FlowDirection { input, output } => {
            let dem: Raster<f64> = read_raster(&input)?;
            let start = Instant::now();
            let (result, diag) =
                flow_direction_with_diagnostics(&dem).context("Failed to calculate flow direction")?;
            let elapsed = start.elapsed();
            write_raster(&result, &output)?;
            done("Flow direction", &output, elapsed);
            report_routing(&diag);
        }

        Commands::FlowAccumulation { input, output } => {
            let flow_dir: Raster<u8> = read_raster(&input)?;
            let start = Instant::now();
            let result = flow_accumulation(&flow_dir).context("Failed to calculate flow accumulation")?;
            let elapsed = start.elapsed();
            write_raster(&result, &output)?;
            done("Flow accumulation", &output, elapsed);
        }

        Commands::Streams {
            input,
            output,
            threshold,
        } => {
            let flow_acc: Raster<u64> = read_raster(&input)?;
            let start = Instant::now();
            let result = extract_streams(&flow_acc, StreamParams { threshold })
                .context("Failed to extract streams")?;
            let elapsed = start.elapsed();
            write_raster(&result, &output)?;
            done("Streams", &output, elapsed);
        }

        Commands::Interfluves {
            input,
            output_dir,
            config,
            stream_threshold,
            distance_threshold,
            window,
            tpi_threshold,
        } => {
            let mut params = load_params(config.as_deref())?;
            if let Some(threshold) = stream_threshold {
                params.streams.threshold = threshold;
            }
            if let Some(threshold_cells) = distance_threshold {
                params.distance.threshold_cells = threshold_cells;
            }
            if let Some(window) = window {
                params.relief.window = window;
            }
            if let Some(threshold) = tpi_threshold {
                params.relief.threshold = threshold;
            }

            let dem: Raster<f64> = read_raster(&input)?;
            let start = Instant::now();
            let out = run_pipeline(&dem, &params).context("Interfluve pipeline failed")?;
            let elapsed = start.elapsed();

            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("Failed to create {}", output_dir.display()))?;
            let path = |name: &str| output_dir.join(name);

            write_raster(&out.filled, &path("filled.tif"))?;
            write_raster(&out.flow_dir, &path("flow_dir.tif"))?;
            write_raster(&out.flow_acc, &path("flow_acc.tif"))?;
            write_raster(&out.streams, &path("streams.tif"))?;
            write_raster(&out.interfluves_distance, &path("interfluves_distance.tif"))?;
            write_raster(&out.tpi, &path("tpi.tif"))?;
            write_raster(&out.interfluves_tpi, &path("interfluves_tpi.tif"))?;
            write_raster(&out.interfluves_combined, &path("interfluves_combined.tif"))?;

            let count = |mask: &Raster<u8>| mask.data().iter().filter(|&&v| v == 1).count();
            println!("Interfluve rasters saved to: {}", output_dir.display());
            println!("  Processing time: {:.2?}", elapsed);
            report_routing(&out.routing);
            println!(
                "  Stream cells: {}, interfluves by distance: {}, by TPI: {}, combined: {}",
                count(&out.streams),
                count(&out.interfluves_distance),
                count(&out.interfluves_tpi),
                count(&out.interfluves_combined)
            );
        }
    }

    Ok(())
}
