use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use catalog::{GeoJsonSpotProvider, SpotCollection, SpotProvider};
use clap::{Parser, Subcommand};
use explorer::ExplorerConfig;
use foundation::geo::LonLat;
use routing::{OsrmConfig, OsrmRouter, RoutingService, StraightLineRouter};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod session;

#[derive(Parser, Debug)]
#[command(author, version, about = "Island explorer map core, driven headless")]
struct Args {
    /// JSON file overriding any subset of the view configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load spots, run a scripted session against a headless map, print a JSON report
    Run {
        #[command(flatten)]
        data: DataArgs,

        /// OSRM-compatible routing endpoint; straight lines when omitted
        #[arg(long)]
        osrm: Option<String>,

        /// How many visible spots to put on the itinerary
        #[arg(long, default_value_t = 3)]
        stops: usize,
    },

    /// Load spots and print what was found
    Spots {
        #[command(flatten)]
        data: DataArgs,
    },

    /// Request one route segment and print its geometry
    Route {
        /// Start as lon,lat
        #[arg(long)]
        from: String,

        /// End as lon,lat
        #[arg(long)]
        to: String,

        /// OSRM-compatible routing endpoint
        #[arg(long, default_value = routing::DEFAULT_OSRM_URL)]
        osrm: String,
    },
}

#[derive(clap::Args, Debug)]
struct DataArgs {
    /// Directory with one GeoJSON FeatureCollection per municipality
    #[arg(long)]
    spots: PathBuf,

    /// Image manifest (spots[MUNICIPALITY][name].images)
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Base URL prepended to manifest image names
    #[arg(long, default_value = "")]
    image_base: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    // Route jobs hold `Rc` state and are spawned with `spawn_local`.
    let local = tokio::task::LocalSet::new();
    local.block_on(&rt, run(args))
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args.config.as_deref()).await?;

    match args.command {
        Command::Run { data, osrm, stops } => {
            let collection = load_spots(&data).await?;
            let router: Arc<dyn RoutingService> = match osrm {
                Some(base_url) => Arc::new(OsrmRouter::new(OsrmConfig {
                    base_url,
                    ..OsrmConfig::default()
                })?),
                None => Arc::new(StraightLineRouter),
            };
            let report = session::run_session(config, collection, router, stops).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Spots { data } => {
            let collection = load_spots(&data).await?;
            let spots: Vec<_> = collection
                .spots
                .iter()
                .map(|s| {
                    json!({
                        "name": s.name(),
                        "municipality": s.municipality,
                        "placeable": s.valid_coordinates().is_ok(),
                        "popular": s.is_popular(config.popularity_threshold),
                        "categories": s.categories,
                        "images": s.images.len(),
                    })
                })
                .collect();
            let out = json!({
                "fingerprint": collection.fingerprint,
                "count": spots.len(),
                "spots": spots,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Route { from, to, osrm } => {
            let from = parse_lon_lat(&from)?;
            let to = parse_lon_lat(&to)?;
            let router = OsrmRouter::new(OsrmConfig {
                base_url: osrm,
                timeout: Duration::from_secs(15),
                ..OsrmConfig::default()
            })?;
            let segment = router.route(from, to).await?;
            println!("{}", serde_json::to_string_pretty(&segment)?);
        }
    }
    Ok(())
}

async fn load_config(path: Option<&Path>) -> Result<ExplorerConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(ExplorerConfig::from_env()?);
    };
    let body = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("read {}: {e}", path.display()))?;
    info!(path = %path.display(), "loaded view config");
    Ok(ExplorerConfig::from_json_str(&body)?.with_env_overrides()?)
}

async fn load_spots(data: &DataArgs) -> Result<SpotCollection, Box<dyn std::error::Error>> {
    let mut provider =
        GeoJsonSpotProvider::new(&data.spots).with_image_base_url(data.image_base.clone());
    if let Some(manifest) = &data.manifest {
        provider = provider.with_manifest(manifest);
    }
    let collection = provider.load().await?;
    info!(
        spots = collection.spots.len(),
        fingerprint = collection.fingerprint.as_deref().unwrap_or("-"),
        "spots loaded"
    );
    Ok(collection)
}

fn parse_lon_lat(s: &str) -> Result<LonLat, String> {
    let (lon, lat) = s
        .split_once(',')
        .ok_or_else(|| format!("expected lon,lat but got {s:?}"))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("bad longitude {lon:?}: {e}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude {lat:?}: {e}"))?;
    let p = LonLat::new(lon, lat);
    if !p.is_valid() {
        return Err(format!("coordinate out of range: {s}"));
    }
    Ok(p)
}
