use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use planner_cli::{destination_lines, LocalConversion, MapSummary};
use planner_core::{DestinationRegistry, GeodeticPosition, ObstacleMap};
use planner_vehicle::MissionConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Motion planner operator tools", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the mission destinations
    Destinations {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse and summarise an obstacle file
    Inspect {
        /// Obstacle file (colliders.csv layout)
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Convert a global point to the local frame
    Local {
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        alt: f64,
        /// Use this obstacle file's reference as home
        #[arg(long, conflicts_with_all = ["home_lon", "home_lat"])]
        colliders: Option<PathBuf>,
        #[arg(long, requires = "home_lat", allow_hyphen_values = true)]
        home_lon: Option<f64>,
        #[arg(long, requires = "home_lon", allow_hyphen_values = true)]
        home_lat: Option<f64>,
    },
    /// Convert a named destination to local and grid coordinates
    DestinationLocal {
        name: String,
        /// Defaults to PLANNER_COLLIDERS, then colliders.csv
        #[arg(long)]
        colliders: Option<PathBuf>,
    },
    /// Print the mission configuration resolved from the environment
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("planner=info".parse()?),
        )
        .init();

    let args = Args::parse();
    tracing::debug!("planner {:?}", args.command);
    let registry = DestinationRegistry::default();

    match args.command {
        Command::Destinations { json } => {
            if json {
                let destinations: Vec<_> = registry.iter().collect();
                println!("{}", serde_json::to_string_pretty(&destinations)?);
            } else {
                for line in destination_lines(&registry) {
                    println!("{line}");
                }
            }
        }
        Command::Inspect { path, json } => {
            let map = ObstacleMap::load(&path)
                .with_context(|| format!("cannot use obstacle file {}", path.display()))?;
            let summary = MapSummary::new(&map);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{summary}");
            }
        }
        Command::Local {
            lon,
            lat,
            alt,
            colliders,
            home_lon,
            home_lat,
        } => {
            let point = GeodeticPosition::new(lon, lat, alt);
            let conversion = match (colliders, home_lon, home_lat) {
                (Some(path), _, _) => {
                    let map = ObstacleMap::load(&path)
                        .with_context(|| format!("cannot use obstacle file {}", path.display()))?;
                    let offset = map.extents().map(|e| e.grid_offset());
                    LocalConversion::new(point, map.home(), offset)
                }
                (None, Some(home_lon), Some(home_lat)) => {
                    LocalConversion::new(point, GeodeticPosition::new(home_lon, home_lat, 0.0), None)
                }
                _ => anyhow::bail!("provide --colliders or both --home-lon and --home-lat"),
            };
            println!("{conversion}");
        }
        Command::DestinationLocal { name, colliders } => {
            let colliders = colliders.unwrap_or_else(|| MissionConfig::from_env().colliders_path);
            let destination = registry.require(&name)?;
            let map = ObstacleMap::load(&colliders)
                .with_context(|| format!("cannot use obstacle file {}", colliders.display()))?;
            println!("{}", LocalConversion::for_destination(destination, &map));
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&MissionConfig::from_env())?);
        }
    }

    Ok(())
}
