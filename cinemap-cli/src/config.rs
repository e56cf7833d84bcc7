use std::path::PathBuf;
use std::time::Duration;

use structopt::StructOpt;
use thiserror::Error;

use cinemap_core::coordinates::Coordinates;
use cinemap_core::locations_db::NormalizerConfig;

use crate::geocode::{RetryPolicy, DEFAULT_NOMINATIM_URL};

const DATASET_FILE: &str = "locations.list";

#[derive(Debug, StructOpt)]
#[structopt(name = "cinemap", about = "Put the films shot closest to you on a map.")]
pub struct CliArgs {
    /// IMDb locations.list [default: <cache dir>/cinemap/locations.list]
    #[structopt(long, parse(from_os_str))]
    pub dataset: Option<PathBuf>,

    #[structopt(long, default_value = "map.html", parse(from_os_str))]
    pub output: PathBuf,

    /// Your location by name, e.g. "Lviv, Ukraine"
    #[structopt(long, conflicts_with = "coords")]
    pub address: Option<String>,

    /// Your location as "lat, lon" or "DDMMN DDDMME"
    #[structopt(long, allow_hyphen_values = true)]
    pub coords: Option<Coordinates>,

    #[structopt(long, default_value = "20")]
    pub max_markers: usize,

    /// Give up after geocoding this many candidate locations
    #[structopt(long, default_value = "200")]
    pub max_lookups: usize,

    /// Minimum delay between geocoder requests
    #[structopt(long, default_value = "1000")]
    pub rate_limit_ms: u64,

    /// Retries of a geocoder request after a network error, 429 or 5xx
    #[structopt(long, default_value = "2")]
    pub max_retries: u32,

    /// Wait before the first retry, doubled for each later one
    #[structopt(long, default_value = "5000")]
    pub retry_wait_ms: u64,

    #[structopt(long, default_value = DEFAULT_NOMINATIM_URL)]
    pub nominatim_url: String,

    /// Locations with fewer comma separated parts are ignored
    #[structopt(long, default_value = "3")]
    pub min_segments: usize,

    /// Write the ranked locations as JSON
    #[structopt(long, parse(from_os_str))]
    pub report: Option<PathBuf>,

    /// Write the normalized location -> titles mapping as JSON
    #[structopt(long, parse(from_os_str))]
    pub dump_mapping: Option<PathBuf>,

    /// Print the JSON schema of --report and exit
    #[structopt(long)]
    pub print_schema: bool,

    #[structopt(long = "log-level", case_insensitive = true, default_value = "WARN")]
    pub log_level: tracing::Level,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HomeLocation {
    Address(String),
    Coords(Coordinates),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapLimits {
    pub max_markers: usize,
    pub max_lookups: usize,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub dataset: PathBuf,
    pub output: PathBuf,
    /// `None` asks interactively.
    pub home: Option<HomeLocation>,
    pub limits: MapLimits,
    pub rate_limit: Duration,
    pub retry: RetryPolicy,
    pub nominatim_url: String,
    pub normalizer: NormalizerConfig,
    pub report: Option<PathBuf>,
    pub dump_mapping: Option<PathBuf>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("no cache directory on this system, pass --dataset")]
    NoDatasetPath,

    #[error("--min-segments must be at least 1")]
    MinSegments,
}

impl RunConfig {
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let dataset = match args.dataset {
            Some(path) => path,
            None => dirs::cache_dir()
                .map(|dir| dir.join("cinemap").join(DATASET_FILE))
                .ok_or(ConfigError::NoDatasetPath)?,
        };
        if args.min_segments == 0 {
            return Err(ConfigError::MinSegments);
        }
        let home = match (args.address, args.coords) {
            (Some(address), _) => Some(HomeLocation::Address(address)),
            (None, Some(coords)) => Some(HomeLocation::Coords(coords)),
            (None, None) => None,
        };
        Ok(RunConfig {
            dataset,
            output: args.output,
            home,
            limits: MapLimits {
                max_markers: args.max_markers,
                max_lookups: args.max_lookups,
            },
            rate_limit: Duration::from_millis(args.rate_limit_ms),
            retry: RetryPolicy {
                max_retries: args.max_retries,
                error_wait: Duration::from_millis(args.retry_wait_ms),
            },
            nominatim_url: args.nominatim_url,
            normalizer: NormalizerConfig {
                min_segments: args.min_segments,
                ..NormalizerConfig::default()
            },
            report: args.report,
            dump_mapping: args.dump_mapping,
        })
    }
}
