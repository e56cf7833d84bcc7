use std::fs;

use anyhow::{bail, Context};
use structopt::StructOpt;
use tracing::{info, warn};

use cinemap_cli::config::{CliArgs, RunConfig};
use cinemap_cli::geocode::{NominatimClient, USER_AGENT};
use cinemap_cli::pipeline::{build_map, resolve_home};
use cinemap_cli::report::report_schema;
use cinemap_cli::{init_logging, prompt};
use cinemap_core::locations_db::parse_dataset_file;
use cinemap_core::title::ImdbTitleParser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::from_args();
    init_logging(args.log_level);

    if args.print_schema {
        println!("{}", report_schema()?);
        return Ok(());
    }

    let config = RunConfig::from_args(args)?;
    let geocoder = NominatimClient::new(&config.nominatim_url, USER_AGENT, config.rate_limit)?
        .with_retry(config.retry);

    let interactive = config.home.is_none();
    let home = match config.home.clone() {
        Some(home) => home,
        None => prompt::ask_home()?,
    };
    let home = match resolve_home(&geocoder, &home).await {
        Some(coords) => coords,
        None if interactive => {
            println!("Error while finding your location.");
            prompt::ask_coordinates()?
        }
        None => bail!("cannot find your location by name, pass --coords instead"),
    };
    info!("Home is at {}", home);

    println!("Generating the map, please wait...");
    let (db, stats) = parse_dataset_file(
        &config.dataset,
        &config.normalizer,
        &ImdbTitleParser::new(),
    )
    .context("cannot build the location index")?;
    if db.is_empty() {
        warn!(
            "No usable locations in {:?} ({} lines skipped)",
            config.dataset,
            stats.total_skipped()
        );
    }
    if let Some(path) = &config.dump_mapping {
        let json = serde_json::to_string_pretty(&db)?;
        fs::write(path, json).with_context(|| format!("cannot write {:?}", path))?;
    }

    let outcome = build_map(&geocoder, &db, home, config.limits).await;
    outcome
        .document
        .save(&config.output)
        .with_context(|| format!("cannot save the map to {:?}", config.output))?;

    if let Some(path) = &config.report {
        match &outcome.report {
            Some(report) => {
                let json = serde_json::to_string_pretty(report)?;
                fs::write(path, json).with_context(|| format!("cannot write {:?}", path))?;
            }
            None => warn!("Nothing was ranked, no report written to {:?}", path),
        }
    }

    println!("Your map is saved in: {}", config.output.display());
    Ok(())
}
