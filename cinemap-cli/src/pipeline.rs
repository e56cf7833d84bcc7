use std::time::Instant;

use tracing::{debug, info, warn};
use ustr::Ustr;

use cinemap_core::coordinates::Coordinates;
use cinemap_core::locations_db::LocationTitles;
use cinemap_core::search::{rank_scored, UserLocation};

use crate::config::{HomeLocation, MapLimits};
use crate::geocode::Geocoder;
use crate::map_html::{MapDocument, Marker};
use crate::report::RankReport;

pub struct MapOutcome {
    pub document: MapDocument,
    /// `None` when the home position has no address to rank against.
    pub report: Option<RankReport>,
}

/// Coordinates of the user's home, or `None` when an address cannot be found.
pub async fn resolve_home<G: Geocoder>(geocoder: &G, home: &HomeLocation) -> Option<Coordinates> {
    match home {
        HomeLocation::Coords(coords) => Some(*coords),
        HomeLocation::Address(address) => match geocoder.geocode(address).await {
            Ok(Some(place)) => {
                info!("{:?} is at {}", address, place.coords);
                Some(place.coords)
            }
            Ok(None) => {
                warn!("No match for {:?}", address);
                None
            }
            Err(err) => {
                warn!("Cannot geocode {:?}: {}", address, err);
                None
            }
        },
    }
}

/// Geocodes ranked keys in order until `max_markers` of them are placed or
/// `max_lookups` have been tried. Keys the geocoder cannot place are skipped.
pub async fn collect_markers<G: Geocoder>(
    geocoder: &G,
    ranked: &[Ustr],
    db: &LocationTitles,
    limits: MapLimits,
) -> Vec<Marker> {
    let mut markers = Vec::with_capacity(limits.max_markers.min(ranked.len()));
    for key in ranked.iter().take(limits.max_lookups) {
        if markers.len() >= limits.max_markers {
            break;
        }
        match geocoder.geocode(key.as_str()).await {
            Ok(Some(place)) => markers.push(Marker {
                coords: place.coords,
                titles: db.get(key.as_str()).unwrap_or_default().to_vec(),
            }),
            Ok(None) => debug!("No coordinates for {:?}", key.as_str()),
            Err(err) => warn!("Skipping {:?}: {}", key.as_str(), err),
        }
    }
    info!("{} of {} ranked locations placed", markers.len(), ranked.len());
    markers
}

pub async fn build_map<G: Geocoder>(
    geocoder: &G,
    db: &LocationTitles,
    home: Coordinates,
    limits: MapLimits,
) -> MapOutcome {
    let mut document = MapDocument::new(home);
    let address = match geocoder.reverse(home).await {
        Ok(Some(place)) => place.address,
        Ok(None) => {
            warn!("No address known for {}, the map will only show you", home);
            return MapOutcome {
                document,
                report: None,
            };
        }
        Err(err) => {
            warn!("Cannot reverse geocode {}: {}", home, err);
            return MapOutcome {
                document,
                report: None,
            };
        }
    };
    debug!("Current user location: {:?}", address);

    let start = Instant::now();
    let user = UserLocation::from_raw_query(address);
    let ranked = rank_scored(&user, db);
    let elapsed = start.elapsed();
    info!("{} matching locations ranked in {:.2?}", ranked.len(), elapsed);

    let keys = ranked.iter().map(|r| r.key).collect::<Vec<_>>();
    document.markers = collect_markers(geocoder, &keys, db, limits).await;
    let report = RankReport::new(&user, &ranked, db, elapsed);
    MapOutcome {
        document,
        report: Some(report),
    }
}
