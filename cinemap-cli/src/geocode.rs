//! Forward and reverse geocoding against a Nominatim server.
//!
//! Nominatim's usage policy allows about one request per second, so every
//! request made by [`NominatimClient`] first waits on a `governor` limiter.
//! Transient failures (network errors, 429, 5xx) are retried according to a
//! [`RetryPolicy`]. "Nothing found" is `Ok(None)`; only transport and payload
//! problems are errors, and callers are expected to skip the candidate either way.

use std::future::Future;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use tracing_futures::Instrument;

use cinemap_core::coordinates::Coordinates;

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const USER_AGENT: &str = "Closest films locator.";

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("geocoder returned unusable coordinates ({lat}, {lon})")]
    BadCoordinates { lat: String, lon: String },
}

impl GeocodeError {
    /// Connection problems, 429 and 5xx may go away on their own.
    pub fn is_transient(&self) -> bool {
        match self {
            GeocodeError::Http(err) => !err.is_decode(),
            GeocodeError::UnexpectedStatus { status, .. } => {
                *status == 429 || (500..600).contains(status)
            }
            GeocodeError::BadCoordinates { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub coords: Coordinates,
    /// Comma separated, most specific part first.
    pub address: String,
}

#[allow(async_fn_in_trait)]
pub trait Geocoder {
    async fn geocode(&self, query: &str) -> Result<Option<Place>, GeocodeError>;
    async fn reverse(&self, coords: Coordinates) -> Result<Option<Place>, GeocodeError>;
}

/// Allows one call per `min_delay`. A zero delay never waits.
pub struct CallSpacing {
    limiter: Option<DefaultDirectRateLimiter>,
}

impl CallSpacing {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            limiter: Quota::with_period(min_delay).map(RateLimiter::direct),
        }
    }

    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

/// How often a transient failure is retried, and how long to wait first.
/// The wait doubles after each retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub error_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            error_wait: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            error_wait: Duration::ZERO,
        }
    }

    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, GeocodeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GeocodeError>>,
    {
        let mut attempt = 0u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let delay = self
                        .error_wait
                        .saturating_mul(1u32 << attempt.min(31));
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        ?delay,
                        error = %err,
                        "transient geocoder error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

impl NominatimPlace {
    fn into_place(self) -> Result<Place, GeocodeError> {
        let coords = match (self.lat.parse::<f64>(), self.lon.parse::<f64>()) {
            (Ok(lat), Ok(lon)) => Coordinates::new(lat, lon).ok(),
            _ => None,
        };
        match coords {
            Some(coords) => Ok(Place {
                coords,
                address: self.display_name,
            }),
            None => Err(GeocodeError::BadCoordinates {
                lat: self.lat,
                lon: self.lon,
            }),
        }
    }
}

/// `/reverse` answers `{"error": "Unable to geocode"}` with a 200 when it has nothing.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReverseResponse {
    Found(NominatimPlace),
    Missing {
        #[allow(dead_code)]
        error: String,
    },
}

pub struct NominatimClient {
    http: reqwest::Client,
    base_url: String,
    spacing: CallSpacing,
    retry: RetryPolicy,
}

impl NominatimClient {
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        min_delay: Duration,
    ) -> Result<Self, GeocodeError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            spacing: CallSpacing::new(min_delay),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, GeocodeError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        self.retry.run(|| self.fetch(&url, params)).await
    }

    async fn fetch<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, GeocodeError> {
        self.spacing.wait().await;
        let resp = self
            .http
            .get(url)
            .query(params)
            .query(&[("format", "jsonv2"), ("accept-language", "en")])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GeocodeError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.json::<T>().await?)
    }
}

impl Geocoder for NominatimClient {
    async fn geocode(&self, query: &str) -> Result<Option<Place>, GeocodeError> {
        let params = [("q", query.to_string()), ("limit", "1".to_string())];
        let places = self
            .get::<Vec<NominatimPlace>>("search", &params)
            .instrument(tracing::debug_span!("geocode", query))
            .await?;
        debug!("{} candidate(s)", places.len());
        places.into_iter().next().map(NominatimPlace::into_place).transpose()
    }

    async fn reverse(&self, coords: Coordinates) -> Result<Option<Place>, GeocodeError> {
        let params = [("lat", coords.lat.to_string()), ("lon", coords.lon.to_string())];
        let resp = self
            .get::<ReverseResponse>("reverse", &params)
            .instrument(tracing::debug_span!("reverse", %coords))
            .await?;
        match resp {
            ReverseResponse::Found(place) => place.into_place().map(Some),
            ReverseResponse::Missing { .. } => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    use super::*;

    #[tokio::test]
    async fn spacing_delays_later_calls() {
        let spacing = CallSpacing::new(Duration::from_millis(100));
        let start = Instant::now();
        spacing.wait().await;
        assert!(start.elapsed() < Duration::from_millis(50));
        spacing.wait().await;
        spacing.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(190));
    }

    #[tokio::test]
    async fn spacing_does_not_wait_after_idle_time() {
        let spacing = CallSpacing::new(Duration::from_millis(100));
        spacing.wait().await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        let before = Instant::now();
        spacing.wait().await;
        assert!(before.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn zero_delay_never_waits() {
        let spacing = CallSpacing::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..100 {
            spacing.wait().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    fn status(status: u16) -> GeocodeError {
        GeocodeError::UnexpectedStatus {
            status,
            url: "http://geocoder.test/search".to_string(),
        }
    }

    #[test]
    fn transient_statuses() {
        assert!(status(429).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(404).is_transient());
        assert!(!GeocodeError::BadCoordinates {
            lat: "x".to_string(),
            lon: "y".to_string()
        }
        .is_transient());
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_with_growing_waits() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy {
            max_retries: 2,
            error_wait: Duration::from_secs(5),
        };
        let start = tokio::time::Instant::now();
        let res = policy
            .run(move || async move {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err(status(503)),
                    _ => Ok("found"),
                }
            })
            .await;
        assert_eq!(res.unwrap(), "found");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let calls = &AtomicU32::new(0);
        let res: Result<(), _> = RetryPolicy::default()
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(status(429))
            })
            .await;
        assert!(matches!(res, Err(GeocodeError::UnexpectedStatus { status: 429, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let res: Result<(), _> = RetryPolicy::default()
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(status(404))
            })
            .await;
        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn rejects_unparsable_coordinates() {
        let place = NominatimPlace {
            lat: "north".to_string(),
            lon: "24.0".to_string(),
            display_name: "Somewhere".to_string(),
        };
        assert!(matches!(
            place.into_place(),
            Err(GeocodeError::BadCoordinates { .. })
        ));
    }
}
