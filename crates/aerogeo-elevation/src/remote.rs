use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ElevationError;
use crate::sample::{ElevationOrigin, ElevationSample, GeoPoint};
use crate::ElevationSampler;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

// Cache cells of about a meter; refinement iterations re-query nearby
// points and must not trigger fresh requests for them.
const CACHE_CELL_DEG: f64 = 1e-5;

#[derive(Serialize)]
struct LookupRequest {
    locations: Vec<Location>,
}

#[derive(Serialize)]
struct Location {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct LookupResponse {
    results: Vec<LookupResult>,
}

#[derive(Deserialize)]
struct LookupResult {
    elevation: Option<f64>,
}

/// Elevation from an Open-Elevation-compatible query service.
///
/// Batches lookups where possible, retries transient failures with backoff
/// and a hard timeout per request, and caches results per geographic cell
/// for the lifetime of the run. After retry exhaustion a query resolves as
/// unavailable; a remote outage never fails the run. The cache lock also
/// serializes requests, keeping a single query in flight per instance so
/// provider rate limits are respected.
pub struct RemoteElevation {
    endpoint: String,
    client: reqwest::blocking::Client,
    cache: Mutex<HashMap<(i64, i64), Option<f64>>>,
}

impl RemoteElevation {
    /// Create a client for the lookup endpoint of an Open-Elevation-style
    /// service, e.g. `https://api.open-elevation.com/api/v1/lookup`.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ElevationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn cache_key(point: GeoPoint) -> (i64, i64) {
        (
            (point.lon / CACHE_CELL_DEG).round() as i64,
            (point.lat / CACHE_CELL_DEG).round() as i64,
        )
    }

    fn lookup(&self, points: &[GeoPoint]) -> Option<Vec<Option<f64>>> {
        let request = LookupRequest {
            locations: points
                .iter()
                .map(|p| Location {
                    latitude: p.lat,
                    longitude: p.lon,
                })
                .collect(),
        };

        for attempt in 1..=MAX_ATTEMPTS {
            match self.try_lookup(&request) {
                Ok(elevations) if elevations.len() == points.len() => return Some(elevations),
                Ok(elevations) => {
                    log::warn!(
                        "elevation service returned {} results for {} points",
                        elevations.len(),
                        points.len()
                    );
                    return None;
                }
                Err(err) => {
                    log::warn!("elevation lookup attempt {attempt}/{MAX_ATTEMPTS} failed: {err}");
                    if attempt < MAX_ATTEMPTS {
                        std::thread::sleep(RETRY_BACKOFF * attempt);
                    }
                }
            }
        }
        None
    }

    fn try_lookup(&self, request: &LookupRequest) -> Result<Vec<Option<f64>>, reqwest::Error> {
        let response: LookupResponse = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(response.results.into_iter().map(|r| r.elevation).collect())
    }
}

impl ElevationSampler for RemoteElevation {
    fn sample(&self, point: GeoPoint) -> ElevationSample {
        self.sample_many(std::slice::from_ref(&point))
            .pop()
            .unwrap_or_else(|| ElevationSample::unavailable(point, ElevationOrigin::RemoteService))
    }

    fn sample_many(&self, points: &[GeoPoint]) -> Vec<ElevationSample> {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let misses: Vec<GeoPoint> = points
            .iter()
            .copied()
            .filter(|p| !cache.contains_key(&Self::cache_key(*p)))
            .collect();

        if !misses.is_empty() {
            match self.lookup(&misses) {
                Some(elevations) => {
                    for (point, elevation) in misses.iter().zip(elevations) {
                        cache.insert(Self::cache_key(*point), elevation);
                    }
                }
                None => {
                    // Negative-cache the failures so a flaky service is not
                    // hammered once per refinement iteration.
                    for point in &misses {
                        cache.insert(Self::cache_key(*point), None);
                    }
                }
            }
        }

        points
            .iter()
            .map(|&point| {
                let meters = cache.get(&Self::cache_key(point)).copied().flatten();
                ElevationSample {
                    point,
                    meters,
                    origin: ElevationOrigin::RemoteService,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_quantizes() {
        let a = RemoteElevation::cache_key(GeoPoint::new(-122.000001, 45.000001));
        let b = RemoteElevation::cache_key(GeoPoint::new(-122.000002, 45.000002));
        let c = RemoteElevation::cache_key(GeoPoint::new(-122.1, 45.1));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn unreachable_service_degrades_to_unavailable() {
        // Nothing listens on this port; all attempts fail fast.
        let remote = RemoteElevation::new("http://127.0.0.1:9/api/v1/lookup").unwrap();
        let samples = remote.sample_many(&[GeoPoint::new(-122.0, 45.0)]);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].meters, None);
        assert_eq!(samples[0].origin, ElevationOrigin::RemoteService);
    }
}
