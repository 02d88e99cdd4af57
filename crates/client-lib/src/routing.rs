// ============================
// crates/client-lib/src/routing.rs
// ============================
//! Route resolution as an ordered chain of strategies.
//!
//! Each strategy returns a result-or-failure value; the resolver takes the
//! first success and falls back to the straight-line strategy as a
//! guaranteed last resort, so the route view is never empty when both
//! endpoints are known. Upstream failures are absorbed here and never
//! surface to the user.

use crate::geo::{estimate_travel, haversine_km, LatLng, TransportMode, TravelEstimate};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Bound on any single routing request
pub const ROUTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Which strategy produced a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource {
    OpenRouteService,
    StraightLine,
}

/// A displayable path between two points. Always at least two points.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub points: Vec<LatLng>,
    pub estimate: TravelEstimate,
    pub source: RouteSource,
}

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("routing request timed out")]
    Timeout,
    #[error("routing service returned status {0}")]
    Upstream(u16),
    #[error("malformed routing response: {0}")]
    Malformed(String),
    #[error("network error: {0}")]
    Network(String),
}

#[async_trait]
pub trait RouteStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn resolve(&self, origin: LatLng, destination: LatLng) -> Result<Route, RouteError>;
}

/// OpenRouteService directions API
pub struct OpenRouteStrategy {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct DirectionsResponse {
    features: Vec<DirectionsFeature>,
}

#[derive(Deserialize)]
struct DirectionsFeature {
    geometry: DirectionsGeometry,
    properties: DirectionsProperties,
}

#[derive(Deserialize)]
struct DirectionsGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Deserialize)]
struct DirectionsProperties {
    summary: DirectionsSummary,
}

#[derive(Deserialize)]
struct DirectionsSummary {
    /// meters
    distance: f64,
    /// seconds
    duration: f64,
}

impl OpenRouteStrategy {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url("https://api.openrouteservice.org", api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl RouteStrategy for OpenRouteStrategy {
    fn name(&self) -> &'static str {
        "openrouteservice"
    }

    async fn resolve(&self, origin: LatLng, destination: LatLng) -> Result<Route, RouteError> {
        let url = format!("{}/v2/directions/driving-car/geojson", self.base_url);
        let body = serde_json::json!({
            "coordinates": [
                [origin.lng, origin.lat],
                [destination.lng, destination.lat],
            ],
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", &self.api_key)
            .json(&body)
            .timeout(ROUTE_TIMEOUT)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    RouteError::Timeout
                } else {
                    RouteError::Network(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RouteError::Upstream(status.as_u16()));
        }

        let directions: DirectionsResponse = response
            .json()
            .await
            .map_err(|err| RouteError::Malformed(err.to_string()))?;

        let feature = directions
            .features
            .into_iter()
            .next()
            .ok_or_else(|| RouteError::Malformed("no route in response".to_string()))?;

        let points: Vec<LatLng> = feature
            .geometry
            .coordinates
            .iter()
            .map(|&[lng, lat]| LatLng::new(lat, lng))
            .collect();
        if points.len() < 2 {
            return Err(RouteError::Malformed("route has fewer than 2 points".to_string()));
        }

        Ok(Route {
            points,
            estimate: TravelEstimate::from_measures(
                feature.properties.summary.distance,
                feature.properties.summary.duration,
            ),
            source: RouteSource::OpenRouteService,
        })
    }
}

/// Infallible last resort: the straight segment between the two endpoints
pub struct StraightLineStrategy {
    mode: TransportMode,
}

impl StraightLineStrategy {
    pub fn new(mode: TransportMode) -> Self {
        Self { mode }
    }

    pub fn route(&self, origin: LatLng, destination: LatLng) -> Route {
        let km = haversine_km(origin, destination);
        Route {
            points: vec![origin, destination],
            estimate: estimate_travel(km, self.mode),
            source: RouteSource::StraightLine,
        }
    }
}

impl Default for StraightLineStrategy {
    fn default() -> Self {
        Self::new(TransportMode::default())
    }
}

#[async_trait]
impl RouteStrategy for StraightLineStrategy {
    fn name(&self) -> &'static str {
        "straight-line"
    }

    async fn resolve(&self, origin: LatLng, destination: LatLng) -> Result<Route, RouteError> {
        Ok(self.route(origin, destination))
    }
}

/// Tries strategies in order; the straight-line fallback is unconditional.
pub struct RouteResolver {
    strategies: Vec<Box<dyn RouteStrategy>>,
    fallback: StraightLineStrategy,
}

impl RouteResolver {
    pub fn new(strategies: Vec<Box<dyn RouteStrategy>>) -> Self {
        Self {
            strategies,
            fallback: StraightLineStrategy::default(),
        }
    }

    /// Straight-line only; used when no routing service is configured
    pub fn offline() -> Self {
        Self::new(Vec::new())
    }

    pub async fn resolve(&self, origin: LatLng, destination: LatLng) -> Route {
        for strategy in &self.strategies {
            match strategy.resolve(origin, destination).await {
                Ok(route) => {
                    tracing::debug!(strategy = strategy.name(), "route resolved");
                    return route;
                }
                Err(err) => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        error = %err,
                        "routing strategy failed, trying next"
                    );
                }
            }
        }
        self.fallback.route(origin, destination)
    }
}

/// One displayed route, updated last-request-wins. A request that is
/// superseded while in flight has its response discarded.
pub struct RouteSlot {
    generation: Arc<AtomicU64>,
    tx: watch::Sender<Option<Route>>,
}

impl RouteSlot {
    pub fn new() -> (Self, watch::Receiver<Option<Route>>) {
        let (tx, rx) = watch::channel(None);
        (
            Self {
                generation: Arc::new(AtomicU64::new(0)),
                tx,
            },
            rx,
        )
    }

    /// Kick off a resolution; the slot updates when (and only if) this is
    /// still the newest request by the time it completes.
    pub fn request(&self, resolver: Arc<RouteResolver>, origin: LatLng, destination: LatLng) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.generation);
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let route = resolver.resolve(origin, destination).await;
            if latest.load(Ordering::SeqCst) == generation {
                let _ = tx.send(Some(route));
            } else {
                tracing::debug!("stale route response discarded");
            }
        });
    }

    /// Clear the displayed route and invalidate any in-flight request.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let _ = self.tx.send(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStrategy;

    #[async_trait]
    impl RouteStrategy for FailingStrategy {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn resolve(
            &self,
            _origin: LatLng,
            _destination: LatLng,
        ) -> Result<Route, RouteError> {
            Err(RouteError::Upstream(503))
        }
    }

    struct SlowStrategy {
        delay: Duration,
    }

    #[async_trait]
    impl RouteStrategy for SlowStrategy {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn resolve(
            &self,
            origin: LatLng,
            destination: LatLng,
        ) -> Result<Route, RouteError> {
            tokio::time::sleep(self.delay).await;
            Ok(StraightLineStrategy::default().route(origin, destination))
        }
    }

    fn endpoints() -> (LatLng, LatLng) {
        (LatLng::new(19.10, 72.90), LatLng::new(19.0760, 72.8777))
    }

    #[tokio::test]
    async fn test_fallback_endpoints_equal_inputs() {
        let (origin, destination) = endpoints();
        let resolver = RouteResolver::new(vec![Box::new(FailingStrategy)]);

        let route = resolver.resolve(origin, destination).await;
        assert_eq!(route.source, RouteSource::StraightLine);
        assert_eq!(route.points.len(), 2);
        assert_eq!(route.points[0], origin);
        assert_eq!(route.points[1], destination);
    }

    struct TimingOutStrategy;

    #[async_trait]
    impl RouteStrategy for TimingOutStrategy {
        fn name(&self) -> &'static str {
            "timing-out"
        }

        async fn resolve(
            &self,
            _origin: LatLng,
            _destination: LatLng,
        ) -> Result<Route, RouteError> {
            Err(RouteError::Timeout)
        }
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_straight_segment() {
        let (origin, destination) = endpoints();
        let resolver = RouteResolver::new(vec![Box::new(TimingOutStrategy)]);

        let route = resolver.resolve(origin, destination).await;
        assert_eq!(route.source, RouteSource::StraightLine);
        assert_eq!(route.points, vec![origin, destination]);
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let (origin, destination) = endpoints();
        let resolver = RouteResolver::new(vec![
            Box::new(FailingStrategy),
            Box::new(SlowStrategy {
                delay: Duration::ZERO,
            }),
        ]);

        let route = resolver.resolve(origin, destination).await;
        // the second strategy answered; the chain stopped there
        assert_eq!(route.points.len(), 2);
    }

    #[tokio::test]
    async fn test_offline_resolver_always_yields_route() {
        let (origin, destination) = endpoints();
        let route = RouteResolver::offline().resolve(origin, destination).await;
        assert_eq!(route.source, RouteSource::StraightLine);
        assert!(route.estimate.distance_m > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_slot_last_request_wins() {
        let (origin_a, destination) = endpoints();
        let origin_b = LatLng::new(20.0, 73.0);

        let (slot, mut rx) = RouteSlot::new();
        let slow = Arc::new(RouteResolver::new(vec![Box::new(SlowStrategy {
            delay: Duration::from_secs(5),
        })]));
        let fast = Arc::new(RouteResolver::offline());

        slot.request(slow, origin_a, destination);
        slot.request(fast, origin_b, destination);

        rx.changed().await.unwrap();
        let first = rx.borrow_and_update().clone().unwrap();
        assert_eq!(first.points[0], origin_b);

        // let the superseded request finish; it must not overwrite
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(rx.borrow().clone().unwrap().points[0], origin_b);
    }

    #[tokio::test]
    async fn test_route_slot_clear() {
        let (origin, destination) = endpoints();
        let (slot, mut rx) = RouteSlot::new();

        slot.request(Arc::new(RouteResolver::offline()), origin, destination);
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_some());

        slot.clear();
        assert!(rx.borrow().is_none());
    }
}
