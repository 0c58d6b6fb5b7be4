use std::time::Duration;

use foundation::geo::LonLat;
use serde::Deserialize;
use tracing::debug;

use crate::{BoxFuture, RouteSegment, RoutingError, RoutingService};

pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org";

/// Client for an OSRM-compatible `/route/v1` endpoint.
#[derive(Debug, Clone)]
pub struct OsrmRouter {
    http: reqwest::Client,
    base_url: String,
    profile: String,
}

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout: Duration,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OSRM_URL.to_string(),
            profile: "driving".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<[f64; 2]>,
}

impl OsrmRouter {
    pub fn new(config: OsrmConfig) -> Result<Self, RoutingError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(http, config.base_url, config.profile))
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        profile: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            profile: profile.into(),
        }
    }

    pub fn route_url(&self, from: LonLat, to: LonLat) -> String {
        format!(
            "{}/route/v1/{}/{},{};{},{}?overview=full&geometries=geojson",
            self.base_url.trim_end_matches('/'),
            self.profile,
            from.lon,
            from.lat,
            to.lon,
            to.lat
        )
    }

    async fn fetch(&self, from: LonLat, to: LonLat) -> Result<RouteSegment, RoutingError> {
        let url = self.route_url(from, to);
        debug!(%url, "requesting route segment");
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        // OSRM answers NoRoute with a 400 and a JSON body; prefer the body when it parses.
        match parse_route_response(&body) {
            Ok(segment) => Ok(segment),
            Err(RoutingError::Decode(_)) if !status.is_success() => {
                Err(RoutingError::Status(status.as_u16()))
            }
            Err(e) => Err(e),
        }
    }
}

impl RoutingService for OsrmRouter {
    fn route(&self, from: LonLat, to: LonLat) -> BoxFuture<'_, Result<RouteSegment, RoutingError>> {
        Box::pin(self.fetch(from, to))
    }
}

/// Decodes an OSRM route response into the first route's line geometry.
pub fn parse_route_response(body: &str) -> Result<RouteSegment, RoutingError> {
    let resp: OsrmResponse =
        serde_json::from_str(body).map_err(|e| RoutingError::Decode(e.to_string()))?;
    if resp.code != "Ok" {
        return Err(RoutingError::NoRoute(resp.message.unwrap_or(resp.code)));
    }
    let route = resp
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| RoutingError::NoRoute("response contained no routes".to_string()))?;
    if route.geometry.kind != "LineString" {
        return Err(RoutingError::Decode(format!(
            "unexpected geometry type {}",
            route.geometry.kind
        )));
    }
    let coordinates: Vec<LonLat> = route
        .geometry
        .coordinates
        .into_iter()
        .map(LonLat::from)
        .collect();
    if coordinates.is_empty() {
        return Err(RoutingError::NoRoute("empty geometry".to_string()));
    }
    Ok(RouteSegment::new(coordinates))
}
