//! Routing service contract: path geometry between two coordinates.
//!
//! The explorer never retries; a failed segment is simply absent from the
//! drawn route.

pub mod osrm;
pub mod straight;

pub use osrm::*;
pub use straight::*;

use std::future::Future;
use std::pin::Pin;

use foundation::geo::LonLat;
use serde::{Deserialize, Serialize};

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Path between two consecutive itinerary stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub coordinates: Vec<LonLat>,
}

impl RouteSegment {
    pub fn new(coordinates: Vec<LonLat>) -> Self {
        Self { coordinates }
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }
}

#[derive(Debug)]
pub enum RoutingError {
    Http(reqwest::Error),
    Status(u16),
    /// The service answered but found no path (OSRM `NoRoute`, empty geometry).
    NoRoute(String),
    Decode(String),
}

impl std::fmt::Display for RoutingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutingError::Http(e) => write!(f, "routing request failed: {e}"),
            RoutingError::Status(code) => write!(f, "routing service returned HTTP {code}"),
            RoutingError::NoRoute(msg) => write!(f, "no route: {msg}"),
            RoutingError::Decode(msg) => write!(f, "unreadable routing response: {msg}"),
        }
    }
}

impl std::error::Error for RoutingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RoutingError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RoutingError {
    fn from(e: reqwest::Error) -> Self {
        RoutingError::Http(e)
    }
}

/// Computes a path between two coordinates.
///
/// Implementations must be `Send + Sync`; methods return boxed futures for
/// dyn-compatibility.
pub trait RoutingService: Send + Sync {
    fn route(&self, from: LonLat, to: LonLat) -> BoxFuture<'_, Result<RouteSegment, RoutingError>>;
}
