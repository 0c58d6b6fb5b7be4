//! Island explorer map core.
//!
//! Keeps marker elements in step with the viewport, owns the single info
//! popup, the itinerary and its drawn route, and holds the camera steady
//! across layout changes. Engine, routing service and spot data are
//! reached only through their contracts in the `engine`, `routing` and
//! `catalog` crates.

pub mod config;
pub mod itinerary;
pub mod markers;
pub mod popup;
pub mod route_sync;
pub mod transition;
pub mod view;

pub use config::{ConfigError, ExplorerConfig};
pub use itinerary::{Itinerary, ItineraryChange, SubscriptionId};
pub use markers::{LinearScan, MarkerEntry, MarkerLifecycle, SyncReport, VisibilityIndex};
pub use popup::{PopupController, PopupPhase};
pub use route_sync::{ROUTE_SOURCE, RouteJob, RouteOutcome, RouteSync, Spawner, TokioLocalSpawner};
pub use transition::{CameraSnapshot, TransitionAction, TransitionController, TransitionKind};
pub use view::{MapView, REGION_MASK_SOURCE};
