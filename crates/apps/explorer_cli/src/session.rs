//! Scripted session over a headless map.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use catalog::SpotCollection;
use engine::{CameraState, EngineEvent, HeadlessMap, MapEngine, SharedEngine};
use explorer::{ExplorerConfig, MapView, ROUTE_SOURCE, RouteOutcome, Spawner, TransitionAction};
use foundation::ids::{SourceId, SpotId};
use foundation::time::Time;
use routing::RoutingService;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::info;

const VIEWPORT: [f64; 2] = [1280.0, 800.0];
const FULLSCREEN_VIEWPORT: [f64; 2] = [1600.0, 900.0];

/// Spawns route jobs on the local set and keeps their handles so the
/// session can wait for routing to finish.
#[derive(Default)]
struct TrackingSpawner {
    handles: RefCell<Vec<JoinHandle<()>>>,
}

impl Spawner for TrackingSpawner {
    fn spawn(&self, task: Pin<Box<dyn Future<Output = ()>>>) {
        self.handles.borrow_mut().push(tokio::task::spawn_local(task));
    }
}

impl TrackingSpawner {
    async fn join_all(&self) -> usize {
        let handles = std::mem::take(&mut *self.handles.borrow_mut());
        let n = handles.len();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "route job panicked");
            }
        }
        n
    }
}

#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub fingerprint: Option<String>,
    pub spots: usize,
    pub skipped: u64,
    pub visible_at_start: Vec<SpotId>,
    pub popup: Option<SpotId>,
    pub itinerary: Vec<SpotId>,
    pub itinerary_summary: String,
    pub route_jobs: usize,
    pub route: Option<String>,
    pub route_parts: usize,
    pub camera_before: CameraState,
    pub camera_after: CameraState,
    pub transitions: Vec<TransitionAction>,
    pub visible_at_end: Vec<SpotId>,
    pub counters: Vec<(&'static str, u64)>,
    pub events: Vec<EventLine>,
}

#[derive(Debug, Serialize)]
pub struct EventLine {
    pub at_ms: u64,
    pub kind: &'static str,
    pub message: String,
}

/// Moves virtual time to the view's next deadline and ticks it.
fn advance(view: &mut MapView, now: &mut Time) -> Vec<TransitionAction> {
    if let Some(deadline) = view.next_deadline() {
        *now = (*now).max(deadline);
    }
    view.tick(*now)
}

pub async fn run_session(
    config: ExplorerConfig,
    collection: SpotCollection,
    router: Arc<dyn RoutingService>,
    stops: usize,
) -> SessionReport {
    let mut now = Time::ZERO;
    let map = Rc::new(RefCell::new(HeadlessMap::new(
        config.initial_camera,
        VIEWPORT[0],
        VIEWPORT[1],
    )));
    let shared: SharedEngine = map.clone();
    let spawner = Rc::new(TrackingSpawner::default());
    let spot_count = collection.spots.len();

    let mut view = MapView::init(shared, config, collection.spots, router, spawner.clone(), now);
    let camera_before = map.borrow().camera();
    let visible_at_start = view.visible_spots();
    info!(visible = visible_at_start.len(), "session started");

    // Click the first visible marker, let the popup finish opening, settle.
    let first_marker = visible_at_start
        .first()
        .and_then(|id| view.markers().entry(id))
        .map(|entry| entry.handle);
    if let Some(handle) = first_marker {
        view.handle_event(EngineEvent::MarkerClicked(handle), now);
        advance(&mut view, &mut now);
        view.handle_event(EngineEvent::CameraSettled, now);
        advance(&mut view, &mut now);
        view.add_from_popup(now);
    }
    for id in visible_at_start.iter().take(stops) {
        view.add_to_itinerary(id, now);
    }
    let route_jobs = spawner.join_all().await;
    let route = view.route().last_applied().map(|outcome| match outcome {
        RouteOutcome::Cleared => "cleared".to_string(),
        RouteOutcome::Rendered { segments, failed } => {
            format!("{segments} segment(s), {failed} failed")
        }
        RouteOutcome::Superseded => "superseded".to_string(),
    });
    let route_parts = map
        .borrow()
        .feature(&SourceId::new(ROUTE_SOURCE))
        .map_or(0, |f| f.part_count());

    // Go fullscreen: the container grows once the layout animation ends.
    let camera_at_toggle = map.borrow().camera();
    view.toggle_fullscreen(now);
    map.borrow_mut()
        .set_container_size(FULLSCREEN_VIEWPORT[0], FULLSCREEN_VIEWPORT[1]);
    let mut transitions = Vec::new();
    while view.transition().next_deadline().is_some() {
        transitions.extend(advance(&mut view, &mut now));
    }
    let camera_after = map.borrow().camera();
    if !camera_after.approx_eq(&camera_at_toggle, 1e-9) {
        tracing::warn!("camera drifted across the fullscreen transition");
    }

    let report = SessionReport {
        fingerprint: collection.fingerprint,
        spots: spot_count,
        skipped: view.metrics().counter("spots.skipped"),
        visible_at_start,
        popup: view.popup().target().cloned(),
        itinerary: view.itinerary().entries().iter().map(|s| s.id.clone()).collect(),
        itinerary_summary: view.itinerary().summary(),
        route_jobs,
        route,
        route_parts,
        camera_before,
        camera_after,
        transitions,
        visible_at_end: view.visible_spots(),
        counters: view.metrics().snapshot().counters,
        events: view
            .events()
            .events()
            .iter()
            .map(|e| EventLine {
                at_ms: e.at.as_millis(),
                kind: e.kind,
                message: e.message.clone(),
            })
            .collect(),
    };
    view.dispose();
    report
}

#[cfg(test)]
mod tests {
    use super::run_session;
    use catalog::{Category, Spot, SpotCollection};
    use explorer::ExplorerConfig;
    use foundation::geo::LonLat;
    use routing::StraightLineRouter;
    use std::sync::Arc;

    fn collection() -> SpotCollection {
        let mut broken = Spot::new("Lost Cove", LonLat::new(0.0, 0.0));
        broken.coordinates = None;
        SpotCollection {
            spots: vec![
                Spot::new("Binurong Point", LonLat::new(124.3067, 13.8667))
                    .with_images(["1.jpg", "2.jpg", "3.jpg", "4.jpg"]),
                Spot::new("Puraran Beach", LonLat::new(124.4021, 13.6898))
                    .with_categories([Category::Beach]),
                Spot::new("Maribina Falls", LonLat::new(124.1886, 13.6317))
                    .with_categories([Category::Waterfall]),
                broken,
            ],
            fingerprint: Some("abc".to_string()),
        }
    }

    #[tokio::test]
    async fn scripted_session_routes_and_restores_camera() {
        let local = tokio::task::LocalSet::new();
        let report = local
            .run_until(run_session(
                ExplorerConfig::default(),
                collection(),
                Arc::new(StraightLineRouter),
                3,
            ))
            .await;

        assert_eq!(report.spots, 4);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.visible_at_start.len(), 3);
        assert_eq!(report.itinerary.len(), 3);
        assert_eq!(report.itinerary_summary, "3 places added");
        assert_eq!(report.route.as_deref(), Some("2 segment(s), 0 failed"));
        assert_eq!(report.route_parts, 2);
        assert_eq!(report.transitions.len(), 1);
        assert!(report.events.iter().any(|e| e.kind == "spot"));
        assert!(report.counters.contains(&("spots.skipped", 1)));
    }
}
