//! Keeps the drawn itinerary route in step with the itinerary.
//!
//! Every itinerary change bumps a generation synchronously and yields a
//! [`RouteJob`] carrying the new token. The job requests one segment per
//! consecutive stop pair, strictly in order and one at a time, then swaps the
//! route feature (remove, then add) only if its token is still current. A job
//! overtaken by a newer change finishes as [`RouteOutcome::Superseded`] and
//! touches nothing.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use catalog::Spot;
use engine::{Feature, SharedEngine};
use foundation::geo::LonLat;
use foundation::ids::{SourceId, SpotId};
use routing::{RouteSegment, RoutingService};
use runtime::{Generation, GenerationToken};
use tracing::{debug, warn};

pub const ROUTE_SOURCE: &str = "itinerary-route";

#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// Fewer than two stops; any previous route was removed.
    Cleared,
    /// `segments` pairs were drawn, `failed` pairs were left out.
    Rendered { segments: usize, failed: usize },
    /// A newer itinerary change started another job; nothing was applied.
    Superseded,
}

#[derive(Debug, Default)]
struct RouteState {
    generation: Generation,
    drawn: bool,
    last_applied: Option<RouteOutcome>,
}

/// Owner of the route feature. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RouteSync {
    engine: SharedEngine,
    router: Arc<dyn RoutingService>,
    source: SourceId,
    state: Rc<RefCell<RouteState>>,
}

impl RouteSync {
    pub fn new(engine: SharedEngine, router: Arc<dyn RoutingService>) -> Self {
        Self {
            engine,
            router,
            source: SourceId::new(ROUTE_SOURCE),
            state: Rc::default(),
        }
    }

    pub fn source(&self) -> &SourceId {
        &self.source
    }

    /// Invalidates any in-flight job and returns the job for `stops`, or
    /// `None` when there is nothing to draw and nothing to clear.
    pub fn on_itinerary_changed(&self, stops: &[Spot]) -> Option<RouteJob> {
        let mut state = self.state.borrow_mut();
        let token = state.generation.bump();
        if stops.len() < 2 && !state.drawn {
            debug!(generation = token.0, "route: nothing to draw");
            return None;
        }
        Some(RouteJob {
            token,
            stops: stops
                .iter()
                .map(|s| (s.id.clone(), s.valid_coordinates().ok()))
                .collect(),
            sync: self.clone(),
        })
    }

    /// Invalidates any in-flight job without starting a new one.
    pub fn cancel(&self) {
        self.state.borrow_mut().generation.bump();
    }

    /// Removes the drawn route, if any. In-flight jobs are invalidated.
    pub fn clear(&self) -> bool {
        self.cancel();
        let mut state = self.state.borrow_mut();
        state.drawn = false;
        self.engine.borrow_mut().remove_feature(&self.source)
    }

    pub fn generation(&self) -> GenerationToken {
        self.state.borrow().generation.token()
    }

    /// Outcome of the most recent job that reached the map.
    pub fn last_applied(&self) -> Option<RouteOutcome> {
        self.state.borrow().last_applied.clone()
    }

    fn is_current(&self, token: GenerationToken) -> bool {
        self.state.borrow().generation.is_current(token)
    }

    fn apply(
        &self,
        token: GenerationToken,
        segments: Vec<RouteSegment>,
        outcome: RouteOutcome,
    ) -> RouteOutcome {
        let mut state = self.state.borrow_mut();
        if !state.generation.is_current(token) {
            debug!(
                captured = token.0,
                current = state.generation.token().0,
                "route: discarding stale result"
            );
            return RouteOutcome::Superseded;
        }
        let mut engine = self.engine.borrow_mut();
        engine.remove_feature(&self.source);
        state.drawn = !segments.is_empty();
        if state.drawn {
            let parts = segments.into_iter().map(|s| s.coordinates).collect();
            engine.add_feature(self.source.clone(), Feature::MultiLine(parts));
        }
        state.last_applied = Some(outcome.clone());
        outcome
    }
}

/// One recomputation of the route for a fixed list of stops.
pub struct RouteJob {
    token: GenerationToken,
    stops: Vec<(SpotId, Option<LonLat>)>,
    sync: RouteSync,
}

impl RouteJob {
    pub fn token(&self) -> GenerationToken {
        self.token
    }

    pub async fn run(self) -> RouteOutcome {
        if self.stops.len() < 2 {
            return self.sync.apply(self.token, Vec::new(), RouteOutcome::Cleared);
        }

        let mut segments = Vec::new();
        let mut failed = 0;
        for (i, pair) in self.stops.windows(2).enumerate() {
            if !self.sync.is_current(self.token) {
                debug!(generation = self.token.0, pair = i, "route: superseded before request");
                return RouteOutcome::Superseded;
            }
            let ((from_id, from), (to_id, to)) = (&pair[0], &pair[1]);
            let (Some(from), Some(to)) = (*from, *to) else {
                warn!(pair = i, from = %from_id, to = %to_id, "route: stop without position");
                failed += 1;
                continue;
            };
            match self.sync.router.route(from, to).await {
                Ok(segment) if !segment.is_empty() => segments.push(segment),
                Ok(_) => {
                    warn!(pair = i, from = %from_id, to = %to_id, "route: empty segment");
                    failed += 1;
                }
                Err(e) => {
                    warn!(pair = i, from = %from_id, to = %to_id, error = %e, "route: segment failed");
                    failed += 1;
                }
            }
        }

        let outcome = RouteOutcome::Rendered {
            segments: segments.len(),
            failed,
        };
        self.sync.apply(self.token, segments, outcome)
    }
}

/// Runs route jobs on the UI thread's executor.
pub trait Spawner {
    fn spawn(&self, task: Pin<Box<dyn Future<Output = ()>>>);
}

/// Spawns onto the current `tokio::task::LocalSet`. Must be used from
/// inside one.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioLocalSpawner;

impl Spawner for TokioLocalSpawner {
    fn spawn(&self, task: Pin<Box<dyn Future<Output = ()>>>) {
        tokio::task::spawn_local(task);
    }
}

#[cfg(test)]
mod tests {
    use super::{ROUTE_SOURCE, RouteOutcome, RouteSync};
    use catalog::Spot;
    use engine::{CameraState, Feature, HeadlessMap, Op, SharedEngine};
    use foundation::geo::LonLat;
    use foundation::ids::SourceId;
    use pretty_assertions::assert_eq;
    use routing::{BoxFuture, RouteSegment, RoutingError, RoutingService};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};
    use tokio::sync::oneshot;
    use tokio::task::LocalSet;

    const A: LonLat = LonLat::new(124.2301, 13.5833);
    const B: LonLat = LonLat::new(124.3067, 13.8667);
    const C: LonLat = LonLat::new(124.4021, 13.6898);

    fn stops(points: &[(&str, LonLat)]) -> Vec<Spot> {
        points.iter().map(|(n, p)| Spot::new(*n, *p)).collect()
    }

    fn engine() -> (Rc<RefCell<HeadlessMap>>, SharedEngine) {
        let map = Rc::new(RefCell::new(HeadlessMap::new(
            CameraState::new(LonLat::new(124.2475, 13.8), 9.0),
            1280.0,
            800.0,
        )));
        let shared: SharedEngine = map.clone();
        (map, shared)
    }

    /// Answers every pair with a straight line, except pairs starting at
    /// `fail_from`. Records requests in order.
    struct ScriptedRouter {
        fail_from: Option<LonLat>,
        requests: Mutex<Vec<(LonLat, LonLat)>>,
    }

    impl ScriptedRouter {
        fn new(fail_from: Option<LonLat>) -> Self {
            Self {
                fail_from,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl RoutingService for ScriptedRouter {
        fn route(&self, from: LonLat, to: LonLat) -> BoxFuture<'_, Result<RouteSegment, RoutingError>> {
            self.requests.lock().unwrap().push((from, to));
            let fail = self.fail_from == Some(from);
            Box::pin(async move {
                if fail {
                    Err(RoutingError::Status(504))
                } else {
                    Ok(RouteSegment::new(vec![from, to]))
                }
            })
        }
    }

    /// Holds its first request until the gate opens; later requests answer
    /// immediately.
    struct GatedRouter {
        started: Mutex<Option<oneshot::Sender<()>>>,
        gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    impl RoutingService for GatedRouter {
        fn route(&self, from: LonLat, to: LonLat) -> BoxFuture<'_, Result<RouteSegment, RoutingError>> {
            let started = self.started.lock().unwrap().take();
            let gate = self.gate.lock().unwrap().take();
            Box::pin(async move {
                if let Some(tx) = started {
                    let _ = tx.send(());
                }
                if let Some(rx) = gate {
                    let _ = rx.await;
                }
                Ok(RouteSegment::new(vec![from, to]))
            })
        }
    }

    fn route_feature(map: &Rc<RefCell<HeadlessMap>>) -> Option<Feature> {
        map.borrow().feature(&SourceId::new(ROUTE_SOURCE)).cloned()
    }

    #[tokio::test]
    async fn segments_are_requested_in_itinerary_order() {
        let (map, shared) = engine();
        let router = Arc::new(ScriptedRouter::new(None));
        let sync = RouteSync::new(shared, router.clone());

        let job = sync.on_itinerary_changed(&stops(&[("A", A), ("B", B), ("C", C)])).unwrap();
        assert_eq!(job.run().await, RouteOutcome::Rendered { segments: 2, failed: 0 });
        assert_eq!(*router.requests.lock().unwrap(), vec![(A, B), (B, C)]);
        assert_eq!(
            route_feature(&map),
            Some(Feature::MultiLine(vec![vec![A, B], vec![B, C]]))
        );
    }

    #[tokio::test]
    async fn failed_segment_is_omitted() {
        let (map, shared) = engine();
        let router = Arc::new(ScriptedRouter::new(Some(A)));
        let sync = RouteSync::new(shared, router.clone());

        let job = sync.on_itinerary_changed(&stops(&[("A", A), ("B", B), ("C", C)])).unwrap();
        assert_eq!(job.run().await, RouteOutcome::Rendered { segments: 1, failed: 1 });
        assert_eq!(router.requests.lock().unwrap().len(), 2);
        assert_eq!(route_feature(&map), Some(Feature::MultiLine(vec![vec![B, C]])));
    }

    #[tokio::test]
    async fn replacement_removes_before_adding() {
        let (map, shared) = engine();
        let sync = RouteSync::new(shared, Arc::new(ScriptedRouter::new(None)));
        let first = stops(&[("A", A), ("B", B)]);
        sync.on_itinerary_changed(&first).unwrap().run().await;
        map.borrow_mut().clear_ops();

        sync.on_itinerary_changed(&stops(&[("A", A), ("B", B), ("C", C)]))
            .unwrap()
            .run()
            .await;
        let source = SourceId::new(ROUTE_SOURCE);
        assert_eq!(
            map.borrow().ops().to_vec(),
            vec![Op::RemoveFeature(source.clone()), Op::AddFeature(source)]
        );
    }

    #[tokio::test]
    async fn dropping_below_two_stops_clears_route() {
        let (map, shared) = engine();
        let sync = RouteSync::new(shared, Arc::new(ScriptedRouter::new(None)));
        assert!(sync.on_itinerary_changed(&stops(&[("A", A)])).is_none());

        sync.on_itinerary_changed(&stops(&[("A", A), ("B", B)])).unwrap().run().await;
        assert!(route_feature(&map).is_some());

        let job = sync.on_itinerary_changed(&stops(&[("B", B)])).unwrap();
        assert_eq!(job.run().await, RouteOutcome::Cleared);
        assert!(route_feature(&map).is_none());
        assert!(sync.on_itinerary_changed(&[]).is_none());
    }

    #[tokio::test]
    async fn all_segments_failing_leaves_no_route() {
        let (map, shared) = engine();
        let sync = RouteSync::new(shared, Arc::new(ScriptedRouter::new(Some(A))));
        sync.on_itinerary_changed(&stops(&[("B", B), ("C", C)])).unwrap().run().await;
        assert!(route_feature(&map).is_some());

        let job = sync.on_itinerary_changed(&stops(&[("A", A), ("B", B)])).unwrap();
        assert_eq!(job.run().await, RouteOutcome::Rendered { segments: 0, failed: 1 });
        assert!(route_feature(&map).is_none());
    }

    #[tokio::test]
    async fn superseded_job_is_discarded() {
        let (map, shared) = engine();
        let (started_tx, started_rx) = oneshot::channel();
        let (gate_tx, gate_rx) = oneshot::channel();
        let router = Arc::new(GatedRouter {
            started: Mutex::new(Some(started_tx)),
            gate: Mutex::new(Some(gate_rx)),
        });
        let sync = RouteSync::new(shared, router);

        let local = LocalSet::new();
        local
            .run_until(async {
                let stale = sync
                    .on_itinerary_changed(&stops(&[("A", A), ("B", B), ("C", C)]))
                    .unwrap();
                let stale = tokio::task::spawn_local(stale.run());
                started_rx.await.unwrap();

                // remove(0) while A->B is still in flight.
                let fresh = sync.on_itinerary_changed(&stops(&[("B", B), ("C", C)])).unwrap();
                assert_eq!(
                    fresh.run().await,
                    RouteOutcome::Rendered { segments: 1, failed: 0 }
                );

                gate_tx.send(()).unwrap();
                assert_eq!(stale.await.unwrap(), RouteOutcome::Superseded);
            })
            .await;

        assert_eq!(route_feature(&map), Some(Feature::MultiLine(vec![vec![B, C]])));
        assert_eq!(
            sync.last_applied(),
            Some(RouteOutcome::Rendered { segments: 1, failed: 0 })
        );
    }

    #[tokio::test]
    async fn stop_without_position_counts_as_failed_pair() {
        let (map, shared) = engine();
        let router = Arc::new(ScriptedRouter::new(None));
        let sync = RouteSync::new(shared, router.clone());
        let mut list = stops(&[("A", A), ("B", B), ("C", C)]);
        list[1].coordinates = None;

        let outcome = sync.on_itinerary_changed(&list).unwrap().run().await;
        assert_eq!(outcome, RouteOutcome::Rendered { segments: 0, failed: 2 });
        assert!(router.requests.lock().unwrap().is_empty());
        assert!(route_feature(&map).is_none());
    }
}
