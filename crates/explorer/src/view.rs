//! The map view: owner of every controller for one map lifetime.
//!
//! [`MapView::init`] wires the parts together and [`MapView::dispose`] tears
//! them down; nothing outlives the view. The host UI loop forwards engine
//! events through [`MapView::handle_event`] and drives virtual time with
//! [`MapView::tick`].

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use catalog::Spot;
use engine::{EngineEvent, Feature, SharedEngine};
use foundation::bounds::GeoBounds;
use foundation::ids::{SourceId, SpotId};
use foundation::time::Time;
use routing::RoutingService;
use runtime::{Debouncer, EventBus, Metrics, Throttle};
use tracing::{debug, info, warn};

use crate::config::ExplorerConfig;
use crate::itinerary::{Itinerary, SubscriptionId};
use crate::markers::MarkerLifecycle;
use crate::popup::PopupController;
use crate::route_sync::{RouteSync, Spawner};
use crate::transition::{TransitionAction, TransitionController};

pub const REGION_MASK_SOURCE: &str = "region-mask";

pub struct MapView {
    engine: SharedEngine,
    config: ExplorerConfig,
    spots: BTreeMap<SpotId, Spot>,
    markers: MarkerLifecycle,
    popup: PopupController,
    itinerary: Itinerary,
    route: RouteSync,
    subscription: SubscriptionId,
    transition: TransitionController,
    settle: Debouncer,
    rescale: Throttle,
    mask_drawn: bool,
    /// Set once markers were placed against a ready engine.
    synced: bool,
    events: EventBus,
    metrics: Metrics,
}

impl MapView {
    /// Builds the view over `engine`, places the initially visible markers
    /// and draws the region mask.
    ///
    /// Route jobs are handed to `spawner`, which must not poll them inline.
    pub fn init(
        engine: SharedEngine,
        config: ExplorerConfig,
        spots: Vec<Spot>,
        router: Arc<dyn RoutingService>,
        spawner: Rc<dyn Spawner>,
        now: Time,
    ) -> Self {
        let mut markers = MarkerLifecycle::new(config.popularity_threshold, config.marker_scale);
        let load = markers.load(&spots);

        let route = RouteSync::new(engine.clone(), router);
        let mut itinerary = Itinerary::new();
        let job_source = route.clone();
        let subscription = itinerary.subscribe(move |_, stops| {
            if let Some(job) = job_source.on_itinerary_changed(stops) {
                let generation = job.token().0;
                spawner.spawn(Box::pin(async move {
                    let outcome = job.run().await;
                    debug!(generation, ?outcome, "route job finished");
                }));
            }
        });

        let mut view = Self {
            popup: PopupController::new(
                config.popup_offset_px,
                config.popup_focus,
                config.carousel_autoplay(),
            ),
            transition: TransitionController::new(
                config.fullscreen_transition(),
                config.window_resize_debounce(),
            ),
            settle: Debouncer::new(config.camera_settle_debounce()),
            rescale: Throttle::new(config.zoom_rescale_throttle()),
            spots: spots.into_iter().map(|s| (s.id.clone(), s)).collect(),
            engine,
            config,
            markers,
            itinerary,
            route,
            subscription,
            mask_drawn: false,
            synced: false,
            events: EventBus::new(),
            metrics: Metrics::new(),
        };

        for (id, defect) in &load.skipped {
            view.events.emit(now, "spot", format!("skipped {id}: {defect}"));
        }
        view.metrics.add("spots.skipped", load.skipped.len() as u64);
        view.metrics.set_gauge("spots.placeable", load.placeable as i64);

        view.settle_now(now);
        info!(
            spots = view.spots.len(),
            placeable = load.placeable,
            visible = view.markers.live_count(),
            "map view initialised"
        );
        view
    }

    /// Tears everything down: timers, popup, markers, route and mask.
    pub fn dispose(mut self) {
        self.transition.cancel_all();
        self.settle.cancel();
        self.itinerary.unsubscribe(self.subscription);
        self.route.clear();
        let mut engine = self.engine.borrow_mut();
        self.popup.close(&mut *engine);
        let removed = self.markers.teardown(&mut *engine);
        engine.remove_feature(&SourceId::new(REGION_MASK_SOURCE));
        debug!(markers = removed, "map view disposed");
    }

    pub fn handle_event(&mut self, event: EngineEvent, now: Time) {
        match event {
            EngineEvent::CameraMoved => {
                if self.rescale.try_acquire(now) {
                    let mut engine = self.engine.borrow_mut();
                    let zoom = engine.camera().zoom;
                    self.markers.rescale(&mut *engine, zoom);
                }
            }
            EngineEvent::Loaded => {
                self.settle.cancel();
                self.settle_now(now);
            }
            EngineEvent::CameraSettled => self.settle.trigger(now),
            EngineEvent::MarkerClicked(handle) => {
                let clicked = self.markers.spot_for_handle(handle).map(|s| s.id.clone());
                match clicked {
                    Some(id) => {
                        self.open_spot(&id, now);
                    }
                    None => debug!(?handle, "click on a marker that is no longer live"),
                }
            }
            EngineEvent::Resized => {
                self.window_resized(now);
            }
        }
    }

    /// Advances virtual time: settle debounce, popup timers, layout
    /// transitions. Returns the resize-and-restore actions performed.
    pub fn tick(&mut self, now: Time) -> Vec<TransitionAction> {
        let first_ready = !self.synced && self.engine.borrow().is_ready();
        if self.settle.poll(now) || first_ready {
            self.settle_now(now);
        }
        {
            let mut engine = self.engine.borrow_mut();
            self.popup.tick(&mut *engine, now);
        }
        let actions = {
            let mut engine = self.engine.borrow_mut();
            self.transition.tick(&mut *engine, now)
        };
        for action in &actions {
            self.metrics.incr("transition.restores");
            self.events.emit(
                now,
                "transition",
                format!(
                    "{:?} restored ({:.4}, {:.4}) z{:.2}",
                    action.kind,
                    action.restored.center.lon,
                    action.restored.center.lat,
                    action.restored.zoom
                ),
            );
        }
        if !actions.is_empty() {
            // The container changed size, so the visible set may have too.
            self.settle_now(now);
        }
        actions
    }

    /// Earliest virtual time at which [`MapView::tick`] has work.
    pub fn next_deadline(&self) -> Option<Time> {
        [
            self.settle.deadline(),
            self.popup.next_deadline(),
            self.transition.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Opens the popup for a placed spot (marker click or a card elsewhere).
    pub fn open_spot(&mut self, id: &SpotId, now: Time) -> bool {
        let Some(spot) = self.markers.spot(id).cloned() else {
            warn!(spot = %id, "cannot open popup for unknown or unplaceable spot");
            return false;
        };
        let added = self.itinerary.contains(id);
        let opened = {
            let mut engine = self.engine.borrow_mut();
            self.popup.open(&mut *engine, &spot, added, now)
        };
        if opened {
            self.metrics.incr("popup.opened");
            self.events.emit(now, "popup", format!("opened {id}"));
        }
        opened
    }

    pub fn close_popup(&mut self, now: Time) -> bool {
        let closed = self.popup.close(&mut *self.engine.borrow_mut());
        if closed {
            self.events.emit(now, "popup", "closed");
        }
        closed
    }

    pub fn next_image(&mut self) -> bool {
        self.popup.next_image(&mut *self.engine.borrow_mut())
    }

    pub fn prev_image(&mut self) -> bool {
        self.popup.prev_image(&mut *self.engine.borrow_mut())
    }

    pub fn go_to_image(&mut self, index: usize) -> bool {
        self.popup.go_to_image(&mut *self.engine.borrow_mut(), index)
    }

    /// The popup's "add" button.
    pub fn add_from_popup(&mut self, now: Time) -> Option<bool> {
        let added = {
            let mut engine = self.engine.borrow_mut();
            self.popup.add_to_itinerary(&mut *engine, &mut self.itinerary)
        }?;
        self.record_itinerary(now, added, "popup");
        Some(added)
    }

    /// Itinerary add from outside the popup (spot cards, search results).
    pub fn add_to_itinerary(&mut self, id: &SpotId, now: Time) -> bool {
        let Some(spot) = self.spots.get(id).cloned() else {
            warn!(spot = %id, "cannot add unknown spot to itinerary");
            return false;
        };
        let added = self.itinerary.add(spot);
        self.popup.sync_added(&mut *self.engine.borrow_mut(), &self.itinerary);
        self.record_itinerary(now, added, "card");
        added
    }

    pub fn remove_from_itinerary(&mut self, index: isize, now: Time) -> Option<Spot> {
        let removed = self.itinerary.remove(index)?;
        self.popup.sync_added(&mut *self.engine.borrow_mut(), &self.itinerary);
        self.metrics.incr("itinerary.removed");
        self.events.emit(
            now,
            "itinerary",
            format!("removed {} ({})", removed.id, self.itinerary.summary()),
        );
        Some(removed)
    }

    pub fn toggle_fullscreen(&mut self, now: Time) -> bool {
        let accepted = self
            .transition
            .request_fullscreen_toggle(&*self.engine.borrow(), now);
        if accepted {
            self.events.emit(
                now,
                "transition",
                format!("fullscreen {}", if self.transition.is_fullscreen() { "on" } else { "off" }),
            );
        }
        accepted
    }

    pub fn window_resized(&mut self, now: Time) -> bool {
        self.transition.on_window_resize(&*self.engine.borrow(), now)
    }

    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn markers(&self) -> &MarkerLifecycle {
        &self.markers
    }

    pub fn popup(&self) -> &PopupController {
        &self.popup
    }

    pub fn itinerary(&self) -> &Itinerary {
        &self.itinerary
    }

    pub fn route(&self) -> &RouteSync {
        &self.route
    }

    pub fn transition(&self) -> &TransitionController {
        &self.transition
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn visible_spots(&self) -> Vec<SpotId> {
        self.markers.visible_ids().cloned().collect()
    }

    fn record_itinerary(&mut self, now: Time, added: bool, via: &str) {
        if added {
            self.metrics.incr("itinerary.added");
            self.events.emit(
                now,
                "itinerary",
                format!("added via {via} ({})", self.itinerary.summary()),
            );
        } else {
            self.events.emit(now, "itinerary", format!("already present (via {via})"));
        }
    }

    fn settle_now(&mut self, now: Time) {
        if !self.engine.borrow().is_ready() {
            debug!("engine not ready; skipping marker sync");
            return;
        }
        if !self.mask_drawn
            && let Some(region) = self.config.region_mask
        {
            self.draw_region_mask(region);
        }
        self.synced = true;
        let mut engine = self.engine.borrow_mut();
        let bounds = engine.bounds();
        let zoom = engine.camera().zoom;
        let report = self.markers.sync(&mut *engine, &bounds);
        self.markers.rescale(&mut *engine, zoom);
        for id in &report.removed {
            if self.popup.on_marker_removed(&mut *engine, id) {
                self.events.emit(now, "popup", format!("closed {id}: marker left view"));
            }
        }
        drop(engine);

        self.metrics.add("markers.added", report.added.len() as u64);
        self.metrics.add("markers.removed", report.removed.len() as u64);
        self.metrics.set_gauge("markers.live", self.markers.live_count() as i64);
        self.metrics
            .record("markers.churn", (report.added.len() + report.removed.len()) as i64);
        if !report.is_empty() {
            self.events.emit(
                now,
                "marker",
                format!(
                    "+{} -{} live {}",
                    report.added.len(),
                    report.removed.len(),
                    self.markers.live_count()
                ),
            );
        }
    }

    /// World polygon with the region cut out, dimming everything else.
    fn draw_region_mask(&mut self, region: GeoBounds) {
        let mut engine = self.engine.borrow_mut();
        let id = SourceId::new(REGION_MASK_SOURCE);
        engine.remove_feature(&id);
        engine.add_feature(id, Feature::Polygon(vec![GeoBounds::world().ring(), region.ring()]));
        self.mask_drawn = true;
    }
}
