//! Viewport-driven marker lifecycle.
//!
//! Only spots inside the current camera bounds own a marker element. Each
//! settle computes the visible identity set through a [`VisibilityIndex`] and
//! diffs it against the live entries: leavers are detached first, then
//! newcomers are attached. Live markers are never recreated by a bounds check;
//! their size follows zoom through [`MarkerLifecycle::rescale`].

use std::collections::{BTreeMap, BTreeSet};

use catalog::{Spot, SpotDefect};
use engine::{Anchor, MapEngine, MarkerSpec, MarkerVariant};
use foundation::bounds::GeoBounds;
use foundation::geo::LonLat;
use foundation::handles::MarkerHandle;
use foundation::ids::SpotId;
use tracing::{debug, warn};

use crate::config::MarkerScale;

/// Answers "which identities lie inside these bounds".
///
/// The lifecycle manager depends only on this contract, so a spatial index
/// can replace [`LinearScan`] without other changes.
pub trait VisibilityIndex {
    fn rebuild(&mut self, points: &[(SpotId, LonLat)]);
    fn visible(&self, bounds: &GeoBounds) -> BTreeSet<SpotId>;
}

/// Bounding-box test against every point. Adequate for tens of spots.
#[derive(Debug, Default, Clone)]
pub struct LinearScan {
    points: Vec<(SpotId, LonLat)>,
}

impl VisibilityIndex for LinearScan {
    fn rebuild(&mut self, points: &[(SpotId, LonLat)]) {
        self.points = points.to_vec();
    }

    fn visible(&self, bounds: &GeoBounds) -> BTreeSet<SpotId> {
        self.points
            .iter()
            .filter(|(_, p)| bounds.contains(*p))
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// A live marker for one visible spot.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerEntry {
    pub spot: SpotId,
    pub handle: MarkerHandle,
    pub popular: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub placeable: usize,
    pub skipped: Vec<(SpotId, SpotDefect)>,
}

/// Identities whose markers changed during one sync, in identity order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub added: Vec<SpotId>,
    pub removed: Vec<SpotId>,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug)]
pub struct MarkerLifecycle<I = LinearScan> {
    index: I,
    popularity_threshold: usize,
    scale: MarkerScale,
    current_scale: f64,
    spots: BTreeMap<SpotId, (Spot, LonLat)>,
    entries: BTreeMap<SpotId, MarkerEntry>,
    // Click routing, keyed by marker identity; removed together with the entry.
    clicks: BTreeMap<MarkerHandle, SpotId>,
}

impl MarkerLifecycle<LinearScan> {
    pub fn new(popularity_threshold: usize, scale: MarkerScale) -> Self {
        Self::with_index(LinearScan::default(), popularity_threshold, scale)
    }
}

impl<I: VisibilityIndex> MarkerLifecycle<I> {
    pub fn with_index(index: I, popularity_threshold: usize, scale: MarkerScale) -> Self {
        Self {
            index,
            popularity_threshold,
            current_scale: 1.0,
            scale,
            spots: BTreeMap::new(),
            entries: BTreeMap::new(),
            clicks: BTreeMap::new(),
        }
    }

    /// Replaces the spot set. Spots without usable coordinates are skipped
    /// with a warning; markers appear on the next [`MarkerLifecycle::sync`].
    pub fn load(&mut self, spots: &[Spot]) -> LoadReport {
        let mut report = LoadReport::default();
        self.spots.clear();
        for spot in spots {
            match spot.valid_coordinates() {
                Ok(p) => {
                    self.spots.insert(spot.id.clone(), (spot.clone(), p));
                }
                Err(defect) => {
                    warn!(spot = %spot.id, %defect, "skipping spot without a usable position");
                    report.skipped.push((spot.id.clone(), defect));
                }
            }
        }
        report.placeable = self.spots.len();
        let points: Vec<(SpotId, LonLat)> = self
            .spots
            .iter()
            .map(|(id, (_, p))| (id.clone(), *p))
            .collect();
        self.index.rebuild(&points);
        report
    }

    /// Brings the live marker set in line with `bounds`.
    pub fn sync(&mut self, engine: &mut dyn MapEngine, bounds: &GeoBounds) -> SyncReport {
        let visible = self.index.visible(bounds);
        let mut report = SyncReport::default();

        let leaving: Vec<SpotId> = self
            .entries
            .keys()
            .filter(|id| !visible.contains(*id))
            .cloned()
            .collect();
        for id in leaving {
            if let Some(entry) = self.entries.remove(&id) {
                self.clicks.remove(&entry.handle);
                if !engine.detach_marker(entry.handle) {
                    warn!(spot = %id, "engine did not know marker being removed");
                }
                report.removed.push(id);
            }
        }

        for id in visible {
            if self.entries.contains_key(&id) {
                continue;
            }
            let Some((spot, position)) = self.spots.get(&id) else {
                continue;
            };
            let popular = spot.is_popular(self.popularity_threshold);
            let handle = engine.attach_marker(marker_spec(spot, *position, popular, self.current_scale));
            self.clicks.insert(handle, id.clone());
            self.entries.insert(
                id.clone(),
                MarkerEntry {
                    spot: id.clone(),
                    handle,
                    popular,
                },
            );
            report.added.push(id);
        }

        if !report.is_empty() {
            debug!(
                added = report.added.len(),
                removed = report.removed.len(),
                live = self.entries.len(),
                "marker sync"
            );
        }
        report
    }

    /// Applies the zoom-driven size to every live marker. Returns `false`
    /// when the scale did not change.
    pub fn rescale(&mut self, engine: &mut dyn MapEngine, zoom: f64) -> bool {
        let scale = self.scale.at(zoom);
        if (scale - self.current_scale).abs() < 1e-9 {
            return false;
        }
        self.current_scale = scale;
        for entry in self.entries.values() {
            engine.set_marker_scale(entry.handle, scale);
        }
        true
    }

    pub fn spot_for_handle(&self, handle: MarkerHandle) -> Option<&Spot> {
        let id = self.clicks.get(&handle)?;
        self.spots.get(id).map(|(spot, _)| spot)
    }

    pub fn spot(&self, id: &SpotId) -> Option<&Spot> {
        self.spots.get(id).map(|(spot, _)| spot)
    }

    pub fn entry(&self, id: &SpotId) -> Option<&MarkerEntry> {
        self.entries.get(id)
    }

    pub fn visible_ids(&self) -> impl Iterator<Item = &SpotId> {
        self.entries.keys()
    }

    pub fn live_count(&self) -> usize {
        self.entries.len()
    }

    pub fn current_scale(&self) -> f64 {
        self.current_scale
    }

    /// Detaches every marker. Returns how many were removed.
    pub fn teardown(&mut self, engine: &mut dyn MapEngine) -> usize {
        let n = self.entries.len();
        for entry in std::mem::take(&mut self.entries).into_values() {
            engine.detach_marker(entry.handle);
        }
        self.clicks.clear();
        n
    }
}

fn marker_spec(spot: &Spot, position: LonLat, popular: bool, scale: f64) -> MarkerSpec {
    let label = spot.name().to_string();
    let (anchor, variant) = if popular {
        (
            Anchor::Bottom,
            MarkerVariant::Image {
                thumbnail: spot.thumbnail().map(str::to_string),
                label,
            },
        )
    } else {
        (
            Anchor::Center,
            MarkerVariant::Pill {
                icon: spot.primary_category().icon_key().to_string(),
                label,
            },
        )
    };
    MarkerSpec {
        position,
        anchor,
        variant,
        scale,
    }
}

#[cfg(test)]
mod tests {
    use super::{MarkerLifecycle, VisibilityIndex};
    use crate::config::MarkerScale;
    use catalog::{Category, Spot};
    use engine::{Anchor, CameraState, HeadlessMap, MarkerVariant};
    use foundation::bounds::GeoBounds;
    use foundation::geo::LonLat;
    use foundation::ids::SpotId;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn spots() -> Vec<Spot> {
        vec![
            Spot::new("Binurong Point", LonLat::new(124.3067, 13.8667))
                .with_images(["1.jpg", "2.jpg", "3.jpg", "4.jpg"])
                .with_categories([Category::Viewpoint]),
            Spot::new("Puraran Beach", LonLat::new(124.4021, 13.6898))
                .with_categories([Category::Beach, Category::Surfing]),
            Spot::new("Maribina Falls", LonLat::new(124.1886, 13.6317))
                .with_categories([Category::Waterfall]),
            Spot::new("Bato Church", LonLat::new(124.2985, 13.6023))
                .with_categories([Category::ReligiousSite]),
        ]
    }

    fn map() -> HeadlessMap {
        HeadlessMap::new(CameraState::new(LonLat::new(124.2475, 13.8), 9.0), 1280.0, 800.0)
    }

    fn ids(names: &[&str]) -> BTreeSet<SpotId> {
        names.iter().map(|n| SpotId::from(*n)).collect()
    }

    fn live(lifecycle: &MarkerLifecycle) -> BTreeSet<SpotId> {
        lifecycle.visible_ids().cloned().collect()
    }

    #[test]
    fn live_set_equals_spots_inside_bounds() {
        let mut engine = map();
        let mut lifecycle = MarkerLifecycle::new(3, MarkerScale::default());
        lifecycle.load(&spots());

        let all = GeoBounds::new(124.0, 13.5, 124.5, 14.0);
        lifecycle.sync(&mut engine, &all);
        assert_eq!(
            live(&lifecycle),
            ids(&["Binurong Point", "Puraran Beach", "Maribina Falls", "Bato Church"])
        );

        let south_west = GeoBounds::new(124.1, 13.55, 124.3, 13.7);
        let report = lifecycle.sync(&mut engine, &south_west);
        assert_eq!(live(&lifecycle), ids(&["Bato Church", "Maribina Falls"]));
        assert_eq!(report.added, Vec::<SpotId>::new());
        assert_eq!(report.removed, vec![SpotId::from("Binurong Point"), SpotId::from("Puraran Beach")]);
        assert_eq!(engine.markers().len(), 2);
        assert_eq!(engine.live_marker_handles(), 2);

        lifecycle.sync(&mut engine, &GeoBounds::new(0.0, 0.0, 1.0, 1.0));
        assert!(live(&lifecycle).is_empty());
        assert_eq!(engine.live_marker_handles(), 0);
    }

    #[test]
    fn bounds_are_closed_on_both_axes() {
        let mut engine = map();
        let mut lifecycle = MarkerLifecycle::new(3, MarkerScale::default());
        lifecycle.load(&spots());
        let edge = GeoBounds::new(124.3067, 13.8667, 124.4, 13.9);
        lifecycle.sync(&mut engine, &edge);
        assert_eq!(live(&lifecycle), ids(&["Binurong Point"]));
    }

    #[test]
    fn unchanged_bounds_do_not_touch_the_engine() {
        let mut engine = map();
        let mut lifecycle = MarkerLifecycle::new(3, MarkerScale::default());
        lifecycle.load(&spots());
        let bounds = GeoBounds::new(124.0, 13.5, 124.5, 14.0);
        lifecycle.sync(&mut engine, &bounds);
        engine.clear_ops();
        let report = lifecycle.sync(&mut engine, &bounds);
        assert!(report.is_empty());
        assert!(engine.ops().is_empty());
    }

    #[test]
    fn variant_follows_popularity() {
        let mut engine = map();
        let mut lifecycle = MarkerLifecycle::new(3, MarkerScale::default());
        lifecycle.load(&spots());
        lifecycle.sync(&mut engine, &GeoBounds::new(124.0, 13.5, 124.5, 14.0));

        let popular = lifecycle.entry(&SpotId::from("Binurong Point")).unwrap();
        assert!(popular.popular);
        let spec = engine.marker(popular.handle).unwrap();
        assert_eq!(spec.anchor, Anchor::Bottom);
        assert_eq!(
            spec.variant,
            MarkerVariant::Image {
                thumbnail: Some("1.jpg".to_string()),
                label: "Binurong Point".to_string()
            }
        );

        let pill = lifecycle.entry(&SpotId::from("Bato Church")).unwrap();
        assert!(!pill.popular);
        let spec = engine.marker(pill.handle).unwrap();
        assert_eq!(spec.anchor, Anchor::Center);
        assert_eq!(
            spec.variant,
            MarkerVariant::Pill {
                icon: "church".to_string(),
                label: "Bato Church".to_string()
            }
        );
    }

    #[test]
    fn defective_spots_are_skipped_not_fatal() {
        let mut broken = Spot::new("Nowhere", LonLat::new(0.0, 0.0));
        broken.coordinates = None;
        let mut list = spots();
        list.push(broken);
        list.push(Spot::new("Off Planet", LonLat::new(500.0, 13.0)));

        let mut lifecycle = MarkerLifecycle::new(3, MarkerScale::default());
        let report = lifecycle.load(&list);
        assert_eq!(report.placeable, 4);
        assert_eq!(report.skipped.len(), 2);

        let mut engine = map();
        lifecycle.sync(&mut engine, &GeoBounds::world());
        assert_eq!(lifecycle.live_count(), 4);
    }

    #[test]
    fn click_table_follows_entries() {
        let mut engine = map();
        let mut lifecycle = MarkerLifecycle::new(3, MarkerScale::default());
        lifecycle.load(&spots());
        lifecycle.sync(&mut engine, &GeoBounds::new(124.0, 13.5, 124.5, 14.0));
        let handle = lifecycle.entry(&SpotId::from("Puraran Beach")).unwrap().handle;
        assert_eq!(lifecycle.spot_for_handle(handle).unwrap().name(), "Puraran Beach");

        lifecycle.sync(&mut engine, &GeoBounds::new(124.1, 13.55, 124.3, 13.7));
        assert!(lifecycle.spot_for_handle(handle).is_none());
    }

    #[test]
    fn rescale_updates_live_markers_only_on_change() {
        let mut engine = map();
        let mut lifecycle = MarkerLifecycle::new(3, MarkerScale::default());
        lifecycle.load(&spots());
        lifecycle.sync(&mut engine, &GeoBounds::new(124.0, 13.5, 124.5, 14.0));

        assert!(lifecycle.rescale(&mut engine, 9.0));
        assert!(!lifecycle.rescale(&mut engine, 9.0));
        let expected = MarkerScale::default().at(9.0);
        assert!(engine.markers().values().all(|m| (m.scale - expected).abs() < 1e-12));

        // Newly attached markers pick up the current scale.
        lifecycle.sync(&mut engine, &GeoBounds::new(0.0, 0.0, 1.0, 1.0));
        lifecycle.sync(&mut engine, &GeoBounds::world());
        assert!(engine.markers().values().all(|m| (m.scale - expected).abs() < 1e-12));
    }

    #[test]
    fn teardown_releases_everything() {
        let mut engine = map();
        let mut lifecycle = MarkerLifecycle::new(3, MarkerScale::default());
        lifecycle.load(&spots());
        lifecycle.sync(&mut engine, &GeoBounds::world());
        assert_eq!(lifecycle.teardown(&mut engine), 4);
        assert_eq!(engine.live_marker_handles(), 0);
        assert!(engine.markers().is_empty());
    }

    #[derive(Default)]
    struct OnlyFirst {
        first: Option<SpotId>,
    }

    impl VisibilityIndex for OnlyFirst {
        fn rebuild(&mut self, points: &[(SpotId, LonLat)]) {
            self.first = points.first().map(|(id, _)| id.clone());
        }

        fn visible(&self, _bounds: &GeoBounds) -> BTreeSet<SpotId> {
            self.first.iter().cloned().collect()
        }
    }

    #[test]
    fn visibility_index_is_pluggable() {
        let mut engine = map();
        let mut lifecycle =
            MarkerLifecycle::with_index(OnlyFirst::default(), 3, MarkerScale::default());
        lifecycle.load(&spots());
        lifecycle.sync(&mut engine, &GeoBounds::world());
        // Identity order: the first loaded point is "Bato Church".
        assert_eq!(lifecycle.live_count(), 1);
        assert!(lifecycle.entry(&SpotId::from("Bato Church")).is_some());
    }
}
