//! Camera preservation across layout changes.
//!
//! A fullscreen toggle or window resize snapshots the camera immediately,
//! then arms a trailing debounce. When it fires the engine re-measures its
//! container and the snapshot is reasserted with `jump_to`, so the user keeps
//! looking at the same place. Fullscreen and window resizes use independent
//! lanes with their own delay.

use std::time::Duration;

use engine::{CameraState, MapEngine};
use foundation::geo::LonLat;
use foundation::time::Time;
use runtime::Debouncer;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct CameraSnapshot {
    pub center: LonLat,
    pub zoom: f64,
}

impl CameraSnapshot {
    pub fn capture(engine: &dyn MapEngine) -> Self {
        let camera = engine.camera();
        Self {
            center: camera.center,
            zoom: camera.zoom,
        }
    }

    pub fn camera(&self) -> CameraState {
        CameraState::new(self.center, self.zoom)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum TransitionKind {
    Fullscreen,
    WindowResize,
}

/// Resize-and-restore performed by [`TransitionController::tick`].
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct TransitionAction {
    pub kind: TransitionKind,
    pub restored: CameraSnapshot,
}

#[derive(Debug)]
struct Lane {
    kind: TransitionKind,
    debounce: Debouncer,
    snapshot: Option<CameraSnapshot>,
}

impl Lane {
    fn new(kind: TransitionKind, delay: Duration) -> Self {
        Self {
            kind,
            debounce: Debouncer::new(delay),
            snapshot: None,
        }
    }

    fn request(&mut self, engine: &dyn MapEngine, now: Time) -> bool {
        if !engine.is_ready() {
            debug!(kind = ?self.kind, "engine not ready; ignoring layout change");
            return false;
        }
        // The first snapshot of a burst is the one taken before any layout moved.
        if self.snapshot.is_none() {
            self.snapshot = Some(CameraSnapshot::capture(engine));
        }
        self.debounce.trigger(now);
        true
    }

    fn fire(&mut self, engine: &mut dyn MapEngine, now: Time) -> Option<TransitionAction> {
        if !self.debounce.poll(now) {
            return None;
        }
        let snapshot = self.snapshot.take()?;
        if !engine.is_ready() {
            return None;
        }
        engine.resize();
        engine.jump_to(snapshot.camera());
        debug!(kind = ?self.kind, zoom = snapshot.zoom, "camera restored after resize");
        Some(TransitionAction {
            kind: self.kind,
            restored: snapshot,
        })
    }

    fn cancel(&mut self) {
        self.debounce.cancel();
        self.snapshot = None;
    }
}

#[derive(Debug)]
pub struct TransitionController {
    fullscreen: Lane,
    window: Lane,
    is_fullscreen: bool,
}

impl TransitionController {
    pub fn new(fullscreen_delay: Duration, window_delay: Duration) -> Self {
        Self {
            fullscreen: Lane::new(TransitionKind::Fullscreen, fullscreen_delay),
            window: Lane::new(TransitionKind::WindowResize, window_delay),
            is_fullscreen: false,
        }
    }

    pub fn is_fullscreen(&self) -> bool {
        self.is_fullscreen
    }

    /// Flips fullscreen and schedules the resize-and-restore. No-op when the
    /// engine is not initialised.
    pub fn request_fullscreen_toggle(&mut self, engine: &dyn MapEngine, now: Time) -> bool {
        if !self.fullscreen.request(engine, now) {
            return false;
        }
        self.is_fullscreen = !self.is_fullscreen;
        true
    }

    pub fn on_window_resize(&mut self, engine: &dyn MapEngine, now: Time) -> bool {
        self.window.request(engine, now)
    }

    pub fn tick(&mut self, engine: &mut dyn MapEngine, now: Time) -> Vec<TransitionAction> {
        [&mut self.fullscreen, &mut self.window]
            .into_iter()
            .filter_map(|lane| lane.fire(engine, now))
            .collect()
    }

    /// Pending snapshot, fullscreen lane first.
    pub fn snapshot(&self) -> Option<CameraSnapshot> {
        self.fullscreen.snapshot.or(self.window.snapshot)
    }

    pub fn next_deadline(&self) -> Option<Time> {
        match (self.fullscreen.debounce.deadline(), self.window.debounce.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn cancel_all(&mut self) {
        self.fullscreen.cancel();
        self.window.cancel();
    }
}
