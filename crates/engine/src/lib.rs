//! Contract of the map rendering engine the explorer core drives.
//!
//! The engine owns tiles and the camera; the core only places and removes
//! elements through [`MapEngine`] and reacts to [`EngineEvent`]s.

pub mod camera;
pub mod elements;
pub mod headless;

pub use camera::*;
pub use elements::*;
pub use headless::*;

use std::cell::RefCell;
use std::rc::Rc;

use foundation::bounds::GeoBounds;
use foundation::handles::{MarkerHandle, PopupHandle};
use foundation::ids::SourceId;

/// Notifications delivered by the engine to the UI loop.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Style and canvas are ready; fired once per engine lifetime.
    Loaded,
    /// Continuous camera motion (pan/zoom in progress).
    CameraMoved,
    /// Pan or zoom ended.
    CameraSettled,
    MarkerClicked(MarkerHandle),
    /// Container size changed outside of a fullscreen toggle.
    Resized,
}

/// Synchronous engine primitives, called from the single UI thread.
pub trait MapEngine {
    /// `false` until the style and canvas exist.
    fn is_ready(&self) -> bool;

    fn bounds(&self) -> GeoBounds;
    fn camera(&self) -> CameraState;
    /// Sets the camera immediately, without easing.
    fn jump_to(&mut self, camera: CameraState);
    /// Starts an eased camera move; returns without waiting for it.
    fn ease_to(&mut self, options: EaseOptions);
    /// Re-measures the container and redraws.
    fn resize(&mut self);

    fn attach_marker(&mut self, spec: MarkerSpec) -> MarkerHandle;
    fn set_marker_scale(&mut self, handle: MarkerHandle, scale: f64);
    fn detach_marker(&mut self, handle: MarkerHandle) -> bool;

    fn attach_popup(&mut self, spec: PopupSpec) -> PopupHandle;
    fn update_popup(&mut self, handle: PopupHandle, content: PopupContent);
    fn detach_popup(&mut self, handle: PopupHandle) -> bool;

    fn add_feature(&mut self, id: SourceId, feature: Feature);
    fn remove_feature(&mut self, id: &SourceId) -> bool;
    fn has_feature(&self, id: &SourceId) -> bool;
}

/// Engine shared between the synchronous controllers and in-flight route jobs.
pub type SharedEngine = Rc<RefCell<dyn MapEngine>>;
