//! In-process engine that keeps state instead of drawing.
//!
//! Bounds are derived from center, zoom and container size with spherical
//! Web-Mercator math. Every mutation is appended to [`HeadlessMap::ops`] so
//! tests can assert ordering (remove-before-add) and leaks.

use std::collections::BTreeMap;

use foundation::bounds::GeoBounds;
use foundation::handles::{HandleAllocator, MarkerHandle, PopupHandle};
use foundation::ids::SourceId;
use foundation::mercator;
use tracing::debug;

use crate::camera::{CameraState, EaseOptions};
use crate::elements::{Feature, MarkerSpec, PopupContent, PopupSpec};
use crate::MapEngine;

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    JumpTo(CameraState),
    EaseTo(EaseOptions),
    Resize { width_px: f64, height_px: f64 },
    AttachMarker(MarkerHandle),
    ScaleMarker(MarkerHandle, f64),
    DetachMarker(MarkerHandle),
    AttachPopup(PopupHandle),
    UpdatePopup(PopupHandle),
    DetachPopup(PopupHandle),
    AddFeature(SourceId),
    RemoveFeature(SourceId),
}

#[derive(Debug)]
pub struct HeadlessMap {
    ready: bool,
    camera: CameraState,
    size_px: [f64; 2],
    container_px: [f64; 2],
    marker_handles: HandleAllocator,
    popup_handles: HandleAllocator,
    markers: BTreeMap<MarkerHandle, MarkerSpec>,
    popups: BTreeMap<PopupHandle, PopupSpec>,
    features: BTreeMap<SourceId, Feature>,
    ops: Vec<Op>,
}

impl HeadlessMap {
    pub fn new(camera: CameraState, width_px: f64, height_px: f64) -> Self {
        let size = [width_px.max(1.0), height_px.max(1.0)];
        Self {
            ready: true,
            camera,
            size_px: size,
            container_px: size,
            marker_handles: HandleAllocator::new(),
            popup_handles: HandleAllocator::new(),
            markers: BTreeMap::new(),
            popups: BTreeMap::new(),
            features: BTreeMap::new(),
            ops: Vec::new(),
        }
    }

    /// An engine whose style has not loaded yet.
    pub fn not_ready(camera: CameraState, width_px: f64, height_px: f64) -> Self {
        Self {
            ready: false,
            ..Self::new(camera, width_px, height_px)
        }
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Simulates a layout change of the container; takes effect on `resize()`.
    pub fn set_container_size(&mut self, width_px: f64, height_px: f64) {
        self.container_px = [width_px.max(1.0), height_px.max(1.0)];
    }

    pub fn size_px(&self) -> [f64; 2] {
        self.size_px
    }

    pub fn markers(&self) -> &BTreeMap<MarkerHandle, MarkerSpec> {
        &self.markers
    }

    pub fn marker(&self, handle: MarkerHandle) -> Option<&MarkerSpec> {
        self.markers.get(&handle)
    }

    pub fn popups(&self) -> &BTreeMap<PopupHandle, PopupSpec> {
        &self.popups
    }

    pub fn feature(&self, id: &SourceId) -> Option<&Feature> {
        self.features.get(id)
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    pub fn live_marker_handles(&self) -> usize {
        self.marker_handles.live_count()
    }
}

impl MapEngine for HeadlessMap {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn bounds(&self) -> GeoBounds {
        let [w, h] = self.size_px;
        let nw = mercator::offset_px(self.camera.center, self.camera.zoom, -w * 0.5, -h * 0.5);
        let se = mercator::offset_px(self.camera.center, self.camera.zoom, w * 0.5, h * 0.5);
        GeoBounds::from_corners(nw, se)
    }

    fn camera(&self) -> CameraState {
        self.camera
    }

    fn jump_to(&mut self, camera: CameraState) {
        self.camera = camera;
        self.ops.push(Op::JumpTo(camera));
    }

    fn ease_to(&mut self, options: EaseOptions) {
        // No animation frames here: land on the final camera straight away.
        // Padding moves the focus point to the middle of the padded area.
        let p = options.padding;
        let dx = (p.left - p.right) * 0.5;
        let dy = (p.top - p.bottom) * 0.5;
        let center = mercator::offset_px(options.center, options.zoom, -dx, -dy);
        self.camera = CameraState::new(center, options.zoom);
        self.ops.push(Op::EaseTo(options));
    }

    fn resize(&mut self) {
        self.size_px = self.container_px;
        debug!(width = self.size_px[0], height = self.size_px[1], "headless resize");
        self.ops.push(Op::Resize {
            width_px: self.size_px[0],
            height_px: self.size_px[1],
        });
    }

    fn attach_marker(&mut self, spec: MarkerSpec) -> MarkerHandle {
        let handle = MarkerHandle(self.marker_handles.alloc());
        self.markers.insert(handle, spec);
        self.ops.push(Op::AttachMarker(handle));
        handle
    }

    fn set_marker_scale(&mut self, handle: MarkerHandle, scale: f64) {
        if let Some(spec) = self.markers.get_mut(&handle) {
            spec.scale = scale;
            self.ops.push(Op::ScaleMarker(handle, scale));
        }
    }

    fn detach_marker(&mut self, handle: MarkerHandle) -> bool {
        if self.markers.remove(&handle).is_none() {
            return false;
        }
        self.marker_handles.release(handle.0);
        self.ops.push(Op::DetachMarker(handle));
        true
    }

    fn attach_popup(&mut self, spec: PopupSpec) -> PopupHandle {
        let handle = PopupHandle(self.popup_handles.alloc());
        self.popups.insert(handle, spec);
        self.ops.push(Op::AttachPopup(handle));
        handle
    }

    fn update_popup(&mut self, handle: PopupHandle, content: PopupContent) {
        if let Some(spec) = self.popups.get_mut(&handle) {
            spec.content = content;
            self.ops.push(Op::UpdatePopup(handle));
        }
    }

    fn detach_popup(&mut self, handle: PopupHandle) -> bool {
        if self.popups.remove(&handle).is_none() {
            return false;
        }
        self.popup_handles.release(handle.0);
        self.ops.push(Op::DetachPopup(handle));
        true
    }

    fn add_feature(&mut self, id: SourceId, feature: Feature) {
        self.ops.push(Op::AddFeature(id.clone()));
        self.features.insert(id, feature);
    }

    fn remove_feature(&mut self, id: &SourceId) -> bool {
        if self.features.remove(id).is_none() {
            return false;
        }
        self.ops.push(Op::RemoveFeature(id.clone()));
        true
    }

    fn has_feature(&self, id: &SourceId) -> bool {
        self.features.contains_key(id)
    }
}
