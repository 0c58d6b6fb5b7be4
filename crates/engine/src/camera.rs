use std::time::Duration;

use foundation::geo::LonLat;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub center: LonLat,
    pub zoom: f64,
}

impl CameraState {
    pub fn new(center: LonLat, zoom: f64) -> Self {
        Self { center, zoom }
    }

    pub fn approx_eq(&self, other: &CameraState, eps: f64) -> bool {
        self.center.approx_eq(other.center, eps) && (self.zoom - other.zoom).abs() <= eps
    }
}

/// Screen-space padding in pixels that the camera keeps clear around its focus.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Padding {
    pub fn top(top: f64) -> Self {
        Self {
            top,
            ..Self::default()
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EaseOptions {
    pub center: LonLat,
    pub zoom: f64,
    pub padding: Padding,
    pub duration: Duration,
}
