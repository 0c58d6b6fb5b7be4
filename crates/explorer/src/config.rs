//! Tunables of the map view.
//!
//! Defaults reproduce the island explorer as shipped. A JSON file may
//! override any subset; `EXPLORER_*` environment variables override both.

use std::env;
use std::time::Duration;

use engine::CameraState;
use foundation::bounds::GeoBounds;
use foundation::geo::LonLat;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum ConfigError {
    Json(serde_json::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Json(e) => write!(f, "invalid config JSON: {e}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Json(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

/// Marker size as a linear function of zoom, clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerScale {
    pub reference_zoom: f64,
    pub per_zoom: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for MarkerScale {
    fn default() -> Self {
        Self {
            reference_zoom: 12.0,
            per_zoom: 0.12,
            min: 0.6,
            max: 1.4,
        }
    }
}

impl MarkerScale {
    pub fn at(&self, zoom: f64) -> f64 {
        (1.0 + (zoom - self.reference_zoom) * self.per_zoom).clamp(self.min, self.max)
    }
}

/// Camera move issued when a popup opens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupFocus {
    pub min_zoom: f64,
    pub top_padding_px: f64,
    pub duration_ms: u64,
}

impl Default for PopupFocus {
    fn default() -> Self {
        Self {
            min_zoom: 13.0,
            top_padding_px: 280.0,
            duration_ms: 800,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub popularity_threshold: usize,
    pub marker_scale: MarkerScale,
    pub popup_offset_px: f64,
    pub popup_focus: PopupFocus,
    pub fullscreen_transition_ms: u64,
    pub window_resize_debounce_ms: u64,
    pub camera_settle_debounce_ms: u64,
    pub zoom_rescale_throttle_ms: u64,
    pub carousel_autoplay_ms: u64,
    pub initial_camera: CameraState,
    pub region_mask: Option<GeoBounds>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            popularity_threshold: 3,
            marker_scale: MarkerScale::default(),
            popup_offset_px: 45.0,
            popup_focus: PopupFocus::default(),
            fullscreen_transition_ms: 500,
            window_resize_debounce_ms: 100,
            camera_settle_debounce_ms: 150,
            zoom_rescale_throttle_ms: 50,
            carousel_autoplay_ms: 4_000,
            initial_camera: CameraState::new(LonLat::new(124.2475, 13.8), 9.0),
            region_mask: Some(GeoBounds::new(124.011, 13.35, 124.45, 14.15)),
        }
    }
}

impl ExplorerConfig {
    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        let config: ExplorerConfig = serde_json::from_str(payload)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with `EXPLORER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        self.popularity_threshold =
            env_var_usize("EXPLORER_POPULARITY_THRESHOLD", self.popularity_threshold);
        self.popup_offset_px = env_var_f64("EXPLORER_POPUP_OFFSET_PX", self.popup_offset_px);
        self.popup_focus.min_zoom = env_var_f64("EXPLORER_POPUP_MIN_ZOOM", self.popup_focus.min_zoom);
        self.fullscreen_transition_ms =
            env_var_u64("EXPLORER_FULLSCREEN_TRANSITION_MS", self.fullscreen_transition_ms);
        self.window_resize_debounce_ms =
            env_var_u64("EXPLORER_RESIZE_DEBOUNCE_MS", self.window_resize_debounce_ms);
        self.camera_settle_debounce_ms =
            env_var_u64("EXPLORER_SETTLE_DEBOUNCE_MS", self.camera_settle_debounce_ms);
        self.carousel_autoplay_ms =
            env_var_u64("EXPLORER_CAROUSEL_AUTOPLAY_MS", self.carousel_autoplay_ms);
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.marker_scale;
        if !(s.min > 0.0 && s.min <= s.max) {
            return Err(ConfigError::Invalid(format!(
                "marker_scale bounds must satisfy 0 < min <= max (got {}..{})",
                s.min, s.max
            )));
        }
        if !self.initial_camera.center.is_valid() {
            return Err(ConfigError::Invalid(
                "initial_camera center is out of range".to_string(),
            ));
        }
        Ok(())
    }

    pub fn fullscreen_transition(&self) -> Duration {
        Duration::from_millis(self.fullscreen_transition_ms)
    }

    pub fn window_resize_debounce(&self) -> Duration {
        Duration::from_millis(self.window_resize_debounce_ms)
    }

    pub fn camera_settle_debounce(&self) -> Duration {
        Duration::from_millis(self.camera_settle_debounce_ms)
    }

    pub fn zoom_rescale_throttle(&self) -> Duration {
        Duration::from_millis(self.zoom_rescale_throttle_ms)
    }

    pub fn carousel_autoplay(&self) -> Option<Duration> {
        (self.carousel_autoplay_ms > 0).then(|| Duration::from_millis(self.carousel_autoplay_ms))
    }
}

fn env_var_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ExplorerConfig, MarkerScale};

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ExplorerConfig::from_json_str(
            r#"{"popularity_threshold": 5, "popup_focus": {"min_zoom": 14.0}}"#,
        )
        .unwrap();
        assert_eq!(config.popularity_threshold, 5);
        assert_eq!(config.popup_focus.min_zoom, 14.0);
        assert_eq!(config.popup_focus.top_padding_px, 280.0);
        assert_eq!(config.fullscreen_transition_ms, 500);
        assert_eq!(config.window_resize_debounce_ms, 100);
    }

    #[test]
    fn region_mask_can_be_disabled() {
        let config = ExplorerConfig::from_json_str(r#"{"region_mask": null}"#).unwrap();
        assert!(config.region_mask.is_none());
    }

    #[test]
    fn rejects_inverted_scale_bounds() {
        let err = ExplorerConfig::from_json_str(r#"{"marker_scale": {"min": 2.0, "max": 1.0}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(matches!(
            ExplorerConfig::from_json_str("{"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn marker_scale_is_linear_then_clamped() {
        let s = MarkerScale::default();
        assert!((s.at(12.0) - 1.0).abs() < 1e-12);
        assert!((s.at(13.0) - 1.12).abs() < 1e-12);
        assert_eq!(s.at(3.0), 0.6);
        assert_eq!(s.at(20.0), 1.4);
    }
}
