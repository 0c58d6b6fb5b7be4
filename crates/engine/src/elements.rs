use foundation::geo::LonLat;
use serde::{Deserialize, Serialize};

/// Point of the marker element that sits on the coordinate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Anchor {
    Center,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarkerVariant {
    /// Large image tile with a name label underneath.
    Image {
        thumbnail: Option<String>,
        label: String,
    },
    /// Compact pill with a category glyph.
    Pill { icon: String, label: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    pub position: LonLat,
    pub anchor: Anchor,
    pub variant: MarkerVariant,
    pub scale: f64,
}

/// Affordance of the popup's "add to itinerary" button.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddButtonState {
    Add,
    Added,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupContent {
    pub title: String,
    pub location: String,
    pub categories: Vec<String>,
    pub image: Option<String>,
    pub image_index: usize,
    pub image_count: usize,
    pub add_button: AddButtonState,
    /// Buttons are wired only once the opening animation finished.
    pub interactive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupSpec {
    pub position: LonLat,
    /// Pixel offset from the anchor; negative y is up.
    pub offset_px: [f64; 2],
    pub content: PopupContent,
}

/// Renderable vector feature keyed by a source id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Feature {
    /// One path per part, drawn as a single line layer.
    MultiLine(Vec<Vec<LonLat>>),
    /// Outer ring first, holes after.
    Polygon(Vec<Vec<LonLat>>),
}

impl Feature {
    pub fn part_count(&self) -> usize {
        match self {
            Feature::MultiLine(parts) | Feature::Polygon(parts) => parts.len(),
        }
    }
}
