use foundation::geo::LonLat;
use foundation::ids::SpotId;
use serde::{Deserialize, Serialize};

use crate::category::Category;

/// A point of interest as delivered by the provider.
///
/// Records are immutable after load. `coordinates` is kept raw: a record with
/// missing or out-of-range coordinates is still a record, and the viewport
/// manager decides to skip it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    pub id: SpotId,
    pub coordinates: Option<LonLat>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Why a spot cannot be placed on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpotDefect {
    MissingCoordinates,
    InvalidCoordinates(LonLat),
}

impl std::fmt::Display for SpotDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpotDefect::MissingCoordinates => write!(f, "missing coordinates"),
            SpotDefect::InvalidCoordinates(p) => {
                write!(f, "invalid coordinates ({}, {})", p.lon, p.lat)
            }
        }
    }
}

impl std::error::Error for SpotDefect {}

impl Spot {
    pub fn new(name: impl Into<String>, coordinates: LonLat) -> Self {
        Self {
            id: SpotId::new(name),
            coordinates: Some(coordinates),
            location: String::new(),
            categories: Vec::new(),
            images: Vec::new(),
            municipality: None,
            description: None,
        }
    }

    pub fn with_images<I, S>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.images = images.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn name(&self) -> &str {
        self.id.as_str()
    }

    /// Popular spots get the large image marker. Popular iff the image count
    /// exceeds `threshold`.
    pub fn is_popular(&self, threshold: usize) -> bool {
        self.images.len() > threshold
    }

    pub fn primary_category(&self) -> Category {
        self.categories
            .first()
            .cloned()
            .unwrap_or_else(|| Category::Other(String::new()))
    }

    pub fn thumbnail(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    pub fn valid_coordinates(&self) -> Result<LonLat, SpotDefect> {
        match self.coordinates {
            None => Err(SpotDefect::MissingCoordinates),
            Some(p) if !p.is_valid() => Err(SpotDefect::InvalidCoordinates(p)),
            Some(p) => Ok(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Spot, SpotDefect};
    use crate::category::Category;
    use foundation::geo::LonLat;

    #[test]
    fn popularity_is_strictly_above_threshold() {
        let spot = Spot::new("Binurong Point", LonLat::new(124.3067, 13.8667))
            .with_images(["a.jpg", "b.jpg", "c.jpg"]);
        assert!(!spot.is_popular(3));
        assert!(spot.is_popular(2));
    }

    #[test]
    fn primary_category_falls_back_to_other() {
        let plain = Spot::new("Somewhere", LonLat::new(124.2, 13.6));
        assert_eq!(plain.primary_category().icon_key(), "map-pin");
        let beach = plain.with_categories([Category::Beach, Category::Surfing]);
        assert_eq!(beach.primary_category(), Category::Beach);
    }

    #[test]
    fn coordinate_defects_are_reported() {
        let mut spot = Spot::new("Broken", LonLat::new(200.0, 13.0));
        assert!(matches!(
            spot.valid_coordinates(),
            Err(SpotDefect::InvalidCoordinates(_))
        ));
        spot.coordinates = None;
        assert_eq!(spot.valid_coordinates(), Err(SpotDefect::MissingCoordinates));
    }
}
