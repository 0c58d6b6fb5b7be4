use serde::{Deserialize, Serialize};

/// Category tag attached to a spot. Unknown tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Beach,
    Waterfall,
    Viewpoint,
    Nature,
    EcoPark,
    Park,
    Accommodation,
    Resort,
    Restaurant,
    Cafe,
    Museum,
    Heritage,
    Landmark,
    ReligiousSite,
    Surfing,
    Hiking,
    Island,
    Bar,
    Other(String),
}

impl Category {
    /// Parses a tag such as `"BEACH"` or `"religious site"`.
    pub fn parse(tag: &str) -> Self {
        let norm = tag.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        match norm.as_str() {
            "BEACH" => Self::Beach,
            "WATERFALL" => Self::Waterfall,
            "VIEWPOINT" => Self::Viewpoint,
            "NATURE" => Self::Nature,
            "ECO_PARK" => Self::EcoPark,
            "PARK" => Self::Park,
            "ACCOMMODATION" => Self::Accommodation,
            "RESORT" => Self::Resort,
            "RESTAURANT" => Self::Restaurant,
            "CAFE" => Self::Cafe,
            "MUSEUM" => Self::Museum,
            "HERITAGE" => Self::Heritage,
            "LANDMARK" => Self::Landmark,
            "RELIGIOUS_SITE" => Self::ReligiousSite,
            "SURFING" => Self::Surfing,
            "HIKING" => Self::Hiking,
            "ISLAND" => Self::Island,
            "BAR" => Self::Bar,
            _ => Self::Other(tag.trim().to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Beach => "BEACH",
            Self::Waterfall => "WATERFALL",
            Self::Viewpoint => "VIEWPOINT",
            Self::Nature => "NATURE",
            Self::EcoPark => "ECO_PARK",
            Self::Park => "PARK",
            Self::Accommodation => "ACCOMMODATION",
            Self::Resort => "RESORT",
            Self::Restaurant => "RESTAURANT",
            Self::Cafe => "CAFE",
            Self::Museum => "MUSEUM",
            Self::Heritage => "HERITAGE",
            Self::Landmark => "LANDMARK",
            Self::ReligiousSite => "RELIGIOUS_SITE",
            Self::Surfing => "SURFING",
            Self::Hiking => "HIKING",
            Self::Island => "ISLAND",
            Self::Bar => "BAR",
            Self::Other(tag) => tag,
        }
    }

    /// Glyph drawn inside compact pill markers.
    pub fn icon_key(&self) -> &'static str {
        match self {
            Self::Beach | Self::Waterfall | Self::Surfing => "waves",
            Self::Viewpoint | Self::Hiking => "mountain",
            Self::Nature | Self::EcoPark | Self::Park => "trees",
            Self::Accommodation => "bed",
            Self::Resort | Self::Island => "palmtree",
            Self::Restaurant => "utensils",
            Self::Cafe => "coffee",
            Self::Museum => "building",
            Self::Heritage | Self::Landmark => "landmark",
            Self::ReligiousSite => "church",
            Self::Bar => "beer",
            Self::Other(_) => "map-pin",
        }
    }

    /// Human label, e.g. `"religious site"`.
    pub fn label(&self) -> String {
        self.tag().to_ascii_lowercase().replace('_', " ")
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Category::parse(&s)
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.tag().to_string()
    }
}
