use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Image manifest: `spots[MUNICIPALITY][spot name]` lists image file names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub spots: BTreeMap<String, BTreeMap<String, ManifestEntry>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl ImageManifest {
    pub fn from_json_str(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    pub fn entry(&self, municipality: &str, spot_name: &str) -> Option<&ManifestEntry> {
        self.spots
            .get(&municipality.to_ascii_uppercase())
            .and_then(|spots| spots.get(spot_name))
    }

    /// Image URLs for a spot, resolved against `base_url`, thumbnail first.
    pub fn image_urls(&self, municipality: &str, spot_name: &str, base_url: &str) -> Vec<String> {
        let Some(entry) = self.entry(municipality, spot_name) else {
            return Vec::new();
        };
        let mut names: Vec<&str> = Vec::with_capacity(entry.images.len());
        if let Some(thumb) = &entry.thumbnail {
            names.push(thumb);
        }
        for img in &entry.images {
            if !names.contains(&img.as_str()) {
                names.push(img);
            }
        }
        names
            .into_iter()
            .map(|name| resolve_image_url(base_url, name))
            .collect()
    }
}

pub fn resolve_image_url(base_url: &str, name: &str) -> String {
    if name.starts_with("http://") || name.starts_with("https://") || name.starts_with('/') {
        return name.to_string();
    }
    if base_url.is_empty() {
        return name.to_string();
    }
    format!("{}/{}", base_url.trim_end_matches('/'), name)
}
