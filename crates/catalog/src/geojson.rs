use foundation::geo::LonLat;
use foundation::ids::SpotId;
use serde_json::{Map, Value};

use crate::CatalogError;
use crate::category::Category;
use crate::spot::Spot;

/// Outcome of parsing one municipality file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedSpots {
    pub spots: Vec<Spot>,
    /// Features that could not become a spot at all (no name), by feature index.
    pub rejected: Vec<(usize, String)>,
}

/// Parses a GeoJSON FeatureCollection of point features into spot records.
///
/// Only a structurally broken document is an error. A feature with no usable
/// name is rejected. A feature with missing or non-point geometry still yields
/// a spot with `coordinates: None`, which the map later skips with a warning.
pub fn parse_feature_collection(
    payload: &str,
    municipality: Option<&str>,
) -> Result<ParsedSpots, CatalogError> {
    let value: Value = serde_json::from_str(payload)?;
    let obj = value
        .as_object()
        .ok_or_else(|| CatalogError::Format("expected a GeoJSON object".to_string()))?;
    let ty = obj.get("type").and_then(Value::as_str);
    if ty != Some("FeatureCollection") {
        return Err(CatalogError::Format(
            "expected GeoJSON FeatureCollection".to_string(),
        ));
    }
    let features = obj
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| CatalogError::Format("FeatureCollection without features".to_string()))?;

    let mut out = ParsedSpots::default();
    for (index, feature) in features.iter().enumerate() {
        match parse_feature(feature, municipality) {
            Ok(spot) => out.spots.push(spot),
            Err(reason) => out.rejected.push((index, reason)),
        }
    }
    Ok(out)
}

fn parse_feature(feature: &Value, municipality: Option<&str>) -> Result<Spot, String> {
    let obj = feature
        .as_object()
        .ok_or_else(|| "feature must be an object".to_string())?;
    let empty = Map::new();
    let props = obj
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let name = props
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| "feature has no name".to_string())?;

    let categories = props
        .get("categories")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(Category::parse)
                .collect()
        })
        .or_else(|| {
            props
                .get("category")
                .and_then(Value::as_str)
                .map(|c| vec![Category::parse(c)])
        })
        .unwrap_or_default();

    let images = props
        .get("images")
        .and_then(Value::as_array)
        .map(|imgs| {
            imgs.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let location = props
        .get("location")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            let barangay = props.get("barangay").and_then(Value::as_str);
            match (barangay, municipality) {
                (Some(b), Some(m)) => Some(format!("{b}, {}", title_case(m))),
                (None, Some(m)) => Some(title_case(m)),
                (Some(b), None) => Some(b.to_string()),
                (None, None) => None,
            }
        })
        .unwrap_or_default();

    Ok(Spot {
        id: SpotId::new(name),
        coordinates: obj.get("geometry").and_then(point_coordinates),
        location,
        categories,
        images,
        municipality: municipality.map(str::to_string),
        description: props
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn point_coordinates(geometry: &Value) -> Option<LonLat> {
    let obj = geometry.as_object()?;
    if obj.get("type").and_then(Value::as_str) != Some("Point") {
        return None;
    }
    let coords = obj.get("coordinates")?.as_array()?;
    let lon = coords.first()?.as_f64()?;
    let lat = coords.get(1)?.as_f64()?;
    Some(LonLat::new(lon, lat))
}

fn title_case(s: &str) -> String {
    s.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let lower = w.to_ascii_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(c) => c.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::{parse_feature_collection, title_case};
    use crate::category::Category;
    use foundation::geo::LonLat;

    const BARAS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "name": "Binurong Point", "categories": ["VIEWPOINT", "HIKING"], "barangay": "Guinsaanan" },
                "geometry": { "type": "Point", "coordinates": [124.3067, 13.8667] }
            },
            {
                "type": "Feature",
                "properties": { "name": "Puraran Beach", "categories": ["BEACH", "SURFING"] },
                "geometry": null
            },
            {
                "type": "Feature",
                "properties": { "categories": ["PARK"] },
                "geometry": { "type": "Point", "coordinates": [124.3, 13.8] }
            }
        ]
    }"#;

    #[test]
    fn parses_points_and_keeps_spots_without_geometry() {
        let parsed = parse_feature_collection(BARAS, Some("SAN_MIGUEL")).unwrap();
        assert_eq!(parsed.spots.len(), 2);
        let binurong = &parsed.spots[0];
        assert_eq!(binurong.name(), "Binurong Point");
        assert_eq!(binurong.coordinates, Some(LonLat::new(124.3067, 13.8667)));
        assert_eq!(binurong.categories, vec![Category::Viewpoint, Category::Hiking]);
        assert_eq!(binurong.location, "Guinsaanan, San Miguel");

        assert_eq!(parsed.spots[1].coordinates, None);
        assert_eq!(parsed.rejected.len(), 1);
        assert_eq!(parsed.rejected[0].0, 2);
    }

    #[test]
    fn rejects_non_feature_collections() {
        assert!(parse_feature_collection(r#"{"type":"Feature"}"#, None).is_err());
        assert!(parse_feature_collection("not json", None).is_err());
    }

    #[test]
    fn title_cases_municipality_keys() {
        assert_eq!(title_case("SAN_MIGUEL"), "San Miguel");
        assert_eq!(title_case("virac"), "Virac");
    }
}
