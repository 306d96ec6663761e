//! GeoJSON builders used by region encoders.

use serde_json::{json, Map, Value};

use crate::geo::CoordinateBox;

/// Closed exterior ring of a box, `[lon, lat]` ordered, counter-clockwise.
pub fn box_ring(coordinate_box: &CoordinateBox) -> Value {
    let CoordinateBox {
        min_lat,
        min_lon,
        max_lat,
        max_lon,
    } = *coordinate_box;

    json!([
        [min_lon, min_lat],
        [max_lon, min_lat],
        [max_lon, max_lat],
        [min_lon, max_lat],
        [min_lon, min_lat]
    ])
}

pub fn polygon_feature(coordinate_box: &CoordinateBox, properties: Map<String, Value>) -> Value {
    json!({
        "type": "Feature",
        "geometry": {
            "type": "Polygon",
            "coordinates": [box_ring(coordinate_box)]
        },
        "properties": Value::Object(properties)
    })
}

pub fn feature_collection(features: Vec<Value>) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": features
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_is_closed() {
        let cell = CoordinateBox::new(1.0, 2.0, 3.0, 4.0).unwrap();
        let ring = box_ring(&cell);
        let points = ring.as_array().unwrap();
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], points[4]);
        assert_eq!(points[0], json!([2.0, 1.0]));
        assert_eq!(points[2], json!([4.0, 3.0]));
    }

    #[test]
    fn test_feature_shape() {
        let cell = CoordinateBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let mut properties = Map::new();
        properties.insert("value".to_string(), json!(3.0));

        let feature = polygon_feature(&cell, properties);
        assert_eq!(feature["type"], "Feature");
        assert_eq!(feature["geometry"]["type"], "Polygon");
        assert_eq!(feature["properties"]["value"], json!(3.0));

        let collection = feature_collection(vec![feature]);
        assert_eq!(collection["features"].as_array().unwrap().len(), 1);
    }
}
