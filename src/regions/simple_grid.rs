//! Uniform grid decomposition.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{geojson, RegionStrategy, RegionVariant};
use crate::constants::limits::MAX_GRID_CELLS;
use crate::constants::variants::SIMPLE_GRID;
use crate::error::{GeotallyError, Result};
use crate::geo::{CoordinateBox, SubAreaResult};
use crate::registry::tagged_record;
use crate::styles::StyleStrategy;

/// Fraction of the resolution below which a trailing cell counts as empty.
const TRAILING_CELL_EPSILON: f64 = 1e-9;

/// Square cells of side `resolution` tiled row-major over `bounds`.
///
/// The last row and column are clipped to the bounds, so the tiling is an
/// exact partition and the trailing edges equal `bounds.max_*` bit for bit.
///
/// Construction and deserialization both validate, so a grid in hand never
/// decomposes into more than [`MAX_GRID_CELLS`] cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridFields")]
pub struct SimpleGrid {
    #[serde(rename = "box")]
    bounds: CoordinateBox,
    resolution: f64,
}

/// Unchecked wire shape of a [`SimpleGrid`].
#[derive(Deserialize)]
struct GridFields {
    #[serde(rename = "box")]
    bounds: CoordinateBox,
    resolution: f64,
}

impl TryFrom<GridFields> for SimpleGrid {
    type Error = GeotallyError;

    fn try_from(fields: GridFields) -> Result<Self> {
        Self::new(fields.bounds, fields.resolution)
    }
}

impl SimpleGrid {
    pub fn new(bounds: CoordinateBox, resolution: f64) -> Result<Self> {
        let grid = Self { bounds, resolution };
        grid.validate()?;
        Ok(grid)
    }

    pub fn bounds(&self) -> CoordinateBox {
        self.bounds
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn rows(&self) -> usize {
        cell_count(self.bounds.min_lat, self.bounds.max_lat, self.resolution)
    }

    pub fn columns(&self) -> usize {
        cell_count(self.bounds.min_lon, self.bounds.max_lon, self.resolution)
    }

    fn edges(&self, min: f64, max: f64, count: usize) -> Vec<(f64, f64)> {
        (0..count)
            .map(|i| {
                let start = min + i as f64 * self.resolution;
                let stop = if i + 1 == count {
                    max
                } else {
                    (min + (i + 1) as f64 * self.resolution).min(max)
                };
                (start, stop)
            })
            .collect()
    }
}

/// `ceil(span / resolution)` cells, minus a trailing cell that would start
/// on the max edge through floating error.
fn cell_count(min: f64, max: f64, resolution: f64) -> usize {
    let mut count = ((max - min) / resolution).ceil().max(1.0) as usize;
    while count > 1 {
        let last_start = min + (count - 1) as f64 * resolution;
        if last_start < max - TRAILING_CELL_EPSILON * resolution {
            break;
        }
        count -= 1;
    }
    count
}

impl RegionStrategy for SimpleGrid {
    fn variant(&self) -> &'static str {
        SIMPLE_GRID
    }

    fn decompose(&self) -> Vec<CoordinateBox> {
        let rows = self.edges(self.bounds.min_lat, self.bounds.max_lat, self.rows());
        let columns = self.edges(self.bounds.min_lon, self.bounds.max_lon, self.columns());

        let mut boxes = Vec::with_capacity(rows.len() * columns.len());
        for &(min_lat, max_lat) in &rows {
            for &(min_lon, max_lon) in &columns {
                boxes.push(CoordinateBox {
                    min_lat,
                    min_lon,
                    max_lat,
                    max_lon,
                });
            }
        }

        debug!(
            bounds = %self.bounds,
            resolution = self.resolution,
            rows = rows.len(),
            columns = columns.len(),
            "Decomposed region into grid cells"
        );
        boxes
    }

    fn encode(&self, results: &[SubAreaResult], style: &mut dyn StyleStrategy) -> Result<Value> {
        style.prepare(results);

        let features = results
            .iter()
            .map(|result| -> Result<Value> {
                let mut properties = style.style_one(result)?;
                properties.insert("value".to_string(), Value::from(result.value));
                Ok(geojson::polygon_feature(&result.coordinate_box, properties))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(geojson::feature_collection(features))
    }

    fn to_record(&self) -> Result<Value> {
        tagged_record(SIMPLE_GRID, self)
    }
}

impl RegionVariant for SimpleGrid {
    const VARIANT: &'static str = SIMPLE_GRID;

    fn validate(&self) -> Result<()> {
        self.bounds.validate()?;
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(GeotallyError::Validation(format!(
                "grid resolution must be a positive number, got {}",
                self.resolution
            )));
        }

        // Checked in f64 before any cast to usize can saturate
        let rows = (self.bounds.lat_span() / self.resolution).ceil();
        let columns = (self.bounds.lon_span() / self.resolution).ceil();
        let cells = rows.max(1.0) * columns.max(1.0);
        if cells > MAX_GRID_CELLS as f64 {
            return Err(GeotallyError::Validation(format!(
                "grid resolution {} over {} yields about {cells:.0} cells, limit is {MAX_GRID_CELLS}",
                self.resolution, self.bounds
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::{ColorSwatch, HeatMapStyle};
    use serde_json::json;

    fn unit_box() -> CoordinateBox {
        CoordinateBox::new(0.0, 0.0, 1.0, 1.0).unwrap()
    }

    #[test]
    fn test_uneven_resolution_clips_last_row_and_column() {
        let grid = SimpleGrid::new(unit_box(), 0.6).unwrap();
        let boxes = grid.decompose();

        let expected = [
            (0.0, 0.0, 0.6, 0.6),
            (0.0, 0.6, 0.6, 1.0),
            (0.6, 0.0, 1.0, 0.6),
            (0.6, 0.6, 1.0, 1.0),
        ];
        assert_eq!(boxes.len(), expected.len());
        for (cell, (min_lat, min_lon, max_lat, max_lon)) in boxes.iter().zip(expected) {
            assert_eq!(cell.min_lat, min_lat);
            assert_eq!(cell.min_lon, min_lon);
            assert_eq!(cell.max_lat, max_lat);
            assert_eq!(cell.max_lon, max_lon);
        }
    }

    #[test]
    fn test_exact_division_emits_no_degenerate_cell() {
        let grid = SimpleGrid::new(unit_box(), 0.5).unwrap();
        assert_eq!(grid.decompose().len(), 4);

        let grid = SimpleGrid::new(CoordinateBox::new(0.0, 0.0, 0.3, 0.3).unwrap(), 0.1).unwrap();
        let boxes = grid.decompose();
        assert_eq!(boxes.len(), 9);
        assert!(boxes.iter().all(|b| b.validate().is_ok()));
    }

    #[test]
    fn test_resolution_larger_than_region() {
        let grid = SimpleGrid::new(unit_box(), 5.0).unwrap();
        assert_eq!(grid.decompose(), vec![unit_box()]);
    }

    #[test]
    fn test_invalid_resolution_rejected() {
        assert!(SimpleGrid::new(unit_box(), 0.0).is_err());
        assert!(SimpleGrid::new(unit_box(), -1.0).is_err());
        assert!(SimpleGrid::new(unit_box(), f64::INFINITY).is_err());
    }

    #[test]
    fn test_resolution_too_fine_rejected() {
        for resolution in [1e-300, 1e-6, 1e-3 * 0.99] {
            let err = SimpleGrid::new(unit_box(), resolution).unwrap_err();
            assert!(matches!(err, GeotallyError::Validation(_)), "{resolution}: {err}");
        }

        // Exactly at the limit is still accepted
        let grid = SimpleGrid::new(unit_box(), 1e-3).unwrap();
        assert_eq!(grid.rows() * grid.columns(), MAX_GRID_CELLS);
    }

    #[test]
    fn test_deserializing_validates() {
        let too_fine = json!({
            "box": {"min_lat": 0.0, "min_lon": 0.0, "max_lat": 1.0, "max_lon": 1.0},
            "resolution": 1e-300
        });
        assert!(serde_json::from_value::<SimpleGrid>(too_fine).is_err());

        let zero = json!({
            "box": {"min_lat": 0.0, "min_lon": 0.0, "max_lat": 1.0, "max_lon": 1.0},
            "resolution": 0.0
        });
        assert!(serde_json::from_value::<SimpleGrid>(zero).is_err());
    }

    #[test]
    fn test_record_uses_box_key() {
        let grid = SimpleGrid::new(unit_box(), 0.25).unwrap();
        let record = grid.to_record().unwrap();
        assert_eq!(
            record,
            json!({
                "variant": "simple_grid",
                "box": {"min_lat": 0.0, "min_lon": 0.0, "max_lat": 1.0, "max_lon": 1.0},
                "resolution": 0.25
            })
        );
    }

    #[test]
    fn test_encode_one_feature_per_result() {
        let grid = SimpleGrid::new(unit_box(), 0.5).unwrap();
        let boxes = grid.decompose();
        let results: Vec<SubAreaResult> = boxes
            .iter()
            .enumerate()
            .map(|(i, b)| SubAreaResult::new(*b, i as f64))
            .collect();

        let swatch = ColorSwatch::new(["#eeeeee", "#999999", "#333333", "#000000"]).unwrap();
        let mut style = HeatMapStyle::new(swatch);
        let encoded = grid.encode(&results, &mut style).unwrap();

        let features = encoded["features"].as_array().unwrap();
        assert_eq!(encoded["type"], "FeatureCollection");
        assert_eq!(features.len(), 4);
        assert_eq!(features[0]["properties"]["fill"], "#eeeeee");
        assert_eq!(features[3]["properties"]["fill"], "#000000");
        assert_eq!(features[2]["properties"]["value"], json!(2.0));
    }

    #[test]
    fn test_encode_empty_results() {
        let grid = SimpleGrid::new(unit_box(), 0.5).unwrap();
        let swatch = ColorSwatch::new(["#000000"]).unwrap();
        let encoded = grid.encode(&[], &mut HeatMapStyle::new(swatch)).unwrap();
        assert!(encoded["features"].as_array().unwrap().is_empty());
    }
}
