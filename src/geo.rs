//! # Geographic Primitives
//!
//! Coordinate boxes and the per-sub-area results accumulated on a job.

use serde::{Deserialize, Serialize};

use crate::error::{GeotallyError, Result};

/// Axis-aligned latitude/longitude box.
///
/// Valid boxes satisfy `min_lat < max_lat` and `min_lon < max_lon`; use
/// [`CoordinateBox::new`] or [`CoordinateBox::validate`] to enforce it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl CoordinateBox {
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Result<Self> {
        let coordinate_box = Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        };
        coordinate_box.validate()?;
        Ok(coordinate_box)
    }

    pub fn validate(&self) -> Result<()> {
        let finite = [self.min_lat, self.min_lon, self.max_lat, self.max_lon]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(GeotallyError::Validation(format!(
                "coordinate box has non-finite bounds: {self}"
            )));
        }
        if self.min_lat >= self.max_lat || self.min_lon >= self.max_lon {
            return Err(GeotallyError::Validation(format!(
                "coordinate box must satisfy min < max on both axes: {self}"
            )));
        }
        Ok(())
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Inclusive on every edge, so a point on a shared border belongs to both
    /// neighbouring cells.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.min_lat <= lat && lat <= self.max_lat && self.min_lon <= lon && lon <= self.max_lon
    }

    /// Exact bit pattern of the four bounds, usable as a hash key.
    pub fn key_bits(&self) -> [u64; 4] {
        [
            self.min_lat.to_bits(),
            self.min_lon.to_bits(),
            self.max_lat.to_bits(),
            self.max_lon.to_bits(),
        ]
    }
}

impl std::fmt::Display for CoordinateBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {})-({}, {})",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }
}

/// Metric computed for one sub-area of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubAreaResult {
    pub coordinate_box: CoordinateBox,
    pub value: f64,
}

impl SubAreaResult {
    pub fn new(coordinate_box: CoordinateBox, value: f64) -> Self {
        Self {
            coordinate_box,
            value,
        }
    }
}
