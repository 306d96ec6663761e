//! Heat map styling: each result gets a swatch color proportional to its value.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{ColorSwatch, StyleAttributes, StyleStrategy, StyleVariant};
use crate::constants::variants::HEAT_MAP;
use crate::error::{GeotallyError, Result};
use crate::geo::SubAreaResult;
use crate::registry::tagged_record;

/// Property key carrying the fill color.
pub const FILL: &str = "fill";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatMapStyle {
    pub color_swatch: ColorSwatch,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
}

impl HeatMapStyle {
    pub fn new(color_swatch: ColorSwatch) -> Self {
        Self {
            color_swatch,
            min_value: None,
            max_value: None,
        }
    }

    /// Start from precomputed bounds instead of calling `prepare`
    pub fn with_bounds(color_swatch: ColorSwatch, min_value: f64, max_value: f64) -> Self {
        Self {
            color_swatch,
            min_value: Some(min_value),
            max_value: Some(max_value),
        }
    }

    /// Swatch index for `value`, clamped to the swatch.
    pub fn heat_index(&self, value: f64) -> Result<usize> {
        let (Some(min_value), Some(max_value)) = (self.min_value, self.max_value) else {
            return Err(GeotallyError::InvalidState(
                "heat map must be prepared before styling results".to_string(),
            ));
        };

        let last = self.color_swatch.len() - 1;
        let range = max_value - min_value;
        if range <= 0.0 {
            return Ok(0);
        }

        let raw = ((value / range) * last as f64).floor();
        let index = if raw.is_nan() || raw <= 0.0 {
            0
        } else if raw >= last as f64 {
            last
        } else {
            raw as usize
        };
        Ok(index)
    }
}

impl StyleStrategy for HeatMapStyle {
    fn variant(&self) -> &'static str {
        HEAT_MAP
    }

    fn prepare(&mut self, results: &[SubAreaResult]) {
        let mut bounds: Option<(f64, f64)> = None;
        for result in results {
            bounds = Some(match bounds {
                None => (result.value, result.value),
                Some((lo, hi)) => (lo.min(result.value), hi.max(result.value)),
            });
        }

        if let Some((lo, hi)) = bounds {
            self.min_value = Some(lo);
            self.max_value = Some(hi);
            debug!(min_value = lo, max_value = hi, "Prepared heat map bounds");
        }
    }

    fn style_one(&self, result: &SubAreaResult) -> Result<StyleAttributes> {
        let index = self.heat_index(result.value)?;
        let color = self.color_swatch.color_at(index)?;

        let mut attributes = StyleAttributes::new();
        attributes.insert(FILL.to_string(), Value::String(color.to_string()));
        Ok(attributes)
    }

    fn to_record(&self) -> Result<Value> {
        tagged_record(HEAT_MAP, self)
    }

    fn clone_box(&self) -> Box<dyn StyleStrategy> {
        Box::new(self.clone())
    }
}

impl StyleVariant for HeatMapStyle {
    const VARIANT: &'static str = HEAT_MAP;
}
