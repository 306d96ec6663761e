//! # Region Strategies
//!
//! Decompose a region into sub-areas and encode the finished result set.
//!
//! The serialized strategy is stored on the job at creation time and drives
//! the final encoding, so every variant must round-trip through its tagged
//! record without changing its decomposition.

pub mod geojson;
pub mod simple_grid;

pub use simple_grid::SimpleGrid;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::error::Result;
use crate::geo::{CoordinateBox, SubAreaResult};
use crate::registry::VariantRegistry;
use crate::styles::StyleStrategy;

pub trait RegionStrategy: Send + Sync + fmt::Debug {
    fn variant(&self) -> &'static str;

    /// Sub-area boxes in a stable order; the length is the job's expected
    /// sub-area count.
    fn decompose(&self) -> Vec<CoordinateBox>;

    /// Render results as a feature collection, styled by `style`.
    ///
    /// Calls `style.prepare` once with the whole set before styling.
    fn encode(&self, results: &[SubAreaResult], style: &mut dyn StyleStrategy) -> Result<Value>;

    fn to_record(&self) -> Result<Value>;
}

/// A concrete region strategy that can register itself with a
/// [`RegionRegistry`].
pub trait RegionVariant: RegionStrategy + Serialize + DeserializeOwned + 'static {
    const VARIANT: &'static str;

    /// Checked after every rebuild from a record
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

pub type RegionRegistry = VariantRegistry<dyn RegionStrategy>;

impl VariantRegistry<dyn RegionStrategy> {
    /// Registry holding every built-in region strategy
    pub fn regions() -> Self {
        let mut registry = Self::new("region strategy");
        registry.register_variant::<SimpleGrid>();
        registry
    }

    pub fn register_variant<V: RegionVariant>(&mut self) {
        self.register(V::VARIANT, |record: Value| {
            let strategy: V = serde_json::from_value(record)?;
            strategy.validate()?;
            Ok(Box::new(strategy) as Box<dyn RegionStrategy>)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeotallyError;
    use serde_json::json;

    #[test]
    fn test_simple_grid_round_trip() {
        let grid = SimpleGrid::new(CoordinateBox::new(10.0, -5.0, 12.5, -1.0).unwrap(), 0.7)
            .unwrap();
        let record = grid.to_record().unwrap();

        let rebuilt = RegionRegistry::regions().from_record(&record).unwrap();
        assert_eq!(rebuilt.variant(), "simple_grid");
        assert_eq!(rebuilt.decompose(), grid.decompose());
        assert_eq!(rebuilt.to_record().unwrap(), record);
    }

    #[test]
    fn test_invalid_record_is_rejected() {
        let registry = RegionRegistry::regions();
        let err = registry
            .from_record(&json!({
                "variant": "simple_grid",
                "box": {"min_lat": 1.0, "min_lon": 0.0, "max_lat": 0.0, "max_lon": 1.0},
                "resolution": 0.5
            }))
            .unwrap_err();
        assert!(matches!(err, GeotallyError::Validation(_)));

        let err = registry
            .from_record(&json!({"variant": "simple_grid", "resolution": 0.5}))
            .unwrap_err();
        assert!(matches!(err, GeotallyError::Validation(_)));
    }

    #[test]
    fn test_open_for_extension() {
        #[derive(Debug, serde::Serialize, serde::Deserialize)]
        struct SingleCell {
            #[serde(rename = "box")]
            bounds: CoordinateBox,
        }

        impl RegionStrategy for SingleCell {
            fn variant(&self) -> &'static str {
                "single_cell"
            }
            fn decompose(&self) -> Vec<CoordinateBox> {
                vec![self.bounds]
            }
            fn encode(
                &self,
                results: &[SubAreaResult],
                _style: &mut dyn StyleStrategy,
            ) -> Result<Value> {
                Ok(json!({"count": results.len()}))
            }
            fn to_record(&self) -> Result<Value> {
                crate::registry::tagged_record("single_cell", self)
            }
        }

        impl RegionVariant for SingleCell {
            const VARIANT: &'static str = "single_cell";
        }

        let mut registry = RegionRegistry::regions();
        registry.register_variant::<SingleCell>();
        assert_eq!(registry.variants(), vec!["simple_grid", "single_cell"]);

        let strategy = registry
            .from_record(&json!({
                "variant": "single_cell",
                "box": {"min_lat": 0.0, "min_lon": 0.0, "max_lat": 1.0, "max_lon": 1.0}
            }))
            .unwrap();
        assert_eq!(strategy.decompose().len(), 1);
    }
}
