//! # Style Strategies
//!
//! Derive per-result visual attributes from a finished result set.
//!
//! A style is used in two phases: [`StyleStrategy::prepare`] sees the whole
//! result set once, then [`StyleStrategy::style_one`] is called per result.
//! Styles round-trip through tagged records and are rebuilt with a
//! [`StyleRegistry`].

pub mod color_swatch;
pub mod heat_map;

pub use color_swatch::ColorSwatch;
pub use heat_map::HeatMapStyle;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::error::Result;
use crate::geo::SubAreaResult;
use crate::registry::VariantRegistry;

/// Attributes merged into a feature's properties.
pub type StyleAttributes = serde_json::Map<String, Value>;

pub trait StyleStrategy: Send + Sync + fmt::Debug {
    fn variant(&self) -> &'static str;

    /// Scan the complete result set. Must run before `style_one`.
    fn prepare(&mut self, results: &[SubAreaResult]);

    fn style_one(&self, result: &SubAreaResult) -> Result<StyleAttributes>;

    /// Tagged record accepted by [`StyleRegistry::from_record`]
    fn to_record(&self) -> Result<Value>;

    fn clone_box(&self) -> Box<dyn StyleStrategy>;
}

impl Clone for Box<dyn StyleStrategy> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// A concrete style that can register itself with a [`StyleRegistry`].
pub trait StyleVariant: StyleStrategy + Serialize + DeserializeOwned + Sized + 'static {
    const VARIANT: &'static str;
}

pub type StyleRegistry = VariantRegistry<dyn StyleStrategy>;

impl VariantRegistry<dyn StyleStrategy> {
    /// Registry holding every built-in style
    pub fn styles() -> Self {
        let mut registry = Self::new("style strategy");
        registry.register_variant::<HeatMapStyle>();
        registry
    }

    /// Register `V` under its own tag
    pub fn register_variant<V: StyleVariant>(&mut self) {
        self.register(V::VARIANT, |record: Value| {
            let style: V = serde_json::from_value(record)?;
            Ok(Box::new(style) as Box<dyn StyleStrategy>)
        });
    }
}

/// Rebuild a style from its tagged record with the built-in registry
pub fn style_from_record(record: &Value) -> Result<Box<dyn StyleStrategy>> {
    StyleRegistry::styles().from_record(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeotallyError;
    use crate::geo::CoordinateBox;
    use serde_json::json;

    #[test]
    fn test_heat_map_round_trip() {
        let swatch = ColorSwatch::new(["#fee5d9", "#fcae91", "#fb6a4a", "#cb181d"]).unwrap();
        let original = HeatMapStyle::with_bounds(swatch, 0.0, 12.0);

        let record = original.to_record().unwrap();
        let rebuilt = style_from_record(&record).unwrap();
        assert_eq!(rebuilt.variant(), "heat_map");
        assert_eq!(rebuilt.to_record().unwrap(), record);

        let cell = CoordinateBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        for value in [0.0, 3.0, 7.5, 12.0] {
            let result = SubAreaResult::new(cell, value);
            assert_eq!(
                original.style_one(&result).unwrap(),
                rebuilt.style_one(&result).unwrap()
            );
        }
    }

    #[test]
    fn test_unknown_style_variant() {
        let err = style_from_record(&json!({"variant": "choropleth"})).unwrap_err();
        assert!(matches!(err, GeotallyError::UnknownVariant { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unprepared_record_rebuilds_without_bounds() {
        let record = json!({
            "variant": "heat_map",
            "color_swatch": {"variant": "color_swatch", "colors": ["#000000", "#ffffff"]}
        });
        let mut style = style_from_record(&record).unwrap();

        let cell = CoordinateBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let results = vec![SubAreaResult::new(cell, 1.0), SubAreaResult::new(cell, 3.0)];
        assert!(style.style_one(&results[0]).is_err());

        style.prepare(&results);
        assert_eq!(style.style_one(&results[1]).unwrap()["fill"], json!("#ffffff"));
    }
}
