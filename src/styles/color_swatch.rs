//! Ordered palette of color tokens used by style strategies.

use serde::{Deserialize, Serialize};

use crate::constants::variants::COLOR_SWATCH;
use crate::error::{GeotallyError, Result};

/// Non-empty, indexable list of colors (usually `#RRGGBB`).
///
/// Serializes to its own tagged record
/// `{"variant": "color_swatch", "colors": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ColorSwatchRecord", into = "ColorSwatchRecord")]
pub struct ColorSwatch {
    colors: Vec<String>,
}

impl ColorSwatch {
    pub fn new<I, S>(colors: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let colors: Vec<String> = colors.into_iter().map(Into::into).collect();
        if colors.is_empty() {
            return Err(GeotallyError::Validation(
                "color swatch needs at least one color".to_string(),
            ));
        }
        Ok(Self { colors })
    }

    /// Bounds-checked lookup
    pub fn color_at(&self, index: usize) -> Result<&str> {
        self.colors.get(index).map(String::as_str).ok_or_else(|| {
            GeotallyError::Validation(format!(
                "color index {index} out of range for swatch of {} colors",
                self.colors.len()
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// False for any swatch built through [`ColorSwatch::new`]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColorSwatchRecord {
    variant: String,
    colors: Vec<String>,
}

impl TryFrom<ColorSwatchRecord> for ColorSwatch {
    type Error = GeotallyError;

    fn try_from(record: ColorSwatchRecord) -> Result<Self> {
        if record.variant != COLOR_SWATCH {
            return Err(GeotallyError::unknown_variant(
                "color swatch",
                record.variant,
            ));
        }
        ColorSwatch::new(record.colors)
    }
}

impl From<ColorSwatch> for ColorSwatchRecord {
    fn from(swatch: ColorSwatch) -> Self {
        Self {
            variant: COLOR_SWATCH.to_string(),
            colors: swatch.colors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_swatch_rejected() {
        assert!(ColorSwatch::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_color_at_is_bounds_checked() {
        let swatch = ColorSwatch::new(["#000000", "#ffffff"]).unwrap();
        assert_eq!(swatch.len(), 2);
        assert_eq!(swatch.color_at(1).unwrap(), "#ffffff");
        assert!(swatch.color_at(2).is_err());
    }

    #[test]
    fn test_tagged_record_shape() {
        let swatch = ColorSwatch::new(["#ff0000"]).unwrap();
        let record = serde_json::to_value(&swatch).unwrap();
        assert_eq!(record, json!({"variant": "color_swatch", "colors": ["#ff0000"]}));

        let back: ColorSwatch = serde_json::from_value(record).unwrap();
        assert_eq!(back, swatch);
    }

    #[test]
    fn test_wrong_tag_rejected() {
        let result = serde_json::from_value::<ColorSwatch>(json!({
            "variant": "gradient",
            "colors": ["#ff0000"]
        }));
        assert!(result.is_err());

        let result = serde_json::from_value::<ColorSwatch>(json!({
            "variant": "color_swatch",
            "colors": []
        }));
        assert!(result.is_err());
    }
}
