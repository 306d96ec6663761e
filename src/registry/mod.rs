//! # Variant Registry
//!
//! Reconstructs polymorphic strategies from their tagged records.
//!
//! Every serialized strategy is a JSON object carrying a `variant` key next to
//! its own fields. A [`VariantRegistry`] maps each variant name to a factory
//! closure; deserializing is a table lookup followed by the factory call.
//! New variants are added with [`VariantRegistry::register`] and the
//! dispatcher itself never changes.
//!
//! ```rust
//! use geotally::regions::RegionRegistry;
//! use serde_json::json;
//!
//! # fn example() -> geotally::Result<()> {
//! let registry = RegionRegistry::regions();
//! let strategy = registry.from_record(&json!({
//!     "variant": "simple_grid",
//!     "box": {"min_lat": 0.0, "min_lon": 0.0, "max_lat": 1.0, "max_lon": 1.0},
//!     "resolution": 0.5
//! }))?;
//! assert_eq!(strategy.decompose().len(), 4);
//! # Ok(())
//! # }
//! ```

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::constants::variants::VARIANT_KEY;
use crate::error::{GeotallyError, Result};

/// Builds one variant from its full tagged record.
pub type VariantFactory<T> = Arc<dyn Fn(Value) -> Result<Box<T>> + Send + Sync>;

/// Name → factory table for one strategy family.
pub struct VariantRegistry<T: ?Sized> {
    family: &'static str,
    factories: HashMap<String, VariantFactory<T>>,
}

impl<T: ?Sized> VariantRegistry<T> {
    /// Create an empty registry for the named family (used in error messages)
    pub fn new(family: &'static str) -> Self {
        Self {
            family,
            factories: HashMap::new(),
        }
    }

    /// Register a factory, replacing any previous one under the same name
    pub fn register<F>(&mut self, variant: impl Into<String>, factory: F)
    where
        F: Fn(Value) -> Result<Box<T>> + Send + Sync + 'static,
    {
        let variant = variant.into();
        debug!(family = self.family, variant = %variant, "Registering strategy variant");
        self.factories.insert(variant, Arc::new(factory));
    }

    pub fn contains(&self, variant: &str) -> bool {
        self.factories.contains_key(variant)
    }

    /// Registered variant names, sorted
    pub fn variants(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn family(&self) -> &'static str {
        self.family
    }

    /// Rebuild a strategy from its tagged record.
    ///
    /// A missing tag is a validation error; an unregistered tag is
    /// [`GeotallyError::UnknownVariant`]. Neither is worth retrying.
    pub fn from_record(&self, record: &Value) -> Result<Box<T>> {
        let variant = variant_of(record)?;
        let factory = self
            .factories
            .get(variant)
            .ok_or_else(|| GeotallyError::unknown_variant(self.family, variant))?;
        factory(record.clone())
    }
}

impl<T: ?Sized> fmt::Debug for VariantRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantRegistry")
            .field("family", &self.family)
            .field("variants", &self.variants())
            .finish()
    }
}

impl<T: ?Sized> Clone for VariantRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            family: self.family,
            factories: self.factories.clone(),
        }
    }
}

/// Read the variant tag of a record
pub fn variant_of(record: &Value) -> Result<&str> {
    record
        .get(VARIANT_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            GeotallyError::Validation(format!("record is missing a '{VARIANT_KEY}' tag: {record}"))
        })
}

/// Serialize `state` as an object and stamp it with the variant tag
pub fn tagged_record<S: Serialize>(variant: &str, state: &S) -> Result<Value> {
    let mut value = serde_json::to_value(state)?;
    let object = value.as_object_mut().ok_or_else(|| {
        GeotallyError::Validation(format!("variant '{variant}' did not serialize to an object"))
    })?;
    object.insert(VARIANT_KEY.to_string(), Value::String(variant.to_string()));
    Ok(value)
}
