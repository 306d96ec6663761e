//! # Data Sources
//!
//! The raw data a worker aggregates over. Only the query interface lives
//! here; ingestion is someone else's job.

mod in_memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use in_memory::InMemoryTweetSource;
#[cfg(feature = "postgres")]
pub use postgres::PostgresTweetSource;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GeotallyError, Result};
use crate::geo::CoordinateBox;

/// A geotagged tweet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub timestamp: DateTime<Utc>,
}

impl Tweet {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64, timestamp: DateTime<Utc>) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeotallyError::Validation(format!(
                "expected -90 <= lat <= 90, got {lat}"
            )));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(GeotallyError::Validation(format!(
                "expected -180 <= lon <= 180, got {lon}"
            )));
        }
        Ok(Self {
            id: id.into(),
            lat,
            lon,
            timestamp,
        })
    }

    /// Inside `coordinate_box` (edges included) and no older than `since`
    pub fn matches(&self, coordinate_box: &CoordinateBox, since: Option<DateTime<Utc>>) -> bool {
        coordinate_box.contains(self.lat, self.lon)
            && since.map_or(true, |since| self.timestamp >= since)
    }
}

#[async_trait]
pub trait TweetSource: Send + Sync + 'static {
    /// Number of tweets inside `coordinate_box`, optionally only those at or
    /// after `since`
    async fn count_in_box(
        &self,
        coordinate_box: &CoordinateBox,
        since: Option<DateTime<Utc>>,
    ) -> Result<u64>;

    fn source_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_tweet_coordinates_validated() {
        let now = Utc::now();
        assert!(Tweet::new("1", 91.0, 0.0, now).is_err());
        assert!(Tweet::new("1", 0.0, -180.5, now).is_err());
        assert!(Tweet::new("1", -90.0, 180.0, now).is_ok());
    }

    #[test]
    fn test_matches_recency_bound() {
        let now = Utc::now();
        let cell = CoordinateBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let tweet = Tweet::new("1", 0.5, 0.5, now - Duration::hours(2)).unwrap();

        assert!(tweet.matches(&cell, None));
        assert!(tweet.matches(&cell, Some(now - Duration::hours(3))));
        assert!(tweet.matches(&cell, Some(tweet.timestamp)));
        assert!(!tweet.matches(&cell, Some(now - Duration::hours(1))));
    }
}
