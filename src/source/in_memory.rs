use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{Tweet, TweetSource};
use crate::error::Result;
use crate::geo::CoordinateBox;

#[derive(Debug, Default)]
pub struct InMemoryTweetSource {
    tweets: RwLock<Vec<Tweet>>,
}

impl InMemoryTweetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tweets(tweets: impl IntoIterator<Item = Tweet>) -> Self {
        Self {
            tweets: RwLock::new(tweets.into_iter().collect()),
        }
    }

    pub fn add(&self, tweet: Tweet) {
        self.tweets.write().push(tweet);
    }

    pub fn len(&self) -> usize {
        self.tweets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweets.read().is_empty()
    }
}

#[async_trait]
impl TweetSource for InMemoryTweetSource {
    async fn count_in_box(
        &self,
        coordinate_box: &CoordinateBox,
        since: Option<DateTime<Utc>>,
    ) -> Result<u64> {
        let tweets = self.tweets.read();
        Ok(tweets
            .iter()
            .filter(|tweet| tweet.matches(coordinate_box, since))
            .count() as u64)
    }

    fn source_name(&self) -> &'static str {
        "in_memory"
    }
}
