// src/feed/mod.rs
pub mod hnrss;

use anyhow::Result;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// One item from the feed, in feed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    /// Globally-unique id; for aggregator feeds this is the discussion page.
    pub guid: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl FeedEntry {
    /// Why the entry cannot be mirrored, if anything.
    pub fn defect(&self) -> Option<&'static str> {
        if self.published_at.is_none() {
            Some("no publish date")
        } else if self.link.trim().is_empty() {
            Some("empty link")
        } else if self.title.trim().is_empty() {
            Some("empty title")
        } else {
            None
        }
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed http error: {0}")]
    Http(String),

    #[error("failed to parse feed: {0}")]
    Parse(String),

    #[error("feed items are empty")]
    Empty,

    #[error("feed item at index {index} has {reason}")]
    MalformedEntry { index: usize, reason: &'static str },
}

/// Upstream feed. A successful fetch is non-empty and every entry carries a
/// publish date.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>>;
    fn name(&self) -> &'static str;
}

/// Whole-feed checks applied right after parsing.
pub fn validate_entries(entries: &[FeedEntry]) -> Result<(), FeedError> {
    if entries.is_empty() {
        return Err(FeedError::Empty);
    }
    if let Some(index) = entries.iter().position(|e| e.published_at.is_none()) {
        return Err(FeedError::MalformedEntry {
            index,
            reason: "no publish date",
        });
    }
    Ok(())
}
