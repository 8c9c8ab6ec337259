// src/community/mod.rs
pub mod reddit;
pub mod types;

use anyhow::Result;

pub use types::{ListingPost, ListingView};

/// Remote board the feed is mirrored into. Implementations own auth and
/// rate limiting; callers invoke one method at a time.
#[async_trait::async_trait]
pub trait Community: Send + Sync {
    async fn fetch_listing(
        &self,
        board: &str,
        view: ListingView,
        limit: u32,
    ) -> Result<Vec<ListingPost>>;

    /// Creates a link post, returning its id.
    async fn create_post(&self, board: &str, title: &str, link: &str) -> Result<String>;

    /// Creates a reply under `parent_id`, returning its id.
    async fn create_reply(&self, parent_id: &str, body: &str) -> Result<String>;

    fn name(&self) -> &'static str;
}
