// tests/common/mod.rs
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use feed_mirror::{Community, FeedEntry, ListingPost, ListingView};
use std::collections::HashSet;
use std::sync::Mutex;

pub const HN_ITEM: &str = "https://news.ycombinator.com/item?id=";

/// In-memory board. Every listing view returns `listing`, except views in
/// `failing_views`. Posts whose title is in `failing_titles` are rejected.
#[derive(Default)]
pub struct FakeCommunity {
    pub listing: Vec<ListingPost>,
    pub failing_views: HashSet<ListingView>,
    pub failing_titles: HashSet<String>,
    pub fail_replies: bool,
    pub empty_post_ids: bool,
    pub listing_calls: Mutex<Vec<ListingView>>,
    pub attempts: Mutex<Vec<String>>,
    pub posts: Mutex<Vec<(String, String, String)>>,
    pub replies: Mutex<Vec<(String, String)>>,
}

impl FakeCommunity {
    pub fn attempted_titles(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn posted_links(&self) -> Vec<String> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, link)| link.clone())
            .collect()
    }

    pub fn reply_log(&self) -> Vec<(String, String)> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl Community for FakeCommunity {
    async fn fetch_listing(
        &self,
        _board: &str,
        view: ListingView,
        _limit: u32,
    ) -> Result<Vec<ListingPost>> {
        self.listing_calls.lock().unwrap().push(view);
        if self.failing_views.contains(&view) {
            return Err(anyhow!("{view} listing unavailable"));
        }
        Ok(self.listing.clone())
    }

    async fn create_post(&self, board: &str, title: &str, link: &str) -> Result<String> {
        self.attempts.lock().unwrap().push(title.to_string());
        if self.failing_titles.contains(title) {
            return Err(anyhow!("submission rejected"));
        }
        if self.empty_post_ids {
            return Ok(String::new());
        }
        let mut posts = self.posts.lock().unwrap();
        posts.push((board.to_string(), title.to_string(), link.to_string()));
        Ok(format!("t3_{}", posts.len()))
    }

    async fn create_reply(&self, parent_id: &str, body: &str) -> Result<String> {
        if self.fail_replies {
            return Err(anyhow!("comment rejected"));
        }
        let mut replies = self.replies.lock().unwrap();
        replies.push((parent_id.to_string(), body.to_string()));
        Ok(format!("t1_{}", replies.len()))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

pub fn entry(title: &str, link: &str, hn_id: u32) -> FeedEntry {
    FeedEntry {
        title: title.to_string(),
        link: link.to_string(),
        guid: format!("{HN_ITEM}{hn_id}"),
        published_at: Some(Utc::now()),
    }
}

pub fn listed(url: &str, title: &str, age_hours: i64, now: DateTime<Utc>) -> ListingPost {
    ListingPost {
        url: url.to_string(),
        title: title.to_string(),
        deleted: false,
        created_at: now - Duration::hours(age_hours),
    }
}
