// src/community/types.rs
use chrono::{DateTime, Utc};
use std::fmt;

/// Listing views the existing-post index is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingView {
    New,
    Hot,
    /// "top" restricted to the past week.
    TopWeek,
}

impl ListingView {
    pub const ALL: [ListingView; 3] = [ListingView::New, ListingView::Hot, ListingView::TopWeek];

    /// Path segment under `/r/<board>/`.
    pub fn path(self) -> &'static str {
        match self {
            ListingView::New => "new",
            ListingView::Hot => "hot",
            ListingView::TopWeek => "top",
        }
    }

    /// Query parameters for this view, besides `limit`.
    pub fn extra_params(self) -> &'static [(&'static str, &'static str)] {
        match self {
            ListingView::TopWeek => &[("t", "week")],
            _ => &[],
        }
    }
}

impl fmt::Display for ListingView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// One post as seen through a listing view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPost {
    pub url: String,
    pub title: String,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}
