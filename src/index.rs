// src/index.rs
//! Snapshot of what is already on the board, rebuilt every run.

use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::{info, warn};

use crate::community::{Community, ListingPost, ListingView};
use crate::error::MirrorError;

/// A post that counts as "already mirrored". The URL is stored raw and
/// normalized at comparison time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingPost {
    pub url: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl ExistingPost {
    /// `None` for posts that must not take part in duplicate checks.
    fn from_listing(p: ListingPost) -> Option<Self> {
        if p.url.is_empty() || p.deleted {
            return None;
        }
        Some(Self {
            url: p.url,
            title: p.title,
            created_at: p.created_at,
        })
    }
}

/// Fetch every view and merge them. Fails only when no view could be read.
pub async fn build_index(
    community: &dyn Community,
    board: &str,
    limit: u32,
) -> Result<Vec<ExistingPost>, MirrorError> {
    info!(board, community = community.name(), "getting existing posts");

    let mut outcomes = Vec::with_capacity(ListingView::ALL.len());
    for view in ListingView::ALL {
        let res = community.fetch_listing(board, view, limit).await;
        if let Err(e) = &res {
            warn!(view = %view, error = ?e, "failed to get listing");
            counter!("mirror_listing_errors_total").increment(1);
        }
        outcomes.push((view, res));
    }

    let posts = merge_listings(outcomes)?;
    if posts.is_empty() {
        info!("no existing posts found");
    } else {
        info!(posts = posts.len(), "found existing posts across new/hot/top");
    }
    Ok(posts)
}

#[derive(Default)]
struct Merge {
    posts: Vec<ExistingPost>,
    views: usize,
    succeeded: usize,
    last_error: Option<String>,
}

/// Succeed if at least one view succeeded; keep posts in view order.
pub fn merge_listings(
    outcomes: Vec<(ListingView, anyhow::Result<Vec<ListingPost>>)>,
) -> Result<Vec<ExistingPost>, MirrorError> {
    let merged = outcomes
        .into_iter()
        .fold(Merge::default(), |mut acc, (view, res)| {
            acc.views += 1;
            match res {
                Ok(listing) => {
                    acc.succeeded += 1;
                    acc.posts
                        .extend(listing.into_iter().filter_map(ExistingPost::from_listing));
                }
                Err(e) => acc.last_error = Some(format!("{view}: {e:#}")),
            }
            acc
        });

    if merged.succeeded == 0 {
        return Err(MirrorError::AllListingsFailed {
            views: merged.views,
            last: merged
                .last_error
                .unwrap_or_else(|| "no listing views requested".to_string()),
        });
    }
    Ok(merged.posts)
}
