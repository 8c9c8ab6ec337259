// src/duplicate.rs
use chrono::{DateTime, Utc};

use crate::index::ExistingPost;
use crate::similarity::is_similar_title;
use crate::url_norm::normalize_url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateReason {
    SameUrl,
    SimilarTitle,
}

/// First recent post that the candidate duplicates, and why.
///
/// Posts created strictly before `cutoff` are ignored. Stored URLs are
/// normalized on every call; the index is a few hundred entries at most.
pub fn find_duplicate<'a>(
    normalized_url: &str,
    title: &str,
    posts: &'a [ExistingPost],
    cutoff: DateTime<Utc>,
) -> Option<(&'a ExistingPost, DuplicateReason)> {
    let title_lower = title.to_lowercase();

    for post in posts {
        if post.created_at < cutoff {
            continue;
        }
        if normalize_url(&post.url) == normalized_url {
            return Some((post, DuplicateReason::SameUrl));
        }
        if is_similar_title(&title_lower, &post.title.to_lowercase()) {
            tracing::info!(candidate = title, existing = %post.title, "similar title found");
            return Some((post, DuplicateReason::SimilarTitle));
        }
    }
    None
}

pub fn is_duplicate(
    normalized_url: &str,
    title: &str,
    posts: &[ExistingPost],
    cutoff: DateTime<Utc>,
) -> bool {
    find_duplicate(normalized_url, title, posts, cutoff).is_some()
}
