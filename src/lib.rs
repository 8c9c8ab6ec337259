// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod community;
pub mod config;
pub mod duplicate;
pub mod error;
pub mod feed;
pub mod index;
pub mod processor;
pub mod scheduler;
pub mod similarity;
pub mod url_norm;

// ---- Re-exports for stable public API ----
pub use crate::community::{Community, ListingPost, ListingView};
pub use crate::duplicate::is_duplicate;
pub use crate::error::MirrorError;
pub use crate::feed::{FeedEntry, FeedSource};
pub use crate::index::{build_index, ExistingPost};
pub use crate::processor::{run_once, FeedProcessor, ProcessorConfig, RunState, RunSummary};
pub use crate::similarity::is_similar_title;
pub use crate::url_norm::normalize_url;
