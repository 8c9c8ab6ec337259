// src/processor.rs
//! Feed-to-post pipeline.
//!
//! One run: build the existing-post index, then walk the feed in order.
//! Each entry is validated, checked for duplicates, posted, and appended to
//! the index so later entries of the same run see it. Posting failures count
//! against an error budget; exhausting it aborts the run. Nothing is rolled
//! back.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::community::Community;
use crate::config::MirrorConfig;
use crate::duplicate::is_duplicate;
use crate::error::MirrorError;
use crate::feed::{FeedEntry, FeedSource};
use crate::index::{build_index, ExistingPost};
use crate::url_norm::normalize_url;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("mirror_feed_entries_total", "Entries parsed from the feed.");
        describe_counter!("mirror_posts_total", "Entries mirrored as new posts.");
        describe_counter!(
            "mirror_skipped_total",
            "Entries skipped, labelled by reason (invalid|duplicate)."
        );
        describe_counter!("mirror_post_errors_total", "Primary post failures.");
        describe_counter!(
            "mirror_listing_errors_total",
            "Listing views that could not be fetched."
        );
        describe_counter!("mirror_replies_total", "Discussion replies created.");
        describe_counter!(
            "mirror_reply_skipped_total",
            "Posts left without a discussion reply."
        );
        describe_gauge!("mirror_last_run_ts", "Unix ts when a run last finished.");
    });
}

/// Ten years; anything longer means "no window".
const MAX_WINDOW_HOURS: u64 = 24 * 365 * 10;

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub board: String,
    pub recency_window: ChronoDuration,
    pub listing_limit: u32,
    pub max_errors: u32,
    /// Pause before each post once the run has posted something.
    pub post_delay: Duration,
    pub discussion_domain: String,
    pub discussion_label: String,
    pub feed_timeout: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self::from_config(&MirrorConfig::default())
    }
}

impl ProcessorConfig {
    pub fn from_config(cfg: &MirrorConfig) -> Self {
        Self {
            board: cfg.community.board.clone(),
            recency_window: ChronoDuration::hours(
                cfg.run.recency_window_hours.min(MAX_WINDOW_HOURS) as i64,
            ),
            listing_limit: cfg.run.listing_limit,
            max_errors: cfg.run.max_errors.max(1),
            post_delay: Duration::from_millis(cfg.run.post_delay_ms),
            discussion_domain: cfg.run.discussion_domain.clone(),
            discussion_label: cfg.run.discussion_label.clone(),
            feed_timeout: Duration::from_secs(cfg.feed.timeout_secs),
        }
    }
}

/// Mutable state of a single run. Owned by the processor, never shared.
#[derive(Debug, Clone)]
pub struct RunState {
    /// Append-only during the run.
    pub existing_posts: Vec<ExistingPost>,
    pub processed_count: usize,
    pub error_count: u32,
    /// Run clock; posts made during the run are stamped with it.
    pub started_at: DateTime<Utc>,
    pub cutoff_time: DateTime<Utc>,
}

impl RunState {
    pub fn new(
        existing_posts: Vec<ExistingPost>,
        started_at: DateTime<Utc>,
        cutoff_time: DateTime<Utc>,
    ) -> Self {
        Self {
            existing_posts,
            processed_count: 0,
            error_count: 0,
            started_at,
            cutoff_time,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped_invalid: usize,
    pub skipped_duplicate: usize,
    pub failed: u32,
    pub replies: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    Invalid,
    Duplicate,
    Posted { replied: bool },
    Failed,
}

enum Discussion<'e> {
    NotNeeded,
    Link(&'e str),
    Missing(&'static str),
}

/// Entries whose own link is on the discussion site need no reply.
fn discussion_for<'e>(entry: &'e FeedEntry, domain: &str) -> Discussion<'e> {
    if domain.is_empty() || entry.link.contains(domain) {
        Discussion::NotNeeded
    } else if entry.guid.is_empty() {
        Discussion::Missing("no discussion link in guid")
    } else if !entry.guid.contains(domain) {
        Discussion::Missing("guid is not a discussion link")
    } else {
        Discussion::Link(&entry.guid)
    }
}

pub struct FeedProcessor<'a> {
    community: &'a dyn Community,
    cfg: &'a ProcessorConfig,
}

impl<'a> FeedProcessor<'a> {
    pub fn new(community: &'a dyn Community, cfg: &'a ProcessorConfig) -> Self {
        Self { community, cfg }
    }

    pub async fn process(&self, entries: &[FeedEntry]) -> Result<RunSummary, MirrorError> {
        self.process_at(entries, Utc::now()).await
    }

    /// Run with an explicit start time; the recency cutoff is fixed from it.
    pub async fn process_at(
        &self,
        entries: &[FeedEntry],
        now: DateTime<Utc>,
    ) -> Result<RunSummary, MirrorError> {
        ensure_metrics_described();
        info!(entries = entries.len(), board = %self.cfg.board, "processing feed");

        let existing =
            build_index(self.community, &self.cfg.board, self.cfg.listing_limit).await?;
        let cutoff = now
            .checked_sub_signed(self.cfg.recency_window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut state = RunState::new(existing, now, cutoff);
        let mut summary = RunSummary::default();

        for (i, entry) in entries.iter().enumerate() {
            match self.process_entry(i, entry, &mut state).await {
                EntryOutcome::Invalid => summary.skipped_invalid += 1,
                EntryOutcome::Duplicate => summary.skipped_duplicate += 1,
                EntryOutcome::Posted { replied } => {
                    summary.processed += 1;
                    if replied {
                        summary.replies += 1;
                    }
                }
                EntryOutcome::Failed => {
                    summary.failed += 1;
                    if state.error_count >= self.cfg.max_errors {
                        error!(
                            errors = state.error_count,
                            processed = state.processed_count,
                            remaining = entries.len() - i - 1,
                            "too many posting errors, aborting run"
                        );
                        return Err(MirrorError::ErrorBudgetExhausted {
                            errors: state.error_count,
                        });
                    }
                }
            }
        }

        info!(
            processed = state.processed_count,
            duplicates = summary.skipped_duplicate,
            invalid = summary.skipped_invalid,
            failed = summary.failed,
            "successfully processed feed"
        );
        Ok(summary)
    }

    /// Validate -> CheckDuplicate -> Post (which also updates the index).
    pub async fn process_entry(
        &self,
        index: usize,
        entry: &FeedEntry,
        state: &mut RunState,
    ) -> EntryOutcome {
        if let Some(defect) = entry.defect() {
            warn!(index, title = %entry.title, defect, "skipping feed entry");
            counter!("mirror_skipped_total", "reason" => "invalid").increment(1);
            return EntryOutcome::Invalid;
        }

        let normalized = normalize_url(&entry.link);
        if is_duplicate(&normalized, &entry.title, &state.existing_posts, state.cutoff_time) {
            debug!(index, link = %entry.link, "post already exists, skipping");
            counter!("mirror_skipped_total", "reason" => "duplicate").increment(1);
            return EntryOutcome::Duplicate;
        }

        match self.post_entry(entry, &normalized, state).await {
            Ok(outcome) => {
                if matches!(outcome, EntryOutcome::Posted { .. }) {
                    state.processed_count += 1;
                }
                outcome
            }
            Err(e) => {
                state.error_count += 1;
                counter!("mirror_post_errors_total").increment(1);
                warn!(
                    index,
                    title = %entry.title,
                    errors = state.error_count,
                    error = ?e,
                    "error posting feed entry"
                );
                EntryOutcome::Failed
            }
        }
    }

    async fn post_entry(
        &self,
        entry: &FeedEntry,
        normalized: &str,
        state: &mut RunState,
    ) -> anyhow::Result<EntryOutcome> {
        // The index may have grown since the filter check.
        if is_duplicate(normalized, &entry.title, &state.existing_posts, state.cutoff_time) {
            debug!(link = %entry.link, "post already exists (double-check), skipping");
            counter!("mirror_skipped_total", "reason" => "duplicate").increment(1);
            return Ok(EntryOutcome::Duplicate);
        }

        if state.processed_count > 0 && !self.cfg.post_delay.is_zero() {
            debug!(delay_ms = self.cfg.post_delay.as_millis() as u64, "pausing between posts");
            tokio::time::sleep(self.cfg.post_delay).await;
        }

        info!(title = %entry.title, link = %entry.link, "posting");
        let post_id = self
            .community
            .create_post(&self.cfg.board, &entry.title, &entry.link)
            .await?;
        if post_id.is_empty() {
            anyhow::bail!("no post id returned");
        }
        counter!("mirror_posts_total").increment(1);

        state.existing_posts.push(ExistingPost {
            url: entry.link.clone(),
            title: entry.title.clone(),
            created_at: state.started_at,
        });

        let replied = self.reply_with_discussion(entry, &post_id).await;
        Ok(EntryOutcome::Posted { replied })
    }

    /// Best effort: the mirrored post already exists, so failures only warn.
    async fn reply_with_discussion(&self, entry: &FeedEntry, post_id: &str) -> bool {
        let link = match discussion_for(entry, &self.cfg.discussion_domain) {
            Discussion::NotNeeded => return false,
            Discussion::Missing(why) => {
                warn!(title = %entry.title, guid = %entry.guid, why, "skipping discussion reply");
                counter!("mirror_reply_skipped_total").increment(1);
                return false;
            }
            Discussion::Link(link) => link,
        };

        let body = format!("Discussion on {}: {}", self.cfg.discussion_label, link);
        match self.community.create_reply(post_id, &body).await {
            Ok(reply_id) if !reply_id.is_empty() => {
                debug!(post_id, reply_id = %reply_id, "discussion reply created");
                counter!("mirror_replies_total").increment(1);
                true
            }
            Ok(_) => {
                warn!(post_id, "no reply id returned");
                counter!("mirror_reply_skipped_total").increment(1);
                false
            }
            Err(e) => {
                warn!(post_id, error = ?e, "failed to post discussion reply");
                counter!("mirror_reply_skipped_total").increment(1);
                false
            }
        }
    }
}

/// Fetch the feed (bounded by `feed_timeout`) and process it.
pub async fn run_once(
    feed: &dyn FeedSource,
    community: &dyn Community,
    cfg: &ProcessorConfig,
) -> Result<RunSummary, MirrorError> {
    ensure_metrics_described();

    let entries = match tokio::time::timeout(cfg.feed_timeout, feed.fetch_entries()).await {
        Ok(Ok(entries)) => entries,
        Ok(Err(e)) => return Err(MirrorError::Feed(format!("{e:#}"))),
        Err(_) => {
            return Err(MirrorError::Feed(format!(
                "{} timed out after {}s",
                feed.name(),
                cfg.feed_timeout.as_secs()
            )))
        }
    };

    let summary = FeedProcessor::new(community, cfg).process(&entries).await?;
    gauge!("mirror_last_run_ts").set(Utc::now().timestamp() as f64);
    Ok(summary)
}
