// tests/processor_e2e.rs
mod common;

use chrono::Utc;
use common::{entry, listed, FakeCommunity, HN_ITEM};
use feed_mirror::{FeedEntry, FeedProcessor, ListingView, MirrorError, ProcessorConfig};

fn five_distinct() -> Vec<FeedEntry> {
    vec![
        entry("Entry one about compilers", "https://one.test/a", 1),
        entry("Second story on databases", "http://www.example.com/two/", 2),
        entry("Third item regarding gardening", "https://three.test/c", 3),
        entry("Fourth note covering astronomy", "https://example.com/two", 4),
        entry("Fifth piece on cooking", "https://five.test/e", 5),
    ]
}

#[tokio::test]
async fn same_run_duplicate_url_is_skipped() {
    let community = FakeCommunity::default();
    let cfg = ProcessorConfig::default();

    let summary = FeedProcessor::new(&community, &cfg)
        .process(&five_distinct())
        .await
        .expect("run ok");

    assert_eq!(summary.processed, 4);
    assert_eq!(summary.skipped_duplicate, 1);
    assert_eq!(summary.failed, 0);
    let attempts = community.attempted_titles();
    assert_eq!(attempts.len(), 4);
    assert!(!attempts.contains(&"Fourth note covering astronomy".to_string()));
}

#[tokio::test]
async fn error_budget_aborts_and_leaves_rest_untouched() {
    let entries = five_distinct();
    let community = FakeCommunity {
        failing_titles: entries.iter().take(3).map(|e| e.title.clone()).collect(),
        ..Default::default()
    };
    let cfg = ProcessorConfig::default();

    let err = FeedProcessor::new(&community, &cfg)
        .process(&entries)
        .await
        .unwrap_err();

    assert!(matches!(err, MirrorError::ErrorBudgetExhausted { errors: 3 }));
    assert_eq!(community.attempted_titles().len(), 3);
    assert!(community.posted_links().is_empty());
}

#[tokio::test]
async fn failures_below_budget_do_not_stop_the_run() {
    let entries = five_distinct();
    let community = FakeCommunity {
        failing_titles: [entries[0].title.clone(), entries[2].title.clone()]
            .into_iter()
            .collect(),
        ..Default::default()
    };
    let cfg = ProcessorConfig::default();

    let summary = FeedProcessor::new(&community, &cfg)
        .process(&entries)
        .await
        .expect("two failures stay within budget");

    assert_eq!(summary.failed, 2);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.skipped_duplicate, 1);
}

#[tokio::test]
async fn empty_post_id_counts_as_failure() {
    let community = FakeCommunity {
        empty_post_ids: true,
        ..Default::default()
    };
    let cfg = ProcessorConfig::default();
    let entries = vec![entry("Lonely story here", "https://a.test/x", 1)];

    let summary = FeedProcessor::new(&community, &cfg)
        .process(&entries)
        .await
        .unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.processed, 0);
}

#[tokio::test]
async fn recent_board_posts_block_reposts_but_stale_ones_do_not() {
    let now = Utc::now();
    let community = FakeCommunity {
        listing: vec![
            listed("https://www.recent.test/story/", "Recent thing", 1, now),
            listed("https://stale.test/story", "Stale thing", 72, now),
        ],
        ..Default::default()
    };
    let cfg = ProcessorConfig::default();
    let entries = vec![
        entry("A fresh headline for recent", "http://recent.test/story", 1),
        entry("A fresh headline for stale", "https://stale.test/story", 2),
    ];

    let summary = FeedProcessor::new(&community, &cfg)
        .process_at(&entries, now)
        .await
        .unwrap();

    assert_eq!(summary.skipped_duplicate, 1);
    assert_eq!(community.posted_links(), vec!["https://stale.test/story"]);
}

#[tokio::test]
async fn retitled_repost_is_caught_by_title() {
    let now = Utc::now();
    let community = FakeCommunity {
        listing: vec![listed("https://blog.test/widget", "Show HN: Widget", 3, now)],
        ..Default::default()
    };
    let cfg = ProcessorConfig::default();
    let entries = vec![entry(
        "Show HN: Widget (2025)",
        "https://widget.test/",
        1,
    )];

    let summary = FeedProcessor::new(&community, &cfg)
        .process_at(&entries, now)
        .await
        .unwrap();
    assert_eq!(summary.skipped_duplicate, 1);
    assert!(community.attempted_titles().is_empty());
}

#[tokio::test]
async fn community_thread_links_collapse_across_variants() {
    let now = Utc::now();
    let community = FakeCommunity {
        listing: vec![listed(
            "https://old.reddit.com/r/x/comments/1mau7yl/",
            "Completely different words",
            1,
            now,
        )],
        ..Default::default()
    };
    let cfg = ProcessorConfig::default();
    let entries = vec![entry(
        "Thread everyone is talking about",
        "https://www.reddit.com/r/x/comments/1mau7yl/slug/?utm_source=a",
        1,
    )];

    let summary = FeedProcessor::new(&community, &cfg)
        .process_at(&entries, now)
        .await
        .unwrap();
    assert_eq!(summary.skipped_duplicate, 1);
}

#[tokio::test]
async fn one_failing_view_is_tolerated() {
    let now = Utc::now();
    let community = FakeCommunity {
        listing: vec![listed("https://a.test/x", "Already here", 1, now)],
        failing_views: [ListingView::Hot].into_iter().collect(),
        ..Default::default()
    };
    let cfg = ProcessorConfig::default();
    let entries = vec![entry("Already here again", "https://a.test/x/", 1)];

    let summary = FeedProcessor::new(&community, &cfg)
        .process_at(&entries, now)
        .await
        .unwrap();
    assert_eq!(summary.skipped_duplicate, 1);
    assert_eq!(community.listing_calls.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn all_views_failing_fails_before_posting() {
    let community = FakeCommunity {
        failing_views: ListingView::ALL.into_iter().collect(),
        ..Default::default()
    };
    let cfg = ProcessorConfig::default();

    let err = FeedProcessor::new(&community, &cfg)
        .process(&five_distinct())
        .await
        .unwrap_err();
    assert!(matches!(err, MirrorError::AllListingsFailed { views: 3, .. }));
    assert!(community.attempted_titles().is_empty());
}

#[tokio::test]
async fn malformed_entries_are_skipped_without_errors() {
    let community = FakeCommunity::default();
    let cfg = ProcessorConfig::default();
    let mut undated = entry("No date on this one", "https://a.test/1", 1);
    undated.published_at = None;
    let linkless = entry("No link on this one", "", 2);
    let good = entry("Perfectly fine story", "https://a.test/3", 3);

    let summary = FeedProcessor::new(&community, &cfg)
        .process(&[undated, linkless, good])
        .await
        .unwrap();
    assert_eq!(summary.skipped_invalid, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.processed, 1);
}

#[tokio::test]
async fn replies_point_at_the_discussion() {
    let community = FakeCommunity::default();
    let cfg = ProcessorConfig::default();
    let mut foreign_guid = entry("Story with odd guid", "https://b.test/2", 2);
    foreign_guid.guid = "urn:uuid:1234".into();
    let entries = vec![
        entry("Story on an external site", "https://a.test/1", 1),
        entry("Ask HN: how do you test", &format!("{HN_ITEM}7"), 7),
        foreign_guid,
    ];

    let summary = FeedProcessor::new(&community, &cfg)
        .process(&entries)
        .await
        .unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.replies, 1);
    assert_eq!(
        community.reply_log(),
        vec![(
            "t3_1".to_string(),
            format!("Discussion on HN: {HN_ITEM}1")
        )]
    );
}

#[tokio::test]
async fn reply_failure_does_not_count_against_budget() {
    let community = FakeCommunity {
        fail_replies: true,
        ..Default::default()
    };
    let cfg = ProcessorConfig {
        max_errors: 1,
        ..Default::default()
    };
    let entries = vec![
        entry("First external story", "https://a.test/1", 1),
        entry("Second external story here", "https://b.test/2", 2),
    ];

    let summary = FeedProcessor::new(&community, &cfg)
        .process(&entries)
        .await
        .expect("reply failures are tolerated");
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.replies, 0);
    assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn same_story_retitled_within_one_feed_is_posted_once() {
    let community = FakeCommunity::default();
    let cfg = ProcessorConfig::default();
    let entries = vec![
        entry("Linux 7.0 released", "https://kernel.test/7.0", 1),
        entry("Linux 7.0 released [pdf]", "https://mirror.test/linux-7.0.pdf", 2),
    ];

    let summary = FeedProcessor::new(&community, &cfg)
        .process(&entries)
        .await
        .unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped_duplicate, 1);
}

#[tokio::test(start_paused = true)]
async fn post_delay_spaces_posts_without_trailing_pause() {
    let community = FakeCommunity::default();
    let cfg = ProcessorConfig {
        post_delay: std::time::Duration::from_secs(2),
        ..Default::default()
    };
    let entries = vec![
        entry("First story of the batch", "https://a.test/1", 1),
        entry("Second story of the batch", "https://b.test/2", 2),
    ];

    let start = tokio::time::Instant::now();
    let summary = FeedProcessor::new(&community, &cfg)
        .process(&entries)
        .await
        .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(start.elapsed(), std::time::Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn single_post_run_does_not_wait() {
    let community = FakeCommunity::default();
    let cfg = ProcessorConfig {
        post_delay: std::time::Duration::from_secs(2),
        ..Default::default()
    };
    let entries = vec![entry("Only story today", "https://a.test/1", 1)];

    let start = tokio::time::Instant::now();
    FeedProcessor::new(&community, &cfg)
        .process(&entries)
        .await
        .unwrap();
    assert_eq!(start.elapsed(), std::time::Duration::ZERO);
}

#[tokio::test]
async fn in_run_posts_follow_the_run_clock() {
    let now = Utc::now() + chrono::Duration::hours(72);
    let community = FakeCommunity::default();
    let cfg = ProcessorConfig::default();
    let entries = vec![
        entry("Release notes for the widget", "https://widget.test/notes", 1),
        entry("Widget changelog mirror copy", "http://www.widget.test/notes/", 2),
    ];

    let summary = FeedProcessor::new(&community, &cfg)
        .process_at(&entries, now)
        .await
        .unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped_duplicate, 1);
}
