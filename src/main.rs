//! feed-mirror binary entrypoint.
//! Loads config and credentials, then mirrors the feed once or on a schedule.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use feed_mirror::community::reddit::RedditClient;
use feed_mirror::config::{load_config_default, Credentials};
use feed_mirror::feed::hnrss::HnRssFeed;
use feed_mirror::scheduler::spawn_scheduler;
use feed_mirror::{run_once, Community, FeedSource, MirrorError, ProcessorConfig};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `RUST_LOG` wins; otherwise info for this crate, warn for dependencies.
/// `MIRROR_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("feed_mirror=info,scheduler=info,warn"));

    let json = std::env::var("MIRROR_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

async fn run() -> Result<(), MirrorError> {
    let cfg = load_config_default().map_err(|e| MirrorError::Config(format!("{e:#}")))?;
    let creds = Credentials::from_env(&cfg.community)?;
    info!(
        board = %cfg.community.board,
        username = %creds.username,
        interval_secs = cfg.run.interval_secs,
        "config loaded"
    );

    let community: Arc<dyn Community> = Arc::new(
        RedditClient::new(&cfg.community, creds)
            .map_err(|e| MirrorError::Config(format!("{e:#}")))?,
    );
    let feed: Arc<dyn FeedSource> = Arc::new(
        HnRssFeed::from_settings(&cfg.feed).map_err(|e| MirrorError::Config(format!("{e:#}")))?,
    );
    let proc_cfg = Arc::new(ProcessorConfig::from_config(&cfg));

    if cfg.run.interval_secs == 0 {
        let summary = run_once(feed.as_ref(), community.as_ref(), &proc_cfg).await?;
        info!(
            processed = summary.processed,
            duplicates = summary.skipped_duplicate,
            replies = summary.replies,
            "done"
        );
        return Ok(());
    }

    let mut handle = spawn_scheduler(Duration::from_secs(cfg.run.interval_secs), move || {
        let (feed, community, proc_cfg) = (feed.clone(), community.clone(), proc_cfg.clone());
        async move { run_once(feed.as_ref(), community.as_ref(), &proc_cfg).await }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received, stopping scheduler");
            handle.abort();
        }
        res = &mut handle => {
            if let Err(e) = res {
                error!(error = %e, "scheduler task ended");
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    info!("starting");
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(kind = e.kind(), error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}
