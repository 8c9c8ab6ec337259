// src/feed/hnrss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};
use url::Url;

use super::{validate_entries, FeedEntry, FeedError, FeedSource};
use crate::config::FeedSettings;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    guid: Option<Guid>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

// <guid isPermaLink="false">...</guid>
#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text", default)]
    value: String,
}

fn parse_pub_date(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if let Ok(dt) = OffsetDateTime::parse(ts, &Rfc2822) {
        return DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), 0);
    }
    // chrono also accepts the obsolete zone names ("GMT", "EST") some feeds emit
    DateTime::parse_from_rfc2822(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `<base>?count=N&points=P&comments=C`
pub fn build_feed_url(settings: &FeedSettings) -> Result<Url> {
    let mut url = Url::parse(&settings.base_url)
        .with_context(|| format!("invalid feed url {}", settings.base_url))?;
    url.query_pairs_mut()
        .append_pair("count", &settings.count.to_string())
        .append_pair("points", &settings.points.to_string())
        .append_pair("comments", &settings.comments.to_string());
    Ok(url)
}

/// hnrss.org-style RSS 2.0 feed.
pub struct HnRssFeed {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: Url, client: reqwest::Client },
}

impl HnRssFeed {
    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_settings(settings: &FeedSettings) -> Result<Self> {
        let url = build_feed_url(settings)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("building feed http client")?;
        Ok(Self {
            mode: Mode::Http { url, client },
        })
    }

    pub fn parse_entries_from_str(s: &str) -> Result<Vec<FeedEntry>, FeedError> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).map_err(|e| FeedError::Parse(e.to_string()))?;

        let out: Vec<FeedEntry> = rss
            .channel
            .item
            .into_iter()
            .map(|it| FeedEntry {
                title: it.title.as_deref().map(clean_text).unwrap_or_default(),
                link: it.link.unwrap_or_default().trim().to_string(),
                guid: it.guid.map(|g| g.value.trim().to_string()).unwrap_or_default(),
                published_at: it.pub_date.as_deref().and_then(parse_pub_date),
            })
            .collect();

        validate_entries(&out)?;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("mirror_feed_parse_ms").record(ms);
        counter!("mirror_feed_entries_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl FeedSource for HnRssFeed {
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>> {
        match &self.mode {
            Mode::Fixture(s) => Ok(Self::parse_entries_from_str(s)?),
            Mode::Http { url, client } => {
                tracing::info!(url = %url, "getting feed");
                let body = client
                    .get(url.clone())
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| FeedError::Http(e.to_string()))?
                    .text()
                    .await
                    .map_err(|e| FeedError::Http(e.to_string()))?;
                Ok(Self::parse_entries_from_str(&body)?)
            }
        }
    }

    fn name(&self) -> &'static str {
        "hnrss"
    }
}

// XML only knows five named entities; feeds routinely carry HTML ones.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
