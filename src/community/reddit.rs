// src/community/reddit.rs
//! OAuth client for the community site: listings, link submission, replies.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{redirect::Policy, Client};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::types::{ListingPost, ListingView};
use super::Community;
use crate::config::{CommunitySettings, Credentials};

/// Refresh the token this long before it actually expires.
const TOKEN_SLACK: Duration = Duration::from_secs(60);
const DEFAULT_TOKEN_TTL_SECS: u64 = 3_600;
/// Upper bound on a server-announced token lifetime.
const MAX_TOKEN_TTL_SECS: u64 = 86_400;
const MAX_REDIRECTS: usize = 10;

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// `expires_in` comes from the server; it is clamped before touching the clock.
fn token_expiry(now: Instant, expires_in: Option<u64>) -> Instant {
    let secs = expires_in
        .unwrap_or(DEFAULT_TOKEN_TTL_SECS)
        .min(MAX_TOKEN_TTL_SECS);
    now.checked_add(Duration::from_secs(secs)).unwrap_or(now)
}

pub struct RedditClient {
    http: Client,
    creds: Credentials,
    api_base: String,
    auth_base: String,
    min_interval: Duration,
    token: Mutex<Option<AccessToken>>,
    last_request: Mutex<Option<Instant>>,
}

impl RedditClient {
    pub fn new(settings: &CommunitySettings, creds: Credentials) -> Result<Self> {
        let http = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .context("building reddit http client")?;

        Ok(Self {
            http,
            creds,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            auth_base: settings.auth_base.trim_end_matches('/').to_string(),
            min_interval: Duration::from_millis(settings.rate_limit_ms),
            token: Mutex::new(None),
            last_request: Mutex::new(None),
        })
    }

    /// Wait until `min_interval` has passed since the previous request.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn bearer(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(tok) = guard.as_ref() {
            if tok.expires_at.saturating_duration_since(Instant::now()) > TOKEN_SLACK {
                return Ok(tok.value.clone());
            }
        }

        self.throttle().await;
        let url = format!("{}/api/v1/access_token", self.auth_base);
        let resp: TokenResponse = self
            .http
            .post(&url)
            .basic_auth(&self.creds.client_id, Some(&self.creds.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.creds.username.as_str()),
                ("password", self.creds.password.as_str()),
            ])
            .send()
            .await
            .context("reddit token request")?
            .error_for_status()
            .context("reddit token http status")?
            .json()
            .await
            .context("reddit token json")?;

        if let Some(err) = resp.error {
            bail!("reddit token rejected: {err}");
        }
        let value = resp
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow!("reddit token response without access_token"))?;
        let now = Instant::now();
        let expires_at = token_expiry(now, resp.expires_in);

        tracing::debug!(
            ttl_secs = expires_at.duration_since(now).as_secs(),
            "reddit access token acquired"
        );
        *guard = Some(AccessToken {
            value: value.clone(),
            expires_at,
        });
        Ok(value)
    }

    async fn post_form<T: DeserializeOwned>(&self, path: &str, form: &[(&str, &str)]) -> Result<T> {
        let token = self.bearer().await?;
        self.throttle().await;
        let url = format!("{}{}", self.api_base, path);
        self.http
            .post(&url)
            .bearer_auth(token)
            .form(form)
            .send()
            .await
            .with_context(|| format!("reddit POST {path}"))?
            .error_for_status()
            .with_context(|| format!("reddit POST {path} status"))?
            .json::<T>()
            .await
            .with_context(|| format!("reddit POST {path} json"))
    }
}

#[async_trait]
impl Community for RedditClient {
    async fn fetch_listing(
        &self,
        board: &str,
        view: ListingView,
        limit: u32,
    ) -> Result<Vec<ListingPost>> {
        let token = self.bearer().await?;
        self.throttle().await;

        let url = format!("{}/r/{}/{}", self.api_base, board, view.path());
        let limit = limit.to_string();
        let mut query: Vec<(&str, &str)> = vec![("limit", limit.as_str()), ("raw_json", "1")];
        query.extend_from_slice(view.extra_params());

        let listing: Listing = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&query)
            .send()
            .await
            .with_context(|| format!("reddit GET {view} listing"))?
            .error_for_status()
            .with_context(|| format!("reddit GET {view} listing status"))?
            .json()
            .await
            .with_context(|| format!("reddit {view} listing json"))?;

        Ok(listing_posts(listing))
    }

    async fn create_post(&self, board: &str, title: &str, link: &str) -> Result<String> {
        let env: ApiEnvelope<SubmitData> = self
            .post_form(
                "/api/submit",
                &[
                    ("sr", board),
                    ("kind", "link"),
                    ("title", title),
                    ("url", link),
                    ("api_type", "json"),
                    ("resubmit", "true"),
                ],
            )
            .await?;

        let data = env.into_data("submit")?;
        if data.name.is_empty() {
            bail!("no post id returned");
        }
        Ok(data.name)
    }

    async fn create_reply(&self, parent_id: &str, body: &str) -> Result<String> {
        let env: ApiEnvelope<CommentData> = self
            .post_form(
                "/api/comment",
                &[("thing_id", parent_id), ("text", body), ("api_type", "json")],
            )
            .await?;

        let name = env
            .into_data("comment")?
            .things
            .into_iter()
            .next()
            .map(|t| t.data.name)
            .unwrap_or_default();
        if name.is_empty() {
            bail!("no comment id returned");
        }
        Ok(name)
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: RawPost,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    removed_by_category: Option<String>,
    #[serde(default)]
    author: Option<String>,
}

fn listing_posts(listing: Listing) -> Vec<ListingPost> {
    listing
        .data
        .children
        .into_iter()
        .map(|c| {
            let p = c.data;
            let deleted =
                p.removed_by_category.is_some() || p.author.as_deref() == Some("[deleted]");
            ListingPost {
                url: p.url.unwrap_or_default(),
                title: p.title,
                deleted,
                created_at: DateTime::<Utc>::from_timestamp(p.created_utc as i64, 0)
                    .unwrap_or_default(),
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    json: ApiJson<T>,
}

#[derive(Debug, Deserialize)]
struct ApiJson<T> {
    #[serde(default)]
    errors: Vec<serde_json::Value>,
    data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    fn into_data(self, what: &str) -> Result<T> {
        if !self.json.errors.is_empty() {
            bail!(
                "{what} rejected: {}",
                serde_json::Value::Array(self.json.errors)
            );
        }
        self.json
            .data
            .ok_or_else(|| anyhow!("{what} response without data"))
    }
}

#[derive(Debug, Deserialize)]
struct SubmitData {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct CommentData {
    #[serde(default)]
    things: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    data: ThingData,
}

#[derive(Debug, Deserialize)]
struct ThingData {
    #[serde(default)]
    name: String,
}
