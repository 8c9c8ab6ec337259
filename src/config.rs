// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::MirrorError;

const ENV_PATH: &str = "MIRROR_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/mirror.toml";

pub const ENV_SECRET: &str = "REDDIT_SECRET";
pub const ENV_PASSWORD: &str = "REDDIT_PASSWORD";
pub const ENV_CLIENT_ID: &str = "REDDIT_CLIENT_ID";
pub const ENV_USERNAME: &str = "REDDIT_USERNAME";

/// Listing endpoints never return more than this many posts per page.
pub const MAX_LISTING_LIMIT: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    pub feed: FeedSettings,
    pub community: CommunitySettings,
    pub run: RunSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    pub base_url: String,
    pub count: u32,
    /// Minimum points, applied upstream by the feed service.
    pub points: u32,
    /// Minimum comments, applied upstream by the feed service.
    pub comments: u32,
    pub timeout_secs: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            base_url: "https://hnrss.org/frontpage".into(),
            count: 50,
            points: 100,
            comments: 10,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunitySettings {
    pub board: String,
    pub user_agent: String,
    /// Overridden by `$REDDIT_CLIENT_ID`.
    pub client_id: String,
    /// Overridden by `$REDDIT_USERNAME`.
    pub username: String,
    pub api_base: String,
    pub auth_base: String,
    pub timeout_secs: u64,
    /// Minimum spacing between two API requests.
    pub rate_limit_ms: u64,
}

impl Default for CommunitySettings {
    fn default() -> Self {
        Self {
            board: "hackernews".into(),
            user_agent: "rust:feed-mirror:0.1.0".into(),
            client_id: String::new(),
            username: String::new(),
            api_base: "https://oauth.reddit.com".into(),
            auth_base: "https://www.reddit.com".into(),
            timeout_secs: 30,
            rate_limit_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub recency_window_hours: u64,
    pub listing_limit: u32,
    pub max_errors: u32,
    pub post_delay_ms: u64,
    /// Home site of the feed; its links are used for discussion replies.
    pub discussion_domain: String,
    pub discussion_label: String,
    /// 0 = run once and exit.
    pub interval_secs: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            recency_window_hours: 48,
            listing_limit: MAX_LISTING_LIMIT,
            max_errors: 3,
            post_delay_ms: 0,
            discussion_domain: "news.ycombinator.com".into(),
            discussion_label: "HN".into(),
            interval_secs: 0,
        }
    }
}

impl MirrorConfig {
    /// Clamp values that would make a run meaningless.
    pub fn sanitize(&mut self) {
        if self.run.max_errors == 0 {
            self.run.max_errors = 1;
        }
        if self.run.listing_limit == 0 || self.run.listing_limit > MAX_LISTING_LIMIT {
            self.run.listing_limit = MAX_LISTING_LIMIT;
        }
        if self.feed.timeout_secs == 0 {
            self.feed.timeout_secs = FeedSettings::default().timeout_secs;
        }
        if self.community.timeout_secs == 0 {
            self.community.timeout_secs = CommunitySettings::default().timeout_secs;
        }
        self.community.board = self.community.board.trim().to_string();
        self.run.discussion_domain = self.run.discussion_domain.trim().to_ascii_lowercase();
    }
}

/// Parse a TOML document. Missing keys fall back to defaults.
pub fn parse_config(s: &str) -> Result<MirrorConfig> {
    let mut cfg: MirrorConfig = toml::from_str(s).context("parsing mirror config toml")?;
    cfg.sanitize();
    Ok(cfg)
}

pub fn load_config_from(path: &Path) -> Result<MirrorConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading mirror config from {}", path.display()))?;
    parse_config(&content)
}

/// Load config using env var + fallbacks:
/// 1) $MIRROR_CONFIG_PATH
/// 2) config/mirror.toml
/// 3) built-in defaults
pub fn load_config_default() -> Result<MirrorConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
    }
    let default_p = PathBuf::from(DEFAULT_PATH);
    if default_p.exists() {
        return load_config_from(&default_p);
    }
    let mut cfg = MirrorConfig::default();
    cfg.sanitize();
    Ok(cfg)
}

/// Secrets for the community API. Never read from the config file.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("client_secret_len", &self.client_secret.len())
            .field("password_len", &self.password.len())
            .finish()
    }
}

impl Credentials {
    pub fn from_env(settings: &CommunitySettings) -> Result<Self, MirrorError> {
        Self::from_lookup(settings, |k| std::env::var(k).ok())
    }

    /// Same as [`Credentials::from_env`] with a custom variable source.
    pub fn from_lookup<F>(settings: &CommunitySettings, lookup: F) -> Result<Self, MirrorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let client_secret = get(ENV_SECRET).ok_or_else(|| {
            MirrorError::Config(format!(
                "no Reddit secret provided in environment variable {ENV_SECRET}"
            ))
        })?;
        let password = get(ENV_PASSWORD).ok_or_else(|| {
            MirrorError::Config(format!(
                "no Reddit password provided in environment variable {ENV_PASSWORD}"
            ))
        })?;

        let client_id = get(ENV_CLIENT_ID)
            .or_else(|| Some(settings.client_id.trim().to_string()).filter(|v| !v.is_empty()))
            .ok_or_else(|| {
                MirrorError::Config(format!(
                    "no Reddit client id in config or environment variable {ENV_CLIENT_ID}"
                ))
            })?;
        let username = get(ENV_USERNAME)
            .or_else(|| Some(settings.username.trim().to_string()).filter(|v| !v.is_empty()))
            .ok_or_else(|| {
                MirrorError::Config(format!(
                    "no Reddit username in config or environment variable {ENV_USERNAME}"
                ))
            })?;

        Ok(Self {
            client_id,
            client_secret,
            username,
            password,
        })
    }
}
