//! URL canonicalization for duplicate detection.
//!
//! Two branches:
//! - links on the community's own site collapse to a submission key
//!   (`reddit.com/comments/<id>` or `reddit.com/s/<id>`), so `old.`/`www.`,
//!   slug, trailing slash and tracking-parameter variants compare equal;
//! - every other URL gets scheme/host/slash/fragment normalization. Query
//!   strings are kept: two pages differing only by parameters stay distinct.
//!
//! Nothing here fails. Input that cannot be parsed is returned unchanged.

use url::Url;

/// Substrings that mark a link as pointing at the community's own site.
pub const COMMUNITY_DOMAINS: [&str; 2] = ["reddit.com", "redd.it"];

const THREAD_PREFIX: &str = "reddit.com/r/";
const SHORT_PREFIX: &str = "redd.it/";
const SHARE_MARKER: &str = "/s/";

/// Result of one of the explicit path matchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMatch<'a> {
    Matched(&'a str),
    Unmatched,
}

pub fn is_community_link(url: &str) -> bool {
    COMMUNITY_DOMAINS.iter().any(|d| url.contains(d))
}

/// Canonical key for any URL. Deterministic, no I/O.
pub fn normalize_url(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    if is_community_link(raw) {
        return normalize_community_url(raw);
    }

    let parsed = if raw.starts_with("//") {
        Url::parse(&format!("https:{raw}"))
    } else {
        Url::parse(raw)
    };
    let Ok(mut url) = parsed else {
        return raw.to_string();
    };

    if url.scheme() == "http" {
        // http -> https is always allowed between special schemes
        let _ = url.set_scheme("https");
    }

    if let Some(host) = url.host_str() {
        let lowered = host.to_ascii_lowercase();
        let bare = lowered.strip_prefix("www.").unwrap_or(&lowered).to_string();
        if bare != host && url.set_host(Some(&bare)).is_err() {
            return raw.to_string();
        }
    }

    if !url.cannot_be_a_base() {
        let path = url.path();
        let trimmed = path.strip_suffix('/').unwrap_or(path).to_string();
        url.set_path(if trimmed.is_empty() { "/" } else { &trimmed });
    }

    url.set_fragment(None);
    url.to_string()
}

/// Community-site branch of [`normalize_url`].
///
/// The query string is always dropped. Discussion threads (long form and the
/// short `redd.it/<id>` form) key on the submission id alone. Share links key
/// on their own id, which is NOT the submission id, so a share link and the
/// long form of the same thread land in different buckets.
pub fn normalize_community_url(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let clean = raw.split_once('?').map_or(raw, |(head, _)| head);

    if let PathMatch::Matched(id) = match_discussion_thread(clean) {
        return format!("reddit.com/comments/{id}");
    }
    if let PathMatch::Matched(id) = match_share_link(clean) {
        return format!("reddit.com/s/{id}");
    }

    clean.to_string()
}

/// `reddit.com/r/<sub>/comments/<id>` or `redd.it/<id>`.
pub fn match_discussion_thread(url: &str) -> PathMatch<'_> {
    for (pos, m) in url.match_indices(THREAD_PREFIX) {
        let rest = &url[pos + m.len()..];
        let Some(slash) = rest.find('/') else {
            continue;
        };
        if slash == 0 {
            continue;
        }
        if let Some(tail) = rest[slash + 1..].strip_prefix("comments/") {
            if let Some(id) = leading_id(tail) {
                return PathMatch::Matched(id);
            }
        }
    }

    for (pos, m) in url.match_indices(SHORT_PREFIX) {
        if let Some(id) = leading_id(&url[pos + m.len()..]) {
            return PathMatch::Matched(id);
        }
    }

    PathMatch::Unmatched
}

/// `.../s/<id>` share links.
pub fn match_share_link(url: &str) -> PathMatch<'_> {
    url.match_indices(SHARE_MARKER)
        .find_map(|(pos, m)| leading_id(&url[pos + m.len()..]))
        .map_or(PathMatch::Unmatched, PathMatch::Matched)
}

// Longest non-empty ASCII alphanumeric prefix.
fn leading_id(s: &str) -> Option<&str> {
    let end = s
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(s.len());
    (end > 0).then(|| &s[..end])
}
