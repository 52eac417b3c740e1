/// URL normalization for duplicate detection
use std::fmt;

use log::debug;
use url::{Origin, Url};

use crate::config::CoreConfig;
use crate::error::NormalizeError;

/// Canonical key for "the same page". Two tabs with equal keys are duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a tab URL into its duplicate key
///
/// Algorithm:
/// 1. Empty URLs and the new-tab placeholder are excluded
/// 2. Parse into origin, path and query (parse failures are excluded)
/// 3. Search hosts (hostname contains the search marker, "google.com" by
///    default) keep only the `q` parameter: origin + path + "?q=" + q,
///    or origin + path when there is no `q`
/// 4. Everything else keeps the full query: origin + path + "?" + query
///
/// The fragment never takes part in the key.
///
/// Examples:
/// - https://www.google.com/search?q=cats&sourceid=1 → https://www.google.com/search?q=cats
/// - https://example.com/a?id=1#top → https://example.com/a?id=1
pub fn normalize_url(url: &str, config: &CoreConfig) -> Result<NormalizedUrl, NormalizeError> {
    if url.is_empty() {
        return Err(NormalizeError::Empty);
    }
    if url == config.new_tab_url {
        return Err(NormalizeError::Placeholder);
    }

    let parsed = Url::parse(url)?;
    let base = format!("{}{}", origin_of(&parsed), parsed.path());

    let is_search_host = parsed
        .host_str()
        .is_some_and(|host| host.contains(config.search_host_marker.as_str()));

    let key = if is_search_host {
        match search_query(&parsed) {
            Some(query) => format!("{}?q={}", base, query),
            None => base,
        }
    } else {
        match parsed.query() {
            Some(query) if !query.is_empty() => format!("{}?{}", base, query),
            _ => base,
        }
    };

    Ok(NormalizedUrl(key))
}

/// Like [`normalize_url`], but logs and swallows the reason a tab was skipped
pub fn normalized_key(url: &str, config: &CoreConfig) -> Option<NormalizedUrl> {
    match normalize_url(url, config) {
        Ok(key) => Some(key),
        Err(NormalizeError::InvalidUrl(e)) => {
            debug!("Skipping invalid URL {:?}: {}", url, e);
            None
        }
        Err(_) => None,
    }
}

/// The first non-empty `q` parameter, percent-decoded
fn search_query(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(name, _)| name == "q")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Serialized origin. Opaque origins (chrome://, file:, about:) fall back to
/// scheme and host so that different internal pages do not collapse into "null".
fn origin_of(url: &Url) -> String {
    match url.origin() {
        origin @ Origin::Tuple(..) => origin.ascii_serialization(),
        Origin::Opaque(_) => match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}://{}:{}", url.scheme(), host, port),
            (Some(host), None) => format!("{}://{}", url.scheme(), host),
            _ => format!("{}:", url.scheme()),
        },
    }
}
