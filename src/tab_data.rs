/// Data structures for TabZippr
use serde::{Deserialize, Serialize};

/// A browser tab as reported by the host for the current window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: i32,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pinned: bool,
}

impl TabInfo {
    pub fn new(id: i32, url: String, title: String, pinned: bool) -> TabInfo {
        TabInfo {
            id,
            url,
            title,
            pinned,
        }
    }
}

/// One record of a backup archive.
///
/// Field order is the serialized key order: url, title, pinned.
/// Only `url` is required when reading a backup back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabDescriptor {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pinned: bool,
}

impl From<&TabInfo> for TabDescriptor {
    fn from(tab: &TabInfo) -> Self {
        TabDescriptor {
            url: tab.url.clone(),
            title: tab.title.clone(),
            pinned: tab.pinned,
        }
    }
}
