/// Runtime configuration for TabZippr
use serde::{Deserialize, Serialize};

use crate::archive;
use crate::error::Error;

/// Crate version, shown in the popup footer
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core settings. Every field has a default, so the host may pass a partial
/// object (or nothing at all).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoreConfig {
    /// Badge background color used whenever the duplicate count is shown
    pub badge_color: String,
    /// Address of the host's blank new-tab page; never grouped
    pub new_tab_url: String,
    /// Hostnames containing this marker get search-query normalization
    pub search_host_marker: String,
    /// Download subfolder for backups
    pub backup_folder: String,
    pub file_prefix: String,
    /// chrono format string for the backup filename timestamp
    pub timestamp_format: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            badge_color: "#dc2626".to_string(),
            new_tab_url: "chrome://newtab/".to_string(),
            search_host_marker: "google.com".to_string(),
            backup_folder: "TabZippr".to_string(),
            file_prefix: "TabZippr-backup".to_string(),
            timestamp_format: "%m-%d-%Y-%H-%M-%S".to_string(),
        }
    }
}

impl CoreConfig {
    /// Reject overrides that would only fail later, at backup time
    pub fn validate(&self) -> Result<(), Error> {
        archive::check_timestamp_format(&self.timestamp_format)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if self.file_prefix.is_empty() {
            return Err(Error::InvalidConfig("filePrefix must not be empty".to_string()));
        }
        Ok(())
    }
}
