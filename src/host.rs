/// Browser collaborators the core talks to.
///
/// The wasm build implements these over the extension APIs (see `bridge`);
/// tests use the in-memory `fake::FakeHost`.

use crate::error::HostError;
use crate::tab_data::TabInfo;

/// A freshly created browser window and the tabs the host opened in it
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedWindow {
    pub id: i32,
    pub initial_tab_ids: Vec<i32>,
}

#[allow(async_fn_in_trait)]
pub trait TabHost {
    /// Tabs of the current window, in host order
    async fn query_current_window_tabs(&self) -> Result<Vec<TabInfo>, HostError>;

    async fn remove_tabs(&self, tab_ids: &[i32]) -> Result<(), HostError>;

    async fn create_window(&self) -> Result<CreatedWindow, HostError>;

    async fn create_tab(&self, window_id: i32, url: &str, pinned: bool) -> Result<(), HostError>;
}

#[allow(async_fn_in_trait)]
pub trait DownloadHost {
    /// Persist a data URL under `path`, returning the host's download id.
    /// Name collisions are resolved by the host.
    async fn download(&self, data_url: &str, path: &str) -> Result<i32, HostError>;
}

#[allow(async_fn_in_trait)]
pub trait BadgeHost {
    async fn set_badge_text(&self, text: &str) -> Result<(), HostError>;

    async fn set_badge_background_color(&self, color: &str) -> Result<(), HostError>;
}
