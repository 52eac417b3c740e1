/// Browser extension API bridge
use serde::Deserialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::error::HostError;
use crate::host::{BadgeHost, CreatedWindow, DownloadHost, TabHost};
use crate::tab_data::TabInfo;

// Import JS bridge functions
#[wasm_bindgen(module = "/js/host.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getCurrentWindowTabs() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeTabs(tab_ids: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn createWindow() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn createTab(window_id: i32, url: &str, pinned: bool) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn downloadDataUrl(data_url: &str, filename: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setBadgeText(text: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn setBadgeBackgroundColor(color: &str) -> Result<(), JsValue>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WindowJs {
    id: i32,
    #[serde(default)]
    tab_ids: Vec<i32>,
}

fn host_error(e: JsValue) -> HostError {
    match e.dyn_ref::<js_sys::Error>() {
        Some(err) => HostError(String::from(err.message())),
        None => HostError(e.as_string().unwrap_or_else(|| format!("{:?}", e))),
    }
}

fn decode_error(e: serde_wasm_bindgen::Error) -> HostError {
    HostError(format!("unexpected host data: {}", e))
}

/// The real browser, reached through `js/host.js`
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeHost;

impl TabHost for ChromeHost {
    async fn query_current_window_tabs(&self) -> Result<Vec<TabInfo>, HostError> {
        let tabs_js = getCurrentWindowTabs().await.map_err(host_error)?;
        serde_wasm_bindgen::from_value(tabs_js).map_err(decode_error)
    }

    async fn remove_tabs(&self, tab_ids: &[i32]) -> Result<(), HostError> {
        let tab_ids_js = serde_wasm_bindgen::to_value(tab_ids).map_err(decode_error)?;
        removeTabs(tab_ids_js).await.map_err(host_error)
    }

    async fn create_window(&self) -> Result<CreatedWindow, HostError> {
        let window_js = createWindow().await.map_err(host_error)?;
        let window: WindowJs = serde_wasm_bindgen::from_value(window_js).map_err(decode_error)?;
        Ok(CreatedWindow {
            id: window.id,
            initial_tab_ids: window.tab_ids,
        })
    }

    async fn create_tab(&self, window_id: i32, url: &str, pinned: bool) -> Result<(), HostError> {
        createTab(window_id, url, pinned).await.map_err(host_error)
    }
}

impl DownloadHost for ChromeHost {
    async fn download(&self, data_url: &str, path: &str) -> Result<i32, HostError> {
        let id = downloadDataUrl(data_url, path).await.map_err(host_error)?;
        download_id(id.as_f64())
    }
}

/// Download ids come back as JS numbers; anything that is not a whole i32 is rejected
fn download_id(id: Option<f64>) -> Result<i32, HostError> {
    let id = id.ok_or_else(|| HostError::from("download did not start"))?;
    let whole = id as i64;
    if whole as f64 != id {
        return Err(HostError(format!("download id {} is not an integer", id)));
    }
    i32::try_from(whole).map_err(|_| HostError(format!("download id {} is out of range", id)))
}

impl BadgeHost for ChromeHost {
    async fn set_badge_text(&self, text: &str) -> Result<(), HostError> {
        setBadgeText(text).await.map_err(host_error)
    }

    async fn set_badge_background_color(&self, color: &str) -> Result<(), HostError> {
        setBadgeBackgroundColor(color).await.map_err(host_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_id() {
        assert_eq!(download_id(Some(42.0)), Ok(42));
        assert_eq!(download_id(None), Err(HostError::from("download did not start")));
    }

    #[test]
    fn test_download_id_rejects_out_of_range() {
        assert!(download_id(Some(4_294_967_296.0)).is_err());
        assert!(download_id(Some(f64::from(i32::MAX) + 1.0)).is_err());
        assert!(download_id(Some(1.5)).is_err());
        assert!(download_id(Some(f64::NAN)).is_err());
        assert_eq!(download_id(Some(f64::from(i32::MAX))), Ok(i32::MAX));
    }
}
