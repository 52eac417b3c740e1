/// TabZippr - Chrome Extension for tab backup/restore and duplicate detection
/// Built with Rust + WASM

pub mod archive;
mod bridge;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod host;
pub mod normalize;
pub mod service;
pub mod tab_data;
pub mod tracker;

use std::cell::RefCell;

use log::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::bridge::ChromeHost;
use crate::config::CoreConfig;
use crate::error::Error;
use crate::service::{Request, Response};
use crate::tab_data::TabInfo;
use crate::tracker::{DuplicateTracker, TabChangeInfo, TrackerHandle, Trigger};

thread_local! {
    static CONFIG: RefCell<CoreConfig> = RefCell::new(CoreConfig::default());
    static TRACKER: RefCell<Option<TrackerHandle>> = const { RefCell::new(None) };
}

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

fn current_config() -> CoreConfig {
    CONFIG.with(|config| config.borrow().clone())
}

fn tracker_handle() -> Option<TrackerHandle> {
    TRACKER.with(|tracker| tracker.borrow().clone())
}

fn notify(trigger: Trigger) {
    match tracker_handle() {
        Some(handle) => handle.notify(trigger),
        None => warn!("Background not started, dropping {:?}", trigger),
    }
}

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

// Background page

/// Load the configuration overrides (if any) and start the duplicate tracker
#[wasm_bindgen]
pub fn start_background(config: JsValue) -> Result<(), JsValue> {
    let config: CoreConfig = if config.is_null() || config.is_undefined() {
        CoreConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config).map_err(to_js_error)?
    };
    config.validate().map_err(to_js_error)?;
    CONFIG.with(|current| *current.borrow_mut() = config.clone());

    let (handle, queue) = tracker::tracker_channel();
    TRACKER.with(|tracker| *tracker.borrow_mut() = Some(handle));

    spawn_local(async move {
        let host = ChromeHost;
        tracker::run_tracker(DuplicateTracker::new(config), &host, queue).await;
    });
    Ok(())
}

#[wasm_bindgen]
pub fn on_tab_created() {
    notify(Trigger::TabCreated);
}

#[wasm_bindgen]
pub fn on_tab_removed() {
    notify(Trigger::TabRemoved);
}

#[wasm_bindgen]
pub fn on_tab_updated(change_info: JsValue) {
    match serde_wasm_bindgen::from_value::<TabChangeInfo>(change_info) {
        Ok(change) => notify(change.into()),
        Err(e) => warn!("Ignoring malformed tab update: {}", e),
    }
}

#[wasm_bindgen]
pub fn on_tab_activated() {
    notify(Trigger::TabActivated);
}

#[wasm_bindgen]
pub fn on_window_focus_changed(window_id: i32) {
    notify(Trigger::WindowFocusChanged { window_id });
}

#[wasm_bindgen]
pub fn on_installed() {
    notify(Trigger::Installed);
}

#[wasm_bindgen]
pub fn on_startup() {
    notify(Trigger::Startup);
}

/// Handle a `{ action, data }` message from the popup
#[wasm_bindgen]
pub async fn handle_message(message: JsValue) -> Result<JsValue, JsValue> {
    let request: Request = serde_wasm_bindgen::from_value(message)
        .map_err(|e| to_js_error(Error::InvalidRequest(e.to_string())))?;
    let tracker = tracker_handle()
        .ok_or_else(|| to_js_error(Error::InvalidRequest("background not started".to_string())))?;
    let config = current_config();

    let response = service::dispatch(request, &ChromeHost, &tracker, &config).await;
    serde_wasm_bindgen::to_value(&response).map_err(to_js_error)
}

// Popup helpers

/// Back up the current window directly, named after the local time
#[wasm_bindgen]
pub async fn backup_current_window() -> Result<JsValue, JsValue> {
    let config = current_config();
    let now = chrono::Local::now().naive_local();

    let response = service::backup_current_window(&ChromeHost, now, &config).await;
    serde_wasm_bindgen::to_value(&response).map_err(to_js_error)
}

/// Toast for a response returned by `handle_message`
#[wasm_bindgen]
pub fn status_for(response: JsValue) -> Result<JsValue, JsValue> {
    let response: Response = serde_wasm_bindgen::from_value(response).map_err(to_js_error)?;
    serde_wasm_bindgen::to_value(&response.status()).map_err(to_js_error)
}

#[wasm_bindgen]
pub fn backup_filename() -> Result<String, JsValue> {
    archive::backup_filename(chrono::Local::now().naive_local(), &current_config()).map_err(to_js_error)
}

#[wasm_bindgen]
pub fn tab_count_label(count: usize) -> String {
    service::tab_count_label(count)
}

/// Duplicate key for a URL, or undefined when the tab would be skipped
#[wasm_bindgen]
pub fn normalize_url(url: &str) -> Option<String> {
    normalize::normalized_key(url, &current_config()).map(|key| key.to_string())
}

/// `[tabId, signal]` pairs for the content-script highlighter
#[wasm_bindgen]
pub fn highlight_signals(tabs: JsValue) -> Result<JsValue, JsValue> {
    let tabs: Vec<TabInfo> = serde_wasm_bindgen::from_value(tabs).map_err(to_js_error)?;
    let plan = duplicates::highlight_plan(&tabs, &current_config());
    serde_wasm_bindgen::to_value(&plan).map_err(to_js_error)
}

#[wasm_bindgen]
pub fn version() -> String {
    config::VERSION.to_string()
}
