/// Duplicate state tracking and the badge it drives
use futures::StreamExt;
use futures::channel::{mpsc, oneshot};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::CoreConfig;
use crate::duplicates::{duplicate_count, duplicate_groups};
use crate::host::{BadgeHost, TabHost};

/// `windows.onFocusChanged` id meaning "no browser window has focus"
pub const WINDOW_ID_NONE: i32 = -1;

/// Stored count that never equals a real one, so the next cycle always renders
const FORCE_SENTINEL: i64 = -1;

/// Events that may change the duplicate count
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    TabCreated,
    TabRemoved,
    TabUpdated { url_changed: bool, load_complete: bool },
    TabActivated,
    WindowFocusChanged { window_id: i32 },
    ForceRefresh,
    Installed,
    Startup,
}

impl Trigger {
    /// Updates that neither change the URL nor finish loading are ignored,
    /// as is focus moving away from every window.
    pub fn requires_recompute(&self) -> bool {
        match self {
            Trigger::TabUpdated {
                url_changed,
                load_complete,
            } => *url_changed || *load_complete,
            Trigger::WindowFocusChanged { window_id } => *window_id != WINDOW_ID_NONE,
            _ => true,
        }
    }
}

/// The `changeInfo` object passed to `tabs.onUpdated`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TabChangeInfo {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl From<TabChangeInfo> for Trigger {
    fn from(change: TabChangeInfo) -> Self {
        Trigger::TabUpdated {
            url_changed: change.url.is_some(),
            load_complete: change.status.as_deref() == Some("complete"),
        }
    }
}

/// What the badge should show. Empty text clears it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeState {
    pub text: String,
    pub background_color: String,
}

impl BadgeState {
    pub fn for_count(count: usize, config: &CoreConfig) -> BadgeState {
        BadgeState {
            text: if count > 0 { count.to_string() } else { String::new() },
            background_color: config.badge_color.clone(),
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.text.is_empty()
    }
}

/// Sole owner of the last rendered duplicate count
#[derive(Debug)]
pub struct DuplicateTracker {
    last_known: i64,
    config: CoreConfig,
}

impl DuplicateTracker {
    pub fn new(config: CoreConfig) -> Self {
        DuplicateTracker {
            last_known: 0,
            config,
        }
    }

    pub fn last_known_count(&self) -> i64 {
        self.last_known
    }

    /// Record a freshly computed count. Returns the badge to render, or
    /// `None` when the count is unchanged.
    pub fn observe(&mut self, count: usize) -> Option<BadgeState> {
        let count = count as i64;
        if count == self.last_known {
            return None;
        }
        self.last_known = count;
        Some(BadgeState::for_count(count as usize, &self.config))
    }

    /// Run one cycle for `trigger`. Failures are logged, never returned;
    /// the result is the badge that was emitted, if any.
    pub async fn handle<H>(&mut self, trigger: Trigger, host: &H) -> Option<BadgeState>
    where
        H: TabHost + BadgeHost,
    {
        if !trigger.requires_recompute() {
            debug!("Ignoring {:?}", trigger);
            return None;
        }
        info!("{:?} - updating badge", trigger);

        match trigger {
            Trigger::ForceRefresh => self.last_known = FORCE_SENTINEL,
            Trigger::Installed => {
                if let Err(e) = host.set_badge_background_color(&self.config.badge_color).await {
                    warn!("Failed to set badge color: {}", e);
                }
                if let Err(e) = host.set_badge_text("").await {
                    warn!("Failed to clear badge: {}", e);
                }
                self.last_known = 0;
            }
            Trigger::Startup => self.last_known = 0,
            _ => {}
        }

        self.recompute(host).await
    }

    async fn recompute<H>(&mut self, host: &H) -> Option<BadgeState>
    where
        H: TabHost + BadgeHost,
    {
        let tabs = match host.query_current_window_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                error!("Error checking duplicates: {}", e);
                return None;
            }
        };
        debug!("Checking duplicates across {} tabs", tabs.len());

        let groups = duplicate_groups(&tabs, &self.config);
        for group in &groups {
            debug!("Found {} duplicates for URL: {}", group.count() - 1, group.key);
        }
        let total = duplicate_count(&groups);
        info!("Total duplicate tabs found: {}", total);

        let badge = self.observe(total)?;
        render(&badge, host).await;
        Some(badge)
    }
}

async fn render<H: BadgeHost>(badge: &BadgeState, host: &H) {
    if badge.is_cleared() {
        info!("Clearing badge");
        if let Err(e) = host.set_badge_text("").await {
            error!("Failed to clear badge: {}", e);
        }
        return;
    }

    info!("Setting badge text to: {}", badge.text);
    if let Err(e) = host.set_badge_background_color(&badge.background_color).await {
        error!("Failed to set badge: {}", e);
        return;
    }
    if let Err(e) = host.set_badge_text(&badge.text).await {
        error!("Failed to set badge: {}", e);
    }
}

struct Job {
    trigger: Trigger,
    reply: Option<oneshot::Sender<Option<BadgeState>>>,
}

/// Cloneable entry point to the tracker loop
#[derive(Clone)]
pub struct TrackerHandle {
    tx: mpsc::UnboundedSender<Job>,
}

/// Receiving side, consumed by [`run_tracker`]
pub struct TrackerQueue {
    rx: mpsc::UnboundedReceiver<Job>,
}

pub fn tracker_channel() -> (TrackerHandle, TrackerQueue) {
    let (tx, rx) = mpsc::unbounded();
    (TrackerHandle { tx }, TrackerQueue { rx })
}

impl TrackerHandle {
    /// Queue a cycle without waiting for it
    pub fn notify(&self, trigger: Trigger) {
        let job = Job {
            trigger,
            reply: None,
        };
        if self.tx.unbounded_send(job).is_err() {
            warn!("Duplicate tracker is not running");
        }
    }

    /// Queue a cycle and wait until it has run
    pub async fn request(&self, trigger: Trigger) -> Option<BadgeState> {
        let (reply, done) = oneshot::channel();
        let job = Job {
            trigger,
            reply: Some(reply),
        };
        if self.tx.unbounded_send(job).is_err() {
            warn!("Duplicate tracker is not running");
            return None;
        }
        done.await.ok().flatten()
    }
}

/// Drain the queue one cycle at a time until every handle is dropped.
/// Cycles never overlap, so each reads and writes the count in turn.
pub async fn run_tracker<H>(mut tracker: DuplicateTracker, host: &H, mut queue: TrackerQueue)
where
    H: TabHost + BadgeHost,
{
    while let Some(job) = queue.rx.next().await {
        let badge = tracker.handle(job.trigger, host).await;
        if let Some(reply) = job.reply {
            let _ = reply.send(badge);
        }
    }
    info!("Duplicate tracker stopped");
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::host::fake::FakeHost;

    fn tracker() -> DuplicateTracker {
        DuplicateTracker::new(CoreConfig::default())
    }

    #[test]
    fn test_badge_state_for_count() {
        let config = CoreConfig::default();

        assert_eq!(
            BadgeState::for_count(3, &config),
            BadgeState {
                text: "3".to_string(),
                background_color: "#dc2626".to_string(),
            }
        );
        assert!(BadgeState::for_count(0, &config).is_cleared());
    }

    #[test]
    fn test_observe_skips_unchanged_count() {
        let mut tracker = tracker();

        assert_eq!(tracker.observe(0), None);
        assert_eq!(tracker.observe(2).map(|b| b.text), Some("2".to_string()));
        assert_eq!(tracker.observe(2), None);
        assert_eq!(tracker.observe(0).map(|b| b.is_cleared()), Some(true));
        assert_eq!(tracker.last_known_count(), 0);
    }

    #[test]
    fn test_trigger_filtering() {
        assert!(Trigger::TabCreated.requires_recompute());
        assert!(Trigger::TabUpdated { url_changed: true, load_complete: false }.requires_recompute());
        assert!(Trigger::TabUpdated { url_changed: false, load_complete: true }.requires_recompute());
        assert!(!Trigger::TabUpdated { url_changed: false, load_complete: false }.requires_recompute());
        assert!(Trigger::WindowFocusChanged { window_id: 4 }.requires_recompute());
        assert!(!Trigger::WindowFocusChanged { window_id: WINDOW_ID_NONE }.requires_recompute());
    }

    #[test]
    fn test_change_info_to_trigger() {
        let change: TabChangeInfo = serde_json::from_str(r#"{"status":"loading"}"#).unwrap();
        assert!(!Trigger::from(change).requires_recompute());

        let change: TabChangeInfo = serde_json::from_str(r#"{"status":"complete"}"#).unwrap();
        assert!(Trigger::from(change).requires_recompute());

        let change: TabChangeInfo =
            serde_json::from_str(r#"{"url":"https://a.example","title":"A"}"#).unwrap();
        assert_eq!(
            Trigger::from(change),
            Trigger::TabUpdated { url_changed: true, load_complete: false }
        );
    }

    #[test]
    fn test_handle_emits_on_change_only() {
        let host = FakeHost::with_urls(&["https://a.example", "https://a.example", "https://b.example"]);
        let mut tracker = tracker();

        let first = block_on(tracker.handle(Trigger::TabCreated, &host));
        assert_eq!(first.map(|b| b.text), Some("1".to_string()));
        assert_eq!(*host.badge_texts.borrow(), vec!["1".to_string()]);
        assert_eq!(*host.badge_colors.borrow(), vec!["#dc2626".to_string()]);

        let second = block_on(tracker.handle(Trigger::TabActivated, &host));
        assert_eq!(second, None);
        assert_eq!(host.badge_texts.borrow().len(), 1);
    }

    #[test]
    fn test_handle_clears_badge_when_duplicates_go_away() {
        let host = FakeHost::with_urls(&["https://a.example", "https://a.example"]);
        let mut tracker = tracker();
        block_on(tracker.handle(Trigger::TabCreated, &host));

        host.set_urls(&["https://a.example"]);
        let badge = block_on(tracker.handle(Trigger::TabRemoved, &host));

        assert_eq!(badge.map(|b| b.is_cleared()), Some(true));
        assert_eq!(host.badge_texts.borrow().last(), Some(&String::new()));
        assert_eq!(tracker.last_known_count(), 0);
    }

    #[test]
    fn test_force_refresh_always_renders() {
        let host = FakeHost::with_urls(&["https://a.example", "https://a.example"]);
        let mut tracker = tracker();
        block_on(tracker.handle(Trigger::TabCreated, &host));
        assert_eq!(block_on(tracker.handle(Trigger::TabActivated, &host)), None);

        let badge = block_on(tracker.handle(Trigger::ForceRefresh, &host));

        assert_eq!(badge.map(|b| b.text), Some("1".to_string()));
        assert_eq!(host.badge_texts.borrow().len(), 2);
    }

    #[test]
    fn test_force_refresh_renders_zero() {
        let host = FakeHost::with_urls(&["https://a.example"]);
        let mut tracker = tracker();

        let badge = block_on(tracker.handle(Trigger::ForceRefresh, &host));

        assert_eq!(badge.map(|b| b.is_cleared()), Some(true));
        assert_eq!(*host.badge_texts.borrow(), vec![String::new()]);
    }

    #[test]
    fn test_ignored_trigger_does_nothing() {
        let host = FakeHost::with_urls(&["https://a.example", "https://a.example"]);
        let mut tracker = tracker();

        let badge = block_on(tracker.handle(Trigger::WindowFocusChanged { window_id: WINDOW_ID_NONE }, &host));

        assert_eq!(badge, None);
        assert!(host.badge_texts.borrow().is_empty());
        assert_eq!(tracker.last_known_count(), 0);
    }

    #[test]
    fn test_installed_initializes_badge() {
        let host = FakeHost::with_urls(&["https://a.example", "https://a.example"]);
        let mut tracker = tracker();

        block_on(tracker.handle(Trigger::Installed, &host));

        assert_eq!(*host.badge_texts.borrow(), vec![String::new(), "1".to_string()]);
        assert_eq!(host.badge_colors.borrow().len(), 2);
        assert_eq!(tracker.last_known_count(), 1);
    }

    #[test]
    fn test_startup_resets_count() {
        let host = FakeHost::with_urls(&["https://a.example", "https://a.example"]);
        let mut tracker = tracker();
        block_on(tracker.handle(Trigger::TabCreated, &host));

        host.set_urls(&[]);
        // Startup makes 0 the baseline, so an empty window emits nothing
        let badge = block_on(tracker.handle(Trigger::Startup, &host));

        assert_eq!(badge, None);
        assert_eq!(tracker.last_known_count(), 0);
    }

    #[test]
    fn test_query_failure_is_swallowed() {
        let host = FakeHost::with_urls(&["https://a.example", "https://a.example"]);
        host.fail_query.set(true);
        let mut tracker = tracker();

        assert_eq!(block_on(tracker.handle(Trigger::TabCreated, &host)), None);
        assert_eq!(tracker.last_known_count(), 0);
    }

    #[test]
    fn test_badge_failure_still_records_count() {
        let host = FakeHost::with_urls(&["https://a.example", "https://a.example"]);
        host.fail_badge.set(true);
        let mut tracker = tracker();

        let badge = block_on(tracker.handle(Trigger::TabCreated, &host));

        assert_eq!(badge.map(|b| b.text), Some("1".to_string()));
        assert_eq!(tracker.last_known_count(), 1);
    }

    #[test]
    fn test_queue_serializes_cycles() {
        let host = FakeHost::with_urls(&["https://a.example", "https://a.example", "https://a.example"]);
        let (handle, queue) = tracker_channel();

        let (_, results) = block_on(async {
            futures::join!(run_tracker(tracker(), &host, queue), async move {
                handle.notify(Trigger::TabCreated);
                handle.notify(Trigger::TabActivated);
                let forced = handle.request(Trigger::ForceRefresh).await;
                let repeat = handle.request(Trigger::TabRemoved).await;
                (forced, repeat)
            })
        });

        assert_eq!(results.0.map(|b| b.text), Some("2".to_string()));
        assert_eq!(results.1, None);
        assert_eq!(*host.badge_texts.borrow(), vec!["2".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_request_without_loop() {
        let (handle, queue) = tracker_channel();
        drop(queue);

        assert_eq!(block_on(handle.request(Trigger::ForceRefresh)), None);
    }
}
