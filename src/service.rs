/// Backup, restore and cleanup operations, and the message protocol that
/// reaches them from the popup
use chrono::NaiveDateTime;
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::archive;
use crate::config::CoreConfig;
use crate::duplicates::{GroupSummary, duplicate_groups, plan_cleanup, summarize};
use crate::error::{Error, Result};
use crate::host::{DownloadHost, TabHost};
use crate::tab_data::TabDescriptor;
use crate::tracker::{BadgeState, TrackerHandle, Trigger};

/// Messages accepted by the background page.
///
/// Wire shape is `{ "action": "...", "data": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
pub enum Request {
    #[serde(rename_all = "camelCase")]
    CreateBackup {
        tab_data: Vec<TabDescriptor>,
        filename: String,
    },
    /// Raw archive bytes
    RestoreBackup(Vec<u8>),
    ForceBadgeUpdate,
    CleanupDuplicates,
    GetDuplicateGroups,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Backup,
    Restore,
    Cleanup,
    BadgeRefresh,
    ListDuplicates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum Response {
    #[serde(rename_all = "camelCase")]
    BackupCreated {
        tab_count: usize,
        download_id: i32,
        path: String,
    },
    #[serde(rename_all = "camelCase")]
    Restored { tab_count: usize },
    BadgeRefreshed { badge: Option<BadgeState> },
    DuplicatesRemoved { removed: usize },
    DuplicateGroups { groups: Vec<GroupSummary> },
    Failed { operation: Operation, error: String },
}

/// Transient popup notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

impl Response {
    fn failed(operation: Operation, err: Error) -> Response {
        error!("{:?} error: {}", operation, err);
        Response::Failed {
            operation,
            error: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Response::Failed { .. })
    }

    /// The toast to show for user-initiated operations
    pub fn status(&self) -> Option<StatusMessage> {
        let (text, is_error) = match self {
            Response::BackupCreated { tab_count, .. } => {
                (format!("Successfully backed up {}", plural(*tab_count, "tab")), false)
            }
            Response::Restored { .. } => ("Tabs restored successfully!".to_string(), false),
            Response::DuplicatesRemoved { removed } => {
                (format!("Removed {}", plural(*removed, "duplicate tab")), false)
            }
            Response::Failed { operation, error } => {
                let verb = match operation {
                    Operation::Backup => "create backup",
                    Operation::Restore => "restore backup",
                    Operation::Cleanup => "clean up duplicates",
                    Operation::BadgeRefresh | Operation::ListDuplicates => return None,
                };
                (format!("Failed to {}: {}", verb, error), true)
            }
            Response::BadgeRefreshed { .. } | Response::DuplicateGroups { .. } => return None,
        };
        Some(StatusMessage { text, is_error })
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

/// Popup header, e.g. "3 tabs in current window"
pub fn tab_count_label(count: usize) -> String {
    format!("{} in current window", plural(count, "tab"))
}

/// Encode `entries` and hand the archive to the download collaborator.
/// Returns the download id and the path it was saved under.
pub async fn create_backup<H: DownloadHost>(
    entries: &[TabDescriptor],
    filename: &str,
    host: &H,
    config: &CoreConfig,
) -> Result<(i32, String)> {
    let bytes = archive::encode(entries)?;
    let path = archive::download_path(filename, config);

    let download_id = host
        .download(&archive::to_data_url(&bytes), &path)
        .await
        .map_err(Error::Download)?;

    info!("Backed up {} tabs to {}", entries.len(), path);
    Ok((download_id, path))
}

/// Snapshot the current window and back it up under a timestamped name
pub async fn backup_current_window<H>(host: &H, now: NaiveDateTime, config: &CoreConfig) -> Response
where
    H: TabHost + DownloadHost,
{
    let tabs = match host.query_current_window_tabs().await {
        Ok(tabs) => tabs,
        Err(e) => return Response::failed(Operation::Backup, Error::TabQuery(e)),
    };
    let entries: Vec<TabDescriptor> = tabs.iter().map(TabDescriptor::from).collect();
    let filename = match archive::backup_filename(now, config) {
        Ok(filename) => filename,
        Err(e) => return Response::failed(Operation::Backup, e.into()),
    };

    backup_response(&entries, &filename, host, config).await
}

async fn backup_response<H: DownloadHost>(
    entries: &[TabDescriptor],
    filename: &str,
    host: &H,
    config: &CoreConfig,
) -> Response {
    match create_backup(entries, filename, host, config).await {
        Ok((download_id, path)) => Response::BackupCreated {
            tab_count: entries.len(),
            download_id,
            path,
        },
        Err(e) => Response::failed(Operation::Backup, e),
    }
}

/// Decode an archive and reopen its tabs in a new window.
///
/// A bad archive creates nothing. A failure while creating tabs stops there;
/// tabs already opened are left in place.
pub async fn restore_backup<H: TabHost>(bytes: &[u8], host: &H) -> Result<usize> {
    let entries = archive::decode(bytes)?;
    if entries.is_empty() {
        info!("Backup holds no tabs, nothing to restore");
        return Ok(0);
    }

    let window = host.create_window().await.map_err(Error::TabOperation)?;
    let total = entries.len();

    for (created, entry) in entries.iter().enumerate() {
        host.create_tab(window.id, &entry.url, entry.pinned)
            .await
            .map_err(|source| Error::PartialRestore {
                created,
                total,
                source,
            })?;
    }

    if !window.initial_tab_ids.is_empty() {
        host.remove_tabs(&window.initial_tab_ids)
            .await
            .map_err(Error::TabOperation)?;
    }

    info!("Restored {} tabs into window {}", total, window.id);
    Ok(total)
}

/// Close every duplicate except the first tab of each group.
/// Groups are recomputed from a fresh query right before removal.
pub async fn cleanup_duplicates<H: TabHost>(host: &H, config: &CoreConfig) -> Result<usize> {
    let tabs = host.query_current_window_tabs().await.map_err(Error::TabQuery)?;
    let groups = duplicate_groups(&tabs, config);

    let mut removed = 0;
    for ids in plan_cleanup(&groups) {
        host.remove_tabs(&ids).await.map_err(Error::TabOperation)?;
        removed += ids.len();
    }

    info!("Removed {} duplicate tabs", removed);
    Ok(removed)
}

pub async fn list_duplicates<H: TabHost>(host: &H, config: &CoreConfig) -> Result<Vec<GroupSummary>> {
    let tabs = host.query_current_window_tabs().await.map_err(Error::TabQuery)?;
    Ok(summarize(&duplicate_groups(&tabs, config)))
}

/// Route one request to its operation
pub async fn dispatch<H>(request: Request, host: &H, tracker: &TrackerHandle, config: &CoreConfig) -> Response
where
    H: TabHost + DownloadHost,
{
    match request {
        Request::CreateBackup { tab_data, filename } => {
            backup_response(&tab_data, &filename, host, config).await
        }
        Request::RestoreBackup(bytes) => match restore_backup(&bytes, host).await {
            Ok(tab_count) => Response::Restored { tab_count },
            Err(e) => Response::failed(Operation::Restore, e),
        },
        Request::ForceBadgeUpdate => Response::BadgeRefreshed {
            badge: tracker.request(Trigger::ForceRefresh).await,
        },
        Request::CleanupDuplicates => match cleanup_duplicates(host, config).await {
            Ok(removed) => {
                tracker.notify(Trigger::ForceRefresh);
                Response::DuplicatesRemoved { removed }
            }
            Err(e) => Response::failed(Operation::Cleanup, e),
        },
        Request::GetDuplicateGroups => match list_duplicates(host, config).await {
            Ok(groups) => Response::DuplicateGroups { groups },
            Err(e) => Response::failed(Operation::ListDuplicates, e),
        },
    }
}
