/// Error types for TabZippr

use thiserror::Error;

/// Why a tab URL was left out of duplicate grouping.
#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("tab has no url")]
    Empty,

    #[error("new tab placeholder")]
    Placeholder,

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to encode backup: {0}")]
    Encode(String),

    #[error("not a valid backup archive: {0}")]
    Format(#[from] zip::result::ZipError),

    #[error("backup archive has no {0}")]
    MissingMember(String),

    #[error("backup contents are not valid tab data: {0}")]
    Content(String),

    #[error("invalid timestamp format {0:?}")]
    TimestampFormat(String),
}

/// Failure reported by a browser collaborator.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{0}")]
pub struct HostError(pub String);

impl From<&str> for HostError {
    fn from(message: &str) -> Self {
        HostError(message.to_string())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("download failed: {0}")]
    Download(HostError),

    #[error("tab query failed: {0}")]
    TabQuery(HostError),

    #[error("tab operation failed: {0}")]
    TabOperation(HostError),

    #[error("restore stopped after {created} of {total} tabs: {source}")]
    PartialRestore {
        created: usize,
        total: usize,
        source: HostError,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
