/// Backup archive codec: a zip container holding one pretty-printed JSON
/// tab list, compressed with DEFLATE.
use std::fmt::Write as _;
use std::io::{Cursor, Read, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDateTime;
use chrono::format::{Item, StrftimeItems};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::config::CoreConfig;
use crate::error::ArchiveError;
use crate::tab_data::TabDescriptor;

const DATA_URL_PREFIX: &str = "data:application/zip;base64,";

/// Name of the single JSON member inside every backup
pub const MEMBER_NAME: &str = "tabs.json";

/// DEFLATE level for the member
pub const COMPRESSION_LEVEL: i64 = 9;

/// Serialize tab descriptors into archive bytes.
///
/// Nothing is returned unless the whole archive was written.
pub fn encode(entries: &[TabDescriptor]) -> Result<Vec<u8>, ArchiveError> {
    let json = serde_json::to_vec_pretty(entries).map_err(|e| ArchiveError::Encode(e.to_string()))?;

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(MEMBER_NAME, options)
        .map_err(|e| ArchiveError::Encode(e.to_string()))?;
    writer
        .write_all(&json)
        .map_err(|e| ArchiveError::Encode(e.to_string()))?;

    let cursor = writer
        .finish()
        .map_err(|e| ArchiveError::Encode(e.to_string()))?;

    Ok(cursor.into_inner())
}

/// Read tab descriptors back out of archive bytes, in stored order
pub fn decode(bytes: &[u8]) -> Result<Vec<TabDescriptor>, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut member = match archive.by_name(MEMBER_NAME) {
        Ok(member) => member,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(ArchiveError::MissingMember(MEMBER_NAME.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let mut raw = Vec::new();
    member
        .read_to_end(&mut raw)
        .map_err(|e| ArchiveError::Format(e.into()))?;

    let text = String::from_utf8(raw).map_err(|e| ArchiveError::Content(e.to_string()))?;

    serde_json::from_str(&text).map_err(|e| ArchiveError::Content(e.to_string()))
}

/// Check a chrono format string before it is used for backup names
pub fn check_timestamp_format(format: &str) -> Result<(), ArchiveError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ArchiveError::TimestampFormat(format.to_string()));
    }
    Ok(())
}

/// Backup filename, e.g. `TabZippr-backup-04-08-2025-14-03-09.zip`.
/// The timestamp is metadata only; restore never parses it.
pub fn backup_filename(now: NaiveDateTime, config: &CoreConfig) -> Result<String, ArchiveError> {
    check_timestamp_format(&config.timestamp_format)?;

    let mut filename = format!("{}-", config.file_prefix);
    write!(filename, "{}", now.format(&config.timestamp_format))
        .map_err(|_| ArchiveError::TimestampFormat(config.timestamp_format.clone()))?;
    filename.push_str(".zip");
    Ok(filename)
}

/// Path handed to the download collaborator
pub fn download_path(filename: &str, config: &CoreConfig) -> String {
    format!("{}/{}", config.backup_folder, filename)
}

/// Wrap archive bytes for the host download API
pub fn to_data_url(bytes: &[u8]) -> String {
    format!("{}{}", DATA_URL_PREFIX, STANDARD.encode(bytes))
}
