//! The POSIX lock sidecar JSON schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `<data>.lock` contents. Field names and casing are part of the on-disk
/// contract; unknown fields are ignored and non-essential fields may be
/// missing (readers that fail to parse treat the lock as stale).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockMetadata {
    #[serde(rename = "Pid")]
    pub pid: u32,
    #[serde(rename = "PidStartTimeUtc", skip_serializing_if = "Option::is_none", default)]
    pub pid_start_time_utc: Option<DateTime<Utc>>,
    #[serde(rename = "TimestampUtc")]
    pub timestamp_utc: DateTime<Utc>,
    #[serde(rename = "Hostname")]
    pub hostname: String,
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "LockId")]
    pub lock_id: Uuid,
    #[serde(rename = "DataFilePath")]
    pub data_file_path: String,
}
