//! Domain model types for the persistence abstraction layer
//!
//! These types are used as arguments and return values of the persistence
//! traits, decoupled from specific storage backends.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of a change request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    InReview,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::InReview => "IN_REVIEW",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
        }
    }

    /// Approved and rejected requests never change status again
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Approved | RequestStatus::Rejected)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(RequestStatus::Pending),
            "IN_REVIEW" => Ok(RequestStatus::InReview),
            "APPROVED" => Ok(RequestStatus::Approved),
            "REJECTED" => Ok(RequestStatus::Rejected),
            _ => Err(format!("Invalid request status: {}", s)),
        }
    }
}

/// Review status of a single change detail
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetailStatus {
    Pending,
    Approved,
    Rejected,
}

impl DetailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailStatus::Pending => "PENDING",
            DetailStatus::Approved => "APPROVED",
            DetailStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for DetailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DetailStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(DetailStatus::Pending),
            "APPROVED" => Ok(DetailStatus::Approved),
            "REJECTED" => Ok(DetailStatus::Rejected),
            _ => Err(format!("Invalid detail status: {}", s)),
        }
    }
}

/// Row-level change classification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "ADDED",
            ChangeType::Modified => "MODIFIED",
            ChangeType::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operation carried by a staged row
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StagedOperation {
    Upsert,
    Delete,
}

impl StagedOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StagedOperation::Upsert => "UPSERT",
            StagedOperation::Delete => "DELETE",
        }
    }
}

impl FromStr for StagedOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UPSERT" => Ok(StagedOperation::Upsert),
            "DELETE" => Ok(StagedOperation::Delete),
            _ => Err(format!("Invalid staged operation: {}", s)),
        }
    }
}

/// Change request as returned from persistence
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequestInfo {
    pub id: String,
    pub created_by: String,
    pub created_at: i64,
    pub status: RequestStatus,
    pub version_id: String,
    pub comment: Option<String>,
    pub submitted_at: i64,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<i64>,
    pub deployment_version_id: Option<String>,
}

/// One row-level before/after pair of a change request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeDetailInfo {
    pub id: i64,
    pub request_id: String,
    pub table: String,
    pub rule_key: Value,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub status: DetailStatus,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<i64>,
    pub comment: Option<String>,
}

impl ChangeDetailInfo {
    /// Change type derived from which side of the pair is present.
    ///
    /// Returns `None` for the invalid both-null shape.
    pub fn change_type(&self) -> Option<ChangeType> {
        match (&self.old_value, &self.new_value) {
            (None, Some(_)) => Some(ChangeType::Added),
            (Some(_), Some(_)) => Some(ChangeType::Modified),
            (Some(_), None) => Some(ChangeType::Deleted),
            (None, None) => None,
        }
    }

    /// Record key as stored in live and staging tables
    pub fn record_key(&self) -> String {
        tollgate_common::scalar_key(&self.rule_key)
    }
}

/// Active table lock
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableLockInfo {
    pub schema_id: String,
    pub locked_by: String,
    pub request_id: String,
    pub locked_at: i64,
    pub expires_at: Option<i64>,
}

impl TableLockInfo {
    /// Whether the lock has passed its expiry at `now_ms`. Locks without an
    /// expiry never expire.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| now_ms >= expires_at)
    }
}

/// A row of a live table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveRecordInfo {
    pub schema_id: String,
    pub record_key: String,
    pub payload: Value,
    pub updated_at: i64,
}

/// A row of a staging table awaiting promotion
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedRecordInfo {
    pub staging_table: String,
    pub request_id: String,
    pub record_key: String,
    pub operation: StagedOperation,
    pub payload: Option<Value>,
    pub created_at: i64,
}

/// Change request to be created
#[derive(Clone, Debug)]
pub struct NewChangeRequest {
    pub id: String,
    pub created_by: String,
    pub version_id: String,
    pub comment: Option<String>,
}

/// Change detail to be created with its request
#[derive(Clone, Debug)]
pub struct NewChangeDetail {
    pub table: String,
    pub rule_key: Value,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// Table lock to be created with its request
#[derive(Clone, Debug)]
pub struct NewTableLock {
    pub schema_id: String,
    pub locked_by: String,
    pub expires_at: Option<i64>,
}

/// Reviewer decision stamped onto change details
#[derive(Clone, Debug)]
pub struct ReviewDecision {
    pub status: DetailStatus,
    pub reviewed_by: String,
    pub comment: Option<String>,
}

/// Store-level write executed in the same unit of work as a submission or
/// a table decision
#[derive(Clone, Debug, PartialEq)]
pub enum ApplyOp {
    /// Insert or replace a live record
    UpsertRecord {
        schema_id: String,
        record_key: String,
        payload: Value,
    },
    /// Remove a live record; absent records are ignored
    DeleteRecord {
        schema_id: String,
        record_key: String,
    },
    /// Write a staging row for a request
    StageRecord {
        staging_table: String,
        request_id: String,
        record_key: String,
        operation: StagedOperation,
        payload: Option<Value>,
    },
    /// Apply every staging row of a request to the live table, then delete them
    PromoteStaged {
        staging_table: String,
        live_table: String,
        request_id: String,
    },
    /// Delete every staging row of a request without touching the live table
    DiscardStaged {
        staging_table: String,
        request_id: String,
    },
}

impl ApplyOp {
    /// Live table touched by the op, if any
    pub fn live_schema(&self) -> Option<&str> {
        match self {
            ApplyOp::UpsertRecord { schema_id, .. } | ApplyOp::DeleteRecord { schema_id, .. } => {
                Some(schema_id)
            }
            ApplyOp::PromoteStaged { live_table, .. } => Some(live_table),
            ApplyOp::StageRecord { .. } | ApplyOp::DiscardStaged { .. } => None,
        }
    }
}

/// Result of resolving a change request
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolveOutcome {
    /// False when the request was already terminal
    pub resolved: bool,
    pub released_locks: u64,
}

/// Change notification published after every committed write
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    RequestChanged { request_id: String },
    LocksChanged { schema_ids: Vec<String> },
    RecordsChanged { schema_id: String },
}

/// Storage backend selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// MySQL / PostgreSQL through SeaORM
    #[default]
    ExternalDb,
    /// In-process store for standalone and test deployments
    Embedded,
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::ExternalDb => write!(f, "external_db"),
            StorageMode::Embedded => write!(f, "embedded"),
        }
    }
}

impl FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "external_db" | "externaldb" | "mysql" | "postgresql" => Ok(StorageMode::ExternalDb),
            "embedded" | "standalone" => Ok(StorageMode::Embedded),
            _ => Err(format!("Invalid storage mode: {}", s)),
        }
    }
}

/// Generic paginated result
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub total_count: u64,
    pub page_number: u64,
    pub pages_available: u64,
    pub page_items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(total_count: u64, page_number: u64, page_size: u64, page_items: Vec<T>) -> Self {
        Self {
            total_count,
            page_number,
            pages_available: if page_size > 0 {
                total_count.div_ceil(page_size)
            } else {
                0
            },
            page_items,
        }
    }

    pub fn empty() -> Self {
        Self {
            total_count: 0,
            page_number: 0,
            pages_available: 0,
            page_items: Vec::new(),
        }
    }
}

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detail(old_value: Option<Value>, new_value: Option<Value>) -> ChangeDetailInfo {
        ChangeDetailInfo {
            id: 1,
            request_id: "r1".to_string(),
            table: "t1".to_string(),
            rule_key: json!(7),
            old_value,
            new_value,
            status: DetailStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            comment: None,
        }
    }

    #[test]
    fn test_change_type_derivation() {
        assert_eq!(
            detail(None, Some(json!({"id": 7}))).change_type(),
            Some(ChangeType::Added)
        );
        assert_eq!(
            detail(Some(json!({"id": 7})), Some(json!({"id": 7, "a": 1}))).change_type(),
            Some(ChangeType::Modified)
        );
        assert_eq!(
            detail(Some(json!({"id": 7})), None).change_type(),
            Some(ChangeType::Deleted)
        );
        assert_eq!(detail(None, None).change_type(), None);
        assert_eq!(detail(None, None).record_key(), "7");
    }

    #[test]
    fn test_request_status_roundtrip() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::InReview,
            RequestStatus::Approved,
            RequestStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<RequestStatus>().unwrap(), status);
        }
        assert!(RequestStatus::Approved.is_terminal());
        assert!(!RequestStatus::InReview.is_terminal());
        assert!("bogus".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn test_request_status_serialization() {
        let json = serde_json::to_string(&RequestStatus::InReview).unwrap();
        assert_eq!(json, "\"IN_REVIEW\"");
    }

    #[test]
    fn test_lock_expiry() {
        let mut lock = TableLockInfo {
            schema_id: "t1".to_string(),
            locked_by: "alice".to_string(),
            request_id: "r1".to_string(),
            locked_at: 1_000,
            expires_at: None,
        };
        assert!(!lock.is_expired_at(i64::MAX));
        lock.expires_at = Some(2_000);
        assert!(!lock.is_expired_at(1_999));
        assert!(lock.is_expired_at(2_000));
    }

    #[test]
    fn test_page_new() {
        let page = Page::new(41, 1, 20, vec![1, 2, 3]);
        assert_eq!(page.pages_available, 3);
        let page: Page<i32> = Page::new(0, 1, 0, vec![]);
        assert_eq!(page.pages_available, 0);
    }

    #[test]
    fn test_storage_mode_parse() {
        assert_eq!("embedded".parse::<StorageMode>().unwrap(), StorageMode::Embedded);
        assert_eq!(
            "external_db".parse::<StorageMode>().unwrap(),
            StorageMode::ExternalDb
        );
        assert_eq!(StorageMode::Embedded.to_string(), "embedded");
    }
}
