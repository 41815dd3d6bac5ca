//! Review workflow models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tollgate_persistence::{ChangeDetailInfo, ChangeRequestInfo, DetailStatus, RequestStatus};

/// Primary key fields tried after `id` and `_id` when a table does not name one
pub const DEFAULT_DOMAIN_KEYS: [&str; 4] = ["pricing_rule_id", "profile_id", "program_id", "offer_id"];

/// Before and after snapshot of one table
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSnapshot {
    #[serde(default)]
    pub old_data: Vec<Value>,
    #[serde(default)]
    pub new_data: Vec<Value>,
    /// Explicit primary key field; resolved from the data when absent
    #[serde(default)]
    pub primary_key: Option<String>,
}

impl TableSnapshot {
    pub fn new(old_data: Vec<Value>, new_data: Vec<Value>) -> Self {
        Self {
            old_data,
            new_data,
            primary_key: None,
        }
    }

    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = Some(primary_key.into());
        self
    }

    /// The explicit primary key, else the first candidate field found in any
    /// record of either side
    pub fn resolve_primary_key(&self, candidates: &[String]) -> Option<String> {
        if let Some(primary_key) = &self.primary_key {
            return Some(primary_key.clone());
        }
        candidates
            .iter()
            .find(|candidate| {
                self.old_data
                    .iter()
                    .chain(self.new_data.iter())
                    .any(|record| record.get(candidate.as_str()).is_some())
            })
            .cloned()
    }
}

/// A batch of table edits submitted for review
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmission {
    pub schema_ids: Vec<String>,
    #[serde(default)]
    pub table_changes: BTreeMap<String, TableSnapshot>,
    #[serde(default)]
    pub version_id: String,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Result of a successful submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub request_id: String,
    pub change_count: usize,
    /// Tables that received changes, and therefore a lock
    pub tables: Vec<String>,
}

impl SubmitReceipt {
    pub fn message(&self) -> String {
        format!(
            "Change request {} submitted with {} change(s) across {}",
            self.request_id,
            self.change_count,
            self.tables.join(", ")
        )
    }
}

/// Details of one table within a request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableChangesSummary {
    pub schema_id: String,
    pub changed_rows_count: usize,
    pub changes: Vec<ChangeDetailInfo>,
    pub status: DetailStatus,
}

impl TableChangesSummary {
    /// Aggregate table status: approved or rejected when every detail agrees,
    /// pending otherwise
    pub fn aggregate_status(details: &[ChangeDetailInfo]) -> DetailStatus {
        if !details.is_empty() && details.iter().all(|d| d.status == DetailStatus::Approved) {
            DetailStatus::Approved
        } else if !details.is_empty() && details.iter().all(|d| d.status == DetailStatus::Rejected)
        {
            DetailStatus::Rejected
        } else {
            DetailStatus::Pending
        }
    }
}

/// Group details by table, keeping the order in which tables first appear
pub fn summarize_tables(details: &[ChangeDetailInfo]) -> Vec<TableChangesSummary> {
    let mut tables: Vec<(String, Vec<ChangeDetailInfo>)> = Vec::new();
    for detail in details {
        match tables.iter_mut().find(|(table, _)| *table == detail.table) {
            Some((_, grouped)) => grouped.push(detail.clone()),
            None => tables.push((detail.table.clone(), vec![detail.clone()])),
        }
    }
    tables
        .into_iter()
        .map(|(schema_id, changes)| TableChangesSummary {
            status: TableChangesSummary::aggregate_status(&changes),
            changed_rows_count: changes.len(),
            schema_id,
            changes,
        })
        .collect()
}

/// A request with its per-table view
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequestSummary {
    #[serde(flatten)]
    pub request: ChangeRequestInfo,
    pub tables: Vec<TableChangesSummary>,
}

/// Result of a table-level approve or reject
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReviewOutcome {
    pub request_id: String,
    pub table: String,
    /// Details moved out of pending; zero when the call was a no-op
    pub updated: u64,
    /// Terminal status reached by the finalize that followed, if any
    pub finalized: Option<RequestStatus>,
}

/// Request resolved by a bulk operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResolved {
    pub request_id: String,
    pub status: RequestStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
    pub request_id: String,
    pub message: String,
}

/// Best-effort report of approve-all / reject-all
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkReviewReport {
    pub resolved: Vec<BulkResolved>,
    pub failures: Vec<BulkFailure>,
}

/// Review workflow settings
#[derive(Clone, Debug)]
pub struct ReviewOptions {
    /// Primary key fields tried, in order, for tables without an explicit key
    pub primary_key_candidates: Vec<String>,
    /// Lock lifetime in seconds; zero keeps locks until the request resolves
    pub lock_ttl_seconds: u64,
    /// Finalize a request as soon as its last pending table is decided
    pub auto_finalize: bool,
}

impl Default for ReviewOptions {
    fn default() -> Self {
        let primary_key_candidates = ["id", "_id"]
            .into_iter()
            .chain(DEFAULT_DOMAIN_KEYS)
            .map(str::to_string)
            .collect();
        Self {
            primary_key_candidates,
            lock_ttl_seconds: 0,
            auto_finalize: true,
        }
    }
}

impl ReviewOptions {
    /// Expiry of a lock taken at `now_ms`, if locks expire at all
    pub fn lock_expiry(&self, now_ms: i64) -> Option<i64> {
        (self.lock_ttl_seconds > 0).then(|| now_ms + (self.lock_ttl_seconds as i64) * 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detail(table: &str, status: DetailStatus) -> ChangeDetailInfo {
        ChangeDetailInfo {
            id: 1,
            request_id: "r1".to_string(),
            table: table.to_string(),
            rule_key: json!(1),
            old_value: None,
            new_value: Some(json!({"id": 1})),
            status,
            reviewed_by: None,
            reviewed_at: None,
            comment: None,
        }
    }

    #[test]
    fn test_resolve_primary_key() {
        let candidates = ReviewOptions::default().primary_key_candidates;
        let snapshot = TableSnapshot::new(vec![json!({"offer_id": 1})], vec![]);
        assert_eq!(
            snapshot.resolve_primary_key(&candidates).as_deref(),
            Some("offer_id")
        );

        let snapshot = TableSnapshot::new(vec![], vec![json!({"_id": 1, "profile_id": 2})]);
        assert_eq!(snapshot.resolve_primary_key(&candidates).as_deref(), Some("_id"));

        let snapshot = TableSnapshot::new(vec![], vec![json!({"code": 1})]).with_primary_key("code");
        assert_eq!(snapshot.resolve_primary_key(&candidates).as_deref(), Some("code"));

        let snapshot = TableSnapshot::new(vec![], vec![json!({"code": 1})]);
        assert_eq!(snapshot.resolve_primary_key(&candidates), None);
    }

    #[test]
    fn test_summarize_tables() {
        let details = vec![
            detail("t1", DetailStatus::Approved),
            detail("t2", DetailStatus::Rejected),
            detail("t1", DetailStatus::Approved),
            detail("t3", DetailStatus::Approved),
            detail("t3", DetailStatus::Pending),
        ];
        let tables = summarize_tables(&details);
        let view: Vec<_> = tables
            .iter()
            .map(|t| (t.schema_id.as_str(), t.changed_rows_count, t.status))
            .collect();
        assert_eq!(
            view,
            vec![
                ("t1", 2, DetailStatus::Approved),
                ("t2", 1, DetailStatus::Rejected),
                ("t3", 2, DetailStatus::Pending),
            ]
        );
    }

    #[test]
    fn test_lock_expiry() {
        let mut options = ReviewOptions::default();
        assert_eq!(options.lock_expiry(1_000), None);
        options.lock_ttl_seconds = 60;
        assert_eq!(options.lock_expiry(1_000), Some(61_000));
    }

    #[test]
    fn test_submission_deserialize() {
        let submission: ReviewSubmission = serde_json::from_value(json!({
            "schemaIds": ["t1"],
            "tableChanges": {"t1": {"oldData": [{"id": 1}], "newData": []}},
            "versionId": "2024.1"
        }))
        .unwrap();
        assert_eq!(submission.schema_ids, vec!["t1"]);
        assert_eq!(submission.table_changes["t1"].old_data.len(), 1);
        assert!(submission.comment.is_none());
    }

    #[test]
    fn test_receipt_message() {
        let receipt = SubmitReceipt {
            request_id: "abc".to_string(),
            change_count: 3,
            tables: vec!["t1".to_string(), "t2".to_string()],
        };
        assert_eq!(
            receipt.message(),
            "Change request abc submitted with 3 change(s) across t1, t2"
        );
    }
}
