//! Table kind handlers
//!
//! A handler decides which store writes accompany a table's submission,
//! approval and rejection. Live tables apply the reviewed diffs directly;
//! staged kinds write their rows into a `pending_*` staging table at
//! submission and promote or discard them once a reviewer decides.

use std::collections::HashMap;
use std::sync::Arc;

use tollgate_persistence::{ApplyOp, ChangeDetailInfo, ChangeType, StagedOperation};

use crate::diff::ChangeRecord;

/// Financial program configuration table and its staging table
pub const FINANCIAL_PROGRAM_CONFIGS: &str = "financial_program_configs";
/// Bulletin pricing table and its staging table
pub const BULLETIN_PRICING: &str = "bulletin_pricing";
/// Advertised offers table and its staging table
pub const ADVERTISED_OFFERS: &str = "advertised_offers";

/// Strategy for the store writes of one kind of table
pub trait TableKindHandler: Send + Sync {
    /// Short name used in logs
    fn kind(&self) -> &str;

    /// Writes performed together with the submission
    fn submit_ops(&self, request_id: &str, table: &str, changes: &[ChangeRecord]) -> Vec<ApplyOp>;

    /// Writes performed when the pending details of the table are approved
    fn approve_ops(
        &self,
        request_id: &str,
        table: &str,
        details: &[ChangeDetailInfo],
    ) -> Vec<ApplyOp>;

    /// Writes performed when the pending details of the table are rejected
    fn reject_ops(
        &self,
        request_id: &str,
        table: &str,
        details: &[ChangeDetailInfo],
    ) -> Vec<ApplyOp>;
}

/// Tables edited in place: approval applies each diff to the live records
#[derive(Clone, Debug, Default)]
pub struct LiveTableHandler;

impl TableKindHandler for LiveTableHandler {
    fn kind(&self) -> &str {
        "live"
    }

    fn submit_ops(
        &self,
        _request_id: &str,
        _table: &str,
        _changes: &[ChangeRecord],
    ) -> Vec<ApplyOp> {
        Vec::new()
    }

    fn approve_ops(
        &self,
        _request_id: &str,
        table: &str,
        details: &[ChangeDetailInfo],
    ) -> Vec<ApplyOp> {
        details
            .iter()
            .filter_map(|detail| match (detail.change_type()?, &detail.new_value) {
                (ChangeType::Added | ChangeType::Modified, Some(payload)) => {
                    Some(ApplyOp::UpsertRecord {
                        schema_id: table.to_string(),
                        record_key: detail.record_key(),
                        payload: payload.clone(),
                    })
                }
                (ChangeType::Deleted, _) => Some(ApplyOp::DeleteRecord {
                    schema_id: table.to_string(),
                    record_key: detail.record_key(),
                }),
                _ => None,
            })
            .collect()
    }

    fn reject_ops(
        &self,
        _request_id: &str,
        _table: &str,
        _details: &[ChangeDetailInfo],
    ) -> Vec<ApplyOp> {
        Vec::new()
    }
}

/// Tables whose edits wait in a staging table until a reviewer decides
#[derive(Clone, Debug)]
pub struct StagedTableHandler {
    kind: String,
    staging_table: String,
}

impl StagedTableHandler {
    pub fn new(kind: impl Into<String>, staging_table: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            staging_table: staging_table.into(),
        }
    }

    pub fn financial_program_configs() -> Self {
        Self::new(
            FINANCIAL_PROGRAM_CONFIGS,
            format!("pending_{}", FINANCIAL_PROGRAM_CONFIGS),
        )
    }

    pub fn bulletin_pricing() -> Self {
        Self::new(BULLETIN_PRICING, format!("pending_{}", BULLETIN_PRICING))
    }

    pub fn advertised_offers() -> Self {
        Self::new(ADVERTISED_OFFERS, format!("pending_{}", ADVERTISED_OFFERS))
    }

    pub fn staging_table(&self) -> &str {
        &self.staging_table
    }
}

impl TableKindHandler for StagedTableHandler {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn submit_ops(
        &self,
        request_id: &str,
        _table: &str,
        changes: &[ChangeRecord],
    ) -> Vec<ApplyOp> {
        changes
            .iter()
            .map(|change| {
                let (operation, payload) = match change.change_type {
                    ChangeType::Added | ChangeType::Modified => {
                        (StagedOperation::Upsert, change.new_value.clone())
                    }
                    ChangeType::Deleted => (StagedOperation::Delete, None),
                };
                ApplyOp::StageRecord {
                    staging_table: self.staging_table.clone(),
                    request_id: request_id.to_string(),
                    record_key: change.key.clone(),
                    operation,
                    payload,
                }
            })
            .collect()
    }

    fn approve_ops(
        &self,
        request_id: &str,
        table: &str,
        _details: &[ChangeDetailInfo],
    ) -> Vec<ApplyOp> {
        vec![ApplyOp::PromoteStaged {
            staging_table: self.staging_table.clone(),
            live_table: table.to_string(),
            request_id: request_id.to_string(),
        }]
    }

    fn reject_ops(
        &self,
        request_id: &str,
        _table: &str,
        _details: &[ChangeDetailInfo],
    ) -> Vec<ApplyOp> {
        vec![ApplyOp::DiscardStaged {
            staging_table: self.staging_table.clone(),
            request_id: request_id.to_string(),
        }]
    }
}

/// Handlers keyed by schema id, with a fallback for unregistered tables
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn TableKindHandler>>,
    fallback: Arc<dyn TableKindHandler>,
}

impl HandlerRegistry {
    /// Registry where every table is a live table
    pub fn live_only() -> Self {
        Self {
            handlers: HashMap::new(),
            fallback: Arc::new(LiveTableHandler),
        }
    }

    pub fn register(&mut self, schema_id: impl Into<String>, handler: Arc<dyn TableKindHandler>) {
        self.handlers.insert(schema_id.into(), handler);
    }

    pub fn with(mut self, schema_id: impl Into<String>, handler: Arc<dyn TableKindHandler>) -> Self {
        self.register(schema_id, handler);
        self
    }

    pub fn handler_for(&self, schema_id: &str) -> &dyn TableKindHandler {
        self.handlers
            .get(schema_id)
            .map(|handler| handler.as_ref())
            .unwrap_or(self.fallback.as_ref())
    }
}

impl Default for HandlerRegistry {
    /// Live tables plus the three staged kinds
    fn default() -> Self {
        Self::live_only()
            .with(
                FINANCIAL_PROGRAM_CONFIGS,
                Arc::new(StagedTableHandler::financial_program_configs()),
            )
            .with(BULLETIN_PRICING, Arc::new(StagedTableHandler::bulletin_pricing()))
            .with(ADVERTISED_OFFERS, Arc::new(StagedTableHandler::advertised_offers()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tollgate_persistence::DetailStatus;

    use crate::diff::diff;

    fn detail(
        key: i64,
        old_value: Option<serde_json::Value>,
        new_value: Option<serde_json::Value>,
    ) -> ChangeDetailInfo {
        ChangeDetailInfo {
            id: key,
            request_id: "r1".to_string(),
            table: "dealers".to_string(),
            rule_key: json!(key),
            old_value,
            new_value,
            status: DetailStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            comment: None,
        }
    }

    #[test]
    fn test_live_handler_applies_diffs() {
        let details = vec![
            detail(1, None, Some(json!({"id": 1}))),
            detail(2, Some(json!({"id": 2})), Some(json!({"id": 2, "v": 1}))),
            detail(3, Some(json!({"id": 3})), None),
        ];
        let handler = LiveTableHandler;
        assert!(handler.submit_ops("r1", "dealers", &[]).is_empty());
        assert!(handler.reject_ops("r1", "dealers", &details).is_empty());

        let ops = handler.approve_ops("r1", "dealers", &details);
        assert_eq!(
            ops,
            vec![
                ApplyOp::UpsertRecord {
                    schema_id: "dealers".to_string(),
                    record_key: "1".to_string(),
                    payload: json!({"id": 1}),
                },
                ApplyOp::UpsertRecord {
                    schema_id: "dealers".to_string(),
                    record_key: "2".to_string(),
                    payload: json!({"id": 2, "v": 1}),
                },
                ApplyOp::DeleteRecord {
                    schema_id: "dealers".to_string(),
                    record_key: "3".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_staged_handler_plans() {
        let handler = StagedTableHandler::bulletin_pricing();
        assert_eq!(handler.staging_table(), "pending_bulletin_pricing");

        let changes = diff(
            &[json!({"pricing_rule_id": 7, "rate": 1})],
            &[json!({"pricing_rule_id": 8, "rate": 2})],
            Some("pricing_rule_id"),
        );
        let ops = handler.submit_ops("r1", BULLETIN_PRICING, &changes);
        assert_eq!(ops.len(), 2);
        assert!(matches!(
            &ops[0],
            ApplyOp::StageRecord { operation: StagedOperation::Upsert, record_key, payload: Some(_), .. }
                if record_key == "8"
        ));
        assert!(matches!(
            &ops[1],
            ApplyOp::StageRecord { operation: StagedOperation::Delete, record_key, payload: None, .. }
                if record_key == "7"
        ));

        assert_eq!(
            handler.approve_ops("r1", BULLETIN_PRICING, &[]),
            vec![ApplyOp::PromoteStaged {
                staging_table: "pending_bulletin_pricing".to_string(),
                live_table: BULLETIN_PRICING.to_string(),
                request_id: "r1".to_string(),
            }]
        );
        assert_eq!(
            handler.reject_ops("r1", BULLETIN_PRICING, &[]),
            vec![ApplyOp::DiscardStaged {
                staging_table: "pending_bulletin_pricing".to_string(),
                request_id: "r1".to_string(),
            }]
        );
    }

    #[test]
    fn test_registry_lookup() {
        let registry = HandlerRegistry::default();
        assert_eq!(registry.handler_for(ADVERTISED_OFFERS).kind(), ADVERTISED_OFFERS);
        assert_eq!(
            registry.handler_for(FINANCIAL_PROGRAM_CONFIGS).kind(),
            FINANCIAL_PROGRAM_CONFIGS
        );
        assert_eq!(registry.handler_for("dealers").kind(), "live");

        let registry = HandlerRegistry::live_only()
            .with("dealers", Arc::new(StagedTableHandler::new("dealer", "pending_dealers")));
        assert_eq!(registry.handler_for("dealers").kind(), "dealer");
    }
}
