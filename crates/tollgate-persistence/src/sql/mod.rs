//! SQL-based persistence backend (MySQL/PostgreSQL via SeaORM)
//!
//! Every multi-row write of the review workflow runs inside one database
//! transaction. The unique index on `table_lock.schema_id` settles lock races
//! between concurrent submissions.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_orm::{prelude::Expr, sea_query::Asterisk, *};
use tokio::sync::broadcast;

use tollgate_common::TollgateError;

use crate::entity::{change_detail, change_request, live_record, staged_record, table_lock};
use crate::model::*;
use crate::traits::*;

/// Capacity of the change notification channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// External database persistence service
///
/// Wraps a SeaORM `DatabaseConnection`. Change notifications cover writes made
/// through this instance only.
pub struct ExternalDbPersistService {
    db: DatabaseConnection,
    events: broadcast::Sender<StoreEvent>,
}

impl ExternalDbPersistService {
    /// Create a new ExternalDbPersistService with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { db, events }
    }

    /// Get a reference to the underlying database connection
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Schema ids among `schema_ids` that currently hold a lock. Falls back to
    /// all of them when the conflicting lock is already gone.
    async fn held_schema_ids(&self, schema_ids: &[String]) -> anyhow::Result<Vec<String>> {
        let held: Vec<String> = table_lock::Entity::find()
            .filter(table_lock::Column::SchemaId.is_in(schema_ids.to_vec()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|lock| lock.schema_id)
            .collect();
        if held.is_empty() {
            return Ok(schema_ids.to_vec());
        }
        Ok(held)
    }

    fn publish(&self, events: Vec<StoreEvent>) {
        for event in events {
            let _ = self.events.send(event);
        }
    }
}

#[inline]
fn to_millis(value: NaiveDateTime) -> i64 {
    value.and_utc().timestamp_millis()
}

#[inline]
fn from_millis(value: i64) -> NaiveDateTime {
    chrono::DateTime::from_timestamp_millis(value)
        .map(|dt| dt.naive_utc())
        .unwrap_or_default()
}

fn request_entity_to_info(model: change_request::Model) -> anyhow::Result<ChangeRequestInfo> {
    Ok(ChangeRequestInfo {
        status: model.status.parse().map_err(anyhow::Error::msg)?,
        id: model.id,
        created_by: model.created_by,
        created_at: to_millis(model.created_at),
        version_id: model.version_id,
        comment: model.comment,
        submitted_at: to_millis(model.submitted_at),
        reviewed_by: model.reviewed_by,
        reviewed_at: model.reviewed_at.map(to_millis),
        deployment_version_id: model.deployment_version_id,
    })
}

fn detail_entity_to_info(model: change_detail::Model) -> anyhow::Result<ChangeDetailInfo> {
    Ok(ChangeDetailInfo {
        status: model.status.parse().map_err(anyhow::Error::msg)?,
        id: model.id,
        request_id: model.request_id,
        table: model.table_name,
        rule_key: model.rule_key,
        old_value: model.old_value,
        new_value: model.new_value,
        reviewed_by: model.reviewed_by,
        reviewed_at: model.reviewed_at.map(to_millis),
        comment: model.comment,
    })
}

fn lock_entity_to_info(model: table_lock::Model) -> TableLockInfo {
    TableLockInfo {
        schema_id: model.schema_id,
        locked_by: model.locked_by,
        request_id: model.request_id,
        locked_at: to_millis(model.locked_at),
        expires_at: model.expires_at.map(to_millis),
    }
}

fn record_entity_to_info(model: live_record::Model) -> LiveRecordInfo {
    LiveRecordInfo {
        schema_id: model.schema_id,
        record_key: model.record_key,
        payload: model.payload,
        updated_at: to_millis(model.updated_at),
    }
}

fn staged_entity_to_info(model: staged_record::Model) -> anyhow::Result<StagedRecordInfo> {
    Ok(StagedRecordInfo {
        operation: model.operation.parse().map_err(anyhow::Error::msg)?,
        staging_table: model.staging_table,
        request_id: model.request_id,
        record_key: model.record_key,
        payload: model.payload,
        created_at: to_millis(model.created_at),
    })
}

/// Insert or replace a live record inside the transaction
async fn upsert_live(
    tx: &DatabaseTransaction,
    schema_id: &str,
    record_key: &str,
    payload: serde_json::Value,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    let existing = live_record::Entity::find()
        .filter(live_record::Column::SchemaId.eq(schema_id))
        .filter(live_record::Column::RecordKey.eq(record_key))
        .one(tx)
        .await?;

    match existing {
        Some(entity) => {
            let mut active: live_record::ActiveModel = entity.into();
            active.payload = Set(payload);
            active.updated_at = Set(now);
            active.update(tx).await?;
        }
        None => {
            let entity = live_record::ActiveModel {
                schema_id: Set(schema_id.to_string()),
                record_key: Set(record_key.to_string()),
                payload: Set(payload),
                updated_at: Set(now),
                ..Default::default()
            };
            live_record::Entity::insert(entity).exec(tx).await?;
        }
    }
    Ok(())
}

async fn delete_live(
    tx: &DatabaseTransaction,
    schema_id: &str,
    record_key: &str,
) -> anyhow::Result<()> {
    live_record::Entity::delete_many()
        .filter(live_record::Column::SchemaId.eq(schema_id))
        .filter(live_record::Column::RecordKey.eq(record_key))
        .exec(tx)
        .await?;
    Ok(())
}

/// Execute one apply op inside the transaction, returning the live schema it
/// touched
async fn apply_op(
    tx: &DatabaseTransaction,
    op: &ApplyOp,
    now: NaiveDateTime,
) -> anyhow::Result<Option<String>> {
    match op {
        ApplyOp::UpsertRecord {
            schema_id,
            record_key,
            payload,
        } => {
            upsert_live(tx, schema_id, record_key, payload.clone(), now).await?;
        }
        ApplyOp::DeleteRecord {
            schema_id,
            record_key,
        } => {
            delete_live(tx, schema_id, record_key).await?;
        }
        ApplyOp::StageRecord {
            staging_table,
            request_id,
            record_key,
            operation,
            payload,
        } => {
            if *operation == StagedOperation::Upsert && payload.is_none() {
                anyhow::bail!(
                    "Staged upsert of '{}' in '{}' has no payload",
                    record_key,
                    staging_table
                );
            }
            let entity = staged_record::ActiveModel {
                staging_table: Set(staging_table.clone()),
                request_id: Set(request_id.clone()),
                record_key: Set(record_key.clone()),
                operation: Set(operation.as_str().to_string()),
                payload: Set(payload.clone()),
                created_at: Set(now),
                ..Default::default()
            };
            staged_record::Entity::insert(entity).exec(tx).await?;
        }
        ApplyOp::PromoteStaged {
            staging_table,
            live_table,
            request_id,
        } => {
            let rows = staged_record::Entity::find()
                .filter(staged_record::Column::StagingTable.eq(staging_table.as_str()))
                .filter(staged_record::Column::RequestId.eq(request_id.as_str()))
                .order_by_asc(staged_record::Column::Id)
                .all(tx)
                .await?;

            for row in rows {
                match (
                    row.operation
                        .parse::<StagedOperation>()
                        .map_err(anyhow::Error::msg)?,
                    row.payload,
                ) {
                    (StagedOperation::Upsert, Some(payload)) => {
                        upsert_live(tx, live_table, &row.record_key, payload, now).await?;
                    }
                    (StagedOperation::Upsert, None) => {
                        anyhow::bail!(
                            "Staged upsert of '{}' in '{}' has no payload",
                            row.record_key,
                            staging_table
                        );
                    }
                    (StagedOperation::Delete, _) => {
                        delete_live(tx, live_table, &row.record_key).await?;
                    }
                }
            }

            staged_record::Entity::delete_many()
                .filter(staged_record::Column::StagingTable.eq(staging_table.as_str()))
                .filter(staged_record::Column::RequestId.eq(request_id.as_str()))
                .exec(tx)
                .await?;
        }
        ApplyOp::DiscardStaged {
            staging_table,
            request_id,
        } => {
            staged_record::Entity::delete_many()
                .filter(staged_record::Column::StagingTable.eq(staging_table.as_str()))
                .filter(staged_record::Column::RequestId.eq(request_id.as_str()))
                .exec(tx)
                .await?;
        }
    }
    Ok(op.live_schema().map(str::to_string))
}

// ============================================================================
// PersistenceService implementation
// ============================================================================

#[async_trait]
impl PersistenceService for ExternalDbPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::ExternalDb
    }

    fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        self.db.ping().await?;
        Ok(())
    }
}

// ============================================================================
// ChangeRequestPersistence implementation
// ============================================================================

#[async_trait]
impl ChangeRequestPersistence for ExternalDbPersistService {
    async fn request_create(
        &self,
        request: NewChangeRequest,
        details: Vec<NewChangeDetail>,
        locks: Vec<NewTableLock>,
        ops: Vec<ApplyOp>,
        now_ms: i64,
    ) -> anyhow::Result<ChangeRequestInfo> {
        let now = from_millis(now_ms);
        let schema_ids: Vec<String> = locks.iter().map(|l| l.schema_id.clone()).collect();

        let tx = self.db.begin().await?;

        // Expired locks no longer block anybody
        let purged = table_lock::Entity::delete_many()
            .filter(table_lock::Column::ExpiresAt.is_not_null())
            .filter(table_lock::Column::ExpiresAt.lte(now))
            .exec(&tx)
            .await?;
        if purged.rows_affected > 0 {
            tracing::info!(count = purged.rows_affected, "Purged expired table locks");
        }

        if !schema_ids.is_empty() {
            let held = table_lock::Entity::find()
                .filter(table_lock::Column::SchemaId.is_in(schema_ids.clone()))
                .all(&tx)
                .await?;
            if !held.is_empty() {
                return Err(
                    TollgateError::TableLocked(held.into_iter().map(|l| l.schema_id).collect())
                        .into(),
                );
            }
        }

        let entity = change_request::ActiveModel {
            id: Set(request.id.clone()),
            created_by: Set(request.created_by.clone()),
            created_at: Set(now),
            status: Set(RequestStatus::InReview.as_str().to_string()),
            version_id: Set(request.version_id.clone()),
            comment: Set(request.comment.clone()),
            submitted_at: Set(now),
            reviewed_by: Set(None),
            reviewed_at: Set(None),
            deployment_version_id: Set(None),
        };
        change_request::Entity::insert(entity)
            .exec_without_returning(&tx)
            .await?;

        if !details.is_empty() {
            let mut detail_entities = Vec::with_capacity(details.len());
            for detail in details {
                if detail.old_value.is_none() && detail.new_value.is_none() {
                    anyhow::bail!(
                        "Change detail for '{}' in '{}' has neither old nor new value",
                        detail.rule_key,
                        detail.table
                    );
                }
                detail_entities.push(change_detail::ActiveModel {
                    request_id: Set(request.id.clone()),
                    table_name: Set(detail.table),
                    rule_key: Set(detail.rule_key),
                    old_value: Set(detail.old_value),
                    new_value: Set(detail.new_value),
                    status: Set(DetailStatus::Pending.as_str().to_string()),
                    reviewed_by: Set(None),
                    reviewed_at: Set(None),
                    comment: Set(None),
                    ..Default::default()
                });
            }
            change_detail::Entity::insert_many(detail_entities)
                .exec(&tx)
                .await?;
        }

        if !locks.is_empty() {
            let lock_entities: Vec<table_lock::ActiveModel> = locks
                .into_iter()
                .map(|lock| table_lock::ActiveModel {
                    schema_id: Set(lock.schema_id),
                    locked_by: Set(lock.locked_by),
                    request_id: Set(request.id.clone()),
                    locked_at: Set(now),
                    expires_at: Set(lock.expires_at.map(from_millis)),
                    ..Default::default()
                })
                .collect();
            // A concurrent submission may have won the race after the check above
            if let Err(e) = table_lock::Entity::insert_many(lock_entities)
                .exec(&tx)
                .await
            {
                if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    tx.rollback().await?;
                    return Err(TollgateError::TableLocked(
                        self.held_schema_ids(&schema_ids).await?,
                    )
                    .into());
                }
                return Err(e.into());
            }
        }

        let mut touched = Vec::new();
        for op in &ops {
            if let Some(schema_id) = apply_op(&tx, op, now).await? {
                touched.push(schema_id);
            }
        }

        tx.commit().await?;

        let created = ChangeRequestInfo {
            id: request.id.clone(),
            created_by: request.created_by,
            created_at: now_ms,
            status: RequestStatus::InReview,
            version_id: request.version_id,
            comment: request.comment,
            submitted_at: now_ms,
            reviewed_by: None,
            reviewed_at: None,
            deployment_version_id: None,
        };

        let mut events = vec![
            StoreEvent::RequestChanged {
                request_id: request.id,
            },
            StoreEvent::LocksChanged { schema_ids },
        ];
        events.extend(
            touched
                .into_iter()
                .map(|schema_id| StoreEvent::RecordsChanged { schema_id }),
        );
        self.publish(events);

        Ok(created)
    }

    async fn request_find_by_id(&self, id: &str) -> anyhow::Result<Option<ChangeRequestInfo>> {
        change_request::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(request_entity_to_info)
            .transpose()
    }

    async fn request_search_page(
        &self,
        status: Option<RequestStatus>,
        created_by: Option<&str>,
        page_no: u64,
        page_size: u64,
    ) -> anyhow::Result<Page<ChangeRequestInfo>> {
        let mut select = change_request::Entity::find();
        if let Some(status) = status {
            select = select.filter(change_request::Column::Status.eq(status.as_str()));
        }
        if let Some(user) = created_by {
            select = select.filter(change_request::Column::CreatedBy.eq(user));
        }

        let count = select
            .clone()
            .select_only()
            .column_as(Expr::col(Asterisk).count(), "count")
            .into_tuple::<i64>()
            .one(&self.db)
            .await?
            .unwrap_or_default() as u64;

        if count == 0 {
            return Ok(Page::empty());
        }

        let offset = page_no.saturating_sub(1) * page_size;
        let items = select
            .order_by_desc(change_request::Column::SubmittedAt)
            .offset(offset)
            .limit(page_size)
            .all(&self.db)
            .await?
            .into_iter()
            .map(request_entity_to_info)
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Page::new(count, page_no, page_size, items))
    }

    async fn request_find_by_status(
        &self,
        status: RequestStatus,
    ) -> anyhow::Result<Vec<ChangeRequestInfo>> {
        change_request::Entity::find()
            .filter(change_request::Column::Status.eq(status.as_str()))
            .order_by_asc(change_request::Column::SubmittedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(request_entity_to_info)
            .collect()
    }

    async fn request_resolve(
        &self,
        id: &str,
        status: RequestStatus,
        reviewed_by: &str,
    ) -> anyhow::Result<ResolveOutcome> {
        if !status.is_terminal() {
            anyhow::bail!("Cannot resolve change request '{}' to {}", id, status);
        }
        let now = from_millis(now_millis());

        let tx = self.db.begin().await?;

        if change_request::Entity::find_by_id(id).one(&tx).await?.is_none() {
            return Err(TollgateError::not_found(format!("change request '{}'", id)).into());
        }

        // Conditional update so concurrent finalizers resolve the request once
        let result = change_request::Entity::update_many()
            .col_expr(change_request::Column::Status, Expr::value(status.as_str()))
            .col_expr(change_request::Column::ReviewedBy, Expr::value(reviewed_by))
            .col_expr(change_request::Column::ReviewedAt, Expr::value(now))
            .filter(change_request::Column::Id.eq(id))
            .filter(change_request::Column::Status.is_not_in([
                RequestStatus::Approved.as_str(),
                RequestStatus::Rejected.as_str(),
            ]))
            .exec(&tx)
            .await?;
        if result.rows_affected == 0 {
            return Ok(ResolveOutcome::default());
        }

        let released: Vec<String> = table_lock::Entity::find()
            .filter(table_lock::Column::RequestId.eq(id))
            .all(&tx)
            .await?
            .into_iter()
            .map(|l| l.schema_id)
            .collect();
        table_lock::Entity::delete_many()
            .filter(table_lock::Column::RequestId.eq(id))
            .exec(&tx)
            .await?;

        tx.commit().await?;

        let outcome = ResolveOutcome {
            resolved: true,
            released_locks: released.len() as u64,
        };
        self.publish(vec![
            StoreEvent::RequestChanged {
                request_id: id.to_string(),
            },
            StoreEvent::LocksChanged {
                schema_ids: released,
            },
        ]);
        Ok(outcome)
    }

    async fn request_set_deployment(
        &self,
        id: &str,
        deployment_version_id: &str,
    ) -> anyhow::Result<bool> {
        let result = change_request::Entity::update_many()
            .col_expr(
                change_request::Column::DeploymentVersionId,
                Expr::value(deployment_version_id),
            )
            .filter(change_request::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        let updated = result.rows_affected > 0;
        if updated {
            self.publish(vec![StoreEvent::RequestChanged {
                request_id: id.to_string(),
            }]);
        }
        Ok(updated)
    }
}

// ============================================================================
// ChangeDetailPersistence implementation
// ============================================================================

#[async_trait]
impl ChangeDetailPersistence for ExternalDbPersistService {
    async fn detail_find_by_request(
        &self,
        request_id: &str,
    ) -> anyhow::Result<Vec<ChangeDetailInfo>> {
        change_detail::Entity::find()
            .filter(change_detail::Column::RequestId.eq(request_id))
            .order_by_asc(change_detail::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(detail_entity_to_info)
            .collect()
    }

    async fn detail_review_table(
        &self,
        request_id: &str,
        table: &str,
        decision: ReviewDecision,
        ops: Vec<ApplyOp>,
    ) -> anyhow::Result<u64> {
        let now = from_millis(now_millis());

        let tx = self.db.begin().await?;

        // Only pending rows move, which makes a repeated decision a no-op
        let result = change_detail::Entity::update_many()
            .col_expr(
                change_detail::Column::Status,
                Expr::value(decision.status.as_str()),
            )
            .col_expr(
                change_detail::Column::ReviewedBy,
                Expr::value(decision.reviewed_by),
            )
            .col_expr(change_detail::Column::ReviewedAt, Expr::value(now))
            .col_expr(change_detail::Column::Comment, Expr::value(decision.comment))
            .filter(change_detail::Column::RequestId.eq(request_id))
            .filter(change_detail::Column::TableName.eq(table))
            .filter(change_detail::Column::Status.eq(DetailStatus::Pending.as_str()))
            .exec(&tx)
            .await?;
        if result.rows_affected == 0 {
            return Ok(0);
        }

        let mut touched = Vec::new();
        for op in &ops {
            if let Some(schema_id) = apply_op(&tx, op, now).await? {
                touched.push(schema_id);
            }
        }

        tx.commit().await?;

        let mut events = vec![StoreEvent::RequestChanged {
            request_id: request_id.to_string(),
        }];
        events.extend(
            touched
                .into_iter()
                .map(|schema_id| StoreEvent::RecordsChanged { schema_id }),
        );
        self.publish(events);

        Ok(result.rows_affected)
    }
}

// ============================================================================
// TableLockPersistence implementation
// ============================================================================

#[async_trait]
impl TableLockPersistence for ExternalDbPersistService {
    async fn lock_find_all(&self) -> anyhow::Result<Vec<TableLockInfo>> {
        Ok(table_lock::Entity::find()
            .order_by_asc(table_lock::Column::SchemaId)
            .all(&self.db)
            .await?
            .into_iter()
            .map(lock_entity_to_info)
            .collect())
    }

    async fn lock_find_by_schemas(
        &self,
        schema_ids: &[String],
    ) -> anyhow::Result<Vec<TableLockInfo>> {
        if schema_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(table_lock::Entity::find()
            .filter(table_lock::Column::SchemaId.is_in(schema_ids.iter().cloned()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(lock_entity_to_info)
            .collect())
    }

    async fn lock_find_by_request(&self, request_id: &str) -> anyhow::Result<Vec<TableLockInfo>> {
        Ok(table_lock::Entity::find()
            .filter(table_lock::Column::RequestId.eq(request_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(lock_entity_to_info)
            .collect())
    }

    async fn lock_release(&self, schema_id: &str) -> anyhow::Result<Option<TableLockInfo>> {
        let tx = self.db.begin().await?;

        let Some(lock) = table_lock::Entity::find()
            .filter(table_lock::Column::SchemaId.eq(schema_id))
            .one(&tx)
            .await?
        else {
            return Ok(None);
        };
        table_lock::Entity::delete_by_id(lock.id).exec(&tx).await?;

        tx.commit().await?;

        self.publish(vec![StoreEvent::LocksChanged {
            schema_ids: vec![schema_id.to_string()],
        }]);
        Ok(Some(lock_entity_to_info(lock)))
    }
}

// ============================================================================
// RecordPersistence implementation
// ============================================================================

#[async_trait]
impl RecordPersistence for ExternalDbPersistService {
    async fn record_find_all(&self, schema_id: &str) -> anyhow::Result<Vec<LiveRecordInfo>> {
        Ok(live_record::Entity::find()
            .filter(live_record::Column::SchemaId.eq(schema_id))
            .order_by_asc(live_record::Column::RecordKey)
            .all(&self.db)
            .await?
            .into_iter()
            .map(record_entity_to_info)
            .collect())
    }

    async fn staged_find_by_request(
        &self,
        staging_table: &str,
        request_id: &str,
    ) -> anyhow::Result<Vec<StagedRecordInfo>> {
        staged_record::Entity::find()
            .filter(staged_record::Column::StagingTable.eq(staging_table))
            .filter(staged_record::Column::RequestId.eq(request_id))
            .order_by_asc(staged_record::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(staged_entity_to_info)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_conversion_roundtrip() {
        let ms = 1_700_000_123_456;
        assert_eq!(to_millis(from_millis(ms)), ms);
    }

    #[test]
    fn test_request_entity_to_info_rejects_unknown_status() {
        let model = change_request::Model {
            id: "r1".to_string(),
            created_by: "alice".to_string(),
            created_at: from_millis(1_000),
            status: "SHIPPED".to_string(),
            version_id: "v1".to_string(),
            comment: None,
            submitted_at: from_millis(1_000),
            reviewed_by: None,
            reviewed_at: None,
            deployment_version_id: None,
        };
        assert!(request_entity_to_info(model).is_err());
    }

    #[test]
    fn test_staged_entity_to_info() {
        let model = staged_record::Model {
            id: 3,
            staging_table: "pending_offers".to_string(),
            request_id: "r1".to_string(),
            record_key: "7".to_string(),
            operation: "DELETE".to_string(),
            payload: None,
            created_at: from_millis(2_000),
        };
        let info = staged_entity_to_info(model).unwrap();
        assert_eq!(info.operation, StagedOperation::Delete);
        assert_eq!(info.created_at, 2_000);
    }

    fn lock_model(id: i64, schema_id: &str) -> table_lock::Model {
        table_lock::Model {
            id,
            schema_id: schema_id.to_string(),
            locked_by: "alice".to_string(),
            request_id: "r1".to_string(),
            locked_at: from_millis(1_000),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_held_schema_ids_names_only_locked_tables() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![lock_model(1, "t2")]])
            .into_connection();
        let service = ExternalDbPersistService::new(db);

        let submitted = vec!["t1".to_string(), "t2".to_string(), "t3".to_string()];
        let held = service.held_schema_ids(&submitted).await.unwrap();
        assert_eq!(held, vec!["t2"]);
    }

    #[tokio::test]
    async fn test_held_schema_ids_falls_back_when_lock_is_gone() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<table_lock::Model>::new()])
            .into_connection();
        let service = ExternalDbPersistService::new(db);

        let submitted = vec!["t1".to_string(), "t2".to_string()];
        let held = service.held_schema_ids(&submitted).await.unwrap();
        assert_eq!(held, submitted);
    }
}
