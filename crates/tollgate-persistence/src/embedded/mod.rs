// Embedded persistence backend held in process memory
// Provides standalone (single-node) storage without an external database

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use tollgate_common::TollgateError;

use crate::model::{
    ApplyOp, ChangeDetailInfo, ChangeRequestInfo, DetailStatus, LiveRecordInfo, NewChangeDetail,
    NewChangeRequest, NewTableLock, Page, RequestStatus, ResolveOutcome, ReviewDecision,
    StagedOperation, StagedRecordInfo, StorageMode, StoreEvent, TableLockInfo, now_millis,
};
use crate::traits::{
    ChangeDetailPersistence, ChangeRequestPersistence, PersistenceService, RecordPersistence,
    TableLockPersistence,
};

/// Capacity of the change notification channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone, Debug, Default)]
struct EmbeddedState {
    /// Requests in submission order
    requests: Vec<ChangeRequestInfo>,
    /// Details in creation order
    details: Vec<ChangeDetailInfo>,
    /// Locks keyed by schema id, which makes the key the uniqueness arbiter
    locks: BTreeMap<String, TableLockInfo>,
    /// Live tables: schema id -> record key -> record
    live: BTreeMap<String, BTreeMap<String, LiveRecordInfo>>,
    staged: Vec<StagedRecordInfo>,
    next_detail_id: i64,
}

impl EmbeddedState {
    fn request_mut(&mut self, id: &str) -> Option<&mut ChangeRequestInfo> {
        self.requests.iter_mut().find(|r| r.id == id)
    }

    /// Execute one apply op, returning the live schema it touched
    fn apply(&mut self, op: &ApplyOp, now_ms: i64) -> anyhow::Result<Option<String>> {
        match op {
            ApplyOp::UpsertRecord {
                schema_id,
                record_key,
                payload,
            } => {
                self.live.entry(schema_id.clone()).or_default().insert(
                    record_key.clone(),
                    LiveRecordInfo {
                        schema_id: schema_id.clone(),
                        record_key: record_key.clone(),
                        payload: payload.clone(),
                        updated_at: now_ms,
                    },
                );
            }
            ApplyOp::DeleteRecord {
                schema_id,
                record_key,
            } => {
                if let Some(table) = self.live.get_mut(schema_id) {
                    table.remove(record_key);
                }
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
                self.staged.push(StagedRecordInfo {
                    staging_table: staging_table.clone(),
                    request_id: request_id.clone(),
                    record_key: record_key.clone(),
                    operation: *operation,
                    payload: payload.clone(),
                    created_at: now_ms,
                });
            }
            ApplyOp::PromoteStaged {
                staging_table,
                live_table,
                request_id,
            } => {
                let (promoted, kept): (Vec<_>, Vec<_>) =
                    std::mem::take(&mut self.staged).into_iter().partition(|s| {
                        &s.staging_table == staging_table && &s.request_id == request_id
                    });
                self.staged = kept;
                let table = self.live.entry(live_table.clone()).or_default();
                for row in promoted {
                    match (row.operation, row.payload) {
                        (StagedOperation::Upsert, Some(payload)) => {
                            table.insert(
                                row.record_key.clone(),
                                LiveRecordInfo {
                                    schema_id: live_table.clone(),
                                    record_key: row.record_key,
                                    payload,
                                    updated_at: now_ms,
                                },
                            );
                        }
                        (StagedOperation::Upsert, None) => {
                            anyhow::bail!(
                                "Staged upsert of '{}' in '{}' has no payload",
                                row.record_key,
                                staging_table
                            );
                        }
                        (StagedOperation::Delete, _) => {
                            table.remove(&row.record_key);
                        }
                    }
                }
            }
            ApplyOp::DiscardStaged {
                staging_table,
                request_id,
            } => {
                self.staged.retain(|s| {
                    !(&s.staging_table == staging_table && &s.request_id == request_id)
                });
            }
        }
        Ok(op.live_schema().map(str::to_string))
    }
}

/// Standalone embedded persistence kept in process memory
///
/// Every write runs against a copy of the state that replaces the live state
/// only when the whole unit of work succeeded, so a failing write leaves
/// nothing behind. Suitable for single-node deployments and tests.
pub struct EmbeddedPersistService {
    state: RwLock<EmbeddedState>,
    events: broadcast::Sender<StoreEvent>,
}

impl EmbeddedPersistService {
    /// Create an empty store
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(EmbeddedState::default()),
            events,
        }
    }

    /// Seed a live table, replacing any record with the same key
    pub fn seed_records(&self, schema_id: &str, records: Vec<(String, serde_json::Value)>) {
        let now = now_millis();
        let mut state = self.state.write();
        let table = state.live.entry(schema_id.to_string()).or_default();
        for (record_key, payload) in records {
            table.insert(
                record_key.clone(),
                LiveRecordInfo {
                    schema_id: schema_id.to_string(),
                    record_key,
                    payload,
                    updated_at: now,
                },
            );
        }
        drop(state);
        self.publish(vec![StoreEvent::RecordsChanged {
            schema_id: schema_id.to_string(),
        }]);
    }

    /// Run a unit of work against a copy of the state and commit it on success
    fn write<T>(
        &self,
        f: impl FnOnce(&mut EmbeddedState) -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        let mut guard = self.state.write();
        let mut next = guard.clone();
        let result = f(&mut next)?;
        *guard = next;
        Ok(result)
    }

    fn publish(&self, events: Vec<StoreEvent>) {
        for event in events {
            // no subscribers is fine
            let _ = self.events.send(event);
        }
    }
}

impl Default for EmbeddedPersistService {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// PersistenceService implementation
// ============================================================================

#[async_trait]
impl PersistenceService for EmbeddedPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::Embedded
    }

    fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

// ============================================================================
// ChangeRequestPersistence implementation
// ============================================================================

#[async_trait]
impl ChangeRequestPersistence for EmbeddedPersistService {
    async fn request_create(
        &self,
        request: NewChangeRequest,
        details: Vec<NewChangeDetail>,
        locks: Vec<NewTableLock>,
        ops: Vec<ApplyOp>,
        now_ms: i64,
    ) -> anyhow::Result<ChangeRequestInfo> {
        let request_id = request.id.clone();
        let schema_ids: Vec<String> = locks.iter().map(|l| l.schema_id.clone()).collect();

        let (created, touched) = self.write(|state| {
            state.locks.retain(|_, lock| !lock.is_expired_at(now_ms));

            let conflicts: Vec<String> = schema_ids
                .iter()
                .filter(|schema_id| state.locks.contains_key(*schema_id))
                .cloned()
                .collect();
            if !conflicts.is_empty() {
                return Err(TollgateError::TableLocked(conflicts).into());
            }
            if state.requests.iter().any(|r| r.id == request.id) {
                anyhow::bail!("Change request '{}' already exists", request.id);
            }

            let created = ChangeRequestInfo {
                id: request.id.clone(),
                created_by: request.created_by.clone(),
                created_at: now_ms,
                status: RequestStatus::InReview,
                version_id: request.version_id,
                comment: request.comment,
                submitted_at: now_ms,
                reviewed_by: None,
                reviewed_at: None,
                deployment_version_id: None,
            };
            state.requests.push(created.clone());

            for detail in details {
                if detail.old_value.is_none() && detail.new_value.is_none() {
                    anyhow::bail!(
                        "Change detail for '{}' in '{}' has neither old nor new value",
                        detail.rule_key,
                        detail.table
                    );
                }
                state.next_detail_id += 1;
                state.details.push(ChangeDetailInfo {
                    id: state.next_detail_id,
                    request_id: request.id.clone(),
                    table: detail.table,
                    rule_key: detail.rule_key,
                    old_value: detail.old_value,
                    new_value: detail.new_value,
                    status: DetailStatus::Pending,
                    reviewed_by: None,
                    reviewed_at: None,
                    comment: None,
                });
            }

            for lock in locks {
                state.locks.insert(
                    lock.schema_id.clone(),
                    TableLockInfo {
                        schema_id: lock.schema_id,
                        locked_by: lock.locked_by,
                        request_id: request.id.clone(),
                        locked_at: now_ms,
                        expires_at: lock.expires_at,
                    },
                );
            }

            let mut touched = Vec::new();
            for op in &ops {
                if let Some(schema_id) = state.apply(op, now_ms)? {
                    touched.push(schema_id);
                }
            }
            Ok((created, touched))
        })?;

        tracing::debug!(
            request_id = %request_id,
            locks = schema_ids.len(),
            "Change request stored"
        );

        let mut events = vec![
            StoreEvent::RequestChanged { request_id },
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
        Ok(self
            .state
            .read()
            .requests
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn request_search_page(
        &self,
        status: Option<RequestStatus>,
        created_by: Option<&str>,
        page_no: u64,
        page_size: u64,
    ) -> anyhow::Result<Page<ChangeRequestInfo>> {
        let state = self.state.read();
        let matched: Vec<&ChangeRequestInfo> = state
            .requests
            .iter()
            .rev()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .filter(|r| created_by.is_none_or(|u| r.created_by == u))
            .collect();

        let total_count = matched.len() as u64;
        if total_count == 0 {
            return Ok(Page::empty());
        }
        let offset = page_no.saturating_sub(1) * page_size;
        let page_items = matched
            .into_iter()
            .skip(offset as usize)
            .take(page_size as usize)
            .cloned()
            .collect();
        Ok(Page::new(total_count, page_no, page_size, page_items))
    }

    async fn request_find_by_status(
        &self,
        status: RequestStatus,
    ) -> anyhow::Result<Vec<ChangeRequestInfo>> {
        Ok(self
            .state
            .read()
            .requests
            .iter()
            .filter(|r| r.status == status)
            .cloned()
            .collect())
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
        let now = now_millis();

        let (outcome, released) = self.write(|state| {
            let request = state
                .request_mut(id)
                .ok_or_else(|| TollgateError::not_found(format!("change request '{}'", id)))?;
            if request.status.is_terminal() {
                return Ok((ResolveOutcome::default(), Vec::new()));
            }
            request.status = status;
            request.reviewed_by = Some(reviewed_by.to_string());
            request.reviewed_at = Some(now);

            let released: Vec<String> = state
                .locks
                .values()
                .filter(|lock| lock.request_id == id)
                .map(|lock| lock.schema_id.clone())
                .collect();
            for schema_id in &released {
                state.locks.remove(schema_id);
            }
            Ok((
                ResolveOutcome {
                    resolved: true,
                    released_locks: released.len() as u64,
                },
                released,
            ))
        })?;

        if outcome.resolved {
            self.publish(vec![
                StoreEvent::RequestChanged {
                    request_id: id.to_string(),
                },
                StoreEvent::LocksChanged {
                    schema_ids: released,
                },
            ]);
        }
        Ok(outcome)
    }

    async fn request_set_deployment(
        &self,
        id: &str,
        deployment_version_id: &str,
    ) -> anyhow::Result<bool> {
        let updated = self.write(|state| {
            Ok(match state.request_mut(id) {
                Some(request) => {
                    request.deployment_version_id = Some(deployment_version_id.to_string());
                    true
                }
                None => false,
            })
        })?;
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
impl ChangeDetailPersistence for EmbeddedPersistService {
    async fn detail_find_by_request(
        &self,
        request_id: &str,
    ) -> anyhow::Result<Vec<ChangeDetailInfo>> {
        Ok(self
            .state
            .read()
            .details
            .iter()
            .filter(|d| d.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn detail_review_table(
        &self,
        request_id: &str,
        table: &str,
        decision: ReviewDecision,
        ops: Vec<ApplyOp>,
    ) -> anyhow::Result<u64> {
        let now = now_millis();

        let (updated, touched) = self.write(|state| {
            let mut updated = 0u64;
            for detail in state.details.iter_mut().filter(|d| {
                d.request_id == request_id && d.table == table && d.status == DetailStatus::Pending
            }) {
                detail.status = decision.status;
                detail.reviewed_by = Some(decision.reviewed_by.clone());
                detail.reviewed_at = Some(now);
                detail.comment = decision.comment.clone();
                updated += 1;
            }
            if updated == 0 {
                return Ok((0, Vec::new()));
            }

            let mut touched = Vec::new();
            for op in &ops {
                if let Some(schema_id) = state.apply(op, now)? {
                    touched.push(schema_id);
                }
            }
            Ok((updated, touched))
        })?;

        if updated > 0 {
            let mut events = vec![StoreEvent::RequestChanged {
                request_id: request_id.to_string(),
            }];
            events.extend(
                touched
                    .into_iter()
                    .map(|schema_id| StoreEvent::RecordsChanged { schema_id }),
            );
            self.publish(events);
        }
        Ok(updated)
    }
}

// ============================================================================
// TableLockPersistence implementation
// ============================================================================

#[async_trait]
impl TableLockPersistence for EmbeddedPersistService {
    async fn lock_find_all(&self) -> anyhow::Result<Vec<TableLockInfo>> {
        Ok(self.state.read().locks.values().cloned().collect())
    }

    async fn lock_find_by_schemas(
        &self,
        schema_ids: &[String],
    ) -> anyhow::Result<Vec<TableLockInfo>> {
        let state = self.state.read();
        Ok(schema_ids
            .iter()
            .filter_map(|schema_id| state.locks.get(schema_id).cloned())
            .collect())
    }

    async fn lock_find_by_request(&self, request_id: &str) -> anyhow::Result<Vec<TableLockInfo>> {
        Ok(self
            .state
            .read()
            .locks
            .values()
            .filter(|lock| lock.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn lock_release(&self, schema_id: &str) -> anyhow::Result<Option<TableLockInfo>> {
        let released = self.write(|state| Ok(state.locks.remove(schema_id)))?;
        if released.is_some() {
            self.publish(vec![StoreEvent::LocksChanged {
                schema_ids: vec![schema_id.to_string()],
            }]);
        }
        Ok(released)
    }
}

// ============================================================================
// RecordPersistence implementation
// ============================================================================

#[async_trait]
impl RecordPersistence for EmbeddedPersistService {
    async fn record_find_all(&self, schema_id: &str) -> anyhow::Result<Vec<LiveRecordInfo>> {
        Ok(self
            .state
            .read()
            .live
            .get(schema_id)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn staged_find_by_request(
        &self,
        staging_table: &str,
        request_id: &str,
    ) -> anyhow::Result<Vec<StagedRecordInfo>> {
        Ok(self
            .state
            .read()
            .staged
            .iter()
            .filter(|s| s.staging_table == staging_table && s.request_id == request_id)
            .cloned()
            .collect())
    }
}
