//! Review cache
//!
//! In-memory view of open change requests, their details and the active
//! table locks. The view is loaded with [`ReviewCache::force_refresh`] and
//! kept current by a sync task that consumes the store's change
//! notifications; consumers follow updates through [`ReviewCache::subscribe`].

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;

use tollgate_persistence::{
    ChangeDetailInfo, ChangeRequestInfo, PersistenceService, RequestStatus, StoreEvent,
    TableLockInfo, now_millis,
};

use crate::model::{ChangeRequestSummary, summarize_tables};

/// Capacity of the cache change channel
const CACHE_EVENT_CAPACITY: usize = 256;

/// Change published after the cache view was updated
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheEvent {
    /// The whole view was reloaded
    Refreshed,
    RequestUpdated { request_id: String },
    LocksUpdated { schema_ids: Vec<String> },
    RecordsUpdated { schema_id: String },
}

/// Counts reported by a full refresh
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStats {
    pub requests: usize,
    pub locks: usize,
}

pub struct ReviewCache {
    persistence: Arc<dyn PersistenceService>,
    /// Open requests keyed by id
    requests: DashMap<String, ChangeRequestInfo>,
    /// Details of open requests keyed by request id
    details: DashMap<String, Vec<ChangeDetailInfo>>,
    /// Active locks keyed by schema id
    locks: DashMap<String, TableLockInfo>,
    changes: broadcast::Sender<CacheEvent>,
    /// Serializes refreshes and event application so an older snapshot never
    /// overwrites a newer event
    update_lock: Mutex<()>,
}

impl ReviewCache {
    pub fn new(persistence: Arc<dyn PersistenceService>) -> Self {
        let (changes, _) = broadcast::channel(CACHE_EVENT_CAPACITY);
        Self {
            persistence,
            requests: DashMap::new(),
            details: DashMap::new(),
            locks: DashMap::new(),
            changes,
            update_lock: Mutex::new(()),
        }
    }

    /// Receive a [`CacheEvent`] after every update of the view
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.changes.subscribe()
    }

    /// Reload open requests, their details, and all locks from the store
    pub async fn force_refresh(&self) -> anyhow::Result<RefreshStats> {
        let _guard = self.update_lock.lock().await;

        let mut open = self
            .persistence
            .request_find_by_status(RequestStatus::InReview)
            .await?;
        open.extend(
            self.persistence
                .request_find_by_status(RequestStatus::Pending)
                .await?,
        );

        let mut loaded = Vec::with_capacity(open.len());
        for request in open {
            let details = self.persistence.detail_find_by_request(&request.id).await?;
            loaded.push((request, details));
        }
        let locks = self.persistence.lock_find_all().await?;

        // Replace entries in place; readers never see an empty view
        self.requests
            .retain(|id, _| loaded.iter().any(|(request, _)| &request.id == id));
        self.details
            .retain(|id, _| loaded.iter().any(|(request, _)| &request.id == id));
        self.locks
            .retain(|schema_id, _| locks.iter().any(|lock| &lock.schema_id == schema_id));
        for (request, details) in loaded {
            self.details.insert(request.id.clone(), details);
            self.requests.insert(request.id.clone(), request);
        }
        for lock in locks {
            self.locks.insert(lock.schema_id.clone(), lock);
        }

        let stats = RefreshStats {
            requests: self.requests.len(),
            locks: self.locks.len(),
        };
        tracing::info!(
            requests = stats.requests,
            locks = stats.locks,
            "Review cache refreshed"
        );
        let _ = self.changes.send(CacheEvent::Refreshed);
        Ok(stats)
    }

    /// Apply one store notification to the view
    pub async fn apply_event(&self, event: StoreEvent) -> anyhow::Result<()> {
        let _guard = self.update_lock.lock().await;

        let cache_event = match event {
            StoreEvent::RequestChanged { request_id } => {
                match self.persistence.request_find_by_id(&request_id).await? {
                    Some(request) if !request.status.is_terminal() => {
                        let details = self.persistence.detail_find_by_request(&request_id).await?;
                        self.details.insert(request_id.clone(), details);
                        self.requests.insert(request_id.clone(), request);
                    }
                    _ => {
                        self.requests.remove(&request_id);
                        self.details.remove(&request_id);
                    }
                }
                CacheEvent::RequestUpdated { request_id }
            }
            StoreEvent::LocksChanged { schema_ids } => {
                let current = self.persistence.lock_find_by_schemas(&schema_ids).await?;
                for schema_id in &schema_ids {
                    match current.iter().find(|lock| &lock.schema_id == schema_id) {
                        Some(lock) => {
                            self.locks.insert(schema_id.clone(), lock.clone());
                        }
                        None => {
                            self.locks.remove(schema_id);
                        }
                    }
                }
                CacheEvent::LocksUpdated { schema_ids }
            }
            StoreEvent::RecordsChanged { schema_id } => CacheEvent::RecordsUpdated { schema_id },
        };
        let _ = self.changes.send(cache_event);
        Ok(())
    }

    /// Load the view and keep it in sync with the store in the background.
    ///
    /// The subscription is taken before the initial load so no write between
    /// the two is missed. A lagging receiver falls back to a full refresh.
    pub fn spawn_sync(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.persistence.subscribe_events();
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = cache.force_refresh().await {
                tracing::error!("Initial review cache load failed: {}", e);
            }
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let Err(e) = cache.apply_event(event).await {
                            tracing::warn!("Review cache update failed, refreshing: {}", e);
                            if let Err(e) = cache.force_refresh().await {
                                tracing::error!("Review cache refresh failed: {}", e);
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Review cache lagged behind store events");
                        if let Err(e) = cache.force_refresh().await {
                            tracing::error!("Review cache refresh failed: {}", e);
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Store event channel closed, review cache sync stopped");
                        break;
                    }
                }
            }
        })
    }

    /// Whether an unexpired lock is held on the table
    pub fn is_locked(&self, schema_id: &str) -> bool {
        self.locks
            .get(schema_id)
            .is_some_and(|lock| !lock.is_expired_at(now_millis()))
    }

    /// Unexpired locks ordered by schema id
    pub fn locked_tables(&self) -> Vec<TableLockInfo> {
        let now = now_millis();
        let mut locks: Vec<TableLockInfo> = self
            .locks
            .iter()
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.value().clone())
            .collect();
        locks.sort_by(|a, b| a.schema_id.cmp(&b.schema_id));
        locks
    }

    /// Open requests, oldest submission first
    pub fn pending_requests(&self) -> Vec<ChangeRequestInfo> {
        let mut requests: Vec<ChangeRequestInfo> =
            self.requests.iter().map(|entry| entry.value().clone()).collect();
        requests.sort_by(|a, b| {
            a.submitted_at
                .cmp(&b.submitted_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        requests
    }

    /// An open request with its per-table view
    pub fn request(&self, request_id: &str) -> Option<ChangeRequestSummary> {
        let request = self.requests.get(request_id)?.value().clone();
        let tables = self
            .details
            .get(request_id)
            .map(|details| summarize_tables(details.value()))
            .unwrap_or_default();
        Some(ChangeRequestSummary { request, tables })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tollgate_persistence::{
        ChangeRequestPersistence, EmbeddedPersistService, NewChangeDetail, NewChangeRequest,
        NewTableLock,
    };

    async fn seed(store: &EmbeddedPersistService, id: &str, table: &str) {
        store
            .request_create(
                NewChangeRequest {
                    id: id.to_string(),
                    created_by: "alice".to_string(),
                    version_id: "v1".to_string(),
                    comment: None,
                },
                vec![NewChangeDetail {
                    table: table.to_string(),
                    rule_key: json!(1),
                    old_value: None,
                    new_value: Some(json!({"id": 1})),
                }],
                vec![NewTableLock {
                    schema_id: table.to_string(),
                    locked_by: "alice".to_string(),
                    expires_at: None,
                }],
                vec![],
                now_millis(),
            )
            .await
            .unwrap();
    }

    fn locked(cache: &ReviewCache) -> Vec<String> {
        cache
            .locked_tables()
            .into_iter()
            .map(|lock| lock.schema_id)
            .collect()
    }

    #[tokio::test]
    async fn test_force_refresh_loads_open_requests() {
        let store = Arc::new(EmbeddedPersistService::new());
        seed(&store, "r1", "t1").await;
        seed(&store, "r2", "t2").await;

        let cache = ReviewCache::new(store.clone());
        let mut changes = cache.subscribe();
        let stats = cache.force_refresh().await.unwrap();
        assert_eq!(stats, RefreshStats { requests: 2, locks: 2 });
        assert_eq!(changes.recv().await.unwrap(), CacheEvent::Refreshed);

        assert_eq!(locked(&cache), vec!["t1", "t2"]);
        assert!(cache.is_locked("t1"));
        assert!(!cache.is_locked("t3"));
        assert_eq!(cache.pending_requests().len(), 2);
        let summary = cache.request("r1").unwrap();
        assert_eq!(summary.tables.len(), 1);
        assert_eq!(summary.tables[0].schema_id, "t1");
    }

    #[tokio::test]
    async fn test_apply_event_drops_resolved_request() {
        let store = Arc::new(EmbeddedPersistService::new());
        seed(&store, "r1", "t1").await;
        let cache = ReviewCache::new(store.clone());
        cache.force_refresh().await.unwrap();

        store
            .request_resolve("r1", RequestStatus::Approved, "bob")
            .await
            .unwrap();
        cache
            .apply_event(StoreEvent::RequestChanged {
                request_id: "r1".to_string(),
            })
            .await
            .unwrap();
        cache
            .apply_event(StoreEvent::LocksChanged {
                schema_ids: vec!["t1".to_string()],
            })
            .await
            .unwrap();

        assert!(cache.request("r1").is_none());
        assert!(locked(&cache).is_empty());
    }

    #[tokio::test]
    async fn test_sync_task_follows_store() {
        let store = Arc::new(EmbeddedPersistService::new());
        let cache = Arc::new(ReviewCache::new(store.clone()));
        let mut changes = cache.subscribe();
        let handle = cache.spawn_sync();

        assert_eq!(changes.recv().await.unwrap(), CacheEvent::Refreshed);
        seed(&store, "r1", "t1").await;

        // request then lock notifications
        assert_eq!(
            changes.recv().await.unwrap(),
            CacheEvent::RequestUpdated {
                request_id: "r1".to_string()
            }
        );
        assert_eq!(
            changes.recv().await.unwrap(),
            CacheEvent::LocksUpdated {
                schema_ids: vec!["t1".to_string()]
            }
        );
        assert_eq!(locked(&cache), vec!["t1"]);
        assert_eq!(cache.pending_requests()[0].id, "r1");

        handle.abort();
    }

    #[tokio::test]
    async fn test_force_refresh_drops_resolved_entries() {
        let store = Arc::new(EmbeddedPersistService::new());
        seed(&store, "r1", "t1").await;
        seed(&store, "r2", "t2").await;
        let cache = ReviewCache::new(store.clone());
        cache.force_refresh().await.unwrap();

        store
            .request_resolve("r1", RequestStatus::Rejected, "bob")
            .await
            .unwrap();
        let stats = cache.force_refresh().await.unwrap();

        assert_eq!(stats, RefreshStats { requests: 1, locks: 1 });
        assert!(cache.request("r1").is_none());
        assert!(cache.request("r2").is_some());
        assert_eq!(locked(&cache), vec!["t2"]);
    }
}
