//! Live and staged record persistence trait

use async_trait::async_trait;

use crate::model::{LiveRecordInfo, StagedRecordInfo};

/// Live table and staging table reads
#[async_trait]
pub trait RecordPersistence: Send + Sync {
    /// Every record of a live table, ordered by record key
    async fn record_find_all(&self, schema_id: &str) -> anyhow::Result<Vec<LiveRecordInfo>>;

    /// Staging rows written for a request
    async fn staged_find_by_request(
        &self,
        staging_table: &str,
        request_id: &str,
    ) -> anyhow::Result<Vec<StagedRecordInfo>>;
}
