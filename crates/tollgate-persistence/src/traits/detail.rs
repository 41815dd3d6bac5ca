//! Change detail persistence trait

use async_trait::async_trait;

use crate::model::{ApplyOp, ChangeDetailInfo, ReviewDecision};

/// Change detail persistence operations
#[async_trait]
pub trait ChangeDetailPersistence: Send + Sync {
    /// All details of a request, in creation order
    async fn detail_find_by_request(&self, request_id: &str)
    -> anyhow::Result<Vec<ChangeDetailInfo>>;

    /// Stamp the decision on every pending detail of `(request_id, table)` and
    /// execute `ops` in the same unit of work.
    ///
    /// Returns the number of details updated. When no detail is pending the
    /// ops are skipped and zero is returned.
    async fn detail_review_table(
        &self,
        request_id: &str,
        table: &str,
        decision: ReviewDecision,
        ops: Vec<ApplyOp>,
    ) -> anyhow::Result<u64>;
}
