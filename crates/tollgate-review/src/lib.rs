//! Tollgate Review - change request review workflow
//!
//! This crate provides:
//! - Snapshot differ classifying added, modified and deleted records
//! - Table kind handlers deciding the store writes of each table kind
//! - `ChangeReviewService`: submission, table decisions, finalize, bulk review
//! - `ReviewCache`: in-memory view kept in sync with store notifications

pub mod cache;
pub mod diff;
pub mod handler;
pub mod model;
pub mod service;

pub use cache::{CacheEvent, RefreshStats, ReviewCache};
pub use diff::{ChangeRecord, FieldChange, diff};
pub use handler::{HandlerRegistry, LiveTableHandler, StagedTableHandler, TableKindHandler};
pub use model::{
    BulkFailure, BulkResolved, BulkReviewReport, ChangeRequestSummary, ReviewOptions,
    ReviewSubmission, SubmitReceipt, TableChangesSummary, TableReviewOutcome, TableSnapshot,
};
pub use service::ChangeReviewService;
