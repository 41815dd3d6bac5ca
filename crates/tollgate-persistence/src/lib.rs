//! Tollgate Persistence - Database entities and persistence layer
//!
//! This crate provides:
//! - SeaORM entity definitions
//! - Persistence trait abstractions for unified storage
//! - Domain model types for persistence operations

pub mod embedded;
pub mod entity;
pub mod model;
pub mod sql;
pub mod traits;

// Re-export sea-orm for convenience
pub use sea_orm;

// Re-export entity prelude
pub use entity::prelude::*;

// Re-export persistence traits
pub use traits::{
    ChangeDetailPersistence, ChangeRequestPersistence, PersistenceService, RecordPersistence,
    TableLockPersistence,
};

// Re-export SQL backend
pub use sql::ExternalDbPersistService;

// Re-export embedded backend
pub use embedded::EmbeddedPersistService;

// Re-export model types
pub use model::{
    ApplyOp, ChangeDetailInfo, ChangeRequestInfo, ChangeType, DetailStatus, LiveRecordInfo,
    NewChangeDetail, NewChangeRequest, NewTableLock, Page, RequestStatus, ResolveOutcome,
    ReviewDecision, StagedOperation, StagedRecordInfo, StorageMode, StoreEvent, TableLockInfo,
    now_millis,
};
