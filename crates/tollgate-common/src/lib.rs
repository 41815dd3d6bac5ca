//! Tollgate Common - Shared types and utilities
//!
//! This crate provides the foundational types used across all Tollgate components:
//! - Error types and error codes
//! - Canonical JSON helpers used to compare record snapshots
//! - Identifier validation

pub mod error;
pub mod utils;

// Re-exports for convenience
pub use error::{AppError, ErrorCode, TollgateError};
pub use utils::{canonical_json, canonicalize, is_valid_identifier, scalar_key};

/// Default page size for list queries
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Upper bound for a single list page
pub const MAX_PAGE_SIZE: u64 = 500;
