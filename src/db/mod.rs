//! Database access layer.
//!
//! This module provides:
//! - Connection ownership and shutdown release ([`DataLayer`])
//! - Explicit execution contexts carrying transactions and deadlines
//! - Compile-time row mapping ([`Record`] and [`impl_record!`](crate::impl_record))
//! - Parameterized reads, paginated reads and writes
//! - Commit-or-rollback units of work

pub mod context;
#[macro_use]
pub mod macros;
pub mod mapper;
pub(crate) mod params;
pub mod pool;
pub mod query;
pub mod statement;
pub mod transaction;

pub use context::Context;
pub use mapper::{Record, ScanResult, ScanTarget, TargetKind, scan_row, scan_targets};
pub use pool::{DataLayer, Migrator};
pub use query::{PageQuery, Query};
pub use sqlx::postgres::PgRow;
pub use statement::Statement;
pub use transaction::{IsolationLevel, Transaction};
