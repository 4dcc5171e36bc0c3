//! Data Layer Library
//!
//! A PostgreSQL access layer with typed row mapping, explicit transaction
//! scopes, pagination and an optional cache-aside path backed by Redis or
//! process memory.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::Config;
pub use db::{Context, DataLayer, IsolationLevel, PageQuery, Query, Record, Statement, Transaction};
pub use error::{DataError, DataResult};
pub use models::{Page, PageRequest, Sort, SqlParam};
