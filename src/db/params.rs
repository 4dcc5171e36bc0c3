//! Parameter binding utilities for database queries.
//!
//! This module binds `SqlParam` values to PostgreSQL query objects in
//! positional order.

use crate::models::{NullKind, SqlParam};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::Postgres;
use sqlx::postgres::PgArguments;
use sqlx::types::Json;
use uuid::Uuid;

pub(crate) type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// Bind a parameter to a PostgreSQL query.
pub(crate) fn bind_param<'q>(query: PgQuery<'q>, param: &'q SqlParam) -> PgQuery<'q> {
    match param {
        SqlParam::Null(kind) => bind_null(query, *kind),
        SqlParam::Bool(v) => query.bind(*v),
        SqlParam::Int(v) => query.bind(*v),
        SqlParam::BigInt(v) => query.bind(*v),
        SqlParam::Float(v) => query.bind(*v),
        SqlParam::Text(v) => query.bind(v.as_str()),
        SqlParam::Bytes(v) => query.bind(v.as_slice()),
        SqlParam::Json(v) => query.bind(Json(v)),
        SqlParam::Uuid(v) => query.bind(*v),
        SqlParam::Date(v) => query.bind(*v),
        SqlParam::Time(v) => query.bind(*v),
        SqlParam::Timestamp(v) => query.bind(*v),
        SqlParam::TimestampTz(v) => query.bind(*v),
        SqlParam::TextArray(v) => query.bind(v.clone()),
        SqlParam::BigIntArray(v) => query.bind(v.clone()),
    }
}

/// Bind a NULL carrying the parameter's SQL type.
fn bind_null(query: PgQuery<'_>, kind: NullKind) -> PgQuery<'_> {
    match kind {
        NullKind::Bool => query.bind(None::<bool>),
        NullKind::Int => query.bind(None::<i32>),
        NullKind::BigInt => query.bind(None::<i64>),
        NullKind::Float => query.bind(None::<f64>),
        NullKind::Text => query.bind(None::<String>),
        NullKind::Bytes => query.bind(None::<Vec<u8>>),
        NullKind::Json => query.bind(None::<Json<JsonValue>>),
        NullKind::Uuid => query.bind(None::<Uuid>),
        NullKind::Date => query.bind(None::<NaiveDate>),
        NullKind::Time => query.bind(None::<NaiveTime>),
        NullKind::Timestamp => query.bind(None::<NaiveDateTime>),
        NullKind::TimestampTz => query.bind(None::<DateTime<Utc>>),
        NullKind::TextArray => query.bind(None::<Vec<String>>),
        NullKind::BigIntArray => query.bind(None::<Vec<i64>>),
    }
}

/// Bind every parameter, in order, to a fresh query over `sql`.
pub(crate) fn prepare<'q>(sql: &'q str, params: &'q [SqlParam]) -> PgQuery<'q> {
    params
        .iter()
        .fold(sqlx::query(sql), |query, param| bind_param(query, param))
}
