//! Row mapping from PostgreSQL result rows into typed records.
//!
//! A [`Record`] describes, at compile time, the ordered list of columns it
//! consumes from one result row. Records are flattened depth-first in field
//! declaration order, so the SQL `SELECT` list must name columns in exactly
//! that order. There is no name-based reconciliation.
//!
//! # Flattening rules
//!
//! | Shape                                   | Targets              |
//! |-----------------------------------------|----------------------|
//! | scalar (`i64`, `String`, `Uuid`, ...)   | 1, [`TargetKind::Scalar`]   |
//! | temporal (`NaiveDate`, `DateTime<Utc>`) | 1, [`TargetKind::Temporal`] |
//! | nullable wrapper (`Option<leaf>`)       | 1, [`TargetKind::Nullable`] |
//! | sequence (`Vec<i64>`, `Vec<String>`)    | 1, [`TargetKind::Sequence`] |
//! | aggregate ([`impl_record!`], tuples)    | sum of its fields    |
//!
//! Leaves are never traversed, even when internally composite.
//!
//! [`impl_record!`]: crate::impl_record

use crate::error::{DataError, DataResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

/// Result of decoding one record from a row.
pub type ScanResult<T> = Result<T, sqlx::Error>;

/// Classification of one scan target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Scalar,
    Temporal,
    Nullable,
    Sequence,
}

/// One addressable destination slot bound to one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    /// Dotted field path inside the record, e.g. `address.city`. Empty for a
    /// top-level leaf.
    pub path: String,
    pub kind: TargetKind,
    pub rust_type: &'static str,
}

/// A record shape that can be decoded from consecutive columns of a row.
pub trait Record: Sized {
    /// Number of columns this shape consumes.
    const WIDTH: usize;

    /// Append this shape's scan targets, in column order, under `path`.
    fn describe(path: &str, targets: &mut Vec<ScanTarget>);

    /// Decode this shape starting at column `*cursor`, advancing the cursor
    /// past every column consumed.
    fn scan(row: &PgRow, cursor: &mut usize) -> ScanResult<Self>;
}

/// Ordered scan targets for `T`. Its length always equals `T::WIDTH`.
pub fn scan_targets<T: Record>() -> Vec<ScanTarget> {
    let mut targets = Vec::with_capacity(T::WIDTH);
    T::describe("", &mut targets);
    targets
}

/// Decode a whole row into `T`, requiring the column count to match exactly.
pub fn scan_row<T: Record>(row: &PgRow) -> DataResult<T> {
    if row.len() != T::WIDTH {
        return Err(DataError::ColumnCount {
            expected: T::WIDTH,
            found: row.len(),
        });
    }
    let mut cursor = 0;
    Ok(T::scan(row, &mut cursor)?)
}

/// Join a parent path and a field name with a dot.
#[doc(hidden)]
pub fn join_path(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}.{field}")
    }
}

fn push_leaf<T>(path: &str, kind: TargetKind, targets: &mut Vec<ScanTarget>) {
    targets.push(ScanTarget {
        path: path.to_string(),
        kind,
        rust_type: std::any::type_name::<T>(),
    });
}

// Every leaf is also recognized behind `Option`, which binds as one nullable target.
macro_rules! impl_leaf_record {
    ($kind:ident: $($ty:ty),+ $(,)?) => {
        $(
            impl Record for $ty {
                const WIDTH: usize = 1;

                fn describe(path: &str, targets: &mut Vec<ScanTarget>) {
                    push_leaf::<$ty>(path, TargetKind::$kind, targets);
                }

                fn scan(row: &PgRow, cursor: &mut usize) -> ScanResult<Self> {
                    let value = row.try_get::<$ty, _>(*cursor)?;
                    *cursor += 1;
                    Ok(value)
                }
            }

            impl Record for Option<$ty> {
                const WIDTH: usize = 1;

                fn describe(path: &str, targets: &mut Vec<ScanTarget>) {
                    push_leaf::<Option<$ty>>(path, TargetKind::Nullable, targets);
                }

                fn scan(row: &PgRow, cursor: &mut usize) -> ScanResult<Self> {
                    let value = row.try_get::<Option<$ty>, _>(*cursor)?;
                    *cursor += 1;
                    Ok(value)
                }
            }
        )+
    };
}

impl_leaf_record!(Scalar: bool, i16, i32, i64, f32, f64, String, Vec<u8>, JsonValue, Uuid);
impl_leaf_record!(Temporal: NaiveDate, NaiveTime, NaiveDateTime, DateTime<Utc>);
impl_leaf_record!(
    Sequence: Vec<bool>,
    Vec<i16>,
    Vec<i32>,
    Vec<i64>,
    Vec<f32>,
    Vec<f64>,
    Vec<String>,
    Vec<Uuid>,
);

macro_rules! impl_tuple_record {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Record),+> Record for ($($name,)+) {
            const WIDTH: usize = 0 $(+ $name::WIDTH)+;

            fn describe(path: &str, targets: &mut Vec<ScanTarget>) {
                $( $name::describe(&join_path(path, stringify!($idx)), targets); )+
            }

            fn scan(row: &PgRow, cursor: &mut usize) -> ScanResult<Self> {
                Ok(($($name::scan(row, cursor)?,)+))
            }
        }
    };
}

impl_tuple_record!(A: 0, B: 1);
impl_tuple_record!(A: 0, B: 1, C: 2);
impl_tuple_record!(A: 0, B: 1, C: 2, D: 3);
impl_tuple_record!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_tuple_record!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
