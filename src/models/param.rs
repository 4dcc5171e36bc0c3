//! Positional parameter values for parameterized SQL.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// A positional parameter value (`$1`, `$2`, ...).
///
/// Values are usually built through `From` conversions, so call sites can write
/// `.bind(42_i64)` or `.bind("alice")`. `None` binds as a NULL of the wrapped
/// type, so `.bind(None::<i64>)` is accepted by a `BIGINT` column.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// NULL value, typed so the server can match it against the column
    Null(NullKind),
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Json(JsonValue),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    TextArray(Vec<String>),
    BigIntArray(Vec<i64>),
}

/// SQL type of a NULL parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullKind {
    Bool,
    Int,
    BigInt,
    Float,
    Text,
    Bytes,
    Json,
    Uuid,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    TextArray,
    BigIntArray,
}

impl NullKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int4",
            Self::BigInt => "int8",
            Self::Float => "float8",
            Self::Text => "text",
            Self::Bytes => "bytea",
            Self::Json => "jsonb",
            Self::Uuid => "uuid",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::TimestampTz => "timestamptz",
            Self::TextArray => "text[]",
            Self::BigIntArray => "int8[]",
        }
    }
}

impl SqlParam {
    /// Check if this parameter is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null(kind) => kind.type_name(),
            Self::Bool(_) => "bool",
            Self::Int(_) => "int4",
            Self::BigInt(_) => "int8",
            Self::Float(_) => "float8",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytea",
            Self::Json(_) => "jsonb",
            Self::Uuid(_) => "uuid",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Timestamp(_) => "timestamp",
            Self::TimestampTz(_) => "timestamptz",
            Self::TextArray(_) => "text[]",
            Self::BigIntArray(_) => "int8[]",
        }
    }
}

macro_rules! impl_from_param {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for SqlParam {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }

            impl From<Option<$ty>> for SqlParam {
                fn from(value: Option<$ty>) -> Self {
                    value.map_or(Self::Null(NullKind::$variant), Self::$variant)
                }
            }
        )+
    };
}

impl_from_param!(
    bool => Bool,
    i32 => Int,
    i64 => BigInt,
    f64 => Float,
    String => Text,
    Vec<u8> => Bytes,
    JsonValue => Json,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    Vec<String> => TextArray,
    Vec<i64> => BigIntArray,
);

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Option<&str>> for SqlParam {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Self::Null(NullKind::Text), Into::into)
    }
}

impl From<i16> for SqlParam {
    fn from(value: i16) -> Self {
        Self::Int(value.into())
    }
}

impl From<Option<i16>> for SqlParam {
    fn from(value: Option<i16>) -> Self {
        value.map_or(Self::Null(NullKind::Int), Into::into)
    }
}

impl From<f32> for SqlParam {
    fn from(value: f32) -> Self {
        Self::Float(value.into())
    }
}

impl From<Option<f32>> for SqlParam {
    fn from(value: Option<f32>) -> Self {
        value.map_or(Self::Null(NullKind::Float), Into::into)
    }
}
