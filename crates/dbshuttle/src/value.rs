//! SQL value types for engine-agnostic data transfer.
//!
//! Rows read from a source agent are handed to the adaptive transfer loop as
//! `Vec<SqlValue>` and cross task boundaries during parallel migration, so
//! values are fully owned.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type hint for NULL values so sinks can encode them correctly.
///
/// Script sinks render every NULL the same way, but live target agents that
/// use typed wire protocols need to know the expected column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlNullKind {
    Bool,
    I16,
    I32,
    I64,
    F32,
    F64,
    Text,
    Bytes,
    Uuid,
    Decimal,
    DateTime,
    DateTimeOffset,
    Date,
    Time,
}

/// SQL value enum for type-safe row handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    /// NULL with type hint for correct wire format encoding.
    Null(SqlNullKind),

    /// Boolean value.
    Bool(bool),

    /// 16-bit signed integer (smallint).
    I16(i16),

    /// 32-bit signed integer (int).
    I32(i32),

    /// 64-bit signed integer (bigint).
    I64(i64),

    /// 32-bit floating point (real/float4).
    F32(f32),

    /// 64-bit floating point (double precision/float8).
    F64(f64),

    /// Text/string data.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// UUID/GUID value.
    Uuid(Uuid),

    /// Decimal value with arbitrary precision.
    Decimal(Decimal),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Timestamp with timezone offset.
    DateTimeOffset(DateTime<FixedOffset>),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),
}

/// One row as read from a source table.
pub type Row = Vec<SqlValue>;

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }

    /// Estimated in-flight size of this value in bytes.
    ///
    /// Used by the adaptive transfer loop to bound page sizes against the
    /// configured fetch byte budget. Estimates err on the generous side;
    /// exactness does not matter, monotonicity under growing payloads does.
    #[must_use]
    pub fn estimated_size(&self) -> u64 {
        match self {
            SqlValue::Null(_) => 1,
            SqlValue::Bool(_) => 1,
            SqlValue::I16(_) => 2,
            SqlValue::I32(_) | SqlValue::F32(_) => 4,
            SqlValue::I64(_) | SqlValue::F64(_) => 8,
            SqlValue::Text(s) => s.len() as u64,
            SqlValue::Bytes(b) => b.len() as u64,
            SqlValue::Uuid(_) => 16,
            SqlValue::Decimal(_) => 16,
            SqlValue::DateTime(_) | SqlValue::DateTimeOffset(_) => 12,
            SqlValue::Date(_) | SqlValue::Time(_) => 8,
        }
    }

    /// Get the null kind for this value (for type-aware NULL encoding).
    #[must_use]
    pub fn null_kind(&self) -> SqlNullKind {
        match self {
            SqlValue::Null(k) => *k,
            SqlValue::Bool(_) => SqlNullKind::Bool,
            SqlValue::I16(_) => SqlNullKind::I16,
            SqlValue::I32(_) => SqlNullKind::I32,
            SqlValue::I64(_) => SqlNullKind::I64,
            SqlValue::F32(_) => SqlNullKind::F32,
            SqlValue::F64(_) => SqlNullKind::F64,
            SqlValue::Text(_) => SqlNullKind::Text,
            SqlValue::Bytes(_) => SqlNullKind::Bytes,
            SqlValue::Uuid(_) => SqlNullKind::Uuid,
            SqlValue::Decimal(_) => SqlNullKind::Decimal,
            SqlValue::DateTime(_) => SqlNullKind::DateTime,
            SqlValue::DateTimeOffset(_) => SqlNullKind::DateTimeOffset,
            SqlValue::Date(_) => SqlNullKind::Date,
            SqlValue::Time(_) => SqlNullKind::Time,
        }
    }

    /// Render the value as a SQL literal for INSERT statement generation.
    ///
    /// Strings have single quotes doubled; binary data is rendered as a hex
    /// literal. Agents with richer literal syntax override this in their own
    /// SQL generation.
    #[must_use]
    pub fn to_sql_literal(&self) -> String {
        match self {
            SqlValue::Null(_) => "NULL".to_string(),
            SqlValue::Bool(true) => "TRUE".to_string(),
            SqlValue::Bool(false) => "FALSE".to_string(),
            SqlValue::I16(v) => v.to_string(),
            SqlValue::I32(v) => v.to_string(),
            SqlValue::I64(v) => v.to_string(),
            SqlValue::F32(v) => v.to_string(),
            SqlValue::F64(v) => v.to_string(),
            SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            SqlValue::Bytes(b) => {
                let hex: String = b.iter().map(|byte| format!("{:02x}", byte)).collect();
                format!("'\\x{}'", hex)
            }
            SqlValue::Uuid(u) => format!("'{}'", u),
            SqlValue::Decimal(d) => d.to_string(),
            SqlValue::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            SqlValue::DateTimeOffset(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S%.f %:z")),
            SqlValue::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            SqlValue::Time(t) => format!("'{}'", t.format("%H:%M:%S%.f")),
        }
    }
}

/// Estimated size of a whole row in bytes.
#[must_use]
pub fn estimated_row_size(row: &Row) -> u64 {
    row.iter().map(SqlValue::estimated_size).sum()
}
