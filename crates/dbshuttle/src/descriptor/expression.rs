//! Canonical default/computed expression forms.
//!
//! Mirrors the role of [`DataTypeDescriptor`](super::datatype::DataTypeDescriptor)
//! for expressions: engines translate their default-value and computed-column
//! SQL into these forms and render them back out in their own syntax.

use serde::{Deserialize, Serialize};

use crate::value::SqlValue;

/// Functions with a well-known meaning across engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WellKnownFunction {
    /// Current date and time (`now()`, `getdate()`, `CURRENT_TIMESTAMP`).
    Now,
    /// Current date (`CURRENT_DATE`).
    CurrentDate,
    /// Current time of day (`CURRENT_TIME`).
    CurrentTime,
    /// A freshly generated UUID (`gen_random_uuid()`, `newid()`).
    Uuid,
}

/// Canonical representation of a default-value or computed-column expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlExpressionDescriptor {
    /// A well-known function every engine can render natively.
    Function(WellKnownFunction),

    /// A typed literal constant.
    Literal(SqlValue),

    /// Opaque engine SQL that could not be canonicalized.
    ///
    /// Raw expressions survive same-engine migrations verbatim; cross-engine
    /// runs must canonicalize them (possibly by evaluating against the source
    /// connection) or fail with a typed error.
    Raw(String),
}

impl SqlExpressionDescriptor {
    /// Whether this expression still carries engine-specific SQL.
    #[must_use]
    pub fn is_raw(&self) -> bool {
        matches!(self, SqlExpressionDescriptor::Raw(_))
    }
}
