//! The canonical data type tags all engine store types convert through.

use serde::{Deserialize, Serialize};

/// Canonical data type descriptor.
///
/// This is the pivot type of the migration core: every engine converts its
/// store-type strings to and from these tags, never directly to another
/// engine's types. Variants carry at most two integer arguments
/// (length, or precision and scale).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataTypeDescriptor {
    /// Boolean/bit type.
    Boolean,
    /// 8-bit integer.
    TinyInt,
    /// 16-bit integer.
    SmallInt,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    BigInt,
    /// Exact decimal: total digits and digits after the decimal point.
    Decimal { precision: u8, scale: u8 },
    /// 32-bit floating point.
    Float,
    /// 64-bit floating point.
    Double,
    /// Fixed-length character string.
    Char(u32),
    /// Variable-length character string; 0 means unbounded/max.
    Varchar(u32),
    /// Fixed-length national (Unicode) character string.
    NChar(u32),
    /// Variable-length national (Unicode) character string; 0 means max.
    NVarchar(u32),
    /// Unlimited text.
    Text,
    /// Unlimited national (Unicode) text.
    NText,
    /// Fixed-length binary data.
    Binary(u32),
    /// Variable-length binary data; 0 means unbounded/max.
    Varbinary(u32),
    /// Unlimited binary data.
    Blob,
    /// Date only.
    Date,
    /// Time of day with fractional-second precision.
    Time { precision: u8 },
    /// Date and time without timezone, with fractional-second precision.
    DateTime { precision: u8 },
    /// Date and time with timezone offset, with fractional-second precision.
    DateTimeOffset { precision: u8 },
    /// UUID/GUID (128-bit identifier).
    Uuid,
}

impl DataTypeDescriptor {
    /// Whether the tag is one of the integer family.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataTypeDescriptor::TinyInt
                | DataTypeDescriptor::SmallInt
                | DataTypeDescriptor::Int
                | DataTypeDescriptor::BigInt
        )
    }

    /// Whether the tag carries character data.
    #[must_use]
    pub fn is_character(&self) -> bool {
        matches!(
            self,
            DataTypeDescriptor::Char(_)
                | DataTypeDescriptor::Varchar(_)
                | DataTypeDescriptor::NChar(_)
                | DataTypeDescriptor::NVarchar(_)
                | DataTypeDescriptor::Text
                | DataTypeDescriptor::NText
        )
    }
}

impl std::fmt::Display for DataTypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataTypeDescriptor::Boolean => write!(f, "boolean"),
            DataTypeDescriptor::TinyInt => write!(f, "tinyint"),
            DataTypeDescriptor::SmallInt => write!(f, "smallint"),
            DataTypeDescriptor::Int => write!(f, "int"),
            DataTypeDescriptor::BigInt => write!(f, "bigint"),
            DataTypeDescriptor::Decimal { precision, scale } => {
                write!(f, "decimal({},{})", precision, scale)
            }
            DataTypeDescriptor::Float => write!(f, "float"),
            DataTypeDescriptor::Double => write!(f, "double"),
            DataTypeDescriptor::Char(n) => write!(f, "char({})", n),
            DataTypeDescriptor::Varchar(n) => write!(f, "varchar({})", n),
            DataTypeDescriptor::NChar(n) => write!(f, "nchar({})", n),
            DataTypeDescriptor::NVarchar(n) => write!(f, "nvarchar({})", n),
            DataTypeDescriptor::Text => write!(f, "text"),
            DataTypeDescriptor::NText => write!(f, "ntext"),
            DataTypeDescriptor::Binary(n) => write!(f, "binary({})", n),
            DataTypeDescriptor::Varbinary(n) => write!(f, "varbinary({})", n),
            DataTypeDescriptor::Blob => write!(f, "blob"),
            DataTypeDescriptor::Date => write!(f, "date"),
            DataTypeDescriptor::Time { precision } => write!(f, "time({})", precision),
            DataTypeDescriptor::DateTime { precision } => write!(f, "datetime({})", precision),
            DataTypeDescriptor::DateTimeOffset { precision } => {
                write!(f, "datetimeoffset({})", precision)
            }
            DataTypeDescriptor::Uuid => write!(f, "uuid"),
        }
    }
}

/// Error parsing a canonical type spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDataTypeError(pub String);

impl std::fmt::Display for ParseDataTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unrecognized canonical type '{}'", self.0)
    }
}

impl std::error::Error for ParseDataTypeError {}

impl std::str::FromStr for DataTypeDescriptor {
    type Err = ParseDataTypeError;

    /// Parse the engine-neutral spelling produced by `Display`.
    ///
    /// Arguments are optional where the type has a natural default
    /// (`varchar` means `varchar(0)`, i.e. unbounded; `datetime` means
    /// precision 6).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let (base, args) = match s.find('(') {
            Some(open) if s.ends_with(')') => {
                let base = s[..open].trim().to_string();
                let args: Vec<u32> = s[open + 1..s.len() - 1]
                    .split(',')
                    .map(|a| a.trim().parse::<u32>())
                    .collect::<Result<_, _>>()
                    .map_err(|_| ParseDataTypeError(s.clone()))?;
                (base, args)
            }
            Some(_) => return Err(ParseDataTypeError(s)),
            None => (s.clone(), Vec::new()),
        };

        let first = args.first().copied();
        let second = args.get(1).copied();
        let too_many = |max: usize| args.len() > max;

        let parsed = match base.as_str() {
            "boolean" | "bool" if args.is_empty() => DataTypeDescriptor::Boolean,
            "tinyint" if args.is_empty() => DataTypeDescriptor::TinyInt,
            "smallint" if args.is_empty() => DataTypeDescriptor::SmallInt,
            "int" | "integer" if args.is_empty() => DataTypeDescriptor::Int,
            "bigint" if args.is_empty() => DataTypeDescriptor::BigInt,
            "decimal" | "numeric" if !too_many(2) => DataTypeDescriptor::Decimal {
                precision: first.unwrap_or(18).min(u8::MAX as u32) as u8,
                scale: second.unwrap_or(0).min(u8::MAX as u32) as u8,
            },
            "float" | "real" if args.is_empty() => DataTypeDescriptor::Float,
            "double" if args.is_empty() => DataTypeDescriptor::Double,
            "char" if !too_many(1) => DataTypeDescriptor::Char(first.unwrap_or(1)),
            "varchar" if !too_many(1) => DataTypeDescriptor::Varchar(first.unwrap_or(0)),
            "nchar" if !too_many(1) => DataTypeDescriptor::NChar(first.unwrap_or(1)),
            "nvarchar" if !too_many(1) => DataTypeDescriptor::NVarchar(first.unwrap_or(0)),
            "text" if args.is_empty() => DataTypeDescriptor::Text,
            "ntext" if args.is_empty() => DataTypeDescriptor::NText,
            "binary" if !too_many(1) => DataTypeDescriptor::Binary(first.unwrap_or(1)),
            "varbinary" if !too_many(1) => DataTypeDescriptor::Varbinary(first.unwrap_or(0)),
            "blob" if args.is_empty() => DataTypeDescriptor::Blob,
            "date" if args.is_empty() => DataTypeDescriptor::Date,
            "time" if !too_many(1) => DataTypeDescriptor::Time {
                precision: first.unwrap_or(6).min(u8::MAX as u32) as u8,
            },
            "datetime" if !too_many(1) => DataTypeDescriptor::DateTime {
                precision: first.unwrap_or(6).min(u8::MAX as u32) as u8,
            },
            "datetimeoffset" if !too_many(1) => DataTypeDescriptor::DateTimeOffset {
                precision: first.unwrap_or(6).min(u8::MAX as u32) as u8,
            },
            "uuid" if args.is_empty() => DataTypeDescriptor::Uuid,
            _ => return Err(ParseDataTypeError(s)),
        };

        Ok(parsed)
    }
}
