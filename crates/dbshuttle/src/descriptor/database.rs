//! Database, table, column, key and sequence descriptors.
//!
//! A [`DatabaseDescriptor`] is built once by the source agent, deep-cloned to
//! seed the target descriptor, reshaped by the mapping passes, then read by
//! the metadata and data phases. It is never persisted.

use serde::{Deserialize, Serialize};

use super::datatype::DataTypeDescriptor;
use super::expression::SqlExpressionDescriptor;

/// Root aggregate: everything the migration knows about one database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseDescriptor {
    /// Tables in source catalog order.
    pub tables: Vec<TableDescriptor>,

    /// Standalone sequences in source catalog order.
    pub sequences: Vec<SequenceDescriptor>,
}

impl DatabaseDescriptor {
    /// Look up a table by schema and name.
    pub fn find_table(&self, schema: Option<&str>, name: &str) -> Option<&TableDescriptor> {
        self.tables
            .iter()
            .find(|t| t.schema.as_deref() == schema && t.name == name)
    }

    /// Total number of columns across all tables.
    pub fn column_count(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }
}

/// Table metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Schema name; `None` on engines without schema support.
    pub schema: Option<String>,

    /// Table name.
    pub name: String,

    /// Table comment.
    pub comment: Option<String>,

    /// Column definitions in ordinal order.
    pub columns: Vec<ColumnDescriptor>,

    /// Primary key, if any.
    pub primary_key: Option<PrimaryKeyDescriptor>,

    /// Unique constraints.
    pub uniques: Vec<UniqueDescriptor>,

    /// Non-key indexes.
    pub indexes: Vec<IndexDescriptor>,

    /// Foreign key constraints.
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
}

impl TableDescriptor {
    /// Get the qualified table name for logging and events.
    pub fn full_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    /// Look up a column by name.
    pub fn find_column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The identity column of this table, if any.
    pub fn identity_column(&self) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.is_identity)
    }
}

/// Column metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,

    /// Engine-native store type string (e.g. "nvarchar(100)", "int8").
    ///
    /// This is what agents read from and render into DDL. Mapping pass 6
    /// rewrites it for cross-engine runs via the canonical pivot.
    pub store_type: String,

    /// Canonical type tag, filled by the source agent or by mapping pass 6.
    pub data_type: Option<DataTypeDescriptor>,

    /// Whether the column allows NULL.
    pub is_nullable: bool,

    /// Whether the column auto-generates values.
    pub is_identity: bool,

    /// Generation parameters when `is_identity` is set.
    pub identity: Option<IdentityDescriptor>,

    /// Default-value expression.
    pub default_value: Option<SqlExpressionDescriptor>,

    /// Computed-column expression.
    pub computed_expression: Option<SqlExpressionDescriptor>,

    /// Whether a computed column is stored rather than virtual.
    pub is_stored: bool,

    /// Column collation.
    pub collation: Option<String>,

    /// Column comment.
    pub comment: Option<String>,
}

/// Primary key constraint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrimaryKeyDescriptor {
    /// Constraint name; may be empty pending assignment.
    pub name: String,

    /// Key columns in order.
    pub columns: Vec<String>,
}

/// Unique constraint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UniqueDescriptor {
    /// Constraint name; may be empty pending assignment.
    pub name: String,

    /// Constrained columns in order.
    pub columns: Vec<String>,
}

/// Index metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Index name; may be empty pending assignment.
    pub name: String,

    /// Indexed columns in order.
    pub columns: Vec<String>,

    /// Whether the index enforces uniqueness.
    pub is_unique: bool,
}

/// Referential action on delete of a principal row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
}

/// Foreign key constraint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForeignKeyDescriptor {
    /// Constraint name; may be empty pending assignment.
    pub name: String,

    /// Referencing columns in order.
    pub columns: Vec<String>,

    /// Principal (referenced) schema.
    pub principal_schema: Option<String>,

    /// Principal (referenced) table.
    pub principal_table: String,

    /// Principal (referenced) columns in order.
    pub principal_columns: Vec<String>,

    /// Action taken when a principal row is deleted.
    pub on_delete: ReferentialAction,
}

/// Engine-family-specific generator options with no canonical equivalent.
///
/// A typed variant per engine family instead of an untyped key/value bag, so
/// the canonical model stays engine-neutral without losing type safety.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum VendorOptions {
    /// No engine-specific options observed.
    #[default]
    None,

    /// SQL Server family: sequence/identity cache size.
    SqlServer { cache: Option<i64> },

    /// PostgreSQL family: cache size and owning column.
    Postgres {
        cache: Option<i64>,
        owned_by: Option<String>,
    },

    /// MySQL family: generation mode string ("auto_increment" etc.).
    MySql { generation: String },
}

/// Auto-increment parameters for an identity column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityDescriptor {
    /// First generated value.
    pub start_value: i64,

    /// Step between generated values.
    pub increment: i64,

    /// Whether the generator wraps at its bounds.
    pub is_cyclic: bool,

    /// Lower bound, if constrained.
    pub min_value: Option<i64>,

    /// Upper bound, if constrained.
    pub max_value: Option<i64>,

    /// Last value observed on the source; the target generator continues
    /// from this plus one increment after data transfer.
    pub current_value: Option<i64>,

    /// Engine-specific extras.
    pub vendor: VendorOptions,
}

impl Default for IdentityDescriptor {
    fn default() -> Self {
        Self {
            start_value: 1,
            increment: 1,
            is_cyclic: false,
            min_value: None,
            max_value: None,
            current_value: None,
            vendor: VendorOptions::None,
        }
    }
}

/// Standalone named value generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceDescriptor {
    /// Schema name; `None` on engines without schema support.
    pub schema: Option<String>,

    /// Sequence name.
    pub name: String,

    /// Engine-native store type of generated values.
    pub store_type: String,

    /// First generated value.
    pub start_value: i64,

    /// Step between generated values.
    pub increment: i64,

    /// Whether the generator wraps at its bounds.
    pub is_cyclic: bool,

    /// Lower bound, if constrained.
    pub min_value: Option<i64>,

    /// Upper bound, if constrained.
    pub max_value: Option<i64>,

    /// Last value observed on the source.
    pub current_value: Option<i64>,

    /// Engine-specific extras.
    pub vendor: VendorOptions,
}

impl Default for SequenceDescriptor {
    fn default() -> Self {
        Self {
            schema: None,
            name: String::new(),
            store_type: "bigint".to_string(),
            start_value: 1,
            increment: 1,
            is_cyclic: false,
            min_value: None,
            max_value: None,
            current_value: None,
            vendor: VendorOptions::None,
        }
    }
}

impl SequenceDescriptor {
    /// Get the qualified sequence name for logging and events.
    pub fn full_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}
