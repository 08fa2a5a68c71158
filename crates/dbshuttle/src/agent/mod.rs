//! The dialect agent contract.
//!
//! A dialect agent adapts one concrete database engine to the migration
//! core: connection creation, metadata extraction, DDL emission, row paging,
//! and the symmetric type/expression conversions through the canonical
//! pivots. The orchestrator never inspects an agent's internals; it only
//! calls this contract.
//!
//! - [`DialectAgent`]: the capability set every engine adapter provides
//! - [`AgentConnection`]: opaque connection handle (live or script sink)
//! - [`AgentSetting`]: static facts about an engine's identifier rules
//! - [`registry`]: the strategy map agents are resolved from
//! - [`context`]: per-run state threaded through every agent call

pub mod context;
pub mod registry;

pub use context::MigrationContext;
pub use registry::AgentRegistry;

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::descriptor::{
    DataTypeDescriptor, DatabaseDescriptor, SqlExpressionDescriptor, TableDescriptor,
};
use crate::error::Result;
use crate::value::Row;

/// Static facts about an engine the mapping passes need.
#[derive(Debug, Clone)]
pub struct AgentSetting {
    /// Whether the engine has schema namespaces.
    pub supports_schemas: bool,

    /// Schema objects land in when none is given (e.g. "public", "dbo").
    pub default_schema: Option<String>,

    /// Maximum identifier length the engine accepts.
    pub max_identifier_length: usize,

    /// Identifier-quoting function for this engine.
    pub quote: fn(&str) -> String,

    /// Statement separator used in scripts (";", "GO").
    pub statement_separator: String,

    /// Whether the engine supports bulk-copy data blocks in scripts.
    pub supports_bulk_copy: bool,
}

fn quote_double(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl Default for AgentSetting {
    fn default() -> Self {
        Self {
            supports_schemas: true,
            default_schema: None,
            max_identifier_length: 128,
            quote: quote_double,
            statement_separator: ";".to_string(),
            supports_bulk_copy: false,
        }
    }
}

/// One bounded read window into a source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    /// Rows to skip.
    pub offset: u64,

    /// Rows requested; the source may return fewer at the end of the table.
    pub fetch_count: u64,
}

/// Opaque connection handle created by an agent.
///
/// Live connections execute statements against the engine. The dump variant
/// substitutes a script sink implementing the same interface, so agents emit
/// DDL/DML through [`execute`](AgentConnection::execute) without knowing
/// where it lands. Agents downcast via [`as_any`](AgentConnection::as_any)
/// to reach their own engine-specific handle for reads and bulk APIs.
#[async_trait]
pub trait AgentConnection: Send + Sync {
    /// Execute (or serialize) one SQL statement.
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Append preformatted text verbatim (bulk-copy blocks).
    ///
    /// Live connections treat the block as a single statement.
    async fn write_raw(&self, text: &str) -> Result<()> {
        self.execute(text).await
    }

    /// Downcast support for agents reaching their own connection type.
    fn as_any(&self) -> &dyn Any;

    /// Whether this connection serializes to a script instead of executing.
    fn is_script(&self) -> bool {
        false
    }
}

/// The fixed capability set every engine adapter provides.
#[async_trait]
pub trait DialectAgent: Send + Sync {
    /// Dialect identifier this agent registers under (e.g. "postgres").
    fn name(&self) -> &str;

    /// Static engine facts.
    fn setting(&self) -> &AgentSetting;

    // ===== Connections and database lifecycle =====

    /// Open a connection for the given connection string.
    async fn create_connection(&self, connection_string: &str) -> Result<Arc<dyn AgentConnection>>;

    /// Rewrite a connection string to point at a different database.
    fn change_database(&self, connection_string: &str, database: &str) -> Result<String>;

    /// Create the database named by the context's target connection string.
    async fn create_database(&self, ctx: &MigrationContext) -> Result<()>;

    /// Drop the target database if it exists.
    async fn drop_database_if_exists(&self, ctx: &MigrationContext) -> Result<()>;

    /// Drop every object in the target database, keeping the database itself.
    async fn clear_database(&self, ctx: &MigrationContext) -> Result<()>;

    // ===== Metadata =====

    /// Introspect the source database into a canonical descriptor.
    async fn get_source_database_descriptor(
        &self,
        ctx: &MigrationContext,
    ) -> Result<DatabaseDescriptor>;

    /// Create tables, primary keys, uniques and indexes on the target.
    ///
    /// Runs before data transfer so rows have somewhere to land; constraints
    /// that reference other objects wait for
    /// [`post_migrate_target_metadata`](DialectAgent::post_migrate_target_metadata).
    async fn pre_migrate_target_metadata(
        &self,
        descriptor: &DatabaseDescriptor,
        ctx: &MigrationContext,
    ) -> Result<()>;

    /// Create defaults and foreign keys on the target after data transfer.
    async fn post_migrate_target_metadata(
        &self,
        descriptor: &DatabaseDescriptor,
        ctx: &MigrationContext,
    ) -> Result<()>;

    // ===== Data =====

    /// Count the rows of a source table.
    async fn count_source_table(
        &self,
        table: &TableDescriptor,
        ctx: &MigrationContext,
    ) -> Result<u64>;

    /// Read one page of rows from a source table, in a stable order.
    async fn read_source_table(
        &self,
        table: &TableDescriptor,
        page: &PageInfo,
        ctx: &MigrationContext,
    ) -> Result<Vec<Row>>;

    /// Write rows to a target table (live DML, or INSERT text in dump mode).
    async fn write_target_table(
        &self,
        rows: &[Row],
        table: &TableDescriptor,
        ctx: &MigrationContext,
    ) -> Result<()>;

    /// Hook fired once before the first page of a table is written.
    async fn before_write_target_table(
        &self,
        _table: &TableDescriptor,
        _ctx: &MigrationContext,
    ) -> Result<()> {
        Ok(())
    }

    /// Hook fired once after the last page of a table is written.
    ///
    /// This is where an engine advances its identity/sequence generator to
    /// the source's last observed value plus one increment, so post-migration
    /// inserts continue the original numbering.
    async fn after_write_target_table(
        &self,
        _table: &TableDescriptor,
        _ctx: &MigrationContext,
    ) -> Result<()> {
        Ok(())
    }

    // ===== Type and expression pivots =====

    /// Parse an engine store type string into the canonical type tag.
    fn to_common_database_type(&self, store_type: &str) -> Result<DataTypeDescriptor>;

    /// Render a canonical type tag as this engine's store type string.
    fn to_database_store_type(&self, data_type: &DataTypeDescriptor) -> Result<String>;

    /// Canonicalize a default/computed expression.
    ///
    /// May consult the source connection to evaluate expressions it cannot
    /// classify syntactically; results are cached per run keyed by the
    /// literal SQL text (see [`MigrationContext::translate_expression`]).
    async fn to_common_sql_expression(
        &self,
        expression: &str,
        store_type: &str,
        ctx: &MigrationContext,
    ) -> Result<SqlExpressionDescriptor>;

    /// Render a canonical expression in this engine's SQL.
    fn from_common_sql_expression(&self, expression: &SqlExpressionDescriptor) -> Result<String>;
}
