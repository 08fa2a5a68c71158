//! # dbshuttle
//!
//! Engine-agnostic schema and data migration between relational databases.
//!
//! Every engine is presented through one canonical model, so structure,
//! types, default expressions and rows translate pairwise without an
//! explosion of engine-to-engine converters:
//!
//! - **Descriptors** model databases, tables, columns, keys, sequences,
//!   types and expressions in an engine-neutral form
//! - **Dialect agents** adapt concrete engines behind a fixed contract and
//!   are resolved from an explicit registry
//! - **The mapper** reconciles a source-derived descriptor into a valid
//!   target descriptor (collisions, identifier limits, schemas, dangling
//!   references, cross-dialect type/expression conversion)
//! - **The orchestrator** drives metadata and data phases over live
//!   connections or into a SQL dump script, with bounded parallelism and an
//!   adaptive per-table paging loop
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dbshuttle::{AgentRegistry, Config, Migrator};
//!
//! #[tokio::main]
//! async fn main() -> dbshuttle::Result<()> {
//!     let mut registry = AgentRegistry::new();
//!     // registry.register(Arc::new(PostgresAgent::new()));
//!     // registry.register(Arc::new(MssqlAgent::new()));
//!
//!     let config = Config::load("migration.yaml")?;
//!     let result = Migrator::new(config, Arc::new(registry)).run().await?;
//!     println!("migrated {} rows", result.rows_transferred);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod config;
pub mod descriptor;
pub mod dump;
pub mod error;
pub mod events;
pub mod mapper;
pub mod orchestrator;
pub mod transfer;
pub mod value;

#[cfg(test)]
pub(crate) mod testutil;

// Re-exports for convenient access
pub use agent::{
    AgentConnection, AgentRegistry, AgentSetting, DialectAgent, MigrationContext, PageInfo,
};
pub use config::{
    Config, Endpoint, MigrationSetting, NameCase, NameRule, NameStyle, PostScripts,
    TableFailureAction,
};
pub use descriptor::{
    ColumnDescriptor, DataTypeDescriptor, DatabaseDescriptor, ForeignKeyDescriptor,
    IdentityDescriptor, IndexDescriptor, PrimaryKeyDescriptor, ReferentialAction,
    SequenceDescriptor, SqlExpressionDescriptor, TableDescriptor, UniqueDescriptor,
    VendorOptions, WellKnownFunction,
};
pub use dump::{replay_script, ScriptConnection};
pub use error::{MigrateError, Result, TableFailure};
pub use events::{EventHandler, MigrationEvent, MigrationStage, ObjectKind};
pub use mapper::{map_database, MappedDatabase};
pub use orchestrator::{MigrationResult, Migrator};
pub use transfer::{migrate_table, RowSink};
pub use value::{Row, SqlNullKind, SqlValue};
