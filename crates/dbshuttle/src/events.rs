//! Migration progress events surfaced to callers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Orchestration phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MigrationStage {
    /// Resolving agents and opening connections.
    Connect,
    /// Extracting the source database descriptor.
    ReadSourceMetadata,
    /// Reconciling the source descriptor into a target descriptor.
    MapDescriptor,
    /// Propagating target agent settings into the run context.
    ApplyAgentSettings,
    /// Creating (optionally dropping first) the target database.
    CreateTargetDatabase,
    /// Creating tables, keys and indexes on the target.
    PreMetadata,
    /// Transferring table data.
    DataTransfer,
    /// Creating defaults and foreign keys on the target.
    PostMetadata,
    /// Running user-supplied post scripts.
    CustomScripts,
    /// Run finished.
    Done,
}

/// Kind of schema object reported by [`MigrationEvent::ObjectCreated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Schema,
    Table,
    Column,
    PrimaryKey,
    Unique,
    Index,
    ForeignKey,
    Sequence,
}

/// Events emitted during a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MigrationEvent {
    /// The orchestrator entered a new phase.
    StageChanged(MigrationStage),

    /// A schema object was created on the target.
    ObjectCreated {
        kind: ObjectKind,
        name: String,
        /// Owning object, e.g. the table of an index.
        parent: Option<String>,
    },

    /// A data page for a table finished writing.
    TableDataMigrated {
        table: String,
        /// Rows written so far for this table.
        migrated_count: u64,
        /// Total row estimate for this table.
        total_count: u64,
        /// Whether this was the final page.
        is_final: bool,
    },
}

/// Callback installed by callers to observe migration events.
pub type EventHandler = Arc<dyn Fn(&MigrationEvent) + Send + Sync>;

/// An event handler that discards everything.
pub(crate) fn noop_handler() -> EventHandler {
    Arc::new(|_| {})
}
