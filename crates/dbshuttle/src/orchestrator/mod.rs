//! Migration orchestrator - main workflow coordinator.
//!
//! Drives one end-to-end run as a strictly ordered sequence of phases:
//!
//! ```text
//! Connect -> ReadSourceMetadata -> MapDescriptor -> ApplyAgentSettings
//!   -> CreateTargetDatabase -> PreMetadata -> DataTransfer
//!   -> PostMetadata -> CustomScripts -> Done
//! ```
//!
//! Any phase error aborts the run. There is no automatic rollback of DDL
//! already applied to the target; the operator reconciles, typically with
//! `drop_target_database_if_exists` on the next attempt.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::agent::{AgentConnection, AgentRegistry, MigrationContext};
use crate::config::{Config, TableFailureAction};
use crate::descriptor::TableDescriptor;
use crate::dump::{split_script, BulkCopyRowSink, ScriptConnection};
use crate::error::{MigrateError, Result, TableFailure};
use crate::events::{noop_handler, EventHandler, MigrationEvent, MigrationStage, ObjectKind};
use crate::mapper::{self, MappedDatabase};
use crate::transfer::{migrate_table, AgentRowSink};

/// Migration orchestrator.
pub struct Migrator {
    config: Config,
    registry: Arc<AgentRegistry>,
    events: EventHandler,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Tables selected for migration.
    pub tables_total: usize,

    /// Tables whose data migrated successfully.
    pub tables_migrated: usize,

    /// Total rows transferred.
    pub rows_transferred: u64,

    /// Tables that failed, non-empty only under the `continue` policy.
    pub failed_tables: Vec<String>,
}

impl Migrator {
    /// Create a new migrator from a validated configuration and a registry
    /// holding (at least) the two agents the configuration names.
    pub fn new(config: Config, registry: Arc<AgentRegistry>) -> Self {
        Self {
            config,
            registry,
            events: noop_handler(),
        }
    }

    /// Install an event handler observing stage changes, object creation
    /// and per-table data progress.
    pub fn with_event_handler(mut self, events: EventHandler) -> Self {
        self.events = events;
        self
    }

    /// Run the migration.
    pub async fn run(&self) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let setting = Arc::new(self.config.migration.clone());

        // Phase: Connect
        self.stage(MigrationStage::Connect);
        let source_agent = self.registry.require(&self.config.source.agent)?;
        let target_agent = self.registry.require(&self.config.target.agent)?;
        info!(
            "migrating {} -> {}{}",
            source_agent.name(),
            target_agent.name(),
            if setting.is_dump_mode() { " (dump mode)" } else { "" }
        );

        let source_connection = source_agent
            .create_connection(&self.config.source.connection_string)
            .await?;
        let target_connection: Arc<dyn AgentConnection> = match &setting.dump_file {
            Some(path) => Arc::new(
                ScriptConnection::create(path, &target_agent.setting().statement_separator)
                    .await?,
            ),
            None => {
                target_agent
                    .create_connection(&self.config.target.connection_string)
                    .await?
            }
        };

        let ctx = Arc::new(MigrationContext::new(
            source_agent.clone(),
            target_agent.clone(),
            source_connection,
            target_connection,
            self.config.source.connection_string.clone(),
            self.config.target.connection_string.clone(),
            setting.clone(),
            self.events.clone(),
        ));

        // Phase: ReadSourceMetadata
        self.stage(MigrationStage::ReadSourceMetadata);
        let source_descriptor = source_agent.get_source_database_descriptor(&ctx).await?;
        info!(
            "source descriptor: {} tables, {} sequences",
            source_descriptor.tables.len(),
            source_descriptor.sequences.len()
        );

        // Phase: MapDescriptor
        self.stage(MigrationStage::MapDescriptor);
        let mapped = mapper::map_database(&source_descriptor, &ctx).await?;

        // Phase: ApplyAgentSettings
        self.stage(MigrationStage::ApplyAgentSettings);
        debug!(
            "target settings applied: max identifier length {}, separator {:?}",
            target_agent.setting().max_identifier_length,
            target_agent.setting().statement_separator
        );

        // Phase: CreateTargetDatabase (skipped entirely in dump mode)
        self.stage(MigrationStage::CreateTargetDatabase);
        if !setting.is_dump_mode() {
            if setting.create_target_database {
                if setting.drop_target_database_if_exists {
                    info!("dropping target database if it exists");
                    target_agent.drop_database_if_exists(&ctx).await?;
                }
                info!("creating target database");
                target_agent.create_database(&ctx).await?;
            } else if setting.include_meta {
                // Migrating into an existing database: metadata recreation
                // needs the old objects out of the way first.
                info!("clearing existing target database objects");
                target_agent.clear_database(&ctx).await?;
            }
        }

        // Phase: PreMetadata
        self.stage(MigrationStage::PreMetadata);
        if setting.include_meta {
            target_agent
                .pre_migrate_target_metadata(&mapped.target, &ctx)
                .await?;
            for table in &mapped.target.tables {
                ctx.emit(MigrationEvent::ObjectCreated {
                    kind: ObjectKind::Table,
                    name: table.name.clone(),
                    parent: table.schema.clone(),
                });
            }
            for sequence in &mapped.target.sequences {
                ctx.emit(MigrationEvent::ObjectCreated {
                    kind: ObjectKind::Sequence,
                    name: sequence.name.clone(),
                    parent: sequence.schema.clone(),
                });
            }
        }

        // Phase: DataTransfer
        self.stage(MigrationStage::DataTransfer);
        let (rows_transferred, failures) = if setting.include_data {
            self.transfer_data(&ctx, &mapped).await?
        } else {
            (0, Vec::new())
        };

        if !failures.is_empty() {
            match setting.on_table_failure {
                TableFailureAction::Abort => {
                    return Err(MigrateError::TableFailures(failures));
                }
                TableFailureAction::Continue => {
                    for failure in &failures {
                        warn!("table {} failed: {}", failure.table, failure.message);
                    }
                }
            }
        }

        // Phase: PostMetadata
        self.stage(MigrationStage::PostMetadata);
        if setting.include_meta {
            target_agent
                .post_migrate_target_metadata(&mapped.target, &ctx)
                .await?;
            for table in &mapped.target.tables {
                for fk in &table.foreign_keys {
                    ctx.emit(MigrationEvent::ObjectCreated {
                        kind: ObjectKind::ForeignKey,
                        name: fk.name.clone(),
                        parent: Some(table.full_name()),
                    });
                }
            }
        }

        // Phase: CustomScripts
        self.stage(MigrationStage::CustomScripts);
        self.run_post_scripts(&ctx).await?;

        // Phase: Done
        if let Some(script) = ctx.target_connection.as_any().downcast_ref::<ScriptConnection>() {
            script.flush().await?;
        }
        self.stage(MigrationStage::Done);

        let completed_at = Utc::now();
        let duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
        let tables_total = mapped.target.tables.len();
        let failed_tables: Vec<String> = failures.iter().map(|f| f.table.clone()).collect();

        let result = MigrationResult {
            started_at,
            completed_at,
            duration_seconds,
            tables_total,
            tables_migrated: tables_total - failed_tables.len(),
            rows_transferred,
            failed_tables,
        };

        info!(
            "migration finished: {}/{} tables, {} rows in {:.1}s",
            result.tables_migrated,
            result.tables_total,
            result.rows_transferred,
            result.duration_seconds
        );

        Ok(result)
    }

    /// Transfer data for all tables, sequentially or in parallel.
    async fn transfer_data(
        &self,
        ctx: &Arc<MigrationContext>,
        mapped: &MappedDatabase,
    ) -> Result<(u64, Vec<TableFailure>)> {
        let setting = &ctx.setting;
        let workers = setting.effective_task_count();

        if workers <= 1 {
            return self.transfer_sequential(ctx, mapped).await;
        }
        self.transfer_parallel(ctx, mapped, workers).await
    }

    /// One table at a time, in source-descriptor order.
    async fn transfer_sequential(
        &self,
        ctx: &Arc<MigrationContext>,
        mapped: &MappedDatabase,
    ) -> Result<(u64, Vec<TableFailure>)> {
        let setting = &ctx.setting;
        let bulk_dump = setting.is_dump_mode()
            && setting.optimize_insertion
            && ctx.target_agent.setting().supports_bulk_copy;

        let mut rows_transferred = 0u64;
        let mut failures = Vec::new();

        for (source_table, target_table) in mapped.source.tables.iter().zip(&mapped.target.tables)
        {
            let outcome = if bulk_dump {
                let sink = BulkCopyRowSink::new(ctx);
                migrate_table(ctx, source_table, target_table, &sink).await
            } else {
                let sink = AgentRowSink::new(ctx);
                migrate_table(ctx, source_table, target_table, &sink).await
            };

            match outcome {
                Ok(rows) => rows_transferred += rows,
                Err(e) => match setting.on_table_failure {
                    TableFailureAction::Abort => return Err(e),
                    TableFailureAction::Continue => {
                        failures.push(TableFailure {
                            table: target_table.full_name(),
                            message: e.to_string(),
                        });
                    }
                },
            }
        }

        Ok((rows_transferred, failures))
    }

    /// One task per table under a bounded worker pool, each task on a forked
    /// context with its own pair of connections. All tasks are joined and
    /// their errors collected; nothing is fire-and-forget.
    async fn transfer_parallel(
        &self,
        ctx: &Arc<MigrationContext>,
        mapped: &MappedDatabase,
        workers: usize,
    ) -> Result<(u64, Vec<TableFailure>)> {
        info!(
            "transferring {} tables with up to {} parallel tasks",
            mapped.target.tables.len(),
            workers
        );

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut handles = Vec::new();

        for (source_table, target_table) in mapped.source.tables.iter().zip(&mapped.target.tables)
        {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("transfer semaphore closed");

            let base = ctx.clone();
            let source_table: TableDescriptor = source_table.clone();
            let target_table: TableDescriptor = target_table.clone();
            let job_name = target_table.full_name();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let task_ctx = base.fork().await?;
                let sink = AgentRowSink::new(&task_ctx);
                migrate_table(&task_ctx, &source_table, &target_table, &sink).await
            });

            handles.push((job_name, handle));
        }

        let mut rows_transferred = 0u64;
        let mut failures = Vec::new();

        for (job_name, handle) in handles {
            match handle.await {
                Ok(Ok(rows)) => {
                    debug!("{}: completed ({} rows)", job_name, rows);
                    rows_transferred += rows;
                }
                Ok(Err(e)) => {
                    error!("{}: failed - {}", job_name, e);
                    failures.push(TableFailure {
                        table: job_name,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    error!("{}: task panicked - {}", job_name, e);
                    failures.push(TableFailure {
                        table: job_name,
                        message: format!("task panicked: {}", e),
                    });
                }
            }
        }

        Ok((rows_transferred, failures))
    }

    /// Execute user-supplied post scripts against the target.
    ///
    /// In dump mode the statements append to the script like everything
    /// else, because the script sink sits behind the same connection trait.
    async fn run_post_scripts(&self, ctx: &MigrationContext) -> Result<()> {
        let scripts = &ctx.setting.post_scripts;
        for file in &scripts.files {
            let content = tokio::fs::read_to_string(file).await.map_err(|e| {
                MigrateError::Script(format!("cannot read post script {}: {}", file.display(), e))
            })?;

            let units = split_script(&content, &scripts.statement_separator);
            info!(
                "running post script {} ({} statements)",
                file.display(),
                units.len()
            );
            for unit in units {
                match unit {
                    crate::dump::ScriptUnit::Statement(sql) => {
                        ctx.target_connection.execute(&sql).await?
                    }
                    crate::dump::ScriptUnit::CopyBlock(block) => {
                        ctx.target_connection.write_raw(&block).await?
                    }
                }
            }
        }
        Ok(())
    }

    fn stage(&self, stage: MigrationStage) {
        debug!("entering stage {:?}", stage);
        (self.events)(&MigrationEvent::StageChanged(stage));
    }
}
