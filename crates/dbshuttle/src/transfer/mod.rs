//! Adaptive per-table data transfer.
//!
//! One table at a time: fire the before-write hook, count the source, then
//! alternate paged reads against the source with writes into a [`RowSink`]
//! until a short page signals the end, and fire the after-write hook (where
//! engines advance identity/sequence generators). The page size starts at a
//! single row and grows multiplicatively, capped by a byte budget divided by
//! the largest row observed so far, so one oversized row cannot blow the
//! memory envelope of later pages.

use async_trait::async_trait;
use tracing::debug;

use crate::agent::{MigrationContext, PageInfo};
use crate::descriptor::TableDescriptor;
use crate::error::Result;
use crate::events::MigrationEvent;
use crate::value::{estimated_row_size, Row};

/// Destination for rows leaving the adaptive loop.
///
/// The live path and the row-by-row dump path both go through the target
/// agent; the bulk-copy dump path substitutes its own sink.
#[async_trait]
pub trait RowSink: Send + Sync {
    /// Called once before the first page.
    async fn begin_table(&self, table: &TableDescriptor) -> Result<()>;

    /// Write one page of rows.
    async fn write_rows(&self, rows: &[Row], table: &TableDescriptor) -> Result<()>;

    /// Called once after the last page.
    async fn end_table(&self, table: &TableDescriptor) -> Result<()>;
}

/// Sink delegating to the target agent's write path and hooks.
pub struct AgentRowSink<'a> {
    ctx: &'a MigrationContext,
}

impl<'a> AgentRowSink<'a> {
    pub fn new(ctx: &'a MigrationContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl RowSink for AgentRowSink<'_> {
    async fn begin_table(&self, table: &TableDescriptor) -> Result<()> {
        self.ctx
            .target_agent
            .before_write_target_table(table, self.ctx)
            .await
    }

    async fn write_rows(&self, rows: &[Row], table: &TableDescriptor) -> Result<()> {
        self.ctx
            .target_agent
            .write_target_table(rows, table, self.ctx)
            .await
    }

    async fn end_table(&self, table: &TableDescriptor) -> Result<()> {
        self.ctx
            .target_agent
            .after_write_target_table(table, self.ctx)
            .await
    }
}

/// Next page size: grow by the configured multiplier, but never past the
/// byte budget divided by the largest row seen so far (floor 1).
pub(crate) fn next_fetch_count(
    current: u64,
    growth_speed: u64,
    byte_budget: u64,
    max_row_size: u64,
) -> u64 {
    let cap = (byte_budget / max_row_size.max(1)).max(1);
    current.saturating_mul(growth_speed.max(1)).min(cap).max(1)
}

/// Move one table's rows from the source into the sink.
///
/// Reads use the source table descriptor (source-side names), writes use the
/// mapped target descriptor, which is how rows pick up renamed columns as
/// they cross over. Progress is reported after every page; the final event
/// carries `is_final = true`.
///
/// Returns the number of rows migrated.
pub async fn migrate_table(
    ctx: &MigrationContext,
    source_table: &TableDescriptor,
    target_table: &TableDescriptor,
    sink: &dyn RowSink,
) -> Result<u64> {
    sink.begin_table(target_table).await?;

    let total = ctx
        .source_agent
        .count_source_table(source_table, ctx)
        .await?;
    let byte_budget = ctx.setting.fetch_data_max_size;
    let growth_speed = ctx.setting.growth_speed;

    let mut migrated = 0u64;
    let mut fetch_count = 1u64;
    let mut max_row_size = 1u64;

    loop {
        let page = PageInfo {
            offset: migrated,
            fetch_count,
        };
        let rows = ctx
            .source_agent
            .read_source_table(source_table, &page, ctx)
            .await?;
        let returned = rows.len() as u64;

        if returned > 0 {
            for row in &rows {
                max_row_size = max_row_size.max(estimated_row_size(row));
            }
            sink.write_rows(&rows, target_table).await?;
            migrated += returned;
        }

        let is_final = returned < fetch_count;
        ctx.emit(MigrationEvent::TableDataMigrated {
            table: target_table.full_name(),
            migrated_count: migrated,
            total_count: total.max(migrated),
            is_final,
        });

        if is_final {
            break;
        }
        fetch_count = next_fetch_count(fetch_count, growth_speed, byte_budget, max_row_size);
    }

    sink.end_table(target_table).await?;

    debug!(
        "table {} migrated ({} rows)",
        target_table.full_name(),
        migrated
    );
    Ok(migrated)
}
