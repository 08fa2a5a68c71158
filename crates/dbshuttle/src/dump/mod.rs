//! SQL dump production and replay.
//!
//! In dump mode the orchestrator swaps the live target connection for a
//! [`ScriptConnection`]: agents keep emitting DDL/DML through the normal
//! contract and the statements land in a UTF-8 script file, one logical unit
//! per statement. Data goes either row-by-row (the agent's INSERT path) or,
//! with `optimize_insertion` on a bulk-capable target, as `COPY ... FROM
//! STDIN` blocks of tab-separated rows terminated by a `\.` line.
//!
//! [`replay_script`] is the inverse: it parses a previously produced script
//! back into logical units and executes them against a live connection,
//! independent of the orchestrator.

use std::any::Any;
use std::path::Path;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::agent::{AgentConnection, MigrationContext};
use crate::descriptor::TableDescriptor;
use crate::error::{MigrateError, Result};
use crate::transfer::RowSink;
use crate::value::{Row, SqlValue};

/// Terminator line closing a bulk-copy data block.
pub const COPY_TERMINATOR: &str = "\\.";

/// A target "connection" that serializes statements into a script file.
pub struct ScriptConnection {
    writer: Mutex<BufWriter<File>>,
    statement_separator: String,
}

impl ScriptConnection {
    /// Create the script file, truncating any previous content.
    pub async fn create(path: &Path, statement_separator: &str) -> Result<Self> {
        let file = File::create(path).await?;
        info!("writing SQL dump to {}", path.display());
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            statement_separator: statement_separator.to_string(),
        })
    }

    /// Flush buffered script content to disk.
    pub async fn flush(&self) -> Result<()> {
        self.writer.lock().await.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl AgentConnection for ScriptConnection {
    async fn execute(&self, sql: &str) -> Result<()> {
        let mut writer = self.writer.lock().await;
        let statement = sql.trim_end();
        if self.statement_separator == ";" {
            writer.write_all(statement.as_bytes()).await?;
            if !statement.ends_with(';') {
                writer.write_all(b";").await?;
            }
            writer.write_all(b"\n").await?;
        } else {
            // Line-oriented separators (GO) stand on their own line.
            writer.write_all(statement.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer
                .write_all(self.statement_separator.as_bytes())
                .await?;
            writer.write_all(b"\n").await?;
        }
        Ok(())
    }

    async fn write_raw(&self, text: &str) -> Result<()> {
        self.writer.lock().await.write_all(text.as_bytes()).await?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_script(&self) -> bool {
        true
    }
}

/// Escape one value for the tab-separated text of a COPY block.
fn copy_field(value: &SqlValue) -> String {
    match value {
        SqlValue::Null(_) => "\\N".to_string(),
        SqlValue::Bool(true) => "t".to_string(),
        SqlValue::Bool(false) => "f".to_string(),
        SqlValue::Text(s) => copy_escape(s),
        SqlValue::Bytes(b) => {
            let hex: String = b.iter().map(|byte| format!("{:02x}", byte)).collect();
            format!("\\\\x{}", hex)
        }
        SqlValue::I16(v) => v.to_string(),
        SqlValue::I32(v) => v.to_string(),
        SqlValue::I64(v) => v.to_string(),
        SqlValue::F32(v) => v.to_string(),
        SqlValue::F64(v) => v.to_string(),
        SqlValue::Uuid(u) => u.to_string(),
        SqlValue::Decimal(d) => d.to_string(),
        SqlValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        SqlValue::DateTimeOffset(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f%:z").to_string(),
        SqlValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        SqlValue::Time(t) => t.format("%H:%M:%S%.f").to_string(),
    }
}

/// Escape backslash, tab, newline and carriage return for COPY text format.
fn copy_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// Sink writing bulk-copy blocks into the dump script.
///
/// Used when `optimize_insertion` is set and the target dialect supports
/// bulk copy; otherwise the dump goes through the agent's row-by-row INSERT
/// path. Hooks still run through the agent so identity/sequence fixups land
/// in the script around the data block.
pub struct BulkCopyRowSink<'a> {
    ctx: &'a MigrationContext,
    started: StdMutex<bool>,
}

impl<'a> BulkCopyRowSink<'a> {
    pub fn new(ctx: &'a MigrationContext) -> Self {
        Self {
            ctx,
            started: StdMutex::new(false),
        }
    }

    fn header(&self, table: &TableDescriptor) -> String {
        let quote = self.ctx.target_agent.setting().quote;
        let qualified = match &table.schema {
            Some(schema) => format!("{}.{}", quote(schema), quote(&table.name)),
            None => quote(&table.name),
        };
        let columns: Vec<String> = table.columns.iter().map(|c| quote(&c.name)).collect();
        format!("COPY {} ({}) FROM STDIN;\n", qualified, columns.join(", "))
    }
}

#[async_trait]
impl RowSink for BulkCopyRowSink<'_> {
    async fn begin_table(&self, table: &TableDescriptor) -> Result<()> {
        self.ctx
            .target_agent
            .before_write_target_table(table, self.ctx)
            .await
    }

    async fn write_rows(&self, rows: &[Row], table: &TableDescriptor) -> Result<()> {
        let mut block = String::new();
        {
            let mut started = self.started.lock().expect("bulk sink state poisoned");
            if !*started {
                block.push_str(&self.header(table));
                *started = true;
            }
        }
        for row in rows {
            let fields: Vec<String> = row.iter().map(copy_field).collect();
            block.push_str(&fields.join("\t"));
            block.push('\n');
        }
        self.ctx.target_connection.write_raw(&block).await
    }

    async fn end_table(&self, table: &TableDescriptor) -> Result<()> {
        let started = *self.started.lock().expect("bulk sink state poisoned");
        if started {
            self.ctx
                .target_connection
                .write_raw(&format!("{}\n", COPY_TERMINATOR))
                .await?;
        }
        self.ctx
            .target_agent
            .after_write_target_table(table, self.ctx)
            .await
    }
}

/// One logical unit of a parsed script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScriptUnit {
    /// A plain SQL statement, separator stripped.
    Statement(String),
    /// A full bulk-copy block including header and terminator line.
    CopyBlock(String),
}

/// Split a dump script into statements and copy blocks.
pub(crate) fn split_script(content: &str, separator: &str) -> Vec<ScriptUnit> {
    let mut units = Vec::new();
    let mut statement = String::new();
    let mut copy_block: Option<String> = None;

    for line in content.lines() {
        if let Some(block) = &mut copy_block {
            block.push_str(line);
            block.push('\n');
            if line.trim() == COPY_TERMINATOR {
                units.push(ScriptUnit::CopyBlock(copy_block.take().unwrap_or_default()));
            }
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let lowered = trimmed.to_lowercase();
        if lowered.starts_with("copy ") && lowered.contains("from stdin") {
            let mut block = String::from(line);
            block.push('\n');
            copy_block = Some(block);
            continue;
        }

        if separator != ";" && trimmed.eq_ignore_ascii_case(separator) {
            if !statement.trim().is_empty() {
                units.push(ScriptUnit::Statement(statement.trim().to_string()));
            }
            statement.clear();
            continue;
        }

        statement.push_str(line);
        if separator == ";" && trimmed.ends_with(';') {
            let full = statement.trim().trim_end_matches(';').trim().to_string();
            if !full.is_empty() {
                units.push(ScriptUnit::Statement(full));
            }
            statement.clear();
        } else {
            statement.push('\n');
        }
    }

    if !statement.trim().is_empty() {
        units.push(ScriptUnit::Statement(
            statement.trim().trim_end_matches(';').trim().to_string(),
        ));
    }

    units
}

/// Execute a previously produced dump script against a live connection.
///
/// Statements run one at a time through [`AgentConnection::execute`];
/// bulk-copy blocks are handed over whole via
/// [`AgentConnection::write_raw`]. Returns the number of units executed.
pub async fn replay_script(
    path: &Path,
    connection: &dyn AgentConnection,
    statement_separator: &str,
) -> Result<u64> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| MigrateError::Script(format!("cannot read {}: {}", path.display(), e)))?;

    let units = split_script(&content, statement_separator);
    info!(
        "replaying {} ({} units)",
        path.display(),
        units.len()
    );

    let mut executed = 0u64;
    for unit in units {
        match unit {
            ScriptUnit::Statement(sql) => connection.execute(&sql).await?,
            ScriptUnit::CopyBlock(block) => connection.write_raw(&block).await?,
        }
        executed += 1;
        debug!("replayed unit {}", executed);
    }

    Ok(executed)
}
