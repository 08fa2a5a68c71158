//! An in-memory dialect agent used by the integration tests.
//!
//! The "memory" engine keeps databases in a shared store. Its store-type
//! grammar is the canonical spelling itself, DDL is generated as plain SQL
//! text and executed through the connection contract, so the same agent
//! drives live-mode runs, dump-mode runs and script replay.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use dbshuttle::{
    AgentConnection, AgentSetting, DataTypeDescriptor, DatabaseDescriptor, DialectAgent,
    MigrateError, MigrationContext, PageInfo, Result, Row, SqlExpressionDescriptor, SqlValue,
    TableDescriptor,
};
use dbshuttle::descriptor::WellKnownFunction;

/// One in-memory database: structure, rows, identity positions.
#[derive(Default, Clone)]
pub struct MemoryDatabase {
    pub descriptor: DatabaseDescriptor,
    pub rows: HashMap<String, Vec<Row>>,
    pub next_identity: HashMap<String, i64>,
    pub executed: Vec<String>,
}

/// Shared store holding every memory database by name.
#[derive(Default)]
pub struct MemoryStore {
    databases: Mutex<HashMap<String, MemoryDatabase>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn create_database(&self, name: &str, database: MemoryDatabase) {
        self.databases
            .lock()
            .unwrap()
            .insert(name.to_string(), database);
    }

    pub fn with_database<R>(&self, name: &str, f: impl FnOnce(&mut MemoryDatabase) -> R) -> Option<R> {
        self.databases.lock().unwrap().get_mut(name).map(f)
    }

    pub fn snapshot(&self, name: &str) -> Option<MemoryDatabase> {
        self.databases.lock().unwrap().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.databases.lock().unwrap().contains_key(name)
    }

    pub fn remove(&self, name: &str) {
        self.databases.lock().unwrap().remove(name);
    }

    /// Allocate the next identity value for a table, like an insert would.
    pub fn allocate_identity(&self, database: &str, table: &str) -> Option<i64> {
        self.with_database(database, |db| {
            let next = db.next_identity.get(table).copied().unwrap_or(1);
            db.next_identity.insert(table.to_string(), next + 1);
            next
        })
    }
}

/// Connection handle onto the shared store.
pub struct MemoryConnection {
    pub database: String,
    store: Arc<MemoryStore>,
}

#[async_trait]
impl AgentConnection for MemoryConnection {
    async fn execute(&self, sql: &str) -> Result<()> {
        self.store.with_database(&self.database, |db| {
            db.executed.push(sql.to_string());
        });
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A connection that records every statement it receives, for replay tests.
#[derive(Default)]
pub struct RecordingConnection {
    statements: Mutex<Vec<String>>,
}

impl RecordingConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentConnection for RecordingConnection {
    async fn execute(&self, sql: &str) -> Result<()> {
        self.statements.lock().unwrap().push(sql.to_string());
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn quote_memory(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn database_of(connection_string: &str) -> String {
    connection_string
        .strip_prefix("mem://")
        .unwrap_or(connection_string)
        .to_string()
}

/// The in-memory dialect agent.
pub struct MemoryAgent {
    setting: AgentSetting,
    store: Arc<MemoryStore>,
}

impl MemoryAgent {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        let setting = AgentSetting {
            supports_schemas: true,
            default_schema: Some("main".to_string()),
            max_identifier_length: 63,
            quote: quote_memory,
            statement_separator: ";".to_string(),
            supports_bulk_copy: true,
        };
        Self { setting, store }
    }

    fn qualified(&self, table: &TableDescriptor) -> String {
        match &table.schema {
            Some(schema) => format!("{}.{}", quote_memory(schema), quote_memory(&table.name)),
            None => quote_memory(&table.name),
        }
    }

    fn create_table_sql(&self, table: &TableDescriptor) -> Result<String> {
        let mut parts: Vec<String> = Vec::new();
        for column in &table.columns {
            let mut part = format!("{} {}", quote_memory(&column.name), column.store_type);
            if column.is_identity {
                part.push_str(" GENERATED ALWAYS AS IDENTITY");
            }
            if !column.is_nullable {
                part.push_str(" NOT NULL");
            }
            if let Some(default) = &column.default_value {
                part.push_str(&format!(
                    " DEFAULT {}",
                    self.from_common_sql_expression(default)?
                ));
            }
            parts.push(part);
        }
        if let Some(pk) = &table.primary_key {
            let cols: Vec<String> = pk.columns.iter().map(|c| quote_memory(c)).collect();
            parts.push(format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                quote_memory(&pk.name),
                cols.join(", ")
            ));
        }
        Ok(format!(
            "CREATE TABLE {} ({})",
            self.qualified(table),
            parts.join(", ")
        ))
    }
}

#[async_trait]
impl DialectAgent for MemoryAgent {
    fn name(&self) -> &str {
        "memory"
    }

    fn setting(&self) -> &AgentSetting {
        &self.setting
    }

    async fn create_connection(&self, connection_string: &str) -> Result<Arc<dyn AgentConnection>> {
        Ok(Arc::new(MemoryConnection {
            database: database_of(connection_string),
            store: self.store.clone(),
        }))
    }

    fn change_database(&self, _connection_string: &str, database: &str) -> Result<String> {
        Ok(format!("mem://{}", database))
    }

    async fn create_database(&self, ctx: &MigrationContext) -> Result<()> {
        let name = database_of(&ctx.target_connection_string);
        if !self.store.contains(&name) {
            self.store.create_database(&name, MemoryDatabase::default());
        }
        Ok(())
    }

    async fn drop_database_if_exists(&self, ctx: &MigrationContext) -> Result<()> {
        self.store.remove(&database_of(&ctx.target_connection_string));
        Ok(())
    }

    async fn clear_database(&self, ctx: &MigrationContext) -> Result<()> {
        let name = database_of(&ctx.target_connection_string);
        self.store.with_database(&name, |db| {
            *db = MemoryDatabase::default();
        });
        Ok(())
    }

    async fn get_source_database_descriptor(
        &self,
        ctx: &MigrationContext,
    ) -> Result<DatabaseDescriptor> {
        let name = database_of(&ctx.source_connection_string);
        self.store
            .snapshot(&name)
            .map(|db| db.descriptor)
            .ok_or_else(|| MigrateError::Metadata(format!("no such memory database: {}", name)))
    }

    async fn pre_migrate_target_metadata(
        &self,
        descriptor: &DatabaseDescriptor,
        ctx: &MigrationContext,
    ) -> Result<()> {
        for table in &descriptor.tables {
            let sql = self.create_table_sql(table)?;
            ctx.target_connection.execute(&sql).await?;

            for index in &table.indexes {
                let cols: Vec<String> = index.columns.iter().map(|c| quote_memory(c)).collect();
                let unique = if index.is_unique { "UNIQUE " } else { "" };
                ctx.target_connection
                    .execute(&format!(
                        "CREATE {}INDEX {} ON {} ({})",
                        unique,
                        quote_memory(&index.name),
                        self.qualified(table),
                        cols.join(", ")
                    ))
                    .await?;
            }
        }

        if !ctx.target_connection.is_script() {
            let name = database_of(&ctx.target_connection_string);
            self.store.with_database(&name, |db| {
                db.descriptor = descriptor.clone();
                for table in &descriptor.tables {
                    db.rows.entry(table.full_name()).or_default();
                    if let Some(identity) = table.identity_column().and_then(|c| c.identity.as_ref())
                    {
                        db.next_identity
                            .insert(table.full_name(), identity.start_value);
                    }
                }
            });
        }
        Ok(())
    }

    async fn post_migrate_target_metadata(
        &self,
        descriptor: &DatabaseDescriptor,
        ctx: &MigrationContext,
    ) -> Result<()> {
        for table in &descriptor.tables {
            for fk in &table.foreign_keys {
                let cols: Vec<String> = fk.columns.iter().map(|c| quote_memory(c)).collect();
                let pcols: Vec<String> =
                    fk.principal_columns.iter().map(|c| quote_memory(c)).collect();
                let principal = match &fk.principal_schema {
                    Some(schema) => format!(
                        "{}.{}",
                        quote_memory(schema),
                        quote_memory(&fk.principal_table)
                    ),
                    None => quote_memory(&fk.principal_table),
                };
                ctx.target_connection
                    .execute(&format!(
                        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                        self.qualified(table),
                        quote_memory(&fk.name),
                        cols.join(", "),
                        principal,
                        pcols.join(", ")
                    ))
                    .await?;
            }
        }
        Ok(())
    }

    async fn count_source_table(
        &self,
        table: &TableDescriptor,
        ctx: &MigrationContext,
    ) -> Result<u64> {
        let name = database_of(&ctx.source_connection_string);
        Ok(self
            .store
            .with_database(&name, |db| {
                db.rows.get(&table.full_name()).map_or(0, Vec::len) as u64
            })
            .unwrap_or(0))
    }

    async fn read_source_table(
        &self,
        table: &TableDescriptor,
        page: &PageInfo,
        ctx: &MigrationContext,
    ) -> Result<Vec<Row>> {
        let name = database_of(&ctx.source_connection_string);
        Ok(self
            .store
            .with_database(&name, |db| {
                let rows = db.rows.get(&table.full_name()).cloned().unwrap_or_default();
                let start = (page.offset as usize).min(rows.len());
                let end = (start + page.fetch_count as usize).min(rows.len());
                rows[start..end].to_vec()
            })
            .unwrap_or_default())
    }

    async fn write_target_table(
        &self,
        rows: &[Row],
        table: &TableDescriptor,
        ctx: &MigrationContext,
    ) -> Result<()> {
        if ctx.target_connection.is_script() {
            let cols: Vec<String> = table.columns.iter().map(|c| quote_memory(&c.name)).collect();
            for row in rows {
                let values: Vec<String> = row.iter().map(SqlValue::to_sql_literal).collect();
                ctx.target_connection
                    .execute(&format!(
                        "INSERT INTO {} ({}) VALUES ({})",
                        self.qualified(table),
                        cols.join(", "),
                        values.join(", ")
                    ))
                    .await?;
            }
            return Ok(());
        }

        let name = database_of(&ctx.target_connection_string);
        self.store.with_database(&name, |db| {
            db.rows
                .entry(table.full_name())
                .or_default()
                .extend(rows.iter().cloned());
        });
        Ok(())
    }

    async fn after_write_target_table(
        &self,
        table: &TableDescriptor,
        ctx: &MigrationContext,
    ) -> Result<()> {
        let Some(identity) = table.identity_column().and_then(|c| c.identity.as_ref()) else {
            return Ok(());
        };
        let Some(current) = identity.current_value else {
            return Ok(());
        };
        let next = current + identity.increment;

        if ctx.target_connection.is_script() {
            let column = table.identity_column().map(|c| c.name.clone()).unwrap_or_default();
            ctx.target_connection
                .execute(&format!(
                    "ALTER TABLE {} ALTER COLUMN {} RESTART WITH {}",
                    self.qualified(table),
                    quote_memory(&column),
                    next
                ))
                .await?;
            return Ok(());
        }

        let name = database_of(&ctx.target_connection_string);
        self.store.with_database(&name, |db| {
            db.next_identity.insert(table.full_name(), next);
        });
        Ok(())
    }

    fn to_common_database_type(&self, store_type: &str) -> Result<DataTypeDescriptor> {
        store_type
            .parse()
            .map_err(|_| MigrateError::UnsupportedType {
                dialect: "memory".to_string(),
                store_type: store_type.to_string(),
            })
    }

    fn to_database_store_type(&self, data_type: &DataTypeDescriptor) -> Result<String> {
        Ok(data_type.to_string())
    }

    async fn to_common_sql_expression(
        &self,
        expression: &str,
        _store_type: &str,
        _ctx: &MigrationContext,
    ) -> Result<SqlExpressionDescriptor> {
        let lowered = expression.trim().to_lowercase();
        let parsed = match lowered.as_str() {
            "now()" => SqlExpressionDescriptor::Function(WellKnownFunction::Now),
            "uuid()" => SqlExpressionDescriptor::Function(WellKnownFunction::Uuid),
            "current_date" => SqlExpressionDescriptor::Function(WellKnownFunction::CurrentDate),
            _ => {
                if let Ok(n) = lowered.parse::<i64>() {
                    SqlExpressionDescriptor::Literal(SqlValue::I64(n))
                } else {
                    SqlExpressionDescriptor::Raw(expression.to_string())
                }
            }
        };
        Ok(parsed)
    }

    fn from_common_sql_expression(
        &self,
        expression: &SqlExpressionDescriptor,
    ) -> Result<String> {
        let rendered = match expression {
            SqlExpressionDescriptor::Function(WellKnownFunction::Now) => "now()".to_string(),
            SqlExpressionDescriptor::Function(WellKnownFunction::Uuid) => "uuid()".to_string(),
            SqlExpressionDescriptor::Function(WellKnownFunction::CurrentDate) => {
                "current_date".to_string()
            }
            SqlExpressionDescriptor::Function(WellKnownFunction::CurrentTime) => {
                "current_time".to_string()
            }
            SqlExpressionDescriptor::Literal(value) => value.to_sql_literal(),
            SqlExpressionDescriptor::Raw(raw) => raw.clone(),
        };
        Ok(rendered)
    }
}
