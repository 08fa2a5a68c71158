//! Shared fakes for unit tests: two toy dialects with distinct type
//! grammars, inert connections, and a context builder.

use std::any::Any;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::agent::{
    AgentConnection, AgentSetting, DialectAgent, MigrationContext, PageInfo,
};
use crate::config::MigrationSetting;
use crate::descriptor::{
    DataTypeDescriptor, DatabaseDescriptor, SqlExpressionDescriptor, TableDescriptor,
    WellKnownFunction,
};
use crate::error::{MigrateError, Result};
use crate::events::noop_handler;
use crate::value::{Row, SqlValue};

/// Connection that accepts and ignores everything.
pub struct NullConnection;

#[async_trait]
impl AgentConnection for NullConnection {
    async fn execute(&self, _sql: &str) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Connection that records every executed statement.
#[derive(Default)]
pub struct RecordingConnection {
    statements: Mutex<Vec<String>>,
}

impl RecordingConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
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

/// Which toy dialect a [`FakeAgent`] speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeDialect {
    /// SQL-Server-flavored spellings (NVARCHAR, DATETIME2, getdate()).
    Ms,
    /// Postgres-flavored spellings (int8, character varying, now()).
    Pg,
}

/// A minimal dialect agent good enough for mapper and transfer unit tests.
///
/// Carries an in-memory row store: seed `source_rows` to drive reads, and
/// inspect `written_rows`, `requested_pages` and `hook_log` afterwards.
pub struct FakeAgent {
    dialect: FakeDialect,
    setting: AgentSetting,
    pub source_descriptor: Mutex<DatabaseDescriptor>,
    pub source_rows: Mutex<Vec<Row>>,
    pub written_rows: Mutex<Vec<Row>>,
    pub requested_pages: Mutex<Vec<PageInfo>>,
    pub hook_log: Mutex<Vec<String>>,
    /// Table names whose writes should fail, for failure-policy tests.
    pub fail_writes_for: Mutex<Vec<String>>,
}

impl FakeAgent {
    pub fn new(dialect: FakeDialect) -> Self {
        let setting = AgentSetting {
            default_schema: Some(
                match dialect {
                    FakeDialect::Ms => "dbo",
                    FakeDialect::Pg => "public",
                }
                .to_string(),
            ),
            max_identifier_length: match dialect {
                FakeDialect::Ms => 128,
                FakeDialect::Pg => 63,
            },
            ..Default::default()
        };
        Self {
            dialect,
            setting,
            source_descriptor: Mutex::new(DatabaseDescriptor::default()),
            source_rows: Mutex::new(Vec::new()),
            written_rows: Mutex::new(Vec::new()),
            requested_pages: Mutex::new(Vec::new()),
            hook_log: Mutex::new(Vec::new()),
            fail_writes_for: Mutex::new(Vec::new()),
        }
    }

    pub fn seed_descriptor(&self, descriptor: DatabaseDescriptor) {
        *self.source_descriptor.lock().unwrap() = descriptor;
    }

    pub fn seed_rows(&self, rows: Vec<Row>) {
        *self.source_rows.lock().unwrap() = rows;
    }

    pub fn fail_writes_on(&self, table: &str) {
        self.fail_writes_for.lock().unwrap().push(table.to_string());
    }

    pub fn written(&self) -> Vec<Row> {
        self.written_rows.lock().unwrap().clone()
    }

    pub fn pages(&self) -> Vec<PageInfo> {
        self.requested_pages.lock().unwrap().clone()
    }

    pub fn hooks(&self) -> Vec<String> {
        self.hook_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl DialectAgent for FakeAgent {
    fn name(&self) -> &str {
        match self.dialect {
            FakeDialect::Ms => "ms",
            FakeDialect::Pg => "pg",
        }
    }

    fn setting(&self) -> &AgentSetting {
        &self.setting
    }

    async fn create_connection(
        &self,
        _connection_string: &str,
    ) -> Result<Arc<dyn AgentConnection>> {
        Ok(Arc::new(NullConnection))
    }

    fn change_database(&self, _connection_string: &str, database: &str) -> Result<String> {
        Ok(database.to_string())
    }

    async fn create_database(&self, _ctx: &MigrationContext) -> Result<()> {
        Ok(())
    }

    async fn drop_database_if_exists(&self, _ctx: &MigrationContext) -> Result<()> {
        Ok(())
    }

    async fn clear_database(&self, _ctx: &MigrationContext) -> Result<()> {
        self.hook_log.lock().unwrap().push("clear".to_string());
        Ok(())
    }

    async fn get_source_database_descriptor(
        &self,
        _ctx: &MigrationContext,
    ) -> Result<DatabaseDescriptor> {
        Ok(self.source_descriptor.lock().unwrap().clone())
    }

    async fn pre_migrate_target_metadata(
        &self,
        _descriptor: &DatabaseDescriptor,
        _ctx: &MigrationContext,
    ) -> Result<()> {
        Ok(())
    }

    async fn post_migrate_target_metadata(
        &self,
        _descriptor: &DatabaseDescriptor,
        _ctx: &MigrationContext,
    ) -> Result<()> {
        Ok(())
    }

    async fn count_source_table(
        &self,
        _table: &TableDescriptor,
        _ctx: &MigrationContext,
    ) -> Result<u64> {
        Ok(self.source_rows.lock().unwrap().len() as u64)
    }

    async fn read_source_table(
        &self,
        _table: &TableDescriptor,
        page: &PageInfo,
        _ctx: &MigrationContext,
    ) -> Result<Vec<Row>> {
        self.requested_pages.lock().unwrap().push(*page);
        let rows = self.source_rows.lock().unwrap();
        let start = (page.offset as usize).min(rows.len());
        let end = (start + page.fetch_count as usize).min(rows.len());
        Ok(rows[start..end].to_vec())
    }

    async fn write_target_table(
        &self,
        rows: &[Row],
        table: &TableDescriptor,
        _ctx: &MigrationContext,
    ) -> Result<()> {
        if self
            .fail_writes_for
            .lock()
            .unwrap()
            .iter()
            .any(|t| *t == table.name)
        {
            return Err(MigrateError::transfer(table.full_name(), "injected failure"));
        }
        self.written_rows.lock().unwrap().extend(rows.iter().cloned());
        Ok(())
    }

    async fn before_write_target_table(
        &self,
        table: &TableDescriptor,
        _ctx: &MigrationContext,
    ) -> Result<()> {
        self.hook_log
            .lock()
            .unwrap()
            .push(format!("before:{}", table.full_name()));
        Ok(())
    }

    async fn after_write_target_table(
        &self,
        table: &TableDescriptor,
        _ctx: &MigrationContext,
    ) -> Result<()> {
        self.hook_log
            .lock()
            .unwrap()
            .push(format!("after:{}", table.full_name()));
        Ok(())
    }

    fn to_common_database_type(&self, store_type: &str) -> Result<DataTypeDescriptor> {
        let lowered = store_type.trim().to_lowercase();
        let (base, arg) = split_args(&lowered);

        let common = match (self.dialect, base) {
            (FakeDialect::Ms, "bit") => DataTypeDescriptor::Boolean,
            (FakeDialect::Ms, "int") => DataTypeDescriptor::Int,
            (FakeDialect::Ms, "bigint") => DataTypeDescriptor::BigInt,
            (FakeDialect::Ms, "nvarchar") => DataTypeDescriptor::NVarchar(arg.unwrap_or(0)),
            (FakeDialect::Ms, "varchar") => DataTypeDescriptor::Varchar(arg.unwrap_or(0)),
            (FakeDialect::Ms, "datetime2") => DataTypeDescriptor::DateTime {
                precision: arg.unwrap_or(7) as u8,
            },
            (FakeDialect::Ms, "uniqueidentifier") => DataTypeDescriptor::Uuid,

            (FakeDialect::Pg, "boolean") => DataTypeDescriptor::Boolean,
            (FakeDialect::Pg, "int4") => DataTypeDescriptor::Int,
            (FakeDialect::Pg, "int8") => DataTypeDescriptor::BigInt,
            (FakeDialect::Pg, "character varying") => {
                DataTypeDescriptor::Varchar(arg.unwrap_or(0))
            }
            (FakeDialect::Pg, "text") => DataTypeDescriptor::Text,
            (FakeDialect::Pg, "timestamp") => DataTypeDescriptor::DateTime {
                precision: arg.unwrap_or(6) as u8,
            },
            (FakeDialect::Pg, "uuid") => DataTypeDescriptor::Uuid,

            _ => {
                return Err(MigrateError::UnsupportedType {
                    dialect: self.name().to_string(),
                    store_type: store_type.to_string(),
                })
            }
        };
        Ok(common)
    }

    fn to_database_store_type(&self, data_type: &DataTypeDescriptor) -> Result<String> {
        let rendered = match (self.dialect, data_type) {
            (FakeDialect::Ms, DataTypeDescriptor::Boolean) => "bit".to_string(),
            (FakeDialect::Ms, DataTypeDescriptor::Int) => "int".to_string(),
            (FakeDialect::Ms, DataTypeDescriptor::BigInt) => "bigint".to_string(),
            (FakeDialect::Ms, DataTypeDescriptor::Varchar(n))
            | (FakeDialect::Ms, DataTypeDescriptor::NVarchar(n)) => {
                if *n == 0 {
                    "nvarchar(max)".to_string()
                } else {
                    format!("nvarchar({})", n)
                }
            }
            (FakeDialect::Ms, DataTypeDescriptor::Text) => "nvarchar(max)".to_string(),
            (FakeDialect::Ms, DataTypeDescriptor::DateTime { precision }) => {
                format!("datetime2({})", precision.min(&7))
            }
            (FakeDialect::Ms, DataTypeDescriptor::Uuid) => "uniqueidentifier".to_string(),

            (FakeDialect::Pg, DataTypeDescriptor::Boolean) => "boolean".to_string(),
            (FakeDialect::Pg, DataTypeDescriptor::Int) => "int4".to_string(),
            (FakeDialect::Pg, DataTypeDescriptor::BigInt) => "int8".to_string(),
            (FakeDialect::Pg, DataTypeDescriptor::Varchar(n))
            | (FakeDialect::Pg, DataTypeDescriptor::NVarchar(n)) => {
                if *n == 0 {
                    "text".to_string()
                } else {
                    format!("character varying({})", n)
                }
            }
            (FakeDialect::Pg, DataTypeDescriptor::Text)
            | (FakeDialect::Pg, DataTypeDescriptor::NText) => "text".to_string(),
            (FakeDialect::Pg, DataTypeDescriptor::DateTime { precision }) => {
                format!("timestamp({})", precision.min(&6))
            }
            (FakeDialect::Pg, DataTypeDescriptor::Uuid) => "uuid".to_string(),

            _ => {
                return Err(MigrateError::UnsupportedType {
                    dialect: self.name().to_string(),
                    store_type: data_type.to_string(),
                })
            }
        };
        Ok(rendered)
    }

    async fn to_common_sql_expression(
        &self,
        expression: &str,
        _store_type: &str,
        _ctx: &MigrationContext,
    ) -> Result<SqlExpressionDescriptor> {
        let trimmed = expression.trim().trim_matches(|c| c == '(' || c == ')');
        let lowered = trimmed.to_lowercase();

        // `trim_matches` above strips wrapping parens, so "getdate()" and
        // "(getdate())" both arrive as "getdate".
        let parsed = match (self.dialect, lowered.as_str()) {
            (FakeDialect::Ms, "getdate") => {
                SqlExpressionDescriptor::Function(WellKnownFunction::Now)
            }
            (FakeDialect::Ms, "newid") => {
                SqlExpressionDescriptor::Function(WellKnownFunction::Uuid)
            }
            (FakeDialect::Pg, "now") | (FakeDialect::Pg, "current_timestamp") => {
                SqlExpressionDescriptor::Function(WellKnownFunction::Now)
            }
            (FakeDialect::Pg, "gen_random_uuid") => {
                SqlExpressionDescriptor::Function(WellKnownFunction::Uuid)
            }
            _ => {
                if let Ok(n) = trimmed.parse::<i64>() {
                    SqlExpressionDescriptor::Literal(SqlValue::I64(n))
                } else if trimmed.starts_with('\'') && trimmed.ends_with('\'') && trimmed.len() >= 2
                {
                    SqlExpressionDescriptor::Literal(SqlValue::Text(
                        trimmed[1..trimmed.len() - 1].to_string(),
                    ))
                } else {
                    return Err(MigrateError::UnsupportedExpression {
                        dialect: self.name().to_string(),
                        expression: expression.to_string(),
                    });
                }
            }
        };
        Ok(parsed)
    }

    fn from_common_sql_expression(
        &self,
        expression: &SqlExpressionDescriptor,
    ) -> Result<String> {
        let rendered = match (self.dialect, expression) {
            (FakeDialect::Ms, SqlExpressionDescriptor::Function(WellKnownFunction::Now)) => {
                "getdate()".to_string()
            }
            (FakeDialect::Ms, SqlExpressionDescriptor::Function(WellKnownFunction::Uuid)) => {
                "newid()".to_string()
            }
            (FakeDialect::Pg, SqlExpressionDescriptor::Function(WellKnownFunction::Now)) => {
                "now()".to_string()
            }
            (FakeDialect::Pg, SqlExpressionDescriptor::Function(WellKnownFunction::Uuid)) => {
                "gen_random_uuid()".to_string()
            }
            (_, SqlExpressionDescriptor::Function(WellKnownFunction::CurrentDate)) => {
                "CURRENT_DATE".to_string()
            }
            (_, SqlExpressionDescriptor::Function(WellKnownFunction::CurrentTime)) => {
                "CURRENT_TIME".to_string()
            }
            (_, SqlExpressionDescriptor::Literal(value)) => value.to_sql_literal(),
            (_, SqlExpressionDescriptor::Raw(raw)) => raw.clone(),
        };
        Ok(rendered)
    }
}

fn split_args(store_type: &str) -> (&str, Option<u32>) {
    match store_type.find('(') {
        Some(open) if store_type.ends_with(')') => {
            let arg = store_type[open + 1..store_type.len() - 1]
                .split(',')
                .next()
                .and_then(|a| a.trim().parse().ok());
            (store_type[..open].trim_end(), arg)
        }
        _ => (store_type, None),
    }
}

/// Build a context wiring two fake dialects together.
pub async fn context_between(source: FakeDialect, target: FakeDialect) -> MigrationContext {
    context_with_setting(source, target, MigrationSetting::default()).await
}

/// Build a context with explicit settings.
pub async fn context_with_setting(
    source: FakeDialect,
    target: FakeDialect,
    setting: MigrationSetting,
) -> MigrationContext {
    context_with_agents(
        Arc::new(FakeAgent::new(source)),
        Arc::new(FakeAgent::new(target)),
        setting,
    )
    .await
}

/// Build a context around pre-constructed agents, so tests can keep handles
/// to seed rows and inspect what was written.
pub async fn context_with_agents(
    source_agent: Arc<FakeAgent>,
    target_agent: Arc<FakeAgent>,
    setting: MigrationSetting,
) -> MigrationContext {
    let source_dyn: Arc<dyn DialectAgent> = source_agent;
    let target_dyn: Arc<dyn DialectAgent> = target_agent;
    let source_connection = source_dyn.create_connection("fake://source").await.unwrap();
    let target_connection = target_dyn.create_connection("fake://target").await.unwrap();

    MigrationContext::new(
        source_dyn,
        target_dyn,
        source_connection,
        target_connection,
        "fake://source",
        "fake://target",
        Arc::new(setting),
        noop_handler(),
    )
}
