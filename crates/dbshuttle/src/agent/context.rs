//! Per-run state threaded through every agent call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::MigrationSetting;
use crate::descriptor::SqlExpressionDescriptor;
use crate::error::Result;
use crate::events::{EventHandler, MigrationEvent};

use super::{AgentConnection, DialectAgent};

/// Everything one migration run shares with its agents.
///
/// Parallel table-migration tasks each get a [`fork`](MigrationContext::fork)
/// with its own pair of connections; the settings, event handler, and the
/// expression-translation cache stay shared. Nothing here is mutated across
/// tasks except the cache, which is behind its own lock.
pub struct MigrationContext {
    /// Source engine agent.
    pub source_agent: Arc<dyn DialectAgent>,

    /// Target engine agent.
    pub target_agent: Arc<dyn DialectAgent>,

    /// Live source connection.
    pub source_connection: Arc<dyn AgentConnection>,

    /// Target connection, or the script sink in dump mode.
    pub target_connection: Arc<dyn AgentConnection>,

    /// Connection string the source connection was created from.
    pub source_connection_string: String,

    /// Connection string the target connection was created from.
    pub target_connection_string: String,

    /// Effective migration settings.
    pub setting: Arc<MigrationSetting>,

    /// Event callback installed by the caller.
    pub events: EventHandler,

    /// Per-run expression-translation cache keyed by literal SQL text.
    expression_cache: Arc<Mutex<HashMap<String, SqlExpressionDescriptor>>>,
}

impl MigrationContext {
    /// Assemble a context from its parts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_agent: Arc<dyn DialectAgent>,
        target_agent: Arc<dyn DialectAgent>,
        source_connection: Arc<dyn AgentConnection>,
        target_connection: Arc<dyn AgentConnection>,
        source_connection_string: impl Into<String>,
        target_connection_string: impl Into<String>,
        setting: Arc<MigrationSetting>,
        events: EventHandler,
    ) -> Self {
        Self {
            source_agent,
            target_agent,
            source_connection,
            target_connection,
            source_connection_string: source_connection_string.into(),
            target_connection_string: target_connection_string.into(),
            setting,
            events,
            expression_cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fork this context for one parallel table-migration task.
    ///
    /// Opens a fresh pair of connections so no connection object is shared
    /// across concurrent tasks. Settings, events and the expression cache
    /// remain shared.
    pub async fn fork(&self) -> Result<Self> {
        let source_connection = self
            .source_agent
            .create_connection(&self.source_connection_string)
            .await?;
        let target_connection = self
            .target_agent
            .create_connection(&self.target_connection_string)
            .await?;

        Ok(Self {
            source_agent: self.source_agent.clone(),
            target_agent: self.target_agent.clone(),
            source_connection,
            target_connection,
            source_connection_string: self.source_connection_string.clone(),
            target_connection_string: self.target_connection_string.clone(),
            setting: self.setting.clone(),
            events: self.events.clone(),
            expression_cache: self.expression_cache.clone(),
        })
    }

    /// Emit an event to the installed handler.
    pub fn emit(&self, event: MigrationEvent) {
        (self.events)(&event);
    }

    /// Canonicalize a source expression, consulting the per-run cache first.
    ///
    /// Identical default-value expressions are common (every `created_at`
    /// column tends to share one), and canonicalizing may cost a round trip
    /// to the source connection, so results are cached by literal SQL text.
    pub async fn translate_expression(
        &self,
        expression: &str,
        store_type: &str,
    ) -> Result<SqlExpressionDescriptor> {
        if let Some(hit) = self
            .expression_cache
            .lock()
            .expect("expression cache poisoned")
            .get(expression)
            .cloned()
        {
            return Ok(hit);
        }

        let translated = self
            .source_agent
            .to_common_sql_expression(expression, store_type, self)
            .await?;

        self.expression_cache
            .lock()
            .expect("expression cache poisoned")
            .insert(expression.to_string(), translated.clone());

        Ok(translated)
    }

    /// Number of distinct expressions translated so far.
    pub fn cached_expression_count(&self) -> usize {
        self.expression_cache
            .lock()
            .expect("expression cache poisoned")
            .len()
    }
}
