//! Agent registry for explicit dependency injection.
//!
//! Agents are held in a map keyed by dialect name and injected into the
//! orchestrator. No global singletons: the embedding application constructs
//! a registry, registers the engines it links in, and passes it down. This
//! keeps initialization deterministic and lets tests register mock agents.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{MigrateError, Result};

use super::DialectAgent;

/// Registry of dialect agents keyed by dialect name.
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<dyn DialectAgent>>,
}

impl AgentRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent under its dialect name.
    pub fn register(&mut self, agent: Arc<dyn DialectAgent>) {
        self.agents.insert(agent.name().to_string(), agent);
    }

    /// Get an agent by dialect name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn DialectAgent>> {
        self.agents.get(name).cloned()
    }

    /// Get an agent by dialect name, failing with a typed error if absent.
    pub fn require(&self, name: &str) -> Result<Arc<dyn DialectAgent>> {
        self.get(name)
            .ok_or_else(|| MigrateError::UnknownAgent(name.to_string()))
    }

    /// Check whether a dialect is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// All registered dialect names.
    pub fn names(&self) -> Vec<&str> {
        self.agents.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.agents.keys().collect::<Vec<_>>())
            .finish()
    }
}
