//! Configuration type definitions with auto-tuning based on system resources.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::info;

use crate::events::ObjectKind;

/// System resource information for auto-tuning.
#[derive(Debug, Clone)]
pub struct SystemResources {
    /// Total RAM in bytes.
    pub total_memory_bytes: u64,
    /// Number of CPU cores.
    pub cpu_cores: usize,
}

impl SystemResources {
    /// Detect system resources.
    pub fn detect() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();

        Self {
            total_memory_bytes: sys.total_memory(),
            cpu_cores: sys.cpus().len().max(1),
        }
    }

    /// Log detected system resources.
    pub fn log(&self) {
        info!(
            "System resources: {:.1} GB RAM, {} CPU cores",
            self.total_memory_bytes as f64 / (1024.0 * 1024.0 * 1024.0),
            self.cpu_cores
        );
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database endpoint.
    pub source: Endpoint,

    /// Target database endpoint.
    pub target: Endpoint,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationSetting,
}

/// One side of a migration: which agent, and where to connect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    /// Registered dialect agent name (e.g. "postgres", "mssql").
    pub agent: String,

    /// Engine connection string, passed to the agent verbatim.
    pub connection_string: String,
}

/// What to do when a table fails in the parallel data-transfer path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFailureAction {
    /// Fail the run once all in-flight tables have been joined.
    #[default]
    Abort,

    /// Finish the remaining tables and report failures in the run result.
    Continue,
}

/// User-supplied scripts executed after metadata and data migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostScripts {
    /// Script files, executed in order.
    #[serde(default)]
    pub files: Vec<PathBuf>,

    /// Separator splitting the files into statements.
    #[serde(default = "default_separator")]
    pub statement_separator: String,
}

impl Default for PostScripts {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            statement_separator: default_separator(),
        }
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationSetting {
    /// Migrate schema objects (tables, keys, indexes, defaults, FKs).
    #[serde(default = "default_true")]
    pub include_meta: bool,

    /// Migrate table data.
    #[serde(default = "default_true")]
    pub include_data: bool,

    /// Drop the target database before creating it.
    #[serde(default)]
    pub drop_target_database_if_exists: bool,

    /// Create the target database; disable to migrate into an existing one.
    #[serde(default = "default_true")]
    pub create_target_database: bool,

    /// Produce a SQL script at this path instead of writing to a live target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump_file: Option<PathBuf>,

    /// Use bulk-copy data blocks in the dump when the target supports them.
    #[serde(default)]
    pub optimize_insertion: bool,

    /// Parallel table-migration cap. Auto-tuned to CPU count if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_task_count: Option<usize>,

    /// Byte budget for one fetched page of rows.
    #[serde(default = "default_fetch_data_max_size")]
    pub fetch_data_max_size: u64,

    /// Multiplier applied to the page size between successive fetches.
    #[serde(default = "default_growth_speed")]
    pub growth_speed: u64,

    /// Schema objects land in when the source had none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_default_schema: Option<String>,

    /// Per-object-kind rename rules applied during mapping.
    #[serde(default)]
    pub target_name_style: NameStyle,

    /// Scripts executed at the end of the run.
    #[serde(default)]
    pub post_scripts: PostScripts,

    /// Table name patterns to migrate; empty means all. `*` wildcards.
    #[serde(default)]
    pub include_tables: Vec<String>,

    /// Table name patterns to skip. `*` wildcards.
    #[serde(default)]
    pub exclude_tables: Vec<String>,

    /// Partial-failure policy for the parallel transfer path.
    #[serde(default)]
    pub on_table_failure: TableFailureAction,
}

impl Default for MigrationSetting {
    fn default() -> Self {
        Self {
            include_meta: true,
            include_data: true,
            drop_target_database_if_exists: false,
            create_target_database: true,
            dump_file: None,
            optimize_insertion: false,
            max_task_count: None,
            fetch_data_max_size: default_fetch_data_max_size(),
            growth_speed: default_growth_speed(),
            target_default_schema: None,
            target_name_style: NameStyle::default(),
            post_scripts: PostScripts::default(),
            include_tables: Vec::new(),
            exclude_tables: Vec::new(),
            on_table_failure: TableFailureAction::Abort,
        }
    }
}

impl MigrationSetting {
    /// Whether the run produces a script instead of writing to a live target.
    pub fn is_dump_mode(&self) -> bool {
        self.dump_file.is_some()
    }

    /// The effective parallelism cap.
    ///
    /// Dump mode is always sequential; otherwise the configured value, or
    /// the detected CPU count when unset.
    pub fn effective_task_count(&self) -> usize {
        if self.is_dump_mode() {
            return 1;
        }
        match self.max_task_count {
            Some(n) => n.max(1),
            None => SystemResources::detect().cpu_cores,
        }
    }
}

/// Case conversion applied by a [`NameRule`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameCase {
    /// Keep the original casing.
    #[default]
    Preserve,
    /// Lowercase the whole name.
    Lower,
    /// Uppercase the whole name.
    Upper,
    /// Convert camelCase/PascalCase to snake_case.
    Snake,
}

/// One rename rule: case conversion plus optional prefix/suffix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameRule {
    /// Case conversion.
    #[serde(default)]
    pub case: NameCase,

    /// Prepended to the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Appended to the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

impl NameRule {
    /// Apply this rule to a name. Empty names (pending assignment) pass
    /// through untouched.
    pub fn apply(&self, name: &str) -> String {
        if name.is_empty() {
            return String::new();
        }

        let cased = match self.case {
            NameCase::Preserve => name.to_string(),
            NameCase::Lower => name.to_lowercase(),
            NameCase::Upper => name.to_uppercase(),
            NameCase::Snake => to_snake_case(name),
        };

        format!(
            "{}{}{}",
            self.prefix.as_deref().unwrap_or(""),
            cased,
            self.suffix.as_deref().unwrap_or("")
        )
    }
}

/// Per-object-kind rename rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NameStyle {
    /// Rule applied to kinds without a specific override.
    #[serde(default)]
    pub default: NameRule,

    /// Kind-specific overrides (table, column, index, ...).
    #[serde(default)]
    pub overrides: HashMap<ObjectKind, NameRule>,
}

impl NameStyle {
    /// Apply the rule for the given object kind to a name.
    pub fn apply(&self, kind: ObjectKind, name: &str) -> String {
        self.overrides
            .get(&kind)
            .unwrap_or(&self.default)
            .apply(name)
    }

    /// Whether any rule can change a name.
    pub fn is_identity(&self) -> bool {
        self.default == NameRule::default() && self.overrides.values().all(|r| *r == NameRule::default())
    }
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else {
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
            out.push(ch);
        }
    }
    out
}

fn default_true() -> bool {
    true
}

fn default_separator() -> String {
    ";".to_string()
}

fn default_fetch_data_max_size() -> u64 {
    4 * 1024 * 1024
}

fn default_growth_speed() -> u64 {
    5
}
