//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// No dialect agent registered under the requested name
    #[error("Unknown dialect agent: '{0}'")]
    UnknownAgent(String),

    /// A store type string the type mapper cannot map
    #[error("Dialect '{dialect}' cannot map store type '{store_type}'")]
    UnsupportedType { dialect: String, store_type: String },

    /// A default/computed expression the expression translator cannot parse
    #[error("Dialect '{dialect}' cannot translate expression '{expression}'")]
    UnsupportedExpression {
        dialect: String,
        expression: String,
    },

    /// Connection creation or statement execution failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// Source metadata extraction failed
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Data transfer failed for a specific table
    #[error("Transfer failed for table {table}: {message}")]
    Transfer { table: String, message: String },

    /// One or more tables failed in the parallel transfer path
    #[error("{} table(s) failed to transfer: {}", .0.len(), format_failures(.0))]
    TableFailures(Vec<TableFailure>),

    /// Dump script production or replay failed
    #[error("Script error: {0}")]
    Script(String),

    /// IO error (dump files, post scripts)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single table failure collected from the parallel transfer path.
#[derive(Debug, Clone)]
pub struct TableFailure {
    /// Qualified table name.
    pub table: String,
    /// Failure message.
    pub message: String,
}

fn format_failures(failures: &[TableFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.table, f.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl MigrateError {
    /// Create a Transfer error
    pub fn transfer(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Transfer {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
