//! Configuration validation rules.

use crate::error::{MigrateError, Result};

use super::types::Config;

/// Validate a parsed configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.source.agent.trim().is_empty() {
        return Err(MigrateError::Config(
            "source.agent must not be empty".to_string(),
        ));
    }

    if config.target.agent.trim().is_empty() {
        return Err(MigrateError::Config(
            "target.agent must not be empty".to_string(),
        ));
    }

    let m = &config.migration;

    if m.growth_speed < 1 {
        return Err(MigrateError::Config(
            "migration.growth_speed must be at least 1".to_string(),
        ));
    }

    if m.fetch_data_max_size == 0 {
        return Err(MigrateError::Config(
            "migration.fetch_data_max_size must be greater than zero".to_string(),
        ));
    }

    if let Some(0) = m.max_task_count {
        return Err(MigrateError::Config(
            "migration.max_task_count must be at least 1".to_string(),
        ));
    }

    if m.optimize_insertion && !m.is_dump_mode() {
        return Err(MigrateError::Config(
            "migration.optimize_insertion requires dump mode (set migration.dump_file)"
                .to_string(),
        ));
    }

    if m.post_scripts.statement_separator.trim().is_empty() {
        return Err(MigrateError::Config(
            "migration.post_scripts.statement_separator must not be blank".to_string(),
        ));
    }

    Ok(())
}
