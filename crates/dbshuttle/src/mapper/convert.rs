//! Cross-dialect type and expression conversion.
//!
//! The two-hop pivot: source store type → canonical tag → target store type,
//! and the matching hop for default/computed expressions. Same-engine runs
//! skip the whole pass and keep the source spellings.

use tracing::debug;

use crate::agent::MigrationContext;
use crate::descriptor::{DatabaseDescriptor, SqlExpressionDescriptor};
use crate::error::Result;

/// Convert every store type and expression to the target dialect.
pub(crate) async fn convert_types_and_expressions(
    mut db: DatabaseDescriptor,
    ctx: &MigrationContext,
) -> Result<DatabaseDescriptor> {
    if ctx.source_agent.name() == ctx.target_agent.name() {
        debug!(
            "source and target are both '{}', skipping type conversion",
            ctx.source_agent.name()
        );
        return Ok(db);
    }

    let source = &ctx.source_agent;
    let target = &ctx.target_agent;

    for table in &mut db.tables {
        for column in &mut table.columns {
            let original_store_type = column.store_type.clone();
            let common = source.to_common_database_type(&original_store_type)?;
            column.store_type = target.to_database_store_type(&common)?;
            column.data_type = Some(common);

            if let Some(SqlExpressionDescriptor::Raw(raw)) = &column.default_value {
                let translated = ctx
                    .translate_expression(&raw.clone(), &original_store_type)
                    .await?;
                column.default_value = Some(translated);
            }
            if let Some(SqlExpressionDescriptor::Raw(raw)) = &column.computed_expression {
                let translated = ctx
                    .translate_expression(&raw.clone(), &original_store_type)
                    .await?;
                column.computed_expression = Some(translated);
            }
        }
    }

    for sequence in &mut db.sequences {
        let common = source.to_common_database_type(&sequence.store_type)?;
        sequence.store_type = target.to_database_store_type(&common)?;
    }

    Ok(db)
}
