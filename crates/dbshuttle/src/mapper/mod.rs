//! Descriptor mapping: source descriptor in, valid target descriptor out.
//!
//! The mapper is an ordered pipeline of transforms applied to a clone of the
//! source descriptor. Each pass is a standalone function over the whole
//! descriptor, independently testable, composed here in the one order that
//! is correct:
//!
//! 1. table filtering ([`filter`])
//! 2. dangling-foreign-key removal ([`names`])
//! 3. duplicate-name resolution ([`names`])
//! 4. naming-style application ([`names`])
//! 5. schema normalization ([`names`])
//! 6. identifier-length enforcement ([`names`])
//! 7. cross-dialect type/expression conversion ([`convert`])
//!
//! Ordering matters: style runs before length enforcement because rules may
//! lengthen names past the target's limit, and dangling-reference removal
//! runs first so later passes never touch foreign keys that will not
//! survive.

mod convert;
mod filter;
mod names;

pub use names::truncate_identifier;

use tracing::debug;

use crate::agent::MigrationContext;
use crate::descriptor::DatabaseDescriptor;
use crate::error::Result;

/// Result of mapping: the filtered source and the reshaped target.
///
/// `source` keeps the original source-side names and types but only the
/// tables that survived filtering, index-paired with `target`. The data
/// phase reads with `source.tables[i]` and writes with `target.tables[i]`.
#[derive(Debug, Clone)]
pub struct MappedDatabase {
    /// Filtered source descriptor, original names.
    pub source: DatabaseDescriptor,

    /// Fully mapped target descriptor.
    pub target: DatabaseDescriptor,
}

/// Map a source descriptor into a valid target descriptor.
///
/// The source descriptor is cloned; the input is never mutated.
pub async fn map_database(
    source: &DatabaseDescriptor,
    ctx: &MigrationContext,
) -> Result<MappedDatabase> {
    let setting = &ctx.setting;
    let target_setting = ctx.target_agent.setting();

    let filtered = filter::filter_tables(
        source.clone(),
        &setting.include_tables,
        &setting.exclude_tables,
    );

    let db = filtered.clone();
    let db = names::remove_dangling_foreign_keys(db);
    let db = names::resolve_duplicate_names(db);
    let db = names::apply_name_style(db, &setting.target_name_style);
    let db = names::normalize_schemas(
        db,
        target_setting,
        setting.target_default_schema.as_deref(),
    );
    let db = names::enforce_identifier_lengths(db, target_setting.max_identifier_length);
    let db = convert::convert_types_and_expressions(db, ctx).await?;

    debug!(
        tables = db.tables.len(),
        sequences = db.sequences.len(),
        "descriptor mapped for target dialect '{}'",
        ctx.target_agent.name()
    );

    Ok(MappedDatabase {
        source: filtered,
        target: db,
    })
}
