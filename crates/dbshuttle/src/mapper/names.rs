//! Structural mapping passes: reference pruning, renaming, identifier limits.

use std::collections::{HashMap, HashSet};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::agent::AgentSetting;
use crate::config::NameStyle;
use crate::descriptor::DatabaseDescriptor;
use crate::events::ObjectKind;

/// Drop foreign keys whose principal table is absent from the descriptor.
///
/// Tables may be missing because the source filter excluded them; a foreign
/// key pointing at a table that will not exist on the target must go, never
/// be left dangling.
pub(crate) fn remove_dangling_foreign_keys(mut db: DatabaseDescriptor) -> DatabaseDescriptor {
    let present: HashSet<(Option<String>, String)> = db
        .tables
        .iter()
        .map(|t| (t.schema.clone(), t.name.clone()))
        .collect();

    for table in &mut db.tables {
        let owner = table.full_name();
        table.foreign_keys.retain(|fk| {
            let keep = present.contains(&(fk.principal_schema.clone(), fk.principal_table.clone()));
            if !keep {
                warn!(
                    "dropping foreign key {} on {}: principal table {} not migrated",
                    fk.name, owner, fk.principal_table
                );
            }
            keep
        });
    }

    db
}

/// Disambiguate duplicate constraint/index names within each schema.
///
/// The first occurrence keeps its name; later occurrences get `_2`, `_3`, …
/// appended in encounter order (tables in descriptor order; within a table:
/// primary key, uniques, foreign keys, indexes). Deterministic and
/// reproducible by construction.
pub(crate) fn resolve_duplicate_names(mut db: DatabaseDescriptor) -> DatabaseDescriptor {
    let mut seen: HashMap<(Option<String>, String), u32> = HashMap::new();

    let mut bump = |schema: &Option<String>, name: &mut String| {
        if name.is_empty() {
            return;
        }
        let count = seen.entry((schema.clone(), name.clone())).or_insert(0);
        *count += 1;
        if *count > 1 {
            let renamed = format!("{}_{}", name, count);
            debug!("renaming duplicate object name {} -> {}", name, renamed);
            *name = renamed;
        }
    };

    for table in &mut db.tables {
        let schema = table.schema.clone();
        if let Some(pk) = &mut table.primary_key {
            bump(&schema, &mut pk.name);
        }
        for unique in &mut table.uniques {
            bump(&schema, &mut unique.name);
        }
        for fk in &mut table.foreign_keys {
            bump(&schema, &mut fk.name);
        }
        for index in &mut table.indexes {
            bump(&schema, &mut index.name);
        }
    }

    db
}

/// Run every object name through the configured per-kind rename rules.
pub(crate) fn apply_name_style(
    mut db: DatabaseDescriptor,
    style: &NameStyle,
) -> DatabaseDescriptor {
    if style.is_identity() {
        return db;
    }

    let rename_cols = |style: &NameStyle, cols: &mut [String]| {
        for col in cols {
            *col = style.apply(ObjectKind::Column, col);
        }
    };

    for table in &mut db.tables {
        if let Some(schema) = &mut table.schema {
            *schema = style.apply(ObjectKind::Schema, schema);
        }
        table.name = style.apply(ObjectKind::Table, &table.name);

        for column in &mut table.columns {
            column.name = style.apply(ObjectKind::Column, &column.name);
        }
        if let Some(pk) = &mut table.primary_key {
            pk.name = style.apply(ObjectKind::PrimaryKey, &pk.name);
            rename_cols(style, &mut pk.columns);
        }
        for unique in &mut table.uniques {
            unique.name = style.apply(ObjectKind::Unique, &unique.name);
            rename_cols(style, &mut unique.columns);
        }
        for index in &mut table.indexes {
            index.name = style.apply(ObjectKind::Index, &index.name);
            rename_cols(style, &mut index.columns);
        }
        for fk in &mut table.foreign_keys {
            fk.name = style.apply(ObjectKind::ForeignKey, &fk.name);
            rename_cols(style, &mut fk.columns);
            if let Some(schema) = &mut fk.principal_schema {
                *schema = style.apply(ObjectKind::Schema, schema);
            }
            fk.principal_table = style.apply(ObjectKind::Table, &fk.principal_table);
            rename_cols(style, &mut fk.principal_columns);
        }
    }

    for sequence in &mut db.sequences {
        if let Some(schema) = &mut sequence.schema {
            *schema = style.apply(ObjectKind::Schema, schema);
        }
        sequence.name = style.apply(ObjectKind::Sequence, &sequence.name);
    }

    db
}

/// Clear or fill schema fields according to the target engine's rules.
pub(crate) fn normalize_schemas(
    mut db: DatabaseDescriptor,
    target: &AgentSetting,
    default_override: Option<&str>,
) -> DatabaseDescriptor {
    if !target.supports_schemas {
        for table in &mut db.tables {
            table.schema = None;
            for fk in &mut table.foreign_keys {
                fk.principal_schema = None;
            }
        }
        for sequence in &mut db.sequences {
            sequence.schema = None;
        }
        return db;
    }

    let default = default_override
        .map(str::to_string)
        .or_else(|| target.default_schema.clone());
    let Some(default) = default else {
        return db;
    };

    let fill = |slot: &mut Option<String>| {
        if slot.as_deref().map_or(true, str::is_empty) {
            *slot = Some(default.clone());
        }
    };

    for table in &mut db.tables {
        fill(&mut table.schema);
        for fk in &mut table.foreign_keys {
            fill(&mut fk.principal_schema);
        }
    }
    for sequence in &mut db.sequences {
        fill(&mut sequence.schema);
    }

    db
}

/// Shorten a name to fit the identifier limit.
///
/// Names within the limit pass through. Longer names keep their first
/// `max_length - 9` characters and gain `_` plus an 8-hex-digit hash of the
/// whole original name, so the result is bounded, reproducible, and
/// collision-resistant between distinct long names.
pub fn truncate_identifier(name: &str, max_length: usize) -> String {
    if name.chars().count() <= max_length {
        return name.to_string();
    }

    let keep = max_length.saturating_sub(9);
    let prefix: String = name.chars().take(keep).collect();
    let digest = Sha256::digest(name.as_bytes());
    format!(
        "{}_{:02x}{:02x}{:02x}{:02x}",
        prefix, digest[0], digest[1], digest[2], digest[3]
    )
}

/// Enforce the target's identifier length limit on every object name.
///
/// Foreign keys referencing a renamed table or column are updated to match.
pub(crate) fn enforce_identifier_lengths(
    mut db: DatabaseDescriptor,
    max_length: usize,
) -> DatabaseDescriptor {
    if max_length == 0 {
        return db;
    }

    let shorten = |name: &str| truncate_identifier(name, max_length);

    // Schema names shorten deterministically, so every reference to the same
    // schema lands on the same result without a rename map.
    let mut table_renames: HashMap<(Option<String>, String), String> = HashMap::new();
    let mut column_renames: HashMap<(Option<String>, String, String), String> = HashMap::new();

    for table in &mut db.tables {
        if let Some(schema) = &mut table.schema {
            *schema = shorten(schema);
        }
        let schema = table.schema.clone();

        let new_name = shorten(&table.name);
        if new_name != table.name {
            debug!("truncating table name {} -> {}", table.name, new_name);
            table_renames.insert((schema.clone(), table.name.clone()), new_name.clone());
            table.name = new_name;
        }

        for column in &mut table.columns {
            let new_col = shorten(&column.name);
            if new_col != column.name {
                column_renames.insert(
                    (schema.clone(), table.name.clone(), column.name.clone()),
                    new_col.clone(),
                );
                column.name = new_col;
            }
        }

        if let Some(pk) = &mut table.primary_key {
            pk.name = shorten(&pk.name);
        }
        for unique in &mut table.uniques {
            unique.name = shorten(&unique.name);
        }
        for index in &mut table.indexes {
            index.name = shorten(&index.name);
        }
        for fk in &mut table.foreign_keys {
            fk.name = shorten(&fk.name);
        }
    }

    // Second walk fixes references now that all renames are known.
    for table in &mut db.tables {
        let schema = table.schema.clone();
        let table_name = table.name.clone();

        let fix = |cols: &mut [String],
                   renames: &HashMap<(Option<String>, String, String), String>,
                   schema: &Option<String>,
                   table_name: &str| {
            for col in cols {
                if let Some(renamed) =
                    renames.get(&(schema.clone(), table_name.to_string(), col.clone()))
                {
                    *col = renamed.clone();
                }
            }
        };

        if let Some(pk) = &mut table.primary_key {
            fix(&mut pk.columns, &column_renames, &schema, &table_name);
        }
        for unique in &mut table.uniques {
            fix(&mut unique.columns, &column_renames, &schema, &table_name);
        }
        for index in &mut table.indexes {
            fix(&mut index.columns, &column_renames, &schema, &table_name);
        }
        for fk in &mut table.foreign_keys {
            fix(&mut fk.columns, &column_renames, &schema, &table_name);

            if let Some(schema) = &mut fk.principal_schema {
                *schema = shorten(schema);
            }
            if let Some(renamed) =
                table_renames.get(&(fk.principal_schema.clone(), fk.principal_table.clone()))
            {
                fk.principal_table = renamed.clone();
            }
            let principal_schema = fk.principal_schema.clone();
            let principal_table = fk.principal_table.clone();
            fix(
                &mut fk.principal_columns,
                &column_renames,
                &principal_schema,
                &principal_table,
            );
        }
    }

    for sequence in &mut db.sequences {
        if let Some(schema) = &mut sequence.schema {
            *schema = shorten(schema);
        }
        sequence.name = shorten(&sequence.name);
    }

    db
}
