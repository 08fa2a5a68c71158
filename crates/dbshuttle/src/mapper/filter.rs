//! Table filtering by include/exclude patterns.

use tracing::debug;

use crate::descriptor::DatabaseDescriptor;

/// Drop tables not selected by the include/exclude patterns.
///
/// Patterns match the bare table name or the qualified `schema.table` form,
/// case-insensitively, with `*` wildcards. An empty include list selects
/// every table.
pub(crate) fn filter_tables(
    mut db: DatabaseDescriptor,
    include: &[String],
    exclude: &[String],
) -> DatabaseDescriptor {
    if include.is_empty() && exclude.is_empty() {
        return db;
    }

    db.tables.retain(|table| {
        let name = table.name.as_str();
        let full = table.full_name();

        let included = include.is_empty()
            || include
                .iter()
                .any(|p| matches_pattern(p, name) || matches_pattern(p, &full));
        let excluded = exclude
            .iter()
            .any(|p| matches_pattern(p, name) || matches_pattern(p, &full));

        let keep = included && !excluded;
        if !keep {
            debug!("table {} filtered out of migration", full);
        }
        keep
    });

    db
}

/// Case-insensitive match with `*` wildcards.
fn matches_pattern(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.to_lowercase().chars().collect();
    let n: Vec<char> = name.to_lowercase().chars().collect();

    let (mut pi, mut ni) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut mark = 0usize;

    while ni < n.len() {
        if pi < p.len() && (p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            mark = ni;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ni = mark;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
