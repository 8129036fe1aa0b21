//! Query-scoped deduplication of raw reference records.

use crate::model::Reference;
use std::collections::HashSet;

/// Drop duplicate records (composite key of category, source path, and
/// either line or feature depending on the record kind) and records that
/// point back at the target itself or one of its dot-path descendants.
pub fn dedup_references(records: Vec<Reference>, target_fqn: &str) -> Vec<Reference> {
    let mut seen: HashSet<String> = HashSet::new();
    let descendant_prefix = format!("{target_fqn}.");
    records
        .into_iter()
        .filter(|record| {
            if record.source_path == target_fqn
                || record.source_path.starts_with(&descendant_prefix)
            {
                return false;
            }
            let tail = if record.is_textual {
                record.line.to_string()
            } else {
                record.feature.clone().unwrap_or_default()
            };
            seen.insert(format!(
                "{}:{}:{}",
                record.category, record.source_path, tail
            ))
        })
        .collect()
}
