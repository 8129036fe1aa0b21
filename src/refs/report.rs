//! Final grouping and per-category capping of deduplicated references.

use crate::model::{CategoryBucket, Reference, ReferenceItem, ReferenceReport};
use std::collections::HashMap;

pub fn build_report(target: &str, references: Vec<Reference>, limit: usize) -> ReferenceReport {
    let total_count = references.len();

    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<Reference>> = HashMap::new();
    for reference in references {
        if !buckets.contains_key(&reference.category) {
            order.push(reference.category.clone());
        }
        buckets
            .entry(reference.category.clone())
            .or_default()
            .push(reference);
    }

    let categories = order
        .into_iter()
        .map(|category| {
            let mut bucket = buckets.remove(&category).unwrap_or_default();
            let actual = bucket.len();
            let label = if actual > limit {
                bucket.truncate(limit);
                format!("{category} (showing first {limit} of {actual})")
            } else {
                category
            };
            CategoryBucket {
                label,
                items: bucket.into_iter().map(to_item).collect(),
            }
        })
        .collect();

    ReferenceReport {
        target: target.to_string(),
        total_count,
        categories,
    }
}

// Exactly one of feature/line is meaningful per record kind.
fn to_item(reference: Reference) -> ReferenceItem {
    if reference.is_textual {
        ReferenceItem {
            source_path: reference.source_path,
            feature: None,
            line: Some(reference.line),
            is_textual: true,
        }
    } else {
        ReferenceItem {
            source_path: reference.source_path,
            feature: reference.feature,
            line: None,
            is_textual: false,
        }
    }
}
