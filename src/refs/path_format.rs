//! Display paths for symbols found in back-references.
//!
//! Non-top-level symbols are rendered by walking container links upward,
//! labelling each hop with the singularized container feature
//! ("Attributes" -> "Attribute"). The walk carries a visited set so a
//! corrupt containment chain degrades to the raw FQN instead of looping.

use crate::model::{Symbol, SymbolId};
use crate::store::SymbolGraph;
use std::collections::HashSet;

pub fn format_path(graph: &dyn SymbolGraph, symbol: &Symbol) -> String {
    let mut walked: Vec<String> = Vec::new();
    let mut visited: HashSet<SymbolId> = HashSet::new();
    let mut current = symbol.clone();

    while !current.top_level {
        if !visited.insert(current.id) {
            eprintln!("mdxref: path: containment cycle at {}", current.fqn);
            return symbol.fqn.clone();
        }
        let segment = match &current.container_feature {
            Some(feature) => format!("{}.{}", singularize(feature), current.name),
            None => current.name.clone(),
        };
        walked.push(segment);
        match lookup_container(graph, &current) {
            Some(parent) => current = parent,
            // Detached chain: no top-level ancestor reachable.
            None => return symbol.fqn.clone(),
        }
    }

    walked.reverse();
    let mut full = current.fqn.clone();
    for segment in &walked {
        full.push('.');
        full.push_str(segment);
    }
    format_fqn(&full)
}

fn lookup_container(graph: &dyn SymbolGraph, symbol: &Symbol) -> Option<Symbol> {
    let id = symbol.container_id?;
    match graph.symbol(id) {
        Ok(parent) => parent,
        Err(err) => {
            eprintln!("mdxref: path: container lookup for {}: {err}", symbol.fqn);
            None
        }
    }
}

/// Render a full dotted path: collapse a trailing segment that repeats
/// the type of the final pair (`Form.ItemForm.Form` -> `Form.ItemForm`),
/// and split long paths after the first two segments with " / ".
pub fn format_fqn(fqn: &str) -> String {
    let mut segments: Vec<&str> = fqn.split('.').filter(|s| !s.is_empty()).collect();
    if segments.len() <= 2 {
        return segments.join(".");
    }
    let long_tail = segments.len() - 2 > 2;
    if segments.len() >= 3 && segments[segments.len() - 1] == segments[segments.len() - 3] {
        segments.pop();
    }
    if long_tail {
        format!(
            "{}.{} / {}",
            segments[0],
            segments[1],
            segments[2..].join(".")
        )
    } else {
        segments.join(".")
    }
}

/// Singularize a collection-style feature name for path display. Applies
/// only to names that look like collections (trailing `s`, or the literal
/// "Content"); everything else passes through untouched.
pub fn singularize(feature: &str) -> String {
    let collection_style = feature == "Content" || feature.ends_with('s');
    if !collection_style {
        return feature.to_string();
    }
    let stem = if let Some(prefix) = feature.strip_suffix("ies") {
        format!("{prefix}y")
    } else if let Some(prefix) = feature.strip_suffix("ses") {
        format!("{prefix}s")
    } else if feature.ends_with('s') && !feature.ends_with("ss") {
        feature[..feature.len() - 1].to_string()
    } else {
        feature.to_string()
    };
    capitalize(&stem)
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refs::testutil::FakeGraph;

    #[test]
    fn singularization_table() {
        assert_eq!(singularize("attributes"), "Attribute");
        assert_eq!(singularize("dimensions"), "Dimension");
        assert_eq!(singularize("categories"), "Category");
        assert_eq!(singularize("Addresses"), "Address");
        assert_eq!(singularize("Content"), "Content");
        // Not collection-style: unchanged.
        assert_eq!(singularize("Handler"), "Handler");
        // Double-s endings are not plurals.
        assert_eq!(singularize("Access"), "Access");
    }

    #[test]
    fn short_fqn_unchanged() {
        assert_eq!(format_fqn("Catalog.Items"), "Catalog.Items");
        assert_eq!(
            format_fqn("Catalog.Items.Attribute.Code"),
            "Catalog.Items.Attribute.Code"
        );
    }

    #[test]
    fn trailing_duplicate_collapses_with_separator() {
        assert_eq!(
            format_fqn("Catalog.Items.Form.ItemForm.Form"),
            "Catalog.Items / Form.ItemForm"
        );
    }

    #[test]
    fn walk_builds_singularized_segments() {
        let mut graph = FakeGraph::new();
        let items = graph.add_top_level("Catalog.Items", "Catalog", "Catalogs");
        let code = graph.add_member(items, "Code", "Attribute", "Attributes", "field");
        let symbol = graph.get(code);
        assert_eq!(
            format_path(&graph, &symbol),
            "Catalog.Items.Attribute.Code"
        );
    }

    #[test]
    fn cycle_degrades_to_raw_fqn() {
        let mut graph = FakeGraph::new();
        let a = graph.add_top_level("Catalog.A", "Catalog", "Catalogs");
        let b = graph.add_member(a, "B", "Attribute", "Attributes", "field");
        let c = graph.add_member(b, "C", "Attribute", "Attributes", "field");
        graph.set_container(b, c); // b -> c -> b
        graph.set_top_level(a, false);
        let symbol = graph.get(c);
        // Never panics, never loops.
        let rendered = format_path(&graph, &symbol);
        assert!(!rendered.is_empty());
    }
}
