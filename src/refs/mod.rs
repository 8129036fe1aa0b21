//! Reference collection engine.
//!
//! Answers "who references this symbol?" by running four graph passes
//! (direct back-edges, derived-type back-edges, predefined-instance
//! back-edges, field back-edges) plus one corpus pass, then deduplicating
//! and grouping the results. The graph passes share one read-consistent
//! snapshot; the corpus pass runs outside it and only loads individual
//! text modules. A failed pass degrades to zero results from that pass
//! and is logged; the query still returns what the other passes found.

pub mod callgraph;
pub mod dedup;
pub mod path_format;
pub mod report;

#[cfg(test)]
pub(crate) mod testutil;

use crate::config::Config;
use crate::corpus::{CorpusIndex, display_module_path};
use crate::error::QueryError;
use crate::model::{
    BackReference, MemberRole, Reference, ReferenceReport, Symbol, display_category,
};
use crate::position::PositionResolver;
use crate::store::{Store, SymbolGraph};
use std::collections::HashSet;

/// Category label for textual corpus hits.
const CORPUS_CATEGORY: &str = "BSL modules";

struct GraphPhase {
    target: Symbol,
    raw: Vec<Reference>,
    corpus_identifiers: Vec<String>,
}

/// Collect every incoming reference to `target_fqn` and build the
/// grouped report. `limit` is the per-category cap (clamped to the
/// configured maximum); each collection pass over-collects up to
/// `headroom_factor * limit` records so capping has raw material.
pub fn find_references(
    store: &Store,
    corpus: &dyn CorpusIndex,
    target_fqn: &str,
    limit: Option<usize>,
) -> Result<ReferenceReport, QueryError> {
    let config = Config::get();
    let limit = config.clamp_reference_limit(limit);
    let cap = limit.saturating_mul(config.headroom_factor);

    let phase = store.with_snapshot(|graph| {
        let target = graph.resolve(target_fqn)?;
        let mut raw: Vec<Reference> = Vec::new();
        run_pass("direct", &mut raw, || collect_direct(graph, &target, cap));
        run_pass("produced-type", &mut raw, || {
            collect_produced_types(graph, &target, cap)
        });
        run_pass("predefined", &mut raw, || {
            collect_predefined(graph, &target, cap)
        });
        run_pass("field", &mut raw, || collect_fields(graph, &target, cap));
        let corpus_identifiers = corpus_identifiers(graph, &target);
        Ok(GraphPhase {
            target,
            raw,
            corpus_identifiers,
        })
    })?;

    let mut raw = phase.raw;
    match collect_corpus(corpus, &phase.corpus_identifiers, cap) {
        Ok(hits) => raw.extend(hits),
        Err(err) => eprintln!("mdxref: corpus pass failed, continuing without it: {err}"),
    }

    let deduped = dedup::dedup_references(raw, &phase.target.fqn);
    Ok(report::build_report(&phase.target.fqn, deduped, limit))
}

fn run_pass(
    name: &str,
    raw: &mut Vec<Reference>,
    pass: impl FnOnce() -> Result<Vec<Reference>, QueryError>,
) {
    match pass() {
        Ok(references) => raw.extend(references),
        Err(err) => eprintln!("mdxref: {name} pass failed, continuing without it: {err}"),
    }
}

fn skip_edge(graph: &dyn SymbolGraph, target: &Symbol, edge: &BackReference) -> bool {
    edge.transient
        || graph.is_transient_feature(&edge.feature)
        || graph.belongs_to_internal_namespace(&edge.source)
        || is_self_or_descendant(&edge.source.fqn, &target.fqn)
}

/// Self-references are checked on the raw FQN here, before path
/// formatting: deep descendants render with a " / " separator and would
/// no longer look like a dot-path descendant of the target.
fn is_self_or_descendant(source_fqn: &str, target_fqn: &str) -> bool {
    source_fqn == target_fqn
        || source_fqn
            .strip_prefix(target_fqn)
            .is_some_and(|rest| rest.starts_with('.'))
}

fn graph_reference(
    graph: &dyn SymbolGraph,
    source: &Symbol,
    category: String,
    feature: String,
) -> Reference {
    Reference {
        category,
        source_path: path_format::format_path(graph, source),
        feature: Some(feature),
        line: 0,
        is_textual: false,
    }
}

/// Pass 1: edges pointing directly at the target.
fn collect_direct(
    graph: &dyn SymbolGraph,
    target: &Symbol,
    cap: usize,
) -> Result<Vec<Reference>, QueryError> {
    let mut out = Vec::new();
    for edge in graph.back_references(target.id)? {
        if out.len() >= cap {
            break;
        }
        if skip_edge(graph, target, &edge) {
            continue;
        }
        let category = category_for(graph, &edge.source);
        out.push(graph_reference(graph, &edge.source, category, edge.feature));
    }
    Ok(out)
}

/// Pass 2: edges pointing at types the target produces (refs, objects).
fn collect_produced_types(
    graph: &dyn SymbolGraph,
    target: &Symbol,
    cap: usize,
) -> Result<Vec<Reference>, QueryError> {
    let mut out = Vec::new();
    for produced in graph.members(target.id, MemberRole::ProducedType)? {
        for edge in graph.back_references(produced.id)? {
            if out.len() >= cap {
                return Ok(out);
            }
            if skip_edge(graph, target, &edge) {
                continue;
            }
            let category = category_for(graph, &edge.source);
            let feature = format!("Type: {}", edge.feature);
            out.push(graph_reference(graph, &edge.source, category, feature));
        }
    }
    Ok(out)
}

/// Pass 3: edges pointing at predefined instances of the target.
fn collect_predefined(
    graph: &dyn SymbolGraph,
    target: &Symbol,
    cap: usize,
) -> Result<Vec<Reference>, QueryError> {
    let mut out = Vec::new();
    for instance in graph.members(target.id, MemberRole::Predefined)? {
        for edge in graph.back_references(instance.id)? {
            if out.len() >= cap {
                return Ok(out);
            }
            if skip_edge(graph, target, &edge) {
                continue;
            }
            out.push(graph_reference(
                graph,
                &edge.source,
                "Predefined items".to_string(),
                instance.name.clone(),
            ));
        }
    }
    Ok(out)
}

/// Pass 4: edges pointing at the target's fields (attributes, dimensions).
/// The target's own containment edge to its field is not a reference.
fn collect_fields(
    graph: &dyn SymbolGraph,
    target: &Symbol,
    cap: usize,
) -> Result<Vec<Reference>, QueryError> {
    let mut out = Vec::new();
    for field in graph.members(target.id, MemberRole::Field)? {
        for edge in graph.back_references(field.id)? {
            if out.len() >= cap {
                return Ok(out);
            }
            if skip_edge(graph, target, &edge) {
                continue;
            }
            out.push(graph_reference(
                graph,
                &edge.source,
                "Field references".to_string(),
                edge.feature,
            ));
        }
    }
    Ok(out)
}

/// Identities searched for in the corpus: the target plus its produced
/// types. A member lookup failure degrades to the target name alone.
fn corpus_identifiers(graph: &dyn SymbolGraph, target: &Symbol) -> Vec<String> {
    let mut identifiers = vec![target.name.clone()];
    match graph.members(target.id, MemberRole::ProducedType) {
        Ok(types) => identifiers.extend(types.into_iter().map(|t| t.name)),
        Err(err) => eprintln!("mdxref: produced types for corpus pass: {err}"),
    }
    identifiers.dedup();
    identifiers
}

/// Pass 5: textual occurrences anywhere in the corpus, consumed lazily
/// up to the cap.
fn collect_corpus(
    corpus: &dyn CorpusIndex,
    identifiers: &[String],
    cap: usize,
) -> Result<Vec<Reference>, QueryError> {
    let resolver = PositionResolver::new(corpus);
    let mut out = Vec::new();
    for occurrence in corpus.find_occurrences(identifiers)? {
        if out.len() >= cap {
            break;
        }
        out.push(Reference {
            category: CORPUS_CATEGORY.to_string(),
            source_path: display_module_path(&occurrence.module_path),
            feature: None,
            line: resolver.resolve(&occurrence),
            is_textual: true,
        });
    }
    Ok(out)
}

/// Category of a back-reference source: "Forms" for anything owned by a
/// form, else the display label of the top-level ancestor's collection.
fn category_for(graph: &dyn SymbolGraph, source: &Symbol) -> String {
    let mut visited: HashSet<crate::model::SymbolId> = HashSet::new();
    let mut current = source.clone();
    loop {
        if current.kind == "Form" || current.container_feature.as_deref() == Some("Forms") {
            return "Forms".to_string();
        }
        if current.top_level {
            return current
                .collection
                .as_deref()
                .map(display_category)
                .unwrap_or_else(|| "Other".to_string());
        }
        if !visited.insert(current.id) {
            return "Other".to_string();
        }
        let parent = current
            .container_id
            .and_then(|id| graph.symbol(id).ok().flatten());
        match parent {
            Some(parent) => current = parent,
            None => return "Other".to_string(),
        }
    }
}
