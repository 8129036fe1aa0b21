//! Loader for the JSON graph export produced by the IDE-side exporter.
//!
//! The export is a flat list of symbol rows plus edge rows keyed by FQN.
//! Loading replaces the whole snapshot in one write transaction.

use crate::model::IngestStats;
use crate::store::Store;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolRow {
    pub fqn: String,
    pub kind: String,
    /// Defaults to the last FQN segment.
    pub name: Option<String>,
    pub collection: Option<String>,
    /// Defaults to true when no container is given.
    pub top_level: Option<bool>,
    /// FQN of the owning symbol.
    pub container: Option<String>,
    /// Collection feature in the container ("Attributes", "Forms", ...).
    pub container_feature: Option<String>,
    /// One of child | produced_type | predefined | field.
    pub member_role: Option<String>,
    pub internal: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRow {
    pub source: String,
    pub target: String,
    pub feature: String,
    pub transient: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphExport {
    #[serde(default)]
    pub symbols: Vec<SymbolRow>,
    #[serde(default)]
    pub edges: Vec<EdgeRow>,
}

pub fn ingest(store: &Store, export_path: &Path) -> Result<IngestStats> {
    let start = Instant::now();
    let raw = std::fs::read_to_string(export_path)
        .with_context(|| format!("read graph export {}", export_path.display()))?;
    let export: GraphExport = serde_json::from_str(&raw)
        .with_context(|| format!("parse graph export {}", export_path.display()))?;

    let (symbols, edges) = store.replace_graph(&export.symbols, &export.edges)?;
    Ok(IngestStats {
        symbols,
        edges,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}
