//! In-memory graph fake for collector and formatter unit tests.

use crate::error::QueryError;
use crate::model::{BackReference, MemberRole, Symbol, SymbolId};
use crate::store::SymbolGraph;
use std::collections::HashMap;

pub struct FakeGraph {
    symbols: HashMap<SymbolId, Symbol>,
    edges: Vec<(SymbolId, SymbolId, String, bool)>, // (target, source, feature, transient)
    next_id: i64,
}

impl FakeGraph {
    pub fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            edges: Vec::new(),
            next_id: 1,
        }
    }

    fn alloc(&mut self) -> SymbolId {
        let id = SymbolId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn add_top_level(&mut self, fqn: &str, kind: &str, collection: &str) -> SymbolId {
        let id = self.alloc();
        let name = fqn.rsplit('.').next().unwrap_or(fqn).to_string();
        self.symbols.insert(
            id,
            Symbol {
                id,
                fqn: fqn.to_string(),
                kind: kind.to_string(),
                name,
                collection: Some(collection.to_string()),
                top_level: true,
                container_id: None,
                container_feature: None,
                member_role: None,
                internal: false,
            },
        );
        id
    }

    pub fn add_member(
        &mut self,
        parent: SymbolId,
        name: &str,
        kind: &str,
        feature: &str,
        role: &str,
    ) -> SymbolId {
        let id = self.alloc();
        let parent_fqn = self.symbols[&parent].fqn.clone();
        self.symbols.insert(
            id,
            Symbol {
                id,
                fqn: format!("{parent_fqn}.{kind}.{name}"),
                kind: kind.to_string(),
                name: name.to_string(),
                collection: None,
                top_level: false,
                container_id: Some(parent),
                container_feature: Some(feature.to_string()),
                member_role: MemberRole::parse(role),
                internal: false,
            },
        );
        id
    }

    pub fn add_edge(&mut self, source: SymbolId, target: SymbolId, feature: &str) {
        self.edges.push((target, source, feature.to_string(), false));
    }

    pub fn add_transient_edge(&mut self, source: SymbolId, target: SymbolId, feature: &str) {
        self.edges.push((target, source, feature.to_string(), true));
    }

    pub fn set_container(&mut self, id: SymbolId, parent: SymbolId) {
        self.symbols.get_mut(&id).unwrap().container_id = Some(parent);
    }

    pub fn set_top_level(&mut self, id: SymbolId, top_level: bool) {
        self.symbols.get_mut(&id).unwrap().top_level = top_level;
    }

    pub fn set_internal(&mut self, id: SymbolId, internal: bool) {
        self.symbols.get_mut(&id).unwrap().internal = internal;
    }

    pub fn get(&self, id: SymbolId) -> Symbol {
        self.symbols[&id].clone()
    }
}

impl SymbolGraph for FakeGraph {
    fn resolve(&self, fqn: &str) -> Result<Symbol, QueryError> {
        self.symbols
            .values()
            .find(|s| s.fqn.eq_ignore_ascii_case(fqn))
            .cloned()
            .ok_or_else(|| QueryError::SymbolNotFound {
                fqn: fqn.to_string(),
            })
    }

    fn symbol(&self, id: SymbolId) -> Result<Option<Symbol>, QueryError> {
        Ok(self.symbols.get(&id).cloned())
    }

    fn back_references(&self, id: SymbolId) -> Result<Vec<BackReference>, QueryError> {
        Ok(self
            .edges
            .iter()
            .filter(|(target, _, _, _)| *target == id)
            .map(|(_, source, feature, transient)| BackReference {
                source: self.symbols[source].clone(),
                feature: feature.clone(),
                transient: *transient,
            })
            .collect())
    }

    fn members(&self, id: SymbolId, role: MemberRole) -> Result<Vec<Symbol>, QueryError> {
        let mut members: Vec<Symbol> = self
            .symbols
            .values()
            .filter(|s| s.container_id == Some(id) && s.member_role == Some(role))
            .cloned()
            .collect();
        members.sort_by_key(|s| s.id.0);
        Ok(members)
    }
}
