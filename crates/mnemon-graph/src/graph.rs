// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory entity graph for one container.
//!
//! Nodes are keyed by canonical name. Edges are deduplicated on the
//! `(source, relation, target)` triple and indexed into both endpoints'
//! adjacency lists, so traversal is bidirectional. A name index maps
//! lowercased tokens (full names plus name parts longer than two
//! characters) to canonical names for query-time entity spotting.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use mnemon_core::types::{EntityNode, RelationshipEdge};

/// Entity summaries are capped at this many characters.
const SUMMARY_MAX_CHARS: usize = 500;

/// A new summary is appended only if this long a prefix of it is not
/// already present in the stored summary.
const MERGE_PREFIX_CHARS: usize = 40;

/// A bounded subgraph produced by [`EntityGraph::context`].
#[derive(Debug, Clone, Default)]
pub struct GraphContext {
    pub entities: Vec<EntityNode>,
    pub relationships: Vec<RelationshipEdge>,
}

/// Entity graph for a single container.
#[derive(Debug, Default)]
pub struct EntityGraph {
    nodes: HashMap<String, EntityNode>,
    edges: HashMap<String, RelationshipEdge>,
    /// Canonical name -> keys of edges touching that name, in insertion order.
    adjacency: HashMap<String, Vec<String>>,
    /// Lowercased token -> canonical names containing that token.
    name_index: HashMap<String, HashSet<String>>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or merge an entity observation.
    ///
    /// An existing node gains the session id, and the new summary is
    /// appended unless its leading 40 characters already appear in the
    /// stored summary. Summaries are capped at 500 characters. Empty names
    /// are dropped.
    pub fn add_entity(&mut self, name: &str, entity_type: &str, summary: &str, session_id: &str) {
        let name = name.trim();
        if name.is_empty() {
            debug!("dropping entity with empty name");
            return;
        }
        let summary = summary.trim();

        match self.nodes.get_mut(name) {
            Some(node) => {
                node.session_ids.insert(session_id.to_string());
                let prefix: String = summary.chars().take(MERGE_PREFIX_CHARS).collect();
                if !summary.is_empty() && !node.summary.contains(&prefix) {
                    node.summary.push(' ');
                    node.summary.push_str(summary);
                    node.summary = truncate_chars(&node.summary, SUMMARY_MAX_CHARS);
                }
            }
            None => {
                let mut session_ids = std::collections::BTreeSet::new();
                session_ids.insert(session_id.to_string());
                self.nodes.insert(
                    name.to_string(),
                    EntityNode {
                        name: name.to_string(),
                        entity_type: entity_type.trim().to_lowercase(),
                        summary: truncate_chars(summary, SUMMARY_MAX_CHARS),
                        session_ids,
                    },
                );
            }
        }

        self.index_name(name);
    }

    /// Register a relationship edge; duplicate triples are silently ignored.
    ///
    /// Endpoints need not be registered entities.
    pub fn add_relationship(&mut self, edge: RelationshipEdge) {
        let key = edge.key();
        if self.edges.contains_key(&key) {
            return;
        }
        self.adjacency
            .entry(edge.source.clone())
            .or_default()
            .push(key.clone());
        if edge.target != edge.source {
            self.adjacency
                .entry(edge.target.clone())
                .or_default()
                .push(key.clone());
        }
        self.edges.insert(key, edge);
    }

    /// Canonical names of entities mentioned in a query.
    ///
    /// Every indexed token longer than two characters is tested as a whole
    /// word (non-alphanumeric boundaries) against the lowercased query; the
    /// union of the matching tokens' canonical names is returned, unordered.
    pub fn find_entities_in_query(&self, query: &str) -> Vec<String> {
        let query = query.to_lowercase();
        let mut found: HashSet<&str> = HashSet::new();
        for (token, names) in &self.name_index {
            if token.chars().count() > 2 && contains_whole_word(&query, token) {
                found.extend(names.iter().map(String::as_str));
            }
        }
        found.into_iter().map(str::to_string).collect()
    }

    /// Bounded BFS expansion around a seed set.
    ///
    /// Seeds are hop zero and appear in the output when registered. Each hop
    /// walks the adjacency of the current frontier, emitting unseen edges up
    /// to `max_relationships` and unseen nodes up to `max_entities`. The
    /// caps are hard: traversal keeps expanding the frontier after a cap is
    /// reached but emits nothing further to that list.
    pub fn context(
        &self,
        seeds: &[String],
        max_hops: usize,
        max_entities: usize,
        max_relationships: usize,
    ) -> GraphContext {
        let mut out = GraphContext::default();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut seen_edges: HashSet<&str> = HashSet::new();
        let mut frontier: Vec<&str> = Vec::new();

        for seed in seeds {
            if visited.insert(seed.as_str()) {
                if let Some(node) = self.nodes.get(seed.as_str()) {
                    if out.entities.len() < max_entities {
                        out.entities.push(node.clone());
                    }
                }
                frontier.push(seed.as_str());
            }
        }

        for _ in 0..max_hops {
            let mut next_frontier: Vec<&str> = Vec::new();
            for name in &frontier {
                let Some(edge_keys) = self.adjacency.get(*name) else {
                    continue;
                };
                for key in edge_keys {
                    let Some(edge) = self.edges.get(key) else {
                        continue;
                    };
                    if seen_edges.insert(key.as_str())
                        && out.relationships.len() < max_relationships
                    {
                        out.relationships.push(edge.clone());
                    }
                    let neighbor = if edge.source == **name {
                        edge.target.as_str()
                    } else {
                        edge.source.as_str()
                    };
                    if visited.insert(neighbor) {
                        if let Some(node) = self.nodes.get(neighbor) {
                            if out.entities.len() < max_entities {
                                out.entities.push(node.clone());
                            }
                        }
                        next_frontier.push(neighbor);
                    }
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
        }

        out
    }

    pub fn entity_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Nodes and edges in a deterministic order, for persistence.
    pub fn to_parts(&self) -> (Vec<EntityNode>, Vec<RelationshipEdge>) {
        let mut nodes: Vec<EntityNode> = self.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        let mut edges: Vec<RelationshipEdge> = self.edges.values().cloned().collect();
        edges.sort_by_key(RelationshipEdge::key);
        (nodes, edges)
    }

    /// Rebuild a graph from persisted nodes and edges.
    pub fn from_parts(nodes: Vec<EntityNode>, edges: Vec<RelationshipEdge>) -> Self {
        let mut graph = Self::new();
        for node in nodes {
            let name = node.name.trim().to_string();
            if name.is_empty() {
                continue;
            }
            graph.index_name(&name);
            graph.nodes.insert(name, node);
        }
        for edge in edges {
            graph.add_relationship(edge);
        }
        graph
    }

    /// Index the full lowercased name and each part longer than two characters.
    fn index_name(&mut self, name: &str) {
        let lower = name.to_lowercase();
        self.name_index
            .entry(lower.clone())
            .or_default()
            .insert(name.to_string());
        for part in lower.split_whitespace() {
            if part.chars().count() > 2 {
                self.name_index
                    .entry(part.to_string())
                    .or_default()
                    .insert(name.to_string());
            }
        }
    }
}

/// Whole-word containment: `needle` occurs in `haystack` with
/// non-alphanumeric characters (or the string edge) on both sides.
fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    for (idx, _) in haystack.match_indices(needle) {
        let before_ok = haystack[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[idx + needle.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
    }
    false
}

/// Truncate to at most `max` characters without splitting a scalar value.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
