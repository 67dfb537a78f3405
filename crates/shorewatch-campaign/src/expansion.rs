// crates/shorewatch-campaign/src/expansion.rs
// ============================================================================
// Module: Indicator Expansion
// Description: Depth-limited BFS over the indicator relationship graph.
// Purpose: Expand campaign indicators without owned pointer chains.
// Dependencies: serde, shorewatch-core
// ============================================================================

//! ## Overview
//! The relationship graph can be cyclic, so indicators are interned into a
//! string arena and edges kept as a flat index list. Expansion is a
//! breadth-first search over integer ids with a visited set, bounded by
//! depth and a per-level fan-out cap. The strategy selects which relation
//! kinds an edge may contribute.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::VecDeque;

use serde::Deserialize;
use serde::Serialize;
use shorewatch_core::IndicatorRelationship;
use shorewatch_core::RelationKind;

// ============================================================================
// SECTION: Strategy
// ============================================================================

/// Edge filter applied during expansion.
///
/// # Invariants
/// - Variants are stable for tool schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionStrategy {
    /// Follow every relation kind.
    #[default]
    Comprehensive,
    /// Follow infrastructure relations only.
    Infrastructure,
    /// Follow temporal relations only.
    Temporal,
}

impl ExpansionStrategy {
    /// Returns true when the strategy follows the given relation kind.
    #[must_use]
    pub const fn follows(self, kind: RelationKind) -> bool {
        match self {
            Self::Comprehensive => true,
            Self::Infrastructure => matches!(
                kind,
                RelationKind::SameSubnet
                    | RelationKind::SameAsn
                    | RelationKind::SharedInfrastructure
            ),
            Self::Temporal => matches!(kind, RelationKind::TemporalCluster),
        }
    }
}

// ============================================================================
// SECTION: Result
// ============================================================================

/// Outcome of one expansion run.
///
/// # Invariants
/// - `indicators` excludes the seeds.
/// - `depth_reached <= max_depth`.
#[derive(Debug, Clone, Serialize)]
pub struct ExpansionResult {
    /// Indicators discovered by the expansion, sorted.
    pub indicators: Vec<String>,
    /// Relationships traversed to reach them.
    pub relationships: Vec<IndicatorRelationship>,
    /// Deepest level that contributed an indicator.
    pub depth_reached: u32,
}

// ============================================================================
// SECTION: Interned Graph
// ============================================================================

/// Interned indicator graph with flat edges.
///
/// # Invariants
/// - `arena[index]` is the indicator string for node `index`.
/// - Edges reference arena indices only.
pub struct IndicatorGraph {
    /// Interned indicator strings.
    arena: Vec<String>,
    /// Index from indicator string to arena id.
    ids: HashMap<String, usize>,
    /// Flat directed edges `(from, to, edge index)`.
    adjacency: HashMap<usize, Vec<(usize, usize)>>,
    /// Original relationship records by edge index.
    edges: Vec<IndicatorRelationship>,
}

impl IndicatorGraph {
    /// Builds a graph from relationship records.
    ///
    /// Edges are treated as bidirectional for traversal; the original
    /// directed record is preserved for reporting.
    #[must_use]
    pub fn from_relationships(relationships: Vec<IndicatorRelationship>) -> Self {
        let mut graph = Self {
            arena: Vec::new(),
            ids: HashMap::new(),
            adjacency: HashMap::new(),
            edges: Vec::new(),
        };
        for relationship in relationships {
            let from = graph.intern(&relationship.source_indicator);
            let to = graph.intern(&relationship.related_indicator);
            let edge_index = graph.edges.len();
            graph.edges.push(relationship);
            graph.adjacency.entry(from).or_default().push((to, edge_index));
            graph.adjacency.entry(to).or_default().push((from, edge_index));
        }
        graph
    }

    /// Interns an indicator string, returning its arena id.
    fn intern(&mut self, indicator: &str) -> usize {
        if let Some(id) = self.ids.get(indicator) {
            return *id;
        }
        let id = self.arena.len();
        self.arena.push(indicator.to_string());
        self.ids.insert(indicator.to_string(), id);
        id
    }

    /// Expands seed indicators breadth-first.
    ///
    /// Each level contributes at most `fanout_cap` new indicators; nodes
    /// already visited (cycles) are skipped.
    #[must_use]
    pub fn expand(
        &self,
        seeds: &[String],
        strategy: ExpansionStrategy,
        max_depth: u32,
        fanout_cap: usize,
    ) -> ExpansionResult {
        let mut visited: BTreeSet<usize> = BTreeSet::new();
        let mut frontier: VecDeque<usize> = VecDeque::new();
        for seed in seeds {
            if let Some(id) = self.ids.get(seed) {
                visited.insert(*id);
                frontier.push_back(*id);
            }
        }
        let mut discovered: BTreeSet<usize> = BTreeSet::new();
        let mut used_edges: BTreeSet<usize> = BTreeSet::new();
        let mut depth_reached = 0;
        for depth in 1 ..= max_depth {
            if frontier.is_empty() {
                break;
            }
            let mut next_frontier: VecDeque<usize> = VecDeque::new();
            let mut level_count = 0usize;
            while let Some(node) = frontier.pop_front() {
                let Some(neighbors) = self.adjacency.get(&node) else {
                    continue;
                };
                for (neighbor, edge_index) in neighbors {
                    if level_count >= fanout_cap {
                        break;
                    }
                    let kind = self.edges[*edge_index].relation_kind;
                    if !strategy.follows(kind) || visited.contains(neighbor) {
                        continue;
                    }
                    visited.insert(*neighbor);
                    discovered.insert(*neighbor);
                    used_edges.insert(*edge_index);
                    next_frontier.push_back(*neighbor);
                    level_count += 1;
                    depth_reached = depth;
                }
            }
            frontier = next_frontier;
        }
        ExpansionResult {
            indicators: discovered.iter().map(|id| self.arena[*id].clone()).collect(),
            relationships: used_edges.iter().map(|index| self.edges[*index].clone()).collect(),
            depth_reached,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
