// crates/shorewatch-campaign/src/expansion/tests.rs
// ============================================================================
// Module: Indicator Expansion Tests
// Description: Unit tests for BFS expansion over the interned graph.
// Purpose: Validate depth limits, cycles, fan-out caps, and strategies.
// Dependencies: shorewatch-campaign
// ============================================================================

//! ## Overview
//! Exercises expansion over hand-built relationship graphs, including a
//! cycle and a fan-out beyond the level cap.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use shorewatch_core::IndicatorRelationship;
use shorewatch_core::RelationKind;

use super::ExpansionStrategy;
use super::IndicatorGraph;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Builds a relationship edge.
fn edge(from: &str, to: &str, kind: RelationKind) -> IndicatorRelationship {
    IndicatorRelationship {
        source_indicator: from.to_string(),
        related_indicator: to.to_string(),
        relation_kind: kind,
        confidence: 0.6,
        evidence_event_ids: vec!["evt-1".to_string()],
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn bfs_respects_the_depth_limit() {
    let graph = IndicatorGraph::from_relationships(vec![
        edge("a", "b", RelationKind::SameSubnet),
        edge("b", "c", RelationKind::SameSubnet),
        edge("c", "d", RelationKind::SameSubnet),
    ]);
    let shallow = graph.expand(&["a".to_string()], ExpansionStrategy::Comprehensive, 1, 10);
    assert_eq!(shallow.indicators, vec!["b".to_string()]);
    assert_eq!(shallow.depth_reached, 1);

    let deep = graph.expand(&["a".to_string()], ExpansionStrategy::Comprehensive, 3, 10);
    assert_eq!(deep.indicators, vec!["b".to_string(), "c".to_string(), "d".to_string()]);
    assert_eq!(deep.depth_reached, 3);
}

#[test]
fn cycles_do_not_loop() {
    let graph = IndicatorGraph::from_relationships(vec![
        edge("a", "b", RelationKind::SharedInfrastructure),
        edge("b", "c", RelationKind::SharedInfrastructure),
        edge("c", "a", RelationKind::SharedInfrastructure),
    ]);
    let result = graph.expand(&["a".to_string()], ExpansionStrategy::Comprehensive, 10, 10);
    assert_eq!(result.indicators.len(), 2, "seeds are not rediscovered");
    assert!(result.depth_reached <= 2);
}

#[test]
fn fanout_cap_bounds_each_level() {
    let edges: Vec<IndicatorRelationship> =
        (0 .. 10).map(|i| edge("hub", &format!("leaf-{i}"), RelationKind::SameAsn)).collect();
    let graph = IndicatorGraph::from_relationships(edges);
    let result = graph.expand(&["hub".to_string()], ExpansionStrategy::Comprehensive, 1, 3);
    assert_eq!(result.indicators.len(), 3);
}

#[test]
fn strategies_filter_relation_kinds() {
    let graph = IndicatorGraph::from_relationships(vec![
        edge("a", "infra", RelationKind::SharedInfrastructure),
        edge("a", "temporal", RelationKind::TemporalCluster),
        edge("a", "behavioral", RelationKind::BehavioralMatch),
    ]);
    let infra = graph.expand(&["a".to_string()], ExpansionStrategy::Infrastructure, 2, 10);
    assert_eq!(infra.indicators, vec!["infra".to_string()]);

    let temporal = graph.expand(&["a".to_string()], ExpansionStrategy::Temporal, 2, 10);
    assert_eq!(temporal.indicators, vec!["temporal".to_string()]);

    let all = graph.expand(&["a".to_string()], ExpansionStrategy::Comprehensive, 2, 10);
    assert_eq!(all.indicators.len(), 3);
}

#[test]
fn unknown_seeds_expand_to_nothing() {
    let graph = IndicatorGraph::from_relationships(vec![edge("a", "b", RelationKind::SameSubnet)]);
    let result = graph.expand(&["zzz".to_string()], ExpansionStrategy::Comprehensive, 3, 10);
    assert!(result.indicators.is_empty());
    assert_eq!(result.depth_reached, 0);
}
