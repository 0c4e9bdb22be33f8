// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::datamodel::{Diagram, Edge, HandleSide, Node, NodeType, Wing};
use crate::lanes::{build_consequence_lane_edges, build_threat_lane_edges, top_event_handles};

use super::chain::{Chain, chains_to_lanes};

/// An edge with both attachment sides decided.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: HandleSide,
    pub target_handle: HandleSide,
}

/// Attachment sides for an edge from `source` to `target`.
fn handles(
    source: &Node,
    target: &Node,
    wings: &HashMap<String, Wing>,
) -> (HandleSide, HandleSide) {
    use HandleSide::*;

    let branch_wing = || wings.get(&target.id).copied().unwrap_or(Wing::Left);
    let (mut from, mut to) = match (&source.node_type, &target.node_type) {
        (NodeType::Hazard, _) => (Bottom, Top),
        (s, NodeType::EscalationBarrier) if s.is_main_barrier() => match branch_wing() {
            Wing::Left => (Bottom, Right),
            Wing::Right => (Bottom, Left),
        },
        (NodeType::EscalationBarrier, NodeType::EscalationFactor) => match branch_wing() {
            Wing::Left => (Left, Right),
            Wing::Right => (Right, Left),
        },
        _ => (Right, Left),
    };

    let (source_override, target_override) = top_event_handles(source, target);
    if let Some(side) = source_override {
        from = side;
    }
    if let Some(side) = target_override {
        to = side;
    }
    (from, to)
}

fn routed(
    edge: &Edge,
    nodes: &HashMap<&str, &Node>,
    wings: &HashMap<String, Wing>,
) -> Option<RoutedEdge> {
    let source = nodes.get(edge.source.as_str())?;
    let target = nodes.get(edge.target.as_str())?;
    let (default_source, default_target) = handles(source, target, wings);
    Some(RoutedEdge {
        id: edge.id.clone(),
        source: edge.source.clone(),
        target: edge.target.clone(),
        source_handle: edge.source_handle.unwrap_or(default_source),
        target_handle: edge.target_handle.unwrap_or(default_target),
    })
}

/// Route the reconstructed chain edges first, then every raw edge whose
/// endpoints exist and whose (source, target) pair no chain edge covers.
pub fn route_edges(
    diagram: &Diagram,
    chains: &[Chain],
    wings: &HashMap<String, Wing>,
) -> Vec<RoutedEdge> {
    let nodes: HashMap<&str, &Node> = diagram.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let lanes = chains_to_lanes(chains);
    let mut chain_edges = build_threat_lane_edges(&lanes.threats, &diagram.nodes);
    chain_edges.extend(build_consequence_lane_edges(
        &lanes.consequences,
        &diagram.nodes,
    ));

    let covered: HashSet<(&str, &str)> = chain_edges.iter().map(Edge::endpoints).collect();
    let mut result: Vec<RoutedEdge> = chain_edges
        .iter()
        .filter_map(|e| routed(e, &nodes, wings))
        .collect();

    for edge in &diagram.edges {
        if covered.contains(&edge.endpoints()) {
            continue;
        }
        match routed(edge, &nodes, wings) {
            Some(r) => result.push(r),
            None => debug!(edge = edge.id.as_str(), "skipping edge with a missing endpoint"),
        }
    }

    result
}
