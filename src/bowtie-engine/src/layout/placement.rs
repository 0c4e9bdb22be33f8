// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashMap;

use crate::datamodel::{Diagram, Node, NodeType, Wing};

use super::config::LayoutConfig;
use super::geom::Position;
use super::text::natural_cmp;

/// Escalation nodes hanging off one main barrier.
#[derive(Clone, Debug, PartialEq)]
pub struct EscalationCluster {
    pub parent: String,
    pub members: Vec<String>,
}

/// Offset of sibling `index` of `count` from the middle of the group.
pub fn sibling_offset(index: usize, count: usize, gap: f64) -> f64 {
    (index as f64 - (count as f64 - 1.0) / 2.0) * gap
}

/// The wing a placed node sits on, judged by which side of the spine it is.
pub fn side_of(position: Position, config: &LayoutConfig) -> Wing {
    if position.x < config.center_x {
        Wing::Left
    } else {
        Wing::Right
    }
}

/// Lowest placed centre on `wing`, or on the whole diagram for `None`.
pub fn lowest_y(
    positions: &HashMap<String, Position>,
    config: &LayoutConfig,
    wing: Option<Wing>,
) -> f64 {
    positions
        .values()
        .filter(|p| wing.is_none_or(|w| side_of(**p, config) == w))
        .map(|p| p.y)
        .fold(config.center_y, f64::max)
}

/// Children of `parent` with type `child_type` that are not placed yet,
/// sorted by label.
fn unplaced_children<'a>(
    diagram: &'a Diagram,
    nodes: &HashMap<&str, &'a Node>,
    positions: &HashMap<String, Position>,
    parent: &str,
    child_type: &NodeType,
) -> Vec<&'a Node> {
    let mut children: Vec<&'a Node> = diagram
        .edges
        .iter()
        .filter(|e| e.source == parent)
        .filter_map(|e| nodes.get(e.target.as_str()).copied())
        .filter(|n| &n.node_type == child_type && !positions.contains_key(&n.id))
        .collect();
    children.sort_by(|a, b| natural_cmp(&a.label, &b.label).then_with(|| a.id.cmp(&b.id)));
    children.dedup_by(|a, b| a.id == b.id);
    children
}

/// Place escalation barriers outward and below their main barrier, and
/// escalation factors further outward beside their escalation barrier.
/// Main barriers are visited in diagram order; a node reachable from
/// several parents stays with the first.
pub fn place_escalation(
    diagram: &Diagram,
    config: &LayoutConfig,
    positions: &mut HashMap<String, Position>,
) -> Vec<EscalationCluster> {
    let nodes: HashMap<&str, &Node> = diagram.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let mut clusters = Vec::new();

    for parent in diagram.nodes.iter().filter(|n| n.node_type.is_main_barrier()) {
        let Some(&parent_pos) = positions.get(&parent.id) else {
            continue;
        };
        let sign = side_of(parent_pos, config).sign();

        let barriers = unplaced_children(
            diagram,
            &nodes,
            positions,
            &parent.id,
            &NodeType::EscalationBarrier,
        );
        if barriers.is_empty() {
            continue;
        }

        let mut members = Vec::new();
        let count = barriers.len();
        for (i, barrier) in barriers.into_iter().enumerate() {
            let pos = Position::new(
                parent_pos.x + sign * config.escalation_offset_x,
                parent_pos.y
                    + config.escalation_offset_y
                    + sibling_offset(i, count, config.escalation_sibling_gap),
            );
            positions.insert(barrier.id.clone(), pos);
            members.push(barrier.id.clone());

            let factors = unplaced_children(
                diagram,
                &nodes,
                positions,
                &barrier.id,
                &NodeType::EscalationFactor,
            );
            let factor_count = factors.len();
            for (j, factor) in factors.into_iter().enumerate() {
                positions.insert(
                    factor.id.clone(),
                    Position::new(
                        pos.x + sign * config.factor_offset_x,
                        pos.y + sibling_offset(j, factor_count, config.factor_sibling_gap),
                    ),
                );
                members.push(factor.id.clone());
            }
        }

        clusters.push(EscalationCluster {
            parent: parent.id.clone(),
            members,
        });
    }

    clusters
}

/// Stack `ids` in a column at `x`, one row apart, starting a row below
/// `below_y`.
pub fn place_column(
    ids: &[String],
    x: f64,
    below_y: f64,
    config: &LayoutConfig,
    positions: &mut HashMap<String, Position>,
) {
    for (i, id) in ids.iter().enumerate() {
        let y = below_y + config.row_spacing * (i + 1) as f64;
        positions.insert(id.clone(), Position::new(x, y));
    }
}
