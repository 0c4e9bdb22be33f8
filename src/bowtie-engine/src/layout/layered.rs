// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Layered alternative to the lane layout.
//!
//! Threats, main barriers, consequences and the top event are ranked left
//! to right by longest path and ordered within each rank by alternating
//! barycenter sweeps.  The top event is pinned to the configured centre
//! with the hazard above it, every ranked node stays on its own wing, and
//! escalation branches hang outward from their barrier as in the lane
//! layout.

use std::collections::{BTreeMap, HashMap, HashSet};

use ordered_float::OrderedFloat;
use tracing::debug;

use crate::common::{Error, ErrorCode, ErrorKind, Result};
use crate::datamodel::{Diagram, Node, NodeType, Orientation, Wing};

use super::config::LayoutConfig;
use super::geom::Position;
use super::placement::{lowest_y, place_column, place_escalation, sibling_offset};
use super::routing::route_edges;
use super::text::natural_cmp;
use super::{Card, Layout};

/// Nodes that take part in ranking.  The hazard and escalation branches
/// are placed relative to what the ranking produces.
fn is_ranked(node_type: &NodeType) -> bool {
    matches!(
        node_type,
        NodeType::Threat
            | NodeType::PreventionBarrier
            | NodeType::TopEvent
            | NodeType::MitigationBarrier
            | NodeType::Consequence
    )
}

struct Adjacency<'a> {
    preds: HashMap<&'a str, Vec<&'a str>>,
    succs: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> Adjacency<'a> {
    fn new(diagram: &'a Diagram) -> Self {
        let live: HashSet<&str> = diagram
            .nodes
            .iter()
            .filter(|n| is_ranked(&n.node_type))
            .map(|n| n.id.as_str())
            .collect();
        let mut preds: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut succs: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &diagram.edges {
            let (source, target) = edge.endpoints();
            if source == target || !live.contains(source) || !live.contains(target) {
                continue;
            }
            preds.entry(target).or_default().push(source);
            succs.entry(source).or_default().push(target);
        }
        Adjacency { preds, succs }
    }

    fn preds(&self, id: &str) -> &[&'a str] {
        self.preds.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn succs(&self, id: &str) -> &[&'a str] {
        self.succs.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Longest-path rank of every ranked node.  Fails on a directed cycle.
fn compute_ranks<'a>(
    diagram: &'a Diagram,
    adj: &Adjacency<'a>,
) -> Result<HashMap<&'a str, usize>> {
    fn visit<'a>(
        id: &'a str,
        adj: &Adjacency<'a>,
        ranks: &mut HashMap<&'a str, usize>,
        visiting: &mut HashSet<&'a str>,
    ) -> Result<usize> {
        if let Some(&rank) = ranks.get(id) {
            return Ok(rank);
        }
        if !visiting.insert(id) {
            return Err(Error::new(
                ErrorKind::Layout,
                ErrorCode::Cycle,
                Some(format!("cycle through '{id}'")),
            ));
        }
        let mut rank = 0;
        for &pred in adj.preds(id) {
            rank = rank.max(visit(pred, adj, ranks, visiting)? + 1);
        }
        visiting.remove(id);
        ranks.insert(id, rank);
        Ok(rank)
    }

    let mut ranks = HashMap::new();
    let mut visiting = HashSet::new();
    for node in diagram.nodes.iter().filter(|n| is_ranked(&n.node_type)) {
        visit(node.id.as_str(), adj, &mut ranks, &mut visiting)?;
    }
    Ok(ranks)
}

fn mean_index(neighbours: &[&str], index: &HashMap<&str, usize>) -> Option<f64> {
    let found: Vec<f64> = neighbours
        .iter()
        .filter_map(|n| index.get(n).map(|&i| i as f64))
        .collect();
    if found.is_empty() {
        None
    } else {
        Some(found.iter().sum::<f64>() / found.len() as f64)
    }
}

/// Reorder each rank by the mean position of its neighbours in the rank
/// before (even sweeps) or after (odd sweeps).
fn order_by_barycenter(layers: &mut [Vec<&str>], adj: &Adjacency, iterations: usize) {
    let mut index: HashMap<&str, usize> = HashMap::new();
    for layer in layers.iter() {
        for (i, id) in layer.iter().enumerate() {
            index.insert(*id, i);
        }
    }

    for iteration in 0..iterations {
        let downward = iteration % 2 == 0;
        let sweep: Vec<usize> = if downward {
            (1..layers.len()).collect()
        } else {
            (0..layers.len().saturating_sub(1)).rev().collect()
        };

        for r in sweep {
            let mut keyed: Vec<(&str, f64)> = layers[r]
                .iter()
                .map(|&id| {
                    let neighbours = if downward { adj.preds(id) } else { adj.succs(id) };
                    let current = index.get(id).copied().unwrap_or(0) as f64;
                    (id, mean_index(neighbours, &index).unwrap_or(current))
                })
                .collect();
            keyed.sort_by_key(|&(_, key)| OrderedFloat(key));

            layers[r] = keyed.into_iter().map(|(id, _)| id).collect();
            for (i, id) in layers[r].iter().enumerate() {
                index.insert(*id, i);
            }
        }
    }
}

fn misplaced(column: isize, wing: Option<Wing>) -> bool {
    match wing {
        Some(Wing::Left) => column >= 0,
        Some(Wing::Right) => column <= 0,
        None => false,
    }
}

/// Column of each ranked node relative to the top event's.  Nodes that
/// longest-path ranking leaves on the wrong side of the spine (those no
/// path ties to the top event) are shifted together onto their own wing,
/// keeping their order.
fn assign_columns<'a>(
    diagram: &'a Diagram,
    ranks: &HashMap<&'a str, usize>,
    wings: &HashMap<String, Wing>,
) -> BTreeMap<isize, Vec<&'a str>> {
    let depth = ranks.values().copied().max().map_or(0, |r| r + 1);
    let anchor = diagram
        .top_event()
        .and_then(|te| ranks.get(te.id.as_str()).copied())
        .unwrap_or(depth.saturating_sub(1) / 2) as isize;

    let ranked: Vec<(&str, isize, Option<Wing>)> = diagram
        .nodes
        .iter()
        .filter(|n| is_ranked(&n.node_type))
        .map(|n| {
            let id = n.id.as_str();
            (id, ranks[id] as isize - anchor, wings.get(&n.id).copied())
        })
        .collect();

    let left_shift = ranked
        .iter()
        .filter(|r| r.2 == Some(Wing::Left) && misplaced(r.1, r.2))
        .map(|r| r.1)
        .max()
        .map_or(0, |furthest| -1 - furthest);
    let right_shift = ranked
        .iter()
        .filter(|r| r.2 == Some(Wing::Right) && misplaced(r.1, r.2))
        .map(|r| r.1)
        .min()
        .map_or(0, |furthest| 1 - furthest);

    let mut columns: BTreeMap<isize, Vec<&str>> = BTreeMap::new();
    for &(id, column, wing) in &ranked {
        let column = match wing {
            Some(Wing::Left) if misplaced(column, wing) => column + left_shift,
            Some(Wing::Right) if misplaced(column, wing) => column + right_shift,
            _ => column,
        };
        columns.entry(column).or_default().push(id);
    }
    columns
}

fn unplaced(
    diagram: &Diagram,
    positions: &HashMap<String, Position>,
    keep: impl Fn(&Node) -> bool,
) -> Vec<String> {
    diagram
        .nodes
        .iter()
        .filter(|n| !positions.contains_key(&n.id) && keep(n))
        .map(|n| n.id.clone())
        .collect()
}

/// Lay out `diagram` as ranked columns flowing left to right.
pub fn compute_layered_layout(diagram: &Diagram, config: &LayoutConfig) -> Result<Layout> {
    let mut config = config.clone();
    config.validate();

    let adj = Adjacency::new(diagram);
    let ranks = compute_ranks(diagram, &adj)?;
    let nodes: HashMap<&str, &Node> = diagram.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let wings = diagram.resolve_wings();

    let columns = assign_columns(diagram, &ranks, &wings);
    let keys: Vec<isize> = columns.keys().copied().collect();
    let mut layers: Vec<Vec<&str>> = columns.into_values().collect();
    for layer in layers.iter_mut() {
        layer.sort_by(|a, b| {
            natural_cmp(&nodes[a].label, &nodes[b].label).then_with(|| a.cmp(b))
        });
    }
    order_by_barycenter(&mut layers, &adj, config.barycenter_iterations);
    debug!(columns = layers.len(), "computing layered layout");

    let top_event = diagram.top_event().map(|te| te.id.as_str());
    let mut positions: HashMap<String, Position> = HashMap::new();
    for (&key, layer) in keys.iter().zip(&layers) {
        let x = config.center_x + key as f64 * config.rank_spacing;
        // the top event's column is shifted so the top event sits on the centre line
        let pin = layer
            .iter()
            .position(|id| Some(*id) == top_event)
            .map_or(0.0, |i| sibling_offset(i, layer.len(), config.row_spacing));
        for (i, id) in layer.iter().enumerate() {
            let y = config.center_y + sibling_offset(i, layer.len(), config.row_spacing) - pin;
            positions.insert(id.to_string(), Position::new(x, y));
        }
    }

    if let Some(hazard) = diagram.hazard() {
        let above = Position::new(config.center_x, config.center_y - config.hazard_offset_y);
        positions.insert(hazard.id.clone(), above);
    }

    place_escalation(diagram, &config, &mut positions);

    for wing in [Wing::Left, Wing::Right] {
        let orphans = unplaced(diagram, &positions, |n| {
            n.node_type.is_escalation() && wings.get(&n.id) == Some(&wing)
        });
        if orphans.is_empty() {
            continue;
        }
        let x = config.center_x + wing.sign() * (config.rank_spacing + config.escalation_offset_x);
        let below = lowest_y(&positions, &config, Some(wing));
        place_column(&orphans, x, below, &config, &mut positions);
    }
    let rest = unplaced(diagram, &positions, |_| true);
    if !rest.is_empty() {
        debug!(count = rest.len(), "placing unattached nodes under the spine");
        let below = lowest_y(&positions, &config, None);
        place_column(&rest, config.center_x, below, &config, &mut positions);
    }

    let placed = diagram
        .nodes
        .iter()
        .filter_map(|n| {
            let position = *positions.get(&n.id)?;
            let orientation = Orientation::from(wings.get(&n.id).copied());
            Some(Card::for_node(n, &config).place(n, position, &config, orientation))
        })
        .collect();

    Ok(Layout {
        nodes: placed,
        edges: route_edges(diagram, &[], &wings),
    })
}
