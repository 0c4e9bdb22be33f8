// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Lane orders: the authoritative left-to-right sequence of barriers
//! between each threat and the top event (and between the top event and
//! each consequence), plus the builders that turn lanes back into edges.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::datamodel::{Diagram, Edge, HandleSide, Node, NodeType, Orientation};

/// Prefix for edge ids produced by the chain builders.
pub const LANE_EDGE_PREFIX: &str = "lane:";

pub fn make_lane_edge_id(source: &str, target: &str) -> String {
    format!("{LANE_EDGE_PREFIX}{source}->{target}")
}

/// Owner id (a threat or a consequence) -> barrier ids in reading order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaneOrder {
    lanes: BTreeMap<String, Vec<String>>,
}

/// Threat id -> prevention barrier ids, threat side first.
pub type ThreatLaneOrder = LaneOrder;
/// Consequence id -> mitigation barrier ids, top event side first.
pub type ConsequenceLaneOrder = LaneOrder;

impl LaneOrder {
    pub fn new() -> Self {
        LaneOrder::default()
    }

    pub fn get(&self, owner: &str) -> Option<&[String]> {
        self.lanes.get(owner).map(|l| l.as_slice())
    }

    pub fn insert_lane(&mut self, owner: &str, barriers: Vec<String>) {
        self.lanes.insert(owner.to_string(), barriers);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.lanes.iter()
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Every lane owner holding `barrier`, in owner order.
    pub fn owners_of(&self, barrier: &str) -> Vec<&str> {
        self.lanes
            .iter()
            .filter(|(_, barriers)| barriers.iter().any(|b| b == barrier))
            .map(|(owner, _)| owner.as_str())
            .collect()
    }

    /// Barriers that appear in more than one lane (or twice in the same
    /// lane), mapped to the owners holding them.  Empty for a healthy
    /// lane order.
    pub fn duplicated_barriers(&self) -> BTreeMap<String, Vec<String>> {
        let mut holders: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (owner, barriers) in &self.lanes {
            for barrier in barriers {
                holders
                    .entry(barrier.clone())
                    .or_default()
                    .push(owner.clone());
            }
        }
        holders.retain(|_, owners| owners.len() > 1);
        holders
    }
}

impl FromIterator<(String, Vec<String>)> for LaneOrder {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        LaneOrder {
            lanes: iter.into_iter().collect(),
        }
    }
}

/// Both wings' lane orders, as derived on load or edited by the user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneOrders {
    pub threats: ThreatLaneOrder,
    pub consequences: ConsequenceLaneOrder,
}

impl LaneOrders {
    pub fn derive(diagram: &Diagram) -> Self {
        LaneOrders {
            threats: derive_threat_lane_order(diagram),
            consequences: derive_consequence_lane_order(diagram),
        }
    }
}

/// For each threat, walk outgoing edges to the first prevention barrier
/// successor, hop by hop, until there is none.
pub fn derive_threat_lane_order(diagram: &Diagram) -> ThreatLaneOrder {
    let types = diagram.type_index();
    let is_barrier = |id: &str| types.get(id).copied() == Some(&NodeType::PreventionBarrier);

    let mut lanes = LaneOrder::new();
    for threat in diagram.nodes_of_type(NodeType::Threat) {
        let mut visited: HashSet<&str> = HashSet::from([threat.id.as_str()]);
        let mut chain = Vec::new();
        let mut current = threat.id.as_str();
        while let Some(next) = diagram
            .edges
            .iter()
            .filter(|e| e.source == current)
            .map(|e| e.target.as_str())
            .find(|t| is_barrier(*t) && !visited.contains(t))
        {
            visited.insert(next);
            chain.push(next.to_string());
            current = next;
        }
        lanes.insert_lane(&threat.id, chain);
    }

    log_duplicates("threat", &lanes);
    lanes
}

/// For each consequence, walk incoming edges back through mitigation
/// barriers, then present the lane top event side first.
pub fn derive_consequence_lane_order(diagram: &Diagram) -> ConsequenceLaneOrder {
    let types = diagram.type_index();
    let is_barrier = |id: &str| types.get(id).copied() == Some(&NodeType::MitigationBarrier);

    let mut lanes = LaneOrder::new();
    for consequence in diagram.nodes_of_type(NodeType::Consequence) {
        let mut visited: HashSet<&str> = HashSet::from([consequence.id.as_str()]);
        let mut chain = Vec::new();
        let mut current = consequence.id.as_str();
        while let Some(prev) = diagram
            .edges
            .iter()
            .filter(|e| e.target == current)
            .map(|e| e.source.as_str())
            .find(|s| is_barrier(*s) && !visited.contains(s))
        {
            visited.insert(prev);
            chain.push(prev.to_string());
            current = prev;
        }
        chain.reverse();
        lanes.insert_lane(&consequence.id, chain);
    }

    log_duplicates("consequence", &lanes);
    lanes
}

fn log_duplicates(wing: &str, lanes: &LaneOrder) {
    for (barrier, owners) in lanes.duplicated_barriers() {
        debug!(wing, barrier = %barrier, ?owners, "barrier shared by several lanes");
    }
}

/// Move `barrier` into `new_owner`'s lane at `insert_index` (clamped to the
/// lane's length), removing it from wherever it was.  The input is left
/// untouched.
pub fn move_barrier_to_lane(
    lanes: &LaneOrder,
    barrier: &str,
    new_owner: &str,
    insert_index: usize,
) -> LaneOrder {
    let holders = lanes.owners_of(barrier);
    if holders.len() > 1 {
        warn!(barrier, ?holders, "barrier held by more than one lane");
    }

    let mut next = lanes.clone();
    for lane in next.lanes.values_mut() {
        lane.retain(|b| b != barrier);
    }
    let lane = next.lanes.entry(new_owner.to_string()).or_default();
    let index = insert_index.min(lane.len());
    lane.insert(index, barrier.to_string());
    next
}

pub fn move_barrier_to_threat(
    lanes: &ThreatLaneOrder,
    barrier: &str,
    threat: &str,
    insert_index: usize,
) -> ThreatLaneOrder {
    move_barrier_to_lane(lanes, barrier, threat, insert_index)
}

/// Handle overrides for an edge touching the top event: a left-oriented
/// (non-hazard) source enters on the left, a right-oriented target is
/// left from the right.
pub(crate) fn top_event_handles(
    source: &Node,
    target: &Node,
) -> (Option<HandleSide>, Option<HandleSide>) {
    let mut source_handle = None;
    let mut target_handle = None;
    if target.node_type == NodeType::TopEvent
        && source.node_type != NodeType::Hazard
        && source.orientation() == Orientation::Left
    {
        target_handle = Some(HandleSide::Left);
    }
    if source.node_type == NodeType::TopEvent && target.orientation() == Orientation::Right {
        source_handle = Some(HandleSide::Right);
    }
    (source_handle, target_handle)
}

fn chain_edges(path: &[&Node]) -> Vec<Edge> {
    path.windows(2)
        .map(|pair| {
            let (source, target) = (pair[0], pair[1]);
            let mut edge = Edge::new(
                &make_lane_edge_id(&source.id, &target.id),
                &source.id,
                &target.id,
            );
            (edge.source_handle, edge.target_handle) = top_event_handles(source, target);
            edge
        })
        .collect()
}

fn live_index(nodes: &[Node]) -> HashMap<&str, &Node> {
    nodes.iter().map(|n| (n.id.as_str(), n)).collect()
}

/// Resolve a lane against the live nodes: `None` if the owner is gone,
/// otherwise the barriers that still exist.
fn live_lane<'a>(
    live: &HashMap<&str, &'a Node>,
    owner: &str,
    barriers: &[String],
) -> Option<(&'a Node, Vec<&'a Node>)> {
    let Some(owner_node) = live.get(owner).copied() else {
        debug!(owner, "skipping lane whose owner no longer exists");
        return None;
    };
    let barriers = barriers
        .iter()
        .filter_map(|b| live.get(b.as_str()).copied())
        .collect();
    Some((owner_node, barriers))
}

/// threat -> b0 -> ... -> bn -> top event for every lane; an empty lane
/// yields a single threat -> top event edge.
pub fn build_threat_lane_edges(lanes: &ThreatLaneOrder, nodes: &[Node]) -> Vec<Edge> {
    let live = live_index(nodes);
    let top_event = nodes.iter().find(|n| n.node_type == NodeType::TopEvent);

    let mut edges = Vec::new();
    for (owner, barriers) in lanes.iter() {
        let Some((owner, barriers)) = live_lane(&live, owner, barriers) else {
            continue;
        };
        let mut path = Vec::with_capacity(barriers.len() + 2);
        path.push(owner);
        path.extend(barriers);
        path.extend(top_event);
        edges.extend(chain_edges(&path));
    }
    edges
}

/// top event -> m0 -> ... -> mn -> consequence for every lane; an empty
/// lane yields a single top event -> consequence edge.
pub fn build_consequence_lane_edges(lanes: &ConsequenceLaneOrder, nodes: &[Node]) -> Vec<Edge> {
    let live = live_index(nodes);
    let top_event = nodes.iter().find(|n| n.node_type == NodeType::TopEvent);

    let mut edges = Vec::new();
    for (owner, barriers) in lanes.iter() {
        let Some((owner, barriers)) = live_lane(&live, owner, barriers) else {
            continue;
        };
        let mut path = Vec::with_capacity(barriers.len() + 2);
        path.extend(top_event);
        path.extend(barriers);
        path.push(owner);
        edges.extend(chain_edges(&path));
    }
    edges
}

/// Drop every existing edge that shares a (source, target) pair with one of
/// `lane_edges`, keep the rest in order, and append `lane_edges`.
pub fn replace_lane_edges(existing: &[Edge], lane_edges: Vec<Edge>) -> Vec<Edge> {
    let mut result: Vec<Edge> = {
        let replaced: HashSet<(&str, &str)> = lane_edges.iter().map(Edge::endpoints).collect();
        existing
            .iter()
            .filter(|e| !replaced.contains(&e.endpoints()))
            .cloned()
            .collect()
    };
    result.extend(lane_edges);
    result
}

pub fn replace_threat_lane_edges(existing: &[Edge], lane_edges: Vec<Edge>) -> Vec<Edge> {
    replace_lane_edges(existing, lane_edges)
}

/// Rewrite every chain edge of `diagram` from the given lanes.  Existing
/// lane-shaped edges whose endpoints the lanes account for are dropped
/// first, so a barrier moved to another lane leaves no stale edge behind.
/// Hazard, escalation and unrelated edges are kept as they are.
pub fn rebuild_lane_edges(
    diagram: &Diagram,
    threat_lanes: &ThreatLaneOrder,
    consequence_lanes: &ConsequenceLaneOrder,
) -> Diagram {
    let types = diagram.type_index();
    let accounted: HashSet<&str> = threat_lanes
        .iter()
        .chain(consequence_lanes.iter())
        .flat_map(|(owner, barriers)| {
            std::iter::once(owner.as_str()).chain(barriers.iter().map(String::as_str))
        })
        .collect();
    let covered = |id: &str| match types.get(id) {
        Some(NodeType::TopEvent) => true,
        Some(_) => accounted.contains(id),
        None => false,
    };

    let is_lane_shaped = |edge: &Edge| {
        let (Some(source), Some(target)) = (
            types.get(edge.source.as_str()),
            types.get(edge.target.as_str()),
        ) else {
            return false;
        };
        use NodeType::*;
        let shaped = matches!(
            (source, target),
            (Threat, PreventionBarrier)
                | (Threat, TopEvent)
                | (PreventionBarrier, PreventionBarrier)
                | (PreventionBarrier, TopEvent)
                | (TopEvent, MitigationBarrier)
                | (TopEvent, Consequence)
                | (MitigationBarrier, MitigationBarrier)
                | (MitigationBarrier, Consequence)
        );
        shaped && covered(edge.source.as_str()) && covered(edge.target.as_str())
    };

    let kept: Vec<Edge> = diagram
        .edges
        .iter()
        .filter(|e| !is_lane_shaped(e))
        .cloned()
        .collect();
    let mut lane_edges = build_threat_lane_edges(threat_lanes, &diagram.nodes);
    lane_edges.extend(build_consequence_lane_edges(
        consequence_lanes,
        &diagram.nodes,
    ));

    let mut rebuilt = diagram.clone();
    rebuilt.edges = replace_lane_edges(&kept, lane_edges);
    rebuilt
}

/// Index at which a barrier dropped at `drop_x` lands, given the x centres
/// of the lane's current barriers in reading order.
pub fn insertion_slot(lane_positions: &[f64], drop_x: f64) -> usize {
    lane_positions.iter().filter(|&&x| x < drop_x).count()
}
