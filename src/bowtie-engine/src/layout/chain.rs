// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::datamodel::{Diagram, Node, NodeType, Wing};
use crate::lanes::{LaneOrder, LaneOrders};

use super::text::natural_cmp;

/// One lane as the layout sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct Chain {
    /// The threat or consequence the lane belongs to.
    pub owner: String,
    pub wing: Wing,
    /// Barrier ids ordered from the top event outward.
    pub barriers: Vec<String>,
}

impl Chain {
    /// The barrier next to the owner, if the lane has any.
    pub fn anchor(&self) -> Option<&str> {
        self.barriers.last().map(String::as_str)
    }

    /// Barrier ids in left-to-right reading order.
    pub fn reading_order(&self) -> Vec<String> {
        match self.wing {
            Wing::Left => self.barriers.iter().rev().cloned().collect(),
            Wing::Right => self.barriers.clone(),
        }
    }
}

fn owner_wing(node: &Node) -> Option<Wing> {
    match node.node_type {
        NodeType::Threat => Some(Wing::Left),
        NodeType::Consequence => Some(Wing::Right),
        _ => None,
    }
}

fn barrier_type(wing: Wing) -> NodeType {
    match wing {
        Wing::Left => NodeType::PreventionBarrier,
        Wing::Right => NodeType::MitigationBarrier,
    }
}

struct ChainFinder<'a> {
    diagram: &'a Diagram,
    nodes: HashMap<&'a str, &'a Node>,
}

impl<'a> ChainFinder<'a> {
    fn new(diagram: &'a Diagram) -> Self {
        let nodes = diagram.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        ChainFinder { diagram, nodes }
    }

    /// Barriers adjacent to `id` on the owner side: prevention barrier
    /// successors on the left wing, mitigation barrier predecessors on the
    /// right.  Sorted by label so sibling order does not depend on edge
    /// order.
    fn neighbours(&self, id: &str, wing: Wing) -> Vec<&'a Node> {
        let wanted = barrier_type(wing);
        let mut found: Vec<&'a Node> = self
            .diagram
            .edges
            .iter()
            .filter_map(|e| match wing {
                Wing::Left if e.source == id => Some(e.target.as_str()),
                Wing::Right if e.target == id => Some(e.source.as_str()),
                _ => None,
            })
            .filter_map(|other| self.nodes.get(other).copied())
            .filter(|n| n.node_type == wanted)
            .collect();
        found.sort_by(|a, b| natural_cmp(&a.label, &b.label).then_with(|| a.id.cmp(&b.id)));
        found.dedup_by(|a, b| a.id == b.id);
        found
    }

    /// Breadth-first walk from the owner through its wing's barriers.
    fn discover(&self, owner: &Node, wing: Wing) -> Chain {
        let mut seen: HashSet<&str> = HashSet::from([owner.id.as_str()]);
        let mut queue = VecDeque::from([owner.id.as_str()]);
        let mut outward_first = Vec::new();

        while let Some(current) = queue.pop_front() {
            for next in self.neighbours(current, wing) {
                if seen.insert(next.id.as_str()) {
                    outward_first.push(next.id.clone());
                    queue.push_back(next.id.as_str());
                }
            }
        }

        outward_first.reverse();
        Chain {
            owner: owner.id.clone(),
            wing,
            barriers: outward_first,
        }
    }

    /// A supplied lane restricted to live barriers of the right type, with
    /// repeats dropped.
    fn from_lane(&self, owner: &Node, wing: Wing, lane: &[String]) -> Chain {
        let wanted = barrier_type(wing);
        let mut seen = HashSet::new();
        let mut barriers: Vec<String> = lane
            .iter()
            .filter(|id| {
                self.nodes
                    .get(id.as_str())
                    .is_some_and(|n| n.node_type == wanted)
            })
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();
        if wing == Wing::Left {
            barriers.reverse();
        }
        Chain {
            owner: owner.id.clone(),
            wing,
            barriers,
        }
    }
}

/// One chain per threat and consequence, in diagram order, discovered from
/// the edges.
pub fn discover_chains(diagram: &Diagram) -> Vec<Chain> {
    let finder = ChainFinder::new(diagram);
    diagram
        .nodes
        .iter()
        .filter_map(|n| owner_wing(n).map(|wing| finder.discover(n, wing)))
        .collect()
}

/// One chain per threat and consequence, taken from `lanes` where a lane
/// exists for the owner and discovered from the edges otherwise.
pub fn chains_from_lanes(diagram: &Diagram, lanes: &LaneOrders) -> Vec<Chain> {
    let finder = ChainFinder::new(diagram);
    diagram
        .nodes
        .iter()
        .filter_map(|n| {
            let wing = owner_wing(n)?;
            let supplied = match wing {
                Wing::Left => lanes.threats.get(&n.id),
                Wing::Right => lanes.consequences.get(&n.id),
            };
            Some(match supplied {
                Some(lane) => finder.from_lane(n, wing, lane),
                None => finder.discover(n, wing),
            })
        })
        .collect()
}

/// The lane orders the chains correspond to.
pub fn chains_to_lanes(chains: &[Chain]) -> LaneOrders {
    let lanes_for = |wing: Wing| -> LaneOrder {
        chains
            .iter()
            .filter(|c| c.wing == wing)
            .map(|c| (c.owner.clone(), c.reading_order()))
            .collect()
    };
    LaneOrders {
        threats: lanes_for(Wing::Left),
        consequences: lanes_for(Wing::Right),
    }
}
