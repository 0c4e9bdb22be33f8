// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Deterministic coordinate assignment for bowtie diagrams.
//!
//! The top event sits at the configured centre with the hazard above it.
//! Each threat and consequence owns a horizontal lane of barriers; lanes are
//! stacked vertically on their wing, escalation branches hang outward and
//! below their barrier, and lanes are pushed apart wherever a branch would
//! overlap the next lane.  Identical input always yields bit-identical
//! output.

pub mod chain;
pub mod config;
pub mod geom;
pub mod layered;
pub mod placement;
pub mod routing;
pub mod text;
#[cfg(not(target_arch = "wasm32"))]
pub mod worker;

use std::collections::{BTreeMap, HashMap, HashSet};

use ordered_float::OrderedFloat;
use serde::Serialize;
use tracing::debug;

use crate::datamodel::{Diagram, Node, NodeType, Orientation, Wing};
use crate::lanes::LaneOrders;

use self::chain::{Chain, chains_from_lanes, discover_chains};
pub use self::config::LayoutConfig;
pub use self::geom::Position;
use self::geom::Span;
use self::placement::{
    EscalationCluster, lowest_y, place_column, place_escalation, sibling_offset,
};
pub use self::routing::RoutedEdge;
use self::routing::route_edges;
use self::text::{LabelParts, WidthClass, parse_label};

/// A node with its card geometry decided.  `x` and `y` are the card centre.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub label: LabelParts,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub width_class: WidthClass,
    pub orientation: Orientation,
}

impl PositionedNode {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Renderable geometry: positioned nodes in diagram order and routed edges.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Layout {
    pub nodes: Vec<PositionedNode>,
    pub edges: Vec<RoutedEdge>,
}

impl Layout {
    pub fn node(&self, id: &str) -> Option<&PositionedNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn position(&self, id: &str) -> Option<Position> {
        self.node(id).map(PositionedNode::position)
    }

    pub fn edge(&self, source: &str, target: &str) -> Option<&RoutedEdge> {
        self.edges
            .iter()
            .find(|e| e.source == source && e.target == target)
    }
}

struct Card {
    label: LabelParts,
    width_class: WidthClass,
    width: f64,
}

impl Card {
    fn for_node(node: &Node, config: &LayoutConfig) -> Self {
        let label = parse_label(&node.label);
        let width_class = WidthClass::for_text(&label.text);
        Card {
            label,
            width_class,
            width: config.width_of(width_class),
        }
    }

    fn place(
        self,
        node: &Node,
        position: Position,
        config: &LayoutConfig,
        orientation: Orientation,
    ) -> PositionedNode {
        PositionedNode {
            id: node.id.clone(),
            node_type: node.node_type.clone(),
            label: self.label,
            x: position.x,
            y: position.y,
            width: self.width,
            height: config.node_height,
            width_class: self.width_class,
            orientation,
        }
    }
}

/// Intermediate state of one layout computation.
struct LayoutEngine<'a> {
    config: LayoutConfig,
    diagram: &'a Diagram,
    cards: HashMap<&'a str, Card>,
    wings: HashMap<String, Wing>,

    chains: Vec<Chain>,
    /// Lane centre line for each chain, parallel to `chains`.
    rows: Vec<f64>,
    clusters: Vec<EscalationCluster>,

    positions: HashMap<String, Position>,
}

impl<'a> LayoutEngine<'a> {
    fn new(diagram: &'a Diagram, config: LayoutConfig, lanes: Option<&LaneOrders>) -> Self {
        let cards = diagram
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), Card::for_node(n, &config)))
            .collect();

        let chains = match lanes {
            Some(lanes) => chains_from_lanes(diagram, lanes),
            None => discover_chains(diagram),
        };
        let rows = vec![config.center_y; chains.len()];

        Self {
            config,
            diagram,
            cards,
            wings: diagram.resolve_wings(),
            chains,
            rows,
            clusters: Vec::new(),
            positions: HashMap::new(),
        }
    }

    fn width(&self, id: &str) -> f64 {
        self.cards
            .get(id)
            .map(|c| c.width)
            .unwrap_or(self.config.medium_width)
    }

    fn generate(mut self) -> Layout {
        debug!(
            nodes = self.diagram.nodes.len(),
            chains = self.chains.len(),
            "computing bowtie layout"
        );

        self.place_spine();
        self.assign_rows();
        self.place_chain_barriers();
        self.clusters = place_escalation(self.diagram, &self.config, &mut self.positions);
        self.avoid_collisions(Wing::Left);
        self.avoid_collisions(Wing::Right);
        self.anchor_owners();
        self.place_leftovers();

        let edges = route_edges(self.diagram, &self.chains, &self.wings);
        self.assemble(edges)
    }

    /// Phase 1: top event at the centre, hazard above it.
    fn place_spine(&mut self) {
        let center = Position::new(self.config.center_x, self.config.center_y);
        if let Some(top_event) = self.diagram.top_event() {
            self.positions.insert(top_event.id.clone(), center);
        }
        if let Some(hazard) = self.diagram.hazard() {
            let above = Position::new(center.x, center.y - self.config.hazard_offset_y);
            self.positions.insert(hazard.id.clone(), above);
        }
    }

    /// Phase 2: stack each wing's lanes around the centre line.
    fn assign_rows(&mut self) {
        for wing in [Wing::Left, Wing::Right] {
            let members: Vec<usize> = (0..self.chains.len())
                .filter(|&i| self.chains[i].wing == wing)
                .collect();
            let count = members.len();
            for (k, &i) in members.iter().enumerate() {
                self.rows[i] =
                    self.config.center_y + sibling_offset(k, count, self.config.row_spacing);
            }
        }
    }

    /// Phase 3: walk each chain outward from the column next to the top
    /// event.  A barrier several chains ask for gets the mean of their
    /// requests.
    fn place_chain_barriers(&mut self) {
        let mut requests: BTreeMap<&str, Vec<Position>> = BTreeMap::new();

        for (chain, &row) in self.chains.iter().zip(&self.rows) {
            let sign = chain.wing.sign();
            let mut x = self.config.center_x + sign * self.config.column_gap;
            let mut prev_width: Option<f64> = None;
            for barrier in &chain.barriers {
                let width = self.width(barrier);
                if let Some(prev) = prev_width {
                    x += sign * (prev / 2.0 + self.config.barrier_gap + width / 2.0);
                }
                requests
                    .entry(barrier.as_str())
                    .or_default()
                    .push(Position::new(x, row));
                prev_width = Some(width);
            }
        }

        for (id, requested) in requests {
            if requested.len() > 1 {
                debug!(barrier = id, lanes = requested.len(), "averaging shared barrier");
            }
            if let Some(mean) = Position::mean(&requested) {
                self.positions.insert(id.to_string(), mean);
            }
        }
    }

    /// Phase 5: walk a wing's lanes top to bottom and push each lane (with
    /// everything below it) down until it clears the one above.
    fn avoid_collisions(&mut self, wing: Wing) {
        let mut order: Vec<usize> = (0..self.chains.len())
            .filter(|&i| self.chains[i].wing == wing)
            .collect();
        order.sort_by_key(|&i| OrderedFloat(self.rows[i]));

        let clusters: HashMap<&str, &EscalationCluster> = self
            .clusters
            .iter()
            .map(|c| (c.parent.as_str(), c))
            .collect();
        let height = self.config.node_height;

        let mut claimed: HashSet<&str> = HashSet::new();
        let mut shift = 0.0;
        let mut prev_bottom: Option<f64> = None;

        for i in order {
            let mut members: Vec<&str> = Vec::new();
            for barrier in &self.chains[i].barriers {
                if !claimed.insert(barrier.as_str()) {
                    continue;
                }
                members.push(barrier);
                if let Some(cluster) = clusters.get(barrier.as_str()) {
                    for member in &cluster.members {
                        if claimed.insert(member.as_str()) {
                            members.push(member);
                        }
                    }
                }
            }

            let mut span = members
                .iter()
                .filter_map(|m| self.positions.get(*m))
                .fold(Span::around(self.rows[i], height), |span, p| {
                    span.union(Span::around(p.y, height))
                })
                .shifted(shift);

            if let Some(prev) = prev_bottom {
                let overlap = prev + self.config.lane_clearance - span.top;
                if overlap > 0.0 {
                    shift += overlap;
                    span = span.shifted(overlap);
                }
            }

            if shift > 0.0 {
                self.rows[i] += shift;
                for m in &members {
                    if let Some(p) = self.positions.get_mut(*m) {
                        p.y += shift;
                    }
                }
            }
            prev_bottom = Some(span.bottom);
        }

        if shift > 0.0 {
            debug!(?wing, shift, "pushed lanes apart");
        }
    }

    /// Phase 6: each threat/consequence takes its outermost barrier's row,
    /// or sits against the top event when its lane is empty.
    fn anchor_owners(&mut self) {
        let top_event_width = self
            .diagram
            .top_event()
            .map(|n| self.width(&n.id))
            .unwrap_or(self.config.medium_width);

        for (chain, &row) in self.chains.iter().zip(&self.rows) {
            let sign = chain.wing.sign();
            let owner_width = self.width(&chain.owner);
            let anchor = chain
                .anchor()
                .and_then(|a| self.positions.get(a).map(|p| (a, *p)));
            let position = match anchor {
                Some((anchor, p)) => Position::new(
                    p.x + sign
                        * (self.width(anchor) / 2.0 + self.config.owner_gap + owner_width / 2.0),
                    p.y,
                ),
                None => Position::new(
                    self.config.center_x
                        + sign
                            * (top_event_width / 2.0
                                + self.config.collapsed_owner_gap
                                + owner_width / 2.0),
                    row,
                ),
            };
            self.positions.insert(chain.owner.clone(), position);
        }
    }

    fn lowest(&self, wing: Option<Wing>) -> f64 {
        lowest_y(&self.positions, &self.config, wing)
    }

    fn unplaced(&self, keep: impl Fn(&Node) -> bool) -> Vec<String> {
        self.diagram
            .nodes
            .iter()
            .filter(|n| !self.positions.contains_key(&n.id) && keep(n))
            .map(|n| n.id.clone())
            .collect()
    }

    /// Phase 7: everything no lane reached goes into a column below the
    /// lanes: barriers next to the top event, escalation nodes further out
    /// on their wing, anything else under the spine.
    fn place_leftovers(&mut self) {
        for wing in [Wing::Left, Wing::Right] {
            let barrier_type = match wing {
                Wing::Left => NodeType::PreventionBarrier,
                Wing::Right => NodeType::MitigationBarrier,
            };
            let barriers = self.unplaced(|n| n.node_type == barrier_type);
            if barriers.is_empty() {
                continue;
            }
            debug!(?wing, count = barriers.len(), "placing barriers outside any lane");
            let x = self.config.center_x + wing.sign() * self.config.column_gap;
            let below = self.lowest(Some(wing));
            place_column(&barriers, x, below, &self.config, &mut self.positions);
        }

        // branches of the barriers just placed
        let extra = place_escalation(self.diagram, &self.config, &mut self.positions);
        self.clusters.extend(extra);

        for wing in [Wing::Left, Wing::Right] {
            let orphans = self.unplaced(|n| {
                n.node_type.is_escalation() && self.wings.get(&n.id) == Some(&wing)
            });
            if orphans.is_empty() {
                continue;
            }
            let x = self.config.center_x
                + wing.sign() * (self.config.column_gap + self.config.escalation_offset_x);
            let below = self.lowest(Some(wing));
            place_column(&orphans, x, below, &self.config, &mut self.positions);
        }

        let rest = self.unplaced(|_| true);
        if !rest.is_empty() {
            debug!(count = rest.len(), "placing unattached nodes under the spine");
            let below = self.lowest(None);
            let x = self.config.center_x;
            place_column(&rest, x, below, &self.config, &mut self.positions);
        }
    }

    fn assemble(mut self, edges: Vec<RoutedEdge>) -> Layout {
        let nodes = self
            .diagram
            .nodes
            .iter()
            .filter_map(|n| {
                let position = *self.positions.get(&n.id)?;
                let card = self.cards.remove(n.id.as_str())?;
                let orientation = Orientation::from(self.wings.get(&n.id).copied());
                Some(card.place(n, position, &self.config, orientation))
            })
            .collect();

        Layout { nodes, edges }
    }
}

/// Lay out `diagram` with the given configuration.  When `lanes` is given
/// it is authoritative for barrier order; owners without a lane are
/// discovered from the edges.
pub fn compute_layout(
    diagram: &Diagram,
    config: &LayoutConfig,
    lanes: Option<&LaneOrders>,
) -> Layout {
    let mut config = config.clone();
    config.validate();
    LayoutEngine::new(diagram, config, lanes).generate()
}

/// Lay out `diagram` with the default configuration, discovering lanes from
/// its edges.
pub fn compute_simple_layout(diagram: &Diagram) -> Layout {
    compute_layout(diagram, &LayoutConfig::default(), None)
}
