// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use chrono::{DateTime, TimeZone, Utc};

use crate::datamodel::{Diagram, Edge, Node, NodeType};

pub(crate) fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap()
}

pub(crate) fn x_diagram(nodes: Vec<Node>, edges: &[(&str, &str)]) -> Diagram {
    Diagram {
        id: "test".to_string(),
        title: "Test bowtie".to_string(),
        created_at: fixed_time(),
        updated_at: fixed_time(),
        nodes,
        edges: edges
            .iter()
            .enumerate()
            .map(|(i, (s, t))| Edge::new(&format!("e{}", i + 1), s, t))
            .collect(),
    }
}

pub(crate) fn x_node(id: &str, node_type: NodeType) -> Node {
    Node::new(id, node_type, &format!("{id} label"))
}

/// hazard h, top event te, one threat t with barrier b, one consequence c.
pub(crate) fn minimal_diagram() -> Diagram {
    x_diagram(
        vec![
            x_node("h", NodeType::Hazard),
            x_node("te", NodeType::TopEvent),
            x_node("t", NodeType::Threat),
            x_node("b", NodeType::PreventionBarrier),
            x_node("c", NodeType::Consequence),
        ],
        &[("h", "te"), ("t", "b"), ("b", "te"), ("te", "c")],
    )
}

/// T -> B1 -> B2 -> TopEvent, plus a hazard and one consequence.
pub(crate) fn chain_diagram() -> Diagram {
    x_diagram(
        vec![
            x_node("H", NodeType::Hazard),
            x_node("TopEvent", NodeType::TopEvent),
            x_node("T", NodeType::Threat),
            x_node("B1", NodeType::PreventionBarrier),
            x_node("B2", NodeType::PreventionBarrier),
            x_node("C", NodeType::Consequence),
        ],
        &[
            ("H", "TopEvent"),
            ("T", "B1"),
            ("B1", "B2"),
            ("B2", "TopEvent"),
            ("TopEvent", "C"),
        ],
    )
}

/// Two threats, two consequences, a barrier on each side with an
/// escalation branch hanging off it.
pub(crate) fn two_wing_diagram() -> Diagram {
    x_diagram(
        vec![
            x_node("h", NodeType::Hazard),
            x_node("te", NodeType::TopEvent),
            x_node("t1", NodeType::Threat),
            x_node("t2", NodeType::Threat),
            x_node("pb1", NodeType::PreventionBarrier),
            x_node("pb2", NodeType::PreventionBarrier),
            x_node("mb1", NodeType::MitigationBarrier),
            x_node("c1", NodeType::Consequence),
            x_node("c2", NodeType::Consequence),
            x_node("eb_l", NodeType::EscalationBarrier),
            x_node("ef_l", NodeType::EscalationFactor),
            x_node("eb_r", NodeType::EscalationBarrier),
            x_node("ef_r", NodeType::EscalationFactor),
        ],
        &[
            ("h", "te"),
            ("t1", "pb1"),
            ("pb1", "te"),
            ("t2", "pb2"),
            ("pb2", "te"),
            ("te", "mb1"),
            ("mb1", "c1"),
            ("te", "c2"),
            ("pb1", "eb_l"),
            ("eb_l", "ef_l"),
            ("mb1", "eb_r"),
            ("eb_r", "ef_r"),
        ],
    )
}
