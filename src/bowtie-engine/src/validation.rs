// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Structural rules every bowtie must satisfy.
//!
//! `validate_diagram` is a batch check that collects every violation;
//! `validate_connection` is the edit-time guard consulted before a single
//! edge is committed.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::common::ValidationErrors;
use crate::datamodel::{Diagram, NodeType};

/// Outcome of checking one proposed connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ConnectionValidation {
    fn ok() -> Self {
        ConnectionValidation {
            valid: true,
            error_message: None,
        }
    }

    fn rejected(message: String) -> Self {
        ConnectionValidation {
            valid: false,
            error_message: Some(message),
        }
    }
}

/// Escalation edges branch off the spine and are exempt from ordering.
pub fn is_escalation_edge(source: &NodeType, target: &NodeType) -> bool {
    matches!(
        (source, target),
        (
            NodeType::PreventionBarrier | NodeType::MitigationBarrier,
            NodeType::EscalationBarrier
        ) | (NodeType::EscalationBarrier, NodeType::EscalationFactor)
    )
}

/// True if an edge from `source` to `target` runs right-to-left through the
/// bowtie.  Edges touching an unknown type are not judged here.
pub fn is_backward(source: &NodeType, target: &NodeType) -> bool {
    if is_escalation_edge(source, target) {
        return false;
    }
    match (source.order(), target.order()) {
        (Some(s), Some(t)) => s > t,
        _ => false,
    }
}

const THREAT_TARGETS: &[NodeType] = &[NodeType::PreventionBarrier];
const PREVENTION_TARGETS: &[NodeType] = &[NodeType::TopEvent, NodeType::EscalationBarrier];
const HAZARD_TARGETS: &[NodeType] = &[NodeType::TopEvent];
const TOP_EVENT_TARGETS: &[NodeType] = &[NodeType::MitigationBarrier];
const MITIGATION_TARGETS: &[NodeType] = &[NodeType::Consequence, NodeType::EscalationBarrier];
const ESCALATION_BARRIER_TARGETS: &[NodeType] = &[NodeType::EscalationFactor];
const TERMINAL: &[NodeType] = &[];

/// The exhaustive set of target types each source type may connect to.
pub fn allowed_targets(source: &NodeType) -> &'static [NodeType] {
    match source {
        NodeType::Threat => THREAT_TARGETS,
        NodeType::PreventionBarrier => PREVENTION_TARGETS,
        NodeType::Hazard => HAZARD_TARGETS,
        NodeType::TopEvent => TOP_EVENT_TARGETS,
        NodeType::MitigationBarrier => MITIGATION_TARGETS,
        NodeType::EscalationBarrier => ESCALATION_BARRIER_TARGETS,
        NodeType::EscalationFactor | NodeType::Consequence | NodeType::Unknown(_) => TERMINAL,
    }
}

fn illegal_target_message(source: &NodeType) -> String {
    match source {
        NodeType::Threat => "Threats can only connect to Prevention Barriers".to_string(),
        NodeType::PreventionBarrier => {
            "Prevention Barriers can only connect to the Top Event or an Escalation Barrier"
                .to_string()
        }
        NodeType::Hazard => "The Hazard can only connect to the Top Event".to_string(),
        NodeType::TopEvent => "The Top Event can only connect to Mitigation Barriers".to_string(),
        NodeType::MitigationBarrier => {
            "Mitigation Barriers can only connect to Consequences or an Escalation Barrier"
                .to_string()
        }
        NodeType::EscalationBarrier => {
            "Escalation Barriers can only connect to Escalation Factors".to_string()
        }
        NodeType::EscalationFactor | NodeType::Consequence => format!(
            "{} are terminal and cannot have outgoing connections",
            source.display_plural()
        ),
        NodeType::Unknown(t) => format!("Unknown node type \"{t}\" cannot be connected"),
    }
}

/// Decide whether a single proposed edge may be added.  Pure: no mutation,
/// no panics.
pub fn validate_connection(
    source_type: &NodeType,
    target_type: &NodeType,
    source_id: &str,
    target_id: &str,
) -> ConnectionValidation {
    if source_id == target_id {
        return ConnectionValidation::rejected("A node cannot connect to itself".to_string());
    }

    // Backward flow is checked before the adjacency table: every backward
    // pair is also missing from the table, so the left-to-right message
    // would otherwise never be reported.
    if is_backward(source_type, target_type) {
        return ConnectionValidation::rejected(format!(
            "Connections must flow left-to-right: {} cannot connect back to {}",
            source_type.display_plural(),
            target_type.display_plural()
        ));
    }

    if !allowed_targets(source_type).contains(target_type) {
        return ConnectionValidation::rejected(illegal_target_message(source_type));
    }

    ConnectionValidation::ok()
}

fn is_degradation(t: &NodeType) -> bool {
    matches!(t, NodeType::Unknown(s) if s.eq_ignore_ascii_case("degradation"))
}

/// Check a whole diagram, reporting every violation found.
pub fn validate_diagram(diagram: &Diagram) -> Result<(), ValidationErrors> {
    let mut errors: Vec<String> = Vec::new();

    if diagram.id.trim().is_empty() {
        errors.push("Diagram must have an id".to_string());
    }
    if diagram.title.trim().is_empty() {
        errors.push("Diagram must have a title".to_string());
    }

    let mut node_types: HashMap<&str, &NodeType> = HashMap::new();
    for (i, node) in diagram.nodes.iter().enumerate() {
        if node.id.is_empty() {
            errors.push(format!("Node at index {i} is missing an id"));
        } else if node_types.insert(node.id.as_str(), &node.node_type).is_some() {
            errors.push(format!("Duplicate node id: {}", node.id));
        }
    }

    for node in &diagram.nodes {
        if is_degradation(&node.node_type) {
            errors.push(format!(
                "Node {} has type \"{}\": degradation nodes are not part of the bowtie model",
                node.id, node.node_type
            ));
        } else if !node.node_type.is_known() {
            errors.push(format!(
                "Node {} has unknown type \"{}\"",
                node.id, node.node_type
            ));
        }
    }

    for node in &diagram.nodes {
        if node.label.trim().is_empty() {
            errors.push(format!("Node {} is missing a label", node.id));
        }
    }

    let mut edge_ids: HashSet<&str> = HashSet::new();
    for (i, edge) in diagram.edges.iter().enumerate() {
        if edge.id.is_empty() {
            errors.push(format!("Edge at index {i} is missing an id"));
        } else if !edge_ids.insert(edge.id.as_str()) {
            errors.push(format!("Duplicate edge id: {}", edge.id));
        }
    }

    for edge in &diagram.edges {
        let source = node_types.get(edge.source.as_str());
        let target = node_types.get(edge.target.as_str());
        if source.is_none() {
            errors.push(format!(
                "Edge {} has invalid source: {}",
                edge.id, edge.source
            ));
        }
        if target.is_none() {
            errors.push(format!(
                "Edge {} has invalid target: {}",
                edge.id, edge.target
            ));
        }
        if let (Some(s), Some(t)) = (source, target)
            && is_backward(s, t)
        {
            errors.push(format!(
                "Edge {} flows backward from {} ({}) to {} ({})",
                edge.id, edge.source, s, edge.target, t
            ));
        }
    }

    let threats = diagram.count_of_type(NodeType::Threat);
    let hazards = diagram.count_of_type(NodeType::Hazard);
    let top_events = diagram.count_of_type(NodeType::TopEvent);
    let consequences = diagram.count_of_type(NodeType::Consequence);
    if threats == 0 {
        errors.push("Diagram must contain at least one threat".to_string());
    }
    if hazards != 1 {
        errors.push(format!(
            "Diagram must contain exactly one hazard (found {hazards})"
        ));
    }
    if top_events != 1 {
        errors.push(format!(
            "Diagram must contain exactly one top event (found {top_events})"
        ));
    }
    if consequences == 0 {
        errors.push("Diagram must contain at least one consequence".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::{Edge, Node};
    use crate::testutils::minimal_diagram;

    #[test]
    fn test_minimal_diagram_is_valid() {
        assert_eq!(validate_diagram(&minimal_diagram()), Ok(()));
    }

    #[test]
    fn test_missing_hazard() {
        let mut d = minimal_diagram();
        d.nodes.retain(|n| n.node_type != NodeType::Hazard);
        d.edges.retain(|e| e.source != "h");
        let errs = validate_diagram(&d).unwrap_err();
        assert!(errs.mentions("hazard"));
    }

    #[test]
    fn test_missing_top_event() {
        let mut d = minimal_diagram();
        d.nodes.retain(|n| n.node_type != NodeType::TopEvent);
        d.edges.retain(|e| e.source != "te" && e.target != "te");
        let errs = validate_diagram(&d).unwrap_err();
        assert!(errs.mentions("top event"));
    }

    #[test]
    fn test_second_hazard_and_top_event() {
        let mut d = minimal_diagram();
        d.nodes.push(Node::new("h2", NodeType::Hazard, "Second hazard"));
        let errs = validate_diagram(&d).unwrap_err();
        assert!(errs.mentions("exactly one hazard"));

        let mut d = minimal_diagram();
        d.nodes.push(Node::new("te2", NodeType::TopEvent, "Second top event"));
        let errs = validate_diagram(&d).unwrap_err();
        assert!(errs.mentions("exactly one top event"));
    }

    #[test]
    fn test_degradation_rejected_case_insensitive() {
        for ty in ["degradation", "Degradation", "DEGRADATION"] {
            let mut d = minimal_diagram();
            d.nodes.push(Node::new("dg", NodeType::from(ty), "Wear"));
            let errs = validate_diagram(&d).unwrap_err();
            assert!(errs.mentions("degradation"), "{ty}: {errs}");
            assert!(!errs.mentions("unknown type"));
        }
    }

    #[test]
    fn test_unknown_type() {
        let mut d = minimal_diagram();
        d.nodes.push(Node::new("x", NodeType::from("cause"), "Something"));
        let errs = validate_diagram(&d).unwrap_err();
        assert!(errs.mentions("unknown type \"cause\""));
    }

    #[test]
    fn test_accumulates_all_errors() {
        let mut d = minimal_diagram();
        d.title = String::new();
        d.nodes.push(Node::new("", NodeType::Threat, "No id"));
        d.nodes.push(Node::new("t", NodeType::Threat, "Dup"));
        d.nodes.push(Node::new("nolabel", NodeType::Threat, "  "));
        d.edges.push(Edge::new("", "t", "b"));
        d.edges.push(Edge::new("e1", "ghost", "phantom"));
        let errs = validate_diagram(&d).unwrap_err();
        assert!(errs.mentions("must have a title"));
        assert!(errs.mentions("Node at index"));
        assert!(errs.mentions("Duplicate node id: t"));
        assert!(errs.mentions("nolabel is missing a label"));
        assert!(errs.mentions("Edge at index"));
        assert!(errs.mentions("Duplicate edge id: e1"));
        assert!(errs.mentions("invalid source: ghost"));
        assert!(errs.mentions("invalid target: phantom"));
    }

    #[test]
    fn test_backward_edge_reported() {
        let mut d = minimal_diagram();
        d.edges.push(Edge::new("back", "c", "t"));
        let errs = validate_diagram(&d).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(errs.mentions("flows backward"));
    }

    #[test]
    fn test_escalation_edges_exempt() {
        let mut d = minimal_diagram();
        d.nodes.push(Node::new("eb", NodeType::EscalationBarrier, "Audit"));
        d.nodes.push(Node::new("ef", NodeType::EscalationFactor, "Fatigue"));
        d.nodes.push(Node::new("mb", NodeType::MitigationBarrier, "Alarm"));
        d.nodes.push(Node::new("eb2", NodeType::EscalationBarrier, "Test"));
        // mitigation (5) -> escalation barrier (2) would otherwise be backward
        d.edges.push(Edge::new("x1", "mb", "eb2"));
        d.edges.push(Edge::new("x2", "b", "eb"));
        d.edges.push(Edge::new("x3", "eb", "ef"));
        assert_eq!(validate_diagram(&d), Ok(()));
    }

    #[test]
    fn test_connection_rules() {
        let ok = validate_connection(&NodeType::Threat, &NodeType::PreventionBarrier, "a", "b");
        assert!(ok.valid);
        assert!(ok.error_message.is_none());

        let bad = validate_connection(&NodeType::Threat, &NodeType::Consequence, "a", "b");
        assert!(!bad.valid);
        assert!(bad.error_message.unwrap().contains("Prevention Barriers"));

        let back = validate_connection(&NodeType::TopEvent, &NodeType::Threat, "a", "b");
        assert!(!back.valid);
        assert!(back.error_message.unwrap().contains("left-to-right"));
    }

    #[test]
    fn test_backward_message_wins_over_table() {
        let result =
            validate_connection(&NodeType::MitigationBarrier, &NodeType::Threat, "mb", "t");
        assert!(!result.valid);
        let msg = result.error_message.unwrap();
        assert_eq!(
            msg,
            "Connections must flow left-to-right: Mitigation Barriers cannot connect back to Threats"
        );
        assert!(!msg.contains("Consequences"));
    }

    #[test]
    fn test_self_connection_always_invalid() {
        for t in NodeType::ALL {
            let result = validate_connection(&t, &t, "n", "n");
            assert!(!result.valid);
            assert_eq!(
                result.error_message.as_deref(),
                Some("A node cannot connect to itself")
            );
        }
    }

    #[test]
    fn test_every_legal_pair_accepted() {
        for source in NodeType::ALL {
            for target in allowed_targets(&source) {
                let result = validate_connection(&source, target, "s", "t");
                assert!(result.valid, "{source} -> {target}");
            }
        }
    }

    #[test]
    fn test_terminal_types_have_no_targets() {
        for source in [NodeType::Consequence, NodeType::EscalationFactor] {
            let result = validate_connection(&source, &NodeType::Threat, "s", "t");
            assert!(!result.valid);
            // consequence -> threat is backward; escalation factor -> threat is same rank
            if source == NodeType::EscalationFactor {
                assert!(result.error_message.unwrap().contains("terminal"));
            }
        }
    }

    #[test]
    fn test_type_specific_messages() {
        let cases = [
            (NodeType::PreventionBarrier, NodeType::Consequence, "Top Event"),
            (NodeType::Hazard, NodeType::Consequence, "The Hazard"),
            (NodeType::TopEvent, NodeType::Consequence, "Mitigation Barriers"),
            (NodeType::MitigationBarrier, NodeType::MitigationBarrier, "Consequences"),
            (NodeType::EscalationBarrier, NodeType::TopEvent, "Escalation Factors"),
        ];
        for (source, target, needle) in cases {
            let result = validate_connection(&source, &target, "s", "t");
            assert!(!result.valid);
            let msg = result.error_message.unwrap();
            assert!(msg.contains(needle), "{source} -> {target}: {msg}");
        }

        let unknown = validate_connection(&NodeType::from("cause"), &NodeType::Threat, "s", "t");
        assert!(unknown.error_message.unwrap().contains("Unknown node type"));
    }
}
