// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! A worked example bowtie: loss of containment on a gas pipeline.

use chrono::{DateTime, Utc};

use crate::datamodel::{Diagram, Edge, Node, NodeMetadata, NodeType};

// 2026-01-01T00:00:00Z
const SAMPLE_TIMESTAMP: i64 = 1_767_225_600;

fn node(id: &str, node_type: NodeType, label: &str, summary: &str, roles: &[&str]) -> Node {
    let mut node = Node::new(id, node_type, label);
    if !summary.is_empty() || !roles.is_empty() {
        node.metadata = Some(NodeMetadata {
            summary: (!summary.is_empty()).then(|| summary.to_string()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        });
    }
    node
}

/// Two threats sharing a pressure trip, two consequences, and an
/// escalation branch on each wing.  Barriers carry role tags.
pub fn sample_diagram() -> Diagram {
    use NodeType::*;

    let nodes = vec![
        node("hazard", Hazard, "Pressurised natural gas", "", &[]),
        node("top", TopEvent, "Loss of containment", "", &[]),
        node("t-corrosion", Threat, "Internal corrosion", "", &[]),
        node("t-dig", Threat, "Third-party excavation", "", &[]),
        node(
            "pb-inhibitor",
            PreventionBarrier,
            "PB-1 Corrosion inhibitor injection",
            "Continuous dosing at the inlet",
            &["Operator", "Integrity Engineer"],
        ),
        node(
            "pb-pigging",
            PreventionBarrier,
            "PB-2 Intelligent pigging",
            "Inline inspection every 5 years",
            &["Integrity Engineer"],
        ),
        node(
            "pb-patrol",
            PreventionBarrier,
            "PB-3 Right-of-way patrol",
            "",
            &["Field Technician"],
        ),
        node(
            "pb-trip",
            PreventionBarrier,
            "PB-4 High pressure trip",
            "Shared by both threat lanes",
            &["Operator"],
        ),
        node(
            "mb-esd",
            MitigationBarrier,
            "MB-1 Gas detection and ESD",
            "",
            &["Operator"],
        ),
        node(
            "mb-ignition",
            MitigationBarrier,
            "MB-2 Ignition source control",
            "",
            &["Field Technician"],
        ),
        node(
            "mb-response",
            MitigationBarrier,
            "MB-3 Emergency response plan",
            "",
            &["Emergency Coordinator"],
        ),
        node("c-fire", Consequence, "Jet fire", "", &[]),
        node("c-release", Consequence, "Environmental release", "", &[]),
        node(
            "eb-schedule",
            EscalationBarrier,
            "EB-1 Pig run schedule audit",
            "",
            &["Integrity Engineer"],
        ),
        node(
            "ef-tool",
            EscalationFactor,
            "⚠️ Pigging tool unavailable",
            "",
            &[],
        ),
        node(
            "eb-calibration",
            EscalationBarrier,
            "EB-2 Detector calibration regime",
            "",
            &["Field Technician"],
        ),
        node("ef-drift", EscalationFactor, "Detector drift", "", &[]),
    ];

    let edges = [
        ("hazard", "top"),
        ("t-corrosion", "pb-inhibitor"),
        ("pb-inhibitor", "pb-pigging"),
        ("pb-pigging", "pb-trip"),
        ("pb-trip", "top"),
        ("t-dig", "pb-patrol"),
        ("pb-patrol", "pb-trip"),
        ("top", "mb-esd"),
        ("mb-esd", "mb-ignition"),
        ("mb-ignition", "c-fire"),
        ("top", "mb-response"),
        ("mb-response", "c-release"),
        ("pb-pigging", "eb-schedule"),
        ("eb-schedule", "ef-tool"),
        ("mb-esd", "eb-calibration"),
        ("eb-calibration", "ef-drift"),
    ]
    .iter()
    .enumerate()
    .map(|(i, (source, target))| Edge::new(&format!("e{}", i + 1), source, target))
    .collect();

    let timestamp: DateTime<Utc> = DateTime::from_timestamp(SAMPLE_TIMESTAMP, 0).unwrap_or_default();
    Diagram {
        id: "sample-gas-pipeline".to_string(),
        title: "Gas pipeline loss of containment".to_string(),
        created_at: timestamp,
        updated_at: timestamp,
        nodes,
        edges,
    }
}
