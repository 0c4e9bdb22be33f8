// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::{BTreeSet, HashSet};

use float_cmp::approx_eq;
use proptest::prelude::*;

use bowtie_engine::datamodel::{Diagram, Edge, Node, NodeType, Wing};
use bowtie_engine::lanes::{LaneOrders, build_threat_lane_edges, derive_threat_lane_order};
use bowtie_engine::layout::layered::compute_layered_layout;
use bowtie_engine::layout::{Layout, LayoutConfig, compute_layout, compute_simple_layout};
use bowtie_engine::roles::compute_role_filtered_diagram;
use bowtie_engine::scenarios::sample_diagram;
use bowtie_engine::step::{StepOptions, compute_step_diagram, groups_from_lanes};

fn diagram(nodes: Vec<Node>, edges: &[(&str, &str)]) -> Diagram {
    let mut d = Diagram::new("it", "Integration");
    d.nodes = nodes;
    d.edges = edges
        .iter()
        .enumerate()
        .map(|(i, (s, t))| Edge::new(&format!("e{i}"), s, t))
        .collect();
    d
}

fn node(id: &str, node_type: NodeType) -> Node {
    Node::new(id, node_type, id)
}

/// `threat_lanes[i]` prevention barriers in front of threat i, and likewise
/// for consequences.
fn bowtie(threat_lanes: &[usize], consequence_lanes: &[usize]) -> Diagram {
    let mut nodes = vec![node("h", NodeType::Hazard), node("te", NodeType::TopEvent)];
    let mut edges: Vec<(String, String)> = vec![("h".to_string(), "te".to_string())];

    for (i, &len) in threat_lanes.iter().enumerate() {
        let threat = format!("t{i}");
        nodes.push(node(&threat, NodeType::Threat));
        let mut prev = threat;
        for j in 0..len {
            let barrier = format!("pb{i}_{j}");
            nodes.push(node(&barrier, NodeType::PreventionBarrier));
            edges.push((prev, barrier.clone()));
            prev = barrier;
        }
        edges.push((prev, "te".to_string()));
    }

    for (i, &len) in consequence_lanes.iter().enumerate() {
        let mut prev = "te".to_string();
        for j in 0..len {
            let barrier = format!("mb{i}_{j}");
            nodes.push(node(&barrier, NodeType::MitigationBarrier));
            edges.push((prev, barrier.clone()));
            prev = barrier;
        }
        let consequence = format!("c{i}");
        nodes.push(node(&consequence, NodeType::Consequence));
        edges.push((prev, consequence));
    }

    let pairs: Vec<(&str, &str)> = edges
        .iter()
        .map(|(s, t)| (s.as_str(), t.as_str()))
        .collect();
    diagram(nodes, &pairs)
}

fn x_of(layout: &Layout, id: &str) -> f64 {
    layout
        .position(id)
        .unwrap_or_else(|| panic!("{id} was not positioned"))
        .x
}

/// Every node is positioned exactly once, with finite coordinates, and
/// every routed edge joins positioned nodes.
fn verify_layout(layout: &Layout, diagram: &Diagram) {
    let ids: HashSet<&str> = layout.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids.len(), layout.nodes.len(), "duplicate positioned node");
    for n in &diagram.nodes {
        assert!(ids.contains(n.id.as_str()), "{} missing from layout", n.id);
    }
    for n in &layout.nodes {
        assert!(n.x.is_finite() && n.y.is_finite(), "{} not finite", n.id);
    }
    for e in &layout.edges {
        assert!(ids.contains(e.source.as_str()), "edge {} dangling", e.id);
        assert!(ids.contains(e.target.as_str()), "edge {} dangling", e.id);
    }
}

#[test]
fn sample_layout_is_deterministic() {
    let d = sample_diagram();
    let a = compute_simple_layout(&d);
    let b = compute_simple_layout(&d);
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
    verify_layout(&a, &d);
}

#[test]
fn escalation_branches_point_outward() {
    let layout = compute_simple_layout(&sample_diagram());

    let pb = x_of(&layout, "pb-pigging");
    let eb_left = x_of(&layout, "eb-schedule");
    let ef_left = x_of(&layout, "ef-tool");
    assert!(eb_left < pb);
    assert!(ef_left < eb_left);

    let mb = x_of(&layout, "mb-esd");
    let eb_right = x_of(&layout, "eb-calibration");
    let ef_right = x_of(&layout, "ef-drift");
    assert!(eb_right > mb);
    assert!(ef_right > eb_right);

    let pb_y = layout.position("pb-pigging").unwrap().y;
    assert!(layout.position("eb-schedule").unwrap().y > pb_y);
}

#[test]
fn layered_layout_keeps_bowtie_shape() {
    let d = sample_diagram();
    let config = LayoutConfig::default();
    let layout = compute_layered_layout(&d, &config).unwrap();
    verify_layout(&layout, &d);

    assert!(x_of(&layout, "eb-schedule") < x_of(&layout, "pb-pigging"));
    assert!(x_of(&layout, "ef-tool") < x_of(&layout, "eb-schedule"));
    assert!(x_of(&layout, "eb-calibration") > x_of(&layout, "mb-esd"));
    assert!(x_of(&layout, "ef-drift") > x_of(&layout, "eb-calibration"));

    let top = layout.position("top").unwrap();
    let hazard = layout.position("hazard").unwrap();
    assert!(approx_eq!(f64, top.x, config.center_x));
    assert!(approx_eq!(f64, top.y, config.center_y));
    assert!(approx_eq!(f64, hazard.x, config.center_x));
    assert!(approx_eq!(f64, hazard.y, config.center_y - config.hazard_offset_y));

    let wings = d.resolve_wings();
    for n in &layout.nodes {
        match wings.get(&n.id) {
            Some(Wing::Left) => assert!(n.x < config.center_x, "{} at {}", n.id, n.x),
            Some(Wing::Right) => assert!(n.x > config.center_x, "{} at {}", n.id, n.x),
            None => {}
        }
    }
}

#[test]
fn collapsed_threat_sits_beside_top_event() {
    let d = diagram(
        vec![
            node("h", NodeType::Hazard),
            node("te", NodeType::TopEvent),
            node("t", NodeType::Threat),
            node("t2", NodeType::Threat),
            node("b", NodeType::PreventionBarrier),
            node("c", NodeType::Consequence),
        ],
        &[("h", "te"), ("t", "te"), ("t2", "b"), ("b", "te"), ("te", "c")],
    );
    let config = LayoutConfig::default();
    let layout = compute_simple_layout(&d);

    let te = layout.node("te").unwrap();
    let t = layout.node("t").unwrap();
    let expected = config.center_x - (te.width / 2.0 + config.collapsed_owner_gap + t.width / 2.0);
    assert!(approx_eq!(f64, t.x, expected, ulps = 2));
    // the empty lane still gets its single edge to the top event
    let edge = layout.edge("t", "te").unwrap();
    assert_eq!(edge.id, "lane:t->te");
    verify_layout(&layout, &d);
}

#[test]
fn end_to_end_single_chain() {
    let d = diagram(
        vec![
            node("H", NodeType::Hazard),
            node("TopEvent", NodeType::TopEvent),
            node("T", NodeType::Threat),
            node("B1", NodeType::PreventionBarrier),
            node("B2", NodeType::PreventionBarrier),
        ],
        &[("H", "TopEvent"), ("T", "B1"), ("B1", "B2"), ("B2", "TopEvent")],
    );

    let lanes = derive_threat_lane_order(&d);
    assert_eq!(lanes.len(), 1);
    assert_eq!(lanes.get("T").unwrap(), &["B1", "B2"]);

    let edges = build_threat_lane_edges(&lanes, &d.nodes);
    let pairs: Vec<(&str, &str)> = edges.iter().map(Edge::endpoints).collect();
    assert_eq!(
        pairs,
        vec![("T", "B1"), ("B1", "B2"), ("B2", "TopEvent")]
    );

    let layout = compute_simple_layout(&d);
    let xs: Vec<f64> = ["T", "B1", "B2", "TopEvent"]
        .iter()
        .map(|id| x_of(&layout, id))
        .collect();
    assert!(xs.windows(2).all(|w| w[0] < w[1]), "{xs:?}");
}

#[test]
fn dangling_references_are_skipped() {
    let mut d = sample_diagram();
    d.edges.push(Edge::new("ghost-edge", "t-dig", "ghost"));
    d.edges.push(Edge::new("ghost-edge-2", "phantom", "top"));

    let mut lanes = LaneOrders::derive(&d);
    lanes.threats.insert_lane(
        "t-dig",
        vec!["ghost".to_string(), "pb-patrol".to_string()],
    );
    lanes
        .threats
        .insert_lane("vanished-threat", vec!["pb-patrol".to_string()]);

    let layout = compute_layout(&d, &LayoutConfig::default(), Some(&lanes));
    verify_layout(&layout, &d);
    assert!(layout.node("ghost").is_none());
    assert!(
        layout
            .edges
            .iter()
            .all(|e| e.source != "ghost" && e.target != "ghost" && e.source != "phantom")
    );
}

#[test]
fn every_step_lays_out() {
    let d = sample_diagram();
    let lanes = LaneOrders::derive(&d);
    for step in 0..=10 {
        let options = StepOptions {
            prevention_groups: groups_from_lanes(&lanes.threats),
            mitigation_groups: groups_from_lanes(&lanes.consequences),
            ..StepOptions::at_step(step)
        };
        let visible = compute_step_diagram(&d, &options);
        let layout = compute_layout(&visible, &LayoutConfig::default(), Some(&lanes));
        verify_layout(&layout, &visible);
        assert_eq!(layout.nodes.len(), visible.nodes.len());
    }
}

#[test]
fn role_filtered_layout_keeps_spine() {
    let d = sample_diagram();
    let selected = BTreeSet::from(["Field Technician".to_string()]);
    let filtered = compute_role_filtered_diagram(&d, &selected);
    let layout = compute_simple_layout(&filtered);
    verify_layout(&layout, &filtered);
    assert!(layout.node("hazard").is_some());
    assert!(layout.node("top").is_some());
    assert!(layout.node("pb-patrol").is_some());
    assert!(layout.node("pb-inhibitor").is_none());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn layout_is_deterministic(
        threats in prop::collection::vec(0usize..4, 1..4),
        consequences in prop::collection::vec(0usize..4, 1..4),
    ) {
        let d = bowtie(&threats, &consequences);
        prop_assert_eq!(compute_simple_layout(&d), compute_simple_layout(&d));
    }

    #[test]
    fn lanes_read_left_to_right(
        threats in prop::collection::vec(0usize..4, 1..4),
        consequences in prop::collection::vec(0usize..4, 1..4),
    ) {
        let d = bowtie(&threats, &consequences);
        let layout = compute_simple_layout(&d);
        verify_layout(&layout, &d);
        let lanes = LaneOrders::derive(&d);

        for (threat, barriers) in lanes.threats.iter() {
            let mut path = vec![threat.as_str()];
            path.extend(barriers.iter().map(String::as_str));
            path.push("te");
            let xs: Vec<f64> = path.iter().map(|id| x_of(&layout, id)).collect();
            prop_assert!(xs.windows(2).all(|w| w[0] < w[1]), "{:?} {:?}", path, xs);
        }
        for (consequence, barriers) in lanes.consequences.iter() {
            let mut path = vec!["te"];
            path.extend(barriers.iter().map(String::as_str));
            path.push(consequence.as_str());
            let xs: Vec<f64> = path.iter().map(|id| x_of(&layout, id)).collect();
            prop_assert!(xs.windows(2).all(|w| w[0] < w[1]), "{:?} {:?}", path, xs);
        }
    }

    #[test]
    fn derived_lanes_cover_each_barrier_once(
        threats in prop::collection::vec(0usize..5, 1..5),
    ) {
        let d = bowtie(&threats, &[1]);
        let lanes = derive_threat_lane_order(&d);
        prop_assert!(lanes.duplicated_barriers().is_empty());
        let total: usize = lanes.iter().map(|(_, b)| b.len()).sum();
        prop_assert_eq!(total, threats.iter().sum::<usize>());
        prop_assert_eq!(
            build_threat_lane_edges(&lanes, &d.nodes).len(),
            threats.iter().map(|k| k + 1).sum::<usize>()
        );
    }

    #[test]
    fn wings_stay_on_their_side(
        threats in prop::collection::vec(0usize..4, 1..4),
        consequences in prop::collection::vec(0usize..4, 1..4),
    ) {
        let d = bowtie(&threats, &consequences);
        let center = LayoutConfig::default().center_x;
        let wings = d.resolve_wings();
        let layered = compute_layered_layout(&d, &LayoutConfig::default()).unwrap();
        for layout in [compute_simple_layout(&d), layered] {
            for n in &layout.nodes {
                match wings.get(&n.id) {
                    Some(Wing::Left) => prop_assert!(n.x < center, "{} at {}", n.id, n.x),
                    Some(Wing::Right) => prop_assert!(n.x > center, "{} at {}", n.id, n.x),
                    None => {}
                }
            }
        }
    }

    #[test]
    fn steps_only_ever_reveal(
        threats in prop::collection::vec(0usize..4, 1..4),
        consequences in prop::collection::vec(0usize..4, 1..4),
    ) {
        let d = bowtie(&threats, &consequences);
        let lanes = LaneOrders::derive(&d);
        let visible_at = |step: u8| -> HashSet<String> {
            let options = StepOptions {
                prevention_groups: groups_from_lanes(&lanes.threats),
                mitigation_groups: groups_from_lanes(&lanes.consequences),
                ..StepOptions::at_step(step)
            };
            compute_step_diagram(&d, &options)
                .nodes
                .into_iter()
                .map(|n| n.id)
                .collect()
        };
        let mut prev = visible_at(0);
        prop_assert_eq!(prev.len(), 2);
        for step in 1..=10 {
            let next = visible_at(step);
            prop_assert!(prev.is_subset(&next), "step {} hid something", step);
            prev = next;
        }
        prop_assert_eq!(prev.len(), d.nodes.len());
    }
}
