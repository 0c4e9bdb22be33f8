// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Progressive reveal of a diagram for guided narration.
//!
//! Step 0 shows only the hazard and top event.  Step 1 adds the threats and
//! consequences; steps 2-5 reveal prevention barriers group by group, step 6
//! all of them; steps 7-9 reveal mitigation barriers group by group and step
//! 10 shows everything.  Collapsing a wing hides it at every step.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::datamodel::{Diagram, Node, NodeType, Wing};
use crate::lanes::LaneOrder;

pub const MAX_STEP: u8 = 10;

const FIRST_PREVENTION_GROUP_STEP: u8 = 2;
const ALL_PREVENTION_STEP: u8 = 6;
const FIRST_MITIGATION_GROUP_STEP: u8 = 7;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StepOptions {
    pub step: u8,
    pub left_expanded: bool,
    pub right_expanded: bool,
    /// Barrier ids grouped by owning threat, in reveal order.
    pub prevention_groups: Vec<Vec<String>>,
    /// Barrier ids grouped by owning consequence, in reveal order.
    pub mitigation_groups: Vec<Vec<String>>,
}

impl Default for StepOptions {
    fn default() -> Self {
        StepOptions {
            step: MAX_STEP,
            left_expanded: true,
            right_expanded: true,
            prevention_groups: Vec::new(),
            mitigation_groups: Vec::new(),
        }
    }
}

impl StepOptions {
    pub fn at_step(step: u8) -> Self {
        StepOptions {
            step,
            ..StepOptions::default()
        }
    }
}

/// Default reveal groups: one per non-empty lane, in lane order.
pub fn groups_from_lanes(lanes: &LaneOrder) -> Vec<Vec<String>> {
    lanes
        .iter()
        .filter(|(_, barriers)| !barriers.is_empty())
        .map(|(_, barriers)| barriers.clone())
        .collect()
}

/// Ids in the first `count` groups.
fn revealed_groups(groups: &[Vec<String>], count: usize) -> HashSet<&str> {
    groups
        .iter()
        .take(count)
        .flatten()
        .map(String::as_str)
        .collect()
}

/// The sub-diagram visible at `options.step`.  Edges survive only if both
/// endpoints do.
pub fn compute_step_diagram(diagram: &Diagram, options: &StepOptions) -> Diagram {
    let step = options.step.min(MAX_STEP);
    let wings = diagram.resolve_wings();

    let prevention = if (FIRST_PREVENTION_GROUP_STEP..ALL_PREVENTION_STEP).contains(&step) {
        revealed_groups(
            &options.prevention_groups,
            (step - FIRST_PREVENTION_GROUP_STEP) as usize,
        )
    } else {
        HashSet::new()
    };
    let mitigation = if (FIRST_MITIGATION_GROUP_STEP..MAX_STEP).contains(&step) {
        revealed_groups(
            &options.mitigation_groups,
            (step - FIRST_MITIGATION_GROUP_STEP) as usize,
        )
    } else {
        HashSet::new()
    };

    let left = options.left_expanded;
    let right = options.right_expanded;
    let visible = |node: &Node| match &node.node_type {
        NodeType::Hazard | NodeType::TopEvent => true,
        NodeType::Threat => left && step >= 1,
        NodeType::Consequence => right && step >= 1,
        NodeType::PreventionBarrier => {
            left && (step >= ALL_PREVENTION_STEP || prevention.contains(node.id.as_str()))
        }
        NodeType::MitigationBarrier => {
            right && (step >= MAX_STEP || mitigation.contains(node.id.as_str()))
        }
        // escalation branches appear with their wing's full barrier reveal
        NodeType::EscalationBarrier | NodeType::EscalationFactor => match wings.get(&node.id) {
            Some(Wing::Left) => left && step >= ALL_PREVENTION_STEP,
            Some(Wing::Right) => right && step >= MAX_STEP,
            None => step >= MAX_STEP,
        },
        NodeType::Unknown(_) => step >= MAX_STEP,
    };

    diagram.retain_nodes(visible)
}
