// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashSet};

use crate::datamodel::{Diagram, Node};
use crate::layout::text::natural_cmp;

/// Restrict `diagram` to the nodes tagged with at least one of `selected`.
/// The hazard and top event always survive, and an empty selection returns
/// the diagram itself.
pub fn compute_role_filtered_diagram<'a>(
    diagram: &'a Diagram,
    selected: &BTreeSet<String>,
) -> Cow<'a, Diagram> {
    if selected.is_empty() {
        return Cow::Borrowed(diagram);
    }

    let keep = |node: &Node| {
        node.node_type.is_spine()
            || node
                .metadata
                .as_ref()
                .is_some_and(|m| m.has_any_role(selected))
    };
    Cow::Owned(diagram.retain_nodes(keep))
}

/// Every distinct, non-empty role tag in the diagram, sorted so that
/// "Operator 2" comes before "Operator 10".
pub fn collect_available_roles(diagram: &Diagram) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut roles: Vec<String> = diagram
        .nodes
        .iter()
        .flat_map(|n| n.roles())
        .map(|r| r.trim())
        .filter(|r| !r.is_empty() && seen.insert(*r))
        .map(str::to_string)
        .collect();
    roles.sort_by(|a, b| natural_cmp(a, b));
    roles
}
