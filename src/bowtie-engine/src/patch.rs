// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::common::Result;
use crate::datamodel::{Diagram, Edge, Node, NodeMetadata};
use crate::edit_err;
use crate::validation::validate_connection;

/// One edit to a diagram.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DiagramOp {
    AddNode { node: Node },
    /// Removes the node and every edge touching it.
    RemoveNode { id: String },
    /// Guarded by the connection rules.
    AddEdge { edge: Edge },
    RemoveEdge { id: String },
    SetLabel { id: String, label: String },
    SetMetadata {
        id: String,
        #[serde(default)]
        metadata: Option<NodeMetadata>,
    },
}

/// Apply `ops` in order.  Either every op succeeds and the diagram is
/// replaced (with `updated_at` bumped), or the diagram is left untouched.
pub fn apply_ops(diagram: &mut Diagram, ops: &[DiagramOp]) -> Result<()> {
    let mut staged = diagram.clone();

    for op in ops {
        match op {
            DiagramOp::AddNode { node } => apply_add_node(&mut staged, node)?,
            DiagramOp::RemoveNode { id } => apply_remove_node(&mut staged, id)?,
            DiagramOp::AddEdge { edge } => apply_add_edge(&mut staged, edge)?,
            DiagramOp::RemoveEdge { id } => apply_remove_edge(&mut staged, id)?,
            DiagramOp::SetLabel { id, label } => {
                get_node_mut(&mut staged, id)?.label = label.clone();
            }
            DiagramOp::SetMetadata { id, metadata } => {
                get_node_mut(&mut staged, id)?.metadata = metadata.clone();
            }
        }
    }

    staged.updated_at = Utc::now();
    *diagram = staged;
    Ok(())
}

fn get_node_mut<'a>(diagram: &'a mut Diagram, id: &str) -> Result<&'a mut Node> {
    match diagram.get_node_mut(id) {
        Some(node) => Ok(node),
        None => edit_err!(DoesNotExist, format!("no node '{id}'")),
    }
}

fn apply_add_node(diagram: &mut Diagram, node: &Node) -> Result<()> {
    if diagram.get_node(&node.id).is_some() {
        return edit_err!(DuplicateNode, node.id.clone());
    }
    diagram.nodes.push(node.clone());
    Ok(())
}

fn apply_remove_node(diagram: &mut Diagram, id: &str) -> Result<()> {
    let before = diagram.nodes.len();
    diagram.nodes.retain(|n| n.id != id);
    if diagram.nodes.len() == before {
        return edit_err!(DoesNotExist, format!("no node '{id}'"));
    }
    diagram.edges.retain(|e| e.source != id && e.target != id);
    Ok(())
}

fn apply_add_edge(diagram: &mut Diagram, edge: &Edge) -> Result<()> {
    if diagram.edges.iter().any(|e| e.id == edge.id) {
        return edit_err!(DuplicateEdge, edge.id.clone());
    }
    if diagram.edges.iter().any(|e| e.endpoints() == edge.endpoints()) {
        return edit_err!(
            DuplicateEdge,
            format!("{} -> {} is already connected", edge.source, edge.target)
        );
    }

    let (Some(source), Some(target)) = (
        diagram.get_node(&edge.source),
        diagram.get_node(&edge.target),
    ) else {
        return edit_err!(
            DoesNotExist,
            format!("edge '{}' has a missing endpoint", edge.id)
        );
    };

    let check = validate_connection(&source.node_type, &target.node_type, &source.id, &target.id);
    if !check.valid {
        return edit_err!(RejectedConnection, check.error_message.unwrap_or_default());
    }

    diagram.edges.push(edge.clone());
    Ok(())
}

fn apply_remove_edge(diagram: &mut Diagram, id: &str) -> Result<()> {
    let before = diagram.edges.len();
    diagram.edges.retain(|e| e.id != id);
    if diagram.edges.len() == before {
        return edit_err!(DoesNotExist, format!("no edge '{id}'"));
    }
    Ok(())
}
