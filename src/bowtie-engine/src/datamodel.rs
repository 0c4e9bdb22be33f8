// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Helper functions for serde skip_serializing_if

fn is_empty_vec<T>(val: &[T]) -> bool {
    val.is_empty()
}

/// The role a node plays in a bowtie.  Types outside the bowtie vocabulary
/// survive import as `Unknown` so validation can report them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
    Hazard,
    TopEvent,
    Threat,
    PreventionBarrier,
    MitigationBarrier,
    Consequence,
    EscalationFactor,
    EscalationBarrier,
    Unknown(String),
}

impl NodeType {
    pub const ALL: [NodeType; 8] = [
        NodeType::Hazard,
        NodeType::TopEvent,
        NodeType::Threat,
        NodeType::PreventionBarrier,
        NodeType::MitigationBarrier,
        NodeType::Consequence,
        NodeType::EscalationFactor,
        NodeType::EscalationBarrier,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            NodeType::Hazard => "hazard",
            NodeType::TopEvent => "topEvent",
            NodeType::Threat => "threat",
            NodeType::PreventionBarrier => "preventionBarrier",
            NodeType::MitigationBarrier => "mitigationBarrier",
            NodeType::Consequence => "consequence",
            NodeType::EscalationFactor => "escalationFactor",
            NodeType::EscalationBarrier => "escalationBarrier",
            NodeType::Unknown(s) => s.as_str(),
        }
    }

    /// Human-readable plural used in messages, e.g. "Prevention Barriers".
    pub fn display_plural(&self) -> &str {
        match self {
            NodeType::Hazard => "the Hazard",
            NodeType::TopEvent => "the Top Event",
            NodeType::Threat => "Threats",
            NodeType::PreventionBarrier => "Prevention Barriers",
            NodeType::MitigationBarrier => "Mitigation Barriers",
            NodeType::Consequence => "Consequences",
            NodeType::EscalationFactor => "Escalation Factors",
            NodeType::EscalationBarrier => "Escalation Barriers",
            NodeType::Unknown(s) => s.as_str(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, NodeType::Unknown(_))
    }

    /// Position in the left-to-right flow of a bowtie.  Unknown types have
    /// no place in the flow.
    pub fn order(&self) -> Option<u8> {
        match self {
            NodeType::Threat | NodeType::EscalationFactor => Some(1),
            NodeType::PreventionBarrier | NodeType::EscalationBarrier => Some(2),
            NodeType::Hazard => Some(3),
            NodeType::TopEvent => Some(4),
            NodeType::MitigationBarrier => Some(5),
            NodeType::Consequence => Some(6),
            NodeType::Unknown(_) => None,
        }
    }

    pub fn is_spine(&self) -> bool {
        matches!(self, NodeType::Hazard | NodeType::TopEvent)
    }

    pub fn is_main_barrier(&self) -> bool {
        matches!(
            self,
            NodeType::PreventionBarrier | NodeType::MitigationBarrier
        )
    }

    pub fn is_escalation(&self) -> bool {
        matches!(
            self,
            NodeType::EscalationBarrier | NodeType::EscalationFactor
        )
    }

    /// The wing implied by the type alone.  Escalation nodes need the
    /// diagram to resolve theirs.
    pub fn fixed_wing(&self) -> Option<Wing> {
        match self {
            NodeType::Threat | NodeType::PreventionBarrier => Some(Wing::Left),
            NodeType::MitigationBarrier | NodeType::Consequence => Some(Wing::Right),
            _ => None,
        }
    }
}

impl From<String> for NodeType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "hazard" => NodeType::Hazard,
            "topEvent" => NodeType::TopEvent,
            "threat" => NodeType::Threat,
            "preventionBarrier" => NodeType::PreventionBarrier,
            "mitigationBarrier" => NodeType::MitigationBarrier,
            "consequence" => NodeType::Consequence,
            "escalationFactor" => NodeType::EscalationFactor,
            "escalationBarrier" => NodeType::EscalationBarrier,
            _ => NodeType::Unknown(s),
        }
    }
}

impl From<&str> for NodeType {
    fn from(s: &str) -> Self {
        NodeType::from(s.to_string())
    }
}

impl From<NodeType> for String {
    fn from(t: NodeType) -> Self {
        match t {
            NodeType::Unknown(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl Display for NodeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Wing {
    Left,
    Right,
}

impl Wing {
    /// -1 for the left wing, +1 for the right: multiply an outward offset by
    /// this to move away from the spine.
    pub fn sign(self) -> f64 {
        match self {
            Wing::Left => -1.0,
            Wing::Right => 1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    Left,
    Right,
    Center,
}

impl From<Option<Wing>> for Orientation {
    fn from(wing: Option<Wing>) -> Self {
        match wing {
            Some(Wing::Left) => Orientation::Left,
            Some(Wing::Right) => Orientation::Right,
            None => Orientation::Center,
        }
    }
}

/// Which side of a node card an edge attaches to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HandleSide {
    Top,
    Right,
    Bottom,
    Left,
}

/// Explanatory record attached to a node.  Lists are empty rather than
/// absent; scalar fields are explicitly optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub details: Vec<String>,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub kpis: Vec<String>,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub failure_modes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reference: Option<String>,
}

impl NodeMetadata {
    /// Tags are compared trimmed, the way they are listed as available
    /// roles, and blank tags never match.
    pub fn has_any_role(&self, selected: &std::collections::BTreeSet<String>) -> bool {
        self.roles
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .any(|r| selected.iter().any(|s| s.trim() == r))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub wing: Option<Wing>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<NodeMetadata>,
}

impl Node {
    pub fn new(id: &str, node_type: NodeType, label: &str) -> Self {
        Node {
            id: id.to_string(),
            node_type,
            label: label.to_string(),
            wing: None,
            metadata: None,
        }
    }

    pub fn with_wing(mut self, wing: Wing) -> Self {
        self.wing = Some(wing);
        self
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        let metadata = self.metadata.get_or_insert_with(NodeMetadata::default);
        metadata.roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    /// Orientation judged from the node alone: explicit wing first, then
    /// the wing its type implies.
    pub fn orientation(&self) -> Orientation {
        Orientation::from(self.wing.or_else(|| self.node_type.fixed_wing()))
    }

    pub fn roles(&self) -> &[String] {
        self.metadata
            .as_ref()
            .map(|m| m.roles.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source_handle: Option<HandleSide>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_handle: Option<HandleSide>,
}

impl Edge {
    pub fn new(id: &str, source: &str, target: &str) -> Self {
        Edge {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            source_handle: None,
            target_handle: None,
        }
    }

    pub fn endpoints(&self) -> (&str, &str) {
        (self.source.as_str(), self.target.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Diagram {
    pub fn new(id: &str, title: &str) -> Self {
        let now = Utc::now();
        Diagram {
            id: id.to_string(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn get_node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn nodes_of_type(&self, node_type: NodeType) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.node_type == node_type)
    }

    pub fn count_of_type(&self, node_type: NodeType) -> usize {
        self.nodes_of_type(node_type).count()
    }

    /// The first top event, if any.
    pub fn top_event(&self) -> Option<&Node> {
        self.nodes_of_type(NodeType::TopEvent).next()
    }

    /// The first hazard, if any.
    pub fn hazard(&self) -> Option<&Node> {
        self.nodes_of_type(NodeType::Hazard).next()
    }

    /// Node id -> node type, for O(1) lookup during traversals.
    pub fn type_index(&self) -> HashMap<&str, &NodeType> {
        self.nodes
            .iter()
            .map(|n| (n.id.as_str(), &n.node_type))
            .collect()
    }

    /// Resolve every node's wing.  Escalation nodes without an explicit
    /// wing inherit it from their parent along incoming edges; nodes whose
    /// wing cannot be determined are absent from the result.
    pub fn resolve_wings(&self) -> HashMap<String, Wing> {
        let mut wings: HashMap<String, Wing> = HashMap::new();
        for node in &self.nodes {
            if let Some(wing) = node.wing.or_else(|| node.node_type.fixed_wing()) {
                wings.insert(node.id.clone(), wing);
            }
        }

        let types = self.type_index();
        // escalation barriers first (parent is a main barrier), then factors
        for child_type in [NodeType::EscalationBarrier, NodeType::EscalationFactor] {
            for node in self.nodes_of_type(child_type.clone()) {
                if wings.contains_key(&node.id) {
                    continue;
                }
                let parent_wing = self
                    .edges
                    .iter()
                    .filter(|e| e.target == node.id)
                    .filter(|e| match types.get(e.source.as_str()) {
                        Some(t) if child_type == NodeType::EscalationBarrier => {
                            t.is_main_barrier()
                        }
                        Some(t) => **t == NodeType::EscalationBarrier,
                        None => false,
                    })
                    .find_map(|e| wings.get(&e.source).copied());
                if let Some(wing) = parent_wing {
                    wings.insert(node.id.clone(), wing);
                }
            }
        }

        wings
    }

    /// Keep only the nodes matching `keep`, and the edges whose endpoints
    /// both survive.
    pub fn retain_nodes<F>(&self, keep: F) -> Diagram
    where
        F: Fn(&Node) -> bool,
    {
        let nodes: Vec<Node> = self.nodes.iter().filter(|n| keep(n)).cloned().collect();
        let live: std::collections::HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        let edges = self
            .edges
            .iter()
            .filter(|e| live.contains(e.source.as_str()) && live.contains(e.target.as_str()))
            .cloned()
            .collect();

        Diagram {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            nodes,
            edges,
        }
    }
}
