// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub mod common;
pub mod datamodel;
pub mod json;
pub mod lanes;
pub mod layout;
pub mod patch;
pub mod roles;
pub mod scenarios;
pub mod step;
pub mod validation;

#[cfg(test)]
mod testutils;

pub use self::common::{Error, ErrorCode, ErrorKind, Result, ValidationErrors};
pub use self::datamodel::{Diagram, Edge, HandleSide, Node, NodeMetadata, NodeType, Wing};
pub use self::lanes::{
    ConsequenceLaneOrder, LaneOrder, LaneOrders, ThreatLaneOrder, build_consequence_lane_edges,
    build_threat_lane_edges, derive_consequence_lane_order, derive_threat_lane_order,
    move_barrier_to_threat, replace_threat_lane_edges,
};
pub use self::layout::layered::compute_layered_layout;
pub use self::layout::{Layout, LayoutConfig, Position, compute_layout, compute_simple_layout};
pub use self::patch::{DiagramOp, apply_ops};
pub use self::roles::{collect_available_roles, compute_role_filtered_diagram};
pub use self::step::{StepOptions, compute_step_diagram};
pub use self::validation::{ConnectionValidation, validate_connection, validate_diagram};
