// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::text::WidthClass;

/// Spacing constants for the bowtie layout.
///
/// All values are in logical layout units.  Positions are node centres;
/// gaps are measured between card edges.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    // Spine
    /// Where the top event is placed.
    pub center_x: f64,
    pub center_y: f64,
    /// Vertical distance from the top event up to the hazard.
    pub hazard_offset_y: f64,

    // Chains
    /// Horizontal distance from the centre to the barrier nearest the
    /// top event.
    pub column_gap: f64,
    /// Gap between neighbouring barriers in one chain.
    pub barrier_gap: f64,
    /// Gap between a threat/consequence and its outermost barrier.
    pub owner_gap: f64,
    /// Gap between a barrier-less threat/consequence and the top event.
    pub collapsed_owner_gap: f64,
    /// Vertical distance between neighbouring lanes.
    pub row_spacing: f64,
    /// Minimum vertical clearance kept between the extents of two lanes.
    pub lane_clearance: f64,

    // Escalation branches
    pub escalation_offset_x: f64,
    pub escalation_offset_y: f64,
    pub escalation_sibling_gap: f64,
    /// Horizontal distance from an escalation barrier out to its factors.
    pub factor_offset_x: f64,
    pub factor_sibling_gap: f64,

    // Cards
    pub node_height: f64,
    pub narrow_width: f64,
    pub medium_width: f64,
    pub wide_width: f64,

    // Layered variant
    /// Horizontal distance between ranks.
    pub rank_spacing: f64,
    /// Number of barycenter sweeps.
    pub barycenter_iterations: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            center_x: 800.0,
            center_y: 400.0,
            hazard_offset_y: 150.0,
            column_gap: 260.0,
            barrier_gap: 40.0,
            owner_gap: 80.0,
            collapsed_owner_gap: 60.0,
            row_spacing: 140.0,
            lane_clearance: 20.0,
            escalation_offset_x: 120.0,
            escalation_offset_y: 110.0,
            escalation_sibling_gap: 70.0,
            factor_offset_x: 200.0,
            factor_sibling_gap: 70.0,
            node_height: 60.0,
            narrow_width: 150.0,
            medium_width: 190.0,
            wide_width: 240.0,
            rank_spacing: 260.0,
            barycenter_iterations: 4,
        }
    }
}

impl LayoutConfig {
    pub fn width_of(&self, class: WidthClass) -> f64 {
        match class {
            WidthClass::Narrow => self.narrow_width,
            WidthClass::Medium => self.medium_width,
            WidthClass::Wide => self.wide_width,
        }
    }

    /// Replace values that would produce a degenerate layout (negative or
    /// non-finite spacing, zero-size cards) with their defaults.  Returns
    /// the names of the fields that were reset.
    pub fn validate(&mut self) -> Vec<&'static str> {
        let defaults = LayoutConfig::default();
        let mut reset = Vec::new();

        macro_rules! check {
            ($field:ident, $ok:expr) => {{
                let value = self.$field;
                let ok: fn(f64) -> bool = $ok;
                if !value.is_finite() || !ok(value) {
                    warn!(
                        field = stringify!($field),
                        value,
                        default = defaults.$field,
                        "invalid layout config value, using default"
                    );
                    self.$field = defaults.$field;
                    reset.push(stringify!($field));
                }
            }};
        }

        fn any(_: f64) -> bool {
            true
        }
        fn non_negative(v: f64) -> bool {
            v >= 0.0
        }
        fn positive(v: f64) -> bool {
            v > 0.0
        }

        check!(center_x, any);
        check!(center_y, any);
        check!(hazard_offset_y, non_negative);
        check!(column_gap, positive);
        check!(barrier_gap, non_negative);
        check!(owner_gap, non_negative);
        check!(collapsed_owner_gap, non_negative);
        check!(row_spacing, positive);
        check!(lane_clearance, non_negative);
        check!(escalation_offset_x, positive);
        check!(escalation_offset_y, non_negative);
        check!(escalation_sibling_gap, non_negative);
        check!(factor_offset_x, positive);
        check!(factor_sibling_gap, non_negative);
        check!(node_height, positive);
        check!(narrow_width, positive);
        check!(medium_width, positive);
        check!(wide_width, positive);
        check!(rank_spacing, positive);

        if self.barycenter_iterations == 0 {
            self.barycenter_iterations = defaults.barycenter_iterations;
            reset.push("barycenter_iterations");
        }

        reset
    }
}
