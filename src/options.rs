//! Build options for jacket geometry generation

use serde::{Deserialize, Serialize};

use crate::elements::SectionAlignment;

/// Options controlling how joints, legs and braces are generated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Gap between adjacent brace footprints on a K-joint can in mm (X-joints always use 0)
    pub joint_gap: f64,
    /// Cone taper ratio, 1-in-n per side
    pub cone_taper: f64,
    /// Distance from the wide end of the longest segment to the cone start in mm
    /// (None = cone centred in the segment)
    pub cone_offset: Option<f64>,
    /// Which diameter stays aligned across a thickness change
    pub section_alignment: SectionAlignment,
    /// Tolerance when comparing two aligned section widths in mm
    pub section_tolerance: f64,
    /// Clearance a K-joint can end must keep from a batter change elevation in mm
    pub kink_check_distance: f64,
    /// Length a repaired can is carried past the batter kink in mm
    pub extension_beyond_kink: f64,
    /// Stretch the top K-joint can up to the transition piece bottom
    pub extend_k1_to_tp: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            joint_gap: 100.0,
            cone_taper: 4.0,
            cone_offset: None,
            section_alignment: SectionAlignment::MdConstant,
            section_tolerance: 1e-3,
            kink_check_distance: 1000.0,
            extension_beyond_kink: 3000.0,
            extend_k1_to_tp: false,
        }
    }
}

impl BuildOptions {
    /// Set the K-joint brace gap
    pub fn with_joint_gap(mut self, gap: f64) -> Self {
        self.joint_gap = gap;
        self
    }

    /// Set the cone taper ratio
    pub fn with_cone_taper(mut self, taper: f64) -> Self {
        self.cone_taper = taper;
        self
    }

    /// Place cones at a fixed offset from the wide end instead of centring them
    pub fn with_cone_offset(mut self, offset: f64) -> Self {
        self.cone_offset = Some(offset);
        self
    }

    /// Set the section alignment
    pub fn with_alignment(mut self, alignment: SectionAlignment) -> Self {
        self.section_alignment = alignment;
        self
    }

    /// Set the section comparison tolerance
    pub fn with_section_tolerance(mut self, tol: f64) -> Self {
        self.section_tolerance = tol;
        self
    }

    /// Set the clearance and extension used by the can/batter conflict check
    pub fn with_kink_check(mut self, distance: f64, extension: f64) -> Self {
        self.kink_check_distance = distance;
        self.extension_beyond_kink = extension;
        self
    }

    /// Extend the top K-joint can to the transition piece
    pub fn with_k1_extended_to_tp(mut self) -> Self {
        self.extend_k1_to_tp = true;
        self
    }
}
