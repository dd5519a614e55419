//! Tubular section properties

use serde::{Deserialize, Serialize};

/// Which diameter is held in line where two tubulars of different wall
/// thickness meet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SectionAlignment {
    /// Inner diameters line up
    IdConstant,
    /// Mid-wall diameters line up
    #[default]
    MdConstant,
}

impl SectionAlignment {
    /// The diameter kept in line for a tube of outer diameter `od` and wall `thk`.
    ///
    /// Both alignments subtract from a single supplied thickness, so a leg whose
    /// ends differ only in wall thickness compares equal here.
    pub fn aligned_width(&self, od: f64, thk: f64) -> f64 {
        match self {
            SectionAlignment::IdConstant => od - thk,
            SectionAlignment::MdConstant => od - 0.5 * thk,
        }
    }
}

/// Circular hollow section (CHS)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TubularSection {
    /// Outer diameter in mm
    pub outer_diameter: f64,
    /// Wall thickness in mm
    pub thickness: f64,
}

impl TubularSection {
    pub fn new(outer_diameter: f64, thickness: f64) -> Self {
        Self {
            outer_diameter,
            thickness,
        }
    }

    /// Inner diameter in mm
    pub fn inner_diameter(&self) -> f64 {
        self.outer_diameter - 2.0 * self.thickness
    }

    /// Steel area in mm²
    pub fn area(&self) -> f64 {
        let r_o = self.outer_diameter / 2.0;
        let r_i = r_o - self.thickness;
        std::f64::consts::PI * (r_o.powi(2) - r_i.powi(2))
    }

    /// Mean radius of the wall in mm
    pub fn mean_radius(&self) -> f64 {
        (self.outer_diameter - self.thickness) / 2.0
    }

    /// True if the wall closes up (no bore left)
    pub fn is_solid(&self) -> bool {
        self.inner_diameter() <= 0.0
    }
}
