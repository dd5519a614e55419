//! Jacket Geometry - 2D elevation geometry for braced tubular offshore jackets
//!
//! This library derives the leg, joint and brace geometry of a four-legged
//! jacket seen in elevation:
//! - Batter and joint layout from a handful of elevations and widths
//! - K-joint and X-joint cans with brace stubs, placed on the legs
//! - Leg and brace runs between joints, with cones at section changes
//! - Detection and repair of batter kinks that clash with joint cans
//! - Steel material take-off from the finished geometry
//!
//! ## Example
//! ```rust
//! use jacket_geom::prelude::*;
//!
//! // Local joint: one can, two braces
//! let mut joint = Joint2D::new(JointType::K, 2, 2000.0, 60.0, BraceStub::new(400.0, 20.0))
//!     .with_brace(BraceStub::new(500.0, 20.0))
//!     .unwrap();
//! joint.brace_attachment_thetas(&[60.0, 120.0]).unwrap();
//! joint.create_joint().unwrap();
//!
//! // Place it on a leg leaning at 85 degrees
//! let placed = joint
//!     .transform_joint(Some(85.0), Some(Vec2::new(-12000.0, 12150.0)), false)
//!     .unwrap();
//! let right = placed.mirrored();
//! assert_eq!(right.can_pt_top().x, -placed.can_pt_top().x);
//! ```
//!
//! A local joint is consumed by placement, so it cannot be placed twice:
//! ```compile_fail
//! use jacket_geom::prelude::*;
//!
//! let mut joint = Joint2D::new(JointType::K, 1, 2000.0, 60.0, BraceStub::new(800.0, 25.0));
//! joint.brace_attachment_thetas(&[45.0]).unwrap();
//! joint.create_joint().unwrap();
//! let first = joint.transform_joint(Some(85.0), None, false).unwrap();
//! let second = joint.transform_joint(Some(85.0), None, false).unwrap();
//! ```

pub mod api;
pub mod elements;
pub mod error;
pub mod geom;
pub mod jacket;
pub mod layout;
pub mod mass;
pub mod options;
pub mod sections;

// Re-export common types
pub mod prelude {
    pub use crate::elements::{
        BaySide, BraceId, BraceStub, Joint2D, JointType, KinkLocation, KinkedJoint, Leg, MemberId, PlacedJoint,
        SectionAlignment, TubularSection, WorldJoint,
    };
    pub use crate::error::{JacketError, JacketResult};
    pub use crate::geom::{Point, Polygon, Vec2};
    pub use crate::jacket::{DesignWarning, Jacket, JointPair, KjtEdit, LegPair, WarningFlag};
    pub use crate::layout::{BatterGeometry, BatterId, JacketLayout, JacketParams};
    pub use crate::mass::{MassLocation, MassSection, MassTakeoff};
    pub use crate::options::BuildOptions;
    pub use crate::sections::{build_jacket, FormData};
}

#[cfg(feature = "wasm")]
pub mod wasm;
