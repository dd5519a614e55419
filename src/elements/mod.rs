//! Jacket elements: joints, leg and brace runs, tubular sections

mod joint;
mod leg;
mod section;

pub use joint::{
    chord_brace_attachment_length, get_stub_length, BraceId, BraceStub, JointPolygons, JointType, Joint2D,
    KinkLocation, KinkedJoint, PlacedJoint, WorldJoint, DEFAULT_JOINT_GAP,
};
pub use leg::{calc_cone_length, BaySide, Leg, MemberId, DEFAULT_CONE_TAPER, MAX_LEG_POINTS};
pub use section::{SectionAlignment, TubularSection};
