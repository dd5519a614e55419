//! K- and X-joint can and stub geometry
//!
//! A joint is first built in a local frame: the can axis lies on local y and the
//! work point (where every brace centreline meets the can axis) is the origin.
//! Brace angles are measured in degrees from local +y, turning towards local +x.
//! Angles above 180° put the brace on the -x side of the can, which makes the
//! joint an X-joint.
//!
//! The lifecycle is carried by the types:
//!
//! ```text
//! Joint2D --transform_joint--> PlacedJoint --extend_kjt_can_and_kink--> KinkedJoint
//! ```
//!
//! Each transition consumes its input, so a joint can be placed in the world
//! frame once and kinked once.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{JacketError, JacketResult};
use crate::geom::{
    construct_true_constant_width_path, extend_middle_points_to_target_y, mirror_point, Point, Polygon,
    Vec2,
};

/// Default clear gap between adjacent brace footprints on a K-joint can (mm)
pub const DEFAULT_JOINT_GAP: f64 = 100.0;

/// Minimum can length beyond the outermost brace footprint (mm)
pub const MIN_CAN_END: f64 = 300.0;

/// Minimum practical stub length (mm)
pub const MIN_STUB_LENGTH: f64 = 600.0;

/// Maximum number of braces framing into one joint
pub const MAX_BRACES: usize = 3;

/// Joint topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JointType {
    /// Leg joint, one to three braces on the inboard side
    #[serde(rename = "kjt")]
    K,
    /// Mid-bay crossing of the two diagonals
    #[serde(rename = "xjt")]
    X,
}

impl JointType {
    pub fn prefix(&self) -> &'static str {
        match self {
            JointType::K => "kjt",
            JointType::X => "xjt",
        }
    }
}

/// Brace stub identifier, ordered by ascending brace angle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BraceId {
    #[serde(rename = "brc1")]
    Brc1,
    #[serde(rename = "brc2")]
    Brc2,
    #[serde(rename = "brc3")]
    Brc3,
}

impl BraceId {
    /// Brace id for a zero-based brace slot
    pub fn from_index(i: usize) -> Option<Self> {
        match i {
            0 => Some(BraceId::Brc1),
            1 => Some(BraceId::Brc2),
            2 => Some(BraceId::Brc3),
            _ => None,
        }
    }
}

impl fmt::Display for BraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BraceId::Brc1 => "brc1",
            BraceId::Brc2 => "brc2",
            BraceId::Brc3 => "brc3",
        };
        f.write_str(s)
    }
}

/// One brace stub framing into a can
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BraceStub {
    /// Outer diameter in mm
    pub d: f64,
    /// Wall thickness in mm
    pub t: f64,
    /// Angle from the local can axis in degrees
    pub theta: Option<f64>,
}

impl BraceStub {
    pub fn new(d: f64, t: f64) -> Self {
        Self { d, t, theta: None }
    }

    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = Some(theta);
        self
    }
}

/// Which end of the can a batter kink was absorbed through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KinkLocation {
    #[serde(rename = "above_kjt")]
    AboveKjt,
    #[serde(rename = "below_kjt")]
    BelowKjt,
}

impl fmt::Display for KinkLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KinkLocation::AboveKjt => f.write_str("above_kjt"),
            KinkLocation::BelowKjt => f.write_str("below_kjt"),
        }
    }
}

/// Can and stub outlines of a joint
///
/// The can is a list because a kinked can becomes a mitred run of two trapezoids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointPolygons {
    pub can: Vec<Polygon>,
    pub stubs: BTreeMap<BraceId, Polygon>,
}

impl JointPolygons {
    fn map(&self, f: impl Fn(&Polygon) -> Polygon) -> Self {
        Self {
            can: self.can.iter().map(&f).collect(),
            stubs: self.stubs.iter().map(|(k, p)| (*k, f(p))).collect(),
        }
    }
}

/// Projected length of a brace footprint along the can axis
pub fn chord_brace_attachment_length(d: f64, theta: f64) -> f64 {
    (d / theta.to_radians().sin()).abs()
}

/// Stub length so the square-cut end clears the can, plus the practical minimum
pub fn get_stub_length(d: f64, theta: f64) -> f64 {
    (0.5 * d / theta.to_radians().tan()).abs() + d.max(MIN_STUB_LENGTH)
}

/// Brace centreline from the can surface to the stub tip, local frame
fn brace_wire_ends(dc: f64, d: f64, theta: f64) -> [Point; 2] {
    let rad = theta.to_radians();
    let half = 0.5 * dc;
    let m1 = if theta > 180.0 {
        Point::new(-half, -half / rad.tan())
    } else {
        Point::new(half, half / rad.tan())
    };
    let length = get_stub_length(d, theta);
    let m2 = m1 + Vec2::new(rad.sin(), rad.cos()) * length;
    [m1, m2]
}

/// Stub quadrilateral: inboard edge on the chord surface, square-cut tip
fn brace_stub_polygon(wire: &[Point; 2], d: f64, theta: f64) -> Polygon {
    let rad = theta.to_radians();
    let [m1, m2] = wire;
    let v = 0.5 * d / rad.sin();
    let oo = 0.5 * d * rad.sin();
    let aa = 0.5 * d * rad.cos();
    Polygon::from_points(&[
        Point::new(m1.x, m1.y - v),
        Point::new(m1.x, m1.y + v),
        Point::new(m2.x - aa, m2.y + oo),
        Point::new(m2.x + aa, m2.y - oo),
    ])
}

/// A joint in its local frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint2D {
    pub jt_type: JointType,
    /// 1-based joint number, counted from the top of the jacket
    pub index: usize,
    /// Can outer diameter in mm
    pub dc: f64,
    /// Can wall thickness in mm
    pub tc: f64,
    braces: Vec<BraceStub>,
    joint_gap: f64,
    can_length: Option<f64>,
    wire_ends: Vec<[Point; 2]>,
    local: Option<JointPolygons>,
}

impl Joint2D {
    /// Create a joint with its first brace
    pub fn new(jt_type: JointType, index: usize, dc: f64, tc: f64, first: BraceStub) -> Self {
        Self {
            jt_type,
            index,
            dc,
            tc,
            braces: vec![first],
            joint_gap: DEFAULT_JOINT_GAP,
            can_length: None,
            wire_ends: Vec::new(),
            local: None,
        }
    }

    /// Add the next brace (brace 2, then brace 3)
    pub fn with_brace(mut self, brace: BraceStub) -> JacketResult<Self> {
        if self.braces.len() >= MAX_BRACES {
            return Err(JacketError::InvalidInput(format!(
                "{} already has {MAX_BRACES} braces",
                self.name()
            )));
        }
        self.braces.push(brace);
        Ok(self)
    }

    pub fn with_joint_gap(mut self, gap: f64) -> Self {
        self.joint_gap = gap;
        self
    }

    /// Joint name, e.g. `kjt_2` or `xjt_1`
    pub fn name(&self) -> String {
        format!("{}_{}", self.jt_type.prefix(), self.index)
    }

    pub fn braces(&self) -> &[BraceStub] {
        &self.braces
    }

    pub fn n_braces(&self) -> usize {
        self.braces.len()
    }

    /// True if any brace sits on the far side of the can
    pub fn is_x_joint(&self) -> bool {
        self.braces.iter().any(|b| b.theta.is_some_and(|t| t > 180.0))
    }

    /// Gap used in the can length (always 0 for an X-joint)
    pub fn joint_gap(&self) -> f64 {
        if self.is_x_joint() {
            0.0
        } else {
            self.joint_gap
        }
    }

    /// Can length in mm, available after [`Joint2D::create_joint`]
    pub fn can_length(&self) -> Option<f64> {
        self.can_length
    }

    /// Local-frame outlines, available after [`Joint2D::create_joint`]
    pub fn local_polygons(&self) -> Option<&JointPolygons> {
        self.local.as_ref()
    }

    /// Local-frame brace centrelines `[chord surface, stub tip]`
    pub fn wire_end_coords(&self) -> &[[Point; 2]] {
        &self.wire_ends
    }

    /// Set the brace angles, one per brace in brace order
    pub fn brace_attachment_thetas(&mut self, thetas: &[f64]) -> JacketResult<()> {
        if thetas.len() != self.braces.len() {
            return Err(JacketError::InvalidInput(format!(
                "{} has {} braces but {} brace angles were given",
                self.name(),
                self.braces.len(),
                thetas.len()
            )));
        }
        for (brace, &theta) in self.braces.iter_mut().zip(thetas) {
            brace.theta = Some(theta);
        }
        self.check_x_joint()
    }

    fn check_x_joint(&self) -> JacketResult<()> {
        if self.is_x_joint() {
            if self.braces.len() > 2 {
                return Err(JacketError::InvalidInput(format!(
                    "{} is an X joint and takes 2 braces, got {}",
                    self.name(),
                    self.braces.len()
                )));
            }
            log::debug!("{} identified as an X joint, joint gap set to 0", self.name());
        }
        Ok(())
    }

    fn thetas(&self) -> JacketResult<Vec<f64>> {
        self.braces
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let theta = b.theta.ok_or_else(|| {
                    JacketError::InvalidInput(format!("{} brace {} has no angle", self.name(), i + 1))
                })?;
                if theta.to_radians().sin().abs() < 1e-9 {
                    return Err(JacketError::InvalidGeometry(format!(
                        "{} brace {} runs along the can axis ({theta} deg)",
                        self.name(),
                        i + 1
                    )));
                }
                Ok(theta)
            })
            .collect()
    }

    /// Build the local-frame can and stub outlines
    pub fn create_joint(&mut self) -> JacketResult<()> {
        self.check_x_joint()?;
        let thetas = self.thetas()?;

        self.wire_ends = self
            .braces
            .iter()
            .zip(&thetas)
            .map(|(b, &theta)| brace_wire_ends(self.dc, b.d, theta))
            .collect();

        let mut stubs = BTreeMap::new();
        for (i, (wire, (b, &theta))) in self.wire_ends.iter().zip(self.braces.iter().zip(&thetas)).enumerate() {
            if let Some(id) = BraceId::from_index(i) {
                stubs.insert(id, brace_stub_polygon(wire, b.d, theta));
            }
        }

        let can_length = self.calc_can_length(&thetas);
        self.can_length = Some(can_length);

        // ends sit half a can length beyond the extreme chord crossings
        let (lo, hi) = self
            .wire_ends
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), w| (lo.min(w[0].y), hi.max(w[0].y)));
        let half_d = self.dc / 2.0;
        let half_l = can_length / 2.0;
        let can = Polygon::from_points(&[
            Point::new(-half_d, lo - half_l),
            Point::new(-half_d, hi + half_l),
            Point::new(half_d, hi + half_l),
            Point::new(half_d, lo - half_l),
        ]);

        log::debug!("{}: can length {:.1} mm, {} braces", self.name(), can_length, self.braces.len());
        self.local = Some(JointPolygons { can: vec![can], stubs });
        Ok(())
    }

    fn calc_can_length(&self, thetas: &[f64]) -> f64 {
        let ends = 2.0 * (self.dc / 4.0).max(MIN_CAN_END);
        let attachments: f64 = self
            .braces
            .iter()
            .zip(thetas)
            .map(|(b, &theta)| chord_brace_attachment_length(b.d, theta))
            .sum();
        let gaps = match self.braces.len() {
            1 => 0.0,
            2 => self.joint_gap(),
            _ => 2.0 * self.joint_gap(),
        };
        ends + attachments + gaps
    }

    /// Place the joint in the world frame: rotate, then translate, then mirror about x = 0.
    ///
    /// `batter_angle` is the leg angle from horizontal; the local can axis is
    /// turned onto it. Consumes the local joint.
    pub fn transform_joint(
        self,
        batter_angle: Option<f64>,
        translate_by: Option<Vec2>,
        mirror: bool,
    ) -> JacketResult<PlacedJoint> {
        let Some(local) = self.local.clone() else {
            return Err(JacketError::JointNotCreated(self.name()));
        };

        let mut world = local;
        if let Some(b) = batter_angle {
            let rotate_by = if b >= 0.0 { -90.0 + b } else { 90.0 + b };
            world = world.map(|p| p.rotated(rotate_by));
        }
        if let Some(t) = translate_by {
            world = world.map(|p| p.translated(&t));
        }
        if mirror {
            world = world.map(Polygon::mirrored);
        }

        Ok(PlacedJoint::new(self, batter_angle, translate_by, mirror, world))
    }
}

/// A joint placed in the world frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedJoint {
    joint: Joint2D,
    pub batter_angle: Option<f64>,
    pub translate_by: Option<Vec2>,
    pub mirror: bool,
    polygons: JointPolygons,
    can_pt_top: Point,
    can_pt_btm: Point,
    stub_start_pts: BTreeMap<BraceId, Point>,
    stub_end_pts: BTreeMap<BraceId, Point>,
}

impl PlacedJoint {
    fn new(
        joint: Joint2D,
        batter_angle: Option<f64>,
        translate_by: Option<Vec2>,
        mirror: bool,
        polygons: JointPolygons,
    ) -> Self {
        let can = &polygons.can[0];
        let can_pt_top = can.midpoint(1, 2);
        let can_pt_btm = can.midpoint(3, 0);
        let stub_start_pts = polygons.stubs.iter().map(|(k, p)| (*k, p.midpoint(0, 1))).collect();
        let stub_end_pts = polygons.stubs.iter().map(|(k, p)| (*k, p.midpoint(2, 3))).collect();
        Self {
            joint,
            batter_angle,
            translate_by,
            mirror,
            polygons,
            can_pt_top,
            can_pt_btm,
            stub_start_pts,
            stub_end_pts,
        }
    }

    /// The local joint this was placed from
    pub fn joint(&self) -> &Joint2D {
        &self.joint
    }

    pub fn name(&self) -> String {
        self.joint.name()
    }

    /// World-frame outlines
    pub fn joint_poly_coords_transf(&self) -> &JointPolygons {
        &self.polygons
    }

    /// Midpoint of the can's top face
    pub fn can_pt_top(&self) -> Point {
        self.can_pt_top
    }

    /// Midpoint of the can's bottom face
    pub fn can_pt_btm(&self) -> Point {
        self.can_pt_btm
    }

    /// Lowest and highest world y over every can outline vertex
    pub fn can_y_extent(&self) -> (f64, f64) {
        self.polygons
            .can
            .iter()
            .filter_map(Polygon::y_extent)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (a, b)| (lo.min(a), hi.max(b)))
    }

    /// Stub centreline points on the chord surface
    pub fn stub_start_pts(&self) -> &BTreeMap<BraceId, Point> {
        &self.stub_start_pts
    }

    /// Stub centreline points at the stub tips
    pub fn stub_end_pts(&self) -> &BTreeMap<BraceId, Point> {
        &self.stub_end_pts
    }

    /// Stub tip with the lowest elevation
    pub fn lowest_stub_end(&self) -> Option<Point> {
        self.stub_end_pts
            .values()
            .copied()
            .min_by(|a, b| a.y.total_cmp(&b.y))
    }

    /// Stub tip with the highest elevation
    pub fn highest_stub_end(&self) -> Option<Point> {
        self.stub_end_pts
            .values()
            .copied()
            .max_by(|a, b| a.y.total_cmp(&b.y))
    }

    /// The x-mirrored copy for the opposite leg
    pub fn mirrored(&self) -> Self {
        Self {
            joint: self.joint.clone(),
            batter_angle: self.batter_angle,
            translate_by: self.translate_by,
            mirror: !self.mirror,
            polygons: self.polygons.map(Polygon::mirrored),
            can_pt_top: mirror_point(&self.can_pt_top),
            can_pt_btm: mirror_point(&self.can_pt_btm),
            stub_start_pts: self.stub_start_pts.iter().map(|(k, p)| (*k, mirror_point(p))).collect(),
            stub_end_pts: self.stub_end_pts.iter().map(|(k, p)| (*k, mirror_point(p))).collect(),
        }
    }

    /// Stretch the can's top face along its side edges up to elevation `y`
    pub fn extend_can_top_to(self, y: f64) -> JacketResult<Self> {
        let can = match self.polygons.can.as_slice() {
            [single] => extend_middle_points_to_target_y(single, y)?,
            _ => {
                return Err(JacketError::InvalidGeometry(format!(
                    "{} can is not a single rectangle and cannot be extended",
                    self.name()
                )))
            }
        };
        let can_pt_top = can.midpoint(1, 2);
        let mut polygons = self.polygons;
        polygons.can = vec![can];
        Ok(Self {
            polygons,
            can_pt_top,
            ..self
        })
    }

    /// Carry one end of the can through a batter kink.
    ///
    /// `pt1` is the kink point and `pt2` the new can end beyond it. The far end
    /// of the can stays put and the can becomes a mitred two-segment run.
    pub fn extend_kjt_can_and_kink(self, pt1: Point, pt2: Point, kink_loc: KinkLocation) -> JacketResult<KinkedJoint> {
        let (path, can_pt_top, can_pt_btm) = match kink_loc {
            KinkLocation::BelowKjt => {
                if pt2.y >= pt1.y {
                    return Err(JacketError::InvalidGeometry(format!(
                        "{}: can extension below the kink must end below it ({} >= {})",
                        self.name(),
                        pt2.y,
                        pt1.y
                    )));
                }
                (vec![self.can_pt_top, pt1, pt2], self.can_pt_top, pt2)
            }
            KinkLocation::AboveKjt => {
                if pt2.y <= pt1.y {
                    return Err(JacketError::InvalidGeometry(format!(
                        "{}: can extension above the kink must end above it ({} <= {})",
                        self.name(),
                        pt2.y,
                        pt1.y
                    )));
                }
                (vec![self.can_pt_btm, pt1, pt2], pt2, self.can_pt_btm)
            }
        };
        let can = construct_true_constant_width_path(self.joint.dc, &path)?;
        let mut polygons = self.polygons;
        polygons.can = can;

        Ok(KinkedJoint {
            placed: PlacedJoint {
                polygons,
                can_pt_top,
                can_pt_btm,
                ..self
            },
            pt_kink: pt1,
            kink_loc,
        })
    }
}

/// A placed K-joint whose can runs through a batter kink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinkedJoint {
    placed: PlacedJoint,
    pub pt_kink: Point,
    pub kink_loc: KinkLocation,
}

impl KinkedJoint {
    pub fn placed(&self) -> &PlacedJoint {
        &self.placed
    }

    pub fn mirrored(&self) -> Self {
        Self {
            placed: self.placed.mirrored(),
            pt_kink: mirror_point(&self.pt_kink),
            kink_loc: self.kink_loc,
        }
    }
}

/// A joint as stored by the jacket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldJoint {
    Placed(PlacedJoint),
    Kinked(KinkedJoint),
}

impl WorldJoint {
    /// The placed geometry (with the kinked can, if any)
    pub fn placed(&self) -> &PlacedJoint {
        match self {
            WorldJoint::Placed(p) => p,
            WorldJoint::Kinked(k) => &k.placed,
        }
    }

    pub fn kinked_can(&self) -> bool {
        matches!(self, WorldJoint::Kinked(_))
    }

    pub fn pt_kink(&self) -> Option<Point> {
        match self {
            WorldJoint::Placed(_) => None,
            WorldJoint::Kinked(k) => Some(k.pt_kink),
        }
    }

    pub fn mirrored(&self) -> Self {
        match self {
            WorldJoint::Placed(p) => WorldJoint::Placed(p.mirrored()),
            WorldJoint::Kinked(k) => WorldJoint::Kinked(k.mirrored()),
        }
    }

    pub fn can_pt_top(&self) -> Point {
        self.placed().can_pt_top()
    }

    pub fn can_pt_btm(&self) -> Point {
        self.placed().can_pt_btm()
    }
}

impl From<PlacedJoint> for WorldJoint {
    fn from(p: PlacedJoint) -> Self {
        WorldJoint::Placed(p)
    }
}

impl From<KinkedJoint> for WorldJoint {
    fn from(k: KinkedJoint) -> Self {
        WorldJoint::Kinked(k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn k_joint() -> Joint2D {
        let mut jt = Joint2D::new(JointType::K, 2, 2000.0, 60.0, BraceStub::new(400.0, 20.0))
            .with_brace(BraceStub::new(500.0, 25.0))
            .unwrap();
        jt.brace_attachment_thetas(&[60.0, 120.0]).unwrap();
        jt.create_joint().unwrap();
        jt
    }

    #[test]
    fn test_can_length_two_braces() {
        let jt = k_joint();
        let s60 = 60f64.to_radians().sin();
        let s120 = 120f64.to_radians().sin();
        let expected = 2.0 * 500.0 + 400.0 / s60 + 500.0 / s120 + 100.0;
        assert_relative_eq!(jt.can_length().unwrap(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_can_length_gap_allowances() {
        let one = {
            let mut jt = Joint2D::new(JointType::K, 1, 800.0, 40.0, BraceStub::new(400.0, 20.0));
            jt.brace_attachment_thetas(&[90.0]).unwrap();
            jt.create_joint().unwrap();
            jt
        };
        // end allowance floors at 300
        assert_relative_eq!(one.can_length().unwrap(), 600.0 + 400.0, epsilon = 1e-9);

        let mut three = Joint2D::new(JointType::K, 2, 2000.0, 60.0, BraceStub::new(400.0, 20.0))
            .with_brace(BraceStub::new(400.0, 20.0))
            .unwrap()
            .with_brace(BraceStub::new(400.0, 20.0))
            .unwrap();
        three.brace_attachment_thetas(&[45.0, 90.0, 135.0]).unwrap();
        three.create_joint().unwrap();
        let s45 = 45f64.to_radians().sin();
        let expected = 1000.0 + 2.0 * 400.0 / s45 + 400.0 + 200.0;
        assert_relative_eq!(three.can_length().unwrap(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_can_length_grows_with_brace_diameter() {
        let build = |d: f64, theta: f64| {
            let mut jt = Joint2D::new(JointType::K, 1, 1500.0, 50.0, BraceStub::new(d, 20.0));
            jt.brace_attachment_thetas(&[theta]).unwrap();
            jt.create_joint().unwrap();
            jt.can_length().unwrap()
        };
        let ends = 2.0 * 375.0;
        let mut last = 0.0;
        for d in [300.0, 400.0, 600.0, 900.0] {
            let l = build(d, 50.0);
            assert!(l >= ends + chord_brace_attachment_length(d, 50.0) - 1e-9);
            assert!(l >= last);
            last = l;
        }
        // steeper brace towards 90 deg has the smallest footprint
        assert!(build(500.0, 90.0) <= build(500.0, 60.0));
    }

    #[test]
    fn test_stub_inboard_edge_on_chord_surface() {
        let jt = k_joint();
        let polys = jt.local_polygons().unwrap();
        for stub in polys.stubs.values() {
            assert_relative_eq!(stub.xs[0], 1000.0, epsilon = 1e-9);
            assert_relative_eq!(stub.xs[1], 1000.0, epsilon = 1e-9);
        }
        // centreline passes through the work point
        let [m1, m2] = jt.wire_end_coords()[0];
        assert_relative_eq!(m1.x * m2.y - m1.y * m2.x, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_stub_footprints_clear_can_ends() {
        let mut three = Joint2D::new(JointType::K, 3, 2400.0, 60.0, BraceStub::new(900.0, 25.0))
            .with_brace(BraceStub::new(700.0, 20.0))
            .unwrap()
            .with_brace(BraceStub::new(900.0, 25.0))
            .unwrap();
        three.brace_attachment_thetas(&[45.76, 86.0, 122.42]).unwrap();
        three.create_joint().unwrap();
        let mut x = Joint2D::new(JointType::X, 1, 1200.0, 40.0, BraceStub::new(600.0, 20.0))
            .with_brace(BraceStub::new(600.0, 20.0))
            .unwrap();
        x.brace_attachment_thetas(&[120.0, 300.0]).unwrap();
        x.create_joint().unwrap();

        for jt in [k_joint(), three, x] {
            let polys = jt.local_polygons().unwrap();
            let (btm, top) = (polys.can[0].ys[0], polys.can[0].ys[1]);
            let min_end = (jt.dc / 4.0).max(MIN_CAN_END);
            for stub in polys.stubs.values() {
                for y in [stub.ys[0], stub.ys[1]] {
                    assert!(top - y >= min_end - 1e-9, "{}: {} to top", jt.name(), top - y);
                    assert!(y - btm >= min_end - 1e-9, "{}: {} to bottom", jt.name(), y - btm);
                }
            }
        }
    }

    #[test]
    fn test_stub_length() {
        assert_relative_eq!(get_stub_length(400.0, 90.0), 600.0, epsilon = 1e-9);
        assert_relative_eq!(get_stub_length(800.0, 45.0), 400.0 + 800.0, epsilon = 1e-9);
    }

    #[test]
    fn test_x_joint_forces_zero_gap() {
        let mut jt = Joint2D::new(JointType::X, 1, 1200.0, 40.0, BraceStub::new(600.0, 20.0))
            .with_brace(BraceStub::new(600.0, 20.0))
            .unwrap();
        jt.brace_attachment_thetas(&[120.0, 300.0]).unwrap();
        assert!(jt.is_x_joint());
        assert_eq!(jt.joint_gap(), 0.0);
        jt.create_joint().unwrap();
        let att = chord_brace_attachment_length(600.0, 120.0);
        assert_relative_eq!(jt.can_length().unwrap(), 600.0 + 2.0 * att, epsilon = 1e-9);

        // opposite braces cross the can symmetrically, so the can is centred
        let can = &jt.local_polygons().unwrap().can[0];
        assert_relative_eq!(can.ys[0] + can.ys[1], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_x_joint_rejects_third_brace() {
        let mut jt = Joint2D::new(JointType::X, 1, 1200.0, 40.0, BraceStub::new(600.0, 20.0))
            .with_brace(BraceStub::new(600.0, 20.0))
            .unwrap()
            .with_brace(BraceStub::new(600.0, 20.0))
            .unwrap();
        assert!(jt.brace_attachment_thetas(&[120.0, 300.0, 90.0]).is_err());
        assert!(jt.create_joint().is_err());
    }

    #[test]
    fn test_fourth_brace_rejected() {
        let jt = Joint2D::new(JointType::K, 1, 1200.0, 40.0, BraceStub::new(600.0, 20.0))
            .with_brace(BraceStub::new(600.0, 20.0))
            .and_then(|j| j.with_brace(BraceStub::new(600.0, 20.0)))
            .and_then(|j| j.with_brace(BraceStub::new(600.0, 20.0)));
        assert!(jt.is_err());
    }

    #[test]
    fn test_create_requires_angles() {
        let mut jt = Joint2D::new(JointType::K, 1, 1200.0, 40.0, BraceStub::new(600.0, 20.0));
        assert!(matches!(jt.create_joint(), Err(JacketError::InvalidInput(_))));
    }

    #[test]
    fn test_transform_requires_created_joint() {
        let mut jt = Joint2D::new(JointType::K, 3, 1200.0, 40.0, BraceStub::new(600.0, 20.0));
        jt.brace_attachment_thetas(&[90.0]).unwrap();
        let err = jt.transform_joint(Some(90.0), None, false).unwrap_err();
        assert!(matches!(err, JacketError::JointNotCreated(name) if name == "kjt_3"));
    }

    #[test]
    fn test_vertical_transform_is_translation() {
        let jt = k_joint();
        let can_local = jt.local_polygons().unwrap().can[0].clone();
        let placed = jt
            .transform_joint(Some(90.0), Some(Vec2::new(-10000.0, 5000.0)), false)
            .unwrap();
        let top = placed.can_pt_top();
        assert_relative_eq!(top.x, -10000.0, epsilon = 1e-9);
        assert_relative_eq!(top.y, can_local.ys[1] + 5000.0, epsilon = 1e-9);
        assert_relative_eq!(placed.can_pt_btm().y, can_local.ys[0] + 5000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_battered_can_axis_follows_leg() {
        let jt = k_joint();
        let placed = jt.transform_joint(Some(80.0), Some(Vec2::new(-12000.0, 0.0)), false).unwrap();
        let axis = placed.can_pt_top() - placed.can_pt_btm();
        let angle = axis.y.atan2(axis.x).to_degrees();
        assert_relative_eq!(angle, 80.0, epsilon = 1e-9);
    }

    #[test]
    fn test_mirrored_copy_is_symmetric() {
        let placed = k_joint()
            .transform_joint(Some(84.0), Some(Vec2::new(-15000.0, 2000.0)), false)
            .unwrap();
        let right = placed.mirrored();
        assert!(right.mirror);
        assert_eq!(right.can_pt_top().x, -placed.can_pt_top().x);
        assert_eq!(right.can_pt_btm().x, -placed.can_pt_btm().x);
        assert_eq!(right.can_pt_top().y, placed.can_pt_top().y);
        for (k, p) in placed.stub_end_pts() {
            assert_eq!(right.stub_end_pts()[k].x, -p.x);
        }
    }

    #[test]
    fn test_stub_end_ordering() {
        let placed = k_joint().transform_joint(Some(90.0), None, false).unwrap();
        let hi = placed.highest_stub_end().unwrap();
        let lo = placed.lowest_stub_end().unwrap();
        assert_eq!(hi, placed.stub_end_pts()[&BraceId::Brc1]);
        assert_eq!(lo, placed.stub_end_pts()[&BraceId::Brc2]);
    }

    #[test]
    fn test_kink_above_replaces_can() {
        let placed = k_joint().transform_joint(Some(90.0), None, false).unwrap();
        let btm = placed.can_pt_btm();
        let top = placed.can_pt_top();
        let kink = Point::new(0.0, top.y + 500.0);
        let pt2 = Point::new(200.0, top.y + 3500.0);
        let kinked = placed.extend_kjt_can_and_kink(kink, pt2, KinkLocation::AboveKjt).unwrap();
        let world = WorldJoint::from(kinked);
        assert!(world.kinked_can());
        assert_eq!(world.pt_kink(), Some(kink));
        assert_eq!(world.can_pt_top(), pt2);
        assert_eq!(world.can_pt_btm(), btm);
        assert_eq!(world.placed().joint_poly_coords_transf().can.len(), 2);
    }

    #[test]
    fn test_kink_direction_checked() {
        let placed = k_joint().transform_joint(Some(90.0), None, false).unwrap();
        let btm = placed.can_pt_btm();
        let kink = Point::new(0.0, btm.y - 500.0);
        let wrong = Point::new(0.0, btm.y);
        assert!(placed
            .clone()
            .extend_kjt_can_and_kink(kink, wrong, KinkLocation::BelowKjt)
            .is_err());
        let ok = placed
            .extend_kjt_can_and_kink(kink, Point::new(-100.0, btm.y - 3500.0), KinkLocation::BelowKjt)
            .unwrap();
        assert_eq!(ok.placed().can_pt_btm().y, btm.y - 3500.0);
    }

    #[test]
    fn test_extend_can_top() {
        let placed = k_joint()
            .transform_joint(Some(85.0), Some(Vec2::new(-9000.0, 30000.0)), false)
            .unwrap();
        let extended = placed.extend_can_top_to(33150.0).unwrap();
        assert_relative_eq!(extended.can_pt_top().y, 33150.0, epsilon = 1e-9);
    }
}
