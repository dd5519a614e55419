//! Leg and brace runs: prismatic or with a conical transition

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{JacketError, JacketResult};
use crate::geom::{
    construct_true_constant_width_path, create_2d_cone, create_points_on_line, find_longest_segment,
    mirror_point, Point, Polygon, Segment,
};

use super::SectionAlignment;

/// Control points allowed on one run (two ends plus up to two kinks)
pub const MAX_LEG_POINTS: usize = 4;

/// Default cone taper, 1 in 4 per side
pub const DEFAULT_CONE_TAPER: f64 = 4.0;

/// Default width comparison tolerance (mm)
pub const DEFAULT_SECTION_TOLERANCE: f64 = 1e-3;

/// Which side of the bay a diagonal brace sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BaySide {
    L,
    R,
}

impl fmt::Display for BaySide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaySide::L => f.write_str("L"),
            BaySide::R => f.write_str("R"),
        }
    }
}

/// Identity of a member run in the jacket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MemberId {
    /// Leg run below K-joint n
    Leg(usize),
    /// Upper diagonal of bay n, K-joint down to the X-joint
    BraceA(usize, BaySide),
    /// Lower diagonal of bay n, X-joint down to the K-joint
    BraceB(usize, BaySide),
    /// Horizontal at the bottom of bay n
    BraceHz(usize),
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberId::Leg(n) => write!(f, "leg_{n}"),
            MemberId::BraceA(n, side) => write!(f, "bay_{n}_a{side}"),
            MemberId::BraceB(n, side) => write!(f, "bay_{n}_b{side}"),
            MemberId::BraceHz(n) => write!(f, "bay_{n}_hz"),
        }
    }
}

/// A tubular run between two or more control points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub id: MemberId,
    /// Outer diameter at the first control point (mm)
    pub width1: f64,
    /// Outer diameter at the last control point (mm)
    pub width2: f64,
    /// Wall thickness (mm)
    pub thk: f64,
    pub section_alignment: SectionAlignment,
    /// Tolerance on the aligned widths when deciding if a cone is needed (mm)
    pub section_tolerance: f64,
    pts: Vec<Point>,
    is_cone: bool,
    cone_length: Option<f64>,
    longest_seg: Option<Segment>,
    cone_pt1: Option<Point>,
    cone_pt2: Option<Point>,
    leg_a: Vec<Point>,
    leg_b: Vec<Point>,
    leg_a_poly_coords: Vec<Polygon>,
    leg_b_poly_coords: Vec<Polygon>,
    cone_poly_coords: Option<Polygon>,
    mirror: bool,
}

impl Leg {
    pub fn new(id: MemberId, width1: f64, width2: f64, thk: f64) -> Self {
        Self {
            id,
            width1,
            width2,
            thk,
            section_alignment: SectionAlignment::default(),
            section_tolerance: DEFAULT_SECTION_TOLERANCE,
            pts: Vec::new(),
            is_cone: false,
            cone_length: None,
            longest_seg: None,
            cone_pt1: None,
            cone_pt2: None,
            leg_a: Vec::new(),
            leg_b: Vec::new(),
            leg_a_poly_coords: Vec::new(),
            leg_b_poly_coords: Vec::new(),
            cone_poly_coords: None,
            mirror: false,
        }
    }

    /// Set the section alignment and width tolerance
    pub fn with_alignment(mut self, alignment: SectionAlignment, tolerance: f64) -> Self {
        self.section_alignment = alignment;
        self.section_tolerance = tolerance;
        self
    }

    pub fn name(&self) -> String {
        self.id.to_string()
    }

    /// Set the end points; `pt1` carries `width1`, `pt2` carries `width2`
    pub fn define_leg_pts(&mut self, pt1: Point, pt2: Point) {
        self.pts = vec![pt1, pt2];
    }

    /// Insert a kink point ahead of the end point
    pub fn define_intermediate_leg_point(&mut self, pt_mid: Point) -> JacketResult<()> {
        if self.pts.len() < 2 {
            return Err(JacketError::InvalidGeometry(format!(
                "{}: define the end points before intermediate points",
                self.id
            )));
        }
        if self.pts.len() >= MAX_LEG_POINTS {
            return Err(JacketError::InvalidGeometry(format!(
                "{}: only {MAX_LEG_POINTS} points are allowed along a run",
                self.id
            )));
        }
        let end = self.pts.len() - 1;
        self.pts.insert(end, pt_mid);
        Ok(())
    }

    /// Build the outlines.
    ///
    /// If the aligned end widths differ a cone of length
    /// `taper * |width2 - width1| / 2` is placed in the longest segment,
    /// `split_len1` from its wide end (`None` centres it).
    pub fn construct_leg(&mut self, split_len1: Option<f64>, cone_taper: f64) -> JacketResult<()> {
        if self.pts.len() < 2 {
            return Err(JacketError::InvalidGeometry(format!("{}: end points not defined", self.id)));
        }
        self.reset_outlines();
        self.is_cone = self.check_is_cone();

        if self.is_cone {
            let cone_length = calc_cone_length(self.width1, self.width2, cone_taper);
            self.cone_length = Some(cone_length);
            self.create_cone_segment(split_len1, cone_length)?;
            self.create_split_conical_leg_paths()?;
            self.leg_a_poly_coords = construct_true_constant_width_path(self.width1, &self.leg_a)?;
            self.leg_b_poly_coords = construct_true_constant_width_path(self.width2, &self.leg_b)?;
            log::debug!(
                "{}: cone {:.0} -> {:.0} over {:.1} mm",
                self.id,
                self.width1,
                self.width2,
                cone_length
            );
        } else {
            self.leg_a = self.pts.clone();
            self.leg_a_poly_coords = construct_true_constant_width_path(self.width1, &self.pts)?;
        }
        Ok(())
    }

    fn reset_outlines(&mut self) {
        self.cone_length = None;
        self.longest_seg = None;
        self.cone_pt1 = None;
        self.cone_pt2 = None;
        self.leg_a.clear();
        self.leg_b.clear();
        self.leg_a_poly_coords.clear();
        self.leg_b_poly_coords.clear();
        self.cone_poly_coords = None;
    }

    fn check_is_cone(&self) -> bool {
        let w1 = self.section_alignment.aligned_width(self.width1, self.thk);
        let w2 = self.section_alignment.aligned_width(self.width2, self.thk);
        (w1 - w2).abs() > self.section_tolerance
    }

    fn create_cone_segment(&mut self, split_len1: Option<f64>, cone_length: f64) -> JacketResult<()> {
        let seg = find_longest_segment(&self.pts)
            .ok_or_else(|| JacketError::InvalidGeometry(format!("{}: no segment for the cone", self.id)))?;

        let split_len1 = split_len1.unwrap_or(0.5 * (seg.length - cone_length));
        let split_len2 = split_len1 + cone_length;
        if split_len1 < 0.0 || split_len2 >= seg.length {
            return Err(JacketError::ConeTooLong {
                member: self.id.to_string(),
                required: split_len2,
                available: seg.length,
            });
        }

        // the wide end of the cone faces the wide control point
        let (cone_pt1, cone_pt2, poly) = if self.width1 > self.width2 {
            let (p1, p2) = create_points_on_line(&seg.start, &seg.end, split_len1, split_len2)?;
            (p1, p2, create_2d_cone(&p1, &p2, self.width1, self.width2))
        } else {
            let (p1, p2) = create_points_on_line(&seg.end, &seg.start, split_len1, split_len2)?;
            (p1, p2, create_2d_cone(&p1, &p2, self.width2, self.width1))
        };

        self.longest_seg = Some(seg);
        self.cone_pt1 = Some(cone_pt1);
        self.cone_pt2 = Some(cone_pt2);
        self.cone_poly_coords = Some(poly);
        Ok(())
    }

    fn create_split_conical_leg_paths(&mut self) -> JacketResult<()> {
        let (Some(seg), Some(cone_pt1), Some(cone_pt2)) = (self.longest_seg, self.cone_pt1, self.cone_pt2) else {
            return Err(JacketError::InvalidGeometry(format!("{}: cone not placed", self.id)));
        };
        let idx = seg.index;

        let (near, far) = if self.width1 > self.width2 {
            (cone_pt1, cone_pt2)
        } else {
            (cone_pt2, cone_pt1)
        };

        self.leg_a = self.pts[..=idx].to_vec();
        self.leg_a.push(near);
        self.leg_b = std::iter::once(far).chain(self.pts[idx + 1..].iter().copied()).collect();
        Ok(())
    }

    /// The x-mirrored copy for the opposite side of the jacket
    pub fn mirrored(&self) -> JacketResult<Leg> {
        if self.mirror {
            return Err(JacketError::AlreadyMirrored(self.id.to_string()));
        }
        let flip_pts = |pts: &[Point]| pts.iter().map(mirror_point).collect::<Vec<_>>();
        let flip_polys = |polys: &[Polygon]| polys.iter().map(Polygon::mirrored).collect::<Vec<_>>();
        Ok(Leg {
            pts: flip_pts(&self.pts),
            longest_seg: self.longest_seg.map(|s| Segment {
                start: mirror_point(&s.start),
                end: mirror_point(&s.end),
                ..s
            }),
            cone_pt1: self.cone_pt1.as_ref().map(mirror_point),
            cone_pt2: self.cone_pt2.as_ref().map(mirror_point),
            leg_a: flip_pts(&self.leg_a),
            leg_b: flip_pts(&self.leg_b),
            leg_a_poly_coords: flip_polys(&self.leg_a_poly_coords),
            leg_b_poly_coords: flip_polys(&self.leg_b_poly_coords),
            cone_poly_coords: self.cone_poly_coords.as_ref().map(Polygon::mirrored),
            mirror: true,
            ..self.clone()
        })
    }

    pub fn pts(&self) -> &[Point] {
        &self.pts
    }

    pub fn is_cone(&self) -> bool {
        self.is_cone
    }

    pub fn cone_length(&self) -> Option<f64> {
        self.cone_length
    }

    pub fn cone_pts(&self) -> Option<(Point, Point)> {
        self.cone_pt1.zip(self.cone_pt2)
    }

    /// Control points at `width1` (all points for a prismatic run)
    pub fn leg_a(&self) -> &[Point] {
        &self.leg_a
    }

    /// Control points at `width2` (empty for a prismatic run)
    pub fn leg_b(&self) -> &[Point] {
        &self.leg_b
    }

    pub fn leg_a_poly_coords(&self) -> &[Polygon] {
        &self.leg_a_poly_coords
    }

    pub fn leg_b_poly_coords(&self) -> &[Polygon] {
        &self.leg_b_poly_coords
    }

    pub fn cone_poly_coords(&self) -> Option<&Polygon> {
        self.cone_poly_coords.as_ref()
    }

    pub fn is_mirror(&self) -> bool {
        self.mirror
    }
}

/// Cone length for a 1-in-`taper` slope on each side
pub fn calc_cone_length(width1: f64, width2: f64, taper: f64) -> f64 {
    taper * (width2 - width1).abs() / 2.0
}

fn polyline_length(pts: &[Point]) -> f64 {
    pts.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}

impl Leg {
    /// Total centreline length of the run, cone included
    pub fn centreline_length(&self) -> f64 {
        polyline_length(&self.leg_a) + self.cone_length.unwrap_or(0.0) + polyline_length(&self.leg_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cone_leg() -> Leg {
        let mut leg = Leg::new(MemberId::Leg(1), 2000.0, 1000.0, 50.0);
        leg.define_leg_pts(Point::new(0.0, 0.0), Point::new(0.0, -8000.0));
        leg
    }

    #[test]
    fn test_member_names() {
        assert_eq!(MemberId::Leg(3).to_string(), "leg_3");
        assert_eq!(MemberId::BraceA(1, BaySide::L).to_string(), "bay_1_aL");
        assert_eq!(MemberId::BraceB(2, BaySide::R).to_string(), "bay_2_bR");
        assert_eq!(MemberId::BraceHz(4).to_string(), "bay_4_hz");
    }

    #[test]
    fn test_cone_length_formula() {
        for (w1, w2, taper) in [(2000.0, 1000.0, 4.0), (900.0, 1500.0, 3.0), (1200.0, 1200.0, 6.0)] {
            assert_eq!(calc_cone_length(w1, w2, taper), taper * f64::abs(w2 - w1) / 2.0);
        }
    }

    #[test]
    fn test_centred_cone_preserves_span() {
        let mut leg = cone_leg();
        leg.construct_leg(None, DEFAULT_CONE_TAPER).unwrap();
        assert!(leg.is_cone());
        assert_eq!(leg.cone_length(), Some(2000.0));

        let (p1, p2) = leg.cone_pts().unwrap();
        assert_relative_eq!(p1.y, -3000.0, epsilon = 1e-9);
        assert_relative_eq!(p2.y, -5000.0, epsilon = 1e-9);
        assert_eq!(leg.leg_a().len(), 2);
        assert_eq!(leg.leg_b().len(), 2);
        assert_relative_eq!(leg.centreline_length(), 8000.0, epsilon = 1e-9);

        let cone = leg.cone_poly_coords().unwrap();
        assert_relative_eq!(cone.xs[0] - cone.xs[1], 2000.0, epsilon = 1e-9);
        assert_relative_eq!(cone.xs[3] - cone.xs[2], 1000.0, epsilon = 1e-9);
        assert_eq!(leg.leg_a_poly_coords().len(), 1);
        assert_eq!(leg.leg_b_poly_coords().len(), 1);
    }

    #[test]
    fn test_cone_from_narrow_end() {
        let mut leg = Leg::new(MemberId::Leg(2), 1000.0, 2000.0, 50.0);
        leg.define_leg_pts(Point::new(0.0, 0.0), Point::new(0.0, -8000.0));
        leg.construct_leg(Some(1000.0), 4.0).unwrap();
        // offset is measured from the wide (second) end
        let (p1, p2) = leg.cone_pts().unwrap();
        assert_relative_eq!(p1.y, -7000.0, epsilon = 1e-9);
        assert_relative_eq!(p2.y, -5000.0, epsilon = 1e-9);
        assert_eq!(*leg.leg_a().last().unwrap(), p2);
        assert_eq!(leg.leg_b()[0], p1);
    }

    #[test]
    fn test_cone_too_long() {
        let mut leg = Leg::new(MemberId::Leg(1), 3000.0, 1000.0, 50.0);
        leg.define_leg_pts(Point::new(0.0, 0.0), Point::new(0.0, -3500.0));
        let err = leg.construct_leg(None, 4.0).unwrap_err();
        assert!(matches!(err, JacketError::ConeTooLong { .. }));

        let mut leg = cone_leg();
        assert!(leg.construct_leg(Some(6000.0), 4.0).is_err());
    }

    #[test]
    fn test_cone_goes_into_longest_segment() {
        let mut leg = cone_leg();
        leg.define_intermediate_leg_point(Point::new(0.0, -1000.0)).unwrap();
        leg.construct_leg(None, 4.0).unwrap();
        let (p1, _) = leg.cone_pts().unwrap();
        assert_relative_eq!(p1.y, -1000.0 - 2500.0, epsilon = 1e-9);
        assert_eq!(leg.leg_a().len(), 3);
        assert_relative_eq!(leg.centreline_length(), 8000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_thickness_only_change_is_prismatic() {
        let mut leg = Leg::new(MemberId::Leg(1), 1500.0, 1500.0, 60.0)
            .with_alignment(SectionAlignment::IdConstant, 1e-3);
        leg.define_leg_pts(Point::new(-9000.0, 10000.0), Point::new(-9500.0, -2000.0));
        leg.define_intermediate_leg_point(Point::new(-9200.0, 4000.0)).unwrap();
        leg.construct_leg(None, 4.0).unwrap();
        assert!(!leg.is_cone());
        assert_eq!(leg.leg_a().len(), 3);
        assert!(leg.leg_b().is_empty());
        assert_eq!(leg.leg_a_poly_coords().len(), 2);
    }

    #[test]
    fn test_point_limit() {
        let mut leg = cone_leg();
        leg.define_intermediate_leg_point(Point::new(0.0, -1000.0)).unwrap();
        leg.define_intermediate_leg_point(Point::new(0.0, -2000.0)).unwrap();
        assert!(leg.define_intermediate_leg_point(Point::new(0.0, -3000.0)).is_err());
        assert_eq!(leg.pts().last().unwrap().y, -8000.0);
    }

    #[test]
    fn test_mirror_once() {
        let mut leg = cone_leg();
        leg.define_leg_pts(Point::new(-100.0, 0.0), Point::new(-500.0, -8000.0));
        leg.construct_leg(None, 4.0).unwrap();
        let right = leg.mirrored().unwrap();
        assert!(right.is_mirror());
        assert_eq!(right.cone_poly_coords().unwrap().xs[0], -leg.cone_poly_coords().unwrap().xs[0]);
        assert_eq!(right.leg_a()[0].x, 100.0);
        assert!(matches!(right.mirrored(), Err(JacketError::AlreadyMirrored(_))));
    }
}
