//! One-dimensional jacket layout: batters, joint elevations, widths and angles
//!
//! The layout is derived once from [`JacketParams`] by a chain of pure stages,
//! each returning an immutable record:
//!
//! ```text
//! JacketParams -> BatterGeometry -> K-joint elevations -> Vec<KJointLayout>
//!              -> Vec<XJointLayout> -> brace angles -> JacketLayout
//! ```
//!
//! Only the left leg (negative x) is described; the right leg is its mirror.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::elements::KinkLocation;
use crate::error::{JacketError, JacketResult};
use crate::geom::{calculate_angle_3pts, line_intersection, Point, Vec2};

/// Tolerance on the solved X-joint x coordinate (mm)
pub const CENTRELINE_TOL: f64 = 1e-9;

/// Length of the reference ray used when measuring brace angles (mm)
const REFERENCE_RAY: f64 = 1000.0;

/// Parametric description of a jacket elevation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JacketParams {
    /// Tower interface elevation (mm)
    pub interface_elev: f64,
    /// Leg spacing at the transition piece bottom (mm)
    pub tp_width: f64,
    /// Transition piece bottom elevation (mm)
    pub tp_btm: f64,
    /// Drop from the transition piece bottom to the top K-joint (mm)
    pub tp_btm_k1_voffset: f64,
    /// Upper batter angle from horizontal (degrees), two-batter jackets only
    #[serde(default)]
    pub batter_1_theta: Option<f64>,
    /// Elevation of the upper/lower batter change (mm), two-batter jackets only
    #[serde(default)]
    pub batter_1_elev: Option<f64>,
    /// Leg spacing at the pile top (mm)
    pub jacket_footprint: f64,
    /// Pile stick-up above the seabed (mm)
    pub stickup: f64,
    /// Bay heights from the top down (mm)
    pub bay_heights: Vec<f64>,
    /// Horizontal brace flags, see [`normalize_bay_horizontals`]
    #[serde(default)]
    pub bay_horizontals: Vec<bool>,
    /// Length of the vertical leg run above the pile top (mm)
    pub btm_vert_leg_length: f64,
    pub water_depth: f64,
    /// Use one batter angle from the transition piece to the vertical leg run
    #[serde(default)]
    pub single_batter: bool,
}

impl JacketParams {
    pub fn n_bays(&self) -> usize {
        self.bay_heights.len()
    }

    pub fn pile_top_elev(&self) -> f64 {
        -self.water_depth + self.stickup
    }
}

/// A batter change elevation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BatterId {
    #[serde(rename = "batter_1")]
    Batter1,
    #[serde(rename = "batter_2")]
    Batter2,
}

impl fmt::Display for BatterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatterId::Batter1 => f.write_str("batter_1"),
            BatterId::Batter2 => f.write_str("batter_2"),
        }
    }
}

/// Which straight run of the leg an elevation falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegSegment {
    /// Transition piece down to batter 1
    Batter1,
    /// Batter 1 down to batter 2
    Batter2,
    /// Vertical run from batter 2 to the pile top
    Vertical,
}

/// Batter angles, elevations and widths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatterGeometry {
    pub single_batter: bool,
    pub tp_width: f64,
    pub tp_btm: f64,
    pub pile_top_elev: f64,
    pub batter_1_theta: f64,
    pub batter_1_elev: f64,
    pub batter_1_width: f64,
    pub batter_2_theta: f64,
    pub batter_2_elev: f64,
    pub batter_2_width: f64,
    /// Lowest sensible batter 1 elevation
    pub batter_1_elevation_min: f64,
    /// Highest sensible batter 1 elevation
    pub batter_1_elevation_max: f64,
}

impl BatterGeometry {
    /// Derive the batter geometry, validating the inputs it depends on
    pub fn derive(params: &JacketParams) -> JacketResult<Self> {
        if params.tp_btm >= params.interface_elev {
            return Err(JacketError::InvalidInput(format!(
                "TP bottom {} must be below the tower interface elevation {}",
                params.tp_btm, params.interface_elev
            )));
        }
        if let Some(theta) = params.batter_1_theta {
            if theta > 90.0 || theta <= 0.0 {
                return Err(JacketError::InvalidInput(format!(
                    "batter angle at the top of the jacket must be in (0, 90] degrees, got {theta}"
                )));
            }
        }

        let pile_top_elev = params.pile_top_elev();
        let batter_2_elev = pile_top_elev + params.btm_vert_leg_length;
        let batter_2_width = params.jacket_footprint;
        if batter_2_elev <= pile_top_elev {
            return Err(JacketError::InvalidInput(format!(
                "vertical leg length above the pile must be positive, got {}",
                params.btm_vert_leg_length
            )));
        }
        if params.tp_btm <= batter_2_elev {
            return Err(JacketError::InvalidInput(format!(
                "TP bottom {} must be above the lower batter elevation {batter_2_elev}",
                params.tp_btm
            )));
        }

        let (batter_1_theta, batter_1_elev, batter_1_width, batter_2_theta) = if params.single_batter {
            let o = params.tp_btm - batter_2_elev;
            let a = (params.jacket_footprint - params.tp_width) / 2.0;
            if a <= 0.0 {
                return Err(JacketError::InvalidInput(format!(
                    "jacket footprint {} must exceed the TP width {} for a single batter",
                    params.jacket_footprint, params.tp_width
                )));
            }
            let theta = (o / a).atan().to_degrees();
            // any point on the single batter line will do
            let elev = params.tp_btm - 0.5 * o;
            let width = params.tp_width + 2.0 * (params.tp_btm - elev) / theta.to_radians().tan();
            (theta, elev, width, theta)
        } else {
            let (Some(theta1), Some(elev1)) = (params.batter_1_theta, params.batter_1_elev) else {
                return Err(JacketError::InvalidInput(
                    "a two-batter jacket needs batter_1_theta and batter_1_elev".to_string(),
                ));
            };
            if elev1 > params.tp_btm {
                return Err(JacketError::InvalidInput(format!(
                    "batter 1 elevation {elev1} is above the TP bottom {}",
                    params.tp_btm
                )));
            }
            if elev1 <= batter_2_elev {
                return Err(JacketError::InvalidInput(format!(
                    "batter elevations must descend: batter 1 at {elev1} is not above batter 2 at {batter_2_elev}"
                )));
            }
            let width1 = params.tp_width + 2.0 * (params.tp_btm - elev1) / theta1.to_radians().tan();
            let run = (params.jacket_footprint - width1) / 2.0;
            let theta2 = (elev1 - batter_2_elev).atan2(run).to_degrees();
            if theta2 > 90.0 {
                return Err(JacketError::InvalidInput(format!(
                    "lower batter would overhang ({theta2:.2} deg): footprint {} is narrower than {width1:.1} at batter 1",
                    params.jacket_footprint
                )));
            }
            (theta1, elev1, width1, theta2)
        };

        let geom = Self {
            single_batter: params.single_batter,
            tp_width: params.tp_width,
            tp_btm: params.tp_btm,
            pile_top_elev,
            batter_1_theta,
            batter_1_elev,
            batter_1_width,
            batter_2_theta,
            batter_2_elev,
            batter_2_width,
            batter_1_elevation_min: batter_2_elev,
            batter_1_elevation_max: params.tp_btm - params.tp_btm_k1_voffset,
        };

        if !geom.single_batter
            && (batter_1_elev < geom.batter_1_elevation_min || batter_1_elev > geom.batter_1_elevation_max)
        {
            log::warn!(
                "batter 1 elevation {batter_1_elev} is outside the range {} to {}",
                geom.batter_1_elevation_min,
                geom.batter_1_elevation_max
            );
        }
        log::debug!(
            "batters: theta1 {:.3} deg at {:.0}, theta2 {:.3} deg at {:.0}",
            batter_1_theta,
            batter_1_elev,
            batter_2_theta,
            batter_2_elev
        );
        Ok(geom)
    }

    /// The leg run governing elevation `elev`
    pub fn segment_at(&self, elev: f64) -> LegSegment {
        if elev >= self.batter_1_elev {
            LegSegment::Batter1
        } else if elev >= self.batter_2_elev {
            LegSegment::Batter2
        } else {
            LegSegment::Vertical
        }
    }

    /// Leg angle from horizontal of a run
    pub fn segment_angle(&self, seg: LegSegment) -> f64 {
        match seg {
            LegSegment::Batter1 => self.batter_1_theta,
            LegSegment::Batter2 => self.batter_2_theta,
            LegSegment::Vertical => 90.0,
        }
    }

    /// Leg spacing (outer envelope) at `elev`
    pub fn width_at(&self, elev: f64) -> f64 {
        match self.segment_at(elev) {
            LegSegment::Batter1 => {
                self.tp_width + 2.0 * (self.tp_btm - elev) / self.batter_1_theta.to_radians().tan()
            }
            LegSegment::Batter2 => {
                self.batter_1_width + 2.0 * (self.batter_1_elev - elev) / self.batter_2_theta.to_radians().tan()
            }
            LegSegment::Vertical => self.batter_2_width,
        }
    }

    /// Batter elevation by id
    pub fn elevation(&self, batter: BatterId) -> f64 {
        match batter {
            BatterId::Batter1 => self.batter_1_elev,
            BatterId::Batter2 => self.batter_2_elev,
        }
    }

    /// Batters that are real kinks in the leg, top first
    pub fn active_batters(&self) -> Vec<BatterId> {
        if self.single_batter {
            vec![BatterId::Batter2]
        } else {
            vec![BatterId::Batter1, BatterId::Batter2]
        }
    }

    /// Left-leg kink point of a batter
    pub fn kink_point(&self, batter: BatterId) -> Point {
        match batter {
            BatterId::Batter1 => Point::new(-self.batter_1_width / 2.0, self.batter_1_elev),
            BatterId::Batter2 => Point::new(-self.batter_2_width / 2.0, self.batter_2_elev),
        }
    }

    /// Left-leg point at the transition piece bottom
    pub fn tp_point(&self) -> Point {
        Point::new(-self.tp_width / 2.0, self.tp_btm)
    }

    /// Left-leg point at the pile top
    pub fn pile_top_point(&self) -> Point {
        Point::new(-self.batter_2_width / 2.0, self.pile_top_elev)
    }

    /// Unit direction of the left leg leaving a batter kink on the far side of a joint can
    pub fn repair_direction(&self, batter: BatterId, kink_loc: KinkLocation) -> Vec2 {
        let kink = self.kink_point(batter);
        let target = match (batter, kink_loc) {
            (BatterId::Batter1, KinkLocation::AboveKjt) => self.tp_point(),
            (BatterId::Batter1, KinkLocation::BelowKjt) => self.kink_point(BatterId::Batter2),
            (BatterId::Batter2, KinkLocation::AboveKjt) => self.kink_point(BatterId::Batter1),
            (BatterId::Batter2, KinkLocation::BelowKjt) => return Vec2::new(0.0, -1.0),
        };
        (target - kink).normalize()
    }

    /// Left-leg kink points strictly between two elevations, top first
    pub fn kinks_between(&self, upper: f64, lower: f64) -> Vec<Point> {
        self.active_batters()
            .into_iter()
            .map(|b| self.kink_point(b))
            .filter(|p| p.y < upper && p.y > lower)
            .collect()
    }
}

/// Normalize horizontal flags to one entry per K-joint.
///
/// `n_bays` entries are read as one flag per bay (horizontal at the bay's
/// bottom joint) and get a leading `false`. `n_bays + 1` entries are taken as
/// per-joint flags with the top one forced to `false`. Shorter input is padded.
pub fn normalize_bay_horizontals(flags: &[bool], n_bays: usize) -> JacketResult<Vec<bool>> {
    let mut out = match flags.len() {
        n if n == n_bays => std::iter::once(false).chain(flags.iter().copied()).collect::<Vec<_>>(),
        n if n == n_bays + 1 => flags.to_vec(),
        n if n < n_bays => {
            let mut v = vec![false];
            v.extend_from_slice(flags);
            v.resize(n_bays + 1, false);
            v
        }
        n => {
            return Err(JacketError::InvalidInput(format!(
                "{n} horizontal flags given for {n_bays} bays"
            )))
        }
    };
    if let Some(first) = out.first_mut() {
        *first = false;
    }
    Ok(out)
}

/// K-joint layout on the left leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KJointLayout {
    pub index: usize,
    pub elev: f64,
    /// Leg spacing at the joint elevation (not the can diameter)
    pub width: f64,
    /// Work point on the left leg
    pub wp: Point,
    pub segment: LegSegment,
    /// Leg angle from horizontal used to rotate the joint
    pub batter_angle: f64,
    pub has_horizontal: bool,
    /// Brace angles from the leg axis, ascending, missing braces last
    pub brace_angles: [Option<f64>; 3],
    pub n_braces: usize,
}

impl KJointLayout {
    pub fn name(&self) -> String {
        format!("kjt_{}", self.index)
    }

    /// Brace angles of the braces present, in brace order
    pub fn thetas(&self) -> Vec<f64> {
        self.brace_angles.iter().flatten().copied().collect()
    }
}

/// X-joint layout on the jacket centreline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XJointLayout {
    pub index: usize,
    pub elev: f64,
    /// Diagonal inclination from vertical (degrees)
    pub angle: f64,
    pub wp: Point,
}

impl XJointLayout {
    pub fn name(&self) -> String {
        format!("xjt_{}", self.index)
    }
}

/// Complete 1D layout of a jacket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JacketLayout {
    pub params: JacketParams,
    pub batter: BatterGeometry,
    /// One flag per K-joint, first always `false`
    pub bay_horizontals: Vec<bool>,
    pub kjoints: Vec<KJointLayout>,
    pub xjoints: Vec<XJointLayout>,
}

impl JacketLayout {
    /// Run every layout stage
    pub fn derive(params: &JacketParams) -> JacketResult<Self> {
        let batter = BatterGeometry::derive(params)?;
        let elevs = kjt_elevations(params, &batter)?;
        let bay_horizontals = normalize_bay_horizontals(&params.bay_horizontals, params.n_bays())?;
        let wps = kjt_world_points(&batter, &elevs);
        let xjoints = xjt_layouts(&wps)?;
        let kjoints = kjt_layouts(&batter, &wps, &xjoints, &bay_horizontals);

        log::debug!("layout: {} K-joints, {} X-joints", kjoints.len(), xjoints.len());
        Ok(Self {
            params: params.clone(),
            batter,
            bay_horizontals,
            kjoints,
            xjoints,
        })
    }

    pub fn n_bays(&self) -> usize {
        self.xjoints.len()
    }

    /// K-joint by 1-based index
    pub fn kjoint(&self, index: usize) -> Option<&KJointLayout> {
        index.checked_sub(1).and_then(|i| self.kjoints.get(i))
    }

    /// X-joint by 1-based index
    pub fn xjoint(&self, index: usize) -> Option<&XJointLayout> {
        index.checked_sub(1).and_then(|i| self.xjoints.get(i))
    }

    pub fn kjt_elevs(&self) -> BTreeMap<String, f64> {
        self.kjoints.iter().map(|k| (k.name(), k.elev)).collect()
    }

    pub fn kjt_widths(&self) -> BTreeMap<String, f64> {
        self.kjoints.iter().map(|k| (k.name(), k.width)).collect()
    }

    pub fn kjt_wps(&self) -> BTreeMap<String, Point> {
        self.kjoints.iter().map(|k| (k.name(), k.wp)).collect()
    }

    pub fn kjt_batter_angles(&self) -> BTreeMap<String, f64> {
        self.kjoints.iter().map(|k| (k.name(), k.batter_angle)).collect()
    }

    pub fn kjt_brace_angles(&self) -> BTreeMap<String, [Option<f64>; 3]> {
        self.kjoints.iter().map(|k| (k.name(), k.brace_angles)).collect()
    }

    pub fn kjt_n_braces(&self) -> BTreeMap<String, usize> {
        self.kjoints.iter().map(|k| (k.name(), k.n_braces)).collect()
    }

    pub fn xjt_elevs(&self) -> BTreeMap<String, f64> {
        self.xjoints.iter().map(|x| (x.name(), x.elev)).collect()
    }

    pub fn xjt_angles(&self) -> BTreeMap<String, f64> {
        self.xjoints.iter().map(|x| (x.name(), x.angle)).collect()
    }

    pub fn xjt_wps(&self) -> BTreeMap<String, Point> {
        self.xjoints.iter().map(|x| (x.name(), x.wp)).collect()
    }
}

/// K-joint elevations, top down, after checking the bays fit above the pile
fn kjt_elevations(params: &JacketParams, batter: &BatterGeometry) -> JacketResult<Vec<f64>> {
    if params.bay_heights.is_empty() {
        return Err(JacketError::InvalidInput("at least one bay is required".to_string()));
    }
    if let Some(h) = params.bay_heights.iter().find(|h| **h <= 0.0) {
        return Err(JacketError::InvalidInput(format!("bay heights must be positive, got {h}")));
    }

    let kjt_1 = params.tp_btm - params.tp_btm_k1_voffset;
    let allowable = kjt_1 - batter.pile_top_elev;
    let total: f64 = params.bay_heights.iter().sum();
    if total > allowable {
        return Err(JacketError::InvalidInput(format!(
            "bay heights must sum to less than {allowable} (top K-joint to pile top), currently {total}"
        )));
    }

    Ok(std::iter::once(kjt_1)
        .chain(params.bay_heights.iter().scan(kjt_1, |elev, h| {
            *elev -= h;
            Some(*elev)
        }))
        .collect())
}

fn kjt_world_points(batter: &BatterGeometry, elevs: &[f64]) -> Vec<Point> {
    elevs
        .iter()
        .map(|&e| Point::new(-batter.width_at(e) / 2.0, e))
        .collect()
}

/// Solve the diagonal crossings between consecutive K-joints
fn xjt_layouts(wps: &[Point]) -> JacketResult<Vec<XJointLayout>> {
    wps.windows(2)
        .enumerate()
        .map(|(i, w)| {
            let (upper, lower) = (w[0], w[1]);
            let upper_right = Point::new(-upper.x, upper.y);
            let lower_right = Point::new(-lower.x, lower.y);
            let p = line_intersection(&upper, &lower_right, &upper_right, &lower);
            if !p.x.is_finite() || p.x.abs() > CENTRELINE_TOL {
                return Err(JacketError::GeometryInconsistency {
                    context: format!("xjt_{} between kjt_{} and kjt_{}", i + 1, i + 1, i + 2),
                    x: p.x,
                });
            }
            let wp = Point::new(0.0, p.y);
            let above = Point::new(lower.x, lower.y + REFERENCE_RAY);
            Ok(XJointLayout {
                index: i + 1,
                elev: p.y,
                angle: calculate_angle_3pts(&above, &lower, &wp),
                wp,
            })
        })
        .collect()
}

fn kjt_layouts(
    batter: &BatterGeometry,
    wps: &[Point],
    xjoints: &[XJointLayout],
    horizontals: &[bool],
) -> Vec<KJointLayout> {
    wps.iter()
        .enumerate()
        .map(|(i, wp)| {
            let segment = batter.segment_at(wp.y);
            let batter_angle = batter.segment_angle(segment);
            let rad = batter_angle.to_radians();
            let reference = *wp + Vec2::new(rad.cos(), rad.sin()) * REFERENCE_RAY;
            let has_horizontal = horizontals.get(i).copied().unwrap_or(false);

            let above = i.checked_sub(1).and_then(|j| xjoints.get(j)).map(|x| x.wp);
            let level = has_horizontal.then(|| Point::new(0.0, wp.y));
            let below = xjoints.get(i).map(|x| x.wp);

            let mut angles: Vec<f64> = [above, level, below]
                .iter()
                .flatten()
                .map(|target| calculate_angle_3pts(&reference, wp, target))
                .collect();
            angles.sort_by(f64::total_cmp);
            let n_braces = angles.len();
            let mut brace_angles = [None; 3];
            for (slot, a) in brace_angles.iter_mut().zip(angles) {
                *slot = Some(a);
            }

            KJointLayout {
                index: i + 1,
                elev: wp.y,
                width: -2.0 * wp.x,
                wp: *wp,
                segment,
                batter_angle,
                has_horizontal,
                brace_angles,
                n_braces,
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    pub(crate) fn single_batter_params() -> JacketParams {
        JacketParams {
            interface_elev: 42150.0,
            tp_width: 19300.0,
            tp_btm: 33150.0,
            tp_btm_k1_voffset: 1000.0,
            batter_1_theta: None,
            batter_1_elev: None,
            jacket_footprint: 36000.0,
            stickup: 4000.0,
            bay_heights: vec![20000.0, 20000.0],
            bay_horizontals: vec![],
            btm_vert_leg_length: 5030.0,
            water_depth: 62800.0,
            single_batter: true,
        }
    }

    pub(crate) fn two_batter_params() -> JacketParams {
        JacketParams {
            batter_1_theta: Some(86.0),
            batter_1_elev: Some(-17000.0),
            bay_heights: vec![20000.0, 20000.0, 20000.0],
            single_batter: false,
            ..single_batter_params()
        }
    }

    #[test]
    fn test_single_batter_layout() {
        let layout = JacketLayout::derive(&single_batter_params()).unwrap();
        let b = &layout.batter;
        assert_eq!(b.batter_1_theta, b.batter_2_theta);
        assert_relative_eq!(b.batter_2_elev, -53770.0, epsilon = 1e-9);
        assert_relative_eq!(b.batter_1_theta, (86920.0f64 / 8350.0).atan().to_degrees(), epsilon = 1e-12);

        assert_eq!(layout.kjoints.len(), 3);
        assert_eq!(layout.xjoints.len(), 2);
        let elevs: Vec<f64> = layout.kjoints.iter().map(|k| k.elev).collect();
        assert_eq!(elevs, vec![32150.0, 12150.0, -7850.0]);

        let x1 = layout.xjoint(1).unwrap().elev;
        assert!(x1 < 32150.0 && x1 > 12150.0);

        // single batter line: width grows linearly to the footprint at batter 2
        assert_relative_eq!(b.width_at(b.batter_2_elev), 36000.0, epsilon = 1e-6);
        assert_relative_eq!(b.width_at(b.tp_btm), 19300.0, epsilon = 1e-9);
    }

    #[test]
    fn test_two_batter_layout() {
        let layout = JacketLayout::derive(&two_batter_params()).unwrap();
        let b = &layout.batter;
        let expected_w1 = 19300.0 + 2.0 * 50150.0 / 86f64.to_radians().tan();
        assert_relative_eq!(b.batter_1_width, expected_w1, epsilon = 1e-9);
        let expected_t2 = (36770.0f64).atan2((36000.0 - expected_w1) / 2.0).to_degrees();
        assert_relative_eq!(b.batter_2_theta, expected_t2, epsilon = 1e-12);

        let k4 = layout.kjoint(4).unwrap();
        assert_eq!(k4.segment, LegSegment::Batter2);
        assert_eq!(k4.batter_angle, b.batter_2_theta);
        assert_eq!(layout.kjoint(1).unwrap().segment, LegSegment::Batter1);
        // widths are continuous across the batter change
        assert_relative_eq!(b.width_at(-17000.0 - 1e-6), b.batter_1_width, epsilon = 1e-3);
    }

    #[test]
    fn test_elevations_descend() {
        let mut params = two_batter_params();
        params.bay_heights = vec![12000.0, 15000.0, 18000.0, 21000.0];
        let layout = JacketLayout::derive(&params).unwrap();
        for w in layout.kjoints.windows(2) {
            assert!(w[0].elev > w[1].elev);
        }
        for (i, x) in layout.xjoints.iter().enumerate() {
            assert!(x.elev < layout.kjoints[i].elev && x.elev > layout.kjoints[i + 1].elev);
        }
    }

    #[test]
    fn test_xjoints_on_centreline_over_grid() {
        let bay_sets: [&[f64]; 4] = [
            &[20000.0, 20000.0],
            &[15000.0, 18000.0, 22000.0],
            &[10000.0, 12000.0, 14000.0, 16000.0],
            &[8000.0, 9000.0, 11000.0, 13000.0, 17000.0],
        ];
        for footprint in [30000.0, 33000.0, 36000.0, 42000.0] {
            for bays in bay_sets {
                for single in [true, false] {
                    let params = JacketParams {
                        jacket_footprint: footprint,
                        bay_heights: bays.to_vec(),
                        single_batter: single,
                        ..two_batter_params()
                    };
                    let layout = JacketLayout::derive(&params).unwrap();
                    for x in &layout.xjoints {
                        assert_eq!(x.wp.x, 0.0);
                        assert!(x.angle > 0.0 && x.angle < 90.0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_brace_counts_and_angles() {
        let mut params = two_batter_params();
        params.bay_horizontals = vec![false, true, true];
        let layout = JacketLayout::derive(&params).unwrap();
        assert_eq!(layout.bay_horizontals, vec![false, false, true, true]);

        let counts: Vec<usize> = layout.kjoints.iter().map(|k| k.n_braces).collect();
        assert_eq!(counts, vec![1, 2, 3, 2]);

        let k3 = layout.kjoint(3).unwrap();
        let [a1, a2, a3] = k3.brace_angles;
        let (a1, a2, a3) = (a1.unwrap(), a2.unwrap(), a3.unwrap());
        assert!(a1 < a2 && a2 < a3);
        // the leg leans inboard, so the horizontal sits at the batter angle from its axis
        assert_relative_eq!(a2, k3.batter_angle, epsilon = 1e-9);

        let k1 = layout.kjoint(1).unwrap();
        assert_eq!(k1.brace_angles[1], None);
        assert!(k1.brace_angles[0].unwrap() > 90.0);
    }

    #[test]
    fn test_normalize_horizontals() {
        assert_eq!(normalize_bay_horizontals(&[true, true], 2).unwrap(), vec![false, true, true]);
        assert_eq!(normalize_bay_horizontals(&[true, false, true], 2).unwrap(), vec![false, false, true]);
        assert_eq!(normalize_bay_horizontals(&[], 2).unwrap(), vec![false, false, false]);
        assert_eq!(normalize_bay_horizontals(&[true], 3).unwrap(), vec![false, true, false, false]);
        assert!(normalize_bay_horizontals(&[true; 4], 2).is_err());
    }

    #[test]
    fn test_invalid_inputs() {
        let mut p = single_batter_params();
        p.tp_btm = p.interface_elev;
        assert!(matches!(JacketLayout::derive(&p), Err(JacketError::InvalidInput(_))));

        let mut p = two_batter_params();
        p.batter_1_theta = Some(91.0);
        assert!(JacketLayout::derive(&p).is_err());

        let mut p = two_batter_params();
        p.batter_1_elev = None;
        assert!(JacketLayout::derive(&p).is_err());

        let mut p = two_batter_params();
        p.batter_1_elev = Some(-60000.0);
        assert!(JacketLayout::derive(&p).is_err());

        let mut p = single_batter_params();
        p.bay_heights = vec![50000.0, 41000.0];
        assert!(JacketLayout::derive(&p).is_err());

        let mut p = single_batter_params();
        p.bay_heights = vec![];
        assert!(JacketLayout::derive(&p).is_err());

        // upper batter so shallow the lower one would lean outwards
        let mut p = two_batter_params();
        p.batter_1_theta = Some(70.0);
        assert!(JacketLayout::derive(&p).is_err());
    }

    #[test]
    fn test_repair_directions() {
        let layout = JacketLayout::derive(&two_batter_params()).unwrap();
        let b = &layout.batter;
        let up1 = b.repair_direction(BatterId::Batter1, KinkLocation::AboveKjt);
        assert_relative_eq!(up1.y.atan2(up1.x).to_degrees(), b.batter_1_theta, epsilon = 1e-9);
        let down1 = b.repair_direction(BatterId::Batter1, KinkLocation::BelowKjt);
        assert_relative_eq!((-down1.y).atan2(-down1.x).to_degrees(), b.batter_2_theta, epsilon = 1e-9);
        assert_eq!(b.repair_direction(BatterId::Batter2, KinkLocation::BelowKjt), Vec2::new(0.0, -1.0));
    }

    #[test]
    fn test_kinks_between() {
        let layout = JacketLayout::derive(&two_batter_params()).unwrap();
        let b = &layout.batter;
        let kinks = b.kinks_between(0.0, -60000.0);
        assert_eq!(kinks.len(), 2);
        assert!(kinks[0].y > kinks[1].y);
        assert!(b.kinks_between(0.0, -17000.0).is_empty());

        let single = JacketLayout::derive(&single_batter_params()).unwrap();
        assert_eq!(single.batter.kinks_between(0.0, -60000.0).len(), 1);
    }
}
