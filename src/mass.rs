//! Steel material take-off for a built jacket
//!
//! Masses are in tonnes from mm geometry. Only one leg's K-joint cans and
//! leg runs are counted (the take-off is per leg line); bay members are
//! counted on both sides of the bay.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::elements::{BaySide, Leg, MemberId, PlacedJoint, TubularSection, WorldJoint};
use crate::error::{JacketError, JacketResult};
use crate::geom::{Point, LENGTH_TOL};
use crate::jacket::Jacket;

/// Steel density in t/mm³
pub const STEEL_DENSITY: f64 = 7.85e-9;

/// Where a section is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MassLocation {
    /// Leg line: K-joint cans and leg runs
    Leg,
    /// Bracing of bay n: diagonals, horizontals, X-joints and K-joint stubs
    Bay(usize),
}

impl fmt::Display for MassLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MassLocation::Leg => f.write_str("LEG"),
            MassLocation::Bay(n) => write!(f, "BAY_{n}"),
        }
    }
}

/// One tubular piece of the take-off
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassSection {
    pub name: String,
    pub location: MassLocation,
    /// Mass in tonnes
    pub mass: f64,
    /// Outer diameter, or top diameter of a cone (mm)
    pub outer_diameter: f64,
    /// Wall thickness (mm)
    pub thickness: f64,
    /// Centreline length (mm)
    pub length: f64,
    /// Bottom diameter; equal to `outer_diameter` for a straight tube
    pub od_bottom: f64,
}

impl MassSection {
    fn chs(name: String, location: MassLocation, volume: f64, od: f64, thk: f64, length: f64) -> Self {
        Self {
            name,
            location,
            mass: volume * STEEL_DENSITY,
            outer_diameter: od,
            thickness: thk,
            length,
            od_bottom: od,
        }
    }

    pub fn is_conical(&self) -> bool {
        (self.od_bottom - self.outer_diameter).abs() > LENGTH_TOL
    }

    /// Section label, e.g. `CHS(2000, 60)` or `ConicalCHS(2000→2400, 60)`
    pub fn section_str(&self) -> String {
        if self.is_conical() {
            format!(
                "ConicalCHS({:.0}→{:.0}, {:.0})",
                self.outer_diameter, self.od_bottom, self.thickness
            )
        } else {
            format!("CHS({:.0}, {:.0})", self.outer_diameter, self.thickness)
        }
    }
}

/// Volume of a hollow tube or conical frustum with constant wall thickness.
///
/// `d2` defaults to `d1`.
pub fn hollow_frustum_volume(d1: f64, length: f64, tw: f64, d2: Option<f64>) -> JacketResult<f64> {
    let d2 = d2.unwrap_or(d1);
    let (big_r1, big_r2) = (d1 / 2.0, d2 / 2.0);
    let (r1, r2) = (big_r1 - tw, big_r2 - tw);
    if r1 <= 0.0 || r2 <= 0.0 {
        return Err(JacketError::InvalidInput(format!(
            "wall thickness {tw} closes a tube of diameter {}",
            d1.min(d2)
        )));
    }
    Ok(PI * length / 3.0
        * (big_r1.powi(2) + big_r1 * big_r2 + big_r2.powi(2) - r1.powi(2) - r1 * r2 - r2.powi(2)))
}

/// Volumes of the straight pieces of a kinked tube through `pts`.
///
/// Each interior kink removes a mitre volume `A·r_mean·tan(θ/2)`, split
/// equally between the two pieces meeting there.
pub fn kinked_pipe_volume(pts: &[Point], outer_diameter: f64, thk: f64) -> JacketResult<Vec<f64>> {
    if pts.len() < 2 {
        return Err(JacketError::InvalidGeometry(format!(
            "a tube needs at least 2 points, got {}",
            pts.len()
        )));
    }
    let section = TubularSection::new(outer_diameter, thk);
    if section.is_solid() {
        return Err(JacketError::InvalidInput(format!(
            "wall thickness {thk} closes a tube of diameter {outer_diameter}"
        )));
    }
    let (area, r_mean) = (section.area(), section.mean_radius());

    let dirs = pts
        .windows(2)
        .map(|w| {
            let v = w[1] - w[0];
            let len = v.norm();
            if len < LENGTH_TOL {
                return Err(JacketError::InvalidGeometry(format!(
                    "zero-length tube piece at ({:.1}, {:.1})",
                    w[0].x, w[0].y
                )));
            }
            Ok((v / len, len))
        })
        .collect::<JacketResult<Vec<_>>>()?;

    let mitres: Vec<f64> = dirs
        .windows(2)
        .map(|w| {
            let theta = w[0].0.dot(&w[1].0).clamp(-1.0, 1.0).acos();
            area * r_mean * (theta / 2.0).tan()
        })
        .collect();

    Ok(dirs
        .iter()
        .enumerate()
        .map(|(i, (_, len))| {
            let before = i.checked_sub(1).and_then(|j| mitres.get(j)).copied().unwrap_or(0.0);
            let after = mitres.get(i).copied().unwrap_or(0.0);
            area * len - 0.5 * (before + after)
        })
        .collect())
}

fn run_sections(
    base: &str,
    location: MassLocation,
    pts: &[Point],
    od: f64,
    thk: f64,
    first_index: usize,
) -> JacketResult<Vec<MassSection>> {
    if pts.len() < 2 {
        return Ok(Vec::new());
    }
    let vols = kinked_pipe_volume(pts, od, thk)?;
    Ok(vols
        .into_iter()
        .zip(pts.windows(2))
        .enumerate()
        .map(|(i, (vol, w))| {
            MassSection::chs(
                format!("{base}_section_{}", first_index + i),
                location,
                vol,
                od,
                thk,
                (w[1] - w[0]).norm(),
            )
        })
        .collect())
}

/// Sections of a leg or brace run: the width-1 run, the cone, the width-2 run
fn member_sections(member: &Leg, base: &str, location: MassLocation) -> JacketResult<Vec<MassSection>> {
    let mut out = Vec::new();
    if let (true, Some(cone_length)) = (member.is_cone(), member.cone_length()) {
        let vol = hollow_frustum_volume(member.width1, cone_length, member.thk, Some(member.width2))?;
        out.push(MassSection {
            od_bottom: member.width2,
            ..MassSection::chs(format!("{base}_cone"), location, vol, member.width1, member.thk, cone_length)
        });
    }
    let a = run_sections(base, location, member.leg_a(), member.width1, member.thk, 1)?;
    let next = a.len() + 1;
    out.extend(a);
    out.extend(run_sections(base, location, member.leg_b(), member.width2, member.thk, next)?);
    Ok(out)
}

fn straight_can(joint: &PlacedJoint, location: MassLocation) -> JacketResult<MassSection> {
    let jt = joint.joint();
    let length = (joint.can_pt_top() - joint.can_pt_btm()).norm();
    let vol = hollow_frustum_volume(jt.dc, length, jt.tc, None)?;
    Ok(MassSection::chs(joint.name(), location, vol, jt.dc, jt.tc, length))
}

/// Stub sections of a joint, `copies` times each
fn stub_sections(
    joint: &PlacedJoint,
    copies: &[&str],
    location: impl Fn(&Point, &Point) -> MassLocation,
) -> JacketResult<Vec<MassSection>> {
    let mut out = Vec::new();
    for (i, (brace, (id, end))) in joint.joint().braces().iter().zip(joint.stub_end_pts()).enumerate() {
        let Some(start) = joint.stub_start_pts().get(id) else { continue };
        let length = (end - start).norm();
        let vol = hollow_frustum_volume(brace.d, length, brace.t, None)?;
        for suffix in copies {
            out.push(MassSection::chs(
                format!("{}_stub_{}{suffix}", joint.name(), i + 1),
                location(start, end),
                vol,
                brace.d,
                brace.t,
                length,
            ));
        }
    }
    Ok(out)
}

/// Material take-off of a built jacket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MassTakeoff {
    pub sections: Vec<MassSection>,
}

impl MassTakeoff {
    pub fn from_jacket(jacket: &Jacket) -> JacketResult<Self> {
        let n_bays = jacket.n_bays();
        let mut sections = Vec::new();

        // K-joint cans, one leg
        for (_, pair) in jacket.kjoint_pairs() {
            match &pair.left {
                WorldJoint::Placed(p) => sections.push(straight_can(p, MassLocation::Leg)?),
                WorldJoint::Kinked(k) => {
                    let p = k.placed();
                    let jt = p.joint();
                    let pts = [p.can_pt_top(), k.pt_kink, p.can_pt_btm()];
                    sections.extend(run_sections(&p.name(), MassLocation::Leg, &pts, jt.dc, jt.tc, 1)?);
                }
            }
        }

        for leg in jacket.leg_objs().into_iter().filter(|l| !l.is_mirror()) {
            sections.extend(member_sections(leg, &leg.name(), MassLocation::Leg)?);
        }

        for brace in jacket.brace_a_objs().into_iter().chain(jacket.brace_b_objs()) {
            let (n, pos, side) = match brace.id {
                MemberId::BraceA(n, side) => (n, "top", side),
                MemberId::BraceB(n, side) => (n, "btm", side),
                _ => continue,
            };
            let side = match side {
                BaySide::L => "left",
                BaySide::R => "right",
            };
            let base = format!("bay_{n}_{pos}_{side}");
            sections.extend(member_sections(brace, &base, MassLocation::Bay(n))?);
        }

        for (&n, xjt) in jacket.xjoints() {
            let p = xjt.placed();
            sections.push(straight_can(p, MassLocation::Bay(n))?);
            sections.extend(stub_sections(p, &[""], |_, _| MassLocation::Bay(n))?);
        }

        // K-joint stubs belong to the bay they point into, once per leg
        for (&k, pair) in jacket.kjoint_pairs() {
            let bay_of = |start: &Point, end: &Point| {
                if end.y < start.y - 1.0 {
                    MassLocation::Bay(k.min(n_bays))
                } else {
                    MassLocation::Bay(k.saturating_sub(1).max(1))
                }
            };
            sections.extend(stub_sections(pair.left.placed(), &["_leg_a", "_leg_b"], bay_of)?);
        }

        for brace in jacket.brace_hz_objs() {
            if let MemberId::BraceHz(n) = brace.id {
                sections.extend(member_sections(brace, &format!("{}", brace.id), MassLocation::Bay(n))?);
            }
        }

        log::debug!("mass take-off: {} sections", sections.len());
        Ok(Self { sections })
    }

    /// Total mass in tonnes
    pub fn total_mass(&self) -> f64 {
        self.sections.iter().map(|s| s.mass).sum()
    }

    /// Mass per location label (`LEG`, `BAY_1`, ...)
    pub fn totals_by_location(&self) -> BTreeMap<String, f64> {
        let mut totals = BTreeMap::new();
        for s in &self.sections {
            *totals.entry(s.location.to_string()).or_insert(0.0) += s.mass;
        }
        totals
    }

    pub fn at(&self, location: MassLocation) -> impl Iterator<Item = &MassSection> {
        self.sections.iter().filter(move |s| s.location == location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cylinder_volume() {
        let vol = hollow_frustum_volume(1000.0, 2000.0, 50.0, None).unwrap();
        let expected = PI * (500.0f64.powi(2) - 450.0f64.powi(2)) * 2000.0;
        assert_relative_eq!(vol, expected, max_relative = 1e-12);
    }

    #[test]
    fn test_frustum_volume_between_cylinders() {
        let small = hollow_frustum_volume(1000.0, 1000.0, 40.0, None).unwrap();
        let big = hollow_frustum_volume(1400.0, 1000.0, 40.0, None).unwrap();
        let cone = hollow_frustum_volume(1000.0, 1000.0, 40.0, Some(1400.0)).unwrap();
        assert!(cone > small && cone < big);
        assert!(hollow_frustum_volume(100.0, 1000.0, 50.0, None).is_err());
    }

    #[test]
    fn test_straight_pipe_has_no_mitre() {
        let pts = [Point::new(0.0, 0.0), Point::new(0.0, 1000.0)];
        let vols = kinked_pipe_volume(&pts, 1000.0, 50.0).unwrap();
        assert_eq!(vols.len(), 1);
        let cyl = hollow_frustum_volume(1000.0, 1000.0, 50.0, None).unwrap();
        assert_relative_eq!(vols[0], cyl, max_relative = 1e-12);
    }

    #[test]
    fn test_kinked_pipe_mitre_split() {
        let pts = [Point::new(0.0, 0.0), Point::new(0.0, 1000.0), Point::new(1000.0, 2000.0)];
        let vols = kinked_pipe_volume(&pts, 1000.0, 50.0).unwrap();
        let area = PI * (500.0f64.powi(2) - 450.0f64.powi(2));
        let mitre = area * 475.0 * (PI / 8.0).tan();
        assert_relative_eq!(vols[0], area * 1000.0 - 0.5 * mitre, max_relative = 1e-12);
        assert_relative_eq!(vols[1], area * 1000.0 * 2f64.sqrt() - 0.5 * mitre, max_relative = 1e-12);

        // middle piece of a double kink loses half a mitre at each end
        let pts4 = [pts[0], pts[1], pts[2], Point::new(1000.0, 3000.0)];
        let vols4 = kinked_pipe_volume(&pts4, 1000.0, 50.0).unwrap();
        assert_relative_eq!(vols4[1], vols[1] - 0.5 * mitre, max_relative = 1e-12);
    }

    #[test]
    fn test_kinked_pipe_rejects_degenerate() {
        assert!(kinked_pipe_volume(&[Point::new(0.0, 0.0)], 1000.0, 50.0).is_err());
        let dup = [Point::new(0.0, 0.0), Point::new(0.0, 0.0)];
        assert!(kinked_pipe_volume(&dup, 1000.0, 50.0).is_err());
    }

    #[test]
    fn test_section_str() {
        let chs = MassSection::chs("kjt_1".into(), MassLocation::Leg, 1.0, 2000.0, 60.0, 3000.0);
        assert_eq!(chs.section_str(), "CHS(2000, 60)");
        let cone = MassSection { od_bottom: 2400.0, ..chs };
        assert_eq!(cone.section_str(), "ConicalCHS(2000→2400, 60)");
        assert_eq!(MassLocation::Bay(3).to_string(), "BAY_3");
    }
}
