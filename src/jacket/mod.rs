//! Jacket assembly: places joints and connects legs and braces between them
//!
//! The [`Jacket`] owns the derived [`JacketLayout`] and indexed collections of
//! world-frame joints and member runs. Left-leg objects are built from the
//! layout; right-leg objects are their x-mirrors.

mod conflicts;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use conflicts::{DesignWarning, KjtEdit, WarningFlag};

use crate::elements::{BaySide, BraceId, Joint2D, JointType, Leg, MemberId, PlacedJoint, WorldJoint};
use crate::error::{JacketError, JacketResult};
use crate::geom::Point;
use crate::layout::{JacketLayout, JacketParams};
use crate::options::BuildOptions;

/// Left and right copies of a K-joint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointPair {
    pub left: WorldJoint,
    pub right: WorldJoint,
}

impl JointPair {
    fn from_left(left: WorldJoint) -> Self {
        let right = left.mirrored();
        Self { left, right }
    }

    fn side(&self, side: BaySide) -> &PlacedJoint {
        match side {
            BaySide::L => self.left.placed(),
            BaySide::R => self.right.placed(),
        }
    }
}

/// Left and right copies of a leg run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegPair {
    pub left: Leg,
    pub right: Leg,
}

/// A jacket elevation under construction
#[derive(Debug, Clone)]
pub struct Jacket {
    layout: JacketLayout,
    options: BuildOptions,
    kjoints: BTreeMap<usize, JointPair>,
    xjoints: BTreeMap<usize, WorldJoint>,
    legs: BTreeMap<usize, LegPair>,
    braces_a: BTreeMap<(usize, BaySide), Leg>,
    braces_b: BTreeMap<(usize, BaySide), Leg>,
    braces_hz: BTreeMap<usize, Leg>,
    warnings: BTreeMap<String, DesignWarning>,
    kjt_edits: BTreeMap<usize, KjtEdit>,
}

impl Jacket {
    /// Derive the layout for `params`; no joints or members yet
    pub fn new(params: &JacketParams, options: BuildOptions) -> JacketResult<Self> {
        let layout = JacketLayout::derive(params)?;
        Ok(Self {
            layout,
            options,
            kjoints: BTreeMap::new(),
            xjoints: BTreeMap::new(),
            legs: BTreeMap::new(),
            braces_a: BTreeMap::new(),
            braces_b: BTreeMap::new(),
            braces_hz: BTreeMap::new(),
            warnings: BTreeMap::new(),
            kjt_edits: BTreeMap::new(),
        })
    }

    pub fn layout(&self) -> &JacketLayout {
        &self.layout
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn n_bays(&self) -> usize {
        self.layout.n_bays()
    }

    /// Set a joint's brace angles from the layout, build it and place it.
    ///
    /// K-joints go to their left-leg work point with a mirrored copy on the
    /// right leg. X-joints sit on the centreline with the can along the
    /// diagonal that runs up to the right-hand K-joint.
    pub fn add_joint_obj(&mut self, mut joint: Joint2D) -> JacketResult<()> {
        let index = joint.index;
        match joint.jt_type {
            JointType::K => {
                if self.kjoints.contains_key(&index) {
                    return Err(JacketError::DuplicateName(joint.name()));
                }
                let lay = self
                    .layout
                    .kjoint(index)
                    .ok_or_else(|| JacketError::JointNotFound(joint.name()))?;
                if joint.n_braces() != lay.n_braces {
                    return Err(JacketError::InvalidInput(format!(
                        "{} takes {} braces, {} given",
                        joint.name(),
                        lay.n_braces,
                        joint.n_braces()
                    )));
                }
                joint.brace_attachment_thetas(&lay.thetas())?;
                joint.create_joint()?;
                let placed = joint.transform_joint(Some(lay.batter_angle), Some(lay.wp.coords), false)?;
                log::debug!("placed {} at ({:.1}, {:.1})", placed.name(), lay.wp.x, lay.wp.y);
                self.kjoints.insert(index, JointPair::from_left(placed.into()));

                if index == 1 && self.options.extend_k1_to_tp {
                    self.extend_k1_to_tp()?;
                }
            }
            JointType::X => {
                if self.xjoints.contains_key(&index) {
                    return Err(JacketError::DuplicateName(joint.name()));
                }
                let lay = self
                    .layout
                    .xjoint(index)
                    .ok_or_else(|| JacketError::JointNotFound(joint.name()))?;
                if joint.n_braces() != 2 {
                    return Err(JacketError::InvalidInput(format!(
                        "{} takes 2 braces, {} given",
                        joint.name(),
                        joint.n_braces()
                    )));
                }
                let alpha = lay.angle;
                // brc1 runs down to the right, brc2 up to the left
                joint.brace_attachment_thetas(&[180.0 - 2.0 * alpha, 360.0 - 2.0 * alpha])?;
                joint.create_joint()?;
                let placed = joint.transform_joint(Some(90.0 - alpha), Some(lay.wp.coords), false)?;
                log::debug!("placed {} at elevation {:.1}", placed.name(), lay.elev);
                self.xjoints.insert(index, placed.into());
            }
        }
        Ok(())
    }

    /// Stretch the top K-joint can up to the transition piece bottom
    pub fn extend_k1_to_tp(&mut self) -> JacketResult<()> {
        let tp_btm = self.layout.batter.tp_btm;
        let pair = self
            .kjoints
            .get(&1)
            .ok_or_else(|| JacketError::JointNotFound("kjt_1".to_string()))?;
        let WorldJoint::Placed(left) = &pair.left else {
            return Err(JacketError::InvalidGeometry(
                "kjt_1 can is kinked and cannot be extended to the TP".to_string(),
            ));
        };
        let extended = left.clone().extend_can_top_to(tp_btm)?;
        log::debug!("kjt_1 can extended to TP bottom at {tp_btm}");
        self.kjoints.insert(1, JointPair::from_left(extended.into()));
        Ok(())
    }

    fn kjoint_pair(&self, index: usize) -> JacketResult<&JointPair> {
        self.kjoints
            .get(&index)
            .ok_or_else(|| JacketError::JointNotFound(format!("kjt_{index}")))
    }

    fn xjoint_placed(&self, index: usize) -> JacketResult<&PlacedJoint> {
        self.xjoints
            .get(&index)
            .map(WorldJoint::placed)
            .ok_or_else(|| JacketError::JointNotFound(format!("xjt_{index}")))
    }

    fn check_bay(&self, id: MemberId, bay: usize, max: usize) -> JacketResult<()> {
        if bay == 0 || bay > max {
            return Err(JacketError::MemberNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Apply the build options, set the points and construct
    fn construct_member(&self, mut member: Leg, pts: &[Point]) -> JacketResult<Leg> {
        member.section_alignment = self.options.section_alignment;
        member.section_tolerance = self.options.section_tolerance;
        let (Some(first), Some(last)) = (pts.first(), pts.last()) else {
            return Err(JacketError::InvalidGeometry(format!("{}: no control points", member.id)));
        };
        member.define_leg_pts(*first, *last);
        for mid in pts.iter().skip(1).take(pts.len().saturating_sub(2)) {
            member.define_intermediate_leg_point(*mid)?;
        }
        member.construct_leg(self.options.cone_offset, self.options.cone_taper)?;
        Ok(member)
    }

    fn leg_pair(&self, leg: Leg) -> JacketResult<LegPair> {
        let MemberId::Leg(n) = leg.id else {
            return Err(JacketError::InvalidInput(format!("{} is not a leg run", leg.id)));
        };
        self.check_bay(leg.id, n, self.n_bays() + 1)?;

        let top = self.kjoint_pair(n)?.left.can_pt_btm();
        let btm = if n == self.n_bays() + 1 {
            self.layout.batter.pile_top_point()
        } else {
            self.kjoint_pair(n + 1)?.left.can_pt_top()
        };
        if top.y <= btm.y {
            return Err(JacketError::InvalidGeometry(format!(
                "{}: top end at {:.1} is not above bottom end at {:.1}",
                leg.id, top.y, btm.y
            )));
        }

        let mut pts = vec![top];
        pts.extend(self.layout.batter.kinks_between(top.y, btm.y));
        pts.push(btm);

        let left = self.construct_member(leg, &pts)?;
        let right = left.mirrored()?;
        Ok(LegPair { left, right })
    }

    /// Connect leg run n from the bottom of K-joint n to the top of K-joint n+1
    /// (or the pile top below the last joint), through any batter kinks between.
    pub fn add_leg_obj(&mut self, leg: Leg) -> JacketResult<()> {
        if let MemberId::Leg(n) = leg.id {
            if self.legs.contains_key(&n) {
                return Err(JacketError::DuplicateName(leg.id.to_string()));
            }
        }
        let pair = self.leg_pair(leg)?;
        if let MemberId::Leg(n) = pair.left.id {
            self.legs.insert(n, pair);
        }
        Ok(())
    }

    /// Rebuild attached leg runs that end on K-joint `index`
    fn reattach_legs_at(&mut self, index: usize) -> JacketResult<()> {
        for n in [index.saturating_sub(1), index] {
            let Some(old) = self.legs.get(&n) else { continue };
            let fresh = Leg::new(old.left.id, old.left.width1, old.left.width2, old.left.thk);
            let pair = self.leg_pair(fresh)?;
            log::debug!("re-attached leg_{n} after repair of kjt_{index}");
            self.legs.insert(n, pair);
        }
        Ok(())
    }

    /// Upper diagonal of a bay: from the lower stub of K-joint n down to X-joint n.
    /// The left brace lands on the X-joint's up-left stub, the right one on its can.
    pub fn add_brace_a_obj(&mut self, brace: Leg) -> JacketResult<()> {
        let MemberId::BraceA(n, side) = brace.id else {
            return Err(JacketError::InvalidInput(format!("{} is not an upper bay brace", brace.id)));
        };
        self.check_bay(brace.id, n, self.n_bays())?;
        if self.braces_a.contains_key(&(n, side)) {
            return Err(JacketError::DuplicateName(brace.id.to_string()));
        }

        let kjt = self.kjoint_pair(n)?.side(side);
        let xjt = self.xjoint_placed(n)?;
        let pt1 = kjt
            .lowest_stub_end()
            .ok_or_else(|| JacketError::InvalidGeometry(format!("{} has no stubs", kjt.name())))?;
        let pt2 = match side {
            BaySide::L => stub_end(xjt, BraceId::Brc2)?,
            BaySide::R => xjt.can_pt_top(),
        };

        let member = self.construct_member(brace, &[pt1, pt2])?;
        self.braces_a.insert((n, side), member);
        Ok(())
    }

    /// Lower diagonal of a bay: from X-joint n down to the upper stub of K-joint n+1.
    /// The left brace leaves the X-joint can, the right one its down-right stub.
    pub fn add_brace_b_obj(&mut self, brace: Leg) -> JacketResult<()> {
        let MemberId::BraceB(n, side) = brace.id else {
            return Err(JacketError::InvalidInput(format!("{} is not a lower bay brace", brace.id)));
        };
        self.check_bay(brace.id, n, self.n_bays())?;
        if self.braces_b.contains_key(&(n, side)) {
            return Err(JacketError::DuplicateName(brace.id.to_string()));
        }

        let xjt = self.xjoint_placed(n)?;
        let kjt = self.kjoint_pair(n + 1)?.side(side);
        let pt1 = match side {
            BaySide::L => xjt.can_pt_btm(),
            BaySide::R => stub_end(xjt, BraceId::Brc1)?,
        };
        let pt2 = kjt
            .highest_stub_end()
            .ok_or_else(|| JacketError::InvalidGeometry(format!("{} has no stubs", kjt.name())))?;

        let member = self.construct_member(brace, &[pt1, pt2])?;
        self.braces_b.insert((n, side), member);
        Ok(())
    }

    /// Horizontal at the bottom of bay n, between the middle stubs of K-joint n+1
    pub fn add_brace_hz_obj(&mut self, brace: Leg) -> JacketResult<()> {
        let MemberId::BraceHz(n) = brace.id else {
            return Err(JacketError::InvalidInput(format!("{} is not a horizontal", brace.id)));
        };
        self.check_bay(brace.id, n, self.n_bays())?;
        if !self.layout.bay_horizontals.get(n).copied().unwrap_or(false) {
            return Err(JacketError::InvalidInput(format!(
                "bay {n} has no horizontal at kjt_{}",
                n + 1
            )));
        }
        if self.braces_hz.contains_key(&n) {
            return Err(JacketError::DuplicateName(brace.id.to_string()));
        }

        let pair = self.kjoint_pair(n + 1)?;
        let pt1 = stub_end(pair.left.placed(), BraceId::Brc2)?;
        let pt2 = stub_end(pair.right.placed(), BraceId::Brc2)?;

        let member = self.construct_member(brace, &[pt1, pt2])?;
        self.braces_hz.insert(n, member);
        Ok(())
    }

    /// K-joint pair by index
    pub fn kjoint(&self, index: usize) -> Option<&JointPair> {
        self.kjoints.get(&index)
    }

    /// X-joint by index
    pub fn xjoint(&self, index: usize) -> Option<&WorldJoint> {
        self.xjoints.get(&index)
    }

    /// Every joint: K-joints (left then right) top down, then X-joints
    pub fn joint_objs(&self) -> Vec<&WorldJoint> {
        self.kjoints
            .values()
            .flat_map(|p| [&p.left, &p.right])
            .chain(self.xjoints.values())
            .collect()
    }

    pub fn kjoint_pairs(&self) -> impl Iterator<Item = (&usize, &JointPair)> {
        self.kjoints.iter()
    }

    pub fn xjoints(&self) -> impl Iterator<Item = (&usize, &WorldJoint)> {
        self.xjoints.iter()
    }

    /// Leg run pair by index
    pub fn leg(&self, index: usize) -> Option<&LegPair> {
        self.legs.get(&index)
    }

    /// Every leg run, left then right, top down
    pub fn leg_objs(&self) -> Vec<&Leg> {
        self.legs.values().flat_map(|p| [&p.left, &p.right]).collect()
    }

    pub fn brace_a_objs(&self) -> Vec<&Leg> {
        self.braces_a.values().collect()
    }

    pub fn brace_b_objs(&self) -> Vec<&Leg> {
        self.braces_b.values().collect()
    }

    pub fn brace_hz_objs(&self) -> Vec<&Leg> {
        self.braces_hz.values().collect()
    }

    /// Design conflicts keyed by conflict id
    pub fn warnings(&self) -> &BTreeMap<String, DesignWarning> {
        &self.warnings
    }

    /// K-joints marked for can repair
    pub fn kjt_edits(&self) -> &BTreeMap<usize, KjtEdit> {
        &self.kjt_edits
    }
}

fn stub_end(joint: &PlacedJoint, id: BraceId) -> JacketResult<Point> {
    joint
        .stub_end_pts()
        .get(&id)
        .copied()
        .ok_or_else(|| JacketError::InvalidGeometry(format!("{} has no {id} stub", joint.name())))
}
