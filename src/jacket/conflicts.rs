//! Batter kink conflicts with K-joint cans
//!
//! A batter kink inside a can is a hard error the designer must fix by moving
//! the batter. A kink just beyond either end of a can is absorbed by carrying
//! the can through the kink as a mitred two-segment run.

use serde::{Deserialize, Serialize};

use super::{Jacket, JointPair};
use crate::elements::{KinkLocation, WorldJoint};
use crate::error::JacketResult;
use crate::layout::BatterId;

/// Severity of a design conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningFlag {
    Error,
    Warning,
}

/// A recorded design conflict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignWarning {
    pub flag: WarningFlag,
    pub message: String,
}

/// Pending can repair for one K-joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KjtEdit {
    pub batter: BatterId,
    pub kink_loc: KinkLocation,
}

impl Jacket {
    /// Check every left K-joint can against the active batters and repair
    /// the cans that end just short of a kink.
    pub fn kjt_warnings_check(&mut self) -> JacketResult<()> {
        self.check_batter_elevs_not_in_kjts();
        self.check_kjt_ends_not_within_dist(self.options.kink_check_distance);
        self.edit_kjt_can(self.options.extension_beyond_kink)
    }

    /// (index, top y, bottom y) of every straight left K-joint can, taken
    /// from its world-frame outline
    fn can_spans(&self) -> Vec<(usize, f64, f64)> {
        self.kjoints
            .iter()
            .filter(|(_, pair)| !pair.left.kinked_can())
            .map(|(i, pair)| {
                let (btm, top) = pair.left.placed().can_y_extent();
                (*i, top, btm)
            })
            .collect()
    }

    fn record(&mut self, key: String, flag: WarningFlag, message: String) {
        log::warn!("{key}: {message}");
        self.warnings.insert(key, DesignWarning { flag, message });
    }

    /// Record an error for every batter elevation strictly inside a can's
    /// world-frame y-extent
    pub fn check_batter_elevs_not_in_kjts(&mut self) {
        let batters = self.layout.batter.active_batters();
        for (index, top, btm) in self.can_spans() {
            for &batter in &batters {
                let elev = self.layout.batter.elevation(batter);
                if elev > btm && elev < top {
                    self.record(
                        format!("kjt_{index}_{batter}_in_can"),
                        WarningFlag::Error,
                        format!(
                            "{batter} at {elev:.0} lies within the kjt_{index} can; \
                             move it up by {:.0} mm or down by {:.0} mm",
                            top - elev,
                            elev - btm
                        ),
                    );
                }
            }
        }
    }

    /// Record a warning and mark a repair for every batter elevation within
    /// `dist` beyond either end of a can
    pub fn check_kjt_ends_not_within_dist(&mut self, dist: f64) {
        let batters = self.layout.batter.active_batters();
        for (index, top, btm) in self.can_spans() {
            for &batter in &batters {
                let elev = self.layout.batter.elevation(batter);
                let (kink_loc, gap) = if (0.0..=dist).contains(&(elev - top)) {
                    (KinkLocation::AboveKjt, elev - top)
                } else if (0.0..=dist).contains(&(btm - elev)) {
                    (KinkLocation::BelowKjt, btm - elev)
                } else {
                    continue;
                };
                self.record(
                    format!("kjt_{index}_{batter}_{kink_loc}"),
                    WarningFlag::Warning,
                    format!("{batter} is {gap:.0} mm {kink_loc} kjt_{index}; can will be carried through the kink"),
                );
                self.mark_edit(index, KjtEdit { batter, kink_loc });
            }
        }
    }

    fn mark_edit(&mut self, index: usize, edit: KjtEdit) {
        match self.kjt_edits.get(&index) {
            None => {
                self.kjt_edits.insert(index, edit);
            }
            Some(first) if *first != edit => {
                let first = *first;
                self.record(
                    format!("kjt_{index}_multiple_kinks"),
                    WarningFlag::Error,
                    format!(
                        "kjt_{index} is near both {} and {}; only the {} kink is absorbed",
                        first.batter, edit.batter, first.batter
                    ),
                );
            }
            Some(_) => {}
        }
    }

    /// Carry each marked can `extension` mm past its batter kink along the
    /// leg beyond it, then rebuild any attached leg runs.
    pub fn edit_kjt_can(&mut self, extension: f64) -> JacketResult<()> {
        let edits: Vec<(usize, KjtEdit)> = self.kjt_edits.iter().map(|(i, e)| (*i, *e)).collect();
        for (index, edit) in edits {
            let pair = self.kjoint_pair(index)?;
            let WorldJoint::Placed(left) = &pair.left else {
                continue;
            };
            let kink = self.layout.batter.kink_point(edit.batter);
            let pt2 = kink + self.layout.batter.repair_direction(edit.batter, edit.kink_loc) * extension;
            let kinked = left.clone().extend_kjt_can_and_kink(kink, pt2, edit.kink_loc)?;
            log::info!(
                "kjt_{index} can carried through {} ({}), new end at ({:.1}, {:.1})",
                edit.batter,
                edit.kink_loc,
                pt2.x,
                pt2.y
            );
            self.kjoints.insert(index, JointPair::from_left(kinked.into()));
            self.reattach_legs_at(index)?;
        }
        Ok(())
    }
}
