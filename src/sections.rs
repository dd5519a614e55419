//! Joint and member factories from flat form data, and the full build pipeline
//!
//! Form data is a flat map of `<prefix>_<n>_<field>` keys, e.g. `kjt_2_can_d`,
//! `xjt_1_stub_t` or `brca_3_d1`. Values may be numbers or numeric strings;
//! anything else is read as a missing value.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::elements::{BaySide, BraceStub, Joint2D, JointType, Leg, MemberId};
use crate::error::{JacketError, JacketResult};
use crate::jacket::Jacket;
use crate::layout::JacketParams;
use crate::options::BuildOptions;

/// Flat form data as submitted
pub type FormData = BTreeMap<String, Value>;

/// Field values of one joint or member, keyed by field name
pub type GeomRecord = BTreeMap<String, Option<f64>>;

/// Member families in the form data
pub const MEMBER_PREFIXES: [&str; 4] = ["leg", "brca", "brcb", "brchz"];

fn parse_value(v: &Value) -> Option<f64> {
    let x = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    x.filter(|x| x.is_finite())
}

/// Split `<prefix>_<n>_<field>` keys with the given prefix into per-index records
fn group_by_index(form_data: &FormData, prefix: &str) -> BTreeMap<usize, GeomRecord> {
    let mut out: BTreeMap<usize, GeomRecord> = BTreeMap::new();
    for (key, value) in form_data {
        let mut parts = key.splitn(3, '_');
        let (Some(p), Some(n), Some(field)) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        if p != prefix {
            continue;
        }
        let Ok(index) = n.parse::<usize>() else {
            log::debug!("ignoring form key {key}");
            continue;
        };
        out.entry(index).or_default().insert(field.to_string(), parse_value(value));
    }
    out
}

/// K-joint fields per joint index
pub fn get_kjt_geom_form_data(form_data: &FormData) -> BTreeMap<usize, GeomRecord> {
    group_by_index(form_data, "kjt")
}

/// X-joint fields per joint index
pub fn get_xjt_geom_form_data(form_data: &FormData) -> BTreeMap<usize, GeomRecord> {
    group_by_index(form_data, "xjt")
}

/// Member fields per family prefix and index
pub fn get_member_geom_form_data(form_data: &FormData) -> BTreeMap<&'static str, BTreeMap<usize, GeomRecord>> {
    MEMBER_PREFIXES
        .iter()
        .map(|p| (*p, group_by_index(form_data, p)))
        .filter(|(_, v)| !v.is_empty())
        .collect()
}

fn field(record: &GeomRecord, name: &str) -> Option<f64> {
    record.get(name).copied().flatten()
}

fn required(record: &GeomRecord, owner: &str, name: &str) -> JacketResult<f64> {
    field(record, name).ok_or_else(|| JacketError::InvalidInput(format!("{owner}: {name} is missing or not a number")))
}

/// K-joints from form records. Stubs are read in order and must be numbered
/// without gaps; a stub needs both diameter and thickness.
pub fn create_2d_kjoint_data(kjt_geom_data: &BTreeMap<usize, GeomRecord>, joint_gap: f64) -> JacketResult<Vec<Joint2D>> {
    kjt_geom_data
        .iter()
        .map(|(&index, rec)| {
            let name = format!("kjt_{index}");
            let dc = required(rec, &name, "can_d")?;
            let tc = required(rec, &name, "can_t")?;

            let mut stubs = Vec::new();
            let mut gap_seen = false;
            for i in 1..=3 {
                let (d_key, t_key) = (format!("stub_{i}_d"), format!("stub_{i}_t"));
                match field(rec, &d_key) {
                    Some(d) => {
                        if gap_seen {
                            return Err(JacketError::InvalidInput(format!(
                                "{name}: stub {i} given without stub {}",
                                i - 1
                            )));
                        }
                        stubs.push(BraceStub::new(d, required(rec, &name, &t_key)?));
                    }
                    None => gap_seen = true,
                }
            }

            let mut stubs = stubs.into_iter();
            let first = stubs
                .next()
                .ok_or_else(|| JacketError::InvalidInput(format!("{name}: stub_1_d is missing or not a number")))?;
            let mut joint = Joint2D::new(JointType::K, index, dc, tc, first).with_joint_gap(joint_gap);
            for stub in stubs {
                joint = joint.with_brace(stub)?;
            }
            Ok(joint)
        })
        .collect()
}

/// X-joints from form records; both stubs share one section
pub fn create_2d_xjoint_data(xjt_geom_data: &BTreeMap<usize, GeomRecord>) -> JacketResult<Vec<Joint2D>> {
    xjt_geom_data
        .iter()
        .map(|(&index, rec)| {
            let name = format!("xjt_{index}");
            let stub = BraceStub::new(required(rec, &name, "stub_d")?, required(rec, &name, "stub_t")?);
            Joint2D::new(
                JointType::X,
                index,
                required(rec, &name, "can_d")?,
                required(rec, &name, "can_t")?,
                stub,
            )
            .with_brace(stub)
        })
        .collect()
}

/// Unattached legs and braces from member records. Each `brca`/`brcb` entry
/// yields both the left and right brace of its bay. `d2` defaults to `d1`.
pub fn create_2d_member_data(member_geom_data: &BTreeMap<&'static str, BTreeMap<usize, GeomRecord>>) -> JacketResult<Vec<Leg>> {
    let mut members = Vec::new();
    for (&prefix, records) in member_geom_data {
        for (&n, rec) in records {
            let owner = format!("{prefix}_{n}");
            let d1 = required(rec, &owner, "d1")?;
            let d2 = field(rec, "d2").unwrap_or(d1);
            let t = required(rec, &owner, "t")?;
            let ids = match prefix {
                "leg" => vec![MemberId::Leg(n)],
                "brca" => vec![MemberId::BraceA(n, BaySide::L), MemberId::BraceA(n, BaySide::R)],
                "brcb" => vec![MemberId::BraceB(n, BaySide::L), MemberId::BraceB(n, BaySide::R)],
                "brchz" => vec![MemberId::BraceHz(n)],
                other => return Err(JacketError::InvalidInput(format!("unknown member family {other}"))),
            };
            members.extend(ids.into_iter().map(|id| Leg::new(id, d1, d2, t)));
        }
    }
    Ok(members)
}

/// Build a complete jacket elevation from its parameters and section form data.
///
/// Joints are placed first, then cans are checked against the batter kinks and
/// repaired, then legs and braces are run between the final joint positions.
pub fn build_jacket(params: &JacketParams, form_data: &FormData, options: BuildOptions) -> JacketResult<Jacket> {
    let mut jacket = Jacket::new(params, options)?;
    let n_bays = jacket.n_bays();

    let kjoints = create_2d_kjoint_data(&get_kjt_geom_form_data(form_data), jacket.options().joint_gap)?;
    let xjoints = create_2d_xjoint_data(&get_xjt_geom_form_data(form_data))?;
    if let Some(i) = (1..=n_bays + 1).find(|i| !kjoints.iter().any(|j| j.index == *i)) {
        return Err(JacketError::JointNotFound(format!("kjt_{i}: no section data")));
    }
    if let Some(i) = (1..=n_bays).find(|i| !xjoints.iter().any(|j| j.index == *i)) {
        return Err(JacketError::JointNotFound(format!("xjt_{i}: no section data")));
    }
    for joint in kjoints.into_iter().chain(xjoints) {
        jacket.add_joint_obj(joint)?;
    }

    jacket.kjt_warnings_check()?;

    let members = create_2d_member_data(&get_member_geom_form_data(form_data))?;
    let (mut legs, mut braces_a, mut braces_b, mut braces_hz) = (vec![], vec![], vec![], vec![]);
    for m in members {
        match m.id {
            MemberId::Leg(_) => legs.push(m),
            MemberId::BraceA(..) => braces_a.push(m),
            MemberId::BraceB(..) => braces_b.push(m),
            MemberId::BraceHz(_) => braces_hz.push(m),
        }
    }
    if let Some(n) = (1..=n_bays + 1).find(|n| !legs.iter().any(|l| l.id == MemberId::Leg(*n))) {
        return Err(JacketError::MemberNotFound(format!("leg_{n}: no section data")));
    }
    for n in 1..=n_bays {
        if !braces_a.iter().any(|b| b.id == MemberId::BraceA(n, BaySide::L)) {
            return Err(JacketError::MemberNotFound(format!("brca_{n}: no section data")));
        }
        if !braces_b.iter().any(|b| b.id == MemberId::BraceB(n, BaySide::L)) {
            return Err(JacketError::MemberNotFound(format!("brcb_{n}: no section data")));
        }
        let needs_hz = jacket.layout().bay_horizontals.get(n).copied().unwrap_or(false);
        if needs_hz && !braces_hz.iter().any(|b| b.id == MemberId::BraceHz(n)) {
            return Err(JacketError::MemberNotFound(format!("brchz_{n}: no section data")));
        }
    }

    for leg in legs {
        jacket.add_leg_obj(leg)?;
    }
    for brace in braces_a {
        jacket.add_brace_a_obj(brace)?;
    }
    for brace in braces_b {
        jacket.add_brace_b_obj(brace)?;
    }
    for brace in braces_hz {
        jacket.add_brace_hz_obj(brace)?;
    }

    log::info!(
        "jacket built: {} joints, {} leg runs, {} braces, {} design warnings",
        jacket.joint_objs().len(),
        jacket.leg_objs().len(),
        jacket.brace_a_objs().len() + jacket.brace_b_objs().len() + jacket.brace_hz_objs().len(),
        jacket.warnings().len()
    );
    Ok(jacket)
}
