//! JSON request and response records for the HTTP and WASM front ends

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::elements::{BraceId, Leg, WorldJoint};
use crate::error::JacketResult;
use crate::geom::{Point, Polygon};
use crate::jacket::{DesignWarning, Jacket};
use crate::layout::{JacketLayout, JacketParams};
use crate::mass::{MassSection, MassTakeoff};
use crate::options::BuildOptions;
use crate::sections::{build_jacket, FormData};

#[derive(Debug, Clone, Deserialize)]
pub struct JacketRequest {
    pub jacket: JacketParams,
    /// Flat section form data (`kjt_1_can_d`, `leg_2_t`, ...)
    pub form_data: FormData,
    #[serde(default)]
    pub options: BuildOptions,
    #[serde(default = "default_true")]
    pub include_mass: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct JacketResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<JacketResults>,
}

#[derive(Debug, Serialize)]
pub struct JacketResults {
    pub layout: LayoutData,
    pub joints: Vec<JointData>,
    pub members: Vec<MemberData>,
    pub warnings: BTreeMap<String, DesignWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mass: Option<MassData>,
}

#[derive(Debug, Serialize)]
pub struct LayoutData {
    pub batter_1_theta: f64,
    pub batter_1_elev: f64,
    pub batter_1_width: f64,
    pub batter_2_theta: f64,
    pub batter_2_elev: f64,
    pub batter_2_width: f64,
    pub pile_top_elev: f64,
    pub kjt_elevs: BTreeMap<String, f64>,
    pub kjt_widths: BTreeMap<String, f64>,
    pub kjt_wps: BTreeMap<String, Point>,
    pub kjt_batter_angles: BTreeMap<String, f64>,
    pub kjt_brace_angles: BTreeMap<String, [Option<f64>; 3]>,
    pub kjt_n_braces: BTreeMap<String, usize>,
    pub xjt_elevs: BTreeMap<String, f64>,
    pub xjt_angles: BTreeMap<String, f64>,
    pub xjt_wps: BTreeMap<String, Point>,
}

impl From<&JacketLayout> for LayoutData {
    fn from(layout: &JacketLayout) -> Self {
        let b = &layout.batter;
        Self {
            batter_1_theta: b.batter_1_theta,
            batter_1_elev: b.batter_1_elev,
            batter_1_width: b.batter_1_width,
            batter_2_theta: b.batter_2_theta,
            batter_2_elev: b.batter_2_elev,
            batter_2_width: b.batter_2_width,
            pile_top_elev: b.pile_top_elev,
            kjt_elevs: layout.kjt_elevs(),
            kjt_widths: layout.kjt_widths(),
            kjt_wps: layout.kjt_wps(),
            kjt_batter_angles: layout.kjt_batter_angles(),
            kjt_brace_angles: layout.kjt_brace_angles(),
            kjt_n_braces: layout.kjt_n_braces(),
            xjt_elevs: layout.xjt_elevs(),
            xjt_angles: layout.xjt_angles(),
            xjt_wps: layout.xjt_wps(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JointData {
    pub name: String,
    pub mirror: bool,
    pub kinked_can: bool,
    pub can: Vec<Polygon>,
    pub stubs: BTreeMap<BraceId, Polygon>,
    pub can_pt_top: Point,
    pub can_pt_btm: Point,
}

impl From<&WorldJoint> for JointData {
    fn from(joint: &WorldJoint) -> Self {
        let p = joint.placed();
        let polys = p.joint_poly_coords_transf();
        Self {
            name: p.name(),
            mirror: p.mirror,
            kinked_can: joint.kinked_can(),
            can: polys.can.clone(),
            stubs: polys.stubs.clone(),
            can_pt_top: p.can_pt_top(),
            can_pt_btm: p.can_pt_btm(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberData {
    pub name: String,
    pub mirror: bool,
    pub pts: Vec<Point>,
    /// Centreline length in mm, cone included
    pub length: f64,
    pub leg_a: Vec<Polygon>,
    pub leg_b: Vec<Polygon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cone: Option<Polygon>,
}

impl From<&Leg> for MemberData {
    fn from(leg: &Leg) -> Self {
        Self {
            name: leg.name(),
            mirror: leg.is_mirror(),
            pts: leg.pts().to_vec(),
            length: leg.centreline_length(),
            leg_a: leg.leg_a_poly_coords().to_vec(),
            leg_b: leg.leg_b_poly_coords().to_vec(),
            cone: leg.cone_poly_coords().cloned(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MassData {
    pub total: f64,
    pub totals_by_location: BTreeMap<String, f64>,
    pub sections: Vec<MassSection>,
}

impl From<MassTakeoff> for MassData {
    fn from(mto: MassTakeoff) -> Self {
        Self {
            total: mto.total_mass(),
            totals_by_location: mto.totals_by_location(),
            sections: mto.sections,
        }
    }
}

impl JacketResults {
    pub fn from_jacket(jacket: &Jacket, include_mass: bool) -> JacketResult<Self> {
        let members = jacket
            .leg_objs()
            .into_iter()
            .chain(jacket.brace_a_objs())
            .chain(jacket.brace_b_objs())
            .chain(jacket.brace_hz_objs())
            .map(MemberData::from)
            .collect();
        let mass = if include_mass {
            Some(MassTakeoff::from_jacket(jacket)?.into())
        } else {
            None
        };
        Ok(Self {
            layout: jacket.layout().into(),
            joints: jacket.joint_objs().into_iter().map(JointData::from).collect(),
            members,
            warnings: jacket.warnings().clone(),
            mass,
        })
    }
}

fn run_request_inner(request: JacketRequest) -> JacketResult<JacketResults> {
    let jacket = build_jacket(&request.jacket, &request.form_data, request.options)?;
    JacketResults::from_jacket(&jacket, request.include_mass)
}

/// Build the jacket a request describes
pub fn run_request(request: JacketRequest) -> JacketResponse {
    match run_request_inner(request) {
        Ok(results) => JacketResponse {
            success: true,
            error: None,
            results: Some(results),
        },
        Err(e) => {
            log::error!("jacket build failed: {e}");
            JacketResponse {
                success: false,
                error: Some(e.to_string()),
                results: None,
            }
        }
    }
}

/// JSON in, JSON out
pub fn handle_json(request_json: &str) -> String {
    let response = match serde_json::from_str::<JacketRequest>(request_json) {
        Ok(request) => run_request(request),
        Err(e) => JacketResponse {
            success: false,
            error: Some(format!("Failed to parse request: {}", e)),
            results: None,
        },
    };
    serde_json::to_string(&response)
        .unwrap_or_else(|e| format!(r#"{{"success":false,"error":"Serialization failed: {}"}}"#, e))
}
