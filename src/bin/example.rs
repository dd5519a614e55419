//! Jacket geometry example: a two-batter, three-bay jacket

use jacket_geom::api::JacketRequest;
use jacket_geom::prelude::*;

const REQUEST: &str = include_str!("../../demos/jacket_request.json");

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("=== Jacket Geometry Example: Two-Batter Jacket ===\n");

    let request: JacketRequest = serde_json::from_str(REQUEST)?;
    let jacket = build_jacket(&request.jacket, &request.form_data, request.options.clone())?;
    let layout = jacket.layout();

    println!(
        "Batter 1: {:.3} deg at {:.0} mm, width {:.0} mm",
        layout.batter.batter_1_theta, layout.batter.batter_1_elev, layout.batter.batter_1_width
    );
    println!(
        "Batter 2: {:.3} deg at {:.0} mm, width {:.0} mm\n",
        layout.batter.batter_2_theta, layout.batter.batter_2_elev, layout.batter.batter_2_width
    );

    println!("{:<8} {:>10} {:>10} {:>8} {:>8}", "Joint", "Elev", "Width", "Braces", "Can");
    for k in &layout.kjoints {
        let can = jacket
            .kjoint(k.index)
            .and_then(|p| p.left.placed().joint().can_length())
            .unwrap_or(0.0);
        println!(
            "{:<8} {:>10.0} {:>10.0} {:>8} {:>8.0}",
            k.name(),
            k.elev,
            k.width,
            k.n_braces,
            can
        );
    }
    for x in &layout.xjoints {
        println!("{:<8} {:>10.0} {:>10} {:>8} angle {:.2} deg", x.name(), x.elev, "-", 2, x.angle);
    }

    if jacket.warnings().is_empty() {
        println!("\nNo design conflicts");
    } else {
        println!("\nDesign conflicts:");
        for (key, w) in jacket.warnings() {
            println!("  [{:?}] {}: {}", w.flag, key, w.message);
        }
    }

    let mto = MassTakeoff::from_jacket(&jacket)?;
    println!("\nMaterial take-off:");
    for (location, mass) in mto.totals_by_location() {
        println!("  {:<8} {:>8.1} t", location, mass);
    }
    println!("  {:<8} {:>8.1} t", "TOTAL", mto.total_mass());

    Ok(())
}
