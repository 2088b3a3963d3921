//! Machining formulas - speed, feed, MRR, chip thinning, power and deflection
//!
//! All inputs are metric unless a [`UnitSystem`] says otherwise. Each formula
//! checks its own domain and refuses to hand back a non-finite value.

use super::{CalculationError, MaterialCategory, Result};
use crate::units::UnitSystem;
use std::f64::consts::PI;

/// Converts (cm³/min × N/mm²) to kW
pub const POWER_CALCULATION_FACTOR: f64 = 60_000.0;

/// Converts kW / RPM to N·m
pub const TORQUE_FACTOR: f64 = 9549.0;

/// Young's modulus of tungsten carbide (Pa)
pub const CARBIDE_YOUNGS_MODULUS: f64 = 600e9;

/// Engagement at or above which there is no chip thinning
pub const CHIP_THINNING_ENGAGEMENT: f64 = 0.5;

/// HSM surface speed multipliers by material family
pub const HSM_MULTIPLIERS: [(MaterialCategory, f64); 5] = [
    (MaterialCategory::Aluminum, 1.25),
    (MaterialCategory::Steel, 1.15),
    (MaterialCategory::Stainless, 1.10),
    (MaterialCategory::Titanium, 1.05),
    (MaterialCategory::CastIron, 1.20),
];

/// HSM multiplier for families without their own entry
pub const HSM_DEFAULT_MULTIPLIER: f64 = 1.15;

/// Reject NaN and infinities at the point they appear
pub(crate) fn ensure_finite(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalculationError::domain(
            field,
            value,
            "calculation produced a non-finite value",
        ))
    }
}

fn positive_diameter(diameter: f64) -> Result<()> {
    if diameter > 0.0 && diameter.is_finite() {
        Ok(())
    } else {
        Err(CalculationError::domain("diameter", diameter, "must be > 0"))
    }
}

/// Spindle RPM from surface speed and tool diameter
///
/// Metric: `RPM = (S × 1000) / (π × D)` with S in m/min and D in mm.
/// Imperial: `RPM = (S × 12) / (π × D)` with S in ft/min and D in inches.
pub fn rpm(surface_speed: f64, diameter: f64, units: UnitSystem) -> Result<f64> {
    positive_diameter(diameter)?;
    let numerator = match units {
        UnitSystem::Metric => surface_speed * 1000.0,
        UnitSystem::Imperial => surface_speed * 12.0,
    };
    ensure_finite("rpm", numerator / (PI * diameter))
}

/// Surface speed from RPM and tool diameter (inverse of [`rpm`])
pub fn surface_speed(rpm: f64, diameter: f64, units: UnitSystem) -> Result<f64> {
    positive_diameter(diameter)?;
    let circumference_per_min = rpm * PI * diameter;
    let speed = match units {
        UnitSystem::Metric => circumference_per_min / 1000.0,
        UnitSystem::Imperial => circumference_per_min / 12.0,
    };
    ensure_finite("surface_speed", speed)
}

/// Feed rate: `Feed = RPM × Z × fz`
pub fn feed_rate(rpm: f64, feed_per_tooth: f64, flute_count: u32) -> Result<f64> {
    ensure_finite("feed_rate", rpm * flute_count as f64 * feed_per_tooth)
}

/// Material removal rate in cm³/min: `MRR = DOC × WOC × Feed / 1000`
pub fn mrr_milling(doc: f64, woc: f64, feed_rate: f64) -> Result<f64> {
    ensure_finite("mrr", doc * woc * feed_rate / 1000.0)
}

/// Radial chip thinning factor (RCTF)
///
/// `RCTF = 1 / √(1 − (1 − 2·ae/D)²)`, and 1.0 at or above 50% engagement.
pub fn chip_thinning_factor(woc: f64, diameter: f64) -> Result<f64> {
    positive_diameter(diameter)?;
    let ae = woc / diameter;
    if !(ae > 0.0) {
        return Err(CalculationError::domain(
            "engagement",
            ae,
            "radial engagement must be > 0",
        ));
    }
    if ae >= CHIP_THINNING_ENGAGEMENT {
        return Ok(1.0);
    }

    let inner = 1.0 - 2.0 * ae;
    let radicand = 1.0 - inner * inner;
    if radicand <= 0.0 {
        return Err(CalculationError::domain(
            "engagement",
            ae,
            "radial engagement too small for chip thinning",
        ));
    }
    ensure_finite("chip_thinning_factor", 1.0 / radicand.sqrt())
}

/// HSM surface speed multiplier for a material family
pub fn hsm_multiplier(category: MaterialCategory) -> f64 {
    HSM_MULTIPLIERS
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, m)| *m)
        .unwrap_or(HSM_DEFAULT_MULTIPLIER)
}

/// Boost surface speed for HSM toolpaths; identity when disabled
pub fn hsm_speed_boost(surface_speed: f64, category: MaterialCategory, enabled: bool) -> f64 {
    if enabled {
        surface_speed * hsm_multiplier(category)
    } else {
        surface_speed
    }
}

/// Scale surface speed by a tool coating multiplier
pub fn coating_speed(surface_speed: f64, multiplier: f64) -> f64 {
    surface_speed * multiplier
}

/// Starting chip load guess: diameter / 200, scaled per material
///
/// Typical material factors: aluminum ~2.0, steel ~1.0, stainless ~0.5.
pub fn chip_load_rule_of_thumb(diameter: f64, material_factor: f64) -> f64 {
    diameter / 200.0 * material_factor
}

/// Theoretical cutting power (kW) at the tool
pub fn cutting_power(mrr: f64, kc: f64) -> Result<f64> {
    ensure_finite("cutting_power", mrr * kc / POWER_CALCULATION_FACTOR)
}

/// Spindle power (kW) needed to deliver the cutting power through the drive
pub fn spindle_power(mrr: f64, kc: f64, efficiency: f64) -> Result<f64> {
    if !(efficiency > 0.0 && efficiency <= 1.0) {
        return Err(CalculationError::domain(
            "efficiency",
            efficiency,
            "must be in (0, 1]",
        ));
    }
    ensure_finite("power", cutting_power(mrr, kc)? / efficiency)
}

/// Spindle torque (N·m): `T = P × 9549 / RPM`
pub fn torque(power_kw: f64, rpm: f64) -> Result<f64> {
    if !(rpm > 0.0) {
        return Err(CalculationError::domain("rpm", rpm, "must be > 0"));
    }
    ensure_finite("torque", power_kw * TORQUE_FACTOR / rpm)
}

/// Cutting force (N) from the chip area model: `F = Kc × DOC × fz`
pub fn cutting_force(kc: f64, doc: f64, feed_per_tooth: f64) -> Result<f64> {
    ensure_finite("cutting_force", kc * doc * feed_per_tooth)
}

/// Extra force on small tools, where the edge radius is large relative to the chip
pub fn micro_size_effect(diameter: f64) -> f64 {
    if diameter < 1.0 {
        1.5
    } else if diameter < 2.0 {
        1.3
    } else {
        1.1
    }
}

/// Second moment of area of a round shank (m⁴), diameter in mm
pub fn moment_of_inertia(diameter: f64) -> f64 {
    let radius_m = diameter / 2.0 / 1000.0;
    PI * radius_m.powi(4) / 4.0
}

/// Cantilever tool tip deflection (mm): `δ = F·L³ / (3·E·I)`
///
/// Force in N, diameter and stickout in mm. The beam equation runs in SI
/// units against the carbide modulus.
pub fn tool_deflection(force: f64, diameter: f64, stickout: f64) -> Result<f64> {
    positive_diameter(diameter)?;
    let stickout_m = stickout / 1000.0;
    let inertia = moment_of_inertia(diameter);
    let deflection_m =
        force * stickout_m.powi(3) / (3.0 * CARBIDE_YOUNGS_MODULUS * inertia);
    ensure_finite("deflection", deflection_m * 1000.0)
}

/// Deflection as a percentage of tool diameter
pub fn deflection_percent(deflection: f64, diameter: f64) -> Result<f64> {
    positive_diameter(diameter)?;
    ensure_finite("deflection_percent", deflection / diameter * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {} ± {}, got {}",
            expected,
            tolerance,
            actual
        );
    }

    #[test]
    fn test_rpm_calculation() {
        // 244 m/min on a 12mm cutter
        let rpm = rpm(244.0, 12.0, UnitSystem::Metric).unwrap();
        assert_close(rpm, 6472.3, 1.0);
    }

    #[test]
    fn test_rpm_imperial() {
        // 1000 SFM on a 1/4" tool, the old 3.82 × SFM / D rule
        let rpm = rpm(1000.0, 0.25, UnitSystem::Imperial).unwrap();
        assert_close(rpm, 15279.0, 1.0);
    }

    #[test]
    fn test_rpm_rejects_zero_diameter() {
        assert!(matches!(
            rpm(244.0, 0.0, UnitSystem::Metric),
            Err(CalculationError::Domain {
                field: "diameter",
                ..
            })
        ));
        assert!(rpm(244.0, -3.0, UnitSystem::Metric).is_err());
    }

    #[test]
    fn test_surface_speed_inverts_rpm() {
        let n = rpm(180.0, 10.0, UnitSystem::Metric).unwrap();
        assert_close(surface_speed(n, 10.0, UnitSystem::Metric).unwrap(), 180.0, 1e-9);

        let n = rpm(600.0, 0.5, UnitSystem::Imperial).unwrap();
        assert_close(surface_speed(n, 0.5, UnitSystem::Imperial).unwrap(), 600.0, 1e-9);
    }

    #[test]
    fn test_feed_calculation() {
        assert_close(feed_rate(6476.0, 0.15, 3).unwrap(), 2914.2, 0.5);
        assert_eq!(feed_rate(10_000.0, 0.05, 2).unwrap(), 1000.0);
    }

    #[test]
    fn test_mrr_calculation() {
        assert_close(mrr_milling(3.0, 8.0, 2914.0).unwrap(), 69.9, 0.5);
    }

    #[test]
    fn test_chip_thinning_table() {
        let d = 10.0;
        assert_close(chip_thinning_factor(5.0, d).unwrap(), 1.00, 0.01);
        assert_close(chip_thinning_factor(3.5, d).unwrap(), 1.05, 0.01);
        assert_close(chip_thinning_factor(2.0, d).unwrap(), 1.25, 0.01);
        // 1/√0.36 = 1.667 exactly; commonly rounded to 1.7 in shop tables
        assert_close(chip_thinning_factor(1.0, d).unwrap(), 1.667, 0.01);
        assert_close(chip_thinning_factor(0.5, d).unwrap(), 2.30, 0.01);
    }

    #[test]
    fn test_chip_thinning_full_slot() {
        assert_eq!(chip_thinning_factor(10.0, 10.0).unwrap(), 1.0);
        assert_eq!(chip_thinning_factor(7.5, 10.0).unwrap(), 1.0);
    }

    #[test]
    fn test_chip_thinning_rejects_zero_engagement() {
        assert!(chip_thinning_factor(0.0, 10.0).is_err());
        assert!(chip_thinning_factor(-1.0, 10.0).is_err());
        assert!(chip_thinning_factor(1.0, 0.0).is_err());
    }

    #[test]
    fn test_chip_thinning_grows_as_engagement_drops() {
        let mut last = 1.0;
        for woc in [4.0, 3.0, 2.0, 1.0, 0.5, 0.1] {
            let factor = chip_thinning_factor(woc, 10.0).unwrap();
            assert!(factor > last, "factor {} at woc {} should exceed {}", factor, woc, last);
            last = factor;
        }
    }

    #[test]
    fn test_hsm_boost() {
        assert_eq!(hsm_speed_boost(100.0, MaterialCategory::Aluminum, false), 100.0);
        assert_close(hsm_speed_boost(100.0, MaterialCategory::Aluminum, true), 125.0, 1e-9);
        assert_close(hsm_speed_boost(100.0, MaterialCategory::Steel, true), 115.0, 1e-9);
        assert_close(hsm_speed_boost(100.0, MaterialCategory::Stainless, true), 110.0, 1e-9);
        assert_close(hsm_speed_boost(100.0, MaterialCategory::Titanium, true), 105.0, 1e-9);
        assert_close(hsm_speed_boost(100.0, MaterialCategory::CastIron, true), 120.0, 1e-9);
        assert_close(hsm_speed_boost(100.0, MaterialCategory::Brass, true), 115.0, 1e-9);
    }

    #[test]
    fn test_rule_of_thumb_chip_load() {
        assert_close(chip_load_rule_of_thumb(10.0, 1.0), 0.05, 1e-12);
        assert_close(chip_load_rule_of_thumb(10.0, 2.0), 0.10, 1e-12);
    }

    #[test]
    fn test_power_and_torque() {
        // 60 cm³/min of 1000 N/mm² material is exactly 1 kW at the tool
        assert_close(cutting_power(60.0, 1000.0).unwrap(), 1.0, 1e-12);
        assert_close(spindle_power(60.0, 1000.0, 0.8).unwrap(), 1.25, 1e-12);
        assert_close(spindle_power(60.0, 1000.0, 1.0).unwrap(), 1.0, 1e-12);
        assert!(spindle_power(60.0, 1000.0, 0.0).is_err());

        assert_close(torque(1.0, 9549.0).unwrap(), 1.0, 1e-12);
        assert!(torque(1.0, 0.0).is_err());
    }

    #[test]
    fn test_cutting_force() {
        assert_close(cutting_force(2000.0, 2.0, 0.05).unwrap(), 200.0, 1e-9);
        assert_eq!(cutting_force(2000.0, 0.0, 0.05).unwrap(), 0.0);
    }

    #[test]
    fn test_deflection_scenario() {
        // 6mm carbide, 20mm stickout, 100 N
        let deflection = tool_deflection(100.0, 6.0, 20.0).unwrap();
        assert_close(deflection, 0.006_99, 0.000_05);

        let percent = deflection_percent(deflection, 6.0).unwrap();
        assert!(percent < 1.0);
    }

    #[test]
    fn test_deflection_scales_with_stickout_cubed() {
        let short = tool_deflection(50.0, 3.0, 10.0).unwrap();
        let long = tool_deflection(50.0, 3.0, 20.0).unwrap();
        assert_close(long / short, 8.0, 1e-9);
    }

    #[test]
    fn test_moment_of_inertia_units() {
        // r = 3mm = 0.003m → π·0.003⁴/4
        assert_close(moment_of_inertia(6.0), 6.3617e-11, 1e-14);
    }

    #[test]
    fn test_size_effect() {
        assert_eq!(micro_size_effect(0.5), 1.5);
        assert_eq!(micro_size_effect(1.5), 1.3);
        assert_eq!(micro_size_effect(2.5), 1.1);
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(feed_rate(f64::INFINITY, 0.05, 2).is_err());
        assert!(mrr_milling(f64::NAN, 1.0, 1.0).is_err());
        assert!(cutting_force(f64::MAX, f64::MAX, 1.0).is_err());
    }
}
