//! Result classification and safety checks
//!
//! Warnings describe a finished result; they never stop one from being
//! returned. [`classify`] is a pure function of its inputs.

use super::formulas::hsm_multiplier;
use super::*;
use crate::units::{mm_to_thou, smm_to_sfm};

/// Deflection (% of diameter) at which surface finish starts to suffer
pub const DEFLECTION_CAUTION_PERCENT: f64 = 1.0;

/// Deflection (% of diameter) at which tool breakage becomes likely
pub const DEFLECTION_DANGER_PERCENT: f64 = 5.0;

/// Fraction of the RPM range treated as "close to the limit"
pub const RPM_CAUTION_MARGIN: f64 = 0.10;

/// Share of rated spindle power that earns a caution
pub const POWER_CAUTION_FRACTION: f64 = 0.90;

/// Chip load (mm/tooth) above which light machines tend to chatter (0.004")
pub const HOBBY_CHIP_LOAD_LIMIT_MM: f64 = 0.1016;

/// Chip load (mm/tooth) that is already pushing a light machine (0.003")
pub const HOBBY_CHIP_LOAD_CAUTION_MM: f64 = 0.0762;

/// Cutting force (N) that risks snapping a micro tool
pub const MICRO_FORCE_LIMIT_N: f64 = 50.0;

/// DOC and WOC (mm) below which the edge rubs instead of cutting
pub const LIGHT_CUT_MM: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Ok,
    Caution,
    Danger,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Ok => write!(f, "OK"),
            Severity::Caution => write!(f, "CAUTION"),
            Severity::Danger => write!(f, "DANGER"),
        }
    }
}

/// Warning categories, in the order they are evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WarningCategory {
    RpmLimit,
    Deflection,
    Engagement,
    MaterialMismatch,
    MachineLimit,
    Rigidity,
    Convergence,
}

impl std::fmt::Display for WarningCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarningCategory::RpmLimit => write!(f, "RPM limit"),
            WarningCategory::Deflection => write!(f, "Deflection"),
            WarningCategory::Engagement => write!(f, "Engagement"),
            WarningCategory::MaterialMismatch => write!(f, "Material"),
            WarningCategory::MachineLimit => write!(f, "Machine limit"),
            WarningCategory::Rigidity => write!(f, "Rigidity"),
            WarningCategory::Convergence => write!(f, "Convergence"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub category: WarningCategory,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Warning {
    fn caution(category: WarningCategory, message: String) -> Self {
        Self {
            category,
            severity: Severity::Caution,
            message,
            suggestion: None,
        }
    }

    fn danger(category: WarningCategory, message: String) -> Self {
        Self {
            category,
            severity: Severity::Danger,
            message,
            suggestion: None,
        }
    }

    fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.category, self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// Worst severity in a set of warnings; `Ok` when there are none
pub fn worst_severity(warnings: &[Warning]) -> Severity {
    warnings
        .iter()
        .map(|w| w.severity)
        .max()
        .unwrap_or(Severity::Ok)
}

/// Check a result against machine limits, material data and safety thresholds
pub fn classify(
    result: &CalculationResult,
    machine: &MachineProfile,
    material: &MaterialProperties,
) -> Vec<Warning> {
    let mut warnings = Vec::new();

    check_rpm(result, machine, &mut warnings);
    check_deflection(result, &mut warnings);
    check_engagement(result, material, &mut warnings);
    check_material(result, material, &mut warnings);
    check_machine(result, machine, &mut warnings);
    check_rigidity(result, machine, material, &mut warnings);
    check_convergence(result, &mut warnings);

    warnings
}

fn check_rpm(result: &CalculationResult, machine: &MachineProfile, warnings: &mut Vec<Warning>) {
    let rpm = result.rpm;
    if rpm > machine.max_rpm {
        warnings.push(
            Warning::danger(
                WarningCategory::RpmLimit,
                format!(
                    "RPM {:.0} exceeds machine maximum {:.0}",
                    rpm, machine.max_rpm
                ),
            )
            .suggest("Reduce surface speed or use a larger tool"),
        );
    } else if rpm < machine.min_rpm {
        warnings.push(
            Warning::danger(
                WarningCategory::RpmLimit,
                format!("RPM {:.0} below machine minimum {:.0}", rpm, machine.min_rpm),
            )
            .suggest("Increase surface speed or use a smaller tool"),
        );
    } else if rpm > machine.max_rpm * (1.0 - RPM_CAUTION_MARGIN) {
        warnings.push(Warning::caution(
            WarningCategory::RpmLimit,
            format!(
                "RPM {:.0} within {:.0}% of machine maximum {:.0}",
                rpm,
                RPM_CAUTION_MARGIN * 100.0,
                machine.max_rpm
            ),
        ));
    } else if rpm < machine.min_rpm * (1.0 + RPM_CAUTION_MARGIN) {
        warnings.push(Warning::caution(
            WarningCategory::RpmLimit,
            format!(
                "RPM {:.0} within {:.0}% of machine minimum {:.0}",
                rpm,
                RPM_CAUTION_MARGIN * 100.0,
                machine.min_rpm
            ),
        ));
    }
}

fn check_deflection(result: &CalculationResult, warnings: &mut Vec<Warning>) {
    let percent = result.deflection_percent;
    if percent > DEFLECTION_DANGER_PERCENT {
        warnings.push(
            Warning::danger(
                WarningCategory::Deflection,
                format!(
                    "Tool deflection {:.4}mm is {:.1}% of diameter, risk of breakage",
                    result.deflection, percent
                ),
            )
            .suggest("Reduce feeds/DOC or shorten stickout"),
        );
    } else if percent >= DEFLECTION_CAUTION_PERCENT {
        warnings.push(
            Warning::caution(
                WarningCategory::Deflection,
                format!(
                    "Tool deflection {:.4}mm is {:.1}% of diameter",
                    result.deflection, percent
                ),
            )
            .suggest("Monitor surface finish"),
        );
    }

    if result.path == CalculationPath::Micro && result.cutting_force > MICRO_FORCE_LIMIT_N {
        warnings.push(
            Warning::danger(
                WarningCategory::Deflection,
                format!(
                    "Cutting force {:.1}N on a {:.2}mm tool, risk of breakage",
                    result.cutting_force, result.diameter
                ),
            )
            .suggest("Reduce DOC or chip load"),
        );
    }
}

fn check_engagement(
    result: &CalculationResult,
    material: &MaterialProperties,
    warnings: &mut Vec<Warning>,
) {
    if result.doc > result.diameter {
        warnings.push(
            Warning::caution(
                WarningCategory::Engagement,
                format!(
                    "DOC {:.3}mm is deeper than the {:.3}mm tool diameter, very aggressive",
                    result.doc, result.diameter
                ),
            )
            .suggest("Take the depth in several passes"),
        );
    }

    if result.doc > 0.0 && result.doc < LIGHT_CUT_MM && result.woc < LIGHT_CUT_MM {
        warnings.push(
            Warning::caution(
                WarningCategory::Engagement,
                format!(
                    "Very light cut ({:.4}mm x {:.4}mm), tool may rub instead of cutting",
                    result.doc, result.woc
                ),
            )
            .suggest("Increase DOC or WOC"),
        );
    }

    let (min, max) = material.chip_load_range;
    let chip = result.chip_thickness;
    if chip < min {
        warnings.push(
            Warning::caution(
                WarningCategory::Engagement,
                format!(
                    "Actual chip thickness {:.4}mm at {:.0}% engagement is below {:.4}mm, tool may rub",
                    chip,
                    result.engagement_ratio * 100.0,
                    min
                ),
            )
            .suggest("Enable chip thinning compensation or increase feed"),
        );
    } else if chip > max {
        warnings.push(
            Warning::caution(
                WarningCategory::Engagement,
                format!(
                    "Actual chip thickness {:.4}mm at {:.0}% engagement exceeds {:.4}mm",
                    chip,
                    result.engagement_ratio * 100.0,
                    max
                ),
            )
            .suggest("Reduce feed per tooth"),
        );
    }
}

fn check_material(
    result: &CalculationResult,
    material: &MaterialProperties,
    warnings: &mut Vec<Warning>,
) {
    // Chip thinning compensation is judged by the engagement check
    let (min_load, max_load) = material.chip_load_range;
    let fz = result.base_feed_per_tooth;
    if fz < min_load || fz > max_load {
        warnings.push(Warning::caution(
            WarningCategory::MaterialMismatch,
            format!(
                "Chip load {:.4}mm outside recommended {:.4}-{:.4}mm for {}",
                fz, min_load, max_load, material.name
            ),
        ));
    }

    let (min_speed, max_speed) = material.surface_speed_range;
    let min_speed = min_speed * material.coating_multiplier;
    let mut max_speed = max_speed * material.coating_multiplier;
    if result.hsm {
        max_speed *= hsm_multiplier(material.category);
    }
    let speed = result.surface_speed;
    if speed < min_speed || speed > max_speed {
        warnings.push(Warning::caution(
            WarningCategory::MaterialMismatch,
            format!(
                "Surface speed {:.0} m/min ({:.0} SFM) outside recommended {:.0}-{:.0} m/min for {}",
                speed,
                smm_to_sfm(speed),
                min_speed,
                max_speed,
                material.name
            ),
        ));
    }
}

fn check_machine(result: &CalculationResult, machine: &MachineProfile, warnings: &mut Vec<Warning>) {
    if let Some(rated) = machine.spindle_power_kw {
        if result.power_kw > rated {
            warnings.push(
                Warning::danger(
                    WarningCategory::MachineLimit,
                    format!(
                        "Required power {:.2}kW exceeds spindle rating {:.2}kW",
                        result.power_kw, rated
                    ),
                )
                .suggest("Reduce DOC, WOC or feed"),
            );
        } else if result.power_kw > rated * POWER_CAUTION_FRACTION {
            warnings.push(Warning::caution(
                WarningCategory::MachineLimit,
                format!(
                    "Required power {:.2}kW is over {:.0}% of spindle rating {:.2}kW",
                    result.power_kw,
                    POWER_CAUTION_FRACTION * 100.0,
                    rated
                ),
            ));
        }
    }

    if let Some(max_feed) = machine.max_feed {
        if result.feed_rate > max_feed {
            warnings.push(
                Warning::danger(
                    WarningCategory::MachineLimit,
                    format!(
                        "Feed {:.0}mm/min exceeds machine maximum {:.0}mm/min",
                        result.feed_rate, max_feed
                    ),
                )
                .suggest("Reduce RPM or feed per tooth"),
            );
        }
    }
}

fn check_rigidity(
    result: &CalculationResult,
    machine: &MachineProfile,
    material: &MaterialProperties,
    warnings: &mut Vec<Warning>,
) {
    let factors = machine.rigidity.factors();

    if result.rpm < factors.min_rpm {
        warnings.push(Warning::caution(
            WarningCategory::Rigidity,
            format!(
                "RPM {:.0} is below {:.0}, the usual minimum for a {} machine",
                result.rpm, factors.min_rpm, machine.rigidity
            ),
        ));
    }

    if machine.rigidity == RigidityClass::Router && material.category.is_steel_family() {
        warnings.push(
            Warning::caution(
                WarningCategory::Rigidity,
                format!(
                    "{} on a router: surface speed held to {:.0} SFM",
                    material.category, factors.steel_sfm_limit
                ),
            )
            .suggest("Light finishing passes only"),
        );
    }

    if machine.rigidity == RigidityClass::DiyMedium
        && material.category.is_steel_family()
        && smm_to_sfm(result.surface_speed) > factors.steel_sfm_limit
    {
        warnings.push(
            Warning::caution(
                WarningCategory::Rigidity,
                format!(
                    "{} at {:.0} SFM on a {} machine, above {:.0} SFM",
                    material.category,
                    smm_to_sfm(result.surface_speed),
                    machine.rigidity,
                    factors.steel_sfm_limit
                ),
            )
            .suggest("Watch for excessive tool wear"),
        );
    }

    if factors.chatter_prone {
        let fz = result.feed_per_tooth;
        if fz > HOBBY_CHIP_LOAD_LIMIT_MM {
            warnings.push(
                Warning::caution(
                    WarningCategory::Rigidity,
                    format!(
                        "Chip load {:.1} thou is high for a {} machine, expect chatter",
                        mm_to_thou(fz),
                        machine.rigidity
                    ),
                )
                .suggest("Keep chip load under 3 thou"),
            );
        } else if fz > HOBBY_CHIP_LOAD_CAUTION_MM {
            warnings.push(
                Warning::caution(
                    WarningCategory::Rigidity,
                    format!(
                        "Chip load {:.1} thou is moderately aggressive for a {} machine",
                        mm_to_thou(fz),
                        machine.rigidity
                    ),
                )
                .suggest("Watch for tool deflection"),
            );
        }
    }
}

fn check_convergence(result: &CalculationResult, warnings: &mut Vec<Warning>) {
    match result.status {
        ConvergenceStatus::Converged => {}
        ConvergenceStatus::NotConverged => warnings.push(
            Warning::caution(
                WarningCategory::Convergence,
                format!(
                    "Deflection did not settle after {} iterations, values are estimates",
                    result.iterations
                ),
            )
            .suggest("Reduce DOC or stickout"),
        ),
        ConvergenceStatus::Diverged => warnings.push(
            Warning::danger(
                WarningCategory::Convergence,
                format!(
                    "Deflection diverged after {} iterations, showing last stable values",
                    result.iterations
                ),
            )
            .suggest("Tool is too flexible for this cut"),
        ),
    }
}
