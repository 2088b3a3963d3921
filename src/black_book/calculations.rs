//! Cutting parameter calculations
//!
//! `calculate` runs the pipeline: validate inputs, scale them for machine
//! rigidity, apply coating/HSM speed changes and chip thinning, pick a
//! strategy by tool diameter, evaluate, then classify the result.

use super::formulas::{
    chip_thinning_factor, coating_speed, cutting_force, deflection_percent, ensure_finite,
    feed_rate, hsm_speed_boost, micro_size_effect, mrr_milling, rpm, spindle_power,
    tool_deflection, torque,
};
use super::micro::{self, Convergence, Sample};
use super::*;
use crate::config::ConfigError;
use crate::units::UnitSystem;
use tracing::trace;

/// Tools below this diameter (mm) take the iterative micro path
pub const MICRO_TOOL_THRESHOLD_MM: f64 = 3.0;

/// Everything both strategies share, resolved once per calculation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutSetup {
    pub tool: Tool,
    pub kc: f64,
    /// Spindle drive efficiency in use
    pub efficiency: f64,
    pub hsm: bool,
    /// Effective surface speed after coating, HSM and rigidity limits (m/min)
    pub surface_speed: f64,
    pub rpm: f64,
    pub rpm_within_limits: bool,
    /// Rigidity-adjusted chip load before compensation (mm/tooth)
    pub base_feed_per_tooth: f64,
    /// Chip load to program, compensated when chip thinning is active
    pub feed_per_tooth: f64,
    pub base_feed_rate: f64,
    pub feed_rate: f64,
    pub doc: f64,
    pub woc: f64,
    pub engagement_ratio: f64,
    /// Radial chip thinning at this engagement, applied or not
    pub rctf: f64,
    /// Factor actually applied to the feed
    pub chip_thinning_factor: f64,
}

impl CutSetup {
    /// Validate inputs and run every stage that comes before strategy selection
    pub fn prepare(
        tool: &Tool,
        params: &CuttingParameters,
        machine: &MachineProfile,
        material: &MaterialProperties,
    ) -> Result<Self> {
        tool.validate()?;
        params.validate(tool)?;
        machine.validate()?;
        material.validate()?;

        let adjusted = adjust_for_rigidity(params, machine.rigidity, material.category);

        let mut surface_speed = coating_speed(adjusted.surface_speed, material.coating_multiplier);
        surface_speed = hsm_speed_boost(surface_speed, material.category, params.hsm);
        if let Some(ceiling) = adjusted.surface_speed_ceiling {
            surface_speed = surface_speed.min(ceiling);
        }
        let surface_speed = ensure_finite("surface_speed", surface_speed)?;

        let rctf = chip_thinning_factor(adjusted.woc, tool.diameter)?;
        let applied = if params.chip_thinning_active() {
            rctf
        } else {
            1.0
        };
        let feed_per_tooth = ensure_finite("feed_per_tooth", adjusted.feed_per_tooth * applied)?;

        let rpm = rpm(surface_speed, tool.diameter, UnitSystem::Metric)?;
        let base_feed_rate = feed_rate(rpm, adjusted.feed_per_tooth, tool.flute_count)?;
        let feed = feed_rate(rpm, feed_per_tooth, tool.flute_count)?;

        trace!(
            surface_speed,
            rpm,
            rctf,
            feed_per_tooth,
            feed_rate = feed,
            "cut setup"
        );

        Ok(Self {
            tool: *tool,
            kc: material.kc,
            efficiency: machine.effective_efficiency(),
            hsm: params.hsm,
            surface_speed,
            rpm,
            rpm_within_limits: rpm >= machine.min_rpm && rpm <= machine.max_rpm,
            base_feed_per_tooth: adjusted.feed_per_tooth,
            feed_per_tooth,
            base_feed_rate,
            feed_rate: feed,
            doc: adjusted.doc,
            woc: adjusted.woc,
            engagement_ratio: adjusted.woc / tool.diameter,
            rctf,
            chip_thinning_factor: applied,
        })
    }

    /// Force and deflection at a given depth of cut
    fn sample(&self, doc: f64, force_multiplier: f64) -> Result<Sample> {
        let force = ensure_finite(
            "cutting_force",
            cutting_force(self.kc, doc, self.feed_per_tooth)? * force_multiplier,
        )?;
        let deflection = tool_deflection(force, self.tool.diameter, self.tool.stickout)?;
        Ok(Sample {
            doc,
            force,
            deflection,
        })
    }
}

/// Calculation strategy, chosen once from the tool diameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalculationStrategy {
    /// Single pass
    Standard(CutSetup),
    /// Deflection/force fixed point
    Micro(CutSetup),
}

impl CalculationStrategy {
    pub fn select(setup: CutSetup) -> Self {
        if setup.tool.diameter < MICRO_TOOL_THRESHOLD_MM {
            CalculationStrategy::Micro(setup)
        } else {
            CalculationStrategy::Standard(setup)
        }
    }

    pub fn path(&self) -> CalculationPath {
        match self {
            CalculationStrategy::Standard(_) => CalculationPath::Standard,
            CalculationStrategy::Micro(_) => CalculationPath::Micro,
        }
    }

    /// Evaluate the cut; warnings are left for the classifier
    pub fn evaluate(&self, settings: &EngineSettings) -> Result<CalculationResult> {
        match self {
            CalculationStrategy::Standard(setup) => {
                let sample = setup.sample(setup.doc, 1.0)?;
                let convergence = Convergence {
                    sample,
                    status: ConvergenceStatus::Converged,
                    iterations: 1,
                    history: vec![sample.deflection],
                };
                finish(setup, self.path(), convergence)
            }
            CalculationStrategy::Micro(setup) => {
                let multiplier = if settings.micro_size_effect {
                    micro_size_effect(setup.tool.diameter)
                } else {
                    1.0
                };
                let convergence = micro::solve(
                    setup.doc,
                    setup.tool.diameter,
                    &settings.convergence,
                    |doc| setup.sample(doc, multiplier),
                )?;
                finish(setup, self.path(), convergence)
            }
        }
    }
}

/// Derive removal rate, power and torque from the final depth of cut
fn finish(
    setup: &CutSetup,
    path: CalculationPath,
    convergence: Convergence,
) -> Result<CalculationResult> {
    let Convergence {
        sample,
        status,
        iterations,
        history,
    } = convergence;

    let mrr = mrr_milling(sample.doc, setup.woc, setup.feed_rate)?;
    let power_kw = spindle_power(mrr, setup.kc, setup.efficiency)?;
    let torque_nm = torque(power_kw, setup.rpm)?;
    let deflection_percent = deflection_percent(sample.deflection, setup.tool.diameter)?;
    let chip_thickness = ensure_finite("chip_thickness", setup.feed_per_tooth / setup.rctf)?;

    Ok(CalculationResult {
        path,
        diameter: setup.tool.diameter,
        rpm: setup.rpm,
        rpm_within_limits: setup.rpm_within_limits,
        surface_speed: setup.surface_speed,
        hsm: setup.hsm,
        base_feed_per_tooth: setup.base_feed_per_tooth,
        feed_per_tooth: setup.feed_per_tooth,
        chip_thickness,
        base_feed_rate: setup.base_feed_rate,
        feed_rate: setup.feed_rate,
        doc: sample.doc,
        woc: setup.woc,
        engagement_ratio: setup.engagement_ratio,
        chip_thinning_factor: setup.chip_thinning_factor,
        mrr,
        cutting_force: sample.force,
        deflection: sample.deflection,
        deflection_percent,
        power_kw,
        torque_nm,
        status,
        iterations,
        deflection_history: history,
        warnings: Vec::new(),
    })
}

/// Calculate cutting parameters with default engine settings
pub fn calculate(
    tool: &Tool,
    params: &CuttingParameters,
    machine: &MachineProfile,
    material: &MaterialProperties,
) -> Result<CalculationResult> {
    calculate_with(&EngineSettings::default(), tool, params, machine, material)
}

/// Calculate cutting parameters
///
/// Fails only on invalid inputs, invalid settings or a non-finite
/// intermediate. Convergence trouble and unsafe values come back as warnings
/// on the result.
pub fn calculate_with(
    settings: &EngineSettings,
    tool: &Tool,
    params: &CuttingParameters,
    machine: &MachineProfile,
    material: &MaterialProperties,
) -> Result<CalculationResult> {
    // Settings validation only ever reports an invalid value
    if let Err(ConfigError::Invalid {
        field,
        value,
        reason,
    }) = settings.validate()
    {
        return Err(CalculationError::domain(field, value, reason));
    }

    let setup = CutSetup::prepare(tool, params, machine, material)?;
    let strategy = CalculationStrategy::select(setup);
    trace!(path = %strategy.path(), diameter = tool.diameter, "strategy selected");

    let mut result = strategy.evaluate(settings)?;
    result.warnings = classify(&result, machine, material);
    Ok(result)
}
