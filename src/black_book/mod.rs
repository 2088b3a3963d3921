//! The Black Book - Cutting Parameter Engine
//!
//! Computes spindle speed, feeds, MRR, cutting force, tool deflection, power
//! and torque for a milling cut. All calculations account for:
//! - Machine rigidity (router, hobby VMC, industrial VMC)
//! - Radial chip thinning and HSM surface speed boosts
//! - Tool coating speed multipliers
//! - Tool deflection, solved iteratively for micro tools (< 3 mm)
//!
//! Every call is a pure function of its inputs. Nothing is cached or shared
//! between calls, so results are reproducible bit for bit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EngineSettings;

pub mod calculations;
pub mod formulas;
pub mod materials;
pub mod micro;
pub mod rigidity;
pub mod validators;

pub use calculations::*;
pub use materials::*;
pub use rigidity::*;
pub use validators::*;

/// Errors that stop a calculation; nothing is returned alongside them
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalculationError {
    #[error("invalid {field}: {value} ({reason})")]
    Domain {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("unknown material: {0}")]
    MaterialLookup(String),
}

impl CalculationError {
    pub fn domain(field: &'static str, value: f64, reason: &'static str) -> Self {
        Self::Domain {
            field,
            value,
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, CalculationError>;

/// Cutting tool geometry (mm)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub diameter: f64,
    pub flute_count: u32,
    /// Unsupported length from holder to tip
    pub stickout: f64,
}

impl Tool {
    pub fn new(diameter: f64, flute_count: u32, stickout: f64) -> Self {
        Self {
            diameter,
            flute_count,
            stickout,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.diameter > 0.0 && self.diameter.is_finite()) {
            return Err(CalculationError::domain(
                "diameter",
                self.diameter,
                "must be > 0",
            ));
        }
        if self.flute_count < 1 {
            return Err(CalculationError::domain(
                "flute_count",
                self.flute_count as f64,
                "must be >= 1",
            ));
        }
        if !(self.stickout > 0.0 && self.stickout.is_finite()) {
            return Err(CalculationError::domain(
                "stickout",
                self.stickout,
                "must be > 0",
            ));
        }
        Ok(())
    }
}

/// Operator-chosen cutting parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CuttingParameters {
    /// Axial depth of cut (mm)
    pub doc: f64,
    /// Radial width of cut (mm)
    pub woc: f64,
    /// Surface speed (m/min)
    pub surface_speed: f64,
    /// Feed per tooth (mm/tooth)
    pub feed_per_tooth: f64,
    pub hsm: bool,
    pub chip_thinning: bool,
}

impl CuttingParameters {
    pub fn new(doc: f64, woc: f64, surface_speed: f64, feed_per_tooth: f64) -> Self {
        Self {
            doc,
            woc,
            surface_speed,
            feed_per_tooth,
            hsm: false,
            chip_thinning: false,
        }
    }

    pub fn with_hsm(mut self, enabled: bool) -> Self {
        self.hsm = enabled;
        self
    }

    pub fn with_chip_thinning(mut self, enabled: bool) -> Self {
        self.chip_thinning = enabled;
        self
    }

    /// HSM always runs with chip thinning compensation
    pub fn chip_thinning_active(&self) -> bool {
        self.chip_thinning || self.hsm
    }

    pub fn validate(&self, tool: &Tool) -> Result<()> {
        if !(self.doc >= 0.0 && self.doc.is_finite()) {
            return Err(CalculationError::domain("doc", self.doc, "must be >= 0"));
        }
        if !(self.woc > 0.0 && self.woc.is_finite()) {
            return Err(CalculationError::domain("woc", self.woc, "must be > 0"));
        }
        if self.woc > tool.diameter {
            return Err(CalculationError::domain(
                "woc",
                self.woc,
                "must not exceed tool diameter",
            ));
        }
        if !(self.surface_speed > 0.0 && self.surface_speed.is_finite()) {
            return Err(CalculationError::domain(
                "surface_speed",
                self.surface_speed,
                "must be > 0",
            ));
        }
        if !(self.feed_per_tooth > 0.0 && self.feed_per_tooth.is_finite()) {
            return Err(CalculationError::domain(
                "feed_per_tooth",
                self.feed_per_tooth,
                "must be > 0",
            ));
        }
        Ok(())
    }
}

/// Machine settings supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MachineProfile {
    pub rigidity: RigidityClass,
    pub min_rpm: f64,
    pub max_rpm: f64,
    /// Spindle drive efficiency; the rigidity class default applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficiency: Option<f64>,
    /// Rated spindle power (kW)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spindle_power_kw: Option<f64>,
    /// Maximum programmable feed (mm/min)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_feed: Option<f64>,
}

impl MachineProfile {
    pub fn new(rigidity: RigidityClass, min_rpm: f64, max_rpm: f64) -> Self {
        Self {
            rigidity,
            min_rpm,
            max_rpm,
            efficiency: None,
            spindle_power_kw: None,
            max_feed: None,
        }
    }

    pub fn with_efficiency(mut self, efficiency: f64) -> Self {
        self.efficiency = Some(efficiency);
        self
    }

    pub fn with_spindle_power(mut self, kw: f64) -> Self {
        self.spindle_power_kw = Some(kw);
        self
    }

    pub fn with_max_feed(mut self, feed: f64) -> Self {
        self.max_feed = Some(feed);
        self
    }

    /// Efficiency used for spindle power
    pub fn effective_efficiency(&self) -> f64 {
        self.efficiency
            .unwrap_or(self.rigidity.factors().power_efficiency)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min_rpm >= 0.0 && self.min_rpm.is_finite()) {
            return Err(CalculationError::domain(
                "min_rpm",
                self.min_rpm,
                "must be >= 0",
            ));
        }
        if !(self.max_rpm >= self.min_rpm && self.max_rpm.is_finite()) {
            return Err(CalculationError::domain(
                "max_rpm",
                self.max_rpm,
                "must be >= min_rpm",
            ));
        }
        let efficiency = self.effective_efficiency();
        if !(efficiency > 0.0 && efficiency <= 1.0) {
            return Err(CalculationError::domain(
                "efficiency",
                efficiency,
                "must be in (0, 1]",
            ));
        }
        if let Some(kw) = self.spindle_power_kw {
            if !(kw > 0.0 && kw.is_finite()) {
                return Err(CalculationError::domain(
                    "spindle_power_kw",
                    kw,
                    "must be > 0",
                ));
            }
        }
        if let Some(feed) = self.max_feed {
            if !(feed > 0.0 && feed.is_finite()) {
                return Err(CalculationError::domain("max_feed", feed, "must be > 0"));
            }
        }
        Ok(())
    }
}

/// Which calculator produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalculationPath {
    Standard,
    Micro,
}

impl std::fmt::Display for CalculationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalculationPath::Standard => write!(f, "Standard"),
            CalculationPath::Micro => write!(f, "Micro"),
        }
    }
}

/// How the deflection solve ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    Converged,
    /// Iteration limit reached; values are the last estimate
    NotConverged,
    /// Deflection ran away; values are the last stable estimate
    Diverged,
}

/// Complete output of one calculation
///
/// Surface speed, chip load, DOC and WOC are the effective values after
/// rigidity adjustment, boosts and (micro tools) deflection relief.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationResult {
    pub path: CalculationPath,
    /// Tool diameter the result was computed for (mm)
    pub diameter: f64,
    /// Computed spindle speed, never clamped
    pub rpm: f64,
    /// Whether `rpm` lies within the machine's [min, max]
    pub rpm_within_limits: bool,
    /// Effective surface speed (m/min)
    pub surface_speed: f64,
    pub hsm: bool,
    /// Rigidity-adjusted chip load before compensation (mm/tooth)
    pub base_feed_per_tooth: f64,
    /// Programmed feed per tooth after compensation (mm/tooth)
    pub feed_per_tooth: f64,
    /// Resulting maximum chip thickness at this engagement (mm)
    pub chip_thickness: f64,
    /// Feed before chip thinning compensation (mm/min)
    pub base_feed_rate: f64,
    /// Feed to program (mm/min)
    pub feed_rate: f64,
    pub doc: f64,
    pub woc: f64,
    /// WOC / diameter
    pub engagement_ratio: f64,
    /// Factor applied to the feed; 1.0 when compensation is off
    pub chip_thinning_factor: f64,
    /// Material removal rate (cm³/min)
    pub mrr: f64,
    /// Cutting force (N)
    pub cutting_force: f64,
    /// Tool tip deflection (mm)
    pub deflection: f64,
    pub deflection_percent: f64,
    /// Spindle power (kW)
    pub power_kw: f64,
    /// Spindle torque (N·m)
    pub torque_nm: f64,
    pub status: ConvergenceStatus,
    pub iterations: u32,
    /// Deflection after each iteration (mm)
    pub deflection_history: Vec<f64>,
    pub warnings: Vec<Warning>,
}

impl CalculationResult {
    pub fn converged(&self) -> bool {
        self.status == ConvergenceStatus::Converged
    }

    /// Worst severity among the warnings
    pub fn severity(&self) -> Severity {
        worst_severity(&self.warnings)
    }
}

/// Calculation engine with its settings and a material source
pub struct BlackBook<L: MaterialLookup = MaterialCatalog> {
    materials: L,
    settings: EngineSettings,
}

impl BlackBook<MaterialCatalog> {
    pub fn new() -> Self {
        Self::with_lookup(MaterialCatalog::new())
    }
}

impl Default for BlackBook<MaterialCatalog> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: MaterialLookup> BlackBook<L> {
    pub fn with_lookup(materials: L) -> Self {
        Self {
            materials,
            settings: EngineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn materials(&self) -> &L {
        &self.materials
    }

    /// Look up a material and calculate cutting parameters for it
    pub fn calculate(
        &self,
        material_id: &str,
        tool: &Tool,
        params: &CuttingParameters,
        machine: &MachineProfile,
    ) -> Result<CalculationResult> {
        let material = self.materials.lookup(material_id)?;
        calculate_with(&self.settings, tool, params, machine, &material)
    }
}
