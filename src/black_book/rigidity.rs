//! Machine rigidity - scale the operator's inputs to what the machine can hold

use super::{CuttingParameters, MaterialCategory};
use crate::units::sfm_to_smm;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Machine rigidity class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RigidityClass {
    /// Router-based CNC, gantry machines, light construction
    #[serde(rename = "router", alias = "Router")]
    Router,
    /// PrintNC, hobby VMC, reinforced gantry machines
    #[serde(rename = "diy_medium", alias = "DiyMedium")]
    DiyMedium,
    /// Commercial VMC, Tormach, Haas
    #[serde(rename = "vmc_industrial", alias = "IndustrialVmc")]
    IndustrialVmc,
}

/// Adjustment factors and limits for a rigidity class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidityFactors {
    pub name: &'static str,
    /// Share of the requested chip load the machine can hold
    pub chip_load: f64,
    /// Share of the requested depth of cut
    pub doc: f64,
    /// Share of the requested width of cut
    pub woc: f64,
    /// Spindle speed the machine type is happiest above
    pub min_rpm: f64,
    /// Steel surface speed ceiling (SFM), enforced on routers
    pub steel_sfm_limit: f64,
    /// Light frames that chatter under heavy chip loads
    pub chatter_prone: bool,
    /// Spindle drive transmission efficiency
    pub power_efficiency: f64,
}

pub const ROUTER_FACTORS: RigidityFactors = RigidityFactors {
    name: "Router/Light Duty",
    chip_load: 0.4,
    doc: 0.5,
    woc: 0.6,
    min_rpm: 8000.0,
    steel_sfm_limit: 60.0,
    chatter_prone: true,
    power_efficiency: 0.75,
};

pub const DIY_MEDIUM_FACTORS: RigidityFactors = RigidityFactors {
    name: "DIY/Medium Duty",
    chip_load: 0.5,
    doc: 0.8,
    woc: 0.85,
    min_rpm: 1000.0,
    steel_sfm_limit: 85.0,
    chatter_prone: true,
    power_efficiency: 0.85,
};

pub const INDUSTRIAL_VMC_FACTORS: RigidityFactors = RigidityFactors {
    name: "VMC/Industrial",
    chip_load: 1.0,
    doc: 1.0,
    woc: 1.0,
    min_rpm: 100.0,
    steel_sfm_limit: 150.0,
    chatter_prone: false,
    power_efficiency: 0.9,
};

/// Rigidity multiplier table, most conservative first
pub const RIGIDITY_TABLE: [(RigidityClass, RigidityFactors); 3] = [
    (RigidityClass::Router, ROUTER_FACTORS),
    (RigidityClass::DiyMedium, DIY_MEDIUM_FACTORS),
    (RigidityClass::IndustrialVmc, INDUSTRIAL_VMC_FACTORS),
];

impl RigidityClass {
    pub const ALL: [RigidityClass; 3] = [
        RigidityClass::Router,
        RigidityClass::DiyMedium,
        RigidityClass::IndustrialVmc,
    ];

    pub fn factors(self) -> &'static RigidityFactors {
        match self {
            RigidityClass::Router => &ROUTER_FACTORS,
            RigidityClass::DiyMedium => &DIY_MEDIUM_FACTORS,
            RigidityClass::IndustrialVmc => &INDUSTRIAL_VMC_FACTORS,
        }
    }
}

impl std::fmt::Display for RigidityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.factors().name)
    }
}

impl std::str::FromStr for RigidityClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "router" => Ok(RigidityClass::Router),
            "diy" | "diy_medium" | "medium" => Ok(RigidityClass::DiyMedium),
            "vmc" | "vmc_industrial" | "industrial" => Ok(RigidityClass::IndustrialVmc),
            other => Err(format!(
                "unknown machine class '{}' (expected router, diy_medium or vmc_industrial)",
                other
            )),
        }
    }
}

/// Cutting inputs after rigidity scaling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustedInputs {
    pub surface_speed: f64,
    pub feed_per_tooth: f64,
    pub doc: f64,
    pub woc: f64,
    /// Surface speed ceiling (m/min) that still holds after speed boosts
    pub surface_speed_ceiling: Option<f64>,
}

/// Scale feed per tooth, DOC and WOC by the machine's rigidity factors
///
/// Routers also get a steel surface speed ceiling. Factors never exceed 1.0,
/// so WOC stays within the tool diameter.
pub fn adjust_for_rigidity(
    params: &CuttingParameters,
    rigidity: RigidityClass,
    category: MaterialCategory,
) -> AdjustedInputs {
    let factors = rigidity.factors();

    let surface_speed_ceiling = (rigidity == RigidityClass::Router
        && category.is_steel_family())
    .then(|| sfm_to_smm(factors.steel_sfm_limit));

    let adjusted = AdjustedInputs {
        surface_speed: surface_speed_ceiling
            .map_or(params.surface_speed, |limit| params.surface_speed.min(limit)),
        feed_per_tooth: params.feed_per_tooth * factors.chip_load,
        doc: params.doc * factors.doc,
        woc: params.woc * factors.woc,
        surface_speed_ceiling,
    };

    trace!(
        rigidity = %rigidity,
        feed_per_tooth = adjusted.feed_per_tooth,
        doc = adjusted.doc,
        woc = adjusted.woc,
        "rigidity adjustment"
    );

    adjusted
}
