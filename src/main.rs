use clap::Parser;
use millcalc::black_book::{
    calculate_with, formulas::chip_load_rule_of_thumb, BlackBook, CalculationError,
    CalculationResult, Coating, CuttingParameters, MachineProfile, MaterialLookup,
    MaterialProperties, RigidityClass, Severity, Tool,
};
use millcalc::config::{ConfigError, EngineSettings};
use millcalc::units::{
    cm3_to_in3, common_imperial_sizes, format_diameter, inches_to_mm, kw_to_hp, mm_per_min_to_ipm,
    mm_to_inches, mm_to_thou, parse_fraction, sfm_to_smm, smm_to_sfm, FractionError,
};
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Calculation(#[from] CalculationError),

    #[error("invalid diameter: {0}")]
    Diameter(#[from] FractionError),

    #[error("failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("--diameter is required")]
    MissingDiameter,
}

/// Feeds and speeds for CNC milling
#[derive(Parser, Debug)]
#[command(name = "millcalc", author, version, about, long_about = None)]
struct Cli {
    /// Tool diameter in mm, or inches with --inch ("1/4" and "1 1/8" accepted)
    #[arg(short, long)]
    diameter: Option<String>,

    /// Number of flutes
    #[arg(short = 'z', long, default_value_t = 2)]
    flutes: u32,

    /// Tool stickout [default: 3x diameter]
    #[arg(long)]
    stickout: Option<f64>,

    /// Axial depth of cut [default: 1x diameter]
    #[arg(long)]
    doc: Option<f64>,

    /// Radial width of cut [default: 0.5x diameter]
    #[arg(long)]
    woc: Option<f64>,

    /// Surface speed in m/min, or SFM with --inch [default: middle of the material range]
    #[arg(short, long)]
    surface_speed: Option<f64>,

    /// Feed per tooth in mm, or inches with --inch [default: diameter / 200 within the material range]
    #[arg(short, long)]
    feed_per_tooth: Option<f64>,

    /// Material id, see --list-materials
    #[arg(short, long, default_value = "aluminum_6061")]
    material: String,

    /// Tool coating (uncoated, TiN, TiCN, TiAlN, AlCrN, diamond)
    #[arg(long, value_parser = parse_coating)]
    coating: Option<Coating>,

    /// Machine class (router, diy_medium, vmc_industrial)
    #[arg(long, default_value = "vmc_industrial")]
    machine: RigidityClass,

    #[arg(long, default_value_t = 100.0)]
    min_rpm: f64,

    #[arg(long, default_value_t = 10_000.0)]
    max_rpm: f64,

    /// Rated spindle power (kW)
    #[arg(long)]
    spindle_kw: Option<f64>,

    /// Maximum machine feed (mm/min)
    #[arg(long)]
    max_feed: Option<f64>,

    /// Spindle drive efficiency override (0-1]
    #[arg(long)]
    efficiency: Option<f64>,

    /// High speed machining toolpath (boosts speed, forces chip thinning)
    #[arg(long)]
    hsm: bool,

    /// Compensate feed for radial chip thinning
    #[arg(long)]
    chip_thinning: bool,

    /// Lengths in inches, surface speed in SFM
    #[arg(long)]
    inch: bool,

    /// Engine settings JSON file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// List the built-in materials and exit
    #[arg(long)]
    list_materials: bool,

    /// List common fractional tool sizes and exit
    #[arg(long)]
    list_sizes: bool,
}

fn parse_coating(s: &str) -> Result<Coating, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("unknown coating '{}'", s))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(Severity::Danger) => ExitCode::from(2),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<Severity, Error> {
    let settings = match &cli.settings {
        Some(path) => EngineSettings::from_file(path)?,
        None => EngineSettings::default(),
    };
    let bb = BlackBook::new().with_settings(settings);

    if cli.list_materials {
        for id in bb.materials().ids() {
            let m = bb.materials().lookup(id)?;
            println!(
                "{:<16} {:<24} {:<10} Kc {:>5.0} N/mm²  {:.0}-{:.0} SFM",
                id,
                m.name,
                m.category,
                m.kc,
                smm_to_sfm(m.surface_speed_range.0),
                smm_to_sfm(m.surface_speed_range.1)
            );
        }
        return Ok(Severity::Ok);
    }

    if cli.list_sizes {
        for (label, inches) in common_imperial_sizes() {
            println!("{:>7}\"  {:.4}\"  {:>7.3}mm", label, inches, inches_to_mm(inches));
        }
        return Ok(Severity::Ok);
    }

    let job = Job::from_cli(cli, &bb)?;
    let result = job.calculate(bb.settings())?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result, &job.tool, &job.material.name, cli.inch);
    }

    Ok(result.severity())
}

/// One calculation assembled from the command line
struct Job {
    tool: Tool,
    params: CuttingParameters,
    machine: MachineProfile,
    /// Catalog material with the requested coating applied
    material: MaterialProperties,
}

impl Job {
    fn from_cli(cli: &Cli, bb: &BlackBook) -> Result<Self, Error> {
        let raw_diameter = cli.diameter.as_deref().ok_or(Error::MissingDiameter)?;
        let length = |value: f64| if cli.inch { inches_to_mm(value) } else { value };

        let diameter = length(parse_fraction(raw_diameter)?);
        let mut material = bb.materials().lookup(&cli.material)?;
        if let Some(coating) = cli.coating {
            material = material.with_coating(coating);
        }

        let (min_speed, max_speed) = material.surface_speed_range;
        let surface_speed = match cli.surface_speed {
            Some(speed) if cli.inch => sfm_to_smm(speed),
            Some(speed) => speed,
            None => (min_speed + max_speed) / 2.0,
        };
        let (min_load, max_load) = material.chip_load_range;
        let feed_per_tooth = match cli.feed_per_tooth {
            Some(fz) => length(fz),
            None => chip_load_rule_of_thumb(diameter, 1.0).clamp(min_load, max_load),
        };

        let tool = Tool::new(
            diameter,
            cli.flutes,
            cli.stickout.map(length).unwrap_or(diameter * 3.0),
        );
        let params = CuttingParameters::new(
            cli.doc.map(length).unwrap_or(diameter),
            cli.woc.map(length).unwrap_or(diameter / 2.0),
            surface_speed,
            feed_per_tooth,
        )
        .with_hsm(cli.hsm)
        .with_chip_thinning(cli.chip_thinning);

        let mut machine = MachineProfile::new(cli.machine, cli.min_rpm, cli.max_rpm);
        if let Some(kw) = cli.spindle_kw {
            machine = machine.with_spindle_power(kw);
        }
        if let Some(feed) = cli.max_feed {
            machine = machine.with_max_feed(feed);
        }
        if let Some(efficiency) = cli.efficiency {
            machine = machine.with_efficiency(efficiency);
        }

        Ok(Self {
            tool,
            params,
            machine,
            material,
        })
    }

    fn calculate(&self, settings: &EngineSettings) -> Result<CalculationResult, Error> {
        debug!(
            tool = ?self.tool,
            params = ?self.params,
            machine = ?self.machine,
            material = %self.material.name,
            "calculating"
        );
        Ok(calculate_with(
            settings,
            &self.tool,
            &self.params,
            &self.machine,
            &self.material,
        )?)
    }
}

fn print_result(result: &CalculationResult, tool: &Tool, material: &str, inch: bool) {
    let diameter = if inch {
        format_diameter(mm_to_inches(tool.diameter), true)
    } else {
        format_diameter(tool.diameter, false)
    };
    println!(
        "{} {}-flute in {} ({} path)",
        diameter, tool.flute_count, material, result.path
    );
    println!();

    let limits = if result.rpm_within_limits {
        ""
    } else {
        "  (outside machine limits)"
    };
    println!("  Spindle:     {:.0} RPM{}", result.rpm, limits);
    println!(
        "  Speed:       {:.1} m/min ({:.0} SFM)",
        result.surface_speed,
        smm_to_sfm(result.surface_speed)
    );
    println!(
        "  Chip load:   {:.4} mm/tooth ({:.2} thou)",
        result.feed_per_tooth,
        mm_to_thou(result.feed_per_tooth)
    );
    println!(
        "  Feed:        {:.0} mm/min ({:.1} IPM)",
        result.feed_rate,
        mm_per_min_to_ipm(result.feed_rate)
    );
    if result.chip_thinning_factor > 1.0 {
        println!(
            "               base {:.0} mm/min, chip thinning x{:.3}",
            result.base_feed_rate, result.chip_thinning_factor
        );
    }
    println!(
        "  DOC x WOC:   {:.3} x {:.3} mm ({:.0}% engagement)",
        result.doc,
        result.woc,
        result.engagement_ratio * 100.0
    );
    println!(
        "  MRR:         {:.2} cm³/min ({:.3} in³/min)",
        result.mrr,
        cm3_to_in3(result.mrr)
    );
    println!(
        "  Power:       {:.2} kW ({:.2} hp), {:.2} N·m",
        result.power_kw,
        kw_to_hp(result.power_kw),
        result.torque_nm
    );
    println!(
        "  Deflection:  {:.4} mm ({:.2}% of diameter) under {:.1} N",
        result.deflection, result.deflection_percent, result.cutting_force
    );
    if result.iterations > 1 {
        println!(
            "  Solver:      {:?} after {} iterations",
            result.status, result.iterations
        );
    }

    if !result.warnings.is_empty() {
        println!();
        for warning in &result.warnings {
            println!("  {}", warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("millcalc").chain(args.iter().copied()))
    }

    #[test]
    fn test_coating_reaches_the_engine() {
        let bb = BlackBook::new();
        let base = ["-d", "10", "-m", "steel_1018", "-s", "100"];

        let uncoated = Job::from_cli(&cli(&base), &bb)
            .and_then(|job| job.calculate(bb.settings()))
            .unwrap();

        let mut coated_args = base.to_vec();
        coated_args.extend(["--coating", "TiAlN"]);
        let coated = Job::from_cli(&cli(&coated_args), &bb)
            .and_then(|job| job.calculate(bb.settings()))
            .unwrap();

        assert!((uncoated.surface_speed - 100.0).abs() < 1e-9);
        assert!(
            (coated.surface_speed - 140.0).abs() < 1e-9,
            "Coated run computed {} m/min",
            coated.surface_speed
        );
        assert!(coated.rpm > uncoated.rpm);
    }

    #[test]
    fn test_inch_fraction_diameter() {
        let bb = BlackBook::new();
        let job = Job::from_cli(&cli(&["-d", "1/4", "--inch"]), &bb).unwrap();

        assert!((job.tool.diameter - 6.35).abs() < 1e-9);
        assert!((job.tool.stickout - 6.35 * 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_diameter() {
        let bb = BlackBook::new();
        assert!(matches!(
            Job::from_cli(&cli(&[]), &bb),
            Err(Error::MissingDiameter)
        ));
    }

    #[test]
    fn test_unknown_coating_rejected() {
        assert!(Cli::try_parse_from(["millcalc", "-d", "6", "--coating", "chrome"]).is_err());
    }
}
