//! millcalc - feeds and speeds for CNC milling
//!
//! Computes spindle speed, feed rate, material removal rate, cutting force,
//! tool deflection, power and torque for a milling cut, then classifies the
//! result against machine and material limits.
//!
//! ```no_run
//! use millcalc::black_book::{
//!     calculate, CuttingParameters, MachineProfile, MaterialCatalog, MaterialLookup,
//!     RigidityClass, Tool,
//! };
//!
//! let material = MaterialCatalog::new().lookup("aluminum_6061")?;
//! let tool = Tool::new(6.0, 3, 20.0);
//! let params = CuttingParameters::new(3.0, 2.0, 244.0, 0.05);
//! let machine = MachineProfile::new(RigidityClass::IndustrialVmc, 100.0, 12_000.0);
//!
//! let result = calculate(&tool, &params, &machine, &material)?;
//! println!("{:.0} RPM @ {:.0} mm/min", result.rpm, result.feed_rate);
//! # Ok::<(), millcalc::black_book::CalculationError>(())
//! ```

pub mod black_book;
pub mod config;
pub mod units;
