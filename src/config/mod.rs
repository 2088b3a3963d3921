//! Engine settings - JSON-configurable tuning for the micro-tool solver
//!
//! Every field has a documented default, so a settings file only needs the
//! values it overrides:
//!
//! ```json
//! { "convergence": { "max_iterations": 80, "damping": 0.35 } }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Upper bound on micro-tool solver iterations
pub const MAX_ITERATIONS: u32 = 50;

/// Deflection change (mm) between iterations that counts as converged
pub const CONVERGENCE_EPSILON_MM: f64 = 1e-5;

/// Largest `max_iterations` a settings file may ask for
pub const MAX_ITERATIONS_LIMIT: u32 = 10_000;

/// Deflection allowed before DOC is relieved, as a fraction of tool diameter
pub const DEFLECTION_TOLERANCE_RATIO: f64 = 0.01;

/// Share of the excess deflection removed per iteration (1.0 = undamped)
pub const DOC_DAMPING: f64 = 0.5;

/// DOC is never relieved below this (mm)
pub const MIN_DOC_MM: f64 = 0.001;

/// Deflection beyond this many tool diameters, while still rising, is divergence
pub const DIVERGENCE_MULTIPLE: f64 = 1.0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid setting {field} = {value}: {reason}")]
    Invalid {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Tuning for the micro-tool deflection/force fixed-point loop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceSettings {
    pub max_iterations: u32,
    pub epsilon_mm: f64,
    pub tolerance_ratio: f64,
    pub damping: f64,
    pub min_doc_mm: f64,
    pub divergence_multiple: f64,
}

impl Default for ConvergenceSettings {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            epsilon_mm: CONVERGENCE_EPSILON_MM,
            tolerance_ratio: DEFLECTION_TOLERANCE_RATIO,
            damping: DOC_DAMPING,
            min_doc_mm: MIN_DOC_MM,
            divergence_multiple: DIVERGENCE_MULTIPLE,
        }
    }
}

impl ConvergenceSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid {
                field: "max_iterations",
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        if self.max_iterations > MAX_ITERATIONS_LIMIT {
            return Err(ConfigError::Invalid {
                field: "max_iterations",
                value: self.max_iterations as f64,
                reason: "must be at most 10000",
            });
        }
        positive("epsilon_mm", self.epsilon_mm)?;
        positive("tolerance_ratio", self.tolerance_ratio)?;
        positive("min_doc_mm", self.min_doc_mm)?;
        positive("divergence_multiple", self.divergence_multiple)?;

        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "damping",
                value: self.damping,
                reason: "must be in (0, 1]",
            });
        }
        Ok(())
    }
}

/// Settings for a calculation engine instance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub convergence: ConvergenceSettings,
    /// Scale micro-tool cutting force for the size effect (smaller tools cut harder)
    pub micro_size_effect: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            convergence: ConvergenceSettings::default(),
            micro_size_effect: true,
        }
    }
}

impl EngineSettings {
    /// Load settings from a JSON file, falling back to defaults for missing fields
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let settings: EngineSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.convergence.validate()
    }
}

fn positive(field: &'static str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            value,
            reason: "must be a positive number",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = EngineSettings::default();
        settings.validate().expect("defaults should validate");
        assert!(settings.convergence.max_iterations >= 20);
        assert_eq!(settings.convergence.epsilon_mm, 1e-5);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings =
            EngineSettings::from_json(r#"{ "convergence": { "max_iterations": 80 } }"#).unwrap();

        assert_eq!(settings.convergence.max_iterations, 80);
        assert_eq!(settings.convergence.damping, DOC_DAMPING);
        assert!(settings.micro_size_effect);
    }

    #[test]
    fn test_rejects_bad_damping() {
        let err = EngineSettings::from_json(r#"{ "convergence": { "damping": 1.5 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "damping", .. }));
    }

    #[test]
    fn test_rejects_zero_iterations() {
        let err = EngineSettings::from_json(r#"{ "convergence": { "max_iterations": 0 } }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "max_iterations",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_unbounded_iterations() {
        let err = EngineSettings::from_json(
            r#"{ "convergence": { "max_iterations": 4294967295 } }"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "max_iterations",
                ..
            }
        ));

        let at_limit = format!(
            r#"{{ "convergence": {{ "max_iterations": {} }} }}"#,
            MAX_ITERATIONS_LIMIT
        );
        assert!(EngineSettings::from_json(&at_limit).is_ok());
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = EngineSettings::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "micro_size_effect": false }}"#).unwrap();

        let settings = EngineSettings::from_file(file.path()).unwrap();
        assert!(!settings.micro_size_effect);
        assert_eq!(settings.convergence, ConvergenceSettings::default());
    }

    #[test]
    fn test_missing_file() {
        let err = EngineSettings::from_file("/nonexistent/millcalc.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
