//! Micro tool solver - deflection/force fixed point for tools under 3 mm
//!
//! Small tools bend under their own cutting force, and a bent tool changes
//! the cut it takes. The solver relieves depth of cut until deflection sits
//! at or below a tolerance of the tool diameter, damping each step so the
//! deflection changes shrink from one iteration to the next.

use super::{CalculationError, ConvergenceStatus, Result};
use crate::config::ConvergenceSettings;
use tracing::{debug, warn};

/// Force and deflection the model predicts for one depth of cut
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub doc: f64,
    pub force: f64,
    pub deflection: f64,
}

/// Outcome of a solve
#[derive(Debug, Clone, PartialEq)]
pub struct Convergence {
    /// Final estimate, or the last stable one after divergence
    pub sample: Sample,
    pub status: ConvergenceStatus,
    pub iterations: u32,
    /// Deflection observed at every iteration (mm)
    pub history: Vec<f64>,
}

/// Iterate `model` from `nominal_doc` until deflection settles
///
/// The loop is bounded by `settings.max_iterations`. Running out of
/// iterations is reported as [`ConvergenceStatus::NotConverged`]; deflection
/// that keeps rising past `divergence_multiple × diameter` stops the loop
/// with [`ConvergenceStatus::Diverged`]. Only model errors are returned as `Err`.
pub fn solve<F>(
    nominal_doc: f64,
    diameter: f64,
    settings: &ConvergenceSettings,
    mut model: F,
) -> Result<Convergence>
where
    F: FnMut(f64) -> Result<Sample>,
{
    if settings.max_iterations == 0 {
        return Err(CalculationError::domain(
            "max_iterations",
            0.0,
            "solver needs at least one iteration",
        ));
    }

    let tolerance = settings.tolerance_ratio * diameter;
    let divergence_limit = settings.divergence_multiple * diameter;

    let mut doc = nominal_doc;
    let mut previous = Sample {
        doc,
        force: 0.0,
        deflection: 0.0,
    };
    let mut stable: Option<Sample> = None;
    let mut rising = 0u32;
    let mut history = Vec::new();

    for iteration in 1..=settings.max_iterations {
        let sample = model(doc)?;
        history.push(sample.deflection);

        let delta = sample.deflection - previous.deflection;
        if iteration > 1 && delta > 0.0 {
            rising += 1;
        } else {
            rising = 0;
            stable = Some(sample);
        }

        debug!(
            iteration,
            doc = sample.doc,
            force = sample.force,
            deflection = sample.deflection,
            delta,
            "micro iteration"
        );

        if rising >= 2 && sample.deflection > divergence_limit {
            warn!(
                iteration,
                deflection = sample.deflection,
                limit = divergence_limit,
                "deflection diverged, keeping last stable estimate"
            );
            return Ok(Convergence {
                sample: stable.unwrap_or(sample),
                status: ConvergenceStatus::Diverged,
                iterations: iteration,
                history,
            });
        }

        if delta.abs() < settings.epsilon_mm {
            return Ok(Convergence {
                sample,
                status: ConvergenceStatus::Converged,
                iterations: iteration,
                history,
            });
        }

        doc = relieve(&sample, tolerance, settings);
        previous = sample;
    }

    warn!(
        iterations = settings.max_iterations,
        deflection = previous.deflection,
        "micro solver hit the iteration limit"
    );
    Ok(Convergence {
        sample: previous,
        status: ConvergenceStatus::NotConverged,
        iterations: settings.max_iterations,
        history,
    })
}

/// Next depth of cut: remove a damped share of the excess deflection
///
/// Never relieves below `min_doc_mm`, and never raises a DOC that was
/// already under it.
fn relieve(sample: &Sample, tolerance: f64, settings: &ConvergenceSettings) -> f64 {
    if sample.deflection <= tolerance {
        return sample.doc;
    }
    let excess = 1.0 - tolerance / sample.deflection;
    let doc = sample.doc * (1.0 - settings.damping * excess);
    doc.max(settings.min_doc_mm.min(sample.doc))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deflection proportional to DOC, like the real beam model
    fn linear(stiffness: f64) -> impl FnMut(f64) -> Result<Sample> {
        move |doc| {
            Ok(Sample {
                doc,
                force: doc * 10.0,
                deflection: doc * stiffness,
            })
        }
    }

    #[test]
    fn test_converges_within_tolerance() {
        let settings = ConvergenceSettings::default();
        let diameter = 1.0;
        let result = solve(0.5, diameter, &settings, linear(0.1)).unwrap();

        assert_eq!(result.status, ConvergenceStatus::Converged);
        assert!(result.iterations >= 1 && result.iterations <= settings.max_iterations);
        assert_eq!(result.history.len(), result.iterations as usize);

        // Deflection ends just above the tolerance, DOC has been relieved
        let tolerance = settings.tolerance_ratio * diameter;
        assert!(result.sample.deflection < tolerance + 2.0 * settings.epsilon_mm);
        assert!(result.sample.doc < 0.5);
    }

    #[test]
    fn test_deltas_shrink_monotonically() {
        let settings = ConvergenceSettings::default();
        let result = solve(0.5, 1.0, &settings, linear(0.1)).unwrap();

        let deltas: Vec<f64> = result
            .history
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .collect();
        assert!(deltas.len() > 2, "Expected several iterations, got {:?}", result.history);
        for pair in deltas.windows(2) {
            assert!(
                pair[1] <= pair[0] + 1e-15,
                "Deflection deltas grew: {:?}",
                deltas
            );
        }
    }

    #[test]
    fn test_stiff_tool_converges_immediately() {
        let settings = ConvergenceSettings::default();
        // Deflection well under tolerance: DOC is left alone
        let result = solve(0.2, 2.0, &settings, linear(0.001)).unwrap();

        assert_eq!(result.status, ConvergenceStatus::Converged);
        assert_eq!(result.sample.doc, 0.2);
        assert!(result.iterations <= 2);
    }

    #[test]
    fn test_zero_doc_converges_on_first_iteration() {
        let settings = ConvergenceSettings::default();
        let result = solve(0.0, 1.0, &settings, linear(0.1)).unwrap();

        assert_eq!(result.status, ConvergenceStatus::Converged);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.sample.deflection, 0.0);
    }

    #[test]
    fn test_iteration_limit_reports_not_converged() {
        let settings = ConvergenceSettings {
            max_iterations: 3,
            ..ConvergenceSettings::default()
        };
        let result = solve(0.5, 1.0, &settings, linear(0.1)).unwrap();

        assert_eq!(result.status, ConvergenceStatus::NotConverged);
        assert_eq!(result.iterations, 3);
        assert_eq!(result.history.len(), 3);
        assert!(result.sample.deflection.is_finite());
    }

    #[test]
    fn test_runaway_deflection_diverges() {
        let settings = ConvergenceSettings::default();
        let mut calls = 0;
        // Deflection doubles on every evaluation regardless of DOC
        let runaway = |doc: f64| -> Result<Sample> {
            calls += 1;
            Ok(Sample {
                doc,
                force: 1.0,
                deflection: 0.1 * 2f64.powi(calls),
            })
        };

        let result = solve(0.5, 1.0, &settings, runaway).unwrap();

        assert_eq!(result.status, ConvergenceStatus::Diverged);
        assert!(result.iterations < settings.max_iterations);
        // First sample is the last one before the rise began
        assert!((result.sample.deflection - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let settings = ConvergenceSettings {
            max_iterations: 0,
            ..ConvergenceSettings::default()
        };
        let err = solve(0.5, 1.0, &settings, linear(0.1)).unwrap_err();
        assert!(matches!(
            err,
            CalculationError::Domain {
                field: "max_iterations",
                ..
            }
        ));
    }

    #[test]
    fn test_model_error_propagates() {
        let settings = ConvergenceSettings::default();
        let failing = |_doc: f64| -> Result<Sample> {
            Err(CalculationError::domain("deflection", f64::NAN, "non-finite"))
        };

        assert!(solve(0.5, 1.0, &settings, failing).is_err());
    }

    #[test]
    fn test_relieve_respects_min_doc() {
        let settings = ConvergenceSettings {
            damping: 1.0,
            ..ConvergenceSettings::default()
        };
        let huge = Sample {
            doc: 0.01,
            force: 1.0,
            deflection: 1e6,
        };
        assert_eq!(relieve(&huge, 0.01, &settings), settings.min_doc_mm);

        let tiny = Sample {
            doc: 0.0005,
            force: 1.0,
            deflection: 1e6,
        };
        assert_eq!(relieve(&tiny, 0.01, &settings), 0.0005);
    }
}
