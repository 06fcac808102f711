use anyhow::Context;
use serde::Serialize;

use crate::core::time::DateTimeRange;
use crate::model::{ParameterVector, PredictionTable};

use super::{FitObjective, InsufficientData, Method, OptimizationReport, Optimizer, ParameterBounds};

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub training: OptimizationReport,
    pub method: Method,
    pub parameters: ParameterVector,
    pub training_loss: f64,
    pub test_loss: Option<f64>,
    pub warnings: Vec<InsufficientData>,
    #[serde(skip)]
    pub predictions: PredictionTable,
}

pub fn validate(
    optimizer: &Optimizer,
    objective: &FitObjective,
    bounds: Option<&ParameterBounds>,
    train: &DateTimeRange,
    test: &DateTimeRange,
) -> anyhow::Result<ValidationReport> {
    let space = objective.mask().search_space(bounds)?;

    let training_objective = objective.clone().with_window(train);
    let training = optimizer.run(&training_objective, &space);

    let (method, free, training_loss) = training
        .best()
        .map(|(method, best)| (method, best.parameters.clone(), best.loss))
        .with_context(|| format!("No optimization method succeeded on training window {train}"))?;
    let parameters = objective.parameters(&free)?;

    let test_objective = objective.clone().with_window(test);
    let predictions = test_objective.predict(&parameters);
    let test_loss = test_objective.score(&parameters);

    tracing::info!(
        "Validation with {}: training {} {:.4}, test {} {:?} on {} rows",
        method,
        objective.loss_function(),
        training_loss,
        objective.loss_function(),
        test_loss,
        predictions.len()
    );

    let warnings = training_objective
        .warnings()
        .iter()
        .chain(test_objective.warnings())
        .cloned()
        .collect();

    Ok(ValidationReport {
        training,
        method,
        parameters,
        training_loss,
        test_loss,
        warnings,
        predictions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::DateTime;
    use crate::model::fixtures::{known_parameters, self_consistent, synthetic_features};
    use crate::model::{HomeConfig, Loss};
    use crate::optimizer::{MethodSelection, OptimizerConfig, Parameter, ParameterMask};
    use crate::t;

    fn objective() -> FitObjective {
        let truth = known_parameters();
        let start = ParameterVector {
            r: truth.r * 1.2,
            c: truth.c * 0.8,
            ..truth
        };
        let features = self_consistent(&synthetic_features(2), &truth);

        FitObjective::new(
            features,
            HomeConfig::default(),
            ParameterMask::new(start, &[Parameter::R, Parameter::C]),
            Loss::Rmse,
        )
        .unwrap()
    }

    fn day(iso: &str) -> DateTimeRange {
        let start = DateTime::from_iso(iso).unwrap();
        DateTimeRange::new(start, start + t!(1 days))
    }

    #[test]
    fn test_fit_on_one_day_scores_the_next() {
        let optimizer = Optimizer::new(OptimizerConfig {
            selection: MethodSelection::Local,
            max_iterations: Some(1000),
            ..OptimizerConfig::default()
        });

        let report = validate(
            &optimizer,
            &objective(),
            None,
            &day("2025-01-05T00:00:00Z"),
            &day("2025-01-06T00:00:00Z"),
        )
        .unwrap();

        assert!(report.warnings.is_empty());
        assert_eq!(report.predictions.len(), 288);
        assert_eq!(report.predictions.rows()[0].features.day.to_string(), "2025-01-06");
        assert!(report.test_loss.unwrap() < 1e-2, "{:?}", report.test_loss);
        assert_eq!(report.training.results().len(), 2);
    }

    #[test]
    fn test_empty_test_window_is_reported() {
        let optimizer = Optimizer::new(OptimizerConfig {
            selection: MethodSelection::Local,
            max_iterations: Some(200),
            ..OptimizerConfig::default()
        });

        let report = validate(
            &optimizer,
            &objective(),
            None,
            &day("2025-01-05T00:00:00Z"),
            &day("2030-01-01T00:00:00Z"),
        )
        .unwrap();

        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.predictions.len(), 2 * 288);
    }

    #[test]
    fn test_fails_without_successful_method() {
        let optimizer = Optimizer::new(OptimizerConfig {
            selection: MethodSelection::Global,
            ..OptimizerConfig::default()
        });

        let result = validate(
            &optimizer,
            &objective(),
            None,
            &day("2025-01-05T00:00:00Z"),
            &day("2025-01-06T00:00:00Z"),
        );

        assert!(result.is_err());
    }
}
