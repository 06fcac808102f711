mod differential_evolution;
mod nelder_mead;
mod objective;
mod powell;
mod validation;

use std::{
    cell::Cell,
    collections::BTreeMap,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
    time::Instant,
};

use serde::{Deserialize, Serialize};

pub use objective::{FitObjective, InsufficientData, Parameter, ParameterBounds, ParameterMask};
pub use validation::{ValidationReport, validate};

use crate::core::Range;

//non-finite values count as +inf
pub trait Objective: Send + Sync {
    fn loss(&self, x: &[f64]) -> f64;
}

impl<F> Objective for F
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    fn loss(&self, x: &[f64]) -> f64 {
        self(x)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    #[display("nelder_mead")]
    NelderMead,
    #[display("powell")]
    Powell,
    #[display("differential_evolution")]
    DifferentialEvolution,
}

impl Method {
    pub fn is_global(&self) -> bool {
        matches!(self, Method::DifferentialEvolution)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodSelection {
    #[default]
    All,
    Local,
    Global,
}

impl MethodSelection {
    pub fn methods(&self) -> Vec<Method> {
        [Method::NelderMead, Method::Powell, Method::DifferentialEvolution]
            .into_iter()
            .filter(|m| match self {
                MethodSelection::All => true,
                MethodSelection::Local => !m.is_global(),
                MethodSelection::Global => m.is_global(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub selection: MethodSelection,
    //defaults to 200 per dimension for Nelder-Mead and 1000 per dimension for Powell
    pub max_iterations: Option<usize>,
    //relative to the magnitude of each coordinate
    pub x_tolerance: f64,
    pub f_tolerance: f64,
    pub seed: u64,
    pub population_factor: usize,
    pub max_generations: usize,
    pub de_tolerance: f64,
    //refine the best member of the global search with a local simplex
    pub polish: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            selection: MethodSelection::All,
            max_iterations: None,
            x_tolerance: 1e-6,
            f_tolerance: 1e-8,
            seed: 42,
            population_factor: 15,
            max_generations: 1000,
            de_tolerance: 0.01,
            polish: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpace {
    initial: Vec<f64>,
    bounds: Option<Vec<Range<f64>>>,
}

impl SearchSpace {
    pub fn new(initial: Vec<f64>, bounds: Option<Vec<Range<f64>>>) -> anyhow::Result<Self> {
        anyhow::ensure!(!initial.is_empty(), "Search space needs at least one free parameter");

        if let Some(bounds) = &bounds {
            anyhow::ensure!(
                bounds.len() == initial.len(),
                "Got {} bounds for {} parameters",
                bounds.len(),
                initial.len()
            );
        }

        Ok(Self { initial, bounds })
    }

    pub fn initial(&self) -> &[f64] {
        &self.initial
    }

    pub fn bounds(&self) -> Option<&[Range<f64>]> {
        self.bounds.as_deref()
    }

    pub fn dimension(&self) -> usize {
        self.initial.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodResult {
    pub parameters: Vec<f64>,
    pub loss: f64,
    pub converged: bool,
    pub message: String,
    pub evaluations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, derive_more::Display, derive_more::Error)]
#[display("{method} failed: {reason}")]
pub struct OptimizationFailure {
    pub method: Method,
    pub reason: String,
}

impl OptimizationFailure {
    fn new(method: Method, reason: impl Into<String>) -> Self {
        Self {
            method,
            reason: reason.into(),
        }
    }
}

//no implicit winner, best is a convenience
#[derive(Debug, Clone, Default, Serialize)]
pub struct OptimizationReport {
    results: BTreeMap<Method, Result<MethodResult, OptimizationFailure>>,
}

impl OptimizationReport {
    pub fn results(&self) -> &BTreeMap<Method, Result<MethodResult, OptimizationFailure>> {
        &self.results
    }

    pub fn get(&self, method: Method) -> Option<&Result<MethodResult, OptimizationFailure>> {
        self.results.get(&method)
    }

    pub fn successes(&self) -> impl Iterator<Item = (Method, &MethodResult)> {
        self.results
            .iter()
            .filter_map(|(method, result)| result.as_ref().ok().map(|r| (*method, r)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &OptimizationFailure> {
        self.results.values().filter_map(|result| result.as_ref().err())
    }

    pub fn best(&self) -> Option<(Method, &MethodResult)> {
        self.successes()
            .filter(|(_, r)| r.loss.is_finite())
            .min_by(|(_, a), (_, b)| a.loss.total_cmp(&b.loss))
    }

    fn insert(&mut self, method: Method, result: Result<MethodResult, OptimizationFailure>) {
        match &result {
            Ok(r) => tracing::info!(
                "{} finished after {} evaluations: loss = {:.4}, converged = {}",
                method,
                r.evaluations,
                r.loss,
                r.converged
            ),
            Err(e) => tracing::warn!("{}", e),
        }

        self.results.insert(method, result);
    }
}

pub struct Optimizer {
    config: OptimizerConfig,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    //a panicking method is reported as failure
    pub fn run(&self, objective: &dyn Objective, space: &SearchSpace) -> OptimizationReport {
        let mut report = OptimizationReport::default();

        for method in self.config.selection.methods() {
            let result = catch_unwind(AssertUnwindSafe(|| run_method(&self.config, method, objective, space)))
                .unwrap_or_else(|panic| Err(OptimizationFailure::new(method, panic_message(panic.as_ref()))));

            report.insert(method, result);
        }

        report
    }

    pub async fn run_concurrently(&self, objective: Arc<dyn Objective>, space: &SearchSpace) -> OptimizationReport {
        let handles: Vec<_> = self
            .config
            .selection
            .methods()
            .into_iter()
            .map(|method| {
                let objective = objective.clone();
                let space = space.clone();
                let config = self.config.clone();

                let handle =
                    tokio::task::spawn_blocking(move || run_method(&config, method, objective.as_ref(), &space));
                (method, handle)
            })
            .collect();

        let mut report = OptimizationReport::default();
        for (method, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) if e.is_panic() => Err(OptimizationFailure::new(method, panic_message(e.into_panic().as_ref()))),
                Err(e) => Err(OptimizationFailure::new(method, format!("task did not complete: {e}"))),
            };
            report.insert(method, result);
        }

        report
    }
}

fn run_method(
    config: &OptimizerConfig,
    method: Method,
    objective: &dyn Objective,
    space: &SearchSpace,
) -> Result<MethodResult, OptimizationFailure> {
    tracing::info!("Trying {} optimization on {} parameters", method, space.dimension());
    let started = Instant::now();
    let evaluator = Evaluator::new(objective, space.bounds());

    let result = match method {
        Method::NelderMead => nelder_mead::minimize(&evaluator, space.initial(), config),
        Method::Powell => powell::minimize(&evaluator, space.initial(), config),
        Method::DifferentialEvolution => {
            let bounds = space
                .bounds()
                .ok_or_else(|| OptimizationFailure::new(method, "global search requires bounds"))?;
            differential_evolution::minimize(&evaluator, bounds, config)
        }
    };

    if !result.loss.is_finite() {
        return Err(OptimizationFailure::new(
            method,
            format!("no finite loss found after {} evaluations", result.evaluations),
        ));
    }

    tracing::debug!("{} took {:?}", method, started.elapsed());
    Ok(result)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

struct Evaluator<'a> {
    objective: &'a dyn Objective,
    bounds: Option<&'a [Range<f64>]>,
    evaluations: Cell<usize>,
}

impl<'a> Evaluator<'a> {
    fn new(objective: &'a dyn Objective, bounds: Option<&'a [Range<f64>]>) -> Self {
        Self {
            objective,
            bounds,
            evaluations: Cell::new(0),
        }
    }

    fn loss(&self, x: &[f64]) -> f64 {
        self.evaluations.set(self.evaluations.get() + 1);

        let value = match self.bounds {
            Some(_) => self.objective.loss(&self.project(x)),
            None => self.objective.loss(x),
        };

        if value.is_finite() { value } else { f64::INFINITY }
    }

    fn project(&self, x: &[f64]) -> Vec<f64> {
        match self.bounds {
            Some(bounds) => x.iter().zip(bounds).map(|(v, range)| range.clamp(*v)).collect(),
            None => x.to_vec(),
        }
    }

    fn evaluations(&self) -> usize {
        self.evaluations.get()
    }

    fn result(&self, x: &[f64], loss: f64, converged: bool, message: impl Into<String>) -> MethodResult {
        MethodResult {
            parameters: self.project(x),
            loss,
            converged,
            message: message.into(),
            evaluations: self.evaluations(),
        }
    }
}
