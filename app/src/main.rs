use std::{str::FromStr, sync::Arc};

use anyhow::Context;
use epsilon::{
    adapter::csv::{self, PredictionRecord, RunLogEntry},
    core::{time::DateTime, unit::DegreeCelsius},
    estimation::{TransientEstimate, TransientEstimator},
    events::{DetectedEvents, SwitchEvent, daily_consumption},
    features::{FeaturesTable, RawSignals, align, daily},
    model::{PredictionTable, ThermalParameters},
    optimizer::{FitObjective, Optimizer, ParameterMask, validate},
    scenario::{ScenarioEngine, ScenarioPolicy},
    settings::Settings,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Estimate,
    Fit,
    Simulate,
    Validate,
    All,
}

impl Stage {
    fn includes(self, other: Stage) -> bool {
        self == Stage::All || self == other
    }
}

impl FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "estimate" => Ok(Stage::Estimate),
            "fit" => Ok(Stage::Fit),
            "simulate" => Ok(Stage::Simulate),
            "validate" => Ok(Stage::Validate),
            "all" => Ok(Stage::All),
            other => anyhow::bail!("Unknown stage {other}, expected estimate, fit, simulate, validate or all"),
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
pub async fn main() {
    let settings = Settings::new().expect("Error reading configuration");
    settings.monitoring.init().expect("Error initializing monitoring");

    let stage = std::env::args()
        .nth(1)
        .map(|arg| arg.parse::<Stage>())
        .transpose()
        .expect("Error parsing command line")
        .unwrap_or(Stage::All);

    if let Err(e) = run(stage, &settings).await {
        tracing::error!("Stage {:?} failed: {:?}", stage, e);
        std::process::exit(1);
    }
}

async fn run(stage: Stage, settings: &Settings) -> anyhow::Result<()> {
    let signals = csv::load_signals(&settings.data.sources)?;
    let features = align(&signals, settings.home.sample_interval)?;
    tracing::info!("Loaded {} feature rows", features.len());

    let events = SwitchEvent::from_frame(&signals.switch);

    let estimate = if stage.includes(Stage::Estimate) || stage.includes(Stage::Simulate) {
        Some(estimate(settings, &signals, &events)?)
    } else {
        None
    };

    if stage.includes(Stage::Fit) {
        fit(settings, &features).await?;
    }

    if stage.includes(Stage::Simulate) {
        let thermal = estimate
            .as_ref()
            .and_then(|e| e.parameters())
            .or(settings.simulation.thermal)
            .context("No thermal parameters from estimation or configuration")?;
        simulate(settings, thermal, &events, &features)?;
    }

    if stage.includes(Stage::Validate) {
        run_validation(settings, &features)?;
    }

    Ok(())
}

fn estimate(settings: &Settings, signals: &RawSignals, events: &[SwitchEvent]) -> anyhow::Result<TransientEstimate> {
    let source = DetectedEvents::new(events.to_vec(), settings.estimation.criteria.clone());
    let estimator = TransientEstimator::new(&signals.interior, &signals.exterior, &settings.estimation, &settings.home);

    let estimate = estimator.estimate(&source);
    match estimate.parameters() {
        Some(p) => tracing::info!("Transient estimate: tau {:.2} h, C {:.1} Wh/K", p.tau_hours, p.capacitance),
        None => tracing::warn!("Transient estimation yielded no parameters"),
    }

    let issues: Vec<_> = estimate.issues().cloned().collect();
    let output = &settings.data.output_dir;
    csv::write_csv(&output.join("data_quality_issues.csv"), &issues)?;

    let consumption = daily_consumption(events, settings.home.heater_power);
    csv::write_csv(&output.join("consumption.csv"), &consumption)?;

    let summaries = daily::daily_summary(&signals.exterior, &consumption);
    let correlation = daily::uptime_correlation(&summaries);
    tracing::info!(
        "Uptime correlation with exterior temperature: min {:?}, max {:?}, mean {:?}",
        correlation.t_min,
        correlation.t_max,
        correlation.t_mean
    );
    csv::write_csv(&output.join("daily_summary.csv"), &summaries)?;

    Ok(estimate)
}

fn objective(settings: &Settings, features: &FeaturesTable) -> anyhow::Result<FitObjective> {
    let fit = &settings.optimizer;
    let mask = ParameterMask::new(fit.initial, &fit.free);
    let mut objective = FitObjective::new(features.clone(), settings.home.clone(), mask, fit.loss)?;

    if let Some(window) = &fit.window {
        objective = objective.with_window(window);
    }
    if let Some(band) = fit.band {
        objective = objective.with_band(band);
    }

    Ok(objective)
}

async fn fit(settings: &Settings, features: &FeaturesTable) -> anyhow::Result<()> {
    let objective = objective(settings, features)?;
    let space = objective.mask().search_space(settings.optimizer.bounds.as_ref())?;
    let optimizer = Optimizer::new(settings.optimizer.search.clone());

    let report = optimizer
        .run_concurrently(Arc::new(objective.clone()), &space)
        .await;

    let now = DateTime::now();
    let mut entries = vec![];
    for (method, result) in report.successes() {
        let params = objective.parameters(&result.parameters)?;
        tracing::info!("{}: {} with {} {:.4}", method, params, objective.loss_function(), result.loss);
        entries.push(RunLogEntry::new(now, "fit", method, &params, result.loss));
    }
    csv::append_run_log(&settings.data.run_log, &entries)?;

    let (method, best) = report.best().context("No optimization method succeeded")?;
    let params = objective.parameters(&best.parameters)?;
    tracing::info!("Best fit by {}: {}", method, params);

    write_predictions(settings, "predictions.csv", &objective.predict(&params))
}

fn simulate(
    settings: &Settings,
    thermal: ThermalParameters,
    events: &[SwitchEvent],
    features: &FeaturesTable,
) -> anyhow::Result<()> {
    let simulation = &settings.simulation;
    let engine = ScenarioEngine::new(simulation.engine.clone(), settings.home.clone());
    let setup = simulation.setup(thermal);
    let output = &settings.data.output_dir;

    let mut policies: Vec<(String, ScenarioPolicy)> = simulation
        .policies
        .iter()
        .map(|policy| (policy.to_string(), policy.clone()))
        .collect();
    if let Some(day) = simulation.replay_day {
        policies.push((format!("replay_{day}"), ScenarioPolicy::replay_day(events, day)));
    }

    let day = simulation
        .replay_day
        .or_else(|| features.rows().first().map(|row| row.day))
        .context("No day to attribute the simulated consumption to")?;

    let mut consumption = vec![];
    for (name, policy) in policies.iter() {
        let trace = engine.simulate(&setup, policy)?;
        csv::write_csv(&output.join(format!("trace_{name}.csv")), trace.points())?;

        let record = trace.consumption(day, settings.home.heater_power);
        tracing::info!("Scenario {}: {:.2} h heating, {}", name, record.uptime_hours, record.energy);
        consumption.push(record);

        if let ScenarioPolicy::Replay { .. } = policy {
            let rmse = features.day(day).and_then(|rows| trace.rmse_against(rows));
            tracing::info!("Replay of {} deviates from the observation by RMSE {:?}", day, rmse);
        }
    }
    csv::write_csv(&output.join("scenario_consumption.csv"), &consumption)?;

    match engine.time_to_target(&setup, DegreeCelsius(1.0)) {
        Ok(minutes) => tracing::info!("Recovering 1 °C below target takes {:.0} minutes", minutes),
        Err(e) => tracing::warn!("Cannot compute time to target: {}", e),
    }

    Ok(())
}

fn run_validation(settings: &Settings, features: &FeaturesTable) -> anyhow::Result<()> {
    let Some(windows) = &settings.optimizer.validation else {
        tracing::warn!("No validation windows configured, skipping validation");
        return Ok(());
    };

    let objective = objective(settings, features)?;
    let optimizer = Optimizer::new(settings.optimizer.search.clone());
    let report = validate(
        &optimizer,
        &objective,
        settings.optimizer.bounds.as_ref(),
        &windows.train,
        &windows.test,
    )?;

    tracing::info!(
        "Validation: {} on the training window {:.4}, on the test window {:?}",
        objective.loss_function(),
        report.training_loss,
        report.test_loss
    );

    csv::append_run_log(
        &settings.data.run_log,
        &[RunLogEntry::new(
            DateTime::now(),
            "validate",
            report.method,
            &report.parameters,
            report.test_loss.unwrap_or(f64::NAN),
        )],
    )?;

    write_predictions(settings, "validation_predictions.csv", &report.predictions)?;

    let path = settings.data.output_dir.join("validation_report.json");
    let json = serde_json::to_string_pretty(&report).context("Error serializing validation report")?;
    std::fs::write(&path, json).with_context(|| format!("Error writing {}", path.display()))
}

fn write_predictions(settings: &Settings, name: &str, predictions: &PredictionTable) -> anyhow::Result<()> {
    let path = settings.data.output_dir.join(name);
    csv::write_csv(&path, predictions.rows().iter().map(PredictionRecord::from))?;
    tracing::info!("Wrote {} predictions to {}", predictions.len(), path.display());
    Ok(())
}
