use std::path::PathBuf;

use chrono::NaiveDate;
use config::{Config, ConfigError, Environment, File};
use infrastructure::MonitoringConfig;
use serde::Deserialize;

use crate::adapter::csv::DataSources;
use crate::core::{Range, time::DateTimeRange, unit::DegreeCelsius};
use crate::estimation::EstimationConfig;
use crate::model::{HomeConfig, Loss, ParameterVector, ThermalParameters};
use crate::optimizer::{OptimizerConfig, Parameter, ParameterBounds};
use crate::scenario::{ScenarioConfig, ScenarioPolicy, ScenarioSetup};

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub monitoring: MonitoringConfig,
    pub home: HomeConfig,
    pub data: DataSettings,
    #[serde(default)]
    pub estimation: EstimationConfig,
    pub simulation: SimulationSettings,
    pub optimizer: FitSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(File::with_name("config.toml"))
    }

    //overrides like EPSILON__HOME__HEATER_POWER, unprefixed variables such as HOME are ignored
    fn load<S>(file: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let builder = Config::builder().add_source(file).add_source(
            Environment::with_prefix("EPSILON")
                .separator("__")
                .list_separator(","),
        );

        let s = builder.build()?;
        s.try_deserialize()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataSettings {
    pub sources: DataSources,
    pub output_dir: PathBuf,
    pub run_log: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationSettings {
    #[serde(default)]
    pub engine: ScenarioConfig,
    pub initial_temperature: f64,
    pub exterior_temperature: f64,
    pub target_temperature: f64,
    #[serde(default)]
    pub initial_heating: bool,
    //used when the transient estimation yields nothing
    pub thermal: Option<ThermalParameters>,
    pub policies: Vec<ScenarioPolicy>,
    pub replay_day: Option<NaiveDate>,
}

impl SimulationSettings {
    pub fn setup(&self, thermal: ThermalParameters) -> ScenarioSetup {
        ScenarioSetup {
            initial_temperature: DegreeCelsius(self.initial_temperature),
            exterior: DegreeCelsius(self.exterior_temperature),
            target: DegreeCelsius(self.target_temperature),
            thermal,
            initial_heating: self.initial_heating,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FitSettings {
    #[serde(default)]
    pub search: OptimizerConfig,
    pub initial: ParameterVector,
    pub bounds: Option<ParameterBounds>,
    pub free: Vec<Parameter>,
    #[serde(default)]
    pub loss: Loss,
    pub window: Option<DateTimeRange>,
    pub band: Option<Range<f64>>,
    pub validation: Option<ValidationWindows>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ValidationWindows {
    pub train: DateTimeRange,
    pub test: DateTimeRange,
}
