mod consumption;
mod source;

use serde::{Deserialize, Serialize};

pub use consumption::{ConsumptionRecord, daily_consumption};
pub use source::{CuratedEvents, DatasetId, DetectedEvents, SwitchEventSource, VerifiedEventCache};

use crate::core::{
    time::{DateTime, Duration},
    timeseries::DataFrame,
    unit::SwitchState,
};
use crate::t;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwitchEvent {
    pub timestamp: DateTime,
    pub new_state: SwitchState,
    pub time_since_prior_transition: Option<Duration>,
    pub time_until_next_transition: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    SwitchOff,
    SwitchOn,
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionKind::SwitchOff => write!(f, "switch-off"),
            TransitionKind::SwitchOn => write!(f, "switch-on"),
        }
    }
}

//Minimum quiet periods around a switch event for it to yield a clean transient
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QualificationCriteria {
    pub off_min_before: Duration,
    pub off_min_after: Duration,
    pub on_min_before: Duration,
    pub on_min_after: Duration,
}

impl Default for QualificationCriteria {
    fn default() -> Self {
        Self {
            off_min_before: t!(30 minutes),
            off_min_after: t!(5 hours),
            on_min_before: t!(5 hours),
            on_min_after: t!(1 hours),
        }
    }
}

impl SwitchEvent {
    pub fn from_frame(switch: &DataFrame<SwitchState>) -> Vec<SwitchEvent> {
        let mut prev: Option<DateTime> = None;

        switch
            .with_duration_until_next_dp()
            .into_iter()
            .map(|dp| {
                let (new_state, time_until_next_transition) = dp.value;
                let event = SwitchEvent {
                    timestamp: dp.timestamp,
                    new_state,
                    time_since_prior_transition: prev.map(|p| dp.timestamp.elapsed_since(p)),
                    time_until_next_transition,
                };
                prev = Some(dp.timestamp);
                event
            })
            .collect()
    }

    pub fn kind(&self) -> TransitionKind {
        match self.new_state {
            SwitchState::On => TransitionKind::SwitchOn,
            SwitchState::Off => TransitionKind::SwitchOff,
        }
    }

    pub fn qualifies_as(&self, kind: TransitionKind, criteria: &QualificationCriteria) -> bool {
        if self.kind() != kind {
            return false;
        }

        let (min_before, min_after) = match kind {
            TransitionKind::SwitchOff => (criteria.off_min_before, criteria.off_min_after),
            TransitionKind::SwitchOn => (criteria.on_min_before, criteria.on_min_after),
        };

        matches!(
            (self.time_since_prior_transition, self.time_until_next_transition),
            (Some(before), Some(after)) if before >= min_before && after >= min_after
        )
    }
}
