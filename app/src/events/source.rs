use std::collections::{HashMap, HashSet};

use crate::core::time::DateTime;

use super::{QualificationCriteria, SwitchEvent, TransitionKind};

pub trait SwitchEventSource {
    fn qualifying(&self, kind: TransitionKind) -> Vec<SwitchEvent>;
}

pub struct DetectedEvents {
    events: Vec<SwitchEvent>,
    criteria: QualificationCriteria,
}

impl DetectedEvents {
    pub fn new(events: Vec<SwitchEvent>, criteria: QualificationCriteria) -> Self {
        Self { events, criteria }
    }

    pub fn all(&self) -> &[SwitchEvent] {
        &self.events
    }
}

impl SwitchEventSource for DetectedEvents {
    fn qualifying(&self, kind: TransitionKind) -> Vec<SwitchEvent> {
        self.events
            .iter()
            .filter(|e| e.qualifies_as(kind, &self.criteria))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CuratedEvents {
    switch_offs: Vec<SwitchEvent>,
    switch_ons: Vec<SwitchEvent>,
}

impl CuratedEvents {
    pub fn new(switch_offs: Vec<SwitchEvent>, switch_ons: Vec<SwitchEvent>) -> Self {
        Self {
            switch_offs,
            switch_ons,
        }
    }

    //operator review: keep every detected candidate except the rejected ones
    pub fn from_review(detected: &impl SwitchEventSource, rejected: &HashSet<DateTime>) -> Self {
        let keep = |kind| -> Vec<SwitchEvent> {
            detected
                .qualifying(kind)
                .into_iter()
                .filter(|e| !rejected.contains(&e.timestamp))
                .collect()
        };

        Self::new(keep(TransitionKind::SwitchOff), keep(TransitionKind::SwitchOn))
    }
}

impl SwitchEventSource for CuratedEvents {
    fn qualifying(&self, kind: TransitionKind) -> Vec<SwitchEvent> {
        match kind {
            TransitionKind::SwitchOff => self.switch_offs.clone(),
            TransitionKind::SwitchOn => self.switch_ons.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display, derive_more::From)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

#[derive(Debug, Default)]
pub struct VerifiedEventCache {
    entries: HashMap<(DatasetId, TransitionKind), Vec<SwitchEvent>>,
}

impl VerifiedEventCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, dataset: &DatasetId, kind: TransitionKind) -> Option<&[SwitchEvent]> {
        self.entries.get(&(dataset.clone(), kind)).map(Vec::as_slice)
    }

    pub fn insert(&mut self, dataset: DatasetId, kind: TransitionKind, events: Vec<SwitchEvent>) {
        self.entries.insert((dataset, kind), events);
    }

    pub fn get_or_verify(
        &mut self,
        dataset: &DatasetId,
        kind: TransitionKind,
        verify: impl FnOnce() -> Vec<SwitchEvent>,
    ) -> &[SwitchEvent] {
        self.entries.entry((dataset.clone(), kind)).or_insert_with(verify)
    }

    pub fn invalidate(&mut self, dataset: &DatasetId) {
        self.entries.retain(|(id, _), _| id != dataset);
    }

    //only complete once both transition kinds were verified
    pub fn curated(&self, dataset: &DatasetId) -> Option<CuratedEvents> {
        let offs = self.get(dataset, TransitionKind::SwitchOff)?;
        let ons = self.get(dataset, TransitionKind::SwitchOn)?;

        Some(CuratedEvents::new(offs.to_vec(), ons.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::unit::SwitchState;
    use crate::events::tests::switch_frame;

    fn detected() -> DetectedEvents {
        DetectedEvents::new(
            SwitchEvent::from_frame(&switch_frame(&[
                ("2025-01-05T06:00:00Z", SwitchState::On),
                ("2025-01-05T08:00:00Z", SwitchState::Off),
                ("2025-01-05T18:00:00Z", SwitchState::On),
                ("2025-01-05T20:00:00Z", SwitchState::Off),
                ("2025-01-06T06:00:00Z", SwitchState::On),
            ])),
            QualificationCriteria::default(),
        )
    }

    #[test]
    fn test_review_drops_rejected_events() {
        let rejected = HashSet::from([DateTime::from_iso("2025-01-05T08:00:00Z").unwrap()]);

        let curated = CuratedEvents::from_review(&detected(), &rejected);

        let offs: Vec<_> = curated
            .qualifying(TransitionKind::SwitchOff)
            .iter()
            .map(|e| e.timestamp)
            .collect();
        assert_eq!(offs, vec![DateTime::from_iso("2025-01-05T20:00:00Z").unwrap()]);
        assert_eq!(curated.qualifying(TransitionKind::SwitchOn).len(), 1);
    }

    #[test]
    fn test_cache_is_keyed_by_dataset_and_kind() {
        let mut cache = VerifiedEventCache::new();
        let home = DatasetId::new("home");
        let office = DatasetId::new("office");
        let source = detected();

        let verified = cache
            .get_or_verify(&home, TransitionKind::SwitchOff, || {
                source.qualifying(TransitionKind::SwitchOff)
            })
            .len();

        assert_eq!(verified, 2);
        assert!(cache.get(&home, TransitionKind::SwitchOn).is_none());
        assert!(cache.get(&office, TransitionKind::SwitchOff).is_none());
        assert!(cache.curated(&home).is_none());

        cache.insert(home.clone(), TransitionKind::SwitchOn, vec![]);
        assert!(cache.curated(&home).is_some());

        cache.invalidate(&home);
        assert!(cache.get(&home, TransitionKind::SwitchOff).is_none());
    }

    #[test]
    fn test_cached_value_is_not_recomputed() {
        let mut cache = VerifiedEventCache::new();
        let home = DatasetId::new("home");
        cache.insert(home.clone(), TransitionKind::SwitchOff, vec![]);

        let events = cache.get_or_verify(&home, TransitionKind::SwitchOff, || panic!("must not verify again"));

        assert!(events.is_empty());
    }
}
