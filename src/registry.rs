//! Cached coordinators for many schedules, shared across threads.

use crate::error::{Result, ScheduleError};
use crate::recalculation::{RecalculationCoordinator, ScheduleEdit, ScheduleRecalculated};
use crate::schedule::{ScheduleGraph, ScheduleResult};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Identifies one schedule (project) in a [`ScheduleRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleId(String);

impl ScheduleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScheduleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

type SharedCoordinator = Arc<Mutex<RecalculationCoordinator>>;

/// At most one cached coordinator per schedule id.
///
/// Edits to one schedule serialize on that schedule's mutex; different
/// schedules only share the map lookup. Published results are immutable
/// `Arc`s that stay valid after later edits.
#[derive(Debug, Default)]
pub struct ScheduleRegistry {
    schedules: RwLock<HashMap<ScheduleId, SharedCoordinator>>,
}

impl ScheduleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes `schedule` and caches it under `id`, replacing any previous
    /// entry.
    pub fn register(&self, id: ScheduleId, schedule: ScheduleGraph) -> Result<Arc<ScheduleResult>> {
        let coordinator = RecalculationCoordinator::new(schedule)?;
        let result = coordinator.result();
        debug!(schedule = %id, tasks = result.records.len(), "registered schedule");
        self.schedules
            .write()
            .insert(id, Arc::new(Mutex::new(coordinator)));
        Ok(result)
    }

    pub fn apply(&self, id: &ScheduleId, edit: ScheduleEdit) -> Result<ScheduleRecalculated> {
        let coordinator = self.coordinator(id)?;
        let mut guard = coordinator.lock();
        guard.apply(edit)
    }

    /// Last published result for `id`.
    pub fn snapshot(&self, id: &ScheduleId) -> Option<Arc<ScheduleResult>> {
        let coordinator = self.schedules.read().get(id).cloned()?;
        let guard = coordinator.lock();
        Some(guard.result())
    }

    pub fn invalidate(&self, id: &ScheduleId) -> Result<Arc<ScheduleResult>> {
        let coordinator = self.coordinator(id)?;
        let mut guard = coordinator.lock();
        guard.invalidate()
    }

    pub fn remove(&self, id: &ScheduleId) -> Option<ScheduleGraph> {
        let coordinator = self.schedules.write().remove(id)?;
        match Arc::try_unwrap(coordinator) {
            Ok(mutex) => Some(mutex.into_inner().into_schedule()),
            Err(shared) => Some(shared.lock().schedule().clone()),
        }
    }

    pub fn contains(&self, id: &ScheduleId) -> bool {
        self.schedules.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.schedules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.read().is_empty()
    }

    /// Recomputes every registered schedule on the rayon pool. Results come
    /// back sorted by schedule id.
    pub fn recompute_all(&self) -> Vec<(ScheduleId, Result<Arc<ScheduleResult>>)> {
        let mut entries: Vec<(ScheduleId, SharedCoordinator)> = self
            .schedules
            .read()
            .iter()
            .map(|(id, coordinator)| (id.clone(), Arc::clone(coordinator)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        entries
            .into_par_iter()
            .map(|(id, coordinator)| {
                let outcome = coordinator.lock().invalidate();
                (id, outcome)
            })
            .collect()
    }

    fn coordinator(&self, id: &ScheduleId) -> Result<SharedCoordinator> {
        self.schedules
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ScheduleError::UnknownSchedule(id.clone()))
    }
}
