//! Forward and backward passes, float and critical path extraction.
//!
//! Everything in here works on integer day offsets from the schedule start.
//! A finish offset is exclusive: a task with `start = 3` and duration 2 has
//! `finish = 5`, so `finish = start + duration` always holds.

pub mod backward_pass;
pub mod critical_path;
pub mod float;
pub mod forward_pass;

use crate::calendar::Calendar;
use crate::graph::DependencyGraph;
use crate::task::{DependencyType, Task};
use chrono::NaiveDate;
use petgraph::graph::NodeIndex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use backward_pass::BackwardPass;
pub use critical_path::{CriticalPathResolver, CriticalPathResult, FloatSummary};
pub use float::{FloatCalculator, TaskFloat};
pub use forward_pass::{Driver, ForwardPass};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EarlyDates {
    pub start: i64,
    pub finish: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LateDates {
    pub start: i64,
    pub finish: i64,
}

/// Lower bound a dependency places on the successor's early start.
pub fn earliest_successor_start(
    kind: DependencyType,
    lag_days: i64,
    predecessor: EarlyDates,
    successor_duration: i64,
) -> i64 {
    match kind {
        DependencyType::FinishToStart => predecessor.finish + lag_days,
        DependencyType::StartToStart => predecessor.start + lag_days,
        DependencyType::FinishToFinish => predecessor.finish + lag_days - successor_duration,
        DependencyType::StartToFinish => predecessor.start + lag_days - successor_duration,
    }
}

/// Upper bound a dependency places on the predecessor's late finish.
pub fn latest_predecessor_finish(
    kind: DependencyType,
    lag_days: i64,
    successor: LateDates,
    predecessor_duration: i64,
) -> i64 {
    match kind {
        DependencyType::FinishToStart => successor.start - lag_days,
        DependencyType::StartToStart => successor.start - lag_days + predecessor_duration,
        DependencyType::FinishToFinish => successor.finish - lag_days,
        DependencyType::StartToFinish => successor.finish - lag_days + predecessor_duration,
    }
}

/// Constraint dates of one task resolved into offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeBounds {
    pub earliest_start: Option<i64>,
    pub latest_finish: Option<i64>,
    pub pinned_start: Option<i64>,
}

impl NodeBounds {
    pub fn resolve(task: &Task, calendar: &dyn Calendar, origin: NaiveDate) -> Self {
        Self {
            earliest_start: task
                .constraints
                .start_no_earlier_than
                .map(|date| calendar.offset_of(origin, date)),
            latest_finish: task
                .constraints
                .finish_no_later_than
                .map(|date| calendar.offset_of(origin, date)),
            pinned_start: task.actual_start.map(|date| calendar.offset_of(origin, date)),
        }
    }
}

/// Per-node output of both passes, indexed by `NodeIndex::index()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleDates {
    pub early: Vec<EarlyDates>,
    pub late: Vec<LateDates>,
    pub drivers: Vec<Vec<Driver>>,
    /// Offset the backward pass was seeded with.
    pub late_finish_seed: i64,
}

impl ScheduleDates {
    pub fn with_len(len: usize) -> Self {
        Self {
            early: vec![EarlyDates::default(); len],
            late: vec![LateDates::default(); len],
            drivers: vec![Vec::new(); len],
            late_finish_seed: 0,
        }
    }

    /// Max early finish over all tasks, or 0 for an empty schedule.
    pub fn project_finish(&self) -> i64 {
        self.early.iter().map(|e| e.finish).max().unwrap_or(0)
    }
}

/// Runs the forward and backward passes over a topologically ordered graph.
pub struct DateCalculator<'a> {
    graph: &'a DependencyGraph,
    bounds: &'a [NodeBounds],
    clamp_negative_offsets: bool,
    target_finish: Option<i64>,
}

impl<'a> DateCalculator<'a> {
    pub fn new(
        graph: &'a DependencyGraph,
        bounds: &'a [NodeBounds],
        clamp_negative_offsets: bool,
        target_finish: Option<i64>,
    ) -> Self {
        Self {
            graph,
            bounds,
            clamp_negative_offsets,
            target_finish,
        }
    }

    pub fn forward_pass(&self) -> ForwardPass<'a> {
        ForwardPass::new(self.graph, self.bounds, self.clamp_negative_offsets)
    }

    pub fn backward_pass(&self) -> BackwardPass<'a> {
        BackwardPass::new(self.graph, self.bounds)
    }

    /// Seed for the backward pass: the explicit target, else the project finish.
    pub fn late_finish_seed(&self, dates: &ScheduleDates) -> i64 {
        self.target_finish.unwrap_or_else(|| dates.project_finish())
    }

    pub fn compute(&self, order: &[NodeIndex]) -> ScheduleDates {
        let mut dates = ScheduleDates::with_len(self.graph.task_count());
        self.forward_pass()
            .execute(order, None, &mut dates.early, &mut dates.drivers);
        dates.late_finish_seed = self.late_finish_seed(&dates);
        self.backward_pass()
            .execute(order, dates.late_finish_seed, None, &mut dates.late);
        debug!(
            tasks = order.len(),
            seed = dates.late_finish_seed,
            "computed schedule dates"
        );
        dates
    }

    /// Same result as [`DateCalculator::compute`], with each weakly connected
    /// component's passes run on the rayon pool. Components share nothing but
    /// the backward seed, which is settled between the two passes.
    pub fn compute_components(&self, components: &[Vec<NodeIndex>]) -> ScheduleDates {
        let mut dates = ScheduleDates::with_len(self.graph.task_count());
        let forward = self.forward_pass();

        let forward_results: Vec<Vec<(NodeIndex, EarlyDates, Vec<Driver>)>> = components
            .par_iter()
            .map(|component| forward.execute_component(component))
            .collect();
        for results in forward_results {
            for (ix, early, drivers) in results {
                dates.early[ix.index()] = early;
                dates.drivers[ix.index()] = drivers;
            }
        }

        dates.late_finish_seed = self.late_finish_seed(&dates);
        let seed = dates.late_finish_seed;
        let backward = self.backward_pass();

        let backward_results: Vec<Vec<(NodeIndex, LateDates)>> = components
            .par_iter()
            .map(|component| backward.execute_component(component, seed))
            .collect();
        for results in backward_results {
            for (ix, late) in results {
                dates.late[ix.index()] = late;
            }
        }

        debug!(
            components = components.len(),
            seed, "computed schedule dates per component"
        );
        dates
    }
}
