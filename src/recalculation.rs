//! Incremental recomputation of a cached schedule after a single edit.
//!
//! The coordinator owns one [`ScheduleGraph`] together with the per-node
//! state of its last computation. An edit patches the graph, then reruns the
//! passes only over the tasks the edit can reach: descendants of the node
//! whose early dates may move, ancestors of the node whose late dates may
//! move. Whenever that set is too large, or the project finish moves without
//! an explicit target, the whole pipeline runs instead.

use crate::calculations::CriticalPathResult;
use crate::error::Result;
use crate::graph::CycleDetector;
use crate::schedule::{ComputedSchedule, ScheduleGraph, ScheduleResult, TaskRecord};
use crate::task::{Dependency, TaskConstraints, TaskId};
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinatorState {
    Idle,
    Recomputing,
}

/// The externally writable inputs of a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "edit", rename_all = "snake_case")]
pub enum ScheduleEdit {
    SetDuration {
        task_id: TaskId,
        duration_days: i64,
    },
    SetConstraints {
        task_id: TaskId,
        constraints: TaskConstraints,
    },
    AddDependency {
        dependency: Dependency,
    },
    RemoveDependency {
        predecessor: TaskId,
        successor: TaskId,
    },
}

impl ScheduleEdit {
    /// The task reported as changed. Dependency edits report their successor.
    pub fn changed_task_id(&self) -> &TaskId {
        match self {
            ScheduleEdit::SetDuration { task_id, .. } => task_id,
            ScheduleEdit::SetConstraints { task_id, .. } => task_id,
            ScheduleEdit::AddDependency { dependency } => &dependency.successor,
            ScheduleEdit::RemoveDependency { successor, .. } => successor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullRecomputeReason {
    /// The affected set reached the configured share of the graph.
    ScopeOverflow,
    /// No target finish is set and the computed project finish moved, so
    /// every late date moves with it.
    ProjectFinishMoved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecomputeScope {
    Partial,
    Full { reason: FullRecomputeReason },
}

/// Outcome of one edit, for downstream notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRecalculated {
    pub changed_task_id: TaskId,
    /// Tasks whose dates were recomputed, in input order.
    pub affected_task_ids: Vec<TaskId>,
    /// Records whose values differ from before the edit, in input order.
    pub changed_records: Vec<TaskRecord>,
    pub critical_path: CriticalPathResult,
    pub scope: RecomputeScope,
}

impl ScheduleRecalculated {
    pub fn project_duration_days(&self) -> i64 {
        self.critical_path.project_duration_days
    }
}

/// Holds one cached schedule and keeps its published result current.
#[derive(Debug)]
pub struct RecalculationCoordinator {
    schedule: ScheduleGraph,
    computed: ComputedSchedule,
    result: Arc<ScheduleResult>,
    state: CoordinatorState,
}

impl RecalculationCoordinator {
    /// Computes the schedule in full and caches it.
    pub fn new(schedule: ScheduleGraph) -> Result<Self> {
        let computed = schedule.evaluate()?;
        let result = Arc::new(schedule.publish(&computed));
        Ok(Self {
            schedule,
            computed,
            result,
            state: CoordinatorState::Idle,
        })
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn schedule(&self) -> &ScheduleGraph {
        &self.schedule
    }

    pub fn result(&self) -> Arc<ScheduleResult> {
        Arc::clone(&self.result)
    }

    pub fn into_schedule(self) -> ScheduleGraph {
        self.schedule
    }

    /// Drops the cached per-node state and recomputes from the graph.
    pub fn invalidate(&mut self) -> Result<Arc<ScheduleResult>> {
        self.state = CoordinatorState::Recomputing;
        let outcome = self.schedule.evaluate();
        self.state = CoordinatorState::Idle;

        self.computed = outcome?;
        self.result = Arc::new(self.schedule.publish(&self.computed));
        debug!("cached schedule invalidated and recomputed");
        Ok(self.result())
    }

    /// Applies one edit. A rejected edit leaves the graph and the published
    /// result exactly as they were.
    pub fn apply(&mut self, edit: ScheduleEdit) -> Result<ScheduleRecalculated> {
        self.state = CoordinatorState::Recomputing;
        let outcome = self.apply_edit(&edit);
        self.state = CoordinatorState::Idle;
        outcome
    }

    fn apply_edit(&mut self, edit: &ScheduleEdit) -> Result<ScheduleRecalculated> {
        let (forward_origin, backward_origin) = match edit {
            ScheduleEdit::SetDuration {
                task_id,
                duration_days,
            } => {
                let ix = self.schedule.dag().require(task_id)?;
                self.schedule.dag_mut().set_duration(ix, *duration_days)?;
                (ix, ix)
            }
            ScheduleEdit::SetConstraints {
                task_id,
                constraints,
            } => {
                let ix = self.schedule.dag().require(task_id)?;
                self.schedule
                    .dag_mut()
                    .set_constraints(ix, *constraints);
                self.computed.bounds[ix.index()] = self.schedule.node_bounds(ix);
                (ix, ix)
            }
            ScheduleEdit::AddDependency { dependency } => {
                let (u, v) = self.schedule.dag_mut().add_dependency(dependency)?;
                if let Err(err) = CycleDetector::ensure_acyclic(self.schedule.dag()) {
                    self.schedule
                        .dag_mut()
                        .remove_dependency(&dependency.predecessor, &dependency.successor)?;
                    debug!(
                        predecessor = %dependency.predecessor,
                        successor = %dependency.successor,
                        "rolled back dependency that closes a cycle"
                    );
                    return Err(err);
                }
                self.computed.order = self.schedule.dag().topological_indices()?;
                (v, u)
            }
            ScheduleEdit::RemoveDependency {
                predecessor,
                successor,
            } => {
                let (u, v, _) = self
                    .schedule
                    .dag_mut()
                    .remove_dependency(predecessor, successor)?;
                self.computed.order = self.schedule.dag().topological_indices()?;
                (v, u)
            }
        };

        let previous = Arc::clone(&self.result);
        let (affected, scope) = self.recompute(forward_origin, backward_origin)?;
        self.result = Arc::new(self.schedule.publish(&self.computed));

        let changed_records: Vec<TaskRecord> = self
            .result
            .records
            .iter()
            .zip(previous.records.iter())
            .filter(|(now, before)| now != before)
            .map(|(now, _)| now.clone())
            .collect();
        let affected_task_ids: Vec<TaskId> = self
            .schedule
            .dag()
            .node_indices()
            .filter(|ix| affected[ix.index()])
            .map(|ix| self.schedule.dag().id(ix).clone())
            .collect();

        info!(
            task = %edit.changed_task_id(),
            affected = affected_task_ids.len(),
            changed = changed_records.len(),
            ?scope,
            "schedule recalculated"
        );

        Ok(ScheduleRecalculated {
            changed_task_id: edit.changed_task_id().clone(),
            affected_task_ids,
            changed_records,
            critical_path: self.result.critical_path.clone(),
            scope,
        })
    }

    /// Reruns the passes over descendants of `forward_origin` and ancestors of
    /// `backward_origin`, or over everything when that is cheaper or required.
    fn recompute(
        &mut self,
        forward_origin: NodeIndex,
        backward_origin: NodeIndex,
    ) -> Result<(Vec<bool>, RecomputeScope)> {
        let dag = self.schedule.dag();
        let total = dag.task_count();
        let forward = dag.reachable(&[forward_origin], Direction::Outgoing);
        let backward = dag.reachable(&[backward_origin], Direction::Incoming);
        let affected: Vec<bool> = forward
            .iter()
            .zip(backward.iter())
            .map(|(f, b)| *f || *b)
            .collect();
        let affected_count = affected.iter().filter(|a| **a).count();

        if !self.schedule.config().allows_partial(affected_count, total) {
            info!(
                affected = affected_count,
                total,
                fraction = self.schedule.config().partial_recompute_fraction,
                "RecomputeScopeOverflow: falling back to full recompute"
            );
            self.computed = self.schedule.evaluate()?;
            return Ok((
                vec![true; total],
                RecomputeScope::Full {
                    reason: FullRecomputeReason::ScopeOverflow,
                },
            ));
        }

        let computed = &mut self.computed;
        let calculator = self.schedule.date_calculator(&computed.bounds);
        calculator.forward_pass().execute(
            &computed.order,
            Some(&forward),
            &mut computed.dates.early,
            &mut computed.dates.drivers,
        );

        let seed = calculator.late_finish_seed(&computed.dates);
        if seed != computed.dates.late_finish_seed {
            debug!(
                from = computed.dates.late_finish_seed,
                to = seed,
                "project finish moved, recomputing every late date"
            );
            computed.dates.late_finish_seed = seed;
            calculator
                .backward_pass()
                .execute(&computed.order, seed, None, &mut computed.dates.late);
            self.schedule.float_calculator().execute(
                &computed.dates.early,
                &computed.dates.late,
                None,
                &mut computed.floats,
            );
            return Ok((
                vec![true; total],
                RecomputeScope::Full {
                    reason: FullRecomputeReason::ProjectFinishMoved,
                },
            ));
        }

        calculator.backward_pass().execute(
            &computed.order,
            seed,
            Some(&backward),
            &mut computed.dates.late,
        );

        // Free float of a task reads its successors' early starts, so direct
        // predecessors of moved tasks are refreshed as well.
        let mut float_scope = affected.clone();
        for ix in dag.node_indices().filter(|ix| forward[ix.index()]) {
            for (pred, _) in dag.links(ix, Direction::Incoming) {
                float_scope[pred.index()] = true;
            }
        }
        self.schedule.float_calculator().execute(
            &computed.dates.early,
            &computed.dates.late,
            Some(&float_scope),
            &mut computed.floats,
        );

        debug!(
            affected = affected_count,
            total, "scoped recompute finished"
        );
        Ok((affected, RecomputeScope::Partial))
    }
}
