use crate::calculations::{
    CriticalPathResolver, CriticalPathResult, DateCalculator, FloatCalculator, NodeBounds,
    ScheduleDates, TaskFloat,
};
use crate::calendar::{Calendar, ConsecutiveDayCalendar};
use crate::config::EngineConfig;
use crate::error::{Result, ScheduleError};
use crate::graph::components::split_components;
use crate::graph::{CycleDetector, DependencyGraph};
use crate::metadata::ScheduleParameters;
use crate::task::{Dependency, Task, TaskId};
use chrono::NaiveDate;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Computed fields of one task, as day offsets from the schedule start.
/// Finish offsets are exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub early_start: i64,
    pub early_finish: i64,
    pub late_start: i64,
    pub late_finish: i64,
    pub total_float_days: i64,
    pub free_float_days: i64,
    pub is_critical: bool,
}

/// A [`TaskRecord`] with offsets converted through the schedule's calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatedTaskRecord {
    pub task_id: TaskId,
    pub early_start: NaiveDate,
    pub early_finish: NaiveDate,
    pub late_start: NaiveDate,
    pub late_finish: NaiveDate,
    pub total_float_days: i64,
    pub free_float_days: i64,
    pub is_critical: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResult {
    /// One record per task, in input order.
    pub records: Vec<TaskRecord>,
    pub critical_path: CriticalPathResult,
}

impl ScheduleResult {
    pub fn record(&self, id: &TaskId) -> Option<&TaskRecord> {
        self.records.iter().find(|record| &record.task_id == id)
    }

    pub fn project_duration_days(&self) -> i64 {
        self.critical_path.project_duration_days
    }
}

/// Per-node state of a finished computation, kept by the coordinator so
/// later edits can patch it in place.
#[derive(Debug, Clone)]
pub(crate) struct ComputedSchedule {
    pub order: Vec<NodeIndex>,
    pub bounds: Vec<NodeBounds>,
    pub dates: ScheduleDates,
    pub floats: Vec<TaskFloat>,
}

/// One schedule's tasks and dependencies plus everything needed to turn them
/// into dates: parameters, engine configuration and a calendar.
#[derive(Debug, Clone)]
pub struct ScheduleGraph {
    params: ScheduleParameters,
    config: EngineConfig,
    calendar: Arc<dyn Calendar>,
    dag: DependencyGraph,
}

impl ScheduleGraph {
    pub fn build(
        tasks: &[Task],
        dependencies: &[Dependency],
        params: ScheduleParameters,
    ) -> Result<Self> {
        params.validate()?;
        let dag = DependencyGraph::build(tasks, dependencies)?;
        Ok(Self {
            params,
            config: EngineConfig::default(),
            calendar: Arc::new(ConsecutiveDayCalendar),
            dag,
        })
    }

    pub fn with_calendar(mut self, calendar: Arc<dyn Calendar>) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn params(&self) -> &ScheduleParameters {
        &self.params
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn calendar(&self) -> &dyn Calendar {
        self.calendar.as_ref()
    }

    pub fn dag(&self) -> &DependencyGraph {
        &self.dag
    }

    pub(crate) fn dag_mut(&mut self) -> &mut DependencyGraph {
        &mut self.dag
    }

    /// Validates acyclicity, then runs both passes, float and critical path
    /// extraction over the whole graph.
    pub fn compute(&self) -> Result<ScheduleResult> {
        let computed = self.evaluate()?;
        Ok(self.publish(&computed))
    }

    /// Fails with `DateOutOfRange` when an offset lands outside the dates the
    /// calendar can represent.
    pub fn dated_record(&self, record: &TaskRecord) -> Result<DatedTaskRecord> {
        let origin = self.params.schedule_start_date;
        let date = |offset| {
            self.calendar
                .date_at(origin, offset)
                .ok_or(ScheduleError::DateOutOfRange { origin, offset })
        };
        Ok(DatedTaskRecord {
            task_id: record.task_id.clone(),
            early_start: date(record.early_start)?,
            early_finish: date(record.early_finish)?,
            late_start: date(record.late_start)?,
            late_finish: date(record.late_finish)?,
            total_float_days: record.total_float_days,
            free_float_days: record.free_float_days,
            is_critical: record.is_critical,
        })
    }

    pub fn dated_records(&self, result: &ScheduleResult) -> Result<Vec<DatedTaskRecord>> {
        result
            .records
            .iter()
            .map(|record| self.dated_record(record))
            .collect()
    }

    pub(crate) fn target_offset(&self) -> Option<i64> {
        self.params
            .target_finish_date
            .map(|date| self.calendar.offset_of(self.params.schedule_start_date, date))
    }

    pub(crate) fn bounds(&self) -> Vec<NodeBounds> {
        let origin = self.params.schedule_start_date;
        self.dag
            .tasks()
            .map(|task| NodeBounds::resolve(task, self.calendar.as_ref(), origin))
            .collect()
    }

    pub(crate) fn node_bounds(&self, ix: NodeIndex) -> NodeBounds {
        NodeBounds::resolve(
            self.dag.node(ix),
            self.calendar.as_ref(),
            self.params.schedule_start_date,
        )
    }

    pub(crate) fn date_calculator<'a>(&'a self, bounds: &'a [NodeBounds]) -> DateCalculator<'a> {
        DateCalculator::new(
            &self.dag,
            bounds,
            self.params.clamp_negative_offsets,
            self.target_offset(),
        )
    }

    pub(crate) fn float_calculator(&self) -> FloatCalculator<'_> {
        FloatCalculator::new(&self.dag, self.params.criticality_threshold_days)
    }

    pub(crate) fn evaluate(&self) -> Result<ComputedSchedule> {
        CycleDetector::ensure_acyclic(&self.dag)?;
        let order = self.dag.topological_indices()?;
        let bounds = self.bounds();
        let calculator = self.date_calculator(&bounds);

        let dates = if self.config.parallel_components {
            let components = split_components(&self.dag, &order);
            if components.len() > 1 {
                calculator.compute_components(&components)
            } else {
                calculator.compute(&order)
            }
        } else {
            calculator.compute(&order)
        };

        let mut floats = vec![TaskFloat::default(); self.dag.task_count()];
        self.float_calculator()
            .execute(&dates.early, &dates.late, None, &mut floats);

        debug!(tasks = order.len(), "evaluated schedule");
        Ok(ComputedSchedule {
            order,
            bounds,
            dates,
            floats,
        })
    }

    pub(crate) fn record_at(&self, computed: &ComputedSchedule, ix: NodeIndex) -> TaskRecord {
        let early = computed.dates.early[ix.index()];
        let late = computed.dates.late[ix.index()];
        let float = computed.floats[ix.index()];
        TaskRecord {
            task_id: self.dag.id(ix).clone(),
            early_start: early.start,
            early_finish: early.finish,
            late_start: late.start,
            late_finish: late.finish,
            total_float_days: float.total,
            free_float_days: float.free,
            is_critical: float.is_critical,
        }
    }

    pub(crate) fn resolve_critical_path(&self, computed: &ComputedSchedule) -> CriticalPathResult {
        CriticalPathResolver::new(&self.dag, self.config.max_critical_paths).resolve(
            &computed.dates.early,
            &computed.floats,
            &computed.dates.drivers,
        )
    }

    pub(crate) fn publish(&self, computed: &ComputedSchedule) -> ScheduleResult {
        ScheduleResult {
            records: self
                .dag
                .node_indices()
                .map(|ix| self.record_at(computed, ix))
                .collect(),
            critical_path: self.resolve_critical_path(computed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::WorkCalendar;
    use crate::task::DependencyType;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn chain() -> ScheduleGraph {
        let tasks = vec![Task::new("A", 3), Task::new("B", 2), Task::new("C", 4)];
        let deps = vec![
            Dependency::finish_to_start("A", "B"),
            Dependency::finish_to_start("B", "C"),
        ];
        ScheduleGraph::build(&tasks, &deps, ScheduleParameters::starting(d(2025, 1, 6))).unwrap()
    }

    #[test]
    fn empty_schedule_has_zero_duration() {
        let schedule = ScheduleGraph::build(&[], &[], ScheduleParameters::default()).unwrap();
        let result = schedule.compute().unwrap();
        assert!(result.records.is_empty());
        assert_eq!(result.project_duration_days(), 0);
        assert!(result.critical_path.critical_paths.is_empty());
    }

    #[test]
    fn zero_duration_milestone_sits_on_the_path() {
        let tasks = vec![Task::new("A", 2), Task::new("M", 0)];
        let deps = vec![Dependency::finish_to_start("A", "M")];
        let schedule = ScheduleGraph::build(&tasks, &deps, ScheduleParameters::default()).unwrap();
        let result = schedule.compute().unwrap();
        let milestone = result.record(&"M".into()).unwrap();
        assert_eq!((milestone.early_start, milestone.early_finish), (2, 2));
        assert!(milestone.is_critical);
        assert_eq!(
            result.critical_path.critical_paths,
            vec![vec![TaskId::from("A"), TaskId::from("M")]]
        );
    }

    #[test]
    fn dated_records_use_the_calendar() {
        let schedule = chain().with_calendar(Arc::new(WorkCalendar::default()));
        let result = schedule.compute().unwrap();
        // Monday start, A takes Mon-Wed, B Thu-Fri, C the following Mon-Thu.
        let dated = schedule.dated_records(&result).unwrap();
        assert_eq!(dated[0].early_start, d(2025, 1, 6));
        assert_eq!(dated[1].early_start, d(2025, 1, 9));
        assert_eq!(dated[2].early_start, d(2025, 1, 13));
        assert_eq!(dated[2].early_finish, d(2025, 1, 17));
    }

    #[test]
    fn dates_past_the_calendar_range_are_an_error() {
        let tasks = vec![Task::new("A", 200_000_000)];
        let schedule = ScheduleGraph::build(&tasks, &[], ScheduleParameters::default()).unwrap();
        let result = schedule.compute().unwrap();
        assert_eq!(result.records[0].early_finish, 200_000_000);

        let err = schedule.dated_records(&result).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::DateOutOfRange {
                origin: schedule.params().schedule_start_date,
                offset: 200_000_000,
            }
        );
        let err = schedule
            .clone()
            .with_calendar(Arc::new(WorkCalendar::default()))
            .dated_record(&result.records[0])
            .unwrap_err();
        assert!(matches!(err, ScheduleError::DateOutOfRange { .. }));
    }

    #[test]
    fn target_finish_adds_uniform_float() {
        let params = ScheduleParameters::starting(d(2025, 1, 1)).with_target_finish(d(2025, 1, 13));
        let tasks = vec![Task::new("A", 3), Task::new("B", 2)];
        let deps = vec![Dependency::finish_to_start("A", "B")];
        let result = ScheduleGraph::build(&tasks, &deps, params)
            .unwrap()
            .compute()
            .unwrap();
        assert!(result.records.iter().all(|r| r.total_float_days == 7));
        assert!(result.critical_path.critical_paths.is_empty());
        assert_eq!(result.project_duration_days(), 5);
    }

    #[test]
    fn finish_constraint_can_drive_float_negative() {
        let tasks = vec![
            Task::new("A", 5),
            Task::new("B", 5).with_finish_no_later_than(d(2025, 1, 9)),
        ];
        let deps = vec![Dependency::finish_to_start("A", "B")];
        let result = ScheduleGraph::build(&tasks, &deps, ScheduleParameters::default())
            .unwrap()
            .compute()
            .unwrap();
        assert_eq!(result.record(&"B".into()).unwrap().total_float_days, -2);
        assert_eq!(result.record(&"A".into()).unwrap().total_float_days, -2);
        assert_eq!(result.critical_path.float_summary.negative_float_count, 2);
    }

    #[test]
    fn parallel_components_match_sequential() {
        let tasks = vec![
            Task::new("A", 3),
            Task::new("X", 1),
            Task::new("B", 2),
            Task::new("Y", 8),
        ];
        let deps = vec![
            Dependency::finish_to_start("A", "B"),
            Dependency::new("X", "Y", DependencyType::StartToStart, 2),
        ];
        let sequential =
            ScheduleGraph::build(&tasks, &deps, ScheduleParameters::default()).unwrap();
        let parallel = sequential
            .clone()
            .with_config(EngineConfig {
                parallel_components: true,
                ..EngineConfig::default()
            })
            .unwrap();
        assert_eq!(sequential.compute().unwrap(), parallel.compute().unwrap());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let params = ScheduleParameters::starting(d(2025, 2, 1)).with_target_finish(d(2025, 1, 1));
        let err = ScheduleGraph::build(&[], &[], params).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidParameters(_)));
    }
}
