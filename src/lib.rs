pub mod calculations;
pub mod calendar;
pub mod config;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod recalculation;
pub mod registry;
#[cfg(feature = "dataframe")]
pub mod report;
pub mod schedule;
pub mod task;
pub mod task_validation;

pub use calculations::{CriticalPathResult, FloatSummary, TaskFloat};
pub use calendar::{Calendar, ConsecutiveDayCalendar, WorkCalendar, WorkCalendarConfig};
pub use config::EngineConfig;
pub use error::{Cycle, GraphDefect, Result, ScheduleError};
pub use graph::{CycleDetector, DependencyGraph};
pub use metadata::ScheduleParameters;
pub use recalculation::{
    CoordinatorState, FullRecomputeReason, RecalculationCoordinator, RecomputeScope,
    ScheduleEdit, ScheduleRecalculated,
};
pub use registry::{ScheduleId, ScheduleRegistry};
pub use schedule::{DatedTaskRecord, ScheduleGraph, ScheduleResult, TaskRecord};
pub use task::{Dependency, DependencyType, Task, TaskConstraints, TaskId};
