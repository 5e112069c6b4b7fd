//! Error types for schedule computation.

use crate::registry::ScheduleId;
use crate::task::TaskId;
use chrono::NaiveDate;
use thiserror::Error;

/// Result type for schedule engine operations.
pub type Result<T> = std::result::Result<T, ScheduleError>;

/// An ordered list of task ids where each task depends on the next and the
/// last depends on the first.
pub type Cycle = Vec<TaskId>;

/// Structural defects rejected while building a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphDefect {
    #[error("task {task} depends on itself")]
    SelfDependency { task: TaskId },

    #[error("duplicate dependency {predecessor} -> {successor}")]
    DuplicateDependency {
        predecessor: TaskId,
        successor: TaskId,
    },

    #[error("duplicate task id {task}")]
    DuplicateTask { task: TaskId },

    #[error("task {task} has negative duration {duration_days}")]
    NegativeDuration { task: TaskId, duration_days: i64 },

    #[error("dependency {predecessor} -> {successor} references unknown task {missing}")]
    DanglingReference {
        predecessor: TaskId,
        successor: TaskId,
        missing: TaskId,
    },
}

/// Errors surfaced by the engine. All of them are fatal for the request that
/// produced them; the caller corrects its input and resubmits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid schedule graph: {0}")]
    InvalidGraph(#[from] GraphDefect),

    #[error("dependency cycle detected: {}", describe_cycles(.cycles))]
    CycleDetected { cycles: Vec<Cycle> },

    #[error("dependency {predecessor} -> {successor} references unknown task {missing}")]
    DanglingReference {
        predecessor: TaskId,
        successor: TaskId,
        missing: TaskId,
    },

    #[error("task {0} not found")]
    UnknownTask(TaskId),

    #[error("no dependency {predecessor} -> {successor}")]
    UnknownDependency {
        predecessor: TaskId,
        successor: TaskId,
    },

    #[error("invalid schedule parameters: {0}")]
    InvalidParameters(String),

    #[error("schedule {0} is not registered")]
    UnknownSchedule(ScheduleId),

    #[error("offset {offset} from {origin} falls outside the supported date range")]
    DateOutOfRange { origin: NaiveDate, offset: i64 },
}

impl ScheduleError {
    /// Cycles carried by a `CycleDetected` error, empty for every other kind.
    pub fn cycles(&self) -> &[Cycle] {
        match self {
            ScheduleError::CycleDetected { cycles } => cycles,
            _ => &[],
        }
    }
}

fn describe_cycles(cycles: &[Cycle]) -> String {
    cycles
        .iter()
        .map(|cycle| {
            let mut chain: Vec<String> = cycle.iter().map(ToString::to_string).collect();
            if let Some(first) = cycle.first() {
                chain.push(first.to_string());
            }
            chain.join(" -> ")
        })
        .collect::<Vec<_>>()
        .join("; ")
}
