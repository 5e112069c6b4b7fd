use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque task identifier, unique within one schedule.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Manual date overrides supplied by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConstraints {
    /// Raises the early start to at least this date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_no_earlier_than: Option<NaiveDate>,
    /// Caps the late finish at this date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_no_later_than: Option<NaiveDate>,
}

impl TaskConstraints {
    pub fn is_empty(&self) -> bool {
        self.start_no_earlier_than.is_none() && self.finish_no_later_than.is_none()
    }
}

/// Externally writable task input. Computed fields live in
/// [`TaskRecord`](crate::schedule::TaskRecord) and are owned by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub duration_days: i64,
    #[serde(default, skip_serializing_if = "TaskConstraints::is_empty")]
    pub constraints: TaskConstraints,
    /// Once work has started the early start is pinned to this date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_start: Option<NaiveDate>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, duration_days: i64) -> Self {
        Self {
            id: id.into(),
            duration_days,
            constraints: TaskConstraints::default(),
            actual_start: None,
        }
    }

    pub fn with_start_no_earlier_than(mut self, date: NaiveDate) -> Self {
        self.constraints.start_no_earlier_than = Some(date);
        self
    }

    pub fn with_finish_no_later_than(mut self, date: NaiveDate) -> Self {
        self.constraints.finish_no_later_than = Some(date);
        self
    }

    pub fn with_actual_start(mut self, date: NaiveDate) -> Self {
        self.actual_start = Some(date);
        self
    }
}

/// Relationship between a predecessor and a successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DependencyType {
    #[default]
    #[serde(rename = "FS", alias = "finish_to_start")]
    FinishToStart,
    #[serde(rename = "SS", alias = "start_to_start")]
    StartToStart,
    #[serde(rename = "FF", alias = "finish_to_finish")]
    FinishToFinish,
    #[serde(rename = "SF", alias = "start_to_finish")]
    StartToFinish,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::FinishToStart => "FS",
            DependencyType::StartToStart => "SS",
            DependencyType::FinishToFinish => "FF",
            DependencyType::StartToFinish => "SF",
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed, typed edge. Negative lag is a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub predecessor: TaskId,
    pub successor: TaskId,
    #[serde(default, rename = "type")]
    pub kind: DependencyType,
    #[serde(default)]
    pub lag_days: i64,
}

impl Dependency {
    pub fn new(
        predecessor: impl Into<TaskId>,
        successor: impl Into<TaskId>,
        kind: DependencyType,
        lag_days: i64,
    ) -> Self {
        Self {
            predecessor: predecessor.into(),
            successor: successor.into(),
            kind,
            lag_days,
        }
    }

    pub fn finish_to_start(predecessor: impl Into<TaskId>, successor: impl Into<TaskId>) -> Self {
        Self::new(predecessor, successor, DependencyType::FinishToStart, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_deserializes_short_and_long_type_names() {
        let short: Dependency =
            serde_json::from_str(r#"{"predecessor":"A","successor":"B","type":"SS","lag_days":2}"#)
                .unwrap();
        assert_eq!(short.kind, DependencyType::StartToStart);
        assert_eq!(short.lag_days, 2);

        let long: Dependency = serde_json::from_str(
            r#"{"predecessor":"A","successor":"B","type":"finish_to_finish"}"#,
        )
        .unwrap();
        assert_eq!(long.kind, DependencyType::FinishToFinish);
        assert_eq!(long.lag_days, 0);
    }

    #[test]
    fn dependency_type_defaults_to_finish_to_start() {
        let dep: Dependency =
            serde_json::from_str(r#"{"predecessor":"A","successor":"B"}"#).unwrap();
        assert_eq!(dep, Dependency::finish_to_start("A", "B"));
    }

    #[test]
    fn task_builders_set_constraints() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let task = Task::new("A", 3)
            .with_start_no_earlier_than(d)
            .with_actual_start(d);
        assert_eq!(task.constraints.start_no_earlier_than, Some(d));
        assert_eq!(task.constraints.finish_no_later_than, None);
        assert_eq!(task.actual_start, Some(d));
        assert_eq!(task.id.as_str(), "A");
    }
}
