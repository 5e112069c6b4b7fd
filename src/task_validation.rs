use crate::error::GraphDefect;
use crate::task::Task;
use std::collections::HashSet;

pub fn validate_task(task: &Task) -> Result<(), GraphDefect> {
    if task.duration_days < 0 {
        return Err(GraphDefect::NegativeDuration {
            task: task.id.clone(),
            duration_days: task.duration_days,
        });
    }
    Ok(())
}

pub fn validate_task_collection(tasks: &[Task]) -> Result<(), GraphDefect> {
    let mut seen_ids = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen_ids.insert(&task.id) {
            return Err(GraphDefect::DuplicateTask {
                task: task.id.clone(),
            });
        }
        validate_task(task)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_duration() {
        let err = validate_task(&Task::new("A", -2)).unwrap_err();
        assert_eq!(err.to_string(), "task A has negative duration -2");
    }

    #[test]
    fn rejects_duplicate_ids() {
        let tasks = vec![Task::new("A", 1), Task::new("B", 0), Task::new("A", 3)];
        assert_eq!(
            validate_task_collection(&tasks),
            Err(GraphDefect::DuplicateTask { task: "A".into() })
        );
    }

    #[test]
    fn zero_duration_milestones_are_valid() {
        assert!(validate_task_collection(&[Task::new("M", 0)]).is_ok());
    }
}
