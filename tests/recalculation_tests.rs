use chrono::NaiveDate;
use schedule_engine::{
    Dependency, DependencyType, EngineConfig, FullRecomputeReason, RecalculationCoordinator,
    RecomputeScope, ScheduleEdit, ScheduleError, ScheduleGraph, ScheduleParameters,
    ScheduleRegistry, Task, TaskConstraints, TaskId,
};

fn network() -> (Vec<Task>, Vec<Dependency>) {
    // A(3) -> B(2) -> C(4) is the spine; a D -> E -> F branch hangs off A.
    let tasks = vec![
        Task::new("A", 3),
        Task::new("B", 2),
        Task::new("C", 4),
        Task::new("D", 1),
        Task::new("E", 2),
        Task::new("F", 1),
    ];
    let deps = vec![
        Dependency::finish_to_start("A", "B"),
        Dependency::finish_to_start("B", "C"),
        Dependency::finish_to_start("A", "D"),
        Dependency::finish_to_start("D", "E"),
        Dependency::new("E", "F", DependencyType::StartToStart, 1),
    ];
    (tasks, deps)
}

fn coordinator(params: ScheduleParameters, fraction: f64) -> RecalculationCoordinator {
    let (tasks, deps) = network();
    let schedule = ScheduleGraph::build(&tasks, &deps, params)
        .unwrap()
        .with_config(EngineConfig {
            partial_recompute_fraction: fraction,
            ..EngineConfig::default()
        })
        .unwrap();
    RecalculationCoordinator::new(schedule).unwrap()
}

fn assert_matches_full(coordinator: &RecalculationCoordinator) {
    let fresh = coordinator.schedule().compute().unwrap();
    assert_eq!(*coordinator.result(), fresh);
}

#[test]
fn slack_branch_edit_is_scoped() {
    let mut coordinator = coordinator(ScheduleParameters::default(), 0.75);
    let event = coordinator
        .apply(ScheduleEdit::SetDuration {
            task_id: "D".into(),
            duration_days: 2,
        })
        .unwrap();

    assert_eq!(event.scope, RecomputeScope::Partial);
    let affected: Vec<&str> = event.affected_task_ids.iter().map(TaskId::as_str).collect();
    assert_eq!(affected, vec!["A", "D", "E", "F"]);
    assert_eq!(event.project_duration_days(), 9);
    assert_eq!(
        event.critical_path.critical_paths,
        vec![vec![TaskId::from("A"), TaskId::from("B"), TaskId::from("C")]]
    );
    assert_matches_full(&coordinator);
}

#[test]
fn growing_the_spine_moves_the_finish() {
    let mut coordinator = coordinator(ScheduleParameters::default(), 0.75);
    let event = coordinator
        .apply(ScheduleEdit::SetDuration {
            task_id: "C".into(),
            duration_days: 6,
        })
        .unwrap();
    assert_eq!(
        event.scope,
        RecomputeScope::Full {
            reason: FullRecomputeReason::ProjectFinishMoved
        }
    );
    assert_eq!(event.project_duration_days(), 11);
    let d = coordinator.result().record(&"D".into()).cloned().unwrap();
    assert_eq!(d.total_float_days, 5);
    assert_matches_full(&coordinator);
}

#[test]
fn target_finish_keeps_edits_partial() {
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let params = ScheduleParameters::starting(start)
        .with_target_finish(NaiveDate::from_ymd_opt(2025, 1, 21).unwrap());
    let mut coordinator = coordinator(params, 0.75);
    let event = coordinator
        .apply(ScheduleEdit::SetDuration {
            task_id: "C".into(),
            duration_days: 6,
        })
        .unwrap();

    assert_eq!(event.scope, RecomputeScope::Partial);
    assert_eq!(event.project_duration_days(), 11);
    assert!(
        coordinator
            .result()
            .records
            .iter()
            .all(|r| r.total_float_days >= 0)
    );
    assert_matches_full(&coordinator);
}

#[test]
fn constraint_and_dependency_edits_stay_equivalent_to_full() {
    let mut coordinator = coordinator(ScheduleParameters::default(), 1.0);
    let start = coordinator.schedule().params().schedule_start_date;

    let edits = vec![
        ScheduleEdit::SetConstraints {
            task_id: "E".into(),
            constraints: TaskConstraints {
                start_no_earlier_than: Some(start + chrono::Duration::days(6)),
                finish_no_later_than: None,
            },
        },
        ScheduleEdit::AddDependency {
            dependency: Dependency::new("B", "F", DependencyType::FinishToFinish, 3),
        },
        ScheduleEdit::SetConstraints {
            task_id: "C".into(),
            constraints: TaskConstraints {
                start_no_earlier_than: None,
                finish_no_later_than: Some(start + chrono::Duration::days(8)),
            },
        },
        ScheduleEdit::RemoveDependency {
            predecessor: "A".into(),
            successor: "D".into(),
        },
        ScheduleEdit::SetDuration {
            task_id: "A".into(),
            duration_days: 0,
        },
    ];

    for edit in edits {
        coordinator.apply(edit).unwrap();
        assert_matches_full(&coordinator);
    }
    let c = coordinator.result().record(&"C".into()).cloned().unwrap();
    assert!(c.late_finish <= 8);
}

#[test]
fn cyclic_edit_is_refused_and_reported() {
    let mut coordinator = coordinator(ScheduleParameters::default(), 0.5);
    let before = coordinator.result();

    let err = coordinator
        .apply(ScheduleEdit::AddDependency {
            dependency: Dependency::finish_to_start("F", "D"),
        })
        .unwrap_err();
    assert_eq!(
        err,
        ScheduleError::CycleDetected {
            cycles: vec![vec![
                TaskId::from("D"),
                TaskId::from("E"),
                TaskId::from("F")
            ]]
        }
    );
    assert_eq!(coordinator.result(), before);
    assert_eq!(coordinator.schedule().dag().dependency_count(), 5);
    assert_matches_full(&coordinator);
}

#[test]
fn events_serialize_for_downstream_consumers() {
    let mut coordinator = coordinator(ScheduleParameters::default(), 0.75);
    let event = coordinator
        .apply(ScheduleEdit::SetDuration {
            task_id: "F".into(),
            duration_days: 2,
        })
        .unwrap();
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["changed_task_id"], "F");
    assert_eq!(json["scope"]["kind"], "partial");
    assert_eq!(json["critical_path"]["project_duration_days"], 9);

    let edit: ScheduleEdit =
        serde_json::from_str(r#"{"edit":"set_duration","task_id":"F","duration_days":4}"#).unwrap();
    assert_eq!(
        edit,
        ScheduleEdit::SetDuration {
            task_id: "F".into(),
            duration_days: 4
        }
    );
}

#[test]
fn registry_routes_edits_to_the_right_schedule() {
    let registry = ScheduleRegistry::new();
    let (tasks, deps) = network();
    for id in ["north", "south"] {
        let schedule = ScheduleGraph::build(&tasks, &deps, ScheduleParameters::default()).unwrap();
        registry.register(id.into(), schedule).unwrap();
    }

    let event = registry
        .apply(
            &"south".into(),
            ScheduleEdit::SetDuration {
                task_id: "B".into(),
                duration_days: 5,
            },
        )
        .unwrap();
    assert_eq!(event.project_duration_days(), 12);
    assert_eq!(
        registry.snapshot(&"north".into()).unwrap().project_duration_days(),
        9
    );
    assert!(matches!(
        registry.apply(
            &"west".into(),
            ScheduleEdit::SetDuration {
                task_id: "B".into(),
                duration_days: 1
            }
        ),
        Err(ScheduleError::UnknownSchedule(_))
    ));
}
