use taskheat_core::{Subtask, SubtaskId, Tag, Task, TaskId, ValidationError};

const NOW: i64 = 1_700_000_000_000;
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[test]
fn task_new_sets_defaults() {
    let task = Task::new(TaskId(1), "Buy milk", NOW + DAY_MS, NOW).unwrap();

    assert_eq!(task.id(), TaskId(1));
    assert_eq!(task.title(), "Buy milk");
    assert_eq!(task.description(), None);
    assert!(!task.is_completed());
    assert_eq!(task.start_time(), NOW);
    assert_eq!(task.expected_end_time(), NOW + DAY_MS);
    assert_eq!(task.actual_end_time(), None);
    assert_eq!(task.heat_index(), 0);
    assert!(task.tag().is_none());
    assert!(task.subtasks().is_empty());
}

#[test]
fn task_new_rejects_blank_title_and_bad_id() {
    assert_eq!(
        Task::new(TaskId(1), "   ", NOW, NOW).unwrap_err(),
        ValidationError::EmptyTaskTitle
    );
    assert_eq!(
        Task::new(TaskId(0), "title", NOW, NOW).unwrap_err(),
        ValidationError::NonPositiveTaskId(0)
    );
}

#[test]
fn completion_sets_and_clears_actual_end_time() {
    let mut task = Task::new(TaskId(1), "report", NOW + DAY_MS, NOW).unwrap();

    task.set_completed(true, NOW + 10);
    assert!(task.is_completed());
    assert_eq!(task.actual_end_time(), Some(NOW + 10));

    // Completing twice keeps the first completion time.
    task.set_completed(true, NOW + 20);
    assert_eq!(task.actual_end_time(), Some(NOW + 10));

    task.set_completed(false, NOW + 30);
    assert!(!task.is_completed());
    assert_eq!(task.actual_end_time(), None);

    task.set_completed(true, NOW + 40);
    assert_eq!(task.actual_end_time(), Some(NOW + 40));
}

#[test]
fn heat_increases_by_exactly_one_per_call() {
    let mut task = Task::new(TaskId(1), "hot", NOW, NOW).unwrap();
    for expected in 1..=5 {
        assert_eq!(task.increase_heat(), expected);
    }
    assert_eq!(task.heat_index(), 5);
}

#[test]
fn subtasks_keep_order_and_reject_duplicates_and_foreign_parents() {
    let mut task = Task::new(TaskId(7), "move house", NOW + DAY_MS, NOW).unwrap();
    let first = Subtask::new(SubtaskId(1), TaskId(7), "pack", NOW).unwrap();
    let second = Subtask::new(SubtaskId(2), TaskId(7), "drive", NOW).unwrap();
    let third = Subtask::new(SubtaskId(3), TaskId(7), "unpack", NOW).unwrap();

    task.add_subtask(first.clone()).unwrap();
    task.add_subtask(second).unwrap();
    task.add_subtask(third).unwrap();

    assert_eq!(
        task.add_subtask(first).unwrap_err(),
        ValidationError::DuplicateSubtask(SubtaskId(1))
    );

    let foreign = Subtask::new(SubtaskId(9), TaskId(8), "other", NOW).unwrap();
    assert_eq!(
        task.add_subtask(foreign).unwrap_err(),
        ValidationError::ParentMismatch {
            subtask: SubtaskId(9),
            expected: TaskId(7),
            actual: TaskId(8),
        }
    );

    let removed = task.remove_subtask(SubtaskId(2)).unwrap();
    assert_eq!(removed.title(), "drive");
    assert!(task.remove_subtask(SubtaskId(2)).is_none());

    let titles: Vec<&str> = task.subtasks().iter().map(Subtask::title).collect();
    assert_eq!(titles, vec!["pack", "unpack"]);
}

#[test]
fn subtask_completion_does_not_touch_parent() {
    let mut task = Task::new(TaskId(1), "parent", NOW + DAY_MS, NOW).unwrap();
    task.add_subtask(Subtask::new(SubtaskId(1), TaskId(1), "only step", NOW).unwrap())
        .unwrap();

    task.subtask_mut(SubtaskId(1))
        .unwrap()
        .set_completed(true, NOW + 5);

    assert!(!task.is_completed());
    assert_eq!(task.actual_end_time(), None);
    let subtask = task.subtask(SubtaskId(1)).unwrap();
    assert!(subtask.is_completed());
    assert_eq!(subtask.actual_end_time(), Some(NOW + 5));
    assert_eq!(task.subtask_progress(), (1, 1));
}

#[test]
fn subtask_new_rejects_blank_title() {
    assert_eq!(
        Subtask::new(SubtaskId(1), TaskId(1), "", NOW).unwrap_err(),
        ValidationError::EmptySubtaskTitle
    );
}

#[test]
fn tag_requires_hex_color() {
    let tag = Tag::new("work", "#1a2B3c", Some("briefcase".to_string())).unwrap();
    assert_eq!(tag.name(), "work");
    assert_eq!(tag.color(), "#1a2B3c");
    assert_eq!(tag.icon(), Some("briefcase"));

    for bad in ["red", "#12345", "#1234567", "123456", "#12345G"] {
        assert_eq!(
            Tag::new("work", bad, None).unwrap_err(),
            ValidationError::InvalidTagColor(bad.to_string())
        );
    }
}

#[test]
fn overdue_only_applies_to_incomplete_tasks_past_deadline() {
    let mut task = Task::new(TaskId(1), "deadline", NOW + 100, NOW).unwrap();
    assert!(!task.is_overdue(NOW + 100));
    assert!(task.is_overdue(NOW + 101));

    task.set_completed(true, NOW + 200);
    assert!(!task.is_overdue(NOW + 300));
}

#[test]
fn task_serialization_uses_expected_wire_fields() {
    let mut task = Task::new(TaskId(3), "ship release", NOW + DAY_MS, NOW).unwrap();
    task.set_description(Some("tag and publish".to_string()));
    task.set_tag(Some(Tag::new("work", "#FF8800", None).unwrap()));
    task.add_subtask(Subtask::new(SubtaskId(11), TaskId(3), "changelog", NOW).unwrap())
        .unwrap();
    task.set_completed(true, NOW + 50);
    task.increase_heat();

    let json = serde_json::to_value(&task).unwrap();
    assert_eq!(json["id"], 3);
    assert_eq!(json["title"], "ship release");
    assert_eq!(json["completed"], true);
    assert_eq!(json["actual_end_time"], NOW + 50);
    assert_eq!(json["heat_index"], 1);
    assert_eq!(json["tag"]["color"], "#FF8800");
    assert_eq!(json["subtasks"][0]["id"], 11);
    assert_eq!(json["subtasks"][0]["parent_id"], 3);

    let decoded: Task = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, task);
}

#[test]
fn deserialize_rejects_completion_mismatch() {
    let value = serde_json::json!({
        "id": 1,
        "title": "broken",
        "completed": true,
        "start_time": 100,
        "expected_end_time": 200,
        "actual_end_time": null
    });

    let err = serde_json::from_value::<Task>(value).unwrap_err();
    assert!(
        err.to_string()
            .contains("completed (true) disagrees with actual_end_time (None)"),
        "unexpected error: {err}"
    );
}

#[test]
fn deserialize_rejects_invalid_tag_color() {
    let value = serde_json::json!({
        "id": 1,
        "title": "tagged",
        "completed": false,
        "start_time": 100,
        "expected_end_time": 200,
        "tag": { "name": "home", "color": "blue" }
    });

    let err = serde_json::from_value::<Task>(value).unwrap_err();
    assert!(err.to_string().contains("#RRGGBB"), "unexpected error: {err}");
}
