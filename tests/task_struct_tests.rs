use wbs_timeline::task::UnknownStatus;
use wbs_timeline::task_validation::{validate_task, validate_task_collection};
use wbs_timeline::{PersistenceError, Task, TaskStatus, TaskValidationError};

#[test]
fn status_parses_aliases_and_reports_unknown_text() {
    assert_eq!("in-progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
    assert_eq!("Done".parse::<TaskStatus>(), Ok(TaskStatus::Completed));
    let err = "paused".parse::<TaskStatus>().unwrap_err();
    assert_eq!(err, UnknownStatus("paused".into()));
    assert_eq!(err.to_string(), "unknown task status 'paused'");

    for status in TaskStatus::variants() {
        assert_eq!(status.as_str().parse::<TaskStatus>(), Ok(status));
    }
}

#[test]
fn validation_errors_carry_their_message() {
    let mut task = Task::new("t1", "p1", "  ");
    let err: TaskValidationError = validate_task(&task).unwrap_err();
    assert_eq!(err.to_string(), "task t1 requires a non-empty title");

    task.title = "Ok".into();
    task.progress = 101;
    let err = validate_task(&task).unwrap_err();
    assert!(err.to_string().contains("invalid progress 101"));

    let persisted = PersistenceError::from(err);
    assert!(matches!(persisted, PersistenceError::InvalidData(ref m) if m.contains("101")));
}

#[test]
fn collection_rejects_duplicate_ids() {
    let tasks = vec![Task::new("dup", "p1", "A"), Task::new("dup", "p1", "B")];
    let err = validate_task_collection(&tasks).unwrap_err();
    assert_eq!(err.to_string(), "duplicate task id dup");
}
