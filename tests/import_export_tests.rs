use chrono::{NaiveDate, NaiveDateTime};
use std::io::Write;
use tempfile::NamedTempFile;
use wbs_timeline::{
    PersistenceError, Task, TaskStatus, load_tasks_from_csv, load_tasks_from_json,
    save_tasks_to_csv, save_tasks_to_json,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn created() -> NaiveDateTime {
    d(2024, 5, 1).and_hms_opt(9, 30, 0).unwrap()
}

fn sample_tasks() -> Vec<Task> {
    let mut root = Task::new("root", "p1", "Launch, phase 1")
        .with_dates(d(2024, 5, 1), d(2024, 5, 31));
    root.description = Some("Top-level \"umbrella\" task".into());
    root.status = TaskStatus::InProgress;
    root.progress = 25;
    root.created_at = created();

    let mut child = Task::new("child", "p1", "Design")
        .with_parent("root")
        .with_order(1);
    child.priority = 2;
    child.created_at = created();

    vec![root, child]
}

#[test]
fn json_export_import_preserves_tasks() {
    let tasks = sample_tasks();
    let file = NamedTempFile::new().unwrap();
    save_tasks_to_json("p1", &tasks, file.path()).expect("save json");

    let (project_id, loaded) = load_tasks_from_json(file.path()).expect("load json");
    assert_eq!(project_id, "p1");
    assert_eq!(loaded, tasks);
}

#[test]
fn csv_export_import_preserves_tasks() {
    let tasks = sample_tasks();
    let file = NamedTempFile::new().unwrap();
    save_tasks_to_csv(&tasks, file.path()).expect("save csv");

    let loaded = load_tasks_from_csv(file.path()).expect("load csv");
    assert_eq!(loaded, tasks);
    assert_eq!(loaded[1].start_date, None);
    assert_eq!(loaded[1].description, None);
}

#[test]
fn export_rejects_duplicate_ids() {
    let mut tasks = sample_tasks();
    tasks[1].id = "root".into();
    let file = NamedTempFile::new().unwrap();
    assert!(matches!(
        save_tasks_to_json("p1", &tasks, file.path()),
        Err(PersistenceError::InvalidData(_))
    ));
}

#[test]
fn json_import_rejects_tasks_from_other_projects() {
    let mut file = NamedTempFile::new().unwrap();
    let body = serde_json::json!({
        "project_id": "p1",
        "tasks": [{
            "id": "t1",
            "project_id": "p2",
            "title": "Stray",
            "created_at": "2024-05-01 09:30:00"
        }]
    });
    write!(file, "{body}").unwrap();

    assert!(matches!(
        load_tasks_from_json(file.path()),
        Err(PersistenceError::InvalidData(_))
    ));
}

#[test]
fn csv_import_rejects_inverted_dates() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "id,project_id,parent_id,title,description,status,priority,start_date,end_date,progress,order_index,created_at"
    )
    .unwrap();
    writeln!(
        file,
        "t1,p1,,Backwards,,pending,0,2024-05-12,2024-05-10,0,0,2024-05-01 09:30:00"
    )
    .unwrap();

    assert!(matches!(
        load_tasks_from_csv(file.path()),
        Err(PersistenceError::InvalidData(_))
    ));
}

#[test]
fn csv_import_rejects_unknown_status() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "id,project_id,parent_id,title,description,status,priority,start_date,end_date,progress,order_index,created_at"
    )
    .unwrap();
    writeln!(file, "t1,p1,,Odd,,paused,0,,,0,0,2024-05-01 09:30:00").unwrap();

    assert!(matches!(
        load_tasks_from_csv(file.path()),
        Err(PersistenceError::InvalidData(_))
    ));
}
