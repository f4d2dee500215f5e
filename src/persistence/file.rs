use super::{PersistenceError, PersistenceResult, parse_date};
use crate::task::{DATE_FORMAT, TIMESTAMP_FORMAT, Task, TaskStatus};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct TaskSnapshot {
    project_id: String,
    tasks: Vec<Task>,
}

pub fn save_tasks_to_json<P: AsRef<Path>>(
    project_id: &str,
    tasks: &[Task],
    path: P,
) -> PersistenceResult<()> {
    super::validate_tasks(tasks)?;
    let snapshot = TaskSnapshot {
        project_id: project_id.to_string(),
        tasks: tasks.to_vec(),
    };
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    Ok(())
}

/// Reads a snapshot written by [`save_tasks_to_json`]; returns its project id
/// and tasks.
pub fn load_tasks_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<(String, Vec<Task>)> {
    let file = File::open(path)?;
    let snapshot: TaskSnapshot = serde_json::from_reader(file)?;
    super::validate_tasks(&snapshot.tasks)?;
    if let Some(stray) = snapshot
        .tasks
        .iter()
        .find(|task| task.project_id != snapshot.project_id)
    {
        return Err(PersistenceError::InvalidData(format!(
            "task {} belongs to project {}, not {}",
            stray.id, stray.project_id, snapshot.project_id
        )));
    }
    Ok((snapshot.project_id, snapshot.tasks))
}

#[derive(Serialize, Deserialize)]
struct TaskCsvRecord {
    id: String,
    project_id: String,
    parent_id: String,
    title: String,
    description: String,
    status: String,
    priority: i32,
    start_date: String,
    end_date: String,
    progress: i32,
    order_index: i32,
    created_at: String,
}

impl From<&Task> for TaskCsvRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            project_id: task.project_id.clone(),
            parent_id: task.parent_id.clone().unwrap_or_default(),
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            status: task.status.as_str().to_string(),
            priority: task.priority,
            start_date: format_date(task.start_date),
            end_date: format_date(task.end_date),
            progress: task.progress,
            order_index: task.order_index,
            created_at: task.created_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

impl TaskCsvRecord {
    fn into_task(self) -> PersistenceResult<Task> {
        let status = self
            .status
            .parse::<TaskStatus>()
            .map_err(|err| PersistenceError::InvalidData(err.to_string()))?;
        let created_at = NaiveDateTime::parse_from_str(self.created_at.trim(), TIMESTAMP_FORMAT)
            .map_err(|err| {
                PersistenceError::InvalidData(format!(
                    "invalid created_at '{}': {err}",
                    self.created_at
                ))
            })?;
        Ok(Task {
            id: self.id,
            project_id: self.project_id,
            parent_id: non_empty(self.parent_id),
            title: self.title,
            description: non_empty(self.description),
            status,
            priority: self.priority,
            start_date: parse_date(&self.start_date)?,
            end_date: parse_date(&self.end_date)?,
            progress: self.progress,
            order_index: self.order_index,
            created_at,
        })
    }
}

pub fn save_tasks_to_csv<P: AsRef<Path>>(tasks: &[Task], path: P) -> PersistenceResult<()> {
    super::validate_tasks(tasks)?;
    let mut writer = csv::Writer::from_path(path)?;
    for task in tasks {
        writer.serialize(TaskCsvRecord::from(task))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_tasks_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<Task>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut tasks = Vec::new();
    for record in reader.deserialize::<TaskCsvRecord>() {
        tasks.push(record?.into_task()?);
    }
    super::validate_tasks(&tasks)?;
    Ok(tasks)
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
