use crate::task::Task;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TaskValidationError {
    message: String,
}

impl TaskValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub fn validate_task(task: &Task) -> Result<(), TaskValidationError> {
    if task.title.trim().is_empty() {
        return Err(TaskValidationError::new(format!(
            "task {} requires a non-empty title",
            task.id
        )));
    }

    if !(0..=100).contains(&task.progress) {
        return Err(TaskValidationError::new(format!(
            "task {} has invalid progress {} (must be between 0 and 100)",
            task.id, task.progress
        )));
    }

    validate_date_pair(&task.id, task.start_date, task.end_date)
}

/// Checks that a start date does not fall after its end date.
pub fn validate_date_pair(
    task_id: &str,
    start: Option<chrono::NaiveDate>,
    end: Option<chrono::NaiveDate>,
) -> Result<(), TaskValidationError> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(TaskValidationError::new(format!(
                "task {task_id} start date {start} is after end date {end}"
            )));
        }
    }
    Ok(())
}

pub fn validate_task_collection(tasks: &[Task]) -> Result<(), TaskValidationError> {
    let mut seen_ids = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen_ids.insert(task.id.as_str()) {
            return Err(TaskValidationError::new(format!(
                "duplicate task id {}",
                task.id
            )));
        }
        validate_task(task)?;
    }
    Ok(())
}
