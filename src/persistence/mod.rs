use crate::task::Task;
use crate::task_validation::{self, TaskValidationError};
use chrono::NaiveDate;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("{0} not found")]
    NotFound(String),
}

impl From<TaskValidationError> for PersistenceError {
    fn from(value: TaskValidationError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// The operations the timeline engine needs from whatever owns the tasks.
pub trait TaskStore {
    /// Every task of a project. Callers treat this as a full refresh.
    fn list_tasks(&self, project_id: &str) -> PersistenceResult<Vec<Task>>;

    fn update_task_dates(
        &self,
        task_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> PersistenceResult<()>;

    /// Writes the editable fields of `task` (title, status, progress, ...).
    fn update_task(&self, task: &Task) -> PersistenceResult<()>;
}

impl<S: TaskStore + ?Sized> TaskStore for std::sync::Arc<S> {
    fn list_tasks(&self, project_id: &str) -> PersistenceResult<Vec<Task>> {
        (**self).list_tasks(project_id)
    }

    fn update_task_dates(
        &self,
        task_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> PersistenceResult<()> {
        (**self).update_task_dates(task_id, start, end)
    }

    fn update_task(&self, task: &Task) -> PersistenceResult<()> {
        (**self).update_task(task)
    }
}

pub fn validate_tasks(tasks: &[Task]) -> PersistenceResult<()> {
    task_validation::validate_task_collection(tasks).map_err(PersistenceError::from)
}

pub fn parse_date(raw: &str) -> PersistenceResult<Option<NaiveDate>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, crate::task::DATE_FORMAT)
        .map(Some)
        .map_err(|err| PersistenceError::InvalidData(format!("invalid date '{trimmed}': {err}")))
}

pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{load_tasks_from_csv, load_tasks_from_json, save_tasks_to_csv, save_tasks_to_json};
