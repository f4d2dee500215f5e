use super::{PersistenceError, PersistenceResult, TaskStore};
use crate::task::{
    DATE_FORMAT, DailyTodo, DailyTodoWithTask, Project, TIMESTAMP_FORMAT, Task, TaskStatus,
};
use crate::task_validation;
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use uuid::Uuid;

const TASK_COLUMNS: &str = "id, project_id, parent_id, title, description, status, priority, \
     start_date, end_date, progress, order_index, created_at";

const PROJECT_COLUMNS: &str = "id, name, description, start_date, end_date, created_at";

/// Projects, tasks and daily todos in a single SQLite database.
pub struct SqliteStore {
    connection: Mutex<Connection>,
}

/// Fields accepted when creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub parent_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: i32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::from_connection(connection)
    }

    pub fn open_in_memory() -> PersistenceResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> PersistenceResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                start_date TEXT,
                end_date TEXT,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                parent_id TEXT REFERENCES tasks(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                description TEXT,
                status TEXT DEFAULT 'pending',
                priority INTEGER DEFAULT 0,
                start_date TEXT,
                end_date TEXT,
                progress INTEGER DEFAULT 0,
                order_index INTEGER DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS daily_todos (
                id TEXT PRIMARY KEY,
                task_id TEXT REFERENCES tasks(id) ON DELETE SET NULL,
                title TEXT NOT NULL,
                date TEXT NOT NULL,
                completed INTEGER DEFAULT 0,
                memo TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_project_id ON tasks(project_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_parent_id ON tasks(parent_id);
            CREATE INDEX IF NOT EXISTS idx_daily_todos_date ON daily_todos(date);
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    // Projects

    pub fn create_project(
        &self,
        name: &str,
        description: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> PersistenceResult<Project> {
        if name.trim().is_empty() {
            return Err(PersistenceError::InvalidData(
                "project name must not be empty".into(),
            ));
        }
        check_range("project", start_date, end_date)?;
        let project = Project {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.map(ToOwned::to_owned),
            start_date,
            end_date,
            created_at: now(),
        };
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO projects (id, name, description, start_date, end_date, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project.id,
                project.name,
                project.description,
                format_date(project.start_date),
                format_date(project.end_date),
                format_timestamp(project.created_at),
            ],
        )?;
        tracing::debug!(project_id = %project.id, "created project");
        Ok(project)
    }

    pub fn list_projects(&self) -> PersistenceResult<Vec<Project>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC"
        ))?;
        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    pub fn get_project(&self, id: &str) -> PersistenceResult<Option<Project>> {
        let conn = self.connection.lock();
        let project = conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                params![id],
                project_from_row,
            )
            .optional()?;
        Ok(project)
    }

    pub fn update_project(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> PersistenceResult<()> {
        check_range("project", start_date, end_date)?;
        let conn = self.connection.lock();
        let changed = conn.execute(
            "UPDATE projects SET name = ?1, description = ?2, start_date = ?3, end_date = ?4 \
             WHERE id = ?5",
            params![
                name,
                description,
                format_date(start_date),
                format_date(end_date),
                id
            ],
        )?;
        expect_changed(changed, "project", id)
    }

    pub fn delete_project(&self, id: &str) -> PersistenceResult<bool> {
        let conn = self.connection.lock();
        let changed = conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    // Tasks

    /// Inserts a task ranked after its existing siblings.
    pub fn create_task(&self, project_id: &str, new_task: NewTask) -> PersistenceResult<Task> {
        let mut task = Task::new(Uuid::new_v4().to_string(), project_id, new_task.title);
        task.parent_id = new_task.parent_id;
        task.description = new_task.description;
        task.status = new_task.status;
        task.priority = new_task.priority;
        task.start_date = new_task.start_date;
        task.end_date = new_task.end_date;
        task.created_at = now();
        task_validation::validate_task(&task)?;

        let conn = self.connection.lock();
        if let Some(parent_id) = task.parent_id.as_deref() {
            let parent_project: Option<String> = conn
                .query_row(
                    "SELECT project_id FROM tasks WHERE id = ?1",
                    params![parent_id],
                    |row| row.get(0),
                )
                .optional()?;
            match parent_project {
                None => return Err(PersistenceError::NotFound(format!("task {parent_id}"))),
                Some(owner) if owner != project_id => {
                    return Err(PersistenceError::InvalidData(format!(
                        "parent task {parent_id} belongs to project {owner}, not {project_id}"
                    )));
                }
                Some(_) => {}
            }
        }
        task.order_index = conn.query_row(
            "SELECT COALESCE(MAX(order_index), -1) + 1 FROM tasks \
             WHERE project_id = ?1 AND parent_id IS ?2",
            params![project_id, task.parent_id],
            |row| row.get(0),
        )?;
        conn.execute(
            &format!(
                "INSERT INTO tasks ({TASK_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            params![
                task.id,
                task.project_id,
                task.parent_id,
                task.title,
                task.description,
                task.status.as_str(),
                task.priority,
                format_date(task.start_date),
                format_date(task.end_date),
                task.progress,
                task.order_index,
                format_timestamp(task.created_at),
            ],
        )?;
        tracing::debug!(task_id = %task.id, project_id, order_index = task.order_index, "created task");
        Ok(task)
    }

    pub fn get_task(&self, id: &str) -> PersistenceResult<Option<Task>> {
        let conn = self.connection.lock();
        let task = conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    /// Deletes a task; descendants go with it.
    pub fn delete_task(&self, id: &str) -> PersistenceResult<bool> {
        let conn = self.connection.lock();
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    // Daily todos

    pub fn create_daily_todo(
        &self,
        task_id: Option<&str>,
        title: &str,
        date: NaiveDate,
        memo: Option<&str>,
    ) -> PersistenceResult<DailyTodo> {
        let todo = DailyTodo {
            id: Uuid::new_v4().to_string(),
            task_id: task_id.map(ToOwned::to_owned),
            title: title.to_string(),
            date,
            completed: false,
            memo: memo.map(ToOwned::to_owned),
            created_at: now(),
        };
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO daily_todos (id, task_id, title, date, completed, memo, created_at) \
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)",
            params![
                todo.id,
                todo.task_id,
                todo.title,
                todo.date.format(DATE_FORMAT).to_string(),
                todo.memo,
                format_timestamp(todo.created_at),
            ],
        )?;
        Ok(todo)
    }

    /// Todos for one day, incomplete first, then in creation order.
    pub fn list_todos_by_date(&self, date: NaiveDate) -> PersistenceResult<Vec<DailyTodoWithTask>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(
            "SELECT dt.id, dt.task_id, dt.title, dt.date, dt.completed, dt.memo, dt.created_at, \
                    t.title AS task_title, p.name AS project_name \
             FROM daily_todos dt \
             LEFT JOIN tasks t ON dt.task_id = t.id \
             LEFT JOIN projects p ON t.project_id = p.id \
             WHERE dt.date = ?1 \
             ORDER BY dt.completed, dt.created_at, dt.rowid",
        )?;
        let todos = stmt
            .query_map(params![date.format(DATE_FORMAT).to_string()], |row| {
                Ok(DailyTodoWithTask {
                    todo: DailyTodo {
                        id: row.get(0)?,
                        task_id: row.get(1)?,
                        title: row.get(2)?,
                        date: required_date_column(row, 3)?,
                        completed: row.get::<_, i32>(4)? == 1,
                        memo: row.get(5)?,
                        created_at: timestamp_column(row, 6)?,
                    },
                    task_title: row.get(7)?,
                    project_name: row.get(8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(todos)
    }

    /// Flips completion; returns the new state.
    pub fn toggle_todo(&self, id: &str) -> PersistenceResult<bool> {
        let conn = self.connection.lock();
        let current: Option<i32> = conn
            .query_row(
                "SELECT completed FROM daily_todos WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(current) = current else {
            return Err(PersistenceError::NotFound(format!("todo {id}")));
        };
        let completed = current != 1;
        conn.execute(
            "UPDATE daily_todos SET completed = ?1 WHERE id = ?2",
            params![i32::from(completed), id],
        )?;
        Ok(completed)
    }

    pub fn update_todo_memo(&self, id: &str, memo: Option<&str>) -> PersistenceResult<()> {
        let conn = self.connection.lock();
        let changed = conn.execute(
            "UPDATE daily_todos SET memo = ?1 WHERE id = ?2",
            params![memo, id],
        )?;
        expect_changed(changed, "todo", id)
    }

    pub fn delete_todo(&self, id: &str) -> PersistenceResult<bool> {
        let conn = self.connection.lock();
        let changed = conn.execute("DELETE FROM daily_todos WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Puts a task on the todo list for `date`, titled after the task.
    pub fn add_task_to_todo(&self, task_id: &str, date: NaiveDate) -> PersistenceResult<DailyTodo> {
        let title = {
            let conn = self.connection.lock();
            conn.query_row(
                "SELECT title FROM tasks WHERE id = ?1",
                params![task_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?
        };
        let Some(title) = title else {
            return Err(PersistenceError::NotFound(format!("task {task_id}")));
        };
        self.create_daily_todo(Some(task_id), &title, date, None)
    }
}

impl TaskStore for SqliteStore {
    fn list_tasks(&self, project_id: &str) -> PersistenceResult<Vec<Task>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ?1 ORDER BY order_index"
        ))?;
        let tasks = stmt
            .query_map(params![project_id], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    fn update_task_dates(
        &self,
        task_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> PersistenceResult<()> {
        task_validation::validate_date_pair(task_id, start, end)?;
        let conn = self.connection.lock();
        let changed = conn.execute(
            "UPDATE tasks SET start_date = ?1, end_date = ?2 WHERE id = ?3",
            params![format_date(start), format_date(end), task_id],
        )?;
        tracing::debug!(task_id, ?start, ?end, "updated task dates");
        expect_changed(changed, "task", task_id)
    }

    fn update_task(&self, task: &Task) -> PersistenceResult<()> {
        task_validation::validate_task(task)?;
        let conn = self.connection.lock();
        let changed = conn.execute(
            "UPDATE tasks SET title = ?1, description = ?2, status = ?3, priority = ?4, \
             start_date = ?5, end_date = ?6, progress = ?7 WHERE id = ?8",
            params![
                task.title,
                task.description,
                task.status.as_str(),
                task.priority,
                format_date(task.start_date),
                format_date(task.end_date),
                task.progress,
                task.id,
            ],
        )?;
        tracing::debug!(task_id = %task.id, "updated task");
        expect_changed(changed, "task", &task.id)
    }
}

fn now() -> NaiveDateTime {
    let now = chrono::Local::now().naive_local();
    // Round-trips through TIMESTAMP_FORMAT, which has second precision.
    NaiveDateTime::parse_from_str(&format_timestamp(now), TIMESTAMP_FORMAT).unwrap_or(now)
}

fn check_range(
    what: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> PersistenceResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(PersistenceError::InvalidData(format!(
                "{what} start date {start} is after end date {end}"
            )));
        }
    }
    Ok(())
}

fn expect_changed(changed: usize, what: &str, id: &str) -> PersistenceResult<()> {
    if changed == 0 {
        return Err(PersistenceError::NotFound(format!("{what} {id}")));
    }
    Ok(())
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, DATE_FORMAT)
            .map(Some)
            .map_err(|err| conversion_error(idx, err)),
    }
}

fn required_date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|err| conversion_error(idx, err))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .map_err(|err| conversion_error(idx, err))
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status_raw: Option<String> = row.get(5)?;
    let status = match status_raw {
        Some(raw) => raw.parse::<TaskStatus>().map_err(|err| conversion_error(5, err))?,
        None => TaskStatus::Pending,
    };
    Ok(Task {
        id: row.get(0)?,
        project_id: row.get(1)?,
        parent_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status,
        priority: row.get::<_, Option<i32>>(6)?.unwrap_or(0),
        start_date: date_column(row, 7)?,
        end_date: date_column(row, 8)?,
        progress: row.get::<_, Option<i32>>(9)?.unwrap_or(0),
        order_index: row.get::<_, Option<i32>>(10)?.unwrap_or(0),
        created_at: timestamp_column(row, 11)?,
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        start_date: date_column(row, 3)?,
        end_date: date_column(row, 4)?,
        created_at: timestamp_column(row, 5)?,
    })
}
