use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::persistence::sqlite::NewTask;
use crate::{
    DailyTodo, DailyTodoWithTask, PersistenceError, Project, SqliteStore, Task, TaskStatus,
    TaskStore, TimelineRow, TimelineSession, generate_daily_report,
};

#[derive(Clone)]
pub struct AppState {
    store: Arc<SqliteStore>,
    unit_width: f32,
}

impl AppState {
    pub fn new(store: SqliteStore, unit_width: f32) -> Self {
        Self::with_shared(Arc::new(store), unit_width)
    }

    pub fn with_shared(store: Arc<SqliteStore>, unit_width: f32) -> Self {
        Self { store, unit_width }
    }

    fn store(&self) -> Arc<SqliteStore> {
        self.store.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<PersistenceError> for ApiError {
    fn from(value: PersistenceError) -> Self {
        match value {
            PersistenceError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            PersistenceError::InvalidData(message) => ApiError::Invalid(message),
            other => {
                tracing::error!(error = %other, "store failure");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
struct ProjectPayload {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct CreateTaskPayload {
    #[serde(default)]
    parent_id: Option<String>,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: TaskStatus,
    #[serde(default)]
    priority: i32,
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct UpdateTaskPayload {
    title: String,
    #[serde(default)]
    description: Option<String>,
    status: TaskStatus,
    #[serde(default)]
    priority: i32,
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    end_date: Option<NaiveDate>,
    #[serde(default)]
    progress: i32,
}

#[derive(Debug, Deserialize)]
struct DatesPayload {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct DateQuery {
    date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct TimelineQuery {
    #[serde(default)]
    pivot: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct CreateTodoPayload {
    #[serde(default)]
    task_id: Option<String>,
    title: String,
    date: NaiveDate,
    #[serde(default)]
    memo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MemoPayload {
    memo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReportPayload {
    date: NaiveDate,
    #[serde(default)]
    memo: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TimelineView {
    pub pivot: NaiveDate,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub unit_width: f32,
    pub total_width: f32,
    pub rows: Vec<TimelineRow>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/projects/:id/tasks", get(list_tasks).post(create_task))
        .route("/projects/:id/timeline", get(project_timeline))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/:id/dates", put(update_task_dates))
        .route("/tasks/:id/todo", post(add_task_to_todo))
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/:id", axum::routing::delete(delete_todo))
        .route("/todos/:id/toggle", post(toggle_todo))
        .route("/todos/:id/memo", put(update_todo_memo))
        .route("/reports/daily", post(daily_report))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.store().list_projects()?))
}

async fn create_project(
    State(state): State<AppState>,
    Json(payload): Json<ProjectPayload>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = state.store().create_project(
        &payload.name,
        payload.description.as_deref(),
        payload.start_date,
        payload.end_date,
    )?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Project>> {
    state
        .store()
        .get_project(&project_id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("project {project_id} not found")))
}

async fn update_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(payload): Json<ProjectPayload>,
) -> ApiResult<Json<Project>> {
    let store = state.store();
    store.update_project(
        &project_id,
        &payload.name,
        payload.description.as_deref(),
        payload.start_date,
        payload.end_date,
    )?;
    store
        .get_project(&project_id)?
        .map(Json)
        .ok_or_else(|| ApiError::Internal("project not found after update".into()))
}

async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<StatusCode> {
    if !state.store().delete_project(&project_id)? {
        return Err(ApiError::not_found(format!("project {project_id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_tasks(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.store().list_tasks(&project_id)?))
}

async fn create_task(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(payload): Json<CreateTaskPayload>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let store = state.store();
    if store.get_project(&project_id)?.is_none() {
        return Err(ApiError::not_found(format!("project {project_id} not found")));
    }
    let task = store.create_task(
        &project_id,
        NewTask {
            parent_id: payload.parent_id,
            title: payload.title,
            description: payload.description,
            status: payload.status,
            priority: payload.priority,
            start_date: payload.start_date,
            end_date: payload.end_date,
        },
    )?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn project_timeline(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<TimelineQuery>,
) -> ApiResult<Json<TimelineView>> {
    let store = state.store();
    let pivot = query
        .pivot
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let mut session = TimelineSession::new(pivot, state.unit_width);
    session.reload(store.as_ref(), &project_id)?;
    let window = session.window();
    Ok(Json(TimelineView {
        pivot: window.pivot(),
        first_day: window.first_day(),
        last_day: window.last_day(),
        unit_width: session.mapper().unit_width(),
        total_width: session.mapper().total_width(window),
        rows: session.timeline_rows(),
    }))
}

async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<Task>> {
    state
        .store()
        .get_task(&task_id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("task {task_id} not found")))
}

async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(payload): Json<UpdateTaskPayload>,
) -> ApiResult<Json<Task>> {
    let store = state.store();
    let Some(mut task) = store.get_task(&task_id)? else {
        return Err(ApiError::not_found(format!("task {task_id} not found")));
    };
    task.title = payload.title;
    task.description = payload.description;
    task.status = payload.status;
    task.priority = payload.priority;
    task.start_date = payload.start_date;
    task.end_date = payload.end_date;
    task.progress = payload.progress;
    store.update_task(&task)?;
    Ok(Json(task))
}

async fn update_task_dates(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(payload): Json<DatesPayload>,
) -> ApiResult<StatusCode> {
    state
        .store()
        .update_task_dates(&task_id, payload.start_date, payload.end_date)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<StatusCode> {
    if !state.store().delete_task(&task_id)? {
        return Err(ApiError::not_found(format!("task {task_id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn add_task_to_todo(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(query): Json<DateQuery>,
) -> ApiResult<(StatusCode, Json<DailyTodo>)> {
    let todo = state.store().add_task_to_todo(&task_id, query.date)?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn list_todos(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<Vec<DailyTodoWithTask>>> {
    Ok(Json(state.store().list_todos_by_date(query.date)?))
}

async fn create_todo(
    State(state): State<AppState>,
    Json(payload): Json<CreateTodoPayload>,
) -> ApiResult<(StatusCode, Json<DailyTodo>)> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::invalid("todo title must not be empty"));
    }
    let todo = state.store().create_daily_todo(
        payload.task_id.as_deref(),
        &payload.title,
        payload.date,
        payload.memo.as_deref(),
    )?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn toggle_todo(
    State(state): State<AppState>,
    Path(todo_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let completed = state.store().toggle_todo(&todo_id)?;
    Ok(Json(json!({ "id": todo_id, "completed": completed })))
}

async fn update_todo_memo(
    State(state): State<AppState>,
    Path(todo_id): Path<String>,
    Json(payload): Json<MemoPayload>,
) -> ApiResult<StatusCode> {
    state
        .store()
        .update_todo_memo(&todo_id, payload.memo.as_deref())?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_todo(
    State(state): State<AppState>,
    Path(todo_id): Path<String>,
) -> ApiResult<StatusCode> {
    if !state.store().delete_todo(&todo_id)? {
        return Err(ApiError::not_found(format!("todo {todo_id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn daily_report(
    State(state): State<AppState>,
    Json(payload): Json<ReportPayload>,
) -> ApiResult<Json<serde_json::Value>> {
    let todos = state.store().list_todos_by_date(payload.date)?;
    let report = generate_daily_report(payload.date, &todos, &payload.memo);
    Ok(Json(json!({ "date": payload.date, "report": report })))
}
