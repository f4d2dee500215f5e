#![cfg(feature = "http_api")]

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;
use wbs_timeline::http_api::{self, TimelineView};
use wbs_timeline::{DailyTodo, Project, SqliteStore, Task};

fn new_router() -> axum::Router {
    let store = SqliteStore::open_in_memory().unwrap();
    http_api::router(http_api::AppState::new(store, 30.0))
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn create_project(app: &axum::Router, name: &str) -> Project {
    let (status, bytes) = send(app, "POST", "/projects", Some(json!({ "name": name }))).await;
    assert_eq!(status, StatusCode::CREATED);
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_task(app: &axum::Router, project_id: &str, body: Value) -> Task {
    let uri = format!("/projects/{project_id}/tasks");
    let (status, bytes) = send(app, "POST", &uri, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = new_router();
    let (status, bytes) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn project_lifecycle_via_http_api() {
    let app = new_router();
    let project = create_project(&app, "Website").await;

    let (status, bytes) = send(&app, "GET", &format!("/projects/{}", project.id), None).await;
    assert_eq!(status, StatusCode::OK);
    let fetched: Project = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(fetched.name, "Website");

    let (status, bytes) = send(
        &app,
        "PUT",
        &format!("/projects/{}", project.id),
        Some(json!({ "name": "Relaunch", "end_date": "2024-09-30" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated: Project = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(updated.name, "Relaunch");

    let (status, _) = send(&app, "DELETE", &format!("/projects/{}", project.id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, bytes) = send(&app, "GET", &format!("/projects/{}", project.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn invalid_project_is_rejected() {
    let app = new_router();
    let (status, bytes) = send(
        &app,
        "POST",
        "/projects",
        Some(json!({ "name": "Backwards", "start_date": "2024-06-01", "end_date": "2024-05-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn tasks_under_missing_project_are_not_found() {
    let app = new_router();
    let (status, _) = send(
        &app,
        "POST",
        "/projects/nope/tasks",
        Some(json!({ "title": "Orphan" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn timeline_returns_expanded_rows_with_bars() {
    let app = new_router();
    let project = create_project(&app, "Timeline").await;
    let root = create_task(
        &app,
        &project.id,
        json!({ "title": "Root", "start_date": "2024-05-01", "end_date": "2024-05-31" }),
    )
    .await;
    create_task(
        &app,
        &project.id,
        json!({ "title": "Child", "parent_id": root.id, "start_date": "2024-05-10", "end_date": "2024-05-12" }),
    )
    .await;
    create_task(&app, &project.id, json!({ "title": "Undated" })).await;

    let uri = format!("/projects/{}/timeline?pivot=2024-05-15", project.id);
    let (status, bytes) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let view: TimelineView = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(view.first_day.to_string(), "2024-04-01");
    assert_eq!(view.last_day.to_string(), "2024-07-31");
    assert_eq!(view.total_width, 122.0 * 30.0);
    let titles: Vec<&str> = view.rows.iter().map(|r| r.row.task.title.as_str()).collect();
    assert_eq!(titles, vec!["Root", "Child", "Undated"]);
    assert_eq!(view.rows[1].row.level, 1);
    let bar = view.rows[1].bar.expect("child bar");
    assert_eq!(bar.offset, 39.0 * 30.0);
    assert_eq!(bar.width, 90.0);
    assert!(view.rows[2].bar.is_none());
}

#[tokio::test]
async fn task_dates_update_and_validation() {
    let app = new_router();
    let project = create_project(&app, "Dates").await;
    let task = create_task(&app, &project.id, json!({ "title": "Shift me" })).await;
    let uri = format!("/tasks/{}/dates", task.id);

    let (status, _) = send(
        &app,
        "PUT",
        &uri,
        Some(json!({ "start_date": "2024-05-13", "end_date": "2024-05-15" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, bytes) = send(&app, "GET", &format!("/tasks/{}", task.id), None).await;
    let fetched: Task = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        fetched.end_date.map(|d| d.to_string()).as_deref(),
        Some("2024-05-15")
    );

    let (status, _) = send(
        &app,
        "PUT",
        &uri,
        Some(json!({ "start_date": "2024-05-20", "end_date": "2024-05-15" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PUT",
        "/tasks/missing/dates",
        Some(json!({ "start_date": null, "end_date": null })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn task_update_and_delete() {
    let app = new_router();
    let project = create_project(&app, "Edit").await;
    let task = create_task(&app, &project.id, json!({ "title": "Draft" })).await;
    let uri = format!("/tasks/{}", task.id);

    let (status, bytes) = send(
        &app,
        "PUT",
        &uri,
        Some(json!({ "title": "Final", "status": "completed", "progress": 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated: Task = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(updated.title, "Final");
    assert_eq!(updated.progress, 100);

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn todos_and_daily_report() {
    let app = new_router();
    let project = create_project(&app, "Website").await;
    let task = create_task(&app, &project.id, json!({ "title": "Write copy" })).await;

    let (status, bytes) = send(
        &app,
        "POST",
        &format!("/tasks/{}/todo", task.id),
        Some(json!({ "date": "2024-05-10" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let linked: DailyTodo = serde_json::from_slice(&bytes).unwrap();

    let (status, _) = send(
        &app,
        "POST",
        "/todos",
        Some(json!({ "title": "Call vendor", "date": "2024-05-10" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, bytes) = send(&app, "POST", &format!("/todos/{}/toggle", linked.id), None).await;
    assert_eq!(status, StatusCode::OK);
    let toggled: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(toggled["completed"], true);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/todos/{}/memo", linked.id),
        Some(json!({ "memo": "sent for review" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, bytes) = send(&app, "GET", "/todos?date=2024-05-10", None).await;
    assert_eq!(status, StatusCode::OK);
    let todos: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(todos.as_array().map(Vec::len), Some(2));
    assert_eq!(todos[1]["project_name"], "Website");

    let (status, bytes) = send(
        &app,
        "POST",
        "/reports/daily",
        Some(json!({ "date": "2024-05-10", "memo": "Good day." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    let report = body["report"].as_str().unwrap();
    assert!(report.contains("- [x] Website: Write copy\n  - sent for review"));
    assert!(report.contains("- [ ] Call vendor"));
    assert!(report.ends_with("## Memo\nGood day.\n"));

    let (status, _) = send(&app, "POST", "/todos/missing/toggle", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_task_with_bad_parent_is_rejected() {
    let app = new_router();
    let project = create_project(&app, "Main").await;
    let other = create_project(&app, "Other").await;
    let foreign = create_task(&app, &other.id, json!({ "title": "Foreign" })).await;
    let uri = format!("/projects/{}/tasks", project.id);

    let (status, bytes) = send(&app, "POST", &uri, Some(json!({ "title": "x", "parent_id": "nope" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "not_found");

    let (status, bytes) = send(
        &app,
        "POST",
        &uri,
        Some(json!({ "title": "x", "parent_id": foreign.id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "invalid_request");
}
