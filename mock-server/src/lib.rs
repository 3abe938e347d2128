//! In-memory implementation of the tasks REST service.
//!
//! Routes live under [`BASE_PATH`]. Ids are sequential integers, timestamps
//! are RFC 3339 strings, and validation failures answer 400 with
//! `{"message", "field"}`.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::{net::TcpListener, sync::RwLock};

pub const BASE_PATH: &str = "/api/tasks";

const TITLE_MAX_LEN: usize = 200;
const DESCRIPTION_MAX_LEN: usize = 1000;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Deserialize)]
pub struct CreateTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Debug, Default)]
pub struct TaskTable {
    tasks: BTreeMap<u64, Task>,
    next_id: u64,
}

pub type Db = Arc<RwLock<TaskTable>>;

type ApiResult<T> = Result<T, (StatusCode, Json<ErrorBody>)>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(TaskTable::default()));
    Router::new()
        .route(BASE_PATH, get(list_tasks).post(create_task))
        .route(&format!("{BASE_PATH}/"), get(list_tasks).post(create_task))
        .route(&format!("{BASE_PATH}/completed"), get(list_completed))
        .route(&format!("{BASE_PATH}/incompleted"), get(list_incompleted))
        .route(&format!("{BASE_PATH}/test"), get(ping))
        .route(
            &format!("{BASE_PATH}/{{id}}"),
            get(get_task).put(update_task).delete(delete_task),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn now() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

fn not_found() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            message: "Task not found".to_string(),
            field: None,
        }),
    )
}

fn invalid(field: &str, message: &str) -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            message: message.to_string(),
            field: Some(field.to_string()),
        }),
    )
}

fn validate(title: Option<&str>, description: Option<&str>) -> ApiResult<()> {
    if let Some(title) = title {
        let title = title.trim();
        if title.is_empty() {
            return Err(invalid("title", "title is required"));
        }
        if title.chars().count() > TITLE_MAX_LEN {
            return Err(invalid("title", "title is too long"));
        }
    }
    if description.is_some_and(|d| d.chars().count() > DESCRIPTION_MAX_LEN) {
        return Err(invalid("description", "description is too long"));
    }
    Ok(())
}

async fn filtered(db: &Db, completed: Option<bool>) -> Json<Vec<Task>> {
    let table = db.read().await;
    Json(
        table
            .tasks
            .values()
            .filter(|task| completed.is_none_or(|c| task.completed == c))
            .cloned()
            .collect(),
    )
}

async fn list_tasks(State(db): State<Db>) -> Json<Vec<Task>> {
    filtered(&db, None).await
}

async fn list_completed(State(db): State<Db>) -> Json<Vec<Task>> {
    filtered(&db, Some(true)).await
}

async fn list_incompleted(State(db): State<Db>) -> Json<Vec<Task>> {
    filtered(&db, Some(false)).await
}

async fn ping() -> &'static str {
    "Tasks API is running"
}

async fn create_task(
    State(db): State<Db>,
    Json(input): Json<CreateTask>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    validate(Some(&input.title), input.description.as_deref())?;
    let mut table = db.write().await;
    table.next_id += 1;
    let stamp = now();
    let task = Task {
        id: table.next_id,
        title: input.title.trim().to_string(),
        description: input.description,
        completed: input.completed,
        created_at: stamp.clone(),
        updated_at: stamp,
    };
    table.tasks.insert(task.id, task.clone());
    tracing::debug!(id = task.id, "created task");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(State(db): State<Db>, Path(id): Path<u64>) -> ApiResult<Json<Task>> {
    let table = db.read().await;
    table.tasks.get(&id).cloned().map(Json).ok_or_else(not_found)
}

async fn update_task(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<UpdateTask>,
) -> ApiResult<Json<Task>> {
    validate(input.title.as_deref(), input.description.as_deref())?;
    let mut table = db.write().await;
    let task = table.tasks.get_mut(&id).ok_or_else(not_found)?;
    if let Some(title) = input.title {
        task.title = title.trim().to_string();
    }
    if let Some(description) = input.description {
        task.description = Some(description);
    }
    if let Some(completed) = input.completed {
        task.completed = completed;
    }
    task.updated_at = now();
    Ok(Json(task.clone()))
}

async fn delete_task(State(db): State<Db>, Path(id): Path<u64>) -> ApiResult<StatusCode> {
    let mut table = db.write().await;
    table
        .tasks
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(not_found)
}
