//! Scripted in-memory backend for exercising the cache layers.
//!
//! Behaves like the tasks REST service, records every call, and lets a test
//! hold a request until released, replace its response, or never answer.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tasks_core::{
    ClientConfig, HttpMethod, HttpRequest, HttpResponse, RetryPolicy, Task, TaskCreate, TaskId, TaskStore,
    TaskUpdate, Transport, TransportError,
};
use tokio::sync::oneshot;

pub const BASE_URL: &str = "http://tasks.test/api/tasks";

enum Scripted {
    Respond(HttpResponse),
    Fail(TransportError),
    Hang,
}

struct Rule<T> {
    method: HttpMethod,
    route: String,
    value: T,
}

#[derive(Default)]
struct State {
    tasks: BTreeMap<TaskId, Task>,
    next_id: TaskId,
    revision: u32,
    calls: Vec<(HttpMethod, String)>,
    scripted: VecDeque<Rule<Scripted>>,
    holds: VecDeque<Rule<oneshot::Receiver<()>>>,
}

/// Releases one held request.
pub struct Gate(oneshot::Sender<()>);

impl Gate {
    pub fn release(self) {
        let _ = self.0.send(());
    }
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<State>>,
}

pub fn task(id: TaskId, title: &str, completed: bool) -> Task {
    Task {
        id,
        title: title.to_string(),
        description: None,
        completed,
        created_at: Some("2024-01-01T00:00:00Z".to_string()),
        updated_at: Some("2024-01-01T00:00:00Z".to_string()),
    }
}

fn json(status: u16, body: impl serde::Serialize) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: serde_json::to_string(&body).unwrap(),
    }
}

fn not_found() -> HttpResponse {
    json(404, serde_json::json!({ "message": "Task not found" }))
}

impl FakeBackend {
    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let backend = Self::default();
        {
            let mut state = backend.state.lock();
            for task in tasks {
                state.next_id = state.next_id.max(task.id);
                state.tasks.insert(task.id, task);
            }
        }
        backend
    }

    pub fn store(&self) -> TaskStore<FakeBackend> {
        self.store_with(ClientConfig::with_base_url(BASE_URL))
    }

    pub fn store_with(&self, config: ClientConfig) -> TaskStore<FakeBackend> {
        TaskStore::new(&config, self.clone())
    }

    /// A store that gives up on the first failed read.
    pub fn single_attempt_store(&self, timeout: Duration) -> TaskStore<FakeBackend> {
        self.store_with(ClientConfig {
            timeout,
            retry: RetryPolicy::none(),
            ..ClientConfig::with_base_url(BASE_URL)
        })
    }

    pub fn server_task(&self, id: TaskId) -> Option<Task> {
        self.state.lock().tasks.get(&id).cloned()
    }

    pub fn calls(&self, method: HttpMethod, route: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(m, r)| *m == method && r == route)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Answer the next matching request with `status` and `body`.
    pub fn respond_next(&self, method: HttpMethod, route: &str, status: u16, body: impl serde::Serialize) {
        self.script(method, route, Scripted::Respond(json(status, body)));
    }

    pub fn fail_next(&self, method: HttpMethod, route: &str, status: u16) {
        self.respond_next(
            method,
            route,
            status,
            serde_json::json!({ "message": "scripted failure" }),
        );
    }

    pub fn drop_next(&self, method: HttpMethod, route: &str) {
        self.script(
            method,
            route,
            Scripted::Fail(TransportError::Connect("connection refused".to_string())),
        );
    }

    pub fn hang_next(&self, method: HttpMethod, route: &str) {
        self.script(method, route, Scripted::Hang);
    }

    /// Hold the next matching request until the returned gate is released.
    pub fn hold_next(&self, method: HttpMethod, route: &str) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.state.lock().holds.push_back(Rule {
            method,
            route: route.to_string(),
            value: rx,
        });
        Gate(tx)
    }

    /// Yield until `count` matching calls have been seen.
    pub async fn wait_for_calls(&self, method: HttpMethod, route: &str, count: usize) {
        while self.calls(method, route) < count {
            tokio::task::yield_now().await;
        }
    }

    fn script(&self, method: HttpMethod, route: &str, value: Scripted) {
        self.state.lock().scripted.push_back(Rule {
            method,
            route: route.to_string(),
            value,
        });
    }

    fn handle(&self, method: HttpMethod, route: &str, body: Option<&str>) -> HttpResponse {
        let mut state = self.state.lock();
        let id: Option<TaskId> = route.trim_start_matches('/').parse().ok();

        match (method, route, id) {
            (HttpMethod::Get, "/", _) => json(200, state.tasks.values().collect::<Vec<_>>()),
            (HttpMethod::Get, "/completed", _) => {
                json(200, state.tasks.values().filter(|t| t.completed).collect::<Vec<_>>())
            }
            (HttpMethod::Get, "/incompleted", _) => {
                json(200, state.tasks.values().filter(|t| !t.completed).collect::<Vec<_>>())
            }
            (HttpMethod::Get, "/test", _) => HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: "pong".to_string(),
            },
            (HttpMethod::Get, _, Some(id)) => match state.tasks.get(&id) {
                Some(task) => json(200, task),
                None => not_found(),
            },
            (HttpMethod::Post, "/", _) => {
                let input: TaskCreate = serde_json::from_str(body.unwrap_or_default()).unwrap();
                state.next_id += 1;
                let task = Task {
                    id: state.next_id,
                    title: input.title,
                    description: input.description,
                    completed: input.completed,
                    ..task(0, "", false)
                };
                state.tasks.insert(task.id, task.clone());
                json(201, task)
            }
            (HttpMethod::Put, _, Some(id)) => {
                let patch: TaskUpdate = serde_json::from_str(body.unwrap_or_default()).unwrap();
                state.revision += 1;
                let revision = state.revision;
                match state.tasks.get_mut(&id) {
                    Some(task) => {
                        *task = task.merged(&patch);
                        task.updated_at = Some(format!("2024-01-02T00:00:{revision:02}Z"));
                        json(200, task.clone())
                    }
                    None => not_found(),
                }
            }
            (HttpMethod::Delete, _, Some(id)) => match state.tasks.remove(&id) {
                Some(_) => HttpResponse {
                    status: 204,
                    headers: Vec::new(),
                    body: String::new(),
                },
                None => not_found(),
            },
            _ => not_found(),
        }
    }
}

fn take<T>(rules: &mut VecDeque<Rule<T>>, method: HttpMethod, route: &str) -> Option<T> {
    let pos = rules.iter().position(|r| r.method == method && r.route == route)?;
    rules.remove(pos).map(|r| r.value)
}

#[async_trait]
impl Transport for FakeBackend {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let route = request
            .path
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.path)
            .to_string();

        let (scripted, hold) = {
            let mut state = self.state.lock();
            state.calls.push((request.method, route.clone()));
            (
                take(&mut state.scripted, request.method, &route),
                take(&mut state.holds, request.method, &route),
            )
        };

        if let Some(gate) = hold {
            let _ = gate.await;
        }

        match scripted {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(err)) => Err(err),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Ok(self.handle(request.method, &route, request.body.as_deref())),
        }
    }
}
