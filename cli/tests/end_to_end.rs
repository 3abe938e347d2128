//! `TaskStore` over the real ureq transport against a live mock server.

use std::time::Duration;

use tasks_cli::{run, CliError, Command, UreqTransport};
use tasks_core::{ApiError, ClientConfig, ErrorKind, RetryPolicy, TaskCreate, TaskFilter, TaskStore, ViewKey};

async fn start_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener));
    format!("http://{addr}/api/tasks")
}

fn store_for(base_url: &str) -> TaskStore<UreqTransport> {
    let config = ClientConfig::with_base_url(base_url);
    TaskStore::new(&config, UreqTransport::new(config.timeout))
}

async fn exec(store: &TaskStore<UreqTransport>, command: Command) -> (Result<(), CliError>, String) {
    let mut out = Vec::new();
    let result = run(store, command, &mut out).await;
    (result, String::from_utf8(out).unwrap())
}

#[tokio::test(flavor = "multi_thread")]
async fn store_round_trip() {
    let store = store_for(&start_server().await);

    assert!(store.query().tasks(TaskFilter::All).await.unwrap().is_empty());

    let created = store.mutations().create(TaskCreate::new("Buy milk")).await.unwrap();
    assert_eq!(created.title, "Buy milk");
    let all = store.query().tasks(TaskFilter::All).await.unwrap();
    assert_eq!(all, vec![created.clone()]);

    let toggled = store.mutations().toggle(created.id, true).await.unwrap();
    assert!(toggled.completed);
    assert_eq!(store.query().task(created.id).await.unwrap(), Some(toggled.clone()));

    let completed = store.query().tasks(TaskFilter::Completed).await.unwrap();
    assert_eq!(completed.iter().map(|t| t.id).collect::<Vec<_>>(), vec![created.id]);

    store.mutations().delete(created.id).await.unwrap();
    assert!(store.query().peek(ViewKey::ById(created.id)).is_none());
    assert_eq!(store.query().task(created.id).await.unwrap(), None);
    assert!(store.remote().list_all().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn server_errors_come_back_typed() {
    let store = store_for(&start_server().await);

    let err = store.mutations().delete(42).await.unwrap_err();
    assert_eq!(err, ApiError::NotFound);
    assert!(!store.remote().remove(42).await);

    let err = store
        .remote()
        .update(42, &tasks_core::TaskUpdate::toggle(true))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test(flavor = "multi_thread")]
async fn commands_render_each_page_state() {
    let store = store_for(&start_server().await);

    let (result, out) = exec(
        &store,
        Command::List {
            filter: TaskFilter::All,
            search: None,
        },
    )
    .await;
    result.unwrap();
    assert_eq!(out, "no tasks yet\n");

    let (result, out) = exec(
        &store,
        Command::Add {
            title: "Buy milk".to_string(),
            description: Some("semi-skimmed".to_string()),
            completed: false,
        },
    )
    .await;
    result.unwrap();
    assert_eq!(out, "created task 1\n   1 [ ] Buy milk\n");

    let (result, _) = exec(
        &store,
        Command::Add {
            title: "Walk dog".to_string(),
            description: None,
            completed: true,
        },
    )
    .await;
    result.unwrap();

    let (result, out) = exec(
        &store,
        Command::List {
            filter: TaskFilter::All,
            search: Some("MILK".to_string()),
        },
    )
    .await;
    result.unwrap();
    assert_eq!(out, "   1 [ ] Buy milk\n1 of 2 tasks\n");

    let (result, out) = exec(
        &store,
        Command::List {
            filter: TaskFilter::Incompleted,
            search: Some("cat".to_string()),
        },
    )
    .await;
    result.unwrap();
    assert_eq!(out, "no tasks match \"cat\"\n");

    let (result, out) = exec(&store, Command::Show { id: 1 }).await;
    result.unwrap();
    assert!(out.starts_with("   1 [ ] Buy milk\n       semi-skimmed\n"));
    assert!(out.contains("created "));

    let (result, out) = exec(&store, Command::Toggle { id: 1 }).await;
    result.unwrap();
    assert_eq!(out, "task 1 marked done\n");

    let (result, out) = exec(
        &store,
        Command::List {
            filter: TaskFilter::Completed,
            search: None,
        },
    )
    .await;
    result.unwrap();
    assert_eq!(out, "   1 [x] Buy milk\n   2 [x] Walk dog\n");

    let (result, out) = exec(&store, Command::Delete { id: 2 }).await;
    result.unwrap();
    assert_eq!(out, "deleted task 2\n");

    let (result, out) = exec(&store, Command::Show { id: 2 }).await;
    result.unwrap();
    assert_eq!(out, "task 2 not found\n");

    let (result, out) = exec(&store, Command::Ping).await;
    result.unwrap();
    assert_eq!(out, "Tasks API is running\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn failures_render_with_retry_hint() {
    let store = store_for(&start_server().await);

    let (result, out) = exec(
        &store,
        Command::Add {
            title: "   ".to_string(),
            description: None,
            completed: false,
        },
    )
    .await;
    assert!(matches!(result, Err(CliError::Api(ApiError::Validation { .. }))));
    assert_eq!(out, "error: title is required\n  field: title\nretry: run the same command again\n");

    let (result, out) = exec(
        &store,
        Command::Edit {
            id: 7,
            title: Some("Nope".to_string()),
            description: None,
            completed: None,
        },
    )
    .await;
    assert!(matches!(result, Err(CliError::Api(ApiError::NotFound))));
    assert!(out.starts_with("error: "));
    assert!(out.ends_with("retry: run the same command again\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_backend_is_a_network_error() {
    // Reserve a port, then close it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ClientConfig {
        timeout: Duration::from_secs(2),
        retry: RetryPolicy {
            base_delay: Duration::from_millis(10),
            ..RetryPolicy::default()
        },
        ..ClientConfig::with_base_url(format!("http://{addr}/api/tasks"))
    };
    let store = TaskStore::new(&config, UreqTransport::new(config.timeout));

    let err = store.query().tasks(TaskFilter::All).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NetworkUnreachable);

    let (result, out) = exec(&store, Command::Ping).await;
    assert!(result.is_err());
    assert!(out.starts_with("error: network error - please check if the backend is running"));
    assert!(out.ends_with("retry: run the same command again\n"));
}
