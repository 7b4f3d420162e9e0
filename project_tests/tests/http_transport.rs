//! Drives the notes server over real sockets with the in-memory backend.

use std::time::Duration;

use anyhow::Result;
use futures_util::{SinkExt, Stream, StreamExt};
use serde_json::{Value, json};
use servers::notes_logic::config::{Backend, Config, Settings};
use servers::notes_logic::{bootstrap, routes};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

struct TestServer {
    base: String,
    ws_url: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn start_server(threshold: usize) -> Result<TestServer> {
    let settings = Settings::resolve(Config {
        backend: Some(Backend::Memory),
        namespace: Some("FULLSTACK_TASK_Http".to_string()),
        compaction_threshold: Some(threshold),
        ..Default::default()
    })?;
    let state = bootstrap::build_state(&settings).await?;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(routes::serve(listener, state, async {
        let _ = rx.await;
    }));

    Ok(TestServer {
        base: format!("http://{addr}"),
        ws_url: format!("ws://{addr}/ws"),
        shutdown: Some(tx),
    })
}

async fn next_json<S>(stream: &mut S) -> Value
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(_) = msg {
            return serde_json::from_str(msg.to_text().unwrap()).unwrap();
        }
    }
}

#[tokio::test]
async fn test_add_task_then_fetch() -> Result<()> {
    let server = start_server(50).await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/addTask", server.base))
        .json(&json!({"text": "buy milk"}))
        .send()
        .await?;
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    let created: Value = response.json().await?;
    assert_eq!(created["text"], "buy milk");
    assert!(created["createdAt"].is_string());

    let all: Vec<Value> = client
        .get(format!("{}/fetchAllTasks", server.base))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0], created);
    Ok(())
}

#[tokio::test]
async fn test_invalid_text_is_bad_request() -> Result<()> {
    let server = start_server(50).await?;
    let client = reqwest::Client::new();

    for body in [json!({"text": ""}), json!({"text": 5}), json!({})] {
        let response = client
            .post(format!("{}/addTask", server.base))
            .json(&body)
            .send()
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let error: Value = response.json().await?;
        assert_eq!(error["error_type"], "ValidationError");
    }

    let all: Vec<Value> = client
        .get(format!("{}/fetchAllTasks", server.base))
        .send()
        .await?
        .json()
        .await?;
    assert!(all.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_non_json_body_is_validation_error() -> Result<()> {
    let server = start_server(50).await?;
    let client = reqwest::Client::new();

    let plain = client
        .post(format!("{}/addTask", server.base))
        .body("buy milk")
        .send()
        .await?;
    let broken = client
        .post(format!("{}/addTask", server.base))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{\"text\": ")
        .send()
        .await?;

    for response in [plain, broken] {
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let error: Value = response.json().await?;
        assert_eq!(error["error"], "Invalid task text");
        assert_eq!(error["error_type"], "ValidationError");
    }
    Ok(())
}

#[tokio::test]
async fn test_fetch_reads_archive_after_compaction() -> Result<()> {
    let server = start_server(2).await?;
    let client = reqwest::Client::new();

    for text in ["one", "two", "three"] {
        let response = client
            .post(format!("{}/addTask", server.base))
            .json(&json!({ "text": text }))
            .send()
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    }

    let all: Vec<Value> = client
        .get(format!("{}/fetchAllTasks", server.base))
        .send()
        .await?
        .json()
        .await?;
    let texts: Vec<&str> = all.iter().filter_map(|r| r["text"].as_str()).collect();
    assert_eq!(texts, vec!["one", "two", "three"]);

    let health: Value = client
        .get(format!("{}/health", server.base))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(health["namespace"], "FULLSTACK_TASK_Http");
    assert_eq!(health["status"]["state"], "empty");
    assert_eq!(health["stats"]["compactions"], 1);
    Ok(())
}

#[tokio::test]
async fn test_websocket_add_is_broadcast_to_all_clients() -> Result<()> {
    let server = start_server(50).await?;

    let (mut writer_ws, _) = connect_async(server.ws_url.as_str()).await?;
    let (mut watcher_ws, _) = connect_async(server.ws_url.as_str()).await?;
    // Give both subscriptions time to register before publishing.
    tokio::time::sleep(Duration::from_millis(50)).await;

    writer_ws
        .send(Message::text(
            json!({"event": "add", "data": "from ws"}).to_string(),
        ))
        .await?;

    for ws in [&mut writer_ws, &mut watcher_ws] {
        let frame = next_json(ws).await;
        assert_eq!(frame["event"], "newTask");
        assert_eq!(frame["data"]["text"], "from ws");
    }

    // HTTP submissions reach socket subscribers too.
    reqwest::Client::new()
        .post(format!("{}/addTask", server.base))
        .json(&json!({"text": "from http"}))
        .send()
        .await?;
    let frame = next_json(&mut watcher_ws).await;
    assert_eq!(frame["data"]["text"], "from http");
    Ok(())
}

#[tokio::test]
async fn test_websocket_rejection_goes_only_to_sender() -> Result<()> {
    let server = start_server(50).await?;
    let (mut ws, _) = connect_async(server.ws_url.as_str()).await?;

    ws.send(Message::text(json!({"event": "add", "data": ""}).to_string()))
        .await?;
    let frame = next_json(&mut ws).await;
    assert_eq!(frame["event"], "error");
    assert!(frame["error"].as_str().unwrap().contains("Invalid task text"));

    ws.send(Message::text("not json")).await?;
    let frame = next_json(&mut ws).await;
    assert_eq!(frame["event"], "error");

    let all: Vec<Value> = reqwest::get(format!("{}/fetchAllTasks", server.base))
        .await?
        .json()
        .await?;
    assert!(all.is_empty());
    Ok(())
}
