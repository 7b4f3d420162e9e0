//! # HTTP and WebSocket Routes
//!
//! - `POST /addTask`: `{"text": "..."}` → `201` with the stored record.
//! - `GET /fetchAllTasks`: the current view of the namespace.
//! - `GET /ws`: WebSocket. Clients send `{"event": "add", "data": "<text>"}` and
//!   receive `{"event": "newTask", "data": {...}}` for every accepted note.
//! - `GET /health`: namespace, lifecycle state and counters.
//!
//! Both producer paths end in `NamespaceStore::submit_value`; neither carries
//! any ingest logic of its own.

use crate::notes_logic::error::AppError;
use crate::notes_logic::model::{ADD_EVENT, ClientMessage, ServerMessage};
use crate::notes_logic::state::AppState;
use axum::{
    Json, Router,
    extract::{
        State,
        rejection::JsonRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use futures_util::{SinkExt, StreamExt};
use lib_notes::{NamespaceStore, Record, StoreError};
use serde_json::{Value, json};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

static NEXT_CLIENT_ID: AtomicUsize = AtomicUsize::new(1);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/addTask", post(add_task_handler))
        .route("/fetchAllTasks", get(fetch_all_tasks_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// The single producer entry point shared by both transports.
async fn ingest(store: &NamespaceStore, text: &Value) -> Result<Record, StoreError> {
    store.submit_value(text).await
}

async fn add_task_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    // A body that is not JSON is a bad note like any other.
    let Json(body) = body.map_err(|rejection| StoreError::Validation(rejection.body_text()))?;
    let text = body.get("text").unwrap_or(&Value::Null);
    let record = ingest(&state.store, text).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn fetch_all_tasks_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let records = state.store.list_all().await?;
    debug!("Serving {} records", records.len());
    Ok(Json(records))
}

async fn health_handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let namespace_state = state.store.state().await?;
    Ok(Json(json!({
        "namespace": state.store.namespace(),
        "threshold": state.store.threshold(),
        "status": namespace_state,
        "stats": state.store.stats(),
        "subscribers": state.subscriber_count(),
    })))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let client_id = NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed);
    info!("Client {} connected", client_id);

    let (mut sender, mut receiver) = socket.split();
    let mut events = state.subscribe();
    // Replies addressed to this client only (rejections)
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<ServerMessage>();

    let mut send_task = tokio::spawn(async move {
        loop {
            let outbound = tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => ServerMessage::from_event(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Client {} lagged, {} events skipped", client_id, skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                reply = reply_rx.recv() => match reply {
                    Some(reply) => reply,
                    None => break,
                },
            };
            let Ok(json_str) = serde_json::to_string(&outbound) else {
                continue;
            };
            if sender.send(Message::Text(json_str.into())).await.is_err() {
                break; // client disconnected
            }
        }
    });

    let store = state.store.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if let Some(reply) = handle_client_text(&store, text.as_str()).await {
                        if reply_tx.send(reply).is_err() {
                            break;
                        }
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("Client {} disconnected", client_id);
}

/// Applies one inbound frame. Returns a reply for the sender only when the
/// frame was rejected; accepted notes reach everyone through the broadcast.
async fn handle_client_text(store: &NamespaceStore, text: &str) -> Option<ServerMessage> {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => return Some(ServerMessage::error(format!("Malformed message: {e}"))),
    };
    if message.event != ADD_EVENT {
        return Some(ServerMessage::error(format!("Unknown event '{}'", message.event)));
    }
    match ingest(store, &message.data).await {
        Ok(_) => None,
        Err(StoreError::Validation(reason)) => {
            Some(ServerMessage::error(format!("Invalid task text: {reason}")))
        }
        Err(e) => {
            warn!("WebSocket submission failed: {}", e);
            Some(ServerMessage::error(e.to_string()))
        }
    }
}
