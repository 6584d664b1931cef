//! HTTP and WebSocket surface.
//!
//! Pull endpoints for the message inbox and insights, a chat endpoint that
//! drives the delivery engine in both directions, and the `/ws` realtime
//! transport. Spawned as a background task by the service.

use crate::chatbot;
use crate::delivery::DeliveryEngine;
use crate::insight_cache::InsightCache;
use crate::presence::{ConnectionHandle, PresenceRegistry};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, patch, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use lull_core::config::ServerConfig;
use lull_core::notification::{NotificationKind, PushEvent};
use lull_core::LullError;
use lull_store::Store;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    store: Store,
    presence: Arc<PresenceRegistry>,
    delivery: Arc<DeliveryEngine>,
    insights: Arc<InsightCache>,
    uptime: Instant,
}

impl ApiState {
    pub fn new(
        store: Store,
        presence: Arc<PresenceRegistry>,
        delivery: Arc<DeliveryEngine>,
        insights: Arc<InsightCache>,
    ) -> Self {
        Self {
            store,
            presence,
            delivery,
            insights,
            uptime: Instant::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    user_id: String,
    page: Option<i64>,
    page_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    user_id: String,
    content: String,
}

fn internal(e: LullError) -> (StatusCode, Json<Value>) {
    error!("api: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "internal error"})),
    )
}

/// `GET /api/health` — status, uptime, live connection count.
async fn health(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": state.uptime.elapsed().as_secs(),
        "online": state.presence.online_count(),
    }))
}

/// `GET /api/messages` — all kinds, newest first, paged.
async fn list_messages(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let (messages, total) = state
        .store
        .list_messages(
            &query.user_id,
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(0),
        )
        .await
        .map_err(internal)?;
    Ok(Json(json!({"messages": messages, "total": total})))
}

/// `GET /api/messages/chat` — chat kinds only, oldest first.
async fn chat_log(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let (messages, total) = state
        .store
        .chat_log(
            &query.user_id,
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(0),
        )
        .await
        .map_err(internal)?;
    Ok(Json(json!({"messages": messages, "total": total})))
}

/// `GET /api/messages/unread` — unread count.
async fn unread(
    State(state): State<ApiState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let count = state
        .store
        .unread_count(&query.user_id)
        .await
        .map_err(internal)?;
    Ok(Json(json!({"unread": count})))
}

/// `PATCH /api/messages/{id}/read` — mark one message read.
async fn mark_read(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state
        .store
        .mark_read(&id, &query.user_id)
        .await
        .map_err(internal)?
    {
        Some(message) => Ok(Json(json!({"message": message}))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({"error": "message not found"})),
        )),
    }
}

/// `DELETE /api/messages/{id}` — delete an owned message.
async fn delete_message(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if state
        .store
        .delete_message(&id, &query.user_id)
        .await
        .map_err(internal)?
    {
        Ok(Json(json!({"deleted": true})))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(json!({"error": "message not found"})),
        ))
    }
}

/// `POST /api/chat` — persist the user message, then the bot reply, both
/// through the delivery engine so a live connection sees them in order.
async fn post_chat(
    State(state): State<ApiState>,
    Json(request): Json<ChatRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let content = request.content.trim();
    if content.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "content must not be empty"})),
        ));
    }

    let message = state
        .delivery
        .deliver(&request.user_id, content, NotificationKind::ChatMessage)
        .await
        .map_err(internal)?;

    let reply_text = chatbot::reply(content);
    let reply = state
        .delivery
        .deliver(&request.user_id, reply_text, NotificationKind::ChatReply)
        .await
        .map_err(internal)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({"message": message, "reply": reply})),
    ))
}

/// `GET /api/insights/daily` — the cached-or-generated insight over the
/// user's last seven entries.
async fn daily_insight(
    State(state): State<ApiState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let goal_mins = state
        .store
        .user_goal_mins(&query.user_id)
        .await
        .map_err(internal)?;
    let entries = state
        .store
        .latest_entries(&query.user_id, 7)
        .await
        .map_err(internal)?;

    if entries.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "no sleep entries to analyze"})),
        ));
    }

    match state
        .insights
        .get_or_compute(&query.user_id, "weekly", &entries, goal_mins)
        .await
    {
        Ok((source, report)) => Ok(Json(json!({"source": source, "insight": report}))),
        Err(LullError::Insight(e)) => {
            error!("api: insight generation failed: {e}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "the insight engine is busy, please try again later"})),
            ))
        }
        Err(e) => Err(internal(e)),
    }
}

#[derive(Debug, Deserialize)]
struct RegisterFrame {
    event: String,
    user_id: String,
}

/// `GET /ws` — realtime transport. The first client frame must be
/// `{"event":"user:register","user_id":...}`; everything after that is
/// server-to-client push.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: ApiState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<PushEvent>(64);

    let write_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(t) => t,
                Err(e) => {
                    warn!("ws: failed to encode push event: {e}");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
    });

    // Registration handshake.
    let first = match ws_receiver.next().await {
        Some(Ok(Message::Text(text))) => text,
        _ => {
            write_task.abort();
            return;
        }
    };
    let frame: RegisterFrame = match serde_json::from_str(first.as_str()) {
        Ok(f) => f,
        Err(e) => {
            warn!("ws: invalid registration frame: {e}");
            write_task.abort();
            return;
        }
    };
    if frame.event != "user:register" || frame.user_id.is_empty() {
        warn!("ws: expected user:register, got {:?}", frame.event);
        write_task.abort();
        return;
    }

    let conn_id = state.presence.next_conn_id();
    state.presence.put(
        &frame.user_id,
        ConnectionHandle {
            conn_id,
            sender: tx.clone(),
        },
    );
    info!("ws: {} connected (conn {conn_id})", frame.user_id);

    // Drain until the client goes away. Inbound frames past registration
    // carry no meaning on this transport.
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    // Reverse-map cleanup; a newer connection for the same user survives.
    if state.presence.remove(conn_id).is_some() {
        info!("ws: {} disconnected (conn {conn_id})", frame.user_id);
    }
    drop(tx);
    let _ = write_task.await;
}

/// Build the axum router with shared state.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/messages", get(list_messages))
        .route("/api/messages/chat", get(chat_log))
        .route("/api/messages/unread", get(unread))
        .route("/api/messages/{id}/read", patch(mark_read))
        .route("/api/messages/{id}", delete(delete_message))
        .route("/api/chat", post(post_chat))
        .route("/api/insights/daily", get(daily_insight))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Start the API server. Called from the service.
pub async fn serve(config: ServerConfig, state: ApiState) {
    let app = build_router(state);
    let addr = format!("{}:{}", config.host, config.port);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("API server failed to bind to {addr}: {e}");
            return;
        }
    };

    info!("API server listening on {addr}");

    if let Err(e) = axum::serve(listener, app).await {
        error!("API server error: {e}");
    }
}
