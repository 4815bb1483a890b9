use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::bus::TopicFilter;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct WsQuery {
    /// `all` (default), `admin`, `locations`, or `order:<id>`.
    pub channel: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let filter = match query.channel.as_deref() {
        None => TopicFilter::All,
        Some(raw) => TopicFilter::parse(raw)
            .ok_or_else(|| AppError::BadRequest(format!("unknown channel: {raw}")))?,
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, filter)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, filter: TopicFilter) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = BroadcastStream::new(state.bus.subscribe());

    info!("event stream client connected");

    let send_task = tokio::spawn(async move {
        while let Some(item) = events.next().await {
            // A lagged subscriber just misses the overwritten events.
            let Ok(envelope) = item else {
                continue;
            };
            if !filter.accepts(&envelope.topic) {
                continue;
            }

            let json = match serde_json::to_string(&envelope) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("event stream client disconnected");
}
