//! Relay handlers.
//!
//! - `GET /ws/relay?key=` - Producer WebSocket; binary messages are frames
//! - `GET /ws/stream` - Consumer WebSocket; receives frames and the offline sentinel
//! - `GET /relay/health` - Relay status

use crate::errors::FacilityError;
use crate::models::RelayHealthResponse;
use crate::relay::{RelayHub, RelayMessage, OFFLINE_SENTINEL};
use crate::routes::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
    Json,
};
use bytes::Bytes;
use common::secret::matches_secret;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;

/// Query string for the producer endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct RelayQuery {
    pub key: Option<String>,
}

/// Handler for GET /ws/relay?key=
///
/// The key is checked before the upgrade; a wrong or missing key is
/// refused with 401 and no WebSocket is opened. A successful connection
/// supersedes any producer already attached.
#[instrument(skip_all, name = "facility.relay.producer")]
pub async fn relay_producer(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RelayQuery>,
    ws: Option<WebSocketUpgrade>,
) -> Result<Response, FacilityError> {
    let authorized = query
        .key
        .as_deref()
        .is_some_and(|key| matches_secret(&state.config.relay_key, key));

    if !authorized {
        tracing::warn!(target: "facility.relay", "Relay producer rejected: bad key");
        return Err(FacilityError::RelayUnauthorized);
    }

    let ws = ws.ok_or_else(|| {
        FacilityError::BadRequest("WebSocket upgrade required".to_string())
    })?;

    let max_frame = state.config.relay_max_frame_bytes;
    let hub = Arc::clone(&state.relay);

    Ok(ws
        .max_message_size(max_frame)
        .max_frame_size(max_frame)
        .on_upgrade(move |socket| run_producer(hub, socket)))
}

/// Handler for GET /ws/stream
#[instrument(skip_all, name = "facility.relay.consumer")]
pub async fn relay_consumer(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    let hub = Arc::clone(&state.relay);
    ws.on_upgrade(move |socket| run_consumer(hub, socket))
}

/// Handler for GET /relay/health
pub async fn relay_health(State(state): State<Arc<AppState>>) -> Json<RelayHealthResponse> {
    let stats = state.relay.stats().await;

    Json(RelayHealthResponse {
        status: "ok",
        viewers: stats.viewers,
        relay_connected: stats.relay_connected,
        has_frame: stats.has_frame,
    })
}

async fn run_producer(hub: Arc<RelayHub>, socket: WebSocket) {
    let producer = hub.attach_producer().await;
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            () = producer.cancel.cancelled() => {
                tracing::debug!(
                    target: "facility.relay",
                    producer_id = %producer.id,
                    "Closing superseded relay producer"
                );
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Binary(data))) => {
                    hub.publish_frame(producer.id, Bytes::from(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(
                        target: "facility.relay",
                        error = %e,
                        "Relay producer socket error"
                    );
                    break;
                }
                // Text, ping and pong carry no frames
                Some(Ok(_)) => {}
            }
        }
    }

    hub.detach_producer(producer.id).await;
}

async fn run_consumer(hub: Arc<RelayHub>, socket: WebSocket) {
    let shutdown = hub.shutdown_token();
    let mut consumer = hub.subscribe().await;
    let (mut sender, mut receiver) = socket.split();

    let greeted = match consumer.initial_frame.take() {
        Some(frame) => sender.send(Message::Binary(frame.to_vec())).await.is_ok(),
        None => true,
    };

    if greeted {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
                message = consumer.recv() => {
                    let outgoing = match message {
                        Some(RelayMessage::Frame(frame)) => Message::Binary(frame.to_vec()),
                        Some(RelayMessage::Offline) => Message::Text(OFFLINE_SENTINEL.to_string()),
                        None => break,
                    };
                    if sender.send(outgoing).await.is_err() {
                        break;
                    }
                }
                incoming = receiver.next() => match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    hub.unsubscribe(consumer.id).await;
}
