//! Socket driver for one chat connection: upgrade, rejection, outbound
//! writer with heartbeat, inbound reader, and teardown.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code};
use axum::extract::{Path, State};
use axum::response::Response;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use helpdesk_core::{CaseError, CaseId, Identity};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use super::protocol::OutboundFrame;
use super::session::ChatSession;
use crate::http::auth::AuthUser;
use crate::http::error::ApiError;
use crate::server::AppState;

/// Close frame reasons are limited to 123 bytes.
const MAX_CLOSE_REASON: usize = 123;

/// `GET /chat/{case_id}`. Authentication failures still upgrade, so the
/// client gets an `error` frame and a close code instead of a bare HTTP
/// status.
pub async fn chat_upgrade(
    ws: WebSocketUpgrade,
    Path(case_id): Path<CaseId>,
    auth: Result<AuthUser, ApiError>,
    State(state): State<AppState>,
) -> Response {
    let identity = auth.map(|AuthUser(identity)| identity).map_err(|ApiError(e)| e);
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| run_chat_socket(socket, identity, case_id, state))
}

/// Drive a chat connection until either side closes or the server shuts
/// down.
#[instrument(skip_all, fields(case_id = case_id))]
pub async fn run_chat_socket(
    socket: WebSocket,
    identity: Result<Identity, CaseError>,
    case_id: CaseId,
    state: AppState,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let identity = match identity {
        Ok(identity) => identity,
        Err(e) => return reject(&mut ws_tx, &e).await,
    };

    let (tx, rx) = mpsc::channel(state.config.outbound_buffer);
    let connection = Arc::new(ClientConnection::new(identity, case_id, tx));
    let mut session = ChatSession::new(
        connection.clone(),
        state.rooms.clone(),
        state.lifecycle.store().clone(),
        state.config.max_message_chars,
    );
    if let Err(e) = session.authorize().await {
        return reject(&mut ws_tx, &e).await;
    }

    let started = Instant::now();
    counter!("ws_connections_total").increment(1);
    gauge!("ws_connections_active").increment(1.0);
    info!(
        connection_id = %connection.id,
        user_id = identity.user_id,
        role = %identity.role,
        "chat connection opened"
    );

    let stop = CancellationToken::new();
    let writer = tokio::spawn(write_loop(
        ws_tx,
        rx,
        connection.clone(),
        Heartbeat {
            interval: state.config.ping_interval,
            timeout: state.config.pong_timeout,
        },
        stop.clone(),
        state.shutdown.clone(),
    ));

    match session.activate().await {
        Ok(()) => read_loop(&mut session, &mut ws_rx, &stop, &state.shutdown).await,
        Err(e) => {
            warn!(error = %e, "failed to activate chat session");
            session.report_error(&e);
        }
    }

    let _ = session.close();
    stop.cancel();
    if let Err(e) = writer.await {
        warn!(error = %e, "chat writer task failed");
    }

    counter!("ws_disconnections_total").increment(1);
    gauge!("ws_connections_active").decrement(1.0);
    histogram!("ws_connection_duration_seconds").record(started.elapsed().as_secs_f64());
    info!(connection_id = %connection.id, "chat connection closed");
}

/// Refuse a connection before it joins a room: one `error` frame, then a
/// close frame carrying the error's close code.
async fn reject(ws_tx: &mut SplitSink<WebSocket, Message>, err: &CaseError) {
    let code = err.code();
    counter!("ws_rejections_total", "code" => code.as_str()).increment(1);
    debug!(error = %err, "chat connection rejected");

    if let Ok(encoded) = OutboundFrame::error(err).encode() {
        let _ = ws_tx.send(Message::Text((*encoded).clone().into())).await;
    }
    let _ = ws_tx
        .send(Message::Close(Some(CloseFrame {
            code: code.close_code(),
            reason: close_reason(err.detail()).into(),
        })))
        .await;
}

fn close_reason(detail: &str) -> String {
    if detail.len() <= MAX_CLOSE_REASON {
        return detail.to_string();
    }
    let mut end = MAX_CLOSE_REASON;
    while !detail.is_char_boundary(end) {
        end -= 1;
    }
    detail[..end].to_string()
}

async fn read_loop(
    session: &mut ChatSession,
    ws_rx: &mut SplitStream<WebSocket>,
    stop: &CancellationToken,
    shutdown: &CancellationToken,
) {
    loop {
        let incoming = tokio::select! {
            () = stop.cancelled() => break,
            () = shutdown.cancelled() => break,
            incoming = ws_rx.next() => incoming,
        };
        match incoming {
            Some(Ok(Message::Text(text))) => {
                let _ = session.handle_text(text.as_str()).await;
            }
            Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                Ok(text) => {
                    let _ = session.handle_text(text).await;
                }
                Err(_) => session.report_error(&CaseError::Validation(
                    "binary frames must be UTF-8 JSON".into(),
                )),
            },
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => session.connection().mark_alive(),
            Some(Ok(Message::Close(_))) | None => {
                debug!("client closed the connection");
                break;
            }
            Some(Err(e)) => {
                debug!(error = %e, "websocket read failed");
                break;
            }
        }
    }
}

#[derive(Clone, Copy)]
struct Heartbeat {
    interval: Duration,
    timeout: Duration,
}

/// Forward queued frames to the socket and ping on an interval. Ends when
/// the session stops, the server shuts down, the socket fails, or the
/// client stays silent past the heartbeat timeout; frames already queued
/// are flushed before the close frame.
async fn write_loop(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Arc<String>>,
    connection: Arc<ClientConnection>,
    heartbeat: Heartbeat,
    stop: CancellationToken,
    shutdown: CancellationToken,
) {
    let mut ping = tokio::time::interval(heartbeat.interval);
    let _ = ping.tick().await;

    let close = loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break Some((close_code::AWAY, "server shutting down")),
            () = stop.cancelled() => break Some((close_code::NORMAL, "")),
            frame = rx.recv() => match frame {
                Some(text) => {
                    if ws_tx.send(Message::Text((*text).clone().into())).await.is_err() {
                        break None;
                    }
                }
                None => break Some((close_code::NORMAL, "")),
            },
            _ = ping.tick() => {
                if !connection.check_alive() && connection.last_pong_elapsed() > heartbeat.timeout {
                    warn!(connection_id = %connection.id, "client unresponsive, disconnecting");
                    break Some((close_code::AWAY, "heartbeat timeout"));
                }
                if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                    break None;
                }
            }
        }
    };

    if let Some((code, reason)) = close {
        while let Ok(text) = rx.try_recv() {
            if ws_tx.send(Message::Text((*text).clone().into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx
            .send(Message::Close(Some(CloseFrame {
                code,
                reason: Utf8Bytes::from_static(reason),
            })))
            .await;
    }
    stop.cancel();
}
