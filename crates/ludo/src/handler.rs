//! Per-connection handler: session registration and request routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register with the presence registry → get a SessionId
//!   2. Spawn the writer, queue `Welcome`
//!   3. Loop: receive envelopes → dispatch requests → queue replies
//!
//! The writer task owns the outbound half of the socket. It drains two
//! queues: replies from this handler and room events from the registry.
//! Room events for this session can therefore arrive while a request is
//! still being processed, and never wait behind the reader.

use std::sync::Arc;
use std::time::Instant;

use ludo_presence::{EventReceiver, SessionRegistry};
use ludo_protocol::{ClientRequest, Codec, Envelope, Payload, ServerMessage, SessionId};
use ludo_room::{RoomError, RoomStore};
use ludo_transport::{Connection, FrameSink, FrameStream, WebSocketConnection, WebSocketSink};
use tokio::sync::mpsc;

use crate::LudoError;
use crate::server::ServerState;

/// A reply and the `seq` of the request it answers.
type Reply = (Option<u64>, ServerMessage);

/// Drop guard that removes the session from the registry when the
/// handler exits, taking its room channel memberships with it.
///
/// Since `Drop` is synchronous, the async removal is spawned.
struct SessionGuard {
    session_id: SessionId,
    presence: Arc<SessionRegistry>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let session_id = self.session_id.clone();
        let presence = Arc::clone(&self.presence);
        tokio::spawn(async move {
            if presence.disconnect(&session_id).await {
                tracing::debug!(%session_id, "session removed from registry");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, C>>,
) -> Result<(), LudoError>
where
    S: RoomStore,
    C: Codec,
{
    let conn_id = conn.id();
    let peer = conn.peer_addr();
    let (sink, mut stream) = conn.split();

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let session_id = state.presence.connect(event_tx).await;
    let _guard = SessionGuard {
        session_id: session_id.clone(),
        presence: Arc::clone(&state.presence),
    };
    tracing::info!(%conn_id, %peer, %session_id, "session connected");

    let start = Instant::now();
    let (reply_tx, reply_rx) = mpsc::unbounded_channel::<Reply>();
    let writer = tokio::spawn(write_loop(
        sink,
        reply_rx,
        event_rx,
        Arc::clone(&state),
        start,
    ));

    let welcome = ServerMessage::Welcome {
        session_id: session_id.clone(),
    };
    if reply_tx.send((None, welcome)).is_err() {
        return Ok(());
    }

    loop {
        let data = match tokio::time::timeout(state.idle_timeout, stream.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%session_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%session_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%session_id, "connection idle, closing");
                break;
            }
        };

        let envelope: Envelope = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%session_id, error = %e, "failed to decode envelope");
                let reply = error_reply(400, format!("malformed envelope: {e}"));
                if reply_tx.send((None, reply)).is_err() {
                    break;
                }
                continue;
            }
        };

        let request = match envelope.payload {
            Payload::Request(request) => request,
            other => {
                tracing::debug!(%session_id, ?other, "ignoring non-request payload");
                let reply = error_reply(400, "expected a request".to_string());
                if reply_tx.send((Some(envelope.seq), reply)).is_err() {
                    break;
                }
                continue;
            }
        };

        let Some(reply) = dispatch(&state, &session_id, request, &start).await else {
            break;
        };
        if reply_tx.send((Some(envelope.seq), reply)).is_err() {
            // Writer is gone; the socket is dead.
            break;
        }
    }

    // Closing the reply queue lets the writer flush and close the sink.
    drop(reply_tx);
    drop(_guard);
    let _ = writer.await;
    Ok(())
}

/// Runs one request. `None` means the client asked to disconnect.
async fn dispatch<S, C>(
    state: &ServerState<S, C>,
    session_id: &SessionId,
    request: ClientRequest,
    start: &Instant,
) -> Option<ServerMessage>
where
    S: RoomStore,
    C: Codec,
{
    let reply = match request {
        ClientRequest::CreateRoom => match state.coordinator.create_room(session_id).await {
            Ok(created) => ServerMessage::RoomCreated {
                token: created.token,
                color: created.color,
            },
            Err(e) => room_error_reply(session_id, &e),
        },

        ClientRequest::JoinRoom { token } => {
            match state.coordinator.join_room(&token, session_id).await {
                Ok(join) => ServerMessage::RoomJoined {
                    token: join.token,
                    color: join.color,
                    already_joined: join.already_joined,
                },
                Err(e) => room_error_reply(session_id, &e),
            }
        }

        ClientRequest::Heartbeat { client_time } => ServerMessage::HeartbeatAck {
            client_time,
            server_time: elapsed_ms(start),
        },

        ClientRequest::Disconnect { reason } => {
            tracing::info!(%session_id, %reason, "client disconnected");
            return None;
        }
    };
    Some(reply)
}

/// Drains replies and room events onto the socket until both queues
/// close or a send fails.
async fn write_loop<S, C>(
    mut sink: WebSocketSink,
    mut replies: mpsc::UnboundedReceiver<Reply>,
    mut events: EventReceiver,
    state: Arc<ServerState<S, C>>,
    start: Instant,
) where
    S: RoomStore,
    C: Codec,
{
    let mut seq: u64 = 1;

    loop {
        let (reply_to, payload) = tokio::select! {
            biased;
            Some((reply_to, msg)) = replies.recv() => (reply_to, Payload::Reply(msg)),
            Some(event) = events.recv() => (None, Payload::Event(event)),
            else => break,
        };

        let envelope = Envelope {
            seq: next_seq(&mut seq),
            timestamp: elapsed_ms(&start),
            reply_to,
            payload,
        };
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode outbound envelope");
                continue;
            }
        };
        if let Err(e) = sink.send(&bytes).await {
            tracing::debug!(error = %e, "send failed, stopping writer");
            return;
        }
    }

    let _ = sink.close().await;
}

fn room_error_reply(session_id: &SessionId, err: &RoomError) -> ServerMessage {
    let code = status_code(err);
    if code >= 500 {
        tracing::warn!(%session_id, error = %err, "room request failed");
    } else {
        tracing::debug!(%session_id, error = %err, "room request rejected");
    }
    error_reply(code, err.to_string())
}

/// HTTP-style status for a room failure.
fn status_code(err: &RoomError) -> u16 {
    match err {
        RoomError::InvalidRequest(_) => 400,
        RoomError::NotFound(_) => 404,
        RoomError::NotJoinable { .. }
        | RoomError::RoomFull(_)
        | RoomError::InvalidTransition { .. } => 409,
        RoomError::Transient(_) => 503,
    }
}

fn error_reply(code: u16, message: String) -> ServerMessage {
    ServerMessage::Error { code, message }
}

fn elapsed_ms(start: &Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
