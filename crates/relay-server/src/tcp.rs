// crates/relay-server/src/tcp.rs

//! TCP listener for robot arms, AI engines and tooling.
//!
//! Each accepted socket gets:
//! - a registry entry (role `Unknown` until it identifies),
//! - a writer task draining its outbound queue as newline-terminated JSON,
//! - a reader loop that frames lines, classifies them and acts on them.
//!
//! Lines from one connection are handled strictly in arrival order.
//! Replies to the sender go through the same outbound queue as fan-out
//! traffic, so a peer sees them in the order they were produced.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::BytesMut;
use relay_core::{classify, Identify, Message, Role};
use relay_protocol::line_codec::encode_line;
use relay_protocol::wire_types::{
    MSG_INVALID_FORMAT, MSG_LINE_TOO_LONG, MSG_PROCESSING_ERROR, UNKNOWN_AI_ID,
};
use relay_protocol::{
    game_event_payload, FrontendEvent, LineBuffer, PositionBroadcast, RobotCommand, Source,
    TcpAck, Timestamp,
};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::registry::{Peer, Registration};
use crate::server::RelayContext;
use crate::types::{next_conn_id, ConnId, OutboundRx, OutboundTx, Transport};

/// Accept TCP peers until shutdown.
pub async fn run_listener(listener: TcpListener, ctx: RelayContext) {
    loop {
        let accepted = tokio::select! {
            _ = ctx.shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, addr)) => {
                let id = next_conn_id();
                info!(conn = %id, peer = %addr, "tcp peer connected");

                let peer_ctx = ctx.clone();
                ctx.tracker.spawn(async move {
                    if let Err(e) = run_peer(id, stream, addr, peer_ctx).await {
                        debug!(conn = %id, error = %e, "tcp peer ended with error");
                    }
                });
            }
            Err(e) => {
                // Usually fd exhaustion; back off instead of spinning.
                error!(error = %e, "tcp accept failed");
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }

    info!("tcp listener stopped");
}

/// Run one TCP connection to completion.
async fn run_peer(
    id: ConnId,
    stream: TcpStream,
    addr: SocketAddr,
    ctx: RelayContext,
) -> io::Result<()> {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(conn = %id, error = %e, "set_nodelay failed");
    }

    let (mut read_half, write_half) = stream.into_split();
    let (out_tx, out_rx) = mpsc::channel(ctx.outbound_buffer);

    ctx.registry()
        .insert(Peer::new(id, Transport::Tcp, addr, out_tx.clone()))
        .await;

    let writer = tokio::spawn(run_writer(id, write_half, out_rx, ctx.clone()));

    let result = read_lines(id, &mut read_half, &out_tx, &ctx).await;

    if let Some(peer) = ctx.registry().unregister(id).await {
        info!(
            conn = %id,
            role = %peer.role,
            external_id = peer.external_id.as_deref().unwrap_or(""),
            "tcp peer disconnected"
        );
    }

    // The writer flushes whatever is still queued, then exits once every
    // sender is gone.
    drop(out_tx);
    let _ = writer.await;

    result
}

async fn run_writer(
    id: ConnId,
    mut write_half: OwnedWriteHalf,
    mut out_rx: OutboundRx,
    ctx: RelayContext,
) {
    let mut buf = BytesMut::with_capacity(1024);

    while let Some(frame) = out_rx.recv().await {
        buf.clear();
        encode_line(&frame, &mut buf);

        if let Err(e) = write_half.write_all(&buf).await {
            warn!(conn = %id, error = %e, "tcp write failed, dropping peer");
            ctx.registry().unregister(id).await;
            return;
        }
    }

    let _ = write_half.shutdown().await;
}

async fn read_lines(
    id: ConnId,
    read_half: &mut OwnedReadHalf,
    out_tx: &OutboundTx,
    ctx: &RelayContext,
) -> io::Result<()> {
    let mut lines = LineBuffer::new(ctx.max_line_bytes);
    let mut chunk = [0u8; 4096];

    loop {
        let n = tokio::select! {
            _ = ctx.shutdown.cancelled() => return Ok(()),
            read = read_half.read(&mut chunk) => read?,
        };

        if n == 0 {
            if lines.pending() > 0 {
                debug!(conn = %id, bytes = lines.pending(), "discarding unterminated line at EOF");
            }
            return Ok(());
        }

        lines.extend(&chunk[..n]);

        loop {
            match lines.next_line() {
                Ok(Some(line)) => {
                    let reply = match process_line(id, &line, ctx).await {
                        Ok(reply) => reply,
                        Err(e) => {
                            error!(conn = %id, error = %e, "failed to process line");
                            Some(TcpAck::error(MSG_PROCESSING_ERROR))
                        }
                    };
                    if let Some(ack) = reply {
                        ctx.dispatcher.reply(id, out_tx, &ack).await;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(conn = %id, error = %e, "oversized line discarded");
                    ctx.dispatcher
                        .reply(id, out_tx, &TcpAck::error(MSG_LINE_TOO_LONG))
                        .await;
                }
            }
        }
    }
}

#[derive(Debug, Error)]
enum ProcessError {
    #[error("connection {0} is no longer registered")]
    PeerGone(ConnId),
}

/// Classify one line and perform its dispatch actions.
///
/// Returns the acknowledgment owed to the sender, if any.
async fn process_line(
    id: ConnId,
    line: &[u8],
    ctx: &RelayContext,
) -> Result<Option<TcpAck>, ProcessError> {
    let dispatcher = &ctx.dispatcher;

    match classify(line) {
        Message::Identify(Identify { role, external_id }) => {
            let registration = ctx.registry().register(id, role, external_id.clone()).await;
            let external = external_id.as_deref().unwrap_or("");
            match registration {
                Registration::Registered => {
                    info!(conn = %id, role = %Role::from(role), external_id = external, "peer registered");
                }
                Registration::Updated { previous } => {
                    info!(
                        conn = %id,
                        role = %Role::from(role),
                        external_id = external,
                        previous = previous.as_deref().unwrap_or(""),
                        "peer re-identified"
                    );
                }
                Registration::Conflict { current } => {
                    warn!(conn = %id, %current, requested = %Role::from(role), "identity conflict ignored");
                    return Ok(Some(TcpAck::error(format!(
                        "connection already registered as {}",
                        current
                    ))));
                }
                Registration::Missing => return Err(ProcessError::PeerGone(id)),
            }
            Ok(Some(TcpAck::registered(role, external_id)))
        }

        Message::AiGameEvent(event) => {
            debug!(conn = %id, kind = event.kind.as_str(), "ai game event");
            dispatcher
                .broadcast(Role::Frontend, &game_event_payload(&event, Timestamp::now()))
                .await;
            Ok(None)
        }

        Message::RobotResult(result) => {
            info!(conn = %id, goal_id = %result.goal_id, success = %result.success, "robot result");
            let event = FrontendEvent::RobotResponse {
                success: result.success,
                goal_id: result.goal_id,
                response: result.raw,
                timestamp: Timestamp::now(),
            };
            dispatcher.broadcast(Role::Frontend, &event).await;
            Ok(None)
        }

        Message::AiMoveCommand(cmd) => {
            let ai_id = ctx
                .registry()
                .get(id)
                .await
                .and_then(|peer| peer.external_id)
                .unwrap_or_else(|| UNKNOWN_AI_ID.to_string());

            dispatcher
                .broadcast(Role::Frontend, &PositionBroadcast::new(cmd.fen_str, Source::Ai))
                .await;

            let command = RobotCommand::from_ai_move(cmd.mv, ai_id.clone());
            let report = dispatcher.broadcast(Role::Robot, &command).await;
            info!(
                conn = %id,
                ai_id = %ai_id,
                goal_id = %command.goal_id,
                robots = report.delivered,
                "ai move forwarded"
            );

            let executed = FrontendEvent::AiMoveExecuted {
                goal_id: command.goal_id.clone(),
                mv: command.mv,
                ai_id,
                timestamp: command.header.timestamp,
            };
            dispatcher.broadcast(Role::Frontend, &executed).await;

            Ok(Some(TcpAck::ai_command_processed(command.goal_id)))
        }

        Message::AiLegacyEvaluation(eval) => {
            let event = FrontendEvent::AiResponse {
                best_move: eval.best_move,
                evaluation: eval.evaluation,
                timestamp: Timestamp::now(),
            };
            dispatcher.broadcast(Role::Frontend, &event).await;
            Ok(None)
        }

        Message::PositionUpdate { fen_str } => {
            debug!(conn = %id, fen = %fen_str, "position update");
            dispatcher
                .broadcast(Role::Frontend, &PositionBroadcast::new(fen_str, Source::Tcp))
                .await;
            Ok(Some(TcpAck::fen_broadcast()))
        }

        Message::Unrecognized { raw } => {
            debug!(conn = %id, %raw, "unrecognized line");
            Ok(Some(TcpAck::error(MSG_INVALID_FORMAT)))
        }
    }
}
