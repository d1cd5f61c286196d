//! WebSocket listener for frontends.
//!
//! Frontends need no handshake beyond the WebSocket upgrade: every
//! accepted socket joins the frontend partition immediately. Frames are
//! JSON text; see [`relay_core::classify_frontend`] for how they route.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use relay_core::{classify_frontend, FrontendMessage, Role};
use relay_protocol::wire_types::MSG_INVALID_FORMAT;
use relay_protocol::FrontendEvent;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use crate::registry::Peer;
use crate::server::RelayContext;
use crate::types::{next_conn_id, ConnId, OutboundTx, Transport};

#[derive(Debug, Error)]
pub enum WsError {
    #[error("websocket handshake failed: {0}")]
    Handshake(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("websocket handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),
}

/// Accept frontends until shutdown.
pub async fn run_listener(listener: TcpListener, ctx: RelayContext) {
    loop {
        let accepted = tokio::select! {
            _ = ctx.shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, addr)) => {
                let id = next_conn_id();
                let peer_ctx = ctx.clone();
                ctx.tracker.spawn(async move {
                    if let Err(e) = run_peer(id, stream, addr, peer_ctx).await {
                        warn!(conn = %id, peer = %addr, error = %e, "frontend rejected");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "websocket accept failed");
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }

    info!("websocket listener stopped");
}

async fn run_peer(
    id: ConnId,
    stream: TcpStream,
    addr: SocketAddr,
    ctx: RelayContext,
) -> Result<(), WsError> {
    let ws_stream = timeout(ctx.connection_timeout, accept_async(stream))
        .await
        .map_err(|_| WsError::HandshakeTimeout(ctx.connection_timeout))??;

    let (mut sink, mut source) = ws_stream.split();
    let (out_tx, mut out_rx) = mpsc::channel(ctx.outbound_buffer);

    ctx.registry()
        .insert(Peer::new(id, Transport::WebSocket, addr, out_tx.clone()))
        .await;
    info!(conn = %id, peer = %addr, "frontend connected");

    let writer_ctx = ctx.clone();
    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if let Err(e) = sink.send(WsMessage::Text(frame.to_string())).await {
                warn!(conn = %id, error = %e, "websocket write failed, dropping frontend");
                writer_ctx.registry().unregister(id).await;
                return;
            }
        }
        let _ = sink.close().await;
    });

    loop {
        let next = tokio::select! {
            _ = ctx.shutdown.cancelled() => break,
            next = source.next() => next,
        };

        match next {
            Some(Ok(WsMessage::Text(text))) => handle_frame(id, &text, &out_tx, &ctx).await,
            Some(Ok(WsMessage::Binary(data))) => match std::str::from_utf8(&data) {
                Ok(text) => handle_frame(id, text, &out_tx, &ctx).await,
                Err(e) => {
                    let event = FrontendEvent::error(MSG_INVALID_FORMAT, e.to_string());
                    ctx.dispatcher.reply(id, &out_tx, &event).await;
                }
            },
            Some(Ok(WsMessage::Close(_))) | None => break,
            // Ping / pong are answered by tungstenite itself.
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                debug!(conn = %id, error = %e, "websocket read error");
                break;
            }
        }
    }

    if ctx.registry().unregister(id).await.is_some() {
        info!(conn = %id, peer = %addr, "frontend disconnected");
    }
    drop(out_tx);
    let _ = writer.await;

    Ok(())
}

/// Route one frame from a frontend.
async fn handle_frame(id: ConnId, text: &str, out_tx: &OutboundTx, ctx: &RelayContext) {
    let dispatcher = &ctx.dispatcher;

    match classify_frontend(text) {
        Ok(FrontendMessage::RobotCommandRequest { goal_id, payload }) => {
            let report = dispatcher.broadcast(Role::Robot, &payload).await;
            info!(conn = %id, goal_id = %goal_id, robots = report.delivered, "robot command relayed");
            dispatcher
                .reply(id, out_tx, &FrontendEvent::command_sent(goal_id))
                .await;
        }
        Ok(FrontendMessage::AiAnalysisRequest {
            request_id,
            payload,
            ..
        }) => {
            let report = dispatcher.broadcast(Role::Ai, &payload).await;
            info!(conn = %id, request_id = %request_id, ais = report.delivered, "ai request relayed");
            dispatcher
                .reply(id, out_tx, &FrontendEvent::ai_request_sent(request_id))
                .await;
        }
        Ok(FrontendMessage::PassThrough(value)) => {
            dispatcher
                .broadcast_except(Role::Frontend, Some(id), &value)
                .await;
        }
        Err(e) => {
            debug!(conn = %id, error = %e, "malformed frontend frame");
            dispatcher
                .reply(id, out_tx, &FrontendEvent::error(MSG_INVALID_FORMAT, e.to_string()))
                .await;
        }
    }
}
