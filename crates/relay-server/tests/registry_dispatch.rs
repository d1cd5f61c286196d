use std::net::SocketAddr;
use std::sync::Arc;

use relay_core::{PeerRole, Role};
use relay_server::dispatch::{Delivery, Dispatcher};
use relay_server::registry::{Peer, Registration, Registry};
use relay_server::types::{next_conn_id, ConnId, OutboundRx, Transport};
use serde_json::{json, Value};
use tokio::sync::mpsc;

fn addr() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

async fn add_peer(
    registry: &Registry,
    transport: Transport,
    buffer: usize,
) -> (ConnId, OutboundRx) {
    let id = next_conn_id();
    let (tx, rx) = mpsc::channel(buffer);
    registry.insert(Peer::new(id, transport, addr(), tx)).await;
    (id, rx)
}

fn frame_json(rx: &mut OutboundRx) -> Option<Value> {
    rx.try_recv()
        .ok()
        .map(|frame| serde_json::from_str(&frame).unwrap())
}

#[tokio::test]
async fn tcp_peer_starts_unknown_and_registers_once() {
    let registry = Registry::new();
    let (id, _rx) = add_peer(&registry, Transport::Tcp, 8).await;

    assert_eq!(registry.get(id).await.unwrap().role, Role::Unknown);

    let first = registry.register(id, PeerRole::Robot, Some("R1".into())).await;
    assert_eq!(first, Registration::Registered);
    assert_eq!(registry.snapshot(Role::Robot).await.len(), 1);

    let again = registry.register(id, PeerRole::Robot, Some("R2".into())).await;
    assert_eq!(
        again,
        Registration::Updated {
            previous: Some("R1".into())
        }
    );
    assert_eq!(registry.get(id).await.unwrap().external_id.as_deref(), Some("R2"));

    let conflict = registry.register(id, PeerRole::Ai, Some("ai1".into())).await;
    assert_eq!(conflict, Registration::Conflict { current: Role::Robot });
    assert!(registry.snapshot(Role::Ai).await.is_empty());
}

#[tokio::test]
async fn websocket_peer_is_frontend_and_cannot_identify() {
    let registry = Registry::new();
    let (id, _rx) = add_peer(&registry, Transport::WebSocket, 8).await;

    assert_eq!(registry.snapshot(Role::Frontend).await.len(), 1);
    assert_eq!(
        registry.register(id, PeerRole::Robot, None).await,
        Registration::Conflict {
            current: Role::Frontend
        }
    );
}

#[tokio::test]
async fn unregister_removes_from_every_partition() {
    let registry = Registry::new();
    let (robot, _r) = add_peer(&registry, Transport::Tcp, 8).await;
    let (ai, _a) = add_peer(&registry, Transport::Tcp, 8).await;
    registry.register(robot, PeerRole::Robot, Some("R1".into())).await;
    registry.register(ai, PeerRole::Ai, Some("ai1".into())).await;

    assert!(registry.unregister(robot).await.is_some());
    assert!(registry.unregister(robot).await.is_none());

    let counts = registry.counts().await;
    assert_eq!(counts.robots, 0);
    assert_eq!(counts.ais, 1);
    assert_eq!(counts.total(), 1);
    assert_eq!(
        registry.register(robot, PeerRole::Robot, None).await,
        Registration::Missing
    );
}

#[tokio::test]
async fn dead_peer_is_dropped_without_blocking_others() {
    let registry = Arc::new(Registry::new());
    let dispatcher = Dispatcher::new(registry.clone());

    let (alive, mut alive_rx) = add_peer(&registry, Transport::WebSocket, 8).await;
    let (dead, dead_rx) = add_peer(&registry, Transport::WebSocket, 8).await;
    drop(dead_rx);

    let report = dispatcher
        .broadcast(Role::Frontend, &json!({"fen_str": "8/8/8/8/8/8/8/8"}))
        .await;

    assert_eq!(report.delivered, 1);
    assert_eq!(report.dropped, 1);
    assert_eq!(frame_json(&mut alive_rx).unwrap()["fen_str"], "8/8/8/8/8/8/8/8");
    assert!(registry.get(dead).await.is_none());
    assert!(registry.get(alive).await.is_some());
}

#[tokio::test]
async fn full_queue_skips_frame_but_keeps_peer() {
    let registry = Arc::new(Registry::new());
    let dispatcher = Dispatcher::new(registry.clone());
    let (slow, mut slow_rx) = add_peer(&registry, Transport::WebSocket, 1).await;

    let first = dispatcher.broadcast(Role::Frontend, &json!({"n": 1})).await;
    let second = dispatcher.broadcast(Role::Frontend, &json!({"n": 2})).await;

    assert_eq!(first.delivered, 1);
    assert_eq!(second.skipped, 1);
    assert!(registry.get(slow).await.is_some());

    assert_eq!(frame_json(&mut slow_rx).unwrap()["n"], 1);
    assert!(frame_json(&mut slow_rx).is_none());
}

#[tokio::test]
async fn broadcast_except_skips_the_sender() {
    let registry = Arc::new(Registry::new());
    let dispatcher = Dispatcher::new(registry.clone());
    let (sender, mut sender_rx) = add_peer(&registry, Transport::WebSocket, 8).await;
    let (_other, mut other_rx) = add_peer(&registry, Transport::WebSocket, 8).await;

    let report = dispatcher
        .broadcast_except(Role::Frontend, Some(sender), &json!({"chat": "hi"}))
        .await;

    assert_eq!(report.delivered, 1);
    assert!(frame_json(&mut sender_rx).is_none());
    assert_eq!(frame_json(&mut other_rx).unwrap()["chat"], "hi");
}

#[tokio::test]
async fn partitions_only_receive_their_own_traffic() {
    let registry = Arc::new(Registry::new());
    let dispatcher = Dispatcher::new(registry.clone());
    let (robot, mut robot_rx) = add_peer(&registry, Transport::Tcp, 8).await;
    let (_unknown, mut unknown_rx) = add_peer(&registry, Transport::Tcp, 8).await;
    let (_frontend, mut frontend_rx) = add_peer(&registry, Transport::WebSocket, 8).await;
    registry.register(robot, PeerRole::Robot, None).await;

    let report = dispatcher.broadcast(Role::Robot, &json!({"goal_id": "g1"})).await;

    assert_eq!(report.delivered, 1);
    assert_eq!(frame_json(&mut robot_rx).unwrap()["goal_id"], "g1");
    assert!(frame_json(&mut unknown_rx).is_none());
    assert!(frame_json(&mut frontend_rx).is_none());
}

#[tokio::test]
async fn reply_to_closed_queue_reports_dropped() {
    let registry = Arc::new(Registry::new());
    let dispatcher = Dispatcher::new(registry.clone());
    let id = next_conn_id();
    let (tx, rx) = mpsc::channel(1);
    registry.insert(Peer::new(id, Transport::Tcp, addr(), tx.clone())).await;
    drop(rx);

    assert_eq!(
        dispatcher.reply(id, &tx, &json!({"status": "success"})).await,
        Delivery::Dropped
    );
    assert!(registry.get(id).await.is_none());
}
