use std::time::Duration;

use relay_server::bind::{bind_with_fallback, BindPlan, ListenerKind};
use tokio::net::TcpListener;

async fn occupied_port() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

async fn free_port() -> u16 {
    let (listener, port) = occupied_port().await;
    drop(listener);
    port
}

fn plan(kind: ListenerKind, port: u16, alt_ports: Vec<u16>) -> BindPlan {
    BindPlan {
        kind,
        primary_addr: "127.0.0.1".into(),
        fallback_addr: "127.0.0.1".into(),
        port,
        alt_ports,
        attempt_timeout: Duration::from_secs(1),
    }
}

#[test]
fn candidates_walk_primary_then_fallback() {
    let plan = BindPlan {
        kind: ListenerKind::Tcp,
        primary_addr: "127.0.0.1".into(),
        fallback_addr: "0.0.0.0".into(),
        port: 8080,
        alt_ports: vec![8083, 8084, 8080],
        attempt_timeout: Duration::from_secs(1),
    };

    let expected: Vec<(String, u16)> = vec![
        ("127.0.0.1".into(), 8080),
        ("127.0.0.1".into(), 8083),
        ("127.0.0.1".into(), 8084),
        ("0.0.0.0".into(), 8080),
        ("0.0.0.0".into(), 8083),
        ("0.0.0.0".into(), 8084),
    ];
    assert_eq!(plan.candidates(), expected);
}

#[test]
fn same_fallback_address_is_not_retried() {
    let plan = plan(ListenerKind::WebSocket, 8081, vec![8085]);
    assert_eq!(plan.candidates().len(), 2);
}

#[tokio::test]
async fn binds_primary_port_when_free() {
    let port = free_port().await;
    let bound = bind_with_fallback(&plan(ListenerKind::Tcp, port, vec![]))
        .await
        .unwrap();
    assert_eq!(bound.endpoint.addr.port(), port);
    assert_eq!(bound.endpoint.kind, ListenerKind::Tcp);
}

#[tokio::test]
async fn skips_occupied_ports_in_order() {
    let (_p, primary) = occupied_port().await;
    let (_a, alt_a) = occupied_port().await;
    let alt_b = free_port().await;

    let bound = bind_with_fallback(&plan(ListenerKind::WebSocket, primary, vec![alt_a, alt_b]))
        .await
        .unwrap();

    assert_eq!(bound.endpoint.addr.port(), alt_b);
}

#[tokio::test]
async fn exhausted_candidates_report_every_attempt() {
    let (_p, primary) = occupied_port().await;
    let (_a, alt) = occupied_port().await;

    let err = bind_with_fallback(&plan(ListenerKind::Tcp, primary, vec![alt]))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ListenerKind::Tcp);
    let ports: Vec<u16> = err.attempts.iter().map(|a| a.port).collect();
    assert_eq!(ports, vec![primary, alt]);
}

#[tokio::test]
async fn unresolvable_primary_falls_back_to_second_address() {
    let port = free_port().await;
    let plan = BindPlan {
        kind: ListenerKind::Http,
        primary_addr: "256.256.256.256".into(),
        fallback_addr: "127.0.0.1".into(),
        port,
        alt_ports: vec![],
        attempt_timeout: Duration::from_secs(2),
    };

    let bound = bind_with_fallback(&plan).await.unwrap();
    assert!(bound.endpoint.addr.ip().is_loopback());
    assert_eq!(bound.endpoint.addr.port(), port);
}
