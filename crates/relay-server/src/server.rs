//! Top-level server wiring.
//!
//! `start` resolves and binds every listener, then spawns:
//! - the TCP accept loop (robots, AI engines),
//! - the WebSocket accept loop (frontends), when a port was found,
//! - the HTTP ingress, when enabled and a port was found,
//! - the periodic status logger.
//!
//! Every task is spawned on one `TaskTracker` and watches one
//! `CancellationToken`, so shutdown is a cancel followed by a bounded wait.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::bind::{bind_with_fallback, ListenerKind};
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::RelayError;
use crate::registry::Registry;
use crate::{http, tcp, ws};

/// Everything a connection task needs.
#[derive(Debug, Clone)]
pub struct RelayContext {
    pub dispatcher: Dispatcher,
    pub outbound_buffer: usize,
    pub max_line_bytes: usize,
    pub connection_timeout: Duration,
    pub shutdown: CancellationToken,
    pub tracker: TaskTracker,
}

impl RelayContext {
    pub fn registry(&self) -> &Arc<Registry> {
        self.dispatcher.registry()
    }
}

/// A running hub.
#[derive(Debug)]
pub struct RelayHandle {
    tcp_addr: SocketAddr,
    ws_addr: Option<SocketAddr>,
    http_addr: Option<SocketAddr>,
    ctx: RelayContext,
}

impl RelayHandle {
    pub fn tcp_addr(&self) -> SocketAddr {
        self.tcp_addr
    }

    /// `None` when no WebSocket endpoint could be bound.
    pub fn ws_addr(&self) -> Option<SocketAddr> {
        self.ws_addr
    }

    /// `None` when HTTP is disabled or no endpoint could be bound.
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http_addr
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.ctx.registry()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.ctx.shutdown.clone()
    }

    /// Stop accepting, close every connection and wait for tasks to drain.
    ///
    /// Tasks still running after `connection_timeout` are abandoned.
    pub async fn shutdown(self) {
        let ctx = self.ctx;
        ctx.shutdown.cancel();
        ctx.tracker.close();

        if tokio::time::timeout(ctx.connection_timeout, ctx.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                remaining = ctx.tracker.len(),
                "shutdown drain timed out, abandoning tasks"
            );
        } else {
            info!("relay hub stopped");
        }
    }
}

/// Bind listeners and start serving.
///
/// Fails only when no TCP endpoint can be bound.
pub async fn start(config: Config) -> Result<RelayHandle, RelayError> {
    config.validate()?;

    let tcp = bind_with_fallback(&config.bind_plan(ListenerKind::Tcp)).await?;

    let ws = match bind_with_fallback(&config.bind_plan(ListenerKind::WebSocket)).await {
        Ok(bound) => Some(bound),
        Err(e) => {
            error!(error = %e, "continuing without websocket listener");
            None
        }
    };

    let http = if config.http_enabled {
        match bind_with_fallback(&config.bind_plan(ListenerKind::Http)).await {
            Ok(bound) => Some(bound),
            Err(e) => {
                warn!(error = %e, "continuing without http ingress");
                None
            }
        }
    } else {
        None
    };

    let registry = Arc::new(Registry::new());
    let ctx = RelayContext {
        dispatcher: Dispatcher::new(registry),
        outbound_buffer: config.outbound_buffer,
        max_line_bytes: config.max_line_bytes,
        connection_timeout: config.connection_timeout(),
        shutdown: CancellationToken::new(),
        tracker: TaskTracker::new(),
    };

    let tcp_addr = tcp.endpoint.addr;
    ctx.tracker.spawn(tcp::run_listener(tcp.listener, ctx.clone()));

    let ws_addr = ws.map(|bound| {
        ctx.tracker.spawn(ws::run_listener(bound.listener, ctx.clone()));
        bound.endpoint.addr
    });

    let http_addr = http.map(|bound| {
        let dispatcher = ctx.dispatcher.clone();
        let shutdown = ctx.shutdown.clone();
        ctx.tracker.spawn(async move {
            if let Err(e) = http::serve(bound.listener, dispatcher, shutdown).await {
                error!(error = %e, "http ingress failed");
            }
        });
        bound.endpoint.addr
    });

    if config.status_interval_secs > 0 {
        let period = Duration::from_secs(config.status_interval_secs);
        ctx.tracker.spawn(report_status(ctx.clone(), period));
    }

    info!(
        tcp = %tcp_addr,
        ws = %display_addr(ws_addr),
        http = %display_addr(http_addr),
        "relay hub started"
    );

    Ok(RelayHandle {
        tcp_addr,
        ws_addr,
        http_addr,
        ctx,
    })
}

/// Run until Ctrl-C, then shut down.
pub async fn run(config: Config) -> Result<(), RelayError> {
    let handle = start(config).await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c, shutting down");
    } else {
        info!("ctrl-c received, shutting down");
    }

    handle.shutdown().await;
    Ok(())
}

async fn report_status(ctx: RelayContext, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    // The first tick fires immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ctx.shutdown.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let counts = ctx.registry().counts().await;
        info!(
            robots = counts.robots,
            ais = counts.ais,
            frontends = counts.frontends,
            unidentified = counts.unknown,
            "status"
        );
    }
}

fn display_addr(addr: Option<SocketAddr>) -> String {
    addr.map(|a| a.to_string())
        .unwrap_or_else(|| "disabled".to_string())
}
