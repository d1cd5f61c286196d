//! Broadcast / dispatch engine.
//!
//! Stateless fan-out: encode a payload once, then offer the frame to every
//! member of a registry partition without awaiting any of them.
//!
//! Per-peer policy:
//! - queue has room → delivered
//! - queue full     → skipped for this frame, peer stays registered
//! - queue closed   → the writer died on a failed write: peer is removed
//!
//! One bad peer never stops delivery to the rest of the partition.

use std::sync::Arc;

use relay_core::Role;
use relay_protocol::encode;
use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, warn};

use crate::registry::Registry;
use crate::types::{ConnId, Frame, OutboundTx};

/// Result of offering one frame to one peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Skipped,
    Dropped,
}

/// Tally of a fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub skipped: usize,
    pub dropped: usize,
}

impl DispatchReport {
    fn record(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Delivered => self.delivered += 1,
            Delivery::Skipped => self.skipped += 1,
            Delivery::Dropped => self.dropped += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Send `payload` to every member of `role`.
    pub async fn broadcast<T: Serialize + ?Sized>(&self, role: Role, payload: &T) -> DispatchReport {
        self.broadcast_except(role, None, payload).await
    }

    /// Send `payload` to every member of `role` except `skip`.
    pub async fn broadcast_except<T: Serialize + ?Sized>(
        &self,
        role: Role,
        skip: Option<ConnId>,
        payload: &T,
    ) -> DispatchReport {
        match encode_frame(payload) {
            Some(frame) => self.fan_out(role, skip, frame).await,
            None => DispatchReport::default(),
        }
    }

    /// Offer an already encoded frame to a partition.
    pub async fn fan_out(&self, role: Role, skip: Option<ConnId>, frame: Frame) -> DispatchReport {
        let members = self.registry.snapshot(role).await;
        let mut report = DispatchReport::default();

        for peer in members.iter().filter(|p| Some(p.id) != skip) {
            let delivery = self.offer(peer.id, &peer.outbound, frame.clone()).await;
            report.record(delivery);
        }

        debug!(
            %role,
            delivered = report.delivered,
            skipped = report.skipped,
            dropped = report.dropped,
            "fan-out complete"
        );
        report
    }

    /// Send `payload` to a single connection (acknowledgments, errors).
    pub async fn reply<T: Serialize + ?Sized>(
        &self,
        id: ConnId,
        outbound: &OutboundTx,
        payload: &T,
    ) -> Delivery {
        match encode_frame(payload) {
            Some(frame) => self.offer(id, outbound, frame).await,
            None => Delivery::Skipped,
        }
    }

    async fn offer(&self, id: ConnId, outbound: &OutboundTx, frame: Frame) -> Delivery {
        match outbound.try_send(frame) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => {
                warn!(conn = %id, "outbound queue full, frame skipped");
                Delivery::Skipped
            }
            Err(TrySendError::Closed(_)) => {
                if let Some(peer) = self.registry.unregister(id).await {
                    warn!(conn = %id, role = %peer.role, "writer gone, peer removed");
                }
                Delivery::Dropped
            }
        }
    }
}

fn encode_frame<T: Serialize + ?Sized>(payload: &T) -> Option<Frame> {
    match encode(payload) {
        Ok(json) => Some(Frame::from(json)),
        Err(e) => {
            error!(error = %e, "failed to encode outbound payload");
            None
        }
    }
}
