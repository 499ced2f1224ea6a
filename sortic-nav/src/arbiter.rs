//! Gateway arbitration between cooperating vehicles.
//!
//! Each gateway admits one vehicle at a time. Vehicles talk to the
//! [`GatewayArbiter`] over channels:
//!
//! ```text
//! vehicle ── Acquire { gateway } ──▶ arbiter
//! vehicle ◀── Granted { gateway } ── arbiter   (immediately, or when the holder releases)
//! vehicle ── Release { gateway } ──▶ arbiter
//! vehicle ◀── Revoked { gateway } ── arbiter   (always before the next waiter is granted)
//! ```
//!
//! The arbiter is pumped with [`GatewayArbiter::process_pending`], either from
//! the same tick loop as the navigators or from its own thread.

use std::collections::{HashMap, VecDeque};

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use crate::topology::Sector;

/// Vehicle identifier, as configured in `[vehicle] id`.
pub type VehicleId = String;

/// Vehicle to arbiter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArbiterRequest {
    Acquire { vehicle: VehicleId, gateway: Sector },
    Release { vehicle: VehicleId, gateway: Sector },
}

/// Arbiter to vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArbiterReply {
    Granted { gateway: Sector },
    Revoked { gateway: Sector },
}

/// Vehicle end of the arbitration channel pair.
pub struct GatewayLink {
    vehicle: VehicleId,
    requests: Sender<ArbiterRequest>,
    replies: Receiver<ArbiterReply>,
}

impl GatewayLink {
    /// Identifier this link was registered with.
    pub fn vehicle(&self) -> &str {
        &self.vehicle
    }

    /// Ask for exclusive use of `gateway`.
    pub fn acquire(&self, gateway: Sector) {
        self.send(ArbiterRequest::Acquire {
            vehicle: self.vehicle.clone(),
            gateway,
        });
    }

    /// Give `gateway` back, or withdraw a pending request for it.
    pub fn release(&self, gateway: Sector) {
        self.send(ArbiterRequest::Release {
            vehicle: self.vehicle.clone(),
            gateway,
        });
    }

    /// Next reply, if any. Never blocks.
    pub fn try_recv(&self) -> Option<ArbiterReply> {
        match self.replies.try_recv() {
            Ok(reply) => Some(reply),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                tracing::trace!("GatewayLink[{}]: arbiter gone", self.vehicle);
                None
            }
        }
    }

    fn send(&self, request: ArbiterRequest) {
        if self.requests.send(request).is_err() {
            tracing::warn!("GatewayLink[{}]: arbiter disconnected", self.vehicle);
        }
    }
}

#[derive(Debug, Default)]
struct GatewayQueue {
    holder: Option<VehicleId>,
    waiting: VecDeque<VehicleId>,
}

/// Central token owner for all gateways.
pub struct GatewayArbiter {
    requests_tx: Sender<ArbiterRequest>,
    requests_rx: Receiver<ArbiterRequest>,
    vehicles: HashMap<VehicleId, Sender<ArbiterReply>>,
    gateways: HashMap<Sector, GatewayQueue>,
}

impl GatewayArbiter {
    pub fn new() -> Self {
        let (requests_tx, requests_rx) = unbounded();
        Self {
            requests_tx,
            requests_rx,
            vehicles: HashMap::new(),
            gateways: HashMap::new(),
        }
    }

    /// Register a vehicle and hand back its end of the channel pair.
    ///
    /// Reconnecting an id replaces its reply channel.
    pub fn connect(&mut self, vehicle: impl Into<VehicleId>) -> GatewayLink {
        let vehicle = vehicle.into();
        let (reply_tx, reply_rx) = unbounded();
        self.vehicles.insert(vehicle.clone(), reply_tx);
        tracing::debug!("GatewayArbiter: vehicle {} connected", vehicle);
        GatewayLink {
            vehicle,
            requests: self.requests_tx.clone(),
            replies: reply_rx,
        }
    }

    /// Handle every queued request. Returns how many were handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(request) = self.requests_rx.try_recv() {
            self.handle(request);
            handled += 1;
        }
        handled
    }

    /// Vehicle currently allowed into `gateway`.
    pub fn holder(&self, gateway: Sector) -> Option<&str> {
        self.gateways
            .get(&gateway)
            .and_then(|q| q.holder.as_deref())
    }

    /// Vehicles waiting for `gateway`, oldest first.
    pub fn waiting(&self, gateway: Sector) -> Vec<&str> {
        self.gateways
            .get(&gateway)
            .map(|q| q.waiting.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn handle(&mut self, request: ArbiterRequest) {
        match request {
            ArbiterRequest::Acquire { vehicle, gateway } => self.acquire(vehicle, gateway),
            ArbiterRequest::Release { vehicle, gateway } => self.release(vehicle, gateway),
        }
    }

    fn acquire(&mut self, vehicle: VehicleId, gateway: Sector) {
        if !matches!(gateway, Sector::SorticGateway | Sector::TransferGateway) {
            tracing::warn!(
                "GatewayArbiter: {} asked for {}, which is not a gateway",
                vehicle,
                gateway
            );
            return;
        }
        if !self.vehicles.contains_key(&vehicle) {
            tracing::warn!("GatewayArbiter: acquire from unknown vehicle {}", vehicle);
            return;
        }

        let queue = self.gateways.entry(gateway).or_default();
        match queue.holder.as_deref() {
            None => {
                queue.holder = Some(vehicle.clone());
                tracing::info!("GatewayArbiter: {} granted to {}", gateway, vehicle);
                self.reply(&vehicle, ArbiterReply::Granted { gateway });
            }
            Some(holder) if holder == vehicle => {
                self.reply(&vehicle, ArbiterReply::Granted { gateway });
            }
            Some(holder) => {
                if !queue.waiting.contains(&vehicle) {
                    tracing::debug!(
                        "GatewayArbiter: {} waits for {} (held by {})",
                        vehicle,
                        gateway,
                        holder
                    );
                    queue.waiting.push_back(vehicle);
                }
            }
        }
    }

    fn release(&mut self, vehicle: VehicleId, gateway: Sector) {
        let Some(queue) = self.gateways.get_mut(&gateway) else {
            return;
        };

        if queue.holder.as_deref() != Some(vehicle.as_str()) {
            queue.waiting.retain(|v| v != &vehicle);
            return;
        }

        queue.holder = None;
        let next = queue.waiting.pop_front();
        tracing::info!("GatewayArbiter: {} released by {}", gateway, vehicle);
        self.reply(&vehicle, ArbiterReply::Revoked { gateway });

        if let Some(next) = next {
            if let Some(queue) = self.gateways.get_mut(&gateway) {
                queue.holder = Some(next.clone());
            }
            tracing::info!("GatewayArbiter: {} granted to {}", gateway, next);
            self.reply(&next, ArbiterReply::Granted { gateway });
        }
    }

    fn reply(&self, vehicle: &str, reply: ArbiterReply) {
        match self.vehicles.get(vehicle) {
            Some(tx) => {
                if tx.send(reply).is_err() {
                    tracing::warn!("GatewayArbiter: vehicle {} hung up", vehicle);
                }
            }
            None => tracing::warn!("GatewayArbiter: no channel for {}", vehicle),
        }
    }
}

impl Default for GatewayArbiter {
    fn default() -> Self {
        Self::new()
    }
}
