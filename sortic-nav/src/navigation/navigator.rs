//! Navigation state machine.
//!
//! The navigator is ticked by an external scheduler:
//!
//! 1. Replies from the gateway arbiter are drained (grant/revoke the token)
//! 2. A pending injected event, if any, is processed and the tick ends there,
//!    so error and reset always preempt the running maneuver
//! 3. Otherwise the do-action of the active state runs at most one drive step
//! 4. The event it returns is fed to [`Navigator::process`]
//!
//! Transitions run exit(current) → state := next → entry(next). The
//! transition table lives in [`Navigator::next_transition`].

use crate::arbiter::{ArbiterReply, GatewayLink};
use crate::config::Config;
use crate::drive::{DrivePrimitive, DriveStep, Turn};
use crate::error::Result;
use crate::payload::{NavStatus, PositionPayload, PositionUpdate};
use crate::position::{validate_actual, ActualPosition, TargetPosition};
use crate::topology::Sector;

use super::phase::Phase;
use super::state::{Event, State};

/// Per-vehicle navigator settings.
#[derive(Clone, Debug, PartialEq)]
pub struct NavigatorConfig {
    /// Identifier used with the gateway arbiter and in logs
    pub vehicle_id: String,
    /// Motions performed by the reset state before returning to end point
    pub recovery_maneuver: Vec<DriveStep>,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            vehicle_id: "agv-1".to_string(),
            recovery_maneuver: vec![DriveStep::Reverse],
        }
    }
}

impl From<&Config> for NavigatorConfig {
    fn from(config: &Config) -> Self {
        Self {
            vehicle_id: config.vehicle.id.clone(),
            recovery_maneuver: config.navigation.recovery_maneuver.clone(),
        }
    }
}

/// State and phase frozen when an error was processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrorSnapshot {
    pub state: State,
    pub phase: Phase,
}

enum Transition {
    Stay,
    Enter(State),
    Fail,
    Restore(ErrorSnapshot),
}

/// Navigation state machine for one vehicle.
pub struct Navigator<D: DrivePrimitive> {
    pub(super) config: NavigatorConfig,
    pub(super) drive: D,
    link: Option<GatewayLink>,

    state: State,
    pub(super) phase: Phase,
    /// Event queued by [`Navigator::inject_event`]
    pending: Option<Event>,
    snapshot: Option<ErrorSnapshot>,

    pub(super) actual: ActualPosition,
    pub(super) target: Option<TargetPosition>,
    /// Transit may still be crossed during this journey
    pub(super) transit_once: bool,
    /// Turn made toward the target line inside the current gateway
    pub(super) last_gateway_turn: Option<Turn>,
    /// Gateway requested from the arbiter and not yet released
    requested_gateway: Option<Sector>,
    /// Gateway the arbiter last granted to this vehicle
    granted_gateway: Option<Sector>,
}

impl<D: DrivePrimitive> Navigator<D> {
    /// Create a navigator parked at the default handover.
    pub fn new(config: NavigatorConfig, drive: D) -> Self {
        let mut nav = Self {
            config,
            drive,
            link: None,
            state: State::EndPoint,
            phase: Phase::initial(State::EndPoint),
            pending: None,
            snapshot: None,
            actual: ActualPosition::default(),
            target: None,
            transit_once: true,
            last_gateway_turn: None,
            requested_gateway: None,
            granted_gateway: None,
        };
        nav.entry_action(State::EndPoint);
        nav
    }

    /// Attach the channel to a gateway arbiter.
    pub fn with_link(mut self, link: GatewayLink) -> Self {
        if link.vehicle() != self.config.vehicle_id {
            tracing::warn!(
                "Navigator[{}]: gateway link registered as {}",
                self.config.vehicle_id,
                link.vehicle()
            );
        }
        self.link = Some(link);
        self
    }

    // ------------------------------------------------------------------
    // Scheduler entry points
    // ------------------------------------------------------------------

    /// Advance one tick without an external event.
    ///
    /// Returns the event processed during this tick.
    pub fn run_step(&mut self) -> Event {
        self.poll_link();

        if let Some(event) = self.pending.take() {
            tracing::debug!(
                "Navigator[{}]: pending {} preempts {}",
                self.config.vehicle_id,
                event,
                self.phase
            );
            self.process(event);
            return event;
        }

        let event = self.do_action();
        if event != Event::NoEvent {
            self.process(event);
        }
        event
    }

    /// Advance one tick by processing an externally observed event.
    ///
    /// The do-action does not run during this tick.
    pub fn dispatch_event(&mut self, event: Event) {
        self.poll_link();
        self.process(event);
    }

    /// Queue an event for the next [`Navigator::run_step`].
    ///
    /// An error or reset replaces any other queued event; otherwise the
    /// first queued event wins.
    pub fn inject_event(&mut self, event: Event) {
        match self.pending {
            Some(queued) if !event.is_preemptive() => {
                tracing::debug!(
                    "Navigator[{}]: {} dropped, {} already pending",
                    self.config.vehicle_id,
                    event,
                    queued
                );
            }
            _ => self.pending = Some(event),
        }
    }

    // ------------------------------------------------------------------
    // Position and token
    // ------------------------------------------------------------------

    /// Set where the next journey goes. Rejected targets leave the old one in place.
    pub fn set_target_position(&mut self, sector: Sector, line: u32) -> Result<()> {
        match TargetPosition::new(sector, line) {
            Ok(target) => {
                tracing::info!(
                    "Navigator[{}]: target {} line {}",
                    self.config.vehicle_id,
                    sector,
                    line
                );
                self.target = Some(target);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Navigator[{}]: target rejected: {}", self.config.vehicle_id, e);
                Err(e)
            }
        }
    }

    /// Force the actual position, e.g. at start-up or after a reset.
    pub fn set_actual_position(&mut self, sector: Sector, line: u32) -> Result<()> {
        if let Err(e) = validate_actual(sector, line) {
            tracing::warn!("Navigator[{}]: position rejected: {}", self.config.vehicle_id, e);
            return Err(e);
        }
        tracing::info!(
            "Navigator[{}]: actual position set to {} line {}",
            self.config.vehicle_id,
            sector,
            line
        );
        self.actual.start_sector = sector;
        self.actual.last_sector = sector;
        self.actual.sector = sector;
        self.actual.line = line;
        Ok(())
    }

    /// Apply a target received as a payload.
    pub fn apply_target_payload(&mut self, payload: &PositionPayload) -> Result<()> {
        let update = self.decode_payload(payload)?;
        self.set_target_position(update.sector, update.line)
    }

    /// Apply an actual position received as a payload.
    pub fn apply_actual_payload(&mut self, payload: &PositionPayload) -> Result<()> {
        let update = self.decode_payload(payload)?;
        self.set_actual_position(update.sector, update.line)
    }

    /// Grant access to the gateway the vehicle is waiting at.
    pub fn give_token(&mut self) {
        if !self.actual.token {
            tracing::info!("Navigator[{}]: gateway token granted", self.config.vehicle_id);
        }
        self.actual.token = true;
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    pub fn current_state(&self) -> State {
        self.state
    }

    pub fn current_sector(&self) -> Sector {
        self.actual.sector
    }

    pub fn current_line(&self) -> u32 {
        self.actual.line
    }

    pub fn current_phase(&self) -> Phase {
        self.phase
    }

    pub fn pending_event(&self) -> Option<Event> {
        self.pending
    }

    pub fn error_snapshot(&self) -> Option<ErrorSnapshot> {
        self.snapshot
    }

    pub fn actual(&self) -> &ActualPosition {
        &self.actual
    }

    pub fn target(&self) -> Option<&TargetPosition> {
        self.target.as_ref()
    }

    pub fn vehicle_id(&self) -> &str {
        &self.config.vehicle_id
    }

    pub fn drive(&self) -> &D {
        &self.drive
    }

    pub fn status(&self) -> NavStatus {
        NavStatus::new(
            &self.config.vehicle_id,
            self.state,
            self.phase,
            self.actual.sector,
            self.actual.line,
            self.actual.token,
            self.target.map(|t| (t.sector, t.line)),
        )
    }

    // ------------------------------------------------------------------
    // Transition function
    // ------------------------------------------------------------------

    /// Consume one event and perform the resulting transition, if any.
    pub fn process(&mut self, event: Event) {
        match self.next_transition(event) {
            Transition::Stay => {
                if event != Event::NoEvent {
                    tracing::trace!(
                        "Navigator[{}]: {} ignored in {}",
                        self.config.vehicle_id,
                        event,
                        self.state
                    );
                }
            }
            Transition::Enter(next) => self.transition(event, next),
            Transition::Fail => {
                self.snapshot = Some(ErrorSnapshot {
                    state: self.state,
                    phase: self.phase,
                });
                self.transition(event, State::Error);
            }
            Transition::Restore(snapshot) => {
                let from = self.state;
                self.exit_action(from);
                self.state = snapshot.state;
                self.phase = snapshot.phase;
                tracing::info!(
                    "Navigator[{}]: {} --{}--> {} at {}",
                    self.config.vehicle_id,
                    from,
                    event,
                    self.state,
                    self.phase
                );
            }
        }
    }

    fn next_transition(&self, event: Event) -> Transition {
        match (self.state, event) {
            (_, Event::NoEvent) => Transition::Stay,

            (State::Error, Event::Error) => Transition::Stay,
            (_, Event::Error) => Transition::Fail,

            (State::Error, Event::Resume) => match self.snapshot {
                Some(snapshot) => Transition::Restore(snapshot),
                None => Transition::Stay,
            },

            (_, Event::Reset) => Transition::Enter(State::Reset),

            (State::EndPoint, Event::MoveToTargetPosition) => {
                if self.journey_is_valid() {
                    Transition::Enter(State::ToGateway)
                } else {
                    Transition::Fail
                }
            }
            (State::ToGateway, Event::PosReached) => Transition::Enter(State::Gateway),
            (State::Gateway, Event::PosEndPointReached) => Transition::Enter(State::ToEndPoint),
            (State::Gateway, Event::PosTransitReached) => {
                if self.transit_once {
                    Transition::Enter(State::CrossTransit)
                } else {
                    tracing::warn!(
                        "Navigator[{}]: transit already crossed, heading for end point",
                        self.config.vehicle_id
                    );
                    Transition::Enter(State::ToEndPoint)
                }
            }
            (State::CrossTransit, Event::PosReached) => Transition::Enter(State::ToGateway),
            (State::ToEndPoint, Event::PosEndPointReached) => Transition::Enter(State::EndPoint),
            (State::Reset, Event::PosReached) => Transition::Enter(State::EndPoint),

            _ => Transition::Stay,
        }
    }

    fn transition(&mut self, event: Event, next: State) {
        let from = self.state;
        self.exit_action(from);
        self.state = next;
        self.phase = Phase::initial(next);
        tracing::info!(
            "Navigator[{}]: {} --{}--> {}",
            self.config.vehicle_id,
            from,
            event,
            next
        );
        self.entry_action(next);
    }

    fn journey_is_valid(&self) -> bool {
        match self.target {
            None => {
                tracing::warn!("Navigator[{}]: move without target", self.config.vehicle_id);
                false
            }
            Some(_) if !self.actual.sector.is_end_point() => {
                tracing::warn!(
                    "Navigator[{}]: move requested from {}, which is not a handover",
                    self.config.vehicle_id,
                    self.actual.sector
                );
                false
            }
            Some(_) => true,
        }
    }

    // ------------------------------------------------------------------
    // Entry and exit actions
    // ------------------------------------------------------------------

    fn entry_action(&mut self, state: State) {
        match state {
            State::EndPoint => {
                self.actual.start_sector = self.actual.sector;
                if !self.actual.sector.is_end_point() {
                    tracing::warn!(
                        "Navigator[{}]: resting at {}, confirm position before the next move",
                        self.config.vehicle_id,
                        self.actual.sector
                    );
                } else {
                    tracing::info!(
                        "Navigator[{}]: at {} line {}",
                        self.config.vehicle_id,
                        self.actual.sector,
                        self.actual.line
                    );
                }
            }
            State::Gateway => self.request_gateway(),
            State::CrossTransit => self.transit_once = false,
            State::Reset => {
                self.snapshot = None;
                self.last_gateway_turn = None;
                self.release_gateway();
            }
            State::Error => {
                if let Some(snapshot) = self.snapshot {
                    tracing::warn!(
                        "Navigator[{}]: halted in {} at {}",
                        self.config.vehicle_id,
                        snapshot.state,
                        snapshot.phase
                    );
                }
            }
            State::ToGateway | State::ToEndPoint => {}
        }
    }

    fn exit_action(&mut self, state: State) {
        match state {
            State::EndPoint => {
                self.actual.start_sector = self.actual.sector;
                self.transit_once = true;
                self.last_gateway_turn = None;
            }
            State::Error => {
                tracing::debug!("Navigator[{}]: leaving error", self.config.vehicle_id);
            }
            State::ToGateway
            | State::Gateway
            | State::CrossTransit
            | State::ToEndPoint
            | State::Reset => {}
        }
    }

    // ------------------------------------------------------------------
    // Gateway link
    // ------------------------------------------------------------------

    fn poll_link(&mut self) {
        let Some(link) = &self.link else {
            return;
        };
        let mut replies = Vec::new();
        while let Some(reply) = link.try_recv() {
            replies.push(reply);
        }

        for reply in replies {
            match reply {
                ArbiterReply::Granted { gateway } if self.requested_gateway == Some(gateway) => {
                    self.granted_gateway = Some(gateway);
                    self.give_token();
                }
                ArbiterReply::Revoked { gateway } if self.granted_gateway == Some(gateway) => {
                    tracing::debug!(
                        "Navigator[{}]: token for {} revoked",
                        self.config.vehicle_id,
                        gateway
                    );
                    self.granted_gateway = None;
                    self.actual.token = false;
                }
                ArbiterReply::Revoked { gateway } => {
                    tracing::trace!(
                        "Navigator[{}]: stale revoke for {}",
                        self.config.vehicle_id,
                        gateway
                    );
                }
                ArbiterReply::Granted { gateway } => {
                    tracing::warn!(
                        "Navigator[{}]: unexpected grant for {}",
                        self.config.vehicle_id,
                        gateway
                    );
                }
            }
        }
    }

    fn request_gateway(&mut self) {
        let Some(side) = self.actual.sector.side() else {
            tracing::warn!(
                "Navigator[{}]: no gateway next to {}",
                self.config.vehicle_id,
                self.actual.sector
            );
            self.pending = Some(Event::Error);
            return;
        };
        let gateway = side.gateway();
        if let Some(link) = &self.link {
            tracing::debug!("Navigator[{}]: requesting {}", self.config.vehicle_id, gateway);
            link.acquire(gateway);
        }
        self.requested_gateway = Some(gateway);
    }

    pub(super) fn release_gateway(&mut self) {
        if let Some(gateway) = self.requested_gateway.take() {
            if let Some(link) = &self.link {
                tracing::debug!("Navigator[{}]: releasing {}", self.config.vehicle_id, gateway);
                link.release(gateway);
                // The grant ends with the release, not with the arbiter's reply
                self.granted_gateway = None;
                self.actual.token = false;
            }
        }
    }

    /// Whether the gateway being waited for may be entered.
    ///
    /// With an arbiter link the token only counts for the gateway it was
    /// granted for. Without one, [`Navigator::give_token`] opens any gateway.
    pub(super) fn may_enter_gateway(&self) -> bool {
        if self.link.is_none() {
            return self.actual.token;
        }
        self.actual.token
            && self.granted_gateway.is_some()
            && self.granted_gateway == self.requested_gateway
    }

    fn decode_payload(&self, payload: &PositionPayload) -> Result<PositionUpdate> {
        PositionUpdate::try_from(payload).inspect_err(|e| {
            tracing::warn!("Navigator[{}]: payload rejected: {}", self.config.vehicle_id, e);
        })
    }
}
