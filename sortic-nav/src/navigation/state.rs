//! Top-level states and the event alphabet of the navigator.

use std::fmt;

/// Top-level operating mode. Exactly one is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    /// Parked at a handover, waiting for a move command
    EndPoint,
    /// Leaving the handover (or transit) toward a gateway
    ToGateway,
    /// Waiting for and crossing a gateway
    Gateway,
    /// Driving the transit lane between the gateways
    CrossTransit,
    /// Final approach into the target handover
    ToEndPoint,
    /// Recovery maneuver after an abandoned journey
    Reset,
    /// Frozen after a fault until resume or reset
    Error,
}

impl State {
    pub const ALL: [State; 7] = [
        State::EndPoint,
        State::ToGateway,
        State::Gateway,
        State::CrossTransit,
        State::ToEndPoint,
        State::Reset,
        State::Error,
    ];

    pub fn label(self) -> &'static str {
        match self {
            State::EndPoint => "end_point",
            State::ToGateway => "to_gateway",
            State::Gateway => "gateway",
            State::CrossTransit => "cross_transit",
            State::ToEndPoint => "to_end_point",
            State::Reset => "reset",
            State::Error => "error",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Input of the transition function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// External: start the journey to the target position
    MoveToTargetPosition,
    /// Signal: the gateway was crossed toward an end point, or the end point was reached
    PosEndPointReached,
    /// Signal: the gateway was crossed toward the transit
    PosTransitReached,
    /// Signal: the current maneuver is complete
    PosReached,
    /// Fault, external or from a drive primitive
    Error,
    /// External: continue the interrupted maneuver
    Resume,
    /// External: abandon the journey and recover
    Reset,
    /// Nothing happened
    NoEvent,
}

impl Event {
    pub const ALL: [Event; 8] = [
        Event::MoveToTargetPosition,
        Event::PosEndPointReached,
        Event::PosTransitReached,
        Event::PosReached,
        Event::Error,
        Event::Resume,
        Event::Reset,
        Event::NoEvent,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Event::MoveToTargetPosition => "move_to_target_position",
            Event::PosEndPointReached => "pos_end_point_reached",
            Event::PosTransitReached => "pos_transit_reached",
            Event::PosReached => "pos_reached",
            Event::Error => "error",
            Event::Resume => "resume",
            Event::Reset => "reset",
            Event::NoEvent => "no_event",
        }
    }

    /// Error and reset cut into whatever the current state is doing.
    pub fn is_preemptive(self) -> bool {
        matches!(self, Event::Error | Event::Reset)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
