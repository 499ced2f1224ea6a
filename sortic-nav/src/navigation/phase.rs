//! Sub-phases of the state do-actions.
//!
//! Every phase still reports the numeric code of the legacy sequencer
//! (multiples of ten), which is what telemetry and the error snapshot show.
//! New steps are inserted by adding variants, not by renumbering.

use std::fmt;

use super::state::State;

/// Sub-phases of [`State::ToGateway`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToGatewayPhase {
    /// 0: back out of the handover slot
    Reverse,
    /// 10: face the gateway
    TurnAround,
    /// 20: move up to the gateway waiting zone
    Advance,
}

/// Sub-phases of [`State::Gateway`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayPhase {
    /// 0: hold until the gateway token is granted
    AwaitToken,
    /// 10: drive into the gateway cell
    Enter,
    /// 20: turn toward the target line
    TurnToLine,
    /// 30: one slot per tick until the target line is reached
    AdvanceToLine,
    /// 40: turn back to the exit heading
    TurnToExit,
    /// 50: two slots out of the gateway
    Exit { slots: u8 },
}

/// Position inside a state's do-action sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// End point and error: nothing to sequence
    Idle,
    ToGateway(ToGatewayPhase),
    Gateway(GatewayPhase),
    /// Three slots along the transit lane
    CrossTransit { slots: u8 },
    /// Single slot into the handover
    ToEndPoint,
    /// Index into the configured recovery maneuver
    Recover { step: usize },
}

/// Slots covered by [`GatewayPhase::Exit`].
pub const GATEWAY_EXIT_SLOTS: u8 = 2;

/// Slots covered by [`Phase::CrossTransit`].
pub const TRANSIT_SLOTS: u8 = 3;

impl Phase {
    /// Phase a state starts in on entry.
    pub fn initial(state: State) -> Phase {
        match state {
            State::EndPoint | State::Error => Phase::Idle,
            State::ToGateway => Phase::ToGateway(ToGatewayPhase::Reverse),
            State::Gateway => Phase::Gateway(GatewayPhase::AwaitToken),
            State::CrossTransit => Phase::CrossTransit { slots: 0 },
            State::ToEndPoint => Phase::ToEndPoint,
            State::Reset => Phase::Recover { step: 0 },
        }
    }

    /// Legacy sub-state number.
    pub fn code(self) -> u32 {
        match self {
            Phase::Idle | Phase::ToEndPoint => 0,
            Phase::ToGateway(p) => match p {
                ToGatewayPhase::Reverse => 0,
                ToGatewayPhase::TurnAround => 10,
                ToGatewayPhase::Advance => 20,
            },
            Phase::Gateway(p) => match p {
                GatewayPhase::AwaitToken => 0,
                GatewayPhase::Enter => 10,
                GatewayPhase::TurnToLine => 20,
                GatewayPhase::AdvanceToLine => 30,
                GatewayPhase::TurnToExit => 40,
                GatewayPhase::Exit { .. } => 50,
            },
            Phase::CrossTransit { slots } => u32::from(slots) * 10,
            Phase::Recover { step } => (step as u32).saturating_mul(10),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::ToGateway(ToGatewayPhase::Reverse) => "reverse",
            Phase::ToGateway(ToGatewayPhase::TurnAround) => "turn_around",
            Phase::ToGateway(ToGatewayPhase::Advance) => "advance",
            Phase::Gateway(GatewayPhase::AwaitToken) => "await_token",
            Phase::Gateway(GatewayPhase::Enter) => "enter",
            Phase::Gateway(GatewayPhase::TurnToLine) => "turn_to_line",
            Phase::Gateway(GatewayPhase::AdvanceToLine) => "advance_to_line",
            Phase::Gateway(GatewayPhase::TurnToExit) => "turn_to_exit",
            Phase::Gateway(GatewayPhase::Exit { .. }) => "exit",
            Phase::CrossTransit { .. } => "cross",
            Phase::ToEndPoint => "approach",
            Phase::Recover { .. } => "recover",
        };
        write!(f, "{}({})", name, self.code())
    }
}
