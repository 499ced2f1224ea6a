//! Do-actions: one drive step per tick for the active state.
//!
//! Each sequencer returns `NoEvent` while phases remain and a signal event
//! on its last phase. A drive fault leaves the phase untouched and turns into
//! [`Event::Error`], so a later resume repeats the failed step.

use crate::drive::{DriveFault, DrivePrimitive, Turn};

use super::navigator::Navigator;
use super::phase::{GatewayPhase, Phase, ToGatewayPhase, GATEWAY_EXIT_SLOTS, TRANSIT_SLOTS};
use super::state::{Event, State};

/// Turn toward higher or lower lines after entering a gateway.
///
/// Lines count up to the left when the gateway is entered from the
/// handover side and to the right when entered from the transit.
fn line_turn(entered_from_transit: bool, line: u32, target_line: u32) -> Turn {
    let toward_higher = target_line > line;
    if toward_higher != entered_from_transit {
        Turn::Left
    } else {
        Turn::Right
    }
}

impl<D: DrivePrimitive> Navigator<D> {
    pub(super) fn do_action(&mut self) -> Event {
        let result = match self.current_state() {
            State::EndPoint | State::Error => Ok(Event::NoEvent),
            State::ToGateway => self.do_to_gateway(),
            State::Gateway => self.do_gateway(),
            State::CrossTransit => self.do_cross_transit(),
            State::ToEndPoint => self.do_to_end_point(),
            State::Reset => self.do_reset(),
        };

        result.unwrap_or_else(|fault| {
            tracing::warn!(
                "Navigator[{}]: {} failed in {} at {}: {}",
                self.config.vehicle_id,
                self.last_step_name(),
                self.current_state(),
                self.phase,
                fault
            );
            Event::Error
        })
    }

    fn do_to_gateway(&mut self) -> Result<Event, DriveFault> {
        let Phase::ToGateway(phase) = self.phase else {
            return Ok(self.phase_mismatch());
        };
        let Some(side) = self.actual.sector.side() else {
            return Ok(self.off_track());
        };
        let from_transit = self.actual.sector.is_transit();

        match phase {
            ToGatewayPhase::Reverse if from_transit => {
                // Already facing the gateway
                self.phase = Phase::ToGateway(ToGatewayPhase::Advance);
                self.do_to_gateway()
            }
            ToGatewayPhase::Reverse => {
                self.drive.reverse()?;
                self.actual.occupy(side.to_handover());
                self.phase = Phase::ToGateway(ToGatewayPhase::TurnAround);
                Ok(Event::NoEvent)
            }
            ToGatewayPhase::TurnAround => {
                self.drive.turn(Turn::Around)?;
                self.phase = Phase::ToGateway(ToGatewayPhase::Advance);
                Ok(Event::NoEvent)
            }
            ToGatewayPhase::Advance => {
                self.drive.advance()?;
                let wait_zone = if from_transit {
                    side.transit_wait()
                } else {
                    side.wait_for_gateway()
                };
                self.actual.occupy(wait_zone);
                Ok(Event::PosReached)
            }
        }
    }

    fn do_gateway(&mut self) -> Result<Event, DriveFault> {
        let Phase::Gateway(phase) = self.phase else {
            return Ok(self.phase_mismatch());
        };
        let Some(side) = self.actual.sector.side() else {
            return Ok(self.off_track());
        };
        let Some(target) = self.target else {
            tracing::warn!("Navigator[{}]: gateway without target", self.config.vehicle_id);
            return Ok(Event::Error);
        };

        match phase {
            GatewayPhase::AwaitToken => {
                if !self.may_enter_gateway() {
                    tracing::trace!("Navigator[{}]: waiting for token", self.config.vehicle_id);
                    return Ok(Event::NoEvent);
                }
                self.phase = Phase::Gateway(GatewayPhase::Enter);
                Ok(Event::NoEvent)
            }
            GatewayPhase::Enter => {
                self.drive.advance()?;
                self.actual.occupy(side.gateway());
                self.phase = Phase::Gateway(GatewayPhase::TurnToLine);
                Ok(Event::NoEvent)
            }
            GatewayPhase::TurnToLine => {
                if self.actual.line == target.line {
                    self.phase = Phase::Gateway(GatewayPhase::Exit { slots: 0 });
                    return self.do_gateway();
                }
                let entered_from_transit = self.actual.last_sector.is_transit();
                let turn = line_turn(entered_from_transit, self.actual.line, target.line);
                self.drive.turn(turn)?;
                self.last_gateway_turn = Some(turn);
                self.phase = Phase::Gateway(GatewayPhase::AdvanceToLine);
                Ok(Event::NoEvent)
            }
            GatewayPhase::AdvanceToLine => {
                if self.actual.line == target.line {
                    self.phase = Phase::Gateway(GatewayPhase::TurnToExit);
                    return self.do_gateway();
                }
                self.drive.advance()?;
                if target.line > self.actual.line {
                    self.actual.line += 1;
                } else {
                    self.actual.line -= 1;
                }
                tracing::debug!(
                    "Navigator[{}]: line {} of {}",
                    self.config.vehicle_id,
                    self.actual.line,
                    target.line
                );
                if self.actual.line == target.line {
                    self.phase = Phase::Gateway(GatewayPhase::TurnToExit);
                }
                Ok(Event::NoEvent)
            }
            GatewayPhase::TurnToExit => {
                let turn = self
                    .last_gateway_turn
                    .map(Turn::mirror)
                    .unwrap_or(Turn::Around);
                self.drive.turn(turn)?;
                self.phase = Phase::Gateway(GatewayPhase::Exit { slots: 0 });
                Ok(Event::NoEvent)
            }
            GatewayPhase::Exit { slots } => {
                self.drive.advance()?;
                let to_end_point = self.gateway_leads_to_end_point();
                let zone = match (to_end_point, slots) {
                    (true, 0) => side.wait_for_gateway(),
                    (true, _) => side.to_handover(),
                    (false, 0) => side.transit_wait(),
                    (false, _) => side.opposite().transit_toward(),
                };
                self.actual.occupy(zone);

                let slots = slots + 1;
                if slots < GATEWAY_EXIT_SLOTS {
                    self.phase = Phase::Gateway(GatewayPhase::Exit { slots });
                    return Ok(Event::NoEvent);
                }

                self.last_gateway_turn = None;
                self.release_gateway();
                if to_end_point {
                    Ok(Event::PosEndPointReached)
                } else {
                    Ok(Event::PosTransitReached)
                }
            }
        }
    }

    /// Journeys that stay on one side, or have used their transit crossing,
    /// leave the gateway toward the handover.
    fn gateway_leads_to_end_point(&self) -> bool {
        let same_side = self
            .target
            .is_some_and(|t| t.sector == self.actual.start_sector);
        same_side || !self.transit_once
    }

    fn do_cross_transit(&mut self) -> Result<Event, DriveFault> {
        let Phase::CrossTransit { slots } = self.phase else {
            return Ok(self.phase_mismatch());
        };

        self.drive.advance()?;
        let slots = slots + 1;
        if slots < TRANSIT_SLOTS {
            self.phase = Phase::CrossTransit { slots };
            Ok(Event::NoEvent)
        } else {
            Ok(Event::PosReached)
        }
    }

    fn do_to_end_point(&mut self) -> Result<Event, DriveFault> {
        let Some(side) = self.actual.sector.side() else {
            return Ok(self.off_track());
        };

        self.drive.advance()?;
        self.actual.occupy(side.handover());
        if let Some(target) = self.target {
            if target.sector != self.actual.sector || target.line != self.actual.line {
                tracing::warn!(
                    "Navigator[{}]: arrived at {} line {}, target was {} line {}",
                    self.config.vehicle_id,
                    self.actual.sector,
                    self.actual.line,
                    target.sector,
                    target.line
                );
            }
        }
        Ok(Event::PosEndPointReached)
    }

    fn do_reset(&mut self) -> Result<Event, DriveFault> {
        let Phase::Recover { step } = self.phase else {
            return Ok(self.phase_mismatch());
        };

        let Some(&motion) = self.config.recovery_maneuver.get(step) else {
            return Ok(Event::PosReached);
        };
        motion.execute(&mut self.drive)?;
        tracing::debug!("Navigator[{}]: recovery {} done", self.config.vehicle_id, motion);

        let step = step + 1;
        if step < self.config.recovery_maneuver.len() {
            self.phase = Phase::Recover { step };
            Ok(Event::NoEvent)
        } else {
            Ok(Event::PosReached)
        }
    }

    fn phase_mismatch(&self) -> Event {
        tracing::error!(
            "Navigator[{}]: phase {} does not belong to {}",
            self.config.vehicle_id,
            self.phase,
            self.current_state()
        );
        Event::Error
    }

    fn off_track(&self) -> Event {
        tracing::warn!(
            "Navigator[{}]: {} is not on a gateway route",
            self.config.vehicle_id,
            self.actual.sector
        );
        Event::Error
    }

    fn last_step_name(&self) -> &'static str {
        match self.phase {
            Phase::ToGateway(ToGatewayPhase::Reverse) => "reverse",
            Phase::ToGateway(ToGatewayPhase::TurnAround)
            | Phase::Gateway(GatewayPhase::TurnToLine)
            | Phase::Gateway(GatewayPhase::TurnToExit) => "turn",
            Phase::Recover { .. } => "recovery step",
            _ => "advance",
        }
    }
}
