//! End-to-end journeys of the navigator against the mock drive.

use sortic_nav::arbiter::GatewayArbiter;
use sortic_nav::drive::{DriveStep, MockDrive};
use sortic_nav::navigation::GatewayPhase;
use sortic_nav::payload::PositionPayload;
use sortic_nav::{Event, Navigator, NavigatorConfig, Phase, Sector, State};

fn vehicle(id: &str) -> (Navigator<MockDrive>, MockDrive) {
    let drive = MockDrive::new();
    let config = NavigatorConfig {
        vehicle_id: id.to_string(),
        ..Default::default()
    };
    (Navigator::new(config, drive.clone()), drive)
}

/// Tick until the navigator rests at an end point. Returns the tick count.
fn run_to_end_point(nav: &mut Navigator<MockDrive>, limit: usize) -> usize {
    for tick in 1..=limit {
        nav.run_step();
        if nav.current_state() == State::EndPoint {
            return tick;
        }
    }
    panic!(
        "no end point within {} ticks: {} at {}",
        limit,
        nav.current_state(),
        nav.current_phase()
    );
}

#[test]
fn test_sortic_to_transfer_journey() {
    let (mut nav, drive) = vehicle("agv-1");
    nav.set_actual_position(Sector::SorticHandover, 1).unwrap();
    nav.set_target_position(Sector::TransferHandover, 3).unwrap();
    nav.give_token();

    nav.dispatch_event(Event::MoveToTargetPosition);
    assert_eq!(nav.current_state(), State::ToGateway);

    let mut states = vec![nav.current_state()];
    let mut sectors = vec![nav.current_sector()];
    let mut ticks = 0;
    while nav.current_state() != State::EndPoint {
        nav.run_step();
        ticks += 1;
        assert!(ticks <= 50, "journey did not finish");
        if states.last() != Some(&nav.current_state()) {
            states.push(nav.current_state());
        }
        if sectors.last() != Some(&nav.current_sector()) {
            sectors.push(nav.current_sector());
        }
    }

    assert_eq!(ticks, 20);
    assert_eq!(
        states,
        vec![
            State::ToGateway,
            State::Gateway,
            State::CrossTransit,
            State::ToGateway,
            State::Gateway,
            State::ToEndPoint,
            State::EndPoint,
        ]
    );
    assert_eq!(
        sectors,
        vec![
            Sector::SorticHandover,
            Sector::SorticToHandover,
            Sector::SorticWaitForGateway,
            Sector::SorticGateway,
            Sector::TransitWaitForGatewaySortic,
            Sector::TransitToTransfer,
            Sector::TransitWaitForGatewayTransfer,
            Sector::TransferGateway,
            Sector::TransferWaitForGateway,
            Sector::TransferToHandover,
            Sector::TransferHandover,
        ]
    );
    assert_eq!(nav.current_line(), 3);
    assert_eq!(nav.actual().start_sector, Sector::TransferHandover);

    let history = drive.history();
    assert_eq!(history.len(), 18);
    assert_eq!(&history[..3], &[DriveStep::Reverse, DriveStep::TurnAround, DriveStep::Advance]);
    assert_eq!(
        history.iter().filter(|s| **s == DriveStep::TurnLeft).count(),
        1
    );
    assert_eq!(
        history.iter().filter(|s| **s == DriveStep::TurnRight).count(),
        1
    );
}

#[test]
fn test_return_journey_turns_toward_lower_lines() {
    let (mut nav, drive) = vehicle("agv-1");
    nav.set_actual_position(Sector::TransferHandover, 3).unwrap();
    nav.set_target_position(Sector::SorticHandover, 1).unwrap();
    nav.give_token();
    nav.dispatch_event(Event::MoveToTargetPosition);

    run_to_end_point(&mut nav, 50);

    assert_eq!(nav.current_sector(), Sector::SorticHandover);
    assert_eq!(nav.current_line(), 1);
    // The line changes in the first gateway, entered from the handover side
    let turns: Vec<DriveStep> = drive
        .history()
        .into_iter()
        .filter(|s| matches!(s, DriveStep::TurnLeft | DriveStep::TurnRight))
        .collect();
    assert_eq!(turns, vec![DriveStep::TurnRight, DriveStep::TurnLeft]);
}

#[test]
fn test_fault_in_gateway_resumes_where_it_stopped() {
    let (mut nav, drive) = vehicle("agv-1");
    nav.set_actual_position(Sector::SorticHandover, 1).unwrap();
    nav.set_target_position(Sector::TransferHandover, 3).unwrap();
    nav.give_token();
    nav.dispatch_event(Event::MoveToTargetPosition);

    for _ in 0..6 {
        nav.run_step();
    }
    assert_eq!(nav.current_state(), State::Gateway);
    assert_eq!(nav.current_phase().code(), 30);
    assert_eq!(nav.current_line(), 1);

    drive.fail_next();
    assert_eq!(nav.run_step(), Event::Error);
    assert_eq!(nav.current_state(), State::Error);
    let snapshot = nav.error_snapshot().unwrap();
    assert_eq!(snapshot.state, State::Gateway);
    assert_eq!(snapshot.phase.code(), 30);
    assert_eq!(nav.current_line(), 1);

    // Nothing moves while in error
    let issued = drive.issued();
    for _ in 0..5 {
        assert_eq!(nav.run_step(), Event::NoEvent);
    }
    assert_eq!(drive.issued(), issued);

    nav.dispatch_event(Event::Resume);
    assert_eq!(nav.current_state(), State::Gateway);
    assert_eq!(nav.current_phase(), Phase::Gateway(GatewayPhase::AdvanceToLine));

    nav.run_step();
    assert_eq!(nav.current_line(), 2);

    run_to_end_point(&mut nav, 50);
    assert_eq!(nav.current_sector(), Sector::TransferHandover);
    assert_eq!(nav.current_line(), 3);
}

#[test]
fn test_injected_error_after_turn_resumes_with_line_steps() {
    let (mut nav, drive) = vehicle("agv-1");
    nav.set_target_position(Sector::SorticHandover, 2).unwrap();
    nav.give_token();
    nav.dispatch_event(Event::MoveToTargetPosition);

    // to-gateway, token, enter, turn toward the line
    for _ in 0..6 {
        nav.run_step();
    }
    assert_eq!(drive.history().last(), Some(&DriveStep::TurnLeft));

    nav.inject_event(Event::Error);
    nav.run_step();
    assert_eq!(nav.current_state(), State::Error);

    nav.dispatch_event(Event::Resume);
    drive.clear_history();
    nav.run_step();

    assert_eq!(drive.history(), vec![DriveStep::Advance]);
    assert_eq!(nav.current_line(), 2);
    assert_eq!(nav.current_phase(), Phase::Gateway(GatewayPhase::TurnToExit));
}

#[test]
fn test_malformed_payload_leaves_positions_unchanged() {
    let (mut nav, _) = vehicle("agv-1");
    nav.set_actual_position(Sector::SorticHandover, 2).unwrap();

    let garbage = PositionPayload::parse("{\"sensor\": ");
    assert!(garbage.is_failed());
    assert!(nav.apply_actual_payload(&garbage).is_err());
    assert!(nav.apply_target_payload(&garbage).is_err());

    assert_eq!(nav.current_sector(), Sector::SorticHandover);
    assert_eq!(nav.current_line(), 2);
    assert!(nav.target().is_none());

    let unknown = PositionPayload::parse(r#"{"sensor":"Atlantis","time":0,"data":[1.0,0.0]}"#);
    assert!(nav.apply_target_payload(&unknown).is_err());
    assert!(nav.target().is_none());

    let target = PositionPayload::position(Sector::TransferHandover, 4, 1351824120);
    nav.apply_target_payload(&target).unwrap();
    let target = nav.target().unwrap();
    assert_eq!((target.sector, target.line), (Sector::TransferHandover, 4));

    // A move from outside a handover is refused
    let transit = PositionPayload::position(Sector::TransitToSortic, 1, 0);
    nav.apply_actual_payload(&transit).unwrap();
    nav.dispatch_event(Event::MoveToTargetPosition);
    assert_eq!(nav.current_state(), State::Error);
}

#[test]
fn test_arbiter_keeps_one_vehicle_per_gateway() {
    let mut arbiter = GatewayArbiter::new();
    let (a, _) = vehicle("agv-a");
    let (b, _) = vehicle("agv-b");
    let mut a = a.with_link(arbiter.connect("agv-a"));
    let mut b = b.with_link(arbiter.connect("agv-b"));

    a.set_actual_position(Sector::SorticHandover, 1).unwrap();
    a.set_target_position(Sector::TransferHandover, 1).unwrap();
    b.set_actual_position(Sector::SorticHandover, 2).unwrap();
    b.set_target_position(Sector::SorticHandover, 4).unwrap();
    a.dispatch_event(Event::MoveToTargetPosition);
    b.dispatch_event(Event::MoveToTargetPosition);

    let mut first_in_gateway = Vec::new();
    for _ in 0..200 {
        arbiter.process_pending();
        a.run_step();
        b.run_step();

        let a_in = a.current_sector() == Sector::SorticGateway;
        let b_in = b.current_sector() == Sector::SorticGateway;
        assert!(!(a_in && b_in), "both vehicles inside the sortic gateway");
        if a_in && !first_in_gateway.contains(&"agv-a") {
            first_in_gateway.push("agv-a");
        }
        if b_in && !first_in_gateway.contains(&"agv-b") {
            first_in_gateway.push("agv-b");
        }

        if a.current_state() == State::EndPoint && b.current_state() == State::EndPoint {
            break;
        }
    }
    arbiter.process_pending();

    assert_eq!(first_in_gateway, vec!["agv-a", "agv-b"]);
    assert_eq!((a.current_sector(), a.current_line()), (Sector::TransferHandover, 1));
    assert_eq!((b.current_sector(), b.current_line()), (Sector::SorticHandover, 4));
    assert_eq!(arbiter.holder(Sector::SorticGateway), None);
    assert_eq!(arbiter.holder(Sector::TransferGateway), None);
}

#[test]
fn test_grant_for_first_gateway_does_not_open_second() {
    let mut arbiter = GatewayArbiter::new();
    let holder = arbiter.connect("agv-b");
    holder.acquire(Sector::TransferGateway);

    let (a, _) = vehicle("agv-a");
    let mut a = a.with_link(arbiter.connect("agv-a"));
    a.set_target_position(Sector::TransferHandover, 1).unwrap();
    a.dispatch_event(Event::MoveToTargetPosition);
    for _ in 0..3 {
        a.run_step();
    }
    arbiter.process_pending();
    assert_eq!(arbiter.holder(Sector::SorticGateway), Some("agv-a"));
    assert_eq!(arbiter.holder(Sector::TransferGateway), Some("agv-b"));

    // The arbiter stalls while agv-a crosses the transit
    for _ in 0..30 {
        a.run_step();
        assert_ne!(
            a.current_sector(),
            Sector::TransferGateway,
            "agv-a entered the transfer gateway held by agv-b"
        );
    }
    assert_eq!(a.current_state(), State::Gateway);
    assert_eq!(a.current_sector(), Sector::TransitWaitForGatewayTransfer);
    assert_eq!(a.current_phase(), Phase::Gateway(GatewayPhase::AwaitToken));
    assert!(!a.actual().token);

    arbiter.process_pending();
    assert_eq!(arbiter.holder(Sector::SorticGateway), None);
    assert_eq!(arbiter.waiting(Sector::TransferGateway), vec!["agv-a"]);
    a.run_step();
    assert_eq!(a.current_phase(), Phase::Gateway(GatewayPhase::AwaitToken));

    holder.release(Sector::TransferGateway);
    arbiter.process_pending();
    assert_eq!(arbiter.holder(Sector::TransferGateway), Some("agv-a"));

    run_to_end_point(&mut a, 20);
    assert_eq!((a.current_sector(), a.current_line()), (Sector::TransferHandover, 1));
}

#[test]
fn test_waiting_vehicle_holds_without_token() {
    let mut arbiter = GatewayArbiter::new();
    let (a, _) = vehicle("agv-a");
    let (b, b_drive) = vehicle("agv-b");
    let mut a = a.with_link(arbiter.connect("agv-a"));
    let mut b = b.with_link(arbiter.connect("agv-b"));

    for nav in [&mut a, &mut b] {
        nav.set_target_position(Sector::SorticHandover, 3).unwrap();
        nav.dispatch_event(Event::MoveToTargetPosition);
        for _ in 0..3 {
            nav.run_step();
        }
        assert_eq!(nav.current_state(), State::Gateway);
    }
    arbiter.process_pending();
    assert_eq!(arbiter.holder(Sector::SorticGateway), Some("agv-a"));
    assert_eq!(arbiter.waiting(Sector::SorticGateway), vec!["agv-b"]);

    let issued = b_drive.issued();
    for _ in 0..10 {
        b.run_step();
    }
    assert!(!b.actual().token);
    assert_eq!(b.current_phase(), Phase::Gateway(GatewayPhase::AwaitToken));
    assert_eq!(b_drive.issued(), issued);
}

#[test]
fn test_reset_releases_gateway_and_recovers() {
    let mut arbiter = GatewayArbiter::new();
    let (nav, drive) = vehicle("agv-1");
    let mut nav = nav.with_link(arbiter.connect("agv-1"));
    nav.set_target_position(Sector::TransferHandover, 2).unwrap();
    nav.dispatch_event(Event::MoveToTargetPosition);

    for _ in 0..6 {
        arbiter.process_pending();
        nav.run_step();
    }
    assert_eq!(nav.current_sector(), Sector::SorticGateway);
    assert_eq!(arbiter.holder(Sector::SorticGateway), Some("agv-1"));

    drive.clear_history();
    nav.inject_event(Event::Reset);
    assert_eq!(nav.run_step(), Event::Reset);
    assert_eq!(nav.current_state(), State::Reset);
    assert!(drive.history().is_empty());

    arbiter.process_pending();
    assert_eq!(arbiter.holder(Sector::SorticGateway), None);

    assert_eq!(nav.run_step(), Event::PosReached);
    assert_eq!(nav.current_state(), State::EndPoint);
    assert_eq!(drive.history(), vec![DriveStep::Reverse]);
    assert!(!nav.actual().token);

    // Back on a handover, a new journey can start
    nav.set_actual_position(Sector::SorticHandover, 1).unwrap();
    nav.dispatch_event(Event::MoveToTargetPosition);
    assert_eq!(nav.current_state(), State::ToGateway);
}
