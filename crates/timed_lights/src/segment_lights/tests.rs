//! Unit tests for signal groups and segment light configuration.

use super::*;
use crate::services::ArrowDirection;

#[test]
fn test_toggled_settles_transitional_states() {
    assert_eq!(LightState::Red.toggled(), LightState::Green);
    assert_eq!(LightState::Green.toggled(), LightState::Red);
    assert_eq!(LightState::RedToGreen.toggled(), LightState::Red);
    assert_eq!(LightState::GreenToRed.toggled(), LightState::Green);
}

#[test]
fn test_mode_cycle_returns_to_simple() {
    let mut mode = LightMode::Simple;
    for _ in 0..4 {
        mode = mode.next();
    }
    assert_eq!(mode, LightMode::Simple);
}

#[test]
fn test_simple_mode_ties_turns_to_main() {
    let group = SignalGroup {
        mode: LightMode::Simple,
        main: LightState::Green,
        left: LightState::Red,
        right: LightState::Red,
    };
    assert_eq!(group.for_direction(ArrowDirection::Left, false), LightState::Green);
    assert_eq!(group.for_direction(ArrowDirection::Right, false), LightState::Green);
    assert_eq!(group.for_direction(ArrowDirection::Forward, false), LightState::Green);
}

#[test]
fn test_single_left_mode_separates_left_turns() {
    let group = SignalGroup {
        mode: LightMode::SingleLeft,
        main: LightState::Green,
        left: LightState::Red,
        right: LightState::Red,
    };
    assert_eq!(group.for_direction(ArrowDirection::Left, false), LightState::Red);
    assert_eq!(group.for_direction(ArrowDirection::Right, false), LightState::Green);
}

#[test]
fn test_u_turn_follows_drive_side() {
    let group = SignalGroup {
        mode: LightMode::All,
        main: LightState::Red,
        left: LightState::Green,
        right: LightState::Red,
    };
    // Right-hand traffic turns across the left lanes.
    assert_eq!(group.for_direction(ArrowDirection::Turn, false), LightState::Green);
    // Left-hand traffic turns across the right lanes.
    assert_eq!(group.for_direction(ArrowDirection::Turn, true), LightState::Red);
}

#[test]
fn test_change_mode_syncs_tied_signals() {
    let mut group = SignalGroup {
        mode: LightMode::All,
        main: LightState::Green,
        left: LightState::Red,
        right: LightState::Red,
    };
    group.change_mode(LightMode::SingleRight);
    assert_eq!(group.left, LightState::Green);
    assert_eq!(group.right, LightState::Red);

    group.change_mode(LightMode::Simple);
    assert_eq!(group.right, LightState::Green);
}

#[test]
fn test_toggle_main_keeps_mode_ties() {
    let mut group = SignalGroup::uniform(LightState::Red);
    group.toggle_main();
    assert_eq!(group, SignalGroup::uniform(LightState::Green));
}

#[test]
fn test_with_lanes_creates_one_group_per_class() {
    let lights = SegmentLights::with_lanes(
        &[
            (0, VehicleClass::Passenger),
            (1, VehicleClass::Passenger),
            (2, VehicleClass::Bus),
        ],
        LightState::Red,
    );
    assert_eq!(lights.signals.len(), 2);
    assert_eq!(lights.lane_classes.len(), 3);
    let (class, group) = lights.for_lane(2).unwrap();
    assert_eq!(class, VehicleClass::Bus);
    assert_eq!(group.main, LightState::Red);
    assert!(lights.for_lane(9).is_none());
}

#[test]
fn test_auto_pedestrian_is_green_only_when_traffic_is_stopped() {
    let mut lights = SegmentLights::with_lanes(&[(0, VehicleClass::Passenger)], LightState::Red);
    assert_eq!(lights.effective_pedestrian(), Some(LightState::Green));

    lights.toggle_all();
    assert_eq!(lights.effective_pedestrian(), Some(LightState::Red));
}

#[test]
fn test_auto_pedestrian_ignores_sub_signals_tied_to_main() {
    let mut lights = SegmentLights::with_lanes(&[(0, VehicleClass::Passenger)], LightState::Red);
    let group = lights.signal_mut(VehicleClass::Passenger).unwrap();
    // Left value left over from an earlier SingleLeft layout.
    group.left = LightState::Green;
    assert_eq!(group.mode, LightMode::Simple);
    assert!(!group.any_green());
    assert_eq!(lights.effective_pedestrian(), Some(LightState::Green));

    lights
        .signal_mut(VehicleClass::Passenger)
        .unwrap()
        .change_mode(LightMode::All);
    lights.signal_mut(VehicleClass::Passenger).unwrap().left = LightState::Green;
    assert_eq!(lights.effective_pedestrian(), Some(LightState::Red));
}

#[test]
fn test_manual_pedestrian_overrides_auto() {
    let mut lights = SegmentLights::with_lanes(&[(0, VehicleClass::Passenger)], LightState::Green);
    lights.manual_pedestrian = true;
    lights.pedestrian = Some(LightState::Green);
    assert_eq!(lights.effective_pedestrian(), Some(LightState::Green));
}

#[test]
fn test_no_crossing_means_no_pedestrian_signal() {
    let mut lights = SegmentLights::with_lanes(&[(0, VehicleClass::Tram)], LightState::Red);
    lights.pedestrian = None;
    assert_eq!(lights.effective_pedestrian(), None);
    assert!(!lights.is_empty());
    assert!(SegmentLights::default().is_empty());
}
