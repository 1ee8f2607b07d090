//! Headless app tests: the plugin drives programs from `FixedUpdate`.
//!
//! Run: cargo test -p timed_lights --test timed_lights_integration

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bevy::prelude::*;

use timed_lights::params::TimedLightsParams;
use timed_lights::phase_step::{PhaseStep, StepState};
use timed_lights::program::{TimedLightsRegistry, TimedProgram};
use timed_lights::segment_lights::{LightState, SegmentLights, VehicleClass};
use timed_lights::services::{
    ClassRestrictions, LiveLightGrid, LiveLightStore, NodeId, RecordedVehicleMetrics, SegmentId,
    StaticTopology, TimedLightsServices,
};
use timed_lights::{SaveableRegistry, TimedLightsPlugin};

const CENTER: NodeId = NodeId(0);
const NORTH: SegmentId = SegmentId(10);
const EAST: SegmentId = SegmentId(20);
const SOUTH: SegmentId = SegmentId(30);
const WEST: SegmentId = SegmentId(40);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn cross() -> StaticTopology {
    let mut topo = StaticTopology::default();
    topo.add_node(CENTER, Vec2::ZERO)
        .add_node(NodeId(1), Vec2::new(0.0, 100.0))
        .add_node(NodeId(2), Vec2::new(100.0, 0.0))
        .add_node(NodeId(3), Vec2::new(0.0, -100.0))
        .add_node(NodeId(4), Vec2::new(-100.0, 0.0));
    topo.add_segment(NORTH, NodeId(1), CENTER)
        .add_segment(EAST, NodeId(2), CENTER)
        .add_segment(SOUTH, NodeId(3), CENTER)
        .add_segment(WEST, NodeId(4), CENTER);
    topo
}

fn step(min_time: u32, max_time: u32, ns: LightState, ew: LightState) -> PhaseStep {
    let lights = |state| SegmentLights::with_lanes(&[(0, VehicleClass::Passenger)], state);
    PhaseStep::new(min_time, max_time, 1.0)
        .unwrap()
        .with_segment(NORTH, lights(ns))
        .with_segment(SOUTH, lights(ns))
        .with_segment(EAST, lights(ew))
        .with_segment(WEST, lights(ew))
}

/// Headless app with one tick unit per frame and a two-phase program at the
/// center, started at tick 1 (the first frame).
fn app_with_program(metrics: RecordedVehicleMetrics, min_time: u32, max_time: u32) -> App {
    let topo = cross();
    let mut app = App::new();
    app.add_plugins(MinimalPlugins).add_plugins(TimedLightsPlugin);
    app.insert_resource(TimedLightsParams {
        frames_per_tick_unit: 1,
        ..default()
    });
    app.world_mut()
        .resource_mut::<LiveLightGrid>()
        .enable_node(CENTER, &topo);

    {
        let mut registry = app.world_mut().resource_mut::<TimedLightsRegistry>();
        registry.insert(TimedProgram::new(
            CENTER,
            vec![
                step(min_time, max_time, LightState::Green, LightState::Red),
                step(min_time, max_time, LightState::Red, LightState::Green),
            ],
        ));
        registry.start(CENTER, 1).unwrap();
    }
    app.insert_resource(TimedLightsServices::new(
        topo,
        metrics,
        ClassRestrictions::default(),
    ));
    app
}

fn run_tick(app: &mut App) {
    app.world_mut().run_schedule(FixedUpdate);
}

fn shown(app: &App, segment: SegmentId) -> LightState {
    app.world()
        .resource::<LiveLightGrid>()
        .get(CENTER, segment)
        .and_then(|lights| lights.signal(VehicleClass::Passenger))
        .map(|group| group.main)
        .unwrap()
}

fn current_step(app: &App) -> usize {
    app.world()
        .resource::<TimedLightsRegistry>()
        .current_step(CENTER)
        .unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_program_without_data_cycles_at_min_time() {
    let mut app = app_with_program(RecordedVehicleMetrics::default(), 2, 10);

    run_tick(&mut app); // tick 1: step 0 starts
    assert_eq!(shown(&app, NORTH), LightState::RedToGreen);
    assert_eq!(shown(&app, EAST), LightState::Red);

    run_tick(&mut app); // tick 2
    assert_eq!(shown(&app, NORTH), LightState::Green);

    run_tick(&mut app); // tick 3: min time, no data, done
    assert_eq!(shown(&app, NORTH), LightState::GreenToRed);
    assert_eq!(current_step(&app), 0);

    run_tick(&mut app); // tick 4: advance
    assert_eq!(current_step(&app), 1);
    assert_eq!(shown(&app, NORTH), LightState::Red);
    assert_eq!(shown(&app, EAST), LightState::RedToGreen);
}

#[test]
fn test_moving_traffic_holds_green_until_max_time() {
    let mut metrics = RecordedVehicleMetrics::default();
    metrics
        .record(SOUTH, CENTER, 0, &[(NORTH, 40.0)], &[(NORTH, 40.0)])
        .record(EAST, CENTER, 0, &[], &[]);
    let mut app = app_with_program(metrics, 2, 5);

    for tick in 1..=6 {
        run_tick(&mut app);
        assert_eq!(current_step(&app), 0, "advanced early at tick {tick}");
    }
    let state = app
        .world()
        .resource::<TimedLightsRegistry>()
        .step_state(CENTER, 6)
        .unwrap();
    assert_eq!(state, StepState::EndTransition);

    run_tick(&mut app);
    assert_eq!(current_step(&app), 1);
}

#[test]
fn test_queue_ends_phase_early() {
    let mut metrics = RecordedVehicleMetrics::default();
    metrics
        .record(SOUTH, CENTER, 0, &[], &[])
        .record(EAST, CENTER, 0, &[], &[(WEST, 60.0)]);
    let mut app = app_with_program(metrics, 2, 20);

    // Tick 3 seeds the queue metric at zero, tick 4 sees the queue.
    for _ in 1..=4 {
        run_tick(&mut app);
    }
    assert_eq!(current_step(&app), 0);
    run_tick(&mut app);
    assert_eq!(current_step(&app), 1);
}

#[test]
fn test_nothing_runs_without_services() {
    let mut app = app_with_program(RecordedVehicleMetrics::default(), 2, 10);
    app.world_mut().remove_resource::<TimedLightsServices>();
    for _ in 0..5 {
        run_tick(&mut app);
    }
    assert!(app
        .world()
        .resource::<LiveLightGrid>()
        .get(CENTER, NORTH)
        .is_none());
    assert_eq!(current_step(&app), 0);
}

#[test]
fn test_coarse_tick_units() {
    let mut app = app_with_program(RecordedVehicleMetrics::default(), 2, 10);
    app.insert_resource(TimedLightsParams {
        frames_per_tick_unit: 4,
        ..default()
    });
    for _ in 0..3 {
        run_tick(&mut app);
    }
    // Frames 1-3 are inside the first tick unit and do not run the program.
    assert!(app
        .world()
        .resource::<LiveLightGrid>()
        .get(CENTER, NORTH)
        .is_none());
    run_tick(&mut app);
    assert_eq!(shown(&app, NORTH), LightState::RedToGreen);
}

/// Host-side store that counts writes and keeps the lights to itself.
struct CountingStore {
    grid: LiveLightGrid,
    writes: Arc<AtomicUsize>,
}

impl LiveLightStore for CountingStore {
    fn get_or_create(&mut self, node: NodeId, segment: SegmentId) -> Option<&mut SegmentLights> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.grid.get_or_create(node, segment)
    }
}

#[test]
fn test_injected_live_store_receives_the_lights() {
    let mut app = app_with_program(RecordedVehicleMetrics::default(), 2, 10);
    let writes = Arc::new(AtomicUsize::new(0));
    let mut grid = LiveLightGrid::default();
    grid.enable_node(CENTER, &cross());
    app.insert_resource(
        TimedLightsServices::new(
            cross(),
            RecordedVehicleMetrics::default(),
            ClassRestrictions::default(),
        )
        .with_live_store(CountingStore {
            grid,
            writes: Arc::clone(&writes),
        }),
    );

    run_tick(&mut app);
    // One write per segment of the active step.
    assert_eq!(writes.load(Ordering::Relaxed), 4);
    assert!(app
        .world()
        .resource::<LiveLightGrid>()
        .get(CENTER, NORTH)
        .is_none());

    run_tick(&mut app);
    assert_eq!(writes.load(Ordering::Relaxed), 8);
}

#[test]
fn test_programs_survive_save_and_load() {
    let mut app = app_with_program(RecordedVehicleMetrics::default(), 2, 10);
    for _ in 0..4 {
        run_tick(&mut app);
    }

    let extensions: BTreeMap<String, Vec<u8>> = app
        .world()
        .resource::<SaveableRegistry>()
        .save_all(app.world());
    assert!(extensions.contains_key("timed_lights_programs"));
    assert!(extensions.contains_key("timed_lights_params"));

    let mut restored = App::new();
    restored
        .add_plugins(MinimalPlugins)
        .add_plugins(TimedLightsPlugin);
    restored.world_mut().resource_scope(|world, saveables: Mut<SaveableRegistry>| {
        saveables.load_all(world, &extensions);
    });

    let registry = restored.world().resource::<TimedLightsRegistry>();
    assert_eq!(registry.current_step(CENTER).unwrap(), 1);
    assert!(registry.is_started(CENTER).unwrap());
    assert_eq!(registry.step_state(CENTER, 0).unwrap(), StepState::Pending);
    assert_eq!(
        restored.world().resource::<TimedLightsParams>().frames_per_tick_unit,
        1
    );
}
