//! Shared fixtures for unit tests.

use bevy::prelude::*;

use crate::phase_step::PhaseStep;
use crate::segment_lights::{LightState, SegmentLights, VehicleClass};
use crate::services::{NodeId, SegmentId, StaticTopology};

pub const CENTER: NodeId = NodeId(0);
pub const NORTH: SegmentId = SegmentId(10);
pub const EAST: SegmentId = SegmentId(20);
pub const SOUTH: SegmentId = SegmentId(30);
pub const WEST: SegmentId = SegmentId(40);

/// A four-way cross centered on node 0. Every segment ends at the center;
/// the longest ones are 100 long.
pub fn cross() -> StaticTopology {
    let mut topo = StaticTopology::default();
    topo.add_node(CENTER, Vec2::ZERO)
        .add_node(NodeId(1), Vec2::new(0.0, 100.0))
        .add_node(NodeId(2), Vec2::new(100.0, 0.0))
        .add_node(NodeId(3), Vec2::new(0.0, -80.0))
        .add_node(NodeId(4), Vec2::new(-100.0, 0.0));
    topo.add_segment(NORTH, NodeId(1), CENTER)
        .add_segment(EAST, NodeId(2), CENTER)
        .add_segment(SOUTH, NodeId(3), CENTER)
        .add_segment(WEST, NodeId(4), CENTER);
    topo
}

/// Adds a second cross centered on `center` at `origin`, with segment ids
/// offset by `offset`.
pub fn add_cross(topo: &mut StaticTopology, center: NodeId, origin: Vec2, offset: u32) {
    let base = center.0 * 10;
    topo.add_node(center, origin)
        .add_node(NodeId(base + 1), origin + Vec2::new(0.0, 100.0))
        .add_node(NodeId(base + 2), origin + Vec2::new(100.0, 0.0))
        .add_node(NodeId(base + 3), origin + Vec2::new(0.0, -100.0))
        .add_node(NodeId(base + 4), origin + Vec2::new(-100.0, 0.0));
    topo.add_segment(SegmentId(offset + 10), NodeId(base + 1), center)
        .add_segment(SegmentId(offset + 20), NodeId(base + 2), center)
        .add_segment(SegmentId(offset + 30), NodeId(base + 3), center)
        .add_segment(SegmentId(offset + 40), NodeId(base + 4), center);
}

/// One passenger lane (lane 0) showing `state` in every direction.
pub fn lights(state: LightState) -> SegmentLights {
    SegmentLights::with_lanes(&[(0, VehicleClass::Passenger)], state)
}

/// A step where north/south traffic has `ns` and east/west traffic has `ew`.
pub fn cross_step(min_time: u32, max_time: u32, ns: LightState, ew: LightState) -> PhaseStep {
    segments_step(min_time, max_time, [NORTH, EAST, SOUTH, WEST], ns, ew)
}

/// Same as [`cross_step`] for an arbitrary set of N/E/S/W segment ids.
pub fn segments_step(
    min_time: u32,
    max_time: u32,
    [north, east, south, west]: [SegmentId; 4],
    ns: LightState,
    ew: LightState,
) -> PhaseStep {
    PhaseStep::new(min_time, max_time, 1.0)
        .unwrap()
        .with_segment(north, lights(ns))
        .with_segment(south, lights(ns))
        .with_segment(east, lights(ew))
        .with_segment(west, lights(ew))
}
