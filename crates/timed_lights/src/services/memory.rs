//! Map-backed collaborator implementations.

use bevy::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::f32::consts::FRAC_PI_4;

use crate::segment_lights::{SegmentLights, VehicleClass};

use super::{
    ArrowDirection, LiveLightStore, NodeId, SegmentId, Topology, VehicleMetrics,
    VehicleRestrictions,
};

// ---------------------------------------------------------------------------
// Topology
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct StraightSegment {
    start: NodeId,
    end: NodeId,
}

/// Straight segments between positioned nodes.
///
/// Directions are classified from the angle between the arriving and the
/// leaving segment: within 45 degrees of straight on is `Forward`, a
/// counterclockwise bend is `Left`, a clockwise bend is `Right`, and anything
/// sharper than 135 degrees is `Turn`.
#[derive(Debug, Clone, Default)]
pub struct StaticTopology {
    nodes: BTreeMap<NodeId, Vec2>,
    segments: BTreeMap<SegmentId, StraightSegment>,
}

impl StaticTopology {
    pub fn add_node(&mut self, node: NodeId, position: Vec2) -> &mut Self {
        self.nodes.insert(node, position);
        self
    }

    pub fn add_segment(&mut self, segment: SegmentId, start: NodeId, end: NodeId) -> &mut Self {
        self.segments.insert(segment, StraightSegment { start, end });
        self
    }

    pub fn remove_segment(&mut self, segment: SegmentId) {
        self.segments.remove(&segment);
    }

    fn position(&self, node: NodeId) -> Option<Vec2> {
        self.nodes.get(&node).copied()
    }
}

impl Topology for StaticTopology {
    fn connected_segments(&self, node: NodeId) -> Vec<SegmentId> {
        self.segments
            .iter()
            .filter(|(_, s)| s.start == node || s.end == node)
            .map(|(&id, _)| id)
            .collect()
    }

    fn classify_direction(
        &self,
        from: SegmentId,
        to: SegmentId,
        at_start_node: bool,
    ) -> Option<ArrowDirection> {
        if from == to {
            return Some(ArrowDirection::Turn);
        }
        let incoming = self.segments.get(&from)?;
        let outgoing = self.segments.get(&to)?;
        let (node, origin) = if at_start_node {
            (incoming.start, incoming.end)
        } else {
            (incoming.end, incoming.start)
        };
        let destination = if outgoing.start == node {
            outgoing.end
        } else if outgoing.end == node {
            outgoing.start
        } else {
            return None;
        };

        let center = self.position(node)?;
        let arriving = center - self.position(origin)?;
        let leaving = self.position(destination)? - center;
        if arriving.length_squared() == 0.0 || leaving.length_squared() == 0.0 {
            return None;
        }

        let angle = arriving.perp_dot(leaving).atan2(arriving.dot(leaving));
        Some(if angle.abs() <= FRAC_PI_4 {
            ArrowDirection::Forward
        } else if angle.abs() >= 3.0 * FRAC_PI_4 {
            ArrowDirection::Turn
        } else if angle > 0.0 {
            ArrowDirection::Left
        } else {
            ArrowDirection::Right
        })
    }

    fn segment_length(&self, segment: SegmentId) -> Option<f32> {
        let s = self.segments.get(&segment)?;
        Some(self.position(s.start)?.distance(self.position(s.end)?))
    }

    fn is_start_node(&self, segment: SegmentId, node: NodeId) -> Option<bool> {
        let s = self.segments.get(&segment)?;
        if s.start == node {
            Some(true)
        } else if s.end == node {
            Some(false)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Live light store
// ---------------------------------------------------------------------------

/// Currently displayed lights for every simulated (node, segment) pair.
#[derive(Resource, Debug, Default)]
pub struct LiveLightGrid {
    simulated: BTreeSet<(NodeId, SegmentId)>,
    lights: BTreeMap<(NodeId, SegmentId), SegmentLights>,
}

impl LiveLightGrid {
    /// Give every segment connected to `node` a light simulation.
    pub fn enable_node(&mut self, node: NodeId, topology: &dyn Topology) {
        for segment in topology.connected_segments(node) {
            self.enable(node, segment);
        }
    }

    pub fn enable(&mut self, node: NodeId, segment: SegmentId) {
        self.simulated.insert((node, segment));
    }

    /// Stop simulating a segment; its displayed lights are dropped.
    pub fn disable(&mut self, node: NodeId, segment: SegmentId) {
        self.simulated.remove(&(node, segment));
        self.lights.remove(&(node, segment));
    }

    pub fn get(&self, node: NodeId, segment: SegmentId) -> Option<&SegmentLights> {
        self.lights.get(&(node, segment))
    }

    /// Seed a displayed configuration, enabling the segment if needed.
    pub fn set(&mut self, node: NodeId, segment: SegmentId, lights: SegmentLights) {
        self.simulated.insert((node, segment));
        self.lights.insert((node, segment), lights);
    }
}

impl LiveLightStore for LiveLightGrid {
    fn get_or_create(&mut self, node: NodeId, segment: SegmentId) -> Option<&mut SegmentLights> {
        if !self.simulated.contains(&(node, segment)) {
            return None;
        }
        Some(self.lights.entry((node, segment)).or_default())
    }
}

// ---------------------------------------------------------------------------
// Vehicle metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct LaneLengths {
    flowing: BTreeMap<SegmentId, f32>,
    total: BTreeMap<SegmentId, f32>,
}

/// Vehicle lengths recorded per (segment, node, lane). Unrecorded lanes report no data.
#[derive(Debug, Clone, Default)]
pub struct RecordedVehicleMetrics {
    lanes: BTreeMap<(SegmentId, NodeId, u8), LaneLengths>,
}

impl RecordedVehicleMetrics {
    /// Record lengths for one lane; `flowing` and `total` are keyed by target segment.
    pub fn record(
        &mut self,
        segment: SegmentId,
        node: NodeId,
        lane: u8,
        flowing: &[(SegmentId, f32)],
        total: &[(SegmentId, f32)],
    ) -> &mut Self {
        self.lanes.insert(
            (segment, node, lane),
            LaneLengths {
                flowing: flowing.iter().copied().collect(),
                total: total.iter().copied().collect(),
            },
        );
        self
    }

    pub fn clear(&mut self) {
        self.lanes.clear();
    }
}

impl VehicleMetrics for RecordedVehicleMetrics {
    fn flowing_and_total_length(
        &self,
        segment: SegmentId,
        node: NodeId,
        lane: u8,
        want_flowing: bool,
    ) -> Option<BTreeMap<SegmentId, f32>> {
        let lengths = self.lanes.get(&(segment, node, lane))?;
        Some(if want_flowing {
            lengths.flowing.clone()
        } else {
            lengths.total.clone()
        })
    }
}

// ---------------------------------------------------------------------------
// Restrictions
// ---------------------------------------------------------------------------

/// Per-segment allowed classes. Segments without an entry allow every class.
#[derive(Debug, Clone, Default)]
pub struct ClassRestrictions {
    per_segment: BTreeMap<SegmentId, BTreeSet<VehicleClass>>,
}

impl ClassRestrictions {
    pub fn restrict(&mut self, segment: SegmentId, allowed: &[VehicleClass]) -> &mut Self {
        self.per_segment
            .insert(segment, allowed.iter().copied().collect());
        self
    }
}

impl VehicleRestrictions for ClassRestrictions {
    fn allowed_classes(&self, segment: SegmentId, _node: NodeId) -> BTreeSet<VehicleClass> {
        match self.per_segment.get(&segment) {
            Some(allowed) => allowed.clone(),
            None => VehicleClass::ALL.into_iter().collect(),
        }
    }
}
