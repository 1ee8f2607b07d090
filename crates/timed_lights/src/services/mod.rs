//! Collaborator interfaces consumed by the timed-light core.
//!
//! Road topology, vehicle counting and lane restrictions belong to other parts
//! of the simulation. The core only sees them through these narrow traits,
//! injected once through [`TimedLightsServices`]. [`memory`] holds map-backed
//! implementations used as the default live light store and in tests.

pub mod memory;


use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::flow_wait::FlowWaitEstimator;
use crate::segment_lights::{SegmentLights, VehicleClass};

pub use memory::{ClassRestrictions, LiveLightGrid, RecordedVehicleMetrics, StaticTopology};

/// Intersection (road node) identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode,
)]
pub struct NodeId(pub u32);

/// Road segment identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode,
)]
pub struct SegmentId(pub u32);

/// Direction a vehicle leaves an intersection, relative to the segment it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrowDirection {
    Forward,
    Left,
    Right,
    /// U-turn back onto the segment the vehicle arrived from.
    Turn,
}

/// Road-network connectivity. Answers reflect the last completed network
/// recalculation and must not block.
pub trait Topology: Send + Sync {
    fn connected_segments(&self, node: NodeId) -> Vec<SegmentId>;

    /// Direction from `from` into `to` at the end of `from` selected by `at_start_node`.
    fn classify_direction(
        &self,
        from: SegmentId,
        to: SegmentId,
        at_start_node: bool,
    ) -> Option<ArrowDirection>;

    fn segment_length(&self, segment: SegmentId) -> Option<f32>;

    /// Whether `node` is the start node of `segment`; `None` if they are not connected.
    fn is_start_node(&self, segment: SegmentId, node: NodeId) -> Option<bool>;
}

/// Live, displayed light configuration. Writes take effect immediately.
pub trait LiveLightStore {
    /// `None` means the segment currently has no light simulation and must be skipped.
    fn get_or_create(&mut self, node: NodeId, segment: SegmentId) -> Option<&mut SegmentLights>;
}

/// Vehicle counting on the approach lanes of a segment end.
pub trait VehicleMetrics: Send + Sync {
    /// Summed vehicle length on `lane` of `segment` heading through `node`,
    /// keyed by the segment each vehicle wants to enter. With `want_flowing`
    /// only moving vehicles count, otherwise every queued or moving vehicle.
    /// `None` means no data, which is distinct from an empty map.
    fn flowing_and_total_length(
        &self,
        segment: SegmentId,
        node: NodeId,
        lane: u8,
        want_flowing: bool,
    ) -> Option<BTreeMap<SegmentId, f32>>;
}

/// Lane restriction lookup.
pub trait VehicleRestrictions: Send + Sync {
    fn allowed_classes(&self, segment: SegmentId, node: NodeId) -> BTreeSet<VehicleClass>;
}

/// Live store owned by the host.
pub type BoxedLiveLightStore = Box<dyn LiveLightStore + Send + Sync>;

/// The collaborators a host injects before timed lights can run.
///
/// Without this resource the tick system does nothing. Lights render into
/// `live` when set, otherwise into the [`LiveLightGrid`] resource.
#[derive(Resource)]
pub struct TimedLightsServices {
    pub topology: Box<dyn Topology>,
    pub metrics: Box<dyn VehicleMetrics>,
    pub restrictions: Box<dyn VehicleRestrictions>,
    pub live: Option<BoxedLiveLightStore>,
}

impl TimedLightsServices {
    pub fn new(
        topology: impl Topology + 'static,
        metrics: impl VehicleMetrics + 'static,
        restrictions: impl VehicleRestrictions + 'static,
    ) -> Self {
        Self {
            topology: Box::new(topology),
            metrics: Box::new(metrics),
            restrictions: Box::new(restrictions),
            live: None,
        }
    }

    pub fn with_live_store(mut self, store: impl LiveLightStore + Send + Sync + 'static) -> Self {
        self.live = Some(Box::new(store));
        self
    }

    pub fn estimator(&self, left_hand_drive: bool) -> FlowWaitEstimator<'_> {
        FlowWaitEstimator::new(
            self.topology.as_ref(),
            self.metrics.as_ref(),
            self.restrictions.as_ref(),
            left_hand_drive,
        )
    }
}
