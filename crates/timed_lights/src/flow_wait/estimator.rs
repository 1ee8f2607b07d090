use bevy::prelude::*;

use crate::error::EstimateError;
use crate::phase_step::{max_segment_length, PhaseStep};
use crate::program::TimedLightsRegistry;
use crate::segment_lights::SegmentLights;
use crate::services::{
    ArrowDirection, NodeId, SegmentId, Topology, VehicleMetrics, VehicleRestrictions,
};

/// One raw measurement, before smoothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowWaitSample {
    /// Mean flowing length, already divided by the step's wait/flow balance.
    pub flow: f32,
    /// Mean waiting length.
    pub wait: f32,
}

#[derive(Debug, Default)]
struct Tally {
    flow_sum: f32,
    flow_count: u32,
    wait_sum: f32,
    wait_count: u32,
    /// Segments whose geometry resolved.
    usable_segments: u32,
    lanes_queried: u32,
    lanes_with_data: u32,
}

impl Tally {
    fn has_data(&self) -> bool {
        self.usable_segments > 0 && (self.lanes_queried == 0 || self.lanes_with_data > 0)
    }

    fn mean_flow(&self) -> f32 {
        if self.flow_count == 0 {
            0.0
        } else {
            self.flow_sum / self.flow_count as f32
        }
    }

    fn mean_wait(&self) -> f32 {
        if self.wait_count == 0 {
            0.0
        } else {
            self.wait_sum / self.wait_count as f32
        }
    }
}

/// Fans a flow/wait measurement out over a synchronized group.
pub struct FlowWaitEstimator<'a> {
    topology: &'a dyn Topology,
    metrics: &'a dyn VehicleMetrics,
    restrictions: &'a dyn VehicleRestrictions,
    left_hand_drive: bool,
}

impl<'a> FlowWaitEstimator<'a> {
    pub fn new(
        topology: &'a dyn Topology,
        metrics: &'a dyn VehicleMetrics,
        restrictions: &'a dyn VehicleRestrictions,
        left_hand_drive: bool,
    ) -> Self {
        Self {
            topology,
            metrics,
            restrictions,
            left_hand_drive,
        }
    }

    pub fn topology(&self) -> &'a dyn Topology {
        self.topology
    }

    /// Measure step `step_index` across the group led by `master`.
    ///
    /// Members without a program, or whose program is too short to have
    /// this step, are left out. Zero traffic is a valid `(0, 0)` sample; an
    /// error means no member produced comparable data.
    pub fn estimate(
        &self,
        registry: &TimedLightsRegistry,
        master: NodeId,
        step_index: usize,
    ) -> Result<FlowWaitSample, EstimateError> {
        let master_program = registry
            .get(master)
            .ok_or(EstimateError::NoProgram(master))?;
        let balance = master_program
            .step(step_index)
            .ok_or(EstimateError::NoStep {
                master,
                step: step_index,
            })?
            .wait_flow_balance();

        let mut tally = Tally::default();
        for &member in master_program.node_group() {
            let Some(step) = registry.get(member).and_then(|p| p.step(step_index)) else {
                continue;
            };
            self.tally_step(member, step, &mut tally);
        }

        if !tally.has_data() {
            return Err(EstimateError::NoData {
                master,
                step: step_index,
            });
        }
        Ok(FlowWaitSample {
            flow: tally.mean_flow() / balance,
            wait: tally.mean_wait(),
        })
    }

    fn tally_step(&self, node: NodeId, step: &PhaseStep, tally: &mut Tally) {
        let norm = step
            .max_segment_length()
            .unwrap_or_else(|| max_segment_length(node, self.topology));
        for (&segment, lights) in &step.segment_lights {
            if lights.is_empty() {
                continue;
            }
            let Some(at_start) = self.topology.is_start_node(segment, node) else {
                debug!("Flow/wait: segment {:?} not connected to {:?}", segment, node);
                continue;
            };
            tally.usable_segments += 1;
            self.tally_segment(node, segment, at_start, lights, norm, tally);
        }
    }

    fn tally_segment(
        &self,
        node: NodeId,
        segment: SegmentId,
        at_start: bool,
        lights: &SegmentLights,
        norm: f32,
        tally: &mut Tally,
    ) {
        let allowed = self.restrictions.allowed_classes(segment, node);
        for (&lane, &class) in &lights.lane_classes {
            if !allowed.contains(&class) {
                continue;
            }
            let Some(group) = lights.signal(class) else {
                continue;
            };
            tally.lanes_queried += 1;
            let flowing = self
                .metrics
                .flowing_and_total_length(segment, node, lane, true);
            let total = self
                .metrics
                .flowing_and_total_length(segment, node, lane, false);
            let (Some(flowing), Some(total)) = (flowing, total) else {
                continue;
            };
            tally.lanes_with_data += 1;

            for (&target, &total_length) in &total {
                let direction = if target == segment {
                    ArrowDirection::Turn
                } else {
                    match self.topology.classify_direction(segment, target, at_start) {
                        Some(direction) => direction,
                        None => continue,
                    }
                };
                if group.for_direction(direction, self.left_hand_drive).is_green() {
                    tally.flow_sum += flowing.get(&target).copied().unwrap_or(0.0) / norm;
                    tally.flow_count += 1;
                } else {
                    tally.wait_sum += total_length / norm;
                    tally.wait_count += 1;
                }
            }
        }
    }
}
