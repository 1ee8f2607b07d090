//! Writing a step's lights into the live light store.

use bevy::prelude::*;

use crate::error::RenderError;
use crate::interpolation::{interpolate, TransitionFlags};
use crate::segment_lights::{SegmentLights, SubSignal};
use crate::services::{LiveLightStore, NodeId, SegmentId, Topology};

use super::types::PhaseStep;

/// Outcome of rendering one step at one intersection.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderReport {
    /// Segments written to the live store.
    pub rendered: usize,
    /// Segments left untouched this tick, with the reason.
    pub skipped: Vec<(SegmentId, RenderError)>,
}

impl PhaseStep {
    /// Render every segment of this step at `node`.
    ///
    /// `prev` and `next` are the cyclic neighbors of this step in the same
    /// program, `flags` come from the step that owns the timing (the master's
    /// copy when `node` is a slave). A segment that cannot be rendered is
    /// skipped and logged; the others are still written.
    pub fn render(
        &self,
        node: NodeId,
        prev: &PhaseStep,
        next: &PhaseStep,
        flags: TransitionFlags,
        topology: &dyn Topology,
        store: &mut dyn LiveLightStore,
    ) -> RenderReport {
        let mut report = RenderReport::default();
        for (&segment, lights) in &self.segment_lights {
            match render_segment(node, segment, lights, prev, next, flags, topology, store) {
                Ok(()) => report.rendered += 1,
                Err(err) => {
                    warn!("Timed lights at {:?}: skipping segment: {}", node, err);
                    report.skipped.push((segment, err));
                }
            }
        }
        report
    }
}

#[allow(clippy::too_many_arguments)]
fn render_segment(
    node: NodeId,
    segment: SegmentId,
    lights: &SegmentLights,
    prev: &PhaseStep,
    next: &PhaseStep,
    flags: TransitionFlags,
    topology: &dyn Topology,
    store: &mut dyn LiveLightStore,
) -> Result<(), RenderError> {
    if topology.is_start_node(segment, node).is_none() {
        return Err(RenderError::Disconnected { node, segment });
    }
    let prev_lights = prev
        .segment_lights
        .get(&segment)
        .ok_or(RenderError::MissingInPrevious { segment })?;
    let next_lights = next
        .segment_lights
        .get(&segment)
        .ok_or(RenderError::MissingInNext { segment })?;
    let live = store
        .get_or_create(node, segment)
        .ok_or(RenderError::NoLiveLights { node, segment })?;

    live.signals.retain(|class, _| lights.signals.contains_key(class));
    for (class, group) in &lights.signals {
        // A class the neighbor step does not know keeps its own value there.
        let prev_group = prev_lights.signal(*class).unwrap_or(group);
        let next_group = next_lights.signal(*class).unwrap_or(group);
        let shown = live.signals.entry(*class).or_default();
        shown.mode = group.mode;
        for sub in SubSignal::ALL {
            shown.set(
                sub,
                interpolate(prev_group.get(sub), group.get(sub), next_group.get(sub), flags),
            );
        }
    }

    live.lane_classes = lights.lane_classes.clone();
    live.manual_pedestrian = lights.manual_pedestrian;
    live.pedestrian = lights.effective_pedestrian().map(|cur| {
        interpolate(
            prev_lights.effective_pedestrian().unwrap_or(cur),
            cur,
            next_lights.effective_pedestrian().unwrap_or(cur),
            flags,
        )
    });
    Ok(())
}
