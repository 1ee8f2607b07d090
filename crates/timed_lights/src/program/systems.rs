use bevy::prelude::*;

use crate::flow_wait::FlowWaitEstimator;
use crate::params::TimedLightsParams;
use crate::services::{LiveLightGrid, TimedLightsServices};
use crate::TickCounter;

use super::registry::TimedLightsRegistry;

/// Drive every started program once per tick unit.
///
/// Runs on every `FixedUpdate` but only acts on the first frame of each tick
/// unit, so step bounds are measured in tick units regardless of frame rate.
/// Does nothing until the host inserts [`TimedLightsServices`]. Renders into
/// the host's store when the services carry one, else into [`LiveLightGrid`].
pub fn simulate_timed_lights(
    tick: Res<TickCounter>,
    params: Res<TimedLightsParams>,
    services: Option<ResMut<TimedLightsServices>>,
    mut registry: ResMut<TimedLightsRegistry>,
    mut live: ResMut<LiveLightGrid>,
) {
    let Some(services) = services else {
        return;
    };
    if registry.is_empty() || tick.0 % params.frames_per_tick_unit.max(1) != 0 {
        return;
    }

    let now = params.tick_unit(tick.0);
    let services = services.into_inner();
    let estimator = FlowWaitEstimator::new(
        services.topology.as_ref(),
        services.metrics.as_ref(),
        services.restrictions.as_ref(),
        params.left_hand_drive,
    );
    let summary = match services.live.as_deref_mut() {
        Some(store) => registry.tick(now, &estimator, store),
        None => registry.tick(now, &estimator, &mut *live),
    };
    if summary.advanced > 0 || summary.failed > 0 {
        debug!(
            "Timed lights tick {}: {} programs, {} advanced, {} segments rendered, {} skipped, {} failed",
            now,
            summary.programs,
            summary.advanced,
            summary.rendered_segments,
            summary.skipped_segments,
            summary.failed
        );
    }
}
