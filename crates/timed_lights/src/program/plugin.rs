use bevy::prelude::*;

use crate::params::TimedLightsParams;
use crate::services::LiveLightGrid;
use crate::{advance_tick_counter, SaveableRegistry, TickCounter};

use super::registry::TimedLightsRegistry;
use super::systems::simulate_timed_lights;

pub struct TimedLightsPlugin;

impl Plugin for TimedLightsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TickCounter>()
            .init_resource::<TimedLightsParams>()
            .init_resource::<TimedLightsRegistry>()
            .init_resource::<LiveLightGrid>()
            .add_systems(
                FixedUpdate,
                (advance_tick_counter, simulate_timed_lights).chain(),
            );

        let mut saveables = app
            .world_mut()
            .get_resource_or_insert_with(SaveableRegistry::default);
        saveables.register::<TimedLightsParams>();
        saveables.register::<TimedLightsRegistry>();
    }
}
