//! Runtime-tunable parameters for timed traffic lights.
//!
//! Mirrors the constants in [`crate::config`] as a resource so a host can
//! change the clock ratio or the drive side without recompiling. Saved through
//! [`crate::Saveable`] so a city keeps its settings.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{
    DEFAULT_MAX_TIME, DEFAULT_MIN_TIME, DEFAULT_WAIT_FLOW_BALANCE, FRAMES_PER_TICK_UNIT,
};

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
pub struct TimedLightsParams {
    /// Raw frames per tick unit. Zero is treated as one.
    pub frames_per_tick_unit: u64,
    /// Left-hand traffic: U-turns are governed by the right signal instead of the left.
    pub left_hand_drive: bool,
    /// Bounds and flow divisor for steps authored without explicit values.
    pub default_min_time: u32,
    pub default_max_time: u32,
    pub default_wait_flow_balance: f32,
}

impl Default for TimedLightsParams {
    fn default() -> Self {
        Self {
            frames_per_tick_unit: FRAMES_PER_TICK_UNIT,
            left_hand_drive: false,
            default_min_time: DEFAULT_MIN_TIME,
            default_max_time: DEFAULT_MAX_TIME,
            default_wait_flow_balance: DEFAULT_WAIT_FLOW_BALANCE,
        }
    }
}

impl TimedLightsParams {
    /// Downsample a raw frame count into tick units.
    pub fn tick_unit(&self, frame: u64) -> u64 {
        frame / self.frames_per_tick_unit.max(1)
    }
}

impl crate::Saveable for TimedLightsParams {
    const SAVE_KEY: &'static str = "timed_lights_params";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        crate::decode_or_warn(Self::SAVE_KEY, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Saveable;

    #[test]
    fn test_tick_unit_downsamples_frames() {
        let params = TimedLightsParams::default();
        assert_eq!(params.tick_unit(0), 0);
        assert_eq!(params.tick_unit(63), 0);
        assert_eq!(params.tick_unit(64), 1);
        assert_eq!(params.tick_unit(64 * 20 + 5), 20);
    }

    #[test]
    fn test_zero_ratio_does_not_divide_by_zero() {
        let params = TimedLightsParams {
            frames_per_tick_unit: 0,
            ..Default::default()
        };
        assert_eq!(params.tick_unit(17), 17);
    }

    #[test]
    fn test_params_survive_save_load() {
        let params = TimedLightsParams {
            frames_per_tick_unit: 8,
            left_hand_drive: true,
            default_min_time: 3,
            default_max_time: 12,
            default_wait_flow_balance: 1.5,
        };
        let bytes = params.save_to_bytes().unwrap();
        assert_eq!(TimedLightsParams::load_from_bytes(&bytes), params);
    }

    #[test]
    fn test_truncated_bytes_fall_back_to_default() {
        let loaded = TimedLightsParams::load_from_bytes(&[]);
        assert_eq!(loaded, TimedLightsParams::default());
    }
}
