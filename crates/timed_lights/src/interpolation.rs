//! Transitional light interpolation between neighboring phases.

use crate::segment_lights::LightState;

/// Where the active step sits in its own transition windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionFlags {
    /// Tick equals the step's start frame and the step is not done yet.
    pub at_start: bool,
    /// Step is done and the tick is at or past the end transition start.
    pub at_end: bool,
}

/// Displayed state of a signal given the stored states of the previous,
/// active and next phase.
///
/// A signal that turns green at the start of a phase shows `RedToGreen`, one
/// that turns red at its end shows `GreenToRed`. Otherwise the active value is
/// shown unchanged.
pub fn interpolate(
    prev: LightState,
    cur: LightState,
    next: LightState,
    flags: TransitionFlags,
) -> LightState {
    if flags.at_start && cur == LightState::Green && prev == LightState::Red {
        LightState::RedToGreen
    } else if flags.at_end && cur == LightState::Green && next == LightState::Red {
        LightState::GreenToRed
    } else {
        cur
    }
}
