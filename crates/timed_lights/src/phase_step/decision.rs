//! Readiness decision and transition windows.

use bevy::prelude::*;

use crate::error::EstimateError;
use crate::flow_wait::FlowWaitSample;
use crate::interpolation::TransitionFlags;

use super::types::{PhaseStep, Smoothed, StepState};

/// Ended when there is a queue and it outweighs the traffic that moves.
fn wait_outweighs_flow(min_flow: Smoothed, max_wait: Smoothed) -> bool {
    match (min_flow.value(), max_wait.value()) {
        (Some(flow), Some(wait)) => wait > 0.0 && flow < wait,
        _ => false,
    }
}

impl PhaseStep {
    /// Tick units since the activation started.
    pub fn elapsed(&self, now: u64) -> u64 {
        now.saturating_sub(self.timer.start_frame)
    }

    fn max_time_reached(&self, now: u64) -> bool {
        self.elapsed(now) >= u64::from(self.max_time())
    }

    fn min_time_reached(&self, now: u64) -> bool {
        self.elapsed(now) >= u64::from(self.min_time())
    }

    /// The decision at `now` depends on a fresh flow/wait sample.
    ///
    /// True inside `[min_time, max_time)` when this tick has not been sampled
    /// yet.
    pub fn needs_sample(&self, now: u64) -> bool {
        self.timer.active
            && !self.timer.step_done
            && self.min_time_reached(now)
            && !self.max_time_reached(now)
            && self.timer.last_flow_wait_calc != Some(now)
    }

    /// Whether the step is done at `now`, pulling a sample from `sampler`
    /// only when one is needed.
    ///
    /// With `update` the result is latched (done flag, end transition start,
    /// smoothed metrics, sample time). Without it the step is left untouched
    /// and the answer is what the updating call would have returned.
    pub fn is_done_with<F>(&mut self, now: u64, update: bool, sampler: F) -> bool
    where
        F: FnOnce() -> Result<FlowWaitSample, EstimateError>,
    {
        let sample = if self.needs_sample(now) {
            Some(sampler())
        } else {
            None
        };
        self.decide(now, update, sample)
    }

    /// `sample` must be `Some` whenever [`needs_sample`](Self::needs_sample) was true.
    pub(crate) fn decide(
        &mut self,
        now: u64,
        update: bool,
        sample: Option<Result<FlowWaitSample, EstimateError>>,
    ) -> bool {
        if !self.timer.active {
            return false;
        }
        if self.timer.step_done {
            return true;
        }
        if self.max_time_reached(now) {
            if update {
                self.timer.mark_done(now);
            }
            return true;
        }
        if !self.min_time_reached(now) {
            return false;
        }

        let (min_flow, max_wait) = match sample {
            Some(Err(err)) => {
                // Without comparable data the phase ends rather than stalls.
                debug!("Timed step ends early at tick {}: {}", now, err);
                if update {
                    self.timer.mark_done(now);
                }
                return true;
            }
            Some(Ok(s)) => {
                let min_flow = self.timer.min_flow.blend(s.flow, s.flow);
                let max_wait = self.timer.max_wait.blend(s.wait, 0.0);
                if update {
                    self.timer.min_flow = min_flow;
                    self.timer.max_wait = max_wait;
                    self.timer.last_flow_wait_calc = Some(now);
                }
                (min_flow, max_wait)
            }
            None => (self.timer.min_flow, self.timer.max_wait),
        };

        let done = wait_outweighs_flow(min_flow, max_wait);
        if done && update {
            self.timer.mark_done(now);
        }
        done
    }

    /// First tick of the activation, before the step is done.
    pub fn is_in_start_transition(&self, now: u64) -> bool {
        self.timer.active && !self.timer.step_done && now == self.timer.start_frame
    }

    /// Done, and the end transition tick has not passed yet.
    pub fn is_in_end_transition(&self, now: u64) -> bool {
        self.timer.step_done
            && self
                .timer
                .end_transition_start
                .is_some_and(|start| now <= start)
    }

    /// Done, and the end transition tick has passed; the program may advance.
    pub fn is_end_transition_complete(&self, now: u64) -> bool {
        self.timer.step_done
            && self
                .timer
                .end_transition_start
                .is_some_and(|start| now > start)
    }

    pub fn transition_flags(&self, now: u64) -> TransitionFlags {
        TransitionFlags {
            at_start: self.is_in_start_transition(now),
            at_end: self.timer.step_done
                && self
                    .timer
                    .end_transition_start
                    .is_some_and(|start| now >= start),
        }
    }

    /// Tick units until the minimum time is reached (zero once reached).
    pub fn remaining_min_time(&self, now: u64) -> u64 {
        (self.timer.start_frame + u64::from(self.min_time())).saturating_sub(now)
    }

    /// Tick units until the step is forced to end (zero once reached).
    pub fn remaining_max_time(&self, now: u64) -> u64 {
        (self.timer.start_frame + u64::from(self.max_time())).saturating_sub(now)
    }

    /// Earliest number of tick units before the phase can change.
    pub fn ticks_until_change(&self, now: u64) -> u64 {
        if self.timer.step_done {
            0
        } else {
            self.remaining_min_time(now)
        }
    }

    /// Lifecycle state from the latched timer values; never samples.
    pub fn state(&self, now: u64) -> StepState {
        let timer = &self.timer;
        if !timer.active {
            return StepState::Pending;
        }
        if timer.step_done {
            return match timer.end_transition_start {
                Some(start) if now > start => StepState::EndTransitionComplete,
                Some(start) if now == start => StepState::EndTransition,
                _ => StepState::Done,
            };
        }
        if self.min_time_reached(now) {
            StepState::MinTimeReached
        } else {
            StepState::Active
        }
    }
}
