//! Phase step configuration and running timer.

use std::collections::BTreeMap;

use crate::config::{
    FALLBACK_SEGMENT_LENGTH, SMOOTHING_HISTORY_WEIGHT, SMOOTHING_SAMPLE_WEIGHT,
};
use crate::error::StepConfigError;
use crate::segment_lights::SegmentLights;
use crate::services::{LiveLightStore, NodeId, SegmentId, Topology};

/// Exponentially smoothed metric that has not necessarily been sampled yet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Smoothed {
    #[default]
    Unsampled,
    Value(f32),
}

impl Smoothed {
    pub fn value(self) -> Option<f32> {
        match self {
            Smoothed::Unsampled => None,
            Smoothed::Value(v) => Some(v),
        }
    }

    /// Blend in a new sample. The first sample does not blend: the metric
    /// starts at `seed`.
    pub fn blend(self, sample: f32, seed: f32) -> Smoothed {
        match self {
            Smoothed::Unsampled => Smoothed::Value(seed),
            Smoothed::Value(prev) => Smoothed::Value(
                SMOOTHING_HISTORY_WEIGHT * prev + SMOOTHING_SAMPLE_WEIGHT * sample,
            ),
        }
    }
}

/// Externally observable lifecycle of one step activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Active,
    MinTimeReached,
    Done,
    EndTransition,
    EndTransitionComplete,
}

/// Running state of one step activation. All fields are tick units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepTimer {
    pub(crate) active: bool,
    pub(crate) start_frame: u64,
    pub(crate) step_done: bool,
    pub(crate) end_transition_start: Option<u64>,
    pub(crate) min_flow: Smoothed,
    pub(crate) max_wait: Smoothed,
    pub(crate) last_flow_wait_calc: Option<u64>,
}

impl StepTimer {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn step_done(&self) -> bool {
        self.step_done
    }

    pub fn end_transition_start(&self) -> Option<u64> {
        self.end_transition_start
    }

    pub fn min_flow(&self) -> Smoothed {
        self.min_flow
    }

    pub fn max_wait(&self) -> Smoothed {
        self.max_wait
    }

    pub fn last_flow_wait_calc(&self) -> Option<u64> {
        self.last_flow_wait_calc
    }

    /// Latch the done flag. The end transition starts at the first latch only.
    pub(crate) fn mark_done(&mut self, now: u64) {
        if !self.step_done {
            self.step_done = true;
            self.end_transition_start.get_or_insert(now);
        }
    }
}

/// One phase: authored light layout plus the timer of its current activation.
///
/// Deliberately not `Clone`; see [`PhaseStep::duplicate`].
#[derive(Debug)]
pub struct PhaseStep {
    min_time: u32,
    max_time: u32,
    wait_flow_balance: f32,
    /// Authored light layout, keyed by segment.
    pub segment_lights: BTreeMap<SegmentId, SegmentLights>,
    max_segment_length: Option<f32>,
    pub(crate) timer: StepTimer,
}

fn validate(min_time: u32, max_time: u32, balance: f32) -> Result<(), StepConfigError> {
    if min_time > max_time {
        return Err(StepConfigError::InvertedBounds { min_time, max_time });
    }
    if !balance.is_finite() || balance <= 0.0 {
        return Err(StepConfigError::InvalidBalance(balance));
    }
    Ok(())
}

impl PhaseStep {
    pub fn new(min_time: u32, max_time: u32, wait_flow_balance: f32) -> Result<Self, StepConfigError> {
        validate(min_time, max_time, wait_flow_balance)?;
        Ok(Self {
            min_time,
            max_time,
            wait_flow_balance,
            segment_lights: BTreeMap::new(),
            max_segment_length: None,
            timer: StepTimer::default(),
        })
    }

    /// Author a step from what the intersection currently displays on each
    /// connected segment. Segments without a live simulation are left out.
    pub fn from_live(
        node: NodeId,
        min_time: u32,
        max_time: u32,
        wait_flow_balance: f32,
        topology: &dyn Topology,
        store: &mut dyn LiveLightStore,
    ) -> Result<Self, StepConfigError> {
        let mut step = Self::new(min_time, max_time, wait_flow_balance)?;
        step.update_from_live(node, topology, store);
        step.refresh_max_segment_length(node, topology);
        Ok(step)
    }

    pub fn with_segment(mut self, segment: SegmentId, lights: SegmentLights) -> Self {
        self.segment_lights.insert(segment, lights);
        self
    }

    pub fn min_time(&self) -> u32 {
        self.min_time
    }

    pub fn max_time(&self) -> u32 {
        self.max_time
    }

    pub fn wait_flow_balance(&self) -> f32 {
        self.wait_flow_balance
    }

    pub fn timer(&self) -> &StepTimer {
        &self.timer
    }

    pub fn set_bounds(&mut self, min_time: u32, max_time: u32) -> Result<(), StepConfigError> {
        validate(min_time, max_time, self.wait_flow_balance)?;
        self.min_time = min_time;
        self.max_time = max_time;
        Ok(())
    }

    pub fn set_wait_flow_balance(&mut self, balance: f32) -> Result<(), StepConfigError> {
        validate(self.min_time, self.max_time, balance)?;
        self.wait_flow_balance = balance;
        Ok(())
    }

    /// Begin a fresh activation at `now`, discarding all running state.
    pub fn start(&mut self, now: u64) {
        self.timer = StepTimer {
            active: true,
            start_frame: now,
            ..StepTimer::default()
        };
    }

    /// Mark the step done without evaluating metrics (editor "skip").
    pub fn force_done(&mut self, now: u64) {
        self.timer.mark_done(now);
    }

    /// Replace the stored layout with what the intersection currently displays.
    pub fn update_from_live(
        &mut self,
        node: NodeId,
        topology: &dyn Topology,
        store: &mut dyn LiveLightStore,
    ) {
        self.segment_lights.clear();
        for segment in topology.connected_segments(node) {
            if let Some(live) = store.get_or_create(node, segment) {
                self.segment_lights.insert(segment, live.clone());
            }
        }
    }

    /// Longest segment at the intersection, cached for metric normalization.
    pub fn refresh_max_segment_length(&mut self, node: NodeId, topology: &dyn Topology) -> f32 {
        let length = max_segment_length(node, topology);
        self.max_segment_length = Some(length);
        length
    }

    pub fn max_segment_length(&self) -> Option<f32> {
        self.max_segment_length
    }

    /// Every segment the step lists is still connected to `node`.
    pub fn is_valid(&self, node: NodeId, topology: &dyn Topology) -> bool {
        self.segment_lights
            .keys()
            .all(|&segment| topology.is_start_node(segment, node).is_some())
    }

    /// Copy this step for editing.
    ///
    /// The copy owns its own light layouts and starts `Pending` with a fresh
    /// timer.
    pub fn duplicate(&self) -> PhaseStep {
        PhaseStep {
            min_time: self.min_time,
            max_time: self.max_time,
            wait_flow_balance: self.wait_flow_balance,
            segment_lights: self.segment_lights.clone(),
            max_segment_length: self.max_segment_length,
            timer: StepTimer::default(),
        }
    }
}

/// Longest connected segment, falling back to a unit length.
pub fn max_segment_length(node: NodeId, topology: &dyn Topology) -> f32 {
    topology
        .connected_segments(node)
        .into_iter()
        .filter_map(|segment| topology.segment_length(segment))
        .filter(|length| *length > 0.0)
        .fold(None, |acc: Option<f32>, length| {
            Some(acc.map_or(length, |m| m.max(length)))
        })
        .unwrap_or(FALLBACK_SEGMENT_LENGTH)
}
