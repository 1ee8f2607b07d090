//! Starting, stopping and advancing programs, and rendering the active step.

use bevy::prelude::*;

use crate::error::ProgramError;
use crate::flow_wait::FlowWaitEstimator;
use crate::phase_step::{RenderReport, StepTimer};
use crate::services::{LiveLightStore, NodeId, Topology};

use super::registry::TimedLightsRegistry;

/// What one call to [`TimedLightsRegistry::tick`] did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    /// Started masters that were processed.
    pub programs: usize,
    /// Masters that moved on to their next step.
    pub advanced: usize,
    pub rendered_segments: usize,
    pub skipped_segments: usize,
    /// Programs or group members that could not be processed at all.
    pub failed: usize,
}

impl TimedLightsRegistry {
    /// Start the group containing `node` at its first step.
    pub fn start(&mut self, node: NodeId, now: u64) -> Result<(), ProgramError> {
        let master = self.master_of(node)?;
        let program = self
            .programs
            .get_mut(&master)
            .ok_or(ProgramError::NoProgram(master))?;
        if program.steps.is_empty() {
            return Err(ProgramError::NoSteps(master));
        }
        let seq = program
            .sequence_mut()
            .ok_or(ProgramError::MasterMissing { node, master })?;
        seq.current_step = 0;
        seq.started = true;
        program.steps[0].start(now);
        info!("Timed lights: program at {:?} started", master);
        Ok(())
    }

    /// Stop the group containing `node`. Step timers are reset; the layouts
    /// stay as authored.
    pub fn stop(&mut self, node: NodeId) -> Result<(), ProgramError> {
        let master = self.master_of(node)?;
        let program = self
            .programs
            .get_mut(&master)
            .ok_or(ProgramError::NoProgram(master))?;
        let seq = program
            .sequence_mut()
            .ok_or(ProgramError::MasterMissing { node, master })?;
        seq.started = false;
        for step in &mut program.steps {
            step.timer = Default::default();
        }
        info!("Timed lights: program at {:?} stopped", master);
        Ok(())
    }

    /// Leave the active step right away and start the next one at `now`.
    pub fn skip_step(
        &mut self,
        node: NodeId,
        now: u64,
        topology: &dyn Topology,
    ) -> Result<(), ProgramError> {
        let master = self.master_of(node)?;
        if !self.is_started(master)? {
            return Ok(());
        }
        self.advance(master, now, topology)
    }

    /// Advance `master` to its next step once the active step is done and
    /// its end transition is complete. Returns whether the program advanced.
    ///
    /// A step that has not been started yet (fresh program, restored save)
    /// starts at `now`.
    pub fn advance_if_done(
        &mut self,
        master: NodeId,
        now: u64,
        estimator: &FlowWaitEstimator<'_>,
    ) -> Result<bool, ProgramError> {
        let program = self.get(master).ok_or(ProgramError::NoProgram(master))?;
        let seq = *program.sequence().ok_or(ProgramError::NotMaster(master))?;
        if !seq.started {
            return Ok(false);
        }
        let step = program
            .step(seq.current_step)
            .ok_or(ProgramError::NoSteps(master))?;
        if !step.timer().is_active() {
            self.start_step(master, now)?;
        }

        if !self.is_done(master, now, true, estimator)? {
            return Ok(false);
        }
        if !self.is_end_transition_complete(master, now)? {
            return Ok(false);
        }
        self.advance(master, now, estimator.topology())?;
        Ok(true)
    }

    fn advance(
        &mut self,
        master: NodeId,
        now: u64,
        topology: &dyn Topology,
    ) -> Result<(), ProgramError> {
        let program = self
            .programs
            .get_mut(&master)
            .ok_or(ProgramError::NoProgram(master))?;
        if program.steps.is_empty() {
            return Err(ProgramError::NoSteps(master));
        }
        let current = program
            .sequence()
            .ok_or(ProgramError::NotMaster(master))?
            .current_step;
        let next = program.next_index(current);
        if next != current {
            if let Some(outgoing) = program.steps.get_mut(current) {
                outgoing.timer = StepTimer::default();
            }
        }
        if let Some(seq) = program.sequence_mut() {
            seq.current_step = next;
        }
        program.steps[next].start(now);
        let group = program.node_group.clone();

        for member in group {
            if let Some(step) = self.programs.get_mut(&member).and_then(|p| p.step_mut(next)) {
                step.refresh_max_segment_length(member, topology);
            }
        }
        debug!(
            "Timed lights: {:?} advanced from step {} to {} at tick {}",
            master, current, next, now
        );
        Ok(())
    }

    /// Render the group's active step at `node`.
    ///
    /// Transition flags come from the master; the light layouts (active,
    /// previous and next) come from `node`'s own program.
    pub fn render(
        &self,
        node: NodeId,
        now: u64,
        topology: &dyn Topology,
        store: &mut dyn LiveLightStore,
    ) -> Result<RenderReport, ProgramError> {
        let (_, seq) = self.master_sequence(node)?;
        let flags = self.timing_step(node)?.transition_flags(now);
        let program = self.get(node).ok_or(ProgramError::NoProgram(node))?;
        let index = seq.current_step;
        let out_of_range = ProgramError::StepOutOfRange {
            index,
            len: program.num_steps(),
        };
        let cur = program.step(index).ok_or_else(|| out_of_range.clone())?;
        let prev = program
            .step(program.prev_index(index))
            .ok_or_else(|| out_of_range.clone())?;
        let next = program
            .step(program.next_index(index))
            .ok_or(out_of_range)?;

        if !cur.is_valid(node, topology) {
            warn!(
                "Timed lights at {:?}: step {} lists segments that are no longer connected",
                node, index
            );
        }
        Ok(cur.render(node, prev, next, flags, topology, store))
    }

    /// Run one tick for every started program: decide and advance on the
    /// master, then render every member of its group.
    pub fn tick(
        &mut self,
        now: u64,
        estimator: &FlowWaitEstimator<'_>,
        store: &mut dyn LiveLightStore,
    ) -> TickSummary {
        let mut summary = TickSummary::default();
        let masters: Vec<NodeId> = self
            .programs
            .values()
            .filter(|p| p.sequence().is_some_and(|seq| seq.is_started()))
            .map(|p| p.node())
            .collect();

        for master in masters {
            summary.programs += 1;
            match self.advance_if_done(master, now, estimator) {
                Ok(true) => summary.advanced += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!("Timed lights: program at {:?} not advanced: {}", master, err);
                    summary.failed += 1;
                    continue;
                }
            }

            let group = self.programs[&master].node_group.clone();
            for member in group {
                match self.render(member, now, estimator.topology(), store) {
                    Ok(report) => {
                        summary.rendered_segments += report.rendered;
                        summary.skipped_segments += report.skipped.len();
                    }
                    Err(err) => {
                        warn!("Timed lights: could not render {:?}: {}", member, err);
                        summary.failed += 1;
                    }
                }
            }
        }
        summary
    }
}
