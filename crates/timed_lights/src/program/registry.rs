//! Storage of all timed programs plus master/slave delegation.

use bevy::prelude::*;
use std::collections::BTreeMap;

use crate::error::ProgramError;
use crate::flow_wait::FlowWaitEstimator;
use crate::params::TimedLightsParams;
use crate::phase_step::{PhaseStep, StepState};
use crate::services::{LiveLightStore, NodeId, Topology};

use super::types::{Role, Sequence, TimedProgram};

/// Every intersection's timed program, keyed by node.
#[derive(Resource, Default, Debug)]
pub struct TimedLightsRegistry {
    pub(crate) programs: BTreeMap<NodeId, TimedProgram>,
}

impl TimedLightsRegistry {
    pub fn get(&self, node: NodeId) -> Option<&TimedProgram> {
        self.programs.get(&node)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut TimedProgram> {
        self.programs.get_mut(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.programs.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimedProgram> {
        self.programs.values()
    }

    /// Install a standalone program, replacing (and ungrouping) any previous one.
    pub fn insert(&mut self, program: TimedProgram) {
        let node = program.node();
        if self.contains(node) {
            self.remove_program(node);
        }
        info!(
            "Timed lights: program with {} steps installed at {:?}",
            program.num_steps(),
            node
        );
        self.programs.insert(node, program);
    }

    /// Author a new program at `node` whose single step captures the lights
    /// the intersection currently displays.
    pub fn create_from_live(
        &mut self,
        node: NodeId,
        min_time: u32,
        max_time: u32,
        wait_flow_balance: f32,
        topology: &dyn Topology,
        store: &mut dyn LiveLightStore,
    ) -> Result<(), ProgramError> {
        let step = PhaseStep::from_live(node, min_time, max_time, wait_flow_balance, topology, store)?;
        self.insert(TimedProgram::new(node, vec![step]));
        Ok(())
    }

    /// [`create_from_live`](Self::create_from_live) with the default step
    /// bounds and balance from `params`.
    pub fn create_default_from_live(
        &mut self,
        node: NodeId,
        params: &TimedLightsParams,
        topology: &dyn Topology,
        store: &mut dyn LiveLightStore,
    ) -> Result<(), ProgramError> {
        self.create_from_live(
            node,
            params.default_min_time,
            params.default_max_time,
            params.default_wait_flow_balance,
            topology,
            store,
        )
    }

    /// Delete the program at `node`. If it was part of a group, the group is
    /// dissolved first so no slave is left pointing at a missing master.
    pub fn remove_program(&mut self, node: NodeId) -> Option<TimedProgram> {
        if self.programs.get(&node)?.node_group.len() > 1 {
            if let Err(err) = self.unlink(node, None) {
                warn!("Timed lights: could not dissolve group of {:?}: {}", node, err);
            }
        }
        self.programs.remove(&node)
    }

    // -----------------------------------------------------------------------
    // Groups
    // -----------------------------------------------------------------------

    /// Synchronize `members` with `master`.
    ///
    /// All programs must exist, be standalone, and have the master's number
    /// of steps. The master's step bounds and balance are copied to the
    /// members so the shared timing is what every member was authored with.
    pub fn link_group(&mut self, master: NodeId, members: &[NodeId]) -> Result<(), ProgramError> {
        let master_program = self.get(master).ok_or(ProgramError::NoProgram(master))?;
        if master_program.node_group.len() > 1 {
            return Err(ProgramError::AlreadyGrouped(master));
        }
        let expected = master_program.num_steps();
        let timings: Vec<(u32, u32, f32)> = master_program
            .steps
            .iter()
            .map(|s| (s.min_time(), s.max_time(), s.wait_flow_balance()))
            .collect();

        for &member in members.iter().filter(|&&m| m != master) {
            let program = self.get(member).ok_or(ProgramError::NoProgram(member))?;
            if program.node_group.len() > 1 {
                return Err(ProgramError::AlreadyGrouped(member));
            }
            if program.num_steps() != expected {
                return Err(ProgramError::StepCountMismatch {
                    node: member,
                    expected,
                    found: program.num_steps(),
                });
            }
        }

        let mut group = vec![master];
        for &member in members {
            if !group.contains(&member) {
                group.push(member);
            }
        }

        for &member in &group[1..] {
            if let Some(program) = self.programs.get_mut(&member) {
                for (step, &(min, max, balance)) in program.steps.iter_mut().zip(&timings) {
                    step.set_bounds(min, max)?;
                    step.set_wait_flow_balance(balance)?;
                    step.timer = Default::default();
                }
                program.role = Role::Slave { master };
                program.node_group = group.clone();
            }
        }
        if let Some(program) = self.programs.get_mut(&master) {
            program.node_group = group.clone();
        }
        info!(
            "Timed lights: {:?} now drives {} synchronized intersections",
            master,
            group.len()
        );
        Ok(())
    }

    /// Dissolve the group containing `node`.
    ///
    /// Every former slave becomes a standalone master continuing at the
    /// group's active step and started state. When `now` is given, started
    /// former slaves begin their step at `now`; otherwise they start on their
    /// next tick.
    pub fn unlink(&mut self, node: NodeId, now: Option<u64>) -> Result<(), ProgramError> {
        let master = self.master_of(node)?;
        let group = self.programs[&master].node_group.clone();
        let seq = self.programs[&master]
            .sequence()
            .copied()
            .unwrap_or_default();

        for member in group {
            let Some(program) = self.programs.get_mut(&member) else {
                continue;
            };
            program.node_group = vec![member];
            if member == master {
                continue;
            }
            let current_step = seq.current_step.min(program.num_steps().saturating_sub(1));
            program.role = Role::Master(Sequence {
                current_step,
                started: seq.started && !program.steps.is_empty(),
            });
            if let (Some(now), true) = (now, seq.started) {
                if let Some(step) = program.steps.get_mut(current_step) {
                    step.start(now);
                }
            }
        }
        Ok(())
    }

    /// Node whose clock governs `node`.
    pub fn master_of(&self, node: NodeId) -> Result<NodeId, ProgramError> {
        let program = self.get(node).ok_or(ProgramError::NoProgram(node))?;
        let master = program.master_id();
        if master != node && !self.contains(master) {
            return Err(ProgramError::MasterMissing { node, master });
        }
        Ok(master)
    }

    pub(super) fn master_sequence(&self, node: NodeId) -> Result<(NodeId, Sequence), ProgramError> {
        let master = self.master_of(node)?;
        let seq = self.programs[&master]
            .sequence()
            .copied()
            .ok_or(ProgramError::MasterMissing { node, master })?;
        Ok((master, seq))
    }

    // -----------------------------------------------------------------------
    // Delegated timing queries
    // -----------------------------------------------------------------------

    pub fn is_started(&self, node: NodeId) -> Result<bool, ProgramError> {
        Ok(self.master_sequence(node)?.1.started)
    }

    /// Active step index, as seen by the master.
    pub fn current_step(&self, node: NodeId) -> Result<usize, ProgramError> {
        Ok(self.master_sequence(node)?.1.current_step)
    }

    /// The master's active step: the one whose timer answers for the group.
    pub fn timing_step(&self, node: NodeId) -> Result<&PhaseStep, ProgramError> {
        let (master, seq) = self.master_sequence(node)?;
        let program = &self.programs[&master];
        program.step(seq.current_step).ok_or(ProgramError::NoSteps(master))
    }

    pub(super) fn timing_step_mut(&mut self, node: NodeId) -> Result<&mut PhaseStep, ProgramError> {
        let (master, seq) = self.master_sequence(node)?;
        self.programs
            .get_mut(&master)
            .and_then(|p| p.step_mut(seq.current_step))
            .ok_or(ProgramError::NoSteps(master))
    }

    /// Whether the group's active step is done at `now`.
    ///
    /// With `evaluate` the decision is latched on the master's step (metric
    /// smoothing, done flag); without it nothing is modified.
    pub fn is_done(
        &mut self,
        node: NodeId,
        now: u64,
        evaluate: bool,
        estimator: &FlowWaitEstimator<'_>,
    ) -> Result<bool, ProgramError> {
        let (master, seq) = self.master_sequence(node)?;
        let sample = {
            let step = self.timing_step(node)?;
            step.needs_sample(now)
                .then(|| estimator.estimate(self, master, seq.current_step))
        };
        Ok(self.timing_step_mut(node)?.decide(now, evaluate, sample))
    }

    /// Restart the group's active step at `now`.
    pub fn start_step(&mut self, node: NodeId, now: u64) -> Result<(), ProgramError> {
        self.timing_step_mut(node)?.start(now);
        Ok(())
    }

    pub fn remaining_min_time(&self, node: NodeId, now: u64) -> Result<u64, ProgramError> {
        Ok(self.timing_step(node)?.remaining_min_time(now))
    }

    pub fn remaining_max_time(&self, node: NodeId, now: u64) -> Result<u64, ProgramError> {
        Ok(self.timing_step(node)?.remaining_max_time(now))
    }

    pub fn is_in_start_transition(&self, node: NodeId, now: u64) -> Result<bool, ProgramError> {
        Ok(self.timing_step(node)?.is_in_start_transition(now))
    }

    pub fn is_in_end_transition(&self, node: NodeId, now: u64) -> Result<bool, ProgramError> {
        Ok(self.timing_step(node)?.is_in_end_transition(now))
    }

    pub fn is_end_transition_complete(&self, node: NodeId, now: u64) -> Result<bool, ProgramError> {
        Ok(self.timing_step(node)?.is_end_transition_complete(now))
    }

    pub fn step_state(&self, node: NodeId, now: u64) -> Result<StepState, ProgramError> {
        Ok(self.timing_step(node)?.state(now))
    }

    pub fn ticks_until_change(&self, node: NodeId, now: u64) -> Result<u64, ProgramError> {
        Ok(self.timing_step(node)?.ticks_until_change(now))
    }
}
