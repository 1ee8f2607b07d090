//! Step editing through the registry.
//!
//! Removing and reordering steps applies to every member of a group so all
//! members keep the same number of steps in the same order. Adding steps only
//! works on standalone programs, since a new step needs a layout for each
//! member.

use bevy::prelude::*;

use crate::error::ProgramError;
use crate::phase_step::PhaseStep;
use crate::services::{LiveLightStore, NodeId, Topology};

use super::registry::TimedLightsRegistry;
use super::types::TimedProgram;

impl TimedLightsRegistry {
    fn standalone_mut(&mut self, node: NodeId) -> Result<&mut TimedProgram, ProgramError> {
        let program = self
            .programs
            .get_mut(&node)
            .ok_or(ProgramError::NoProgram(node))?;
        if program.node_group.len() > 1 {
            return Err(ProgramError::Grouped(node));
        }
        Ok(program)
    }

    fn group_of(&self, node: NodeId) -> Result<Vec<NodeId>, ProgramError> {
        let master = self.master_of(node)?;
        Ok(self.programs[&master].node_group.clone())
    }

    /// Append a step to a standalone program. Returns its index.
    pub fn add_step(&mut self, node: NodeId, step: PhaseStep) -> Result<usize, ProgramError> {
        Ok(self.standalone_mut(node)?.add_step(step))
    }

    /// Insert an editable copy of step `index` right after it.
    pub fn duplicate_step(&mut self, node: NodeId, index: usize) -> Result<usize, ProgramError> {
        let program = self.standalone_mut(node)?;
        let copy = program
            .step(index)
            .ok_or(ProgramError::StepOutOfRange {
                index,
                len: program.num_steps(),
            })?
            .duplicate();
        program.insert_step(index + 1, copy)?;
        Ok(index + 1)
    }

    /// Remove step `index` from every member of the group containing `node`.
    pub fn remove_step(&mut self, node: NodeId, index: usize) -> Result<(), ProgramError> {
        let group = self.group_of(node)?;
        self.check_group_index(&group, index)?;
        for member in group {
            if let Some(program) = self.programs.get_mut(&member) {
                program.remove_step(index)?;
            }
        }
        Ok(())
    }

    pub fn move_step_up(&mut self, node: NodeId, index: usize) -> Result<(), ProgramError> {
        let group = self.group_of(node)?;
        self.check_group_index(&group, index)?;
        for member in group {
            if let Some(program) = self.programs.get_mut(&member) {
                program.move_step_up(index)?;
            }
        }
        Ok(())
    }

    pub fn move_step_down(&mut self, node: NodeId, index: usize) -> Result<(), ProgramError> {
        let group = self.group_of(node)?;
        self.check_group_index(&group, index)?;
        for member in group {
            if let Some(program) = self.programs.get_mut(&member) {
                program.move_step_down(index)?;
            }
        }
        Ok(())
    }

    /// Validate up front so a failing edit leaves the whole group untouched.
    fn check_group_index(&self, group: &[NodeId], index: usize) -> Result<(), ProgramError> {
        for member in group {
            if let Some(program) = self.get(*member) {
                if index >= program.num_steps() {
                    return Err(ProgramError::StepOutOfRange {
                        index,
                        len: program.num_steps(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Overwrite step `index` at `node` with what the intersection displays now.
    pub fn update_step_from_live(
        &mut self,
        node: NodeId,
        index: usize,
        topology: &dyn Topology,
        store: &mut dyn LiveLightStore,
    ) -> Result<(), ProgramError> {
        let program = self
            .programs
            .get_mut(&node)
            .ok_or(ProgramError::NoProgram(node))?;
        let len = program.num_steps();
        let step = program
            .step_mut(index)
            .ok_or(ProgramError::StepOutOfRange { index, len })?;
        step.update_from_live(node, topology, store);
        step.refresh_max_segment_length(node, topology);
        debug!(
            "Timed lights: step {} at {:?} captured {} segments",
            index,
            node,
            step.segment_lights.len()
        );
        Ok(())
    }
}
