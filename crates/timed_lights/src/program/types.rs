//! Program and role data structures.

use crate::error::ProgramError;
use crate::phase_step::{PhaseStep, StepTimer};
use crate::services::NodeId;

/// Sequencing state, held only by a master.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sequence {
    pub(crate) current_step: usize,
    pub(crate) started: bool,
}

impl Sequence {
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

/// Timing role of an intersection inside its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Owns the clock; a standalone intersection is the master of a group of one.
    Master(Sequence),
    /// Delegates every timing query to the master's active step.
    Slave { master: NodeId },
}

/// Cyclic list of phases for one intersection.
#[derive(Debug)]
pub struct TimedProgram {
    node: NodeId,
    pub(crate) role: Role,
    /// Members of the synchronized group, master first.
    pub(crate) node_group: Vec<NodeId>,
    pub(crate) steps: Vec<PhaseStep>,
}

impl TimedProgram {
    /// A standalone (master-of-one) program, not started.
    pub fn new(node: NodeId, steps: Vec<PhaseStep>) -> Self {
        Self {
            node,
            role: Role::Master(Sequence::default()),
            node_group: vec![node],
            steps,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_master(&self) -> bool {
        matches!(self.role, Role::Master(_))
    }

    /// The node whose clock governs this program.
    pub fn master_id(&self) -> NodeId {
        match self.role {
            Role::Master(_) => self.node,
            Role::Slave { master } => master,
        }
    }

    pub fn node_group(&self) -> &[NodeId] {
        &self.node_group
    }

    pub fn steps(&self) -> &[PhaseStep] {
        &self.steps
    }

    pub fn num_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn step(&self, index: usize) -> Option<&PhaseStep> {
        self.steps.get(index)
    }

    pub fn step_mut(&mut self, index: usize) -> Option<&mut PhaseStep> {
        self.steps.get_mut(index)
    }

    /// Cyclic predecessor; a single step is its own neighbor.
    pub fn prev_index(&self, index: usize) -> usize {
        let len = self.steps.len().max(1);
        (index + len - 1) % len
    }

    /// Cyclic successor; a single step is its own neighbor.
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.steps.len().max(1)
    }

    pub fn add_step(&mut self, step: PhaseStep) -> usize {
        self.steps.push(step);
        self.steps.len() - 1
    }

    /// Insert a step at `index`, shifting later steps (and the active index) up.
    pub fn insert_step(&mut self, index: usize, step: PhaseStep) -> Result<(), ProgramError> {
        if index > self.steps.len() {
            return Err(ProgramError::StepOutOfRange {
                index,
                len: self.steps.len(),
            });
        }
        self.steps.insert(index, step);
        if let Role::Master(seq) = &mut self.role {
            if self.steps.len() > 1 && seq.current_step >= index {
                seq.current_step += 1;
            }
        }
        Ok(())
    }

    /// Remove a step, keeping the active index pointing at a valid step.
    pub fn remove_step(&mut self, index: usize) -> Result<PhaseStep, ProgramError> {
        self.check_index(index)?;
        let removed = self.steps.remove(index);
        if let Role::Master(seq) = &mut self.role {
            if seq.current_step > index {
                seq.current_step -= 1;
            } else if seq.current_step == index {
                // The active step is gone; its successor takes its place unstarted.
                if seq.current_step >= self.steps.len() {
                    seq.current_step = 0;
                }
                match self.steps.get_mut(seq.current_step) {
                    Some(successor) => successor.timer = StepTimer::default(),
                    None => seq.started = false,
                }
            }
        }
        Ok(removed)
    }

    /// Swap a step with its predecessor.
    pub fn move_step_up(&mut self, index: usize) -> Result<(), ProgramError> {
        self.check_index(index)?;
        if index > 0 {
            self.swap_steps(index, index - 1);
        }
        Ok(())
    }

    /// Swap a step with its successor.
    pub fn move_step_down(&mut self, index: usize) -> Result<(), ProgramError> {
        self.check_index(index)?;
        if index + 1 < self.steps.len() {
            self.swap_steps(index, index + 1);
        }
        Ok(())
    }

    fn swap_steps(&mut self, a: usize, b: usize) {
        self.steps.swap(a, b);
        if let Role::Master(seq) = &mut self.role {
            if seq.current_step == a {
                seq.current_step = b;
            } else if seq.current_step == b {
                seq.current_step = a;
            }
        }
    }

    fn check_index(&self, index: usize) -> Result<(), ProgramError> {
        if index < self.steps.len() {
            Ok(())
        } else {
            Err(ProgramError::StepOutOfRange {
                index,
                len: self.steps.len(),
            })
        }
    }

    pub(crate) fn sequence(&self) -> Option<&Sequence> {
        match &self.role {
            Role::Master(seq) => Some(seq),
            Role::Slave { .. } => None,
        }
    }

    pub(crate) fn sequence_mut(&mut self) -> Option<&mut Sequence> {
        match &mut self.role {
            Role::Master(seq) => Some(seq),
            Role::Slave { .. } => None,
        }
    }
}
