//! Save/load serialization for `TimedLightsRegistry`.
//!
//! Only authored definitions are saved: step bounds, balance, light layouts,
//! group membership and the sequencing position. Running timers and smoothed
//! metrics are transient; a restored program starts its active step on its
//! first tick after loading.

use bevy::prelude::*;

use crate::phase_step::PhaseStep;
use crate::segment_lights::SegmentLights;
use crate::services::{NodeId, SegmentId};
use crate::{decode_or_warn, Saveable};

use super::registry::TimedLightsRegistry;
use super::types::{Role, Sequence, TimedProgram};

#[derive(Debug, Clone, PartialEq, bitcode::Encode, bitcode::Decode)]
struct SavedStep {
    min_time: u32,
    max_time: u32,
    wait_flow_balance: f32,
    segment_lights: Vec<(SegmentId, SegmentLights)>,
}

#[derive(Debug, Clone, PartialEq, bitcode::Encode, bitcode::Decode)]
struct SavedProgram {
    node: NodeId,
    /// `None` for masters.
    master: Option<NodeId>,
    node_group: Vec<NodeId>,
    started: bool,
    current_step: u32,
    steps: Vec<SavedStep>,
}

#[derive(Debug, Default, bitcode::Encode, bitcode::Decode)]
struct SavedRegistry {
    programs: Vec<SavedProgram>,
}

fn save_program(program: &TimedProgram) -> SavedProgram {
    let (master, seq) = match program.role() {
        Role::Master(seq) => (None, seq),
        Role::Slave { master } => (Some(master), Sequence::default()),
    };
    SavedProgram {
        node: program.node(),
        master,
        node_group: program.node_group().to_vec(),
        started: seq.started,
        current_step: seq.current_step as u32,
        steps: program
            .steps()
            .iter()
            .map(|step| SavedStep {
                min_time: step.min_time(),
                max_time: step.max_time(),
                wait_flow_balance: step.wait_flow_balance(),
                segment_lights: step
                    .segment_lights
                    .iter()
                    .map(|(&segment, lights)| (segment, lights.clone()))
                    .collect(),
            })
            .collect(),
    }
}

fn load_program(saved: SavedProgram) -> TimedProgram {
    let mut steps = Vec::with_capacity(saved.steps.len());
    for (index, s) in saved.steps.into_iter().enumerate() {
        match PhaseStep::new(s.min_time, s.max_time, s.wait_flow_balance) {
            Ok(mut step) => {
                step.segment_lights = s.segment_lights.into_iter().collect();
                steps.push(step);
            }
            Err(err) => {
                warn!(
                    "Timed lights: dropping saved step {} at {:?}: {}",
                    index, saved.node, err
                );
            }
        }
    }

    let mut program = TimedProgram::new(saved.node, steps);
    program.role = match saved.master {
        Some(master) if master != saved.node => Role::Slave { master },
        _ => Role::Master(Sequence {
            current_step: (saved.current_step as usize).min(program.num_steps().saturating_sub(1)),
            started: saved.started && program.num_steps() > 0,
        }),
    };
    if saved.node_group.contains(&saved.node) {
        program.node_group = saved.node_group;
    }
    program
}

impl Saveable for TimedLightsRegistry {
    const SAVE_KEY: &'static str = "timed_lights_programs";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if self.programs.is_empty() {
            return None;
        }
        let saved = SavedRegistry {
            programs: self.programs.values().map(save_program).collect(),
        };
        Some(bitcode::encode(&saved))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        let saved: SavedRegistry = decode_or_warn(Self::SAVE_KEY, bytes);
        let mut registry = Self::default();
        for program in saved.programs {
            let program = load_program(program);
            registry.programs.insert(program.node(), program);
        }

        // A slave whose master did not survive becomes standalone.
        let orphans: Vec<NodeId> = registry
            .programs
            .values()
            .filter(|p| !p.is_master() && !registry.programs.contains_key(&p.master_id()))
            .map(|p| p.node())
            .collect();
        for node in orphans {
            warn!("Timed lights: saved master of {:?} is missing, running it standalone", node);
            if let Some(program) = registry.programs.get_mut(&node) {
                program.role = Role::Master(Sequence::default());
                program.node_group = vec![node];
            }
        }
        registry
    }
}
