//! Error types for timed traffic lights.
//!
//! None of these are fatal to the host simulation. Estimate failures end the
//! current phase early, render failures skip one segment for one tick, and
//! program errors are returned to whoever issued the command.

use crate::services::{NodeId, SegmentId};

/// Rejected step configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StepConfigError {
    #[error("minimum time {min_time} exceeds maximum time {max_time}")]
    InvertedBounds { min_time: u32, max_time: u32 },

    #[error("wait/flow balance must be positive and finite, got {0}")]
    InvalidBalance(f32),
}

/// Failed program command or query.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProgramError {
    #[error("node {0:?} has no timed program")]
    NoProgram(NodeId),

    #[error("program at node {0:?} has no steps")]
    NoSteps(NodeId),

    #[error("step index {index} out of range for {len} steps")]
    StepOutOfRange { index: usize, len: usize },

    #[error("node {0:?} is a slave; only the master drives the program")]
    NotMaster(NodeId),

    #[error("node {node:?} points at master {master:?}, which has no program")]
    MasterMissing { node: NodeId, master: NodeId },

    #[error("node {0:?} already belongs to a synchronized group")]
    AlreadyGrouped(NodeId),

    #[error("node {0:?} is part of a synchronized group; unlink it before changing its steps")]
    Grouped(NodeId),

    #[error("node {node:?} has {found} steps, master has {expected}")]
    StepCountMismatch {
        node: NodeId,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    InvalidStep(#[from] StepConfigError),
}

/// Flow/wait sampling could not produce a comparable measurement.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EstimateError {
    #[error("master {0:?} has no timed program")]
    NoProgram(NodeId),

    #[error("master {master:?} has no step {step}")]
    NoStep { master: NodeId, step: usize },

    #[error("no usable geometry or vehicle data for step {step} of group led by {master:?}")]
    NoData { master: NodeId, step: usize },
}

/// A single segment could not be rendered this tick.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("segment {segment:?} is missing from the previous step")]
    MissingInPrevious { segment: SegmentId },

    #[error("segment {segment:?} is missing from the next step")]
    MissingInNext { segment: SegmentId },

    #[error("segment {segment:?} has no live light simulation at node {node:?}")]
    NoLiveLights { node: NodeId, segment: SegmentId },

    #[error("segment {segment:?} is no longer connected to node {node:?}")]
    Disconnected { node: NodeId, segment: SegmentId },
}
