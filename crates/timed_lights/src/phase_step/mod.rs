//! One phase of a timed program.
//!
//! A [`PhaseStep`] pairs an authored light layout with the running timer of
//! its current activation. The timer moves through [`StepState`]:
//!
//! `Pending -> Active -> MinTimeReached -> EndTransition -> EndTransitionComplete`
//!
//! Between the minimum and maximum time the step samples flow and wait once
//! per tick and ends as soon as the smoothed wait exceeds the smoothed flow.

pub mod decision;
pub mod render;
pub mod types;


pub use render::RenderReport;
pub use types::*;
