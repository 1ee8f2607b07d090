//! Timed programs, master/slave synchronization and the tick system.
//!
//! Every intersection with timed lights owns a [`TimedProgram`] in the
//! [`TimedLightsRegistry`]. Intersections that run in lockstep form a group:
//! the master carries the [`Sequence`] (active index, started flag) and the
//! running step timers; each slave only records its master's id and keeps its
//! own light layouts. All timing queries on a slave are answered by the
//! master's active step.

pub mod editing;
pub mod plugin;
pub mod registry;
pub mod save;
pub mod sequencer;
pub mod systems;
pub mod types;


pub use plugin::TimedLightsPlugin;
pub use registry::TimedLightsRegistry;
pub use sequencer::TickSummary;
pub use systems::simulate_timed_lights;
pub use types::*;
