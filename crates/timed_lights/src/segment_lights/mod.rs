//! Per-segment light configuration.
//!
//! A [`SegmentLights`] describes what one road segment shows at an
//! intersection: one [`SignalGroup`] per vehicle class, an optional pedestrian
//! signal, and which class each lane belongs to. Phase steps store one of these
//! per segment, and the live light store holds the currently displayed copy.

pub mod types;

#[cfg(test)]
mod tests;

pub use types::*;
