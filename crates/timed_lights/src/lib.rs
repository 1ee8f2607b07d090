//! Adaptive timed traffic-light programs.
//!
//! An intersection runs a [`program::TimedProgram`]: a cyclic list of
//! [`phase_step::PhaseStep`]s, each holding one light configuration for a
//! duration between its minimum and maximum time. Between those bounds the step
//! ends early once the smoothed queue ("wait") outweighs the smoothed traffic
//! actually moving through the green signals ("flow").
//!
//! Several intersections can share one program. One of them is the master and
//! owns the clock and the metric smoothing; the others render their own light
//! layouts but ask the master for every timing decision.

use bevy::prelude::*;
use std::collections::BTreeMap;

pub mod config;
pub mod error;
pub mod flow_wait;
pub mod interpolation;
pub mod params;
pub mod phase_step;
pub mod program;
pub mod segment_lights;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

pub use program::{TimedLightsPlugin, TimedLightsRegistry};

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// A resource stored as one keyed blob in the host's save file.
pub trait Saveable: Resource + Default + Send + Sync + 'static {
    const SAVE_KEY: &'static str;

    /// `None` leaves the key out of the save file.
    fn save_to_bytes(&self) -> Option<Vec<u8>>;

    fn load_from_bytes(bytes: &[u8]) -> Self;
}

/// Corrupt or truncated blobs load as `T::default()`.
pub fn decode_or_warn<T: bitcode::DecodeOwned + Default>(key: &str, bytes: &[u8]) -> T {
    bitcode::decode(bytes).unwrap_or_else(|e| {
        warn!("{}: cannot decode {} bytes ({}), using defaults", key, bytes.len(), e);
        T::default()
    })
}

pub type SaveFn = Box<dyn Fn(&World) -> Option<Vec<u8>> + Send + Sync>;
pub type LoadFn = Box<dyn Fn(&mut World, &[u8]) + Send + Sync>;

pub struct SaveableEntry {
    pub key: String,
    pub save_fn: SaveFn,
    pub load_fn: LoadFn,
}

/// Every [`Saveable`] the timed-light plugin owns, keyed by `SAVE_KEY`.
#[derive(Resource, Default)]
pub struct SaveableRegistry {
    pub entries: Vec<SaveableEntry>,
}

impl SaveableRegistry {
    pub fn register<T: Saveable>(&mut self) {
        if self.entries.iter().any(|e| e.key == T::SAVE_KEY) {
            warn!("{} registered twice, keeping the first", T::SAVE_KEY);
            return;
        }
        self.entries.push(SaveableEntry {
            key: T::SAVE_KEY.to_string(),
            save_fn: Box::new(|world: &World| world.get_resource::<T>()?.save_to_bytes()),
            load_fn: Box::new(|world: &mut World, bytes: &[u8]| {
                world.insert_resource(T::load_from_bytes(bytes));
            }),
        });
    }

    pub fn save_all(&self, world: &World) -> BTreeMap<String, Vec<u8>> {
        self.entries
            .iter()
            .filter_map(|entry| Some((entry.key.clone(), (entry.save_fn)(world)?)))
            .collect()
    }

    /// Keys missing from `blobs` leave their resource as it is.
    pub fn load_all(&self, world: &mut World, blobs: &BTreeMap<String, Vec<u8>>) {
        for entry in &self.entries {
            if let Some(bytes) = blobs.get(&entry.key) {
                (entry.load_fn)(world, bytes);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Raw simulation frame counter, incremented once per `FixedUpdate`.
///
/// Timed lights work in coarser tick units, see
/// [`params::TimedLightsParams::tick_unit`].
#[derive(Resource, Default)]
pub struct TickCounter(pub u64);

pub fn advance_tick_counter(mut tick: ResMut<TickCounter>) {
    tick.0 = tick.0.wrapping_add(1);
}
