/// Raw simulation frames per timed-light tick unit.
pub const FRAMES_PER_TICK_UNIT: u64 = 64;

/// Weight kept from the previous smoothed flow/wait value on each sample.
pub const SMOOTHING_HISTORY_WEIGHT: f32 = 0.1;
/// Weight given to the new raw flow/wait sample.
pub const SMOOTHING_SAMPLE_WEIGHT: f32 = 0.9;

/// Flow divisor for newly authored steps. Values below 1 inflate the flow
/// metric, which keeps a phase green for longer.
pub const DEFAULT_WAIT_FLOW_BALANCE: f32 = 0.8;

/// Default step bounds (tick units) for steps authored from live lights.
pub const DEFAULT_MIN_TIME: u32 = 5;
pub const DEFAULT_MAX_TIME: u32 = 30;

/// Normalization length used when an intersection has no measurable segments.
pub const FALLBACK_SEGMENT_LENGTH: f32 = 1.0;
