/// log2 of the number of bytes in a kilobyte
pub const LOG_BYTES_IN_KBYTE: u8 = 10;
/// The number of bytes in a kilobyte
pub const BYTES_IN_KBYTE: usize = 1 << LOG_BYTES_IN_KBYTE;

/// log2 of the number of bytes in a megabyte
pub const LOG_BYTES_IN_MBYTE: u8 = 20;
/// The number of bytes in a megabyte
pub const BYTES_IN_MBYTE: usize = 1 << LOG_BYTES_IN_MBYTE;

/// The smallest pause a partial collection is assumed to take, in
/// milliseconds. The pause model is anchored at
/// (`MINIMUM_EDEN_REGIONS`, `MINIMUM_PGC_TIME_MS`) and predictions are
/// floored here.
pub const MINIMUM_PGC_TIME_MS: u64 = 5;

/// Eden never shrinks below a single region.
pub const MINIMUM_EDEN_REGIONS: usize = 1;

/// How many partial collections pass between re-evaluations of the
/// recommended Eden size when the heap is fully expanded. Kept a power of
/// two so the modulus reduces to a mask.
pub const CONSECUTIVE_PGC_TO_CHANGE_EDEN: usize = 16;

/// Starting value for the dynamic global mark increment time before any
/// partial collection has been timed.
pub const INITIAL_GLOBAL_MARK_INCREMENT_MILLIS: usize = 50;

/// Assumed partial-collection overhead before the first interval sample.
pub const INITIAL_PARTIAL_GC_OVERHEAD: f64 = 0.07;

/// Initial coupling between Eden size and partial-collection pause time.
/// Values close to 1.0 mean growing Eden is expected to grow the pause
/// almost directly; the model refits this after every partial collection.
pub const INITIAL_PGC_TIME_INCREASE_PER_EDEN_REGION_FACTOR: f64 = 1.0001;

/// Ideal Eden is clamped to this share of the managed heap unless the user
/// supplied explicit Eden bounds.
pub const MAX_EDEN_PERCENT: f64 = 0.75;
/// Lower clamp counterpart of [`MAX_EDEN_PERCENT`].
pub const MIN_EDEN_PERCENT: f64 = 0.01;

/// Emptiness a region must exceed to be worth defragmenting when the
/// automatic threshold is enabled and no better estimate exists yet.
pub const AUTOMATIC_DEFRAGMENT_EMPTINESS_THRESHOLD: f64 = 0.05;

/// Pause samples above this are assumed to come from a clock that stepped
/// backwards or jumped; they are discarded rather than averaged.
pub const PGC_TIME_SANITY_CAP_MS: u64 = u32::MAX as u64;

/// Cap applied to interval measurements (one week in microseconds). Far
/// beyond any real collection interval, so only clock anomalies hit it.
pub const INTERVAL_SANITY_CAP_US: u64 = 7 * 24 * 3600 * 1_000_000;
