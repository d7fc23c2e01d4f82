//! Engine-owned statistics and flag structures exchanged with the
//! scheduler.
//!
//! The scheduler reads increment statistics out of [`CycleState`] and
//! writes back only the documented flags. All timestamps are microsecond
//! readings of the engine's hires clock; scan times are summed across GC
//! threads.

/// Statistics for one marking increment (a global mark increment, or the
/// mark portion of a mark-sweep-compact partial collection).
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkStats {
    pub bytes_scanned: usize,
    pub bytes_card_clean: usize,
    /// Total time all threads spent scanning, in microseconds.
    pub scan_time_us: u64,
    pub start_time: u64,
    pub end_time: u64,
}

/// Statistics for one copy-forward partial collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyForwardStats {
    /// The copy-forward ran out of survivor space and fell back to
    /// in-place collection.
    pub aborted: bool,
    pub eden_evacuate_region_count: usize,
    pub non_eden_evacuate_region_count: usize,
    pub eden_survivor_region_count: usize,
    pub non_eden_survivor_region_count: usize,
    /// Bytes left unevacuated in Eden when the copy-forward aborted.
    pub scan_bytes_eden: usize,
    /// Bytes left unevacuated outside Eden when the copy-forward aborted.
    pub scan_bytes_non_eden: usize,
    pub scan_bytes_total: usize,
    pub bytes_card_clean: usize,
    pub copy_bytes_total: usize,
    pub copy_discard_bytes_total: usize,
    /// Bytes moved by external compaction during this increment.
    pub external_compact_bytes: usize,
    /// Survivor regions recorded by the engine for this collection.
    pub survivor_set_region_count: usize,
    pub start_time: u64,
    pub end_time: u64,
    /// Time spent clearing region references, in microseconds. Excluded
    /// from the copy-forward throughput measurement.
    pub clear_from_region_references_time_us: u64,
}

/// Statistics for the concurrent portion of a global mark phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcurrentMarkStats {
    pub bytes_scanned: usize,
    /// Total work time across concurrent mark workers, in nanoseconds.
    pub total_work_time_ns: u64,
}

/// Per-increment statistics, tagged by the kind of collection that
/// produced them.
#[derive(Debug, Clone, Copy)]
pub enum IncrementStats {
    PgcCopyForward(CopyForwardStats),
    PgcMarkSweepCompact(MarkStats),
    Gmp(MarkStats),
}

impl IncrementStats {
    /// Bytes that count as scan work for the rate estimator, and the time
    /// spent producing them.
    pub fn scan_work(&self) -> (usize, u64) {
        match self {
            IncrementStats::PgcCopyForward(cf) => {
                let elapsed = cf.end_time.saturating_sub(cf.start_time);
                (cf.scan_bytes_total + cf.bytes_card_clean, elapsed)
            }
            IncrementStats::PgcMarkSweepCompact(mark) | IncrementStats::Gmp(mark) => {
                (mark.bytes_scanned + mark.bytes_card_clean, mark.scan_time_us)
            }
        }
    }
}

/// Whole-cycle statistics reported when a global mark phase completes.
#[derive(Debug, Clone, Copy, Default)]
pub struct GmpCycleStats {
    /// Mark statistics accumulated across all increments of the cycle.
    pub incremental_mark: MarkStats,
    /// Statistics for concurrent marking performed between increments.
    pub concurrent_mark: ConcurrentMarkStats,
}

/// Why the next partial collection was forced to mark-sweep-compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkCompactReason {
    #[default]
    None,
    /// No scan-rate history exists yet; a mark-sweep-compact collection is
    /// needed to calibrate the estimator.
    Calibration,
}

/// The slice of the engine's cycle state the scheduler reads and writes.
#[derive(Debug, Clone, Copy)]
pub struct CycleState {
    pub increment_stats: IncrementStats,
    /// Set by the scheduler: the next partial collection should evacuate
    /// by copying.
    pub should_run_copy_forward: bool,
    /// Set by the scheduler alongside forcing `should_run_copy_forward`
    /// off.
    pub reason_for_mark_compact_pgc: MarkCompactReason,
}

impl CycleState {
    pub fn new(increment_stats: IncrementStats) -> Self {
        CycleState {
            increment_stats,
            should_run_copy_forward: true,
            reason_for_mark_compact_pgc: MarkCompactReason::None,
        }
    }
}

/// Hints handed to the heap-resizing logic after each partial collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapSizingData {
    /// Total GMP work time in microseconds (never 0 once published).
    pub gmp_time: u64,
    pub pgc_count_since_gmp_end: usize,
    pub avg_pgc_time_us: u64,
    /// Average mutator interval between the end of one partial collection
    /// and the start of the next, in microseconds.
    pub avg_pgc_interval_us: u64,
    /// Bytes reserved for Eden plus the projected survivor set.
    pub reserved_size: usize,
    /// Free tenure estimate. Written by the engine right before a partial
    /// collection begins; the scheduler leaves it untouched.
    pub free_tenure: usize,
}
