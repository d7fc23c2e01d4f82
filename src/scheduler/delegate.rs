//! The scheduling facade the collection engine drives.
//!
//! One `SchedulingDelegate` exists per collector instance; the engine
//! invokes its callbacks at stop-the-world and increment boundaries, never
//! concurrently. The callback cycle is:
//!
//! ```text
//! heap_reconfigured*  get_initial_taxation_threshold
//! (  { partial_garbage_collect_started ; partial_garbage_collect_completed }
//!  | { global_mark_cycle_start ; { global_mark_increment_completed }+ ;
//!      global_mark_phase_completed ; global_mark_cycle_end }
//!  | { global_garbage_collect_completed }
//! )*
//! ```
//!
//! with `get_increment_work` and `get_next_taxation_threshold` consulted
//! between increments. Every callback is wait-free; bad samples (clock
//! skew, zero denominators) are discarded and the prior averages stay in
//! place, so no callback has a failure mode the engine must handle.

use std::sync::Arc;

use crate::scheduler::consumption::ConsumptionEstimator;
use crate::scheduler::copy_forward::CopyForwardEstimator;
use crate::scheduler::cycle_stats::{
    CycleState, GmpCycleStats, HeapSizingData, IncrementStats, MarkCompactReason,
};
use crate::scheduler::defragment::DefragmentModel;
use crate::scheduler::eden::{EdenProjection, EdenSizer};
use crate::scheduler::kickoff::GmpKickoffPlanner;
use crate::scheduler::occupancy::HeapOccupancyModel;
use crate::scheduler::scan_rate::ScanRateEstimator;
use crate::scheduler::taxation::TaxationScheduler;
use crate::util::constants::{INITIAL_GLOBAL_MARK_INCREMENT_MILLIS, INITIAL_PARTIAL_GC_OVERHEAD,
    INTERVAL_SANITY_CAP_US, PGC_TIME_SANITY_CAP_MS};
use crate::util::conversions;
use crate::util::heap::region::{HeapView, RegionData};
use crate::util::math;
use crate::util::options::Options;

/// Fraction of the first Eden assumed to survive, seeding the survivor-set
/// average before any copy-forward has run.
const INITIAL_SURVIVOR_SET_EDEN_FRACTION: f64 = 0.3;

/// Mutator threads may be idle while concurrent marking runs, so
/// concurrent work is charged at half weight in the GMP overhead.
const CONCURRENT_WORK_OVERHEAD_WEIGHT: f64 = 0.5;

pub struct SchedulingDelegate {
    options: Arc<Options>,

    taxation: TaxationScheduler,
    scan_rate: ScanRateEstimator,
    consumption: ConsumptionEstimator,
    copy_forward: CopyForwardEstimator,
    occupancy: HeapOccupancyModel,
    defragment: DefragmentModel,
    kickoff: GmpKickoffPlanner,
    eden: EdenSizer,

    partial_gc_start_time: u64,
    average_pgc_interval_us: u64,
    historical_partial_gc_time_ms: u64,
    partial_gc_overhead: f64,
    global_mark_interval_start_time: u64,
    global_mark_increments_total_time_us: u64,
    concurrent_mark_threads_total_work_time_ns: u64,
    global_sweep_time_us: u64,
    total_gmp_work_time_us: u64,
    global_mark_overhead: f64,
    dynamic_global_mark_increment_time_millis: usize,
    historic_incremental_scan_time_per_gmp_us: u64,
    historic_bytes_scanned_concurrently_per_gmp: usize,
    bytes_scanned_in_current_gmp: usize,
    pgc_count_since_gmp_end: usize,

    currently_performing_gmp: bool,
    global_sweep_required: bool,
    disable_copy_forward_during_current_global_mark_phase: bool,
    did_gmp_complete_since_last_reclaim: bool,
    next_pgc_should_copy_forward: bool,
    startup_phase_finished: bool,

    /// Samples discarded because the clock stepped backwards or jumped.
    clock_skew_discard_count: usize,
}

impl SchedulingDelegate {
    pub fn new(options: Arc<Options>) -> Self {
        assert!(*options.threads > 0, "GC thread count must be non-zero");
        let next_pgc_should_copy_forward = *options.tarok_pgc_should_copy_forward;
        let kickoff = GmpKickoffPlanner::new(&options);
        SchedulingDelegate {
            options,
            taxation: TaxationScheduler::new(),
            scan_rate: ScanRateEstimator::new(),
            consumption: ConsumptionEstimator::new(),
            copy_forward: CopyForwardEstimator::new(),
            occupancy: HeapOccupancyModel::new(),
            defragment: DefragmentModel::new(),
            kickoff,
            eden: EdenSizer::new(),
            partial_gc_start_time: 0,
            average_pgc_interval_us: 0,
            historical_partial_gc_time_ms: 0,
            partial_gc_overhead: INITIAL_PARTIAL_GC_OVERHEAD,
            global_mark_interval_start_time: 0,
            global_mark_increments_total_time_us: 0,
            concurrent_mark_threads_total_work_time_ns: 0,
            global_sweep_time_us: 0,
            total_gmp_work_time_us: 0,
            global_mark_overhead: 0.0,
            dynamic_global_mark_increment_time_millis: INITIAL_GLOBAL_MARK_INCREMENT_MILLIS,
            historic_incremental_scan_time_per_gmp_us: 0,
            historic_bytes_scanned_concurrently_per_gmp: 0,
            bytes_scanned_in_current_gmp: 0,
            pgc_count_since_gmp_end: 0,
            currently_performing_gmp: false,
            global_sweep_required: false,
            disable_copy_forward_during_current_global_mark_phase: false,
            did_gmp_complete_since_last_reclaim: false,
            next_pgc_should_copy_forward,
            startup_phase_finished: false,
            clock_skew_discard_count: 0,
        }
    }

    /// The heap was created or resized: re-derive region geometry and the
    /// ideal Eden, then fix the actual Eden.
    pub fn heap_reconfigured(&mut self, heap: &dyn HeapView) {
        self.eden
            .reconfigure(heap, &self.options, self.startup_phase_finished);
    }

    /// The host finished its startup phase; Eden sizing switches from
    /// geometry interpolation to overhead feedback.
    pub fn startup_phase_complete(&mut self) {
        self.startup_phase_finished = true;
    }

    /// Seed the kickoff headroom before the first census has run.
    pub fn initialize_kickoff_headroom(&mut self, heap: &dyn HeapView) {
        self.kickoff.initialize_kickoff_headroom(
            heap.total_heap_size(),
            self.eden.current_eden_size_in_bytes(),
            &self.options,
        );
    }

    /// Reset all taxation and kickoff state and return the first
    /// allocation threshold. `heap_reconfigured` must have run first.
    pub fn get_initial_taxation_threshold(&mut self, heap: &dyn HeapView) -> usize {
        self.taxation.reset(&self.options);
        self.calculate_eden_size(heap);

        // Before any copy-forward has run, assume a survivor set of 30% of
        // the first Eden.
        let initial_survivor_regions = INITIAL_SURVIVOR_SET_EDEN_FRACTION
            * self.eden.current_eden_size_in_bytes() as f64
            / self.eden.region_size() as f64;
        self.copy_forward
            .prime_average_survivor_set_region_count(initial_survivor_regions);

        self.get_next_taxation_threshold()
    }

    /// Allocation budget until the next taxation point, deciding as a side
    /// effect what kind of work runs there.
    pub fn get_next_taxation_threshold(&mut self) -> usize {
        let threshold = self.taxation.next_taxation_threshold(
            self.eden.current_eden_size_in_bytes(),
            self.eden.region_size(),
            &self.options,
        );
        #[cfg(feature = "extreme_assertions")]
        assert!(
            self.taxation.next_increment_is_pgc() ^ self.taxation.next_increment_is_gmp(),
            "taxation must schedule exactly one kind of work"
        );
        threshold
    }

    /// `(do_partial_garbage_collection, do_global_mark_phase)` for the
    /// taxation point just reached. Consumes the decision; a second call
    /// returns `(false, false)`.
    pub fn get_increment_work(&mut self) -> (bool, bool) {
        self.taxation.increment_work()
    }

    /// A global mark cycle is about to begin.
    pub fn global_mark_cycle_start(&mut self, now_us: u64) {
        self.calculate_global_mark_overhead(now_us);

        self.currently_performing_gmp = true;
        // Reset the per-cycle accumulators for increment time and
        // concurrent mark work.
        self.global_mark_increments_total_time_us = 0;
        self.concurrent_mark_threads_total_work_time_ns = 0;
        self.bytes_scanned_in_current_gmp = 0;
    }

    fn calculate_global_mark_overhead(&mut self, now_us: u64) {
        // How long since the previous global mark cycle started.
        let global_mark_interval_end_time = now_us;
        let global_mark_interval_us =
            global_mark_interval_end_time.saturating_sub(self.global_mark_interval_start_time);

        // The time cost attributed to concurrent GMP work from the
        // previous cycle.
        let concurrent_cost_us = self.concurrent_mark_threads_total_work_time_ns / 1000;

        // Total GMP work is the increments plus the global sweep plus the
        // weighted concurrent share.
        let potential_gmp_work_time_us = self.global_mark_increments_total_time_us
            + self.global_sweep_time_us
            + (concurrent_cost_us as f64 * CONCURRENT_WORK_OVERHEAD_WEIGHT) as u64;
        let potential_overhead = potential_gmp_work_time_us as f64 / global_mark_interval_us as f64;

        if potential_overhead > 0.0
            && potential_overhead < 1.0
            && self.global_mark_interval_start_time != 0
        {
            self.total_gmp_work_time_us = potential_gmp_work_time_us;
        } else if self.total_gmp_work_time_us == 0 {
            // At the very beginning of a run, assume the GMP costs five
            // average partial collections. A rough approximation, but
            // enough data to start making Eden decisions.
            self.total_gmp_work_time_us = self.historical_partial_gc_time_ms * 1000 * 5;
        }

        self.global_mark_overhead =
            self.total_gmp_work_time_us as f64 / global_mark_interval_us as f64;

        debug!(
            "global mark overhead {} (increments {} us, concurrent {} us, interval {} us)",
            self.global_mark_overhead,
            self.global_mark_increments_total_time_us,
            concurrent_cost_us,
            global_mark_interval_us
        );

        // The end of this interval starts the next one.
        self.global_mark_interval_start_time = global_mark_interval_end_time;
    }

    /// One global mark increment finished; its stats are in the cycle
    /// state.
    pub fn global_mark_increment_completed(&mut self, cycle: &CycleState) {
        let (scan_bytes, scan_time_us) = cycle.increment_stats.scan_work();
        self.scan_rate.record(
            scan_bytes,
            scan_time_us,
            *self.options.scan_rate_historic_weight_gmp,
        );

        if let IncrementStats::Gmp(mark) = &cycle.increment_stats {
            match math::hires_delta_us(mark.start_time, mark.end_time, INTERVAL_SANITY_CAP_US) {
                Some(elapsed) => self.global_mark_increments_total_time_us += elapsed,
                None => self.record_clock_skew("global mark increment elapsed time"),
            }
            self.bytes_scanned_in_current_gmp += mark.bytes_scanned;
        } else {
            debug_assert!(false, "global mark increment completed with PGC stats");
        }
    }

    /// Marking finished for the current global mark phase; a global sweep
    /// will follow.
    pub fn global_mark_phase_completed(&mut self, stats: &GmpCycleStats) {
        // Snapshot the live set of the last partial collection. Slightly
        // early; the precise figure would be taken just before the sweep.
        self.occupancy.snapshot_live_bytes_before_global_sweep();

        self.taxation
            .set_remaining_gmp_intermission_intervals(*self.options.tarok_gmp_intermission);

        // The mark just created more reclaimable data, so the consumption
        // baseline is no longer meaningful.
        self.consumption.invalidate_reclaimable_baseline();

        self.did_gmp_complete_since_last_reclaim = true;
        self.global_sweep_required = true;
        self.disable_copy_forward_during_current_global_mark_phase = false;

        self.concurrent_mark_threads_total_work_time_ns = stats.concurrent_mark.total_work_time_ns;
        self.update_gmp_stats(stats);
    }

    /// The global sweep that follows a completed mark phase finished.
    pub fn global_sweep_completed(&mut self, sweep_time_us: u64) {
        self.global_sweep_time_us = sweep_time_us;
    }

    /// The global mark cycle (mark plus sweep) is fully over.
    pub fn global_mark_cycle_end(&mut self) {
        self.currently_performing_gmp = false;
    }

    /// A full stop-the-world global collection completed.
    pub fn global_garbage_collect_completed(
        &mut self,
        reclaimable_regions: usize,
        defragment_reclaimable_regions: usize,
    ) {
        // Re-establish the reclaimable estimates without measuring
        // consumption; this was not a partial collection.
        self.consumption
            .reset_baselines(reclaimable_regions, defragment_reclaimable_regions);

        // The global collection fully compacted the heap; nothing is left
        // for partial collections, and the next sweep is already done.
        self.defragment.reset_after_global_collect();
        self.global_sweep_required = false;

        // If the GMP ended in an allocation failure, clear this as if the
        // GMP completed normally.
        self.disable_copy_forward_during_current_global_mark_phase = false;

        // The full collection also serves as the reclaim that would have
        // recalibrated rates on the first PGC after a GMP.
        self.did_gmp_complete_since_last_reclaim = false;
    }

    /// A partial collection is starting.
    pub fn partial_garbage_collect_started(&mut self, now_us: u64) {
        // Don't count the very first partial collection.
        if self.partial_gc_start_time != 0 {
            match math::hires_delta_us(self.partial_gc_start_time, now_us, INTERVAL_SANITY_CAP_US)
            {
                Some(recent_interval) => {
                    self.average_pgc_interval_us = math::weighted_average(
                        self.average_pgc_interval_us as f64,
                        recent_interval as f64,
                        *self.options.pgc_interval_historic_weight,
                    ) as u64;
                }
                None => self.record_clock_skew("partial collection interval"),
            }
        }

        self.partial_gc_start_time = now_us;
        self.calculate_partial_garbage_collect_overhead();
    }

    fn calculate_partial_garbage_collect_overhead(&mut self) {
        if self.average_pgc_interval_us == 0 || self.historical_partial_gc_time_ms == 0 {
            // On the very first partial collection there is no overhead to
            // calculate.
            return;
        }

        let recent_overhead =
            (self.historical_partial_gc_time_ms * 1000) as f64 / self.average_pgc_interval_us as f64;
        self.partial_gc_overhead = math::weighted_average(
            self.partial_gc_overhead,
            recent_overhead,
            *self.options.pgc_overhead_historic_weight,
        );

        trace!(
            "partial collection overhead {} (interval {} us, pause {} ms)",
            self.partial_gc_overhead,
            self.average_pgc_interval_us,
            self.historical_partial_gc_time_ms
        );
    }

    /// Choose the strategy for the next partial collection and publish it
    /// to the cycle state.
    pub fn determine_next_pgc_type(&mut self, cycle: &mut CycleState) {
        if !self.scan_rate.has_history() {
            // With no historic scan rate, force a mark-sweep-compact
            // collect to calibrate the estimator.
            cycle.reason_for_mark_compact_pgc = MarkCompactReason::Calibration;
            self.next_pgc_should_copy_forward = false;
        }

        cycle.should_run_copy_forward = self.next_pgc_should_copy_forward;
        if self.next_pgc_should_copy_forward && *self.options.tarok_pgc_should_mark_compact {
            // About to copy-forward and allowed to compact, so the next
            // cycle should compact.
            self.next_pgc_should_copy_forward = false;
        } else if !self.next_pgc_should_copy_forward && *self.options.tarok_pgc_should_copy_forward
        {
            // About to compact and allowed to copy-forward, so the next
            // cycle should copy-forward.
            self.next_pgc_should_copy_forward = true;
        }
        // Otherwise the mode cannot change; leave it as is.
    }

    /// A copy-forward collection finished; fold its stats into the
    /// copy-forward averages.
    pub fn copy_forward_completed(&mut self, cycle: &CycleState) {
        if let IncrementStats::PgcCopyForward(stats) = &cycle.increment_stats {
            self.copy_forward.record(
                stats,
                self.eden.region_size(),
                *self.options.copy_forward_historic_weight,
            );
        } else {
            debug_assert!(false, "copy forward completed without copy-forward stats");
        }
    }

    /// A partial collection completed. Updates every estimator and
    /// re-plans Eden, the GMP intermission and the next mark increment
    /// duration.
    pub fn partial_garbage_collect_completed(
        &mut self,
        heap: &dyn HeapView,
        cycle: &CycleState,
        reclaimable_regions: usize,
        defragment_reclaimable_regions: usize,
        end_time_us: u64,
    ) {
        trace!(
            "partial collection completed: reclaimable {} defragment-reclaimable {}",
            reclaimable_regions,
            defragment_reclaimable_regions
        );
        let global_sweep_happened = self.global_sweep_required;
        self.global_sweep_required = false;

        // Eden size of the interval that just ended, before recalculation.
        let eden_count_before_collect = self.eden.eden_region_count();

        match &cycle.increment_stats {
            IncrementStats::PgcCopyForward(stats) => {
                let region_size = self.eden.region_size();

                // Survivor regions allocated for Eden survivors, padded by
                // what would have been needed had the copy-forward not
                // aborted.
                let eden_survivor_count = stats.eden_survivor_region_count
                    + conversions::bytes_to_regions_up(stats.scan_bytes_eden, region_size);
                let non_eden_survivor_count = stats.non_eden_survivor_region_count
                    + conversions::bytes_to_regions_up(stats.scan_bytes_non_eden, region_size);

                // Eden can be empty after a compaction left no free region
                // to schedule Eden in; no survival rate to measure then.
                if eden_count_before_collect != 0 {
                    let survival_rate =
                        eden_survivor_count as f64 / eden_count_before_collect as f64;
                    self.copy_forward.update_survival_rates(
                        survival_rate,
                        non_eden_survivor_count,
                        *self.options.copy_forward_historic_weight,
                    );
                }

                if stats.aborted && self.taxation.remaining_gmp_intermission_intervals() == 0 {
                    // An abort under an active mark phase: the remaining
                    // partial collections until the GMP completes must not
                    // try copy-forward.
                    self.disable_copy_forward_during_current_global_mark_phase = true;
                }
            }
            IncrementStats::PgcMarkSweepCompact(_) => {
                // The scan rate is only measurable in PGC when it did a
                // mark-sweep-compact collect.
                let (scan_bytes, scan_time_us) = cycle.increment_stats.scan_work();
                self.scan_rate.record(
                    scan_bytes,
                    scan_time_us,
                    *self.options.scan_rate_historic_weight_pgc,
                );
            }
            IncrementStats::Gmp(_) => {
                debug_assert!(false, "partial collection completed with GMP stats")
            }
        }

        self.consumption.measure(
            reclaimable_regions,
            defragment_reclaimable_regions,
            *self.options.consumption_historic_weight,
        );

        let pgc_time_ms =
            math::hires_delta_us(self.partial_gc_start_time, end_time_us, INTERVAL_SANITY_CAP_US)
                .map(|us| us / 1000);

        self.pgc_count_since_gmp_end += 1;

        // Re-plan from the new statistics.
        self.check_eden_size_after_pgc(global_sweep_happened);
        self.calculate_eden_size(heap);
        // Recalculate the GMP intermission after (possibly) resizing Eden.
        self.calculate_automatic_gmp_intermission(heap, cycle);
        self.defragment
            .estimate_macro_defragmentation_work(*self.options.defragment_work_historic_weight);

        match pgc_time_ms {
            Some(pgc_time_ms) => self.calculate_global_mark_increment_time_millis(pgc_time_ms),
            None => self.record_clock_skew("partial collection pause"),
        }
        self.eden
            .update_pgc_time_prediction(self.historical_partial_gc_time_ms);

        #[cfg(feature = "extreme_assertions")]
        assert!(
            self.eden.eden_region_count() <= heap.free_region_count(),
            "eden exceeds free regions"
        );
    }

    fn calculate_global_mark_increment_time_millis(&mut self, pgc_time_ms: u64) {
        if pgc_time_ms > PGC_TIME_SANITY_CAP_MS {
            // Time likely traveled backwards due to a clock adjustment;
            // ignore this round.
            self.record_clock_skew("partial collection pause above sanity cap");
            return;
        }

        // Prime or fold the running weighted average of pause times.
        if self.historical_partial_gc_time_ms == 0 {
            self.historical_partial_gc_time_ms = pgc_time_ms;
        } else {
            self.historical_partial_gc_time_ms = math::weighted_average(
                self.historical_partial_gc_time_ms as f64,
                pgc_time_ms as f64,
                *self.options.pgc_time_historic_weight,
            ) as u64;
        }
        assert!(self.historical_partial_gc_time_ms <= PGC_TIME_SANITY_CAP_MS);

        // Take a third of the recent average so mark increments do not
        // impede mutator utilization, but never less than a millisecond or
        // later calculations would divide by zero.
        self.dynamic_global_mark_increment_time_millis =
            std::cmp::max((self.historical_partial_gc_time_ms / 3) as usize, 1);
    }

    /// Re-derive Eden for the next partial collection.
    fn calculate_eden_size(&mut self, heap: &dyn HeapView) {
        self.eden.calculate_eden_size(
            heap.free_region_count(),
            &self.options,
            self.startup_phase_finished,
        );
    }

    /// Decide whether and how hard to steer Eden after this partial
    /// collection.
    fn check_eden_size_after_pgc(&mut self, global_sweep_happened: bool) {
        if !self.startup_phase_finished {
            // Keep Eden at its startup size.
            return;
        }

        if self.currently_performing_gmp && !global_sweep_happened {
            // Don't resize Eden while a GMP cycle is running, except on
            // the first partial collection after the global sweep.
            return;
        }

        if self.heap_is_fully_expanded() {
            if global_sweep_happened {
                // Liveness information is at its most accurate right after
                // a sweep; take the aggressive step toward ideal Eden.
                let projection = self.eden_projection();
                self.eden
                    .move_toward_recommended_eden(0.5, &projection, &self.options);
                self.pgc_count_since_gmp_end = 0;
            } else if EdenSizer::should_reevaluate(self.pgc_count_since_gmp_end) {
                let projection = self.eden_projection();
                self.eden
                    .move_toward_recommended_eden(0.25, &projection, &self.options);
            }
        } else if self.pgc_count_since_gmp_end % 3 == 0 {
            // Every third partial collection, nudge Eden by 10% if the
            // observed hybrid overhead left the acceptable band. Waiting
            // three collections lets the averages settle first.
            let hybrid_overhead = self.eden.hybrid_overhead(
                self.historical_partial_gc_time_ms,
                self.partial_gc_overhead.min(1.0),
                &self.options,
                false,
            );
            self.eden.apply_overhead_band_step(hybrid_overhead, &self.options);
        }
    }

    /// Everything the Eden cost model needs, collapsed to scalars.
    fn eden_projection(&self) -> EdenProjection {
        let avg_pgc_time_us = self.historical_partial_gc_time_ms * 1000;
        EdenProjection {
            historical_pgc_time_ms: self.historical_partial_gc_time_ms,
            // The interval average measures start-to-start; subtract the
            // pause to get mutator time between collections.
            avg_pgc_interval_us: self.average_pgc_interval_us.saturating_sub(avg_pgc_time_us),
            total_gmp_work_time_us: self.total_gmp_work_time_us,
            estimated_free_tenure: self.defragment.estimated_free_tenure(),
            live_set_bytes_after_partial_collect: self
                .occupancy
                .live_set_bytes_after_partial_collect(),
            average_survivor_set_region_count: self.copy_forward.average_survivor_set_region_count(),
            representative_pgc_per_gmp: std::cmp::max(1, self.pgc_count_since_gmp_end) as f64,
            heap_fully_expanded: self.heap_is_fully_expanded(),
        }
    }

    /// Once the heap has reached its (soft) maximum, Eden must work within
    /// the free memory constraints instead of growing the heap.
    fn heap_is_fully_expanded(&self) -> bool {
        let max_heap_size = if *self.options.soft_mx != 0 {
            *self.options.soft_mx
        } else {
            *self.options.memory_max
        };
        if max_heap_size == 0 {
            // No configured bound; the heap always has room to grow.
            return false;
        }
        let current_heap_size = self.eden.number_of_heap_regions() * self.eden.region_size();
        current_heap_size >= max_heap_size
    }

    /// Recompute when the next GMP must kick off, expressed as taxation
    /// points to skip.
    fn calculate_automatic_gmp_intermission(&mut self, heap: &dyn HeapView, cycle: &CycleState) {
        // Estimate even when automatic intermissions are disabled; the
        // trace data is useful either way.
        let partial_collects_remaining = self.estimate_partial_gcs_remaining(heap, cycle);
        self.occupancy.update_live_bytes_after_partial_collect(heap);

        if *self.options.tarok_automatic_gmp_intermission {
            assert_eq!(
                *self.options.tarok_gmp_intermission,
                usize::MAX,
                "automatic GMP intermission requires the intermission option left at its sentinel"
            );

            // Until kickoff, keep re-deriving the intermission from the
            // current estimates.
            if self.taxation.remaining_gmp_intermission_intervals() > 0 {
                let estimated_bytes_to_scan = self.occupancy.estimated_global_bytes_to_scan();
                let increment_headroom = self.kickoff.global_mark_increment_headroom(
                    self.consumption.region_consumption_rate(),
                    self.eden.region_size(),
                    &self.options,
                );
                let increments_required =
                    self.estimate_global_mark_increments(heap, cycle, estimated_bytes_to_scan);
                let increments_required_with_headroom =
                    increments_required.saturating_add(increment_headroom);
                let increments_remaining = partial_collects_remaining
                    .saturating_mul(*self.options.tarok_pgc_to_gmp_denominator)
                    / *self.options.tarok_pgc_to_gmp_numerator;
                self.taxation.set_remaining_gmp_intermission_intervals(
                    increments_remaining.saturating_sub(increments_required_with_headroom),
                );
                debug!(
                    "automatic GMP intermission: {} intervals ({} increments remaining, {} required, {} headroom)",
                    self.taxation.remaining_gmp_intermission_intervals(),
                    increments_remaining,
                    increments_required,
                    increment_headroom
                );
            }
        }
    }

    /// Number of global mark increments needed to scan the projected live
    /// set, plus one for the final increment (most importantly clearable
    /// processing).
    fn estimate_global_mark_increments(
        &self,
        heap: &dyn HeapView,
        cycle: &CycleState,
        estimated_bytes_to_scan: f64,
    ) -> usize {
        assert!(*self.options.threads > 0);
        let estimated_scan_millis = estimated_bytes_to_scan
            * self.scan_rate.microseconds_per_byte_scanned()
            / *self.options.threads as f64
            / 1000.0;
        let current_mark_increment_millis = self.current_global_mark_increment_time_millis(heap, cycle);
        assert!(current_mark_increment_millis != 0);
        let estimated_gmp_increments =
            estimated_scan_millis / current_mark_increment_millis as f64;
        estimated_gmp_increments.ceil() as usize + 1
    }

    /// Duration budget for the next global mark increment, in
    /// milliseconds.
    pub fn current_global_mark_increment_time_millis(
        &self,
        heap: &dyn HeapView,
        cycle: &CycleState,
    ) -> usize {
        if *self.options.tarok_global_mark_increment_time_millis != 0 {
            return *self.options.tarok_global_mark_increment_time_millis;
        }

        let partial_collects_remaining = self.estimate_partial_gcs_remaining(heap, cycle);
        if partial_collects_remaining == 0 {
            // An allocation failure is imminent; the GMP must finish this
            // increment.
            usize::MAX
        } else {
            let desired_millis = self.dynamic_global_mark_increment_time_millis;
            let remaining_millis_to_scan = self.estimate_remaining_time_millis_to_scan();
            let minimum_millis =
                (remaining_millis_to_scan / partial_collects_remaining as f64) as usize;
            std::cmp::max(desired_millis, minimum_millis)
        }
    }

    /// Scan-byte budget for the next global mark increment.
    pub fn bytes_to_scan_in_next_gmp_increment(
        &self,
        heap: &dyn HeapView,
        cycle: &CycleState,
    ) -> usize {
        let target_pause_millis = self.current_global_mark_increment_time_millis(heap, cycle);
        let calculated_work_target = (target_pause_millis as f64 * 1000.0
            / self.scan_rate.microseconds_per_byte_scanned())
            * *self.options.threads as f64;

        // Clamp in case the arithmetic overflowed (or no scan rate exists
        // yet and the division went to infinity).
        let calculated_work_target = calculated_work_target.min(usize::MAX as f64) as usize;

        std::cmp::max(
            calculated_work_target,
            *self.options.tarok_minimum_gmp_work_target_bytes,
        )
    }

    fn estimate_partial_gcs_remaining(&self, heap: &dyn HeapView, cycle: &CycleState) -> usize {
        self.kickoff.estimate_partial_gcs_remaining(
            &self.consumption,
            &self.copy_forward,
            self.eden.ideal_eden_region_count(),
            heap.free_region_count(),
            cycle.should_run_copy_forward,
        )
    }

    /// Bytes the current global mark phase still has to scan.
    fn estimate_remaining_global_bytes_to_scan(&self) -> usize {
        let expected_bytes = self.occupancy.estimated_global_bytes_to_scan() as usize;
        expected_bytes.saturating_sub(self.bytes_scanned_in_current_gmp)
    }

    fn estimate_remaining_time_millis_to_scan(&self) -> f64 {
        assert!(*self.options.threads > 0);
        let remaining_bytes = self.estimate_remaining_global_bytes_to_scan() as f64;
        remaining_bytes * self.scan_rate.microseconds_per_byte_scanned()
            / *self.options.threads as f64
            / 1000.0
    }

    fn update_gmp_stats(&mut self, stats: &GmpCycleStats) {
        assert!(*self.options.threads > 0);

        let incremental_scan_time_us =
            stats.incremental_mark.scan_time_us as f64 / *self.options.threads as f64;
        let concurrent_bytes_scanned = stats.concurrent_mark.bytes_scanned;

        self.historic_incremental_scan_time_per_gmp_us = math::weighted_average(
            self.historic_incremental_scan_time_per_gmp_us as f64,
            incremental_scan_time_us,
            *self.options.incremental_scan_time_historic_weight,
        ) as u64;
        self.historic_bytes_scanned_concurrently_per_gmp = math::weighted_average(
            self.historic_bytes_scanned_concurrently_per_gmp as f64,
            concurrent_bytes_scanned as f64,
            *self.options.concurrent_bytes_historic_weight,
        ) as usize;
    }

    /// Scan-time cost of one whole GMP cycle in microseconds: the
    /// incremental share plus the weighted concurrent share.
    pub fn scan_time_cost_per_gmp(&self) -> u64 {
        let incremental_cost = self.historic_incremental_scan_time_per_gmp_us as f64;
        let scan_rate =
            self.scan_rate.microseconds_per_byte_scanned() / *self.options.threads as f64;

        let concurrent_cost = if scan_rate > 0.0 {
            *self.options.tarok_concurrent_marking_cost_weight
                * (self.historic_bytes_scanned_concurrently_per_gmp as f64 * scan_rate)
        } else {
            0.0
        };

        (incremental_cost + concurrent_cost) as u64
    }

    /// Run the post-sweep recalibrations on the first partial collection
    /// after a completed GMP: the defragmentation census, the occupancy
    /// trend and the scannable-bytes ratio.
    pub fn recalculate_rates_on_first_pgc_after_gmp(&mut self, heap: &dyn HeapView) {
        if self.is_first_pgc_after_gmp() {
            self.defragment.calculate_pgc_compaction_rate(
                heap,
                self.eden.current_eden_size_in_bytes(),
                &self.copy_forward,
                &mut self.kickoff,
                &self.options,
            );
            self.occupancy.calculate_heap_occupancy_trend();
            self.occupancy.calculate_scannable_bytes_ratio(heap);

            self.first_pgc_after_gmp_completed();
        }
    }

    pub fn is_first_pgc_after_gmp(&self) -> bool {
        self.did_gmp_complete_since_last_reclaim
    }

    pub fn first_pgc_after_gmp_completed(&mut self) {
        self.did_gmp_complete_since_last_reclaim = false;
    }

    /// Record defragmentation work for a region merging into the oldest
    /// compact group; called by the engine during collection-set
    /// selection.
    pub fn update_current_macro_defragmentation_work(&mut self, region: &RegionData) {
        self.defragment.update_current_macro_defragmentation_work(
            region,
            self.eden.region_size(),
            &self.copy_forward,
        );
    }

    /// Compact work the next partial collection should schedule.
    pub fn desired_compact_work(&self) -> usize {
        self.defragment.desired_compact_work(
            self.consumption.region_consumption_rate(),
            self.eden.region_size(),
        )
    }

    /// Emptiness a region must exceed to be selected for defragmentation.
    pub fn defragment_emptiness_threshold(&self) -> f64 {
        self.defragment
            .defragment_emptiness_threshold(&self.copy_forward, &self.options)
    }

    /// Publish the heap-resizing hints.
    pub fn update_heap_sizing_data(&self, sizing: &mut HeapSizingData) {
        let region_size = self.eden.region_size();
        let survivor_size =
            (region_size as f64 * self.copy_forward.average_survivor_set_region_count()) as usize;
        let reserved_free_memory = self.eden.current_eden_size_in_bytes() + survivor_size;

        sizing.gmp_time = if self.total_gmp_work_time_us == 0 {
            1
        } else {
            self.total_gmp_work_time_us
        };
        sizing.pgc_count_since_gmp_end = self.pgc_count_since_gmp_end;
        sizing.avg_pgc_time_us = self.historical_partial_gc_time_ms * 1000;
        // Until an interval sample exists, roughly guess five pause times
        // of mutator time between collections.
        sizing.avg_pgc_interval_us = if self.average_pgc_interval_us != 0 {
            self.average_pgc_interval_us
                .saturating_sub(self.historical_partial_gc_time_ms * 1000)
        } else {
            self.historical_partial_gc_time_ms * 1000 * 5
        };
        sizing.reserved_size = reserved_free_memory;
        // sizing.free_tenure is updated by the engine right before a
        // partial collection begins; leave it alone.
    }

    fn record_clock_skew(&mut self, what: &str) {
        self.clock_skew_discard_count += 1;
        debug!(
            "clock skew: {} sample discarded ({} total)",
            what, self.clock_skew_discard_count
        );
    }

    pub fn eden_region_count(&self) -> usize {
        self.eden.eden_region_count()
    }

    pub fn current_eden_size_in_bytes(&self) -> usize {
        self.eden.current_eden_size_in_bytes()
    }

    pub fn ideal_eden_size_in_bytes(&self) -> usize {
        self.eden.ideal_eden_size_in_bytes()
    }

    pub fn dynamic_global_mark_increment_time_millis(&self) -> usize {
        self.dynamic_global_mark_increment_time_millis
    }

    pub fn historical_partial_gc_time_ms(&self) -> u64 {
        self.historical_partial_gc_time_ms
    }

    pub fn average_pgc_interval_us(&self) -> u64 {
        self.average_pgc_interval_us
    }

    pub fn partial_gc_overhead(&self) -> f64 {
        self.partial_gc_overhead
    }

    pub fn global_mark_overhead(&self) -> f64 {
        self.global_mark_overhead
    }

    pub fn is_global_sweep_required(&self) -> bool {
        self.global_sweep_required
    }

    pub fn next_increment_is_pgc(&self) -> bool {
        self.taxation.next_increment_is_pgc()
    }

    pub fn next_increment_is_gmp(&self) -> bool {
        self.taxation.next_increment_is_gmp()
    }

    pub fn next_pgc_should_copy_forward(&self) -> bool {
        self.next_pgc_should_copy_forward
    }

    pub fn currently_performing_gmp(&self) -> bool {
        self.currently_performing_gmp
    }

    pub fn is_copy_forward_disabled_during_current_global_mark_phase(&self) -> bool {
        self.disable_copy_forward_during_current_global_mark_phase
    }

    pub fn remaining_gmp_intermission_intervals(&self) -> usize {
        self.taxation.remaining_gmp_intermission_intervals()
    }

    pub fn heap_occupancy_trend(&self) -> f64 {
        self.occupancy.heap_occupancy_trend()
    }

    pub fn scannable_bytes_ratio(&self) -> f64 {
        self.occupancy.scannable_bytes_ratio()
    }

    pub fn microseconds_per_byte_scanned(&self) -> f64 {
        self.scan_rate.microseconds_per_byte_scanned()
    }

    pub fn region_consumption_rate(&self) -> f64 {
        self.consumption.region_consumption_rate()
    }

    pub fn defragment_region_consumption_rate(&self) -> f64 {
        self.consumption.defragment_region_consumption_rate()
    }

    pub fn clock_skew_discard_count(&self) -> usize {
        self.clock_skew_discard_count
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::cycle_stats::{CopyForwardStats, MarkStats};
    use crate::util::constants::BYTES_IN_MBYTE;
    use crate::util::test_util::serial_test;
    use std::cell::RefCell;
    use std::collections::HashSet;

    struct TestHeap {
        region_size: usize,
        regions: Vec<RegionData>,
        free_regions: usize,
        allocation_contexts: usize,
        defragmentation_targets: RefCell<HashSet<usize>>,
    }

    impl TestHeap {
        fn new(region_size: usize, region_count: usize, free_regions: usize) -> Self {
            let regions = (0..region_count)
                .map(|index| RegionData {
                    index,
                    is_free_or_idle: index < free_regions,
                    contains_objects: index >= free_regions,
                    remembered_set_accurate: true,
                    ..Default::default()
                })
                .collect();
            TestHeap {
                region_size,
                regions,
                free_regions,
                allocation_contexts: 1,
                defragmentation_targets: RefCell::new(HashSet::new()),
            }
        }
    }

    impl HeapView for TestHeap {
        fn region_size(&self) -> usize {
            self.region_size
        }
        fn managed_region_count(&self) -> usize {
            self.regions.len()
        }
        fn free_region_count(&self) -> usize {
            self.free_regions
        }
        fn total_heap_size(&self) -> usize {
            self.region_size * self.regions.len()
        }
        fn allocation_context_count(&self) -> usize {
            self.allocation_contexts
        }
        fn regions(&self) -> Box<dyn Iterator<Item = RegionData> + '_> {
            Box::new(self.regions.iter().copied())
        }
        fn weighted_survival_rate(&self, _compact_group: usize) -> f64 {
            0.5
        }
        fn set_defragmentation_target(&self, region: usize, target: bool) {
            if target {
                self.defragmentation_targets.borrow_mut().insert(region);
            } else {
                self.defragmentation_targets.borrow_mut().remove(&region);
            }
        }
    }

    fn delegate() -> (SchedulingDelegate, TestHeap) {
        let options = Arc::new(Options::default());
        let delegate = SchedulingDelegate::new(options);
        let heap = TestHeap::new(BYTES_IN_MBYTE, 1024, 1024);
        (delegate, heap)
    }

    fn msc_cycle(bytes_scanned: usize, scan_time_us: u64) -> CycleState {
        let mut cycle = CycleState::new(IncrementStats::PgcMarkSweepCompact(MarkStats {
            bytes_scanned,
            scan_time_us,
            ..Default::default()
        }));
        cycle.should_run_copy_forward = false;
        cycle
    }

    #[test]
    fn initial_threshold_primes_survivor_estimate() {
        serial_test(|| {
            let (mut delegate, heap) = delegate();
            delegate.heap_reconfigured(&heap);
            let threshold = delegate.get_initial_taxation_threshold(&heap);
            assert!(threshold >= BYTES_IN_MBYTE);
            assert!(threshold % BYTES_IN_MBYTE == 0);
            // 30% of Eden, in regions.
            let expected = 0.3 * delegate.current_eden_size_in_bytes() as f64
                / BYTES_IN_MBYTE as f64;
            assert!(
                (delegate.copy_forward.average_survivor_set_region_count() - expected).abs()
                    < 1e-9
            );
        })
    }

    #[test]
    fn increment_work_consumed_on_read() {
        serial_test(|| {
            let (mut delegate, heap) = delegate();
            delegate.heap_reconfigured(&heap);
            delegate.get_initial_taxation_threshold(&heap);
            let (pgc, gmp) = delegate.get_increment_work();
            assert!(pgc ^ gmp);
            assert_eq!(delegate.get_increment_work(), (false, false));
        })
    }

    #[test]
    fn first_pgc_does_not_update_interval() {
        serial_test(|| {
            let (mut delegate, _heap) = delegate();
            delegate.partial_garbage_collect_started(1_000_000);
            assert_eq!(delegate.average_pgc_interval_us(), 0);
            delegate.partial_garbage_collect_started(1_500_000);
            assert_eq!(delegate.average_pgc_interval_us(), 250_000);
        })
    }

    #[test]
    fn backwards_clock_discards_interval_sample() {
        serial_test(|| {
            let (mut delegate, _heap) = delegate();
            delegate.partial_garbage_collect_started(2_000_000);
            delegate.partial_garbage_collect_started(1_000_000);
            assert_eq!(delegate.average_pgc_interval_us(), 0);
            assert_eq!(delegate.clock_skew_discard_count(), 1);
        })
    }

    #[test]
    fn pgc_completion_updates_pause_and_increment_time() {
        serial_test(|| {
            let (mut delegate, heap) = delegate();
            delegate.heap_reconfigured(&heap);
            delegate.get_initial_taxation_threshold(&heap);

            let cycle = msc_cycle(BYTES_IN_MBYTE, 10_000);
            delegate.partial_garbage_collect_started(1_000_000);
            delegate.partial_garbage_collect_completed(&heap, &cycle, 500, 500, 1_090_000);

            assert_eq!(delegate.historical_partial_gc_time_ms(), 90);
            assert_eq!(delegate.dynamic_global_mark_increment_time_millis(), 30);
            // Mark-sweep-compact collections feed the scan rate.
            assert!(delegate.microseconds_per_byte_scanned() > 0.0);
        })
    }

    #[test]
    fn backwards_clock_keeps_historical_pause() {
        serial_test(|| {
            let (mut delegate, heap) = delegate();
            delegate.heap_reconfigured(&heap);
            delegate.get_initial_taxation_threshold(&heap);

            let cycle = msc_cycle(BYTES_IN_MBYTE, 10_000);
            delegate.partial_garbage_collect_started(1_000_000);
            delegate.partial_garbage_collect_completed(&heap, &cycle, 500, 500, 1_050_000);
            let historical = delegate.historical_partial_gc_time_ms();

            delegate.partial_garbage_collect_started(2_000_000);
            delegate.partial_garbage_collect_completed(&heap, &cycle, 500, 500, 1_999_000);
            assert_eq!(delegate.historical_partial_gc_time_ms(), historical);
            assert!(delegate.clock_skew_discard_count() > 0);
        })
    }

    #[test]
    fn gmp_lifecycle_flags_and_seeded_overhead() {
        serial_test(|| {
            let (mut delegate, heap) = delegate();
            delegate.heap_reconfigured(&heap);
            delegate.get_initial_taxation_threshold(&heap);

            // Seed a pause history so the first-cycle GMP guess has data.
            let cycle = msc_cycle(BYTES_IN_MBYTE, 10_000);
            delegate.partial_garbage_collect_started(1_000_000);
            delegate.partial_garbage_collect_completed(&heap, &cycle, 500, 500, 1_050_000);

            delegate.global_mark_cycle_start(2_000_000);
            assert!(delegate.currently_performing_gmp());
            // No previous cycle: seeded at five pause times.
            assert_eq!(delegate.total_gmp_work_time_us, 250_000);

            let gmp_cycle = CycleState::new(IncrementStats::Gmp(MarkStats {
                bytes_scanned: BYTES_IN_MBYTE,
                scan_time_us: 5_000,
                start_time: 2_000_000,
                end_time: 2_010_000,
                ..Default::default()
            }));
            delegate.global_mark_increment_completed(&gmp_cycle);
            assert_eq!(delegate.global_mark_increments_total_time_us, 10_000);

            delegate.global_mark_phase_completed(&GmpCycleStats::default());
            assert!(delegate.is_global_sweep_required());
            assert!(delegate.is_first_pgc_after_gmp());

            delegate.global_sweep_completed(30_000);
            delegate.global_mark_cycle_end();
            assert!(!delegate.currently_performing_gmp());
        })
    }

    #[test]
    fn global_collect_resets_compaction_and_recalibration_state() {
        serial_test(|| {
            let (mut delegate, heap) = delegate();
            delegate.heap_reconfigured(&heap);
            delegate.global_mark_phase_completed(&GmpCycleStats::default());
            assert!(delegate.is_first_pgc_after_gmp());

            delegate.global_garbage_collect_completed(800, 700);
            assert!(!delegate.is_global_sweep_required());
            assert!(!delegate.is_first_pgc_after_gmp());
            assert_eq!(delegate.consumption.previous_reclaimable_regions(), 800);
            assert_eq!(
                delegate.consumption.previous_defragment_reclaimable_regions(),
                700
            );
            assert_eq!(delegate.defragment.bytes_compacted_to_free_bytes_ratio(), 0.0);
        })
    }

    #[test]
    fn pgc_type_alternates_when_both_strategies_allowed() {
        serial_test(|| {
            let mut options = Options::default();
            options.tarok_pgc_should_copy_forward.value = true;
            options.tarok_pgc_should_mark_compact.value = true;
            let mut delegate = SchedulingDelegate::new(Arc::new(options));
            // Calibrated scan rate, so no forced mark-sweep-compact.
            delegate.scan_rate.record(1000, 1000, 0.5);

            let mut cycle = CycleState::new(IncrementStats::PgcMarkSweepCompact(
                MarkStats::default(),
            ));
            delegate.determine_next_pgc_type(&mut cycle);
            assert!(cycle.should_run_copy_forward);
            delegate.determine_next_pgc_type(&mut cycle);
            assert!(!cycle.should_run_copy_forward);
            delegate.determine_next_pgc_type(&mut cycle);
            assert!(cycle.should_run_copy_forward);
        })
    }

    #[test]
    fn uncalibrated_scan_rate_forces_mark_compact() {
        serial_test(|| {
            let (mut delegate, _heap) = delegate();
            let mut cycle = CycleState::new(IncrementStats::PgcMarkSweepCompact(
                MarkStats::default(),
            ));
            delegate.determine_next_pgc_type(&mut cycle);
            assert!(!cycle.should_run_copy_forward);
            assert_eq!(
                cycle.reason_for_mark_compact_pgc,
                MarkCompactReason::Calibration
            );
        })
    }

    #[test]
    fn aborted_copy_forward_disables_copy_forward_for_the_phase() {
        serial_test(|| {
            let mut options = Options::default();
            options.tarok_gmp_intermission.value = 0;
            options.tarok_automatic_gmp_intermission.value = false;
            let mut delegate = SchedulingDelegate::new(Arc::new(options));
            let heap = TestHeap::new(BYTES_IN_MBYTE, 1024, 1024);
            delegate.heap_reconfigured(&heap);
            delegate.get_initial_taxation_threshold(&heap);

            let stats = CopyForwardStats {
                aborted: true,
                eden_survivor_region_count: 2,
                ..Default::default()
            };
            let cycle = CycleState::new(IncrementStats::PgcCopyForward(stats));
            delegate.partial_garbage_collect_started(1_000_000);
            delegate.partial_garbage_collect_completed(&heap, &cycle, 500, 500, 1_050_000);
            assert!(delegate.is_copy_forward_disabled_during_current_global_mark_phase());
        })
    }

    #[test]
    fn first_pgc_after_gmp_recalibrates_once() {
        serial_test(|| {
            let (mut delegate, heap) = delegate();
            delegate.heap_reconfigured(&heap);
            delegate.global_mark_phase_completed(&GmpCycleStats::default());

            assert!(delegate.is_first_pgc_after_gmp());
            delegate.recalculate_rates_on_first_pgc_after_gmp(&heap);
            assert!(!delegate.is_first_pgc_after_gmp());
        })
    }

    #[test]
    fn heap_sizing_data_is_published() {
        serial_test(|| {
            let (mut delegate, heap) = delegate();
            delegate.heap_reconfigured(&heap);
            delegate.get_initial_taxation_threshold(&heap);

            let mut sizing = HeapSizingData {
                free_tenure: 12345,
                ..Default::default()
            };
            delegate.update_heap_sizing_data(&mut sizing);
            assert_eq!(sizing.gmp_time, 1);
            assert_eq!(sizing.reserved_size,
                delegate.current_eden_size_in_bytes()
                    + (BYTES_IN_MBYTE as f64
                        * delegate.copy_forward.average_survivor_set_region_count())
                        as usize);
            // The engine-owned field is left alone.
            assert_eq!(sizing.free_tenure, 12345);
        })
    }

    #[test]
    fn work_target_floors_at_configured_minimum() {
        serial_test(|| {
            let (mut delegate, heap) = delegate();
            delegate.heap_reconfigured(&heap);
            let cycle = msc_cycle(BYTES_IN_MBYTE, 10_000);
            // Uncalibrated scan rate: the target saturates.
            let target = delegate.bytes_to_scan_in_next_gmp_increment(&heap, &cycle);
            assert_eq!(target, usize::MAX);

            // With a known scan rate the target is finite and floored.
            delegate.scan_rate.record(1000, 1_000_000, 0.5);
            let target = delegate.bytes_to_scan_in_next_gmp_increment(&heap, &cycle);
            assert!(target >= *delegate.options().tarok_minimum_gmp_work_target_bytes);
        })
    }
}
