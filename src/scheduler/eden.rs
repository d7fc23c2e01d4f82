//! Eden sizing.
//!
//! Eden is the young-generation region set the next partial collection is
//! guaranteed to reclaim. Its size trades pause time against GC CPU
//! overhead: a bigger Eden means rarer but longer partial collections and
//! less total copying per byte allocated. The sizer projects both effects
//! for candidate sizes and walks Eden toward the size minimizing a blended
//! ("hybrid") cost, rate-limited so one noisy measurement cannot slam the
//! heap layout around.

use crate::util::constants::{
    CONSECUTIVE_PGC_TO_CHANGE_EDEN, INITIAL_PGC_TIME_INCREASE_PER_EDEN_REGION_FACTOR,
    MAX_EDEN_PERCENT, MINIMUM_EDEN_REGIONS, MINIMUM_PGC_TIME_MS, MIN_EDEN_PERCENT,
};
use crate::util::conversions;
use crate::util::heap::region::HeapView;
use crate::util::options::Options;

/// How hard a partial-collection pause is penalized relative to raw GC CPU
/// overhead when the two are blended.
const PAUSE_OVERHEAD_BLEND_WEIGHT: f64 = 0.5;

/// Share of the estimated free tenure the sizer is allowed to hand to
/// Eden; the remainder is kept so projections never plan for exhausting
/// free space exactly.
const FREE_TENURE_HEADROOM: f64 = 0.75;

/// Candidate Eden changes sampled across the search interval.
const EDEN_SIZE_SAMPLES: usize = 100;

/// Everything the Eden cost projection reads from the rest of the
/// scheduler, collapsed to scalars so the sizer stays independently
/// testable.
#[derive(Debug, Clone, Copy)]
pub struct EdenProjection {
    pub historical_pgc_time_ms: u64,
    /// Average mutator time between the end of one partial collection and
    /// the start of the next, in microseconds.
    pub avg_pgc_interval_us: u64,
    /// Total work time of a global mark phase in microseconds; 0 when no
    /// GMP has been observed yet.
    pub total_gmp_work_time_us: u64,
    pub estimated_free_tenure: usize,
    pub live_set_bytes_after_partial_collect: usize,
    pub average_survivor_set_region_count: f64,
    /// Representative number of partial collections per GMP interval.
    pub representative_pgc_per_gmp: f64,
    pub heap_fully_expanded: bool,
}

/// The pause-cost half of the Eden cost function, swappable so collectors
/// with different pause economics can reuse the sizer.
pub trait PauseOverheadModel: Send + Sync {
    /// Map a partial-collection pause to an overhead percentage on a
    /// 0-100 scale. Low percentages read as "this pause is fine", high
    /// ones as "shrink Eden to fix this".
    fn map_pause_to_overhead(&self, pgc_time_ms: u64, band: OverheadBand) -> f64;

    /// Blend a CPU overhead in `[0, 1]` with a mapped pause overhead
    /// percentage into the combined overhead in `[0, 1]`.
    fn blend(&self, cpu_overhead: f64, pause_overhead_pct: f64) -> f64;
}

/// The acceptable-overhead band the pause mapping works against.
#[derive(Debug, Clone, Copy)]
pub struct OverheadBand {
    pub expected_time_ratio_minimum: f64,
    pub expected_time_ratio_maximum: f64,
    pub target_max_pause_time_ms: f64,
    pub heap_fully_expanded: bool,
}

impl OverheadBand {
    pub fn from_options(options: &Options, heap_fully_expanded: bool) -> Self {
        OverheadBand {
            expected_time_ratio_minimum: *options.dnss_expected_time_ratio_minimum,
            expected_time_ratio_maximum: *options.dnss_expected_time_ratio_maximum,
            target_max_pause_time_ms: *options.tarok_target_max_pause_time as f64,
            heap_fully_expanded,
        }
    }
}

/// The default pause model.
///
/// With the heap fully expanded, pauses below the target cost the
/// mid-band overhead and pauses above it are penalized exponentially, so
/// the search is pushed back under the target. With room to grow, a
/// linear segment maps short pauses to expansion-friendly overheads and
/// long pauses to contraction, clamped so a tiny pause alone never argues
/// for expansion.
pub struct HybridOverheadModel;

impl PauseOverheadModel for HybridOverheadModel {
    fn map_pause_to_overhead(&self, pgc_time_ms: u64, band: OverheadBand) -> f64 {
        let xminpct = band.expected_time_ratio_minimum * 100.0;
        let xmaxpct = band.expected_time_ratio_maximum * 100.0;
        let xmaxt = band.target_max_pause_time_ms;
        let pgc_time_ms = pgc_time_ms as f64;

        if band.heap_fully_expanded {
            let midpoint_pct = (xmaxpct + xminpct) / 2.0;
            if pgc_time_ms <= xmaxt {
                // At or below the target pause there is no benefit in
                // shrinking further.
                midpoint_pct
            } else {
                let overhead_curve = 1.03_f64.powf(pgc_time_ms - xmaxt) + midpoint_pct - 1.0;
                overhead_curve.min(100.0)
            }
        } else {
            let slope = (xmaxpct - xminpct) / ((xmaxt / 2.0) - xmaxt);
            let overhead = (slope * pgc_time_ms) + ((2.0 * xmaxpct) - xminpct);
            // A very small pause alone is no reason to expand; cap at
            // xmaxpct so expansion only happens when the CPU overhead
            // wants it too.
            overhead.max(0.0).min(xmaxpct)
        }
    }

    fn blend(&self, cpu_overhead: f64, pause_overhead_pct: f64) -> f64 {
        debug_assert!((0.0..=1.0).contains(&cpu_overhead));
        let hybrid_pct = (PAUSE_OVERHEAD_BLEND_WEIGHT * (cpu_overhead * 100.0))
            + ((1.0 - PAUSE_OVERHEAD_BLEND_WEIGHT) * pause_overhead_pct);
        hybrid_pct / 100.0
    }
}

pub struct EdenSizer {
    region_size: usize,
    number_of_heap_regions: usize,
    eden_region_count: usize,
    ideal_eden_region_count: usize,
    minimum_eden_region_count: usize,
    /// Pending change to the ideal Eden size, in regions, consumed on the
    /// next [`EdenSizer::calculate_eden_size`].
    eden_size_factor: isize,
    /// Fitted coupling between Eden size and pause time; see
    /// [`EdenSizer::update_pgc_time_prediction`].
    pgc_time_increase_per_eden_region_factor: f64,
    overhead_model: Box<dyn PauseOverheadModel>,
}

impl std::fmt::Debug for EdenSizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdenSizer")
            .field("eden_region_count", &self.eden_region_count)
            .field("ideal_eden_region_count", &self.ideal_eden_region_count)
            .field("minimum_eden_region_count", &self.minimum_eden_region_count)
            .field("eden_size_factor", &self.eden_size_factor)
            .field(
                "pgc_time_increase_per_eden_region_factor",
                &self.pgc_time_increase_per_eden_region_factor,
            )
            .finish()
    }
}

impl Default for EdenSizer {
    fn default() -> Self {
        EdenSizer {
            region_size: 0,
            number_of_heap_regions: 0,
            eden_region_count: 0,
            ideal_eden_region_count: 0,
            minimum_eden_region_count: 0,
            eden_size_factor: 0,
            pgc_time_increase_per_eden_region_factor:
                INITIAL_PGC_TIME_INCREASE_PER_EDEN_REGION_FACTOR,
            overhead_model: Box::new(HybridOverheadModel),
        }
    }
}

impl EdenSizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overhead_model(model: Box<dyn PauseOverheadModel>) -> Self {
        EdenSizer {
            overhead_model: model,
            ..Default::default()
        }
    }

    pub fn region_size(&self) -> usize {
        self.region_size
    }

    pub fn eden_region_count(&self) -> usize {
        self.eden_region_count
    }

    pub fn ideal_eden_region_count(&self) -> usize {
        self.ideal_eden_region_count
    }

    pub fn minimum_eden_region_count(&self) -> usize {
        self.minimum_eden_region_count
    }

    pub fn number_of_heap_regions(&self) -> usize {
        self.number_of_heap_regions
    }

    pub fn current_eden_size_in_bytes(&self) -> usize {
        conversions::regions_to_bytes(self.eden_region_count, self.region_size)
    }

    pub fn ideal_eden_size_in_bytes(&self) -> usize {
        conversions::regions_to_bytes(self.ideal_eden_region_count, self.region_size)
    }

    /// Re-derive geometry and the ideal Eden after the heap was resized.
    ///
    /// During the startup phase the ideal Eden interpolates linearly
    /// between the configured Eden bounds in proportion to how far the
    /// heap has expanded from its initial toward its maximum size. Once
    /// startup is over the ideal Eden is owned by the overhead feedback
    /// and is left unchanged here.
    pub fn reconfigure(&mut self, heap: &dyn HeapView, options: &Options, startup_phase_finished: bool) {
        let region_size = heap.region_size();
        assert!(region_size > 0);
        self.region_size = region_size;
        self.number_of_heap_regions = heap.managed_region_count();
        let current_heap_size = self.number_of_heap_regions * region_size;

        let eden_maximum_bytes = if *options.tarok_ideal_eden_maximum_bytes != 0 {
            *options.tarok_ideal_eden_maximum_bytes
        } else {
            (current_heap_size as f64 * MAX_EDEN_PERCENT) as usize
        };
        let eden_minimum_bytes = if *options.tarok_ideal_eden_minimum_bytes != 0 {
            *options.tarok_ideal_eden_minimum_bytes
        } else {
            region_size
        };

        // The heap may come up one region short of the requested size, so
        // treat the reachable minimum as the real minimum.
        let minimum_heap = std::cmp::min(*options.initial_memory_size, current_heap_size);
        let maximum_heap = *options.memory_max;

        let eden_ideal_bytes = if startup_phase_finished {
            // Eden size is driven by GC overhead and pause time now; if it
            // needs to change, it changes elsewhere.
            self.ideal_eden_size_in_bytes()
        } else if current_heap_size >= maximum_heap {
            eden_maximum_bytes
        } else {
            // For -XmsA -XmxB -XmnsC -XmnxD at current heap size W:
            // ideal := C + ((W-A)/(B-A))(D-C)
            let heap_bytes_over_minimum = current_heap_size - minimum_heap;
            let maximum_heap_variation = maximum_heap - minimum_heap;
            assert!(maximum_heap_variation != 0);
            let ratio_of_heap_expanded =
                heap_bytes_over_minimum as f64 / maximum_heap_variation as f64;
            let maximum_eden_variation = eden_maximum_bytes.saturating_sub(eden_minimum_bytes);
            eden_minimum_bytes + (ratio_of_heap_expanded * maximum_eden_variation as f64) as usize
        };

        self.ideal_eden_region_count = conversions::bytes_to_regions_up(eden_ideal_bytes, region_size);
        assert!(self.ideal_eden_region_count > 0);
        self.minimum_eden_region_count = std::cmp::min(
            self.ideal_eden_region_count,
            heap.allocation_context_count(),
        );
        assert!(self.minimum_eden_region_count > 0);
        assert!(self.ideal_eden_region_count >= self.minimum_eden_region_count);

        debug!(
            "heap reconfigured: {} regions, ideal eden {} regions, minimum eden {} regions",
            self.number_of_heap_regions, self.ideal_eden_region_count, self.minimum_eden_region_count
        );

        self.calculate_eden_size(heap.free_region_count(), options, startup_phase_finished);
    }

    /// Consume the pending size factor into the ideal Eden region count,
    /// clamped to the configured or percent-of-heap bounds.
    fn adjust_ideal_eden_region_count(&mut self, options: &Options, startup_phase_finished: bool) {
        let mut eden_change = self.eden_size_factor;
        // The factor is consumed even when ignored below.
        self.eden_size_factor = 0;

        if !startup_phase_finished {
            // During startup the ideal Eden is owned by reconfigure().
            return;
        }

        let mut max_eden_count = (self.number_of_heap_regions as f64 * MAX_EDEN_PERCENT) as usize;
        let mut min_eden_count = (self.number_of_heap_regions as f64 * MIN_EDEN_PERCENT) as usize;

        // User-specified Eden bounds take precedence over the percent
        // clamps.
        if *options.tarok_eden_minimum_specified {
            min_eden_count = *options.tarok_ideal_eden_minimum_bytes / self.region_size;
        }
        if *options.tarok_eden_maximum_specified {
            max_eden_count = *options.tarok_ideal_eden_maximum_bytes / self.region_size;
        }

        let possible_eden_region_count = self.ideal_eden_region_count as isize + eden_change;
        if (min_eden_count as isize) > possible_eden_region_count {
            eden_change = min_eden_count as isize - self.ideal_eden_region_count as isize;
        } else if (max_eden_count as isize) < possible_eden_region_count {
            eden_change = max_eden_count as isize - self.ideal_eden_region_count as isize;
        }

        let ideal = self.ideal_eden_region_count as isize + eden_change;
        self.ideal_eden_region_count = std::cmp::max(1, ideal) as usize;
        self.minimum_eden_region_count =
            std::cmp::min(self.minimum_eden_region_count, self.ideal_eden_region_count);
    }

    /// Fix the actual Eden for the next partial collection: the ideal,
    /// bounded below by the minimum and above by what is actually free.
    pub fn calculate_eden_size(&mut self, free_region_count: usize, options: &Options, startup_phase_finished: bool) {
        self.adjust_ideal_eden_region_count(options, startup_phase_finished);

        let eden_minimum_count = self.minimum_eden_region_count;
        let eden_maximum_count = self.ideal_eden_region_count;
        assert!(eden_minimum_count >= MINIMUM_EDEN_REGIONS, "heap geometry not configured");
        assert!(eden_maximum_count >= eden_minimum_count);

        let desired_eden_count = free_region_count.clamp(eden_minimum_count, eden_maximum_count);
        if desired_eden_count <= free_region_count {
            self.eden_region_count = desired_eden_count;
        } else {
            // Not enough free memory for the desired Eden. Let Eden shrink
            // to what is free (possibly below the minimum, possibly zero)
            // before an allocation-failure global collection is forced.
            trace!(
                "eden reduced below desired {} to {} free regions",
                desired_eden_count,
                free_region_count
            );
            self.eden_region_count = free_region_count;
        }
    }

    /// Refit the pause model through (minimum Eden, minimum pause) and the
    /// observed (current Eden, historic pause).
    ///
    /// The closer the factor is to 1.0, the more directly an Eden change
    /// moves the pause. Degenerate anchors (Eden at minimum, pause at
    /// floor) leave the previous fit in place.
    pub fn update_pgc_time_prediction(&mut self, historical_pgc_time_ms: u64) {
        let x1 = MINIMUM_EDEN_REGIONS as f64;
        let y1 = MINIMUM_PGC_TIME_MS as f64;
        let x2 = self.eden_region_count as f64;
        let y2 = historical_pgc_time_ms as f64;

        if x1 < x2 && y1 < y2 {
            let time_diff = y1 - y2;
            let eden_size_ratio = (x1 + 1.0) / (x2 + 1.0);
            self.pgc_time_increase_per_eden_region_factor = eden_size_ratio.powf(1.0 / time_diff);
        }
    }

    /// Predicted average pause of a partial collection if Eden changed by
    /// `eden_size_change` bytes, in microseconds.
    pub fn predict_pgc_time_us(&self, historical_pgc_time_ms: u64, eden_size_change: isize) -> f64 {
        let eden_region_change = eden_size_change as f64 / self.region_size as f64;
        let current_eden_regions = self.eden_region_count as f64;
        let eden_change_ratio =
            (eden_region_change + current_eden_regions + 1.0) / (current_eden_regions + 1.0);

        // A candidate shrinking past the regions Eden actually holds would
        // take the log of a non-positive ratio; such a pause can only be
        // the floor.
        if eden_change_ratio <= 0.0 {
            return MINIMUM_PGC_TIME_MS as f64 * 1000.0;
        }

        // log base `factor` of the Eden ratio.
        let pgc_time_change_ms =
            eden_change_ratio.ln() / self.pgc_time_increase_per_eden_region_factor.ln();
        let predicted_ms = historical_pgc_time_ms as f64 + pgc_time_change_ms;

        predicted_ms.max(MINIMUM_PGC_TIME_MS as f64) * 1000.0
    }

    /// Interval between collections scales with Eden: twice the Eden,
    /// twice the allocation runway.
    fn predict_interval_between_collections(
        &self,
        current_eden_size: usize,
        eden_size_change: isize,
        avg_pgc_interval_us: u64,
    ) -> f64 {
        let interval_change =
            (current_eden_size as f64 + eden_size_change as f64) / current_eden_size as f64;
        avg_pgc_interval_us as f64 * interval_change
    }

    /// Collections per GMP interval scale with the free tenure left after
    /// the Eden change.
    fn predict_number_of_collections(
        &self,
        projection: &EdenProjection,
        eden_size_change: isize,
        free_tenure: usize,
    ) -> f64 {
        let collection_count_change =
            (free_tenure as f64 - eden_size_change as f64) / free_tenure as f64;
        projection.representative_pgc_per_gmp * collection_count_change
    }

    /// Fraction of wall-clock time GC would be active at the candidate
    /// Eden size, in `[0, 1]`.
    fn predict_cpu_overhead(
        &self,
        projection: &EdenProjection,
        current_eden_size: usize,
        eden_size_change: isize,
        free_tenure: usize,
    ) -> f64 {
        let predicted_collections =
            self.predict_number_of_collections(projection, eden_size_change, free_tenure);
        let predicted_interval_us = self.predict_interval_between_collections(
            current_eden_size,
            eden_size_change,
            projection.avg_pgc_interval_us,
        );
        let predicted_pgc_time_us =
            self.predict_pgc_time_us(projection.historical_pgc_time_ms, eden_size_change);

        let gmp_time_us = if projection.total_gmp_work_time_us != 0 {
            projection.total_gmp_work_time_us as f64
        } else {
            // No GMP observed yet: guess high, so Eden treats GMP as very
            // expensive relative to PGC.
            (20 * projection.historical_pgc_time_ms * 1000) as f64
        };

        let gc_active_time = gmp_time_us + predicted_pgc_time_us * predicted_collections;
        let total_interval_time =
            gmp_time_us + (predicted_pgc_time_us + predicted_interval_us) * predicted_collections;

        gc_active_time / total_interval_time
    }

    /// Blend a pause and a CPU overhead through the pause model.
    pub fn hybrid_overhead(
        &self,
        pgc_time_ms: u64,
        cpu_overhead: f64,
        options: &Options,
        heap_fully_expanded: bool,
    ) -> f64 {
        let band = OverheadBand::from_options(options, heap_fully_expanded);
        let pause_overhead_pct = self.overhead_model.map_pause_to_overhead(pgc_time_ms, band);
        self.overhead_model.blend(cpu_overhead, pause_overhead_pct)
    }

    /// Search the projected hybrid-overhead curve for the best Eden size,
    /// in bytes.
    ///
    /// Samples candidate changes uniformly between shrinking Eden away
    /// entirely and absorbing the free tenure, keeping the current size
    /// unless a candidate strictly improves on it.
    pub fn calculate_recommended_eden_size(
        &self,
        projection: &EdenProjection,
        options: &Options,
    ) -> usize {
        let current_ideal_eden_size = self.ideal_eden_size_in_bytes();
        let current_heap_size = self.number_of_heap_regions * self.region_size;

        // Free space outside Eden and survivors, with headroom so the
        // plan never counts on exhausting it.
        let mut free_tenure = std::cmp::max(
            (projection.estimated_free_tenure as f64 * FREE_TENURE_HEADROOM) as usize,
            1,
        );
        if projection.total_gmp_work_time_us == 0 {
            // No GMP yet, so the census never ran and the free-tenure
            // estimate is still zero. Derive one from PGC-side figures.
            let survivor_bytes = (projection.average_survivor_set_region_count
                * self.region_size as f64) as isize;
            let free_tenure_from_pgc_info = current_heap_size as isize
                - current_ideal_eden_size as isize
                - projection.live_set_bytes_after_partial_collect as isize
                - survivor_bytes;
            free_tenure = if free_tenure_from_pgc_info > 0 {
                free_tenure_from_pgc_info as usize
            } else {
                1
            };
        }
        assert!(free_tenure != 0);

        let min_eden_change = -(current_ideal_eden_size as isize);
        let max_eden_change = free_tenure as isize;

        // The current size is the one to beat.
        let current_cpu_overhead =
            self.predict_cpu_overhead(projection, current_ideal_eden_size, 0, free_tenure);
        let mut best_overhead_prediction = self.hybrid_overhead(
            projection.historical_pgc_time_ms,
            current_cpu_overhead,
            options,
            projection.heap_fully_expanded,
        );
        let mut recommended_eden_change = 0isize;

        let sampling_granularity =
            ((max_eden_change - min_eden_change) as usize / EDEN_SIZE_SAMPLES) as isize;

        for i in 0..EDEN_SIZE_SAMPLES {
            // Walk from the right edge of the curve down.
            let eden_change = max_eden_change - sampling_granularity * i as isize;

            let estimated_cpu_overhead = self.predict_cpu_overhead(
                projection,
                current_ideal_eden_size,
                eden_change,
                free_tenure,
            );
            let estimated_pgc_time_us =
                self.predict_pgc_time_us(projection.historical_pgc_time_ms, eden_change);
            let estimated_hybrid_overhead = self.hybrid_overhead(
                (estimated_pgc_time_us / 1000.0) as u64,
                estimated_cpu_overhead,
                options,
                projection.heap_fully_expanded,
            );

            if estimated_hybrid_overhead < best_overhead_prediction {
                recommended_eden_change = eden_change;
                best_overhead_prediction = estimated_hybrid_overhead;
            }
        }

        let recommended_size =
            (current_ideal_eden_size as isize + recommended_eden_change) as usize;
        debug!(
            "recommended eden {} bytes (change {}, predicted overhead {}, free tenure {})",
            recommended_size, recommended_eden_change, best_overhead_prediction, free_tenure
        );
        recommended_size
    }

    /// Step the ideal Eden a fraction of the way toward the recommended
    /// size. A speed of 1 jumps all the way; smaller speeds converge over
    /// several collections so the averaged statistics can keep up.
    pub fn move_toward_recommended_eden(
        &mut self,
        eden_change_speed: f64,
        projection: &EdenProjection,
        options: &Options,
    ) {
        debug_assert!((0.0..=1.0).contains(&eden_change_speed));

        if projection.historical_pgc_time_ms == 0 || projection.avg_pgc_interval_us == 0 {
            // No pause data yet; an informed decision is not possible.
            return;
        }

        let recommended_eden_size_bytes = self.calculate_recommended_eden_size(projection, options);
        let current_ideal_eden_bytes = self.ideal_eden_size_in_bytes();

        let eden_change = recommended_eden_size_bytes as isize - current_ideal_eden_bytes as isize;
        let target_eden_change = (eden_change as f64 * eden_change_speed) as isize;
        let target_eden_bytes = (current_ideal_eden_bytes as isize + target_eden_change) as usize;
        let target_eden_regions = conversions::bytes_to_regions_down(target_eden_bytes, self.region_size);

        self.eden_size_factor =
            target_eden_regions as isize - self.ideal_eden_region_count as isize;
    }

    /// The small corrective step: when the observed hybrid overhead falls
    /// outside the acceptable band, nudge Eden by 10% in the direction
    /// that moves the overhead back toward it.
    pub fn apply_overhead_band_step(&mut self, hybrid_overhead: f64, options: &Options) {
        let eden_change_magnitude = ((0.1 * self.ideal_eden_size_in_bytes() as f64)
            / self.region_size as f64)
            .ceil() as isize;

        let mut eden_region_change = 0isize;
        if *options.dnss_expected_time_ratio_minimum > hybrid_overhead {
            // Too little overhead: Eden is larger than it needs to be.
            eden_region_change = -eden_change_magnitude;
        } else if *options.dnss_expected_time_ratio_maximum < hybrid_overhead {
            eden_region_change = eden_change_magnitude;
        }

        self.eden_size_factor += eden_region_change;
    }

    /// Whether this partial collection is one where the periodic full
    /// re-evaluation fires.
    pub fn should_reevaluate(pgc_count_since_gmp_end: usize) -> bool {
        pgc_count_since_gmp_end & (CONSECUTIVE_PGC_TO_CHANGE_EDEN - 1) == 0
    }

    #[cfg(test)]
    pub fn set_geometry_for_test(
        &mut self,
        region_size: usize,
        number_of_heap_regions: usize,
        eden_region_count: usize,
        ideal_eden_region_count: usize,
        minimum_eden_region_count: usize,
    ) {
        self.region_size = region_size;
        self.number_of_heap_regions = number_of_heap_regions;
        self.eden_region_count = eden_region_count;
        self.ideal_eden_region_count = ideal_eden_region_count;
        self.minimum_eden_region_count = minimum_eden_region_count;
    }

    pub fn eden_size_factor(&self) -> isize {
        self.eden_size_factor
    }
}
