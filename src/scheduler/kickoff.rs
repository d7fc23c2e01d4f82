//! GMP kickoff planning: how many partial collections remain before the
//! heap is exhausted, and how much safety margin to keep.

use crate::scheduler::consumption::ConsumptionEstimator;
use crate::scheduler::copy_forward::CopyForwardEstimator;
use crate::util::options::Options;

/// Plans when the next global mark phase must start so that it completes
/// before the reclaimable regions run out.
#[derive(Debug, Clone)]
pub struct GmpKickoffPlanner {
    /// Safety margin in bytes subtracted from the projected runway.
    /// Recomputed from the heap census unless pinned by configuration.
    kickoff_headroom_in_bytes: usize,
}

impl GmpKickoffPlanner {
    pub fn new(options: &Options) -> Self {
        GmpKickoffPlanner {
            kickoff_headroom_in_bytes: *options.tarok_kickoff_headroom_in_bytes,
        }
    }

    pub fn kickoff_headroom_in_bytes(&self) -> usize {
        self.kickoff_headroom_in_bytes
    }

    /// Free memory that kickoff decisions may count on: defragmentable
    /// plus free-region memory, excluding the Eden and survivor
    /// reservation.
    pub fn estimate_total_free_memory(
        free_region_memory: usize,
        defragmented_memory: usize,
        reserved_free_memory: usize,
    ) -> usize {
        let estimated_free_memory =
            (defragmented_memory + free_region_memory).saturating_sub(reserved_free_memory);
        trace!(
            "estimated free memory {} (reserved {}, defragmented {}, free regions {})",
            estimated_free_memory,
            reserved_free_memory,
            defragmented_memory,
            free_region_memory
        );
        estimated_free_memory
    }

    /// Recompute the kickoff headroom as a share of estimated free memory,
    /// unless the configured value is forced.
    pub fn calculate_kickoff_headroom(&mut self, total_free_memory: usize, options: &Options) -> usize {
        if *options.tarok_force_kickoff_headroom_in_bytes {
            return self.kickoff_headroom_in_bytes;
        }
        let new_headroom = total_free_memory * *options.tarok_kickoff_headroom_region_rate / 100;
        trace!(
            "kickoff headroom {} -> {}",
            self.kickoff_headroom_in_bytes,
            new_headroom
        );
        self.kickoff_headroom_in_bytes = new_headroom;
        new_headroom
    }

    /// Seed the headroom before the first census: everything outside Eden
    /// counts as free.
    pub fn initialize_kickoff_headroom(
        &mut self,
        total_heap_size: usize,
        eden_size_bytes: usize,
        options: &Options,
    ) -> usize {
        let total_free_memory = total_heap_size.saturating_sub(eden_size_bytes);
        self.calculate_kickoff_headroom(total_free_memory, options)
    }

    /// Project how many partial collections can still run before an
    /// allocation failure, based on the region consumption rate and the
    /// reclaimable-region estimate.
    ///
    /// Copy-forward collections need free destination regions for the
    /// survivor set, so their runway counts free plus recoverable regions
    /// against Eden plus survivors. Mark-sweep-compact selection is driven
    /// by the free-region goal and counts on reclaimable regions alone.
    pub fn estimate_partial_gcs_remaining(
        &self,
        consumption: &ConsumptionEstimator,
        copy_forward: &CopyForwardEstimator,
        ideal_eden_region_count: usize,
        free_region_count: usize,
        should_run_copy_forward: bool,
    ) -> usize {
        let rate = consumption.region_consumption_rate();
        let mut partial_collects_remaining = usize::MAX;

        if rate > 0.0 {
            let eden_regions = ideal_eden_region_count as f64;
            let defragment_reclaimable =
                consumption.previous_defragment_reclaimable_regions() as f64;

            if should_run_copy_forward {
                let survivor_regions = copy_forward.average_survivor_set_region_count();
                let free_regions = free_region_count as f64;

                // The defragment-reclaimable count is a total and includes
                // the free regions.
                assert!(
                    defragment_reclaimable >= free_regions,
                    "defragment reclaimable region count {} below free region count {}",
                    defragment_reclaimable,
                    free_regions
                );
                let recoverable_regions = defragment_reclaimable - free_regions;

                if free_regions + recoverable_regions > eden_regions + survivor_regions {
                    partial_collects_remaining = ((free_regions + recoverable_regions
                        - eden_regions
                        - survivor_regions)
                        / rate) as usize;
                } else {
                    partial_collects_remaining = 0;
                }
            } else if defragment_reclaimable > eden_regions {
                partial_collects_remaining =
                    ((defragment_reclaimable - eden_regions) / rate) as usize;
            } else {
                partial_collects_remaining = 0;
            }
        }

        trace!(
            "estimated partial collects remaining: {} (rate {})",
            partial_collects_remaining,
            rate
        );
        partial_collects_remaining
    }

    /// Kickoff headroom expressed in global mark increments.
    pub fn global_mark_increment_headroom(
        &self,
        region_consumption_rate: f64,
        region_size: usize,
        options: &Options,
    ) -> usize {
        if region_consumption_rate <= 0.0 {
            return 0;
        }
        let headroom_regions = self.kickoff_headroom_in_bytes as f64 / region_size as f64;
        let headroom_partial_gcs = headroom_regions / region_consumption_rate;
        let headroom_increments = headroom_partial_gcs
            * *options.tarok_pgc_to_gmp_denominator as f64
            / *options.tarok_pgc_to_gmp_numerator as f64;
        headroom_increments.ceil() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants::BYTES_IN_MBYTE;

    #[test]
    fn mark_sweep_runway_counts_reclaimable_minus_eden() {
        // One region consumed at historic weight 0.75 leaves a rate of
        // 0.25 regions per collection, with 200 defragment-reclaimable
        // regions remaining.
        let mut consumption = ConsumptionEstimator::new();
        consumption.measure(201, 201, 0.75);
        consumption.measure(200, 200, 0.75);
        assert!((consumption.region_consumption_rate() - 0.25).abs() < 1e-9);

        let copy_forward = CopyForwardEstimator::new();
        let planner = GmpKickoffPlanner::new(&Options::default());
        let remaining =
            planner.estimate_partial_gcs_remaining(&consumption, &copy_forward, 16, 0, false);
        assert_eq!(remaining, 736); // (200 - 16) / 0.25
    }

    #[test]
    fn no_consumption_history_means_unbounded_runway() {
        let mut consumption = ConsumptionEstimator::new();
        consumption.measure(100, 100, 0.80);
        let copy_forward = CopyForwardEstimator::new();
        let planner = GmpKickoffPlanner::new(&Options::default());
        let remaining =
            planner.estimate_partial_gcs_remaining(&consumption, &copy_forward, 16, 8, false);
        assert_eq!(remaining, usize::MAX);
    }

    #[test]
    fn copy_forward_runway_reserves_survivor_space() {
        let mut consumption = ConsumptionEstimator::new();
        consumption.measure(100, 100, 0.80);
        consumption.measure(98, 98, 0.0); // rate 2.0
        let mut copy_forward = CopyForwardEstimator::new();
        copy_forward.prime_average_survivor_set_region_count(10.0);
        let planner = GmpKickoffPlanner::new(&Options::default());
        // free 20, recoverable 98-20=78, eden 16, survivors 10:
        // (20 + 78 - 16 - 10) / 2 = 36.
        let remaining =
            planner.estimate_partial_gcs_remaining(&consumption, &copy_forward, 16, 20, true);
        assert_eq!(remaining, 36);

        // Runway exhausted when Eden and survivors exceed what is left.
        let remaining =
            planner.estimate_partial_gcs_remaining(&consumption, &copy_forward, 95, 20, true);
        assert_eq!(remaining, 0);
    }

    #[test]
    fn headroom_follows_free_memory_unless_forced() {
        let mut options = Options::default();
        options.tarok_kickoff_headroom_region_rate.value = 2;
        let mut planner = GmpKickoffPlanner::new(&options);
        assert_eq!(
            planner.calculate_kickoff_headroom(100 * BYTES_IN_MBYTE, &options),
            2 * BYTES_IN_MBYTE
        );

        options.tarok_force_kickoff_headroom_in_bytes.value = true;
        options.tarok_kickoff_headroom_in_bytes.value = 7 * BYTES_IN_MBYTE;
        let mut planner = GmpKickoffPlanner::new(&options);
        assert_eq!(
            planner.calculate_kickoff_headroom(100 * BYTES_IN_MBYTE, &options),
            7 * BYTES_IN_MBYTE
        );
    }

    #[test]
    fn increment_headroom_scales_by_ratio() {
        let mut options = Options::default();
        options.tarok_pgc_to_gmp_numerator.value = 1;
        options.tarok_pgc_to_gmp_denominator.value = 4;
        options.tarok_force_kickoff_headroom_in_bytes.value = true;
        options.tarok_kickoff_headroom_in_bytes.value = 8 * BYTES_IN_MBYTE;
        let planner = GmpKickoffPlanner::new(&options);
        // 8 regions of headroom at 0.5 regions per PGC is 16 PGCs, times
        // 4 GMP increments per PGC.
        assert_eq!(
            planner.global_mark_increment_headroom(0.5, BYTES_IN_MBYTE, &options),
            64
        );
        assert_eq!(planner.global_mark_increment_headroom(0.0, BYTES_IN_MBYTE, &options), 0);
    }
}
