//! Defragmentation census and compact-work estimation.
//!
//! After each global sweep the scheduler walks the region table, decides
//! which regions are worth defragmenting, and derives how much compact
//! work each partial collection should schedule to keep pace with the
//! consumption rate.

use crate::scheduler::copy_forward::CopyForwardEstimator;
use crate::scheduler::kickoff::GmpKickoffPlanner;
use crate::util::constants::AUTOMATIC_DEFRAGMENT_EMPTINESS_THRESHOLD;
use crate::util::heap::region::{HeapView, RegionData};
use crate::util::math;
use crate::util::options::Options;

#[derive(Debug, Clone)]
pub struct DefragmentModel {
    /// How many bytes must be compacted to recover one free byte,
    /// according to the last census.
    bytes_compacted_to_free_bytes_ratio: f64,
    average_macro_defragmentation_work: f64,
    current_macro_defragmentation_work: usize,
    /// Free space outside Eden, survivors and headroom, per the last
    /// census.
    estimated_free_tenure: usize,
    automatic_defragment_emptiness_threshold: f64,
}

impl Default for DefragmentModel {
    fn default() -> Self {
        DefragmentModel {
            bytes_compacted_to_free_bytes_ratio: 0.0,
            average_macro_defragmentation_work: 0.0,
            current_macro_defragmentation_work: 0,
            estimated_free_tenure: 0,
            automatic_defragment_emptiness_threshold: AUTOMATIC_DEFRAGMENT_EMPTINESS_THRESHOLD,
        }
    }
}

impl DefragmentModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emptiness a region must exceed to be worth copy-forwarding.
    ///
    /// Copy-forwarded regions should ideally come out full, but
    /// parallelism and compact groups leave some slack; regions emptier
    /// than the historic slack are the ones likely to become denser.
    pub fn defragment_emptiness_threshold(
        &self,
        copy_forward: &CopyForwardEstimator,
        options: &Options,
    ) -> f64 {
        let average_emptiness = copy_forward.average_emptiness_of_copy_forwarded_regions();
        if *options.tarok_automatic_defragment_emptiness_threshold {
            self.automatic_defragment_emptiness_threshold.max(average_emptiness)
        } else if *options.tarok_defragment_emptiness_threshold != 0.0 {
            // Set on the command line.
            *options.tarok_defragment_emptiness_threshold
        } else {
            average_emptiness
        }
    }

    /// Record defragmentation work for one region merging into the oldest
    /// compact group.
    ///
    /// This is an overestimate: the same work is often counted both as
    /// source and as destination, and a tighter estimate would need the
    /// whole oldest age group (knapsack problem).
    pub fn update_current_macro_defragmentation_work(
        &mut self,
        region: &RegionData,
        region_size: usize,
        copy_forward: &CopyForwardEstimator,
    ) {
        let free_memory = region.free_memory_and_dark_matter;
        let live_data = region_size.saturating_sub(free_memory);

        let discard_ratio = copy_forward.bytes_discarded_per_byte_copied();
        let estimated_free_memory_discarded = (live_data as f64 * discard_ratio) as usize;
        let recoverable_free_memory = free_memory.saturating_sub(estimated_free_memory_discarded);

        self.current_macro_defragmentation_work +=
            std::cmp::min(recoverable_free_memory, live_data);
    }

    /// Fold the macro defragmentation work accumulated since the last
    /// partial collection into the running average and reset the
    /// accumulator.
    pub fn estimate_macro_defragmentation_work(&mut self, historic_weight: f64) {
        self.average_macro_defragmentation_work = math::weighted_average(
            self.average_macro_defragmentation_work,
            self.current_macro_defragmentation_work as f64,
            historic_weight,
        );
        trace!(
            "macro defragmentation work: current {} average {}",
            self.current_macro_defragmentation_work,
            self.average_macro_defragmentation_work
        );
        self.current_macro_defragmentation_work = 0;
    }

    /// Census of the region table after a global sweep.
    ///
    /// Tags defragmentation targets, derives the compacted-to-free ratio
    /// driving per-PGC compact work, refreshes the kickoff headroom and
    /// the free-tenure estimate.
    pub fn calculate_pgc_compaction_rate(
        &mut self,
        heap: &dyn HeapView,
        eden_size_in_bytes: usize,
        copy_forward: &CopyForwardEstimator,
        kickoff: &mut GmpKickoffPlanner,
        options: &Options,
    ) {
        let defragment_emptiness_threshold =
            self.defragment_emptiness_threshold(copy_forward, options);
        assert!(
            (0.0..=1.0).contains(&defragment_emptiness_threshold),
            "defragment emptiness threshold {} out of range",
            defragment_emptiness_threshold
        );
        let region_size = heap.region_size();

        let mut total_live_data_in_collectible_regions = 0usize;
        let mut total_live_data_in_non_collectible_regions = 0usize;
        let mut fully_compacted_data = 0usize;

        let mut collectible_regions = 0usize;
        let mut non_collectible_regions = 0usize;
        let mut fully_compacted_regions = 0usize;
        let mut free_regions = 0usize;

        let mut free_region_memory = 0usize;
        let mut defragmented_memory = 0usize;

        for region in heap.regions() {
            heap.set_defragmentation_target(region.index, false);
            if region.contains_objects {
                let free_memory = region.free_memory_and_dark_matter;
                let live_data = region_size.saturating_sub(free_memory);
                if !region.remembered_set_accurate {
                    // Overflowed remembered sets (or ones being rebuilt)
                    // cannot be compacted.
                    non_collectible_regions += 1;
                    total_live_data_in_non_collectible_regions += live_data;
                } else {
                    let emptiness = free_memory as f64 / region_size as f64;
                    assert!((0.0..=1.0).contains(&emptiness));

                    // Only regions likely to become denser when
                    // copy-forwarded are worth the work.
                    if emptiness > defragment_emptiness_threshold {
                        collectible_regions += 1;
                        let weighted_survival_rate =
                            heap.weighted_survival_rate(region.compact_group);
                        let potential_wasted_work =
                            (1.0 - weighted_survival_rate) * (1.0 - emptiness);

                        // The chance of actually recovering the free memory
                        // tracks the gainful share of the work.
                        defragmented_memory +=
                            (free_memory as f64 * (1.0 - potential_wasted_work)) as usize;
                        total_live_data_in_collectible_regions +=
                            (live_data as f64 * (1.0 - potential_wasted_work)) as usize;
                        heap.set_defragmentation_target(region.index, true);
                    } else {
                        // Right after the sweep preceding the first PGC
                        // after a GMP, Eden regions allocated since the
                        // final mark show up here as fully compacted.
                        fully_compacted_regions += 1;
                        fully_compacted_data += live_data;
                    }
                }
            } else if region.is_free_or_idle {
                free_regions += 1;
                free_region_memory += region_size;
            }
        }

        // The survivor space reservation covers the nursery set, the
        // dynamic collection set and the compaction set.
        let survivor_size =
            (region_size as f64 * copy_forward.average_survivor_set_region_count()) as usize;
        let mut reserved_free_memory = eden_size_in_bytes + survivor_size;
        let estimated_free_memory = GmpKickoffPlanner::estimate_total_free_memory(
            free_region_memory,
            defragmented_memory,
            reserved_free_memory,
        );
        kickoff.calculate_kickoff_headroom(estimated_free_memory, options);

        // Redo the estimate with the refreshed headroom reserved as well;
        // this is the free-tenure figure Eden sizing works against.
        reserved_free_memory += kickoff.kickoff_headroom_in_bytes();
        let estimated_free_memory = GmpKickoffPlanner::estimate_total_free_memory(
            free_region_memory,
            defragmented_memory,
            reserved_free_memory,
        );
        self.estimated_free_tenure = estimated_free_memory;

        let discard_ratio = copy_forward.bytes_discarded_per_byte_copied();
        let estimated_free_memory_discarded =
            total_live_data_in_collectible_regions as f64 * discard_ratio;
        let recoverable_free_memory = estimated_free_memory as f64 - estimated_free_memory_discarded;

        self.bytes_compacted_to_free_bytes_ratio = if recoverable_free_memory > 0.0 {
            total_live_data_in_collectible_regions as f64 / recoverable_free_memory
        } else {
            (heap.managed_region_count() + 1) as f64
        };

        debug!(
            "compaction census: collectible {} (live {}), non-collectible {} (live {}), fully compacted {} (live {}), free {}, ratio {}, free tenure {}",
            collectible_regions,
            total_live_data_in_collectible_regions,
            non_collectible_regions,
            total_live_data_in_non_collectible_regions,
            fully_compacted_regions,
            fully_compacted_data,
            free_regions,
            self.bytes_compacted_to_free_bytes_ratio,
            self.estimated_free_tenure
        );
    }

    /// Compact work the next partial collection should schedule.
    pub fn desired_compact_work(&self, region_consumption_rate: f64, region_size: usize) -> usize {
        // Compact work mostly driven by mark/sweep data from the GMP.
        let mut desired_compact_work = (self.bytes_compacted_to_free_bytes_ratio
            * region_consumption_rate.max(0.0)
            * region_size as f64) as usize;

        // Defragmentation work mostly driven by compact-group merging
        // (maxAge - 1 into maxAge).
        desired_compact_work += self.average_macro_defragmentation_work as usize;

        desired_compact_work
    }

    /// Clear compaction state after a full global collection: the heap was
    /// fully compacted, so no work is left for partial collections.
    pub fn reset_after_global_collect(&mut self) {
        self.bytes_compacted_to_free_bytes_ratio = 0.0;
    }

    pub fn bytes_compacted_to_free_bytes_ratio(&self) -> f64 {
        self.bytes_compacted_to_free_bytes_ratio
    }

    pub fn estimated_free_tenure(&self) -> usize {
        self.estimated_free_tenure
    }

    pub fn average_macro_defragmentation_work(&self) -> f64 {
        self.average_macro_defragmentation_work
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emptiness_threshold_sources() {
        let mut copy_forward = CopyForwardEstimator::new();
        let model = DefragmentModel::new();
        let mut options = Options::default();

        // No history, nothing configured: everything qualifies.
        assert_eq!(model.defragment_emptiness_threshold(&copy_forward, &options), 0.0);

        // Command-line value wins when set.
        options.tarok_defragment_emptiness_threshold.value = 0.3;
        assert_eq!(model.defragment_emptiness_threshold(&copy_forward, &options), 0.3);

        // Automatic mode takes the max of the floor and observed emptiness.
        options.tarok_automatic_defragment_emptiness_threshold.value = true;
        let stats = crate::scheduler::cycle_stats::CopyForwardStats {
            copy_bytes_total: 600,
            copy_discard_bytes_total: 400,
            start_time: 0,
            end_time: 100,
            ..Default::default()
        };
        copy_forward.record(&stats, 1 << 20, 0.0);
        let threshold = model.defragment_emptiness_threshold(&copy_forward, &options);
        assert!((threshold - 0.4).abs() < 1e-9);
    }

    #[test]
    fn macro_work_caps_at_live_data() {
        let copy_forward = CopyForwardEstimator::new();
        let mut model = DefragmentModel::new();
        let region_size = 1 << 20;

        // Mostly empty region: recoverable free memory far exceeds live
        // data, so the contribution is the live data.
        let region = RegionData {
            free_memory_and_dark_matter: region_size - 1000,
            ..Default::default()
        };
        model.update_current_macro_defragmentation_work(&region, region_size, &copy_forward);
        assert_eq!(model.current_macro_defragmentation_work, 1000);

        model.estimate_macro_defragmentation_work(0.0);
        assert_eq!(model.average_macro_defragmentation_work(), 1000.0);
        assert_eq!(model.current_macro_defragmentation_work, 0);
    }

    #[test]
    fn desired_compact_work_combines_ratio_and_macro_work() {
        let mut model = DefragmentModel::new();
        model.bytes_compacted_to_free_bytes_ratio = 2.0;
        model.average_macro_defragmentation_work = 500.0;
        assert_eq!(model.desired_compact_work(1.5, 1000), 3500);
        // Negative consumption clamps to zero compact work from the ratio.
        assert_eq!(model.desired_compact_work(-1.0, 1000), 500);
    }
}
