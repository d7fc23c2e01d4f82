//! Region consumption tracking across partial collections.

use crate::util::math;

/// Tracks how many reclaimable regions each partial collection consumes,
/// for the total reclaimable set and for the defragment-reclaimable
/// subset.
///
/// Consumption may be negative when a collection recovers more than an
/// Eden's worth of memory, so the rates are signed.
#[derive(Debug, Clone, Default)]
pub struct ConsumptionEstimator {
    previous_reclaimable_regions: usize,
    previous_defragment_reclaimable_regions: usize,
    region_consumption_rate: f64,
    defragment_region_consumption_rate: f64,
}

impl ConsumptionEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the post-collection reclaimable counts into the consumption
    /// rates.
    ///
    /// A zero previous count means this is the first partial collection
    /// after a global mark phase; the mark changed reclaimability
    /// non-linearly, so that sample only re-establishes the baseline.
    pub fn measure(
        &mut self,
        current_reclaimable_regions: usize,
        current_defragment_reclaimable_regions: usize,
        historic_weight: f64,
    ) {
        if self.previous_reclaimable_regions == 0 {
            debug!("consumption: no previous reclaimable baseline, sample discarded");
        } else {
            let regions_consumed =
                self.previous_reclaimable_regions as f64 - current_reclaimable_regions as f64;
            self.region_consumption_rate = math::weighted_average(
                self.region_consumption_rate,
                regions_consumed,
                historic_weight,
            );
            trace!(
                "consumption: consumed {} (prev {} cur {}), rate {}",
                regions_consumed,
                self.previous_reclaimable_regions,
                current_reclaimable_regions,
                self.region_consumption_rate
            );
        }
        self.previous_reclaimable_regions = current_reclaimable_regions;

        if self.previous_defragment_reclaimable_regions == 0 {
            debug!("consumption: no previous defragment baseline, sample discarded");
        } else {
            let defragment_regions_consumed = self.previous_defragment_reclaimable_regions as f64
                - current_defragment_reclaimable_regions as f64;
            self.defragment_region_consumption_rate = math::weighted_average(
                self.defragment_region_consumption_rate,
                defragment_regions_consumed,
                historic_weight,
            );
        }
        self.previous_defragment_reclaimable_regions = current_defragment_reclaimable_regions;
    }

    /// Re-establish the baselines without measuring consumption (after a
    /// global collection, or when a global mark phase invalidated the
    /// estimates).
    pub fn reset_baselines(&mut self, reclaimable_regions: usize, defragment_reclaimable_regions: usize) {
        self.previous_reclaimable_regions = reclaimable_regions;
        self.previous_defragment_reclaimable_regions = defragment_reclaimable_regions;
    }

    /// Clear the total-reclaimable baseline so the next sample is treated
    /// as the first after a global mark phase.
    pub fn invalidate_reclaimable_baseline(&mut self) {
        self.previous_reclaimable_regions = 0;
    }

    pub fn region_consumption_rate(&self) -> f64 {
        self.region_consumption_rate
    }

    pub fn defragment_region_consumption_rate(&self) -> f64 {
        self.defragment_region_consumption_rate
    }

    pub fn previous_reclaimable_regions(&self) -> usize {
        self.previous_reclaimable_regions
    }

    pub fn previous_defragment_reclaimable_regions(&self) -> usize {
        self.previous_defragment_reclaimable_regions
    }
}
