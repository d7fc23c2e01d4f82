//! Copy-forward history: survivor volume, discard ratio and throughput.

use crate::scheduler::cycle_stats::CopyForwardStats;
use crate::util::conversions;
use crate::util::math;

/// Running averages over completed copy-forward collections.
#[derive(Debug, Clone)]
pub struct CopyForwardEstimator {
    eden_survival_rate: f64,
    non_eden_survivor_count: usize,
    average_survivor_set_region_count: f64,
    average_bytes_copied: f64,
    average_bytes_discarded: f64,
    average_copy_forward_rate: f64,
}

impl Default for CopyForwardEstimator {
    fn default() -> Self {
        CopyForwardEstimator {
            // Assume everything survives until measured otherwise.
            eden_survival_rate: 1.0,
            non_eden_survivor_count: 0,
            average_survivor_set_region_count: 0.0,
            average_bytes_copied: 0.0,
            average_bytes_discarded: 0.0,
            average_copy_forward_rate: 1.0,
        }
    }
}

impl CopyForwardEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a completed copy-forward into the byte, survivor and
    /// throughput averages.
    ///
    /// The survivor set is padded with the regions that *would* have been
    /// needed to finish without aborting: unevacuated scan bytes and
    /// externally compacted bytes, each rounded up to whole regions.
    pub fn record(&mut self, stats: &CopyForwardStats, region_size: usize, historic_weight: f64) {
        let copy_forward_rate = Self::measure_rate(stats);

        self.average_bytes_copied = math::weighted_average(
            self.average_bytes_copied,
            stats.copy_bytes_total as f64,
            historic_weight,
        );
        self.average_bytes_discarded = math::weighted_average(
            self.average_bytes_discarded,
            stats.copy_discard_bytes_total as f64,
            historic_weight,
        );

        let failed_evacuate_region_count =
            conversions::bytes_to_regions_up(stats.scan_bytes_total, region_size);
        let compact_set_survivor_region_count =
            conversions::bytes_to_regions_up(stats.external_compact_bytes, region_size);
        let survivor_set_region_count = stats.survivor_set_region_count
            + failed_evacuate_region_count
            + compact_set_survivor_region_count;

        self.average_survivor_set_region_count = math::weighted_average(
            self.average_survivor_set_region_count,
            survivor_set_region_count as f64,
            historic_weight,
        );
        self.average_copy_forward_rate = math::weighted_average(
            self.average_copy_forward_rate,
            copy_forward_rate,
            historic_weight,
        );

        trace!(
            "copy-forward: copied {} discarded {} survivor set {} (failed {} compact {}), avg rate {}",
            stats.copy_bytes_total,
            stats.copy_discard_bytes_total,
            survivor_set_region_count,
            failed_evacuate_region_count,
            compact_set_survivor_region_count,
            self.average_copy_forward_rate
        );
    }

    /// Bytes copied per microsecond of copy-forward time, net of reference
    /// clearing.
    fn measure_rate(stats: &CopyForwardStats) -> f64 {
        let bytes_copied = stats.copy_bytes_total;
        let time_in_copy_forward = stats.end_time.saturating_sub(stats.start_time);
        let time_clearing = stats.clear_from_region_references_time_us;

        if time_in_copy_forward > time_clearing {
            bytes_copied as f64 / (time_in_copy_forward - time_clearing) as f64
        } else if time_in_copy_forward != 0 {
            // Clearing appears to have taken longer than the whole
            // collection; clock skew. Ignore the clearing time.
            bytes_copied as f64 / time_in_copy_forward as f64
        } else {
            // Sub-microsecond collection; use the byte count as an
            // underestimate of the rate.
            bytes_copied as f64
        }
    }

    /// Fold in the survival rates observed by one copy-forward.
    pub fn update_survival_rates(
        &mut self,
        eden_survival_rate: f64,
        non_eden_survivor_count: usize,
        historic_weight: f64,
    ) {
        self.eden_survival_rate = math::weighted_average(
            self.eden_survival_rate,
            eden_survival_rate,
            historic_weight,
        );
        self.non_eden_survivor_count = math::weighted_average(
            self.non_eden_survivor_count as f64,
            non_eden_survivor_count as f64,
            historic_weight,
        ) as usize;
    }

    /// Seed the survivor-set average before any copy-forward has run.
    pub fn prime_average_survivor_set_region_count(&mut self, regions: f64) {
        self.average_survivor_set_region_count = regions;
    }

    /// Fraction of copy-forward output that was discarded rather than
    /// packed, in `[0, 1]`. 0.0 before any history exists.
    pub fn average_emptiness_of_copy_forwarded_regions(&self) -> f64 {
        let total = self.average_bytes_copied + self.average_bytes_discarded;
        if total > 0.0 {
            self.average_bytes_discarded / total
        } else {
            0.0
        }
    }

    /// Bytes discarded per byte copied. 0.0 before any history exists.
    pub fn bytes_discarded_per_byte_copied(&self) -> f64 {
        if self.average_bytes_copied > 0.0 {
            self.average_bytes_discarded / self.average_bytes_copied
        } else {
            0.0
        }
    }

    pub fn eden_survival_rate(&self) -> f64 {
        self.eden_survival_rate
    }

    pub fn average_survivor_set_region_count(&self) -> f64 {
        self.average_survivor_set_region_count
    }

    pub fn average_copy_forward_rate(&self) -> f64 {
        self.average_copy_forward_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants::BYTES_IN_MBYTE;

    const WEIGHT: f64 = 0.50;

    fn stats(copied: usize, discarded: usize, survivors: usize) -> CopyForwardStats {
        CopyForwardStats {
            copy_bytes_total: copied,
            copy_discard_bytes_total: discarded,
            survivor_set_region_count: survivors,
            start_time: 1_000,
            end_time: 11_000,
            clear_from_region_references_time_us: 1_000,
            ..Default::default()
        }
    }

    #[test]
    fn survivor_set_accounts_for_aborted_work() {
        let mut estimator = CopyForwardEstimator::new();
        let mut aborted = stats(BYTES_IN_MBYTE, 0, 4);
        aborted.aborted = true;
        aborted.scan_bytes_total = BYTES_IN_MBYTE + 1;
        aborted.external_compact_bytes = BYTES_IN_MBYTE / 2;
        estimator.record(&aborted, BYTES_IN_MBYTE, 0.0);
        // 4 recorded + 2 for unevacuated scan bytes + 1 for compact bytes.
        assert_eq!(estimator.average_survivor_set_region_count(), 7.0);
    }

    #[test]
    fn rate_excludes_reference_clearing() {
        let mut estimator = CopyForwardEstimator::new();
        estimator.record(&stats(9_000, 0, 1), BYTES_IN_MBYTE, 0.0);
        // 9000 bytes over (10_000 - 1_000) us.
        assert_eq!(estimator.average_copy_forward_rate(), 1.0);
    }

    #[test]
    fn rate_tolerates_clock_skew() {
        let mut estimator = CopyForwardEstimator::new();
        let mut skewed = stats(8_000, 0, 1);
        skewed.clear_from_region_references_time_us = 1_000_000;
        estimator.record(&skewed, BYTES_IN_MBYTE, 0.0);
        // Clearing time ignored: 8000 bytes over 10_000 us.
        assert_eq!(estimator.average_copy_forward_rate(), 0.8);

        let mut instantaneous = stats(8_000, 0, 1);
        instantaneous.start_time = 5_000;
        instantaneous.end_time = 5_000;
        estimator.record(&instantaneous, BYTES_IN_MBYTE, 0.0);
        assert_eq!(estimator.average_copy_forward_rate(), 8_000.0);
    }

    #[test]
    fn emptiness_from_byte_averages() {
        let mut estimator = CopyForwardEstimator::new();
        assert_eq!(estimator.average_emptiness_of_copy_forwarded_regions(), 0.0);
        estimator.record(&stats(3 * BYTES_IN_MBYTE, BYTES_IN_MBYTE, 4), BYTES_IN_MBYTE, 0.0);
        assert!((estimator.average_emptiness_of_copy_forwarded_regions() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn survival_rates_average() {
        let mut estimator = CopyForwardEstimator::new();
        assert_eq!(estimator.eden_survival_rate(), 1.0);
        estimator.update_survival_rates(0.5, 10, WEIGHT);
        assert!((estimator.eden_survival_rate() - 0.75).abs() < 1e-9);
    }
}
