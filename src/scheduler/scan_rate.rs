//! Marking scan-rate estimation.

/// Running estimate of how many microseconds of GC-thread time one byte of
/// scan work costs.
///
/// Bytes and time are averaged separately and the ratio re-derived on each
/// sample; averaging the ratio directly would let small samples swing the
/// estimate as hard as large ones.
#[derive(Debug, Clone, Default)]
pub struct ScanRateEstimator {
    historical_bytes_scanned: usize,
    historical_scan_microseconds: u64,
    microseconds_per_byte_scanned: f64,
}

impl ScanRateEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one scan sample into the estimate. Samples that scanned no
    /// bytes carry no rate information and are dropped. The first real
    /// sample seeds the history instead of being averaged against zero.
    pub fn record(&mut self, bytes_scanned: usize, scan_time_us: u64, historic_weight: f64) {
        if bytes_scanned == 0 {
            return;
        }

        if self.historical_bytes_scanned != 0 {
            self.historical_bytes_scanned = ((self.historical_bytes_scanned as f64
                * historic_weight)
                + (bytes_scanned as f64 * (1.0 - historic_weight)))
                as usize;
            self.historical_scan_microseconds = ((self.historical_scan_microseconds as f64
                * historic_weight)
                + (scan_time_us as f64 * (1.0 - historic_weight)))
                as u64;
        } else {
            self.historical_bytes_scanned = bytes_scanned;
            self.historical_scan_microseconds = scan_time_us;
        }

        if self.historical_bytes_scanned != 0 {
            self.microseconds_per_byte_scanned =
                self.historical_scan_microseconds as f64 / self.historical_bytes_scanned as f64;
        }

        trace!(
            "scan rate sample: {} bytes in {} us, historic {} bytes / {} us, {} us/byte",
            bytes_scanned,
            scan_time_us,
            self.historical_bytes_scanned,
            self.historical_scan_microseconds,
            self.microseconds_per_byte_scanned
        );
    }

    /// 0.0 until the first non-empty sample arrives.
    pub fn microseconds_per_byte_scanned(&self) -> f64 {
        self.microseconds_per_byte_scanned
    }

    pub fn has_history(&self) -> bool {
        self.microseconds_per_byte_scanned != 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants::BYTES_IN_MBYTE;

    #[test]
    fn first_sample_seeds_history() {
        let mut estimator = ScanRateEstimator::new();
        assert!(!estimator.has_history());
        estimator.record(1000, 500, 0.95);
        assert_eq!(estimator.microseconds_per_byte_scanned(), 0.5);
    }

    #[test]
    fn zero_byte_sample_is_dropped() {
        let mut estimator = ScanRateEstimator::new();
        estimator.record(1000, 500, 0.95);
        let before = estimator.microseconds_per_byte_scanned();
        estimator.record(0, 10_000, 0.95);
        assert_eq!(estimator.microseconds_per_byte_scanned(), before);
    }

    #[test]
    fn converges_to_repeated_sample() {
        // 1 MiB scanned in 10 ms, ten times over: the rate settles within
        // 1% of 10_000 / 1_048_576 us/byte.
        let mut estimator = ScanRateEstimator::new();
        for _ in 0..10 {
            estimator.record(BYTES_IN_MBYTE, 10_000, 0.95);
        }
        let expected = 10_000.0 / BYTES_IN_MBYTE as f64;
        let error = (estimator.microseconds_per_byte_scanned() - expected).abs() / expected;
        assert!(error < 0.01, "relative error {} too large", error);
    }

    #[test]
    fn proportionality_survives_uneven_samples() {
        // A tiny sample at the same underlying rate must not swing the
        // estimate the way averaging the ratio would.
        let mut estimator = ScanRateEstimator::new();
        estimator.record(8 * BYTES_IN_MBYTE, 80_000, 0.5);
        estimator.record(1024, 10, 0.5);
        let expected = 10_000.0 / BYTES_IN_MBYTE as f64;
        let error = (estimator.microseconds_per_byte_scanned() - expected).abs() / expected;
        assert!(error < 0.05, "relative error {} too large", error);
    }

    #[test]
    fn zero_weight_tracks_latest_sample() {
        let mut estimator = ScanRateEstimator::new();
        estimator.record(1000, 100, 0.0);
        estimator.record(2000, 8000, 0.0);
        assert_eq!(estimator.microseconds_per_byte_scanned(), 4.0);
    }
}
