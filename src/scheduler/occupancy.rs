//! Live-set tracking across partial collections and global sweeps.

use crate::util::heap::region::HeapView;

/// Tracks the live set before and after global sweeps and derives the
/// occupancy trend and the scannable fraction of the heap, both of which
/// feed the projection of global mark work.
#[derive(Debug, Clone)]
pub struct HeapOccupancyModel {
    live_set_bytes_after_partial_collect: usize,
    live_set_bytes_before_global_sweep: usize,
    live_set_bytes_after_global_sweep: usize,
    previous_live_set_bytes_after_global_sweep: usize,
    heap_occupancy_trend: f64,
    scannable_bytes_ratio: f64,
}

impl Default for HeapOccupancyModel {
    fn default() -> Self {
        HeapOccupancyModel {
            live_set_bytes_after_partial_collect: 0,
            live_set_bytes_before_global_sweep: 0,
            live_set_bytes_after_global_sweep: 0,
            previous_live_set_bytes_after_global_sweep: 0,
            heap_occupancy_trend: 1.0,
            scannable_bytes_ratio: 1.0,
        }
    }
}

impl HeapOccupancyModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Measure the amount of data the next global mark would have to
    /// process.
    ///
    /// This is an approximate upper bound: not everything measured is
    /// actually live, and the measurement includes primitive arrays which
    /// are no scan work. Arraylet leaves count only when their spine is an
    /// object array.
    pub fn update_live_bytes_after_partial_collect(&mut self, heap: &dyn HeapView) {
        let region_size = heap.region_size();
        let mut live_bytes = 0usize;
        for region in heap.regions() {
            if region.contains_objects {
                live_bytes += region_size;
                live_bytes = live_bytes.saturating_sub(region.actual_free_memory);
                live_bytes = live_bytes.saturating_sub(region.dark_matter);
            } else if region.is_arraylet_leaf && region.spine_is_object_array {
                live_bytes += region_size;
            }
        }
        self.live_set_bytes_after_partial_collect = live_bytes;
        trace!("live set after partial collect: {} bytes", live_bytes);
    }

    /// Snapshot the live set ahead of a global sweep. Called when the mark
    /// phase completes, using the figure from the last partial collection.
    pub fn snapshot_live_bytes_before_global_sweep(&mut self) {
        self.live_set_bytes_before_global_sweep = self.live_set_bytes_after_partial_collect;
    }

    /// Derive the growth slope of live data between the last two global
    /// sweeps: 0.0 means everything allocated since the previous sweep
    /// died, 1.0 means it all survived.
    pub fn calculate_heap_occupancy_trend(&mut self) {
        self.previous_live_set_bytes_after_global_sweep = self.live_set_bytes_after_global_sweep;
        self.live_set_bytes_after_global_sweep = self.live_set_bytes_after_partial_collect;

        self.heap_occupancy_trend = 1.0;
        let denominator = self.live_set_bytes_before_global_sweep as f64
            - self.previous_live_set_bytes_after_global_sweep as f64;
        if denominator != 0.0 {
            self.heap_occupancy_trend = (self.live_set_bytes_after_global_sweep as f64
                - self.previous_live_set_bytes_after_global_sweep as f64)
                / denominator;
        }
        debug!(
            "heap occupancy trend {} (before sweep {}, after sweep {}, previous after sweep {})",
            self.heap_occupancy_trend,
            self.live_set_bytes_before_global_sweep,
            self.live_set_bytes_after_global_sweep,
            self.previous_live_set_bytes_after_global_sweep
        );
    }

    /// Fraction of live data that is reference-bearing and therefore scan
    /// work for the marker.
    pub fn calculate_scannable_bytes_ratio(&mut self, heap: &dyn HeapView) {
        let mut scannable_bytes = 0usize;
        let mut non_scannable_bytes = 0usize;
        for region in heap.regions() {
            if region.contains_objects {
                scannable_bytes += region.scannable_bytes;
                non_scannable_bytes += region.non_scannable_bytes;
            }
        }

        self.scannable_bytes_ratio = if scannable_bytes + non_scannable_bytes == 0 {
            // Assume all is scannable.
            1.0
        } else {
            scannable_bytes as f64 / (scannable_bytes + non_scannable_bytes) as f64
        };
    }

    /// Projected bytes a global mark phase would scan: the live set
    /// extrapolated by the occupancy trend, reduced to its scannable
    /// fraction.
    pub fn estimated_global_bytes_to_scan(&self) -> f64 {
        // A negative historic trend (high death rate) must not extrapolate
        // below the current post-sweep live set.
        let trend_adjusted = self.heap_occupancy_trend.max(0.0);
        // A live set shrinking below the post-sweep figure projects as-is.
        let delta_since_last_sweep = (self.live_set_bytes_after_partial_collect as f64
            - self.live_set_bytes_after_global_sweep as f64)
            .max(0.0);
        let live_set_adjusted_for_trend = self.live_set_bytes_after_partial_collect as f64
            - delta_since_last_sweep * (1.0 - trend_adjusted);

        live_set_adjusted_for_trend * self.scannable_bytes_ratio
    }

    pub fn live_set_bytes_after_partial_collect(&self) -> usize {
        self.live_set_bytes_after_partial_collect
    }

    pub fn heap_occupancy_trend(&self) -> f64 {
        self.heap_occupancy_trend
    }

    pub fn scannable_bytes_ratio(&self) -> f64 {
        self.scannable_bytes_ratio
    }

    #[cfg(test)]
    pub fn set_live_set_for_test(&mut self, after_partial: usize, before_sweep: usize, after_sweep: usize) {
        self.live_set_bytes_after_partial_collect = after_partial;
        self.live_set_bytes_before_global_sweep = before_sweep;
        self.live_set_bytes_after_global_sweep = after_sweep;
    }
}
