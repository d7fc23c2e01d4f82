//! Taxation-point scheduling.
//!
//! A taxation point is an allocation threshold at which the mutator
//! surrenders control to the collector for one increment. This module
//! decides how many bytes may be allocated until the next point and
//! whether that point runs a partial collection or a global mark
//! increment, interleaving the two according to the configured PGC:GMP
//! ratio and skipping GMP points while an intermission is in effect.

use crate::util::conversions;
use crate::util::options::Options;

#[derive(Debug, Clone, Default)]
pub struct TaxationScheduler {
    /// 0-based count of taxation points emitted so far.
    taxation_index: usize,
    next_increment_is_pgc: bool,
    next_increment_is_gmp: bool,
    remaining_gmp_intermission_intervals: usize,
}

impl TaxationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to the beginning of the schedule, restoring the configured
    /// intermission.
    pub fn reset(&mut self, options: &Options) {
        self.taxation_index = 0;
        self.next_increment_is_pgc = false;
        self.next_increment_is_gmp = false;
        self.remaining_gmp_intermission_intervals = *options.tarok_gmp_intermission;
    }

    /// Allocation budget until the next taxation point, in bytes, rounded
    /// down to a region multiple with a floor of one region. Decides the
    /// kind of work for that point as a side effect; read it back through
    /// [`TaxationScheduler::increment_work`].
    pub fn next_taxation_threshold(
        &mut self,
        eden_size_bytes: usize,
        region_size: usize,
        options: &Options,
    ) -> usize {
        let index_at_entry = self.taxation_index;
        let mut threshold = 0usize;

        // Consume thresholds until the GMP intermission is exhausted or a
        // PGC point comes up, accumulating the skipped allocation budget.
        loop {
            threshold += self.next_taxation_threshold_internal(eden_size_bytes, options);

            if self.remaining_gmp_intermission_intervals > 0 && self.next_increment_is_gmp {
                self.remaining_gmp_intermission_intervals -= 1;
                self.next_increment_is_gmp = false;
            }

            if self.next_increment_is_gmp || self.next_increment_is_pgc {
                break;
            }
        }

        let threshold = std::cmp::max(
            region_size,
            conversions::round_down_to_multiple(threshold, region_size),
        );

        trace!(
            "taxation point {}: threshold {} bytes (eden {}), gmp {} pgc {}",
            index_at_entry,
            threshold,
            eden_size_bytes,
            self.next_increment_is_gmp,
            self.next_increment_is_pgc
        );

        threshold
    }

    /// One step of the schedule: classify taxation point `taxation_index`
    /// and return its share of the allocation budget.
    fn next_taxation_threshold_internal(&mut self, eden_size_bytes: usize, options: &Options) -> usize {
        // Both flags must be in their consumed state when a new point is
        // scheduled.
        assert!(!self.next_increment_is_pgc);
        assert!(!self.next_increment_is_gmp);

        let mut threshold = eden_size_bytes;
        let index = self.taxation_index;

        if *options.tarok_enable_incremental_gmp {
            let numerator = *options.tarok_pgc_to_gmp_numerator;
            let denominator = *options.tarok_pgc_to_gmp_denominator;
            if numerator == 1 {
                // The PGC:GMP ratio is 1:n. Every (n+1)th taxation point is
                // a PGC and the remainder are GMPs:
                // --GMP--PGC--GMP--GMP--GMP--PGC--GMP--GMP--GMP--PGC--
                if index % (denominator + 1) == 0 {
                    self.next_increment_is_gmp = true;
                } else {
                    self.next_increment_is_pgc = true;
                }
                // The gap between PGCs divides into n+1 taxation points.
                threshold /= denominator + 1;
            } else if denominator == 1 {
                // The PGC:GMP ratio is n:1. Every (n+1)th taxation point is
                // a GMP, placed half way between two PGCs:
                // ------PGC------PGC---GMP---PGC------PGC---GMP---PGC------
                if index % (numerator + 1) == 0 {
                    // A PGC just completed and the next increment is a GMP.
                    self.next_increment_is_gmp = true;
                    threshold /= 2;
                } else if (index - 1) % (numerator + 1) == 0 {
                    // A GMP just completed and the next increment is a PGC.
                    self.next_increment_is_pgc = true;
                    threshold /= 2;
                } else {
                    // PGC to PGC, full gap.
                    self.next_increment_is_pgc = true;
                }
            } else {
                panic!(
                    "PGC:GMP ratio must be 1:n or n:1, got {}:{}",
                    numerator, denominator
                );
            }
        } else {
            // Incremental GMP is disabled; every increment is a PGC:
            // ------PGC------PGC------PGC------PGC------PGC------
            self.next_increment_is_pgc = true;
        }

        self.taxation_index += 1;

        threshold
    }

    /// What the engine should do at the taxation point it just reached.
    /// Clears the decision; asking again returns `(false, false)` until
    /// the next threshold is scheduled.
    pub fn increment_work(&mut self) -> (bool, bool) {
        let work = (self.next_increment_is_pgc, self.next_increment_is_gmp);
        self.next_increment_is_pgc = false;
        self.next_increment_is_gmp = false;
        work
    }

    pub fn next_increment_is_pgc(&self) -> bool {
        self.next_increment_is_pgc
    }

    pub fn next_increment_is_gmp(&self) -> bool {
        self.next_increment_is_gmp
    }

    pub fn remaining_gmp_intermission_intervals(&self) -> usize {
        self.remaining_gmp_intermission_intervals
    }

    pub fn set_remaining_gmp_intermission_intervals(&mut self, intervals: usize) {
        self.remaining_gmp_intermission_intervals = intervals;
    }
}
