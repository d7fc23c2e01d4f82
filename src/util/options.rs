//! Scheduler configuration.
//!
//! Every tunable of the scheduler lives here, including the historic
//! weights of the running averages, so tests can pin a weight to 0 or 1
//! and make an estimator deterministic. Options can be set from
//! `VLHGC_`-prefixed environment variables or from `key=value` strings
//! handed over by the host's command-line processing; each option carries
//! a validator and invalid values fall back to the default.

use crate::util::constants::BYTES_IN_MBYTE;

/// A scheduler option of a given type, with some metadata about where it
/// may be set from.
#[derive(Debug, Clone)]
pub struct GcOption<T: Clone> {
    pub value: T,
    /// Can we set this option through env vars?
    pub from_env_var: bool,
    /// Can we set this option through the host's command line processing?
    pub from_command_line: bool,
}

// Dereference an option to get its value.
impl<T: Clone> std::ops::Deref for GcOption<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

fn always_valid<T>(_: &T) -> bool {
    true
}

fn unit_interval(v: &f64) -> bool {
    (0.0..=1.0).contains(v)
}

macro_rules! options {
    // Verify whether we can set an option through env var or command line.
    (@verify_set_from($self: expr, $key: expr, $verify_field: ident, $($name: ident),*)) => {
        match $key {
            $(stringify!($name) => { assert!($self.$name.$verify_field, "cannot set option {} (not {})", $key, stringify!($verify_field)) }),*
            _ => panic!("Invalid Options key: {}", $key)
        }
    };

    ($($(#[$outer:meta])* $name:ident: $type:ty [env_var: $env_var:expr, command_line: $command_line:expr] [$validator:expr] = $default:expr),* $(,)?) => [
        pub struct Options {
            $($(#[$outer])* pub $name: GcOption<$type>),*
        }
        impl Options {
            /// Set an option from an env var.
            pub fn set_from_env_var(&mut self, s: &str, val: &str) -> bool {
                options!(@verify_set_from(self, s, from_env_var, $($name),*));
                self.set_inner(s, val)
            }

            /// Set an option from the host command line.
            pub fn set_from_command_line(&mut self, s: &str, val: &str) -> bool {
                options!(@verify_set_from(self, s, from_command_line, $($name),*));
                self.set_inner(s, val)
            }

            /// Bulk process options. Returns true if all the options are
            /// processed successfully.
            ///
            /// `options` is whitespace-separated `key=value` pairs, e.g.
            /// `"threads=8 tarok_gmp_intermission=0"`.
            pub fn set_bulk_from_command_line(&mut self, options: &str) -> bool {
                for opt in options.split_ascii_whitespace() {
                    let kv_pair: Vec<&str> = opt.split('=').collect();
                    if kv_pair.len() != 2 {
                        return false;
                    }
                    if !self.set_from_command_line(kv_pair[0], kv_pair[1]) {
                        return false;
                    }
                }
                true
            }

            /// Set an option and run its validator on the parsed value.
            fn set_inner(&mut self, s: &str, val: &str) -> bool {
                match s {
                    $(stringify!($name) => if let Ok(ref val) = val.parse::<$type>() {
                        let validate_fn = $validator;
                        let is_valid = validate_fn(val);
                        if is_valid {
                            self.$name.value = val.clone();
                        } else {
                            eprintln!("Warn: unable to set {}={:?}. Invalid value. Default value will be used.", s, val);
                        }
                        is_valid
                    } else {
                        eprintln!("Warn: unable to set {}={:?}. Cant parse value. Default value will be used.", s, val);
                        false
                    })*
                    _ => panic!("Invalid Options key: {}", s)
                }
            }
        }
        impl Default for Options {
            fn default() -> Self {
                let mut options = Options {
                    $($name: GcOption {
                        value: $default,
                        from_env_var: $env_var,
                        from_command_line: $command_line,
                    }),*
                };

                // Environment variables that start with VLHGC_ and match an
                // option name (such as VLHGC_THREADS) override the default.
                const PREFIX: &str = "VLHGC_";
                for (key, val) in std::env::vars() {
                    if let Some(rest_of_key) = key.strip_prefix(PREFIX) {
                        let lowercase: &str = &rest_of_key.to_lowercase();
                        match lowercase {
                            $(stringify!($name) => { options.set_from_env_var(lowercase, &val); },)*
                            _ => {}
                        }
                    }
                }
                options
            }
        }
    ]
}

options! {
    /// Number of GC threads participating in marking. Scan-time figures are
    /// normalized by this before being turned into wall-clock estimates.
    threads:               usize [env_var: true, command_line: true]  [|v: &usize| *v > 0] = num_cpus::get(),
    /// Numerator of the PGC:GMP interleaving ratio. The ratio must be of
    /// the form 1:n or n:1.
    tarok_pgc_to_gmp_numerator: usize [env_var: true, command_line: true] [|v: &usize| *v > 0] = 1,
    /// Denominator of the PGC:GMP interleaving ratio.
    tarok_pgc_to_gmp_denominator: usize [env_var: true, command_line: true] [|v: &usize| *v > 0] = 1,
    /// Interleave global mark increments between partial collections. When
    /// false every taxation point is a partial collection.
    tarok_enable_incremental_gmp: bool [env_var: true, command_line: true] [always_valid] = true,
    /// Number of GMP taxation points skipped before a global mark phase
    /// kicks off. `usize::MAX` selects automatic kickoff planning.
    tarok_gmp_intermission: usize [env_var: true, command_line: true] [always_valid] = usize::MAX,
    /// Recompute the GMP intermission after every partial collection so the
    /// mark phase completes just before the heap is exhausted.
    tarok_automatic_gmp_intermission: bool [env_var: true, command_line: true] [always_valid] = true,
    /// Allow copy-forward partial collections.
    tarok_pgc_should_copy_forward: bool [env_var: true, command_line: true] [always_valid] = true,
    /// Allow mark-sweep-compact partial collections.
    tarok_pgc_should_mark_compact: bool [env_var: true, command_line: true] [always_valid] = false,
    /// Safety margin subtracted from the projected collections remaining
    /// before GMP kickoff. Recomputed from the heap census unless
    /// `tarok_force_kickoff_headroom_in_bytes` is set.
    tarok_kickoff_headroom_in_bytes: usize [env_var: true, command_line: true] [always_valid] = 0,
    /// Kickoff headroom as a percentage of estimated free memory.
    tarok_kickoff_headroom_region_rate: usize [env_var: true, command_line: true] [|v: &usize| *v <= 100] = 2,
    /// Keep `tarok_kickoff_headroom_in_bytes` fixed instead of deriving it.
    tarok_force_kickoff_headroom_in_bytes: bool [env_var: true, command_line: true] [always_valid] = false,
    /// Lower bound on the ideal Eden size in bytes. 0 derives the bound
    /// from heap geometry on `heap_reconfigured`.
    tarok_ideal_eden_minimum_bytes: usize [env_var: true, command_line: true] [always_valid] = 0,
    /// Upper bound on the ideal Eden size in bytes. 0 derives the bound
    /// from heap geometry on `heap_reconfigured`.
    tarok_ideal_eden_maximum_bytes: usize [env_var: true, command_line: true] [always_valid] = 0,
    /// The user pinned the minimum Eden size (Xmn/Xmns); percent-of-heap
    /// clamping is bypassed for the lower bound.
    tarok_eden_minimum_specified: bool [env_var: true, command_line: true] [always_valid] = false,
    /// The user pinned the maximum Eden size (Xmn/Xmnx); percent-of-heap
    /// clamping is bypassed for the upper bound.
    tarok_eden_maximum_specified: bool [env_var: true, command_line: true] [always_valid] = false,
    /// Fixed duration of a global mark increment in milliseconds. 0 lets
    /// the scheduler derive it from recent partial collection times.
    tarok_global_mark_increment_time_millis: usize [env_var: true, command_line: true] [always_valid] = 0,
    /// Floor on the scan-byte target handed to a global mark increment.
    tarok_minimum_gmp_work_target_bytes: usize [env_var: true, command_line: true] [|v: &usize| *v > 0] = BYTES_IN_MBYTE,
    /// Emptiness a region must exceed to be selected for defragmentation.
    /// 0 derives the threshold from copy-forward history.
    tarok_defragment_emptiness_threshold: f64 [env_var: true, command_line: true] [unit_interval] = 0.0,
    /// Derive the defragment emptiness threshold automatically from the
    /// observed emptiness of copy-forwarded regions.
    tarok_automatic_defragment_emptiness_threshold: bool [env_var: true, command_line: true] [always_valid] = false,
    /// Target maximum partial collection pause in milliseconds; drives the
    /// pause half of the hybrid overhead function.
    tarok_target_max_pause_time: usize [env_var: true, command_line: true] [|v: &usize| *v > 0] = 200,
    /// Weight applied when attributing concurrent marking work to the GMP
    /// scan-time cost.
    tarok_concurrent_marking_cost_weight: f64 [env_var: true, command_line: true] [unit_interval] = 0.05,
    /// Lower edge of the acceptable GC overhead band. Below it Eden is
    /// considered oversized.
    dnss_expected_time_ratio_minimum: f64 [env_var: true, command_line: true] [unit_interval] = 0.02,
    /// Upper edge of the acceptable GC overhead band. Above it Eden is
    /// considered undersized.
    dnss_expected_time_ratio_maximum: f64 [env_var: true, command_line: true] [unit_interval] = 0.05,
    /// Initial heap size in bytes, used when interpolating the startup-phase
    /// Eden size between the minimum and maximum heap.
    initial_memory_size: usize [env_var: true, command_line: true] [always_valid] = 0,
    /// Maximum heap size in bytes. 0 means unbounded; the heap is then
    /// never considered fully expanded.
    memory_max: usize [env_var: true, command_line: true] [always_valid] = 0,
    /// Soft maximum heap size in bytes; takes precedence over `memory_max`
    /// for the fully-expanded check when non-zero.
    soft_mx: usize [env_var: true, command_line: true] [always_valid] = 0,
    /// Historic weight for scan-rate samples taken from global mark
    /// increments. GMP samples dominate the estimate since the scan rate
    /// mostly serves GMP duration prediction.
    scan_rate_historic_weight_gmp: f64 [env_var: true, command_line: true] [unit_interval] = 0.50,
    /// Historic weight for scan-rate samples taken from mark-sweep-compact
    /// partial collections.
    scan_rate_historic_weight_pgc: f64 [env_var: true, command_line: true] [unit_interval] = 0.95,
    /// Historic weight for the partial collection pause average.
    pgc_time_historic_weight: f64 [env_var: true, command_line: true] [unit_interval] = 0.80,
    /// Historic weight for the partial collection interval average.
    pgc_interval_historic_weight: f64 [env_var: true, command_line: true] [unit_interval] = 0.50,
    /// Historic weight for region-consumption rates.
    consumption_historic_weight: f64 [env_var: true, command_line: true] [unit_interval] = 0.80,
    /// Historic weight for the macro defragmentation work average.
    defragment_work_historic_weight: f64 [env_var: true, command_line: true] [unit_interval] = 0.80,
    /// Historic weight for the partial collection overhead average.
    pgc_overhead_historic_weight: f64 [env_var: true, command_line: true] [unit_interval] = 0.50,
    /// Historic weight for copy-forward byte and survivor averages.
    copy_forward_historic_weight: f64 [env_var: true, command_line: true] [unit_interval] = 0.50,
    /// Historic weight for the incremental scan time accumulated per GMP
    /// cycle.
    incremental_scan_time_historic_weight: f64 [env_var: true, command_line: true] [unit_interval] = 0.50,
    /// Historic weight for the bytes scanned concurrently per GMP cycle.
    concurrent_bytes_historic_weight: f64 [env_var: true, command_line: true] [unit_interval] = 0.50,
}

impl Options {
    /// The PGC:GMP ratio is 1:n (one partial collection for every n global
    /// mark increments).
    pub fn ratio_is_one_to_n(&self) -> bool {
        *self.tarok_pgc_to_gmp_numerator == 1
    }

    /// The PGC:GMP ratio is n:1 (n partial collections for every global
    /// mark increment).
    pub fn ratio_is_n_to_one(&self) -> bool {
        *self.tarok_pgc_to_gmp_denominator == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_util::{serial_test, with_cleanup};

    #[test]
    fn no_env_var() {
        serial_test(|| {
            let options = Options::default();
            assert_eq!(*options.tarok_pgc_to_gmp_numerator, 1);
            assert_eq!(*options.tarok_gmp_intermission, usize::MAX);
            assert!(*options.tarok_enable_incremental_gmp);
        })
    }

    #[test]
    fn with_valid_env_var() {
        serial_test(|| {
            with_cleanup(
                || {
                    std::env::set_var("VLHGC_TAROK_PGC_TO_GMP_DENOMINATOR", "4");

                    let options = Options::default();
                    assert_eq!(*options.tarok_pgc_to_gmp_denominator, 4);
                },
                || {
                    std::env::remove_var("VLHGC_TAROK_PGC_TO_GMP_DENOMINATOR");
                },
            )
        })
    }

    #[test]
    fn with_invalid_env_var_value() {
        serial_test(|| {
            with_cleanup(
                || {
                    // Cannot parse the value, so the default is used.
                    std::env::set_var("VLHGC_THREADS", "abc");

                    let options = Options::default();
                    assert!(*options.threads > 0);
                },
                || {
                    std::env::remove_var("VLHGC_THREADS");
                },
            )
        })
    }

    #[test]
    fn with_invalid_env_var_key() {
        serial_test(|| {
            with_cleanup(
                || {
                    std::env::set_var("VLHGC_NO_SUCH_OPTION", "42");

                    // Unknown keys under the prefix are ignored.
                    let options = Options::default();
                    assert_eq!(*options.tarok_target_max_pause_time, 200);
                },
                || {
                    std::env::remove_var("VLHGC_NO_SUCH_OPTION");
                },
            )
        })
    }

    #[test]
    fn validator_rejects_out_of_range() {
        serial_test(|| {
            let mut options = Options::default();
            assert!(!options.set_from_command_line("threads", "0"));
            assert!(*options.threads > 0);
            assert!(!options.set_from_command_line("pgc_time_historic_weight", "1.5"));
            assert_eq!(*options.pgc_time_historic_weight, 0.80);
        })
    }

    #[test]
    fn bulk_processing() {
        serial_test(|| {
            let mut options = Options::default();
            assert!(options
                .set_bulk_from_command_line("threads=8 tarok_gmp_intermission=0 dnss_expected_time_ratio_maximum=0.15"));
            assert_eq!(*options.threads, 8);
            assert_eq!(*options.tarok_gmp_intermission, 0);
            assert_eq!(*options.dnss_expected_time_ratio_maximum, 0.15);

            assert!(!options.set_bulk_from_command_line("threads"));
            assert!(!options.set_bulk_from_command_line("threads=a"));
        })
    }

    #[test]
    fn weights_can_be_pinned_for_determinism() {
        serial_test(|| {
            let mut options = Options::default();
            assert!(options.set_from_command_line("scan_rate_historic_weight_gmp", "0"));
            assert!(options.set_from_command_line("consumption_historic_weight", "1"));
            assert_eq!(*options.scan_rate_historic_weight_gmp, 0.0);
            assert_eq!(*options.consumption_historic_weight, 1.0);
        })
    }
}
