//! Conversions between byte quantities and region counts.

/// Round `value` down to a multiple of `unit`. `unit` must be non-zero.
pub fn round_down_to_multiple(value: usize, unit: usize) -> usize {
    debug_assert!(unit > 0);
    (value / unit) * unit
}

/// Number of regions needed to hold `bytes`, rounding up.
pub fn bytes_to_regions_up(bytes: usize, region_size: usize) -> usize {
    debug_assert!(region_size > 0);
    (bytes + region_size - 1) / region_size
}

/// Number of whole regions covered by `bytes`, rounding down.
pub fn bytes_to_regions_down(bytes: usize, region_size: usize) -> usize {
    debug_assert!(region_size > 0);
    bytes / region_size
}

pub fn regions_to_bytes(regions: usize, region_size: usize) -> usize {
    regions * region_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants::BYTES_IN_MBYTE;

    #[test]
    fn round_down() {
        assert_eq!(round_down_to_multiple(0, BYTES_IN_MBYTE), 0);
        assert_eq!(round_down_to_multiple(BYTES_IN_MBYTE - 1, BYTES_IN_MBYTE), 0);
        assert_eq!(
            round_down_to_multiple(3 * BYTES_IN_MBYTE + 17, BYTES_IN_MBYTE),
            3 * BYTES_IN_MBYTE
        );
    }

    #[test]
    fn region_rounding() {
        assert_eq!(bytes_to_regions_up(0, BYTES_IN_MBYTE), 0);
        assert_eq!(bytes_to_regions_up(1, BYTES_IN_MBYTE), 1);
        assert_eq!(bytes_to_regions_up(BYTES_IN_MBYTE, BYTES_IN_MBYTE), 1);
        assert_eq!(bytes_to_regions_up(BYTES_IN_MBYTE + 1, BYTES_IN_MBYTE), 2);
        assert_eq!(bytes_to_regions_down(BYTES_IN_MBYTE + 1, BYTES_IN_MBYTE), 1);
    }
}
