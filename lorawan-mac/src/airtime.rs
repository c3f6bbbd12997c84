//! Integer-only LoRa time-on-air computation.
//!
//! Uses a precomputed coefficient table instead of the floating-point
//! formula from the Semtech datasheets. Covers DR0..DR5 at 125 kHz plus DR6,
//! which shares the DR5 row.

/// Symbol-count coefficients per data rate: `[n0, offset, c1, c2]`.
const K: [[u8; 4]; 6] =
    [[0, 1, 5, 5], [0, 1, 4, 5], [1, 5, 5, 5], [1, 4, 5, 4], [1, 3, 4, 4], [1, 2, 4, 3]];

/// Coding rate 4/5 expressed as the symbol multiplier the formula expects.
pub const CR_4_5: u8 = 5;

/// Time on air in microseconds of a `payload_size`-byte frame at data rate
/// `dr` and coding rate `cr` (4 + the coding-rate index, so 5 for 4/5).
pub fn time_on_air_us(payload_size: usize, dr: u8, cr: u8) -> u32 {
    debug_assert!(dr <= 6);
    let t_sym: u32 = 1 << (15 - u32::from(dr));
    // 12.25 symbols of preamble
    let t_preamble = (t_sym << 3) + (t_sym << 2) + (t_sym >> 2);

    let [n0, offset, c1, c2] = K[usize::min(dr as usize, 5)];
    let n_symbols = if payload_size < offset as usize {
        8 + u32::from(n0) * u32::from(cr)
    } else {
        let p = (payload_size - offset as usize) as u32;
        let cycle = p / u32::from(c1 + c2);
        let pos = p % u32::from(c1 + c2);
        let extra = u32::from(pos > u32::from(c1 - 1));
        8 + (u32::from(n0) + 2 * cycle + 1 + extra) * u32::from(cr)
    };

    t_preamble + t_sym * n_symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_values_at_cr_4_5() {
        // spot values for the smallest frame across all data rates
        assert_eq!(time_on_air_us(1, 0, CR_4_5), 827_392);
        assert_eq!(time_on_air_us(1, 1, CR_4_5), 413_696);
        assert_eq!(time_on_air_us(1, 2, CR_4_5), 206_848);
        assert_eq!(time_on_air_us(1, 3, CR_4_5), 103_424);
        assert_eq!(time_on_air_us(1, 4, CR_4_5), 51_712);
        assert_eq!(time_on_air_us(1, 5, CR_4_5), 25_856);

        // a typical short payload
        assert_eq!(time_on_air_us(13, 0, CR_4_5), 1_155_072);
        assert_eq!(time_on_air_us(13, 1, CR_4_5), 577_536);
        assert_eq!(time_on_air_us(13, 2, CR_4_5), 288_768);
        assert_eq!(time_on_air_us(13, 3, CR_4_5), 164_864);
        assert_eq!(time_on_air_us(13, 4, CR_4_5), 82_432);
        assert_eq!(time_on_air_us(13, 5, CR_4_5), 46_336);

        // the per-DR payload caps at the fastest data rate
        assert_eq!(time_on_air_us(59, 5, CR_4_5), 112_896);
        assert_eq!(time_on_air_us(123, 5, CR_4_5), 205_056);
        assert_eq!(time_on_air_us(250, 5, CR_4_5), 389_376);
    }

    #[test]
    fn dr6_reuses_the_dr5_coefficients() {
        // identical symbol count, halved symbol duration
        assert_eq!(time_on_air_us(13, 6, CR_4_5), time_on_air_us(13, 5, CR_4_5) / 2);
    }

    #[test]
    fn airtime_is_monotonic_in_payload_size() {
        for dr in 0..=5 {
            let mut last = 0;
            for size in 0..=250 {
                let toa = time_on_air_us(size, dr, CR_4_5);
                assert!(toa >= last);
                last = toa;
            }
        }
    }
}
