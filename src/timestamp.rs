//! Performance-counter tick to nanosecond conversion.

use std::sync::OnceLock;

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Converts raw performance-counter readings into nanoseconds in the same
/// origin as the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickConverter {
    ticks_per_second: i64,
}

impl TickConverter {
    /// Panics if `ticks_per_second` is not strictly positive; there is no
    /// meaningful timestamp to assign without a valid frequency.
    pub fn new(ticks_per_second: i64) -> Self {
        assert!(
            ticks_per_second > 0,
            "performance counter frequency must be positive, got {ticks_per_second}"
        );
        Self { ticks_per_second }
    }

    /// Converter for the platform performance counter.
    pub fn platform() -> Self {
        Self {
            ticks_per_second: platform_frequency(),
        }
    }

    pub fn ticks_per_second(&self) -> i64 {
        self.ticks_per_second
    }

    /// `ticks * 10^9 / frequency`, truncated. The intermediate is 128-bit so
    /// the full 63-bit tick range converts without overflow. Readings before
    /// the counter origin clamp to zero.
    pub fn to_nanoseconds(&self, ticks: i64) -> u64 {
        if ticks <= 0 {
            return 0;
        }
        let nanos = ticks as i128 * NANOS_PER_SEC / self.ticks_per_second as i128;
        u64::try_from(nanos).unwrap_or(u64::MAX)
    }
}

/// Converts ticks with the process-wide platform frequency.
pub fn to_nanoseconds(ticks: i64) -> u64 {
    TickConverter::platform().to_nanoseconds(ticks)
}

/// The platform performance-counter frequency, queried once per process.
pub fn platform_frequency() -> i64 {
    static FREQUENCY: OnceLock<i64> = OnceLock::new();
    *FREQUENCY.get_or_init(|| {
        let frequency = query_frequency();
        if frequency <= 0 {
            panic!("unable to query the performance counter frequency (got {frequency})");
        }
        frequency
    })
}

#[cfg(windows)]
fn query_frequency() -> i64 {
    use windows_sys::Win32::System::Performance::QueryPerformanceFrequency;

    let mut frequency: i64 = 0;
    // SAFETY: `frequency` is a valid, writable i64 for the duration of the call.
    if unsafe { QueryPerformanceFrequency(&mut frequency) } == 0 {
        return 0;
    }
    frequency
}

// Elsewhere raw timestamps are CLOCK_MONOTONIC nanoseconds.
#[cfg(not(windows))]
fn query_frequency() -> i64 {
    NANOS_PER_SEC as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ten_mhz_counter() {
        let conv = TickConverter::new(10_000_000);
        assert_eq!(conv.to_nanoseconds(10_000), 1_000_000);
        assert_eq!(conv.to_nanoseconds(20_000), 2_000_000);
        assert_eq!(conv.to_nanoseconds(1), 100);
    }

    #[test]
    fn test_truncates_fractional_nanoseconds() {
        let conv = TickConverter::new(3);
        assert_eq!(conv.to_nanoseconds(1), 333_333_333);
        assert_eq!(conv.to_nanoseconds(2), 666_666_666);
    }

    #[test]
    fn test_full_tick_range_does_not_overflow() {
        let conv = TickConverter::new(1_000_000_000);
        assert_eq!(conv.to_nanoseconds(i64::MAX), i64::MAX as u64);

        // A slow counter pushes the result past u64 and saturates.
        let conv = TickConverter::new(1);
        assert_eq!(conv.to_nanoseconds(i64::MAX), u64::MAX);
    }

    #[test]
    fn test_negative_ticks_clamp_to_zero() {
        let conv = TickConverter::new(10_000_000);
        assert_eq!(conv.to_nanoseconds(-5), 0);
        assert_eq!(conv.to_nanoseconds(0), 0);
    }

    #[test]
    #[should_panic(expected = "must be positive")]
    fn test_zero_frequency_is_fatal() {
        TickConverter::new(0);
    }

    #[test]
    fn test_platform_frequency_is_memoized() {
        let first = platform_frequency();
        assert!(first > 0);
        assert_eq!(first, platform_frequency());
        assert_eq!(TickConverter::platform().ticks_per_second(), first);
    }
}
