//! Simulated time: a monotonic count of femtoseconds, plus the delta-cycle
//! iteration counter that resets every time `Time` advances.

use std::fmt;
use std::ops::{Add, AddAssign};

/// A point (or duration) in simulated time, in femtoseconds.
///
/// LRM 93 ties the unit system to fs/ps/ns/us/ms; `Time` always stores the
/// canonical femtosecond count and only converts for display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(u64);

impl Time {
    pub const ZERO: Time = Time(0);

    pub const fn from_fs(fs: u64) -> Self {
        Time(fs)
    }

    pub const fn as_fs(self) -> u64 {
        self.0
    }
}

impl Add<u64> for Time {
    type Output = Time;
    fn add(self, delay_fs: u64) -> Time {
        Time(self.0 + delay_fs)
    }
}

impl AddAssign<u64> for Time {
    fn add_assign(&mut self, delay_fs: u64) {
        self.0 += delay_fs;
    }
}

/// Units in ascending order, each an exact multiple of the previous one.
const UNITS: [(u64, &str); 5] = [
    (1, "fs"),
    (1_000, "ps"),
    (1_000_000, "ns"),
    (1_000_000_000, "us"),
    (1_000_000_000_000, "ms"),
];

/// Writes `t` divided by the largest unit that divides it exactly. Zero is
/// always printed in femtoseconds.
pub fn write_time(w: &mut impl fmt::Write, t: Time) -> fmt::Result {
    let fs = t.as_fs();
    let mut unit = 0;
    if fs != 0 {
        while unit + 1 < UNITS.len() && fs % UNITS[unit + 1].0 == 0 {
            unit += 1;
        }
    }
    let (divisor, suffix) = UNITS[unit];
    write!(w, "{}{}", fs / divisor, suffix)
}

/// Allocating convenience wrapper around [`write_time`].
pub fn format_time(t: Time) -> String {
    let mut s = String::new();
    write_time(&mut s, t).expect("String writes are infallible");
    s
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_time(f, *self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_match_spec_examples() {
        assert_eq!(format_time(Time::from_fs(1)), "1fs");
        assert_eq!(format_time(Time::from_fs(1_000)), "1ps");
        assert_eq!(format_time(Time::from_fs(1_500)), "1500fs");
        assert_eq!(format_time(Time::from_fs(1_000_000_000_000)), "1ms");
        assert_eq!(format_time(Time::from_fs(0)), "0fs");
    }

    #[test]
    fn picks_largest_exact_unit() {
        assert_eq!(format_time(Time::from_fs(10_000_000)), "10ns");
        assert_eq!(format_time(Time::from_fs(20_000_000)), "20ns");
        assert_eq!(format_time(Time::from_fs(60_000_000)), "60ns");
    }
}
