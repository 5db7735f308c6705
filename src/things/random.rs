//! Bounded random sampling for telemetry values and emission delays.
//!
//! Every helper takes a fresh thread-local generator so callers can sample
//! from inside async code without holding a non-`Send` RNG across an await.

use std::time::Duration;

use rand::Rng;

use super::kind::DelayRange;

/// Floats are rounded to this many parts per unit (three decimals).
const PRECISION: f64 = 1_000.0;

/// Uniform float in `[min, max]`, rounded to three decimals.
pub fn float(min: f64, max: f64) -> f64 {
    if max <= min {
        return round(min);
    }
    let r = rand::rng().random_range(min..=max);
    round(r)
}

/// Uniform integer in `[min, max]`.
pub fn int(min: i64, max: i64) -> i64 {
    if max <= min {
        return min;
    }
    rand::rng().random_range(min..=max)
}

/// Fair coin.
pub fn flag() -> bool {
    rand::rng().random_bool(0.5)
}

/// Uniform delay in `[range.min, range.max]` with millisecond resolution.
pub fn delay(range: DelayRange) -> Duration {
    let min = range.min.as_millis() as u64;
    let max = range.max.as_millis() as u64;
    if max <= min {
        return range.min;
    }
    Duration::from_millis(rand::rng().random_range(min..=max))
}

fn round(v: f64) -> f64 {
    (v * PRECISION).round() / PRECISION
}
