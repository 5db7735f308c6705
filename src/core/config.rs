//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the supervisor runtime.
//!
//! ## Sentinel values
//! - `channel_capacity = 0` → clamped to 1 (a rendezvous-like channel)
//! - `delay_override = None` → every kind uses its own delay range

use std::time::Duration;

use crate::things::{DelayRange, ThingKind};

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `max_quantity`: cap on things created by a single command
/// - `channel_capacity`: buffer of the shared event channel (min 1; clamped)
/// - `delay_override`: one delay range for every kind, replacing the per-kind defaults
/// - `autostart`: create one thing of each kind right after configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of things a single `create` command may start.
    ///
    /// Requests above the cap fail with `QuantityExceeded` and create nothing.
    pub max_quantity: usize,

    /// Capacity of the shared event channel between things and the aggregator.
    ///
    /// When full, emitting things wait (their stop signal still wins).
    pub channel_capacity: usize,

    /// Replaces every kind's emission delay range when set.
    pub delay_override: Option<DelayRange>,

    /// Create one battery pack, one inverter and one light on startup.
    pub autostart: bool,
}

impl Config {
    /// Returns a channel capacity clamped to a minimum of 1.
    #[inline]
    pub fn channel_capacity_clamped(&self) -> usize {
        self.channel_capacity.max(1)
    }

    /// Returns the emission delay range used for things of `kind`.
    #[inline]
    pub fn delays_for(&self, kind: ThingKind) -> DelayRange {
        self.delay_override.unwrap_or_else(|| kind.default_delays())
    }

    /// Convenience: same config with every delay range replaced by `[min, max]`.
    pub fn with_delays(mut self, min: Duration, max: Duration) -> Self {
        self.delay_override = Some(DelayRange::new(min, max));
        self
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `max_quantity = 100`
    /// - `channel_capacity = 5`
    /// - `delay_override = None` (per-kind ranges)
    /// - `autostart = false`
    fn default() -> Self {
        Self {
            max_quantity: 100,
            channel_capacity: 5,
            delay_override: None,
            autostart: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.max_quantity, 100);
        assert_eq!(cfg.channel_capacity_clamped(), 5);
        assert_eq!(
            cfg.delays_for(ThingKind::Light),
            ThingKind::Light.default_delays()
        );
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let cfg = Config {
            channel_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.channel_capacity_clamped(), 1);
    }

    #[test]
    fn override_applies_to_every_kind() {
        let cfg = Config::default().with_delays(Duration::from_millis(1), Duration::from_millis(3));
        for kind in ThingKind::ALL {
            assert_eq!(cfg.delays_for(kind), DelayRange::from_millis(1, 3));
        }
    }
}
