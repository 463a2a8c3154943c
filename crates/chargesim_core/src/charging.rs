//! Charging curve evaluation.
//!
//! The battery follows a cubic easing curve that fast-charges early and
//! tapers towards the target level. Note that `progress(1.0)` is 0.8, not
//! 1.0: the curve never reaches the target on its own, and completion
//! commits the exact target level instead (see `Vehicle::complete`).

use chrono::{DateTime, Utc};

use crate::models::{Vehicle, VehicleStatus};

/// Eased charge progress for an elapsed fraction `x` of the charge duration.
///
/// Monotonically increasing on [0, 1] with `progress(0) = 0` and
/// `progress(1) = 0.8`. Inputs outside [0, 1] are clamped.
pub fn progress(x: f64) -> f64 {
    let x = x.clamp(0.0, 1.0);
    x - 0.2 * x * x * x
}

impl Vehicle {
    /// Fraction of the charge duration elapsed at `now`, clamped to [0, 1].
    fn elapsed_fraction(&self, now: DateTime<Utc>) -> f64 {
        let (Some(start), Some(end)) = (self.charging_started, self.charging_ended) else {
            return 0.0;
        };
        let total = (end - start).num_seconds();
        if total <= 0 {
            return 1.0;
        }
        let elapsed = (now - start).num_seconds();
        (elapsed as f64 / total as f64).clamp(0.0, 1.0)
    }

    /// State of charge in percent at `now`.
    ///
    /// Only a Charging vehicle moves along the curve; in every other status
    /// the stored level is returned unchanged (the target, once completed).
    pub fn current_level(&self, now: DateTime<Utc>) -> f64 {
        if self.status != VehicleStatus::Charging {
            return self.battery_level;
        }
        let span = self.target_level - self.battery_level;
        self.battery_level + span * progress(self.elapsed_fraction(now))
    }

    /// Energy delivered so far in kWh.
    pub fn energy_delivered_kwh(&self, now: DateTime<Utc>) -> f64 {
        match self.status {
            VehicleStatus::Charging => self.energy_needed_kwh() * progress(self.elapsed_fraction(now)),
            // Completion overwrites the stored level, so recover the total
            // from the fixed duration and nominal power instead.
            VehicleStatus::Completed => self.charge_duration_min / 60.0 * self.charging_power_kw,
            _ => 0.0,
        }
    }

    /// Minutes of charging left at `now`, zero once the end time has passed.
    pub fn remaining_charge_min(&self, now: DateTime<Utc>) -> f64 {
        match self.charging_ended {
            Some(end) if end > now => (end - now).num_seconds() as f64 / 60.0,
            _ => 0.0,
        }
    }
}
