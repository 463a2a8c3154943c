//! Stochastic vehicle arrivals.
//!
//! Arrivals approximate a Poisson process with one Bernoulli trial per
//! vehicle class per simulated minute: `p = hourly rate / 60`, scaled by the
//! rush-hour multiplier during the morning and evening peaks. A single trial
//! caps arrivals at one vehicle per class per minute, which undercounts a
//! true Poisson process once `p` stops being small. That cap is a deliberate
//! modeling limitation of the facility model, kept as-is.

use chrono::{DateTime, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{ClassProfiles, SimulationParameters, Vehicle, VehicleClass};

/// Morning and evening peaks during which arrival rates are multiplied.
pub(crate) fn is_rush_hour(hour: u32) -> bool {
    matches!(hour, 7..=9 | 17..=19)
}

/// Synthesizes new vehicles minute by minute from a seedable random source.
#[derive(Debug)]
pub struct ArrivalGenerator {
    rng: StdRng,
    next_id: u64,
    profiles: ClassProfiles,
    car_rate: f64,
    truck_rate: f64,
    bus_rate: f64,
    rush_hour_multiplier: f64,
}

impl ArrivalGenerator {
    /// Build a generator from validated parameters. A configured seed makes
    /// the whole arrival stream reproducible; otherwise entropy decides.
    pub fn new(params: &SimulationParameters) -> Self {
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        ArrivalGenerator {
            rng,
            next_id: 0,
            profiles: params.profiles,
            car_rate: params.car_arrival_rate,
            truck_rate: params.truck_arrival_rate,
            bus_rate: params.bus_arrival_rate,
            rush_hour_multiplier: params.rush_hour_multiplier,
        }
    }

    fn rate(&self, class: VehicleClass) -> f64 {
        match class {
            VehicleClass::Car => self.car_rate,
            VehicleClass::Truck => self.truck_rate,
            VehicleClass::Bus => self.bus_rate,
        }
    }

    /// Vehicles arriving during the minute starting at `now`: zero or one
    /// per class, independent trials.
    pub fn generate(&mut self, now: DateTime<Utc>) -> Vec<Vehicle> {
        let multiplier = if is_rush_hour(now.hour()) {
            self.rush_hour_multiplier
        } else {
            1.0
        };

        let mut arrivals = Vec::new();
        for class in VehicleClass::ALL {
            let per_minute = self.rate(class) * multiplier / 60.0;
            // One draw per class per minute, taken unconditionally so the
            // random stream does not depend on the configured rates.
            let draw: f64 = self.rng.gen_range(0.0..1.0);
            if draw < per_minute {
                arrivals.push(self.synthesize(class, now));
            }
        }
        arrivals
    }

    fn synthesize(&mut self, class: VehicleClass, now: DateTime<Utc>) -> Vehicle {
        let profile = *self.profiles.profile(class);
        let capacity = self
            .rng
            .gen_range(profile.battery_capacity_kwh.min..=profile.battery_capacity_kwh.max);
        let power = self
            .rng
            .gen_range(profile.charging_power_kw.min..=profile.charging_power_kw.max);
        let start_level = self
            .rng
            .gen_range(profile.start_level.min..=profile.start_level.max);
        let target_level = self
            .rng
            .gen_range(profile.target_level.min..=profile.target_level.max);

        self.next_id += 1;
        let vehicle = Vehicle::new(
            self.next_id,
            class,
            capacity,
            start_level,
            target_level,
            power,
            now,
        );
        tracing::debug!(
            vehicle = %vehicle,
            capacity_kwh = capacity,
            power_kw = power,
            duration_min = vehicle.charge_duration_min,
            "vehicle arrived"
        );
        vehicle
    }

    /// Total vehicles synthesized so far.
    pub fn generated_count(&self) -> u64 {
        self.next_id
    }
}
