use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("station count must be at least 1, got {count}")]
    NoStations { count: u32 },
    #[error("slots per station must be at least 1, got {slots}")]
    NoSlots { slots: u32 },
    #[error("simulation duration must be positive, got {hours} hours")]
    InvalidDuration { hours: f64 },
    #[error("arrival rate for {class} must be finite and non-negative, got {rate}")]
    InvalidArrivalRate { class: VehicleClass, rate: f64 },
    #[error("rush hour multiplier must be at least 1, got {multiplier}")]
    InvalidRushMultiplier { multiplier: f64 },
    #[error("speed multiplier must be positive, got {multiplier}")]
    InvalidSpeedMultiplier { multiplier: f64 },
    #[error("{class} profile {field} range {min}..{max} is invalid")]
    InvalidProfileRange {
        class: VehicleClass,
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{class} profile target level range must sit strictly above the start level range")]
    TargetBelowStart { class: VehicleClass },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleClass {
    Car,
    Truck,
    Bus,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 3] = [VehicleClass::Car, VehicleClass::Truck, VehicleClass::Bus];
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VehicleClass::Car => write!(f, "Car"),
            VehicleClass::Truck => write!(f, "Truck"),
            VehicleClass::Bus => write!(f, "Bus"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleStatus {
    Waiting,
    Charging,
    Completed,
    Rejected,
}

/// One vehicle moving through the facility.
///
/// The status machine is strictly one-way: Waiting -> Charging -> Completed,
/// or Waiting -> Rejected when no station can take the vehicle. The charge
/// duration is fixed at creation from the energy needed and the nominal power;
/// a queued vehicle that is later promoted keeps the duration but restarts the
/// clock from the promotion minute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: u64,
    pub class: VehicleClass,
    /// Battery capacity in kWh.
    pub battery_capacity_kwh: f64,
    /// Last committed state of charge in percent. Updated only at completion;
    /// the live value during charging comes from the charging curve.
    pub battery_level: f64,
    /// Target state of charge in percent, always above the level at creation.
    pub target_level: f64,
    /// Nominal charging power in kW.
    pub charging_power_kw: f64,
    pub arrived_at: DateTime<Utc>,
    pub charging_started: Option<DateTime<Utc>>,
    pub charging_ended: Option<DateTime<Utc>>,
    /// Minutes of charging needed, derived once at creation.
    pub charge_duration_min: f64,
    pub status: VehicleStatus,
}

impl Vehicle {
    pub fn new(
        id: u64,
        class: VehicleClass,
        battery_capacity_kwh: f64,
        battery_level: f64,
        target_level: f64,
        charging_power_kw: f64,
        arrived_at: DateTime<Utc>,
    ) -> Self {
        debug_assert!(target_level > battery_level, "target must exceed start level");
        let energy_needed_kwh = battery_capacity_kwh * (target_level - battery_level) / 100.0;
        let charge_duration_min = energy_needed_kwh / charging_power_kw * 60.0;
        Vehicle {
            id,
            class,
            battery_capacity_kwh,
            battery_level,
            target_level,
            charging_power_kw,
            arrived_at,
            charging_started: None,
            charging_ended: None,
            charge_duration_min,
            status: VehicleStatus::Waiting,
        }
    }

    /// Energy the battery still needs to reach the target, in kWh.
    pub fn energy_needed_kwh(&self) -> f64 {
        self.battery_capacity_kwh * (self.target_level - self.battery_level) / 100.0
    }

    pub(crate) fn begin_charging(&mut self, now: DateTime<Utc>) {
        debug_assert_eq!(self.status, VehicleStatus::Waiting);
        self.status = VehicleStatus::Charging;
        self.charging_started = Some(now);
        self.charging_ended = Some(now + duration_from_minutes(self.charge_duration_min));
    }

    pub(crate) fn complete(&mut self) {
        debug_assert_eq!(self.status, VehicleStatus::Charging);
        self.status = VehicleStatus::Completed;
        // The curve never quite reaches the target; completion commits it exactly.
        self.battery_level = self.target_level;
    }

    pub(crate) fn reject(&mut self) {
        debug_assert_eq!(self.status, VehicleStatus::Waiting);
        self.status = VehicleStatus::Rejected;
    }

    /// Charging is due to finish at or before `now`.
    pub fn is_charge_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.charging_ended.is_some_and(|end| now >= end)
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} #{:04}", self.class, self.id)
    }
}

pub(crate) fn duration_from_minutes(minutes: f64) -> Duration {
    Duration::seconds((minutes * 60.0).round() as i64)
}

/// Inclusive sampling range for one synthesized vehicle attribute.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        ValueRange { min, max }
    }

    fn is_ordered(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.max >= self.min
    }
}

/// Sampling ranges for one vehicle class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassProfile {
    pub battery_capacity_kwh: ValueRange,
    pub charging_power_kw: ValueRange,
    pub start_level: ValueRange,
    pub target_level: ValueRange,
}

impl ClassProfile {
    pub fn default_for(class: VehicleClass) -> Self {
        match class {
            VehicleClass::Car => ClassProfile {
                battery_capacity_kwh: ValueRange::new(40.0, 100.0),
                charging_power_kw: ValueRange::new(50.0, 250.0),
                start_level: ValueRange::new(10.0, 50.0),
                target_level: ValueRange::new(80.0, 100.0),
            },
            VehicleClass::Truck => ClassProfile {
                battery_capacity_kwh: ValueRange::new(300.0, 600.0),
                charging_power_kw: ValueRange::new(150.0, 350.0),
                start_level: ValueRange::new(10.0, 40.0),
                target_level: ValueRange::new(80.0, 100.0),
            },
            VehicleClass::Bus => ClassProfile {
                battery_capacity_kwh: ValueRange::new(200.0, 450.0),
                charging_power_kw: ValueRange::new(100.0, 300.0),
                start_level: ValueRange::new(10.0, 40.0),
                target_level: ValueRange::new(80.0, 100.0),
            },
        }
    }

    fn validate(&self, class: VehicleClass) -> Result<(), ConfigError> {
        let range_error = |field, range: ValueRange| ConfigError::InvalidProfileRange {
            class,
            field,
            min: range.min,
            max: range.max,
        };
        // Capacity and power feed a division, so zero is out.
        for (field, range) in [
            ("batteryCapacityKwh", self.battery_capacity_kwh),
            ("chargingPowerKw", self.charging_power_kw),
        ] {
            if !range.is_ordered() || range.min <= 0.0 {
                return Err(range_error(field, range));
            }
        }
        // Levels are percentages of the battery.
        for (field, range) in [
            ("startLevel", self.start_level),
            ("targetLevel", self.target_level),
        ] {
            if !range.is_ordered() || range.min < 0.0 || range.max > 100.0 {
                return Err(range_error(field, range));
            }
        }
        // Guarantees target > start for every sampled vehicle.
        if self.target_level.min <= self.start_level.max {
            return Err(ConfigError::TargetBelowStart { class });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassProfiles {
    pub car: ClassProfile,
    pub truck: ClassProfile,
    pub bus: ClassProfile,
}

impl Default for ClassProfiles {
    fn default() -> Self {
        ClassProfiles {
            car: ClassProfile::default_for(VehicleClass::Car),
            truck: ClassProfile::default_for(VehicleClass::Truck),
            bus: ClassProfile::default_for(VehicleClass::Bus),
        }
    }
}

impl ClassProfiles {
    pub fn profile(&self, class: VehicleClass) -> &ClassProfile {
        match class {
            VehicleClass::Car => &self.car,
            VehicleClass::Truck => &self.truck,
            VehicleClass::Bus => &self.bus,
        }
    }
}

/// Read-only configuration for one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationParameters {
    pub station_count: u32,
    pub slots_per_station: u32,
    pub max_queue_size: u32,
    pub duration_hours: f64,
    /// Expected arrivals per hour, one rate per vehicle class.
    pub car_arrival_rate: f64,
    pub truck_arrival_rate: f64,
    pub bus_arrival_rate: f64,
    /// Applied to every arrival rate during the 7-9 and 17-19 hours.
    pub rush_hour_multiplier: f64,
    pub speed_multiplier: f64,
    /// Fixed seed for the arrival generator. Runs with the same seed and
    /// start time are fully reproducible; without one the generator draws
    /// its seed from entropy.
    pub seed: Option<u64>,
    pub profiles: ClassProfiles,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        SimulationParameters {
            station_count: 4,
            slots_per_station: 4,
            max_queue_size: 5,
            duration_hours: 8.0,
            car_arrival_rate: 8.0,
            truck_arrival_rate: 2.0,
            bus_arrival_rate: 1.0,
            rush_hour_multiplier: 2.5,
            speed_multiplier: 1.0,
            seed: None,
            profiles: ClassProfiles::default(),
        }
    }
}

impl SimulationParameters {
    pub fn arrival_rate(&self, class: VehicleClass) -> f64 {
        match class {
            VehicleClass::Car => self.car_arrival_rate,
            VehicleClass::Truck => self.truck_arrival_rate,
            VehicleClass::Bus => self.bus_arrival_rate,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.station_count == 0 {
            return Err(ConfigError::NoStations {
                count: self.station_count,
            });
        }
        if self.slots_per_station == 0 {
            return Err(ConfigError::NoSlots {
                slots: self.slots_per_station,
            });
        }
        if !(self.duration_hours > 0.0) || !self.duration_hours.is_finite() {
            return Err(ConfigError::InvalidDuration {
                hours: self.duration_hours,
            });
        }
        for class in VehicleClass::ALL {
            let rate = self.arrival_rate(class);
            if !rate.is_finite() || rate < 0.0 {
                return Err(ConfigError::InvalidArrivalRate { class, rate });
            }
        }
        if !self.rush_hour_multiplier.is_finite() || self.rush_hour_multiplier < 1.0 {
            return Err(ConfigError::InvalidRushMultiplier {
                multiplier: self.rush_hour_multiplier,
            });
        }
        if !(self.speed_multiplier > 0.0) || !self.speed_multiplier.is_finite() {
            return Err(ConfigError::InvalidSpeedMultiplier {
                multiplier: self.speed_multiplier,
            });
        }
        for class in VehicleClass::ALL {
            self.profiles.profile(class).validate(class)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vehicle() -> Vehicle {
        Vehicle::new(
            1,
            VehicleClass::Car,
            80.0,
            20.0,
            80.0,
            120.0,
            Utc::now(),
        )
    }

    #[test]
    fn test_charge_duration_from_energy_and_power() {
        let vehicle = test_vehicle();
        // 80 kWh * 60% = 48 kWh at 120 kW -> 0.4 h -> 24 min
        assert!((vehicle.charge_duration_min - 24.0).abs() < 1e-9);
        assert!((vehicle.energy_needed_kwh() - 48.0).abs() < 1e-9);
    }

    #[test]
    fn test_lifecycle_happy_path() {
        let mut vehicle = test_vehicle();
        assert_eq!(vehicle.status, VehicleStatus::Waiting);

        let start = Utc::now();
        vehicle.begin_charging(start);
        assert_eq!(vehicle.status, VehicleStatus::Charging);
        assert_eq!(vehicle.charging_started, Some(start));
        let end = vehicle.charging_ended.expect("end time set");
        assert!(end >= start);
        assert!(!vehicle.is_charge_elapsed(start));
        assert!(vehicle.is_charge_elapsed(end));

        vehicle.complete();
        assert_eq!(vehicle.status, VehicleStatus::Completed);
        assert_eq!(vehicle.battery_level, vehicle.target_level);
    }

    #[test]
    fn test_display_label() {
        let vehicle = test_vehicle();
        assert_eq!(vehicle.to_string(), "Car #0001");
    }

    #[test]
    fn test_default_parameters_are_valid() {
        assert!(SimulationParameters::default().validate().is_ok());
    }

    #[test]
    fn test_zero_stations_rejected() {
        let params = SimulationParameters {
            station_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::NoStations { count: 0 })
        ));
    }

    #[test]
    fn test_negative_rate_rejected() {
        let params = SimulationParameters {
            truck_arrival_rate: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::InvalidArrivalRate {
                class: VehicleClass::Truck,
                ..
            })
        ));
    }

    #[test]
    fn test_overlapping_levels_rejected() {
        let mut params = SimulationParameters::default();
        params.profiles.car.start_level = ValueRange::new(10.0, 90.0);
        assert!(matches!(
            params.validate(),
            Err(ConfigError::TargetBelowStart {
                class: VehicleClass::Car
            })
        ));
    }

    #[test]
    fn test_parameters_json_roundtrip() {
        let json = r#"
        {
          "stationCount": 2,
          "slotsPerStation": 3,
          "maxQueueSize": 4,
          "durationHours": 12.0,
          "carArrivalRate": 10.0,
          "rushHourMultiplier": 3.0,
          "seed": 42
        }
        "#;

        let params: SimulationParameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.station_count, 2);
        assert_eq!(params.slots_per_station, 3);
        assert_eq!(params.max_queue_size, 4);
        assert_eq!(params.car_arrival_rate, 10.0);
        // Omitted fields fall back to the defaults.
        assert_eq!(params.truck_arrival_rate, 2.0);
        assert_eq!(params.seed, Some(42));
        assert!(params.validate().is_ok());
    }
}
