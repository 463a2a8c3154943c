use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Vehicle;

/// Outcome of offering a vehicle to a station. Every variant carries the
/// vehicle as it looks after the decision, so callers can report it without
/// reaching back into the station.
#[derive(Debug, Clone)]
pub enum Admission {
    /// A slot was free; charging started immediately.
    Charging(Vehicle),
    /// All slots busy, queue had room; the vehicle waits in FIFO order.
    Queued(Vehicle),
    /// All slots busy and the queue is full; terminal.
    Rejected(Vehicle),
}

/// One charging station: a bounded set of slots plus a bounded FIFO queue.
///
/// A vehicle is in at most one of the two collections at any time, and both
/// bounds hold after every operation.
#[derive(Debug, Clone)]
pub struct Station {
    id: u32,
    capacity: usize,
    max_queue_size: usize,
    charging: Vec<Vehicle>,
    waiting: VecDeque<Vehicle>,
}

impl Station {
    pub fn new(id: u32, capacity: usize, max_queue_size: usize) -> Self {
        Station {
            id,
            capacity,
            max_queue_size,
            charging: Vec::with_capacity(capacity),
            waiting: VecDeque::with_capacity(max_queue_size),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }

    pub fn charging(&self) -> &[Vehicle] {
        &self.charging
    }

    pub fn waiting(&self) -> impl Iterator<Item = &Vehicle> {
        self.waiting.iter()
    }

    pub fn charging_count(&self) -> usize {
        self.charging.len()
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    /// Vehicles occupying a slot plus vehicles queued.
    pub fn load(&self) -> usize {
        self.charging.len() + self.waiting.len()
    }

    pub fn has_free_slot(&self) -> bool {
        self.charging.len() < self.capacity
    }

    pub fn is_queue_full(&self) -> bool {
        self.waiting.len() >= self.max_queue_size
    }

    /// Admission rule: free slot -> charge now, queue room -> wait, else reject.
    pub fn admit(&mut self, mut vehicle: Vehicle, now: DateTime<Utc>) -> Admission {
        if self.has_free_slot() {
            vehicle.begin_charging(now);
            self.charging.push(vehicle.clone());
            tracing::debug!(station = self.id, vehicle = %vehicle, "vehicle started charging");
            Admission::Charging(vehicle)
        } else if !self.is_queue_full() {
            self.waiting.push_back(vehicle.clone());
            tracing::debug!(
                station = self.id,
                vehicle = %vehicle,
                position = self.waiting.len(),
                "vehicle queued"
            );
            Admission::Queued(vehicle)
        } else {
            vehicle.reject();
            tracing::debug!(station = self.id, vehicle = %vehicle, "vehicle rejected");
            Admission::Rejected(vehicle)
        }
    }

    /// One simulated minute of slot reclamation: expired chargers complete,
    /// then the queue head moves into each freed slot in FIFO order.
    /// Returns the vehicles that completed this tick.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Vehicle> {
        let (done, still_charging): (Vec<Vehicle>, Vec<Vehicle>) = self
            .charging
            .drain(..)
            .partition(|vehicle| vehicle.is_charge_elapsed(now));
        self.charging = still_charging;

        let mut completed = done;
        for vehicle in &mut completed {
            vehicle.complete();
        }

        while self.has_free_slot() {
            let Some(mut vehicle) = self.waiting.pop_front() else {
                break;
            };
            // The wait is over; the charge clock restarts from this minute.
            vehicle.begin_charging(now);
            tracing::debug!(station = self.id, vehicle = %vehicle, "vehicle promoted from queue");
            self.charging.push(vehicle);
        }

        completed
    }

    /// Occupied slots as a percentage of capacity.
    pub fn utilization_pct(&self) -> f64 {
        self.charging.len() as f64 / self.capacity as f64 * 100.0
    }

    /// Nominal power drawn by the vehicles currently charging, in kW.
    pub fn power_kw(&self) -> f64 {
        self.charging.iter().map(|v| v.charging_power_kw).sum()
    }

    /// Expected wait for a newly queued vehicle: zero with a free slot,
    /// otherwise the mean remaining charge time across the occupied slots.
    pub fn estimated_wait_min(&self, now: DateTime<Utc>) -> f64 {
        if self.has_free_slot() || self.charging.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .charging
            .iter()
            .map(|v| v.remaining_charge_min(now))
            .sum();
        total / self.charging.len() as f64
    }

    pub fn snapshot(&self) -> StationSnapshot {
        StationSnapshot {
            id: self.id,
            capacity: self.capacity,
            max_queue_size: self.max_queue_size,
            charging: self.charging.clone(),
            waiting: self.waiting.iter().cloned().collect(),
            utilization_pct: self.utilization_pct(),
            power_kw: self.power_kw(),
        }
    }

    #[cfg(debug_assertions)]
    pub(crate) fn assert_invariants(&self) {
        use crate::models::VehicleStatus;

        assert!(self.charging.len() <= self.capacity);
        assert!(self.waiting.len() <= self.max_queue_size);
        assert!(
            self.charging
                .iter()
                .all(|v| v.status == VehicleStatus::Charging)
        );
        assert!(
            self.waiting
                .iter()
                .all(|v| v.status == VehicleStatus::Waiting)
        );
    }
}

/// Owned copy of a station's externally visible state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationSnapshot {
    pub id: u32,
    pub capacity: usize,
    pub max_queue_size: usize,
    pub charging: Vec<Vehicle>,
    pub waiting: Vec<Vehicle>,
    pub utilization_pct: f64,
    pub power_kw: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{VehicleClass, VehicleStatus};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
    }

    /// 100 kWh battery, 20% -> 80% at 60 kW: exactly one hour of charging.
    fn one_hour_vehicle(id: u64, arrived: DateTime<Utc>) -> Vehicle {
        Vehicle::new(id, VehicleClass::Car, 100.0, 20.0, 80.0, 60.0, arrived)
    }

    #[test]
    fn test_admit_fills_slots_then_queue_then_rejects() {
        let now = t0();
        let mut station = Station::new(0, 2, 1);

        let first = station.admit(one_hour_vehicle(1, now), now);
        assert!(matches!(first, Admission::Charging(_)));

        let second = station.admit(one_hour_vehicle(2, now), now);
        assert!(matches!(second, Admission::Charging(_)));

        // Slots full, queue has room.
        let third = station.admit(one_hour_vehicle(3, now), now);
        assert!(matches!(third, Admission::Queued(_)));

        // Slots full, queue full.
        let fourth = station.admit(one_hour_vehicle(4, now), now);
        match fourth {
            Admission::Rejected(vehicle) => assert_eq!(vehicle.status, VehicleStatus::Rejected),
            other => panic!("expected rejection, got {other:?}"),
        }

        assert_eq!(station.charging_count(), 2);
        assert_eq!(station.waiting_count(), 1);
        station.assert_invariants();
    }

    #[test]
    fn test_rejection_boundary_no_queue() {
        let now = t0();
        let mut station = Station::new(0, 1, 0);

        assert!(matches!(
            station.admit(one_hour_vehicle(1, now), now),
            Admission::Charging(_)
        ));
        // Capacity 1, queue size 0: the next arrival bounces immediately.
        assert!(matches!(
            station.admit(one_hour_vehicle(2, now), now),
            Admission::Rejected(_)
        ));
    }

    #[test]
    fn test_tick_completes_elapsed_and_promotes_fifo() {
        let now = t0();
        let mut station = Station::new(0, 1, 3);

        station.admit(one_hour_vehicle(1, now), now);
        station.admit(one_hour_vehicle(2, now), now);
        station.admit(one_hour_vehicle(3, now), now);
        assert_eq!(station.waiting_count(), 2);

        // Nothing has elapsed yet.
        assert!(station.tick(now + Duration::minutes(30)).is_empty());
        assert_eq!(station.charging_count(), 1);

        // After the hour the charger is reclaimed and the queue head moves up.
        let later = now + Duration::minutes(60);
        let completed = station.tick(later);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, 1);
        assert_eq!(completed[0].status, VehicleStatus::Completed);
        assert_eq!(completed[0].battery_level, completed[0].target_level);

        // FIFO: vehicle 2 was queued first, so it charges next.
        assert_eq!(station.charging()[0].id, 2);
        assert_eq!(station.charging()[0].charging_started, Some(later));
        assert_eq!(station.waiting_count(), 1);
        station.assert_invariants();
    }

    #[test]
    fn test_promotion_restarts_charge_clock() {
        let now = t0();
        let mut station = Station::new(0, 1, 1);

        station.admit(one_hour_vehicle(1, now), now);
        station.admit(one_hour_vehicle(2, now), now);

        let promoted_at = now + Duration::minutes(60);
        station.tick(promoted_at);

        let vehicle = &station.charging()[0];
        assert_eq!(vehicle.id, 2);
        assert_eq!(vehicle.charging_started, Some(promoted_at));
        assert_eq!(
            vehicle.charging_ended,
            Some(promoted_at + Duration::minutes(60))
        );
    }

    #[test]
    fn test_estimated_wait() {
        let now = t0();
        let mut station = Station::new(0, 2, 5);

        // A free slot means no wait at all.
        station.admit(one_hour_vehicle(1, now), now);
        assert_eq!(station.estimated_wait_min(now), 0.0);

        station.admit(one_hour_vehicle(2, now), now);
        // Both slots busy with 60 minutes left each.
        assert!((station.estimated_wait_min(now) - 60.0).abs() < 1e-9);
        // Half an hour later, half the wait remains.
        let later = now + Duration::minutes(30);
        assert!((station.estimated_wait_min(later) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_utilization_and_power() {
        let now = t0();
        let mut station = Station::new(0, 4, 5);
        station.admit(one_hour_vehicle(1, now), now);
        station.admit(one_hour_vehicle(2, now), now);

        assert!((station.utilization_pct() - 50.0).abs() < 1e-9);
        assert!((station.power_kw() - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let now = t0();
        let mut station = Station::new(3, 2, 2);
        station.admit(one_hour_vehicle(1, now), now);

        let snapshot = station.snapshot();
        station.admit(one_hour_vehicle(2, now), now);

        // The snapshot is frozen at capture time.
        assert_eq!(snapshot.charging.len(), 1);
        assert_eq!(station.charging_count(), 2);
        assert_eq!(snapshot.id, 3);
    }
}
