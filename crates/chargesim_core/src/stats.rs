//! Statistics aggregation: monotonic counters, bounded rolling histories and
//! derived facility metrics.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Vehicle, VehicleClass};
use crate::station::Station;

/// Samples retained per rolling history.
pub const HISTORY_WINDOW: usize = 1000;

/// Fixed-capacity ring buffer of samples; pushing at capacity evicts the
/// oldest sample first.
#[derive(Debug, Clone)]
pub struct RollingHistory {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl RollingHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        RollingHistory {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn oldest(&self) -> Option<f64> {
        self.samples.front().copied()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }
}

/// One finished charge, kept for recomputing the derived aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedChargeRecord {
    pub vehicle_id: u64,
    pub class: VehicleClass,
    /// Minutes between arrival and the start of charging.
    pub waited_min: f64,
    pub charged_min: f64,
    pub energy_kwh: f64,
    pub completed_at: DateTime<Utc>,
}

/// Accumulates counts, rolling time series and completion records over one
/// simulation run. Reset by constructing a fresh value.
#[derive(Debug)]
pub struct Statistics {
    generated: u64,
    rejected: u64,
    processed: u64,
    utilization_history: RollingHistory,
    power_history: RollingHistory,
    queue_history: RollingHistory,
    completed: Vec<CompletedChargeRecord>,
    peak_power_kw: f64,
    sampled_ticks: u64,
}

impl Statistics {
    pub fn new() -> Self {
        Statistics {
            generated: 0,
            rejected: 0,
            processed: 0,
            utilization_history: RollingHistory::with_capacity(HISTORY_WINDOW),
            power_history: RollingHistory::with_capacity(HISTORY_WINDOW),
            queue_history: RollingHistory::with_capacity(HISTORY_WINDOW),
            completed: Vec::new(),
            peak_power_kw: 0.0,
            sampled_ticks: 0,
        }
    }

    pub fn record_generated(&mut self) {
        self.generated += 1;
    }

    pub fn record_rejection(&mut self) {
        self.rejected += 1;
    }

    pub fn record_completion(&mut self, vehicle: &Vehicle) {
        let waited_min = vehicle
            .charging_started
            .map(|started| (started - vehicle.arrived_at).num_seconds() as f64 / 60.0)
            .unwrap_or(0.0);
        self.processed += 1;
        self.completed.push(CompletedChargeRecord {
            vehicle_id: vehicle.id,
            class: vehicle.class,
            waited_min,
            charged_min: vehicle.charge_duration_min,
            energy_kwh: vehicle.charge_duration_min / 60.0 * vehicle.charging_power_kw,
            completed_at: vehicle.charging_ended.unwrap_or(vehicle.arrived_at),
        });
    }

    /// Fold in one tick's worth of per-station metrics.
    pub fn sample(&mut self, stations: &[Station]) {
        let utilization = if stations.is_empty() {
            0.0
        } else {
            stations.iter().map(Station::utilization_pct).sum::<f64>() / stations.len() as f64
        };
        let power: f64 = stations.iter().map(Station::power_kw).sum();
        let queued: usize = stations.iter().map(Station::waiting_count).sum();

        self.utilization_history.push(utilization);
        self.power_history.push(power);
        self.queue_history.push(queued as f64);
        if power > self.peak_power_kw {
            self.peak_power_kw = power;
        }
        self.sampled_ticks += 1;
    }

    pub fn generated(&self) -> u64 {
        self.generated
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn utilization_history(&self) -> &RollingHistory {
        &self.utilization_history
    }

    pub fn power_history(&self) -> &RollingHistory {
        &self.power_history
    }

    pub fn queue_history(&self) -> &RollingHistory {
        &self.queue_history
    }

    pub fn completed_records(&self) -> &[CompletedChargeRecord] {
        &self.completed
    }

    /// Mean minutes from arrival to charge start, over every completion.
    pub fn average_wait_min(&self) -> f64 {
        if self.completed.is_empty() {
            return 0.0;
        }
        self.completed.iter().map(|r| r.waited_min).sum::<f64>() / self.completed.len() as f64
    }

    pub fn average_utilization_pct(&self) -> f64 {
        self.utilization_history.mean()
    }

    pub fn peak_power_kw(&self) -> f64 {
        self.peak_power_kw
    }

    /// Completed vehicles per simulated hour.
    pub fn throughput_per_hour(&self) -> f64 {
        if self.sampled_ticks == 0 {
            return 0.0;
        }
        self.processed as f64 / (self.sampled_ticks as f64 / 60.0)
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            generated: self.generated,
            rejected: self.rejected,
            processed: self.processed,
            average_wait_min: self.average_wait_min(),
            average_utilization_pct: self.average_utilization_pct(),
            peak_power_kw: self.peak_power_kw,
            throughput_per_hour: self.throughput_per_hour(),
            utilization_history: self.utilization_history.to_vec(),
            power_history: self.power_history.to_vec(),
            queue_history: self.queue_history.to_vec(),
        }
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Statistics::new()
    }
}

/// Owned, serializable copy of the aggregated statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    pub generated: u64,
    pub rejected: u64,
    pub processed: u64,
    pub average_wait_min: f64,
    pub average_utilization_pct: f64,
    pub peak_power_kw: f64,
    pub throughput_per_hour: f64,
    pub utilization_history: Vec<f64>,
    pub power_history: Vec<f64>,
    pub queue_history: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VehicleClass;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_rolling_history_evicts_oldest() {
        let mut history = RollingHistory::with_capacity(3);
        for sample in [1.0, 2.0, 3.0] {
            history.push(sample);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.oldest(), Some(1.0));

        history.push(4.0);
        assert_eq!(history.len(), 3);
        assert_eq!(history.oldest(), Some(2.0));
        assert_eq!(history.latest(), Some(4.0));
    }

    #[test]
    fn test_history_window_bound() {
        let mut stats = Statistics::new();
        let stations = [Station::new(0, 2, 5)];
        for _ in 0..(HISTORY_WINDOW + 250) {
            stats.sample(&stations);
        }
        assert_eq!(stats.utilization_history().len(), HISTORY_WINDOW);
        assert_eq!(stats.power_history().len(), HISTORY_WINDOW);
        assert_eq!(stats.queue_history().len(), HISTORY_WINDOW);
    }

    #[test]
    fn test_history_keeps_most_recent_samples() {
        let mut history = RollingHistory::with_capacity(HISTORY_WINDOW);
        let total = HISTORY_WINDOW + 250;
        for i in 0..total {
            history.push(i as f64);
        }
        // The oldest retained sample is the 1000th-from-last, not the first.
        assert_eq!(history.oldest(), Some((total - HISTORY_WINDOW) as f64));
        assert_eq!(history.latest(), Some((total - 1) as f64));
    }

    #[test]
    fn test_completion_record_and_averages() {
        let arrived = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let mut stats = Statistics::new();

        // One hour of charging after a 15 minute wait.
        let mut vehicle = Vehicle::new(1, VehicleClass::Car, 100.0, 20.0, 80.0, 60.0, arrived);
        vehicle.begin_charging(arrived + Duration::minutes(15));
        vehicle.complete();
        stats.record_completion(&vehicle);

        // An immediate start.
        let mut vehicle = Vehicle::new(2, VehicleClass::Car, 100.0, 20.0, 80.0, 60.0, arrived);
        vehicle.begin_charging(arrived);
        vehicle.complete();
        stats.record_completion(&vehicle);

        assert_eq!(stats.processed(), 2);
        assert!((stats.average_wait_min() - 7.5).abs() < 1e-9);
        let records = stats.completed_records();
        assert!((records[0].energy_kwh - 60.0).abs() < 1e-9);
        assert!((records[0].charged_min - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_peak_power_and_throughput() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let mut stats = Statistics::new();

        let mut station = Station::new(0, 2, 5);
        station.admit(
            Vehicle::new(1, VehicleClass::Car, 100.0, 20.0, 80.0, 150.0, now),
            now,
        );
        stats.sample(std::slice::from_ref(&station));
        station.admit(
            Vehicle::new(2, VehicleClass::Car, 100.0, 20.0, 80.0, 100.0, now),
            now,
        );
        stats.sample(std::slice::from_ref(&station));

        assert!((stats.peak_power_kw() - 250.0).abs() < 1e-9);

        // Two completions over 120 sampled minutes is one per hour.
        let mut done = Vehicle::new(3, VehicleClass::Car, 100.0, 20.0, 80.0, 60.0, now);
        done.begin_charging(now);
        done.complete();
        stats.record_completion(&done);
        let mut done = Vehicle::new(4, VehicleClass::Car, 100.0, 20.0, 80.0, 60.0, now);
        done.begin_charging(now);
        done.complete();
        stats.record_completion(&done);
        for _ in 0..118 {
            stats.sample(std::slice::from_ref(&station));
        }
        assert!((stats.throughput_per_hour() - 1.0).abs() < 1e-9);
    }
}
