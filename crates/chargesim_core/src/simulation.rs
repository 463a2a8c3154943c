//! Per-tick orchestration of the whole facility.
//!
//! `Simulation` owns the virtual clock, the stations, the arrival generator
//! and the statistics, and advances them one simulated minute at a time.
//! There is exactly one writer: whoever owns the `Simulation` drives `tick`,
//! and everything handed outward (snapshots, events, query results) is an
//! owned copy.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::arrivals::ArrivalGenerator;
use crate::assignment::choose_station;
use crate::models::{ConfigError, SimulationParameters, Vehicle};
use crate::station::{Admission, Station, StationSnapshot};
use crate::stats::{Statistics, StatisticsSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleEventKind {
    Arrived,
    Rejected,
    Completed,
}

/// Per-occurrence notification: the vehicle as it looked when the event
/// fired, plus a human-readable description for display or logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleEvent {
    pub kind: VehicleEventKind,
    pub vehicle: Vehicle,
    pub description: String,
}

/// Facility-wide totals across all stations.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
    pub charging: usize,
    pub waiting: usize,
    pub power_kw: f64,
}

/// Immutable state copy emitted at batch boundaries and on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub time: DateTime<Utc>,
    pub tick: u64,
    pub stations: Vec<StationSnapshot>,
    pub statistics: StatisticsSnapshot,
}

/// The discrete-time simulation: one tick is one simulated minute.
#[derive(Debug)]
pub struct Simulation {
    params: SimulationParameters,
    stations: Vec<Station>,
    arrivals: ArrivalGenerator,
    stats: Statistics,
    now: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    tick_count: u64,
}

impl Simulation {
    /// Validate the parameters and build a run starting at wall-clock now.
    pub fn new(params: SimulationParameters) -> Result<Self, ConfigError> {
        Self::starting_at(params, Utc::now())
    }

    /// Same as [`Simulation::new`] with an explicit start instant, which
    /// pins the rush-hour schedule for reproducible runs.
    pub fn starting_at(
        params: SimulationParameters,
        start: DateTime<Utc>,
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        let stations = (0..params.station_count)
            .map(|id| {
                Station::new(
                    id,
                    params.slots_per_station as usize,
                    params.max_queue_size as usize,
                )
            })
            .collect();
        let ends_at = start + Duration::seconds((params.duration_hours * 3600.0).round() as i64);
        tracing::info!(
            stations = params.station_count,
            slots = params.slots_per_station,
            queue = params.max_queue_size,
            hours = params.duration_hours,
            "simulation initialized"
        );
        Ok(Simulation {
            arrivals: ArrivalGenerator::new(&params),
            params,
            stations,
            stats: Statistics::new(),
            now: start,
            ends_at,
            tick_count: 0,
        })
    }

    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    /// Current virtual time; ticks advance it one minute at a time.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn is_finished(&self) -> bool {
        self.now >= self.ends_at
    }

    /// Advance the facility by one simulated minute and return the vehicle
    /// events it produced: arrivals are generated and assigned, stations
    /// reclaim elapsed slots, and the statistics fold in the results.
    pub fn tick(&mut self) -> Vec<VehicleEvent> {
        let now = self.now;
        let mut events = Vec::new();

        for vehicle in self.arrivals.generate(now) {
            self.stats.record_generated();
            match choose_station(&self.stations, now) {
                Some(index) => {
                    let station_id = self.stations[index].id();
                    match self.stations[index].admit(vehicle, now) {
                        Admission::Charging(vehicle) => {
                            let description = format!(
                                "{vehicle} arrived and started charging at station {station_id}"
                            );
                            events.push(VehicleEvent {
                                kind: VehicleEventKind::Arrived,
                                vehicle,
                                description,
                            });
                        }
                        Admission::Queued(vehicle) => {
                            let position = self.stations[index].waiting_count();
                            let description = format!(
                                "{vehicle} arrived and joined the queue at station {station_id} (position {position})"
                            );
                            events.push(VehicleEvent {
                                kind: VehicleEventKind::Arrived,
                                vehicle,
                                description,
                            });
                        }
                        Admission::Rejected(vehicle) => {
                            self.stats.record_rejection();
                            let description =
                                format!("{vehicle} was rejected at station {station_id}, queue full");
                            events.push(VehicleEvent {
                                kind: VehicleEventKind::Rejected,
                                vehicle,
                                description,
                            });
                        }
                    }
                }
                None => {
                    let mut vehicle = vehicle;
                    vehicle.reject();
                    self.stats.record_rejection();
                    tracing::debug!(vehicle = %vehicle, "no eligible station, vehicle rejected");
                    let description = format!("{vehicle} was rejected, no station could take it");
                    events.push(VehicleEvent {
                        kind: VehicleEventKind::Rejected,
                        vehicle,
                        description,
                    });
                }
            }
        }

        for station in &mut self.stations {
            let station_id = station.id();
            for vehicle in station.tick(now) {
                self.stats.record_completion(&vehicle);
                let description = format!(
                    "{vehicle} finished charging at station {station_id} ({:.1} kWh delivered)",
                    vehicle.energy_delivered_kwh(now)
                );
                events.push(VehicleEvent {
                    kind: VehicleEventKind::Completed,
                    vehicle,
                    description,
                });
            }
        }

        self.stats.sample(&self.stations);

        #[cfg(debug_assertions)]
        for station in &self.stations {
            station.assert_invariants();
        }

        self.now += Duration::minutes(1);
        self.tick_count += 1;
        events
    }

    /// Owned copy of one station's state, if the id exists.
    pub fn station(&self, id: u32) -> Option<StationSnapshot> {
        self.stations
            .iter()
            .find(|station| station.id() == id)
            .map(Station::snapshot)
    }

    pub fn station_snapshots(&self) -> Vec<StationSnapshot> {
        self.stations.iter().map(Station::snapshot).collect()
    }

    /// Every vehicle currently charging or queued, across all stations.
    pub fn active_vehicles(&self) -> Vec<Vehicle> {
        self.stations
            .iter()
            .flat_map(|station| {
                station
                    .charging()
                    .iter()
                    .cloned()
                    .chain(station.waiting().cloned())
            })
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.stations.iter().map(Station::load).sum()
    }

    pub fn metrics(&self) -> SystemMetrics {
        SystemMetrics {
            charging: self.stations.iter().map(Station::charging_count).sum(),
            waiting: self.stations.iter().map(Station::waiting_count).sum(),
            power_kw: self.stations.iter().map(Station::power_kw).sum(),
        }
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            time: self.now,
            tick: self.tick_count,
            stations: self.station_snapshots(),
            statistics: self.stats.snapshot(),
        }
    }
}
