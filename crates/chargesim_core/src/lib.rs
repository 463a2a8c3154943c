//! Core model of an electric-vehicle charging facility.
//!
//! Vehicles arrive stochastically, are routed to stations, queue when the
//! slots are exhausted, charge along a tapering cubic curve and depart.
//! This crate holds the discrete-time model only; the asynchronous driver
//! lives in `chargesim_engine` and the HTTP surface in `chargesim_api`.

mod arrivals;
mod assignment;
pub mod charging;
mod models;
mod simulation;
mod station;
mod stats;

pub use crate::arrivals::ArrivalGenerator;
pub use crate::models::{
    ClassProfile, ClassProfiles, ConfigError, SimulationParameters, ValueRange, Vehicle,
    VehicleClass, VehicleStatus,
};
pub use crate::simulation::{
    Simulation, Snapshot, SystemMetrics, VehicleEvent, VehicleEventKind,
};
pub use crate::station::{Admission, Station, StationSnapshot};
pub use crate::stats::{
    CompletedChargeRecord, HISTORY_WINDOW, RollingHistory, Statistics, StatisticsSnapshot,
};
