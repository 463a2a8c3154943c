//! Asynchronous simulation driver.
//!
//! The [`Engine`] wraps a [`Simulation`] behind a mutex and drives the tick
//! loop on a tokio task. The loop task is the only writer; every consumer
//! receives owned copies, either by querying the engine or by subscribing to
//! the broadcast channels. Stopping is cooperative: a watch flag is checked
//! at the top of every tick and also interrupts the pacing delay, so the
//! latency to stop is bounded by one tick plus the delay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::time::Duration;
use uuid::Uuid;

use chargesim_core::{
    ConfigError, Simulation, SimulationParameters, Snapshot, StationSnapshot, StatisticsSnapshot,
    SystemMetrics, Vehicle, VehicleEvent,
};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("simulation is already running")]
    AlreadyRunning,
    #[error("simulation has not been initialized")]
    NotInitialized,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Snapshots emitted per loop iteration, derived from the speed multiplier.
/// Higher speeds batch more ticks per emission to bound update overhead.
pub fn batch_size(speed: f64) -> u64 {
    if speed <= 1.0 {
        1
    } else if speed <= 10.0 {
        5
    } else if speed <= 50.0 {
        10
    } else {
        20
    }
}

/// Pacing delay between ticks. Purely a real-time feel knob, not part of the
/// simulation's logical correctness.
pub fn pacing_delay(speed: f64) -> Duration {
    Duration::from_millis((100.0 / speed).clamp(1.0, 100.0) as u64)
}

/// Lifecycle and clock of the engine, for status queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub initialized: bool,
    pub running: bool,
    pub run_id: Option<Uuid>,
    pub time: Option<DateTime<Utc>>,
    pub tick: Option<u64>,
}

/// Shared handle to the simulation driver. Cheap to clone; all clones talk
/// to the same underlying state.
#[derive(Clone)]
pub struct Engine {
    sim: Arc<Mutex<Option<Simulation>>>,
    running: Arc<AtomicBool>,
    current_run: Arc<Mutex<Option<Uuid>>>,
    stop_tx: watch::Sender<bool>,
    snapshots_tx: broadcast::Sender<Snapshot>,
    events_tx: broadcast::Sender<VehicleEvent>,
}

impl Engine {
    pub fn new() -> Self {
        let (stop_tx, _) = watch::channel(false);
        let (snapshots_tx, _) = broadcast::channel(64);
        let (events_tx, _) = broadcast::channel(256);
        Engine {
            sim: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            current_run: Arc::new(Mutex::new(None)),
            stop_tx,
            snapshots_tx,
            events_tx,
        }
    }

    /// Reset all state and create the stations for one run. Refused while a
    /// run is active.
    pub fn initialize(&self, params: SimulationParameters) -> Result<(), EngineError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(EngineError::AlreadyRunning);
        }
        let simulation = Simulation::new(params)?;
        *self.sim.lock().unwrap() = Some(simulation);
        *self.current_run.lock().unwrap() = None;
        Ok(())
    }

    /// Spawn the tick loop. Returns the id of the new run.
    pub fn start(&self) -> Result<Uuid, EngineError> {
        if self.sim.lock().unwrap().is_none() {
            return Err(EngineError::NotInitialized);
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(EngineError::AlreadyRunning);
        }

        // A stop requested before this run belongs to no run at all.
        self.stop_tx.send_replace(false);
        let run_id = Uuid::new_v4();
        *self.current_run.lock().unwrap() = Some(run_id);
        tracing::info!(%run_id, "simulation run starting");

        let sim = Arc::clone(&self.sim);
        let running = Arc::clone(&self.running);
        let mut stop_rx = self.stop_tx.subscribe();
        let snapshots_tx = self.snapshots_tx.clone();
        let events_tx = self.events_tx.clone();

        tokio::spawn(async move {
            let speed = sim
                .lock()
                .unwrap()
                .as_ref()
                .map(|s| s.params().speed_multiplier)
                .unwrap_or(1.0);
            let batch = batch_size(speed);
            let delay = pacing_delay(speed);
            let mut ticks_since_emit = 0u64;

            loop {
                if *stop_rx.borrow() {
                    tracing::info!(%run_id, "stop requested, leaving tick loop");
                    break;
                }

                let (events, snapshot, finished) = {
                    let mut guard = sim.lock().unwrap();
                    let Some(simulation) = guard.as_mut() else {
                        break;
                    };
                    if simulation.is_finished() {
                        (Vec::new(), None, true)
                    } else {
                        let events = simulation.tick();
                        ticks_since_emit += 1;
                        let snapshot = if ticks_since_emit >= batch {
                            ticks_since_emit = 0;
                            Some(simulation.snapshot())
                        } else {
                            None
                        };
                        (events, snapshot, simulation.is_finished())
                    }
                };

                // Subscribers may come and go; a send with no receivers is fine.
                for event in events {
                    let _ = events_tx.send(event);
                }
                if let Some(snapshot) = snapshot {
                    let _ = snapshots_tx.send(snapshot);
                }
                if finished {
                    break;
                }

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            tracing::info!(%run_id, "stop requested during pacing delay");
                            break;
                        }
                    }
                }
            }

            // One final snapshot on every exit path, completion or stop.
            let final_snapshot = sim.lock().unwrap().as_ref().map(Simulation::snapshot);
            if let Some(snapshot) = final_snapshot {
                let _ = snapshots_tx.send(snapshot);
            }
            running.store(false, Ordering::SeqCst);
            tracing::info!(%run_id, "simulation run ended");
        });

        Ok(run_id)
    }

    /// Request cooperative cancellation. Idempotent, never an error, and a
    /// no-op when nothing is running.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_initialized(&self) -> bool {
        self.sim.lock().unwrap().is_some()
    }

    pub fn run_id(&self) -> Option<Uuid> {
        *self.current_run.lock().unwrap()
    }

    pub fn status(&self) -> EngineStatus {
        let guard = self.sim.lock().unwrap();
        EngineStatus {
            initialized: guard.is_some(),
            running: self.is_running(),
            run_id: *self.current_run.lock().unwrap(),
            time: guard.as_ref().map(Simulation::now),
            tick: guard.as_ref().map(Simulation::tick_count),
        }
    }

    pub fn current_time(&self) -> Option<DateTime<Utc>> {
        self.sim.lock().unwrap().as_ref().map(Simulation::now)
    }

    /// Owned copy of one station's state.
    pub fn station(&self, id: u32) -> Option<StationSnapshot> {
        self.sim.lock().unwrap().as_ref()?.station(id)
    }

    pub fn stations(&self) -> Vec<StationSnapshot> {
        self.sim
            .lock()
            .unwrap()
            .as_ref()
            .map(Simulation::station_snapshots)
            .unwrap_or_default()
    }

    /// Every vehicle currently charging or queued, across all stations.
    pub fn active_vehicles(&self) -> Vec<Vehicle> {
        self.sim
            .lock()
            .unwrap()
            .as_ref()
            .map(Simulation::active_vehicles)
            .unwrap_or_default()
    }

    pub fn metrics(&self) -> Option<SystemMetrics> {
        self.sim.lock().unwrap().as_ref().map(Simulation::metrics)
    }

    pub fn statistics(&self) -> Option<StatisticsSnapshot> {
        self.sim.lock().unwrap().as_ref().map(Simulation::statistics)
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.sim.lock().unwrap().as_ref().map(Simulation::snapshot)
    }

    pub fn subscribe_snapshots(&self) -> broadcast::Receiver<Snapshot> {
        self.snapshots_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<VehicleEvent> {
        self.events_tx.subscribe()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}
