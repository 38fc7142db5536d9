// State Manager - Thread-safe simulation state handling
// Serializes manual ticks, auto ticks, resets and reads behind one lock

use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::SimulationConfig;
use crate::physics_engine::{center_of_mass, step, total_energy, Entity, Point2, Vector2};
use crate::records::{parse_records, RecordError};

// =============================================================================
// SIMULATION STATE
// =============================================================================

#[derive(Debug, Clone)]
pub struct SimulationState {
    pub entities: Vec<Entity>,
    pub config: SimulationConfig,
    /// Simulated seconds since the last reset
    pub time: f64,
    pub tick_count: u64,
    pub total_energy: f64,   // For drift monitoring
    pub initial_energy: f64, // Reference energy at reset
}

impl SimulationState {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            entities: Vec::new(),
            config,
            time: 0.0,
            tick_count: 0,
            total_energy: 0.0,
            initial_energy: 0.0,
        }
    }

    /// Discard every entity and start over with `entities`
    pub fn reset(&mut self, entities: Vec<Entity>) {
        let energy = total_energy(&entities, self.config.gravitational_constant);
        self.entities = entities;
        self.time = 0.0;
        self.tick_count = 0;
        self.total_energy = energy;
        self.initial_energy = energy;
    }

    /// One full tick: gravity pass, then bounce and integrate
    pub fn tick(&mut self) {
        let params = self.config.step_params();
        step(&mut self.entities, &params);

        self.time += params.dt;
        self.tick_count += 1;
        self.total_energy = total_energy(&self.entities, params.g);
    }

    pub fn energy_drift(&self) -> f64 {
        if self.initial_energy.abs() > 1e-20 {
            (self.total_energy - self.initial_energy).abs() / self.initial_energy.abs()
        } else {
            0.0
        }
    }
}

// =============================================================================
// SERIALIZABLE STATE FOR FRONTEND
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontendEntity {
    pub mass: f64,
    pub position: [f64; 2],
    pub velocity: [f64; 2],
    pub acceleration: [f64; 2],
    /// Drawn body diameter, sqrt(mass)
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontendState {
    pub entities: Vec<FrontendEntity>,
    pub time: f64,
    pub tick_count: u64,
    pub energy_drift: f64,
    pub center_of_mass: Option<[f64; 2]>,
}

fn pair(v: &Vector2) -> [f64; 2] {
    [v.x, v.y]
}

fn point(p: &Point2) -> [f64; 2] {
    [p.x, p.y]
}

impl SimulationState {
    pub fn to_frontend(&self) -> FrontendState {
        let entities = self
            .entities
            .iter()
            .map(|e| FrontendEntity {
                mass: e.mass,
                position: point(&e.position),
                velocity: pair(&e.velocity),
                acceleration: pair(&e.acceleration),
                radius: e.mass.max(0.0).sqrt(),
            })
            .collect();

        FrontendState {
            entities,
            time: self.time,
            tick_count: self.tick_count,
            energy_drift: self.energy_drift(),
            center_of_mass: center_of_mass(&self.entities).map(|p| point(&p)),
        }
    }
}

// =============================================================================
// AUTO TICKER (runs on the tokio runtime)
// =============================================================================

/// Periodic tick driver. Each tick takes the state's write lock for its whole
/// duration, so it never interleaves with a manual tick, a reset or a reader.
pub struct AutoTicker {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
    period: Duration,
}

impl AutoTicker {
    /// Must be called from within a tokio runtime
    pub fn start(state: Arc<RwLock<SimulationState>>, period: Duration) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; the first step waits a full period
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => {
                        let mut sim = state.write();
                        sim.tick();
                        debug!("auto tick {}", sim.tick_count);
                    }
                }
            }
        });

        info!("auto update started every {:?}", period);
        Self {
            stop_tx,
            handle,
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Signal the loop and wait for it to exit. No tick is in flight once
    /// this returns.
    pub async fn stop(self) {
        // The receiver is gone only if the task already ended
        let _ = self.stop_tx.send(());
        let _ = self.handle.await;
        info!("auto update stopped");
    }
}

// =============================================================================
// GLOBAL STATE
// =============================================================================

pub struct AppState {
    pub simulation: Arc<RwLock<SimulationState>>,
    ticker: Mutex<Option<AutoTicker>>,
}

impl AppState {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            simulation: Arc::new(RwLock::new(SimulationState::new(config))),
            ticker: Mutex::new(None),
        }
    }

    /// Rebuild the entity collection from record rows. Bad rows are skipped
    /// and returned.
    pub fn reset_from_rows<S: AsRef<str>>(&self, rows: &[Vec<S>]) -> Vec<RecordError> {
        let mut sim = self.simulation.write();
        let parsed = parse_records(rows, sim.config.entity_limit);
        info!(
            "reset with {} entities ({} rows rejected)",
            parsed.entities.len(),
            parsed.errors.len()
        );
        sim.reset(parsed.entities);
        parsed.errors
    }

    pub fn reset(&self, entities: Vec<Entity>) {
        self.simulation.write().reset(entities);
    }

    /// Manual tick; waits for any auto tick in progress
    pub fn tick(&self) {
        let mut sim = self.simulation.write();
        sim.tick();
        debug!("manual tick {}", sim.tick_count);
    }

    /// Consistent copy of the state between ticks
    pub fn snapshot(&self) -> FrontendState {
        self.simulation.read().to_frontend()
    }

    pub fn entities(&self) -> Vec<Entity> {
        self.simulation.read().entities.clone()
    }

    /// Clamped into 1..=1000 ms; a running auto ticker keeps its old period
    /// until it is restarted
    pub fn set_tick_interval_ms(&self, ms: u64) {
        self.simulation.write().config.set_tick_interval_ms(ms);
    }

    pub fn set_dt(&self, dt: f64) {
        if dt > 0.0 && dt.is_finite() {
            self.simulation.write().config.dt = dt;
        }
    }

    pub fn is_auto_updating(&self) -> bool {
        self.ticker.lock().as_ref().map_or(false, AutoTicker::is_running)
    }

    /// Start ticking every `tick_interval_ms`, restarting any running ticker
    pub async fn start_auto_update(&self) {
        self.stop_auto_update().await;

        let period = self.simulation.read().config.tick_interval();
        let ticker = AutoTicker::start(self.simulation.clone(), period);
        // A concurrent start may have raced us here; keep only the newest
        let previous = self.ticker.lock().replace(ticker);
        if let Some(previous) = previous {
            previous.stop().await;
        }
    }

    pub async fn stop_auto_update(&self) {
        let ticker = self.ticker.lock().take();
        if let Some(ticker) = ticker {
            ticker.stop().await;
        }
    }

    /// Flip auto update on or off; returns whether it is now running
    pub async fn toggle_auto_update(&self) -> bool {
        if self.is_auto_updating() {
            self.stop_auto_update().await;
            false
        } else {
            self.start_auto_update().await;
            true
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

// =============================================================================
// TESTS
// =============================================================================
