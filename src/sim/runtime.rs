use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::RwLock;

use crate::config::SimSettings;
use crate::dynamics::{DynamicsModel, WindModel};
use crate::error::{ConfigError, SimError};
use crate::io::SensorSink;
use crate::sensors::{GeodeticConverter, NoiseConfig, NoiseModel, Synthesizer};
use crate::sim::clock::SimClock;
use crate::sim::command::{Command, CommandHandle, ReceiptStats};
use crate::sim::coordinator::{Coordinator, Snapshot};
use crate::sim::diagnostics::{Counters, Report};
use crate::sim::publisher::Publisher;
use crate::sim::scheduler::Ticker;
use crate::vehicle::{presets, CoefficientTables, VehicleParameters};

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Vehicle parameters from `vehicle_file`, or the airframe preset.
pub fn load_parameters(settings: &SimSettings) -> Result<VehicleParameters, ConfigError> {
    let params = match &settings.vehicle_file {
        Some(path) => VehicleParameters::load(path)?,
        None => presets::for_airframe(settings.airframe),
    };
    if params.airframe != settings.airframe {
        return Err(ConfigError::Invalid {
            field: "vehicle_file",
            reason: format!("describes a {} airframe, settings select {}", params.airframe, settings.airframe),
        });
    }
    Ok(params)
}

pub fn load_tables(settings: &SimSettings) -> Result<CoefficientTables, ConfigError> {
    match &settings.tables_file {
        Some(path) => CoefficientTables::load(path),
        None => Ok(CoefficientTables::innopolis_vtol()),
    }
}

/// Dynamics model at its initial pose, ready to tick.
pub fn build_dynamics(settings: &SimSettings) -> Result<DynamicsModel, SimError> {
    let params = Arc::new(load_parameters(settings)?);
    let tables = Arc::new(load_tables(settings)?);
    let mut model = DynamicsModel::new(settings.dynamics, params, tables, settings.alt_ref)?;
    model.set_initial_pose(settings.init_pose.position, settings.init_pose.attitude);
    // Gusts share the sensor noise seed so a seeded run is repeatable.
    model.set_wind(WindModel::new(settings.wind, settings.wind_variance, settings.noise.seed)?);
    Ok(model)
}

pub fn build_publisher(
    settings: &SimSettings,
    params: &VehicleParameters,
    sink: Box<dyn SensorSink>,
) -> Result<Publisher, ConfigError> {
    let geodetic = GeodeticConverter::new(settings.lat_ref, settings.lon_ref, settings.alt_ref);
    let synth = Synthesizer::new(geodetic, params.gravity, settings.diff_pressure_gain);
    let noise = if settings.noise.enabled {
        let config = NoiseConfig::from_variances(params.accel_variance, params.gyro_variance);
        Some(NoiseModel::new(config, settings.noise.seed)?)
    } else {
        None
    };
    Ok(Publisher::new(synth, &settings.periods, noise, sink))
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// Latest published snapshot. Readers clone the inner `Arc`.
pub type SnapshotSlot = Arc<RwLock<Arc<Snapshot>>>;

/// The three simulation loops on their own threads. Dropping the runtime (or
/// calling [`Runtime::shutdown`]) stops and joins them.
pub struct Runtime {
    shutdown: Option<Sender<()>>,
    threads: Vec<JoinHandle<()>>,
    slot: SnapshotSlot,
    counters: Arc<Counters>,
    commands: CommandHandle,
}

impl Runtime {
    pub fn start(settings: &SimSettings, sink: Box<dyn SensorSink>) -> Result<Self, SimError> {
        let dynamics = build_dynamics(settings)?;
        let publisher = build_publisher(settings, dynamics.params(), sink)?;
        let clock = SimClock::new(settings.clock, settings.physics_period(), settings.real_time_factor);
        let physics_wall = clock.wall_period();
        let coordinator = Coordinator::new(dynamics, clock, settings.lockstep);

        let (command_tx, command_rx) = unbounded();
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let stats = Arc::new(ReceiptStats::default());
        let mut runtime = Runtime {
            shutdown: Some(shutdown_tx),
            threads: Vec::with_capacity(3),
            slot: Arc::new(RwLock::new(Arc::new(coordinator.snapshot()))),
            counters: Arc::new(Counters::default()),
            commands: CommandHandle::new(command_tx, Arc::clone(&stats)),
        };

        log::info!(
            "starting {} ({}) at {} Hz, {:?} clock, rtf {}",
            settings.airframe,
            settings.dynamics,
            settings.physics_rate_hz,
            settings.clock,
            settings.real_time_factor
        );

        let physics = PhysicsLoop {
            coordinator,
            commands: command_rx,
            slot: Arc::clone(&runtime.slot),
            counters: Arc::clone(&runtime.counters),
        };
        let shutdown = shutdown_rx.clone();
        runtime.spawn("physics", move || physics.run(physics_wall, &shutdown))?;

        let publish = PublishLoop {
            publisher,
            slot: Arc::clone(&runtime.slot),
            counters: Arc::clone(&runtime.counters),
        };
        let publish_wall = Duration::from_secs_f64(settings.publish_period() / settings.real_time_factor);
        let shutdown = shutdown_rx.clone();
        runtime.spawn("publish", move || publish.run(publish_wall, &shutdown))?;

        let diagnostics = DiagnosticsLoop {
            period: settings.diagnostics_period_s,
            slot: Arc::clone(&runtime.slot),
            counters: Arc::clone(&runtime.counters),
            stats,
        };
        runtime.spawn("diagnostics", move || diagnostics.run(&shutdown_rx))?;

        Ok(runtime)
    }

    fn spawn<F>(&mut self, name: &'static str, body: F) -> Result<(), SimError>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(body)
            .map_err(|source| SimError::Spawn { name, source })?;
        self.threads.push(handle);
        Ok(())
    }

    pub fn commands(&self) -> CommandHandle {
        self.commands.clone()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.slot.read())
    }

    /// Stop every loop and wait for the threads to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // Disconnecting wakes every loop blocked on its deadline.
        self.shutdown.take();
        for handle in self.threads.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                log::error!("{} thread panicked", name);
            }
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Loops
// ---------------------------------------------------------------------------

struct PhysicsLoop {
    coordinator: Coordinator,
    commands: Receiver<Command>,
    slot: SnapshotSlot,
    counters: Arc<Counters>,
}

impl PhysicsLoop {
    fn run(mut self, period: Duration, shutdown: &Receiver<()>) {
        let mut ticker = Ticker::new(period);
        while ticker.wait(shutdown) {
            self.coordinator.drain(&self.commands);
            if self.coordinator.tick(Instant::now()) {
                *self.slot.write() = Arc::new(self.coordinator.snapshot());
            }
            self.counters.physics_ticks.fetch_add(1, Ordering::Relaxed);
            self.counters.physics_missed.fetch_add(ticker.take_missed(), Ordering::Relaxed);
        }
        log::debug!("physics loop stopped at t={:.3}", self.coordinator.clock().now());
    }
}

struct PublishLoop {
    publisher: Publisher,
    slot: SnapshotSlot,
    counters: Arc<Counters>,
}

impl PublishLoop {
    fn run(mut self, period: Duration, shutdown: &Receiver<()>) {
        let mut ticker = Ticker::new(period);
        while ticker.wait(shutdown) {
            let snapshot = Arc::clone(&self.slot.read());
            let sent = self.publisher.publish(&snapshot);
            self.counters.messages.fetch_add(sent as u64, Ordering::Relaxed);
            self.counters.publish_ticks.fetch_add(1, Ordering::Relaxed);
            self.counters.publish_missed.fetch_add(ticker.take_missed(), Ordering::Relaxed);
        }
        self.publisher.flush();
        log::debug!("publish loop stopped");
    }
}

struct DiagnosticsLoop {
    period: f64, // s, wall clock
    slot: SnapshotSlot,
    counters: Arc<Counters>,
    stats: Arc<ReceiptStats>,
}

impl DiagnosticsLoop {
    fn run(self, shutdown: &Receiver<()>) {
        let mut ticker = Ticker::new(Duration::from_secs_f64(self.period));
        while ticker.wait(shutdown) {
            let snapshot = Arc::clone(&self.slot.read());
            Report::new(self.period, self.counters.take(), self.stats.take())
                .with_vehicle(&snapshot.state)
                .log();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
