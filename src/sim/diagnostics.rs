use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::Vector3;

use crate::dynamics::VehicleState;
use crate::frames;
use crate::sim::command::ReceiptWindow;
use crate::vehicle::CHANNELS;

/// Health below this ratio is reported as a warning.
pub const HEALTH_WARN: f64 = 0.9;
/// Actuator messages expected per second while armed.
pub const MIN_COMMAND_RATE: f64 = 100.0;
/// Longest tolerated gap between actuator messages, s.
pub const MAX_COMMAND_DELAY: f64 = 0.02;

/// Fraction of scheduled ticks that actually ran: `ticks / (ticks + missed)`.
/// Exactly 1.0 with no misses; 0.0 when nothing was scheduled or ran.
pub fn health(ticks: u64, missed: u64) -> f64 {
    let expected = ticks + missed;
    if expected == 0 {
        return 0.0;
    }
    ticks as f64 / expected as f64
}

/// Loop counters shared between the worker threads and the diagnostics loop.
#[derive(Debug, Default)]
pub struct Counters {
    pub physics_ticks: AtomicU64,
    pub physics_missed: AtomicU64,
    pub publish_ticks: AtomicU64,
    pub publish_missed: AtomicU64,
    pub messages: AtomicU64,
}

/// Counter values for one diagnostics window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CounterWindow {
    pub physics_ticks: u64,
    pub physics_missed: u64,
    pub publish_ticks: u64,
    pub publish_missed: u64,
    pub messages: u64,
}

impl Counters {
    /// Read and reset every counter.
    pub fn take(&self) -> CounterWindow {
        CounterWindow {
            physics_ticks: self.physics_ticks.swap(0, Ordering::Relaxed),
            physics_missed: self.physics_missed.swap(0, Ordering::Relaxed),
            publish_ticks: self.publish_ticks.swap(0, Ordering::Relaxed),
            publish_missed: self.publish_missed.swap(0, Ordering::Relaxed),
            messages: self.messages.swap(0, Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub period: f64, // s
    pub physics_health: f64,
    pub publish_health: f64,
    pub commands: u64,
    pub max_command_delay: f64, // s
    pub messages: u64,
    pub armed: bool,
    pub actuators: [f64; CHANNELS], // effective positions
    pub position_enu: Vector3<f64>, // m
}

impl Report {
    pub fn new(period: f64, counters: CounterWindow, receipts: ReceiptWindow) -> Self {
        Self {
            period,
            physics_health: health(counters.physics_ticks, counters.physics_missed),
            publish_health: health(counters.publish_ticks, counters.publish_missed),
            commands: receipts.count,
            max_command_delay: receipts.max_delay,
            messages: counters.messages,
            armed: false,
            actuators: [0.0; CHANNELS],
            position_enu: Vector3::zeros(),
        }
    }

    /// Attach the vehicle picture of the latest snapshot.
    pub fn with_vehicle(mut self, state: &VehicleState) -> Self {
        self.armed = state.armed;
        self.actuators = state.actuators;
        self.position_enu = frames::ned_to_enu(&state.position);
        self
    }

    pub fn loops_degraded(&self) -> bool {
        self.physics_health < HEALTH_WARN || self.publish_health < HEALTH_WARN
    }

    /// Too few or too sparse actuator messages. Only meaningful while armed.
    pub fn commands_degraded(&self) -> bool {
        let rate = self.commands as f64 / self.period;
        rate < MIN_COMMAND_RATE || self.max_command_delay > MAX_COMMAND_DELAY || self.max_command_delay == 0.0
    }

    pub fn summary(&self) -> String {
        let actuators: Vec<String> = self.actuators.iter().map(|u| format!("{:.1}", u)).collect();
        format!(
            "physics {:.0}%  publish {:.0}%  commands {} (max gap {:.1} ms)  messages {}  \
             actuators [{}]  enu [{:.2}, {:.2}, {:.2}]",
            self.physics_health * 100.0,
            self.publish_health * 100.0,
            self.commands,
            self.max_command_delay * 1e3,
            self.messages,
            actuators.join(", "),
            self.position_enu.x,
            self.position_enu.y,
            self.position_enu.z,
        )
    }

    pub fn log(&self) {
        let line = self.summary();
        if self.loops_degraded() || (self.armed && self.commands_degraded()) {
            log::warn!("{}", line);
        } else {
            log::info!("{}", line);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
