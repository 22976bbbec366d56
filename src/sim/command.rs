use std::sync::Arc;

use crossbeam::channel::Sender;
use parking_lot::Mutex;

use crate::dynamics::CalibrationMode;
use crate::error::CommandError;
use crate::physics::actuators::Encoding;
use crate::vehicle::CHANNELS;

// ---------------------------------------------------------------------------
// Inbound messages
// ---------------------------------------------------------------------------

/// One inbound message, applied whole at the start of a physics tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Leading `count` channels replace the previous setpoints.
    Actuators {
        axes: [f64; CHANNELS],
        count: usize,
        encoding: Encoding,
        timestamp: f64, // s, sender clock
    },
    Arm(bool),
    Calibration(CalibrationMode),
}

// ---------------------------------------------------------------------------
// Receipt statistics
// ---------------------------------------------------------------------------

/// Actuator message count and worst inter-message gap over one diagnostics
/// window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReceiptWindow {
    pub count: u64,
    pub max_delay: f64, // s
}

#[derive(Debug, Default)]
pub struct ReceiptStats {
    inner: Mutex<ReceiptInner>,
}

#[derive(Debug, Default)]
struct ReceiptInner {
    window: ReceiptWindow,
    last_timestamp: Option<f64>,
}

impl ReceiptStats {
    pub fn record(&self, timestamp: f64) {
        let mut inner = self.inner.lock();
        if let Some(prev) = inner.last_timestamp {
            let delay = timestamp - prev;
            if delay > inner.window.max_delay {
                inner.window.max_delay = delay;
            }
        }
        inner.last_timestamp = Some(timestamp);
        inner.window.count += 1;
    }

    /// Return the current window and start a new one.
    pub fn take(&self) -> ReceiptWindow {
        std::mem::take(&mut self.inner.lock().window)
    }
}

// ---------------------------------------------------------------------------
// Command handle
// ---------------------------------------------------------------------------

/// Cloneable entry point for the external autopilot.
#[derive(Debug, Clone)]
pub struct CommandHandle {
    tx: Sender<Command>,
    stats: Arc<ReceiptStats>,
}

impl CommandHandle {
    pub fn new(tx: Sender<Command>, stats: Arc<ReceiptStats>) -> Self {
        Self { tx, stats }
    }

    /// Up to eight setpoints; missing trailing channels keep their values.
    pub fn send_actuators(&self, axes: &[f64], encoding: Encoding, timestamp: f64) -> Result<(), CommandError> {
        if axes.len() > CHANNELS {
            log::warn!("dropping actuator message with {} axes", axes.len());
            return Err(CommandError::TooManyAxes(axes.len()));
        }
        let mut padded = [0.0; CHANNELS];
        padded[..axes.len()].copy_from_slice(axes);
        self.stats.record(timestamp);
        self.send(Command::Actuators {
            axes: padded,
            count: axes.len(),
            encoding,
            timestamp,
        })
    }

    pub fn set_armed(&self, armed: bool) -> Result<(), CommandError> {
        self.send(Command::Arm(armed))
    }

    /// Select a calibration routine by its u8 code. Unknown codes are
    /// rejected and leave the simulation untouched.
    pub fn set_calibration(&self, code: u8) -> Result<(), CommandError> {
        let mode = CalibrationMode::try_from(code).map_err(|e| {
            log::warn!("{}", e);
            e
        })?;
        self.send(Command::Calibration(mode))
    }

    fn send(&self, cmd: Command) -> Result<(), CommandError> {
        self.tx.send(cmd).map_err(|_| CommandError::Disconnected)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
