use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;

use nalgebra::{UnitQuaternion, Vector3};

use crate::dynamics::state::VehicleState;
use crate::error::CommandError;

/// Yaw rate while the magnetometer routines spin the vehicle, rad/s.
pub const MAG_ROTATION_RATE: f64 = 0.5;
/// Forward speed forced during airspeed calibration, m/s.
pub const AIRSPEED_CALIBRATION_SPEED: f64 = 10.0;

// ---------------------------------------------------------------------------
// Calibration modes
// ---------------------------------------------------------------------------

/// Static orientation requested by a calibration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Normal,
    UpsideDown,
    NoseDown,
    NoseUp,
    LeftSide,
    RightSide,
}

impl Orientation {
    const ALL: [Orientation; 6] = [
        Orientation::Normal,
        Orientation::UpsideDown,
        Orientation::NoseDown,
        Orientation::NoseUp,
        Orientation::LeftSide,
        Orientation::RightSide,
    ];

    /// Attitude relative to a level, north-facing vehicle.
    pub fn attitude(self) -> UnitQuaternion<f64> {
        let (roll, pitch) = match self {
            Orientation::Normal => (0.0, 0.0),
            Orientation::UpsideDown => (PI, 0.0),
            Orientation::NoseDown => (0.0, -FRAC_PI_2),
            Orientation::NoseUp => (0.0, FRAC_PI_2),
            Orientation::LeftSide => (-FRAC_PI_2, 0.0),
            Orientation::RightSide => (FRAC_PI_2, 0.0),
        };
        UnitQuaternion::from_euler_angles(roll, pitch, 0.0)
    }
}

/// Calibration routine selected by the autopilot's u8 code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CalibrationMode {
    /// 0: normal operation.
    #[default]
    Idle,
    /// 1-6: spin about the vertical in the given orientation.
    Magnetometer(Orientation),
    /// 7: level hold, armed.
    MagnetometerArmed,
    /// 8: level hold, disarmed.
    MagnetometerDisarmed,
    /// 9-14: hold the given orientation still.
    Accelerometer(Orientation),
    /// 15
    AccelerometerArmed,
    /// 16
    AccelerometerDisarmed,
    /// 17: level, with forced forward velocity.
    Airspeed,
}

impl CalibrationMode {
    pub fn code(self) -> u8 {
        let index = |o: Orientation| Orientation::ALL.iter().position(|&x| x == o).unwrap_or(0) as u8;
        match self {
            CalibrationMode::Idle => 0,
            CalibrationMode::Magnetometer(o) => 1 + index(o),
            CalibrationMode::MagnetometerArmed => 7,
            CalibrationMode::MagnetometerDisarmed => 8,
            CalibrationMode::Accelerometer(o) => 9 + index(o),
            CalibrationMode::AccelerometerArmed => 15,
            CalibrationMode::AccelerometerDisarmed => 16,
            CalibrationMode::Airspeed => 17,
        }
    }

    pub fn is_idle(self) -> bool {
        self == CalibrationMode::Idle
    }
}

impl TryFrom<u8> for CalibrationMode {
    type Error = CommandError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => CalibrationMode::Idle,
            1..=6 => CalibrationMode::Magnetometer(Orientation::ALL[usize::from(code - 1)]),
            7 => CalibrationMode::MagnetometerArmed,
            8 => CalibrationMode::MagnetometerDisarmed,
            9..=14 => CalibrationMode::Accelerometer(Orientation::ALL[usize::from(code - 9)]),
            15 => CalibrationMode::AccelerometerArmed,
            16 => CalibrationMode::AccelerometerDisarmed,
            17 => CalibrationMode::Airspeed,
            other => return Err(CommandError::UnknownCalibration(other)),
        })
    }
}

impl fmt::Display for CalibrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationMode::Idle => write!(f, "idle"),
            CalibrationMode::Magnetometer(o) => write!(f, "mag {:?}", o),
            CalibrationMode::MagnetometerArmed => write!(f, "mag armed"),
            CalibrationMode::MagnetometerDisarmed => write!(f, "mag disarmed"),
            CalibrationMode::Accelerometer(o) => write!(f, "accel {:?}", o),
            CalibrationMode::AccelerometerArmed => write!(f, "accel armed"),
            CalibrationMode::AccelerometerDisarmed => write!(f, "accel disarmed"),
            CalibrationMode::Airspeed => write!(f, "airspeed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Routine
// ---------------------------------------------------------------------------

/// Drives the vehicle state through a calibration routine. Keeps the heading
/// accumulated by the spinning magnetometer steps.
#[derive(Debug, Clone, Default)]
pub struct CalibrationRoutine {
    mode: CalibrationMode,
    heading: f64, // rad
}

impl CalibrationRoutine {
    pub fn mode(&self) -> CalibrationMode {
        self.mode
    }

    /// Force the state for one tick of `mode`. Position is frozen.
    pub fn step(&mut self, state: &mut VehicleState, mode: CalibrationMode, dt: f64) {
        if mode != self.mode {
            log::info!("calibration: {} -> {}", self.mode, mode);
            if self.mode.is_idle() {
                self.heading = state.euler().2;
            }
            self.mode = mode;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        let (orientation, yaw_rate) = match mode {
            CalibrationMode::Idle => return,
            CalibrationMode::Magnetometer(o) => (o, MAG_ROTATION_RATE),
            CalibrationMode::Accelerometer(o) => (o, 0.0),
            CalibrationMode::MagnetometerArmed
            | CalibrationMode::MagnetometerDisarmed
            | CalibrationMode::AccelerometerArmed
            | CalibrationMode::AccelerometerDisarmed
            | CalibrationMode::Airspeed => (Orientation::Normal, 0.0),
        };
        self.heading = (self.heading + yaw_rate * dt) % (2.0 * PI);

        let yaw = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.heading);
        state.attitude = yaw * orientation.attitude();
        state.angular_velocity = state
            .attitude
            .inverse_transform_vector(&Vector3::new(0.0, 0.0, yaw_rate));
        state.angular_acceleration = Vector3::zeros();

        state.velocity = if mode == CalibrationMode::Airspeed {
            yaw * Vector3::new(AIRSPEED_CALIBRATION_SPEED, 0.0, 0.0)
        } else {
            Vector3::zeros()
        };
        state.acceleration = Vector3::zeros();
        state.calibration = mode;
        state.time += dt;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
