use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::dynamics::calibration::CalibrationMode;
use crate::physics::aerodynamics::AeroLoads;
use crate::physics::propulsion::UnitOutput;
use crate::vehicle::{CHANNELS, PROPULSION_UNITS};

// ---------------------------------------------------------------------------
// Vehicle state: NED position/velocity, FRD attitude and rates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    pub time: f64,                            // s, simulated
    pub position: Vector3<f64>,               // m, NED
    pub velocity: Vector3<f64>,               // m/s, NED
    pub acceleration: Vector3<f64>,           // m/s^2, NED
    pub attitude: UnitQuaternion<f64>,        // body(FRD) -> NED
    pub angular_velocity: Vector3<f64>,       // rad/s, body
    pub angular_acceleration: Vector3<f64>,   // rad/s^2, body
    pub prev_actuators: [f64; CHANNELS],
    pub actuators: [f64; CHANNELS],           // effective positions
    pub units: [UnitOutput; PROPULSION_UNITS],
    pub aero: AeroLoads,
    pub prop_force: Vector3<f64>,             // N, body
    pub prop_moment: Vector3<f64>,            // N*m, body
    pub total_force: Vector3<f64>,            // N, body, gravity included
    pub total_moment: Vector3<f64>,           // N*m, body
    pub wind: Vector3<f64>,                   // m/s, NED
    pub gust: Vector3<f64>,                   // m/s, NED
    pub accel_bias: Vector3<f64>,
    pub gyro_bias: Vector3<f64>,
    pub armed: bool,
    pub calibration: CalibrationMode,
}

impl VehicleState {
    pub fn new(position: Vector3<f64>, attitude: UnitQuaternion<f64>) -> Self {
        Self {
            time: 0.0,
            position,
            velocity: Vector3::zeros(),
            acceleration: Vector3::zeros(),
            attitude,
            angular_velocity: Vector3::zeros(),
            angular_acceleration: Vector3::zeros(),
            prev_actuators: [0.0; CHANNELS],
            actuators: [0.0; CHANNELS],
            units: [UnitOutput::default(); PROPULSION_UNITS],
            aero: AeroLoads::default(),
            prop_force: Vector3::zeros(),
            prop_moment: Vector3::zeros(),
            total_force: Vector3::zeros(),
            total_moment: Vector3::zeros(),
            wind: Vector3::zeros(),
            gust: Vector3::zeros(),
            accel_bias: Vector3::zeros(),
            gyro_bias: Vector3::zeros(),
            armed: false,
            calibration: CalibrationMode::Idle,
        }
    }

    /// Velocity in body axes.
    pub fn body_velocity(&self) -> Vector3<f64> {
        self.attitude.inverse_transform_vector(&self.velocity)
    }

    /// Air-relative velocity in body axes.
    pub fn airspeed(&self) -> Vector3<f64> {
        self.attitude
            .inverse_transform_vector(&(self.velocity - self.wind - self.gust))
    }

    /// Height above the ground plane (NED z = 0), m.
    pub fn height(&self) -> f64 {
        -self.position.z
    }

    /// (roll, pitch, yaw), rad.
    pub fn euler(&self) -> (f64, f64, f64) {
        self.attitude.euler_angles()
    }

    pub fn on_ground(&self) -> bool {
        self.position.z >= 0.0
    }
}

impl Default for VehicleState {
    fn default() -> Self {
        Self::new(Vector3::zeros(), UnitQuaternion::identity())
    }
}

// ---------------------------------------------------------------------------
// State derivative
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Deriv {
    pub dpos: Vector3<f64>,
    pub dvel: Vector3<f64>,       // NED
    pub dquat: Quaternion<f64>,   // NOT unit, raw quaternion derivative
    pub domega: Vector3<f64>,     // body
}

// ---------------------------------------------------------------------------
// Forces snapshot
// ---------------------------------------------------------------------------

/// Forces and moments of the last step, body axes, for debug output.
/// Identical layout for every dynamics variant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForcesSnapshot {
    pub aero_force: Vector3<f64>,
    pub total_force: Vector3<f64>,
    pub aero_moment: Vector3<f64>,
    pub total_moment: Vector3<f64>,
    pub steering_moment: Vector3<f64>,
    pub airspeed_moment: Vector3<f64>,
    pub motors_moment: Vector3<f64>,
    pub lift: Vector3<f64>,
    pub drag: Vector3<f64>,
    pub side: Vector3<f64>,
    pub unit_forces: [Vector3<f64>; PROPULSION_UNITS],
    pub unit_moments: [Vector3<f64>; PROPULSION_UNITS],
    pub body_velocity: Vector3<f64>,
}

impl ForcesSnapshot {
    pub const PACKED_LEN: usize = 21;

    pub fn from_state(state: &VehicleState) -> Self {
        let mut unit_forces = [Vector3::zeros(); PROPULSION_UNITS];
        let mut unit_moments = [Vector3::zeros(); PROPULSION_UNITS];
        for (i, u) in state.units.iter().enumerate() {
            unit_forces[i] = u.force;
            unit_moments[i] = u.moment;
        }
        Self {
            aero_force: state.aero.force,
            total_force: state.total_force,
            aero_moment: state.aero.moment,
            total_moment: state.total_moment,
            steering_moment: state.aero.steering_moment,
            airspeed_moment: state.aero.airspeed_moment,
            motors_moment: state.prop_moment,
            lift: state.aero.lift,
            drag: state.aero.drag,
            side: state.aero.side,
            unit_forces,
            unit_moments,
            body_velocity: state.body_velocity(),
        }
    }

    /// Flat debug vector: aero F, total F, aero M, total M, steering M,
    /// airspeed M, motors M.
    pub fn packed(&self) -> [f64; Self::PACKED_LEN] {
        let mut out = [0.0; Self::PACKED_LEN];
        let groups = [
            self.aero_force,
            self.total_force,
            self.aero_moment,
            self.total_moment,
            self.steering_moment,
            self.airspeed_moment,
            self.motors_moment,
        ];
        for (chunk, v) in out.chunks_exact_mut(3).zip(groups.iter()) {
            chunk.copy_from_slice(v.as_slice());
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
