use std::sync::Arc;

use nalgebra::{Matrix3, Quaternion, UnitQuaternion, Vector3};

use crate::dynamics::calibration::{CalibrationMode, CalibrationRoutine};
use crate::dynamics::state::{Deriv, VehicleState};
use crate::dynamics::wind::WindModel;
use crate::error::ParamsError;
use crate::physics::actuators;
use crate::physics::aerodynamics::AeroLoads;
use crate::physics::propulsion::PropulsionOutput;
use crate::vehicle::{VehicleParameters, CHANNELS};

// ---------------------------------------------------------------------------
// Mass properties
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MassProperties {
    pub mass: f64,                   // kg, uncertainty applied
    pub inertia: Matrix3<f64>,       // kg*m^2, uncertainty applied
    pub inertia_inv: Matrix3<f64>,
    pub gravity: Vector3<f64>,       // m/s^2, NED
}

impl MassProperties {
    pub fn from_params(params: &VehicleParameters) -> Result<Self, ParamsError> {
        let mass = params.effective_mass();
        if !(mass > 0.0 && mass.is_finite()) {
            return Err(ParamsError::Mass(mass));
        }
        let inertia = params.effective_inertia();
        let inertia_inv = inertia.try_inverse().ok_or(ParamsError::Inertia)?;
        Ok(Self {
            mass,
            inertia,
            inertia_inv,
            gravity: Vector3::new(0.0, 0.0, params.gravity),
        })
    }
}

// ---------------------------------------------------------------------------
// Land mode
// ---------------------------------------------------------------------------

/// Shaping of the controlled descent used while disarmed.
#[derive(Debug, Clone, Copy)]
pub struct LandProfile {
    pub max_descent_rate: f64,   // m/s
    pub max_vertical_accel: f64, // m/s^2, vertical speed slew
    pub velocity_damping: f64,   // 1/s, horizontal
    pub rate_damping: f64,     // 1/s, body rates
    pub max_level_rate: f64,   // rad/s, attitude slew toward level
}

impl Default for LandProfile {
    fn default() -> Self {
        Self {
            max_descent_rate: 1.0,
            max_vertical_accel: 4.0,
            velocity_damping: 2.0,
            rate_damping: 5.0,
            max_level_rate: 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// Equations of motion
// ---------------------------------------------------------------------------

/// Body force (gravity included) and body moment to state derivatives.
pub fn derivatives(state: &VehicleState, mp: &MassProperties, force_body: &Vector3<f64>, moment_body: &Vector3<f64>) -> Deriv {
    let dvel = state.attitude * force_body / mp.mass;

    // Euler's equation: I * domega = M - omega x (I * omega)
    let w = state.angular_velocity;
    let domega = mp.inertia_inv * (moment_body - w.cross(&(mp.inertia * w)));

    // Quaternion kinematics: dq/dt = 0.5 * q * [0, omega]
    let omega_quat = Quaternion::new(0.0, w.x, w.y, w.z);
    let dquat = state.attitude.quaternion() * omega_quat * 0.5;

    Deriv {
        dpos: state.velocity,
        dvel,
        dquat,
        domega,
    }
}

/// Forward-Euler step. The quaternion is renormalised every call.
pub fn integrate(state: &mut VehicleState, d: &Deriv, dt: f64) {
    state.velocity += d.dvel * dt;
    state.position += state.velocity * dt;
    state.acceleration = d.dvel;

    let q_raw = state.attitude.quaternion() + d.dquat * dt;
    state.attitude = UnitQuaternion::new_normalize(q_raw);
    state.angular_velocity += d.domega * dt;
    state.angular_acceleration = d.domega;
    state.time += dt;
}

/// Ground plane at NED z = 0.
pub fn apply_ground(state: &mut VehicleState) {
    if state.position.z < 0.0 {
        return;
    }
    state.position.z = 0.0;
    if state.velocity.z > 0.0 {
        state.velocity.z = 0.0;
    }
    if state.acceleration.z > 0.0 {
        state.acceleration.z = 0.0;
    }
    state.angular_velocity = Vector3::zeros();
    state.angular_acceleration = Vector3::zeros();
}

// ---------------------------------------------------------------------------
// Rigid body shared by the dynamics variants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RigidBody {
    pub params: Arc<VehicleParameters>,
    pub mass: MassProperties,
    pub land: LandProfile,
    pub state: VehicleState,
    wind: WindModel,
    calibration: CalibrationRoutine,
}

impl RigidBody {
    pub fn new(params: Arc<VehicleParameters>) -> Result<Self, ParamsError> {
        let mass = MassProperties::from_params(&params)?;
        let mut body = Self {
            params,
            mass,
            land: LandProfile::default(),
            state: VehicleState::default(),
            wind: WindModel::calm(),
            calibration: CalibrationRoutine::default(),
        };
        body.set_initial_pose(Vector3::zeros(), UnitQuaternion::identity());
        Ok(body)
    }

    /// Reset to rest at the given NED position and body->NED attitude.
    pub fn set_initial_pose(&mut self, position: Vector3<f64>, attitude: UnitQuaternion<f64>) {
        self.state = VehicleState::new(position, attitude);
        self.state.wind = self.wind.mean();
        self.state.accel_bias = self.params.accel_bias;
        self.state.gyro_bias = self.params.gyro_bias;
        self.state.actuators = actuators::rest(&self.params.channels);
        self.state.prev_actuators = self.state.actuators;
        self.calibration = CalibrationRoutine::default();
    }

    pub fn set_wind(&mut self, wind: WindModel) {
        self.state.wind = wind.mean();
        self.state.gust = Vector3::zeros();
        self.wind = wind;
    }

    /// Draw this step's gust. Called once per integrated step, before the
    /// air-relative velocity is used.
    pub fn update_wind(&mut self) {
        self.state.wind = self.wind.mean();
        self.state.gust = self.wind.sample_gust();
    }

    /// Step the actuator model and return the new effective positions.
    pub fn drive_actuators(&mut self, targets: &[f64; CHANNELS], dt: f64) -> [f64; CHANNELS] {
        let next = actuators::update(&self.params.channels, &self.state.actuators, targets, dt);
        self.state.prev_actuators = self.state.actuators;
        self.state.actuators = next;
        next
    }

    /// Integrate one step under the given propulsion, aerodynamic and extra
    /// body loads. Gravity is added here.
    pub fn advance(&mut self, prop: &PropulsionOutput, aero: &AeroLoads, extra_force: Vector3<f64>, extra_moment: Vector3<f64>, dt: f64) {
        let gravity_body = self
            .state
            .attitude
            .inverse_transform_vector(&(self.mass.gravity * self.mass.mass));
        let force = aero.force + prop.force + extra_force + gravity_body;
        let moment = aero.moment + prop.moment + extra_moment;

        let d = derivatives(&self.state, &self.mass, &force, &moment);
        integrate(&mut self.state, &d, dt);
        apply_ground(&mut self.state);

        self.state.units = prop.units;
        self.state.aero = *aero;
        self.state.prop_force = prop.force;
        self.state.prop_moment = prop.moment;
        self.state.total_force = force;
        self.state.total_moment = moment;
        self.state.calibration = CalibrationMode::Idle;
        self.calibration = CalibrationRoutine::default();
    }

    /// Controlled descent: actuators to rest, damped motion, vertical speed
    /// and attitude slewed at bounded rates.
    pub fn land(&mut self, dt: f64) {
        if !(dt > 0.0 && dt.is_finite()) {
            return;
        }
        let rest = actuators::rest(&self.params.channels);
        self.drive_actuators(&rest, dt);

        let profile = self.land;
        let s = &mut self.state;
        let prev_velocity = s.velocity;

        let horizontal = (-profile.velocity_damping * dt).exp();
        s.velocity.x *= horizontal;
        s.velocity.y *= horizontal;
        let target_vz = if s.on_ground() { 0.0 } else { profile.max_descent_rate };
        let max_dv = profile.max_vertical_accel * dt;
        s.velocity.z += (target_vz - s.velocity.z).clamp(-max_dv, max_dv);

        let prev_rates = s.angular_velocity;
        s.angular_velocity *= (-profile.rate_damping * dt).exp();
        s.angular_acceleration = (s.angular_velocity - prev_rates) / dt;

        let (_, _, yaw) = s.attitude.euler_angles();
        let level = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw);
        s.attitude = slew_toward(&s.attitude, &level, profile.max_level_rate * dt);

        s.position += s.velocity * dt;
        s.acceleration = (s.velocity - prev_velocity) / dt;
        apply_ground(s);
        if s.on_ground() {
            s.velocity = Vector3::zeros();
        }

        s.units = Default::default();
        s.aero = AeroLoads::default();
        s.prop_force = Vector3::zeros();
        s.prop_moment = Vector3::zeros();
        s.total_force = s.acceleration * self.mass.mass;
        s.total_moment = Vector3::zeros();
        s.calibration = CalibrationMode::Idle;
        s.time += dt;
        self.calibration = CalibrationRoutine::default();
    }

    pub fn calibrate(&mut self, mode: CalibrationMode, dt: f64) {
        self.calibration.step(&mut self.state, mode, dt);
    }
}

/// Rotate `from` toward `to` by at most `max_angle` radians.
pub fn slew_toward(from: &UnitQuaternion<f64>, to: &UnitQuaternion<f64>, max_angle: f64) -> UnitQuaternion<f64> {
    let angle = from.angle_to(to);
    if angle <= max_angle {
        return *to;
    }
    let t = max_angle / angle;
    from.try_slerp(to, t, 1e-9)
        .unwrap_or_else(|| from * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), max_angle))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::presets;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn body() -> RigidBody {
        let mut b = RigidBody::new(Arc::new(presets::innopolis_vtol())).unwrap();
        b.set_initial_pose(Vector3::new(0.0, 0.0, -10.0), UnitQuaternion::identity());
        b
    }

    #[test]
    fn gravity_only_at_rest() {
        let mut b = body();
        b.advance(&PropulsionOutput::default(), &AeroLoads::default(), Vector3::zeros(), Vector3::zeros(), 0.004);
        let a = b.state.acceleration;
        assert!(a.x.abs() < 1e-12 && a.y.abs() < 1e-12);
        assert!((a.z - 9.8).abs() < 1e-12, "a = {:?}", a);
        assert!(b.state.angular_acceleration.norm() < 1e-12);
    }

    #[test]
    fn quaternion_stays_normalized() {
        let mut b = body();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let moment = Vector3::new(
                rng.gen_range(-2.0..2.0),
                rng.gen_range(-2.0..2.0),
                rng.gen_range(-2.0..2.0),
            );
            b.advance(&PropulsionOutput::default(), &AeroLoads::default(), Vector3::zeros(), moment, 0.004);
            let n = b.state.attitude.quaternion().norm();
            assert!((n - 1.0).abs() <= 1e-6, "norm {}", n);
        }
    }

    #[test]
    fn torque_free_rotation_conserves_momentum() {
        let mut b = body();
        b.state.angular_velocity = Vector3::new(0.1, 0.2, 0.3);
        let h0 = b.state.attitude * (b.mass.inertia * b.state.angular_velocity);
        // Keep it away from the ground for the whole run.
        b.state.position.z = -1e6;
        for _ in 0..250 {
            b.advance(&PropulsionOutput::default(), &AeroLoads::default(), Vector3::zeros(), Vector3::zeros(), 0.0004);
        }
        let h1 = b.state.attitude * (b.mass.inertia * b.state.angular_velocity);
        assert!((h1 - h0).norm() / h0.norm() < 1e-2);
    }

    #[test]
    fn ground_stops_descent() {
        let mut b = body();
        b.state.position.z = -0.001;
        b.state.velocity.z = 3.0;
        b.state.angular_velocity = Vector3::new(1.0, 0.0, 0.0);
        b.advance(&PropulsionOutput::default(), &AeroLoads::default(), Vector3::zeros(), Vector3::zeros(), 0.01);
        assert_eq!(b.state.position.z, 0.0);
        assert_eq!(b.state.velocity.z, 0.0);
        assert_eq!(b.state.angular_velocity, Vector3::zeros());
    }

    #[test]
    fn land_descends_and_levels_smoothly() {
        let mut b = body();
        b.state.attitude = UnitQuaternion::from_euler_angles(0.4, -0.3, 1.0);
        b.state.velocity = Vector3::new(5.0, -2.0, 0.0);
        let dt = 0.004;
        let mut prev = b.state.attitude;
        for _ in 0..2_000 {
            b.land(dt);
            let step = prev.angle_to(&b.state.attitude);
            assert!(step <= b.land.max_level_rate * dt + 1e-9, "jump {}", step);
            prev = b.state.attitude;
        }
        let (roll, pitch, yaw) = b.state.euler();
        assert!(roll.abs() < 1e-6 && pitch.abs() < 1e-6);
        assert!((yaw - 1.0).abs() < 0.1);
        assert!(b.state.velocity.x.abs() < 0.01);
        assert!(b.state.height() < 10.0);
    }

    #[test]
    fn land_slews_vertical_speed_of_a_climbing_vehicle() {
        let mut b = body();
        b.state.velocity = Vector3::new(0.0, 0.0, -11.4);
        let dt = 0.004;
        let limit = b.land.max_vertical_accel;
        let mut prev = b.state.velocity.z;
        for _ in 0..2_000 {
            b.land(dt);
            let dv = b.state.velocity.z - prev;
            assert!(dv.abs() / dt <= limit + 1e-9, "dv/dt {}", dv / dt);
            assert!(b.state.acceleration.z.abs() <= limit + 1e-9);
            prev = b.state.velocity.z;
        }
        // Reversed and settled at the descent rate.
        assert!((b.state.velocity.z - b.land.max_descent_rate).abs() < 1e-9);
    }

    #[test]
    fn land_settles_on_ground() {
        let mut b = body();
        b.state.position.z = -0.5;
        for _ in 0..1_000 {
            b.land(0.004);
        }
        assert_eq!(b.state.position.z, 0.0);
        assert_eq!(b.state.velocity, Vector3::zeros());
    }

    #[test]
    fn pose_reset_keeps_bias_and_mean_wind() {
        let params = crate::vehicle::VehicleBuilder::new("biased", crate::vehicle::Airframe::Iris)
            .imu_bias(Vector3::new(0.05, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.002))
            .build()
            .unwrap();
        let mut b = RigidBody::new(Arc::new(params)).unwrap();
        assert_eq!(b.state.accel_bias, Vector3::new(0.05, 0.0, 0.0));
        b.set_wind(WindModel::new(Vector3::new(2.0, 0.0, 0.0), 1.0, Some(5)).unwrap());
        b.update_wind();
        assert!(b.state.gust.norm() > 0.0);

        b.set_initial_pose(Vector3::new(0.0, 0.0, -3.0), UnitQuaternion::identity());
        assert_eq!(b.state.wind, Vector3::new(2.0, 0.0, 0.0));
        assert_eq!(b.state.gust, Vector3::zeros());
        assert_eq!(b.state.gyro_bias, Vector3::new(0.0, 0.0, 0.002));
    }

    #[test]
    fn slew_limits_angle() {
        let from = UnitQuaternion::identity();
        let to = UnitQuaternion::from_euler_angles(1.0, 0.0, 0.0);
        let mid = slew_toward(&from, &to, 0.1);
        assert!((from.angle_to(&mid) - 0.1).abs() < 1e-9);
        assert_eq!(slew_toward(&from, &to, 2.0), to);
    }
}
