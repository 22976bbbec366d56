use std::sync::Arc;

use nalgebra::Vector3;

use crate::dynamics::rigid_body::RigidBody;
use crate::error::ParamsError;
use crate::physics::actuators::{self, CommandVector};
use crate::physics::aerodynamics::AeroLoads;
use crate::physics::propulsion;
use crate::vehicle::VehicleParameters;

/// Quadrotor model: rotor thrust and reaction torque, quadratic body drag and
/// linear rate damping. No aerodynamic tables.
#[derive(Debug, Clone)]
pub struct Multicopter {
    pub body: RigidBody,
}

impl Multicopter {
    pub fn new(params: Arc<VehicleParameters>) -> Result<Self, ParamsError> {
        Ok(Self { body: RigidBody::new(params)? })
    }

    pub fn process(&mut self, dt: f64, cmd: &CommandVector) {
        if !(dt > 0.0 && dt.is_finite()) {
            return;
        }
        self.body.update_wind();
        let targets = actuators::to_physical(&self.body.params.channels, cmd);
        let effective = self.body.drive_actuators(&targets, dt);
        let prop = propulsion::propulsion(&self.body.params.propellers, &effective, 1.0);

        let airspeed = self.body.state.airspeed();
        let drag_force = -airspeed * (self.body.params.linear_drag * airspeed.norm());
        let drag_moment = -self.body.state.angular_velocity * self.body.params.angular_drag;

        self.body.advance(&prop, &AeroLoads::default(), drag_force, drag_moment, dt);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::actuators::Encoding;
    use crate::vehicle::{presets, CHANNELS};
    use nalgebra::UnitQuaternion;

    #[test]
    fn zero_command_free_falls() {
        let mut mc = Multicopter::new(Arc::new(presets::iris())).unwrap();
        mc.body.set_initial_pose(Vector3::new(0.0, 0.0, -10.0), UnitQuaternion::identity());
        mc.process(0.004, &CommandVector::default());
        let a = mc.body.state.acceleration;
        assert!(a.x.abs() < 1e-12 && a.y.abs() < 1e-12, "a = {:?}", a);
        assert!((a.z - 9.8).abs() < 1e-9);
        assert!(mc.body.state.angular_acceleration.norm() < 1e-12);
    }

    #[test]
    fn full_throttle_climbs() {
        let mut mc = Multicopter::new(Arc::new(presets::iris())).unwrap();
        mc.body.set_initial_pose(Vector3::new(0.0, 0.0, -1.0), UnitQuaternion::identity());
        let mut axes = [0.0; CHANNELS];
        axes[..4].fill(1.0);
        let cmd = CommandVector::new(axes, Encoding::Normalized);
        for _ in 0..250 {
            mc.process(0.004, &cmd);
        }
        assert!(mc.body.state.position.z < -2.0, "z = {}", mc.body.state.position.z);
        assert!(mc.body.state.velocity.z < 0.0);
    }

    #[test]
    fn differential_thrust_rolls() {
        let mut mc = Multicopter::new(Arc::new(presets::iris())).unwrap();
        mc.body.set_initial_pose(Vector3::new(0.0, 0.0, -10.0), UnitQuaternion::identity());
        // Motors 1 and 2 on the left (y < 0) spin faster: roll right, +x.
        let cmd = CommandVector::new([0.5, 0.7, 0.7, 0.5, 0.0, 0.0, 0.0, 0.0], Encoding::Normalized);
        for _ in 0..50 {
            mc.process(0.004, &cmd);
        }
        assert!(mc.body.state.angular_velocity.x > 0.0, "w = {:?}", mc.body.state.angular_velocity);
    }
}
