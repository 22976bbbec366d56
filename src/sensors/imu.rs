use nalgebra::Vector3;

use crate::dynamics::VehicleState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuReading {
    pub accel: Vector3<f64>, // m/s^2, body FRD, specific force
    pub gyro: Vector3<f64>,  // rad/s, body FRD
}

/// Specific force `R^T (a - g)` plus bias, and body rates plus bias.
///
/// At rest and level this reads `(0, 0, -g)`: the accelerometer feels the
/// ground pushing up.
pub fn imu(state: &VehicleState, gravity_ned: &Vector3<f64>) -> ImuReading {
    let specific = state
        .attitude
        .inverse_transform_vector(&(state.acceleration - gravity_ned));
    ImuReading {
        accel: specific + state.accel_bias,
        gyro: state.angular_velocity + state.gyro_bias,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::UnitQuaternion;
    use std::f64::consts::PI;

    const G: Vector3<f64> = Vector3::new(0.0, 0.0, 9.8);

    #[test]
    fn level_at_rest_reads_minus_g() {
        let s = VehicleState::default();
        let r = imu(&s, &G);
        assert!((r.accel - Vector3::new(0.0, 0.0, -9.8)).norm() < 1e-12);
        assert_eq!(r.gyro, Vector3::zeros());
    }

    #[test]
    fn free_fall_reads_zero() {
        let mut s = VehicleState::default();
        s.acceleration = G;
        assert!(imu(&s, &G).accel.norm() < 1e-12);
    }

    #[test]
    fn upside_down_reads_plus_g() {
        let s = VehicleState::new(Vector3::zeros(), UnitQuaternion::from_euler_angles(PI, 0.0, 0.0));
        let r = imu(&s, &G);
        assert!((r.accel.z - 9.8).abs() < 1e-9);
    }

    #[test]
    fn biases_are_added() {
        let mut s = VehicleState::default();
        s.accel_bias = Vector3::new(0.1, 0.0, 0.0);
        s.gyro_bias = Vector3::new(0.0, 0.01, 0.0);
        s.angular_velocity = Vector3::new(0.0, 0.0, 1.0);
        let r = imu(&s, &G);
        assert!((r.accel.x - 0.1).abs() < 1e-12);
        assert_eq!(r.gyro, Vector3::new(0.0, 0.01, 1.0));
    }
}
