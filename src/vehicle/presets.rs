use nalgebra::{Matrix3, Vector3};

use super::params::{Airframe, ChannelSpec, Propeller, VehicleBuilder, VehicleParameters};
use crate::physics::propulsion::ThrustCurve;

// ---------------------------------------------------------------------------
// Preset airframes
// ---------------------------------------------------------------------------

const IRIS_MAX_SPEED: f64 = 1100.0;  // rad/s
const VTOL_MAX_SPEED: f64 = 1000.0;  // rad/s
const SURFACE_MAX_DEG: f64 = 20.0;

fn motor(max: f64, rate_limit: f64, time_constant: f64) -> ChannelSpec {
    ChannelSpec { min: 0.0, max, rate_limit, time_constant, scale: max, offset: 0.0 }
}

fn surface() -> ChannelSpec {
    ChannelSpec {
        min: -SURFACE_MAX_DEG,
        max: SURFACE_MAX_DEG,
        rate_limit: 200.0,
        time_constant: 0.03,
        scale: SURFACE_MAX_DEG,
        offset: 0.0,
    }
}

fn lift_rotor(channel: usize, x: f64, y: f64, spin: f64, curve: ThrustCurve) -> Propeller {
    Propeller {
        channel,
        position: Vector3::new(x, y, 0.0),
        axis: -Vector3::z(),
        spin,
        curve,
    }
}

/// 3DR Iris quadcopter, X layout, PX4 motor order.
pub fn iris() -> VehicleParameters {
    let curve = ThrustCurve::Quadratic {
        thrust_coeff: 8.548_58e-6,
        torque_coeff: 8.548_58e-6 * 0.016,
    };
    let m = motor(IRIS_MAX_SPEED, 20_000.0, 0.0125);
    let (ax, ay) = (0.13, 0.22);

    VehicleBuilder::new("Iris", Airframe::Iris)
        .mass(1.5)
        .gravity(9.8)
        .inertia(Matrix3::from_diagonal(&Vector3::new(0.029_125, 0.029_125, 0.055_225)))
        .propeller(lift_rotor(0, ax, ay, 1.0, curve.clone()))
        .propeller(lift_rotor(1, -ax, -ay, 1.0, curve.clone()))
        .propeller(lift_rotor(2, ax, -ay, -1.0, curve.clone()))
        .propeller(lift_rotor(3, -ax, ay, -1.0, curve))
        .channel(0, m)
        .channel(1, m)
        .channel(2, m)
        .channel(3, m)
        .imu_variance(0.005, 0.0003)
        .drag(0.1, 0.003)
        .finish()
}

/// Innopolis quadplane: four lift rotors, aileron/elevator/rudder and a
/// rear pusher engine.
pub fn innopolis_vtol() -> VehicleParameters {
    let lift = ThrustCurve::tabulate(2.5e-5, 2.5e-5 * 0.016, VTOL_MAX_SPEED, 41);
    let pusher = ThrustCurve::tabulate(3.0e-5, 3.0e-5 * 0.02, VTOL_MAX_SPEED, 41);
    let m = motor(VTOL_MAX_SPEED, 6_000.0, 0.02);
    let (ax, ay) = (0.4, 0.55);

    VehicleBuilder::new("Innopolis VTOL", Airframe::InnopolisVtol)
        .mass(5.5)
        .gravity(9.8)
        .air_density(1.225)
        .wing_area(0.6)
        .characteristic_length(0.3)
        .inertia(Matrix3::new(
            0.47, 0.0, -0.005,
            0.0, 0.58, 0.0,
            -0.005, 0.0, 0.97,
        ))
        .propeller(lift_rotor(0, ax, ay, 1.0, lift.clone()))
        .propeller(lift_rotor(1, -ax, -ay, 1.0, lift.clone()))
        .propeller(lift_rotor(2, ax, -ay, -1.0, lift.clone()))
        .propeller(lift_rotor(3, -ax, ay, -1.0, lift))
        .propeller(Propeller {
            channel: 7,
            position: Vector3::new(-0.6, 0.0, 0.0),
            axis: Vector3::x(),
            spin: 1.0,
            curve: pusher,
        })
        .channel(0, m)
        .channel(1, m)
        .channel(2, m)
        .channel(3, m)
        .channel(4, surface())
        .channel(5, surface())
        .channel(6, surface())
        .channel(7, motor(VTOL_MAX_SPEED, 20_000.0, 0.05))
        .imu_variance(0.005, 0.0003)
        .drag(0.0, 0.05)
        .finish()
}

pub fn for_airframe(airframe: Airframe) -> VehicleParameters {
    match airframe {
        Airframe::Iris => iris(),
        Airframe::InnopolisVtol => innopolis_vtol(),
    }
}
