use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::physics::interp::{first_non_monotonic, interp1};
use crate::vehicle::{Propeller, CHANNELS, PROPULSION_UNITS};

const RAD_S_TO_RPM: f64 = 60.0 / (2.0 * std::f64::consts::PI);

// ---------------------------------------------------------------------------
// Thrust curves
// ---------------------------------------------------------------------------

/// Static thrust/torque as a function of rotor speed (rad/s) at sea-level
/// density. Both variants are monotonic in speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThrustCurve {
    /// thrust = kf * w^2, torque = km * w^2
    Quadratic { thrust_coeff: f64, torque_coeff: f64 },
    /// Measured points, linearly interpolated and clamped at both ends.
    Table {
        speed: Vec<f64>,
        thrust: Vec<f64>,
        torque: Vec<f64>,
    },
}

impl ThrustCurve {
    /// (thrust N, torque N*m) at sea-level density.
    pub fn evaluate(&self, speed: f64) -> (f64, f64) {
        let w = speed.max(0.0);
        match self {
            ThrustCurve::Quadratic { thrust_coeff, torque_coeff } => {
                (thrust_coeff * w * w, torque_coeff * w * w)
            }
            ThrustCurve::Table { speed, thrust, torque } => {
                (interp1(speed, thrust, w), interp1(speed, torque, w))
            }
        }
    }

    /// Sample a quadratic law into a table with `points` entries up to `max_speed`.
    pub fn tabulate(thrust_coeff: f64, torque_coeff: f64, max_speed: f64, points: usize) -> Self {
        let n = points.max(2);
        let speed: Vec<f64> = (0..n).map(|i| max_speed * i as f64 / (n - 1) as f64).collect();
        ThrustCurve::Table {
            thrust: speed.iter().map(|w| thrust_coeff * w * w).collect(),
            torque: speed.iter().map(|w| torque_coeff * w * w).collect(),
            speed,
        }
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        match self {
            ThrustCurve::Quadratic { thrust_coeff, torque_coeff } => {
                *thrust_coeff >= 0.0 && torque_coeff.is_finite()
            }
            ThrustCurve::Table { speed, thrust, torque } => {
                !speed.is_empty()
                    && speed.len() == thrust.len()
                    && speed.len() == torque.len()
                    && first_non_monotonic(speed).is_none()
                    && first_non_monotonic(thrust).is_none()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Per-unit and aggregate outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UnitOutput {
    pub thrust: f64,           // N
    pub torque: f64,           // N*m, reaction torque magnitude
    pub rpm: f64,
    pub force: Vector3<f64>,   // N, body
    pub moment: Vector3<f64>,  // N*m, body, about CG
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropulsionOutput {
    pub units: [UnitOutput; PROPULSION_UNITS],
    pub force: Vector3<f64>,
    pub moment: Vector3<f64>,
}

/// Evaluate a single rotor at effective speed `speed` (rad/s).
pub fn thruster(prop: &Propeller, speed: f64, density_ratio: f64) -> UnitOutput {
    let (thrust, torque) = prop.curve.evaluate(speed);
    let thrust = thrust * density_ratio;
    let torque = torque * density_ratio;

    let axis = prop.axis.try_normalize(1e-9).unwrap_or_else(|| -Vector3::z());
    let force = axis * thrust;
    // Reaction torque opposes rotor spin; spin = +1 is counter-clockwise
    // looking against the thrust axis.
    let reaction = -axis * (prop.spin * torque);
    let moment = prop.position.cross(&force) + reaction;

    UnitOutput {
        thrust,
        torque,
        rpm: speed.max(0.0) * RAD_S_TO_RPM,
        force,
        moment,
    }
}

/// Sum all rotors driven by the effective actuator vector.
pub fn propulsion(
    props: &[Propeller],
    actuators: &[f64; CHANNELS],
    density_ratio: f64,
) -> PropulsionOutput {
    let mut out = PropulsionOutput::default();
    for (slot, prop) in out.units.iter_mut().zip(props) {
        let speed = actuators.get(prop.channel).copied().unwrap_or(0.0);
        *slot = thruster(prop, speed, density_ratio);
    }
    out.force = out.units.iter().map(|u| u.force).sum();
    out.moment = out.units.iter().map(|u| u.moment).sum();
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::presets;

    fn rotor(x: f64, y: f64, spin: f64) -> Propeller {
        Propeller {
            channel: 0,
            position: Vector3::new(x, y, 0.0),
            axis: -Vector3::z(),
            spin,
            curve: ThrustCurve::Quadratic { thrust_coeff: 1e-5, torque_coeff: 1e-7 },
        }
    }

    #[test]
    fn quadratic_thrust_and_rpm() {
        let u = thruster(&rotor(0.0, 0.0, 1.0), 500.0, 1.0);
        assert!((u.thrust - 2.5).abs() < 1e-12);
        assert!((u.rpm - 500.0 * 60.0 / (2.0 * std::f64::consts::PI)).abs() < 1e-9);
        // Thrust points up (body -z)
        assert!(u.force.z < 0.0);
    }

    #[test]
    fn density_ratio_scales_thrust() {
        let full = thruster(&rotor(0.0, 0.0, 1.0), 400.0, 1.0);
        let thin = thruster(&rotor(0.0, 0.0, 1.0), 400.0, 0.8);
        assert!((thin.thrust - 0.8 * full.thrust).abs() < 1e-12);
    }

    #[test]
    fn offset_rotor_produces_roll_moment() {
        // Rotor on the right wing pushing up rolls the vehicle left (negative roll).
        let u = thruster(&rotor(0.0, 0.5, 0.0), 500.0, 1.0);
        assert!(u.moment.x < 0.0);
        assert!(u.moment.y.abs() < 1e-12);
    }

    #[test]
    fn table_curve_is_monotonic_and_clamped() {
        let c = ThrustCurve::tabulate(2e-5, 3e-7, 1000.0, 11);
        assert!(c.is_well_formed());
        let mut last = -1.0;
        for w in (0..=1200).step_by(50) {
            let (t, _) = c.evaluate(w as f64);
            assert!(t >= last);
            last = t;
        }
        assert_eq!(c.evaluate(5000.0), c.evaluate(1000.0));
        assert_eq!(c.evaluate(-10.0).0, 0.0);
    }

    #[test]
    fn symmetric_quad_has_zero_net_moment() {
        let p = presets::iris();
        let mut act = [0.0; CHANNELS];
        act[..4].fill(650.0);
        let out = propulsion(&p.propellers, &act, 1.0);
        assert!(out.moment.norm() < 1e-9, "moment {:?}", out.moment);
        assert!(out.force.z < 0.0);
        assert!(out.force.x.abs() < 1e-12 && out.force.y.abs() < 1e-12);
    }
}
