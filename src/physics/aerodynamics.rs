use nalgebra::Vector3;

use crate::physics::interp::polyval;
use crate::vehicle::CoefficientTables;

/// Airspeeds below this produce no aerodynamic load.
pub const MIN_AIRSPEED: f64 = 1e-3; // m/s

const AOA_LIMIT_DEG: f64 = 45.0;
const AOS_LIMIT_DEG: f64 = 90.0;

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// Reference geometry and air density used to dimensionalise coefficients.
#[derive(Debug, Clone, Copy)]
pub struct AeroReference {
    pub density: f64,               // kg/m^3
    pub wing_area: f64,             // m^2
    pub characteristic_length: f64, // m
}

/// Control surface deflections, degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Surfaces {
    pub aileron: f64,
    pub elevator: f64,
    pub rudder: f64,
}

/// Aerodynamic load in body axes with its breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AeroLoads {
    pub force: Vector3<f64>,            // N
    pub moment: Vector3<f64>,           // N*m
    pub lift: Vector3<f64>,
    pub drag: Vector3<f64>,
    pub side: Vector3<f64>,
    /// Moment from control surfaces.
    pub steering_moment: Vector3<f64>,
    /// Moment from the airspeed polynomials.
    pub airspeed_moment: Vector3<f64>,
    pub aoa: f64,                       // rad, unclamped
    pub aos: f64,                       // rad, unclamped
    pub dynamic_pressure: f64,          // Pa
    /// Control derivatives per degree of deflection.
    pub cmx_a: f64,
    pub cmy_e: f64,
    pub cmz_r: f64,
}

// ---------------------------------------------------------------------------
// Flow angles
// ---------------------------------------------------------------------------

/// Angle of attack from a body (FRD) airspeed vector, rad.
pub fn angle_of_attack(airspeed: &Vector3<f64>) -> f64 {
    airspeed.z.atan2(airspeed.x)
}

/// Angle of sideslip from a body (FRD) airspeed vector, rad.
pub fn angle_of_sideslip(airspeed: &Vector3<f64>) -> f64 {
    let speed = airspeed.norm();
    if speed < MIN_AIRSPEED {
        return 0.0;
    }
    (airspeed.y / speed).clamp(-1.0, 1.0).asin()
}

pub fn dynamic_pressure(density: f64, speed: f64) -> f64 {
    0.5 * density * speed * speed
}

// ---------------------------------------------------------------------------
// Coefficient engine
// ---------------------------------------------------------------------------

/// Body-frame aerodynamic force and moment for the given air-relative
/// velocity (body FRD, m/s) and surface deflections.
///
/// Polynomials in AoA drive lift, drag and pitch; polynomials in AoS drive
/// side force, roll and yaw. Surface grids add the control contributions on
/// their own axes.
pub fn aero_loads(
    tables: &CoefficientTables,
    reference: &AeroReference,
    airspeed: &Vector3<f64>,
    surfaces: &Surfaces,
) -> AeroLoads {
    let speed = airspeed.norm();
    if speed < MIN_AIRSPEED || !speed.is_finite() {
        return AeroLoads::default();
    }

    let aoa = angle_of_attack(airspeed);
    let aos = angle_of_sideslip(airspeed);
    let aoa_deg = aoa.to_degrees().clamp(-AOA_LIMIT_DEG, AOA_LIMIT_DEG);
    let aos_deg = aos.to_degrees().clamp(-AOS_LIMIT_DEG, AOS_LIMIT_DEG);

    let cl = polyval(&tables.lift.coefficients(speed), aoa_deg);
    let cd = polyval(&tables.drag.coefficients(speed), aoa_deg);
    let cs = polyval(&tables.side.coefficients(speed), aos_deg)
        + tables.side_rudder.value(surfaces.rudder, speed)
        + tables.side_beta.value(aos_deg, speed);

    let cmx = polyval(&tables.roll.coefficients(speed), aos_deg);
    let cmy = polyval(&tables.pitch.coefficients(speed), aoa_deg);
    let cmz = polyval(&tables.yaw.coefficients(speed), aos_deg);

    let cmx_a = tables.roll_aileron.value(surfaces.aileron, speed);
    let cmy_e = tables.pitch_elevator.value(surfaces.elevator, speed);
    let cmz_r = tables.yaw_rudder.value(surfaces.rudder, speed);

    let q = dynamic_pressure(reference.density, speed);
    let qs = q * reference.wing_area;
    let qsl = qs * reference.characteristic_length;

    // Wind axes expressed in body frame.
    let v_hat = airspeed / speed;
    let lift_dir = Vector3::y().cross(&v_hat);
    let lift_dir = if lift_dir.norm() > MIN_AIRSPEED {
        lift_dir.normalize()
    } else {
        Vector3::zeros()
    };
    let side_dir = v_hat.cross(&lift_dir);

    let lift = lift_dir * (cl * qs);
    let drag = -v_hat * (cd * qs);
    let side = side_dir * (cs * qs);

    let airspeed_moment = Vector3::new(cmx, cmy, cmz) * qsl;
    let steering_moment = Vector3::new(
        cmx_a * surfaces.aileron,
        cmy_e * surfaces.elevator,
        cmz_r * surfaces.rudder,
    ) * qsl;

    AeroLoads {
        force: lift + drag + side,
        moment: airspeed_moment + steering_moment,
        lift,
        drag,
        side,
        steering_moment,
        airspeed_moment,
        aoa,
        aos,
        dynamic_pressure: q,
        cmx_a,
        cmy_e,
        cmz_r,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference() -> AeroReference {
        AeroReference { density: 1.225, wing_area: 0.6, characteristic_length: 0.3 }
    }

    #[test]
    fn flow_angles() {
        let v = Vector3::new(10.0, 0.0, 10.0);
        assert_relative_eq!(angle_of_attack(&v).to_degrees(), 45.0, epsilon = 1e-9);
        let v = Vector3::new(10.0, 10.0, 0.0);
        assert_relative_eq!(angle_of_sideslip(&v).to_degrees(), 45.0, epsilon = 1e-9);
        assert_eq!(angle_of_sideslip(&Vector3::zeros()), 0.0);
    }

    #[test]
    fn no_load_below_minimum_airspeed() {
        let tables = CoefficientTables::innopolis_vtol();
        let loads = aero_loads(
            &tables,
            &reference(),
            &Vector3::new(1e-4, 0.0, 0.0),
            &Surfaces { aileron: 10.0, elevator: 10.0, rudder: 10.0 },
        );
        assert_eq!(loads.force, Vector3::zeros());
        assert_eq!(loads.moment, Vector3::zeros());
        assert_eq!(loads.cmx_a, 0.0);
    }

    #[test]
    fn forward_flight_lifts_up_and_drags_back() {
        let tables = CoefficientTables::innopolis_vtol();
        let loads = aero_loads(&tables, &reference(), &Vector3::new(20.0, 0.0, 0.0), &Surfaces::default());
        // FRD: up is -z, backward is -x.
        assert!(loads.lift.z < 0.0, "lift {:?}", loads.lift);
        assert!(loads.drag.x < 0.0, "drag {:?}", loads.drag);
        assert!(loads.side.norm() < 1e-9);
        assert_relative_eq!(loads.dynamic_pressure, 0.5 * 1.225 * 400.0, epsilon = 1e-9);
    }

    #[test]
    fn lift_scales_with_dynamic_pressure() {
        let tables = CoefficientTables::innopolis_vtol();
        let r = reference();
        let v = Vector3::new(20.0, 0.0, 0.0);
        let loads = aero_loads(&tables, &r, &v, &Surfaces::default());
        let cl = polyval(&tables.lift.coefficients(20.0), 0.0);
        assert_relative_eq!(-loads.lift.z, cl * 0.5 * 1.225 * 400.0 * 0.6, epsilon = 1e-9);
    }

    #[test]
    fn elevator_produces_pitch_moment() {
        let tables = CoefficientTables::innopolis_vtol();
        let v = Vector3::new(20.0, 0.0, 0.0);
        let neutral = aero_loads(&tables, &reference(), &v, &Surfaces::default());
        let up = aero_loads(&tables, &reference(), &v, &Surfaces { elevator: 10.0, ..Default::default() });
        assert!(up.steering_moment.y.abs() > 0.0);
        assert_relative_eq!(
            up.moment.y - neutral.moment.y,
            up.steering_moment.y,
            epsilon = 1e-9
        );
        assert!(up.cmy_e < 0.0);
    }

    #[test]
    fn sideslip_produces_side_force() {
        let tables = CoefficientTables::innopolis_vtol();
        let v = Vector3::new(20.0, 5.0, 0.0);
        let loads = aero_loads(&tables, &reference(), &v, &Surfaces::default());
        assert!(loads.aos > 0.0);
        // Weathervane: side force opposes the sideslip.
        assert!(loads.force.y < 0.0, "side {:?}", loads.side);
    }

    #[test]
    fn extreme_attack_angle_is_clamped() {
        let tables = CoefficientTables::innopolis_vtol();
        let steep = aero_loads(&tables, &reference(), &Vector3::new(1.0, 0.0, 20.0), &Surfaces::default());
        let steeper = aero_loads(&tables, &reference(), &Vector3::new(0.5, 0.0, 20.0), &Surfaces::default());
        assert!(steep.force.iter().all(|f| f.is_finite()));
        assert!(steeper.force.iter().all(|f| f.is_finite()));
        assert!(steep.aoa.to_degrees() > AOA_LIMIT_DEG);
    }
}
