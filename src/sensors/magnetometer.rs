use nalgebra::{UnitQuaternion, Vector3};

use crate::frames;
use crate::sensors::geodetic::{ecef_to_enu_rotation, geodetic_to_ecef, Geodetic};

// ---------------------------------------------------------------------------
// Centred dipole geomagnetic field
// ---------------------------------------------------------------------------

const EARTH_MEAN_RADIUS: f64 = 6_371_200.0;  // m, geomagnetic reference radius
const DIPOLE_STRENGTH: f64 = 0.2994;         // gauss, equatorial field at the reference radius
const POLE_LATITUDE: f64 = 80.65;            // deg, geomagnetic north pole
const POLE_LONGITUDE: f64 = -72.68;          // deg

/// Unit vector (ECEF) toward the geomagnetic north pole.
fn pole_direction() -> Vector3<f64> {
    let lat = POLE_LATITUDE.to_radians();
    let lon = POLE_LONGITUDE.to_radians();
    Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
}

/// Geomagnetic field at `position`, ENU, gauss.
pub fn field_enu(position: &Geodetic) -> Vector3<f64> {
    let r = geodetic_to_ecef(position);
    let r_norm = r.norm();
    if r_norm < 1.0 {
        return Vector3::zeros();
    }
    let r_hat = r / r_norm;
    // Dipole moment points from the geomagnetic north pole toward the south.
    let m_hat = -pole_direction();
    let scale = DIPOLE_STRENGTH * (EARTH_MEAN_RADIUS / r_norm).powi(3);
    let b_ecef = (r_hat * (3.0 * m_hat.dot(&r_hat)) - m_hat) * scale;
    ecef_to_enu_rotation(position) * b_ecef
}

/// Field as sensed in body FRD axes for a vehicle with the given body->NED
/// attitude.
pub fn field_body(position: &Geodetic, attitude: &UnitQuaternion<f64>) -> Vector3<f64> {
    let ned = frames::enu_to_ned(&field_enu(position));
    attitude.inverse_transform_vector(&ned)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn kazan() -> Geodetic {
        Geodetic { latitude: 55.75, longitude: 48.74, altitude: 0.0 }
    }

    #[test]
    fn northern_hemisphere_points_north_and_down() {
        let ned = frames::enu_to_ned(&field_enu(&kazan()));
        assert!(ned.x > 0.0, "north {:?}", ned);
        assert!(ned.z > 0.0, "down {:?}", ned);
        let total = ned.norm();
        assert!(total > 0.4 && total < 0.65, "|B| = {}", total);
    }

    #[test]
    fn equator_is_mostly_horizontal() {
        let b = field_enu(&Geodetic { latitude: 0.0, longitude: -72.68, altitude: 0.0 });
        assert!(b.y > 0.0);
        assert!(b.z.abs() < b.y);
    }

    #[test]
    fn yawing_rotates_the_horizontal_component() {
        let pos = kazan();
        let level = field_body(&pos, &UnitQuaternion::identity());
        let east = field_body(&pos, &UnitQuaternion::from_euler_angles(0.0, 0.0, PI / 2.0));
        assert!((level.z - east.z).abs() < 1e-12);
        assert!((level.x.hypot(level.y) - east.x.hypot(east.y)).abs() < 1e-12);
        // Facing east, magnetic north is on the left.
        assert!(east.y < 0.0);
    }
}
