use nalgebra::{Matrix3, Vector3};

use crate::frames;

// ---------------------------------------------------------------------------
// WGS-84
// ---------------------------------------------------------------------------

pub const WGS84_A: f64 = 6_378_137.0;                 // semi-major axis, m
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;       // flattening
const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);
const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);      // first eccentricity^2
const WGS84_EP2: f64 = WGS84_E2 / (1.0 - WGS84_E2);   // second eccentricity^2

/// Latitude, longitude in degrees; altitude in metres above the ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

pub fn geodetic_to_ecef(g: &Geodetic) -> Vector3<f64> {
    let lat = g.latitude.to_radians();
    let lon = g.longitude.to_radians();
    let n = WGS84_A / (1.0 - WGS84_E2 * lat.sin().powi(2)).sqrt();
    Vector3::new(
        (n + g.altitude) * lat.cos() * lon.cos(),
        (n + g.altitude) * lat.cos() * lon.sin(),
        (n * (1.0 - WGS84_E2) + g.altitude) * lat.sin(),
    )
}

/// Bowring's closed-form inversion, sub-millimetre near the surface.
pub fn ecef_to_geodetic(ecef: &Vector3<f64>) -> Geodetic {
    let (x, y, z) = (ecef.x, ecef.y, ecef.z);
    let p = (x * x + y * y).sqrt();
    let lon = y.atan2(x);
    let theta = (z * WGS84_A).atan2(p * WGS84_B);
    let lat = (z + WGS84_EP2 * WGS84_B * theta.sin().powi(3))
        .atan2(p - WGS84_E2 * WGS84_A * theta.cos().powi(3));
    let (slat, clat) = lat.sin_cos();
    let alt = p * clat + z * slat - WGS84_A * (1.0 - WGS84_E2 * slat * slat).sqrt();
    Geodetic {
        latitude: lat.to_degrees(),
        longitude: lon.to_degrees(),
        altitude: alt,
    }
}

/// Rotation taking ECEF vectors into the local ENU frame at `g`.
pub fn ecef_to_enu_rotation(g: &Geodetic) -> Matrix3<f64> {
    let (slat, clat) = g.latitude.to_radians().sin_cos();
    let (slon, clon) = g.longitude.to_radians().sin_cos();
    Matrix3::new(
        -slon, clon, 0.0,
        -slat * clon, -slat * slon, clat,
        clat * clon, clat * slon, slat,
    )
}

// ---------------------------------------------------------------------------
// Local tangent plane converter
// ---------------------------------------------------------------------------

/// Converts between a local ENU/NED frame anchored at a reference point and
/// geodetic coordinates.
#[derive(Debug, Clone)]
pub struct GeodeticConverter {
    reference: Geodetic,
    ecef_ref: Vector3<f64>,
    ecef_to_enu: Matrix3<f64>,
}

impl GeodeticConverter {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        let reference = Geodetic { latitude, longitude, altitude };
        Self {
            reference,
            ecef_ref: geodetic_to_ecef(&reference),
            ecef_to_enu: ecef_to_enu_rotation(&reference),
        }
    }

    pub fn reference(&self) -> Geodetic {
        self.reference
    }

    pub fn enu_to_geodetic(&self, enu: &Vector3<f64>) -> Geodetic {
        let ecef = self.ecef_ref + self.ecef_to_enu.transpose() * enu;
        ecef_to_geodetic(&ecef)
    }

    pub fn ned_to_geodetic(&self, ned: &Vector3<f64>) -> Geodetic {
        self.enu_to_geodetic(&frames::ned_to_enu(ned))
    }

    pub fn geodetic_to_enu(&self, g: &Geodetic) -> Vector3<f64> {
        self.ecef_to_enu * (geodetic_to_ecef(g) - self.ecef_ref)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reference_point_maps_to_origin() {
        let c = GeodeticConverter::new(55.7531, 48.7426, -6.4);
        let g = c.ned_to_geodetic(&Vector3::zeros());
        assert_relative_eq!(g.latitude, 55.7531, epsilon = 1e-9);
        assert_relative_eq!(g.longitude, 48.7426, epsilon = 1e-9);
        assert_relative_eq!(g.altitude, -6.4, epsilon = 1e-4);
    }

    #[test]
    fn ecef_round_trip() {
        for &(lat, lon, alt) in &[(0.0, 0.0, 0.0), (45.0, -120.0, 1500.0), (-33.9, 151.2, 50.0), (89.0, 10.0, 0.0)] {
            let g = Geodetic { latitude: lat, longitude: lon, altitude: alt };
            let back = ecef_to_geodetic(&geodetic_to_ecef(&g));
            assert_relative_eq!(back.latitude, lat, epsilon = 1e-7);
            assert_relative_eq!(back.longitude, lon, epsilon = 1e-8);
            assert_relative_eq!(back.altitude, alt, epsilon = 1e-2);
        }
    }

    #[test]
    fn moving_north_increases_latitude() {
        let c = GeodeticConverter::new(55.0, 48.0, 0.0);
        let g = c.ned_to_geodetic(&Vector3::new(1000.0, 0.0, -100.0));
        // ~1 km is ~0.009 deg of latitude.
        assert!((g.latitude - 55.0 - 0.009).abs() < 0.001, "lat {}", g.latitude);
        assert_relative_eq!(g.longitude, 48.0, epsilon = 1e-6);
        assert!((g.altitude - 100.0).abs() < 0.2, "alt {}", g.altitude);
    }

    #[test]
    fn local_round_trip() {
        let c = GeodeticConverter::new(10.0, 20.0, 30.0);
        let enu = Vector3::new(120.0, -340.0, 15.0);
        let back = c.geodetic_to_enu(&c.enu_to_geodetic(&enu));
        assert_relative_eq!(back, enu, epsilon = 1e-3);
    }
}
