use nalgebra::Vector3;

// ---------------------------------------------------------------------------
// Frame conventions
// ---------------------------------------------------------------------------
//
// Internal: inertial NED, body FRD, attitude quaternion body -> NED.
// The geodetic and magnetic models work in ENU.

pub fn ned_to_enu(v: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(v.y, v.x, -v.z)
}

pub fn enu_to_ned(v: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(v.y, v.x, -v.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ned_enu_swap() {
        let ned = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(ned_to_enu(&ned), Vector3::new(2.0, 1.0, -3.0));
        assert_eq!(enu_to_ned(&ned_to_enu(&ned)), ned);
    }
}
