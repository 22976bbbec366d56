// ---------------------------------------------------------------------------
// ISA troposphere for air-data synthesis
// ---------------------------------------------------------------------------

pub const T0: f64 = 288.15;            // sea-level temperature, K
pub const P0_HPA: f64 = 1013.25;       // sea-level pressure, hPa
pub const RHO0: f64 = 1.225;           // sea-level density, kg/m^3
pub const LAPSE_RATE: f64 = 0.0065;    // K/m

const PRESSURE_EXPONENT: f64 = 5.256;
const DENSITY_EXPONENT: f64 = 4.256;

/// Default Pa to hPa scaling applied to dynamic pressure.
pub const DIFF_PRESSURE_GAIN: f64 = 0.01;

/// Atmospheric properties at a given altitude above mean sea level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atmo {
    pub temperature: f64,    // K
    pub pressure: f64,       // hPa
    pub density: f64,        // kg/m^3
    /// P0 / P
    pub pressure_ratio: f64,
    /// rho0 / rho
    pub density_ratio: f64,
}

impl Atmo {
    /// rho / rho0, the factor applied to propeller thrust.
    pub fn relative_density(&self) -> f64 {
        1.0 / self.density_ratio
    }
}

/// Static air data reported by the air-data computer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirData {
    pub static_pressure: f64,       // hPa
    pub differential_pressure: f64, // hPa
    pub temperature: f64,           // K
}

/// Troposphere model with a linear lapse rate.
///
/// Altitudes are clamped to the band where temperature stays positive, so
/// the ratios are always finite.
pub fn isa(altitude_m: f64) -> Atmo {
    let max_alt = (T0 - 1.0) / LAPSE_RATE;
    let h = if altitude_m.is_finite() { altitude_m.min(max_alt) } else { 0.0 };

    let temperature = T0 - LAPSE_RATE * h;
    let pressure_ratio = (T0 / temperature).powf(PRESSURE_EXPONENT);
    let density_ratio = (T0 / temperature).powf(DENSITY_EXPONENT);

    Atmo {
        temperature,
        pressure: P0_HPA / pressure_ratio,
        density: RHO0 / density_ratio,
        pressure_ratio,
        density_ratio,
    }
}

/// Static pressure, differential pressure and temperature for a vehicle at
/// `altitude_m` moving at `speed` m/s. `gain` converts the dynamic pressure
/// to the reported unit.
pub fn air_data(altitude_m: f64, speed: f64, gain: f64) -> AirData {
    let atm = isa(altitude_m);
    AirData {
        static_pressure: atm.pressure,
        differential_pressure: 0.5 * gain * atm.density * speed * speed,
        temperature: atm.temperature,
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
    fn sea_level_standard_values() {
        let a = isa(0.0);
        assert_relative_eq!(a.temperature, 288.15);
        assert_relative_eq!(a.pressure, 1013.25);
        assert_relative_eq!(a.density, 1.225);
        assert_relative_eq!(a.relative_density(), 1.0);
    }

    #[test]
    fn zero_differential_pressure_at_rest() {
        let d = air_data(0.0, 0.0, DIFF_PRESSURE_GAIN);
        assert_relative_eq!(d.static_pressure, 1013.25);
        assert_eq!(d.differential_pressure, 0.0);
    }

    #[test]
    fn differential_pressure_matches_dynamic_pressure() {
        let d = air_data(0.0, 20.0, DIFF_PRESSURE_GAIN);
        // 0.5 * 1.225 * 400 Pa = 245 Pa = 2.45 hPa
        assert_relative_eq!(d.differential_pressure, 2.45, epsilon = 1e-9);
    }

    #[test]
    fn one_kilometre() {
        let a = isa(1000.0);
        assert_relative_eq!(a.temperature, 281.65, epsilon = 1e-9);
        assert!((a.pressure - 898.7).abs() < 1.0, "p = {}", a.pressure);
        assert!((a.density - 1.112).abs() < 0.005, "rho = {}", a.density);
    }

    #[test]
    fn pressure_and_density_decrease_with_altitude() {
        let mut prev = isa(-100.0);
        for h in (0..5000).step_by(250) {
            let a = isa(h as f64);
            assert!(a.pressure < prev.pressure);
            assert!(a.density < prev.density);
            prev = a;
        }
    }

    #[test]
    fn non_finite_altitude_falls_back_to_sea_level() {
        assert_relative_eq!(isa(f64::NAN).pressure, 1013.25);
        assert!(isa(1e9).pressure.is_finite());
    }
}
