pub mod geodetic;
pub mod imu;
pub mod magnetometer;
pub mod noise;

use std::fmt;

use nalgebra::{UnitQuaternion, Vector3};

use crate::dynamics::{ForcesSnapshot, VehicleState};
use crate::physics::atmosphere::{self, AirData};
use crate::vehicle::PROPULSION_UNITS;

pub use geodetic::{Geodetic, GeodeticConverter};
pub use imu::ImuReading;
pub use noise::{NoiseConfig, NoiseModel};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Imu,
    Gps,
    Attitude,
    Velocity,
    MagneticField,
    RawAirData,
    StaticPressure,
    StaticTemperature,
    Esc,
    DebugForces,
}

impl SensorKind {
    pub const ALL: [SensorKind; 10] = [
        SensorKind::Imu,
        SensorKind::Gps,
        SensorKind::Attitude,
        SensorKind::Velocity,
        SensorKind::MagneticField,
        SensorKind::RawAirData,
        SensorKind::StaticPressure,
        SensorKind::StaticTemperature,
        SensorKind::Esc,
        SensorKind::DebugForces,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SensorKind::Imu => "imu",
            SensorKind::Gps => "gps",
            SensorKind::Attitude => "attitude",
            SensorKind::Velocity => "velocity",
            SensorKind::MagneticField => "mag",
            SensorKind::RawAirData => "raw_air_data",
            SensorKind::StaticPressure => "static_pressure",
            SensorKind::StaticTemperature => "static_temperature",
            SensorKind::Esc => "esc",
            SensorKind::DebugForces => "forces",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    /// Body FRD specific force and rates.
    Imu { accel: Vector3<f64>, gyro: Vector3<f64> },
    /// Degrees, metres MSL, NED velocity.
    Gps {
        latitude: f64,
        longitude: f64,
        altitude: f64,
        velocity: Vector3<f64>,
    },
    /// Body FRD -> NED.
    Attitude { attitude: UnitQuaternion<f64> },
    /// NED linear velocity and FRD body rates.
    Velocity { linear: Vector3<f64>, angular: Vector3<f64> },
    /// Gauss, body FRD.
    MagneticField { field: Vector3<f64> },
    /// hPa.
    RawAirData { static_pressure: f64, differential_pressure: f64 },
    StaticPressure { pressure: f64 },
    /// Kelvin.
    StaticTemperature { temperature: f64 },
    Esc { rpm: [f64; PROPULSION_UNITS] },
    DebugForces { forces: ForcesSnapshot },
}

impl Reading {
    pub fn kind(&self) -> SensorKind {
        match self {
            Reading::Imu { .. } => SensorKind::Imu,
            Reading::Gps { .. } => SensorKind::Gps,
            Reading::Attitude { .. } => SensorKind::Attitude,
            Reading::Velocity { .. } => SensorKind::Velocity,
            Reading::MagneticField { .. } => SensorKind::MagneticField,
            Reading::RawAirData { .. } => SensorKind::RawAirData,
            Reading::StaticPressure { .. } => SensorKind::StaticPressure,
            Reading::StaticTemperature { .. } => SensorKind::StaticTemperature,
            Reading::Esc { .. } => SensorKind::Esc,
            Reading::DebugForces { .. } => SensorKind::DebugForces,
        }
    }

    /// Flat numeric payload, in field order. Quaternions are `x, y, z, w`.
    pub fn values(&self) -> Vec<f64> {
        match self {
            Reading::Imu { accel, gyro } => accel.iter().chain(gyro.iter()).copied().collect(),
            Reading::Gps { latitude, longitude, altitude, velocity } => {
                let mut v = vec![*latitude, *longitude, *altitude];
                v.extend(velocity.iter());
                v
            }
            Reading::Attitude { attitude } => attitude.coords.iter().copied().collect(),
            Reading::Velocity { linear, angular } => linear.iter().chain(angular.iter()).copied().collect(),
            Reading::MagneticField { field } => field.iter().copied().collect(),
            Reading::RawAirData { static_pressure, differential_pressure } => {
                vec![*static_pressure, *differential_pressure]
            }
            Reading::StaticPressure { pressure } => vec![*pressure],
            Reading::StaticTemperature { temperature } => vec![*temperature],
            Reading::Esc { rpm } => rpm.to_vec(),
            Reading::DebugForces { forces } => forces.packed().to_vec(),
        }
    }
}

/// A reading stamped with the coordinator clock, seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorMessage {
    pub time: f64,
    pub reading: Reading,
}

impl SensorMessage {
    pub fn kind(&self) -> SensorKind {
        self.reading.kind()
    }
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

/// Pure functions of a state snapshot. Noise is applied downstream.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    geodetic: GeodeticConverter,
    gravity: Vector3<f64>,       // NED
    diff_pressure_gain: f64,
}

impl Synthesizer {
    pub fn new(geodetic: GeodeticConverter, gravity: f64, diff_pressure_gain: f64) -> Self {
        Self {
            geodetic,
            gravity: Vector3::new(0.0, 0.0, gravity),
            diff_pressure_gain,
        }
    }

    pub fn position(&self, state: &VehicleState) -> Geodetic {
        self.geodetic.ned_to_geodetic(&state.position)
    }

    pub fn imu(&self, state: &VehicleState) -> ImuReading {
        imu::imu(state, &self.gravity)
    }

    pub fn air_data(&self, state: &VehicleState) -> AirData {
        let altitude = self.position(state).altitude;
        atmosphere::air_data(altitude, state.velocity.norm(), self.diff_pressure_gain)
    }

    pub fn magnetic_field(&self, state: &VehicleState) -> Vector3<f64> {
        magnetometer::field_body(&self.position(state), &state.attitude)
    }

    /// One reading of the given kind.
    pub fn reading(&self, kind: SensorKind, state: &VehicleState, forces: &ForcesSnapshot) -> Reading {
        match kind {
            SensorKind::Imu => {
                let r = self.imu(state);
                Reading::Imu { accel: r.accel, gyro: r.gyro }
            }
            SensorKind::Gps => {
                let g = self.position(state);
                Reading::Gps {
                    latitude: g.latitude,
                    longitude: g.longitude,
                    altitude: g.altitude,
                    velocity: state.velocity,
                }
            }
            SensorKind::Attitude => Reading::Attitude { attitude: state.attitude },
            SensorKind::Velocity => Reading::Velocity {
                linear: state.velocity,
                angular: state.angular_velocity,
            },
            SensorKind::MagneticField => Reading::MagneticField { field: self.magnetic_field(state) },
            SensorKind::RawAirData => {
                let d = self.air_data(state);
                Reading::RawAirData {
                    static_pressure: d.static_pressure,
                    differential_pressure: d.differential_pressure,
                }
            }
            SensorKind::StaticPressure => Reading::StaticPressure {
                pressure: self.air_data(state).static_pressure,
            },
            SensorKind::StaticTemperature => Reading::StaticTemperature {
                temperature: self.air_data(state).temperature,
            },
            SensorKind::Esc => {
                let mut rpm = [0.0; PROPULSION_UNITS];
                for (slot, unit) in rpm.iter_mut().zip(state.units.iter()) {
                    *slot = unit.rpm;
                }
                Reading::Esc { rpm }
            }
            SensorKind::DebugForces => Reading::DebugForces { forces: *forces },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
