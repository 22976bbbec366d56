use std::fmt;
use std::path::Path;
use std::str::FromStr;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ParamsError};
use crate::physics::propulsion::ThrustCurve;

/// Actuator channels carried by every command message.
pub const CHANNELS: usize = 8;
/// Fixed arity of all per-propulsion-unit arrays.
pub const PROPULSION_UNITS: usize = 5;

// ---------------------------------------------------------------------------
// Airframe selector
// ---------------------------------------------------------------------------

/// Physical airframe. Decides channel layout and the parameter preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Airframe {
    /// Quadcopter: channels 0-3 are motors, 4-7 unused.
    Iris,
    /// Quadplane: 0-3 lift motors, 4 aileron, 5 elevator, 6 rudder, 7 pusher.
    InnopolisVtol,
}

impl FromStr for Airframe {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iris" => Ok(Airframe::Iris),
            "innopolis_vtol" => Ok(Airframe::InnopolisVtol),
            other => Err(ConfigError::UnknownAirframe(other.to_string())),
        }
    }
}

impl fmt::Display for Airframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Airframe::Iris => "iris",
            Airframe::InnopolisVtol => "innopolis_vtol",
        })
    }
}

// ---------------------------------------------------------------------------
// Channel and rotor descriptions
// ---------------------------------------------------------------------------

/// One actuator channel. Motors are in rad/s, control surfaces in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub min: f64,
    pub max: f64,
    pub rate_limit: f64,    // units/s, deltaControlMax
    pub time_constant: f64, // s, first-order lag (0 = none)
    /// Normalized command mapping: physical = (cmd + offset) * scale.
    pub scale: f64,
    pub offset: f64,
}

impl ChannelSpec {
    pub const UNUSED: ChannelSpec = ChannelSpec {
        min: 0.0,
        max: 0.0,
        rate_limit: 0.0,
        time_constant: 0.0,
        scale: 0.0,
        offset: 0.0,
    };

    /// Value the channel settles at with no command (zero, clamped).
    pub fn rest(&self) -> f64 {
        0.0_f64.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Propeller {
    pub channel: usize,
    pub position: Vector3<f64>, // m, body FRD, from CG
    pub axis: Vector3<f64>,     // thrust direction, body FRD
    pub spin: f64,              // +1 CCW / -1 CW looking against the axis
    pub curve: ThrustCurve,
}

// ---------------------------------------------------------------------------
// Vehicle parameters
// ---------------------------------------------------------------------------

/// Immutable physical description of the airframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleParameters {
    pub name: String,
    pub airframe: Airframe,
    pub mass: f64,                  // kg
    pub gravity: f64,               // m/s^2
    pub air_density: f64,           // kg/m^3
    pub wing_area: f64,             // m^2
    pub characteristic_length: f64, // m
    pub inertia: Matrix3<f64>,      // kg*m^2, body FRD
    pub propellers: Vec<Propeller>,
    pub channels: [ChannelSpec; CHANNELS],
    pub accel_variance: f64,
    pub gyro_variance: f64,
    #[serde(default)]
    pub accel_bias: Vector3<f64>,   // m/s^2, body FRD
    #[serde(default)]
    pub gyro_bias: Vector3<f64>,    // rad/s, body FRD
    pub linear_drag: f64,           // N/(m/s)^2, multicopter body drag
    pub angular_drag: f64,          // N*m/(rad/s), multicopter rate damping
    pub mass_uncertainty: f64,      // multiplier
    pub inertia_uncertainty: f64,   // multiplier
}

impl VehicleParameters {
    /// Mass including the robustness-test multiplier.
    pub fn effective_mass(&self) -> f64 {
        self.mass * self.mass_uncertainty
    }

    pub fn effective_inertia(&self) -> Matrix3<f64> {
        self.inertia * self.inertia_uncertainty
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.mass > 0.0 && self.mass.is_finite()) || self.mass_uncertainty <= 0.0 {
            return Err(ParamsError::Mass(self.effective_mass()));
        }
        let symmetric = (self.inertia - self.inertia.transpose()).norm() < 1e-9;
        let positive = self.inertia.cholesky().is_some();
        if !symmetric || !positive || self.inertia_uncertainty <= 0.0 {
            return Err(ParamsError::Inertia);
        }
        for (channel, c) in self.channels.iter().enumerate() {
            if c.min > c.max {
                return Err(ParamsError::Bounds { channel, min: c.min, max: c.max });
            }
            for (what, value) in [("rate_limit", c.rate_limit), ("time_constant", c.time_constant)] {
                if value < 0.0 || !value.is_finite() {
                    return Err(ParamsError::Negative { channel, what, value });
                }
            }
        }
        for (what, v) in [("accel_bias", self.accel_bias), ("gyro_bias", self.gyro_bias)] {
            if v.iter().any(|x| !x.is_finite()) {
                return Err(ParamsError::NonFinite(what));
            }
        }
        if self.propellers.len() > PROPULSION_UNITS {
            return Err(ParamsError::Propeller {
                unit: self.propellers.len() - 1,
                reason: "at most 5 propulsion units are supported",
            });
        }
        for (unit, p) in self.propellers.iter().enumerate() {
            if p.channel >= CHANNELS {
                return Err(ParamsError::Propeller { unit, reason: "channel out of range" });
            }
            if !p.curve.is_well_formed() {
                return Err(ParamsError::Propeller { unit, reason: "malformed thrust curve" });
            }
        }
        Ok(())
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let params: VehicleParameters = serde_yaml::from_str(text)?;
        params.validate().map_err(|e| ConfigError::Invalid {
            field: "vehicle_params",
            reason: e.to_string(),
        })?;
        Ok(params)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct VehicleBuilder {
    params: VehicleParameters,
}

impl VehicleBuilder {
    pub fn new(name: impl Into<String>, airframe: Airframe) -> Self {
        Self {
            params: VehicleParameters {
                name: name.into(),
                airframe,
                mass: 1.0,
                gravity: 9.8,
                air_density: 1.225,
                wing_area: 0.0,
                characteristic_length: 0.0,
                inertia: Matrix3::identity() * 0.01,
                propellers: vec![],
                channels: [ChannelSpec::UNUSED; CHANNELS],
                accel_variance: 0.0,
                gyro_variance: 0.0,
                accel_bias: Vector3::zeros(),
                gyro_bias: Vector3::zeros(),
                linear_drag: 0.0,
                angular_drag: 0.0,
                mass_uncertainty: 1.0,
                inertia_uncertainty: 1.0,
            },
        }
    }

    pub fn mass(mut self, v: f64) -> Self { self.params.mass = v; self }
    pub fn gravity(mut self, v: f64) -> Self { self.params.gravity = v; self }
    pub fn air_density(mut self, v: f64) -> Self { self.params.air_density = v; self }
    pub fn wing_area(mut self, v: f64) -> Self { self.params.wing_area = v; self }
    pub fn characteristic_length(mut self, v: f64) -> Self { self.params.characteristic_length = v; self }
    pub fn inertia(mut self, v: Matrix3<f64>) -> Self { self.params.inertia = v; self }
    pub fn propeller(mut self, p: Propeller) -> Self { self.params.propellers.push(p); self }
    pub fn channel(mut self, idx: usize, spec: ChannelSpec) -> Self { self.params.channels[idx] = spec; self }
    pub fn imu_variance(mut self, accel: f64, gyro: f64) -> Self {
        self.params.accel_variance = accel;
        self.params.gyro_variance = gyro;
        self
    }
    pub fn imu_bias(mut self, accel: Vector3<f64>, gyro: Vector3<f64>) -> Self {
        self.params.accel_bias = accel;
        self.params.gyro_bias = gyro;
        self
    }
    pub fn drag(mut self, linear: f64, angular: f64) -> Self {
        self.params.linear_drag = linear;
        self.params.angular_drag = angular;
        self
    }
    pub fn uncertainty(mut self, mass: f64, inertia: f64) -> Self {
        self.params.mass_uncertainty = mass;
        self.params.inertia_uncertainty = inertia;
        self
    }

    pub fn build(self) -> Result<VehicleParameters, ParamsError> {
        self.params.validate()?;
        Ok(self.params)
    }

    /// Skip validation. Used by the presets, which are covered by tests.
    pub(crate) fn finish(self) -> VehicleParameters {
        self.params
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
