use std::path::{Path, PathBuf};

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::Deserialize;

use crate::dynamics::DynamicsKind;
use crate::error::ConfigError;
use crate::sim::{ClockMode, SensorPeriods};
use crate::vehicle::Airframe;

// ---------------------------------------------------------------------------
// File layout
// ---------------------------------------------------------------------------

/// Settings as written in the YAML file. Required fields stay optional here
/// so a missing one can be reported by name.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    clock: Option<ClockMode>,
    use_sim_time: Option<bool>,
    lat_ref: Option<f64>,
    lon_ref: Option<f64>,
    alt_ref: Option<f64>,
    vehicle: Option<String>,
    dynamics: Option<String>,
    init_pose: Option<Vec<f64>>,
    real_time_factor: Option<f64>,
    physics_rate_hz: Option<f64>,
    publish_rate_hz: Option<f64>,
    diagnostics_period_s: Option<f64>,
    #[serde(default)]
    periods: SensorPeriods,
    #[serde(default)]
    noise: NoiseSettings,
    #[serde(default)]
    lockstep: bool,
    wind: Option<[f64; 3]>,
    wind_variance: Option<f64>,
    diff_pressure_gain: Option<f64>,
    vehicle_file: Option<PathBuf>,
    tables_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoiseSettings {
    pub enabled: bool,
    pub seed: Option<u64>,
}

// ---------------------------------------------------------------------------
// Validated settings
// ---------------------------------------------------------------------------

/// Initial position (NED, m) and attitude (body FRD -> NED).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialPose {
    pub position: Vector3<f64>,
    pub attitude: UnitQuaternion<f64>,
}

impl InitialPose {
    /// `[x, y, z, qx, qy, qz, qw]`.
    pub fn from_slice(v: &[f64]) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid { field: "init_pose", reason };
        if v.len() != 7 {
            return Err(invalid(format!("expected 7 values, got {}", v.len())));
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(invalid("values must be finite".to_string()));
        }
        let q = Quaternion::new(v[6], v[3], v[4], v[5]);
        if q.norm() < 1e-9 {
            return Err(invalid("quaternion has zero norm".to_string()));
        }
        Ok(Self {
            position: Vector3::new(v[0], v[1], v[2]),
            attitude: UnitQuaternion::from_quaternion(q),
        })
    }
}

/// Everything the runtime needs, checked once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct SimSettings {
    pub clock: ClockMode,
    pub lat_ref: f64, // deg
    pub lon_ref: f64, // deg
    pub alt_ref: f64, // m MSL
    pub airframe: Airframe,
    pub dynamics: DynamicsKind,
    pub init_pose: InitialPose,
    pub real_time_factor: f64,
    pub physics_rate_hz: f64,
    pub publish_rate_hz: f64,
    pub diagnostics_period_s: f64,
    pub periods: SensorPeriods,
    pub noise: NoiseSettings,
    pub lockstep: bool,
    pub wind: Vector3<f64>, // NED, m/s
    pub wind_variance: f64, // (m/s)^2 per axis, gust
    pub diff_pressure_gain: f64,
    pub vehicle_file: Option<PathBuf>,
    pub tables_file: Option<PathBuf>,
}

impl SimSettings {
    pub const DEFAULT_PHYSICS_RATE_HZ: f64 = 250.0;
    pub const DEFAULT_PUBLISH_RATE_HZ: f64 = 500.0;
    pub const DEFAULT_DIAGNOSTICS_PERIOD_S: f64 = 1.0;

    /// Defaults for everything optional, with the required fields given.
    pub fn new(airframe: Airframe, dynamics: DynamicsKind, reference: [f64; 3], init_pose: InitialPose) -> Self {
        Self {
            clock: ClockMode::default(),
            lat_ref: reference[0],
            lon_ref: reference[1],
            alt_ref: reference[2],
            airframe,
            dynamics,
            init_pose,
            real_time_factor: 1.0,
            physics_rate_hz: Self::DEFAULT_PHYSICS_RATE_HZ,
            publish_rate_hz: Self::DEFAULT_PUBLISH_RATE_HZ,
            diagnostics_period_s: Self::DEFAULT_DIAGNOSTICS_PERIOD_S,
            periods: SensorPeriods::default(),
            noise: NoiseSettings::default(),
            lockstep: false,
            wind: Vector3::zeros(),
            wind_variance: 0.0,
            diff_pressure_gain: crate::physics::atmosphere::DIFF_PRESSURE_GAIN,
            vehicle_file: None,
            tables_file: None,
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let raw: RawSettings = serde_yaml::from_str(text)?;
        Self::from_raw(raw)
    }

    /// Relative `vehicle_file`/`tables_file` paths resolve against the
    /// directory holding the settings file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut settings = Self::from_yaml(&text)?;
        if let Some(dir) = path.parent() {
            for file in [&mut settings.vehicle_file, &mut settings.tables_file].into_iter().flatten() {
                if file.is_relative() {
                    *file = dir.join(&*file);
                }
            }
        }
        Ok(settings)
    }

    fn from_raw(raw: RawSettings) -> Result<Self, ConfigError> {
        let lat_ref = raw.lat_ref.ok_or(ConfigError::Missing("lat_ref"))?;
        let lon_ref = raw.lon_ref.ok_or(ConfigError::Missing("lon_ref"))?;
        let alt_ref = raw.alt_ref.ok_or(ConfigError::Missing("alt_ref"))?;
        let airframe: Airframe = raw.vehicle.ok_or(ConfigError::Missing("vehicle"))?.parse()?;
        let dynamics: DynamicsKind = raw.dynamics.ok_or(ConfigError::Missing("dynamics"))?.parse()?;
        let pose = raw.init_pose.ok_or(ConfigError::Missing("init_pose"))?;
        let init_pose = InitialPose::from_slice(&pose)?;

        let mut s = Self::new(airframe, dynamics, [lat_ref, lon_ref, alt_ref], init_pose);
        s.clock = match (raw.clock, raw.use_sim_time) {
            (Some(mode), _) => mode,
            (None, Some(true)) => ClockMode::Simulated,
            (None, Some(false)) => ClockMode::Wall,
            (None, None) => ClockMode::default(),
        };
        if let Some(v) = raw.real_time_factor {
            s.real_time_factor = v;
        }
        if let Some(v) = raw.physics_rate_hz {
            s.physics_rate_hz = v;
        }
        if let Some(v) = raw.publish_rate_hz {
            s.publish_rate_hz = v;
        }
        if let Some(v) = raw.diagnostics_period_s {
            s.diagnostics_period_s = v;
        }
        if let Some(w) = raw.wind {
            s.wind = Vector3::from(w);
        }
        if let Some(v) = raw.wind_variance {
            s.wind_variance = v;
        }
        if let Some(k) = raw.diff_pressure_gain {
            s.diff_pressure_gain = k;
        }
        s.periods = raw.periods;
        s.noise = raw.noise;
        s.lockstep = raw.lockstep;
        s.vehicle_file = raw.vehicle_file;
        s.tables_file = raw.tables_file;
        s.validate()?;
        Ok(s)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |field: &'static str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid { field, reason: format!("must be positive, got {}", v) })
            }
        };
        positive("real_time_factor", self.real_time_factor)?;
        positive("physics_rate_hz", self.physics_rate_hz)?;
        positive("publish_rate_hz", self.publish_rate_hz)?;
        positive("diagnostics_period_s", self.diagnostics_period_s)?;

        if !(-90.0..=90.0).contains(&self.lat_ref) {
            return Err(ConfigError::Invalid {
                field: "lat_ref",
                reason: format!("{} is outside [-90, 90]", self.lat_ref),
            });
        }
        if !(-180.0..=180.0).contains(&self.lon_ref) {
            return Err(ConfigError::Invalid {
                field: "lon_ref",
                reason: format!("{} is outside [-180, 180]", self.lon_ref),
            });
        }
        if !self.alt_ref.is_finite() {
            return Err(ConfigError::Invalid { field: "alt_ref", reason: "must be finite".to_string() });
        }
        if let Some(kind) = self.periods.invalid() {
            return Err(ConfigError::Invalid {
                field: "periods",
                reason: format!("{} period must be a non-negative number", kind),
            });
        }
        if self.wind.iter().any(|w| !w.is_finite()) {
            return Err(ConfigError::Invalid { field: "wind", reason: "must be finite".to_string() });
        }
        if !(self.wind_variance.is_finite() && self.wind_variance >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "wind_variance",
                reason: "must be a non-negative number".to_string(),
            });
        }
        if !(self.diff_pressure_gain.is_finite() && self.diff_pressure_gain >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "diff_pressure_gain",
                reason: "must be a non-negative number".to_string(),
            });
        }
        Ok(())
    }

    /// Nominal physics step, seconds of simulated time.
    pub fn physics_period(&self) -> f64 {
        1.0 / self.physics_rate_hz
    }

    pub fn publish_period(&self) -> f64 {
        1.0 / self.publish_rate_hz
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
