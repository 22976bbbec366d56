use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::error::ConfigError;
use crate::sensors::{Reading, SensorMessage};

/// Standard deviations of the additive Gaussian noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseConfig {
    pub accel_std: f64,       // m/s^2
    pub gyro_std: f64,        // rad/s
    pub mag_std: f64,         // gauss
    pub pressure_std: f64,    // hPa
    pub temperature_std: f64, // K
}

impl NoiseConfig {
    /// IMU noise from the airframe variances, fixed air-data and mag noise.
    pub fn from_variances(accel_variance: f64, gyro_variance: f64) -> Self {
        Self {
            accel_std: accel_variance.max(0.0).sqrt(),
            gyro_std: gyro_variance.max(0.0).sqrt(),
            mag_std: 0.001,
            pressure_std: 0.001,
            temperature_std: 0.1,
        }
    }
}

/// Applies noise to outgoing sensor messages. Synthesis itself is noiseless.
pub struct NoiseModel {
    accel: Normal<f64>,
    gyro: Normal<f64>,
    mag: Normal<f64>,
    pressure: Normal<f64>,
    temperature: Normal<f64>,
    rng: StdRng,
}

impl NoiseModel {
    pub fn new(config: NoiseConfig, seed: Option<u64>) -> Result<Self, ConfigError> {
        let normal = |field: &'static str, std: f64| {
            Normal::new(0.0, std).map_err(|e| ConfigError::Invalid { field, reason: e.to_string() })
        };
        Ok(Self {
            accel: normal("accel_variance", config.accel_std)?,
            gyro: normal("gyro_variance", config.gyro_std)?,
            mag: normal("mag_noise", config.mag_std)?,
            pressure: normal("pressure_noise", config.pressure_std)?,
            temperature: normal("temperature_noise", config.temperature_std)?,
            rng: match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_entropy(),
            },
        })
    }

    fn vector(dist: &Normal<f64>, rng: &mut StdRng) -> Vector3<f64> {
        Vector3::from_iterator((0..3).map(|_| dist.sample(rng)))
    }

    pub fn apply(&mut self, mut msg: SensorMessage) -> SensorMessage {
        let rng = &mut self.rng;
        match &mut msg.reading {
            Reading::Imu { accel, gyro } => {
                *accel += Self::vector(&self.accel, rng);
                *gyro += Self::vector(&self.gyro, rng);
            }
            Reading::MagneticField { field } => {
                *field += Self::vector(&self.mag, rng);
            }
            Reading::RawAirData { static_pressure, differential_pressure } => {
                *static_pressure += self.pressure.sample(rng);
                *differential_pressure += self.pressure.sample(rng);
            }
            Reading::StaticPressure { pressure } => {
                *pressure += self.pressure.sample(rng);
            }
            Reading::StaticTemperature { temperature } => {
                *temperature += self.temperature.sample(rng);
            }
            _ => {}
        }
        msg
    }
}
