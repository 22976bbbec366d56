use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::error::ConfigError;

/// Steady mean wind plus a Gaussian gust drawn fresh every physics step.
#[derive(Debug, Clone)]
pub struct WindModel {
    mean: Vector3<f64>,           // m/s, NED
    gust: Option<Normal<f64>>,    // per axis; None when the variance is zero
    rng: StdRng,
}

impl WindModel {
    pub fn new(mean: Vector3<f64>, variance: f64, seed: Option<u64>) -> Result<Self, ConfigError> {
        if !(variance.is_finite() && variance >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "wind_variance",
                reason: format!("must be a non-negative number, got {}", variance),
            });
        }
        let gust = if variance > 0.0 {
            let normal = Normal::new(0.0, variance.sqrt()).map_err(|e| ConfigError::Invalid {
                field: "wind_variance",
                reason: e.to_string(),
            })?;
            Some(normal)
        } else {
            None
        };
        Ok(Self {
            mean,
            gust,
            rng: match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_entropy(),
            },
        })
    }

    /// No wind at all.
    pub fn calm() -> Self {
        Self {
            mean: Vector3::zeros(),
            gust: None,
            rng: StdRng::seed_from_u64(0),
        }
    }

    pub fn mean(&self) -> Vector3<f64> {
        self.mean
    }

    pub fn sample_gust(&mut self) -> Vector3<f64> {
        match &self.gust {
            Some(dist) => {
                let rng = &mut self.rng;
                Vector3::from_iterator((0..3).map(|_| dist.sample(rng)))
            }
            None => Vector3::zeros(),
        }
    }
}

impl Default for WindModel {
    fn default() -> Self {
        Self::calm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_variance_never_gusts() {
        let mut w = WindModel::new(Vector3::new(3.0, 0.0, 0.0), 0.0, Some(1)).unwrap();
        for _ in 0..100 {
            assert_eq!(w.sample_gust(), Vector3::zeros());
        }
        assert_eq!(w.mean(), Vector3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn gust_spread_follows_variance() {
        let mut w = WindModel::new(Vector3::zeros(), 4.0, Some(7)).unwrap();
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| w.sample_gust().x).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.1, "mean {}", mean);
        assert!((var - 4.0).abs() < 0.3, "variance {}", var);
    }

    #[test]
    fn same_seed_same_gusts() {
        let mut a = WindModel::new(Vector3::zeros(), 1.0, Some(3)).unwrap();
        let mut b = WindModel::new(Vector3::zeros(), 1.0, Some(3)).unwrap();
        assert_eq!(a.sample_gust(), b.sample_gust());
    }

    #[test]
    fn negative_variance_is_rejected() {
        assert!(matches!(
            WindModel::new(Vector3::zeros(), -1.0, None),
            Err(ConfigError::Invalid { field: "wind_variance", .. })
        ));
    }
}
