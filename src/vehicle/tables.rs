use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, TableError};
use crate::physics::interp::{band_fraction, find_row, first_non_monotonic, griddata, lerp};

// ---------------------------------------------------------------------------
// Polynomial table: one coefficient row per airspeed grid point
// ---------------------------------------------------------------------------

/// Rows of polynomial coefficients (highest degree first) keyed by airspeed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolynomialTable {
    pub airspeed: Vec<f64>,    // m/s, non-decreasing
    pub coeffs: Vec<Vec<f64>>, // one row per airspeed point
}

impl PolynomialTable {
    /// Polynomial for `airspeed`, blended between the two bracketing rows.
    /// Airspeeds outside the grid use the first/last row.
    pub fn coefficients(&self, airspeed: f64) -> Vec<f64> {
        match self.coeffs.len() {
            0 => Vec::new(),
            1 => self.coeffs[0].clone(),
            _ => {
                let row = find_row(&self.airspeed, airspeed);
                let f = band_fraction(&self.airspeed, row, airspeed);
                self.coeffs[row]
                    .iter()
                    .zip(&self.coeffs[row + 1])
                    .map(|(&a, &b)| lerp(a, b, f))
                    .collect()
            }
        }
    }

    fn validate(&self, name: &'static str) -> Result<(), TableError> {
        if self.airspeed.is_empty() {
            return Err(TableError::Empty(name));
        }
        if let Some(index) = first_non_monotonic(&self.airspeed) {
            return Err(TableError::NonMonotonic { table: name, index });
        }
        let width = self.coeffs.first().map_or(0, Vec::len);
        let ragged = self.coeffs.iter().any(|r| r.len() != width);
        if self.coeffs.len() != self.airspeed.len() || ragged || width == 0 {
            return Err(TableError::Shape {
                table: name,
                rows: self.coeffs.len(),
                cols: width,
                expected_rows: self.airspeed.len(),
                expected_cols: width.max(1),
            });
        }
        check_finite(name, self.airspeed.iter().chain(self.coeffs.iter().flatten()))
    }
}

// ---------------------------------------------------------------------------
// 2-D grid: value over (x, airspeed)
// ---------------------------------------------------------------------------

/// Regular grid over an independent variable `x` (deflection or sideslip,
/// degrees) and airspeed. `values[j][i]` is the value at `(x[i], airspeed[j])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid2d {
    pub x: Vec<f64>,
    pub airspeed: Vec<f64>,
    pub values: Vec<Vec<f64>>,
}

impl Grid2d {
    pub fn value(&self, x: f64, airspeed: f64) -> f64 {
        griddata(&self.x, &self.airspeed, &self.values, x, airspeed)
    }

    fn validate(&self, name: &'static str) -> Result<(), TableError> {
        if self.x.is_empty() || self.airspeed.is_empty() {
            return Err(TableError::Empty(name));
        }
        for axis in [&self.x, &self.airspeed] {
            if let Some(index) = first_non_monotonic(axis) {
                return Err(TableError::NonMonotonic { table: name, index });
            }
        }
        let ragged = self.values.iter().any(|r| r.len() != self.x.len());
        if self.values.len() != self.airspeed.len() || ragged {
            return Err(TableError::Shape {
                table: name,
                rows: self.values.len(),
                cols: self.values.first().map_or(0, Vec::len),
                expected_rows: self.airspeed.len(),
                expected_cols: self.x.len(),
            });
        }
        check_finite(
            name,
            self.x
                .iter()
                .chain(&self.airspeed)
                .chain(self.values.iter().flatten()),
        )
    }
}

fn check_finite<'a>(
    name: &'static str,
    mut values: impl Iterator<Item = &'a f64>,
) -> Result<(), TableError> {
    if values.all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(TableError::NonFinite(name))
    }
}

// ---------------------------------------------------------------------------
// Full coefficient set
// ---------------------------------------------------------------------------

/// Aerodynamic coefficient tables. Angles are in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientTables {
    pub lift: PolynomialTable,       // CL(AoA)
    pub side: PolynomialTable,       // CS(AoS)
    pub drag: PolynomialTable,       // CD(AoA)
    pub roll: PolynomialTable,       // Cmx(AoS)
    pub pitch: PolynomialTable,      // Cmy(AoA)
    pub yaw: PolynomialTable,        // Cmz(AoS)
    pub side_rudder: Grid2d,         // CS(rudder, V)
    pub side_beta: Grid2d,           // CS(AoS, V)
    pub roll_aileron: Grid2d,        // dCmx/d(aileron)(aileron, V)
    pub pitch_elevator: Grid2d,      // dCmy/d(elevator)(elevator, V)
    pub yaw_rudder: Grid2d,          // dCmz/d(rudder)(rudder, V)
}

impl CoefficientTables {
    pub fn validate(&self) -> Result<(), TableError> {
        self.lift.validate("lift")?;
        self.side.validate("side")?;
        self.drag.validate("drag")?;
        self.roll.validate("roll")?;
        self.pitch.validate("pitch")?;
        self.yaw.validate("yaw")?;
        self.side_rudder.validate("side_rudder")?;
        self.side_beta.validate("side_beta")?;
        self.roll_aileron.validate("roll_aileron")?;
        self.pitch_elevator.validate("pitch_elevator")?;
        self.yaw_rudder.validate("yaw_rudder")?;
        Ok(())
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let tables: CoefficientTables = serde_yaml::from_str(text)?;
        tables.validate().map_err(|e| ConfigError::Invalid {
            field: "aerodynamic_tables",
            reason: e.to_string(),
        })?;
        Ok(tables)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Built-in table set for the Innopolis VTOL airframe.
    ///
    /// Smooth synthetic coefficients shaped like wind-tunnel data for a
    /// small high-wing aircraft: linear lift slope with cubic roll-off,
    /// parabolic drag polar, statically stable pitch and yaw.
    pub fn innopolis_vtol() -> Self {
        let airspeed: Vec<f64> = (1..=8).map(|i| 5.0 * i as f64).collect();
        let deflection: Vec<f64> = (-4..=4).map(|i| 5.0 * i as f64).collect();
        let sideslip: Vec<f64> = (-9..=9).map(|i| 10.0 * i as f64).collect();

        // Mild Reynolds-number effect: coefficients grow slightly with speed.
        let re = |v: f64| 0.9 + 0.005 * v;

        let poly = |row: &dyn Fn(f64) -> Vec<f64>| PolynomialTable {
            airspeed: airspeed.clone(),
            coeffs: airspeed.iter().map(|&v| row(v)).collect(),
        };
        let grid = |x: &[f64], cell: &dyn Fn(f64, f64) -> f64| Grid2d {
            x: x.to_vec(),
            airspeed: airspeed.clone(),
            values: airspeed
                .iter()
                .map(|&v| x.iter().map(|&xi| cell(xi, v)).collect())
                .collect(),
        };

        CoefficientTables {
            lift: poly(&|v| vec![-2.0e-5 * re(v), 0.0, 0.085 * re(v), 0.25]),
            side: poly(&|v| vec![-1.0e-3 * re(v), 0.0]),
            drag: poly(&|v| vec![8.0e-4, 0.0, 0.05 / re(v)]),
            roll: poly(&|v| vec![-2.0e-3 * re(v), 0.0]),
            pitch: poly(&|v| vec![-1.0e-2 * re(v), 0.02]),
            yaw: poly(&|v| vec![3.0e-3 * re(v), 0.0]),
            side_rudder: grid(&deflection, &|d, v| 2.0e-3 * d * re(v)),
            side_beta: grid(&sideslip, &|b, v| -0.8 * b.to_radians().sin() * re(v)),
            roll_aileron: grid(&deflection, &|d, v| 3.0e-3 * re(v) * (1.0 - 0.002 * d.abs())),
            pitch_elevator: grid(&deflection, &|d, v| -1.0e-2 * re(v) * (1.0 - 0.002 * d.abs())),
            yaw_rudder: grid(&deflection, &|d, v| 2.0e-3 * re(v) * (1.0 - 0.002 * d.abs())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
