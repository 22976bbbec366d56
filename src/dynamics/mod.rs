pub mod calibration;
pub mod multicopter;
pub mod rigid_body;
pub mod state;
pub mod vtol;
pub mod wind;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ParamsError};
use crate::physics::actuators::CommandVector;
use crate::vehicle::{CoefficientTables, VehicleParameters};

pub use calibration::{CalibrationMode, Orientation};
pub use multicopter::Multicopter;
pub use rigid_body::{LandProfile, RigidBody};
pub use state::{ForcesSnapshot, VehicleState};
pub use vtol::InnoVtol;
pub use wind::WindModel;

// ---------------------------------------------------------------------------
// Variant selector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DynamicsKind {
    #[serde(rename = "flightgoggles_multicopter")]
    Multicopter,
    #[serde(rename = "inno_vtol")]
    InnoVtol,
}

impl FromStr for DynamicsKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flightgoggles_multicopter" => Ok(DynamicsKind::Multicopter),
            "inno_vtol" => Ok(DynamicsKind::InnoVtol),
            other => Err(ConfigError::UnknownDynamics(other.to_string())),
        }
    }
}

impl fmt::Display for DynamicsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DynamicsKind::Multicopter => "flightgoggles_multicopter",
            DynamicsKind::InnoVtol => "inno_vtol",
        })
    }
}

// ---------------------------------------------------------------------------
// Dynamics model
// ---------------------------------------------------------------------------

/// Closed set of vehicle models, chosen once at startup.
#[derive(Debug, Clone)]
pub enum DynamicsModel {
    Multicopter(Multicopter),
    InnoVtol(InnoVtol),
}

impl DynamicsModel {
    /// Build the selected variant. `tables` is only used by the VTOL model.
    pub fn new(
        kind: DynamicsKind,
        params: Arc<VehicleParameters>,
        tables: Arc<CoefficientTables>,
        reference_altitude: f64,
    ) -> Result<Self, ParamsError> {
        params.validate()?;
        Ok(match kind {
            DynamicsKind::Multicopter => DynamicsModel::Multicopter(Multicopter::new(params)?),
            DynamicsKind::InnoVtol => {
                DynamicsModel::InnoVtol(InnoVtol::new(params, tables, reference_altitude)?)
            }
        })
    }

    pub fn kind(&self) -> DynamicsKind {
        match self {
            DynamicsModel::Multicopter(_) => DynamicsKind::Multicopter,
            DynamicsModel::InnoVtol(_) => DynamicsKind::InnoVtol,
        }
    }

    fn body(&self) -> &RigidBody {
        match self {
            DynamicsModel::Multicopter(m) => &m.body,
            DynamicsModel::InnoVtol(v) => &v.body,
        }
    }

    fn body_mut(&mut self) -> &mut RigidBody {
        match self {
            DynamicsModel::Multicopter(m) => &mut m.body,
            DynamicsModel::InnoVtol(v) => &mut v.body,
        }
    }

    /// Armed flight: actuators, forces, one integration step.
    pub fn process(&mut self, dt: f64, cmd: &CommandVector) {
        match self {
            DynamicsModel::Multicopter(m) => m.process(dt, cmd),
            DynamicsModel::InnoVtol(v) => v.process(dt, cmd),
        }
        self.body_mut().state.armed = true;
    }

    /// Disarmed: controlled descent to the ground.
    pub fn land(&mut self, dt: f64) {
        let body = self.body_mut();
        body.land(dt);
        body.state.armed = false;
    }

    pub fn calibrate(&mut self, mode: CalibrationMode, dt: f64) {
        self.body_mut().calibrate(mode, dt);
    }

    pub fn state(&self) -> &VehicleState {
        &self.body().state
    }

    pub fn params(&self) -> &VehicleParameters {
        &self.body().params
    }

    pub fn land_profile(&self) -> LandProfile {
        self.body().land
    }

    pub fn set_initial_pose(&mut self, position: Vector3<f64>, attitude: UnitQuaternion<f64>) {
        self.body_mut().set_initial_pose(position, attitude);
    }

    /// Mean wind and gust model used by the armed steps.
    pub fn set_wind(&mut self, wind: WindModel) {
        self.body_mut().set_wind(wind);
    }

    pub fn forces(&self) -> ForcesSnapshot {
        ForcesSnapshot::from_state(self.state())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
