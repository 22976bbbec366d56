use std::sync::Arc;

use nalgebra::Vector3;

use crate::dynamics::rigid_body::RigidBody;
use crate::error::ParamsError;
use crate::physics::actuators::{self, CommandVector};
use crate::physics::aerodynamics::{aero_loads, AeroReference, Surfaces};
use crate::physics::atmosphere;
use crate::physics::propulsion;
use crate::vehicle::{CoefficientTables, VehicleParameters};

const AILERON: usize = 4;
const ELEVATOR: usize = 5;
const RUDDER: usize = 6;

/// Quadplane model: table-driven aerodynamics, lift rotors and a pusher,
/// with thrust scaled by the ISA density at the current altitude.
#[derive(Debug, Clone)]
pub struct InnoVtol {
    pub body: RigidBody,
    tables: Arc<CoefficientTables>,
    reference_altitude: f64, // m MSL of the NED origin
}

impl InnoVtol {
    pub fn new(
        params: Arc<VehicleParameters>,
        tables: Arc<CoefficientTables>,
        reference_altitude: f64,
    ) -> Result<Self, ParamsError> {
        tables.validate()?;
        Ok(Self {
            body: RigidBody::new(params)?,
            tables,
            reference_altitude,
        })
    }

    pub fn tables(&self) -> &CoefficientTables {
        &self.tables
    }

    pub fn process(&mut self, dt: f64, cmd: &CommandVector) {
        if !(dt > 0.0 && dt.is_finite()) {
            return;
        }
        self.body.update_wind();
        let params = Arc::clone(&self.body.params);
        let targets = actuators::to_physical(&params.channels, cmd);
        let effective = self.body.drive_actuators(&targets, dt);

        let atm = atmosphere::isa(self.reference_altitude + self.body.state.height());
        let prop = propulsion::propulsion(&params.propellers, &effective, atm.relative_density());

        let reference = AeroReference {
            density: params.air_density,
            wing_area: params.wing_area,
            characteristic_length: params.characteristic_length,
        };
        let surfaces = Surfaces {
            aileron: effective[AILERON],
            elevator: effective[ELEVATOR],
            rudder: effective[RUDDER],
        };
        let aero = aero_loads(&self.tables, &reference, &self.body.state.airspeed(), &surfaces);

        self.body.advance(&prop, &aero, Vector3::zeros(), Vector3::zeros(), dt);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
