pub mod params;
pub mod presets;
pub mod tables;

pub use params::{
    Airframe, ChannelSpec, Propeller, VehicleBuilder, VehicleParameters, CHANNELS,
    PROPULSION_UNITS,
};
pub use tables::{CoefficientTables, Grid2d, PolynomialTable};
