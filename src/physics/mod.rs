pub mod actuators;
pub mod aerodynamics;
pub mod atmosphere;
pub mod interp;
pub mod propulsion;
