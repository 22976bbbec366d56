pub mod config;
pub mod dynamics;
pub mod error;
pub mod frames;
pub mod io;
pub mod physics;
pub mod sensors;
pub mod sim;
pub mod vehicle;

pub use config::SimSettings;
pub use error::SimError;
pub use sim::{CommandHandle, Runtime};
