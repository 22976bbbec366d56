use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Startup configuration problems. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("missing required parameter `{0}`")]
    Missing(&'static str),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("unknown airframe `{0}` (expected `iris` or `innopolis_vtol`)")]
    UnknownAirframe(String),
    #[error("unknown dynamics model `{0}` (expected `flightgoggles_multicopter` or `inno_vtol`)")]
    UnknownDynamics(String),
}

/// Malformed coefficient tables.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("table `{0}` is empty")]
    Empty(&'static str),
    #[error("axis of table `{table}` is not monotonically non-decreasing at index {index}")]
    NonMonotonic { table: &'static str, index: usize },
    #[error("table `{table}` has shape {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    Shape {
        table: &'static str,
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },
    #[error("table `{0}` contains a non-finite value")]
    NonFinite(&'static str),
}

/// Physically impossible vehicle parameters.
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("mass must be positive, got {0}")]
    Mass(f64),
    #[error("inertia tensor must be symmetric positive definite")]
    Inertia,
    #[error("channel {channel}: min {min} exceeds max {max}")]
    Bounds { channel: usize, min: f64, max: f64 },
    #[error("channel {channel}: {what} must be non-negative, got {value}")]
    Negative {
        channel: usize,
        what: &'static str,
        value: f64,
    },
    #[error("propeller {unit}: {reason}")]
    Propeller { unit: usize, reason: &'static str },
    #[error("{0} must be finite")]
    NonFinite(&'static str),
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Rejected inbound messages. The simulation keeps running.
#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("actuator message carries {0} axes, at most 8 are supported")]
    TooManyAxes(usize),
    #[error("unknown calibration type {0}")]
    UnknownCalibration(u8),
    #[error("simulation is shut down")]
    Disconnected,
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Params(#[from] ParamsError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}
