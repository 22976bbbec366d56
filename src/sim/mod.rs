//! Real-time coordination: command intake, the arming state machine, the
//! physics/publication/diagnostics loops and their scheduling.

pub mod arming;
pub mod clock;
pub mod command;
pub mod coordinator;
pub mod diagnostics;
pub mod publisher;
pub mod runtime;
pub mod scheduler;

pub use arming::{ArmingMachine, ArmingState};
pub use clock::{ClockMode, SimClock};
pub use command::{Command, CommandHandle, ReceiptStats, ReceiptWindow};
pub use coordinator::{Coordinator, Snapshot};
pub use diagnostics::{health, Counters, Report};
pub use publisher::{Publisher, SensorPeriods};
pub use runtime::{build_dynamics, build_publisher, Runtime};
pub use scheduler::Ticker;
