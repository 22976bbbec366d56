pub mod csv;
pub mod sink;

pub use csv::CsvSink;
pub use sink::{ChannelSink, FanOut, LogSink, SensorSink};
