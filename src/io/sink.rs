use crossbeam::channel::{Sender, TrySendError};

use crate::sensors::{Reading, SensorMessage};

/// Destination for synthesized sensor messages. Called from the publication
/// loop, so implementations must not block for long.
pub trait SensorSink: Send {
    fn publish(&mut self, msg: &SensorMessage);

    fn flush(&mut self) {}
}

// ---------------------------------------------------------------------------
// Channel sink
// ---------------------------------------------------------------------------

/// Forwards messages to a crossbeam channel. A full bounded channel drops the
/// message rather than stalling publication.
pub struct ChannelSink {
    tx: Sender<SensorMessage>,
    dropped: u64,
}

impl ChannelSink {
    pub fn new(tx: Sender<SensorMessage>) -> Self {
        Self { tx, dropped: 0 }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl SensorSink for ChannelSink {
    fn publish(&mut self, msg: &SensorMessage) {
        match self.tx.try_send(msg.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                if self.dropped.is_power_of_two() {
                    log::warn!("sensor channel full, {} messages dropped", self.dropped);
                }
            }
            Err(TrySendError::Disconnected(_)) => self.dropped += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Log sink
// ---------------------------------------------------------------------------

/// Writes every message at `trace` level. Debug forces go to `debug`.
#[derive(Debug, Default)]
pub struct LogSink;

impl SensorSink for LogSink {
    fn publish(&mut self, msg: &SensorMessage) {
        match &msg.reading {
            Reading::DebugForces { forces } => {
                log::debug!("t={:.3} forces {:?}", msg.time, forces.packed());
            }
            reading => log::trace!("t={:.3} {} {:?}", msg.time, msg.kind(), reading),
        }
    }
}

/// Sends every message to each inner sink.
#[derive(Default)]
pub struct FanOut {
    sinks: Vec<Box<dyn SensorSink>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl SensorSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl SensorSink for FanOut {
    fn publish(&mut self, msg: &SensorMessage) {
        for sink in &mut self.sinks {
            sink.publish(msg);
        }
    }

    fn flush(&mut self) {
        for sink in &mut self.sinks {
            sink.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::{bounded, unbounded};

    fn msg(time: f64) -> SensorMessage {
        SensorMessage {
            time,
            reading: Reading::StaticTemperature { temperature: 288.15 },
        }
    }

    #[test]
    fn channel_sink_forwards() {
        let (tx, rx) = unbounded();
        let mut sink = ChannelSink::new(tx);
        sink.publish(&msg(0.5));
        assert_eq!(rx.try_recv().unwrap(), msg(0.5));
    }

    #[test]
    fn full_channel_drops_without_blocking() {
        let (tx, rx) = bounded(1);
        let mut sink = ChannelSink::new(tx);
        sink.publish(&msg(0.0));
        sink.publish(&msg(0.1));
        assert_eq!(sink.dropped(), 1);
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn fan_out_reaches_every_sink() {
        let (tx_a, rx_a) = unbounded();
        let (tx_b, rx_b) = unbounded();
        let mut fan = FanOut::new().with(ChannelSink::new(tx_a)).with(ChannelSink::new(tx_b)).with(LogSink);
        fan.publish(&msg(1.0));
        assert_eq!(rx_a.len(), 1);
        assert_eq!(rx_b.len(), 1);
    }
}
