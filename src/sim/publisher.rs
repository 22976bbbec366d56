use serde::{Deserialize, Serialize};

use crate::io::SensorSink;
use crate::sensors::{NoiseModel, SensorKind, SensorMessage, Synthesizer};
use crate::sim::coordinator::Snapshot;

/// Minimum interval between two emissions of each sensor, seconds of
/// coordinator time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorPeriods {
    pub imu: f64,
    pub gps: f64,
    pub attitude: f64,
    pub velocity: f64,
    pub mag: f64,
    pub raw_air_data: f64,
    pub static_pressure: f64,
    pub static_temperature: f64,
    pub esc: f64,
    pub forces: f64,
}

impl Default for SensorPeriods {
    fn default() -> Self {
        Self {
            imu: 0.004,
            gps: 0.1,
            attitude: 0.004,
            velocity: 0.004,
            mag: 0.03,
            raw_air_data: 0.05,
            static_pressure: 0.05,
            static_temperature: 0.05,
            esc: 0.1,
            forces: 0.05,
        }
    }
}

impl SensorPeriods {
    pub fn get(&self, kind: SensorKind) -> f64 {
        match kind {
            SensorKind::Imu => self.imu,
            SensorKind::Gps => self.gps,
            SensorKind::Attitude => self.attitude,
            SensorKind::Velocity => self.velocity,
            SensorKind::MagneticField => self.mag,
            SensorKind::RawAirData => self.raw_air_data,
            SensorKind::StaticPressure => self.static_pressure,
            SensorKind::StaticTemperature => self.static_temperature,
            SensorKind::Esc => self.esc,
            SensorKind::DebugForces => self.forces,
        }
    }

    /// First non-finite or negative period, by sensor name.
    pub fn invalid(&self) -> Option<SensorKind> {
        SensorKind::ALL
            .into_iter()
            .find(|&k| !(self.get(k).is_finite() && self.get(k) >= 0.0))
    }
}

/// Slack for accumulated float error in coordinator timestamps.
const TIME_EPSILON: f64 = 1e-9;

struct Stream {
    kind: SensorKind,
    period: f64,
    last: Option<f64>,
}

impl Stream {
    /// Due when never emitted or when a full period has passed.
    fn due(&self, now: f64) -> bool {
        match self.last {
            None => true,
            Some(last) => now - last + TIME_EPSILON >= self.period,
        }
    }
}

/// Decimates snapshot-derived sensor readings into a sink.
pub struct Publisher {
    synth: Synthesizer,
    streams: Vec<Stream>,
    noise: Option<NoiseModel>,
    sink: Box<dyn SensorSink>,
}

impl Publisher {
    pub fn new(synth: Synthesizer, periods: &SensorPeriods, noise: Option<NoiseModel>, sink: Box<dyn SensorSink>) -> Self {
        let streams = SensorKind::ALL
            .into_iter()
            .map(|kind| Stream { kind, period: periods.get(kind), last: None })
            .collect();
        Self { synth, streams, noise, sink }
    }

    /// Emit every sensor whose period has elapsed at the snapshot time.
    /// Returns the number of messages handed to the sink.
    pub fn publish(&mut self, snapshot: &Snapshot) -> usize {
        let now = snapshot.time;
        let mut emitted = 0;
        for stream in self.streams.iter_mut().filter(|s| s.due(now)) {
            let reading = self.synth.reading(stream.kind, &snapshot.state, &snapshot.forces);
            let mut msg = SensorMessage { time: now, reading };
            if let Some(noise) = self.noise.as_mut() {
                msg = noise.apply(msg);
            }
            self.sink.publish(&msg);
            stream.last = Some(now);
            emitted += 1;
        }
        emitted
    }

    pub fn flush(&mut self) {
        self.sink.flush();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ChannelSink;
    use crate::physics::atmosphere::DIFF_PRESSURE_GAIN;
    use crate::sensors::{GeodeticConverter, NoiseConfig, Reading};
    use crossbeam::channel::{unbounded, Receiver};

    fn publisher(noise: Option<NoiseModel>) -> (Publisher, Receiver<SensorMessage>) {
        let (tx, rx) = unbounded();
        let synth = Synthesizer::new(GeodeticConverter::new(55.75, 48.74, 0.0), 9.8, DIFF_PRESSURE_GAIN);
        let p = Publisher::new(synth, &SensorPeriods::default(), noise, Box::new(ChannelSink::new(tx)));
        (p, rx)
    }

    fn at(time: f64) -> Snapshot {
        Snapshot { time, ..Default::default() }
    }

    #[test]
    fn first_pass_emits_everything() {
        let (mut p, rx) = publisher(None);
        assert_eq!(p.publish(&at(0.0)), SensorKind::ALL.len());
        assert_eq!(rx.len(), SensorKind::ALL.len());
    }

    #[test]
    fn sensors_follow_their_own_periods() {
        let (mut p, rx) = publisher(None);
        // 1 s of coordinator time at a 2 ms publication rate.
        for i in 0..=500 {
            p.publish(&at(i as f64 * 0.002));
        }
        let msgs: Vec<SensorMessage> = rx.try_iter().collect();
        let of = |kind: SensorKind| msgs.iter().filter(|m| m.kind() == kind).count();
        assert!((250..=251).contains(&of(SensorKind::Imu)), "imu {}", of(SensorKind::Imu));
        assert!((10..=11).contains(&of(SensorKind::Gps)), "gps {}", of(SensorKind::Gps));
        assert!((20..=21).contains(&of(SensorKind::DebugForces)));
    }

    #[test]
    fn frozen_time_emits_nothing_new() {
        let (mut p, _rx) = publisher(None);
        p.publish(&at(1.0));
        assert_eq!(p.publish(&at(1.0)), 0);
    }

    #[test]
    fn noise_is_applied_on_the_way_out() {
        let noise = NoiseModel::new(NoiseConfig::from_variances(0.5, 0.5), Some(3)).unwrap();
        let (mut p, rx) = publisher(Some(noise));
        p.publish(&at(0.0));
        let imu = rx.try_iter().find(|m| m.kind() == SensorKind::Imu).unwrap();
        match imu.reading {
            Reading::Imu { accel, .. } => assert!((accel.z + 9.8).abs() > 0.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn negative_period_is_reported() {
        let mut periods = SensorPeriods::default();
        assert_eq!(periods.invalid(), None);
        periods.mag = -1.0;
        assert_eq!(periods.invalid(), Some(SensorKind::MagneticField));
    }
}
