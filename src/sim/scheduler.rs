use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, RecvTimeoutError};

/// Fixed-period deadline timer. Sleeps by waiting on the shutdown channel,
/// so a shutdown wakes every loop immediately.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    next: Instant,
    missed: u64,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self::starting_at(period, Instant::now())
    }

    pub fn starting_at(period: Duration, start: Instant) -> Self {
        Self {
            period,
            next: start + period,
            missed: 0,
        }
    }

    /// Block until the next deadline. `false` once shutdown is signalled.
    pub fn wait(&mut self, shutdown: &Receiver<()>) -> bool {
        match shutdown.recv_deadline(self.next) {
            Err(RecvTimeoutError::Timeout) => {
                self.schedule_next(Instant::now());
                true
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Move the deadline forward one period. Deadlines already in the past
    /// are skipped and counted as missed.
    pub fn schedule_next(&mut self, now: Instant) {
        self.next += self.period;
        if now > self.next && !self.period.is_zero() {
            let behind = now.duration_since(self.next).as_nanos() / self.period.as_nanos() + 1;
            let behind = u32::try_from(behind).unwrap_or(u32::MAX);
            self.missed += u64::from(behind);
            self.next += self.period * behind;
        }
    }

    /// Missed deadlines since the last call.
    pub fn take_missed(&mut self) -> u64 {
        std::mem::take(&mut self.missed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::{bounded, unbounded};

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn on_time_ticks_miss_nothing() {
        let t0 = Instant::now();
        let mut t = Ticker::starting_at(4 * MS, t0);
        for i in 1..=100u32 {
            t.schedule_next(t0 + 4 * MS * i);
        }
        assert_eq!(t.take_missed(), 0);
    }

    #[test]
    fn overrun_skips_and_counts() {
        let t0 = Instant::now();
        let mut t = Ticker::starting_at(4 * MS, t0);
        // Fired at 4 ms, but the tick ran until 15 ms: 8 and 12 are gone.
        t.schedule_next(t0 + 15 * MS);
        assert_eq!(t.take_missed(), 2);
        assert_eq!(t.next, t0 + 16 * MS);
        assert_eq!(t.take_missed(), 0);
    }

    #[test]
    fn dropping_the_sender_stops_the_loop() {
        let (tx, rx) = unbounded::<()>();
        let mut t = Ticker::new(MS);
        assert!(t.wait(&rx));
        drop(tx);
        assert!(!t.wait(&rx));
    }

    #[test]
    fn explicit_signal_stops_the_loop() {
        let (tx, rx) = bounded::<()>(1);
        tx.send(()).unwrap();
        let mut t = Ticker::new(Duration::from_secs(10));
        assert!(!t.wait(&rx));
    }
}
