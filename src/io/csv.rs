use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::dynamics::{ForcesSnapshot, VehicleState};
use crate::io::sink::SensorSink;
use crate::sensors::SensorMessage;

/// Widest sensor payload (debug forces).
pub const MAX_VALUES: usize = ForcesSnapshot::PACKED_LEN;

/// Write vehicle states to CSV format.
///
/// Columns: time, pos_n, pos_e, pos_d, vel_n, vel_e, vel_d,
///          quat_w, quat_x, quat_y, quat_z, rate_x, rate_y, rate_z,
///          roll_deg, pitch_deg, yaw_deg, armed
pub fn write_trajectory<W: Write>(writer: &mut W, trajectory: &[VehicleState]) -> io::Result<()> {
    writeln!(
        writer,
        "time,pos_n,pos_e,pos_d,vel_n,vel_e,vel_d,\
         quat_w,quat_x,quat_y,quat_z,rate_x,rate_y,rate_z,\
         roll_deg,pitch_deg,yaw_deg,armed"
    )?;

    for s in trajectory {
        let q = s.attitude.quaternion();
        let (roll, pitch, yaw) = s.euler();
        writeln!(
            writer,
            "{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},\
             {:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},\
             {:.2},{:.2},{:.2},{}",
            s.time,
            s.position.x, s.position.y, s.position.z,
            s.velocity.x, s.velocity.y, s.velocity.z,
            q.w, q.i, q.j, q.k,
            s.angular_velocity.x, s.angular_velocity.y, s.angular_velocity.z,
            roll.to_degrees(),
            pitch.to_degrees(),
            yaw.to_degrees(),
            u8::from(s.armed),
        )?;
    }

    Ok(())
}

/// Write trajectory to a CSV file at the given path.
pub fn write_trajectory_file(path: &Path, trajectory: &[VehicleState]) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    write_trajectory(&mut file, trajectory)?;
    file.flush()
}

// ---------------------------------------------------------------------------
// Sensor recorder
// ---------------------------------------------------------------------------

/// Records every sensor message as one row: time, sensor, then up to
/// `MAX_VALUES` payload columns (unused columns left empty).
pub struct CsvSink<W: Write + Send> {
    writer: W,
    rows: u64,
    failed: bool,
}

impl CsvSink<BufWriter<File>> {
    pub fn create(path: &Path) -> io::Result<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write + Send> CsvSink<W> {
    pub fn new(mut writer: W) -> io::Result<Self> {
        write!(writer, "time,sensor")?;
        for i in 0..MAX_VALUES {
            write!(writer, ",v{}", i)?;
        }
        writeln!(writer)?;
        Ok(Self { writer, rows: 0, failed: false })
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_row(&mut self, msg: &SensorMessage) -> io::Result<()> {
        let values = msg.reading.values();
        write!(self.writer, "{:.6},{}", msg.time, msg.kind())?;
        for i in 0..MAX_VALUES {
            match values.get(i) {
                Some(v) => write!(self.writer, ",{:.6}", v)?,
                None => write!(self.writer, ",")?,
            }
        }
        writeln!(self.writer)
    }
}

impl<W: Write + Send> SensorSink for CsvSink<W> {
    fn publish(&mut self, msg: &SensorMessage) {
        if self.failed {
            return;
        }
        match self.write_row(msg) {
            Ok(()) => self.rows += 1,
            Err(e) => {
                log::error!("csv recorder stopped: {}", e);
                self.failed = true;
            }
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            log::error!("csv recorder flush failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::Reading;
    use nalgebra::{UnitQuaternion, Vector3};

    #[test]
    fn csv_output_has_header_and_rows() {
        let mut second = VehicleState::new(Vector3::new(0.0, 0.0, -5.0), UnitQuaternion::identity());
        second.time = 0.004;
        second.velocity = Vector3::new(1.0, 0.0, 0.0);
        second.armed = true;
        let traj = vec![VehicleState::default(), second];

        let mut buf = Vec::new();
        write_trajectory(&mut buf, &traj).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert!(lines[0].starts_with("time,"));
        assert_eq!(lines.len(), 3); // header + 2 data rows
        assert!(lines[1].starts_with("0.0000,"));
        assert!(lines[2].ends_with(",1"));
    }

    #[test]
    fn sensor_rows_are_padded_to_fixed_width() {
        let mut sink = CsvSink::new(Vec::new()).unwrap();
        sink.publish(&SensorMessage {
            time: 0.25,
            reading: Reading::StaticPressure { pressure: 1013.25 },
        });
        sink.publish(&SensorMessage {
            time: 0.3,
            reading: Reading::DebugForces { forces: ForcesSnapshot::default() },
        });
        assert_eq!(sink.rows(), 2);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        let columns = lines[0].split(',').count();
        assert_eq!(columns, 2 + MAX_VALUES);
        for row in &lines[1..] {
            assert_eq!(row.split(',').count(), columns);
        }
        assert!(lines[1].starts_with("0.250000,static_pressure,1013.250000,"));
        assert!(lines[2].starts_with("0.300000,forces,"));
    }
}
