//! # Ultrasonic Range Sensor
//!
//! Drives an HC-SR04 style trigger/echo pair. A 10 µs trigger pulse starts a
//! ping; the echo line is then held high for the round-trip time of the
//! sound burst. Both edge waits are bounded so a disconnected or faulty
//! sensor costs one skipped cycle instead of a hung ranging task.

use crate::hal::{DigitalInput, DigitalOutput, HalError, Level};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Half the speed of sound in cm/s (round trip halved).
pub const HALF_SPEED_OF_SOUND_CM_S: f32 = 17150.0;

/// Width of the trigger pulse.
pub const TRIGGER_PULSE: Duration = Duration::from_micros(10);

/// Low time before the trigger pulse so the sensor sees a clean rising edge.
const TRIGGER_SETTLE: Duration = Duration::from_micros(2);

/// Which echo edge was not observed in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edge::Rising => write!(f, "rising"),
            Edge::Falling => write!(f, "falling"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    /// Echo edge not seen within the configured window
    #[error("echo {edge} edge not observed within {timeout:?}")]
    Timeout { edge: Edge, timeout: Duration },

    /// Trigger or echo pin access failed
    #[error("sensor pin: {0}")]
    Io(#[from] HalError),
}

/// Convert an echo pulse width to centimetres, rounded to 2 decimals.
pub fn pulse_to_distance_cm(pulse: Duration) -> f32 {
    let distance = pulse.as_secs_f32() * HALF_SPEED_OF_SOUND_CM_S;
    (distance * 100.0).round() / 100.0
}

pub struct RangeSensor<T, E> {
    trigger: T,
    echo: E,
    edge_timeout: Duration,
}

impl<T, E> RangeSensor<T, E>
where
    T: DigitalOutput,
    E: DigitalInput,
{
    pub fn new(trigger: T, echo: E, edge_timeout: Duration) -> Self {
        Self {
            trigger,
            echo,
            edge_timeout,
        }
    }

    pub fn edge_timeout(&self) -> Duration {
        self.edge_timeout
    }

    /// Fire one ping and return the measured distance in cm.
    ///
    /// Blocks the calling thread for at most `2 * edge_timeout` plus the
    /// trigger pulse. Callers on an async runtime should wrap this in
    /// `block_in_place` or `spawn_blocking`.
    pub fn measure(&mut self) -> Result<f32, SensorError> {
        self.trigger.set(Level::Low)?;
        thread::sleep(TRIGGER_SETTLE);
        self.trigger.set(Level::High)?;
        thread::sleep(TRIGGER_PULSE);
        self.trigger.set(Level::Low)?;

        let pulse_start = self.wait_for(Level::High, Edge::Rising)?;
        let pulse_end = self.wait_for(Level::Low, Edge::Falling)?;

        Ok(pulse_to_distance_cm(pulse_end.duration_since(pulse_start)))
    }

    /// Spin until the echo reads `level`, returning the instant it was seen.
    fn wait_for(&mut self, level: Level, edge: Edge) -> Result<Instant, SensorError> {
        let deadline = Instant::now() + self.edge_timeout;
        loop {
            if self.echo.read()? == level {
                return Ok(Instant::now());
            }
            if Instant::now() >= deadline {
                return Err(SensorError::Timeout {
                    edge,
                    timeout: self.edge_timeout,
                });
            }
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingOutput, ScriptedInput};

    #[test]
    fn test_pulse_conversion() {
        // 1 ms round trip is 17.15 cm
        assert_eq!(pulse_to_distance_cm(Duration::from_millis(1)), 17.15);
        assert_eq!(pulse_to_distance_cm(Duration::ZERO), 0.0);
        // 583 µs -> 9.99845 cm, rounded to 2 decimals
        assert!((pulse_to_distance_cm(Duration::from_micros(583)) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_trigger_pulse_sequence() {
        let trigger = RecordingOutput::default();
        let echo = ScriptedInput::new([Level::Low, Level::High, Level::High, Level::Low]);
        let mut sensor = RangeSensor::new(trigger.clone(), echo, Duration::from_millis(5));

        let distance = sensor.measure().unwrap();
        assert!(distance >= 0.0);
        assert_eq!(
            *trigger.writes.lock().unwrap(),
            vec![Level::Low, Level::High, Level::Low]
        );
    }

    #[test]
    fn test_echo_never_rises_times_out() {
        let mut sensor = RangeSensor::new(
            RecordingOutput::default(),
            ScriptedInput::constant(Level::Low),
            Duration::from_millis(5),
        );

        let started = Instant::now();
        let err = sensor.measure().unwrap_err();
        assert_eq!(
            err,
            SensorError::Timeout {
                edge: Edge::Rising,
                timeout: Duration::from_millis(5)
            }
        );
        // Bounded wait, not a hang
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_echo_stuck_high_times_out_on_falling_edge() {
        let mut sensor = RangeSensor::new(
            RecordingOutput::default(),
            ScriptedInput::constant(Level::High),
            Duration::from_millis(5),
        );

        match sensor.measure() {
            Err(SensorError::Timeout { edge, .. }) => assert_eq!(edge, Edge::Falling),
            other => panic!("expected falling-edge timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_trigger_failure_is_io_error() {
        let trigger = RecordingOutput::default();
        trigger.set_failing(true);
        let mut sensor = RangeSensor::new(
            trigger,
            ScriptedInput::constant(Level::Low),
            Duration::from_millis(5),
        );

        assert!(matches!(sensor.measure(), Err(SensorError::Io(_))));
    }
}
