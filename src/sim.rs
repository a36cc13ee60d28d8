//! # Simulated Hardware
//!
//! Development-mode stand-ins for every collaborator, so the full scheduler
//! can run on a laptop. The trigger/echo pair is simulated in real time: the
//! echo line goes high shortly after the trigger pulse and stays high for
//! exactly as long as a real HC-SR04 would for the current obstacle
//! distance, so `RangeSensor::measure` runs its normal edge-timing path.
//!
//! - obstacle drifts between 5 and 65 cm with a 20 s period
//! - every 25th ping gets no echo (exercises the timeout path)
//! - the potentiometer drifts over a 30 s period, every 17th read glitches
//! - the button presses itself for one second every 15 s

use crate::config::Config;
use crate::display::ConsoleDisplay;
use crate::hal::{AnalogChannel, DigitalInput, DigitalOutput, HalError, Level, Plot};
use crate::plot::{NoPlot, TerminalPlot};
use crate::range_sensor::HALF_SPEED_OF_SOUND_CM_S;
use crate::scheduler::Rig;
use std::f32::consts::TAU;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::info;

/// Time from trigger to echo rising edge on a real sensor
const ECHO_LATENCY: Duration = Duration::from_micros(250);
const DROPOUT_EVERY: u32 = 25;
const GLITCH_EVERY: u32 = 17;

fn wave(epoch: Instant, period_s: f32) -> f32 {
    (epoch.elapsed().as_secs_f32() / period_s * TAU).sin()
}

/// Ground-truth obstacle distance at the current instant.
pub fn obstacle_cm(epoch: Instant) -> f32 {
    35.0 + 30.0 * wave(epoch, 20.0)
}

#[derive(Default)]
struct PingState {
    armed: bool,
    fired_at: Option<Instant>,
    pings: u32,
}

/// Trigger half of the simulated ranger.
pub struct SimTrigger {
    ping: Arc<Mutex<PingState>>,
}

/// Echo half of the simulated ranger.
pub struct SimEcho {
    ping: Arc<Mutex<PingState>>,
    epoch: Instant,
}

/// Build a connected trigger/echo pair.
pub fn ranger(epoch: Instant) -> (SimTrigger, SimEcho) {
    let ping = Arc::new(Mutex::new(PingState::default()));
    (
        SimTrigger { ping: ping.clone() },
        SimEcho { ping, epoch },
    )
}

impl DigitalOutput for SimTrigger {
    fn set(&mut self, level: Level) -> Result<(), HalError> {
        let mut ping = self.ping.lock().map_err(|_| HalError::new("sim poisoned"))?;
        match level {
            Level::High => ping.armed = true,
            Level::Low if ping.armed => {
                // Falling edge of the trigger pulse starts the ping
                ping.armed = false;
                ping.pings = ping.pings.wrapping_add(1);
                ping.fired_at = if ping.pings % DROPOUT_EVERY == 0 {
                    None
                } else {
                    Some(Instant::now())
                };
            }
            Level::Low => {}
        }
        Ok(())
    }
}

impl DigitalInput for SimEcho {
    fn read(&mut self) -> Result<Level, HalError> {
        let mut ping = self.ping.lock().map_err(|_| HalError::new("sim poisoned"))?;
        let Some(fired_at) = ping.fired_at else {
            return Ok(Level::Low);
        };
        let pulse = Duration::from_secs_f32(obstacle_cm(self.epoch) / HALF_SPEED_OF_SOUND_CM_S);
        let rise = fired_at + ECHO_LATENCY;
        let now = Instant::now();
        if now < rise {
            Ok(Level::Low)
        } else if now < rise + pulse {
            Ok(Level::High)
        } else {
            ping.fired_at = None;
            Ok(Level::Low)
        }
    }
}

/// Potentiometer on an 8-bit ADC.
pub struct SimPot {
    epoch: Instant,
    reads: u32,
}

impl SimPot {
    pub fn new(epoch: Instant) -> Self {
        Self { epoch, reads: 0 }
    }
}

impl AnalogChannel for SimPot {
    fn read(&mut self, _channel: u8) -> Result<u16, HalError> {
        self.reads = self.reads.wrapping_add(1);
        if self.reads % GLITCH_EVERY == 0 {
            return Err(HalError::new("simulated i2c glitch"));
        }
        Ok((60.0 + 40.0 * wave(self.epoch, 30.0)).round() as u16)
    }
}

/// Reset button that presses itself once every 15 s.
pub struct SimButton {
    epoch: Instant,
    active: Level,
}

impl SimButton {
    pub fn new(epoch: Instant, active: Level) -> Self {
        Self { epoch, active }
    }
}

impl DigitalInput for SimButton {
    fn read(&mut self) -> Result<Level, HalError> {
        let pressed = self.epoch.elapsed().as_secs() % 15 == 14;
        let released = match self.active {
            Level::High => Level::Low,
            Level::Low => Level::High,
        };
        Ok(if pressed { self.active } else { released })
    }
}

/// Buzzer that logs instead of beeping.
#[derive(Default)]
pub struct SimBuzzer {
    on: bool,
}

impl DigitalOutput for SimBuzzer {
    fn set(&mut self, level: Level) -> Result<(), HalError> {
        let on = level.is_high();
        if on != self.on {
            info!(on, "buzzer");
        }
        self.on = on;
        Ok(())
    }
}

/// Assemble a complete simulated rig for development mode.
pub fn rig(config: &Config) -> Rig {
    let epoch = Instant::now();
    let (trigger, echo) = ranger(epoch);
    let active = if config.pins.button_active_low {
        Level::Low
    } else {
        Level::High
    };
    let plot: Box<dyn Plot + Send> = if config.display.plot {
        Box::new(TerminalPlot::stdout(config.display.plot_rows))
    } else {
        Box::new(NoPlot)
    };

    Rig {
        trigger: Box::new(trigger),
        echo: Box::new(echo),
        buzzer: Box::new(SimBuzzer::default()),
        button: Box::new(SimButton::new(epoch, active)),
        button_active: active,
        adc: Box::new(SimPot::new(epoch)),
        display: Box::new(ConsoleDisplay::stdout()),
        plot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range_sensor::RangeSensor;

    #[test]
    fn test_simulated_ping_matches_obstacle() {
        let epoch = Instant::now();
        let (trigger, echo) = ranger(epoch);
        let mut sensor = RangeSensor::new(trigger, echo, Duration::from_millis(30));

        let expected = obstacle_cm(epoch);
        let measured = sensor.measure().unwrap();
        // Busy-wait timing on a loaded CI box is coarse, allow a few cm
        assert!(
            (measured - expected).abs() < 5.0,
            "measured {} expected {}",
            measured,
            expected
        );
    }

    #[test]
    fn test_dropout_times_out() {
        let (trigger, echo) = ranger(Instant::now());
        let mut sensor = RangeSensor::new(trigger, echo, Duration::from_millis(30));
        let results: Vec<_> = (0..DROPOUT_EVERY).map(|_| sensor.measure()).collect();
        assert!(results[..DROPOUT_EVERY as usize - 1].iter().all(Result::is_ok));
        assert!(results.last().unwrap().is_err());
    }

    #[test]
    fn test_pot_glitches_periodically() {
        let mut pot = SimPot::new(Instant::now());
        let reads: Vec<_> = (0..GLITCH_EVERY).map(|_| pot.read(0)).collect();
        assert_eq!(reads.iter().filter(|r| r.is_err()).count(), 1);
        assert!(reads[0].as_ref().unwrap() <= &100);
    }

    #[test]
    fn test_button_released_at_start() {
        let mut button = SimButton::new(Instant::now(), Level::Low);
        assert_eq!(button.read().unwrap(), Level::High);
    }
}
