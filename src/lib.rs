//! # Proximity Alarm Core Library
//!
//! This library contains everything the proximity alarm does apart from
//! talking to real Raspberry Pi peripherals: the ultrasonic ranging
//! algorithm, the latched alarm, the rolling history and the scheduler that
//! runs them concurrently.
//!
//! ## Design Philosophy
//!
//! ### Owned shared state
//! There are no globals. Each piece of process-wide state has exactly one
//! owner type and is shared through `Arc` handles:
//! - [`analog::RawAnalogValue`]: atomic scalar, one writer (the ADC sampler)
//! - [`alarm::AlarmController`]: state and buzzer pin under one mutex
//! - [`history::HistoryBuffer`]: rolling window under a short-lived mutex
//!
//! ### Narrow hardware seams
//! Pins, the ADC, the LCD and the plot are reached only through the traits in
//! [`hal`]. The binary provisions `rppal` devices on the Pi, the [`sim`]
//! module provides a real-time simulation for development.
//!
//! ### Data Flow
//! 1. **Analog**: potentiometer → `RawAnalogValue` every 100 ms
//! 2. **Ranging**: ping → distance → latch evaluation → history, every 200 ms
//! 3. **Button**: reset input → `AlarmController::reset`, every 100 ms
//! 4. **Display**: consistent frame → LCD lines + plot, every 200 ms
//!
//! ## Core Types
//! - [`Sample`]: one distance measurement with the threshold it was judged against

use std::time::Instant;

// Module declarations
pub mod adc;
pub mod alarm;
pub mod analog;
pub mod button;
pub mod config;
pub mod display;
pub mod hal;
pub mod history;
pub mod lcd1602;
pub mod plot;
pub mod range_sensor;
pub mod scheduler;
pub mod sim;

#[cfg(test)]
pub(crate) mod test_support;

pub use alarm::{AlarmState, AlarmStatus};

/// A single distance measurement and the threshold in force when it was taken.
///
/// Both values are in centimetres. `taken_at` is monotonic and only used for
/// ordering and age checks, never displayed.
///
/// # Example
/// ```
/// use proximity_alarm_lib::Sample;
/// use std::time::Instant;
///
/// let sample = Sample { distance_cm: 42.5, threshold_cm: 30.0, taken_at: Instant::now() };
/// assert!(sample.distance_cm >= sample.threshold_cm);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Measured distance, never negative
    pub distance_cm: f32,
    /// Threshold derived from the potentiometer at measurement time
    pub threshold_cm: f32,
    pub taken_at: Instant,
}
