//! # Capability Interfaces
//!
//! The core never talks to GPIO or I2C directly. Every piece of hardware is
//! reached through one of the small traits below, so the same scheduler runs
//! against `rppal` devices on the Pi, the simulated rig in development mode,
//! and scripted fakes in tests.

use thiserror::Error;

/// Logic level of a digital pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Failure reported by a hardware collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("hardware error: {0}")]
pub struct HalError(pub String);

impl HalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Trait for output pin interface (trigger, buzzer)
pub trait DigitalOutput {
    fn set(&mut self, level: Level) -> Result<(), HalError>;
}

/// Trait for input pin interface (echo, button)
pub trait DigitalInput {
    fn read(&mut self) -> Result<Level, HalError>;
}

/// A multi-channel ADC that has already been detected and addressed.
pub trait AnalogChannel {
    fn read(&mut self, channel: u8) -> Result<u16, HalError>;
}

/// Character display pushed to once per display tick.
pub trait Display {
    fn render(&mut self, lines: &[String], alarm_active: bool) -> Result<(), HalError>;
}

/// Renderer for the rolling distance/threshold series.
///
/// Both slices always have the same length and are index-aligned.
pub trait Plot {
    fn update(&mut self, distances: &[f32], thresholds: &[f32]) -> Result<(), HalError>;
}

impl<T: DigitalOutput + ?Sized> DigitalOutput for Box<T> {
    fn set(&mut self, level: Level) -> Result<(), HalError> {
        (**self).set(level)
    }
}

impl<T: DigitalInput + ?Sized> DigitalInput for Box<T> {
    fn read(&mut self) -> Result<Level, HalError> {
        (**self).read()
    }
}

impl<T: AnalogChannel + ?Sized> AnalogChannel for Box<T> {
    fn read(&mut self, channel: u8) -> Result<u16, HalError> {
        (**self).read(channel)
    }
}

impl<T: Display + ?Sized> Display for Box<T> {
    fn render(&mut self, lines: &[String], alarm_active: bool) -> Result<(), HalError> {
        (**self).render(lines, alarm_active)
    }
}

impl<T: Plot + ?Sized> Plot for Box<T> {
    fn update(&mut self, distances: &[f32], thresholds: &[f32]) -> Result<(), HalError> {
        (**self).update(distances, thresholds)
    }
}

/// Minimal SMBus-style access to one I2C bus, used by the chip drivers.
pub trait I2cDevice {
    fn set_address(&mut self, address: u16) -> Result<(), HalError>;
    /// Plain one-byte write to the current address
    fn write_byte(&mut self, byte: u8) -> Result<(), HalError>;
    /// SMBus "read byte data": send `command`, read one byte back
    fn read_byte_data(&mut self, command: u8) -> Result<u8, HalError>;
}

/// Answer whether a device acknowledges at `address`.
pub fn probe<D: I2cDevice>(dev: &mut D, address: u16) -> bool {
    dev.set_address(address).is_ok() && dev.write_byte(0).is_ok()
}

/// Startup failures. None of these are retried: the process exits before
/// any activity starts.
#[derive(Error, Debug)]
pub enum ProvisioningError {
    #[error("no ADC found at any of {tried:02X?}; check wiring with `i2cdetect -y 1`")]
    NoAdc { tried: Vec<u16> },

    #[error("no LCD expander found at any of {tried:02X?}")]
    NoDisplay { tried: Vec<u16> },

    #[error("GPIO setup failed: {0}")]
    Gpio(String),

    #[error("I2C bus unavailable: {0}")]
    Bus(String),

    #[error("LCD init failed: {0}")]
    DisplayInit(#[from] HalError),
}

/// Boxed output pin that can move into a worker task.
pub type BoxedOutput = Box<dyn DigitalOutput + Send>;
/// Boxed input pin that can move into a worker task.
pub type BoxedInput = Box<dyn DigitalInput + Send>;
