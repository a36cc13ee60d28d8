// src/i2c_rppal.rs
use proximity_alarm_lib::hal::{HalError, I2cDevice};
use rppal::i2c::I2c;

/// /dev/i2c-1 through rppal. Each chip driver gets its own handle.
pub struct RppalI2c {
    bus: I2c,
}

impl RppalI2c {
    pub fn new() -> Result<Self, rppal::i2c::Error> {
        Ok(Self { bus: I2c::new()? })
    }
}

impl I2cDevice for RppalI2c {
    fn set_address(&mut self, address: u16) -> Result<(), HalError> {
        self.bus
            .set_slave_address(address)
            .map_err(|e| HalError(e.to_string()))
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), HalError> {
        self.bus
            .smbus_send_byte(byte)
            .map_err(|e| HalError(e.to_string()))
    }

    fn read_byte_data(&mut self, command: u8) -> Result<u8, HalError> {
        self.bus
            .smbus_read_byte(command)
            .map_err(|e| HalError(e.to_string()))
    }
}
