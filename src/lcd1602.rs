//! 16x2 HD44780 character LCD behind a PCF8574 I2C expander
//!
//! Expander wiring used by the common Pi backpacks:
//! P0=RS, P1=RW (held low), P2=E, P3=backlight, P4..P7=D4..D7.
//! The controller runs in 4-bit mode, so each byte goes out as two nibbles,
//! each latched by pulsing E.

use crate::display::LINE_WIDTH;
use crate::hal::{probe, Display, HalError, I2cDevice, ProvisioningError};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

const RS: u8 = 0x01;
const ENABLE: u8 = 0x04;
const BACKLIGHT: u8 = 0x08;

const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_MODE: u8 = 0x06; // increment, no shift
const CMD_DISPLAY_ON: u8 = 0x0C; // display on, cursor off, blink off
const CMD_FUNCTION_SET: u8 = 0x28; // 4-bit, 2 lines, 5x8 font
const CMD_SET_DDRAM: u8 = 0x80;

const ROW_OFFSETS: [u8; 2] = [0x00, 0x40];

pub struct Lcd1602<D: I2cDevice> {
    dev: D,
    address: u16,
    backlight: bool,
}

impl<D: I2cDevice> Lcd1602<D> {
    /// Probe `addresses` in order, bind to the first expander that answers
    /// and run the controller init sequence.
    pub fn detect(mut dev: D, addresses: &[u16]) -> Result<Self, ProvisioningError> {
        for &address in addresses {
            if probe(&mut dev, address) {
                info!(address = %format!("{:#04x}", address), "LCD expander detected");
                let mut lcd = Self {
                    dev,
                    address,
                    backlight: true,
                };
                lcd.init()?;
                return Ok(lcd);
            }
        }
        Err(ProvisioningError::NoDisplay {
            tried: addresses.to_vec(),
        })
    }

    /// Initialize the controller into 4-bit, two-line mode
    fn init(&mut self) -> Result<(), HalError> {
        thread::sleep(Duration::from_millis(50));
        // 0x33, 0x32: three "8-bit" wakeups then the switch to 4-bit
        self.command(0x33)?;
        self.command(0x32)?;
        self.command(CMD_FUNCTION_SET)?;
        self.command(CMD_DISPLAY_ON)?;
        self.command(CMD_ENTRY_MODE)?;
        self.clear()
    }

    pub fn clear(&mut self) -> Result<(), HalError> {
        self.command(CMD_CLEAR)?;
        thread::sleep(Duration::from_millis(2));
        Ok(())
    }

    pub fn set_backlight(&mut self, on: bool) -> Result<(), HalError> {
        self.backlight = on;
        self.expander_write(0)
    }

    pub fn set_cursor(&mut self, column: u8, row: usize) -> Result<(), HalError> {
        let offset = ROW_OFFSETS[row.min(ROW_OFFSETS.len() - 1)];
        self.command(CMD_SET_DDRAM | (offset + column))
    }

    /// Write one full line, padded with spaces so stale text is overwritten
    /// without a flickering clear.
    pub fn write_line(&mut self, row: usize, text: &str) -> Result<(), HalError> {
        self.set_cursor(0, row)?;
        let chars = text
            .chars()
            .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
            .chain(std::iter::repeat(' '))
            .take(LINE_WIDTH);
        for c in chars {
            self.data(c as u8)?;
        }
        Ok(())
    }

    fn command(&mut self, value: u8) -> Result<(), HalError> {
        self.send(value, 0)
    }

    fn data(&mut self, value: u8) -> Result<(), HalError> {
        self.send(value, RS)
    }

    fn send(&mut self, value: u8, mode: u8) -> Result<(), HalError> {
        self.write_nibble((value & 0xF0) | mode)?;
        self.write_nibble(((value << 4) & 0xF0) | mode)
    }

    fn write_nibble(&mut self, bits: u8) -> Result<(), HalError> {
        self.expander_write(bits | ENABLE)?;
        thread::sleep(Duration::from_micros(1));
        self.expander_write(bits)?;
        thread::sleep(Duration::from_micros(50));
        Ok(())
    }

    fn expander_write(&mut self, bits: u8) -> Result<(), HalError> {
        let backlight = if self.backlight { BACKLIGHT } else { 0 };
        self.dev.write_byte(bits | backlight)
    }
}

impl<D: I2cDevice> Display for Lcd1602<D> {
    fn render(&mut self, lines: &[String], _alarm_active: bool) -> Result<(), HalError> {
        for row in 0..ROW_OFFSETS.len() {
            let text = lines.get(row).map(String::as_str).unwrap_or("");
            self.write_line(row, text)?;
        }
        Ok(())
    }
}

impl<D: I2cDevice> Drop for Lcd1602<D> {
    fn drop(&mut self) {
        let result = self.clear().and_then(|_| self.set_backlight(false));
        if let Err(e) = result {
            warn!("LCD shutdown failed: {}", e);
        }
    }
}
