//! # I2C ADC Drivers
//!
//! The potentiometer sits behind one of two 8-bit ADCs commonly found on Pi
//! starter boards. Which one is fitted is decided once at startup by probing
//! the configured addresses in order.
//!
//! | Chip    | Address | Read sequence                                       |
//! |---------|---------|-----------------------------------------------------|
//! | PCF8591 | 0x48    | two reads of `0x40 + ch`, the first is stale        |
//! | ADS7830 | 0x4B    | one read of `0x84 + (sel(ch) << 4)`, single-ended   |

use crate::hal::{probe, AnalogChannel, HalError, I2cDevice, ProvisioningError};
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdcChip {
    Pcf8591,
    Ads7830,
}

impl AdcChip {
    /// Chip conventionally found at `address`.
    pub fn at_address(address: u16) -> Option<Self> {
        match address {
            0x48 => Some(AdcChip::Pcf8591),
            0x4B => Some(AdcChip::Ads7830),
            _ => None,
        }
    }

    /// Command byte selecting single-ended `channel`.
    pub fn command(self, channel: u8) -> u8 {
        match self {
            AdcChip::Pcf8591 => 0x40 | (channel & 0x03),
            AdcChip::Ads7830 => {
                let select = ((channel << 2) | (channel >> 1)) & 0x07;
                0x84 | (select << 4)
            }
        }
    }
}

pub struct I2cAdc<D> {
    dev: D,
    chip: AdcChip,
    address: u16,
}

impl<D: I2cDevice> I2cAdc<D> {
    /// Probe `addresses` in order and bind to the first ADC that answers.
    pub fn detect(mut dev: D, addresses: &[u16]) -> Result<Self, ProvisioningError> {
        for &address in addresses {
            let Some(chip) = AdcChip::at_address(address) else {
                warn!(address, "no known ADC lives at this address, skipping");
                continue;
            };
            if probe(&mut dev, address) {
                info!(?chip, address = %format!("{:#04x}", address), "ADC detected");
                return Ok(Self { dev, chip, address });
            }
        }
        Err(ProvisioningError::NoAdc {
            tried: addresses.to_vec(),
        })
    }
}

impl<D: I2cDevice> AnalogChannel for I2cAdc<D> {
    fn read(&mut self, channel: u8) -> Result<u16, HalError> {
        let command = self.chip.command(channel);
        let value = match self.chip {
            AdcChip::Pcf8591 => {
                // First byte is the previous conversion
                self.dev.read_byte_data(command)?;
                self.dev.read_byte_data(command)?
            }
            AdcChip::Ads7830 => self.dev.read_byte_data(command)?,
        };
        Ok(value as u16)
    }
}
