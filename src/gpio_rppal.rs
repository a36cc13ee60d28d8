// src/gpio_rppal.rs
use proximity_alarm_lib::hal::{DigitalInput, DigitalOutput, HalError, Level};
use rppal::gpio::{self, Gpio};

fn to_rppal(level: Level) -> gpio::Level {
    match level {
        Level::Low => gpio::Level::Low,
        Level::High => gpio::Level::High,
    }
}

fn from_rppal(level: gpio::Level) -> Level {
    match level {
        gpio::Level::Low => Level::Low,
        gpio::Level::High => Level::High,
    }
}

/// Output line (trigger, buzzer). rppal restores the pin mode on drop.
pub struct RppalOutputPin {
    pin: gpio::OutputPin,
}

/// Input line (echo, button).
pub struct RppalInputPin {
    pin: gpio::InputPin,
}

impl RppalOutputPin {
    pub fn new(gpio: &Gpio, bcm: u8) -> Result<Self, gpio::Error> {
        let pin = gpio.get(bcm)?.into_output_low();
        Ok(Self { pin })
    }
}

impl RppalInputPin {
    pub fn new(gpio: &Gpio, bcm: u8) -> Result<Self, gpio::Error> {
        let pin = gpio.get(bcm)?.into_input();
        Ok(Self { pin })
    }

    /// Button wired to ground: enable the internal pull-up
    pub fn with_pullup(gpio: &Gpio, bcm: u8) -> Result<Self, gpio::Error> {
        let pin = gpio.get(bcm)?.into_input_pullup();
        Ok(Self { pin })
    }

    /// Button wired to 3V3: enable the internal pull-down
    pub fn with_pulldown(gpio: &Gpio, bcm: u8) -> Result<Self, gpio::Error> {
        let pin = gpio.get(bcm)?.into_input_pulldown();
        Ok(Self { pin })
    }
}

impl DigitalOutput for RppalOutputPin {
    fn set(&mut self, level: Level) -> Result<(), HalError> {
        self.pin.write(to_rppal(level));
        Ok(())
    }
}

impl DigitalInput for RppalInputPin {
    fn read(&mut self) -> Result<Level, HalError> {
        Ok(from_rppal(self.pin.read()))
    }
}
