//! Hardware provisioning
//! Opens GPIO, detects the ADC and the LCD expander, and assembles the rig.
//! Any failure here aborts startup before a single activity runs.

#[cfg(all(target_os = "linux", feature = "hardware"))]
pub mod hardware {
    use crate::gpio_rppal::{RppalInputPin, RppalOutputPin};
    use crate::i2c_rppal::RppalI2c;
    use proximity_alarm_lib::adc::I2cAdc;
    use proximity_alarm_lib::config::Config;
    use proximity_alarm_lib::hal::{Level, Plot, ProvisioningError};
    use proximity_alarm_lib::lcd1602::Lcd1602;
    use proximity_alarm_lib::plot::{NoPlot, TerminalPlot};
    use proximity_alarm_lib::scheduler::Rig;
    use rppal::gpio::Gpio;
    use tracing::info;

    fn gpio_err(e: rppal::gpio::Error) -> ProvisioningError {
        ProvisioningError::Gpio(e.to_string())
    }

    fn bus() -> Result<RppalI2c, ProvisioningError> {
        RppalI2c::new().map_err(|e| ProvisioningError::Bus(e.to_string()))
    }

    pub fn provision(config: &Config) -> Result<Rig, ProvisioningError> {
        let pins = &config.pins;
        info!(
            trigger = pins.trigger,
            echo = pins.echo,
            buzzer = pins.buzzer,
            button = pins.button,
            "provisioning GPIO (BCM numbering)"
        );

        let gpio = Gpio::new().map_err(gpio_err)?;
        let trigger = RppalOutputPin::new(&gpio, pins.trigger).map_err(gpio_err)?;
        let echo = RppalInputPin::new(&gpio, pins.echo).map_err(gpio_err)?;
        let buzzer = RppalOutputPin::new(&gpio, pins.buzzer).map_err(gpio_err)?;
        let (button, button_active) = if pins.button_active_low {
            (RppalInputPin::with_pullup(&gpio, pins.button), Level::Low)
        } else {
            (RppalInputPin::with_pulldown(&gpio, pins.button), Level::High)
        };
        let button = button.map_err(gpio_err)?;

        let adc = I2cAdc::detect(bus()?, &config.i2c.adc_addresses)?;
        let lcd = Lcd1602::detect(bus()?, &config.i2c.lcd_addresses)?;

        let plot: Box<dyn Plot + Send> = if config.display.plot {
            Box::new(TerminalPlot::stdout(config.display.plot_rows))
        } else {
            Box::new(NoPlot)
        };

        Ok(Rig {
            trigger: Box::new(trigger),
            echo: Box::new(echo),
            buzzer: Box::new(buzzer),
            button: Box::new(button),
            button_active,
            adc: Box::new(adc),
            display: Box::new(lcd),
            plot,
        })
    }
}

#[cfg(not(all(target_os = "linux", feature = "hardware")))]
pub mod hardware {
    use proximity_alarm_lib::config::Config;
    use proximity_alarm_lib::hal::ProvisioningError;
    use proximity_alarm_lib::scheduler::Rig;

    pub fn provision(_config: &Config) -> Result<Rig, ProvisioningError> {
        Err(ProvisioningError::Gpio(
            "hardware support not compiled in; rebuild with --features hardware or use --stdout"
                .to_string(),
        ))
    }
}
