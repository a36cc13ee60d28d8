//! Scripted and recording fakes shared by the inline unit tests.

use crate::hal::{AnalogChannel, DigitalInput, DigitalOutput, HalError, I2cDevice, Level};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Output pin that records every level written to it.
#[derive(Clone, Default)]
pub struct RecordingOutput {
    pub writes: Arc<Mutex<Vec<Level>>>,
    pub fail: Arc<Mutex<bool>>,
}

impl RecordingOutput {
    pub fn last(&self) -> Option<Level> {
        self.writes.lock().unwrap().last().copied()
    }

    pub fn count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

impl DigitalOutput for RecordingOutput {
    fn set(&mut self, level: Level) -> Result<(), HalError> {
        if *self.fail.lock().unwrap() {
            return Err(HalError::new("stuck pin"));
        }
        self.writes.lock().unwrap().push(level);
        Ok(())
    }
}

/// Input pin that replays a script, then repeats the final level forever.
pub struct ScriptedInput {
    script: VecDeque<Level>,
    last: Level,
}

impl ScriptedInput {
    pub fn new(script: impl IntoIterator<Item = Level>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: Level::Low,
        }
    }

    pub fn constant(level: Level) -> Self {
        Self {
            script: VecDeque::new(),
            last: level,
        }
    }
}

impl DigitalInput for ScriptedInput {
    fn read(&mut self) -> Result<Level, HalError> {
        if let Some(level) = self.script.pop_front() {
            self.last = level;
        }
        Ok(self.last)
    }
}

/// ADC fake returning queued results in order, then repeating the last success.
pub struct ScriptedAdc {
    script: VecDeque<Result<u16, HalError>>,
    last: u16,
}

impl ScriptedAdc {
    pub fn new(script: impl IntoIterator<Item = Result<u16, HalError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: 0,
        }
    }
}

impl AnalogChannel for ScriptedAdc {
    fn read(&mut self, _channel: u8) -> Result<u16, HalError> {
        match self.script.pop_front() {
            Some(Ok(value)) => {
                self.last = value;
                Ok(value)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.last),
        }
    }
}

/// I2C fake: devices present at `present`, every write recorded per address,
/// `read_byte_data` answers from a queue.
#[derive(Default)]
pub struct RecordingBus {
    pub present: Vec<u16>,
    pub address: Option<u16>,
    pub writes: Vec<(u16, u8)>,
    pub commands: Vec<(u16, u8)>,
    pub replies: VecDeque<u8>,
}

impl RecordingBus {
    pub fn with_devices(present: &[u16]) -> Self {
        Self {
            present: present.to_vec(),
            ..Self::default()
        }
    }

    pub fn written_to(&self, address: u16) -> Vec<u8> {
        self.writes
            .iter()
            .filter(|(a, _)| *a == address)
            .map(|(_, b)| *b)
            .collect()
    }

    fn current(&self) -> Result<u16, HalError> {
        match self.address {
            Some(a) if self.present.contains(&a) => Ok(a),
            Some(a) => Err(HalError::new(format!("nack at {:#04x}", a))),
            None => Err(HalError::new("no address selected")),
        }
    }
}

impl I2cDevice for RecordingBus {
    fn set_address(&mut self, address: u16) -> Result<(), HalError> {
        self.address = Some(address);
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), HalError> {
        let address = self.current()?;
        self.writes.push((address, byte));
        Ok(())
    }

    fn read_byte_data(&mut self, command: u8) -> Result<u8, HalError> {
        let address = self.current()?;
        self.commands.push((address, command));
        Ok(self.replies.pop_front().unwrap_or(0))
    }
}

impl I2cDevice for &mut RecordingBus {
    fn set_address(&mut self, address: u16) -> Result<(), HalError> {
        (**self).set_address(address)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), HalError> {
        (**self).write_byte(byte)
    }

    fn read_byte_data(&mut self, command: u8) -> Result<u8, HalError> {
        (**self).read_byte_data(command)
    }
}
