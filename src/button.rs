//! # Reset Button
//!
//! Polls the reset input and clears the alarm while it is held. There is no
//! edge detection: a held button resets on every poll, which is harmless
//! because `reset` is idempotent.

use crate::alarm::AlarmController;
use crate::hal::{DigitalInput, DigitalOutput, Level};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct ButtonWatcher<I, B> {
    input: I,
    active_level: Level,
    alarm: Arc<AlarmController<B>>,
    period: Duration,
}

impl<I, B> ButtonWatcher<I, B>
where
    I: DigitalInput,
    B: DigitalOutput,
{
    pub fn new(
        input: I,
        active_level: Level,
        alarm: Arc<AlarmController<B>>,
        period: Duration,
    ) -> Self {
        Self {
            input,
            active_level,
            alarm,
            period,
        }
    }

    /// Read the button once, resetting the alarm if it is pressed.
    pub fn poll_once(&mut self) -> bool {
        match self.input.read() {
            Ok(level) if level == self.active_level => {
                debug!("reset button pressed");
                self.alarm.reset();
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!("button read failed: {}", e);
                false
            }
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        info!(active = ?self.active_level, period = ?self.period, "button watcher started");
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.poll_once();
                }
            }
        }
        info!("button watcher stopped");
    }
}
