//! # Latched Proximity Alarm
//!
//! The alarm enters `Triggered` as soon as a distance sample falls below the
//! threshold and stays there until [`AlarmController::reset`] is called.
//! Recovering distance never clears it.
//!
//! The buzzer pin lives inside the same mutex as the state, so every reader
//! of [`AlarmStatus`] sees the state together with the level last written to
//! the buzzer. A reset racing with a breach either lands before it (the
//! breach re-triggers) or after it (buzzer lowered); it can never leave the
//! buzzer sounding under an `Idle` state.

use crate::hal::{DigitalOutput, Level};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AlarmState {
    #[default]
    Idle,
    Triggered,
}

impl AlarmState {
    pub fn is_triggered(self) -> bool {
        self == AlarmState::Triggered
    }
}

/// State and buzzer level observed together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlarmStatus {
    pub state: AlarmState,
    pub buzzer_on: bool,
}

/// Next state for a sample. Breach triggers, anything else keeps the latch.
pub fn decide(current: AlarmState, distance_cm: f32, threshold_cm: f32) -> AlarmState {
    if distance_cm < threshold_cm {
        AlarmState::Triggered
    } else {
        current
    }
}

struct Inner<B> {
    state: AlarmState,
    buzzer: B,
    buzzer_on: bool,
}

impl<B: DigitalOutput> Inner<B> {
    /// Drive the buzzer to match the state. Retried on every call until the
    /// pin accepts the write.
    fn sync_buzzer(&mut self) {
        let want_on = self.state.is_triggered();
        if self.buzzer_on == want_on {
            return;
        }
        match self.buzzer.set(Level::from(want_on)) {
            Ok(()) => self.buzzer_on = want_on,
            Err(e) => error!(want_on, "buzzer write failed: {}", e),
        }
    }
}

pub struct AlarmController<B> {
    inner: Mutex<Inner<B>>,
    triggers: Arc<AtomicU64>,
}

impl<B: DigitalOutput> AlarmController<B> {
    /// Start in `Idle` with the buzzer driven low.
    pub fn new(mut buzzer: B) -> Self {
        if let Err(e) = buzzer.set(Level::Low) {
            warn!("could not lower buzzer at startup: {}", e);
        }
        Self {
            inner: Mutex::new(Inner {
                state: AlarmState::Idle,
                buzzer,
                buzzer_on: false,
            }),
            triggers: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Count every Idle to Triggered edge into `triggers`.
    pub fn with_trigger_counter(mut self, triggers: Arc<AtomicU64>) -> Self {
        self.triggers = triggers;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner<B>> {
        // buzzer_on is only committed after a successful write, so a
        // poisoned guard still holds a consistent pair.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Feed one sample through the latch and return the resulting state.
    pub fn evaluate(&self, distance_cm: f32, threshold_cm: f32) -> AlarmState {
        let mut inner = self.lock();
        let next = decide(inner.state, distance_cm, threshold_cm);
        if next != inner.state {
            // One count per Idle to Triggered edge, under the state lock
            self.triggers.fetch_add(1, Ordering::Relaxed);
            info!(distance_cm, threshold_cm, "alarm triggered");
        }
        inner.state = next;
        inner.sync_buzzer();
        next
    }

    /// Clear the latch and silence the buzzer. Idempotent.
    pub fn reset(&self) {
        let mut inner = self.lock();
        if inner.state.is_triggered() {
            info!("alarm reset");
        }
        inner.state = AlarmState::Idle;
        inner.sync_buzzer();
    }

    pub fn state(&self) -> AlarmState {
        self.lock().state
    }

    pub fn status(&self) -> AlarmStatus {
        let inner = self.lock();
        AlarmStatus {
            state: inner.state,
            buzzer_on: inner.buzzer_on,
        }
    }
}
