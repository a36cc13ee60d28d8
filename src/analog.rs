//! # Potentiometer Sampling
//!
//! The threshold knob is read continuously on its own cadence. The most
//! recent good reading lives in a [`RawAnalogValue`], an atomic cell that the
//! ranging task and the display tick read without taking any lock.

use crate::hal::AnalogChannel;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Latest raw ADC reading, shared between one writer and many readers.
#[derive(Debug, Default)]
pub struct RawAnalogValue {
    value: AtomicU32,
}

impl RawAnalogValue {
    pub fn new(initial: u16) -> Self {
        Self {
            value: AtomicU32::new(initial as u32),
        }
    }

    pub fn load(&self) -> u16 {
        self.value.load(Ordering::Acquire) as u16
    }

    pub fn store(&self, raw: u16) {
        self.value.store(raw as u32, Ordering::Release);
    }
}

pub struct AnalogSampler<A> {
    adc: A,
    channel: u8,
    value: Arc<RawAnalogValue>,
    period: Duration,
    failures: Arc<AtomicU64>,
}

impl<A: AnalogChannel> AnalogSampler<A> {
    pub fn new(adc: A, channel: u8, value: Arc<RawAnalogValue>, period: Duration) -> Self {
        Self {
            adc,
            channel,
            value,
            period,
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Share a failure counter with the caller (used for cycle statistics).
    pub fn with_failure_counter(mut self, failures: Arc<AtomicU64>) -> Self {
        self.failures = failures;
        self
    }

    /// Read the channel once and publish the result.
    ///
    /// Returns the published value, or `None` when the read failed and the
    /// previous value was kept.
    pub fn sample_once(&mut self) -> Option<u16> {
        match self.adc.read(self.channel) {
            Ok(raw) => {
                self.value.store(raw);
                Some(raw)
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    channel = self.channel,
                    kept = self.value.load(),
                    "analog read failed: {}",
                    e
                );
                None
            }
        }
    }

    /// Sample on a fixed cadence until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(channel = self.channel, period = ?self.period, "analog sampler started");
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Some(raw) = self.sample_once() {
                        debug!(raw, "analog sample");
                    }
                }
            }
        }
        info!("analog sampler stopped");
    }
}
