//! # Sampling Scheduler
//!
//! Runs the four activities of the alarm on a multi-threaded Tokio runtime:
//!
//! | Activity | Default cadence | Work                                         |
//! |----------|-----------------|----------------------------------------------|
//! | ranging  | 200 ms          | ping → latch evaluation → history append     |
//! | analog   | 100 ms          | potentiometer read → `RawAnalogValue`        |
//! | button   | 100 ms          | reset input poll → `AlarmController::reset`  |
//! | display  | 200 ms          | consistent frame → `Display` + `Plot`        |
//!
//! ## Blocking hardware
//! The echo edge waits spin for up to `2 * echo_timeout`. Ranging and
//! display work therefore run inside `block_in_place`, which hands the
//! worker's other tasks to a different thread for the duration. Analog and
//! button reads are single short bus transactions and run inline.
//!
//! ## Frame consistency
//! A cycle gate (`RwLock<()>`) is write-held by the ranging task while it
//! applies evaluate + append, and read-held by the display tick while it
//! copies alarm status and history. The display therefore never shows a
//! sample without the alarm decision made from it. Neither side holds the
//! gate during hardware I/O.
//!
//! ## Shutdown
//! One `CancellationToken` is shared by every task. Each task checks it
//! between cycles, so all of them stop within one interval. `shutdown`
//! awaits every handle and then resets the alarm, leaving the buzzer low on
//! every exit path.

use crate::alarm::{AlarmController, AlarmStatus};
use crate::analog::{AnalogSampler, RawAnalogValue};
use crate::button::ButtonWatcher;
use crate::config::{AlarmConfig, Config};
use crate::display::DisplayFrame;
use crate::hal::{AnalogChannel, BoxedInput, BoxedOutput, Display, Level, Plot};
use crate::history::HistoryBuffer;
use crate::range_sensor::{RangeSensor, SensorError};
use crate::Sample;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tokio::task::{block_in_place, JoinHandle};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Every provisioned collaborator, ready to be moved into the activities.
pub struct Rig {
    pub trigger: BoxedOutput,
    pub echo: BoxedInput,
    pub buzzer: BoxedOutput,
    pub button: BoxedInput,
    /// Level the button input reads while pressed
    pub button_active: Level,
    pub adc: Box<dyn AnalogChannel + Send>,
    pub display: Box<dyn Display + Send>,
    pub plot: Box<dyn Plot + Send>,
}

/// Counters updated by the activities, read at any time.
#[derive(Debug, Default)]
pub struct CycleStats {
    pub cycles: AtomicU64,
    pub sensor_timeouts: AtomicU64,
    pub sensor_faults: AtomicU64,
    pub analog_failures: Arc<AtomicU64>,
    pub alarm_triggers: Arc<AtomicU64>,
    pub display_ticks: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cycles: u64,
    pub sensor_timeouts: u64,
    pub sensor_faults: u64,
    pub analog_failures: u64,
    pub alarm_triggers: u64,
    pub display_ticks: u64,
}

impl CycleStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            sensor_timeouts: self.sensor_timeouts.load(Ordering::Relaxed),
            sensor_faults: self.sensor_faults.load(Ordering::Relaxed),
            analog_failures: self.analog_failures.load(Ordering::Relaxed),
            alarm_triggers: self.alarm_triggers.load(Ordering::Relaxed),
            display_ticks: self.display_ticks.load(Ordering::Relaxed),
        }
    }
}

/// Handles to the process-wide state, cloned into each activity.
#[derive(Clone)]
pub struct Shared {
    pub alarm: Arc<AlarmController<BoxedOutput>>,
    pub history: Arc<HistoryBuffer>,
    pub raw: Arc<RawAnalogValue>,
    pub stats: Arc<CycleStats>,
    gate: Arc<RwLock<()>>,
    alarm_config: AlarmConfig,
}

impl Shared {
    fn new(config: &Config, buzzer: BoxedOutput) -> Self {
        let stats = Arc::new(CycleStats::default());
        let alarm =
            AlarmController::new(buzzer).with_trigger_counter(stats.alarm_triggers.clone());
        Self {
            alarm: Arc::new(alarm),
            history: Arc::new(HistoryBuffer::new(config.history.capacity)),
            raw: Arc::new(RawAnalogValue::default()),
            stats,
            gate: Arc::new(RwLock::new(())),
            alarm_config: config.alarm.clone(),
        }
    }

    /// Threshold from the latest potentiometer reading.
    pub fn threshold_cm(&self) -> f32 {
        self.alarm_config.threshold_cm(self.raw.load())
    }

    fn write_gate(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_gate(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy alarm status, history and threshold as one consistent frame.
    pub fn frame(&self) -> DisplayFrame {
        let _gate = self.read_gate();
        DisplayFrame {
            alarm: self.alarm.status(),
            history: self.history.snapshot(),
            threshold_cm: self.threshold_cm(),
        }
    }

    pub fn alarm_status(&self) -> AlarmStatus {
        self.alarm.status()
    }
}

/// Ranging + decision + history, one cycle per tick.
pub struct RangingTask {
    sensor: RangeSensor<BoxedOutput, BoxedInput>,
    shared: Shared,
    period: Duration,
}

impl RangingTask {
    pub fn new(
        sensor: RangeSensor<BoxedOutput, BoxedInput>,
        shared: Shared,
        period: Duration,
    ) -> Self {
        Self {
            sensor,
            shared,
            period,
        }
    }

    /// Run one cycle. Blocks for the duration of the ping.
    ///
    /// Returns the appended sample, or `None` when the cycle was skipped.
    pub fn cycle(&mut self) -> Option<Sample> {
        let stats = &self.shared.stats;
        let distance_cm = match self.sensor.measure() {
            Ok(distance_cm) => distance_cm,
            Err(e @ SensorError::Timeout { .. }) => {
                stats.sensor_timeouts.fetch_add(1, Ordering::Relaxed);
                warn!("skipping cycle: {}", e);
                return None;
            }
            Err(e) => {
                stats.sensor_faults.fetch_add(1, Ordering::Relaxed);
                warn!("skipping cycle: {}", e);
                return None;
            }
        };

        let sample = Sample {
            distance_cm,
            threshold_cm: self.shared.threshold_cm(),
            taken_at: Instant::now(),
        };

        {
            let _gate = self.shared.write_gate();
            self.shared
                .alarm
                .evaluate(sample.distance_cm, sample.threshold_cm);
            self.shared.history.append(sample);
        }

        stats.cycles.fetch_add(1, Ordering::Relaxed);
        debug!(
            distance_cm = sample.distance_cm,
            threshold_cm = sample.threshold_cm,
            "ranging cycle"
        );
        Some(sample)
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        info!(period = ?self.period, timeout = ?self.sensor.edge_timeout(), "ranging started");
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    block_in_place(|| self.cycle());
                }
            }
        }
        info!("ranging stopped");
    }
}

/// Periodic consumer pushing frames to the display and plot.
pub struct DisplayTask {
    display: Box<dyn Display + Send>,
    plot: Box<dyn Plot + Send>,
    shared: Shared,
    period: Duration,
}

impl DisplayTask {
    pub fn new(
        display: Box<dyn Display + Send>,
        plot: Box<dyn Plot + Send>,
        shared: Shared,
        period: Duration,
    ) -> Self {
        Self {
            display,
            plot,
            shared,
            period,
        }
    }

    /// Capture one frame and push it out. Collaborator failures skip the
    /// rest of this tick only.
    pub fn tick(&mut self) -> DisplayFrame {
        let frame = self.shared.frame();
        let alarm_active = frame.alarm.state.is_triggered();

        if let Err(e) = self.display.render(&frame.lines(), alarm_active) {
            warn!("display refresh failed: {}", e);
        }
        let distances = frame.history.distances();
        let thresholds = frame.history.thresholds();
        if let Err(e) = self.plot.update(&distances, &thresholds) {
            warn!("plot refresh failed: {}", e);
        }

        self.shared
            .stats
            .display_ticks
            .fetch_add(1, Ordering::Relaxed);
        frame
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        info!(period = ?self.period, "display tick started");
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    block_in_place(|| self.tick());
                }
            }
        }
        info!("display tick stopped");
    }
}

/// Owner of the running activities.
pub struct SamplingScheduler {
    shared: Shared,
    cancel: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl SamplingScheduler {
    /// Spawn all four activities.
    ///
    /// Must be called from within a multi-threaded Tokio runtime; ranging and
    /// display use `block_in_place`, which panics on a current-thread one.
    pub fn start(config: &Config, rig: Rig) -> Self {
        let timing = &config.timing;
        let shared = Shared::new(config, rig.buzzer);
        let cancel = CancellationToken::new();

        let ranging = RangingTask::new(
            RangeSensor::new(rig.trigger, rig.echo, timing.echo_timeout()),
            shared.clone(),
            timing.ranging_interval(),
        );
        let mut analog = AnalogSampler::new(
            rig.adc,
            config.alarm.adc_channel,
            shared.raw.clone(),
            timing.analog_interval(),
        )
        .with_failure_counter(shared.stats.analog_failures.clone());
        let button = ButtonWatcher::new(
            rig.button,
            rig.button_active,
            shared.alarm.clone(),
            timing.button_interval(),
        );
        let display = DisplayTask::new(
            rig.display,
            rig.plot,
            shared.clone(),
            timing.display_interval(),
        );

        // Prime the threshold before any ranging cycle can run
        if let Some(raw) = analog.sample_once() {
            debug!(raw, "initial analog sample");
        }

        let tasks = vec![
            ("analog", tokio::spawn(analog.run(cancel.child_token()))),
            ("button", tokio::spawn(button.run(cancel.child_token()))),
            ("ranging", tokio::spawn(ranging.run(cancel.child_token()))),
            ("display", tokio::spawn(display.run(cancel.child_token()))),
        ];
        info!(activities = tasks.len(), "scheduler started");

        Self {
            shared,
            cancel,
            tasks,
        }
    }

    pub fn shared(&self) -> &Shared {
        &self.shared
    }

    /// Token that stops every activity when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop every activity, wait for all of them and silence the buzzer.
    pub async fn shutdown(self) -> StatsSnapshot {
        info!("shutting down");
        self.cancel.cancel();

        for (name, handle) in self.tasks {
            match handle.await {
                Ok(()) => debug!(task = name, "task joined"),
                Err(e) => error!(task = name, "task ended abnormally: {}", e),
            }
        }

        self.shared.alarm.reset();
        let stats = self.shared.stats.snapshot();
        info!(
            cycles = stats.cycles,
            sensor_timeouts = stats.sensor_timeouts,
            sensor_faults = stats.sensor_faults,
            analog_failures = stats.analog_failures,
            alarm_triggers = stats.alarm_triggers,
            "scheduler stopped"
        );
        stats
    }
}
