//! # Status Display
//!
//! Builds the two status lines shown on the 16x2 LCD (or the console in
//! development mode) from one consistent frame of shared state.

use crate::alarm::AlarmStatus;
use crate::hal::{Display, HalError};
use crate::history::HistorySnapshot;
use chrono::Local;
use std::io::Write;

/// Width of one LCD line in characters
pub const LINE_WIDTH: usize = 16;

/// Everything one display tick needs, captured together.
#[derive(Clone, Debug)]
pub struct DisplayFrame {
    pub alarm: AlarmStatus,
    pub history: HistorySnapshot,
    /// Live threshold from the potentiometer, shown until the first sample
    pub threshold_cm: f32,
}

impl DisplayFrame {
    /// "D:12.3 | T:45.6" and, while the alarm is latched, a warning line.
    ///
    /// Distance and threshold come from the same sample, so the pair shown
    /// is the one the alarm judged.
    pub fn lines(&self) -> Vec<String> {
        let (distance, threshold_cm) = match self.history.latest() {
            Some(sample) => (format!("{:.1}", sample.distance_cm), sample.threshold_cm),
            None => ("--.-".to_string(), self.threshold_cm),
        };
        let mut status = format!("D:{} | T:{:.1}", distance, threshold_cm);
        if status.len() > LINE_WIDTH {
            status = format!("D:{}|T:{:.1}", distance, threshold_cm);
        }
        let mut lines = vec![status];
        if self.alarm.state.is_triggered() {
            lines.push("    WARNING!".to_string());
        }
        lines
    }
}

/// Development display that prints each frame with a wall-clock timestamp.
pub struct ConsoleDisplay<W> {
    out: W,
    last: Option<(Vec<String>, bool)>,
}

impl ConsoleDisplay<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out, last: None }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Display for ConsoleDisplay<W> {
    fn render(&mut self, lines: &[String], alarm_active: bool) -> Result<(), HalError> {
        // Only print changes, the tick runs five times a second
        let frame = (lines.to_vec(), alarm_active);
        if self.last.as_ref() == Some(&frame) {
            return Ok(());
        }

        let stamp = Local::now().format("%H:%M:%S");
        let marker = if alarm_active { "!!" } else { "  " };
        writeln!(self.out, "[{}] {} {}", stamp, marker, lines.join(" / "))
            .map_err(|e| HalError::new(e.to_string()))?;
        self.last = Some(frame);
        Ok(())
    }
}
