//! # Terminal Plot
//!
//! Renders the rolling distance and threshold series as an ASCII chart, one
//! column per sample, oldest on the left. Distance is drawn with `•`, the
//! threshold with `─`, and `X` marks columns where the two share a row.

use crate::hal::{HalError, Plot};
use std::io::Write;

const Y_AXIS_WIDTH: usize = 7; // Space for Y-axis labels

/// Render both series into a grid of `rows` lines plus a legend line.
pub fn draw_ascii(distances: &[f32], thresholds: &[f32], rows: usize) -> String {
    let rows = rows.max(2);
    let columns = distances.len().min(thresholds.len());
    if columns == 0 {
        return "(no samples yet)\n".to_string();
    }

    let (min_cm, max_cm) = distances[..columns]
        .iter()
        .chain(&thresholds[..columns])
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &v| {
            (min.min(v), max.max(v))
        });
    // Flat series still need a non-zero span
    let span = (max_cm - min_cm).max(1.0);

    let value_to_row = |cm: f32| {
        let normalized = (cm - min_cm) / span;
        ((1.0 - normalized) * (rows as f32 - 1.0)).round() as usize
    };

    let mut grid = vec![vec![' '; columns + Y_AXIS_WIDTH]; rows];

    // Top and bottom labels only, the LCD already shows exact values
    for (row, value) in [(0, min_cm + span), (rows - 1, min_cm)] {
        let label = format!("{:>width$.1}", value, width = Y_AXIS_WIDTH - 1);
        for (i, ch) in label.chars().take(Y_AXIS_WIDTH - 1).enumerate() {
            grid[row][i] = ch;
        }
    }
    for line in grid.iter_mut() {
        line[Y_AXIS_WIDTH - 1] = '│';
    }

    for column in 0..columns {
        let grid_column = column + Y_AXIS_WIDTH;
        let d_row = value_to_row(distances[column]);
        let t_row = value_to_row(thresholds[column]);
        grid[t_row][grid_column] = '─';
        grid[d_row][grid_column] = if d_row == t_row { 'X' } else { '•' };
    }

    let mut out = String::new();
    for line in grid {
        out.push_str(&line.into_iter().collect::<String>());
        out.push('\n');
    }
    out.push_str(&format!(
        "{}• distance  ─ threshold  ({} samples)\n",
        " ".repeat(Y_AXIS_WIDTH),
        columns
    ));
    out
}

/// Plot collaborator that redraws the chart on a terminal.
pub struct TerminalPlot<W> {
    out: W,
    rows: usize,
}

impl TerminalPlot<std::io::Stdout> {
    pub fn stdout(rows: usize) -> Self {
        Self::new(std::io::stdout(), rows)
    }
}

impl<W: Write> TerminalPlot<W> {
    pub fn new(out: W, rows: usize) -> Self {
        Self { out, rows }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Plot for TerminalPlot<W> {
    fn update(&mut self, distances: &[f32], thresholds: &[f32]) -> Result<(), HalError> {
        let chart = draw_ascii(distances, thresholds, self.rows);
        self.out
            .write_all(chart.as_bytes())
            .and_then(|_| self.out.flush())
            .map_err(|e| HalError::new(e.to_string()))
    }
}

/// Plot that discards every update (plot disabled in config).
pub struct NoPlot;

impl Plot for NoPlot {
    fn update(&mut self, _distances: &[f32], _thresholds: &[f32]) -> Result<(), HalError> {
        Ok(())
    }
}
