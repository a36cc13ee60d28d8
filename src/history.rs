//! # Rolling Sample History
//!
//! Fixed-capacity FIFO of the most recent [`Sample`]s. The ranging task is the
//! only writer; the display tick copies it out once per refresh. The lock is
//! held only for the push or the copy, never while talking to hardware.

use crate::Sample;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Samples kept when no capacity is configured (10 s at 200 ms per sample).
pub const DEFAULT_CAPACITY: usize = 50;

pub struct HistoryBuffer {
    samples: Mutex<VecDeque<Sample>>,
    capacity: usize,
}

impl HistoryBuffer {
    /// Create an empty buffer. A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Sample>> {
        self.samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Push a sample, evicting the oldest one when full.
    pub fn append(&self, sample: Sample) {
        let mut samples = self.lock();
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(sample);
    }

    /// Point-in-time copy, oldest first.
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            samples: self.lock().iter().copied().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Owned copy of the history taken under one lock acquisition.
#[derive(Clone, Debug, Default)]
pub struct HistorySnapshot {
    samples: Vec<Sample>,
}

impl HistorySnapshot {
    /// Every sample in the window, oldest first.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn distances(&self) -> Vec<f32> {
        self.samples.iter().map(|s| s.distance_cm).collect()
    }

    pub fn thresholds(&self) -> Vec<f32> {
        self.samples.iter().map(|s| s.threshold_cm).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn sample(i: usize) -> Sample {
        Sample {
            distance_cm: i as f32,
            threshold_cm: (i * 2) as f32,
            taken_at: Instant::now(),
        }
    }

    #[test]
    fn test_empty_snapshot() {
        let history = HistoryBuffer::default();
        assert!(history.is_empty());
        assert_eq!(history.capacity, DEFAULT_CAPACITY);
        assert!(history.snapshot().latest().is_none());
    }

    #[test]
    fn test_overflow_keeps_last_n_in_order() {
        let history = HistoryBuffer::new(50);
        let appended: Vec<Sample> = (0..55).map(sample).collect();
        for s in &appended {
            history.append(*s);
        }

        let snapshot = history.snapshot();
        assert_eq!(snapshot.len(), 50);
        assert_eq!(snapshot.samples(), &appended[5..55]);
        assert_eq!(snapshot.latest().unwrap().distance_cm, 54.0);
    }

    #[test]
    fn test_length_bounded_for_any_count() {
        for capacity in [1, 3, 50] {
            let history = HistoryBuffer::new(capacity);
            for i in 0..(capacity * 3) {
                history.append(sample(i));
                assert!(history.len() <= capacity);
                assert_eq!(history.len(), (i + 1).min(capacity));
            }
        }
    }

    #[test]
    fn test_series_stay_aligned() {
        let history = HistoryBuffer::new(4);
        for i in 0..9 {
            history.append(sample(i));
        }
        let snapshot = history.snapshot();
        let distances = snapshot.distances();
        let thresholds = snapshot.thresholds();
        assert_eq!(distances.len(), thresholds.len());
        for (d, t) in distances.iter().zip(&thresholds) {
            assert_eq!(*t, d * 2.0);
        }
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let history = HistoryBuffer::new(0);
        history.append(sample(1));
        history.append(sample(2));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_concurrent_snapshots_are_consistent() {
        let history = Arc::new(HistoryBuffer::new(50));
        let writer = {
            let history = history.clone();
            thread::spawn(move || {
                for i in 0..5000 {
                    history.append(sample(i));
                }
            })
        };

        for _ in 0..500 {
            let snapshot = history.snapshot();
            assert!(snapshot.len() <= 50);
            // Consecutive samples: never a torn or reordered copy
            for pair in snapshot.distances().windows(2) {
                assert_eq!(pair[1], pair[0] + 1.0);
            }
        }
        writer.join().unwrap();
    }
}
