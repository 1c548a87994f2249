//! Fixed-capacity rolling time series.

use crate::error::{Result, TelemetryError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One timestamped sample. `t` is seconds elapsed since the engine started.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    pub t: f64,
    pub value: f64,
}

/// Circular buffer of samples for one channel.
///
/// Appending to a full store evicts exactly the oldest sample. Nothing else
/// ever removes a sample, and the capacity is fixed at construction.
#[derive(Debug, Clone)]
pub struct RollingSeriesStore {
    capacity: usize,
    samples: VecDeque<Sample>,
}

impl RollingSeriesStore {
    /// Create an empty store. A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a sample, evicting the oldest one when full.
    ///
    /// Timestamps must be non-decreasing; an older timestamp is rejected and
    /// the store is left untouched.
    pub fn append(&mut self, timestamp: f64, value: f64) -> Result<()> {
        if let Some(latest) = self.samples.back() {
            if timestamp < latest.t {
                return Err(TelemetryError::OutOfOrderSample {
                    timestamp,
                    latest: latest.t,
                });
            }
        }

        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample { t: timestamp, value });
        Ok(())
    }

    /// Ordered copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<Sample> {
        self.samples.back().copied()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
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

    #[test]
    fn test_append_below_capacity() {
        let mut store = RollingSeriesStore::new(4);
        store.append(0.0, 10.0).unwrap();
        store.append(1.0, 20.0).unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0], Sample { t: 0.0, value: 10.0 });
        assert_eq!(store.latest(), Some(Sample { t: 1.0, value: 20.0 }));
    }

    #[test]
    fn test_overflow_evicts_oldest_first() {
        let capacity = 5;
        let mut store = RollingSeriesStore::new(capacity);
        for i in 0..12 {
            store.append(i as f64, i as f64 * 2.0).unwrap();
            assert!(store.len() <= capacity);
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), capacity);
        // Earliest retained sample is the capacity-th most recent append
        assert_eq!(snapshot[0].t, 7.0);
        assert_eq!(snapshot[capacity - 1].t, 11.0);
        assert!(snapshot.windows(2).all(|w| w[0].t <= w[1].t));
    }

    #[test]
    fn test_equal_timestamps_are_accepted() {
        let mut store = RollingSeriesStore::new(3);
        store.append(2.0, 1.0).unwrap();
        assert!(store.append(2.0, 2.0).is_ok());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_out_of_order_sample_is_rejected() {
        let mut store = RollingSeriesStore::new(3);
        store.append(5.0, 1.0).unwrap();
        let err = store.append(4.0, 2.0).unwrap_err();
        assert!(matches!(err, TelemetryError::OutOfOrderSample { .. }));
        assert_eq!(store.snapshot(), vec![Sample { t: 5.0, value: 1.0 }]);
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let mut store = RollingSeriesStore::new(2);
        store.append(0.0, 1.0).unwrap();
        let before = store.snapshot();
        store.append(1.0, 2.0).unwrap();
        store.append(2.0, 3.0).unwrap();
        assert_eq!(before, vec![Sample { t: 0.0, value: 1.0 }]);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut store = RollingSeriesStore::new(0);
        assert_eq!(store.capacity(), 1);
        store.append(0.0, 1.0).unwrap();
        store.append(1.0, 2.0).unwrap();
        assert_eq!(store.snapshot(), vec![Sample { t: 1.0, value: 2.0 }]);
    }
}
