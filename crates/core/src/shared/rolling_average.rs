use std::collections::VecDeque;

/// Fixed-capacity latency window with an eagerly maintained mean.
///
/// The window holds at most `capacity` samples; pushing onto a full window
/// evicts the single oldest sample first (FIFO). The mean is recomputed on
/// every mutation, so reads are never stale. An empty window reports 0.
#[derive(Debug)]
pub struct RollingAverage {
    samples: VecDeque<f64>,
    capacity: usize,
    average: f64,
}

impl RollingAverage {
    /// Capacity is clamped to at least 1; a capacity of 1 makes the
    /// average always equal the latest sample.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            average: 0.0,
        }
    }

    pub fn add_sample(&mut self, value: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
        self.recompute();
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.average = 0.0;
    }

    pub fn average(&self) -> f64 {
        self.average
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn recompute(&mut self) {
        self.average = if self.samples.is_empty() {
            0.0
        } else {
            self.samples.iter().sum::<f64>() / self.samples.len() as f64
        };
    }
}
