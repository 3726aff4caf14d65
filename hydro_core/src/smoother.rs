//! Fixed-window moving average over a circular buffer.

/// Running mean of the last `capacity` samples.
///
/// Invariant: `average()` is the arithmetic mean of exactly
/// `min(recorded, capacity)` most recent samples and is `None` until the
/// first sample. Callers must filter non-finite readings before `record`.
#[derive(Debug, Clone)]
pub struct SignalSmoother {
    buf: Vec<f32>,
    capacity: usize,
    // Next slot to overwrite
    head: usize,
    filled: usize,
    // Running sum in f64 to keep long runs from drifting
    sum: f64,
}

impl SignalSmoother {
    /// Capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: vec![0.0; capacity],
            capacity,
            head: 0,
            filled: 0,
            sum: 0.0,
        }
    }

    /// Append a sample, evicting the oldest once full, and return the new mean.
    pub fn record(&mut self, sample: f32) -> f32 {
        debug_assert!(sample.is_finite(), "non-finite sample reached smoother");
        if self.filled == self.capacity {
            self.sum -= f64::from(self.buf[self.head]);
        } else {
            self.filled += 1;
        }
        self.buf[self.head] = sample;
        self.sum += f64::from(sample);
        self.head = (self.head + 1) % self.capacity;
        // Recompute from the buffer once per wrap so rounding error cannot accumulate
        if self.head == 0 {
            self.sum = self.buf.iter().map(|&v| f64::from(v)).sum();
        }
        (self.sum / self.filled as f64) as f32
    }

    pub fn average(&self) -> Option<f32> {
        (self.filled > 0).then(|| (self.sum / self.filled as f64) as f32)
    }

    /// Number of valid samples, at most `capacity`.
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn reset(&mut self) {
        self.buf.iter_mut().for_each(|v| *v = 0.0);
        self.head = 0;
        self.filled = 0;
        self.sum = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_has_no_average() {
        let s = SignalSmoother::new(4);
        assert_eq!(s.average(), None);
        assert!(s.is_empty());
    }

    #[test]
    fn partial_fill_uses_fill_count() {
        let mut s = SignalSmoother::new(4);
        assert_eq!(s.record(2.0), 2.0);
        assert_eq!(s.record(4.0), 3.0);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn wrap_evicts_oldest() {
        let mut s = SignalSmoother::new(3);
        s.record(1.0);
        s.record(2.0);
        s.record(3.0);
        assert_eq!(s.record(10.0), 5.0); // (2+3+10)/3
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn zero_capacity_clamps_to_one() {
        let mut s = SignalSmoother::new(0);
        assert_eq!(s.capacity(), 1);
        s.record(7.0);
        assert_eq!(s.record(9.0), 9.0);
    }

    #[test]
    fn reset_clears_history() {
        let mut s = SignalSmoother::new(3);
        s.record(5.0);
        s.reset();
        assert_eq!(s.average(), None);
        assert_eq!(s.record(1.0), 1.0);
    }
}
