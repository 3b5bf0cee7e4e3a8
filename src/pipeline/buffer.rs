use crate::models::{Batch, Sample};

/// Upper bound on the capacity reserved up front for a window.
const MAX_PREALLOCATED: usize = 1024;

/// Collects samples until a window closes.
///
/// Windows are counted, not timed: the buffer is full once the running count
/// reaches a positive multiple of `window_size` and at least one sample is
/// held. What counts toward a window depends on the sequence policy, so the
/// driver may also count readings that were never added (see
/// [`BatchBuffer::count_skipped`]).
#[derive(Debug, Clone)]
pub struct BatchBuffer {
    window_size: usize,
    samples: Vec<Sample>,
    counted: u64,
}

impl BatchBuffer {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            samples: Vec::with_capacity(window_size.min(MAX_PREALLOCATED)),
            counted: 0,
        }
    }

    pub fn add(&mut self, sample: Sample) {
        self.samples.push(sample);
        self.counted += 1;
    }

    /// Advances the window count for a reading that was not buffered.
    pub fn count_skipped(&mut self) {
        self.counted += 1;
    }

    pub fn is_full(&self) -> bool {
        let window = self.window_size as u64;
        window > 0 && !self.samples.is_empty() && self.counted % window == 0
    }

    /// Hands off the current contents and starts an empty window. The batch
    /// index is the (1-based) window the latest count falls in.
    pub fn drain(&mut self) -> Batch {
        let window = self.window_size.max(1) as u64;
        let window_index = self.counted.div_ceil(window);
        let next = Vec::with_capacity(self.window_size.min(MAX_PREALLOCATED));
        let samples = std::mem::replace(&mut self.samples, next);
        Batch::new(window_index, samples)
    }

    /// Drops buffered samples without emitting them.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
