use std::collections::VecDeque;
use crate::drivers::parser::Sample;
use crate::drivers::PlotterError;
pub const DEFAULT_MAX_POINTS: usize = 100;
pub const MIN_MAX_POINTS: usize = 1;
pub const MAX_MAX_POINTS: usize = 10_000;
/// Rolling window of the most recent samples, oldest first.
pub struct HistoryBuffer {
    samples: VecDeque<Sample>,
    max_points: usize,
    // counts every accepted sample, including evicted ones
    total_count: u64,
}
impl Default for HistoryBuffer {
    fn default() -> Self {
        Self {
            samples: VecDeque::with_capacity(DEFAULT_MAX_POINTS),
            max_points: DEFAULT_MAX_POINTS,
            total_count: 0,
        }
    }
}
impl HistoryBuffer {
    pub fn with_capacity(max_points: usize) -> Result<Self, PlotterError> {
        let mut buffer = Self::default();
        buffer.set_capacity(max_points)?;
        Ok(buffer)
    }
    pub fn max_points(&self) -> usize {
        self.max_points
    }
    pub fn total_count(&self) -> u64 {
        self.total_count
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }
    /// Left edge of the visible X window.
    pub fn window_start(&self) -> u64 {
        self.total_count.saturating_sub(self.max_points as u64)
    }
    pub fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        self.total_count += 1;
        self.evict();
    }
    /// Change the cap; a smaller cap trims the oldest samples right away.
    pub fn set_capacity(&mut self, max_points: usize) -> Result<(), PlotterError> {
        if !(MIN_MAX_POINTS..=MAX_MAX_POINTS).contains(&max_points) {
            return Err(PlotterError::InvalidCapacity {
                min: MIN_MAX_POINTS,
                max: MAX_MAX_POINTS,
                actual: max_points,
            });
        }
        self.max_points = max_points;
        self.evict();
        Ok(())
    }
    pub fn clear(&mut self) {
        self.samples.clear();
        self.total_count = 0;
    }
    fn evict(&mut self) {
        while self.samples.len() > self.max_points {
            self.samples.pop_front();
        }
    }
}
