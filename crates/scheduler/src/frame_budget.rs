//! Slice budget tracking for cooperative rendering
//!
//! A render task runs in slices: it keeps stepping its raster job until the
//! slice budget is spent, then yields back to the host's event loop so scroll
//! and zoom input stays responsive.
//!
//! # Target Frame Times
//! - 120 FPS (ProMotion): 8.33ms per frame
//! - 60 FPS (standard): 16.67ms per frame
//!
//! A budget can additionally cap the number of checkpoints per slice, which
//! makes slice boundaries deterministic regardless of machine speed.

use std::time::{Duration, Instant};

/// Default frame budget for 60 FPS displays (16.67ms)
pub const FRAME_BUDGET_60FPS: Duration = Duration::from_micros(16_667);

/// Frame budget for 120 FPS displays (8.33ms)
pub const FRAME_BUDGET_120FPS: Duration = Duration::from_micros(8_333);

/// Minimum time to reserve for event processing (5ms)
pub const EVENT_PROCESSING_RESERVE: Duration = Duration::from_millis(5);

/// Budget for one cooperative slice of rendering work
///
/// # Example
///
/// ```
/// use pageflow_scheduler::frame_budget::SliceBudget;
///
/// let mut budget = SliceBudget::for_60fps().with_max_checkpoints(2);
///
/// assert!(!budget.should_yield());
/// assert!(!budget.should_yield());
/// assert!(budget.should_yield());
/// ```
#[derive(Debug, Clone)]
pub struct SliceBudget {
    /// When this slice started
    slice_start: Instant,

    /// Total time budget for this slice
    budget: Duration,

    /// Time reserved for event processing
    reserved: Duration,

    /// Optional cap on checkpoints passed per slice
    max_checkpoints: Option<u32>,

    /// Number of yield checks performed
    check_count: u32,
}

impl SliceBudget {
    /// Create a new slice budget
    pub fn new(budget: Duration) -> Self {
        Self {
            slice_start: Instant::now(),
            budget,
            reserved: EVENT_PROCESSING_RESERVE,
            max_checkpoints: None,
            check_count: 0,
        }
    }

    /// Create a slice budget for 60 FPS displays
    pub fn for_60fps() -> Self {
        Self::new(FRAME_BUDGET_60FPS)
    }

    /// Create a slice budget for 120 FPS displays
    pub fn for_120fps() -> Self {
        Self::new(FRAME_BUDGET_120FPS)
    }

    /// Create a slice budget with custom reserve time
    pub fn with_reserved(mut self, reserved: Duration) -> Self {
        self.reserved = reserved;
        self
    }

    /// Let at most `max` checkpoints pass before yielding
    ///
    /// A cap of zero is raised to one so that every slice makes progress.
    pub fn with_max_checkpoints(mut self, max: u32) -> Self {
        self.max_checkpoints = Some(max.max(1));
        self
    }

    /// Reset the budget for a new slice
    pub fn reset(&mut self) {
        self.slice_start = Instant::now();
        self.check_count = 0;
    }

    /// Get the elapsed time since the slice started
    pub fn elapsed(&self) -> Duration {
        self.slice_start.elapsed()
    }

    /// Get the remaining time in this slice's budget
    ///
    /// Returns `Duration::ZERO` if the budget has been exceeded.
    pub fn remaining(&self) -> Duration {
        self.available_budget().saturating_sub(self.elapsed())
    }

    /// Check if the time or checkpoint budget has been exceeded
    pub fn is_exceeded(&self) -> bool {
        if let Some(max) = self.max_checkpoints {
            if self.check_count > max {
                return true;
            }
        }
        self.remaining() == Duration::ZERO
    }

    /// Record a checkpoint and report whether the task should yield
    pub fn should_yield(&mut self) -> bool {
        self.check_count = self.check_count.saturating_add(1);
        self.is_exceeded()
    }

    /// Get the total slice budget
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Get the reserved time
    pub fn reserved(&self) -> Duration {
        self.reserved
    }

    pub fn max_checkpoints(&self) -> Option<u32> {
        self.max_checkpoints
    }

    /// Get the number of yield checks performed
    pub fn check_count(&self) -> u32 {
        self.check_count
    }

    /// Get the available budget (total minus reserved)
    pub fn available_budget(&self) -> Duration {
        self.budget.saturating_sub(self.reserved)
    }
}

impl Default for SliceBudget {
    fn default() -> Self {
        Self::for_60fps()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_slice_budget_creation() {
        let budget = SliceBudget::for_60fps();
        assert_eq!(budget.budget(), FRAME_BUDGET_60FPS);
        assert_eq!(budget.max_checkpoints(), None);

        let budget = SliceBudget::for_120fps();
        assert_eq!(budget.budget(), FRAME_BUDGET_120FPS);

        let custom = SliceBudget::new(Duration::from_millis(10));
        assert_eq!(custom.budget(), Duration::from_millis(10));
    }

    #[test]
    fn test_available_budget_subtracts_reserve() {
        let budget =
            SliceBudget::new(Duration::from_millis(20)).with_reserved(Duration::from_millis(5));

        assert_eq!(budget.available_budget(), Duration::from_millis(15));
        assert!(budget.remaining() > Duration::from_millis(14));
    }

    #[test]
    fn test_checkpoint_cap() {
        let mut budget = SliceBudget::new(Duration::from_secs(10)).with_max_checkpoints(3);

        assert!(!budget.should_yield());
        assert!(!budget.should_yield());
        assert!(!budget.should_yield());
        assert!(budget.should_yield());
        assert_eq!(budget.check_count(), 4);

        budget.reset();
        assert_eq!(budget.check_count(), 0);
        assert!(!budget.should_yield());
    }

    #[test]
    fn test_zero_checkpoint_cap_still_progresses() {
        let mut budget = SliceBudget::for_60fps().with_max_checkpoints(0);
        assert_eq!(budget.max_checkpoints(), Some(1));
        assert!(!budget.should_yield());
        assert!(budget.should_yield());
    }

    #[test]
    fn test_time_budget_exceeded() {
        let mut budget =
            SliceBudget::new(Duration::from_millis(5)).with_reserved(Duration::from_millis(2));

        assert!(!budget.should_yield());

        thread::sleep(Duration::from_millis(4));
        assert!(budget.should_yield());
        assert_eq!(budget.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_reserve_larger_than_budget_is_exhausted() {
        let budget = SliceBudget::new(Duration::from_millis(1));
        assert_eq!(budget.available_budget(), Duration::ZERO);
        assert!(budget.is_exceeded());
    }

    #[test]
    fn test_default_budget() {
        let budget = SliceBudget::default();
        assert_eq!(budget.budget(), FRAME_BUDGET_60FPS);
        assert_eq!(budget.reserved(), EVENT_PROCESSING_RESERVE);
    }
}
