use alloc::sync::Arc;

use core::fmt;

use rust_decimal::Decimal;

/// A single timestamped decimal sample.
///
/// Observations are immutable once created and are shared between buckets,
/// histories and deques as [`SharedObservation`]. Invalidation compares them
/// by identity, never by value, so the same value at the same timestamp fed
/// twice is two distinct observations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Sample value
    pub value: Decimal,
    /// Logical timestamp in seconds
    pub timestamp: u64,
}

/// Reference-counted handle to an [`Observation`]
pub type SharedObservation = Arc<Observation>;

impl Observation {
    /// Creates a new observation
    ///
    /// # Arguments
    ///
    /// * `value` - The sample value
    /// * `timestamp` - The logical timestamp in seconds
    ///
    /// # Returns
    ///
    /// * `Self` - The observation
    pub const fn new(value: Decimal, timestamp: u64) -> Self {
        Self { value, timestamp }
    }

    /// Creates a new observation already wrapped for sharing
    pub fn shared(value: Decimal, timestamp: u64) -> SharedObservation {
        Arc::new(Self::new(value, timestamp))
    }

    /// Returns true if the observation lies within `window` seconds of `now`,
    /// in either direction
    #[inline]
    pub const fn is_in_window(&self, now: u64, window: u64) -> bool {
        self.timestamp.abs_diff(now) <= window
    }

    /// Returns true if the observation is strictly older than the lower edge
    /// of the window ending at `now`
    #[inline]
    pub const fn is_before_window(&self, now: u64, window: u64) -> bool {
        (self.timestamp as u128) + (window as u128) < now as u128
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.timestamp, self.value)
    }
}

/// Returns true if at least one observation of `batch` is in the window
/// ending at `now`
#[inline]
pub fn any_in_window(now: u64, window: u64, batch: &[SharedObservation]) -> bool {
    batch.iter().any(|obs| obs.is_in_window(now, window))
}

/// Lower edge of the window ending at `now`, saturating at zero
#[inline]
pub const fn window_start(now: u64, window: u64) -> u64 {
    now.saturating_sub(window)
}
