use rust_decimal::Decimal;

use crate::{FeatureKind, SharedObservation};

/// A continuously recomputed scalar over one trailing time window
///
/// Implementors own all of their state, so distinct features can be updated
/// from distinct threads without coordination.
pub trait Feature {
    /// Advances the feature to `now` with a timestamp-ascending batch.
    ///
    /// Observations outside the window are ignored. A batch contributing
    /// nothing leaves the last value in place.
    fn update(&mut self, now: u64, batch: &[SharedObservation]);

    /// Returns the current value
    fn value(&self) -> Decimal;

    /// Returns the number of observations currently backing the value.
    ///
    /// For running statistics this is the count of in-window contributors.
    /// For extrema it is the count of candidates kept by the monotonic deque,
    /// which drops dominated observations and can be smaller than the number
    /// of observations in the window.
    fn amount(&self) -> u64;

    /// Returns the window duration in seconds
    fn window(&self) -> u64;

    /// Returns the statistic this feature maintains
    fn kind(&self) -> FeatureKind;
}
