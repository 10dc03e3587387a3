use rust_decimal::Decimal;

use crate::{FeatureKind, Observation};

/// An incrementally maintained statistic with symmetric absorb and retract
/// operations, driven by [`RunningFeature`](crate::RunningFeature)
pub trait RunningStatistic {
    /// The statistic this strategy computes
    const KIND: FeatureKind;

    /// Absorbs one observation that entered the window
    fn calculate(&mut self, obs: &Observation);

    /// Removes the effect of one observation that aged out of the window.
    ///
    /// Never called while [`amount`](Self::amount) is one or less.
    fn invalidate(&mut self, obs: &Observation);

    /// Returns to the empty state
    fn reset(&mut self);

    /// Returns the current value
    fn value(&self) -> Decimal;

    /// Returns the number of observations contributing to the value
    fn amount(&self) -> u64;
}
