use alloc::sync::Arc;

use log::trace;
use rust_decimal::Decimal;

use crate::{
    Feature, FeatureKind, SharedObservation,
    observation::any_in_window,
    utils::{Max, Min, MonotonicQueue, OrderPolicy},
};

/// Binds an [`OrderPolicy`] to the feature it produces
pub trait ExtremumPolicy: OrderPolicy<Decimal> {
    /// The statistic produced under this policy
    const KIND: FeatureKind;
    /// Value reported before any observation arrived
    const INITIAL: Decimal;
}

impl ExtremumPolicy for Max {
    const KIND: FeatureKind = FeatureKind::Max;
    const INITIAL: Decimal = Decimal::ZERO;
}

impl ExtremumPolicy for Min {
    const KIND: FeatureKind = FeatureKind::Min;
    const INITIAL: Decimal = Decimal::MAX;
}

/// # Rolling extremum over a trailing time window
///
/// Tracks the minimum or maximum with a monotonic deque: expired observations
/// leave from the front, dominated ones from the back, and the front is the
/// current extremum. Updates are amortized O(1) per observation.
///
/// Extrema have no meaningful retraction, so this feature does not go through
/// [`RunningFeature`](crate::RunningFeature). When the window empties with
/// nothing to replace it, the last value is held.
///
/// [`Feature::amount`] counts the candidates still in the deque, not every
/// in-window observation: a maximum over `3, 19, 21, 17` keeps `21, 17` and
/// reports 2.
///
/// # Type Parameters
///
/// * `O` - [`Max`] or [`Min`]
#[derive(Debug, Clone)]
pub struct Extremum<O> {
    queue: MonotonicQueue<O>,
    value: Decimal,
}

/// Rolling maximum over a trailing time window
///
/// # Examples
///
/// ```
/// # use rolling_features::{Feature, MaxFeature, Observation};
/// # use rust_decimal::Decimal;
/// let mut max = MaxFeature::new(5000);
/// let batch = [
///     Observation::shared(Decimal::from(15), 132312),
///     Observation::shared(Decimal::from(1231), 134312),
/// ];
/// max.update(134312, &batch);
/// assert_eq!(max.value(), Decimal::from(1231));
///
/// // everything expired and nothing new: the last value is held
/// max.update(139313, &[]);
/// assert_eq!(max.value(), Decimal::from(1231));
/// ```
pub type MaxFeature = Extremum<Max>;

/// Rolling minimum over a trailing time window
pub type MinFeature = Extremum<Min>;

impl<O: ExtremumPolicy> Extremum<O> {
    /// Creates a new extremum over a window of `window` seconds
    pub fn new(window: u64) -> Self {
        Self {
            queue: MonotonicQueue::new(window),
            value: O::INITIAL,
        }
    }

    /// Returns the observation currently holding the extremum
    #[inline]
    pub fn front(&self) -> Option<&SharedObservation> {
        self.queue.front()
    }

    /// Advances the feature, see [`Feature::update`]
    pub fn update(&mut self, now: u64, batch: &[SharedObservation]) -> &mut Self {
        let window = self.queue.window();
        if !any_in_window(now, window, batch) && !self.queue.has_expired(now) {
            return self;
        }

        let evicted = self.queue.remove_expired_elements(now);

        for obs in batch.iter().filter(|obs| obs.is_in_window(now, window)) {
            self.queue.push(Arc::clone(obs));
        }

        if let Some(front) = self.queue.front() {
            self.value = front.value;
        }

        trace!(
            "{} {window}s: at {now} evicted {evicted}, {} candidates, value {}",
            O::KIND,
            self.queue.len(),
            self.value
        );
        self
    }
}

impl<O: ExtremumPolicy> Feature for Extremum<O> {
    fn update(&mut self, now: u64, batch: &[SharedObservation]) {
        Extremum::update(self, now, batch);
    }

    fn value(&self) -> Decimal {
        self.value
    }

    /// Number of candidates retained in the deque, dominated observations excluded
    fn amount(&self) -> u64 {
        self.queue.len() as u64
    }

    fn window(&self) -> u64 {
        self.queue.window()
    }

    fn kind(&self) -> FeatureKind {
        O::KIND
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Observation;

    fn obs(value: i64, timestamp: u64) -> SharedObservation {
        Observation::shared(Decimal::from(value), timestamp)
    }

    #[test]
    fn test_initial_values() {
        assert_eq!(MaxFeature::new(10).value(), Decimal::ZERO);
        assert_eq!(MinFeature::new(10).value(), Decimal::MAX);
        assert_eq!(MinFeature::new(10).kind(), FeatureKind::Min);
        assert_eq!(MaxFeature::new(10).kind(), FeatureKind::Max);
    }

    #[test]
    fn test_max_get_value() {
        let cases = [
            ([obs(15, 132312), obs(1231, 134312)], 1231, 134312),
            ([obs(15000, 132312), obs(1231, 134312)], 15000, 134313),
        ];

        for (batch, expected, now) in cases {
            let mut max = MaxFeature::new(5000);
            max.update(now, &batch);
            assert_eq!(max.value(), Decimal::from(expected));
        }
    }

    #[test]
    fn test_max_holds_when_everything_expires() {
        let mut max = MaxFeature::new(5000);
        max.update(134312, &[obs(15, 132312), obs(1231, 134312)]);
        assert_eq!(max.amount(), 1);

        max.update(137313, &[]);
        assert_eq!(max.value(), Decimal::from(1231));

        max.update(139312, &[]);
        assert_eq!(max.value(), Decimal::from(1231));
        assert_eq!(max.amount(), 0);
        assert!(max.front().is_none());
    }

    #[test]
    fn test_min_get_value() {
        let mut min = MinFeature::new(5000);
        let mut narrow = MinFeature::new(1);

        min.update(134312, &[obs(15, 132312), obs(1231, 134312)]);
        assert_eq!(min.value(), Decimal::from(15));

        min.update(137312, &[obs(14, 136312)]);
        assert_eq!(min.value(), Decimal::from(14));

        min.update(138312, &[obs(15, 137313)]);
        assert_eq!(min.value(), Decimal::from(14));

        narrow.update(137313, &[obs(20, 137313)]);
        assert_eq!(narrow.value(), Decimal::from(20));

        min.update(137313, &[]);
        assert_eq!(min.value(), Decimal::from(14));
    }

    #[test]
    fn test_expired_extremum_is_replaced() {
        let mut max = MaxFeature::new(10);
        max.update(100, &[obs(9, 95), obs(3, 98), obs(5, 100)]);
        assert_eq!(max.value(), Decimal::from(9));

        // 9@95 expires at 105 without new data
        max.update(105, &[]);
        assert_eq!(max.value(), Decimal::from(5));
        assert_eq!(max.front().unwrap().timestamp, 100);
    }

    #[test]
    fn test_amount_counts_candidates() {
        let batch = [obs(3, 200), obs(19, 250), obs(21, 300), obs(17, 350)];
        let mut max = MaxFeature::new(3600);
        let mut min = MinFeature::new(3600);
        max.update(350, &batch);
        min.update(350, &batch);

        // 3 and 19 are dominated by 21
        assert_eq!(max.value(), Decimal::from(21));
        assert_eq!(max.amount(), 2);
        // every later value is above 3, and 17 undercuts 19 and 21
        assert_eq!(min.value(), Decimal::from(3));
        assert_eq!(min.amount(), 2);
    }

    #[test]
    fn test_stale_batch_is_ignored() {
        let mut min = MinFeature::new(10);
        min.update(100, &[obs(7, 100)]);
        min.update(101, &[obs(1, 50)]);
        assert_eq!(min.value(), Decimal::from(7));
        assert_eq!(min.amount(), 1);
    }
}
