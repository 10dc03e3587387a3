use alloc::{sync::Arc, vec::Vec};

use log::trace;
use rust_decimal::Decimal;

use crate::{
    Feature, FeatureKind, PersistentList, RunningStatistic, SharedObservation,
    observation::{any_in_window, window_start},
};

/// Expire-then-absorb driver shared by every running statistic.
///
/// Each update first retracts the observations of the private history that
/// aged out of the window, then absorbs the in-window part of the new batch
/// and appends it to the history in one go. The history is a
/// [`PersistentList`] owned by this feature alone.
///
/// When nothing new arrives, the last contributing observation is kept even
/// after it expires, so the feature holds its last value through quiet
/// periods instead of decaying to empty.
#[derive(Debug, Clone)]
pub struct RunningFeature<S> {
    /// Window duration in seconds
    window: u64,
    /// Observations absorbed so far, oldest first. The leading
    /// `history.len() - stat.amount()` entries were already retracted and are
    /// only kept until the next appending update trims them.
    history: PersistentList,
    /// Strategy accumulators
    stat: S,
}

impl<S: RunningStatistic + Default> RunningFeature<S> {
    /// Creates a new feature over a window of `window` seconds
    ///
    /// # Arguments
    ///
    /// * `window` - The window duration in seconds
    ///
    /// # Returns
    ///
    /// * `Self` - The feature with an empty history
    pub fn new(window: u64) -> Self {
        Self::with_statistic(window, S::default())
    }
}

impl<S: RunningStatistic> RunningFeature<S> {
    /// Creates a new feature driving an existing strategy instance
    pub fn with_statistic(window: u64, stat: S) -> Self {
        Self {
            window,
            history: PersistentList::new(),
            stat,
        }
    }

    /// Returns the strategy
    #[inline]
    pub const fn statistic(&self) -> &S {
        &self.stat
    }

    /// Returns the private history handle
    #[inline]
    pub const fn history(&self) -> &PersistentList {
        &self.history
    }

    /// Retracts expired observations, returns how many were retracted
    fn expire(&mut self, now: u64, will_append: bool) -> usize {
        let retired = self.history.len().saturating_sub(self.stat.amount() as usize);
        let mut expired = 0;

        for obs in self.history.iter().skip(retired) {
            if obs.is_in_window(now, self.window) {
                continue;
            }

            if self.stat.amount() == 1 {
                // Last contributor: superseded by fresh data, or held as is
                if will_append {
                    self.stat.reset();
                }
                break;
            }

            self.stat.invalidate(obs);
            expired += 1;
        }

        expired
    }

    /// Advances the feature, see [`Feature::update`]
    pub fn update(&mut self, now: u64, batch: &[SharedObservation]) -> &mut Self {
        let will_append = any_in_window(now, self.window, batch);
        let expired = self.expire(now, will_append);

        if !will_append {
            trace!(
                "{} {}s: no fresh data at {now}, retracted {expired}, holding {}",
                S::KIND,
                self.window,
                self.stat.value()
            );
            return self;
        }

        self.history = self
            .history
            .invalidate_data_before_timestamp(window_start(now, self.window));

        let fresh: Vec<SharedObservation> = batch
            .iter()
            .filter(|obs| obs.is_in_window(now, self.window))
            .map(Arc::clone)
            .collect();

        for obs in &fresh {
            self.stat.calculate(obs);
        }

        self.history = self.history.append(&fresh);

        trace!(
            "{} {}s: at {now} retracted {expired}, absorbed {}, value {} over {}",
            S::KIND,
            self.window,
            fresh.len(),
            self.stat.value(),
            self.stat.amount()
        );
        self
    }
}

impl<S: RunningStatistic> Feature for RunningFeature<S> {
    fn update(&mut self, now: u64, batch: &[SharedObservation]) {
        RunningFeature::update(self, now, batch);
    }

    fn value(&self) -> Decimal {
        self.stat.value()
    }

    fn amount(&self) -> u64 {
        self.stat.amount()
    }

    fn window(&self) -> u64 {
        self.window
    }

    fn kind(&self) -> FeatureKind {
        S::KIND
    }
}
