use log::error;
use rust_decimal::Decimal;

use crate::{FeatureKind, Observation, RunningFeature, RunningStatistic};

/// Moving average maintained from the mean's own recurrence, without
/// keeping a running sum.
///
/// - Absorb: `mean += (x - mean) / (n + 1)`
/// - Retract: `mean = (mean * n - x) / (n - 1)`
///
/// A step that would overflow the decimal range is logged and skipped: the
/// mean is held while the count keeps tracking the window.
#[derive(Debug, Clone, Default)]
pub struct RunningMean {
    /// Current mean
    value: Decimal,
    /// Number of contributing observations
    amount: u64,
}

impl RunningStatistic for RunningMean {
    const KIND: FeatureKind = FeatureKind::Mean;

    #[inline]
    fn calculate(&mut self, obs: &Observation) {
        let n = Decimal::from(self.amount + 1);
        let next = obs
            .value
            .checked_sub(self.value)
            .and_then(|delta| delta.checked_div(n))
            .and_then(|step| self.value.checked_add(step));

        match next {
            Some(value) => self.value = value,
            None => error!("mean overflow absorbing {obs}, holding {}", self.value),
        }
        self.amount += 1;
    }

    #[inline]
    fn invalidate(&mut self, obs: &Observation) {
        if self.amount <= 1 {
            self.reset();
            return;
        }
        let n = Decimal::from(self.amount);
        let next = self
            .value
            .checked_mul(n)
            .and_then(|sum| sum.checked_sub(obs.value))
            .and_then(|sum| sum.checked_div(n - Decimal::ONE));

        match next {
            Some(value) => self.value = value,
            None => error!("mean overflow retracting {obs}, holding {}", self.value),
        }
        self.amount -= 1;
    }

    #[inline]
    fn reset(&mut self) {
        self.value = Decimal::ZERO;
        self.amount = 0;
    }

    #[inline]
    fn value(&self) -> Decimal {
        self.value
    }

    #[inline]
    fn amount(&self) -> u64 {
        self.amount
    }
}

/// Moving average over a trailing time window
///
/// # Examples
///
/// ```
/// # use rolling_features::{Feature, MeanFeature, Observation};
/// # use rust_decimal::Decimal;
/// let mut mean = MeanFeature::new(100);
/// let batch = [
///     Observation::shared(Decimal::from(15), 250),
///     Observation::shared(Decimal::from(9), 300),
///     Observation::shared(Decimal::from(15), 350),
/// ];
/// mean.update(350, &batch);
/// assert_eq!(mean.value(), Decimal::from(13));
/// assert_eq!(mean.amount(), 3);
/// ```
pub type MeanFeature = RunningFeature<RunningMean>;
