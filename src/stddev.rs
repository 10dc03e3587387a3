use log::error;
use rust_decimal::Decimal;

use crate::{FeatureKind, Observation, RunningFeature, RunningStatistic, helper::sample_stddev};

/// Sample standard deviation maintained with Welford's online algorithm.
///
/// Keeps the running mean and `S`, the sum of squared deviations from it.
/// Retraction applies the exact inverse of the Welford step, so absorbing then
/// retracting an observation restores the previous accumulators.
///
/// The reported value is `sqrt(S / (n - 1))` for two or more observations and
/// zero for a single one. When a retraction leaves fewer than two
/// observations the reported value is held rather than recomputed.
///
/// A step that would overflow the decimal range is logged and skipped: mean,
/// `S` and the reported value are held while the count keeps tracking the
/// window.
#[derive(Debug, Clone, Default)]
pub struct RunningStdDev {
    /// Last reported standard deviation
    value: Decimal,
    /// Number of contributing observations
    amount: u64,
    /// Running mean
    mean: Decimal,
    /// Sum of squared deviations from the mean
    s: Decimal,
}

impl RunningStdDev {
    /// Returns the running mean
    #[inline]
    pub const fn mean(&self) -> Decimal {
        self.mean
    }

    /// Returns the sum of squared deviations from the mean
    #[inline]
    pub const fn sum_squares(&self) -> Decimal {
        self.s
    }

    /// Welford step absorbing `x`, `None` on overflow
    fn absorbed(&self, x: Decimal) -> Option<(Decimal, Decimal)> {
        if self.amount == 0 {
            return Some((x, Decimal::ZERO));
        }
        let delta = x.checked_sub(self.mean)?;
        let mean = self
            .mean
            .checked_add(delta.checked_div(Decimal::from(self.amount + 1))?)?;
        let s = self.s.checked_add(delta.checked_mul(x.checked_sub(mean)?)?)?;
        Some((mean, s))
    }

    /// Inverse Welford step retracting `x`, `None` on overflow
    fn retracted(&self, x: Decimal) -> Option<(Decimal, Decimal)> {
        let n = Decimal::from(self.amount);
        let mean = self
            .mean
            .checked_mul(n)?
            .checked_sub(x)?
            .checked_div(n - Decimal::ONE)?;
        let s = self
            .s
            .checked_sub(x.checked_sub(self.mean)?.checked_mul(x.checked_sub(mean)?)?)?;
        // rounding can leave a tiny negative residue
        Some((mean, s.max(Decimal::ZERO)))
    }
}

impl RunningStatistic for RunningStdDev {
    const KIND: FeatureKind = FeatureKind::StdDev;

    fn calculate(&mut self, obs: &Observation) {
        let next = self.absorbed(obs.value);
        self.amount += 1;

        match next {
            Some((mean, s)) => {
                self.mean = mean;
                self.s = s;
                self.value = sample_stddev(s, self.amount);
            }
            None => error!("stddev overflow absorbing {obs}, holding {}", self.value),
        }
    }

    fn invalidate(&mut self, obs: &Observation) {
        if self.amount <= 1 {
            self.reset();
            return;
        }

        let next = self.retracted(obs.value);
        self.amount -= 1;

        match next {
            Some((mean, s)) => {
                self.mean = mean;
                self.s = s;
                if self.amount >= 2 {
                    self.value = sample_stddev(s, self.amount);
                }
            }
            None => error!("stddev overflow retracting {obs}, holding {}", self.value),
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
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

/// Sample standard deviation over a trailing time window
///
/// # Examples
///
/// ```
/// # use rolling_features::{Feature, Observation, StdDevFeature};
/// # use rust_decimal::Decimal;
/// let mut stddev = StdDevFeature::new(100);
/// let batch = [
///     Observation::shared(Decimal::from(3), 200),
///     Observation::shared(Decimal::from(19), 250),
///     Observation::shared(Decimal::from(21), 300),
///     Observation::shared(Decimal::from(17), 350),
/// ];
/// stddev.update(350, &batch);
/// assert_eq!(stddev.value(), Decimal::from(2));
/// ```
pub type StdDevFeature = RunningFeature<RunningStdDev>;
