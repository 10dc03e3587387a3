use alloc::vec::Vec;

use log::{debug, trace};
use rust_decimal::Decimal;

use crate::{
    EngineConfig, Feature, FeatureError, FeatureKind, FeatureSpec, MaxFeature, MeanFeature,
    MinFeature, Result, SharedObservation, StdDevFeature, WindowAggregator,
};

/// Any feature the engine can maintain
#[derive(Debug, Clone)]
pub enum AnyFeature {
    /// Moving average
    Mean(MeanFeature),
    /// Sample standard deviation
    StdDev(StdDevFeature),
    /// Rolling minimum
    Min(MinFeature),
    /// Rolling maximum
    Max(MaxFeature),
}

impl From<FeatureSpec> for AnyFeature {
    fn from(spec: FeatureSpec) -> Self {
        match spec.kind {
            FeatureKind::Mean => Self::Mean(MeanFeature::new(spec.window)),
            FeatureKind::StdDev => Self::StdDev(StdDevFeature::new(spec.window)),
            FeatureKind::Min => Self::Min(MinFeature::new(spec.window)),
            FeatureKind::Max => Self::Max(MaxFeature::new(spec.window)),
        }
    }
}

impl From<MeanFeature> for AnyFeature {
    fn from(feature: MeanFeature) -> Self {
        Self::Mean(feature)
    }
}

impl From<StdDevFeature> for AnyFeature {
    fn from(feature: StdDevFeature) -> Self {
        Self::StdDev(feature)
    }
}

impl From<MinFeature> for AnyFeature {
    fn from(feature: MinFeature) -> Self {
        Self::Min(feature)
    }
}

impl From<MaxFeature> for AnyFeature {
    fn from(feature: MaxFeature) -> Self {
        Self::Max(feature)
    }
}

impl AnyFeature {
    fn inner(&self) -> &dyn Feature {
        match self {
            Self::Mean(f) => f,
            Self::StdDev(f) => f,
            Self::Min(f) => f,
            Self::Max(f) => f,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Feature {
        match self {
            Self::Mean(f) => f,
            Self::StdDev(f) => f,
            Self::Min(f) => f,
            Self::Max(f) => f,
        }
    }
}

impl Feature for AnyFeature {
    fn update(&mut self, now: u64, batch: &[SharedObservation]) {
        self.inner_mut().update(now, batch);
    }

    fn value(&self) -> Decimal {
        self.inner().value()
    }

    fn amount(&self) -> u64 {
        self.inner().amount()
    }

    fn window(&self) -> u64 {
        self.inner().window()
    }

    fn kind(&self) -> FeatureKind {
        self.inner().kind()
    }
}

/// Snapshot of one feature after an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureValue {
    /// Statistic
    pub kind: FeatureKind,
    /// Window duration in seconds
    pub window: u64,
    /// Current value
    pub value: Decimal,
    /// Number of contributing observations
    pub amount: u64,
}

/// Feeds one stream of batches to a set of features over several windows.
///
/// Each [`update`](Self::update) buckets the batch once in a
/// [`WindowAggregator`], then hands every feature the observations its window
/// received from that batch.
///
/// # Examples
///
/// ```
/// # use rolling_features::{EngineConfig, FeatureEngine, FeatureKind, Observation};
/// # use rust_decimal::Decimal;
/// let config = EngineConfig::new([5, 100, 3600])
///     .with_feature(FeatureKind::Mean, 100)
///     .with_feature(FeatureKind::Max, 3600);
/// let mut engine = FeatureEngine::new(&config).unwrap();
///
/// let batch = [
///     Observation::shared(Decimal::from(3), 200),
///     Observation::shared(Decimal::from(19), 250),
///     Observation::shared(Decimal::from(21), 300),
///     Observation::shared(Decimal::from(17), 350),
/// ];
/// engine.update(350, &batch).unwrap();
///
/// let values = engine.values();
/// assert_eq!(values[0].value, Decimal::from(19));
/// assert_eq!(values[1].value, Decimal::from(21));
/// ```
#[derive(Debug, Clone)]
pub struct FeatureEngine {
    aggregator: WindowAggregator,
    features: Vec<AnyFeature>,
}

impl FeatureEngine {
    /// Creates a new engine from a configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Windows and features to maintain
    ///
    /// # Returns
    ///
    /// * `Result<Self>` - The engine with every configured feature empty
    ///
    /// # Errors
    ///
    /// * [`FeatureError::InvalidConfig`] - the configuration does not validate
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;

        let aggregator = WindowAggregator::new(&config.windows)?;
        let features: Vec<AnyFeature> = config
            .features
            .iter()
            .copied()
            .map(AnyFeature::from)
            .collect();

        debug!(
            "feature engine over windows {:?} with {} features",
            aggregator.windows(),
            features.len()
        );

        Ok(Self {
            aggregator,
            features,
        })
    }

    /// Adds a feature after construction
    ///
    /// # Errors
    ///
    /// * [`FeatureError::UnknownWindow`] - the feature's window is not configured
    pub fn push_feature(&mut self, feature: impl Into<AnyFeature>) -> Result<()> {
        let feature = feature.into();
        let window = feature.window();
        if self.aggregator.window_index(window).is_none() {
            debug!("rejected {} feature over unconfigured window {window}s", feature.kind());
            return Err(FeatureError::UnknownWindow(window));
        }
        self.features.push(feature);
        Ok(())
    }

    /// Buckets `batch` and advances every feature to `now`
    ///
    /// # Arguments
    ///
    /// * `now` - The current logical time
    /// * `batch` - New observations in ascending timestamp order
    ///
    /// # Errors
    ///
    /// * [`FeatureError::UnknownWindow`] - a feature lost track of its window
    pub fn update(&mut self, now: u64, batch: &[SharedObservation]) -> Result<()> {
        let claimed = self.aggregator.update(now, batch);
        let slices = self.aggregator.latest_batch()?;

        for feature in &mut self.features {
            let window = feature.window();
            let slice = self
                .aggregator
                .window_index(window)
                .and_then(|index| slices.get(index))
                .ok_or(FeatureError::UnknownWindow(window))?;
            feature.update(now, slice);
        }

        trace!(
            "tick {now}: {claimed} of {} observations bucketed, {} features updated",
            batch.len(),
            self.features.len()
        );
        Ok(())
    }

    /// Returns the features in insertion order
    #[inline]
    pub fn features(&self) -> &[AnyFeature] {
        &self.features
    }

    /// Returns the first feature of `kind` over `window`
    pub fn feature(&self, kind: FeatureKind, window: u64) -> Option<&AnyFeature> {
        self.features
            .iter()
            .find(|f| f.kind() == kind && f.window() == window)
    }

    /// Returns a snapshot of every feature, in insertion order
    pub fn values(&self) -> Vec<FeatureValue> {
        self.features
            .iter()
            .map(|f| FeatureValue {
                kind: f.kind(),
                window: f.window(),
                value: f.value(),
                amount: f.amount(),
            })
            .collect()
    }

    /// Returns the underlying aggregator
    #[inline]
    pub const fn aggregator(&self) -> &WindowAggregator {
        &self.aggregator
    }
}
