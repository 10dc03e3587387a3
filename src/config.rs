use alloc::vec::Vec;

use core::fmt;

use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{FeatureError, Result};

/// The statistic a feature maintains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FeatureKind {
    /// Moving average
    Mean,
    /// Sample standard deviation
    StdDev,
    /// Rolling minimum
    Min,
    /// Rolling maximum
    Max,
}

impl FeatureKind {
    /// Every supported kind, in declaration order
    pub const ALL: [FeatureKind; 4] = [Self::Mean, Self::StdDev, Self::Min, Self::Max];

    /// Short lowercase name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::StdDev => "stddev",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One feature to maintain: a statistic over one window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeatureSpec {
    /// Statistic to compute
    pub kind: FeatureKind,
    /// Window duration in seconds
    pub window: u64,
}

/// Startup configuration of a [`FeatureEngine`](crate::FeatureEngine).
///
/// Fixed once the engine is built; there is no reload path.
///
/// # Examples
///
/// ```
/// # use rolling_features::{EngineConfig, FeatureKind};
/// let config = EngineConfig::new([5, 100, 3600])
///     .with_feature(FeatureKind::Mean, 100)
///     .with_feature(FeatureKind::Max, 3600);
/// assert!(config.validate().is_ok());
///
/// let broken = EngineConfig::new([5]).with_feature(FeatureKind::Min, 60);
/// assert!(broken.validate().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Window durations in seconds, in any order, duplicates allowed
    pub windows: Vec<u64>,
    /// Features to maintain
    #[cfg_attr(feature = "serde", serde(default))]
    pub features: Vec<FeatureSpec>,
}

impl EngineConfig {
    /// Creates a configuration with the given windows and no feature
    pub fn new(windows: impl Into<Vec<u64>>) -> Self {
        Self {
            windows: windows.into(),
            features: Vec::new(),
        }
    }

    /// Adds a feature
    pub fn with_feature(mut self, kind: FeatureKind, window: u64) -> Self {
        self.features.push(FeatureSpec { kind, window });
        self
    }

    /// Adds every [`FeatureKind`] for every configured window
    pub fn with_all_features(mut self) -> Self {
        let specs = self.windows.iter().flat_map(|&window| {
            FeatureKind::ALL
                .into_iter()
                .map(move |kind| FeatureSpec { kind, window })
        });
        self.features.extend(specs);
        self
    }

    /// Checks that windows are present and positive and that every feature
    /// refers to a configured window
    ///
    /// # Errors
    ///
    /// * [`FeatureError::InvalidConfig`] - the configuration cannot be used
    pub fn validate(&self) -> Result<()> {
        validate_windows(&self.windows)?;

        if let Some(spec) = self
            .features
            .iter()
            .find(|spec| !self.windows.contains(&spec.window))
        {
            debug!("{} feature refers to unconfigured window {}s", spec.kind, spec.window);
            return Err(FeatureError::InvalidConfig(
                "feature window is not a configured window",
            ));
        }

        Ok(())
    }
}

pub(crate) fn validate_windows(windows: &[u64]) -> Result<()> {
    if windows.is_empty() {
        return Err(FeatureError::InvalidConfig("no window configured"));
    }
    if windows.contains(&0) {
        return Err(FeatureError::InvalidConfig("window must be positive"));
    }
    Ok(())
}
