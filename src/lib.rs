#![doc = include_str!("../README.md")]
#![no_std]
#![deny(
    unsafe_code,
    unused_imports,
    unused_variables,
    unused_must_use,
    missing_docs,
    clippy::all,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented
)]
#![allow(clippy::len_without_is_empty)]

#[macro_use]
extern crate alloc;

mod error;
pub use error::{FeatureError, Result};

mod observation;
pub use observation::{Observation, SharedObservation};

mod config;
pub use config::{EngineConfig, FeatureKind, FeatureSpec};

mod traits;
pub use traits::{Feature, RunningStatistic};

mod utils;
pub(crate) use utils::helper;
pub use utils::{ListIter, Max, Min, MonotonicQueue, NodeId, OrderPolicy, PersistentList};

mod running_feature;
pub use running_feature::RunningFeature;

mod mean;
pub use mean::{MeanFeature, RunningMean};

mod stddev;
pub use stddev::{RunningStdDev, StdDevFeature};

mod extremum;
pub use extremum::{Extremum, ExtremumPolicy, MaxFeature, MinFeature};

mod aggregator;
pub use aggregator::WindowAggregator;

mod engine;
pub use engine::{AnyFeature, FeatureEngine, FeatureValue};
