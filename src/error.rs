use thiserror::Error;

/// Errors surfaced by the aggregator, the persistent history and the engine.
///
/// None of these are transient: every variant points at a caller bug or a
/// broken identity invariant, so nothing is retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    /// A window duration that was never configured was queried
    #[error("window of {0} seconds is not configured")]
    UnknownWindow(u64),

    /// A node identity does not belong to the chain it was looked up in
    #[error("node not found in the history chain")]
    NotFound,

    /// Not every observation requested for removal was found in one pass
    #[error("incomplete removal: requested {requested}, removed {removed}")]
    IncompleteRemoval {
        /// Number of observations requested for removal.
        requested: usize,
        /// Number of observations actually unlinked.
        removed: usize,
    },

    /// Configuration rejected at construction time
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, FeatureError>;
