use alloc::{sync::Arc, vec::Vec};

use ahash::RandomState;
use fixedbitset::FixedBitSet;
use hashbrown::HashMap;
use log::trace;

use crate::{FeatureError, Result, SharedObservation, config::validate_windows};

/// Partitions incoming batches across a fixed set of window durations.
///
/// Every observation is stored exactly once, in the bucket of the narrowest
/// window it falls within at the time of the update. Since wider windows
/// contain narrower ones at a fixed time, the data of a window is rebuilt on
/// demand by concatenating its bucket with all narrower ones.
///
/// Buckets are newest-first internally and accumulate for the lifetime of the
/// aggregator. Query results are oldest-first.
///
/// # Examples
///
/// ```
/// # use rolling_features::{Observation, WindowAggregator};
/// # use rust_decimal::Decimal;
/// let mut aggregator = WindowAggregator::new(&[100, 5, 3600]).unwrap();
/// let batch = [
///     Observation::shared(Decimal::from(15), 200),
///     Observation::shared(Decimal::from(9), 300),
///     Observation::shared(Decimal::from(15), 350),
/// ];
/// aggregator.update(350, &batch);
///
/// let stamps = |w| -> Vec<u64> {
///     aggregator.data_for_window(w).unwrap().iter().map(|o| o.timestamp).collect()
/// };
/// assert_eq!(stamps(5), [350]);
/// assert_eq!(stamps(100), [300, 350]);
/// assert_eq!(stamps(3600), [200, 300, 350]);
/// assert!(aggregator.data_for_window(60).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct WindowAggregator {
    /// Window durations, ascending and unique
    windows: Vec<u64>,
    /// Window duration to its position in `windows`
    index: HashMap<u64, usize, RandomState>,
    /// One newest-first bucket per window
    buckets: Vec<Vec<SharedObservation>>,
    /// Leading entries of each bucket claimed by the most recent update
    fresh: Vec<usize>,
}

impl WindowAggregator {
    /// Creates a new aggregator over the given window durations
    ///
    /// # Arguments
    ///
    /// * `windows` - Window durations in seconds, in any order; duplicates are merged
    ///
    /// # Returns
    ///
    /// * `Result<Self>` - The aggregator with empty buckets
    ///
    /// # Errors
    ///
    /// * [`FeatureError::InvalidConfig`] - `windows` is empty or contains a zero
    pub fn new(windows: &[u64]) -> Result<Self> {
        validate_windows(windows)?;

        let mut windows = windows.to_vec();
        windows.sort_unstable();
        windows.dedup();

        let mut index = HashMap::with_capacity_and_hasher(windows.len(), RandomState::default());
        for (i, &window) in windows.iter().enumerate() {
            index.insert(window, i);
        }

        let n = windows.len();
        Ok(Self {
            windows,
            index,
            buckets: vec![Vec::new(); n],
            fresh: vec![0; n],
        })
    }

    /// Returns the configured windows, ascending
    #[inline]
    pub fn windows(&self) -> &[u64] {
        &self.windows
    }

    /// Returns the position of `window` among the configured windows
    #[inline]
    pub fn window_index(&self, window: u64) -> Option<usize> {
        self.index.get(&window).copied()
    }

    /// Returns the raw newest-first bucket at `index`
    #[inline]
    pub fn bucket(&self, index: usize) -> Option<&[SharedObservation]> {
        self.buckets.get(index).map(Vec::as_slice)
    }

    /// Assigns each observation of `batch` to the narrowest window containing it
    ///
    /// Windows are visited narrowest first. Each scans the batch newest to
    /// oldest and stops at the first element lying before the window, so
    /// `batch` is expected in ascending timestamp order. The run claimed by
    /// a window is placed in front of its bucket, keeping it newest-first
    /// across updates.
    ///
    /// # Arguments
    ///
    /// * `now` - The current logical time
    /// * `batch` - Observations in ascending timestamp order
    ///
    /// # Returns
    ///
    /// * `usize` - Number of observations claimed by some window
    pub fn update(&mut self, now: u64, batch: &[SharedObservation]) -> usize {
        let mut claimed = FixedBitSet::with_capacity(batch.len());
        let mut total = 0;

        let slots = self.buckets.iter_mut().zip(self.fresh.iter_mut());
        for (&window, (bucket, fresh)) in self.windows.iter().zip(slots) {
            let mut run = Vec::new();

            for (i, obs) in batch.iter().enumerate().rev() {
                if obs.is_before_window(now, window) {
                    break;
                }
                if !obs.is_in_window(now, window) || claimed.contains(i) {
                    continue;
                }
                claimed.insert(i);
                run.push(Arc::clone(obs));
            }

            *fresh = run.len();
            total += run.len();
            trace!("window {window}s: claimed {} at {now}", run.len());

            if !run.is_empty() {
                run.append(bucket);
                *bucket = run;
            }
        }

        total
    }

    /// Rebuilds the oldest-first data of a window from its bucket and all
    /// narrower ones
    ///
    /// # Arguments
    ///
    /// * `window` - A configured window duration
    ///
    /// # Returns
    ///
    /// * `Result<Vec<SharedObservation>>` - Every observation ever claimed by
    ///   `window` or a narrower window
    ///
    /// # Errors
    ///
    /// * [`FeatureError::UnknownWindow`] - `window` was not configured
    pub fn data_for_window(&self, window: u64) -> Result<Vec<SharedObservation>> {
        let index = self.lookup(window)?;
        Ok(self.reconstruct(index, false))
    }

    /// Same as [`data_for_window`](Self::data_for_window), restricted to what
    /// the most recent [`update`](Self::update) claimed
    pub fn latest_for_window(&self, window: u64) -> Result<Vec<SharedObservation>> {
        let index = self.lookup(window)?;
        Ok(self.reconstruct(index, true))
    }

    /// Rebuilds the data of every configured window, indexed like
    /// [`windows`](Self::windows)
    pub fn data_batch(&self) -> Result<Vec<Vec<SharedObservation>>> {
        self.windows
            .iter()
            .map(|&window| self.data_for_window(window))
            .collect()
    }

    /// Rebuilds the latest data of every configured window, indexed like
    /// [`windows`](Self::windows)
    pub fn latest_batch(&self) -> Result<Vec<Vec<SharedObservation>>> {
        self.windows
            .iter()
            .map(|&window| self.latest_for_window(window))
            .collect()
    }

    fn lookup(&self, window: u64) -> Result<usize> {
        self.window_index(window)
            .ok_or(FeatureError::UnknownWindow(window))
    }

    /// Concatenates buckets `0..=index` narrowest first and reverses once
    fn reconstruct(&self, index: usize, latest: bool) -> Vec<SharedObservation> {
        let end = |i: usize| {
            if latest {
                self.fresh[i]
            } else {
                self.buckets[i].len()
            }
        };
        let buckets = &self.buckets[..=index];

        let len = (0..=index).map(&end).sum();
        let mut data = Vec::with_capacity(len);

        for (i, bucket) in buckets.iter().enumerate() {
            data.extend(bucket[..end(i)].iter().cloned());
        }

        data.reverse();
        data
    }
}
