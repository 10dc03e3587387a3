use alloc::collections::VecDeque;

use core::marker::PhantomData;

use rust_decimal::Decimal;

use crate::SharedObservation;

/// Trait for defining order policies for monotonic queue
///
/// # Type Parameters
///
/// * `T` - The type of the compared values
///
/// # Methods
///
/// * `should_remove(existing: &T, new: &T) -> bool` - Returns true if the existing element is dominated by the new one
///
pub trait OrderPolicy<T> {
    /// Returns true if `existing` can never be the extremum again once `new` is in
    fn should_remove(existing: &T, new: &T) -> bool;
}

/// Order policy for minimum
#[derive(Debug, Clone, Copy, Default)]
pub struct Min;

/// Order policy for maximum
#[derive(Debug, Clone, Copy, Default)]
pub struct Max;

impl<T: PartialOrd> OrderPolicy<T> for Min {
    #[inline]
    fn should_remove(existing: &T, new: &T) -> bool {
        existing >= new
    }
}

impl<T: PartialOrd> OrderPolicy<T> for Max {
    #[inline]
    fn should_remove(existing: &T, new: &T) -> bool {
        existing <= new
    }
}

/// Monotonic queue over timestamped observations
///
/// Elements leave the front once their timestamp falls at or before the lower
/// edge of the window, and leave the back when dominated by a newer element,
/// so the front is always the extremum of the window.
///
/// # Type Parameters
///
/// * `O` - The order policy for the queue
#[derive(Debug, Clone)]
pub struct MonotonicQueue<O> {
    deque: VecDeque<SharedObservation>,
    /// Window duration in seconds
    window: u64,
    _order: PhantomData<O>,
}

impl<O: OrderPolicy<Decimal>> MonotonicQueue<O> {
    /// Creates a new `MonotonicQueue` over a window of `window` seconds.
    #[inline]
    pub fn new(window: u64) -> Self {
        Self {
            deque: VecDeque::new(),
            window,
            _order: PhantomData,
        }
    }

    /// Returns the window duration in seconds
    #[inline]
    pub const fn window(&self) -> u64 {
        self.window
    }

    /// Returns the number of candidates retained
    #[inline]
    pub fn len(&self) -> usize {
        self.deque.len()
    }

    /// Determines if a timestamp fell out of the window ending at `now`
    #[inline]
    fn is_expired(&self, timestamp: u64, now: u64) -> bool {
        now.checked_sub(self.window)
            .is_some_and(|edge| timestamp <= edge)
    }

    /// Returns true if the front element is expired at `now`
    #[inline]
    pub fn has_expired(&self, now: u64) -> bool {
        self.deque
            .front()
            .is_some_and(|obs| self.is_expired(obs.timestamp, now))
    }

    /// Removes expired elements from the front of the deque
    ///
    /// # Returns
    ///
    /// * `usize` - The number of evicted elements
    #[inline]
    pub fn remove_expired_elements(&mut self, now: u64) -> usize {
        let mut evicted = 0;
        while self.has_expired(now) {
            self.deque.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Maintains monotonic property by removing dominated elements
    #[inline]
    fn maintain_monotonic_property(&mut self, value: &Decimal) {
        while let Some(existing) = self.deque.back() {
            if O::should_remove(&existing.value, value) {
                self.deque.pop_back();
            } else {
                break;
            }
        }
    }

    /// Pushes a new observation into the queue
    #[inline]
    pub fn push(&mut self, obs: SharedObservation) {
        self.maintain_monotonic_property(&obs.value);
        self.deque.push_back(obs);
    }

    /// Returns the front element of the queue, the current extremum
    #[inline]
    pub fn front(&self) -> Option<&SharedObservation> {
        self.deque.front()
    }

    /// Resets the queue to its initial state
    #[inline]
    pub fn reset(&mut self) -> &mut Self {
        self.deque.clear();
        self
    }

    /// Returns true if the queue is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.deque.is_empty()
    }
}
