use alloc::{sync::Arc, vec::Vec};

use log::error;

use crate::{FeatureError, Result, SharedObservation};

/// Stable identity of a node inside one [`PersistentList`] arena.
///
/// Ids are only meaningful for the list that produced them. Use
/// [`PersistentList::clone_with_lookup`] to carry an id across a clone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node {
    obs: SharedObservation,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    /// False once the node has been unlinked from the chain
    live: bool,
}

/// A copy-on-write, timestamp-ordered doubly linked list of shared observations.
///
/// Nodes live in a per-handle arena and are linked by [`NodeId`]. Every
/// structural operation takes `&self`, re-chains the live nodes into a fresh
/// compact arena carrying the same `Arc` references, applies its change there
/// and returns the new handle. A handle therefore never observes a change made
/// through another handle, which lets every feature own a private history
/// without any locking.
///
/// - Clone time complexity: O(n) nodes, O(1) per observation payload
/// - Append time complexity: O(n + k)
/// - Prefix invalidation time complexity: O(n)
#[derive(Debug, Default)]
pub struct PersistentList {
    nodes: Vec<Node>,
    len: usize,
    /// Oldest node
    head: Option<NodeId>,
    /// Most recently appended node
    tail: Option<NodeId>,
}

impl Clone for PersistentList {
    fn clone(&self) -> Self {
        self.clone_with_lookup(&[]).0
    }
}

impl PersistentList {
    /// Creates an empty list
    pub const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            len: 0,
            head: None,
            tail: None,
        }
    }

    /// Returns the number of observations in the chain
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the chain holds no observation
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the id of the oldest node
    #[inline]
    pub const fn head(&self) -> Option<NodeId> {
        self.head
    }

    /// Returns the id of the most recently appended node
    #[inline]
    pub const fn tail(&self) -> Option<NodeId> {
        self.tail
    }

    #[inline]
    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).filter(|node| node.live)
    }

    /// Returns the observation held by a live node
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&SharedObservation> {
        self.node(id).map(|node| &node.obs)
    }

    /// Returns the successor of a live node
    #[inline]
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.next)
    }

    /// Returns the predecessor of a live node
    #[inline]
    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.prev)
    }

    /// Returns an iterator over the observations, oldest to newest
    pub fn iter(&self) -> ListIter<'_> {
        ListIter {
            list: self,
            cursor: self.head,
            remaining: self.len,
        }
    }

    /// Collects the observations, oldest to newest
    pub fn to_vec(&self) -> Vec<SharedObservation> {
        self.iter().cloned().collect()
    }

    /// Clones the chain and translates caller-held node ids into the clone.
    ///
    /// # Arguments
    ///
    /// * `lookup` - Node ids of `self` to translate
    ///
    /// # Returns
    ///
    /// * `(Self, Vec<Option<NodeId>>)` - The clone, and for every requested id its
    ///   counterpart in the clone, or `None` when the id is not a live node of `self`
    pub fn clone_with_lookup(&self, lookup: &[NodeId]) -> (Self, Vec<Option<NodeId>>) {
        let mut remap: Vec<Option<NodeId>> = vec![None; self.nodes.len()];
        let mut nodes: Vec<Node> = Vec::with_capacity(self.len);

        let mut cursor = self.head;
        while let Some(old) = cursor {
            let node = &self.nodes[old.0];
            let id = NodeId(nodes.len());
            let prev = id.0.checked_sub(1).map(NodeId);
            if let Some(prev) = prev {
                nodes[prev.0].next = Some(id);
            }
            nodes.push(Node {
                obs: Arc::clone(&node.obs),
                prev,
                next: None,
                live: true,
            });
            remap[old.0] = Some(id);
            cursor = node.next;
        }

        let len = nodes.len();
        let cloned = Self {
            nodes,
            len,
            head: (len > 0).then_some(NodeId(0)),
            tail: len.checked_sub(1).map(NodeId),
        };

        let found = lookup
            .iter()
            .map(|id| remap.get(id.0).copied().flatten())
            .collect();

        (cloned, found)
    }

    /// Returns a new list with `batch` linked after the current tail.
    ///
    /// The batch is expected to be timestamp-ascending and not older than the
    /// current tail.
    pub fn append(&self, batch: &[SharedObservation]) -> Self {
        let mut list = self.clone();
        list.nodes.reserve(batch.len());

        for obs in batch {
            let id = NodeId(list.nodes.len());
            list.nodes.push(Node {
                obs: Arc::clone(obs),
                prev: list.tail,
                next: None,
                live: true,
            });
            match list.tail {
                Some(tail) => list.nodes[tail.0].next = Some(id),
                None => list.head = Some(id),
            }
            list.tail = Some(id);
        }

        list.len += batch.len();
        list
    }

    /// Returns a new list without the node `id`.
    ///
    /// # Errors
    ///
    /// * [`FeatureError::NotFound`] - `id` is not a live node of this list
    pub fn remove(&self, id: NodeId) -> Result<Self> {
        let (mut list, found) = self.clone_with_lookup(&[id]);

        let Some(Some(target)) = found.first().copied() else {
            error!("node {id:?} is not part of a chain of {} nodes", self.len);
            return Err(FeatureError::NotFound);
        };

        list.unlink(target);
        Ok(list)
    }

    /// Returns a new list without the given observations, matched by identity.
    ///
    /// `data` must be ordered the way the observations appear in the chain; the
    /// chain is walked once from the head, so the worst case is O(n·k).
    ///
    /// # Errors
    ///
    /// * [`FeatureError::IncompleteRemoval`] - not every observation was found
    pub fn remove_input_data(&self, data: &[SharedObservation]) -> Result<Self> {
        let mut list = self.clone();
        let mut removed = 0;
        let mut cursor = list.head;

        while let Some(id) = cursor {
            if removed == data.len() {
                break;
            }
            cursor = list.nodes[id.0].next;
            if Arc::ptr_eq(&list.nodes[id.0].obs, &data[removed]) {
                list.unlink(id);
                removed += 1;
            }
        }

        if removed != data.len() {
            error!("removed {removed} of {} requested observations", data.len());
            return Err(FeatureError::IncompleteRemoval {
                requested: data.len(),
                removed,
            });
        }

        Ok(list)
    }

    /// Returns a new list without the leading observations older than `threshold`.
    ///
    /// Stops at the first node whose timestamp is `>= threshold`.
    pub fn invalidate_data_before_timestamp(&self, threshold: u64) -> Self {
        let mut list = self.clone();

        while let Some(head) = list.head {
            if list.nodes[head.0].obs.timestamp >= threshold {
                break;
            }
            list.unlink(head);
        }

        list
    }

    fn unlink(&mut self, id: NodeId) {
        let (prev, next) = {
            let node = &mut self.nodes[id.0];
            node.live = false;
            (node.prev.take(), node.next.take())
        };

        match prev {
            Some(prev) => self.nodes[prev.0].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.nodes[next.0].prev = prev,
            None => self.tail = prev,
        }

        self.len -= 1;
    }
}

/// Iterator over a [`PersistentList`], oldest to newest
#[derive(Debug)]
pub struct ListIter<'a> {
    list: &'a PersistentList,
    cursor: Option<NodeId>,
    remaining: usize,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a SharedObservation;

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.list.nodes[self.cursor?.0];
        self.cursor = node.next;
        self.remaining = self.remaining.saturating_sub(1);
        Some(&node.obs)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for ListIter<'_> {}

impl<'a> IntoIterator for &'a PersistentList {
    type Item = &'a SharedObservation;
    type IntoIter = ListIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::Observation;

    fn sample() -> Vec<SharedObservation> {
        [1, 50, 200, 215, 250]
            .into_iter()
            .map(|ts| Observation::shared(Decimal::TEN, ts))
            .collect()
    }

    fn same(left: &[SharedObservation], right: &[SharedObservation]) -> bool {
        left.len() == right.len() && left.iter().zip(right).all(|(l, r)| Arc::ptr_eq(l, r))
    }

    #[test]
    fn test_append_leaves_source_untouched() {
        let list = PersistentList::new();
        let data = sample();

        let appended = list.append(&data);

        assert!(list.is_empty());
        assert_eq!(list.iter().count(), 0);
        assert_eq!(appended.len(), 5);
        assert!(same(&appended.to_vec(), &data));
    }

    #[test]
    fn test_append_links_after_tail() {
        let data = sample();
        let first = PersistentList::new().append(&data[..2]);
        let second = first.append(&data[2..]);

        assert!(same(&first.to_vec(), &data[..2]));
        assert!(same(&second.to_vec(), &data));
        assert!(Arc::ptr_eq(second.get(second.tail().unwrap()).unwrap(), &data[4]));
        assert!(Arc::ptr_eq(second.get(second.head().unwrap()).unwrap(), &data[0]));
    }

    #[test]
    fn test_append_empty_batch() {
        let data = sample();
        let list = PersistentList::new().append(&data).append(&[]);
        assert_eq!(list.len(), 5);
        assert!(same(&list.to_vec(), &data));
    }

    #[test]
    fn test_clone_shares_observations_not_nodes() {
        let data = sample();
        let list = PersistentList::new().append(&data[..1]);
        let before = Arc::strong_count(&data[0]);

        let cloned = list.clone();

        assert_eq!(Arc::strong_count(&data[0]), before + 1);
        assert!(same(&list.to_vec(), &cloned.to_vec()));

        let emptied = cloned.remove(cloned.head().unwrap()).unwrap();
        assert!(emptied.is_empty());
        assert_eq!(cloned.len(), 1);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_clone_with_lookup_remaps_ids() {
        let data = sample();
        let list = PersistentList::new().append(&data);
        let second = list.next(list.head().unwrap()).unwrap();
        let last = list.tail().unwrap();

        let (cloned, found) = list.clone_with_lookup(&[last, second]);

        assert_eq!(found.len(), 2);
        let last_new = found[0].unwrap();
        let second_new = found[1].unwrap();
        assert!(Arc::ptr_eq(cloned.get(last_new).unwrap(), &data[4]));
        assert!(Arc::ptr_eq(cloned.get(second_new).unwrap(), &data[1]));
        assert_eq!(cloned.prev(second_new), cloned.head());
    }

    #[test]
    fn test_clone_compacts_dead_nodes() {
        let data = sample();
        let list = PersistentList::new()
            .append(&data)
            .invalidate_data_before_timestamp(100);
        let stale = list.head().unwrap();

        let (cloned, found) = list.clone_with_lookup(&[NodeId(0), stale]);

        assert_eq!(found[0], None);
        assert!(Arc::ptr_eq(cloned.get(found[1].unwrap()).unwrap(), &data[2]));
        assert_eq!(cloned.nodes.len(), 3);
    }

    #[test]
    fn test_remove_single() {
        let data = sample();
        let list = PersistentList::new().append(&data[..1]);

        let removed = list.remove(list.tail().unwrap()).unwrap();

        assert_eq!(removed.len(), 0);
        assert!(removed.tail().is_none());
        assert!(removed.head().is_none());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_remove_when_many_present() {
        let data = sample();
        let list = PersistentList::new().append(&data);
        let target = list.next(list.head().unwrap()).unwrap();

        let removed = list.remove(target).unwrap();

        assert_eq!(removed.len(), 4);
        assert!(Arc::ptr_eq(
            removed.get(removed.next(removed.head().unwrap()).unwrap()).unwrap(),
            &data[2]
        ));
        assert!(same(&list.to_vec(), &data));
        assert_eq!(removed.iter().map(|o| o.timestamp).collect::<Vec<_>>(), [1, 200, 215, 250]);
    }

    #[test]
    fn test_remove_head_and_tail() {
        let data = sample();
        let list = PersistentList::new().append(&data);

        let without_head = list.remove(list.head().unwrap()).unwrap();
        assert!(Arc::ptr_eq(without_head.get(without_head.head().unwrap()).unwrap(), &data[1]));
        assert_eq!(without_head.prev(without_head.head().unwrap()), None);

        let without_tail = list.remove(list.tail().unwrap()).unwrap();
        assert!(Arc::ptr_eq(without_tail.get(without_tail.tail().unwrap()).unwrap(), &data[3]));
        assert_eq!(without_tail.next(without_tail.tail().unwrap()), None);
    }

    #[test]
    fn test_remove_unknown_node() {
        let data = sample();
        let list = PersistentList::new().append(&data[..2]);

        assert_eq!(list.remove(NodeId(7)).unwrap_err(), FeatureError::NotFound);
        assert_eq!(
            PersistentList::new().remove(NodeId(0)).unwrap_err(),
            FeatureError::NotFound
        );
    }

    #[test]
    fn test_remove_dead_node() {
        let data = sample();
        let list = PersistentList::new()
            .append(&data)
            .invalidate_data_before_timestamp(100);

        // slot 0 still exists in the arena but is unlinked
        assert!(list.get(NodeId(0)).is_none());
        assert_eq!(list.remove(NodeId(0)).unwrap_err(), FeatureError::NotFound);
    }

    #[test]
    fn test_remove_input_data() {
        let data = sample();
        let list = PersistentList::new().append(&data);

        let removed = list
            .remove_input_data(&[Arc::clone(&data[0]), Arc::clone(&data[3])])
            .unwrap();

        assert_eq!(removed.len(), 3);
        assert!(same(
            &removed.to_vec(),
            &[Arc::clone(&data[1]), Arc::clone(&data[2]), Arc::clone(&data[4])]
        ));
        assert_eq!(list.len(), 5);
    }

    #[test]
    fn test_remove_input_data_matches_identity_not_value() {
        let data = sample();
        let list = PersistentList::new().append(&data);
        let lookalike = Observation::shared(Decimal::TEN, 50);

        let err = list.remove_input_data(&[lookalike]).unwrap_err();

        assert_eq!(
            err,
            FeatureError::IncompleteRemoval {
                requested: 1,
                removed: 0
            }
        );
    }

    #[test]
    fn test_remove_input_data_out_of_order() {
        let data = sample();
        let list = PersistentList::new().append(&data);

        let err = list
            .remove_input_data(&[Arc::clone(&data[3]), Arc::clone(&data[1])])
            .unwrap_err();

        assert_eq!(
            err,
            FeatureError::IncompleteRemoval {
                requested: 2,
                removed: 1
            }
        );
    }

    #[test]
    fn test_invalidate_data_before_timestamp() {
        let data = sample();
        let list = PersistentList::new().append(&data);

        let trimmed = list.invalidate_data_before_timestamp(100);

        assert_eq!(trimmed.len(), 3);
        assert!(same(&trimmed.to_vec(), &data[2..]));
        assert!(same(&list.to_vec(), &data));
    }

    #[test]
    fn test_invalidate_threshold_is_exclusive() {
        let data = sample();
        let list = PersistentList::new().append(&data);

        assert!(same(&list.invalidate_data_before_timestamp(200).to_vec(), &data[2..]));
        assert!(same(&list.invalidate_data_before_timestamp(0).to_vec(), &data));
    }

    #[test]
    fn test_invalidate_everything() {
        let data = sample();
        let trimmed = PersistentList::new()
            .append(&data)
            .invalidate_data_before_timestamp(1_000);

        assert!(trimmed.is_empty());
        assert!(trimmed.head().is_none());
        assert!(trimmed.tail().is_none());

        let refilled = trimmed.append(&data[4..]);
        assert!(same(&refilled.to_vec(), &data[4..]));
    }

    #[test]
    fn test_iter_size_hint() {
        let data = sample();
        let list = PersistentList::new().append(&data);
        let mut iter = list.iter();
        assert_eq!(iter.len(), 5);
        iter.next();
        assert_eq!(iter.len(), 4);
        assert_eq!((&list).into_iter().count(), 5);
    }
}
