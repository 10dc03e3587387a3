pub mod helper;

mod monotonic_queue;
pub use monotonic_queue::{Max, Min, MonotonicQueue, OrderPolicy};

mod persistent_list;
pub use persistent_list::{ListIter, NodeId, PersistentList};
