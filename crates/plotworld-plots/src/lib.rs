//! Plot identity, merge groups, and the lock table that serialises
//! mutations over overlapping plot sets.
#![forbid(unsafe_code)]

mod lock;
mod merge;
mod plot;
mod registry;

pub use lock::{LockError, LockId, LockKind, LockManager, PlotLockGuard};
pub use merge::{MergeError, MergeGroups};
pub use plot::{Plot, PlotKey, PlotSet};
pub use registry::{MergePlan, PlotRegistry};
