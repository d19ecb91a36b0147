use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;

use crate::plot::{PlotKey, PlotSet};

/// What a lock holder is doing; carried for diagnostics only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockKind {
    Biome,
    Border,
    Merge,
}

impl LockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LockKind::Biome => "biome-change",
            LockKind::Border => "border-change",
            LockKind::Merge => "merge",
        }
    }
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token for one in-flight mutation. Serials are never reused within a manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockId {
    serial: u64,
    kind: LockKind,
}

impl LockId {
    #[inline]
    pub fn serial(self) -> u64 {
        self.serial
    }

    #[inline]
    pub fn kind(self) -> LockKind {
        self.kind
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}({})", self.serial, self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// At least one requested plot is held. Nothing was acquired.
    PlotSetLocked {
        lock: LockId,
        busy: Vec<(PlotKey, LockId)>,
    },
    /// Release named plots the lock does not hold. `None` means the plot was free.
    ReleaseMismatch {
        lock: LockId,
        plots: Vec<(PlotKey, Option<LockId>)>,
    },
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockError::PlotSetLocked { lock, busy } => {
                write!(f, "lock {} rejected, plot set is locked:", lock)?;
                for (key, holder) in busy {
                    write!(f, " {} by {}", key, holder)?;
                }
                Ok(())
            }
            LockError::ReleaseMismatch { lock, plots } => {
                write!(f, "lock {} released plots it does not hold:", lock)?;
                for (key, holder) in plots {
                    match holder {
                        Some(h) => write!(f, " {} (held by {})", key, h)?,
                        None => write!(f, " {} (free)", key)?,
                    }
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for LockError {}

#[derive(Default)]
struct LockTable {
    holders: HashMap<PlotKey, LockId>,
    registered: HashMap<LockId, BTreeSet<PlotKey>>,
}

/// Process-wide plot lock table. Construct one per server and share it via `Arc`.
///
/// Acquisition is all-or-nothing inside one critical section, so two
/// requests over intersecting plot sets can never both succeed and a
/// rejected request leaves no partial entries behind.
#[derive(Default)]
pub struct LockManager {
    table: Mutex<LockTable>,
    serial: AtomicU64,
}

fn collect_keys(sets: &[&PlotSet]) -> BTreeSet<PlotKey> {
    sets.iter().flat_map(|s| s.keys()).collect()
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self, kind: LockKind) -> LockId {
        LockId {
            serial: self.serial.fetch_add(1, Ordering::Relaxed) + 1,
            kind,
        }
    }

    fn table(&self) -> MutexGuard<'_, LockTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Silent variant: `false` when any plot of any set is held.
    pub fn try_lock(&self, id: LockId, sets: &[&PlotSet]) -> bool {
        self.lock_keys(id, &collect_keys(sets)).is_ok()
    }

    /// Loud variant of [`try_lock`](Self::try_lock).
    pub fn lock(&self, id: LockId, sets: &[&PlotSet]) -> Result<(), LockError> {
        self.lock_keys(id, &collect_keys(sets))
    }

    fn lock_keys(&self, id: LockId, keys: &BTreeSet<PlotKey>) -> Result<(), LockError> {
        let mut table = self.table();
        let busy: Vec<(PlotKey, LockId)> = keys
            .iter()
            .filter_map(|k| table.holders.get(k).map(|h| (k.clone(), *h)))
            .collect();
        if !busy.is_empty() {
            log::debug!("lock {} rejected on {} busy plot(s)", id, busy.len());
            return Err(LockError::PlotSetLocked { lock: id, busy });
        }
        for key in keys {
            table.holders.insert(key.clone(), id);
        }
        table
            .registered
            .entry(id)
            .or_default()
            .extend(keys.iter().cloned());
        Ok(())
    }

    /// Release the plots `id` took for `sets`. Entries held by another lock are
    /// left in place and reported.
    pub fn unlock(&self, id: LockId, sets: &[&PlotSet]) -> Result<(), LockError> {
        self.unlock_keys(id, &collect_keys(sets))
    }

    fn unlock_keys(&self, id: LockId, keys: &BTreeSet<PlotKey>) -> Result<(), LockError> {
        let mut mismatched = Vec::new();
        {
            let mut table = self.table();
            for key in keys {
                match table.holders.get(key).copied() {
                    Some(holder) if holder == id => {
                        table.holders.remove(key);
                    }
                    other => mismatched.push((key.clone(), other)),
                }
            }
            if let Some(owned) = table.registered.get_mut(&id) {
                for key in keys {
                    owned.remove(key);
                }
                if owned.is_empty() {
                    table.registered.remove(&id);
                }
            }
        }
        if mismatched.is_empty() {
            return Ok(());
        }
        let err = LockError::ReleaseMismatch {
            lock: id,
            plots: mismatched,
        };
        log::error!("{}", err);
        Err(err)
    }

    /// Lock `sets` under a fresh id and return a guard that releases on drop.
    pub fn acquire(
        self: &Arc<Self>,
        kind: LockKind,
        sets: &[&PlotSet],
    ) -> Result<PlotLockGuard, LockError> {
        let id = self.next_id(kind);
        let keys = collect_keys(sets);
        self.lock_keys(id, &keys)?;
        Ok(PlotLockGuard {
            manager: Arc::clone(self),
            id,
            keys,
            released: false,
        })
    }

    pub fn holder(&self, key: &PlotKey) -> Option<LockId> {
        self.table().holders.get(key).copied()
    }

    pub fn is_locked(&self, key: &PlotKey) -> bool {
        self.table().holders.contains_key(key)
    }

    pub fn locked_plots(&self) -> usize {
        self.table().holders.len()
    }

    pub fn active_locks(&self) -> usize {
        self.table().registered.len()
    }
}

/// Holds a plot-set lock for the lifetime of one mutation.
pub struct PlotLockGuard {
    manager: Arc<LockManager>,
    id: LockId,
    keys: BTreeSet<PlotKey>,
    released: bool,
}

impl PlotLockGuard {
    #[inline]
    pub fn id(&self) -> LockId {
        self.id
    }

    pub fn plots(&self) -> &BTreeSet<PlotKey> {
        &self.keys
    }

    /// Release now and surface a mismatch instead of only logging it.
    pub fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        self.manager.unlock_keys(self.id, &self.keys)
    }
}

impl Drop for PlotLockGuard {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            // Mismatches are already logged by unlock_keys.
            let _ = self.manager.unlock_keys(self.id, &self.keys);
        }
    }
}

impl fmt::Debug for PlotLockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlotLockGuard")
            .field("id", &self.id)
            .field("plots", &self.keys.len())
            .finish()
    }
}
