use std::fmt;
use std::time::Duration;

use plotworld_blocks::{BiomeId, Material};
use plotworld_chunk::VoxelError;
use plotworld_geom::{Direction, PlotCoord};
use plotworld_plots::{LockError, LockId, LockKind, MergeError, PlotSet};

/// A mutation as asked for by a caller, addressed by one plot of the set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MutationRequest {
    Biome { plot: PlotCoord, biome: BiomeId },
    Border { plot: PlotCoord, material: Material },
    Merge { plot: PlotCoord, direction: Direction },
}

impl MutationRequest {
    pub fn kind(&self) -> LockKind {
        match self {
            MutationRequest::Biome { .. } => LockKind::Biome,
            MutationRequest::Border { .. } => LockKind::Border,
            MutationRequest::Merge { .. } => LockKind::Merge,
        }
    }

    pub fn plot(&self) -> PlotCoord {
        match self {
            MutationRequest::Biome { plot, .. }
            | MutationRequest::Border { plot, .. }
            | MutationRequest::Merge { plot, .. } => *plot,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationData {
    Biome { biome: BiomeId, plots: PlotSet },
    Border { material: Material, plots: PlotSet },
    /// The combined set after the merge.
    Merge { plots: PlotSet },
}

impl MutationData {
    pub fn plots(&self) -> &PlotSet {
        match self {
            MutationData::Biome { plots, .. }
            | MutationData::Border { plots, .. }
            | MutationData::Merge { plots } => plots,
        }
    }
}

/// Reason a mutation did not complete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationError {
    PlotSetLocked(LockError),
    /// The merge source has no record.
    NotClaimed(PlotCoord),
    InvalidAdjacency { from: PlotCoord, to: PlotCoord },
    AlreadyMerged { from: PlotCoord, to: PlotCoord },
    GroupTooLarge { size: usize, limit: usize },
    /// Backend failed mid-task; `written` voxel and biome writes stay applied.
    Voxel { source: VoxelError, written: u64 },
    Inconsistent(String),
    WorkerPanicked,
    WorkerLost,
}

impl From<MergeError> for MutationError {
    fn from(err: MergeError) -> Self {
        match err {
            MergeError::NotClaimed(c) => MutationError::NotClaimed(c),
            MergeError::InvalidAdjacency { from, to } => MutationError::InvalidAdjacency { from, to },
            MergeError::AlreadyMerged { from, to } => MutationError::AlreadyMerged { from, to },
            MergeError::GroupTooLarge { size, limit } => MutationError::GroupTooLarge { size, limit },
            MergeError::Inconsistent(msg) => MutationError::Inconsistent(msg),
        }
    }
}

impl From<LockError> for MutationError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::ReleaseMismatch { .. } => MutationError::Inconsistent(err.to_string()),
            locked => MutationError::PlotSetLocked(locked),
        }
    }
}

impl fmt::Display for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationError::PlotSetLocked(e) => write!(f, "{}", e),
            MutationError::NotClaimed(c) => write!(f, "plot {} is not claimed", c),
            MutationError::InvalidAdjacency { from, to } => {
                write!(f, "plot {} cannot be merged into {}", to, from)
            }
            MutationError::AlreadyMerged { from, to } => {
                write!(f, "plot {} is already merged with {}", to, from)
            }
            MutationError::GroupTooLarge { size, limit } => {
                write!(f, "merged group would hold {} plots (limit {})", size, limit)
            }
            MutationError::Voxel { source, written } => {
                write!(f, "{} after {} write(s)", source, written)
            }
            MutationError::Inconsistent(msg) => write!(f, "internal inconsistency: {}", msg),
            MutationError::WorkerPanicked => f.write_str("mutation worker panicked"),
            MutationError::WorkerLost => f.write_str("mutation worker is gone"),
        }
    }
}

impl std::error::Error for MutationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MutationError::PlotSetLocked(e) => Some(e),
            MutationError::Voxel { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Outcome of one mutation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationReport {
    pub kind: LockKind,
    /// `None` when the request was rejected before a lock was taken.
    pub lock: Option<LockId>,
    pub elapsed: Duration,
    pub result: Result<MutationData, MutationError>,
}

impl MutationReport {
    pub(crate) fn rejected(kind: LockKind, err: MutationError) -> Self {
        Self {
            kind,
            lock: None,
            elapsed: Duration::ZERO,
            result: Err(err),
        }
    }

    #[inline]
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn elapsed_millis(&self) -> u64 {
        self.elapsed.as_millis().min(u128::from(u64::MAX)) as u64
    }

    /// `"<n>ms"` below one second, `"<s.ss>s"` above.
    pub fn elapsed_string(&self) -> String {
        format_elapsed(self.elapsed)
    }

    pub fn error(&self) -> Option<&MutationError> {
        self.result.as_ref().err()
    }
}

pub fn format_elapsed(elapsed: Duration) -> String {
    let ms = elapsed.as_millis();
    if ms < 1000 {
        format!("{}ms", ms)
    } else {
        format!("{:.2}s", ms as f64 / 1000.0)
    }
}
