use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use hashbrown::{HashMap, HashSet};
use plotworld_geom::{Direction, PlotCoord};

type GroupId = u32;

/// Merge relation kept as explicit closed groups.
///
/// A plot that was never merged has no entry and forms a group of one.
/// Every stored group has at least two members, is 4-connected, and each
/// member maps back to it.
#[derive(Clone, Debug, Default)]
pub struct MergeGroups {
    group_of: HashMap<PlotCoord, GroupId>,
    groups: HashMap<GroupId, BTreeSet<PlotCoord>>,
    next_group: GroupId,
}

impl MergeGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// The plot itself plus every plot merged with it.
    pub fn closure(&self, coord: PlotCoord) -> BTreeSet<PlotCoord> {
        match self.group_of.get(&coord).and_then(|g| self.groups.get(g)) {
            Some(members) => members.clone(),
            None => BTreeSet::from([coord]),
        }
    }

    /// Size of the closure without cloning it.
    pub fn closure_len(&self, coord: PlotCoord) -> usize {
        self.group_of
            .get(&coord)
            .and_then(|g| self.groups.get(g))
            .map_or(1, BTreeSet::len)
    }

    pub fn merged_with(&self, coord: PlotCoord) -> BTreeSet<PlotCoord> {
        let mut members = self.closure(coord);
        members.remove(&coord);
        members
    }

    pub fn are_merged(&self, a: PlotCoord, b: PlotCoord) -> bool {
        if a == b {
            return true;
        }
        match (self.group_of.get(&a), self.group_of.get(&b)) {
            (Some(ga), Some(gb)) => ga == gb,
            _ => false,
        }
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Check that `b` may join `a`'s group: adjacent and not merged yet.
    pub fn check_union(&self, a: PlotCoord, b: PlotCoord) -> Result<(), MergeError> {
        if self.are_merged(a, b) {
            return Err(MergeError::AlreadyMerged { from: a, to: b });
        }
        if !a.is_adjacent(b) {
            return Err(MergeError::InvalidAdjacency { from: a, to: b });
        }
        Ok(())
    }

    /// Join the groups of two adjacent plots; returns the combined closure.
    pub fn union(&mut self, a: PlotCoord, b: PlotCoord) -> Result<BTreeSet<PlotCoord>, MergeError> {
        self.check_union(a, b)?;
        let ga = self.ensure_group(a);
        let gb = self.ensure_group(b);
        let (keep, absorb) = if self.group_len(ga) >= self.group_len(gb) {
            (ga, gb)
        } else {
            (gb, ga)
        };
        let moved = self.groups.remove(&absorb).unwrap_or_default();
        for c in &moved {
            self.group_of.insert(*c, keep);
        }
        let combined = {
            let members = self.groups.entry(keep).or_default();
            members.extend(moved);
            members.clone()
        };
        debug_assert_eq!(self.validate(), Ok(()));
        Ok(combined)
    }

    fn group_len(&self, g: GroupId) -> usize {
        self.groups.get(&g).map_or(0, BTreeSet::len)
    }

    fn ensure_group(&mut self, coord: PlotCoord) -> GroupId {
        if let Some(g) = self.group_of.get(&coord) {
            return *g;
        }
        let g = self.next_group;
        self.next_group = self.next_group.wrapping_add(1);
        self.group_of.insert(coord, g);
        self.groups.insert(g, BTreeSet::from([coord]));
        g
    }

    /// Verify the closure invariants over every stored group.
    pub fn validate(&self) -> Result<(), MergeError> {
        for (coord, g) in &self.group_of {
            match self.groups.get(g) {
                Some(members) if members.contains(coord) => {}
                _ => {
                    return Err(MergeError::Inconsistent(format!(
                        "plot {} points at group {} which does not hold it",
                        coord, g
                    )));
                }
            }
        }
        for (g, members) in &self.groups {
            if members.len() < 2 {
                return Err(MergeError::Inconsistent(format!(
                    "group {} has {} member(s)",
                    g,
                    members.len()
                )));
            }
            for c in members {
                if self.group_of.get(c) != Some(g) {
                    return Err(MergeError::Inconsistent(format!(
                        "plot {} listed in group {} but mapped elsewhere",
                        c, g
                    )));
                }
            }
            if !is_connected(members) {
                return Err(MergeError::Inconsistent(format!(
                    "group {} is not edge-connected",
                    g
                )));
            }
        }
        Ok(())
    }
}

fn is_connected(members: &BTreeSet<PlotCoord>) -> bool {
    let Some(start) = members.iter().next().copied() else {
        return true;
    };
    let mut seen: HashSet<PlotCoord> = HashSet::new();
    let mut queue = VecDeque::from([start]);
    seen.insert(start);
    while let Some(c) = queue.pop_front() {
        for d in Direction::ALL {
            let n = c.side(d);
            if members.contains(&n) && seen.insert(n) {
                queue.push_back(n);
            }
        }
    }
    seen.len() == members.len()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// The source plot has no record.
    NotClaimed(PlotCoord),
    /// The target does not share an edge with the source or is not a claimed plot.
    InvalidAdjacency { from: PlotCoord, to: PlotCoord },
    AlreadyMerged { from: PlotCoord, to: PlotCoord },
    GroupTooLarge { size: usize, limit: usize },
    Inconsistent(String),
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeError::NotClaimed(c) => write!(f, "plot {} is not claimed", c),
            MergeError::InvalidAdjacency { from, to } => {
                write!(f, "plot {} is not a valid merge neighbour of {}", to, from)
            }
            MergeError::AlreadyMerged { from, to } => {
                write!(f, "plot {} is already merged with {}", to, from)
            }
            MergeError::GroupTooLarge { size, limit } => {
                write!(f, "merged group would hold {} plots (limit {})", size, limit)
            }
            MergeError::Inconsistent(msg) => write!(f, "merge groups inconsistent: {}", msg),
        }
    }
}

impl std::error::Error for MergeError {}
