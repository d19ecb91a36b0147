use std::collections::BTreeSet;
use std::sync::Arc;

use hashbrown::HashMap;
use plotworld_geom::{Direction, PlotCoord};

use crate::merge::{MergeError, MergeGroups};
use crate::plot::{Plot, PlotKey, PlotSet};

#[derive(Clone, Debug, Default)]
struct PlotRecord {
    owner: Option<String>,
}

/// Claimed plots of one world and their merge groups.
#[derive(Debug)]
pub struct PlotRegistry {
    world: Arc<str>,
    plots: HashMap<PlotCoord, PlotRecord>,
    groups: MergeGroups,
}

/// A validated merge request: both closures resolved before locking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergePlan {
    pub source: PlotSet,
    pub target: PlotSet,
}

impl MergePlan {
    /// Everything the merge touches; the set to lock.
    pub fn union(&self) -> PlotSet {
        self.source.union(&self.target)
    }
}

impl PlotRegistry {
    pub fn new(world: impl Into<Arc<str>>) -> Self {
        Self {
            world: world.into(),
            plots: HashMap::new(),
            groups: MergeGroups::new(),
        }
    }

    #[inline]
    pub fn world(&self) -> &str {
        &self.world
    }

    /// Claim a plot. Returns `false` when it already had a record.
    pub fn claim(&mut self, coord: PlotCoord, owner: Option<&str>) -> bool {
        if self.plots.contains_key(&coord) {
            return false;
        }
        self.plots.insert(
            coord,
            PlotRecord {
                owner: owner.map(str::to_owned),
            },
        );
        log::debug!("plot {};{} claimed by {:?}", self.world, coord, owner);
        true
    }

    #[inline]
    pub fn is_claimed(&self, coord: PlotCoord) -> bool {
        self.plots.contains_key(&coord)
    }

    pub fn claimed_count(&self) -> usize {
        self.plots.len()
    }

    pub fn plot(&self, coord: PlotCoord) -> Option<Plot> {
        let record = self.plots.get(&coord)?;
        Some(Plot {
            key: PlotKey::new(Arc::clone(&self.world), coord),
            owner: record.owner.clone(),
            merged: self.groups.merged_with(coord),
        })
    }

    /// Resolve the merge closure of `coord`. Unclaimed plots resolve to themselves.
    pub fn plot_set(&self, coord: PlotCoord) -> PlotSet {
        PlotSet::from_closure(Arc::clone(&self.world), coord, self.groups.closure(coord))
    }

    pub fn are_merged(&self, a: PlotCoord, b: PlotCoord) -> bool {
        self.groups.are_merged(a, b)
    }

    pub fn groups(&self) -> &MergeGroups {
        &self.groups
    }

    /// Validate merging `source` with its neighbour in `direction`.
    pub fn plan_merge(
        &self,
        source: PlotCoord,
        direction: Direction,
        max_group_size: usize,
    ) -> Result<MergePlan, MergeError> {
        self.plan_merge_with(source, source.side(direction), max_group_size)
    }

    pub fn plan_merge_with(
        &self,
        source: PlotCoord,
        target: PlotCoord,
        max_group_size: usize,
    ) -> Result<MergePlan, MergeError> {
        if !self.is_claimed(source) {
            return Err(MergeError::NotClaimed(source));
        }
        if !self.is_claimed(target) {
            return Err(MergeError::InvalidAdjacency {
                from: source,
                to: target,
            });
        }
        self.groups.check_union(source, target)?;
        let size = self.groups.closure_len(source) + self.groups.closure_len(target);
        if size > max_group_size {
            return Err(MergeError::GroupTooLarge {
                size,
                limit: max_group_size,
            });
        }
        Ok(MergePlan {
            source: self.plot_set(source),
            target: self.plot_set(target),
        })
    }

    /// Record a planned merge. Fails when the groups moved since planning.
    pub fn commit_merge(&mut self, plan: &MergePlan) -> Result<PlotSet, MergeError> {
        let from = plan.source.origin();
        let to = plan.target.origin();
        if self.groups.closure(from) != *plan.source.coords()
            || self.groups.closure(to) != *plan.target.coords()
        {
            return Err(MergeError::Inconsistent(format!(
                "merge groups of {} and {} changed after planning",
                from, to
            )));
        }
        let members: BTreeSet<PlotCoord> = self.groups.union(from, to)?;
        log::debug!(
            "merged {};{} with {};{}, group now holds {} plot(s)",
            self.world,
            from,
            self.world,
            to,
            members.len()
        );
        Ok(PlotSet::from_closure(Arc::clone(&self.world), from, members))
    }
}
