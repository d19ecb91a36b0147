use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use plotworld_geom::PlotCoord;

/// Plot identity across worlds. Ordered by world, then coordinate.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlotKey {
    pub world: Arc<str>,
    pub coord: PlotCoord,
}

impl PlotKey {
    pub fn new(world: impl Into<Arc<str>>, coord: PlotCoord) -> Self {
        Self {
            world: world.into(),
            coord,
        }
    }
}

impl fmt::Display for PlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.world, self.coord)
    }
}

/// Snapshot of one claimed plot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plot {
    pub key: PlotKey,
    pub owner: Option<String>,
    /// Every other plot in this plot's merge group.
    pub merged: BTreeSet<PlotCoord>,
}

impl Plot {
    #[inline]
    pub fn has_owner(&self) -> bool {
        self.owner.is_some()
    }

    #[inline]
    pub fn is_owner(&self, who: &str) -> bool {
        self.owner.as_deref() == Some(who)
    }

    #[inline]
    pub fn is_merged_with(&self, coord: PlotCoord) -> bool {
        self.merged.contains(&coord)
    }
}

/// A plot together with everything merged with it. Only built from a
/// merge-group closure, so it never holds a dangling merge edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlotSet {
    world: Arc<str>,
    origin: PlotCoord,
    members: BTreeSet<PlotCoord>,
}

impl PlotSet {
    pub(crate) fn from_closure(
        world: Arc<str>,
        origin: PlotCoord,
        members: BTreeSet<PlotCoord>,
    ) -> Self {
        debug_assert!(members.contains(&origin));
        Self {
            world,
            origin,
            members,
        }
    }

    #[inline]
    pub fn world(&self) -> &str {
        &self.world
    }

    /// The plot the set was resolved from.
    #[inline]
    pub fn origin(&self) -> PlotCoord {
        self.origin
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[inline]
    pub fn contains(&self, coord: PlotCoord) -> bool {
        self.members.contains(&coord)
    }

    /// Members in `PlotCoord` order.
    pub fn members(&self) -> impl Iterator<Item = PlotCoord> + '_ {
        self.members.iter().copied()
    }

    pub fn coords(&self) -> &BTreeSet<PlotCoord> {
        &self.members
    }

    pub fn keys(&self) -> impl Iterator<Item = PlotKey> + '_ {
        self.members.iter().map(|c| PlotKey {
            world: Arc::clone(&self.world),
            coord: *c,
        })
    }

    /// Union of two closures of the same world; the origin stays `self`'s.
    pub fn union(&self, other: &PlotSet) -> PlotSet {
        debug_assert_eq!(self.world, other.world);
        let mut members = self.members.clone();
        members.extend(other.members.iter().copied());
        PlotSet::from_closure(Arc::clone(&self.world), self.origin, members)
    }

    /// Short form used in log lines: `[x;z, x;z]`.
    pub fn describe(&self) -> String {
        let parts: Vec<String> = self.members.iter().map(|c| c.to_string()).collect();
        format!("[{}]", parts.join(", "))
    }
}
