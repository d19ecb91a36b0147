//! Task bodies run on mutation workers. Each one only touches voxels of
//! the plot set its lock covers.

use std::collections::BTreeSet;

use hashbrown::HashSet;
use plotworld_blocks::{BiomeId, Material};
use plotworld_chunk::{VoxelBackend, VoxelError};
use plotworld_geom::{BlockBounds, PlotCoord};
use plotworld_plots::{MergePlan, PlotSet};
use plotworld_world::{PlotGrid, RoadSegment, WorldLayout};

/// Backend failure plus the writes that already landed.
#[derive(Debug)]
pub(crate) struct TaskFailure {
    pub written: u64,
    pub source: VoxelError,
}

struct Writer<'a> {
    backend: &'a dyn VoxelBackend,
    written: u64,
}

impl<'a> Writer<'a> {
    fn new(backend: &'a dyn VoxelBackend) -> Self {
        Self { backend, written: 0 }
    }

    fn voxel(&mut self, x: i32, y: i32, z: i32, material: Material) -> Result<(), TaskFailure> {
        self.backend
            .set_voxel_at(x, y, z, material)
            .map_err(|source| self.fail(source))?;
        self.written += 1;
        Ok(())
    }

    fn biome(&mut self, x: i32, z: i32, biome: BiomeId) -> Result<(), TaskFailure> {
        self.backend
            .set_biome_at(x, z, biome)
            .map_err(|source| self.fail(source))?;
        self.written += 1;
        Ok(())
    }

    fn fail(&self, source: VoxelError) -> TaskFailure {
        TaskFailure {
            written: self.written,
            source,
        }
    }
}

/// Road segments whose touching plots all lie in `members`.
pub fn merged_segments(members: &BTreeSet<PlotCoord>) -> BTreeSet<RoadSegment> {
    members
        .iter()
        .flat_map(|c| RoadSegment::anchored_at(*c))
        .filter(|s| s.plots().iter().all(|p| members.contains(p)))
        .collect()
}

/// Segments that join `source` and `target` once they form one group.
pub fn newly_merged_segments(
    source: &BTreeSet<PlotCoord>,
    target: &BTreeSet<PlotCoord>,
) -> BTreeSet<RoadSegment> {
    let union: BTreeSet<PlotCoord> = source.union(target).copied().collect();
    merged_segments(&union)
        .into_iter()
        .filter(|s| {
            let plots = s.plots();
            !plots.iter().all(|p| source.contains(p)) && !plots.iter().all(|p| target.contains(p))
        })
        .collect()
}

fn segment_merged(grid: &PlotGrid, members: &BTreeSet<PlotCoord>, x: i32, z: i32) -> bool {
    grid.segment_at(x, z)
        .is_some_and(|s| s.plots().iter().all(|p| members.contains(p)))
}

pub(crate) fn change_biome(
    backend: &dyn VoxelBackend,
    layout: &WorldLayout,
    set: &PlotSet,
    biome: BiomeId,
) -> Result<u64, TaskFailure> {
    let grid = layout.grid();
    let mut w = Writer::new(backend);
    let regions = set
        .members()
        .map(|c| grid.plot_bounds(c))
        .chain(merged_segments(set.coords()).into_iter().map(|s| grid.segment_bounds(s)));
    for bounds in regions {
        for (x, z) in bounds.columns() {
            w.biome(x, z, biome)?;
        }
    }
    Ok(w.written)
}

/// Rewrite the seam cells on the ring around every plot of the set,
/// skipping road that now lies inside the merged set.
pub(crate) fn change_border(
    backend: &dyn VoxelBackend,
    layout: &WorldLayout,
    set: &PlotSet,
    material: Material,
) -> Result<u64, TaskFailure> {
    let grid = layout.grid();
    let y = layout.border_y();
    let mut w = Writer::new(backend);
    let mut done: HashSet<(i32, i32)> = HashSet::new();
    for coord in set.members() {
        for (x, z) in grid.plot_bounds(coord).expanded(1).perimeter() {
            if !grid.is_border_column(x, z) || segment_merged(&grid, set.coords(), x, z) {
                continue;
            }
            if done.insert((x, z)) {
                w.voxel(x, y, z, material)?;
            }
        }
    }
    Ok(w.written)
}

fn fill_as_plot(
    w: &mut Writer<'_>,
    layout: &WorldLayout,
    bounds: &BlockBounds,
    biome: BiomeId,
) -> Result<(), TaskFailure> {
    let top = layout.border_y().min(layout.max_y - 1);
    for (x, z) in bounds.columns() {
        w.biome(x, z, biome)?;
        for y in layout.min_y..=top {
            let material = if y == layout.min_y {
                layout.plot_bottom
            } else if y == layout.ground_height {
                layout.plot_floor
            } else if y > layout.ground_height {
                Material::AIR
            } else {
                layout.plot_fill
            };
            w.voxel(x, y, z, material)?;
        }
    }
    Ok(())
}

/// Turn the road between the two groups into plot terrain.
pub(crate) fn merge_plots(
    backend: &dyn VoxelBackend,
    layout: &WorldLayout,
    plan: &MergePlan,
) -> Result<u64, TaskFailure> {
    let grid = layout.grid();
    let mut w = Writer::new(backend);
    for segment in newly_merged_segments(plan.source.coords(), plan.target.coords()) {
        let anchor = grid.plot_bounds(segment.anchor());
        let biome = backend
            .biome_at(anchor.min_x, anchor.min_z)
            .map_err(|source| w.fail(source))?;
        fill_as_plot(&mut w, layout, &grid.segment_bounds(segment), biome)?;
    }
    Ok(w.written)
}
