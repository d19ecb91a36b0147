use plotworld_geom::{BlockBounds, Direction, PlotCoord, is_on_road_border, rasterize};

/// Maps world columns to plots and roads.
///
/// The generator rasterizes `x + origin_shift`; a raster position below
/// `road_width` is road. Plot `k` therefore starts at
/// `k * period + (road_width - origin_shift)` on each axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlotGrid {
    road_width: i32,
    plot_size: i32,
    origin_shift: i32,
    ground_height: i32,
}

/// A piece of road between plots, named by its north-west plot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoadSegment {
    /// Strip between the anchor and its east neighbour.
    East(PlotCoord),
    /// Strip between the anchor and its south neighbour.
    South(PlotCoord),
    /// Crossing square south-east of the anchor, touching four plots.
    Junction(PlotCoord),
}

impl RoadSegment {
    /// Segments owned by a plot: its east strip, south strip and south-east junction.
    pub fn anchored_at(coord: PlotCoord) -> [RoadSegment; 3] {
        [
            RoadSegment::East(coord),
            RoadSegment::South(coord),
            RoadSegment::Junction(coord),
        ]
    }

    #[inline]
    pub fn anchor(self) -> PlotCoord {
        match self {
            RoadSegment::East(c) | RoadSegment::South(c) | RoadSegment::Junction(c) => c,
        }
    }

    /// Plots whose edges this segment touches.
    pub fn plots(self) -> Vec<PlotCoord> {
        match self {
            RoadSegment::East(c) => vec![c, c.side(Direction::East)],
            RoadSegment::South(c) => vec![c, c.side(Direction::South)],
            RoadSegment::Junction(c) => vec![
                c,
                c.side(Direction::East),
                c.side(Direction::South),
                c.side(Direction::East).side(Direction::South),
            ],
        }
    }
}

impl PlotGrid {
    pub fn new(road_width: i32, plot_size: i32, origin_shift: i32, ground_height: i32) -> Self {
        debug_assert!(road_width > 0 && plot_size > 0);
        Self {
            road_width,
            plot_size,
            origin_shift,
            ground_height,
        }
    }

    #[inline]
    pub fn road_width(&self) -> i32 {
        self.road_width
    }

    #[inline]
    pub fn plot_size(&self) -> i32 {
        self.plot_size
    }

    #[inline]
    pub fn period(&self) -> i32 {
        self.road_width.saturating_add(self.plot_size)
    }

    #[inline]
    fn offset(&self) -> i64 {
        i64::from(self.road_width) - i64::from(self.origin_shift)
    }

    /// Position of a world axis coordinate within one road+plot period.
    #[inline]
    pub fn raster(&self, axis: i32) -> i32 {
        let p = self.period();
        // Both terms are already in [0, p), so the sum cannot wrap.
        rasterize(rasterize(axis, p) + rasterize(self.origin_shift, p), p)
    }

    #[inline]
    pub fn is_road(&self, x: i32, z: i32) -> bool {
        self.raster(x) < self.road_width || self.raster(z) < self.road_width
    }

    /// Road column carrying the border block (seam on either axis).
    #[inline]
    pub fn is_border_column(&self, x: i32, z: i32) -> bool {
        is_on_road_border(self.raster(x), self.road_width)
            || is_on_road_border(self.raster(z), self.road_width)
    }

    // (cell index, inside road) along one axis
    #[inline]
    fn axis_cell(&self, axis: i32) -> (i32, bool) {
        let period = i64::from(self.period());
        let shifted = i64::from(axis) - self.offset();
        (
            clamp_i32(shifted.div_euclid(period)),
            shifted.rem_euclid(period) >= i64::from(self.plot_size),
        )
    }

    /// Grid cell of a world column. Road columns map to the cell west/north of them.
    #[inline]
    pub fn world_to_plot(&self, x: i32, z: i32) -> PlotCoord {
        PlotCoord::new(self.axis_cell(x).0, self.axis_cell(z).0)
    }

    /// The plot a column belongs to, `None` on roads.
    pub fn plot_at(&self, x: i32, z: i32) -> Option<PlotCoord> {
        if self.is_road(x, z) {
            return None;
        }
        Some(self.world_to_plot(x, z))
    }

    pub fn plot_bounds(&self, coord: PlotCoord) -> BlockBounds {
        let start = |cell: i32| clamp_i32(i64::from(cell) * i64::from(self.period()) + self.offset());
        let min_x = start(coord.x);
        let min_z = start(coord.z);
        BlockBounds::new(
            min_x,
            min_z,
            min_x.saturating_add(self.plot_size - 1),
            min_z.saturating_add(self.plot_size - 1),
            self.ground_height,
        )
    }

    #[inline]
    pub fn side(&self, coord: PlotCoord, direction: Direction) -> PlotCoord {
        coord.side(direction)
    }

    /// Road segment containing a column, `None` inside plots.
    pub fn segment_at(&self, x: i32, z: i32) -> Option<RoadSegment> {
        let (ix, road_x) = self.axis_cell(x);
        let (iz, road_z) = self.axis_cell(z);
        let anchor = PlotCoord::new(ix, iz);
        match (road_x, road_z) {
            (false, false) => None,
            (true, false) => Some(RoadSegment::East(anchor)),
            (false, true) => Some(RoadSegment::South(anchor)),
            (true, true) => Some(RoadSegment::Junction(anchor)),
        }
    }

    pub fn segment_bounds(&self, segment: RoadSegment) -> BlockBounds {
        let b = self.plot_bounds(segment.anchor());
        let rw = self.road_width;
        let (min_x, max_x) = match segment {
            RoadSegment::South(_) => (b.min_x, b.max_x),
            RoadSegment::East(_) | RoadSegment::Junction(_) => {
                (b.max_x.saturating_add(1), b.max_x.saturating_add(rw))
            }
        };
        let (min_z, max_z) = match segment {
            RoadSegment::East(_) => (b.min_z, b.max_z),
            RoadSegment::South(_) | RoadSegment::Junction(_) => {
                (b.max_z.saturating_add(1), b.max_z.saturating_add(rw))
            }
        };
        BlockBounds::new(min_x, min_z, max_x, max_z, self.ground_height)
    }
}

#[inline]
fn clamp_i32(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
