//! World layout parameters and the plot grid built from them.
#![forbid(unsafe_code)]

pub mod layout;

mod chunk_coord;
mod grid;

pub use chunk_coord::{CHUNK_EDGE, ChunkCoord};
pub use grid::{PlotGrid, RoadSegment};
pub use layout::{LayoutBlocks, LayoutError, WorldLayout, WorldLayoutConfig, load_layout_from_path};
