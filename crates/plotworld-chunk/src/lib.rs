//! Chunk buffers, the voxel backend seam, and plot world generation.
#![forbid(unsafe_code)]

mod backend;
mod buf;
mod generator;
mod memory;

pub use backend::{VoxelBackend, VoxelError};
pub use buf::ChunkBuf;
pub use generator::{ChunkGenerator, PlotGenerator, generate_chunk_buffer};
pub use memory::{MemoryBackend, MemoryBackendStats};
