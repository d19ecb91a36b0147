use plotworld_blocks::Material;
use plotworld_chunk::{VoxelBackend, VoxelError};
use plotworld_world::WorldLayout;

/// One character per column, looking down from the border layer.
pub fn column_glyph(
    backend: &dyn VoxelBackend,
    layout: &WorldLayout,
    x: i32,
    z: i32,
) -> Result<char, VoxelError> {
    let top = backend.voxel_at(x, layout.border_y(), z)?;
    if top == layout.border {
        return Ok('#');
    }
    if top != Material::AIR {
        return Ok('+');
    }
    let ground = backend.voxel_at(x, layout.ground_height, z)?;
    Ok(if ground == layout.road {
        '='
    } else if ground == layout.plot_floor {
        '.'
    } else if ground == Material::AIR {
        ' '
    } else {
        'o'
    })
}

/// Render `width` x `depth` columns starting at (`x0`, `z0`); north is up.
pub fn render_map(
    backend: &dyn VoxelBackend,
    layout: &WorldLayout,
    x0: i32,
    z0: i32,
    width: i32,
    depth: i32,
) -> Result<String, VoxelError> {
    let mut out = String::with_capacity(((width + 1) * depth.max(0)) as usize);
    for z in z0..z0 + depth {
        for x in x0..x0 + width {
            out.push(column_glyph(backend, layout, x, z)?);
        }
        out.push('\n');
    }
    Ok(out)
}
