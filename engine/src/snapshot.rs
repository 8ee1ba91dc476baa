//! Read-side snapshots for an external renderer or exporter.
//!
//! The engine owns no mesh or file format; it hands out per-cell heights
//! and colors in a brick-offset vertex layout (odd rows shifted half a cell
//! right, matching the hexagonal neighborhood the simulation runs on) and
//! can stream the raw heightfield as CSV.

use std::io::Write;

use bytemuck::{Pod, Zeroable};

use crate::field::Material;
use crate::world::World;

/// One renderable cell, laid out for direct GPU upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct HeightVertex {
    /// World-space position; y is the cell's surface height.
    pub pos: [f32; 3],
    /// RGBA color.
    pub color: [u8; 4],
}

const OCEAN_BLUE: [u8; 4] = [28, 107, 160, 255];
const BEDROCK_GREY: [u8; 4] = [79, 70, 60, 255];
const MOUNTAIN_GREY: [u8; 4] = [140, 127, 112, 255];
const SAND_BROWN: [u8; 4] = [100, 105, 64, 255];
const YELLOW: [u8; 4] = [255, 255, 0, 255];
const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];

fn lerp(a: [u8; 4], b: [u8; 4], t: f32) -> [u8; 4] {
    let t = t.clamp(0.0, 1.0);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = (a[i] as f32 + (b[i] as f32 - a[i] as f32) * t) as u8;
    }
    out
}

/// Visual epoch of the world; selects a height-to-color palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Young crust: molten lows fading into bare rock.
    Cooling,
    /// Oceans present: rock shaded by elevation, water drawn flat.
    Water,
    /// Vegetated epoch: shores and green highlands.
    Life,
}

impl Stage {
    /// Color for a height normalized to `[0, 1]` against a sea level in the
    /// same scale.
    pub fn pick_color(&self, normalized_height: f32, sea_level: f32) -> [u8; 4] {
        match self {
            Stage::Cooling => {
                if normalized_height <= sea_level {
                    lerp(YELLOW, RED, normalized_height / sea_level.max(f32::EPSILON))
                } else if normalized_height < sea_level + 0.2 {
                    BEDROCK_GREY
                } else {
                    let t = (normalized_height - (sea_level + 0.2)) / (1.0 - (sea_level + 0.2));
                    lerp(BEDROCK_GREY, MOUNTAIN_GREY, t)
                }
            }
            Stage::Water => {
                if normalized_height <= sea_level {
                    OCEAN_BLUE
                } else {
                    lerp(BEDROCK_GREY, MOUNTAIN_GREY, normalized_height)
                }
            }
            Stage::Life => {
                if normalized_height <= 0.45 {
                    lerp(BEDROCK_GREY, MOUNTAIN_GREY, normalized_height / 0.45)
                } else if normalized_height < 0.55 {
                    SAND_BROWN
                } else {
                    lerp(BEDROCK_GREY, GREEN, normalized_height)
                }
            }
        }
    }
}

/// Flat color by surface material, for ownership debugging views.
pub fn material_color(material: Material) -> [u8; 4] {
    match material {
        Material::Oceanic => OCEAN_BLUE,
        Material::Continental => SAND_BROWN,
    }
}

/// Build the full vertex array for the current tick, row-major, odd rows
/// shifted by half a cell width.
pub fn snapshot_vertices(world: &World, stage: Stage) -> Vec<HeightVertex> {
    let grid = &world.grid;
    let cell = grid.cell_size;
    let half = cell * 0.5;
    let sea = (world.sea_height() - world.params.base_height) / world.params.max_height;
    let mut verts = Vec::with_capacity(grid.cells());
    for z in 0..grid.height {
        let offset = if z % 2 == 0 { 0.0 } else { half };
        for x in 0..grid.width {
            let height = world.field.surface_height(grid.idx(x, z));
            let normalized = (height - world.params.base_height) / world.params.max_height;
            verts.push(HeightVertex {
                pos: [x as f32 * cell + offset, height, z as f32 * cell],
                color: stage.pick_color(normalized, sea),
            });
        }
    }
    verts
}

/// Stream the surface heightfield as CSV, one grid row per line.
pub fn write_heights_csv<W: Write>(world: &World, out: &mut W) -> std::io::Result<()> {
    let grid = &world.grid;
    for z in 0..grid.height {
        for x in 0..grid.width {
            if x > 0 {
                write!(out, ",")?;
            }
            write!(out, "{}", world.field.surface_height(grid.idx(x, z)))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimParams;

    fn small_world() -> World {
        World::new(SimParams {
            width: 8,
            height: 8,
            plate_count: 2,
            seed: 42,
            ..SimParams::default()
        })
        .unwrap()
    }

    #[test]
    fn vertex_layout_is_pod_sized() {
        assert_eq!(std::mem::size_of::<HeightVertex>(), 16);
    }

    #[test]
    fn odd_rows_are_brick_offset() {
        let world = small_world();
        let verts = snapshot_vertices(&world, Stage::Water);
        assert_eq!(verts.len(), 64);
        assert_eq!(verts[0].pos[0], 0.0);
        // row 1 starts half a cell to the right of row 0
        assert_eq!(verts[8].pos[0], 0.5);
    }

    #[test]
    fn csv_has_one_line_per_row() {
        let world = small_world();
        let mut buf = Vec::new();
        write_heights_csv(&world, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 8);
        assert_eq!(text.lines().next().unwrap().split(',').count(), 8);
    }
}
