//! One-time cylindrical Voronoi plate partitioning.
//!
//! Seed sites are sampled in the W x H rectangle and replicated at +W and
//! +2W; the Voronoi cell of every copy is built over the tripled domain by
//! clipping the domain rectangle against the perpendicular bisector of each
//! other site. Keeping, per plate, the copy whose region has a vertex in the
//! middle third [W, 2W) and no vertex left of W, then shifting it back by
//! -W, yields exactly one wrap-correct region per plate across the x seam.
//!
//! Only x wraps here (a cylinder). Advection wraps both axes, so regions
//! that should wrap across z are not generated; the mismatch is a known
//! model property, kept rather than reconciled.

use rand::rngs::StdRng;
use rand::Rng;

use crate::config::SimParams;
use crate::field::GridField;
use crate::grid::Grid;
use crate::plate::{Plate, INVALID_PLATE_ID};

/// A polygonal plate region in domain coordinates, vertices in order.
pub type Region = Vec<(f32, f32)>;

/// Summary of the partition pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartitionStats {
    /// Plates whose region survived selection and was filled.
    pub regions_filled: u32,
    /// Regions skipped as degenerate (< 3 vertices).
    pub regions_degenerate: u32,
    /// Cells healed by the neighbor-copy correction pass.
    pub cells_healed: u32,
}

/// Clip polygon `poly` against the half-plane of points closer to `site`
/// than to `other` (Sutherland-Hodgman step). A point p is kept when
/// `(other - site) . p <= (|other|^2 - |site|^2) / 2`.
fn clip_bisector(poly: &Region, site: (f32, f32), other: (f32, f32)) -> Region {
    let nx = other.0 - site.0;
    let nz = other.1 - site.1;
    let c = (other.0 * other.0 + other.1 * other.1 - site.0 * site.0 - site.1 * site.1) / 2.0;
    let side = |p: (f32, f32)| nx * p.0 + nz * p.1 - c;

    let mut out = Vec::with_capacity(poly.len() + 1);
    for i in 0..poly.len() {
        let a = poly[i];
        let b = poly[(i + 1) % poly.len()];
        let (da, db) = (side(a), side(b));
        if da <= 0.0 {
            out.push(a);
        }
        if (da < 0.0 && db > 0.0) || (da > 0.0 && db < 0.0) {
            let t = da / (da - db);
            out.push((a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1)));
        }
    }
    out
}

/// Voronoi cell of `site` over the rectangle [0,3W]x[0,H], clipped against
/// every entry of `all_sites` except `site` itself.
fn voronoi_cell(site: (f32, f32), all_sites: &[(f32, f32)], w3: f32, h: f32) -> Region {
    let mut poly: Region = vec![(0.0, 0.0), (w3, 0.0), (w3, h), (0.0, h)];
    for &other in all_sites {
        if other == site {
            continue;
        }
        poly = clip_bisector(&poly, site, other);
        if poly.len() < 3 {
            break;
        }
    }
    poly
}

/// Build one wrap-correct region per centroid. Returns `None` for a
/// centroid whose surviving copy degenerated below 3 vertices.
fn build_regions(centroids: &[(f32, f32)], width: f32, height: f32) -> Vec<Option<Region>> {
    let mut all_sites = Vec::with_capacity(centroids.len() * 3);
    for &(x, z) in centroids {
        all_sites.push((x, z));
        all_sites.push((x + width, z));
        all_sites.push((x + 2.0 * width, z));
    }

    let mut regions = Vec::with_capacity(centroids.len());
    for &(x, z) in centroids {
        let mut chosen: Option<Region> = None;
        for copy in 0..3 {
            let site = (x + copy as f32 * width, z);
            let cell = voronoi_cell(site, &all_sites, 3.0 * width, height);
            if cell.len() < 3 {
                continue;
            }
            let in_middle = cell.iter().any(|p| p.0 >= width && p.0 < 2.0 * width);
            let none_left = cell.iter().all(|p| p.0 >= width);
            if in_middle && none_left {
                chosen = Some(cell.iter().map(|p| (p.0 - width, p.1)).collect());
                break;
            }
        }
        regions.push(chosen);
    }
    regions
}

/// Vertex-average of a region, the Lloyd relaxation target.
fn region_centroid(region: &Region) -> (f32, f32) {
    let mut cx = 0.0;
    let mut cz = 0.0;
    for &(x, z) in region {
        cx += x;
        cz += z;
    }
    let n = region.len() as f32;
    (cx / n, cz / n)
}

/// Fill one region's cells with `plate`. Horizontal scanline through each
/// row center; edge crossings sorted and paired as in/out spans, x wrapped
/// modulo W.
fn fill_region(grid: &Grid, field: &mut GridField, region: &Region, plate: u16) {
    for z in 0..grid.height {
        let scan = z as f32 + 0.5;
        let mut markers: Vec<f32> = Vec::new();
        for i in 0..region.len() {
            let a = region[i];
            let b = region[(i + 1) % region.len()];
            if (a.1 <= scan && b.1 > scan) || (b.1 <= scan && a.1 > scan) {
                let t = (scan - a.1) / (b.1 - a.1);
                markers.push(a.0 + t * (b.0 - a.0));
            }
        }
        markers.sort_by(f32::total_cmp);
        for pair in markers.chunks_exact(2) {
            let (start, end) = (pair[0], pair[1]);
            let mut x = start.floor() as i32;
            while (x as f32 + 0.5) < end {
                if (x as f32 + 0.5) >= start {
                    let cell = grid.idx(grid.wrap_x(x), z);
                    if let Some(id) = field.surface(cell) {
                        field.nodes.get_mut(id).plate = plate;
                    }
                }
                x += 1;
            }
        }
    }
}

/// Assign every unowned surface node the owner of its first owned neighbor
/// in fixed order +x, +z, -x, -z (both axes wrapping). Repeats until no
/// cell changes, so isolated gaps flood in deterministically. Returns the
/// number of repairs. Shared with the post-resolution invariant check.
pub fn heal_plate_owners(grid: &Grid, field: &mut GridField) -> u32 {
    let mut healed = 0;
    loop {
        let mut changed = false;
        for z in 0..grid.height {
            for x in 0..grid.width {
                let cell = grid.idx(x, z);
                let Some(id) = field.surface(cell) else {
                    continue;
                };
                if field.nodes.get(id).plate != INVALID_PLATE_ID {
                    continue;
                }
                let neighbors = [
                    grid.wrap(x as i32 + 1, z as i32),
                    grid.wrap(x as i32, z as i32 + 1),
                    grid.wrap(x as i32 - 1, z as i32),
                    grid.wrap(x as i32, z as i32 - 1),
                ];
                for (nx, nz) in neighbors {
                    let Some(nid) = field.surface(grid.idx(nx, nz)) else {
                        continue;
                    };
                    let owner = field.nodes.get(nid).plate;
                    if owner != INVALID_PLATE_ID {
                        field.nodes.get_mut(id).plate = owner;
                        healed += 1;
                        changed = true;
                        break;
                    }
                }
            }
        }
        if !changed {
            return healed;
        }
    }
}

/// Carve the field into plates. Creates one `Plate` per centroid with
/// random density in [0.4, 1.0) and default height in [1, 5), builds the
/// wrap-correct Voronoi regions (with optional Lloyd relaxation), fills
/// them, then heals any unfilled cells.
pub fn partition_plates(
    grid: &Grid,
    field: &mut GridField,
    sim: &SimParams,
    rng: &mut StdRng,
) -> (Vec<Plate>, PartitionStats) {
    let (w, h) = (grid.width as f32, grid.height as f32);

    let mut plates = Vec::with_capacity(sim.plate_count as usize);
    let mut centroids = Vec::with_capacity(sim.plate_count as usize);
    for _ in 0..sim.plate_count {
        centroids.push((rng.gen_range(0.0..w), rng.gen_range(0.0..h)));
        let default_height = rng.gen_range(1.0..5.0);
        let density = rng.gen_range(0.4..1.0);
        plates.push(Plate::new(default_height, density));
    }

    let mut regions = build_regions(&centroids, w, h);
    for _ in 0..sim.voronoi_relaxation_steps {
        // A Lloyd round can lose a centroid when its copy degenerates;
        // those keep their previous position.
        for (i, region) in regions.iter().enumerate() {
            if let Some(r) = region {
                centroids[i] = region_centroid(r);
            }
        }
        regions = build_regions(&centroids, w, h);
    }

    let mut stats = PartitionStats::default();
    for (i, region) in regions.iter().enumerate() {
        match region {
            Some(r) => {
                fill_region(grid, field, r, i as u16);
                stats.regions_filled += 1;
            }
            None => stats.regions_degenerate += 1,
        }
    }
    stats.cells_healed = heal_plate_owners(grid, field);

    (plates, stats)
}
