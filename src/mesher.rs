use rayon::prelude::*;
use tracing::debug;

use crate::{
    config::GeometryScaling,
    datatypes::{CellState, Edge, Grid, Resolution, VoidSet},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64) -> Vertex {
        Vertex { x, y }
    }
}

/// Orientation test for three points
///
/// Evaluates the determinant of the homogeneous 3x3 matrix `[a b c; 1 1 1]`.
///
/// # Returns
/// True if `a`, `b`, `c` turn counter-clockwise. Collinear triples are
/// reported as false.
pub fn ccw(a: Vertex, b: Vertex, c: Vertex) -> bool {
    let det = a.x * (b.y - c.y) - b.x * (a.y - c.y) + c.x * (a.y - b.y);
    det > 0.0
}

/// Checks whether segments `(a, b)` and `(c, d)` cross
pub fn segments_intersect(a: Vertex, b: Vertex, c: Vertex, d: Vertex) -> bool {
    ccw(a, b, c) != ccw(a, b, d) && ccw(c, d, a) != ccw(c, d, b)
}

/// Active edges scaled into grid-index units
///
/// # Arguments
/// * `edges` - Design-space edges
/// * `resolution` - The grid resolution
/// * `scaling` - Scale factors applied per unit of `nelx` and `nely`
fn scale_edges(
    edges: &[Edge],
    resolution: Resolution,
    scaling: &GeometryScaling,
) -> Vec<(Vertex, Vertex)> {
    let sx = scaling.x_scale * resolution.nelx as f64;
    let sy = scaling.y_scale * resolution.nely as f64;

    edges
        .iter()
        .filter(|e| e.active)
        .map(|e| {
            (
                Vertex::new(sx * e.x1, sy * e.y1),
                Vertex::new(sx * e.x2, sy * e.y2),
            )
        })
        .collect()
}

/// Ray-casting membership test
///
/// # Arguments
/// * `point` - The point to classify, in grid-index units
/// * `segments` - Scaled hole boundary
/// * `ray_origin` - Far end of the ray
///
/// # Returns
/// True if the ray crosses the boundary an odd number of times
pub fn inside_polygon(point: Vertex, segments: &[(Vertex, Vertex)], ray_origin: Vertex) -> bool {
    let crossings = segments
        .iter()
        .filter(|(c, d)| segments_intersect(ray_origin, point, *c, *d))
        .count();

    crossings % 2 == 1
}

/// Representative point of cell `(row, col)`: 1-based column, row counted
/// from the bottom
fn cell_point(row: usize, col: usize, resolution: Resolution) -> Vertex {
    Vertex::new((col + 1) as f64, (resolution.nely - row - 1) as f64)
}

/// Labels every grid cell solid or void
///
/// # Arguments
/// * `edges` - The hole boundary
/// * `resolution` - The grid resolution
/// * `scaling` - Design-space to grid-index mapping
///
/// # Returns
/// The solid/void grid and its void element set
pub fn classify(
    edges: &[Edge],
    resolution: Resolution,
    scaling: &GeometryScaling,
) -> (Grid, VoidSet) {
    let segments = scale_edges(edges, resolution, scaling);
    let ray_origin = Vertex::new(scaling.ray_origin.0, scaling.ray_origin.1);

    let skipped = edges.len() - segments.len();
    if skipped > 0 {
        debug!("skipping {skipped} inactive edges");
    }

    // column-major, matching element numbering
    let cells: Vec<CellState> = (0..resolution.num_elements())
        .into_par_iter()
        .map(|idx| {
            let col = idx / resolution.nely;
            let row = idx % resolution.nely;
            if inside_polygon(cell_point(row, col, resolution), &segments, ray_origin) {
                CellState::Void
            } else {
                CellState::Solid
            }
        })
        .collect();

    let grid = Grid::from_cells(resolution, cells);
    let void_set = grid.void_set();

    debug!(
        "classified {} elements: {} void",
        resolution.num_elements(),
        void_set.len()
    );

    (grid, void_set)
}
