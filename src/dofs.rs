use std::collections::HashMap;

use petgraph::unionfind::UnionFind;
use rayon::prelude::*;
use tracing::debug;

use crate::{
    datatypes::{ElementDofs, Grid, Resolution},
    element::ElementStiffness,
};

/// One `(row, col, value)` contribution to the global stiffness matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triplet {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

/// Global DOF offsets of an element's corners relative to its bottom-left x DOF
fn dof_offsets(nely: usize) -> [isize; 8] {
    let n = nely as isize;
    [0, 1, 2 * n + 2, 2 * n + 3, 2 * n, 2 * n + 1, -2, -1]
}

/// Computes the 8 global DOFs of an element
///
/// # Arguments
/// * `element` - 0-based column-major element index
/// * `resolution` - The grid resolution
pub fn element_dofs(element: usize, resolution: Resolution) -> [usize; 8] {
    let col = element / resolution.nely;
    let row = element % resolution.nely;

    // x DOF of the node below the top-left corner
    let base = 2 * (resolution.node_index(row, col) + 1) as isize;

    dof_offsets(resolution.nely).map(|offset| (base + offset) as usize)
}

/// Builds the DOF map of every solid element, in element order. Void
/// elements never appear.
pub fn build_dof_map(grid: &Grid) -> Vec<ElementDofs> {
    let resolution = grid.resolution;

    (0..resolution.num_elements())
        .filter(|e| grid.is_solid(*e))
        .map(|element| ElementDofs {
            element,
            dofs: element_dofs(element, resolution),
        })
        .collect()
}

/// Emits the 64 stiffness contributions of each mapped element
///
/// # Arguments
/// * `dof_map` - Solid elements and their DOFs
/// * `template` - The unit-modulus element stiffness
/// * `youngs_modulus` - Modulus applied uniformly to every solid element
pub fn build_triplets(
    dof_map: &[ElementDofs],
    template: &ElementStiffness,
    youngs_modulus: f64,
) -> Vec<Triplet> {
    let scaled = template * youngs_modulus;

    let triplets: Vec<Triplet> = dof_map
        .par_iter()
        .flat_map_iter(|element| {
            let dofs = element.dofs;
            (0..8).flat_map(move |local_col| {
                (0..8).map(move |local_row| Triplet {
                    row: dofs[local_row],
                    col: dofs[local_col],
                    value: scaled[(local_row, local_col)],
                })
            })
        })
        .collect();

    debug!(
        "emitted {} triplets for {} solid elements",
        triplets.len(),
        dof_map.len()
    );

    triplets
}

/// DOFs referenced by at least one solid element, ascending
pub fn referenced_dofs(dof_map: &[ElementDofs], num_dofs: usize) -> Vec<usize> {
    let mut referenced = vec![false; num_dofs];
    for element in dof_map {
        for dof in element.dofs {
            referenced[dof] = true;
        }
    }

    referenced
        .iter()
        .enumerate()
        .filter(|(_, r)| **r)
        .map(|(dof, _)| dof)
        .collect()
}

/// Labels the mapped elements by edge-connected region
///
/// Two solid elements belong to the same region when they share an edge;
/// a shared corner alone is a hinge and does not join them.
///
/// # Returns
/// One label per `dof_map` entry. Labels are representative positions in
/// `dof_map`.
pub fn edge_components(dof_map: &[ElementDofs]) -> Vec<usize> {
    let mut regions: UnionFind<usize> = UnionFind::new(dof_map.len());
    let mut owners: HashMap<(usize, usize), usize> = HashMap::new();

    for (i, element) in dof_map.iter().enumerate() {
        // corner nodes in template order
        let corners = [0, 2, 4, 6].map(|local| element.dofs[local] / 2);
        for k in 0..4 {
            let (a, b) = (corners[k], corners[(k + 1) % 4]);
            let edge = (usize::min(a, b), usize::max(a, b));
            match owners.get(&edge) {
                Some(other) => {
                    regions.union(*other, i);
                }
                None => {
                    owners.insert(edge, i);
                }
            }
        }
    }

    regions.into_labeling()
}
