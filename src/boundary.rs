use nalgebra::DVector;
use tracing::{debug, warn};

use crate::{
    config::{LoadCase, SupportPolicy},
    datatypes::{ElementDofs, Resolution, VoidSet},
    dofs::{edge_components, referenced_dofs},
    error::{FeaError, Result},
};

/// Load vector and DOF partition for one analysis
#[derive(Debug, Clone)]
pub struct BoundaryConditions {
    pub loads: DVector<f64>,
    /// Constrained to zero displacement, ascending
    pub fixed_dofs: Vec<usize>,
    /// Solved for, ascending
    pub free_dofs: Vec<usize>,
}

/// Builds the deck load vector
///
/// A downward point load of `total_load / nelx` is applied to the top node
/// of every node column.
pub fn build_loads(resolution: Resolution, load: &LoadCase) -> DVector<f64> {
    let fmag = load.total_load / resolution.nelx as f64;
    let mut loads = DVector::zeros(resolution.num_dofs());

    for col in 0..=resolution.nelx {
        let top = resolution.node_index(0, col);
        loads[2 * top + 1] = -fmag;
    }

    loads
}

/// Clamps both bottom corners of the domain
fn bottom_corner_dofs(resolution: Resolution) -> Vec<usize> {
    let left = resolution.node_index(resolution.nely, 0);
    let right = resolution.node_index(resolution.nely, resolution.nelx);
    vec![2 * left, 2 * left + 1, 2 * right, 2 * right + 1]
}

/// Legacy support placement derived from the extent of the void set
///
/// One block of DOFs is placed past the last void element and another covers
/// the y DOFs of the first nodes up to the first void element. Rounding is
/// half-to-even.
fn void_extent_dofs(resolution: Resolution, void_set: &VoidSet) -> Result<Vec<usize>> {
    let (min, max) = match (void_set.min(), void_set.max()) {
        (Some(min), Some(max)) => (min, max),
        _ => {
            return Err(FeaError::DegenerateGeometry(
                "void-extent supports need at least one void element".to_owned(),
            ))
        }
    };

    let column_dofs = 2 * (resolution.nely + 1);
    let span = ((resolution.num_elements() - max) as f64 / 10.0).round_ties_even() as usize;
    let offset = (max as f64 / 10.0).round_ties_even() as usize;

    let mut dofs: Vec<usize> = Vec::new();
    for j in 1..=span {
        // 1-based DOF numbers shifted down by one
        dofs.push(column_dofs * (offset + j + 1) - 2);
        dofs.push(column_dofs * (offset + j) - 1);
    }
    for j in 1..=min {
        dofs.push(2 * j - 1);
    }

    let num_dofs = resolution.num_dofs();
    let before = dofs.len();
    dofs.retain(|d| *d < num_dofs);
    if dofs.len() < before {
        warn!(
            "dropped {} void-extent supports outside the mesh",
            before - dofs.len()
        );
    }

    Ok(dofs)
}

/// Selects fixed DOFs for a support policy
///
/// # Returns
/// Sorted, duplicate-free 0-based DOF indices
pub fn fixed_dofs(
    policy: &SupportPolicy,
    resolution: Resolution,
    void_set: &VoidSet,
) -> Result<Vec<usize>> {
    let mut dofs = match policy {
        SupportPolicy::BottomCorners => bottom_corner_dofs(resolution),
        SupportPolicy::VoidExtent => void_extent_dofs(resolution, void_set)?,
        SupportPolicy::Dofs(dofs) => {
            if let Some(bad) = dofs.iter().find(|d| **d >= resolution.num_dofs()) {
                return Err(FeaError::InvalidSupport(format!(
                    "DOF {bad} is outside the mesh ({} DOFs)",
                    resolution.num_dofs()
                )));
            }
            dofs.clone()
        }
    };

    dofs.sort_unstable();
    dofs.dedup();
    Ok(dofs)
}

/// Counts solid elements in edge-connected regions that touch no fixed DOF
fn unsupported_elements(dof_map: &[ElementDofs], fixed: &[usize]) -> usize {
    let labels = edge_components(dof_map);
    let mut supported = vec![false; dof_map.len()];
    for (element, label) in dof_map.iter().zip(&labels) {
        if element.dofs.iter().any(|d| fixed.binary_search(d).is_ok()) {
            supported[*label] = true;
        }
    }

    labels.iter().filter(|label| !supported[**label]).count()
}

/// Builds loads and the fixed/free DOF partition
///
/// # Arguments
/// * `resolution` - The grid resolution
/// * `dof_map` - DOFs of every solid element
/// * `void_set` - Void element indices
/// * `load` - The applied deck load
/// * `policy` - How supports are placed
pub fn build(
    resolution: Resolution,
    dof_map: &[ElementDofs],
    void_set: &VoidSet,
    load: &LoadCase,
    policy: &SupportPolicy,
) -> Result<BoundaryConditions> {
    let loads = build_loads(resolution, load);
    let fixed = fixed_dofs(policy, resolution, void_set)?;

    let unsupported = unsupported_elements(dof_map, &fixed);
    if unsupported > 0 {
        return Err(FeaError::SingularSystem(format!(
            "{unsupported} solid elements form regions without supports"
        )));
    }

    let free: Vec<usize> = referenced_dofs(dof_map, resolution.num_dofs())
        .into_iter()
        .filter(|d| fixed.binary_search(d).is_err())
        .collect();

    if free.is_empty() {
        return Err(FeaError::DegenerateGeometry(
            "no unconstrained DOFs remain".to_owned(),
        ));
    }

    debug!(
        "boundary conditions: {} fixed, {} free of {} DOFs",
        fixed.len(),
        free.len(),
        resolution.num_dofs()
    );

    Ok(BoundaryConditions {
        loads,
        fixed_dofs: fixed,
        free_dofs: free,
    })
}
