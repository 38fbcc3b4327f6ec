use nalgebra::DVector;

use crate::error::{FeaError, Result};

/// A boundary segment of the hole, in design-space units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub active: bool,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Edge {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Edge {
        Edge {
            active: true,
            x1,
            y1,
            x2,
            y2,
        }
    }

    /// Builds a closed loop of active edges through `points`
    pub fn polygon(points: &[(f64, f64)]) -> Vec<Edge> {
        let n = points.len();
        (0..n)
            .map(|i| {
                let (x1, y1) = points[i];
                let (x2, y2) = points[(i + 1) % n];
                Edge::new(x1, y1, x2, y2)
            })
            .collect()
    }
}

/// Number of elements along each axis of the regular grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub nelx: usize,
    pub nely: usize,
}

impl Resolution {
    pub fn new(nelx: usize, nely: usize) -> Result<Resolution> {
        if nelx == 0 || nely == 0 {
            return Err(FeaError::InvalidResolution(format!(
                "nelx and nely must be positive, got nelx={nelx} nely={nely}"
            )));
        }
        Ok(Resolution { nelx, nely })
    }

    pub fn num_elements(&self) -> usize {
        self.nelx * self.nely
    }

    pub fn num_nodes(&self) -> usize {
        (self.nelx + 1) * (self.nely + 1)
    }

    pub fn num_dofs(&self) -> usize {
        2 * self.num_nodes()
    }

    /// Column-major element index, 0-based
    pub fn element_index(&self, row: usize, col: usize) -> usize {
        col * self.nely + row
    }

    /// Column-major node index, 0-based. Row 0 is the top of the domain.
    pub fn node_index(&self, row: usize, col: usize) -> usize {
        col * (self.nely + 1) + row
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Solid,
    Void,
}

/// `nely x nelx` solid/void layout, stored column-major
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub resolution: Resolution,
    cells: Vec<CellState>,
}

impl Grid {
    pub fn from_cells(resolution: Resolution, cells: Vec<CellState>) -> Grid {
        debug_assert_eq!(cells.len(), resolution.num_elements());
        Grid { resolution, cells }
    }

    pub fn get(&self, row: usize, col: usize) -> CellState {
        self.cells[self.resolution.element_index(row, col)]
    }

    pub fn is_solid(&self, element: usize) -> bool {
        self.cells[element] == CellState::Solid
    }

    pub fn num_solid(&self) -> usize {
        self.cells.iter().filter(|c| **c == CellState::Solid).count()
    }

    /// Void element indices, ascending
    pub fn void_set(&self) -> VoidSet {
        VoidSet::from_indices(
            self.cells
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == CellState::Void)
                .map(|(i, _)| i + 1)
                .collect(),
        )
    }
}

/// Sorted, duplicate-free set of 1-based void element indices
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VoidSet(Vec<usize>);

impl VoidSet {
    pub fn from_indices(mut indices: Vec<usize>) -> VoidSet {
        indices.sort_unstable();
        indices.dedup();
        VoidSet(indices)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn min(&self) -> Option<usize> {
        self.0.first().copied()
    }

    pub fn max(&self) -> Option<usize> {
        self.0.last().copied()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0.binary_search(&index).is_ok()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

/// Global DOF indices of one solid element, in stiffness template order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementDofs {
    /// 0-based column-major element index
    pub element: usize,
    pub dofs: [usize; 8],
}

/// Per-element `(sigma_x, sigma_y)`, absolute values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementStress {
    pub element: usize,
    pub sigma_x: f64,
    pub sigma_y: f64,
}

impl ElementStress {
    pub fn max(&self) -> f64 {
        f64::max(self.sigma_x, self.sigma_y)
    }
}

/// Everything produced by one analysis call
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub max_stress: f64,
    pub area: f64,
    pub grid: Grid,
    pub void_set: VoidSet,
    pub stress_field: Vec<ElementStress>,
    pub displacements: DVector<f64>,
    /// Text layout of the grid, present when rendering was requested
    pub rendered: Option<String>,
}

impl AnalysisReport {
    /// The `(max_stress, area)` pair consumed by the optimization loop
    pub fn scalars(&self) -> (f64, f64) {
        (self.max_stress, self.area)
    }
}
