use approx::assert_relative_eq;
use bridge_fea::{
    analyze,
    config::LoadCase,
    datatypes::{CellState, Grid, Resolution},
    dofs::{build_dof_map, build_triplets},
    element::element_stiffness,
    mesher, solver, AnalysisConfig, Edge, FeaError, SolverKind, SupportPolicy,
};
use nalgebra::DMatrix;

/// Hole over the 4 interior elements of a 4x4 grid
fn interior_hole() -> Vec<Edge> {
    Edge::polygon(&[(7.5, 1.25), (17.5, 1.25), (17.5, 6.25), (7.5, 6.25)])
}

/// Ring-shaped hole on a 20x10 grid leaving a 3x3 solid island in its middle
fn island_hole() -> Vec<Edge> {
    let mut edges = Edge::polygon(&[(4.5, 1.5), (15.5, 1.5), (15.5, 8.5), (4.5, 8.5)]);
    edges.extend(Edge::polygon(&[(8.5, 3.5), (11.5, 3.5), (11.5, 6.5), (8.5, 6.5)]));
    edges
}

/// Full-width slot on a 20x10 grid cutting the loaded deck off the supports
fn split_slot() -> Vec<Edge> {
    Edge::polygon(&[(-10., 4.5), (40., 4.5), (40., 5.5), (-10., 5.5)])
}

fn conjugate_gradient_config() -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.solver.kind = SolverKind::ConjugateGradient {
        max_iters: 10_000,
        tolerance: 1e-10,
        progress: false,
    };
    config
}

/// Hole enclosing every cell of a 4x4 grid
fn covering_hole() -> Vec<Edge> {
    Edge::polygon(&[(-10., -10.), (40., -10.), (40., 30.), (-10., 30.)])
}

#[test]
fn test_no_hole_is_all_solid() {
    let config = AnalysisConfig::default();
    for (nelx, nely) in [(4, 4), (20, 10), (7, 3)] {
        let report = analyze(&[], nely, nelx, false, &config).unwrap();
        assert_eq!(report.area, (nelx * nely) as f64);
        assert!(report.void_set.is_empty());
        assert_eq!(report.grid.num_solid(), nelx * nely);
    }
}

#[test]
fn test_solid_four_by_four() {
    let report = analyze(&[], 4, 4, false, &AnalysisConfig::default()).unwrap();
    let (max_stress, area) = report.scalars();
    assert_eq!(area, 16.0);
    assert!(max_stress.is_finite());
    assert!(max_stress > 0.0);
}

#[test]
fn test_interior_hole_area() {
    let report = analyze(&interior_hole(), 4, 4, false, &AnalysisConfig::default()).unwrap();
    assert_eq!(report.area, 12.0);
    assert_eq!(report.void_set.as_slice(), &[6, 7, 10, 11]);
    assert_eq!(report.stress_field.len(), 12);
    assert!(report.max_stress.is_finite() && report.max_stress > 0.0);
}

#[test]
fn test_hole_independent_of_start_and_winding() {
    let resolution = Resolution::new(4, 4).unwrap();
    let geometry = AnalysisConfig::default().geometry;

    let forward = interior_hole();
    let mut rotated = forward.clone();
    rotated.rotate_left(1);
    let reversed: Vec<Edge> = forward
        .iter()
        .rev()
        .map(|e| Edge::new(e.x2, e.y2, e.x1, e.y1))
        .collect();

    let (_, expected) = mesher::classify(&forward, resolution, &geometry);
    assert_eq!(mesher::classify(&rotated, resolution, &geometry).1, expected);
    assert_eq!(mesher::classify(&reversed, resolution, &geometry).1, expected);
}

#[test]
fn test_covering_hole_is_degenerate() {
    let result = analyze(&covering_hole(), 4, 4, false, &AnalysisConfig::default());
    assert!(matches!(result, Err(FeaError::DegenerateGeometry(_))));
}

#[test]
fn test_stress_scales_with_load() {
    let config = AnalysisConfig::default();
    let mut doubled = config.clone();
    doubled.load = LoadCase {
        total_load: 2.0 * config.load.total_load,
    };

    let base = analyze(&interior_hole(), 4, 4, false, &config).unwrap();
    let twice = analyze(&interior_hole(), 4, 4, false, &doubled).unwrap();
    assert_relative_eq!(twice.max_stress, 2.0 * base.max_stress, max_relative = 1e-9);
    assert_eq!(twice.area, base.area);
}

#[test]
fn test_deterministic() {
    let config = AnalysisConfig::default();
    let first = analyze(&interior_hole(), 10, 20, false, &config).unwrap();
    let second = analyze(&interior_hole(), 10, 20, false, &config).unwrap();
    assert_eq!(first.scalars(), second.scalars());
    assert_eq!(first.max_stress.to_bits(), second.max_stress.to_bits());
}

#[test]
fn test_single_element_stiffness_matches_template() {
    let resolution = Resolution::new(1, 1).unwrap();
    let grid = Grid::from_cells(resolution, vec![CellState::Solid]);
    let map = build_dof_map(&grid);
    let ke = element_stiffness(0.3);
    let k = DMatrix::from(&solver::assemble_stiffness(
        &build_triplets(&map, &ke, 2e6),
        resolution.num_dofs(),
    ));

    let dofs = map[0].dofs;
    for r in 0..8 {
        for c in 0..8 {
            assert_eq!(k[(dofs[r], dofs[c])], ke[(r, c)] * 2e6);
        }
    }
}

#[test]
fn test_stiffness_symmetric_with_hole() {
    let resolution = Resolution::new(8, 6).unwrap();
    let edges = Edge::polygon(&[(4.0, 2.0), (14.0, 3.0), (12.0, 9.0), (6.0, 8.0)]);
    let (grid, voids) = mesher::classify(&edges, resolution, &AnalysisConfig::default().geometry);
    assert!(!voids.is_empty());

    let map = build_dof_map(&grid);
    let k = DMatrix::from(&solver::assemble_stiffness(
        &build_triplets(&map, &element_stiffness(0.3), 2e6),
        resolution.num_dofs(),
    ));
    assert!((&k - k.transpose()).amax() < 1e-9);
}

#[test]
fn test_void_extent_without_x_support_is_singular() {
    // the legacy placement only fixes y DOFs for this hole
    let config = AnalysisConfig {
        supports: SupportPolicy::VoidExtent,
        ..AnalysisConfig::default()
    };
    let result = analyze(&interior_hole(), 4, 4, false, &config);
    assert!(matches!(result, Err(FeaError::SingularSystem(_))));
}

#[test]
fn test_void_extent_without_hole_is_degenerate() {
    let config = AnalysisConfig {
        supports: SupportPolicy::VoidExtent,
        ..AnalysisConfig::default()
    };
    let result = analyze(&[], 4, 4, false, &config);
    assert!(matches!(result, Err(FeaError::DegenerateGeometry(_))));
}

#[test]
fn test_conjugate_gradient_agrees_with_direct() {
    let direct = analyze(&interior_hole(), 4, 4, false, &AnalysisConfig::default()).unwrap();

    let mut config = AnalysisConfig::default();
    config.solver.kind = SolverKind::ConjugateGradient {
        max_iters: 10_000,
        tolerance: 1e-11,
        progress: false,
    };
    let iterative = analyze(&interior_hole(), 4, 4, false, &config).unwrap();

    assert_relative_eq!(iterative.max_stress, direct.max_stress, max_relative = 1e-4);
    assert_eq!(iterative.area, direct.area);
}

#[test]
fn test_conjugate_gradient_agrees_with_direct_at_default_resolution() {
    let config = conjugate_gradient_config();
    for edges in [Vec::new(), interior_hole()] {
        let direct = analyze(&edges, 10, 20, false, &AnalysisConfig::default()).unwrap();
        let iterative = analyze(&edges, 10, 20, false, &config).unwrap();

        assert_relative_eq!(iterative.max_stress, direct.max_stress, max_relative = 1e-4);
        assert_eq!(iterative.area, direct.area);
    }
}

#[test]
fn test_island_layout_classification() {
    let resolution = Resolution::new(20, 10).unwrap();
    let (grid, voids) =
        mesher::classify(&island_hole(), resolution, &AnalysisConfig::default().geometry);

    assert_eq!(voids.len(), 77 - 9);
    // cell (row 4, col 9) sits at (10, 5), inside the inner loop
    assert_eq!(grid.get(4, 9), CellState::Solid);
    assert_eq!(grid.get(4, 5), CellState::Void);
}

#[test]
fn test_floating_island_is_singular() {
    for config in [AnalysisConfig::default(), conjugate_gradient_config()] {
        let result = analyze(&island_hole(), 10, 20, false, &config);
        assert!(matches!(result, Err(FeaError::SingularSystem(_))));
    }
}

#[test]
fn test_split_slot_is_singular() {
    for config in [AnalysisConfig::default(), conjugate_gradient_config()] {
        let result = analyze(&split_slot(), 10, 20, false, &config);
        assert!(matches!(result, Err(FeaError::SingularSystem(_))));
    }
}
