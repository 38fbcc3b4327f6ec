use tracing::{debug, info};

use crate::{
    boundary,
    config::AnalysisConfig,
    datatypes::{AnalysisReport, Edge, Resolution},
    dofs::{build_dof_map, build_triplets},
    element::element_stiffness,
    error::{FeaError, Result},
    mesher, post_processor, solver, stress,
};

/// Runs a full analysis of a perforated rectangular domain
///
/// Classifies the grid against the hole boundary, assembles and solves the
/// plane-stress system, and recovers element stresses. Nothing is kept
/// between calls.
///
/// # Arguments
/// * `edges` - The hole boundary in design-space units
/// * `nely` - Elements along y
/// * `nelx` - Elements along x
/// * `render` - Return the solid/void layout as text in the report
/// * `config` - Material, load, support and solver settings
///
/// # Returns
/// The analysis report; `scalars()` gives `(max_stress, area)`
pub fn analyze(
    edges: &[Edge],
    nely: usize,
    nelx: usize,
    render: bool,
    config: &AnalysisConfig,
) -> Result<AnalysisReport> {
    let resolution = Resolution::new(nelx, nely)?;
    config.material.validate()?;

    let (grid, void_set) = mesher::classify(edges, resolution, &config.geometry);
    let rendered = if render {
        let layout = post_processor::render_grid(&grid);
        debug!("layout:\n{layout}");
        Some(layout)
    } else {
        None
    };

    let solid = grid.num_solid();
    if solid == 0 {
        return Err(FeaError::DegenerateGeometry(format!(
            "the hole covers all {} elements",
            resolution.num_elements()
        )));
    }

    let template = element_stiffness(config.material.poisson_ratio);
    let dof_map = build_dof_map(&grid);
    let triplets = build_triplets(&dof_map, &template, config.material.youngs_modulus);

    let bc = boundary::build(
        resolution,
        &dof_map,
        &void_set,
        &config.load,
        &config.supports,
    )?;

    let stiffness = solver::assemble_stiffness(&triplets, resolution.num_dofs());
    let displacements = solver::solve(&stiffness, &bc, &config.solver)?;
    debug!("max |u| = {:.6e}", displacements.amax());

    let stress_field = stress::compute_stress(&dof_map, &displacements, resolution, &config.material);
    let max_stress = stress::max_stress(&stress_field)?;
    let area = (resolution.num_elements() - void_set.len()) as f64;

    info!(
        "analysis {}x{}: max stress {:.6e}, area {}",
        nelx, nely, max_stress, area
    );

    Ok(AnalysisReport {
        max_stress,
        area,
        grid,
        void_set,
        stress_field,
        displacements,
        rendered,
    })
}
