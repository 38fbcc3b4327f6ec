use argmin::{
    core::{
        observers::{Observe, ObserverMode},
        Error, Executor, Operator, State, KV,
    },
    solver::conjugategradient::ConjugateGradient,
};
use indicatif::ProgressBar;
use nalgebra::{linalg::Cholesky, DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CscMatrix, CsrMatrix};
use tracing::debug;

use crate::{
    boundary::BoundaryConditions,
    config::{SolverConfig, SolverKind},
    dofs::Triplet,
    error::{FeaError, Result},
};

pub const MAX_CG_PASSES: usize = 5;

/// Runs multiplication for Conjugate Gradient Solver
struct ConjugateGradientOperator<'a> {
    a: &'a CsrMatrix<f64>,
}

impl<'a> Operator for ConjugateGradientOperator<'a> {
    type Param = Vec<f64>;
    type Output = Vec<f64>;

    fn apply(&self, x: &Self::Param) -> std::result::Result<Self::Output, Error> {
        let product: DVector<f64> = self.a * &DVector::from_column_slice(x);
        Ok(product.data.as_vec().clone())
    }
}

/// Observer bar for argmin solver
struct ConjugateGradientObserverBar {
    bar: ProgressBar,
    start_mag: Option<f64>,
    final_mag: f64,
}

impl ConjugateGradientObserverBar {
    fn new(bar: ProgressBar, target_cost: f64) -> ConjugateGradientObserverBar {
        ConjugateGradientObserverBar {
            bar,
            start_mag: None,
            final_mag: target_cost.log10().floor(),
        }
    }
}

impl<I> Observe<I> for ConjugateGradientObserverBar
where
    I: State<Float = f64>,
{
    fn observe_iter(&mut self, state: &I, _kv: &KV) -> std::result::Result<(), Error> {
        let cost_mag = state.get_cost().log10().floor();
        if !cost_mag.is_finite() {
            return Ok(());
        }
        let start_mag = *self.start_mag.get_or_insert(cost_mag);
        if start_mag <= self.final_mag {
            return Ok(());
        }

        let fraction = ((start_mag - cost_mag) / (start_mag - self.final_mag)).clamp(0.0, 1.0);
        self.bar.set_position((1000.0 * fraction) as u64);

        Ok(())
    }
}

/// Sums triplets into a global stiffness matrix and symmetrizes it
///
/// # Arguments
/// * `triplets` - Element contributions; duplicates accumulate
/// * `num_dofs` - Size of the square system
///
/// # Returns
/// `(K + K^T) / 2` in compressed column form
pub fn assemble_stiffness(triplets: &[Triplet], num_dofs: usize) -> CscMatrix<f64> {
    let mut coo = CooMatrix::new(num_dofs, num_dofs);
    for t in triplets {
        coo.push(t.row, t.col, t.value);
    }

    let k = CscMatrix::from(&coo);
    let symmetric = (&k + &k.transpose()) * 0.5;

    debug!(
        "assembled {num_dofs}x{num_dofs} stiffness matrix with {} non-zeros",
        symmetric.nnz()
    );

    symmetric
}

/// Maps each global DOF to its position among the free DOFs
fn free_positions(free_dofs: &[usize], num_dofs: usize) -> Vec<Option<usize>> {
    let mut positions = vec![None; num_dofs];
    for (i, dof) in free_dofs.iter().enumerate() {
        positions[*dof] = Some(i);
    }
    positions
}

/// Extracts the dense free x free block of `k`
pub fn restrict_dense(k: &CscMatrix<f64>, free_dofs: &[usize]) -> DMatrix<f64> {
    let positions = free_positions(free_dofs, k.nrows());
    let mut k2 = DMatrix::zeros(free_dofs.len(), free_dofs.len());

    for (row, col, value) in k.triplet_iter() {
        if let (Some(r), Some(c)) = (positions[row], positions[col]) {
            k2[(r, c)] += *value;
        }
    }

    k2
}

/// Extracts the sparse free x free block of `k`
fn restrict_sparse(k: &CscMatrix<f64>, free_dofs: &[usize]) -> CsrMatrix<f64> {
    let positions = free_positions(free_dofs, k.nrows());
    let mut coo = CooMatrix::new(free_dofs.len(), free_dofs.len());

    for (row, col, value) in k.triplet_iter() {
        if let (Some(r), Some(c)) = (positions[row], positions[col]) {
            coo.push(r, c, *value);
        }
    }

    CsrMatrix::from(&coo)
}

/// Solves the free-DOF system with a dense Cholesky factorization
///
/// # Arguments
/// * `a` - Symmetric free-DOF stiffness
/// * `b` - Free-DOF loads
/// * `singular_tolerance` - Smallest accepted ratio of squared pivots
fn run_cholesky(
    a: DMatrix<f64>,
    b: &DVector<f64>,
    singular_tolerance: f64,
) -> Result<DVector<f64>> {
    let size = a.nrows();
    let cholesky = match Cholesky::new(a) {
        Some(c) => c,
        None => {
            return Err(FeaError::SingularSystem(format!(
                "{size}x{size} free-DOF stiffness is not positive definite"
            )))
        }
    };

    let pivots = cholesky.l_dirty().diagonal();
    let (min_pivot, max_pivot) = (pivots.min(), pivots.max());
    let pivot_ratio = (min_pivot / max_pivot).powi(2);
    if !(pivot_ratio >= singular_tolerance) {
        return Err(FeaError::SingularSystem(format!(
            "pivot ratio {pivot_ratio:.3e} is below tolerance {singular_tolerance:.3e}"
        )));
    }

    Ok(cholesky.solve(b))
}

/// Runs one argmin conjugate gradient pass starting from `x0`
///
/// # Arguments
/// * `a` - A square positive definite matrix
/// * `b` - A vector of the solutions to the system
/// * `x0` - Initial guess
/// * `max_iters` - Iteration cap
/// * `target_cost` - Squared residual norm at which argmin stops
/// * `bar` - Progress bar driven by the observer
fn run_conjugate_gradient_pass(
    a: &CsrMatrix<f64>,
    b: &DVector<f64>,
    x0: Vec<f64>,
    max_iters: u64,
    target_cost: f64,
    bar: &ProgressBar,
) -> Result<(DVector<f64>, u64)> {
    let solver: ConjugateGradient<_, f64> = ConjugateGradient::new(b.data.as_vec().clone());
    let operator = ConjugateGradientOperator { a };

    // Run solver
    let res = match Executor::new(operator, solver)
        .configure(|state| {
            state
                .param(x0)
                .max_iters(max_iters)
                .target_cost(target_cost)
        })
        .add_observer(
            ConjugateGradientObserverBar::new(bar.clone(), target_cost),
            ObserverMode::Always,
        )
        .run()
    {
        Ok(r) => r,
        Err(err) => {
            return Err(FeaError::SingularSystem(format!(
                "Conjugate Gradient error: {err}"
            )))
        }
    };

    match res.state().get_best_param() {
        Some(vec) => Ok((DVector::from_vec(vec.clone()), res.state().get_iter())),
        None => Err(FeaError::SingularSystem(
            "Conjugate Gradient could not produce best parameter".to_owned(),
        )),
    }
}

/// Solves a system of equations using the conjugate gradient method.
///
/// The residual argmin tracks drifts away from `b - Ax`, so each pass is
/// checked against the true residual and restarted from its best parameter
/// until the true residual meets the tolerance.
///
/// # Arguments
/// * `a` - A square positive definite matrix
/// * `b` - A vector of the solutions to the system
/// * `max_iters` - Iteration cap per pass
/// * `tolerance` - Residual target relative to `|b|`
/// * `progress` - Whether to draw a progress bar
///
/// # Returns
/// A DVector that represents `x` from the system
fn run_conjugate_gradient(
    a: &CsrMatrix<f64>,
    b: &DVector<f64>,
    max_iters: u64,
    tolerance: f64,
    progress: bool,
) -> Result<DVector<f64>> {
    let b_norm = b.norm();
    if b_norm == 0.0 {
        return Ok(DVector::zeros(b.nrows()));
    }

    let limit = tolerance * b_norm;
    // argmin reports the squared residual norm as cost
    let target_cost = limit.powi(2);

    let bar = if progress {
        ProgressBar::new(1000)
    } else {
        ProgressBar::hidden()
    };

    let mut x: Vec<f64> = vec![0.0; b.nrows()];
    let mut residual = f64::INFINITY;
    let mut iterations: u64 = 0;

    for pass in 0..MAX_CG_PASSES {
        let (solution, iters) =
            run_conjugate_gradient_pass(a, b, x, max_iters, target_cost, &bar)?;
        iterations += iters;

        residual = (a * &solution - b).norm();
        if residual <= limit {
            bar.finish_and_clear();
            debug!(
                "conjugate gradient converged after {iterations} iterations in {} passes",
                pass + 1
            );
            return Ok(solution);
        }
        if !residual.is_finite() {
            break;
        }

        x = solution.data.as_vec().clone();
    }
    bar.finish_and_clear();

    Err(FeaError::SingularSystem(format!(
        "Conjugate Gradient stalled at relative residual {:.3e}",
        residual / b_norm
    )))
}

/// Solves for nodal displacements
///
/// # Arguments
/// * `k` - The symmetric global stiffness matrix
/// * `bc` - Loads and DOF partition
/// * `config` - Solver selection
///
/// # Returns
/// The full displacement vector, zero at every non-free DOF
pub fn solve(k: &CscMatrix<f64>, bc: &BoundaryConditions, config: &SolverConfig) -> Result<DVector<f64>> {
    let free = &bc.free_dofs;
    if free.is_empty() {
        return Err(FeaError::DegenerateGeometry(
            "no unconstrained DOFs remain".to_owned(),
        ));
    }

    let f2 = DVector::from_iterator(free.len(), free.iter().map(|d| bc.loads[*d]));

    let start = std::time::Instant::now();
    let u2 = match &config.kind {
        SolverKind::Direct => run_cholesky(restrict_dense(k, free), &f2, config.singular_tolerance)?,
        SolverKind::ConjugateGradient {
            max_iters,
            tolerance,
            progress,
        } => run_conjugate_gradient(
            &restrict_sparse(k, free),
            &f2,
            *max_iters,
            *tolerance,
            *progress,
        )?,
    };
    debug!(
        "solved {} free DOFs in {:.3} seconds",
        free.len(),
        start.elapsed().as_secs_f32()
    );

    if u2.iter().any(|u| !u.is_finite()) {
        return Err(FeaError::SingularSystem(
            "solution contains non-finite displacements".to_owned(),
        ));
    }

    let mut u = DVector::zeros(k.nrows());
    for (i, dof) in free.iter().enumerate() {
        u[*dof] = u2[i];
    }

    Ok(u)
}
