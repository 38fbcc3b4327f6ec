use nalgebra::{matrix, SMatrix};

pub type ElementStiffness = SMatrix<f64, 8, 8>;

/// Assembles an 8x8 block matrix `[m11 m12; m12^T m11]`
fn block_symmetric(m11: SMatrix<f64, 4, 4>, m12: SMatrix<f64, 4, 4>) -> ElementStiffness {
    let mut out = ElementStiffness::zeros();
    out.fixed_view_mut::<4, 4>(0, 0).copy_from(&m11);
    out.fixed_view_mut::<4, 4>(0, 4).copy_from(&m12);
    out.fixed_view_mut::<4, 4>(4, 0).copy_from(&m12.transpose());
    out.fixed_view_mut::<4, 4>(4, 4).copy_from(&m11);
    out
}

/// Computes the stiffness template for a unit-modulus bilinear quad
///
/// Every element of the regular grid is geometrically identical, so one
/// template serves the whole mesh. DOFs are ordered bottom-left, bottom-right,
/// top-right, top-left, each as (x, y).
///
/// # Arguments
/// * `poisson_ratio` - The poisson ratio of the material
///
/// # Returns
/// A symmetric 8x8 stiffness matrix
pub fn element_stiffness(poisson_ratio: f64) -> ElementStiffness {
    let a11 = matrix![
        12., 3., -6., -3.;
        3., 12., 3., 0.;
        -6., 3., 12., -3.;
        -3., 0., -3., 12.;
    ];
    let a12 = matrix![
        -6., -3., 0., 3.;
        -3., -6., -3., -6.;
        0., -3., -6., 3.;
        3., -6., 3., -6.;
    ];
    let b11 = matrix![
        -4., 3., -2., 9.;
        3., -4., -9., 4.;
        -2., -9., -4., -3.;
        9., 4., -3., -4.;
    ];
    let b12 = matrix![
        2., -3., 4., -9.;
        -3., 2., 9., -2.;
        4., 9., 2., 3.;
        -9., -2., 3., 2.;
    ];

    let a = block_symmetric(a11, a12);
    let b = block_symmetric(b11, b12);

    (a + b * poisson_ratio) * (1.0 / (0.91 * 24.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_template_is_symmetric() {
        let ke = element_stiffness(0.3);
        assert_eq!(ke, ke.transpose());
    }

    #[test]
    fn test_template_entries() {
        let ke = element_stiffness(0.3);
        let scale = 1.0 / (0.91 * 24.0);
        assert_relative_eq!(ke[(0, 0)], scale * (12.0 - 0.3 * 4.0));
        assert_relative_eq!(ke[(0, 7)], scale * (3.0 - 0.3 * 9.0));
        assert_relative_eq!(ke[(7, 0)], ke[(0, 7)]);
        assert_relative_eq!(ke[(5, 1)], scale * (-6.0 + 0.3 * 2.0));
    }

    #[test]
    fn test_rigid_translation_has_no_force() {
        let ke = element_stiffness(0.3);
        let ux = SMatrix::<f64, 8, 1>::from_fn(|i, _| if i % 2 == 0 { 1.0 } else { 0.0 });
        let uy = SMatrix::<f64, 8, 1>::from_fn(|i, _| if i % 2 == 1 { 1.0 } else { 0.0 });
        assert!((ke * ux).amax() < 1e-12);
        assert!((ke * uy).amax() < 1e-12);
    }
}
