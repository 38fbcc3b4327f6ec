use nalgebra::{matrix, DVector, SMatrix};
use rayon::prelude::*;

use crate::{
    config::Material,
    datatypes::{ElementDofs, ElementStress, Resolution},
    error::{FeaError, Result},
};

/// Constant-strain differencing operator over the 8 element DOFs
pub fn strain_displacement_matrix() -> SMatrix<f64, 2, 8> {
    matrix![
        -1., 0., -1., 0., 1., 0., -1., 0.;
        0., -1., 0., -1., 0., 1., 0., 1.;
    ]
}

/// Plane-stress constitutive matrix for the normal components
pub fn stress_strain_matrix(poisson_ratio: f64) -> SMatrix<f64, 2, 2> {
    matrix![
        1.0, poisson_ratio;
        poisson_ratio, 1.0;
    ]
}

/// Calculates the absolute normal stresses of every solid element
///
/// # Arguments
/// * `dof_map` - Solid elements and their DOFs
/// * `displacements` - The full displacement vector
/// * `resolution` - The grid resolution
/// * `material` - Material and section constants
pub fn compute_stress(
    dof_map: &[ElementDofs],
    displacements: &DVector<f64>,
    resolution: Resolution,
    material: &Material,
) -> Vec<ElementStress> {
    let element_area = material.domain_area / resolution.num_elements() as f64;
    let scale = material.youngs_modulus
        / (2.0
            * material.part_thickness
            * element_area
            * (1.0 - f64::powi(material.poisson_ratio, 2)));
    let operator = stress_strain_matrix(material.poisson_ratio) * strain_displacement_matrix() * scale;

    dof_map
        .par_iter()
        .map(|element| {
            let d = SMatrix::<f64, 8, 1>::from_fn(|i, _| displacements[element.dofs[i]]);
            let sigma = operator * d;
            ElementStress {
                element: element.element,
                sigma_x: sigma[0].abs(),
                sigma_y: sigma[1].abs(),
            }
        })
        .collect()
}

/// Peak absolute stress over all elements and both components
pub fn max_stress(stress_field: &[ElementStress]) -> Result<f64> {
    if stress_field.iter().any(|s| !s.sigma_x.is_finite() || !s.sigma_y.is_finite()) {
        return Err(FeaError::SingularSystem(
            "stress recovery produced non-finite values".to_owned(),
        ));
    }

    stress_field
        .iter()
        .map(ElementStress::max)
        .reduce(f64::max)
        .ok_or_else(|| FeaError::DegenerateGeometry("no solid elements".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_displacement_has_zero_stress() {
        let resolution = Resolution::new(1, 1).unwrap();
        let dof_map = [ElementDofs {
            element: 0,
            dofs: [2, 3, 6, 7, 4, 5, 0, 1],
        }];
        let field = compute_stress(&dof_map, &DVector::zeros(8), resolution, &Material::default());
        assert_eq!(field[0].sigma_x, 0.0);
        assert_eq!(field[0].sigma_y, 0.0);
    }

    #[test]
    fn test_single_element_stress() {
        let resolution = Resolution::new(1, 1).unwrap();
        let material = Material::default();
        let dof_map = [ElementDofs {
            element: 0,
            dofs: [0, 1, 2, 3, 4, 5, 6, 7],
        }];
        // only local DOF 4 (x of the third corner) displaced
        let mut u = DVector::zeros(8);
        u[4] = 1e-3;

        let field = compute_stress(&dof_map, &u, resolution, &material);
        let scale = 2e6 / (2.0 * 50.0 * 4000.0 * (1.0 - 0.09));
        assert_relative_eq!(field[0].sigma_x, scale * 1e-3, max_relative = 1e-12);
        assert_relative_eq!(field[0].sigma_y, scale * 0.3e-3, max_relative = 1e-12);
    }

    #[test]
    fn test_max_stress() {
        let field = vec![
            ElementStress {
                element: 0,
                sigma_x: 1.0,
                sigma_y: 4.0,
            },
            ElementStress {
                element: 1,
                sigma_x: 3.0,
                sigma_y: 2.0,
            },
        ];
        assert_eq!(max_stress(&field).unwrap(), 4.0);
        assert!(matches!(max_stress(&[]), Err(FeaError::DegenerateGeometry(_))));
    }

    #[test]
    fn test_max_stress_rejects_nan() {
        let field = vec![ElementStress {
            element: 0,
            sigma_x: f64::NAN,
            sigma_y: 1.0,
        }];
        assert!(matches!(max_stress(&field), Err(FeaError::SingularSystem(_))));
    }
}
