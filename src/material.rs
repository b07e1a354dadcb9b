use nalgebra::{matrix, Matrix3};

use crate::error::FlattenError;

/// Tolerance used when checking a stiffness matrix for symmetry and
/// semi-definiteness, relative to its largest entry
const STIFFNESS_TOLERANCE: f64 = 1e-9;

/// Calculates the isotropic plane-stress stress-strain matrix
///
/// # Arguments
/// * `poisson_ratio` - The poisson ratio of the material
/// * `youngs_modulus` - The modulus of elasticity of the material
///
/// # Returns
/// A 3x3 stress-strain matrix acting on `[e_uu, e_vv, gamma_uv]`
pub fn compute_stress_strain_matrix(poisson_ratio: f64, youngs_modulus: f64) -> Matrix3<f64> {
    let mut stress_strain_mat: Matrix3<f64> = matrix![
        1.0, poisson_ratio, 0.0;
        poisson_ratio, 1.0, 0.0;
        0.0, 0.0, (1.0 - poisson_ratio)/2.0;
    ];

    stress_strain_mat *= youngs_modulus / (1.0 - f64::powi(poisson_ratio, 2));

    stress_strain_mat
}

/// Calculates the reduced (plane-stress) stiffness of a unidirectional ply
///
/// # Arguments
/// * `e1` - Modulus along the fibers
/// * `e2` - Modulus across the fibers
/// * `nu12` - Major poisson ratio
/// * `g12` - In-plane shear modulus
///
/// # Returns
/// A 3x3 stress-strain matrix acting on `[e_11, e_22, gamma_12]`
pub fn compute_orthotropic_stiffness(
    e1: f64,
    e2: f64,
    nu12: f64,
    g12: f64,
) -> Result<Matrix3<f64>, FlattenError> {
    if !(e1 > 0.0 && e2 > 0.0 && g12 > 0.0) {
        return Err(FlattenError::Input(format!(
            "Orthotropic moduli must be positive, got e1={e1}, e2={e2}, g12={g12}"
        )));
    }

    let nu21 = nu12 * e2 / e1;
    let denominator = 1.0 - nu12 * nu21;
    if denominator <= 0.0 {
        return Err(FlattenError::Input(format!(
            "Poisson ratio {nu12} is not admissible for e1={e1}, e2={e2}"
        )));
    }

    Ok(matrix![
        e1 / denominator, nu12 * e2 / denominator, 0.0;
        nu12 * e2 / denominator, e2 / denominator, 0.0;
        0.0, 0.0, g12;
    ])
}

/// Checks that a stiffness matrix is finite, symmetric and positive
/// semi-definite
pub fn validate_stiffness(stiffness: &Matrix3<f64>) -> Result<(), FlattenError> {
    if stiffness.iter().any(|c| !c.is_finite()) {
        return Err(FlattenError::Input(
            "Stiffness matrix has non-finite entries".to_owned(),
        ));
    }

    let scale = stiffness.amax().max(f64::MIN_POSITIVE);
    if (stiffness - stiffness.transpose()).amax() > STIFFNESS_TOLERANCE * scale {
        return Err(FlattenError::Input(
            "Stiffness matrix is not symmetric".to_owned(),
        ));
    }

    let min_eigenvalue = stiffness.symmetric_eigen().eigenvalues.min();
    if min_eigenvalue < -STIFFNESS_TOLERANCE * scale {
        return Err(FlattenError::Input(format!(
            "Stiffness matrix is not positive semi-definite (eigenvalue {min_eigenvalue:e})"
        )));
    }

    Ok(())
}
