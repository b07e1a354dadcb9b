use nalgebra::Matrix3;

use crate::{
    datatypes::{Element, ReferenceTriangle},
    error::FlattenError,
    kinematics::{compute_mesh_kinematics, ElementKinematics},
};

/// Calculates `1/2 s^T C s` for a Voigt strain `s`
pub fn strain_energy_density(kin: &ElementKinematics, stiffness: &Matrix3<f64>) -> f64 {
    0.5 * kin.strain_vector.dot(&(stiffness * kin.strain_vector))
}

/// Calculates the strain energy stored in one triangle
///
/// # Arguments
/// * `kin` - The triangle's kinematics
/// * `stiffness` - The 3x3 stress-strain matrix
///
/// # Returns
/// The energy density scaled by the triangle's uv area
pub fn compute_element_energy(kin: &ElementKinematics, stiffness: &Matrix3<f64>) -> f64 {
    strain_energy_density(kin, stiffness) * kin.area
}

/// Sums per-element energies, failing on the first non-finite one
pub fn sum_element_energies(
    kinematics: &[ElementKinematics],
    stiffness: &Matrix3<f64>,
) -> Result<f64, FlattenError> {
    let mut total = 0.0;
    for (i, kin) in kinematics.iter().enumerate() {
        let energy = compute_element_energy(kin, stiffness);
        if !energy.is_finite() {
            return Err(FlattenError::NonFiniteResult {
                element: Some(i),
                quantity: "strain energy",
            });
        }
        total += energy;
    }

    if !total.is_finite() {
        return Err(FlattenError::NonFiniteResult {
            element: None,
            quantity: "strain energy",
        });
    }

    Ok(total)
}

/// Calculates the total strain energy of a layout
///
/// # Arguments
/// * `reference` - The reference shape of every triangle
/// * `layout` - Flat layout coordinates `[u0, v0, u1, v1, ...]`
/// * `elements` - Layout vertex indices of every triangle
/// * `stiffness` - The 3x3 stress-strain matrix
///
/// # Returns
/// The sum of every triangle's strain energy
pub fn evaluate_energy(
    reference: &[ReferenceTriangle],
    layout: &[f64],
    elements: &[Element],
    stiffness: &Matrix3<f64>,
) -> Result<f64, FlattenError> {
    let kinematics = compute_mesh_kinematics(reference, layout, elements)?;
    sum_element_energies(&kinematics, stiffness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{datatypes::Vertex, material::compute_orthotropic_stiffness};
    use approx::assert_relative_eq;

    fn unit_triangle() -> ReferenceTriangle {
        [
            Vertex::new(0.0, 0.0),
            Vertex::new(1.0, 0.0),
            Vertex::new(0.0, 1.0),
        ]
    }

    fn single(layout: Vec<f64>, stiffness: &Matrix3<f64>) -> Result<f64, FlattenError> {
        evaluate_energy(
            &[unit_triangle()],
            &layout,
            &[Element { nodes: [0, 1, 2] }],
            stiffness,
        )
    }

    #[test]
    fn identical_layout_stores_no_energy() {
        let energy = single(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0], &Matrix3::identity()).unwrap();
        assert_relative_eq!(energy, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn translated_layout_stores_no_energy() {
        let energy = single(vec![5.0, -2.0, 6.0, -2.0, 5.0, -1.0], &Matrix3::identity()).unwrap();
        assert_relative_eq!(energy, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn doubled_layout_energy() {
        // s = [-0.375, -0.375, 0], area = 2
        let energy = single(vec![0.0, 0.0, 2.0, 0.0, 0.0, 2.0], &Matrix3::identity()).unwrap();
        assert_relative_eq!(energy, 0.28125, epsilon = 1e-12);
    }

    #[test]
    fn sheared_layout_uses_engineering_shear() {
        // u = x + 0.5 y maps the reference; F = [[1, -0.5], [0, 1]]
        let layout = vec![0.0, 0.0, 1.0, 0.0, 0.5, 1.0];
        let stiffness = Matrix3::from_diagonal(&nalgebra::Vector3::new(0.0, 0.0, 1.0));
        let energy = single(layout, &stiffness).unwrap();
        // E_uv = -0.25, gamma = -0.5, W = 1/2 * 0.25 * area 0.5
        assert_relative_eq!(energy, 0.0625, epsilon = 1e-12);
    }

    #[test]
    fn energy_is_non_negative_for_distorted_layouts() {
        let stiffness = compute_orthotropic_stiffness(135e3, 10e3, 0.3, 5e3).unwrap();
        for k in 0..20 {
            let t = k as f64 * 0.37;
            let layout = vec![
                0.2 * t.sin(),
                0.1 * t.cos(),
                1.0 + 0.3 * (2.0 * t).sin(),
                0.2 * t.cos(),
                -0.25 * (3.0 * t).cos(),
                1.0 + 0.4 * t.sin(),
            ];
            let energy = single(layout, &stiffness).unwrap();
            assert!(energy >= 0.0, "negative energy {energy} at sample {k}");
        }
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let err = evaluate_energy(
            &[unit_triangle(), unit_triangle()],
            &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            &[Element { nodes: [0, 1, 2] }],
            &Matrix3::identity(),
        )
        .unwrap_err();
        assert!(matches!(err, FlattenError::ShapeMismatch(_)));
    }

    #[test]
    fn overflowing_energy_is_reported() {
        let stiffness = Matrix3::identity() * f64::MAX;
        let err = single(vec![0.0, 0.0, 0.1, 0.0, 0.0, 0.1], &stiffness).unwrap_err();
        assert!(matches!(
            err,
            FlattenError::NonFiniteResult {
                element: Some(0),
                ..
            }
        ));
    }
}
