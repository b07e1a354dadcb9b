use nalgebra::{Matrix2, Matrix3, SMatrix, SVector};

use crate::{
    datatypes::{Element, ReferenceTriangle},
    energy::strain_energy_density,
    error::FlattenError,
    kinematics::{compute_mesh_kinematics, ElementKinematics},
    tensor::{unit_perturbation, upper_left_block, voigt_vector},
};

/// Local degrees of freedom per triangle: 3 vertices x (u, v)
pub const ELEMENT_DOF: usize = 6;

/// Local gradient of one triangle, ordered `[u0, v0, u1, v1, u2, v2]`
pub type ElementGradient = SVector<f64, ELEMENT_DOF>;

/// Calculates the derivative of the unsigned uv area with respect to each
/// local coordinate
///
/// `d det(U) / d U_ij` is the `(i, j)` cofactor, i.e. `trace(adj(U) dU)` for
/// the one-hot perturbation `dU`. The orientation sign carries the derivative
/// through the absolute value.
pub fn compute_area_gradient(kin: &ElementKinematics) -> ElementGradient {
    let mut area_gradient = ElementGradient::zeros();
    for vertex in 0..3 {
        for coord in 0..2 {
            let duvw = unit_perturbation(coord, vertex);
            area_gradient[2 * vertex + coord] =
                0.5 * kin.orientation * (kin.uvw_adjugate * duvw).trace();
        }
    }
    area_gradient
}

/// Calculates `dF` for a perturbation of homogeneous layout entry
/// `(coord, vertex)`, using `d(U^-1) = -U^-1 dU U^-1`
pub fn compute_deformation_gradient_derivative(
    kin: &ElementKinematics,
    coord: usize,
    vertex: usize,
) -> Matrix2<f64> {
    let duvw = unit_perturbation(coord, vertex);
    let dinverse: Matrix3<f64> = -(kin.uvw_inverse * duvw * kin.uvw_inverse);
    upper_left_block(&(kin.rel_ref * dinverse))
}

/// Calculates the Voigt strain derivative for every local coordinate.
/// Column `2 * vertex + coord` holds `d s / d u_(coord, vertex)`.
pub fn compute_strain_vector_derivatives(kin: &ElementKinematics) -> SMatrix<f64, 3, ELEMENT_DOF> {
    let f = &kin.deformation_gradient;
    let mut derivatives = SMatrix::<f64, 3, ELEMENT_DOF>::zeros();

    for vertex in 0..3 {
        for coord in 0..2 {
            let df = compute_deformation_gradient_derivative(kin, coord, vertex);
            let dstrain = 0.5 * (df.transpose() * f + f.transpose() * df);
            derivatives.set_column(2 * vertex + coord, &voigt_vector(&dstrain));
        }
    }

    derivatives
}

/// The two contributions to a triangle's energy gradient
#[derive(Debug, Clone)]
pub struct ElementGradientTerms {
    /// `area * (C s) . ds`
    pub strain_variation: ElementGradient,
    /// `1/2 (s^T C s) d area`
    pub area_variation: ElementGradient,
}

impl ElementGradientTerms {
    pub fn total(&self) -> ElementGradient {
        self.strain_variation + self.area_variation
    }
}

/// Calculates both gradient terms of a triangle's strain energy
///
/// # Arguments
/// * `kin` - The triangle's kinematics
/// * `stiffness` - The 3x3 stress-strain matrix
///
/// # Returns
/// The strain-variation and area-variation terms, each over the 6 local
/// coordinates
pub fn compute_element_gradient_terms(
    kin: &ElementKinematics,
    stiffness: &Matrix3<f64>,
) -> ElementGradientTerms {
    // d(1/2 s^T C s) = s^T sym(C) ds
    let stress = 0.5 * (stiffness + stiffness.transpose()) * kin.strain_vector;
    let dstrain = compute_strain_vector_derivatives(kin);

    let strain_variation = (dstrain.transpose() * stress) * kin.area;
    let area_variation = compute_area_gradient(kin) * strain_energy_density(kin, stiffness);

    ElementGradientTerms {
        strain_variation,
        area_variation,
    }
}

pub fn compute_element_gradient(kin: &ElementKinematics, stiffness: &Matrix3<f64>) -> ElementGradient {
    compute_element_gradient_terms(kin, stiffness).total()
}

/// Adds each element's local gradient into the global per-vertex gradient
///
/// # Arguments
/// * `elements` - Layout vertex indices of every triangle
/// * `element_gradients` - Local gradients, corresponding to `elements`
/// * `layout_len` - Length of the flat layout vector
fn assemble_global_gradient(
    elements: &[Element],
    element_gradients: Vec<ElementGradient>,
    layout_len: usize,
) -> Vec<f64> {
    let mut global_gradient = vec![0.0; layout_len];

    for (element, local) in std::iter::zip(elements, element_gradients) {
        for (local_vertex, node) in element.nodes.iter().enumerate() {
            global_gradient[2 * node] += local[2 * local_vertex];
            global_gradient[2 * node + 1] += local[2 * local_vertex + 1];
        }
    }

    global_gradient
}

/// Calculates the gradient of the total strain energy with respect to every
/// layout coordinate
///
/// # Arguments
/// * `reference` - The reference shape of every triangle
/// * `layout` - Flat layout coordinates `[u0, v0, u1, v1, ...]`
/// * `elements` - Layout vertex indices of every triangle
/// * `stiffness` - The 3x3 stress-strain matrix
///
/// # Returns
/// A vector indexed like `layout`
pub fn evaluate_gradient(
    reference: &[ReferenceTriangle],
    layout: &[f64],
    elements: &[Element],
    stiffness: &Matrix3<f64>,
) -> Result<Vec<f64>, FlattenError> {
    let kinematics = compute_mesh_kinematics(reference, layout, elements)?;

    let mut element_gradients: Vec<ElementGradient> = Vec::with_capacity(kinematics.len());
    for (i, kin) in kinematics.iter().enumerate() {
        let local = compute_element_gradient(kin, stiffness);
        if local.iter().any(|g| !g.is_finite()) {
            return Err(FlattenError::NonFiniteResult {
                element: Some(i),
                quantity: "strain energy gradient",
            });
        }
        element_gradients.push(local);
    }

    let global_gradient = assemble_global_gradient(elements, element_gradients, layout.len());
    if global_gradient.iter().any(|g| !g.is_finite()) {
        return Err(FlattenError::NonFiniteResult {
            element: None,
            quantity: "strain energy gradient",
        });
    }

    Ok(global_gradient)
}
