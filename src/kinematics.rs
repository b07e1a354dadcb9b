use nalgebra::{Matrix2, Matrix3, Vector3};

use crate::{
    datatypes::{validate_shapes, Element, ReferenceTriangle, Vertex},
    error::FlattenError,
    tensor::{cofactor_matrix, determinant_from_cofactors, upper_left_block, voigt_vector},
};

/// Relative threshold below which a layout triangle counts as collapsed.
/// Compared against `|det(rel_uvw)|` divided by the longest squared uv edge.
pub const DEGENERACY_TOLERANCE: f64 = 1e-12;

/// Per-triangle deformation state of the layout relative to the reference
#[derive(Debug, Clone)]
pub struct ElementKinematics {
    /// Unsigned uv-space area
    pub area: f64,
    /// Sign of the uv triangle's orientation, `1.0` or `-1.0`
    pub orientation: f64,
    /// Centered layout vertices as homogeneous columns
    pub rel_uvw: Matrix3<f64>,
    /// Centered reference vertices as homogeneous columns
    pub rel_ref: Matrix3<f64>,
    pub uvw_adjugate: Matrix3<f64>,
    pub uvw_inverse: Matrix3<f64>,
    pub deformation_gradient: Matrix2<f64>,
    pub strain: Matrix2<f64>,
    pub strain_vector: Vector3<f64>,
}

/// Subtracts the centroid from each vertex, appends a homogeneous 1 and lays
/// the vertices out as columns
fn centered_homogeneous(vertices: &[Vertex; 3]) -> Matrix3<f64> {
    let cx = vertices.iter().map(|v| v.x).sum::<f64>() / 3.0;
    let cy = vertices.iter().map(|v| v.y).sum::<f64>() / 3.0;

    Matrix3::from_fn(|row, col| match row {
        0 => vertices[col].x - cx,
        1 => vertices[col].y - cy,
        _ => 1.0,
    })
}

fn longest_edge_squared(vertices: &[Vertex; 3]) -> f64 {
    (0..3)
        .map(|i| {
            let a = vertices[i];
            let b = vertices[(i + 1) % 3];
            f64::powi(a.x - b.x, 2) + f64::powi(a.y - b.y, 2)
        })
        .fold(0.0, f64::max)
}

/// Computes the Green-Lagrange strain `1/2 (F^T F - I)`
pub fn green_lagrange_strain(deformation_gradient: &Matrix2<f64>) -> Matrix2<f64> {
    0.5 * (deformation_gradient.transpose() * deformation_gradient - Matrix2::identity())
}

/// Reads the three layout vertices of an element out of the flat layout
pub fn gather_layout_vertices(layout: &[f64], element: &Element) -> [Vertex; 3] {
    element
        .nodes
        .map(|n| Vertex::new(layout[2 * n], layout[2 * n + 1]))
}

/// Calculates the deformation of a single triangle
///
/// # Arguments
/// * `element_index` - Index of the triangle, used in error reports
/// * `reference` - The undeformed shape of the triangle
/// * `uv` - The triangle's current layout vertices
///
/// # Returns
/// The triangle's kinematics, or an error if the uv triangle is collapsed
pub fn compute_element_kinematics(
    element_index: usize,
    reference: &ReferenceTriangle,
    uv: &[Vertex; 3],
) -> Result<ElementKinematics, FlattenError> {
    let rel_uvw = centered_homogeneous(uv);
    let rel_ref = centered_homogeneous(reference);

    let cofactors = cofactor_matrix(&rel_uvw);
    let det = determinant_from_cofactors(&rel_uvw, &cofactors);
    let area = 0.5 * det.abs();

    if !det.is_finite() {
        return Err(FlattenError::NonFiniteResult {
            element: Some(element_index),
            quantity: "uv area",
        });
    }
    let scale = longest_edge_squared(uv);
    if scale == 0.0 || det.abs() <= DEGENERACY_TOLERANCE * scale {
        return Err(FlattenError::DegenerateElement {
            element: element_index,
            area,
        });
    }

    let uvw_adjugate = cofactors.transpose();
    let uvw_inverse = uvw_adjugate / det;

    let deformation_gradient = upper_left_block(&(rel_ref * uvw_inverse));
    let strain = green_lagrange_strain(&deformation_gradient);
    let strain_vector = voigt_vector(&strain);

    Ok(ElementKinematics {
        area,
        orientation: det.signum(),
        rel_uvw,
        rel_ref,
        uvw_adjugate,
        uvw_inverse,
        deformation_gradient,
        strain,
        strain_vector,
    })
}

/// Calculates the kinematics of every triangle in the mesh
///
/// Stops at the first triangle that cannot be evaluated.
pub fn compute_mesh_kinematics(
    reference: &[ReferenceTriangle],
    layout: &[f64],
    elements: &[Element],
) -> Result<Vec<ElementKinematics>, FlattenError> {
    validate_shapes(reference, elements, layout.len())?;

    reference
        .iter()
        .zip(elements)
        .enumerate()
        .map(|(i, (reference, element))| {
            compute_element_kinematics(i, reference, &gather_layout_vertices(layout, element))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::adjugate;
    use approx::assert_relative_eq;

    fn unit_triangle() -> ReferenceTriangle {
        [
            Vertex::new(0.0, 0.0),
            Vertex::new(1.0, 0.0),
            Vertex::new(0.0, 1.0),
        ]
    }

    fn transformed(tri: &ReferenceTriangle, f: impl Fn(Vertex) -> Vertex) -> [Vertex; 3] {
        tri.map(f)
    }

    #[test]
    fn identical_triangle_has_no_strain() {
        let kin = compute_element_kinematics(0, &unit_triangle(), &unit_triangle()).unwrap();
        assert_relative_eq!(kin.area, 0.5, epsilon = 1e-14);
        assert_relative_eq!(kin.deformation_gradient, Matrix2::identity(), epsilon = 1e-14);
        assert_relative_eq!(kin.strain, Matrix2::zeros(), epsilon = 1e-14);
        assert_relative_eq!(kin.strain_vector, Vector3::zeros(), epsilon = 1e-14);
    }

    #[test]
    fn translation_leaves_strain_and_area_unchanged() {
        let reference = unit_triangle();
        let uv = [
            Vertex::new(0.1, -0.2),
            Vertex::new(1.3, 0.1),
            Vertex::new(-0.1, 0.9),
        ];
        let shifted = transformed(&uv, |v| Vertex::new(v.x + 12.5, v.y - 3.0));

        let a = compute_element_kinematics(0, &reference, &uv).unwrap();
        let b = compute_element_kinematics(0, &reference, &shifted).unwrap();
        assert_relative_eq!(a.area, b.area, epsilon = 1e-12);
        assert_relative_eq!(a.strain, b.strain, epsilon = 1e-12);
    }

    #[test]
    fn rigid_rotation_has_no_strain() {
        let (s, c) = f64::sin_cos(0.7);
        let uv = transformed(&unit_triangle(), |v| {
            Vertex::new(c * v.x - s * v.y + 2.0, s * v.x + c * v.y)
        });
        let kin = compute_element_kinematics(0, &unit_triangle(), &uv).unwrap();
        assert_relative_eq!(kin.strain, Matrix2::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn doubled_layout_shrinks_reference() {
        let uv = transformed(&unit_triangle(), |v| Vertex::new(2.0 * v.x, 2.0 * v.y));
        let kin = compute_element_kinematics(0, &unit_triangle(), &uv).unwrap();

        assert_relative_eq!(kin.area, 2.0, epsilon = 1e-12);
        assert_relative_eq!(kin.deformation_gradient, Matrix2::identity() * 0.5, epsilon = 1e-12);
        assert_relative_eq!(
            kin.strain_vector,
            Vector3::new(-0.375, -0.375, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn mirrored_layout_is_negatively_oriented() {
        let uv = transformed(&unit_triangle(), |v| Vertex::new(-v.x, v.y));
        let kin = compute_element_kinematics(0, &unit_triangle(), &uv).unwrap();
        assert_eq!(kin.orientation, -1.0);
        assert_relative_eq!(kin.area, 0.5, epsilon = 1e-14);
        assert_relative_eq!(adjugate(&kin.rel_uvw), kin.uvw_adjugate, epsilon = 1e-12);
    }

    #[test]
    fn collinear_layout_is_degenerate() {
        let uv = [
            Vertex::new(0.0, 0.0),
            Vertex::new(1.0, 1.0),
            Vertex::new(2.0, 2.0),
        ];
        let err = compute_element_kinematics(4, &unit_triangle(), &uv).unwrap_err();
        assert!(matches!(err, FlattenError::DegenerateElement { element: 4, .. }));
    }

    #[test]
    fn collapsed_point_is_degenerate() {
        let uv = [Vertex::new(3.0, 3.0); 3];
        assert!(matches!(
            compute_element_kinematics(0, &unit_triangle(), &uv),
            Err(FlattenError::DegenerateElement { .. })
        ));
    }

    #[test]
    fn nan_layout_is_reported_as_non_finite() {
        let mut uv = unit_triangle();
        uv[1].x = f64::NAN;
        assert!(matches!(
            compute_element_kinematics(2, &unit_triangle(), &uv),
            Err(FlattenError::NonFiniteResult {
                element: Some(2),
                ..
            })
        ));
    }

    #[test]
    fn mesh_kinematics_reports_offending_triangle() {
        let reference = vec![unit_triangle(), unit_triangle()];
        let elements = vec![Element { nodes: [0, 1, 2] }, Element { nodes: [0, 1, 3] }];
        // vertex 3 sits on the line through vertices 0 and 1
        let layout = vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 2.0, 0.0];
        let err = compute_mesh_kinematics(&reference, &layout, &elements).unwrap_err();
        assert!(matches!(err, FlattenError::DegenerateElement { element: 1, .. }));
    }
}
