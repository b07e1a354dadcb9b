use nalgebra::{Matrix2x3, Vector3};

use crate::{
    datatypes::{ReferenceTriangle, Vertex},
    error::FlattenError,
};

/// Projects three surface points into a triangle's local in-plane frame
///
/// # Arguments
/// * `points` - The triangle's vertices in 3-D
/// * `basis` - In-plane axes of the surface at this triangle, one per row
///
/// # Returns
/// The triangle in local 2-D coordinates
pub fn project_triangle(points: &[Vector3<f64>; 3], basis: &Matrix2x3<f64>) -> ReferenceTriangle {
    points.map(|p| {
        let local = basis * p;
        Vertex::new(local[0], local[1])
    })
}

/// Projects every triangle of a surface with its own in-plane basis
pub fn project_triangles(
    triangles: &[[Vector3<f64>; 3]],
    bases: &[Matrix2x3<f64>],
) -> Result<Vec<ReferenceTriangle>, FlattenError> {
    if triangles.len() != bases.len() {
        return Err(FlattenError::ShapeMismatch(format!(
            "{} surface triangles but {} in-plane bases",
            triangles.len(),
            bases.len()
        )));
    }

    Ok(triangles
        .iter()
        .zip(bases)
        .map(|(points, basis)| project_triangle(points, basis))
        .collect())
}
