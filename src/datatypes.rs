use crate::error::FlattenError;

/// A point in a 2-D plane, either in the reference frame or in the layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64) -> Vertex {
        Vertex { x, y }
    }
}

/// A triangle of the course mesh, as indices into the layout vertex list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    pub nodes: [usize; 3],
}

/// The undeformed in-plane shape of one triangle
pub type ReferenceTriangle = [Vertex; 3];

/// Geometry that stays fixed for an optimization run: the reference shape of
/// every triangle and which layout vertices instantiate it.
#[derive(Debug, Clone)]
pub struct CourseMesh {
    pub reference: Vec<ReferenceTriangle>,
    pub elements: Vec<Element>,
    pub vertex_count: usize,
}

impl CourseMesh {
    /// Builds a mesh after checking that the triangle counts agree and every
    /// element references an existing vertex
    pub fn new(
        reference: Vec<ReferenceTriangle>,
        elements: Vec<Element>,
        vertex_count: usize,
    ) -> Result<CourseMesh, FlattenError> {
        validate_shapes(&reference, &elements, 2 * vertex_count)?;
        Ok(CourseMesh {
            reference,
            elements,
            vertex_count,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerSettings {
    pub step_size: f64,
    pub iterations: u64,
    pub show_progress: bool,
    pub log_iterations: bool,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        OptimizerSettings {
            step_size: 1e-7,
            iterations: 10,
            show_progress: false,
            log_iterations: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlatteningResult {
    pub layout: Vec<Vertex>,
    pub initial_energy: f64,
    /// Energy after each iteration, in order
    pub energy_trajectory: Vec<f64>,
}

impl FlatteningResult {
    pub fn final_energy(&self) -> f64 {
        *self
            .energy_trajectory
            .last()
            .unwrap_or(&self.initial_energy)
    }
}

/// Checks that reference triangles, connectivity and a flat layout of
/// `layout_len` coordinates describe the same mesh
pub fn validate_shapes(
    reference: &[ReferenceTriangle],
    elements: &[Element],
    layout_len: usize,
) -> Result<(), FlattenError> {
    if reference.len() != elements.len() {
        return Err(FlattenError::ShapeMismatch(format!(
            "{} reference triangles but {} elements",
            reference.len(),
            elements.len()
        )));
    }
    if layout_len % 2 != 0 {
        return Err(FlattenError::ShapeMismatch(format!(
            "layout has odd length {layout_len}"
        )));
    }

    let vertex_count = layout_len / 2;
    for (i, element) in elements.iter().enumerate() {
        if let Some(node) = element.nodes.iter().find(|n| **n >= vertex_count) {
            return Err(FlattenError::ShapeMismatch(format!(
                "element {i} references vertex {node} but the layout has {vertex_count} vertices"
            )));
        }
    }

    Ok(())
}

/// Packs per-vertex coordinates into `[u0, v0, u1, v1, ...]`
pub fn flatten_layout(vertices: &[Vertex]) -> Vec<f64> {
    vertices.iter().flat_map(|v| [v.x, v.y]).collect()
}

/// Inverse of [`flatten_layout`]
pub fn unflatten_layout(layout: &[f64]) -> Result<Vec<Vertex>, FlattenError> {
    if layout.len() % 2 != 0 {
        return Err(FlattenError::ShapeMismatch(format!(
            "layout has odd length {}",
            layout.len()
        )));
    }
    Ok(layout
        .chunks_exact(2)
        .map(|c| Vertex::new(c[0], c[1]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> ReferenceTriangle {
        [
            Vertex::new(0.0, 0.0),
            Vertex::new(1.0, 0.0),
            Vertex::new(0.0, 1.0),
        ]
    }

    #[test]
    fn layout_packing_preserves_vertex_order() {
        let vertices = vec![Vertex::new(1.0, 2.0), Vertex::new(3.0, 4.0)];
        let flat = flatten_layout(&vertices);
        assert_eq!(flat, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(unflatten_layout(&flat).unwrap(), vertices);
    }

    #[test]
    fn odd_layout_is_rejected() {
        assert!(matches!(
            unflatten_layout(&[1.0, 2.0, 3.0]),
            Err(FlattenError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn out_of_range_vertex_is_rejected() {
        let elements = vec![Element { nodes: [0, 1, 3] }];
        let err = CourseMesh::new(vec![unit_triangle()], elements, 3).unwrap_err();
        assert!(matches!(err, FlattenError::ShapeMismatch(msg) if msg.contains("element 0")));
    }

    #[test]
    fn triangle_count_mismatch_is_rejected() {
        let elements = vec![Element { nodes: [0, 1, 2] }, Element { nodes: [0, 2, 1] }];
        assert!(CourseMesh::new(vec![unit_triangle()], elements, 3).is_err());
    }

    #[test]
    fn final_energy_falls_back_to_initial() {
        let result = FlatteningResult {
            layout: vec![],
            initial_energy: 4.0,
            energy_trajectory: vec![],
        };
        assert_eq!(result.final_energy(), 4.0);
    }
}
