//! Fixed-size dense routines used by the element kernels.
//!
//! Every matrix in the kernels is 2x2 or 3x3, so these are written out
//! directly instead of going through nalgebra's general decompositions.

use nalgebra::{Matrix2, Matrix3, Vector3};

/// Voigt scaling applied to `[E_uu, E_vv, E_uv]`; shear is carried as
/// engineering shear
pub const VOIGT_SCALE: [f64; 3] = [1.0, 1.0, 0.5];

fn remaining(index: usize) -> [usize; 2] {
    match index {
        0 => [1, 2],
        1 => [0, 2],
        _ => [0, 1],
    }
}

/// Returns the 2x2 minor of `m` with row `row` and column `col` removed
fn minor(m: &Matrix3<f64>, row: usize, col: usize) -> f64 {
    let rows = remaining(row);
    let cols = remaining(col);

    m[(rows[0], cols[0])] * m[(rows[1], cols[1])] - m[(rows[0], cols[1])] * m[(rows[1], cols[0])]
}

/// Computes the cofactor matrix of a 3x3 matrix
///
/// Entry `(i, j)` is `(-1)^(i+j)` times the minor at `(i, j)`, which is also
/// `d det(m) / d m_ij`.
pub fn cofactor_matrix(m: &Matrix3<f64>) -> Matrix3<f64> {
    Matrix3::from_fn(|i, j| {
        let sign = if (i + j) % 2 == 0 { 1.0 } else { -1.0 };
        sign * minor(m, i, j)
    })
}

/// Transpose of the cofactor matrix, so that `adj(m) * m = det(m) * I`
pub fn adjugate(m: &Matrix3<f64>) -> Matrix3<f64> {
    cofactor_matrix(m).transpose()
}

/// Determinant by cofactor expansion along the first row
pub fn determinant_from_cofactors(m: &Matrix3<f64>, cofactors: &Matrix3<f64>) -> f64 {
    m.row(0).dot(&cofactors.row(0))
}

/// Matrix that is 1 at `(row, col)` and zero elsewhere: the derivative of a
/// homogeneous vertex matrix with respect to one of its coordinates
pub fn unit_perturbation(row: usize, col: usize) -> Matrix3<f64> {
    let mut m = Matrix3::zeros();
    m[(row, col)] = 1.0;
    m
}

pub fn upper_left_block(m: &Matrix3<f64>) -> Matrix2<f64> {
    Matrix2::new(m[(0, 0)], m[(0, 1)], m[(1, 0)], m[(1, 1)])
}

/// Encodes a symmetric 2x2 tensor as `[t_uu, t_vv, 2 t_uv]`
pub fn voigt_vector(t: &Matrix2<f64>) -> Vector3<f64> {
    Vector3::new(
        t[(0, 0)] / VOIGT_SCALE[0],
        t[(1, 1)] / VOIGT_SCALE[1],
        t[(0, 1)] / VOIGT_SCALE[2],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> Matrix3<f64> {
        Matrix3::new(2.0, -1.0, 0.5, 0.3, 4.0, -2.0, 1.0, 1.0, 1.0)
    }

    #[test]
    fn adjugate_times_matrix_is_scaled_identity() {
        let m = sample();
        let det = m.determinant();
        assert_relative_eq!(adjugate(&m) * m, Matrix3::identity() * det, epsilon = 1e-12);
    }

    #[test]
    fn cofactor_expansion_matches_determinant() {
        let m = sample();
        let det = determinant_from_cofactors(&m, &cofactor_matrix(&m));
        assert_relative_eq!(det, m.determinant(), epsilon = 1e-12);
    }

    #[test]
    fn cofactors_are_determinant_derivatives() {
        let m = sample();
        let cof = cofactor_matrix(&m);
        let h = 1e-6;
        for i in 0..3 {
            for j in 0..3 {
                let dm = unit_perturbation(i, j) * h;
                let fd = ((m + dm).determinant() - (m - dm).determinant()) / (2.0 * h);
                assert_relative_eq!(cof[(i, j)], fd, epsilon = 1e-7);
            }
        }
    }

    #[test]
    fn voigt_doubles_shear() {
        let t = Matrix2::new(0.1, 0.25, 0.25, -0.2);
        assert_relative_eq!(voigt_vector(&t), Vector3::new(0.1, -0.2, 0.5));
    }
}
