use std::ops::{ Index, IndexMut, Mul };
use std::convert::From;

use crate::consts::HOMOGENEOUS_W_EPSILON;
use crate::feq;
use crate::tuple::Vector3;

/// A 4x4 homogeneous matrix, stored row-major.
///
/// Curves are moved between spaces with these matrices. Points are treated
/// as `(x, y, z, 1)` and divided by the resulting `w` (see
/// `transform_point`); vectors are treated as `(x, y, z, 0)`.
///
/// # Examples
///
/// Composing a translation with a scale:
///
/// ```
/// # use curve_tracer::tuple::Vector3;
/// # use curve_tracer::matrix::Matrix4D;
/// let m = Matrix4D::translation(1.0, 0.0, 0.0) * Matrix4D::scaling(2.0, 2.0, 2.0);
/// let p = m.transform_point(&Vector3::new(1.0, 1.0, 1.0));
/// assert_eq!(p, Vector3::new(3.0, 2.0, 2.0));
/// ```
#[derive(Copy, Clone, Debug, PartialOrd)]
pub struct Matrix4D {
    data: [f64; 16],
}

/// Matrices are compared element-wise, within `FEQ_EPSILON`.
impl PartialEq for Matrix4D {
    fn eq(&self, other: &Matrix4D) -> bool {
        self.data.iter().zip(other.data.iter()).all(|(x, y)| feq(*x, *y))
    }
}

impl Matrix4D {
    /// Creates a new `Matrix4D`. All elements are initialized to `0.0`.
    pub fn new() -> Matrix4D {
        Matrix4D { data: [0.0; 16] }
    }

    pub fn identity() -> Matrix4D {
        let mut buf = [0.0; 16];
        buf[0] = 1.0; buf[5] = 1.0; buf[10] = 1.0; buf[15] = 1.0;

        Matrix4D { data: buf }
    }

    pub fn translation(x: f64, y: f64, z: f64) -> Matrix4D {
        let mut trans = Self::identity();
        trans[(0, 3)] = x;
        trans[(1, 3)] = y;
        trans[(2, 3)] = z;

        trans
    }

    pub fn scaling(x: f64, y: f64, z: f64) -> Matrix4D {
        let mut scale = Self::identity();
        scale[(0, 0)] = x;
        scale[(1, 1)] = y;
        scale[(2, 2)] = z;

        scale
    }

    /// Rotation about the X axis by `r` radians.
    ///
    /// A quarter turn takes +Y onto +Z:
    ///
    /// ```
    /// # use curve_tracer::tuple::Vector3;
    /// # use curve_tracer::matrix::Matrix4D;
    /// let m = Matrix4D::rotation_x(std::f64::consts::FRAC_PI_2);
    /// let p = m.transform_point(&Vector3::new(0.0, 1.0, 0.0));
    /// assert_eq!(p, Vector3::new(0.0, 0.0, 1.0));
    /// ```
    pub fn rotation_x(r: f64) -> Matrix4D {
        let mut rotate = Self::identity();
        rotate[(1, 1)] =  r.cos();
        rotate[(1, 2)] = -r.sin();
        rotate[(2, 1)] =  r.sin();
        rotate[(2, 2)] =  r.cos();

        rotate
    }

    /// Rotation about the Y axis by `r` radians.
    pub fn rotation_y(r: f64) -> Matrix4D {
        let mut rotate = Self::identity();
        rotate[(0, 0)] =  r.cos();
        rotate[(0, 2)] =  r.sin();
        rotate[(2, 0)] = -r.sin();
        rotate[(2, 2)] =  r.cos();

        rotate
    }

    /// Inverts the matrix with Gauss-Jordan elimination and partial pivoting.
    ///
    /// Returns `None` when the matrix is singular (a pivot vanishes).
    pub fn inverse(&self) -> Option<Matrix4D> {
        let mut a = *self;
        let mut inv = Matrix4D::identity();

        for col in 0..4 {
            // Pick the row with the largest magnitude in this column.
            let pivot = (col..4)
                .max_by(|&i, &j| a[(i, col)].abs()
                    .partial_cmp(&a[(j, col)].abs())
                    .unwrap_or(std::cmp::Ordering::Equal))
                .unwrap_or(col);

            if a[(pivot, col)].abs() < f64::EPSILON {
                return None;
            }

            a.swap_rows(col, pivot);
            inv.swap_rows(col, pivot);

            let rcp = 1.0 / a[(col, col)];
            for c in 0..4 {
                a[(col, c)] *= rcp;
                inv[(col, c)] *= rcp;
            }

            for r in 0..4 {
                if r == col {
                    continue;
                }

                let factor = a[(r, col)];
                if factor == 0.0 {
                    continue;
                }

                for c in 0..4 {
                    a[(r, c)] -= factor * a[(col, c)];
                    inv[(r, c)] -= factor * inv[(col, c)];
                }
            }
        }

        Some(inv)
    }

    fn swap_rows(&mut self, r0: usize, r1: usize) {
        if r0 == r1 {
            return;
        }

        for c in 0..4 {
            self.data.swap(r0 * 4 + c, r1 * 4 + c);
        }
    }

    /// Projects a point through the matrix, dividing by the homogeneous `w`.
    ///
    /// # Panics
    ///
    /// Panics if the resulting `w` is (nearly) zero. Such a point has no
    /// finite image; it only arises from malformed upstream geometry.
    pub fn transform_point(&self, p: &Vector3) -> Vector3 {
        let row = |r: usize| {
            self[(r, 0)] * p.x + self[(r, 1)] * p.y + self[(r, 2)] * p.z + self[(r, 3)]
        };

        let w = row(3);
        assert!(w.abs() > HOMOGENEOUS_W_EPSILON,
            "Homogeneous divisor {} is degenerate; point {:?} has no projection.", w, p);

        let rcp_w = 1.0 / w;
        Vector3::new(row(0) * rcp_w, row(1) * rcp_w, row(2) * rcp_w)
    }

    /// Applies the linear part of the matrix to a direction (no translation).
    pub fn transform_vector(&self, v: &Vector3) -> Vector3 {
        let row = |r: usize| self[(r, 0)] * v.x + self[(r, 1)] * v.y + self[(r, 2)] * v.z;
        Vector3::new(row(0), row(1), row(2))
    }
}

impl From<[f64; 16]> for Matrix4D {
    fn from(data: [f64; 16]) -> Matrix4D {
        Matrix4D { data }
    }
}

impl Index<(usize, usize)> for Matrix4D {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &f64 {
        &self.data[(index.0 * 4) + index.1]
    }
}

impl IndexMut<(usize, usize)> for Matrix4D {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut f64 {
        &mut self.data[(index.0 * 4) + index.1]
    }
}

/// Matrix composition. `(a * b)` applies `b` first, then `a`.
impl Mul<Matrix4D> for Matrix4D {
    type Output = Matrix4D;

    fn mul(self, other: Matrix4D) -> Matrix4D {
        let mut res = Matrix4D::new();

        for r in 0..4 {
            for c in 0..4 {
                res[(r, c)] = (0..4).map(|k| self[(r, k)] * other[(k, c)]).sum();
            }
        }

        res
    }
}

#[test]
fn identity() {
    let i = Matrix4D::identity();
    let a: Matrix4D = [ 0.0, 1.0,  2.0,  4.0,
                        1.0, 2.0,  4.0,  8.0,
                        2.0, 4.0,  8.0, 16.0,
                        4.0, 8.0, 16.0, 32.0, ].into();

    assert_eq!(i * a, a);
    assert_eq!(a * i, a);
}

#[test]
fn inverse_of_general_matrix() {
    let a: Matrix4D = [  8.0, -5.0,  9.0,  2.0,
                         7.0,  5.0,  6.0,  1.0,
                        -6.0,  0.0,  9.0,  6.0,
                        -3.0,  0.0, -9.0, -4.0, ].into();

    let i: Matrix4D = [ -0.15385, -0.15385, -0.28205, -0.53846,
                        -0.07692,  0.12308,  0.02564,  0.03077,
                         0.35897,  0.35897,  0.43590,  0.92308,
                        -0.69231, -0.69231, -0.76923, -1.92308, ].into();

    assert_eq!(a.inverse().unwrap(), i);
    assert_eq!(a * a.inverse().unwrap(), Matrix4D::identity());
}

#[test]
fn singular_matrix_has_no_inverse() {
    let a = Matrix4D::scaling(1.0, 0.0, 1.0);
    assert!(a.inverse().is_none());
}

#[test]
fn translation_moves_points_not_vectors() {
    let m = Matrix4D::translation(5.0, -3.0, 2.0);
    let v = Vector3::new(-3.0, 4.0, 5.0);

    assert_eq!(m.transform_point(&v), Vector3::new(2.0, 1.0, 7.0));
    assert_eq!(m.transform_vector(&v), v);
}

#[test]
fn rotations_quarter_turn() {
    let half_pi = std::f64::consts::FRAC_PI_2;
    let p = Vector3::new(0.0, 1.0, 0.0);

    assert_eq!(Matrix4D::rotation_x(half_pi).transform_point(&p),
        Vector3::new(0.0, 0.0, 1.0));
    assert_eq!(Matrix4D::rotation_y(half_pi).transform_point(&Vector3::new(0.0, 0.0, 1.0)),
        Vector3::new(1.0, 0.0, 0.0));
}

#[test]
fn projective_point_is_divided_by_w() {
    let mut m = Matrix4D::identity();
    m[(3, 3)] = 2.0;

    let p = m.transform_point(&Vector3::new(2.0, 4.0, 6.0));
    assert_eq!(p, Vector3::new(1.0, 2.0, 3.0));
}

#[test]
#[should_panic]
fn zero_w_fails_fast() {
    let mut m = Matrix4D::identity();
    m[(3, 3)] = 0.0;

    m.transform_point(&Vector3::new(1.0, 1.0, 1.0));
}
