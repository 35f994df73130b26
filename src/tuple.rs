use std::ops::{ Add, Sub, Neg, Mul, Index };

use crate::feq;

/// A 3D vector, used for both points and directions.
///
/// Equality is approximate (see `feq`), which keeps test assertions readable
/// after a chain of floating point operations.
#[derive(Debug, Default, Copy, Clone, PartialOrd)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PartialEq for Vector3 {
    fn eq(&self, other: &Vector3) -> bool {
        feq(self.x, other.x) &&
            feq(self.y, other.y) &&
            feq(self.z, other.z)
    }
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Vector3 {
        Vector3 { x, y, z }
    }

    /// A vector with all three components set to `v`.
    pub fn splat(v: f64) -> Vector3 {
        Vector3 { x: v, y: v, z: v }
    }

    pub fn magnitude(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn normalize(&self) -> Vector3 {
        *self * (1.0 / self.magnitude())
    }

    pub fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Dot product restricted to the X and Y components.
    ///
    /// In a ray-local frame the ray runs along Z, so this measures offsets
    /// perpendicular to the ray.
    pub fn dot_xy(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Component-wise minimum.
    pub fn min(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.x.min(other.x),
            y: self.y.min(other.y),
            z: self.z.min(other.z),
        }
    }

    /// Component-wise maximum.
    pub fn max(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.x.max(other.x),
            y: self.y.max(other.y),
            z: self.z.max(other.z),
        }
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Vector3 {
    fn from(v: [f64; 3]) -> Vector3 {
        Vector3 { x: v[0], y: v[1], z: v[2] }
    }
}

/// Indexes the components by axis (0 = X, 1 = Y, 2 = Z).
impl Index<usize> for Vector3 {
    type Output = f64;

    fn index(&self, axis: usize) -> &f64 {
        match axis {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vector3 axis {} out of range.", axis),
        }
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Neg for Vector3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self { x: -self.x, y: -self.y, z: -self.z }
    }
}

/// Scalar right-multiplication.
///
/// ```
/// use curve_tracer::tuple::Vector3;
///
/// let v = Vector3::new(1.0, 2.0, 3.0);
/// assert_eq!(v * 2.0, Vector3::new(2.0, 4.0, 6.0));
/// ```
impl Mul<f64> for Vector3 {
    type Output = Self;

    fn mul(self, s: f64) -> Self {
        Self { x: self.x * s, y: self.y * s, z: self.z * s }
    }
}

/// Scalar left-multiplication.
impl Mul<Vector3> for f64 {
    type Output = Vector3;

    fn mul(self, v: Vector3) -> Vector3 {
        v * self
    }
}

/* Tests */

#[test]
fn add_and_sub() {
    let a = Vector3::new(3.0, -2.0, 5.0);
    let b = Vector3::new(-2.0, 3.0, 1.0);

    assert_eq!(a + b, Vector3::new(1.0, 1.0, 6.0));
    assert_eq!(a - b, Vector3::new(5.0, -5.0, 4.0));
    assert_eq!(-a, Vector3::new(-3.0, 2.0, -5.0));
}

#[test]
fn scalar_multiplication_commutes() {
    let v = Vector3::new(1.0, -2.0, 3.0);

    assert_eq!(v * 3.5, Vector3::new(3.5, -7.0, 10.5));
    assert_eq!(0.5 * v, v * 0.5);
}

#[test]
fn normalize_dirty() {
    let v = Vector3::new(1.0, 2.0, 3.0);
    let s = f64::sqrt(14.0);

    assert_eq!(v.magnitude(), s);
    assert_eq!(v.normalize(), Vector3::new(1.0 / s, 2.0 / s, 3.0 / s));
}

#[test]
fn dot_xy_ignores_z() {
    let a = Vector3::new(1.0, 2.0, 100.0);
    let b = Vector3::new(3.0, -1.0, -50.0);

    assert_eq!(a.dot_xy(&b), 1.0);
    assert_eq!(a.dot(&b), 1.0 - 5000.0);
}

#[test]
fn componentwise_min_max() {
    let a = Vector3::new(1.0, 5.0, -2.0);
    let b = Vector3::new(0.0, 6.0, -3.0);

    assert_eq!(a.min(&b), Vector3::new(0.0, 5.0, -3.0));
    assert_eq!(a.max(&b), Vector3::new(1.0, 6.0, -2.0));
    assert_eq!(a[2], -2.0);
}
